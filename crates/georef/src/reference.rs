//! Geographic reference backends.
//!
//! The reference service owns the zip → city/county/metro mappings and
//! their reverse aggregations; this crate only consumes them.
//! [`StaticGeoReference`] carries an in-memory table for tests and offline
//! deployments; [`HttpGeoReference`] talks to a remote service with a
//! bounded deadline.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::{GeoRefError, PlaceAlias, PlaceKind};

/// Shared HTTP client; the per-call deadline is enforced by the resolver.
static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .timeout(Duration::from_millis(500))
        .connect_timeout(Duration::from_millis(250))
        .build()
        .expect("reference HTTP client must build")
});

/// Async view of the external geographic reference.
#[async_trait]
pub trait GeoReference: Send + Sync {
    /// Every place name the reference can expand, used for query matching.
    async fn place_aliases(&self) -> Result<Vec<PlaceAlias>, GeoRefError>;

    /// ZIP codes contained in the named place.
    async fn zips_for_place(
        &self,
        name: &str,
        kind: PlaceKind,
    ) -> Result<BTreeSet<String>, GeoRefError>;

    /// City for a single ZIP, when known.
    async fn city_for_zip(&self, zip: &str) -> Result<Option<String>, GeoRefError>;
}

/// Synchronous zip → city lookup used by processors to augment area names
/// (`33101` → `33101 (Miami)`). Kept separate from [`GeoReference`] so the
/// CPU-bound processing path never awaits.
pub trait CityLookup: Send + Sync {
    fn city_for_zip(&self, zip: &str) -> Option<String>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Place {
    name: String,
    kind: PlaceKind,
    zips: BTreeSet<String>,
}

/// In-memory reference table.
#[derive(Debug, Clone, Default)]
pub struct StaticGeoReference {
    places: Vec<Place>,
    city_by_zip: BTreeMap<String, String>,
}

impl StaticGeoReference {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a place and its contained ZIPs. City-kind places also feed
    /// the zip → city lookup.
    pub fn with_place(
        mut self,
        name: impl Into<String>,
        kind: PlaceKind,
        zips: &[&str],
    ) -> Self {
        let name = name.into();
        let zip_set: BTreeSet<String> = zips.iter().map(|z| z.to_string()).collect();
        if kind == PlaceKind::City {
            for zip in &zip_set {
                self.city_by_zip.insert(zip.clone(), name.clone());
            }
        }
        self.places.push(Place {
            name,
            kind,
            zips: zip_set,
        });
        self
    }

    /// South-Florida fixture used across the test suites: two counties, two
    /// cities, one metro, one state.
    pub fn florida_fixture() -> Self {
        Self::new()
            .with_place("Gainesville", PlaceKind::City, &["32601", "32603", "32605", "32608"])
            .with_place(
                "Miami",
                PlaceKind::City,
                &["33101", "33125", "33130", "33139", "33155"],
            )
            .with_place(
                "Alachua County",
                PlaceKind::County,
                &["32601", "32603", "32605", "32608", "32615", "32618"],
            )
            .with_place(
                "Miami-Dade County",
                PlaceKind::County,
                &["33101", "33125", "33130", "33139", "33155", "33165", "33176"],
            )
            .with_place(
                "Miami metro",
                PlaceKind::Metro,
                &[
                    "33101", "33125", "33130", "33139", "33155", "33165", "33176", "33301",
                    "33304",
                ],
            )
            .with_place(
                "Florida",
                PlaceKind::State,
                &[
                    "32601", "32603", "32605", "32608", "32615", "32618", "33101", "33125",
                    "33130", "33139", "33155", "33165", "33176", "33301", "33304",
                ],
            )
    }
}

#[async_trait]
impl GeoReference for StaticGeoReference {
    async fn place_aliases(&self) -> Result<Vec<PlaceAlias>, GeoRefError> {
        Ok(self
            .places
            .iter()
            .map(|place| PlaceAlias {
                name: place.name.clone(),
                kind: place.kind,
            })
            .collect())
    }

    async fn zips_for_place(
        &self,
        name: &str,
        kind: PlaceKind,
    ) -> Result<BTreeSet<String>, GeoRefError> {
        Ok(self
            .places
            .iter()
            .find(|place| place.kind == kind && place.name.eq_ignore_ascii_case(name))
            .map(|place| place.zips.clone())
            .unwrap_or_default())
    }

    async fn city_for_zip(&self, zip: &str) -> Result<Option<String>, GeoRefError> {
        Ok(self.city_by_zip.get(zip).cloned())
    }
}

impl CityLookup for StaticGeoReference {
    fn city_for_zip(&self, zip: &str) -> Option<String> {
        self.city_by_zip.get(zip).cloned()
    }
}

/// Remote reference service client.
pub struct HttpGeoReference {
    base_url: String,
}

impl HttpGeoReference {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, GeoRefError> {
        let url = format!("{}{path}", self.base_url);
        let response = HTTP_CLIENT
            .get(&url)
            .send()
            .await
            .map_err(|err| GeoRefError::LookupFailed(err.to_string()))?;
        if !response.status().is_success() {
            return Err(GeoRefError::LookupFailed(format!(
                "reference service returned {} for {url}",
                response.status()
            )));
        }
        response
            .json::<T>()
            .await
            .map_err(|err| GeoRefError::LookupFailed(err.to_string()))
    }
}

#[derive(Deserialize)]
struct ZipsResponse {
    zips: BTreeSet<String>,
}

#[derive(Deserialize)]
struct CityResponse {
    city: Option<String>,
}

#[async_trait]
impl GeoReference for HttpGeoReference {
    async fn place_aliases(&self) -> Result<Vec<PlaceAlias>, GeoRefError> {
        self.get_json("/v1/places").await
    }

    async fn zips_for_place(
        &self,
        name: &str,
        kind: PlaceKind,
    ) -> Result<BTreeSet<String>, GeoRefError> {
        let encoded = urlencode(name);
        let response: ZipsResponse = self
            .get_json(&format!(
                "/v1/zips?name={encoded}&kind={}",
                kind.as_str()
            ))
            .await?;
        Ok(response.zips)
    }

    async fn city_for_zip(&self, zip: &str) -> Result<Option<String>, GeoRefError> {
        let response: CityResponse = self.get_json(&format!("/v1/city/{zip}")).await?;
        Ok(response.city)
    }
}

fn urlencode(input: &str) -> String {
    let mut encoded = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            b' ' => encoded.push('+'),
            other => encoded.push_str(&format!("%{other:02X}")),
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_reference_expands_counties() {
        let reference = StaticGeoReference::florida_fixture();
        let zips = reference
            .zips_for_place("Alachua County", PlaceKind::County)
            .await
            .unwrap();
        assert!(zips.contains("32601"));
        assert_eq!(zips.len(), 6);
    }

    #[tokio::test]
    async fn static_reference_lookup_is_case_insensitive() {
        let reference = StaticGeoReference::florida_fixture();
        let zips = reference
            .zips_for_place("miami-dade county", PlaceKind::County)
            .await
            .unwrap();
        assert!(!zips.is_empty());
    }

    #[tokio::test]
    async fn unknown_place_expands_to_empty_set() {
        let reference = StaticGeoReference::florida_fixture();
        let zips = reference
            .zips_for_place("Atlantis", PlaceKind::City)
            .await
            .unwrap();
        assert!(zips.is_empty());
    }

    #[test]
    fn city_lookup_resolves_seeded_zip() {
        let reference = StaticGeoReference::florida_fixture();
        assert_eq!(
            CityLookup::city_for_zip(&reference, "33101"),
            Some("Miami".to_string())
        );
        assert_eq!(CityLookup::city_for_zip(&reference, "99999"), None);
    }

    #[test]
    fn urlencode_escapes_spaces_and_punctuation() {
        assert_eq!(urlencode("Miami-Dade County"), "Miami-Dade+County");
        assert_eq!(urlencode("a&b"), "a%26b");
    }
}
