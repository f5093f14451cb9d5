//! Query-side place extraction.
//!
//! Tokenizes the query, matches known place aliases longest-first, expands
//! each match to its contained ZIPs through the reference, and unions the
//! results. "The query names no place" is a distinct outcome from "the
//! named places contain no areas".

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::warn;

use crate::reference::GeoReference;
use crate::{AreaRestriction, GeoRefError, PlaceAlias, PlaceKind, Resolution};

const DEFAULT_LOOKUP_DEADLINE: Duration = Duration::from_millis(500);

/// Resolves place mentions in query text to an area restriction.
pub struct EntityResolver {
    reference: Arc<dyn GeoReference>,
    lookup_deadline: Duration,
}

impl EntityResolver {
    pub fn new(reference: Arc<dyn GeoReference>) -> Self {
        Self {
            reference,
            lookup_deadline: DEFAULT_LOOKUP_DEADLINE,
        }
    }

    pub fn with_lookup_deadline(mut self, deadline: Duration) -> Self {
        self.lookup_deadline = deadline;
        self
    }

    /// Resolve the query to an area restriction. Reference failures fail
    /// open: the request proceeds unrestricted with a reasoning note.
    pub async fn resolve(&self, query: &str) -> Resolution {
        let aliases = match timeout(self.lookup_deadline, self.reference.place_aliases()).await {
            Ok(Ok(aliases)) => aliases,
            Ok(Err(err)) => return fail_open(err),
            Err(_) => return fail_open(GeoRefError::DeadlineExceeded),
        };

        let mut matches = match_aliases(query, &aliases);
        for zip in postal_codes_in(query) {
            matches.push(PlaceAlias {
                name: zip,
                kind: PlaceKind::PostalCode,
            });
        }

        if matches.is_empty() {
            return Resolution {
                restriction: AreaRestriction::Unrestricted,
                notes: vec![],
            };
        }

        let mut areas: BTreeSet<String> = BTreeSet::new();
        let mut notes = Vec::new();
        for place in &matches {
            if place.kind == PlaceKind::PostalCode {
                areas.insert(place.name.clone());
                notes.push(format!("Geographic filter: ZIP {}", place.name));
                continue;
            }
            let expansion = timeout(
                self.lookup_deadline,
                self.reference.zips_for_place(&place.name, place.kind),
            )
            .await;
            match expansion {
                Ok(Ok(zips)) => {
                    notes.push(format!(
                        "Geographic filter: {} ({}) -> {} areas",
                        place.name,
                        place.kind.as_str(),
                        zips.len()
                    ));
                    areas.extend(zips);
                }
                Ok(Err(err)) => return fail_open(err),
                Err(_) => return fail_open(GeoRefError::DeadlineExceeded),
            }
        }

        Resolution {
            restriction: AreaRestriction::Areas(areas),
            notes,
        }
    }
}

fn fail_open(err: GeoRefError) -> Resolution {
    warn!(error = %err, "geographic_lookup_failed");
    Resolution {
        restriction: AreaRestriction::Unrestricted,
        notes: vec![format!(
            "Geographic lookup unavailable ({err}); proceeding without a filter"
        )],
    }
}

/// Match aliases longest-first so "Miami-Dade County" wins over "Miami".
/// A shorter alias is still kept when it matches outside every longer
/// match's span.
fn match_aliases(query: &str, aliases: &[PlaceAlias]) -> Vec<PlaceAlias> {
    let lowered = query.to_lowercase();
    let mut ordered: Vec<&PlaceAlias> = aliases.iter().collect();
    ordered.sort_by(|a, b| b.name.len().cmp(&a.name.len()).then(a.name.cmp(&b.name)));

    let mut claimed: Vec<(usize, usize)> = Vec::new();
    let mut matched = Vec::new();
    for alias in ordered {
        let needle = alias.name.to_lowercase();
        if let Some(span) = find_phrase(&lowered, &needle) {
            let overlaps = claimed
                .iter()
                .any(|(start, end)| span.0 < *end && *start < span.1);
            if !overlaps {
                claimed.push(span);
                matched.push(alias.clone());
            }
        }
    }
    matched
}

/// Case-folded phrase search with word boundaries on both sides.
fn find_phrase(haystack: &str, needle: &str) -> Option<(usize, usize)> {
    if needle.is_empty() {
        return None;
    }
    let mut search_from = 0;
    while let Some(offset) = haystack[search_from..].find(needle) {
        let start = search_from + offset;
        let end = start + needle.len();
        let left_ok = start == 0
            || !haystack[..start]
                .chars()
                .next_back()
                .is_some_and(char::is_alphanumeric);
        let right_ok = end == haystack.len()
            || !haystack[end..].chars().next().is_some_and(char::is_alphanumeric);
        if left_ok && right_ok {
            return Some((start, end));
        }
        search_from = end;
    }
    None
}

/// Five-digit tokens treated as postal codes.
fn postal_codes_in(query: &str) -> Vec<String> {
    query
        .split(|c: char| !c.is_ascii_digit())
        .filter(|token| token.len() == 5)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::StaticGeoReference;

    fn resolver() -> EntityResolver {
        EntityResolver::new(Arc::new(StaticGeoReference::florida_fixture()))
    }

    #[tokio::test]
    async fn no_place_means_unrestricted() {
        let resolution = resolver().resolve("show me the best markets").await;
        assert_eq!(resolution.restriction, AreaRestriction::Unrestricted);
        assert!(resolution.notes.is_empty());
    }

    #[tokio::test]
    async fn county_mention_expands_to_zip_union() {
        let resolution = resolver()
            .resolve("Compare usage between Alachua County and Miami-Dade County")
            .await;
        match resolution.restriction {
            AreaRestriction::Areas(areas) => {
                assert!(areas.contains("32601"));
                assert!(areas.contains("33101"));
                assert_eq!(areas.len(), 13);
            }
            other => panic!("expected area restriction, got {other:?}"),
        }
        assert_eq!(resolution.notes.len(), 2);
    }

    #[tokio::test]
    async fn longest_alias_wins_over_contained_city() {
        let resolution = resolver().resolve("results for miami-dade county please").await;
        match resolution.restriction {
            AreaRestriction::Areas(areas) => assert_eq!(areas.len(), 7),
            other => panic!("expected areas, got {other:?}"),
        }
        // The county matched; the bare "Miami" city alias must not re-match
        // inside the county's span.
        assert_eq!(resolution.notes.len(), 1);
        assert!(resolution.notes[0].contains("Miami-Dade County"));
    }

    #[tokio::test]
    async fn postal_code_is_matched_directly() {
        let resolution = resolver().resolve("what about 33101?").await;
        match resolution.restriction {
            AreaRestriction::Areas(areas) => {
                assert_eq!(areas.len(), 1);
                assert!(areas.contains("33101"));
            }
            other => panic!("expected areas, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn reference_failure_fails_open() {
        struct FailingReference;

        #[async_trait::async_trait]
        impl GeoReference for FailingReference {
            async fn place_aliases(&self) -> Result<Vec<PlaceAlias>, GeoRefError> {
                Err(GeoRefError::LookupFailed("connection refused".into()))
            }

            async fn zips_for_place(
                &self,
                _name: &str,
                _kind: PlaceKind,
            ) -> Result<BTreeSet<String>, GeoRefError> {
                Err(GeoRefError::LookupFailed("connection refused".into()))
            }

            async fn city_for_zip(&self, _zip: &str) -> Result<Option<String>, GeoRefError> {
                Err(GeoRefError::LookupFailed("connection refused".into()))
            }
        }

        let resolver = EntityResolver::new(Arc::new(FailingReference));
        let resolution = resolver.resolve("markets in Miami").await;
        assert_eq!(resolution.restriction, AreaRestriction::Unrestricted);
        assert_eq!(resolution.notes.len(), 1);
        assert!(resolution.notes[0].contains("unavailable"));
    }

    #[test]
    fn find_phrase_respects_word_boundaries() {
        assert!(find_phrase("greater miami area", "miami").is_some());
        assert!(find_phrase("miamisburg ohio", "miami").is_none());
        assert_eq!(find_phrase("in miami.", "miami"), Some((3, 8)));
    }
}
