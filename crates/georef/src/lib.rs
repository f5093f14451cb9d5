//! Geoquery Geographic Entity Resolver
//!
//! Parses queries for place names (state, metro, county, city, neighborhood,
//! postal code) and turns them into a set of area identifiers that restricts
//! downstream processing. The zip/city/county/metro reference database is an
//! external service; when it is unreachable the resolver fails open and the
//! request proceeds without a geographic filter.

mod reference;
mod resolver;

pub use reference::{CityLookup, GeoReference, HttpGeoReference, StaticGeoReference};
pub use resolver::EntityResolver;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kinds of places the reference can expand, broadest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceKind {
    State,
    Metro,
    County,
    City,
    Neighborhood,
    PostalCode,
}

impl PlaceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaceKind::State => "state",
            PlaceKind::Metro => "metro",
            PlaceKind::County => "county",
            PlaceKind::City => "city",
            PlaceKind::Neighborhood => "neighborhood",
            PlaceKind::PostalCode => "postal_code",
        }
    }
}

/// A place name the reference knows how to expand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceAlias {
    pub name: String,
    pub kind: PlaceKind,
}

/// Outcome of geographic resolution. `Unrestricted` (no place named) is
/// distinct from `Areas` with an empty set (places named, nothing matched).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AreaRestriction {
    Unrestricted,
    Areas(BTreeSet<String>),
}

impl AreaRestriction {
    /// Whether the given area id survives this restriction.
    pub fn allows(&self, area_id: &str) -> bool {
        match self {
            AreaRestriction::Unrestricted => true,
            AreaRestriction::Areas(areas) => areas.contains(area_id),
        }
    }
}

/// A resolved restriction plus the reasoning notes it produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub restriction: AreaRestriction,
    pub notes: Vec<String>,
}

/// Errors from the reference service. All of them are recovered by failing
/// open; none aborts a request.
#[derive(Debug, Clone, Error)]
pub enum GeoRefError {
    #[error("reference lookup failed: {0}")]
    LookupFailed(String),
    #[error("reference lookup deadline exceeded")]
    DeadlineExceeded,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrestricted_allows_everything() {
        assert!(AreaRestriction::Unrestricted.allows("33101"));
    }

    #[test]
    fn empty_area_set_allows_nothing() {
        let restriction = AreaRestriction::Areas(BTreeSet::new());
        assert!(!restriction.allows("33101"));
        assert_ne!(restriction, AreaRestriction::Unrestricted);
    }

    #[test]
    fn area_set_membership() {
        let restriction =
            AreaRestriction::Areas(["33101".to_string()].into_iter().collect());
        assert!(restriction.allows("33101"));
        assert!(!restriction.allows("32601"));
    }
}
