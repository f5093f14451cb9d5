//! Analysis-type-aware payload shapes.

use authority::EndpointFamily;

/// How outliers are included in a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutlierMode {
    None,
    /// All |z| > 2 records.
    All,
}

/// Per-family payload shape: top/bottom counts and which optional blocks
/// are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisProfile {
    pub top: usize,
    pub bottom: usize,
    pub spatial_clusters: bool,
    pub outliers: OutlierMode,
}

/// The documented table, keyed by endpoint family.
pub fn profile_for(family: EndpointFamily) -> AnalysisProfile {
    match family {
        EndpointFamily::Strategic => AnalysisProfile {
            top: 15,
            bottom: 5,
            spatial_clusters: true,
            outliers: OutlierMode::None,
        },
        EndpointFamily::Competitive => AnalysisProfile {
            top: 20,
            bottom: 10,
            spatial_clusters: true,
            outliers: OutlierMode::None,
        },
        EndpointFamily::Difference => AnalysisProfile {
            top: 10,
            bottom: 10,
            spatial_clusters: true,
            outliers: OutlierMode::None,
        },
        EndpointFamily::Demographic => AnalysisProfile {
            top: 10,
            bottom: 5,
            spatial_clusters: true,
            outliers: OutlierMode::None,
        },
        EndpointFamily::Correlation => AnalysisProfile {
            top: 5,
            bottom: 5,
            spatial_clusters: false,
            outliers: OutlierMode::None,
        },
        EndpointFamily::OutlierDetection => AnalysisProfile {
            top: 0,
            bottom: 0,
            spatial_clusters: false,
            outliers: OutlierMode::All,
        },
        EndpointFamily::SpatialClusters => AnalysisProfile {
            top: 10,
            bottom: 5,
            spatial_clusters: true,
            outliers: OutlierMode::All,
        },
        EndpointFamily::General => AnalysisProfile {
            top: 10,
            bottom: 5,
            spatial_clusters: false,
            outliers: OutlierMode::None,
        },
    }
}

/// What the narrating LLM should emphasize for this family.
pub fn directive_for(family: EndpointFamily) -> &'static str {
    match family {
        EndpointFamily::Strategic => {
            "Emphasize the top-ranked expansion targets and what makes them attractive; \
             mention the bottom markets only as contrast."
        }
        EndpointFamily::Competitive => {
            "Describe where the competitive position is strongest and weakest; the score \
             is a 1-10 advantage scale, not market share."
        }
        EndpointFamily::Difference => {
            "Positive values mean the first brand leads, negative the second; describe \
             both sides and the balanced band near zero."
        }
        EndpointFamily::Demographic => {
            "Profile the people behind the top areas: age, income, education, household \
             makeup. Avoid repeating raw percentages for every area."
        }
        EndpointFamily::Correlation => {
            "Explain the direction and strength of the relationship; use the extremes as \
             illustrations, not an exhaustive list."
        }
        EndpointFamily::OutlierDetection => {
            "Focus on the outliers and the plausible reasons each deviates; ordinary \
             areas need no individual mention."
        }
        EndpointFamily::SpatialClusters => {
            "Describe each cluster as a region with a shared character; name its size \
             and average score, then its notable members."
        }
        EndpointFamily::General => {
            "Summarize the overall distribution and highlight the leaders; keep per-area \
             detail to the extremes."
        }
    }
}
