use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

// --- Candidates ---

/// A scraped review. Null text is normalised to the empty string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub text: String,
    pub stars: u8,
}

impl Review {
    pub fn new(text: Option<String>, stars: Option<f64>) -> Self {
        Self {
            text: text.unwrap_or_default(),
            stars: stars.map(|s| s.round().clamp(0.0, 5.0) as u8).unwrap_or(0),
        }
    }
}

/// A restaurant as returned by the review source, before detailed analysis.
///
/// `keyword_count` and `combined_score` are filled in by the ranker and are
/// zero on freshly merged candidates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceCandidate {
    pub name: String,
    pub address: String,
    pub rating: f64,
    pub review_count: u64,
    pub url: String,
    pub reviews: Vec<Review>,
    #[serde(default)]
    pub keyword_count: u32,
    #[serde(default)]
    pub combined_score: f64,
}

impl PlaceCandidate {
    /// Reviews whose text is non-blank.
    pub fn written_reviews(&self) -> impl Iterator<Item = &Review> {
        self.reviews.iter().filter(|r| !r.text.trim().is_empty())
    }
}

/// Verdict vocabulary the summarizer must use for `dish_quality`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum DishQuality {
    Excellent,
    Good,
    Average,
    Poor,
    #[default]
    Unknown,
}

impl DishQuality {
    /// Fallback score used when the model gives no usable `recommendation_score`.
    pub fn base_score(self) -> f64 {
        match self {
            DishQuality::Excellent => 9.0,
            DishQuality::Good => 7.0,
            DishQuality::Average => 5.0,
            DishQuality::Poor => 3.0,
            DishQuality::Unknown => 4.0,
        }
    }
}

impl From<String> for DishQuality {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().as_str() {
            "excellent" => DishQuality::Excellent,
            "good" => DishQuality::Good,
            "average" => DishQuality::Average,
            "poor" => DishQuality::Poor,
            _ => DishQuality::Unknown,
        }
    }
}

/// Per-dish verdict for one restaurant. Every field has a default, and an
/// explicit `null` counts as absent, so a partially filled model answer still
/// parses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DishAnalysis {
    #[serde(deserialize_with = "null_as_default")]
    pub serves_dish: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub dish_quality: DishQuality,
    #[serde(deserialize_with = "null_as_default")]
    pub dish_description: String,
    #[serde(deserialize_with = "null_as_default")]
    pub key_points: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub recommendation: String,
    pub recommendation_score: Option<f64>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A shortlisted candidate after analysis. `ai_score` is always set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzedCandidate {
    #[serde(flatten)]
    pub place: PlaceCandidate,
    pub analysis: DishAnalysis,
    pub ai_score: f64,
}

// --- Requests ---

/// A dish search around a location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DishSearch {
    pub dish: String,
    pub location: String,
    #[serde(default = "default_radius_km")]
    pub radius: u32,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

pub fn default_radius_km() -> u32 {
    10
}

impl DishSearch {
    pub fn new(dish: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            dish: dish.into(),
            location: location.into(),
            radius: default_radius_km(),
            latitude: None,
            longitude: None,
        }
    }

    /// Coordinates, only when both halves were supplied.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some((lat, lng)),
            _ => None,
        }
    }
}

// --- Tasks ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    Initialized,
    Fetching,
    Processing,
    Analyzing,
    Finalizing,
    Completed,
    Failed,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskState::Initialized => "INITIALIZED",
            TaskState::Fetching => "FETCHING",
            TaskState::Processing => "PROCESSING",
            TaskState::Analyzing => "ANALYZING",
            TaskState::Finalizing => "FINALIZING",
            TaskState::Completed => "COMPLETED",
            TaskState::Failed => "FAILED",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two job shapes sharing the task state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Summarise one restaurant from its map link.
    Lookup,
    /// Rank and analyse many restaurants for one dish.
    DishSearch,
}

const LOOKUP_PATH: &[TaskState] = &[
    TaskState::Initialized,
    TaskState::Fetching,
    TaskState::Analyzing,
    TaskState::Finalizing,
    TaskState::Completed,
];

const DISH_SEARCH_PATH: &[TaskState] = &[
    TaskState::Initialized,
    TaskState::Fetching,
    TaskState::Processing,
    TaskState::Analyzing,
    TaskState::Completed,
];

impl JobKind {
    /// Success path, in order. `Failed` is reachable from any non-terminal state.
    pub fn path(self) -> &'static [TaskState] {
        match self {
            JobKind::Lookup => LOOKUP_PATH,
            JobKind::DishSearch => DISH_SEARCH_PATH,
        }
    }

    /// True when `to` directly follows `from` for this job, or `to` is `Failed`
    /// and `from` is not terminal.
    pub fn allows(self, from: TaskState, to: TaskState) -> bool {
        if from.is_terminal() {
            return false;
        }
        if to == TaskState::Failed {
            return true;
        }
        let path = self.path();
        path.iter()
            .position(|s| *s == from)
            .and_then(|i| path.get(i + 1))
            .is_some_and(|next| *next == to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn review_normalises_missing_fields() {
        let r = Review::new(None, None);
        assert_eq!(r.text, "");
        assert_eq!(r.stars, 0);
        assert_eq!(Review::new(Some("ok".into()), Some(4.0)).stars, 4);
    }

    #[test]
    fn quality_parses_case_insensitively() {
        let q: DishQuality = serde_json::from_str("\"Excellent\"").unwrap();
        assert_eq!(q, DishQuality::Excellent);
        let q: DishQuality = serde_json::from_str("\"superb\"").unwrap();
        assert_eq!(q, DishQuality::Unknown);
        assert_eq!(serde_json::to_string(&DishQuality::Good).unwrap(), "\"good\"");
    }

    #[test]
    fn analysis_defaults_missing_fields() {
        let a: DishAnalysis = serde_json::from_str(r#"{"serves_dish": true}"#).unwrap();
        assert!(a.serves_dish);
        assert_eq!(a.dish_quality, DishQuality::Unknown);
        assert!(a.key_points.is_empty());
        assert!(a.recommendation_score.is_none());
    }

    #[test]
    fn analysis_treats_null_fields_as_absent() {
        let a: DishAnalysis = serde_json::from_str(
            r#"{"serves_dish": true, "dish_quality": null, "dish_description": null,
                "key_points": null, "recommendation": null, "recommendation_score": 8}"#,
        )
        .unwrap();
        assert!(a.serves_dish);
        assert_eq!(a.dish_quality, DishQuality::Unknown);
        assert_eq!(a.dish_description, "");
        assert!(a.key_points.is_empty());
        assert_eq!(a.recommendation, "");
        assert_eq!(a.recommendation_score, Some(8.0));

        let a: DishAnalysis = serde_json::from_str(r#"{"serves_dish": null}"#).unwrap();
        assert!(!a.serves_dish);
    }

    #[test]
    fn analyzed_candidate_flattens_place() {
        let c = AnalyzedCandidate {
            place: PlaceCandidate {
                name: "Lupe's".into(),
                review_count: 12,
                ..Default::default()
            },
            analysis: DishAnalysis::default(),
            ai_score: 7.0,
        };
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["name"], "Lupe's");
        assert_eq!(json["reviewCount"], 12);
        assert_eq!(json["aiScore"], 7.0);
        assert_eq!(json["analysis"]["dish_quality"], "unknown");
    }

    #[test]
    fn dish_search_defaults_radius() {
        let s: DishSearch = serde_json::from_str(r#"{"dish":"pho","location":"Houston"}"#).unwrap();
        assert_eq!(s.radius, 10);
        assert!(s.coordinates().is_none());
    }

    #[test]
    fn lookup_path_is_strictly_forward() {
        use TaskState::*;
        let kind = JobKind::Lookup;
        assert!(kind.allows(Initialized, Fetching));
        assert!(kind.allows(Fetching, Analyzing));
        assert!(kind.allows(Analyzing, Finalizing));
        assert!(kind.allows(Finalizing, Completed));
        assert!(!kind.allows(Fetching, Processing));
        assert!(!kind.allows(Initialized, Analyzing));
        assert!(!kind.allows(Analyzing, Fetching));
    }

    #[test]
    fn dish_search_path_goes_through_processing() {
        use TaskState::*;
        let kind = JobKind::DishSearch;
        assert!(kind.allows(Fetching, Processing));
        assert!(kind.allows(Processing, Analyzing));
        assert!(kind.allows(Analyzing, Completed));
        assert!(!kind.allows(Analyzing, Finalizing));
    }

    #[test]
    fn failed_reachable_until_terminal() {
        use TaskState::*;
        for kind in [JobKind::Lookup, JobKind::DishSearch] {
            for state in kind.path().iter().copied().filter(|s| !s.is_terminal()) {
                assert!(kind.allows(state, Failed));
            }
            assert!(!kind.allows(Completed, Failed));
            assert!(!kind.allows(Failed, Failed));
        }
    }

    #[test]
    fn state_serializes_screaming() {
        assert_eq!(serde_json::to_string(&TaskState::Initialized).unwrap(), "\"INITIALIZED\"");
        assert_eq!(TaskState::Finalizing.to_string(), "FINALIZING");
    }
}
