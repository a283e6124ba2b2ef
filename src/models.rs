use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// School years covered by the assistant (French primary cycle).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EducationLevel {
    Cp,
    Ce1,
    Ce2,
    Cm1,
    Cm2,
}

impl EducationLevel {
    pub const ALL: [EducationLevel; 5] = [
        EducationLevel::Cp,
        EducationLevel::Ce1,
        EducationLevel::Ce2,
        EducationLevel::Cm1,
        EducationLevel::Cm2,
    ];

    /// Case-insensitive parse; `None` for anything outside the known set.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.to_ascii_lowercase().as_str() {
            "cp" => Some(EducationLevel::Cp),
            "ce1" => Some(EducationLevel::Ce1),
            "ce2" => Some(EducationLevel::Ce2),
            "cm1" => Some(EducationLevel::Cm1),
            "cm2" => Some(EducationLevel::Cm2),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EducationLevel::Cp => "cp",
            EducationLevel::Ce1 => "ce1",
            EducationLevel::Ce2 => "ce2",
            EducationLevel::Cm1 => "cm1",
            EducationLevel::Cm2 => "cm2",
        }
    }
}

/// The three assistant surfaces exposed to pupils.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssistantType {
    Accueil,
    Recherche,
    Japprends,
}

impl AssistantType {
    pub const ALL: [AssistantType; 3] = [
        AssistantType::Accueil,
        AssistantType::Recherche,
        AssistantType::Japprends,
    ];

    /// Accepts the canonical labels plus the legacy spellings that upstream
    /// exports used for the learning assistant.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.to_ascii_lowercase().as_str() {
            "accueil" => Some(AssistantType::Accueil),
            "recherche" => Some(AssistantType::Recherche),
            "japprends" | "apprentissage" | "apprentissge" => Some(AssistantType::Japprends),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AssistantType::Accueil => "accueil",
            AssistantType::Recherche => "recherche",
            AssistantType::Japprends => "japprends",
        }
    }
}

/// One exercise's retraining outcome: accuracy before and after the last
/// correction pass, plus the derived relative improvement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub exercise_id: String,
    pub exercise_name: String,
    pub chapter_id: String,
    pub chapter_name: String,
    pub subject_id: String,
    pub subject_name: String,
    pub level: EducationLevel,
    pub before_correction: f64,
    pub after_correction: f64,
    pub improvement_percentage: f64,
    pub impact: f64,
    pub last_updated: NaiveDateTime,
}

/// Aggregated satisfaction for one assistant at one level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SatisfactionRecord {
    pub name: String,
    pub assistant: AssistantType,
    pub level: EducationLevel,
    pub satisfaction_rate: f64,
    pub total_responses: u32,
    pub total_users: u32,
    pub trend: f64,
    pub recorded_at: NaiveDate,
}

/// A single rated comment. Curriculum fields are `None` for assistants that
/// operate outside any subject context (accueil, recherche).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackComment {
    pub id: Uuid,
    pub date: NaiveDateTime,
    pub assistant: AssistantType,
    pub rating: u8,
    pub comment: String,
    pub tags: Vec<String>,
    pub level: Option<EducationLevel>,
    pub subject: Option<String>,
    pub chapter: Option<String>,
    pub exercise: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaqEntry {
    pub question: String,
    pub answer: String,
    pub category: String,
    pub views: u32,
}

/// Mean before/after/improvement for one group key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupAverage {
    pub key: String,
    pub before_correction: f64,
    pub after_correction: f64,
    pub improvement: f64,
    pub count: usize,
}

/// Mean satisfaction for one group key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SatisfactionSummary {
    pub key: String,
    pub satisfaction_rate: f64,
    pub total_responses: u32,
    pub count: usize,
}

/// Parallel arrays ready for chart rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub labels: Vec<String>,
    pub before_correction: Vec<f64>,
    pub after_correction: Vec<f64>,
    pub improvement: Vec<f64>,
}

/// Everything one analytics session works from. Produced whole by the data
/// source; never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub satisfaction: Vec<SatisfactionRecord>,
    pub performance: Vec<PerformanceRecord>,
    pub comments: Vec<FeedbackComment>,
    pub faq: Vec<FaqEntry>,
}
