use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::curriculum;
use crate::models::{
    AssistantType, EducationLevel, FaqEntry, FeedbackComment, PerformanceRecord,
    SatisfactionRecord,
};

/// Reporting window. Relative variants resolve against the caller's notion of
/// "today" so the engine stays deterministic under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Today,
    Yesterday,
    Last7Days,
    Last30Days,
    Custom { start: NaiveDate, end: NaiveDate },
}

fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    // 23:59:59 is always a valid time; fall back to midnight defensively.
    date.and_hms_opt(23, 59, 59)
        .unwrap_or_else(|| date.and_time(NaiveTime::MIN))
}

impl Period {
    /// Inclusive datetime range, with the end date widened to end-of-day.
    pub fn resolve(&self, today: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
        let (start, end) = match self {
            Period::Today => (today, today),
            Period::Yesterday => {
                let y = today - Duration::days(1);
                (y, y)
            }
            Period::Last7Days => (today - Duration::days(6), today),
            Period::Last30Days => (today - Duration::days(29), today),
            Period::Custom { start, end } => (*start, *end),
        };
        (start.and_time(NaiveTime::MIN), end_of_day(end))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operator {
    Equals,
    NotEquals,
    Contains,
    StartsWith,
    EndsWith,
    GreaterThan,
    LessThan,
}

/// Typed advanced-filter value. Shapes the engine cannot evaluate are
/// unrepresentable rather than silently ignored at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Number(f64),
    Text(String),
}

/// One column/operator/value predicate, ANDed after the structured filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub column: String,
    pub op: Operator,
    pub value: FilterValue,
}

impl Predicate {
    fn matches<R: Filterable>(&self, record: &R) -> bool {
        match (&self.op, &self.value) {
            (Operator::GreaterThan, FilterValue::Number(n)) => {
                record.column_number(&self.column).is_some_and(|v| v > *n)
            }
            (Operator::LessThan, FilterValue::Number(n)) => {
                record.column_number(&self.column).is_some_and(|v| v < *n)
            }
            (Operator::Equals, FilterValue::Number(n)) => record
                .column_number(&self.column)
                .is_some_and(|v| (v - n).abs() < f64::EPSILON),
            (Operator::NotEquals, FilterValue::Number(n)) => record
                .column_number(&self.column)
                .is_some_and(|v| (v - n).abs() >= f64::EPSILON),
            (op, FilterValue::Text(text)) => {
                let Some(cell) = record.column_text(&self.column) else {
                    return false;
                };
                let cell = cell.to_lowercase();
                let text = text.to_lowercase();
                match op {
                    Operator::Equals => cell == text,
                    Operator::NotEquals => cell != text,
                    Operator::Contains => cell.contains(&text),
                    Operator::StartsWith => cell.starts_with(&text),
                    Operator::EndsWith => cell.ends_with(&text),
                    // Ordering operators only apply to numeric values.
                    Operator::GreaterThan | Operator::LessThan => false,
                }
            }
            // Substring operators only apply to text values.
            (_, FilterValue::Number(_)) => false,
        }
    }
}

/// Canonical filter specification. Every dimension is multi-valued; an empty
/// set means "no constraint on this dimension".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Filters {
    pub period: Option<Period>,
    pub levels: Vec<EducationLevel>,
    pub types: Vec<AssistantType>,
    pub subjects: Vec<String>,
    pub chapters: Vec<String>,
    pub exercises: Vec<String>,
    pub assistants: Vec<String>,
    pub search: Option<String>,
    pub predicates: Vec<Predicate>,
}

impl Filters {
    /// Re-applies the cascading invariant after a subject or chapter change:
    /// chapters stay within reach of the selected subjects, exercises within
    /// reach of the surviving chapters.
    pub fn cascade(&mut self) {
        curriculum::normalize_cascade(&self.subjects, &mut self.chapters, &mut self.exercises);
    }
}

/// Legacy filter shape as the original console emitted it: singular and
/// plural fields coexist and `all` doubles as "no constraint". Only this
/// boundary type knows about that; `normalize` folds everything into the
/// canonical plural form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LegacyFilterInput {
    pub period: Option<Period>,
    pub level: Option<String>,
    pub levels: Vec<String>,
    #[serde(rename = "type")]
    pub assistant_type: Option<String>,
    pub types: Vec<String>,
    pub subject: Option<String>,
    pub subjects: Vec<String>,
    pub chapter: Option<String>,
    pub chapters: Vec<String>,
    pub exercise: Option<String>,
    pub exercises: Vec<String>,
    pub assistants: Vec<String>,
    #[serde(alias = "searchTerm")]
    pub search_term: Option<String>,
}

fn fold_dimension(plural: Vec<String>, singular: Option<String>) -> Vec<String> {
    let values = if plural.is_empty() {
        singular.into_iter().collect()
    } else {
        plural
    };
    values
        .into_iter()
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
        .collect()
}

impl LegacyFilterInput {
    pub fn normalize(self) -> Filters {
        let levels = fold_dimension(self.levels, self.level)
            .iter()
            .filter_map(|v| EducationLevel::from_label(v))
            .collect();
        let types = fold_dimension(self.types, self.assistant_type)
            .iter()
            .filter_map(|v| AssistantType::from_label(v))
            .collect();

        let mut filters = Filters {
            period: self.period,
            levels,
            types,
            subjects: fold_dimension(self.subjects, self.subject),
            chapters: fold_dimension(self.chapters, self.chapter),
            exercises: fold_dimension(self.exercises, self.exercise),
            assistants: self.assistants,
            search: self.search_term.filter(|s| !s.trim().is_empty()),
            predicates: Vec::new(),
        };
        filters.cascade();
        filters
    }
}

/// Dimension accessors a record exposes to the engine. `None` means the
/// record has no value on that dimension and fails any non-empty inclusion
/// filter over it.
pub trait Filterable: Clone {
    fn level(&self) -> Option<EducationLevel> {
        None
    }
    fn assistant(&self) -> Option<AssistantType> {
        None
    }
    fn display_name(&self) -> Option<&str> {
        None
    }
    fn subject(&self) -> Option<&str> {
        None
    }
    fn chapter(&self) -> Option<&str> {
        None
    }
    fn exercise(&self) -> Option<&str> {
        None
    }
    fn timestamp(&self) -> Option<NaiveDateTime> {
        None
    }
    /// Display fields the free-text search runs over.
    fn search_text(&self) -> String;
    fn column_text(&self, column: &str) -> Option<String>;
    fn column_number(&self, column: &str) -> Option<f64>;
}

fn set_allows<T: PartialEq>(set: &[T], value: Option<T>) -> bool {
    if set.is_empty() {
        return true;
    }
    match value {
        Some(v) => set.contains(&v),
        None => false,
    }
}

fn set_allows_str(set: &[String], value: Option<&str>) -> bool {
    if set.is_empty() {
        return true;
    }
    match value {
        Some(v) => set.iter().any(|s| s == v),
        None => false,
    }
}

/// Applies a filter specification to a record collection. Pure: the input is
/// never touched and the result is a fresh vector. Dimensions combine with
/// AND; values within a dimension with OR.
pub fn apply_filters<R: Filterable>(records: &[R], filters: &Filters, today: NaiveDate) -> Vec<R> {
    let range = filters.period.as_ref().map(|p| p.resolve(today));
    let search = filters
        .search
        .as_ref()
        .map(|s| s.to_lowercase())
        .filter(|s| !s.is_empty());

    records
        .iter()
        .filter(|record| {
            if let Some((start, end)) = range {
                match record.timestamp() {
                    Some(ts) => {
                        if ts < start || ts > end {
                            return false;
                        }
                    }
                    None => return false,
                }
            }
            if !set_allows(&filters.levels, record.level()) {
                return false;
            }
            if !set_allows(&filters.types, record.assistant()) {
                return false;
            }
            if !set_allows_str(&filters.subjects, record.subject()) {
                return false;
            }
            if !set_allows_str(&filters.chapters, record.chapter()) {
                return false;
            }
            if !set_allows_str(&filters.exercises, record.exercise()) {
                return false;
            }
            if !set_allows_str(&filters.assistants, record.display_name()) {
                return false;
            }
            if let Some(term) = &search {
                if !record.search_text().to_lowercase().contains(term) {
                    return false;
                }
            }
            filters.predicates.iter().all(|p| p.matches(*record))
        })
        .cloned()
        .collect()
}

impl Filterable for PerformanceRecord {
    fn level(&self) -> Option<EducationLevel> {
        Some(self.level)
    }
    fn subject(&self) -> Option<&str> {
        Some(&self.subject_name)
    }
    fn chapter(&self) -> Option<&str> {
        Some(&self.chapter_name)
    }
    fn exercise(&self) -> Option<&str> {
        Some(&self.exercise_id)
    }
    fn timestamp(&self) -> Option<NaiveDateTime> {
        Some(self.last_updated)
    }
    fn search_text(&self) -> String {
        format!(
            "{} {} {}",
            self.exercise_name, self.chapter_name, self.subject_name
        )
    }
    fn column_text(&self, column: &str) -> Option<String> {
        match column {
            "exercise_id" => Some(self.exercise_id.clone()),
            "exercise_name" => Some(self.exercise_name.clone()),
            "chapter_name" => Some(self.chapter_name.clone()),
            "subject_name" => Some(self.subject_name.clone()),
            "level" => Some(self.level.label().to_string()),
            _ => None,
        }
    }
    fn column_number(&self, column: &str) -> Option<f64> {
        match column {
            "before_correction" => Some(self.before_correction),
            "after_correction" => Some(self.after_correction),
            "improvement_percentage" => Some(self.improvement_percentage),
            "impact" => Some(self.impact),
            _ => None,
        }
    }
}

impl Filterable for SatisfactionRecord {
    fn level(&self) -> Option<EducationLevel> {
        Some(self.level)
    }
    fn assistant(&self) -> Option<AssistantType> {
        Some(self.assistant)
    }
    fn display_name(&self) -> Option<&str> {
        Some(&self.name)
    }
    fn timestamp(&self) -> Option<NaiveDateTime> {
        Some(self.recorded_at.and_time(NaiveTime::MIN))
    }
    fn search_text(&self) -> String {
        format!("{} {}", self.name, self.assistant.label())
    }
    fn column_text(&self, column: &str) -> Option<String> {
        match column {
            "name" => Some(self.name.clone()),
            "assistant" => Some(self.assistant.label().to_string()),
            "level" => Some(self.level.label().to_string()),
            _ => None,
        }
    }
    fn column_number(&self, column: &str) -> Option<f64> {
        match column {
            "satisfaction_rate" => Some(self.satisfaction_rate),
            "total_responses" => Some(self.total_responses as f64),
            "total_users" => Some(self.total_users as f64),
            "trend" => Some(self.trend),
            _ => None,
        }
    }
}

impl Filterable for FeedbackComment {
    fn level(&self) -> Option<EducationLevel> {
        self.level
    }
    fn assistant(&self) -> Option<AssistantType> {
        Some(self.assistant)
    }
    fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }
    fn chapter(&self) -> Option<&str> {
        self.chapter.as_deref()
    }
    fn exercise(&self) -> Option<&str> {
        self.exercise.as_deref()
    }
    fn timestamp(&self) -> Option<NaiveDateTime> {
        Some(self.date)
    }
    fn search_text(&self) -> String {
        format!(
            "{} {} {}",
            self.comment,
            self.assistant.label(),
            self.tags.join(" ")
        )
    }
    fn column_text(&self, column: &str) -> Option<String> {
        match column {
            "assistant" => Some(self.assistant.label().to_string()),
            "comment" => Some(self.comment.clone()),
            "level" => self.level.map(|l| l.label().to_string()),
            "subject" => self.subject.clone(),
            "chapter" => self.chapter.clone(),
            "exercise" => self.exercise.clone(),
            _ => None,
        }
    }
    fn column_number(&self, column: &str) -> Option<f64> {
        match column {
            "rating" => Some(self.rating as f64),
            _ => None,
        }
    }
}

impl Filterable for FaqEntry {
    fn search_text(&self) -> String {
        format!("{} {} {}", self.question, self.answer, self.category)
    }
    fn column_text(&self, column: &str) -> Option<String> {
        match column {
            "question" => Some(self.question.clone()),
            "answer" => Some(self.answer.clone()),
            "category" => Some(self.category.clone()),
            _ => None,
        }
    }
    fn column_number(&self, column: &str) -> Option<f64> {
        match column {
            "views" => Some(self.views as f64),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_satisfaction(
        name: &str,
        assistant: AssistantType,
        level: EducationLevel,
        rate: f64,
        recorded_at: NaiveDate,
    ) -> SatisfactionRecord {
        SatisfactionRecord {
            name: name.to_string(),
            assistant,
            level,
            satisfaction_rate: rate,
            total_responses: 120,
            total_users: 40,
            trend: 1.5,
            recorded_at,
        }
    }

    fn sample_comment(text: &str, assistant: AssistantType, rating: u8) -> FeedbackComment {
        FeedbackComment {
            id: Uuid::new_v4(),
            date: date(2025, 3, 15).and_hms_opt(10, 0, 0).unwrap(),
            assistant,
            rating,
            comment: text.to_string(),
            tags: vec!["test".to_string()],
            level: Some(EducationLevel::Ce1),
            subject: None,
            chapter: None,
            exercise: None,
        }
    }

    fn march_records() -> Vec<SatisfactionRecord> {
        (1..=31)
            .map(|day| {
                sample_satisfaction(
                    "J'apprends CE1",
                    AssistantType::Japprends,
                    EducationLevel::Ce1,
                    80.0,
                    date(2025, 3, day),
                )
            })
            .collect()
    }

    #[test]
    fn empty_filters_pass_everything() {
        let records = march_records();
        let out = apply_filters(&records, &Filters::default(), date(2025, 4, 1));
        assert_eq!(out.len(), records.len());
    }

    #[test]
    fn single_day_range_is_inclusive() {
        let records = march_records();
        let filters = Filters {
            period: Some(Period::Custom {
                start: date(2025, 3, 10),
                end: date(2025, 3, 10),
            }),
            ..Filters::default()
        };
        let out = apply_filters(&records, &filters, date(2025, 4, 1));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].recorded_at, date(2025, 3, 10));
    }

    #[test]
    fn end_date_extends_to_end_of_day() {
        let mut record = sample_comment("super", AssistantType::Accueil, 5);
        record.date = date(2025, 3, 10).and_hms_opt(18, 30, 0).unwrap();
        let filters = Filters {
            period: Some(Period::Custom {
                start: date(2025, 3, 10),
                end: date(2025, 3, 10),
            }),
            ..Filters::default()
        };
        let out = apply_filters(&[record], &filters, date(2025, 4, 1));
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn filtering_is_idempotent() {
        let records = march_records();
        let filters = Filters {
            levels: vec![EducationLevel::Ce1],
            search: Some("apprends".to_string()),
            ..Filters::default()
        };
        let today = date(2025, 4, 1);
        let once = apply_filters(&records, &filters, today);
        let twice = apply_filters(&once, &filters, today);
        assert_eq!(once.len(), twice.len());
    }

    #[test]
    fn widening_a_set_never_shrinks_the_result() {
        let records = vec![
            sample_satisfaction(
                "Accueil CP",
                AssistantType::Accueil,
                EducationLevel::Cp,
                75.0,
                date(2025, 3, 1),
            ),
            sample_satisfaction(
                "Recherche CE2",
                AssistantType::Recherche,
                EducationLevel::Ce2,
                82.0,
                date(2025, 3, 2),
            ),
        ];
        let today = date(2025, 4, 1);
        let narrow = Filters {
            levels: vec![EducationLevel::Cp],
            ..Filters::default()
        };
        let wide = Filters {
            levels: vec![EducationLevel::Cp, EducationLevel::Ce2],
            ..Filters::default()
        };
        assert!(
            apply_filters(&records, &wide, today).len()
                >= apply_filters(&records, &narrow, today).len()
        );
    }

    #[test]
    fn records_without_a_dimension_fail_its_inclusion_filter() {
        // Accueil comments carry no subject; a subject filter must drop them.
        let comment = sample_comment("pas mal", AssistantType::Accueil, 3);
        let filters = Filters {
            subjects: vec!["Mathématiques".to_string()],
            ..Filters::default()
        };
        assert!(apply_filters(&[comment], &filters, date(2025, 4, 1)).is_empty());
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let comments = vec![
            sample_comment("Très utile pour les devoirs", AssistantType::Japprends, 5),
            sample_comment("réponses trop lentes", AssistantType::Recherche, 2),
        ];
        let filters = Filters {
            search: Some("UTILE".to_string()),
            ..Filters::default()
        };
        let out = apply_filters(&comments, &filters, date(2025, 4, 1));
        assert_eq!(out.len(), 1);
        assert!(out[0].comment.contains("utile"));
    }

    #[test]
    fn numeric_predicate_filters_by_threshold() {
        let comments = vec![
            sample_comment("excellent", AssistantType::Japprends, 5),
            sample_comment("bof", AssistantType::Japprends, 2),
        ];
        let filters = Filters {
            predicates: vec![Predicate {
                column: "rating".to_string(),
                op: Operator::GreaterThan,
                value: FilterValue::Number(3.0),
            }],
            ..Filters::default()
        };
        let out = apply_filters(&comments, &filters, date(2025, 4, 1));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].rating, 5);
    }

    #[test]
    fn text_predicates_cover_all_substring_operators() {
        let comment = sample_comment("assistant formidable", AssistantType::Accueil, 4);
        let today = date(2025, 4, 1);
        let check = |op, value: &str| {
            let filters = Filters {
                predicates: vec![Predicate {
                    column: "comment".to_string(),
                    op,
                    value: FilterValue::Text(value.to_string()),
                }],
                ..Filters::default()
            };
            apply_filters(std::slice::from_ref(&comment), &filters, today).len()
        };
        assert_eq!(check(Operator::StartsWith, "assistant"), 1);
        assert_eq!(check(Operator::EndsWith, "formidable"), 1);
        assert_eq!(check(Operator::Contains, "formid"), 1);
        assert_eq!(check(Operator::Equals, "assistant formidable"), 1);
        assert_eq!(check(Operator::NotEquals, "autre chose"), 1);
        assert_eq!(check(Operator::Contains, "horrible"), 0);
    }

    #[test]
    fn unknown_predicate_column_never_matches() {
        let comment = sample_comment("ok", AssistantType::Accueil, 3);
        let filters = Filters {
            predicates: vec![Predicate {
                column: "nonexistent".to_string(),
                op: Operator::Contains,
                value: FilterValue::Text("ok".to_string()),
            }],
            ..Filters::default()
        };
        assert!(apply_filters(&[comment], &filters, date(2025, 4, 1)).is_empty());
    }

    #[test]
    fn legacy_singular_fields_fold_into_plural_sets() {
        let legacy = LegacyFilterInput {
            level: Some("CM1".to_string()),
            assistant_type: Some("Apprentissge".to_string()),
            subject: Some("Mathématiques".to_string()),
            ..LegacyFilterInput::default()
        };
        let filters = legacy.normalize();
        assert_eq!(filters.levels, vec![EducationLevel::Cm1]);
        assert_eq!(filters.types, vec![AssistantType::Japprends]);
        assert_eq!(filters.subjects, vec!["Mathématiques".to_string()]);
    }

    #[test]
    fn plural_form_takes_precedence_over_singular() {
        let legacy = LegacyFilterInput {
            level: Some("cp".to_string()),
            levels: vec!["ce1".to_string(), "ce2".to_string()],
            ..LegacyFilterInput::default()
        };
        let filters = legacy.normalize();
        assert_eq!(
            filters.levels,
            vec![EducationLevel::Ce1, EducationLevel::Ce2]
        );
    }

    #[test]
    fn all_sentinel_means_no_constraint() {
        let legacy = LegacyFilterInput {
            level: Some("all".to_string()),
            subjects: vec!["all".to_string()],
            ..LegacyFilterInput::default()
        };
        let filters = legacy.normalize();
        assert!(filters.levels.is_empty());
        assert!(filters.subjects.is_empty());
    }

    #[test]
    fn legacy_json_payload_normalizes() {
        let payload = r#"{
            "period": "last7days",
            "type": "Apprentissage",
            "levels": ["cm1", "cm2"],
            "searchTerm": "addition"
        }"#;
        let legacy: LegacyFilterInput = serde_json::from_str(payload).unwrap();
        let filters = legacy.normalize();
        assert_eq!(filters.period, Some(Period::Last7Days));
        assert_eq!(filters.types, vec![AssistantType::Japprends]);
        assert_eq!(
            filters.levels,
            vec![EducationLevel::Cm1, EducationLevel::Cm2]
        );
        assert_eq!(filters.search.as_deref(), Some("addition"));
    }

    #[test]
    fn normalize_enforces_the_cascade() {
        let legacy = LegacyFilterInput {
            subjects: vec!["Français".to_string()],
            chapters: vec![
                "Grammaire".to_string(),
                "Additions et Soustractions".to_string(),
            ],
            exercises: vec!["exercice-addition-1".to_string()],
            ..LegacyFilterInput::default()
        };
        let filters = legacy.normalize();
        assert_eq!(filters.chapters, vec!["Grammaire".to_string()]);
        assert!(filters.exercises.is_empty());
    }

    #[test]
    fn relative_periods_resolve_against_today() {
        let today = date(2025, 3, 31);
        let (start, end) = Period::Last7Days.resolve(today);
        assert_eq!(start.date(), date(2025, 3, 25));
        assert_eq!(end.date(), today);
        assert_eq!(end.time(), NaiveTime::from_hms_opt(23, 59, 59).unwrap());

        let (start, end) = Period::Yesterday.resolve(today);
        assert_eq!(start.date(), date(2025, 3, 30));
        assert_eq!(end.date(), date(2025, 3, 30));
    }
}
