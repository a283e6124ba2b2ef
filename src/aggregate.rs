use std::collections::HashMap;

use crate::models::{GroupAverage, PerformanceRecord, SatisfactionRecord, SatisfactionSummary, Series};

/// Comparison charts stay readable up to this many entries; larger sets are
/// truncated to the top entries by ranking key instead of erroring.
pub const MAX_COMPARISON_ENTRIES: usize = 10;

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Relative improvement in percent. A zero baseline yields 0, never NaN.
pub fn impact(before: f64, after: f64) -> f64 {
    if before == 0.0 {
        return 0.0;
    }
    round2((after - before) / before * 100.0)
}

/// Sort key for evolution series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesKey {
    ExerciseId,
    Level,
}

/// Mean before/after/improvement per group key, one decimal place. Groups
/// with no matching records are omitted; output is sorted by key.
pub fn average_by<F>(records: &[PerformanceRecord], key: F) -> Vec<GroupAverage>
where
    F: Fn(&PerformanceRecord) -> String,
{
    let mut groups: HashMap<String, (f64, f64, f64, usize)> = HashMap::new();

    for record in records {
        let entry = groups.entry(key(record)).or_insert((0.0, 0.0, 0.0, 0));
        entry.0 += record.before_correction;
        entry.1 += record.after_correction;
        entry.2 += record.improvement_percentage;
        entry.3 += 1;
    }

    let mut averages: Vec<GroupAverage> = groups
        .into_iter()
        .map(|(key, (before, after, improvement, count))| {
            let n = count as f64;
            GroupAverage {
                key,
                before_correction: round1(before / n),
                after_correction: round1(after / n),
                improvement: round1(improvement / n),
                count,
            }
        })
        .collect();

    averages.sort_by(|a, b| a.key.cmp(&b.key));
    averages
}

pub fn average_by_level(records: &[PerformanceRecord]) -> Vec<GroupAverage> {
    average_by(records, |r| r.level.label().to_string())
}

pub fn average_by_subject(records: &[PerformanceRecord]) -> Vec<GroupAverage> {
    average_by(records, |r| r.subject_name.clone())
}

pub fn average_by_chapter(records: &[PerformanceRecord]) -> Vec<GroupAverage> {
    average_by(records, |r| r.chapter_name.clone())
}

/// Records ranked by impact, descending, truncated to `n`. The sort is
/// stable so tied records keep their original relative order.
pub fn top_by_impact(records: &[PerformanceRecord], n: usize) -> Vec<PerformanceRecord> {
    let mut ranked = records.to_vec();
    ranked.sort_by(|a, b| {
        b.impact
            .partial_cmp(&a.impact)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked.truncate(n);
    ranked
}

/// Parallel label/value arrays for the evolution chart, sorted by the
/// requested key.
pub fn build_series(records: &[PerformanceRecord], key: SeriesKey) -> Series {
    let mut ordered = records.to_vec();
    match key {
        SeriesKey::ExerciseId => ordered.sort_by(|a, b| a.exercise_id.cmp(&b.exercise_id)),
        SeriesKey::Level => ordered.sort_by(|a, b| a.level.label().cmp(b.level.label())),
    }

    Series {
        labels: ordered.iter().map(|r| r.exercise_name.clone()).collect(),
        before_correction: ordered.iter().map(|r| r.before_correction).collect(),
        after_correction: ordered.iter().map(|r| r.after_correction).collect(),
        improvement: ordered.iter().map(|r| r.improvement_percentage).collect(),
    }
}

/// Mean satisfaction rate per assistant type, one decimal place, sorted by
/// key. Empty input yields an empty list.
pub fn satisfaction_by_assistant(records: &[SatisfactionRecord]) -> Vec<SatisfactionSummary> {
    let mut groups: HashMap<String, (f64, u32, usize)> = HashMap::new();

    for record in records {
        let entry = groups
            .entry(record.assistant.label().to_string())
            .or_insert((0.0, 0, 0));
        entry.0 += record.satisfaction_rate;
        entry.1 += record.total_responses;
        entry.2 += 1;
    }

    let mut summaries: Vec<SatisfactionSummary> = groups
        .into_iter()
        .map(|(key, (rate, responses, count))| SatisfactionSummary {
            key,
            satisfaction_rate: if count == 0 {
                0.0
            } else {
                round1(rate / count as f64)
            },
            total_responses: responses,
            count,
        })
        .collect();

    summaries.sort_by(|a, b| a.key.cmp(&b.key));
    summaries
}

/// Satisfaction comparison view: stable descending sort on rate, capped at
/// [`MAX_COMPARISON_ENTRIES`].
pub fn satisfaction_leaderboard(records: &[SatisfactionRecord]) -> Vec<SatisfactionRecord> {
    let mut ranked = records.to_vec();
    ranked.sort_by(|a, b| {
        b.satisfaction_rate
            .partial_cmp(&a.satisfaction_rate)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked.truncate(MAX_COMPARISON_ENTRIES);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AssistantType, EducationLevel};
    use chrono::NaiveDate;

    fn perf(exercise_id: &str, level: EducationLevel, before: f64, after: f64) -> PerformanceRecord {
        PerformanceRecord {
            exercise_id: exercise_id.to_string(),
            exercise_name: format!("Exercice {exercise_id}"),
            chapter_id: "additions-soustractions".to_string(),
            chapter_name: "Additions et Soustractions".to_string(),
            subject_id: "mathematiques".to_string(),
            subject_name: "Mathématiques".to_string(),
            level,
            before_correction: before,
            after_correction: after,
            improvement_percentage: round1(after - before),
            impact: impact(before, after),
            last_updated: NaiveDate::from_ymd_opt(2025, 3, 1)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap(),
        }
    }

    fn sat(name: &str, rate: f64) -> SatisfactionRecord {
        SatisfactionRecord {
            name: name.to_string(),
            assistant: AssistantType::Japprends,
            level: EducationLevel::Cp,
            satisfaction_rate: rate,
            total_responses: 50,
            total_users: 20,
            trend: 0.0,
            recorded_at: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
        }
    }

    #[test]
    fn impact_of_60_to_80_is_33_33() {
        assert_eq!(impact(60.0, 80.0), 33.33);
    }

    #[test]
    fn impact_with_zero_baseline_is_zero() {
        assert_eq!(impact(0.0, 50.0), 0.0);
    }

    #[test]
    fn group_average_of_known_values() {
        let records = vec![
            perf("a", EducationLevel::Cp, 60.0, 70.0),
            perf("b", EducationLevel::Cp, 70.0, 80.0),
            perf("c", EducationLevel::Cp, 80.0, 90.0),
        ];
        let averages = average_by_level(&records);
        assert_eq!(averages.len(), 1);
        assert_eq!(averages[0].key, "cp");
        assert_eq!(averages[0].before_correction, 70.0);
        assert_eq!(averages[0].after_correction, 80.0);
        assert_eq!(averages[0].count, 3);
    }

    #[test]
    fn empty_groups_are_omitted_not_zero_filled() {
        let records = vec![perf("a", EducationLevel::Cm2, 50.0, 60.0)];
        let averages = average_by_level(&records);
        assert_eq!(averages.len(), 1);
        assert_eq!(averages[0].key, "cm2");
    }

    #[test]
    fn empty_input_aggregates_to_empty_without_nan() {
        assert!(average_by_level(&[]).is_empty());
        assert!(satisfaction_by_assistant(&[]).is_empty());
    }

    #[test]
    fn top_by_impact_is_stable_on_ties() {
        let records = vec![
            perf("first", EducationLevel::Cp, 100.0, 110.0), // impact 10
            perf("tied-a", EducationLevel::Cp, 100.0, 130.0), // impact 30
            perf("tied-b", EducationLevel::Cp, 50.0, 65.0),  // impact 30
            perf("last", EducationLevel::Cp, 100.0, 105.0),  // impact 5
        ];
        let top = top_by_impact(&records, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].exercise_id, "tied-a");
        assert_eq!(top[1].exercise_id, "tied-b");
    }

    #[test]
    fn series_is_sorted_by_exercise_id() {
        let records = vec![
            perf("z-exo", EducationLevel::Cp, 40.0, 50.0),
            perf("a-exo", EducationLevel::Cp, 60.0, 70.0),
        ];
        let series = build_series(&records, SeriesKey::ExerciseId);
        assert_eq!(series.labels, vec!["Exercice a-exo", "Exercice z-exo"]);
        assert_eq!(series.before_correction, vec![60.0, 40.0]);
        assert_eq!(series.after_correction, vec![70.0, 50.0]);
    }

    #[test]
    fn leaderboard_truncates_oversized_comparison_sets() {
        let records: Vec<SatisfactionRecord> = (0..15)
            .map(|i| sat(&format!("assistant-{i}"), 60.0 + i as f64))
            .collect();
        let board = satisfaction_leaderboard(&records);
        assert_eq!(board.len(), MAX_COMPARISON_ENTRIES);
        assert_eq!(board[0].satisfaction_rate, 74.0);
        // Deterministic: same input, same truncation.
        assert_eq!(
            satisfaction_leaderboard(&records)[9].name,
            board[9].name
        );
    }

    #[test]
    fn averages_round_to_one_decimal() {
        let records = vec![
            perf("a", EducationLevel::Cp, 61.0, 70.0),
            perf("b", EducationLevel::Cp, 62.0, 71.0),
            perf("c", EducationLevel::Cp, 62.0, 71.0),
        ];
        let averages = average_by_level(&records);
        assert_eq!(averages[0].before_correction, 61.7);
    }
}
