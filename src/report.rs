use std::fmt::Write;

use chrono::NaiveDate;

use crate::aggregate;
use crate::filters::{apply_filters, Filters};
use crate::models::Dataset;

/// Markdown dashboard snapshot: satisfaction overview, performance averages,
/// top movers and recent comments for the filtered window.
pub fn build_report(dataset: &Dataset, filters: &Filters, today: NaiveDate) -> String {
    let satisfaction = apply_filters(&dataset.satisfaction, filters, today);
    let performance = apply_filters(&dataset.performance, filters, today);
    let comments = apply_filters(&dataset.comments, filters, today);

    let mut output = String::new();

    let _ = writeln!(output, "# Tableau de bord assistant");
    let _ = writeln!(output, "Generated on {today}");
    let _ = writeln!(output);
    let _ = writeln!(output, "## Satisfaction par assistant");

    let summaries = aggregate::satisfaction_by_assistant(&satisfaction);
    if summaries.is_empty() {
        let _ = writeln!(output, "No satisfaction data for this window.");
    } else {
        for summary in &summaries {
            let _ = writeln!(
                output,
                "- {}: {:.1}% over {} responses ({} records)",
                summary.key, summary.satisfaction_rate, summary.total_responses, summary.count
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Performance par niveau");

    let by_level = aggregate::average_by_level(&performance);
    if by_level.is_empty() {
        let _ = writeln!(output, "No performance data for this window.");
    } else {
        for group in &by_level {
            let _ = writeln!(
                output,
                "- {}: {:.1} -> {:.1} (improvement {:.1}%, {} exercises)",
                group.key,
                group.before_correction,
                group.after_correction,
                group.improvement,
                group.count
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Meilleures progressions");

    let top = aggregate::top_by_impact(&performance, 10);
    if top.is_empty() {
        let _ = writeln!(output, "No corrections recorded for this window.");
    } else {
        for record in &top {
            let _ = writeln!(
                output,
                "- {} ({}, {}) impact {:.2}%",
                record.exercise_name, record.subject_name, record.level.label(), record.impact
            );
        }
    }

    let mut recent = comments;
    recent.sort_by(|a, b| b.date.cmp(&a.date));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Derniers commentaires");

    if recent.is_empty() {
        let _ = writeln!(output, "No comments for this window.");
    } else {
        for comment in recent.iter().take(5) {
            let _ = writeln!(
                output,
                "- [{}/5] {} ({}, {})",
                comment.rating,
                comment.comment,
                comment.assistant.label(),
                comment.date.date()
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::generate_dataset;

    fn anchor() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 31).unwrap()
    }

    #[test]
    fn report_contains_all_sections() {
        let dataset = generate_dataset(42, anchor());
        let report = build_report(&dataset, &Filters::default(), anchor());
        assert!(report.contains("# Tableau de bord assistant"));
        assert!(report.contains("## Satisfaction par assistant"));
        assert!(report.contains("## Performance par niveau"));
        assert!(report.contains("## Meilleures progressions"));
        assert!(report.contains("## Derniers commentaires"));
    }

    #[test]
    fn empty_window_renders_empty_states() {
        let dataset = Dataset {
            satisfaction: Vec::new(),
            performance: Vec::new(),
            comments: Vec::new(),
            faq: Vec::new(),
        };
        let report = build_report(&dataset, &Filters::default(), anchor());
        assert!(report.contains("No satisfaction data for this window."));
        assert!(report.contains("No performance data for this window."));
        assert!(report.contains("No comments for this window."));
    }
}
