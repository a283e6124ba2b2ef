use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};

mod aggregate;
mod curriculum;
mod export;
mod filters;
mod models;
mod report;
mod source;

use filters::{Filters, LegacyFilterInput, Period};

#[derive(Parser)]
#[command(name = "assistant-insights")]
#[command(about = "Analytics console for the classroom assistant", long_about = None)]
struct Cli {
    /// Seed for the simulated data source
    #[arg(long, global = true, default_value_t = 42)]
    seed: u64,
    /// Simulated fetch latency in milliseconds
    #[arg(long, global = true, default_value_t = 200)]
    fetch_delay_ms: u64,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct FilterArgs {
    /// Education level (repeatable); `all` means no constraint
    #[arg(long = "level")]
    levels: Vec<String>,
    /// Assistant type (repeatable): accueil, recherche, japprends
    #[arg(long = "type")]
    types: Vec<String>,
    /// Subject (repeatable)
    #[arg(long = "subject")]
    subjects: Vec<String>,
    /// Chapter (repeatable); must belong to a selected subject
    #[arg(long = "chapter")]
    chapters: Vec<String>,
    /// Exercise id (repeatable); must belong to a selected chapter
    #[arg(long = "exercise")]
    exercises: Vec<String>,
    /// Assistant display name (repeatable)
    #[arg(long = "assistant")]
    assistants: Vec<String>,
    /// Case-insensitive free-text search
    #[arg(long)]
    search: Option<String>,
    /// Named window: today, yesterday, last7days, last30days
    #[arg(long, value_parser = parse_period, conflicts_with_all = ["start", "end"])]
    period: Option<Period>,
    /// Custom window start (YYYY-MM-DD)
    #[arg(long, requires = "end")]
    start: Option<NaiveDate>,
    /// Custom window end (YYYY-MM-DD), inclusive
    #[arg(long, requires = "start")]
    end: Option<NaiveDate>,
}

fn parse_period(value: &str) -> Result<Period, String> {
    match value.to_ascii_lowercase().as_str() {
        "today" => Ok(Period::Today),
        "yesterday" => Ok(Period::Yesterday),
        "last7days" => Ok(Period::Last7Days),
        "last30days" => Ok(Period::Last30Days),
        other => Err(format!(
            "unknown period `{other}` (expected today, yesterday, last7days or last30days)"
        )),
    }
}

impl FilterArgs {
    fn into_filters(self) -> Filters {
        let period = match (self.period, self.start, self.end) {
            (Some(period), _, _) => Some(period),
            (None, Some(start), Some(end)) => Some(Period::Custom { start, end }),
            _ => None,
        };
        LegacyFilterInput {
            period,
            levels: self.levels,
            types: self.types,
            subjects: self.subjects,
            chapters: self.chapters,
            exercises: self.exercises,
            assistants: self.assistants,
            search_term: self.search,
            ..LegacyFilterInput::default()
        }
        .normalize()
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum GroupKey {
    Level,
    Subject,
    Chapter,
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportView {
    Satisfaction,
    Performance,
    Comments,
    Faq,
}

#[derive(Subcommand)]
enum Commands {
    /// Satisfaction leaderboard and per-assistant averages
    Satisfaction {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
    /// Correction performance averages and top movers
    Performance {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, value_enum, default_value_t = GroupKey::Level)]
        group_by: GroupKey,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
    /// Browse rated feedback comments
    Comments {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
    /// Browse FAQ content
    Faq {
        /// Case-insensitive search over question, answer and category
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown dashboard report
    Report {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Export a filtered view as CSV
    Export {
        #[arg(value_enum)]
        view: ExportView,
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, default_value = "export.csv")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let today = Utc::now().date_naive();

    let fetch = source::spawn_fetch(
        Duration::from_millis(cli.fetch_delay_ms),
        cli.seed,
        today,
    );
    let dataset = fetch.wait().await.context("data fetch was cancelled")?;

    match cli.command {
        Commands::Satisfaction {
            filters,
            limit,
            json,
        } => {
            let filters = filters.into_filters();
            let records = filters::apply_filters(&dataset.satisfaction, &filters, today);
            let board = aggregate::satisfaction_leaderboard(&records);
            let summaries = aggregate::satisfaction_by_assistant(&records);

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "leaderboard": board,
                        "by_assistant": summaries,
                    }))?
                );
                return Ok(());
            }

            if board.is_empty() {
                println!("No satisfaction data for these filters.");
                return Ok(());
            }
            println!("Top assistants by satisfaction:");
            for record in board.iter().take(limit) {
                println!(
                    "- {} ({}) {:.1}% across {} responses, trend {:+.1}",
                    record.name,
                    record.level.label(),
                    record.satisfaction_rate,
                    record.total_responses,
                    record.trend
                );
            }
            println!();
            println!("Average by assistant:");
            for summary in &summaries {
                println!(
                    "- {}: {:.1}% ({} records)",
                    summary.key, summary.satisfaction_rate, summary.count
                );
            }
        }
        Commands::Performance {
            filters,
            group_by,
            limit,
            json,
        } => {
            let filters = filters.into_filters();
            let records = filters::apply_filters(&dataset.performance, &filters, today);
            let averages = match group_by {
                GroupKey::Level => aggregate::average_by_level(&records),
                GroupKey::Subject => aggregate::average_by_subject(&records),
                GroupKey::Chapter => aggregate::average_by_chapter(&records),
            };
            let top = aggregate::top_by_impact(&records, limit);

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "averages": averages,
                        "top_by_impact": top,
                    }))?
                );
                return Ok(());
            }

            if averages.is_empty() {
                println!("No performance data for these filters.");
                return Ok(());
            }
            println!("Correction averages:");
            for group in &averages {
                println!(
                    "- {}: {:.1} -> {:.1} (improvement {:.1}%, {} exercises)",
                    group.key,
                    group.before_correction,
                    group.after_correction,
                    group.improvement,
                    group.count
                );
            }
            println!();
            println!("Top exercises by impact:");
            for record in &top {
                println!(
                    "- {} ({}, {}) impact {:.2}%",
                    record.exercise_name,
                    record.subject_name,
                    record.level.label(),
                    record.impact
                );
            }
        }
        Commands::Comments {
            filters,
            limit,
            json,
        } => {
            let filters = filters.into_filters();
            let mut records = filters::apply_filters(&dataset.comments, &filters, today);
            records.sort_by(|a, b| b.date.cmp(&a.date));
            records.truncate(limit);

            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
                return Ok(());
            }

            if records.is_empty() {
                println!("No comments for these filters.");
                return Ok(());
            }
            for comment in &records {
                let context = match (&comment.subject, &comment.chapter) {
                    (Some(subject), Some(chapter)) => format!("{subject} / {chapter}"),
                    _ => "hors programme".to_string(),
                };
                println!(
                    "- [{}/5] {} ({}, {}, {})",
                    comment.rating,
                    comment.comment,
                    comment.assistant.label(),
                    context,
                    comment.date.date()
                );
            }
        }
        Commands::Faq { search, json } => {
            let filters = Filters {
                search,
                ..Filters::default()
            };
            let entries = filters::apply_filters(&dataset.faq, &filters, today);

            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
                return Ok(());
            }

            if entries.is_empty() {
                println!("No FAQ entries match this search.");
                return Ok(());
            }
            for entry in &entries {
                println!("[{}] {} ({} views)", entry.category, entry.question, entry.views);
                println!("    {}", entry.answer);
            }
        }
        Commands::Report { filters, out } => {
            let filters = filters.into_filters();
            let report = report::build_report(&dataset, &filters, today);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Export { view, filters, out } => {
            let filters = filters.into_filters();
            let table = match view {
                ExportView::Satisfaction => export::table_for(
                    &filters::apply_filters(&dataset.satisfaction, &filters, today),
                    &[
                        "name",
                        "assistant",
                        "level",
                        "satisfaction_rate",
                        "total_responses",
                        "total_users",
                    ],
                ),
                ExportView::Performance => export::table_for(
                    &filters::apply_filters(&dataset.performance, &filters, today),
                    &[
                        "exercise_id",
                        "exercise_name",
                        "chapter_name",
                        "subject_name",
                        "level",
                        "before_correction",
                        "after_correction",
                        "improvement_percentage",
                        "impact",
                    ],
                ),
                ExportView::Comments => export::table_for(
                    &filters::apply_filters(&dataset.comments, &filters, today),
                    &["assistant", "rating", "comment", "level", "subject", "chapter"],
                ),
                ExportView::Faq => export::table_for(
                    &filters::apply_filters(&dataset.faq, &filters, today),
                    &["category", "question", "answer", "views"],
                ),
            };
            let csv_text = export::to_csv(&table)?;
            std::fs::write(&out, csv_text)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Exported {} rows to {}.", table.rows.len(), out.display());
        }
    }

    Ok(())
}
