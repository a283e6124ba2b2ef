//! Deterministic in-memory data source. In production this boundary would be
//! an HTTP client; here a seeded generator builds a fresh dataset per call
//! and a delayed fetch task stands in for the network.

use chrono::{Duration, NaiveDate, NaiveTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use uuid::Uuid;

use crate::aggregate::{impact, round1};
use crate::curriculum;
use crate::models::{
    AssistantType, Dataset, EducationLevel, FaqEntry, FeedbackComment, PerformanceRecord,
    SatisfactionRecord,
};

// Synthetic-data policy: accuracy never below/above these bounds so the
// improvement numbers stay plausible.
const BEFORE_CORRECTION_CAP: f64 = 75.0;
const AFTER_CORRECTION_CAP: f64 = 98.0;

const COMMENT_PHRASES: &[(&str, u8, &[&str])] = &[
    ("Très utile pour réviser avant le contrôle", 5, &["révision", "utile"]),
    ("Les explications sont claires et adaptées", 5, &["explications"]),
    ("Bonne aide mais parfois un peu lent", 3, &["lenteur"]),
    ("Je n'ai pas compris la réponse donnée", 2, &["confusion"]),
    ("Mon enfant adore travailler avec l'assistant", 4, &["parents"]),
    ("La réponse était hors sujet", 1, &["hors-sujet"]),
    ("Parfait pour les tables de multiplication", 5, &["mathématiques"]),
    ("Les exercices proposés sont trop difficiles", 2, &["difficulté"]),
];

const FAQ_ENTRIES: &[(&str, &str, &str)] = &[
    (
        "Comment réinitialiser le mot de passe d'un élève ?",
        "Ouvrez la fiche de l'élève puis choisissez « Réinitialiser le mot de passe ».",
        "Comptes",
    ),
    (
        "L'assistant peut-il être limité à certaines matières ?",
        "Oui, la restriction se configure par classe dans les réglages de l'assistant.",
        "Configuration",
    ),
    (
        "Comment exporter les statistiques de satisfaction ?",
        "Chaque tableau propose un export CSV depuis son menu d'actions.",
        "Exports",
    ),
    (
        "Que signifie le taux d'impact d'une correction ?",
        "C'est l'amélioration relative de la précision après le dernier réentraînement.",
        "Statistiques",
    ),
    (
        "Les conversations des élèves sont-elles conservées ?",
        "Seuls les commentaires notés sont conservés, de façon anonymisée.",
        "Confidentialité",
    ),
    (
        "Comment signaler une réponse incorrecte de l'assistant ?",
        "Utilisez le bouton de signalement sous la réponse concernée.",
        "Support",
    ),
];

fn day_within_window(rng: &mut StdRng, today: NaiveDate) -> NaiveDate {
    today - Duration::days(rng.gen_range(0..30))
}

fn generate_satisfaction(rng: &mut StdRng, today: NaiveDate) -> Vec<SatisfactionRecord> {
    let mut records = Vec::new();
    for assistant in AssistantType::ALL {
        for level in EducationLevel::ALL {
            let rate = round1(rng.gen_range(55.0..97.0));
            let responses = rng.gen_range(40..400);
            records.push(SatisfactionRecord {
                name: format!("{} {}", assistant.label(), level.label().to_uppercase()),
                assistant,
                level,
                satisfaction_rate: rate,
                total_responses: responses,
                total_users: responses / rng.gen_range(2..5),
                trend: round1(rng.gen_range(-5.0..5.0)),
                recorded_at: day_within_window(rng, today),
            });
        }
    }
    records
}

fn generate_performance(rng: &mut StdRng, today: NaiveDate) -> Vec<PerformanceRecord> {
    let mut records = Vec::new();
    for (subject_id, subject_name) in curriculum::subjects() {
        for chapter in curriculum::chapters_for_subject(subject_name) {
            for exercise in curriculum::exercises_for_chapter(subject_name, chapter.name) {
                let before = round1(rng.gen_range(35.0..BEFORE_CORRECTION_CAP));
                let after = round1(rng.gen_range(before..AFTER_CORRECTION_CAP));
                let level = EducationLevel::ALL[rng.gen_range(0..EducationLevel::ALL.len())];
                records.push(PerformanceRecord {
                    exercise_id: exercise.id.to_string(),
                    exercise_name: exercise.name.to_string(),
                    chapter_id: chapter.id.to_string(),
                    chapter_name: chapter.name.to_string(),
                    subject_id: subject_id.to_string(),
                    subject_name: subject_name.to_string(),
                    level,
                    before_correction: before,
                    after_correction: after,
                    improvement_percentage: round1(after - before),
                    impact: impact(before, after),
                    last_updated: day_within_window(rng, today)
                        .and_time(NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN)),
                });
            }
        }
    }
    records
}

fn generate_comments(rng: &mut StdRng, today: NaiveDate) -> Vec<FeedbackComment> {
    let subjects = curriculum::subjects();
    let mut comments = Vec::new();

    for _ in 0..60 {
        let (text, rating, tags) = COMMENT_PHRASES[rng.gen_range(0..COMMENT_PHRASES.len())];
        let assistant = AssistantType::ALL[rng.gen_range(0..AssistantType::ALL.len())];

        // Only the learning assistant runs inside a curriculum context.
        let (level, subject, chapter, exercise) = if assistant == AssistantType::Japprends {
            let (_, subject_name) = subjects[rng.gen_range(0..subjects.len())];
            let chapters = curriculum::chapters_for_subject(subject_name);
            let chapter = chapters[rng.gen_range(0..chapters.len())];
            let exercises = curriculum::exercises_for_chapter(subject_name, chapter.name);
            let exercise = exercises[rng.gen_range(0..exercises.len())];
            (
                Some(EducationLevel::ALL[rng.gen_range(0..EducationLevel::ALL.len())]),
                Some(subject_name.to_string()),
                Some(chapter.name.to_string()),
                Some(exercise.id.to_string()),
            )
        } else {
            (None, None, None, None)
        };

        comments.push(FeedbackComment {
            id: Uuid::new_v4(),
            date: day_within_window(rng, today).and_time(
                NaiveTime::from_hms_opt(rng.gen_range(8..18), rng.gen_range(0..60), 0)
                    .unwrap_or(NaiveTime::MIN),
            ),
            assistant,
            rating,
            comment: text.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            level,
            subject,
            chapter,
            exercise,
        });
    }
    comments
}

fn generate_faq(rng: &mut StdRng) -> Vec<FaqEntry> {
    FAQ_ENTRIES
        .iter()
        .map(|(question, answer, category)| FaqEntry {
            question: question.to_string(),
            answer: answer.to_string(),
            category: category.to_string(),
            views: rng.gen_range(10..800),
        })
        .collect()
}

/// Builds a complete dataset from the fixed tables plus seeded variance.
/// Same seed and anchor date, same dataset (comment ids aside).
pub fn generate_dataset(seed: u64, today: NaiveDate) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    Dataset {
        satisfaction: generate_satisfaction(&mut rng, today),
        performance: generate_performance(&mut rng, today),
        comments: generate_comments(&mut rng, today),
        faq: generate_faq(&mut rng),
    }
}

/// An in-flight simulated fetch. Dropping the handle does not cancel the
/// task; call [`FetchHandle::cancel`] before replacing it so rapid filter
/// changes cannot pile up timers.
pub struct FetchHandle {
    handle: tokio::task::JoinHandle<Dataset>,
}

impl FetchHandle {
    pub fn cancel(&self) {
        self.handle.abort();
    }

    /// Resolves to `None` if the fetch was cancelled.
    pub async fn wait(self) -> Option<Dataset> {
        self.handle.await.ok()
    }
}

/// Simulates the console's network fetch: a fixed delay, then a fresh
/// dataset.
pub fn spawn_fetch(delay: std::time::Duration, seed: u64, today: NaiveDate) -> FetchHandle {
    FetchHandle {
        handle: tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            generate_dataset(seed, today)
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn anchor() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 31).unwrap()
    }

    #[test]
    fn same_seed_generates_identical_data() {
        let a = generate_dataset(42, anchor());
        let b = generate_dataset(42, anchor());
        assert_eq!(a.satisfaction.len(), b.satisfaction.len());
        assert_eq!(
            a.satisfaction[0].satisfaction_rate,
            b.satisfaction[0].satisfaction_rate
        );
        assert_eq!(
            a.performance[0].before_correction,
            b.performance[0].before_correction
        );
    }

    #[test]
    fn generator_respects_accuracy_caps() {
        let dataset = generate_dataset(7, anchor());
        for record in &dataset.performance {
            assert!(record.before_correction <= BEFORE_CORRECTION_CAP);
            assert!(record.after_correction <= AFTER_CORRECTION_CAP);
            assert!(record.after_correction >= record.before_correction);
        }
    }

    #[test]
    fn curriculum_comments_carry_a_full_context() {
        let dataset = generate_dataset(3, anchor());
        for comment in &dataset.comments {
            if comment.assistant == AssistantType::Japprends {
                assert!(comment.subject.is_some());
                assert!(comment.chapter.is_some());
                assert!(comment.exercise.is_some());
            } else {
                assert!(comment.subject.is_none());
                assert!(comment.exercise.is_none());
            }
        }
    }

    #[tokio::test]
    async fn fetch_resolves_after_the_delay() {
        let handle = spawn_fetch(Duration::from_millis(5), 42, anchor());
        let dataset = handle.wait().await;
        assert!(dataset.is_some_and(|d| !d.performance.is_empty()));
    }

    #[tokio::test]
    async fn cancelled_fetch_resolves_to_none() {
        let handle = spawn_fetch(Duration::from_secs(60), 42, anchor());
        handle.cancel();
        assert!(handle.wait().await.is_none());
    }
}
