//! Static Subject -> Chapter -> Exercise index backing the cascading
//! selectors. Unknown keys resolve to empty results, never errors.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chapter {
    pub id: &'static str,
    pub name: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exercise {
    pub id: &'static str,
    pub name: &'static str,
}

struct ChapterEntry {
    id: &'static str,
    name: &'static str,
    exercises: &'static [Exercise],
}

struct SubjectEntry {
    id: &'static str,
    name: &'static str,
    chapters: &'static [ChapterEntry],
}

macro_rules! ex {
    ($id:literal, $name:literal) => {
        Exercise {
            id: $id,
            name: $name,
        }
    };
}

const CURRICULUM: &[SubjectEntry] = &[
    SubjectEntry {
        id: "mathematiques",
        name: "Mathématiques",
        chapters: &[
            ChapterEntry {
                id: "additions-soustractions",
                name: "Additions et Soustractions",
                exercises: &[
                    ex!("exercice-addition-1", "Additions simples"),
                    ex!("exercice-addition-2", "Additions à retenue"),
                    ex!("exercice-soustraction-1", "Soustractions simples"),
                ],
            },
            ChapterEntry {
                id: "multiplications-divisions",
                name: "Multiplications et Divisions",
                exercises: &[
                    ex!("exercice-multiplication-1", "Tables de multiplication"),
                    ex!("exercice-multiplication-2", "Multiplications posées"),
                    ex!("exercice-division-1", "Divisions simples"),
                ],
            },
            ChapterEntry {
                id: "geometrie",
                name: "Géométrie",
                exercises: &[
                    ex!("exercice-geometrie-1", "Reconnaître les figures"),
                    ex!("exercice-geometrie-2", "Tracer des segments"),
                    ex!("exercice-geometrie-3", "Symétrie axiale"),
                ],
            },
        ],
    },
    SubjectEntry {
        id: "francais",
        name: "Français",
        chapters: &[
            ChapterEntry {
                id: "grammaire",
                name: "Grammaire",
                exercises: &[
                    ex!("exercice-grammaire-1", "Nature des mots"),
                    ex!("exercice-grammaire-2", "Accords dans le groupe nominal"),
                ],
            },
            ChapterEntry {
                id: "conjugaison",
                name: "Conjugaison",
                exercises: &[
                    ex!("exercice-conjugaison-1", "Présent de l'indicatif"),
                    ex!("exercice-conjugaison-2", "Futur simple"),
                    ex!("exercice-conjugaison-3", "Imparfait"),
                ],
            },
            ChapterEntry {
                id: "orthographe",
                name: "Orthographe",
                exercises: &[
                    ex!("exercice-orthographe-1", "Les homophones"),
                    ex!("exercice-orthographe-2", "Dictée préparée"),
                ],
            },
        ],
    },
    SubjectEntry {
        id: "histoire",
        name: "Histoire",
        chapters: &[
            ChapterEntry {
                id: "prehistoire",
                name: "La Préhistoire",
                exercises: &[
                    ex!("exercice-prehistoire-1", "Les premiers hommes"),
                    ex!("exercice-prehistoire-2", "L'art pariétal"),
                ],
            },
            ChapterEntry {
                id: "moyen-age",
                name: "Le Moyen Âge",
                exercises: &[
                    ex!("exercice-moyen-age-1", "Seigneurs et châteaux forts"),
                    ex!("exercice-moyen-age-2", "La vie des paysans"),
                ],
            },
            ChapterEntry {
                id: "revolution",
                name: "La Révolution française",
                exercises: &[
                    ex!("exercice-revolution-1", "1789 et la prise de la Bastille"),
                    ex!("exercice-revolution-2", "La Déclaration des droits"),
                ],
            },
        ],
    },
    SubjectEntry {
        id: "geographie",
        name: "Géographie",
        chapters: &[
            ChapterEntry {
                id: "continents",
                name: "Les continents et les océans",
                exercises: &[
                    ex!("exercice-continents-1", "Placer les continents"),
                    ex!("exercice-continents-2", "Les grands océans"),
                ],
            },
            ChapterEntry {
                id: "la-france",
                name: "La France",
                exercises: &[
                    ex!("exercice-france-1", "Les fleuves français"),
                    ex!("exercice-france-2", "Régions et reliefs"),
                ],
            },
            ChapterEntry {
                id: "climats",
                name: "Les climats",
                exercises: &[
                    ex!("exercice-climats-1", "Lire un climatogramme"),
                    ex!("exercice-climats-2", "Zones climatiques"),
                ],
            },
        ],
    },
    SubjectEntry {
        id: "anglais",
        name: "Anglais",
        chapters: &[
            ChapterEntry {
                id: "vocabulaire",
                name: "Vocabulaire de base",
                exercises: &[
                    ex!("exercice-anglais-vocab-1", "Les animaux"),
                    ex!("exercice-anglais-vocab-2", "La famille"),
                ],
            },
            ChapterEntry {
                id: "nombres-couleurs",
                name: "Les nombres et les couleurs",
                exercises: &[
                    ex!("exercice-anglais-nombres-1", "Compter jusqu'à 20"),
                    ex!("exercice-anglais-couleurs-1", "Nommer les couleurs"),
                ],
            },
            ChapterEntry {
                id: "se-presenter",
                name: "Se présenter",
                exercises: &[
                    ex!("exercice-anglais-presentation-1", "Hello, my name is"),
                    ex!("exercice-anglais-presentation-2", "Questions simples"),
                ],
            },
        ],
    },
];

/// (id, name) pairs for every subject, in curriculum order.
pub fn subjects() -> Vec<(&'static str, &'static str)> {
    CURRICULUM.iter().map(|s| (s.id, s.name)).collect()
}

fn find_subject(subject: &str) -> Option<&'static SubjectEntry> {
    CURRICULUM.iter().find(|s| s.name == subject || s.id == subject)
}

pub fn chapters_for_subject(subject: &str) -> Vec<Chapter> {
    find_subject(subject)
        .map(|s| {
            s.chapters
                .iter()
                .map(|c| Chapter { id: c.id, name: c.name })
                .collect()
        })
        .unwrap_or_default()
}

/// Deduplicated union of chapters across the given subjects, in curriculum
/// order. Empty input yields an empty set.
pub fn chapters_for_subjects(subjects: &[String]) -> Vec<Chapter> {
    let mut chapters = Vec::new();
    for subject in subjects {
        for chapter in chapters_for_subject(subject) {
            if !chapters.contains(&chapter) {
                chapters.push(chapter);
            }
        }
    }
    chapters
}

pub fn exercises_for_chapter(subject: &str, chapter: &str) -> Vec<Exercise> {
    find_subject(subject)
        .and_then(|s| {
            s.chapters
                .iter()
                .find(|c| c.name == chapter || c.id == chapter)
        })
        .map(|c| c.exercises.to_vec())
        .unwrap_or_default()
}

/// For every subject, intersect its chapters with the requested set and union
/// the exercises of the matches.
pub fn exercises_for_chapters(subjects: &[String], chapters: &[String]) -> Vec<Exercise> {
    let mut exercises = Vec::new();
    for subject in subjects {
        for chapter in chapters {
            for exercise in exercises_for_chapter(subject, chapter) {
                if !exercises.contains(&exercise) {
                    exercises.push(exercise);
                }
            }
        }
    }
    exercises
}

/// Cascading invalidation: drops chapters no longer reachable from the
/// selected subjects, then exercises no longer reachable from the surviving
/// chapters. Deselecting a subject clears its dependent selections.
pub fn normalize_cascade(
    subjects: &[String],
    chapters: &mut Vec<String>,
    exercises: &mut Vec<String>,
) {
    let legal_chapters = chapters_for_subjects(subjects);
    chapters.retain(|name| legal_chapters.iter().any(|c| c.name == name || c.id == name));

    let legal_exercises = exercises_for_chapters(subjects, chapters);
    exercises.retain(|id| legal_exercises.iter().any(|e| e.id == id));
}
