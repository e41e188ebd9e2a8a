//! Keyword-based topic classifier over the fixed taxonomy.
//!
//! Deterministic by construction: identical text always yields identical
//! categories, and absence of signal resolves to `General` rather than an
//! error, so classification can never block ingestion.

use std::collections::HashSet;

use pulse_core::Category;

/// Per-category keyword lists. Keys are lowercase single words, matched
/// against whole words of the title and body.
pub(crate) const KEYWORDS: &[(Category, &[&str])] = &[
    (
        Category::Politics,
        &[
            "election", "senate", "parliament", "president", "minister", "congress", "policy",
            "vote", "campaign", "legislation", "governor", "ballot",
        ],
    ),
    (
        Category::Business,
        &[
            "market", "markets", "stocks", "economy", "earnings", "inflation", "trade",
            "startup", "merger", "bank", "profit", "investors",
        ],
    ),
    (
        Category::Technology,
        &[
            "software", "ai", "smartphone", "internet", "cybersecurity", "chip", "robot",
            "app", "tech", "algorithm", "cloud", "encryption",
        ],
    ),
    (
        Category::Science,
        &[
            "research", "study", "scientists", "physics", "space", "nasa", "exoplanet",
            "telescope", "discovery", "laboratory", "genome", "quantum",
        ],
    ),
    (
        Category::Health,
        &[
            "hospital", "vaccine", "virus", "disease", "doctors", "outbreak", "cancer",
            "medicine", "patients", "epidemic", "surgery", "clinic",
        ],
    ),
    (
        Category::Sports,
        &[
            "game", "season", "championship", "league", "coach", "tournament", "goal",
            "olympics", "match", "playoff", "striker", "quarterback",
        ],
    ),
    (
        Category::Entertainment,
        &[
            "film", "movie", "album", "celebrity", "festival", "concert", "actor",
            "streaming", "premiere", "sequel", "grammy", "oscar",
        ],
    ),
    (
        Category::World,
        &[
            "embassy", "treaty", "border", "refugees", "diplomatic", "sanctions", "war",
            "ceasefire", "summit", "nato", "peacekeeping", "annexation",
        ],
    ),
    (
        Category::Environment,
        &[
            "climate", "emissions", "wildfire", "flood", "flooding", "drought", "pollution",
            "renewable", "biodiversity", "hurricane", "deforestation", "conservation",
        ],
    ),
    (
        Category::Crime,
        &[
            "police", "arrest", "murder", "fraud", "theft", "trial", "sentenced",
            "shooting", "robbery", "homicide", "smuggling", "indicted",
        ],
    ),
    (
        Category::Education,
        &[
            "school", "university", "students", "teachers", "curriculum", "tuition",
            "exam", "campus", "scholarship", "literacy", "enrollment", "graduates",
        ],
    ),
];

/// Assign categories to an article's title and body.
///
/// Returns every matching category from `taxonomy`, in taxonomy order. The
/// result is never empty: when nothing matches, the sole entry is
/// [`Category::General`].
#[must_use]
pub fn classify(title: &str, body: &str, taxonomy: &[Category]) -> Vec<Category> {
    let words: HashSet<String> = title
        .split_whitespace()
        .chain(body.split_whitespace())
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect();

    let mut categories: Vec<Category> = taxonomy
        .iter()
        .copied()
        .filter(|&category| {
            KEYWORDS
                .iter()
                .find(|(c, _)| *c == category)
                .is_some_and(|(_, keywords)| keywords.iter().any(|k| words.contains(*k)))
        })
        .collect();

    if categories.is_empty() {
        categories.push(Category::General);
    }
    categories
}
