//! Lexicon-based sentiment scorer.
//!
//! A fixed word-weight table, summed over whole words and clamped to
//! `[-1.0, 1.0]`. Deterministic and side-effect-free; the label thresholds
//! live on [`SentimentLabel`] in the core crate.

use pulse_core::SentimentLabel;

/// General-news word weights. Values in `(0.0, 1.0]` are positive, in
/// `[-1.0, 0.0)` negative. The final score is clamped to `[-1.0, 1.0]`.
pub(crate) const LEXICON: &[(&str, f32)] = &[
    // Positive signals
    ("growth", 0.4),
    ("wins", 0.4),
    ("win", 0.4),
    ("victory", 0.5),
    ("breakthrough", 0.5),
    ("record", 0.3),
    ("surge", 0.3),
    ("rally", 0.3),
    ("recovery", 0.4),
    ("approved", 0.4),
    ("success", 0.5),
    ("successful", 0.5),
    ("celebrates", 0.4),
    ("improved", 0.4),
    ("strong", 0.3),
    ("gains", 0.3),
    ("peace", 0.5),
    ("agreement", 0.3),
    ("thriving", 0.5),
    ("best", 0.4),
    // Negative signals
    ("crisis", -0.6),
    ("war", -0.6),
    ("death", -0.7),
    ("deaths", -0.7),
    ("killed", -0.7),
    ("crash", -0.6),
    ("collapse", -0.6),
    ("fraud", -0.5),
    ("scandal", -0.5),
    ("lawsuit", -0.4),
    ("recession", -0.6),
    ("layoffs", -0.5),
    ("outbreak", -0.5),
    ("disaster", -0.7),
    ("failure", -0.4),
    ("failed", -0.4),
    ("worst", -0.6),
    ("fears", -0.4),
    ("threat", -0.4),
    ("warning", -0.3),
];

/// Score a body of text with the lexicon.
///
/// Splits into lowercase words, strips surrounding punctuation, sums
/// matching weights, and clamps to `[-1.0, 1.0]`. Empty or unknown text
/// scores `0.0`.
#[must_use]
pub fn score_text(text: &str) -> f32 {
    let mut score = 0.0_f32;
    for word in text.split_whitespace() {
        let w = word
            .trim_matches(|c: char| !c.is_alphabetic())
            .to_lowercase();
        for &(lex_word, weight) in LEXICON {
            if w == lex_word {
                score += weight;
                break;
            }
        }
    }
    score.clamp(-1.0, 1.0)
}

/// Score text and derive the polarity label in one step.
#[must_use]
pub fn score_and_label(text: &str) -> (f32, SentimentLabel) {
    let score = score_text(text);
    (score, SentimentLabel::from_score(score))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_is_neutral_zero() {
        assert_eq!(score_and_label(""), (0.0, SentimentLabel::Neutral));
    }

    #[test]
    fn whitespace_only_is_neutral_zero() {
        assert_eq!(score_and_label("   \n\t "), (0.0, SentimentLabel::Neutral));
    }

    #[test]
    fn unknown_words_score_zero() {
        assert_eq!(score_text("the quick brown fox"), 0.0);
    }

    #[test]
    fn positive_keyword_scores_positive() {
        let (score, label) = score_and_label("a major breakthrough was announced");
        assert!(score > 0.1, "expected positive score, got {score}");
        assert_eq!(label, SentimentLabel::Positive);
    }

    #[test]
    fn negative_keyword_scores_negative() {
        let (score, label) = score_and_label("the crisis deepened overnight");
        assert!(score < -0.1, "expected negative score, got {score}");
        assert_eq!(label, SentimentLabel::Negative);
    }

    #[test]
    fn mixed_text_stays_in_bounds() {
        let score = score_text("victory celebrations end in disaster");
        assert!((-1.0..=1.0).contains(&score));
    }

    #[test]
    fn score_clamps_to_positive_one() {
        let text = "victory breakthrough success recovery peace thriving best win wins growth";
        assert_eq!(score_text(text), 1.0);
    }

    #[test]
    fn score_clamps_to_negative_one() {
        let text = "crisis war death crash collapse disaster worst recession outbreak";
        assert_eq!(score_text(text), -1.0);
    }

    #[test]
    fn punctuation_is_stripped() {
        assert!(score_text("victory!") > 0.0);
    }

    #[test]
    fn scoring_is_deterministic() {
        let text = "markets crash as fears grow";
        assert_eq!(score_text(text), score_text(text));
    }
}
