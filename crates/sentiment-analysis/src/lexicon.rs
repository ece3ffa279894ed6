//! Word-list polarity scorer tuned for card-collector chatter.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

const NEGATION_WORDS: &[&str] = &[
    "not", "no", "never", "don't", "doesn't", "didn't", "isn't", "aren't",
    "wasn't", "weren't", "won't", "wouldn't", "couldn't", "shouldn't", "hardly",
    "barely", "neither", "nor", "without", "cant", "can't", "dont",
];

const NEGATION_WINDOW: usize = 3;

const POSITIVE_WORDS: &[&str] = &[
    "good", "great", "amazing", "awesome", "excellent", "love", "beautiful",
    "best", "nice", "happy", "excited", "win", "incredible", "perfect",
    "fantastic", "fire", "clean", "sharp", "gem", "mint", "grail", "steal",
    "bargain", "undervalued", "bullish", "rising", "rise", "surge", "soaring",
    "hot", "hyped", "strong", "profit", "gain", "gains", "up", "pop", "popping",
    "breakout", "star", "elite", "mvp", "champion", "rookie-of-the-year",
    "legendary", "historic", "valuable", "demand", "invest", "buy", "pickup",
    "score", "lucky", "stunning", "impressive", "dominant", "healthy",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bad", "terrible", "awful", "horrible", "worst", "hate", "ugly", "poor",
    "disappointing", "disappointed", "sad", "lose", "loss", "losses", "fake",
    "scam", "damaged", "crease", "creased", "dinged", "trimmed", "altered",
    "overpriced", "overvalued", "bearish", "falling", "fall", "drop", "dropping",
    "crash", "tank", "tanking", "dump", "dumping", "bust", "down", "cold",
    "weak", "injury", "injured", "hurt", "suspended", "decline", "declining",
    "risk", "risky", "regret", "overhyped", "flop", "sell", "selloff", "junk",
    "worthless", "problem", "concern", "benched",
];

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+|www\.\S+").unwrap());

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Remove URLs and collapse runs of whitespace.
pub fn clean_text(text: &str) -> String {
    let without_urls = URL_RE.replace_all(text, " ");
    WHITESPACE_RE
        .replace_all(&without_urls, " ")
        .trim()
        .to_string()
}

pub struct PolarityScorer {
    positive: HashSet<&'static str>,
    negative: HashSet<&'static str>,
    negation: HashSet<&'static str>,
}

impl Default for PolarityScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl PolarityScorer {
    pub fn new() -> Self {
        Self {
            positive: POSITIVE_WORDS.iter().copied().collect(),
            negative: NEGATIVE_WORDS.iter().copied().collect(),
            negation: NEGATION_WORDS.iter().copied().collect(),
        }
    }

    /// Polarity in [-1, 1]; 0 when no sentiment-bearing words are found.
    ///
    /// Each sentiment word counts +1 or -1, flipped when a negation word
    /// appears up to three words before it. The sum is divided by the number
    /// of sentiment words.
    pub fn polarity(&self, text: &str) -> f64 {
        let cleaned = clean_text(text).to_lowercase();
        if cleaned.is_empty() {
            return 0.0;
        }

        let words: Vec<&str> = cleaned
            .split(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | '.' | '!' | '?' | ':' | '(' | ')' | '"'))
            .filter(|w| !w.is_empty())
            .collect();

        let negation_positions: Vec<usize> = words
            .iter()
            .enumerate()
            .filter(|(_, w)| self.negation.contains(*w))
            .map(|(i, _)| i)
            .collect();

        let mut score: i32 = 0;
        let mut hits: i32 = 0;

        for (i, word) in words.iter().enumerate() {
            let is_positive = self.positive.contains(*word);
            let is_negative = self.negative.contains(*word);
            if !is_positive && !is_negative {
                continue;
            }

            let negated = negation_positions
                .iter()
                .any(|&neg| neg < i && i - neg <= NEGATION_WINDOW);

            let value = if is_positive { 1 } else { -1 };
            score += if negated { -value } else { value };
            hits += 1;
        }

        if hits == 0 {
            return 0.0;
        }
        (score as f64 / hits as f64).clamp(-1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_strips_urls() {
        assert_eq!(
            clean_text("look  at this https://i.redd.it/abc.jpg \n card"),
            "look at this card"
        );
    }

    #[test]
    fn test_clean_text_bare_www_and_blank_input() {
        assert_eq!(clean_text("comps at www.130point.com\tlook\tfair"), "comps at look fair");
        assert_eq!(clean_text(" \n\t "), "");
    }

    #[test]
    fn test_polarity_range_and_sign() {
        let scorer = PolarityScorer::new();
        assert_eq!(scorer.polarity("What an amazing gem, great pickup"), 1.0);
        assert_eq!(scorer.polarity("fake and overpriced"), -1.0);
        assert_eq!(scorer.polarity("the card arrived on tuesday"), 0.0);
        assert_eq!(scorer.polarity(""), 0.0);

        let mixed = scorer.polarity("great card but overpriced");
        assert_eq!(mixed, 0.0);
    }

    #[test]
    fn test_negation_window() {
        let scorer = PolarityScorer::new();
        assert_eq!(scorer.polarity("this is not a good card"), -1.0);
        // negation too far away
        assert_eq!(scorer.polarity("not sure why everyone thinks it good"), 1.0);
    }
}
