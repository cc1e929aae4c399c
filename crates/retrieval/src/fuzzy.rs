//! Fuzzy string scores on a 0-100 scale.
//!
//! All scores are built on the normalized Indel similarity (the
//! "ratio" of edit-distance literature): `2 * LCS / (len(a) + len(b))`.
//! Empty inputs score 0.

use crate::text::slugify;
use rapidfuzz::distance::indel;
use std::collections::BTreeSet;

/// Plain similarity of two strings
pub fn ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    indel::normalized_similarity(a.chars(), b.chars()) * 100.0
}

/// Best ratio of the shorter string against any equally long window of the longer
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let (short, long) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };
    if short.is_empty() {
        return 0.0;
    }

    let long_chars: Vec<char> = long.chars().collect();
    let width = short.chars().count();
    if width == long_chars.len() {
        return ratio(short, long);
    }

    let mut best = 0.0f64;
    for window in long_chars.windows(width) {
        let score = indel::normalized_similarity(short.chars(), window.iter().copied()) * 100.0;
        if score > best {
            best = score;
            if best >= 100.0 {
                break;
            }
        }
    }
    best
}

/// Set-based comparison of whitespace tokens.
///
/// Shared tokens count fully; a string whose tokens are all contained in
/// the other scores 100.
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let tokens_a: BTreeSet<&str> = a.split_whitespace().collect();
    let tokens_b: BTreeSet<&str> = b.split_whitespace().collect();
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let intersection: Vec<&str> = tokens_a.intersection(&tokens_b).copied().collect();
    let diff_ab: Vec<&str> = tokens_a.difference(&tokens_b).copied().collect();
    let diff_ba: Vec<&str> = tokens_b.difference(&tokens_a).copied().collect();

    if !intersection.is_empty() && (diff_ab.is_empty() || diff_ba.is_empty()) {
        return 100.0;
    }

    let sect = intersection.join(" ");
    let join = |diff: &[&str]| {
        let rest = diff.join(" ");
        if sect.is_empty() {
            rest
        } else {
            format!("{sect} {rest}")
        }
    };
    let combined_ab = join(&diff_ab);
    let combined_ba = join(&diff_ba);

    ratio(&sect, &combined_ab)
        .max(ratio(&sect, &combined_ba))
        .max(ratio(&combined_ab, &combined_ba))
}

/// A query prepared once and scored against many titles
#[derive(Debug, Clone)]
pub struct FuzzyQuery {
    slug: String,
    lower: String,
}

impl FuzzyQuery {
    pub fn new(text: &str) -> Self {
        Self {
            slug: slugify(text),
            lower: text.to_lowercase(),
        }
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    /// Score a catalog title.
    ///
    /// Max of partial and token-set ratio of the query slug against the
    /// entry slug and the title slug, and token-set ratio of the lower-cased
    /// query against the lower-cased title.
    pub fn score(&self, entry_slug: &str, title: &str) -> f64 {
        let mut best = 0.0f64;
        if !entry_slug.is_empty() {
            best = best
                .max(partial_ratio(&self.slug, entry_slug))
                .max(token_set_ratio(&self.slug, entry_slug));
        }
        if !title.is_empty() {
            let title_slug = slugify(title);
            if !title_slug.is_empty() {
                best = best
                    .max(partial_ratio(&self.slug, &title_slug))
                    .max(token_set_ratio(&self.slug, &title_slug));
            }
            best = best.max(token_set_ratio(&self.lower, &title.to_lowercase()));
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio() {
        assert_eq!(ratio("abc", "abc"), 100.0);
        assert_eq!(ratio("", "abc"), 0.0);
        // LCS "abc" of "abcd"/"abce": 2*3/8
        assert!((ratio("abcd", "abce") - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_partial_ratio_finds_substring() {
        assert_eq!(partial_ratio("rong", "bay-vien-ngoc-rong"), 100.0);
        assert_eq!(partial_ratio("bay-vien-ngoc-rong", "rong"), 100.0);
        assert!(partial_ratio("rong", "doraemon") < 75.0);
        assert_eq!(partial_ratio("", "doraemon"), 0.0);
    }

    #[test]
    fn test_token_set_ratio() {
        assert_eq!(token_set_ratio("spirited away", "away spirited"), 100.0);
        assert_eq!(token_set_ratio("doraemon tap 5", "doraemon"), 100.0);
        assert!(token_set_ratio("fast furious", "slow turtle") < 50.0);
        assert_eq!(token_set_ratio("   ", "x"), 0.0);
    }

    #[test]
    fn test_query_score_uses_title_slug() {
        let query = FuzzyQuery::new("tóm tắt doraemon tập 5");
        assert_eq!(query.slug(), "tom-tat-doraemon-tap-5");
        assert_eq!(query.score("doraemon", "Doraemon"), 100.0);

        let typo = FuzzyQuery::new("doraemn");
        assert!(typo.score("doraemon", "Doraemon") >= 75.0);
    }
}
