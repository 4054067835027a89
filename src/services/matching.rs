//! Fuzzy best-match resolution of catalog search results.
//!
//! Search APIs return a relevance-ordered list that often leads with sequels,
//! localized titles or near-homonyms. The resolver scores each candidate
//! against the user's query by normalized Levenshtein similarity and keeps the
//! first candidate with the highest score.

/// Score given when one normalized title contains the other.
///
/// Stays below 1.0: for the query "Dune", "Dune" outranks "Dune: Part Two".
pub const SUBSTRING_MATCH_SCORE: f64 = 0.9;

/// Anything the resolver can score: a primary title and an optional
/// secondary (original / localized) one.
pub trait Titled {
    fn primary_title(&self) -> &str;

    fn secondary_title(&self) -> Option<&str> {
        None
    }
}

/// Plain candidate for callers that have no richer record at hand
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub id: String,
    pub primary_title: String,
    pub secondary_title: Option<String>,
}

impl Candidate {
    pub fn new(id: impl Into<String>, primary_title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            primary_title: primary_title.into(),
            secondary_title: None,
        }
    }

    pub fn with_secondary(mut self, secondary_title: impl Into<String>) -> Self {
        self.secondary_title = Some(secondary_title.into());
        self
    }
}

impl Titled for Candidate {
    fn primary_title(&self) -> &str {
        &self.primary_title
    }

    fn secondary_title(&self) -> Option<&str> {
        self.secondary_title.as_deref()
    }
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Levenshtein edit distance, counted in chars.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    // Keep the row along the shorter string.
    let (long, short) = if a.len() >= b.len() { (&a, &b) } else { (&b, &a) };

    if short.is_empty() {
        return long.len();
    }

    let mut prev: Vec<usize> = (0..=short.len()).collect();
    let mut curr = vec![0; short.len() + 1];

    for (i, lc) in long.iter().enumerate() {
        curr[0] = i + 1;
        for (j, sc) in short.iter().enumerate() {
            let cost = usize::from(lc != sc);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[short.len()]
}

/// Similarity of two titles in `[0, 1]`.
///
/// Both sides are trimmed and lower-cased. Equal strings score 1.0, strict
/// containment scores [`SUBSTRING_MATCH_SCORE`], anything else scores
/// `(max_len - distance) / max_len`.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = normalize(a);
    let b = normalize(b);

    if a == b {
        return 1.0;
    }

    if !a.is_empty() && !b.is_empty() && (a.contains(b.as_str()) || b.contains(a.as_str())) {
        return SUBSTRING_MATCH_SCORE;
    }

    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }

    let distance = levenshtein(&a, &b);
    (max_len - distance) as f64 / max_len as f64
}

/// Score of one candidate: the better of its two titles
pub fn candidate_score<T: Titled + ?Sized>(query: &str, candidate: &T) -> f64 {
    let primary = similarity(query, candidate.primary_title());
    match candidate.secondary_title() {
        Some(secondary) => primary.max(similarity(query, secondary)),
        None => primary,
    }
}

/// Candidate most similar to `query`, `None` for an empty list.
///
/// Only a strictly higher score displaces the running best, so among equal
/// scores the earliest candidate (upstream relevance order) wins.
pub fn find_best_match<'a, T: Titled>(query: &str, candidates: &'a [T]) -> Option<&'a T> {
    find_best_match_scored(query, candidates).map(|(candidate, _)| candidate)
}

/// [`find_best_match`] that also reports the winning score
pub fn find_best_match_scored<'a, T: Titled>(
    query: &str,
    candidates: &'a [T],
) -> Option<(&'a T, f64)> {
    let mut best: Option<(&'a T, f64)> = None;

    for candidate in candidates {
        let score = candidate_score(query, candidate);
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((candidate, score)),
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_levenshtein_same() {
        assert_eq!(levenshtein("hello", "hello"), 0);
    }

    #[test]
    fn test_levenshtein_edits() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("helo", "hello"), 1);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
    }

    #[test]
    fn test_levenshtein_counts_chars_not_bytes() {
        assert_eq!(levenshtein("amélie", "amelie"), 1);
    }

    #[test]
    fn test_similarity_exact_after_normalization() {
        assert_eq!(similarity("Dune", " dune "), 1.0);
    }

    #[test]
    fn test_similarity_both_empty() {
        assert_eq!(similarity("", ""), 1.0);
        assert_eq!(similarity("  ", ""), 1.0);
    }

    #[test]
    fn test_similarity_substring_bonus() {
        assert_eq!(similarity("Dune", "Dune: Part Two"), SUBSTRING_MATCH_SCORE);
        assert_eq!(similarity("Dune: Part Two", "dune"), SUBSTRING_MATCH_SCORE);
    }

    #[test]
    fn test_similarity_one_side_empty() {
        assert_eq!(similarity("", "Dune"), 0.0);
    }

    #[test]
    fn test_similarity_edit_distance() {
        // one substitution over six chars
        let score = similarity("Amelie", "Amélie");
        assert!((score - 5.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_find_best_match_empty() {
        let candidates: Vec<Candidate> = vec![];
        assert!(find_best_match("Inception", &candidates).is_none());
    }

    #[test]
    fn test_exact_match_beats_substring() {
        let candidates = vec![
            Candidate::new("1", "Inception"),
            Candidate::new("2", "Inception 2"),
        ];
        let best = find_best_match("Inception", &candidates).unwrap();
        assert_eq!(best.id, "1");

        let reversed = vec![
            Candidate::new("2", "Inception 2"),
            Candidate::new("1", "Inception"),
        ];
        assert_eq!(find_best_match("Inception", &reversed).unwrap().id, "1");
    }

    #[test]
    fn test_secondary_title_counts() {
        let candidates = vec![
            Candidate::new("1", "Le Fabuleux Destin d'Amélie Poulain").with_secondary("Amélie"),
            Candidate::new("2", "Amelie"),
        ];
        let best = find_best_match("Amelie", &candidates).unwrap();
        assert_eq!(best.id, "2");

        let (_, score) = find_best_match_scored("Amélie", &candidates).unwrap();
        assert_eq!(score, 1.0);
        assert_eq!(find_best_match("Amélie", &candidates).unwrap().id, "1");
    }

    #[test]
    fn test_tie_keeps_earliest() {
        let candidates = vec![
            Candidate::new("first", "Dune"),
            Candidate::new("second", "DUNE"),
            Candidate::new("third", "Dune "),
        ];
        assert_eq!(find_best_match("dune", &candidates).unwrap().id, "first");
    }

    #[test]
    fn test_single_poor_candidate_still_returned() {
        let candidates = vec![Candidate::new("1", "Completely Different")];
        let (best, score) = find_best_match_scored("Inception", &candidates).unwrap();
        assert_eq!(best.id, "1");
        assert!(score < 0.5);
    }

    #[test]
    fn test_malformed_title_scores_as_empty() {
        let candidates = vec![Candidate::new("bad", ""), Candidate::new("good", "Heat")];
        assert_eq!(find_best_match("Heat", &candidates).unwrap().id, "good");
    }

    #[test]
    fn test_result_is_same_reference() {
        let candidates = vec![
            Candidate::new("1", "Alien"),
            Candidate::new("2", "Aliens"),
        ];
        let first = find_best_match("Aliens", &candidates).unwrap();
        let second = find_best_match("Aliens", &candidates).unwrap();
        assert!(std::ptr::eq(first, second));
        assert!(std::ptr::eq(first, &candidates[1]));
    }

    proptest! {
        #[test]
        fn prop_similarity_identity(s in "\\PC{0,24}") {
            prop_assert_eq!(similarity(&s, &s), 1.0);
        }

        #[test]
        fn prop_similarity_symmetric(a in "\\PC{0,16}", b in "\\PC{0,16}") {
            prop_assert_eq!(similarity(&a, &b), similarity(&b, &a));
        }

        #[test]
        fn prop_similarity_in_range(a in "\\PC{0,16}", b in "\\PC{0,16}") {
            let score = similarity(&a, &b);
            prop_assert!((0.0..=1.0).contains(&score));
        }

        #[test]
        fn prop_substring_scores_bonus(a in "[a-z]{1,8}", suffix in "[0-9]{1,4}") {
            let b = format!("{}{}", a, suffix);
            prop_assert_eq!(similarity(&a, &b), SUBSTRING_MATCH_SCORE);
        }

        #[test]
        fn prop_best_match_has_max_score(
            query in "[a-z ]{0,10}",
            titles in proptest::collection::vec("[a-z ]{0,10}", 1..8),
        ) {
            let candidates: Vec<Candidate> = titles
                .iter()
                .enumerate()
                .map(|(i, t)| Candidate::new(i.to_string(), t.clone()))
                .collect();
            let (best, score) = find_best_match_scored(&query, &candidates).unwrap();
            let first_max = candidates
                .iter()
                .position(|c| candidate_score(&query, c) == score)
                .unwrap();
            prop_assert!(candidates.iter().all(|c| candidate_score(&query, c) <= score));
            prop_assert_eq!(&best.id, &candidates[first_max].id);
        }
    }
}
