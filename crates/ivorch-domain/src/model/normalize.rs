//! Text canonicalization shared by the Knowledge Base and Fact Oracle.
//!
//! `normalize` enforces the invariant that `Claim::normalized_text` is
//! deterministic: lower-case, whitespace-collapsed, punctuation-stripped.
//! `tokenize` is the word-level view used for token-set similarity.

/// Canonicalize text for deduping and substring matching.
pub fn normalize(text: &str) -> String {
    let stripped: String = text
        .chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect();
    stripped
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Tokenize into lowercase alphanumeric words (minimum 2 characters).
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() >= 2)
        .map(String::from)
        .collect()
}

/// Jaccard similarity between the token sets of two strings, in [0, 1].
pub fn token_set_similarity(a: &str, b: &str) -> f64 {
    use std::collections::HashSet;
    let ta: HashSet<String> = tokenize(a).into_iter().collect();
    let tb: HashSet<String> = tokenize(b).into_iter().collect();
    if ta.is_empty() && tb.is_empty() {
        return 0.0;
    }
    let intersection = ta.intersection(&tb).count();
    let union = ta.union(&tb).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_whitespace_and_punctuation() {
        assert_eq!(normalize("Acme,  Inc. -- 3 yrs!"), "acme inc 3 yrs");
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = normalize("Senior Engineer @ Google");
        let twice = normalize(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn tokenize_skips_short_tokens() {
        assert_eq!(tokenize("I am a bot"), vec!["am", "bot"]);
    }

    #[test]
    fn token_set_similarity_identical() {
        assert_eq!(token_set_similarity("Acme 3 years", "acme 3 years"), 1.0);
    }

    #[test]
    fn token_set_similarity_disjoint() {
        assert_eq!(token_set_similarity("Acme", "Globex"), 0.0);
    }

    #[test]
    fn token_set_similarity_partial_overlap() {
        let sim = token_set_similarity("senior engineer at acme", "engineer at globex");
        // shared: engineer, at (2); union: senior, engineer, at, acme, globex (5)
        assert!((sim - 0.4).abs() < 1e-9);
    }

    #[test]
    fn token_set_similarity_both_empty() {
        assert_eq!(token_set_similarity("", ""), 0.0);
    }
}
