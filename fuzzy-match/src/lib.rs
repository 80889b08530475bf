//! Fuzzy matching of free text against a fixed set of labels.
//!
//! Used as the last fallback when a user's message has no exact text mapping:
//! the labels are the known mapping keys and the best candidates are offered
//! back to the user as buttons.

mod jaccard;
mod scorer;
mod tokenize;

pub use crate::scorer::{Score, Scorer, ScorerKind};
pub use crate::tokenize::tokenize;

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct MatchOptions {
    #[serde(default = "default_min_score")]
    pub min_score: f64,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub scorer: ScorerKind,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            min_score: default_min_score(),
            top_k: default_top_k(),
            scorer: ScorerKind::default(),
        }
    }
}

fn default_min_score() -> f64 {
    0.25
}

fn default_top_k() -> usize {
    8
}

#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    pub label: String,
    pub score: f64,
    pub matched_tokens: Vec<String>,
}

/// Scores every label against `input`, best first. Labels sharing no token
/// with the input are left out.
pub fn rank<S: AsRef<str>>(input: &str, labels: &[S], scorer: ScorerKind) -> Vec<Candidate> {
    let query: HashSet<String> = tokenize(input).into_iter().collect();
    if query.is_empty() {
        return Vec::new();
    }

    let scorer = scorer.instantiate();
    let mut candidates: Vec<Candidate> = labels
        .iter()
        .filter_map(|label| {
            let label = label.as_ref();
            let target: HashSet<String> = tokenize(label).into_iter().collect();
            let Score {
                value,
                matched_tokens,
            } = scorer.score(&query, &target);
            (value > 0.0).then(|| Candidate {
                label: label.to_string(),
                score: value,
                matched_tokens,
            })
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.label.cmp(&b.label))
    });
    candidates
}

/// Returns the labels scoring at least `options.min_score`, best first and at
/// most `options.top_k` of them, or `None` when nothing qualifies.
pub fn fuzzy_search<S: AsRef<str>>(
    input: &str,
    labels: &[S],
    options: &MatchOptions,
) -> Option<Vec<String>> {
    let matches: Vec<String> = rank(input, labels, options.scorer)
        .into_iter()
        .take_while(|candidate| candidate.score >= options.min_score)
        .take(options.top_k)
        .map(|candidate| candidate.label)
        .collect();

    if matches.is_empty() { None } else { Some(matches) }
}
