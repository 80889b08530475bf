use crate::jaccard::{jaccard_score, overlap_score};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub struct Score {
    pub value: f64,
    pub matched_tokens: Vec<String>,
}

pub trait Scorer: Send + Sync {
    fn score(&self, query: &HashSet<String>, target: &HashSet<String>) -> Score;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorerKind {
    #[default]
    Jaccard,
    Overlap,
}

impl ScorerKind {
    pub fn instantiate(&self) -> Box<dyn Scorer> {
        match self {
            ScorerKind::Jaccard => Box::new(JaccardScorer),
            ScorerKind::Overlap => Box::new(OverlapScorer),
        }
    }
}

struct JaccardScorer;

impl Scorer for JaccardScorer {
    fn score(&self, query: &HashSet<String>, target: &HashSet<String>) -> Score {
        let result = jaccard_score(query, target);
        Score {
            value: result.score,
            matched_tokens: result.matched_tokens,
        }
    }
}

struct OverlapScorer;

impl Scorer for OverlapScorer {
    fn score(&self, query: &HashSet<String>, target: &HashSet<String>) -> Score {
        let result = overlap_score(query, target);
        Score {
            value: result.score,
            matched_tokens: result.matched_tokens,
        }
    }
}
