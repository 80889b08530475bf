use std::collections::HashSet;

pub struct OverlapScore {
    pub score: f64,
    pub matched_tokens: Vec<String>,
}

fn matched(query: &HashSet<String>, target: &HashSet<String>) -> Vec<String> {
    let mut matched: Vec<String> = query.intersection(target).cloned().collect();
    matched.sort();
    matched
}

pub fn jaccard_score(query: &HashSet<String>, target: &HashSet<String>) -> OverlapScore {
    let matched = matched(query, target);
    let intersection_size = matched.len() as f64;
    let union_size = (query.len() + target.len()) as f64 - intersection_size;
    let score = if union_size <= 0.0 { 0.0 } else { intersection_size / union_size };
    OverlapScore {
        score,
        matched_tokens: matched,
    }
}

/// Szymkiewicz–Simpson coefficient: shared tokens over the smaller set.
pub fn overlap_score(query: &HashSet<String>, target: &HashSet<String>) -> OverlapScore {
    let matched = matched(query, target);
    let smaller = query.len().min(target.len()) as f64;
    let score = if smaller <= 0.0 { 0.0 } else { matched.len() as f64 / smaller };
    OverlapScore {
        score,
        matched_tokens: matched,
    }
}
