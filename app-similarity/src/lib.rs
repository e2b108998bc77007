//! Document similarity: expands each inverted entry into document pairs and
//! scores every pair by the Jaccard index of the two word sets.

use app_wordsets::InvertedEntry;
use common::{App, Config, DocId, Token};
use itertools::Itertools;
use log::warn;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt};

/// An unordered pair of distinct documents, stored with `a < b`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocPair {
    pub a: DocId,
    pub b: DocId,
}

impl DocPair {
    /// `None` for a self-pair.
    pub fn new(x: DocId, y: DocId) -> Option<Self> {
        match x.cmp(&y) {
            std::cmp::Ordering::Less => Some(Self { a: x, b: y }),
            std::cmp::Ordering::Greater => Some(Self { a: y, b: x }),
            std::cmp::Ordering::Equal => None,
        }
    }
}

impl fmt::Display for DocPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}", self.a, self.b)
    }
}

/// One token shared by a pair, with both word-set sizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairHit {
    pub token: Token,
    pub a_tokens: usize,
    pub b_tokens: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityResult {
    pub pair: DocPair,
    pub score: f64,
}

/// All pairs of documents in `entry`, or nothing when the entry holds more
/// than `max_fanout` documents.
pub fn expand(token: &str, entry: &InvertedEntry, max_fanout: usize) -> Vec<(DocPair, PairHit)> {
    if entry.len() > max_fanout {
        warn!(
            "token {:?} appears in {} documents, skipping pairwise expansion (cap {})",
            token,
            entry.len(),
            max_fanout
        );
        return vec![];
    }

    // BTreeMap iteration is ordered, so `a < b` holds for every combination.
    entry
        .docs
        .iter()
        .tuple_combinations()
        .map(|((a, &a_tokens), (b, &b_tokens))| {
            let pair = DocPair {
                a: a.clone(),
                b: b.clone(),
            };
            let hit = PairHit {
                token: token.to_owned(),
                a_tokens,
                b_tokens,
            };
            (pair, hit)
        })
        .collect()
}

pub fn jaccard(shared: usize, a_tokens: usize, b_tokens: usize) -> f64 {
    let union = a_tokens + b_tokens - shared;
    if union == 0 {
        return 0.0;
    }
    shared as f64 / union as f64
}

/// Jaccard score of one pair from its hits. Hits for the same token count
/// once.
pub fn score(hits: &[PairHit]) -> f64 {
    let first = match hits.first() {
        Some(hit) => hit,
        None => return 0.0,
    };
    let shared = hits.iter().map(|hit| &hit.token).collect::<BTreeSet<_>>().len();
    jaccard(shared, first.a_tokens, first.b_tokens)
}

#[derive(Debug, Clone)]
pub struct SimilarityApp {
    max_pair_fanout: usize,
    min_score: f64,
}

impl SimilarityApp {
    pub fn new(config: &Config) -> Self {
        Self {
            max_pair_fanout: config.max_pair_fanout,
            min_score: config.min_score,
        }
    }
}

impl App for SimilarityApp {
    type InKey = Token;
    type InValue = InvertedEntry;
    type Key = DocPair;
    type Value = PairHit;
    type Output = f64;

    fn map(&self, token: Token, entry: InvertedEntry) -> Vec<(DocPair, PairHit)> {
        expand(&token, &entry, self.max_pair_fanout)
    }

    fn reduce(&self, _pair: &DocPair, hits: Vec<PairHit>) -> Option<f64> {
        let score = score(&hits);
        if score > 0.0 && score >= self.min_score {
            Some(score)
        } else {
            None
        }
    }
}
