use crate::tokenizer::Posting;
use common::DocId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The documents containing one token, each with the size of its word set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvertedEntry {
    pub docs: BTreeMap<DocId, usize>,
}

impl InvertedEntry {
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

/// Set union of the postings for one token. Re-delivered postings collapse
/// into one entry per document.
pub fn invert<I>(postings: I) -> InvertedEntry
where
    I: IntoIterator<Item = Posting>,
{
    let mut docs = BTreeMap::new();
    for Posting { doc, doc_tokens } in postings {
        let size = docs.entry(doc).or_insert(doc_tokens);
        *size = (*size).max(doc_tokens);
    }
    InvertedEntry { docs }
}
