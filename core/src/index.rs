use crate::error::{Error, Result};
use crate::stats::{self, TermStats};
use crate::{DocId, TermId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub tf: f32, // count / max count in the document
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostingList {
    pub idf: f32,
    pub postings: Vec<Posting>, // sorted by doc_id, tf > 0
}

impl PostingList {
    pub fn len(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    pub fn tf(&self, doc_id: DocId) -> Option<f32> {
        self.postings
            .binary_search_by_key(&doc_id, |p| p.doc_id)
            .ok()
            .map(|i| self.postings[i].tf)
    }

    pub fn doc_ids(&self) -> impl Iterator<Item = DocId> + '_ {
        self.postings.iter().map(|p| p.doc_id)
    }
}

/// Ordered set of distinct terms. A term's position is its id and its
/// component index in every dense vector.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    terms: Vec<String>,
    ids: HashMap<String, TermId>,
}

impl Vocabulary {
    /// Terms are ordered lexicographically.
    pub fn new<I: IntoIterator<Item = String>>(terms: I) -> Self {
        let sorted: BTreeSet<String> = terms.into_iter().collect();
        let terms: Vec<String> = sorted.into_iter().collect();
        let ids = terms
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i as TermId))
            .collect();
        Self { terms, ids }
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn id(&self, term: &str) -> Option<TermId> {
        self.ids.get(term).copied()
    }

    pub fn term(&self, id: TermId) -> Option<&str> {
        self.terms.get(id as usize).map(String::as_str)
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }
}

/// Term to posting list. Filled once by the builder, read-only afterwards.
#[derive(Debug, Default)]
pub struct InvertedIndex {
    postings: HashMap<String, PostingList>,
    num_docs: usize,
}

impl InvertedIndex {
    pub fn new(num_docs: usize) -> Self {
        Self { postings: HashMap::new(), num_docs }
    }

    /// Finalise counted statistics: one posting list per term with `idf = ln(N / df)`.
    pub fn from_stats(counted: TermStats) -> Self {
        let num_docs = counted.num_docs;
        let mut index = Self::new(num_docs);
        for (term, postings) in counted.postings {
            let idf = stats::idf(num_docs, postings.len());
            index.insert(term, PostingList { idf, postings });
        }
        tracing::info!(terms = index.len(), num_docs = index.num_docs, "built inverted index");
        index
    }

    /// Adds the list only if the term is absent. Returns whether it was inserted.
    pub fn insert(&mut self, term: String, list: PostingList) -> bool {
        if self.postings.contains_key(&term) {
            return false;
        }
        self.postings.insert(term, list);
        true
    }

    pub fn posting_list(&self, term: &str) -> Result<&PostingList> {
        self.postings
            .get(term)
            .ok_or_else(|| Error::TermNotFound(term.to_string()))
    }

    /// Zero for unknown terms.
    pub fn idf(&self, term: &str) -> f32 {
        self.postings.get(term).map_or(0.0, |pl| pl.idf)
    }

    pub fn doc_freq(&self, term: &str) -> usize {
        self.postings.get(term).map_or(0, PostingList::len)
    }

    /// Union of the doc ids of every known term, ascending.
    pub fn doc_ids_for_terms<S: AsRef<str>>(&self, terms: &[S]) -> Vec<DocId> {
        let mut ids: BTreeSet<DocId> = BTreeSet::new();
        for term in terms {
            if let Some(pl) = self.postings.get(term.as_ref()) {
                ids.extend(pl.doc_ids());
            }
        }
        ids.into_iter().collect()
    }

    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.postings.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PostingList)> {
        self.postings.iter().map(|(t, pl)| (t.as_str(), pl))
    }

    /// Dictionary size.
    pub fn len(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    pub fn num_docs(&self) -> usize {
        self.num_docs
    }
}

impl fmt::Display for InvertedIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut terms: Vec<&String> = self.postings.keys().collect();
        terms.sort();
        for term in terms {
            let pl = &self.postings[term];
            write!(f, "{term} (idf {:.4}):", pl.idf)?;
            for p in &pl.postings {
                write!(f, " {}:{:.3}", p.doc_id, p.tf)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
