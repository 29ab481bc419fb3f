use crate::error::{Error, Result};
use crate::ingest::{Corpus, RawDoc};
use crate::projection::Signature;
use crate::DocId;
use std::collections::HashMap;

/// A document and every representation derived from it during the build.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub id: DocId,
    pub external_id: String,
    pub title: Option<String>,
    pub tokens: Vec<String>,
    /// Normalised term frequency: count / max count in this document.
    pub term_tf: HashMap<String, f32>,
    /// Dense TF-IDF vector, indexed by vocabulary term id.
    pub tfidf: Vec<f32>,
    pub embedding: Vec<f32>,
    pub signature: Signature,
    /// L2 norm of `tfidf`.
    pub norm: f32,
}

impl Document {
    fn from_raw(id: DocId, raw: RawDoc) -> Self {
        Self {
            id,
            external_id: raw.external_id,
            title: raw.title,
            tokens: raw.tokens,
            ..Self::default()
        }
    }
}

/// Documents keyed by their dense internal id.
#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    docs: Vec<Document>,
    by_external: HashMap<String, DocId>,
}

impl DocumentStore {
    pub fn from_corpus(corpus: Corpus) -> Self {
        let mut by_external = HashMap::with_capacity(corpus.len());
        let docs: Vec<Document> = corpus
            .docs
            .into_iter()
            .enumerate()
            .map(|(i, raw)| {
                by_external.entry(raw.external_id.clone()).or_insert(i as DocId);
                Document::from_raw(i as DocId, raw)
            })
            .collect();
        Self { docs, by_external }
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn get(&self, id: DocId) -> Result<&Document> {
        self.docs.get(id as usize).ok_or(Error::DocumentNotFound(id))
    }

    /// First document carrying this external id.
    pub fn by_external_id(&self, external_id: &str) -> Option<&Document> {
        self.by_external.get(external_id).map(|&id| &self.docs[id as usize])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Document> {
        self.docs.iter()
    }

    pub fn as_slice(&self) -> &[Document] {
        &self.docs
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [Document] {
        &mut self.docs
    }
}
