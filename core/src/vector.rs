use crate::document::Document;
use crate::embedding::{embed_or_zero, Embedder};
use crate::index::{InvertedIndex, Vocabulary};
use crate::similarity::norm;
use crate::stats::term_frequencies;
use rayon::prelude::*;
use std::collections::HashMap;

/// Dense TF-IDF vectors aligned to a finished vocabulary.
pub struct VectorBuilder<'a> {
    vocab: &'a Vocabulary,
    index: &'a InvertedIndex,
}

impl<'a> VectorBuilder<'a> {
    pub fn new(vocab: &'a Vocabulary, index: &'a InvertedIndex) -> Self {
        Self { vocab, index }
    }

    /// `tf * idf` at each present term's vocabulary position, zero elsewhere.
    /// Terms outside the vocabulary are ignored.
    pub fn tfidf(&self, term_tf: &HashMap<String, f32>) -> Vec<f32> {
        let mut v = vec![0.0f32; self.vocab.len()];
        for (term, &tf) in term_tf {
            if let Some(id) = self.vocab.id(term) {
                v[id as usize] = tf * self.index.idf(term);
            }
        }
        v
    }

    /// Query vector and its norm, built with the same tf rule as documents.
    pub fn query(&self, tokens: &[String]) -> (Vec<f32>, f32) {
        let v = self.tfidf(&term_frequencies(tokens));
        let n = norm(&v);
        (v, n)
    }

    /// Fill TF-IDF vector, norm and embedding of every document.
    pub fn build_documents(&self, docs: &mut [Document], embedder: &dyn Embedder) {
        docs.par_iter_mut().for_each(|doc| {
            doc.tfidf = self.tfidf(&doc.term_tf);
            doc.norm = norm(&doc.tfidf);
            doc.embedding = embed_or_zero(embedder, &doc.tokens);
        });
        tracing::info!(num_docs = docs.len(), dim = self.vocab.len(), embedding_dim = embedder.dimension(), "built document vectors");
    }
}
