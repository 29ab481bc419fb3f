//! First build pass: raw term counts per document.

use crate::document::Document;
use crate::index::Posting;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};

/// Output of the counting pass, consumed by the inverted index builder.
#[derive(Debug, Default)]
pub struct TermStats {
    pub num_docs: usize,
    /// Term to postings, each list ascending by doc id.
    pub postings: BTreeMap<String, Vec<Posting>>,
}

impl TermStats {
    /// Count terms in every document and store its normalised tf map on the document.
    ///
    /// Counting runs in parallel per document; the merge into the shared
    /// posting map is a single sequential pass in doc id order.
    pub fn collect(docs: &mut [Document]) -> Self {
        docs.par_iter_mut().for_each(|doc| {
            doc.term_tf = term_frequencies(&doc.tokens);
        });

        let mut postings: BTreeMap<String, Vec<Posting>> = BTreeMap::new();
        for doc in docs.iter() {
            for (term, &tf) in &doc.term_tf {
                postings.entry(term.clone()).or_default().push(Posting { doc_id: doc.id, tf });
            }
        }
        tracing::info!(num_docs = docs.len(), distinct_terms = postings.len(), "counted terms");
        Self { num_docs: docs.len(), postings }
    }

    pub fn doc_freq(&self, term: &str) -> usize {
        self.postings.get(term).map_or(0, Vec::len)
    }
}

/// `tf(t) = count(t) / max count` over the distinct terms of one token sequence.
pub fn term_frequencies(tokens: &[String]) -> HashMap<String, f32> {
    let mut counts: HashMap<&str, u32> = HashMap::new();
    let mut max_count = 0u32;
    for token in tokens {
        let c = counts.entry(token.as_str()).or_insert(0);
        *c += 1;
        max_count = max_count.max(*c);
    }
    counts
        .into_iter()
        .map(|(term, count)| (term.to_string(), count as f32 / max_count as f32))
        .collect()
}

/// `idf = ln(N / df)`; zero when the term occurs in every document.
pub fn idf(num_docs: usize, doc_freq: usize) -> f32 {
    if doc_freq == 0 || num_docs == 0 {
        return 0.0;
    }
    (num_docs as f32 / doc_freq as f32).ln()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::Corpus;
    use crate::document::DocumentStore;

    fn toks(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn tf_is_relative_to_max_count() {
        let tf = term_frequencies(&toks("a a b"));
        assert_eq!(tf["a"], 1.0);
        assert_eq!(tf["b"], 0.5);
        assert!(term_frequencies(&[]).is_empty());
    }

    #[test]
    fn idf_is_zero_for_ubiquitous_terms_and_non_increasing() {
        assert_eq!(idf(5, 5), 0.0);
        let mut prev = f32::INFINITY;
        for df in 1..=5 {
            let v = idf(5, df);
            assert!(v <= prev);
            prev = v;
        }
    }

    #[test]
    fn postings_are_sorted_and_positive() {
        let corpus = Corpus::from_tokens(vec![
            ("0", toks("a b c")),
            ("1", toks("a a b")),
            ("2", toks("c c c")),
        ]);
        let mut store = DocumentStore::from_corpus(corpus);
        let stats = TermStats::collect(store.as_mut_slice());
        assert_eq!(stats.num_docs, 3);
        let a: Vec<_> = stats.postings["a"].iter().map(|p| p.doc_id).collect();
        assert_eq!(a, vec![0, 1]);
        assert_eq!(stats.doc_freq("c"), 2);
        assert_eq!(stats.doc_freq("z"), 0);
        assert!(stats.postings.values().flatten().all(|p| p.tf > 0.0));
    }
}
