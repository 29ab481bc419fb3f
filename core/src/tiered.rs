use crate::error::{Error, Result};
use crate::index::{InvertedIndex, Posting, PostingList};
use std::collections::HashMap;
use std::fmt;

/// Split a posting list into `num_tiers` bands of decreasing tf.
///
/// Postings are ordered by tf descending, doc id ascending, then cut into
/// equal-count tiers with the remainder going to the earliest tiers. Short
/// lists leave trailing tiers empty.
pub fn partition(list: &PostingList, num_tiers: usize) -> Vec<Vec<Posting>> {
    let mut sorted = list.postings.clone();
    sorted.sort_by(|a, b| b.tf.total_cmp(&a.tf).then(a.doc_id.cmp(&b.doc_id)));

    let base = sorted.len() / num_tiers;
    let remainder = sorted.len() % num_tiers;
    let mut tiers = Vec::with_capacity(num_tiers);
    let mut rest = sorted.into_iter();
    for t in 0..num_tiers {
        let size = base + usize::from(t < remainder);
        tiers.push(rest.by_ref().take(size).collect());
    }
    tiers
}

/// Term to ordered tiers. Tier 0 holds the highest-tf postings.
#[derive(Debug, Default)]
pub struct TieredIndex {
    tiers: HashMap<String, Vec<Vec<Posting>>>,
    num_tiers: usize,
}

impl TieredIndex {
    pub fn build(index: &InvertedIndex, num_tiers: usize) -> Result<Self> {
        if num_tiers < 2 {
            return Err(Error::config(format!("tier count must be at least 2, got {num_tiers}")));
        }
        let tiers: HashMap<String, Vec<Vec<Posting>>> = index
            .iter()
            .map(|(term, list)| (term.to_string(), partition(list, num_tiers)))
            .collect();
        tracing::info!(terms = tiers.len(), num_tiers, "built tiered index");
        Ok(Self { tiers, num_tiers })
    }

    pub fn num_tiers(&self) -> usize {
        self.num_tiers
    }

    /// Tiers for a term, `None` if the term is unknown.
    pub fn tiers(&self, term: &str) -> Option<&[Vec<Posting>]> {
        self.tiers.get(term).map(Vec::as_slice)
    }

    /// One tier of a term's postings; empty for unknown terms or out-of-range tiers.
    pub fn tier(&self, term: &str, tier: usize) -> &[Posting] {
        self.tiers
            .get(term)
            .and_then(|ts| ts.get(tier))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Total postings held in each tier across all terms.
    pub fn tier_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.num_tiers];
        for ts in self.tiers.values() {
            for (i, tier) in ts.iter().enumerate() {
                sizes[i] += tier.len();
            }
        }
        sizes
    }
}

impl fmt::Display for TieredIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut terms: Vec<&String> = self.tiers.keys().collect();
        terms.sort();
        for term in terms {
            write!(f, "{term}:")?;
            for (i, tier) in self.tiers[term].iter().enumerate() {
                let ids: Vec<String> = tier.iter().map(|p| p.doc_id.to_string()).collect();
                write!(f, " [{i}: {}]", ids.join(","))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
