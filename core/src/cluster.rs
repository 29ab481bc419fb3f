//! Leader-based cluster pruning.
//!
//! A sample of documents is chosen as leaders; every other document joins the
//! cluster of its most similar leader. Queries then score only the clusters of
//! the leaders closest to the query.

use crate::document::{Document, DocumentStore};
use crate::error::{Error, Result};
use crate::similarity::cosine_with_norms;
use crate::DocId;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use std::collections::BTreeMap;

/// Build-time side of the cluster index.
#[derive(Debug, Default)]
pub struct ClusterBuilder {
    leaders: Option<Vec<DocId>>,
    clusters: BTreeMap<DocId, Vec<DocId>>,
}

impl ClusterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uniform random sample of `count` distinct leaders out of `num_docs`.
    pub fn choose_leaders(&mut self, num_docs: usize, count: usize, seed: Option<u64>) -> Result<&[DocId]> {
        if count == 0 || count > num_docs {
            return Err(Error::config(format!(
                "leader sample size must be in 1..={num_docs}, got {count}"
            )));
        }
        let mut rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        let sample = rand::seq::index::sample(&mut rng, num_docs, count);
        self.set_leaders(sample.into_iter().map(|i| i as DocId).collect(), num_docs)
    }

    /// Use an explicit leader set. Duplicates are dropped.
    pub fn set_leaders(&mut self, mut leaders: Vec<DocId>, num_docs: usize) -> Result<&[DocId]> {
        leaders.sort_unstable();
        leaders.dedup();
        if leaders.is_empty() {
            return Err(Error::config("leader set must not be empty"));
        }
        if let Some(&bad) = leaders.iter().find(|&&id| id as usize >= num_docs) {
            return Err(Error::DocumentNotFound(bad));
        }
        self.clusters = leaders.iter().map(|&l| (l, Vec::new())).collect();
        tracing::info!(leaders = leaders.len(), num_docs, "chose cluster leaders");
        let leaders = self.leaders.insert(leaders);
        Ok(leaders.as_slice())
    }

    /// Leader with the highest cosine similarity to `doc`; ties go to the smaller id.
    pub fn nearest_leader(&self, doc: &Document, docs: &[Document]) -> Result<DocId> {
        let leaders = self
            .leaders
            .as_deref()
            .ok_or(Error::Ordering("cluster assignment before leaders were chosen"))?;
        let mut best: Option<(DocId, f32)> = None;
        for &id in leaders {
            let leader = docs.get(id as usize).ok_or(Error::DocumentNotFound(id))?;
            if leader.tfidf.is_empty() || leader.tfidf.len() != doc.tfidf.len() {
                return Err(Error::Ordering("cluster assignment before leader vectors were built"));
            }
            let sim = cosine_with_norms(&doc.tfidf, doc.norm, &leader.tfidf, leader.norm);
            if best.map_or(true, |(_, s)| sim > s) {
                best = Some((id, sim));
            }
        }
        best.map(|(id, _)| id)
            .ok_or(Error::Ordering("cluster assignment before leaders were chosen"))
    }

    /// Assign every non-leader document to its nearest leader.
    pub fn assign_all(&mut self, docs: &[Document]) -> Result<()> {
        let leaders = self
            .leaders
            .as_deref()
            .ok_or(Error::Ordering("cluster assignment before leaders were chosen"))?;
        let assignments: Vec<(DocId, DocId)> = docs
            .par_iter()
            .filter(|d| leaders.binary_search(&d.id).is_err())
            .map(|d| self.nearest_leader(d, docs).map(|l| (l, d.id)))
            .collect::<Result<_>>()?;
        for (leader, doc) in assignments {
            if let Some(members) = self.clusters.get_mut(&leader) {
                members.push(doc);
            }
        }
        tracing::info!(clusters = self.clusters.len(), assigned = docs.len() - leaders.len(), "assigned documents to clusters");
        Ok(())
    }

    pub fn finish(self) -> Result<ClusterIndex> {
        let leaders = self
            .leaders
            .ok_or(Error::Ordering("cluster index finished before leaders were chosen"))?;
        Ok(ClusterIndex { leaders, clusters: self.clusters })
    }
}

/// Leader id to member ids. Leaders are keys only, never members.
#[derive(Debug, Default)]
pub struct ClusterIndex {
    leaders: Vec<DocId>,
    clusters: BTreeMap<DocId, Vec<DocId>>,
}

impl ClusterIndex {
    pub fn leaders(&self) -> &[DocId] {
        &self.leaders
    }

    /// Non-leader members of a leader's cluster, ascending by id.
    pub fn members(&self, leader: DocId) -> Option<&[DocId]> {
        self.clusters.get(&leader).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (DocId, &[DocId])> {
        self.clusters.iter().map(|(&l, m)| (l, m.as_slice()))
    }

    /// Cluster size including the leader itself.
    pub fn sizes(&self) -> Vec<usize> {
        self.clusters.values().map(|m| m.len() + 1).collect()
    }

    pub fn len(&self) -> usize {
        self.leaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaders.is_empty()
    }

    /// Leaders by cosine similarity to `query`, best first, ties by smaller id.
    pub fn rank_leaders(&self, query: &[f32], query_norm: f32, docs: &DocumentStore) -> Vec<(DocId, f32)> {
        let mut ranked: Vec<(DocId, f32)> = self
            .leaders
            .iter()
            .filter_map(|&id| docs.get(id).ok())
            .map(|d| (d.id, cosine_with_norms(query, query_norm, &d.tfidf, d.norm)))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked
    }
}
