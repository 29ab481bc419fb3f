use crate::builder::Index;
use serde::Serialize;
use std::fmt;

/// Human-readable overview of a built index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexSummary {
    pub num_docs: usize,
    pub vocabulary_size: usize,
    pub num_tiers: usize,
    /// Postings per tier, summed over all terms.
    pub tier_postings: Vec<usize>,
    pub lsh_dimensions: usize,
    pub num_leaders: usize,
    pub min_cluster: usize,
    pub max_cluster: usize,
    pub mean_cluster: f64,
}

impl IndexSummary {
    pub fn of(index: &Index) -> Self {
        let sizes = index.clusters().sizes();
        let mean_cluster = if sizes.is_empty() {
            0.0
        } else {
            sizes.iter().sum::<usize>() as f64 / sizes.len() as f64
        };
        Self {
            num_docs: index.documents().len(),
            vocabulary_size: index.vocabulary().len(),
            num_tiers: index.tiered().num_tiers(),
            tier_postings: index.tiered().tier_sizes(),
            lsh_dimensions: index.projection().dimensions(),
            num_leaders: index.clusters().len(),
            min_cluster: sizes.iter().copied().min().unwrap_or(0),
            max_cluster: sizes.iter().copied().max().unwrap_or(0),
            mean_cluster,
        }
    }
}

impl fmt::Display for IndexSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "documents:        {}", self.num_docs)?;
        writeln!(f, "vocabulary size:  {}", self.vocabulary_size)?;
        writeln!(f, "tiers:            {}", self.num_tiers)?;
        for (i, n) in self.tier_postings.iter().enumerate() {
            writeln!(f, "  tier {i}: {n} postings")?;
        }
        writeln!(f, "lsh dimensions:   {}", self.lsh_dimensions)?;
        writeln!(f, "leaders:          {}", self.num_leaders)?;
        write!(
            f,
            "cluster sizes:    min {} / max {} / mean {:.2}",
            self.min_cluster, self.max_cluster, self.mean_cluster
        )
    }
}
