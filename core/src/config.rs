use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Component distribution of the random projection matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectionKind {
    /// Standard normal components.
    #[default]
    Gaussian,
    /// Components drawn uniformly from {-1, +1}.
    Bipolar,
}

impl std::str::FromStr for ProjectionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "gaussian" | "normal" => Ok(ProjectionKind::Gaussian),
            "bipolar" | "sign" | "pm1" => Ok(ProjectionKind::Bipolar),
            other => Err(Error::config(format!("unknown projection kind '{other}'"))),
        }
    }
}

/// Process-wide settings. Built once at startup and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub collection_path: PathBuf,
    /// One stopword per line. The built-in English list is used when unset.
    pub stopword_path: Option<PathBuf>,
    pub trace: bool,
    pub measure: bool,
    pub plot: bool,
    /// Default number of results per query (topK).
    pub results: usize,
    pub tiers: usize,
    /// LSH signature length in bits.
    pub dimensions: usize,
    pub eval_path: PathBuf,
    /// Leader sample size; `ceil(sqrt(N))` when unset.
    pub leaders: Option<usize>,
    /// Minimum number of clusters scored per CLUSTER query.
    pub cluster_probes: usize,
    /// TIERED stops pulling tiers once candidates reach this multiple of topK.
    pub tier_candidate_factor: usize,
    pub projection: ProjectionKind,
    pub seed: Option<u64>,
    pub embedding_path: Option<PathBuf>,
    pub embedding_dim: usize,
    pub stemming: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            collection_path: PathBuf::from("./data/collection.docs"),
            stopword_path: None,
            trace: false,
            measure: false,
            plot: false,
            results: 10,
            tiers: 3,
            dimensions: 1000,
            eval_path: PathBuf::from("./eval/report.json"),
            leaders: None,
            cluster_probes: 1,
            tier_candidate_factor: 2,
            projection: ProjectionKind::Gaussian,
            seed: None,
            embedding_path: None,
            embedding_dim: 300,
            stemming: true,
        }
    }
}

impl Config {
    /// Read a JSON config file. Missing fields take their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let f = File::open(path.as_ref())?;
        let config: Config = serde_json::from_reader(BufReader::new(f))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tiers < 2 {
            return Err(Error::config(format!("tier count must be at least 2, got {}", self.tiers)));
        }
        if self.dimensions == 0 {
            return Err(Error::config("LSH dimension must be positive"));
        }
        if self.leaders == Some(0) {
            return Err(Error::config("leader sample size must be at least 1"));
        }
        if self.cluster_probes == 0 {
            return Err(Error::config("cluster probes must be at least 1"));
        }
        if self.tier_candidate_factor == 0 {
            return Err(Error::config("tier candidate factor must be at least 1"));
        }
        if self.results == 0 {
            return Err(Error::config("result count must be at least 1"));
        }
        if self.embedding_dim == 0 {
            return Err(Error::config("embedding dimension must be positive"));
        }
        Ok(())
    }

    /// Leader count for a collection of `num_docs` documents.
    pub fn leader_count(&self, num_docs: usize) -> usize {
        self.leaders
            .unwrap_or_else(|| (num_docs as f64).sqrt().ceil() as usize)
    }
}
