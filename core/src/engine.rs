use crate::builder::{Index, IndexBuilder};
use crate::config::Config;
use crate::embedding::{Embedder, NoEmbeddings, WordVectors};
use crate::error::{Error, Result};
use crate::evaluation::Evaluation;
use crate::ingest::Corpus;
use crate::similarity::cosine_with_norms;
use crate::tokenizer::Tokenizer;
use crate::DocId;
use rayon::prelude::*;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Retrieval strategy for a single query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Exact cosine over every document sharing a query term.
    Vanilla,
    /// Exact cosine over candidates pulled tier by tier until enough are found.
    Tiered,
    /// Exact cosine restricted to the clusters of the closest leaders.
    Cluster,
    /// Hamming distance between random-projection signatures.
    Random,
}

impl SearchMode {
    pub const ALL: [SearchMode; 4] = [SearchMode::Vanilla, SearchMode::Tiered, SearchMode::Cluster, SearchMode::Random];
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SearchMode::Vanilla => "VANILLA",
            SearchMode::Tiered => "TIERED",
            SearchMode::Cluster => "CLUSTER",
            SearchMode::Random => "RANDOM",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for SearchMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "vanilla" => Ok(SearchMode::Vanilla),
            "tiered" => Ok(SearchMode::Tiered),
            "cluster" => Ok(SearchMode::Cluster),
            "random" | "lsh" => Ok(SearchMode::Random),
            other => Err(Error::Input(format!("unknown search mode '{other}'"))),
        }
    }
}

/// Accepts every name [`FromStr`](std::str::FromStr) does, in any case.
impl<'de> Deserialize<'de> for SearchMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    pub doc_id: DocId,
    pub score: f32,
}

/// Whether the engine has an index to answer from.
#[derive(Debug, Clone)]
pub enum EngineState {
    Uninitialized,
    Ready(Arc<Index>),
}

/// Answers queries against a built [`Index`]. Cheap to share across threads.
#[derive(Debug, Clone)]
pub struct QueryEngine {
    state: EngineState,
    tokenizer: Tokenizer,
}

impl QueryEngine {
    /// Engine with no index yet; every search fails until [`attach`](Self::attach).
    pub fn new(tokenizer: Tokenizer) -> Self {
        Self { state: EngineState::Uninitialized, tokenizer }
    }

    /// Load the configured collection, stopwords and word vectors, then build every index.
    pub fn from_config(config: &Config, eval: &Evaluation) -> Result<Self> {
        config.validate()?;
        let tokenizer = match &config.stopword_path {
            Some(path) => Tokenizer::from_stopword_file(path)?,
            None => Tokenizer::new(),
        }
        .with_stemming(config.stemming);
        let corpus = Corpus::load(&config.collection_path, &tokenizer)?;
        let embedder: Box<dyn Embedder> = match &config.embedding_path {
            Some(path) => Box::new(WordVectors::load(path)?),
            None => Box::new(NoEmbeddings { dim: config.embedding_dim }),
        };
        let index = IndexBuilder::new(config.clone(), corpus)?.run(embedder.as_ref(), eval)?;
        Ok(Self::with_index(Arc::new(index), tokenizer))
    }

    pub fn with_index(index: Arc<Index>, tokenizer: Tokenizer) -> Self {
        Self { state: EngineState::Ready(index), tokenizer }
    }

    pub fn attach(&mut self, index: Arc<Index>) {
        self.state = EngineState::Ready(index);
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, EngineState::Ready(_))
    }

    pub fn index(&self) -> Result<&Index> {
        match &self.state {
            EngineState::Ready(index) => Ok(index.as_ref()),
            EngineState::Uninitialized => Err(Error::Ordering("query issued before the index was built")),
        }
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// Top `top_k` documents for `query`, best first, ties by ascending doc id.
    pub fn search(&self, query: &str, top_k: usize, mode: SearchMode) -> Result<Vec<Hit>> {
        if top_k == 0 {
            return Err(Error::Input("result count must be positive".into()));
        }
        self.index()?;
        let tokens = self.tokenizer.tokenize(query);
        self.search_tokens(&tokens, top_k, mode)
    }

    /// Like [`search`](Self::search) for an already tokenized query.
    pub fn search_tokens(&self, tokens: &[String], top_k: usize, mode: SearchMode) -> Result<Vec<Hit>> {
        if top_k == 0 {
            return Err(Error::Input("result count must be positive".into()));
        }
        let index = self.index()?;
        let start = Instant::now();

        let (vector, norm) = index.vectors().query(tokens);
        if norm == 0.0 {
            tracing::debug!(%mode, tokens = tokens.len(), "query has no indexed terms");
            return Ok(Vec::new());
        }

        let (candidates, scored) = match mode {
            SearchMode::Vanilla => {
                let candidates = index.inverted().doc_ids_for_terms(tokens);
                (candidates.len(), score_cosine(index, &candidates, &vector, norm))
            }
            SearchMode::Tiered => {
                let candidates = tiered_candidates(index, tokens, top_k);
                (candidates.len(), score_cosine(index, &candidates, &vector, norm))
            }
            SearchMode::Cluster => {
                let candidates = cluster_candidates(index, &vector, norm, top_k);
                (candidates.len(), score_cosine(index, &candidates, &vector, norm))
            }
            SearchMode::Random => {
                let scored = score_hamming(index, &vector);
                (scored.len(), scored)
            }
        };

        let hits = rank(scored, top_k);
        tracing::debug!(
            %mode,
            candidates,
            hits = hits.len(),
            elapsed_s = start.elapsed().as_secs_f64(),
            "query finished"
        );
        Ok(hits)
    }
}

/// Pull whole tiers, across all query terms, until `factor * top_k` candidates are found.
fn tiered_candidates(index: &Index, tokens: &[String], top_k: usize) -> Vec<DocId> {
    let tiered = index.tiered();
    let limit = index.config().tier_candidate_factor.saturating_mul(top_k);
    let terms: BTreeSet<&str> = tokens.iter().map(String::as_str).collect();
    let mut candidates: BTreeSet<DocId> = BTreeSet::new();
    for tier in 0..tiered.num_tiers() {
        for term in &terms {
            candidates.extend(tiered.tier(term, tier).iter().map(|p| p.doc_id));
        }
        if candidates.len() >= limit {
            break;
        }
    }
    candidates.into_iter().collect()
}

/// Leaders plus members of the closest clusters: at least `cluster_probes`
/// clusters, more while fewer than `top_k` candidates are collected.
fn cluster_candidates(index: &Index, vector: &[f32], norm: f32, top_k: usize) -> Vec<DocId> {
    let clusters = index.clusters();
    let probes = index.config().cluster_probes;
    let mut candidates = Vec::new();
    for (i, (leader, _)) in clusters.rank_leaders(vector, norm, index.documents()).into_iter().enumerate() {
        if i >= probes && candidates.len() >= top_k {
            break;
        }
        candidates.push(leader);
        candidates.extend_from_slice(clusters.members(leader).unwrap_or(&[]));
    }
    candidates
}

/// Cosine scores of the candidates; non-positive scores are dropped.
fn score_cosine(index: &Index, candidates: &[DocId], vector: &[f32], norm: f32) -> Vec<(DocId, f32)> {
    let docs = index.documents();
    candidates
        .par_iter()
        .filter_map(|&id| docs.get(id).ok())
        .map(|d| (d.id, cosine_with_norms(vector, norm, &d.tfidf, d.norm)))
        .filter(|&(_, s)| s > 0.0)
        .collect()
}

/// `1 - hamming / k` for every document.
fn score_hamming(index: &Index, vector: &[f32]) -> Vec<(DocId, f32)> {
    let projection = index.projection();
    let signature = projection.project(vector);
    let bits = projection.dimensions() as f32;
    index
        .documents()
        .as_slice()
        .par_iter()
        .map(|d| (d.id, 1.0 - signature.hamming(&d.signature) as f32 / bits))
        .collect()
}

/// Sort by score descending, doc id ascending, and keep the first `top_k`.
pub fn rank(mut scored: Vec<(DocId, f32)>, top_k: usize) -> Vec<Hit> {
    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    scored
        .into_iter()
        .take(top_k)
        .map(|(doc_id, score)| Hit { doc_id, score })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn mode_names_round_trip() {
        for mode in SearchMode::ALL {
            assert_eq!(mode.to_string().parse::<SearchMode>().unwrap(), mode);
        }
        assert_eq!("lsh".parse::<SearchMode>().unwrap(), SearchMode::Random);
        assert!(matches!("bm25".parse::<SearchMode>(), Err(Error::Input(_))));
    }

    #[test]
    fn mode_deserializes_like_from_str() {
        for (name, mode) in [("vanilla", SearchMode::Vanilla), ("TIERED", SearchMode::Tiered), ("Cluster", SearchMode::Cluster), ("lsh", SearchMode::Random)] {
            let parsed: SearchMode = serde_json::from_value(serde_json::json!(name)).unwrap();
            assert_eq!(parsed, mode);
        }
        assert!(serde_json::from_value::<SearchMode>(serde_json::json!("bm25")).is_err());
        assert_eq!(serde_json::to_value(SearchMode::Random).unwrap(), serde_json::json!("random"));
    }

    #[test]
    fn uninitialized_engine_is_ordering_error() {
        let engine = QueryEngine::new(Tokenizer::new());
        assert!(!engine.is_ready());
        assert!(matches!(engine.state(), EngineState::Uninitialized));
        assert!(matches!(engine.search("statin", 5, SearchMode::Vanilla), Err(Error::Ordering(_))));
    }

    #[test]
    fn attaching_an_index_makes_engine_ready() {
        let corpus = Corpus::from_tokens(vec![("0", vec!["statin".to_string()]), ("1", vec!["cancer".to_string()])]);
        let config = Config { dimensions: 16, seed: Some(1), ..Config::default() };
        let index = IndexBuilder::build(config, corpus).unwrap();
        let mut engine = QueryEngine::new(Tokenizer::new().with_stemming(false));
        engine.attach(Arc::new(index));
        assert!(matches!(engine.state(), EngineState::Ready(_)));
        let hits = engine.search("statin", 5, SearchMode::Vanilla).unwrap();
        assert_eq!(hits.iter().map(|h| h.doc_id).collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn zero_top_k_is_input_error() {
        let engine = QueryEngine::new(Tokenizer::new());
        assert!(matches!(engine.search("statin", 0, SearchMode::Vanilla), Err(Error::Input(_))));
    }

    #[test]
    fn rank_breaks_ties_by_doc_id() {
        let hits = rank(vec![(5, 0.5), (2, 0.9), (1, 0.5), (7, 0.1)], 3);
        let ids: Vec<DocId> = hits.iter().map(|h| h.doc_id).collect();
        assert_eq!(ids, vec![2, 1, 5]);
    }

    proptest! {
        #[test]
        fn rank_is_bounded_and_ordered(scores in prop::collection::vec(0u8..5, 0..40), k in 1usize..10) {
            let scored: Vec<(DocId, f32)> = scores.iter().enumerate().map(|(i, &s)| (i as DocId, s as f32)).collect();
            let hits = rank(scored, k);
            prop_assert!(hits.len() <= k);
            for w in hits.windows(2) {
                prop_assert!(w[0].score > w[1].score || (w[0].score == w[1].score && w[0].doc_id < w[1].doc_id));
            }
        }
    }
}
