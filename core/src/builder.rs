//! Build pipeline: corpus in, immutable [`Index`] out.
//!
//! Passes must run in dependency order; running one early is an
//! [`Error::Ordering`]. [`IndexBuilder::build`] runs them all.

use crate::cluster::{ClusterBuilder, ClusterIndex};
use crate::config::Config;
use crate::document::DocumentStore;
use crate::embedding::Embedder;
use crate::error::{Error, Result};
use crate::evaluation::Evaluation;
use crate::index::{InvertedIndex, Vocabulary};
use crate::ingest::Corpus;
use crate::projection::RandomProjection;
use crate::stats::TermStats;
use crate::tiered::TieredIndex;
use crate::vector::VectorBuilder;
use crate::DocId;
use rayon::prelude::*;

const BUILD_MODE: &str = "BUILD";

pub struct IndexBuilder {
    config: Config,
    docs: DocumentStore,
    stats: Option<TermStats>,
    inverted: Option<InvertedIndex>,
    vocab: Option<Vocabulary>,
    tiered: Option<TieredIndex>,
    vectors_built: bool,
    projection: Option<RandomProjection>,
    explicit_leaders: Option<Vec<DocId>>,
    clusters: Option<ClusterIndex>,
}

impl IndexBuilder {
    /// Validates the configuration against the collection before any work is done.
    pub fn new(config: Config, corpus: Corpus) -> Result<Self> {
        config.validate()?;
        let num_docs = corpus.docs.len();
        if num_docs == 0 {
            return Err(Error::config("collection has no documents"));
        }
        let leaders = config.leader_count(num_docs);
        if !(1..=num_docs).contains(&leaders) {
            return Err(Error::config(format!("leader sample size must be in 1..={num_docs}, got {leaders}")));
        }
        Ok(Self {
            config,
            docs: DocumentStore::from_corpus(corpus),
            stats: None,
            inverted: None,
            vocab: None,
            tiered: None,
            vectors_built: false,
            projection: None,
            explicit_leaders: None,
            clusters: None,
        })
    }

    /// Run every pass with no embedding model.
    pub fn build(config: Config, corpus: Corpus) -> Result<Index> {
        let dim = config.embedding_dim;
        Self::new(config, corpus)?.run(&crate::embedding::NoEmbeddings { dim }, &Evaluation::disabled())
    }

    /// Use these documents as cluster leaders instead of a random sample.
    pub fn with_leaders(mut self, leaders: Vec<DocId>) -> Self {
        self.explicit_leaders = Some(leaders);
        self
    }

    /// Run every pass in order, timing each one under the `BUILD` mode.
    pub fn run(mut self, embedder: &dyn Embedder, eval: &Evaluation) -> Result<Index> {
        self.check_leaders()?;
        tracing::info!(num_docs = self.docs.len(), "building indices");
        let total = eval.start(BUILD_MODE, "total");

        let m = eval.start(BUILD_MODE, "term statistics");
        self.count_terms();
        m.stop();

        let m = eval.start(BUILD_MODE, "inverted index");
        self.build_inverted()?;
        m.stop();

        let m = eval.start(BUILD_MODE, "tiered index");
        self.build_tiers()?;
        m.stop();

        let m = eval.start(BUILD_MODE, "vectors");
        self.build_vectors(embedder)?;
        m.stop();

        let m = eval.start(BUILD_MODE, "random projection");
        self.build_signatures()?;
        m.stop();

        let m = eval.start(BUILD_MODE, "clusters");
        self.build_clusters()?;
        m.stop();

        let index = self.finish()?;
        let seconds = total.stop();
        tracing::info!(seconds, vocabulary = index.vocabulary().len(), "finished building indices");
        Ok(index)
    }

    /// Explicit leaders must be a non-empty set of known documents.
    fn check_leaders(&self) -> Result<()> {
        let Some(leaders) = &self.explicit_leaders else {
            return Ok(());
        };
        if leaders.is_empty() {
            return Err(Error::config("leader set must not be empty"));
        }
        let num_docs = self.docs.len();
        match leaders.iter().find(|&&id| id as usize >= num_docs) {
            Some(&bad) => Err(Error::config(format!("leader {bad} is not a document id (collection has {num_docs})"))),
            None => Ok(()),
        }
    }

    pub fn count_terms(&mut self) {
        self.stats = Some(TermStats::collect(self.docs.as_mut_slice()));
    }

    /// Finalise posting lists and fix the vocabulary.
    pub fn build_inverted(&mut self) -> Result<()> {
        let stats = self
            .stats
            .take()
            .ok_or(Error::Ordering("inverted index built before term statistics"))?;
        let vocab = Vocabulary::new(stats.postings.keys().cloned());
        self.inverted = Some(InvertedIndex::from_stats(stats));
        self.vocab = Some(vocab);
        Ok(())
    }

    pub fn build_tiers(&mut self) -> Result<()> {
        let inverted = self
            .inverted
            .as_ref()
            .ok_or(Error::Ordering("tiered index built before inverted index"))?;
        self.tiered = Some(TieredIndex::build(inverted, self.config.tiers)?);
        Ok(())
    }

    pub fn build_vectors(&mut self, embedder: &dyn Embedder) -> Result<()> {
        let (vocab, inverted) = match (&self.vocab, &self.inverted) {
            (Some(v), Some(i)) => (v, i),
            _ => return Err(Error::Ordering("vector construction before vocabulary was finalized")),
        };
        VectorBuilder::new(vocab, inverted).build_documents(self.docs.as_mut_slice(), embedder);
        self.vectors_built = true;
        Ok(())
    }

    pub fn build_signatures(&mut self) -> Result<()> {
        let vocab = self
            .vocab
            .as_ref()
            .ok_or(Error::Ordering("projection initialised before vocabulary was finalized"))?;
        if !self.vectors_built {
            return Err(Error::Ordering("signatures projected before vectors were built"));
        }
        let projection = RandomProjection::new(
            vocab.len(),
            self.config.dimensions,
            self.config.projection,
            self.config.seed,
        )?;
        self.docs
            .as_mut_slice()
            .par_iter_mut()
            .for_each(|doc| doc.signature = projection.project(&doc.tfidf));
        tracing::info!(num_docs = self.docs.len(), bits = projection.dimensions(), "projected document signatures");
        self.projection = Some(projection);
        Ok(())
    }

    pub fn build_clusters(&mut self) -> Result<()> {
        if !self.vectors_built {
            return Err(Error::Ordering("clusters built before vectors were built"));
        }
        let num_docs = self.docs.len();
        let mut clusters = ClusterBuilder::new();
        match self.explicit_leaders.take() {
            Some(leaders) => {
                clusters.set_leaders(leaders, num_docs)?;
            }
            None => {
                let count = self.config.leader_count(num_docs);
                // Offset keeps leader sampling independent of the projection stream.
                let seed = self.config.seed.map(|s| s.wrapping_add(1));
                clusters.choose_leaders(num_docs, count, seed)?;
            }
        }
        clusters.assign_all(self.docs.as_slice())?;
        self.clusters = Some(clusters.finish()?);
        Ok(())
    }

    pub fn finish(self) -> Result<Index> {
        let not_ready = Error::Ordering("index finished before every build pass ran");
        if !self.vectors_built {
            return Err(not_ready);
        }
        match (self.inverted, self.vocab, self.tiered, self.projection, self.clusters) {
            (Some(inverted), Some(vocab), Some(tiered), Some(projection), Some(clusters)) => Ok(Index {
                config: self.config,
                docs: self.docs,
                vocab,
                inverted,
                tiered,
                projection,
                clusters,
            }),
            _ => Err(not_ready),
        }
    }
}

/// Every structure the query engine reads. Immutable once built.
#[derive(Debug)]
pub struct Index {
    config: Config,
    docs: DocumentStore,
    vocab: Vocabulary,
    inverted: InvertedIndex,
    tiered: TieredIndex,
    projection: RandomProjection,
    clusters: ClusterIndex,
}

impl Index {
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn documents(&self) -> &DocumentStore {
        &self.docs
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    pub fn inverted(&self) -> &InvertedIndex {
        &self.inverted
    }

    pub fn tiered(&self) -> &TieredIndex {
        &self.tiered
    }

    pub fn projection(&self) -> &RandomProjection {
        &self.projection
    }

    pub fn clusters(&self) -> &ClusterIndex {
        &self.clusters
    }

    pub fn vectors(&self) -> VectorBuilder<'_> {
        VectorBuilder::new(&self.vocab, &self.inverted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::NoEmbeddings;

    fn corpus() -> Corpus {
        let t = |s: &str| s.split_whitespace().map(str::to_string).collect::<Vec<_>>();
        Corpus::from_tokens(vec![("0", t("a b c")), ("1", t("a a b")), ("2", t("c c c"))])
    }

    fn config() -> Config {
        Config { tiers: 2, dimensions: 64, seed: Some(9), ..Config::default() }
    }

    #[test]
    fn passes_out_of_order_are_ordering_errors() {
        let mut builder = IndexBuilder::new(config(), corpus()).unwrap();
        assert!(matches!(builder.build_inverted(), Err(Error::Ordering(_))));
        assert!(matches!(builder.build_tiers(), Err(Error::Ordering(_))));
        assert!(matches!(builder.build_vectors(&NoEmbeddings { dim: 3 }), Err(Error::Ordering(_))));
        assert!(matches!(builder.build_signatures(), Err(Error::Ordering(_))));
        assert!(matches!(builder.build_clusters(), Err(Error::Ordering(_))));
        builder.count_terms();
        builder.build_inverted().unwrap();
        assert!(matches!(builder.finish(), Err(Error::Ordering(_))));
    }

    #[test]
    fn invalid_config_fails_before_build() {
        let err = IndexBuilder::new(Config { tiers: 1, ..config() }, corpus()).err().unwrap();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn empty_collection_is_rejected() {
        let err = IndexBuilder::build(config(), Corpus::default()).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        let err = IndexBuilder::new(config(), Corpus::default()).err().unwrap();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn oversized_leader_sample_fails_before_any_pass() {
        let err = IndexBuilder::new(Config { leaders: Some(4), ..config() }, corpus()).err().unwrap();
        assert!(matches!(err, Error::Configuration(_)));
        let err = IndexBuilder::new(Config { leaders: Some(0), ..config() }, corpus()).err().unwrap();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn bad_explicit_leaders_fail_before_any_pass() {
        let eval = Evaluation::new(true, false);
        let builder = IndexBuilder::new(config(), corpus()).unwrap().with_leaders(vec![0, 7]);
        let err = builder.run(&NoEmbeddings { dim: 3 }, &eval).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(eval.records().is_empty());

        let builder = IndexBuilder::new(config(), corpus()).unwrap().with_leaders(Vec::new());
        assert!(matches!(builder.run(&NoEmbeddings { dim: 3 }, &eval), Err(Error::Configuration(_))));
    }

    #[test]
    fn full_build_fills_every_document() {
        let index = IndexBuilder::build(config(), corpus()).unwrap();
        assert_eq!(index.vocabulary().terms(), &["a", "b", "c"]);
        for doc in index.documents().iter() {
            assert_eq!(doc.tfidf.len(), 3);
            assert_eq!(doc.signature.len(), 64);
            assert_eq!(doc.embedding, vec![0.0; 300]);
        }
        assert_eq!(index.clusters().len(), 2);
        assert_eq!(index.tiered().num_tiers(), 2);
    }
}
