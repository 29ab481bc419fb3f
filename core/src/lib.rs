//! In-memory vector-space retrieval over a static document collection.
//!
//! The build pipeline runs once, in order: term statistics, inverted index,
//! tiered index, TF-IDF / embedding vectors, random-projection signatures and
//! leader clusters. The finished [`Index`] is immutable and is queried through
//! a [`QueryEngine`] under one of four [`SearchMode`]s.

pub mod builder;
pub mod cluster;
pub mod config;
pub mod document;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod evaluation;
pub mod index;
pub mod ingest;
pub mod projection;
pub mod similarity;
pub mod stats;
pub mod summary;
pub mod tiered;
pub mod tokenizer;
pub mod vector;

pub type TermId = u32;
pub type DocId = u32;

pub use builder::{Index, IndexBuilder};
pub use cluster::ClusterIndex;
pub use config::{Config, ProjectionKind};
pub use document::{Document, DocumentStore};
pub use embedding::{Embedder, NoEmbeddings, WordVectors};
pub use engine::{EngineState, Hit, QueryEngine, SearchMode};
pub use error::{Error, Result};
pub use evaluation::{EvalReport, Evaluation, Measurement};
pub use index::{InvertedIndex, Posting, PostingList, Vocabulary};
pub use ingest::{Corpus, RawDoc};
pub use projection::{RandomProjection, Signature};
pub use summary::IndexSummary;
pub use tiered::TieredIndex;
pub use tokenizer::Tokenizer;
