use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Produces a fixed-size dense vector for a token sequence.
pub trait Embedder: Send + Sync {
    fn dimension(&self) -> usize;

    /// `None` when no vector can be produced; callers zero-fill.
    fn embed(&self, tokens: &[String]) -> Option<Vec<f32>>;
}

/// Embedder used when no model is configured.
#[derive(Debug, Clone, Copy)]
pub struct NoEmbeddings {
    pub dim: usize,
}

impl Embedder for NoEmbeddings {
    fn dimension(&self) -> usize {
        self.dim
    }

    fn embed(&self, _tokens: &[String]) -> Option<Vec<f32>> {
        None
    }
}

/// Word vectors in word2vec text format; a document is the mean of its known words.
#[derive(Debug, Clone, Default)]
pub struct WordVectors {
    vectors: HashMap<String, Vec<f32>>,
    dim: usize,
}

impl WordVectors {
    pub fn new(dim: usize) -> Self {
        Self { vectors: HashMap::new(), dim }
    }

    pub fn insert(&mut self, word: impl Into<String>, vector: Vec<f32>) -> Result<()> {
        if vector.len() != self.dim {
            return Err(Error::Input(format!(
                "word vector has {} components, expected {}",
                vector.len(),
                self.dim
            )));
        }
        self.vectors.insert(word.into(), vector);
        Ok(())
    }

    /// Header line `<count> <dim>`, then `<word> <v1> .. <vdim>` per line.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().display().to_string();
        let parse_err = |lineno: usize, message: String| Error::Parse {
            path: path_str.clone(),
            message: format!("line {lineno}: {message}"),
        };
        let mut lines = BufReader::new(File::open(path.as_ref())?).lines();
        let header = lines.next().transpose()?.ok_or_else(|| parse_err(1, "missing header".into()))?;
        let dim = header
            .split_whitespace()
            .nth(1)
            .and_then(|d| d.parse::<usize>().ok())
            .filter(|&d| d > 0)
            .ok_or_else(|| parse_err(1, format!("bad header '{header}'")))?;

        let mut model = Self::new(dim);
        for (i, line) in lines.enumerate() {
            let line = line?;
            let mut parts = line.split_whitespace();
            let Some(word) = parts.next() else { continue };
            let vector = parts
                .map(str::parse::<f32>)
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| parse_err(i + 2, e.to_string()))?;
            model.insert(word, vector).map_err(|e| parse_err(i + 2, e.to_string()))?;
        }
        tracing::info!(path = %path.as_ref().display(), words = model.len(), dim, "loaded word vectors");
        Ok(model)
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

impl Embedder for WordVectors {
    fn dimension(&self) -> usize {
        self.dim
    }

    fn embed(&self, tokens: &[String]) -> Option<Vec<f32>> {
        let mut sum = vec![0.0f32; self.dim];
        let mut known = 0usize;
        for v in tokens.iter().filter_map(|t| self.vectors.get(t)) {
            for (s, x) in sum.iter_mut().zip(v) {
                *s += x;
            }
            known += 1;
        }
        if known == 0 {
            return None;
        }
        sum.iter_mut().for_each(|s| *s /= known as f32);
        Some(sum)
    }
}

/// Embed `tokens`, zero-filling when the model has nothing or returns the wrong size.
pub fn embed_or_zero(embedder: &dyn Embedder, tokens: &[String]) -> Vec<f32> {
    let dim = embedder.dimension();
    match embedder.embed(tokens) {
        Some(v) if v.len() == dim => v,
        _ => vec![0.0; dim],
    }
}
