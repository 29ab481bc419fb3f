//! Collection loading: files on disk to tokenized documents.

use crate::error::{Error, Result};
use crate::tokenizer::Tokenizer;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Deserialize)]
struct InputDoc {
    id: String,
    #[serde(default)]
    title: Option<String>,
    body: String,
}

/// A tokenized document before any index has seen it.
#[derive(Debug, Clone)]
pub struct RawDoc {
    pub external_id: String,
    pub title: Option<String>,
    pub tokens: Vec<String>,
}

/// Ordered batch of documents. Position in `docs` becomes the internal doc id.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    pub docs: Vec<RawDoc>,
}

impl Corpus {
    /// Corpus from already tokenized documents.
    pub fn from_tokens<I, S>(docs: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<String>)>,
        S: Into<String>,
    {
        let docs = docs
            .into_iter()
            .map(|(id, tokens)| RawDoc { external_id: id.into(), title: None, tokens })
            .collect();
        Self { docs }
    }

    /// Corpus from raw texts, ids are their positions.
    pub fn from_texts<'a, I: IntoIterator<Item = &'a str>>(texts: I, tokenizer: &Tokenizer) -> Self {
        Self::from_tokens(
            texts
                .into_iter()
                .enumerate()
                .map(|(i, text)| (i.to_string(), tokenizer.tokenize(text))),
        )
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Load a file or every file below a directory, in sorted path order.
    ///
    /// `.json` holds one record or an array of records, `.jsonl` one record per
    /// line; both use `{id, title?, body}`. Any other file is read line by line
    /// as `<external-id> <text>`.
    pub fn load<P: AsRef<Path>>(path: P, tokenizer: &Tokenizer) -> Result<Self> {
        let path = path.as_ref();
        let mut files: Vec<PathBuf> = Vec::new();
        if path.is_dir() {
            for entry in WalkDir::new(path).into_iter().filter_map(|e| e.ok()) {
                if entry.path().is_file() {
                    files.push(entry.path().to_path_buf());
                }
            }
            files.sort();
        } else if path.is_file() {
            files.push(path.to_path_buf());
        } else {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("collection not found: {}", path.display()),
            )));
        }

        let mut corpus = Corpus::default();
        for file in files {
            match file.extension().and_then(|s| s.to_str()) {
                Some("jsonl") => corpus.read_jsonl(&file, tokenizer)?,
                Some("json") => corpus.read_json(&file, tokenizer)?,
                _ => corpus.read_lines(&file, tokenizer)?,
            }
        }
        tracing::info!(path = %path.display(), num_docs = corpus.len(), "loaded collection");
        Ok(corpus)
    }

    fn push(&mut self, doc: InputDoc, tokenizer: &Tokenizer) {
        let tokens = tokenizer.tokenize(&doc.body);
        self.docs.push(RawDoc { external_id: doc.id, title: doc.title, tokens });
    }

    fn read_jsonl(&mut self, file: &Path, tokenizer: &Tokenizer) -> Result<()> {
        let reader = BufReader::new(File::open(file)?);
        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let doc: InputDoc = serde_json::from_str(&line).map_err(|e| Error::Parse {
                path: file.display().to_string(),
                message: format!("line {}: {e}", lineno + 1),
            })?;
            self.push(doc, tokenizer);
        }
        Ok(())
    }

    fn read_json(&mut self, file: &Path, tokenizer: &Tokenizer) -> Result<()> {
        let reader = BufReader::new(File::open(file)?);
        let json: serde_json::Value = serde_json::from_reader(reader)?;
        match json {
            serde_json::Value::Array(arr) => {
                for v in arr {
                    let doc: InputDoc = serde_json::from_value(v)?;
                    self.push(doc, tokenizer);
                }
            }
            serde_json::Value::Object(_) => {
                let doc: InputDoc = serde_json::from_value(json)?;
                self.push(doc, tokenizer);
            }
            _ => tracing::warn!(file = %file.display(), "skipping json file without document records"),
        }
        Ok(())
    }

    fn read_lines(&mut self, file: &Path, tokenizer: &Tokenizer) -> Result<()> {
        let reader = BufReader::new(File::open(file)?);
        for line in reader.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (id, text) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
            self.docs.push(RawDoc {
                external_id: id.to_string(),
                title: None,
                tokens: tokenizer.tokenize(text),
            });
        }
        Ok(())
    }
}
