//! Source tree loading
//!
//! Walks a file-system subtree and yields one [`Document`] per file whose
//! extension matches the configured suffix filter. Documents are immutable
//! once loaded; the chunker consumes them and nothing downstream touches
//! the file system again.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::errors::{RagError, Result};

/// Language tag derived from a file extension, used to pick chunking
/// separators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    Python,
    Rust,
    Markdown,
    Plain,
}

impl Language {
    /// Derive the language tag from a file path's extension
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|s| s.to_str()) {
            Some("py") => Language::Python,
            Some("rs") => Language::Rust,
            Some("md") => Language::Markdown,
            _ => Language::Plain,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Rust => "rust",
            Language::Markdown => "markdown",
            Language::Plain => "plain",
        }
    }
}

/// A loaded source file: raw text plus the metadata carried through the
/// pipeline into index entries.
#[derive(Debug, Clone)]
pub struct Document {
    pub content: String,
    pub source_path: PathBuf,
    pub language: Language,
}

impl Document {
    /// Load a single file as a document
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = read_content(path)?;
        Ok(Self {
            content,
            source_path: path.to_path_buf(),
            language: Language::from_path(path),
        })
    }

    /// Stable document identity used to derive chunk ids
    pub fn doc_id(&self) -> String {
        self.source_path.to_string_lossy().to_string()
    }
}

/// Walks a root directory and loads every file matching a suffix filter.
pub struct SourceLoader {
    root: PathBuf,
    suffixes: Vec<String>,
}

impl SourceLoader {
    /// Create a loader for `root`, keeping files whose extension is in
    /// `suffixes` (e.g. `["py", "md"]`). An empty filter keeps everything.
    pub fn new(root: impl Into<PathBuf>, suffixes: &[&str]) -> Self {
        Self {
            root: root.into(),
            suffixes: suffixes.iter().map(|s| s.trim_start_matches('.').to_string()).collect(),
        }
    }

    /// Load all matching files under the root, sorted by path.
    ///
    /// A single unreadable file fails the whole batch; there is no
    /// partial-load mode.
    pub fn load(&self) -> Result<Vec<Document>> {
        let mut paths: Vec<PathBuf> = WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.path().to_path_buf())
            .filter(|p| self.matches_suffix(p))
            .collect();
        paths.sort();

        let mut documents = Vec::with_capacity(paths.len());
        for path in &paths {
            documents.push(Document::from_path(path)?);
        }

        tracing::info!(
            root = %self.root.display(),
            files = documents.len(),
            "loaded source tree"
        );
        Ok(documents)
    }

    fn matches_suffix(&self, path: &Path) -> bool {
        if self.suffixes.is_empty() {
            return true;
        }
        match path.extension().and_then(|s| s.to_str()) {
            Some(ext) => self.suffixes.iter().any(|s| s == ext),
            None => false,
        }
    }
}

fn read_content(path: &Path) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        // Not valid UTF-8: retry lossily, only real I/O failures abort
        Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
            let bytes = fs::read(path).map_err(|source| RagError::DocumentLoad {
                path: path.display().to_string(),
                source,
            })?;
            Ok(String::from_utf8_lossy(&bytes).to_string())
        }
        Err(source) => Err(RagError::DocumentLoad {
            path: path.display().to_string(),
            source,
        }),
    }
}
