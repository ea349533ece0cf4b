//! Document chunking
//!
//! Splits a loaded document into overlapping text chunks bounded by a
//! maximum size. A hierarchy of separators is tried in order of
//! preference: syntactic boundaries (definitions, blank lines) first,
//! then single newlines, then spaces, and finally a fixed-stride split
//! for text nothing else can divide. Chunk offsets always partition the
//! source text before overlap is applied, so every byte of the document
//! is covered by at least one chunk.

use serde::{Deserialize, Serialize};

use crate::errors::{RagError, Result};
use crate::loader::{Document, Language};

/// Chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Maximum chunk size in bytes, overlap included
    pub max_chunk_size: usize,
    /// Context shared between adjacent chunks, in bytes
    pub overlap: usize,
    /// Stride-split segments no separator can divide; when false such
    /// segments are emitted as oversized chunks instead
    pub split_oversized: bool,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: 750,
            overlap: 75,
            split_oversized: true,
        }
    }
}

/// A bounded slice of a document, carrying its byte offsets in the
/// original text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// `"{doc_path}:{index}"` - stable across rebuilds
    pub id: String,
    pub text: String,
    /// Byte offset range in the source document (overlap included)
    pub start: usize,
    pub end: usize,
    /// Position within the parent document
    pub index: usize,
    pub doc_path: String,
    pub language: Language,
}

/// Splits documents into overlapping chunks at preferred boundaries.
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        if config.max_chunk_size == 0 {
            return Err(RagError::InvalidConfig(
                "max_chunk_size must be positive".to_string(),
            ));
        }
        if config.overlap >= config.max_chunk_size {
            return Err(RagError::InvalidConfig(format!(
                "overlap ({}) must be smaller than max_chunk_size ({})",
                config.overlap, config.max_chunk_size
            )));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Split a document into chunks.
    ///
    /// The returned chunks appear in document order; before overlap
    /// extension their offset ranges partition the document text.
    pub fn chunk(&self, doc: &Document) -> Vec<Chunk> {
        let text = doc.content.as_str();
        if text.is_empty() {
            return Vec::new();
        }

        let mut windows = Vec::new();
        if text.len() <= self.config.max_chunk_size {
            windows.push((0, text.len()));
        } else {
            self.split_range(text, 0, text.len(), separators_for(doc.language), &mut windows);
        }

        if self.config.overlap > 0 {
            self.apply_overlap(text, &mut windows);
        }

        let doc_id = doc.doc_id();
        windows
            .into_iter()
            .enumerate()
            .map(|(index, (start, end))| Chunk {
                id: format!("{}:{}", doc_id, index),
                text: text[start..end].to_string(),
                start,
                end,
                index,
                doc_path: doc_id.clone(),
                language: doc.language,
            })
            .collect()
    }

    /// Window budget before overlap extension. Extension adds at most
    /// `overlap` bytes, keeping finished chunks within `max_chunk_size`.
    fn window_budget(&self) -> usize {
        self.config.max_chunk_size - self.config.overlap
    }

    /// Recursively split `text[start..end]` into contiguous windows no
    /// larger than the window budget, trying each separator in order and
    /// greedily merging small parts back together.
    fn split_range(
        &self,
        text: &str,
        start: usize,
        end: usize,
        seps: &[&str],
        out: &mut Vec<(usize, usize)>,
    ) {
        let budget = self.window_budget();
        if end - start <= budget {
            out.push((start, end));
            return;
        }

        for (si, sep) in seps.iter().enumerate() {
            // Split points at each separator occurrence; the separator
            // stays attached to the part that follows it, so no text is
            // dropped.
            let points: Vec<usize> = text[start..end]
                .match_indices(sep)
                .map(|(i, _)| start + i)
                .filter(|&p| p > start)
                .collect();
            if points.is_empty() {
                continue;
            }

            let mut bounds = Vec::with_capacity(points.len() + 2);
            bounds.push(start);
            bounds.extend(points);
            bounds.push(end);

            let mut win_start = start;
            for pair in bounds.windows(2) {
                let (ps, pe) = (pair[0], pair[1]);
                if pe - ps > budget {
                    // A single part too large for one window: flush what
                    // accumulated, then divide the part with the finer
                    // separators.
                    if ps > win_start {
                        out.push((win_start, ps));
                    }
                    self.split_range(text, ps, pe, &seps[si + 1..], out);
                    win_start = pe;
                } else if pe - win_start > budget && ps > win_start {
                    out.push((win_start, ps));
                    win_start = ps;
                }
            }
            if end > win_start {
                out.push((win_start, end));
            }
            return;
        }

        // No separator occurs in this segment.
        if !self.config.split_oversized {
            out.push((start, end));
            return;
        }
        let mut s = start;
        while s < end {
            let target = (s + budget).min(end);
            let mut e = floor_char_boundary(text, target);
            if e <= s {
                // A single char wider than the budget; take it whole.
                e = ceil_char_boundary(text, s + 1);
            }
            out.push((s, e));
            s = e;
        }
    }

    /// Extend each window's start backwards so adjacent chunks share
    /// `overlap` bytes of context. The first chunk is left untouched.
    fn apply_overlap(&self, text: &str, windows: &mut [(usize, usize)]) {
        for i in 1..windows.len() {
            let target = windows[i].0.saturating_sub(self.config.overlap);
            windows[i].0 = ceil_char_boundary(text, target);
        }
    }
}

/// Separator hierarchies per language, most-preferred first.
fn separators_for(language: Language) -> &'static [&'static str] {
    match language {
        Language::Python => &["\nclass ", "\ndef ", "\n    def ", "\n\tdef ", "\n\n", "\n", " "],
        Language::Rust => &["\nimpl ", "\nfn ", "\nstruct ", "\nenum ", "\ntrait ", "\n\n", "\n", " "],
        Language::Markdown => &["\n## ", "\n# ", "\n\n", "\n", " "],
        Language::Plain => &["\n\n", "\n", " "],
    }
}

/// Smallest char boundary at or after `i`.
fn ceil_char_boundary(text: &str, mut i: usize) -> usize {
    while i < text.len() && !text.is_char_boundary(i) {
        i += 1;
    }
    i.min(text.len())
}

/// Largest char boundary at or before `i`.
fn floor_char_boundary(text: &str, mut i: usize) -> usize {
    if i >= text.len() {
        return text.len();
    }
    while i > 0 && !text.is_char_boundary(i) {
        i -= 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn doc(content: &str, language: Language) -> Document {
        Document {
            content: content.to_string(),
            source_path: PathBuf::from("mem/test.py"),
            language,
        }
    }

    fn chunker(max: usize, overlap: usize) -> Chunker {
        Chunker::new(ChunkingConfig {
            max_chunk_size: max,
            overlap,
            split_oversized: true,
        })
        .unwrap()
    }

    #[test]
    fn test_rejects_overlap_not_smaller_than_max() {
        let result = Chunker::new(ChunkingConfig {
            max_chunk_size: 100,
            overlap: 100,
            split_oversized: true,
        });
        assert!(matches!(result, Err(RagError::InvalidConfig(_))));
    }

    #[test]
    fn test_empty_document_yields_no_chunks() {
        let chunks = chunker(750, 75).chunk(&doc("", Language::Plain));
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_small_document_is_one_chunk() {
        let text = "def get_scraper_path():\n    return '.'\n";
        let chunks = chunker(750, 75).chunk(&doc(text, Language::Python));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, text);
        assert_eq!(chunks[0].start, 0);
        assert_eq!(chunks[0].end, text.len());
    }

    #[test]
    fn test_offsets_cover_document() {
        let mut text = String::new();
        for i in 0..40 {
            text.push_str(&format!("def f{i}():\n    return {i} * {i}\n\n"));
        }
        let chunks = chunker(200, 20).chunk(&doc(&text, Language::Python));
        assert!(chunks.len() > 1);

        // First chunk starts at zero; every later chunk starts at or
        // before the previous end (overlap), never after it.
        assert_eq!(chunks[0].start, 0);
        for pair in chunks.windows(2) {
            assert!(pair[1].start <= pair[0].end);
            assert!(pair[1].end > pair[0].end);
        }
        assert_eq!(chunks.last().unwrap().end, text.len());

        // Slices match the recorded offsets.
        for c in &chunks {
            assert_eq!(c.text, &text[c.start..c.end]);
        }
    }

    #[test]
    fn test_chunks_respect_max_size() {
        let mut text = String::new();
        for i in 0..60 {
            text.push_str(&format!("line number {i} with a bit of padding text\n"));
        }
        let chunks = chunker(300, 50).chunk(&doc(&text, Language::Plain));
        for c in &chunks {
            assert!(c.text.len() <= 300, "chunk of {} bytes", c.text.len());
        }
    }

    #[test]
    fn test_adjacent_chunks_share_overlap() {
        let text = "word ".repeat(400);
        let chunks = chunker(500, 100).chunk(&doc(&text, Language::Plain));
        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            let shared = pair[0].end - pair[1].start;
            assert_eq!(shared, 100);
        }
    }

    #[test]
    fn test_indivisible_unit_stride_count() {
        // No separator occurs at all, so the stride fallback applies:
        // ceil(len / (max - overlap)) chunks.
        let text = "x".repeat(1000);
        let chunks = chunker(750, 75).chunk(&doc(&text, Language::Plain));
        assert_eq!(chunks.len(), 2); // ceil(1000 / 675)

        let text = "x".repeat(1400);
        let chunks = chunker(750, 75).chunk(&doc(&text, Language::Plain));
        assert_eq!(chunks.len(), 3); // ceil(1400 / 675)
        assert_eq!(chunks.last().unwrap().end, 1400);
    }

    #[test]
    fn test_oversized_unit_kept_whole_when_configured() {
        let text = "y".repeat(900);
        let chunker = Chunker::new(ChunkingConfig {
            max_chunk_size: 750,
            overlap: 75,
            split_oversized: false,
        })
        .unwrap();
        let chunks = chunker.chunk(&doc(&text, Language::Plain));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text.len(), 900);
    }

    #[test]
    fn test_prefers_function_boundaries() {
        let f1 = format!("def first():\n{}\n", "    a = 1\n".repeat(10));
        let f2 = format!("def second():\n{}\n", "    b = 2\n".repeat(10));
        let text = format!("{f1}{f2}");
        let max = f1.len().max(f2.len()) + 20;
        let chunks = chunker(max, 0).chunk(&doc(&text, Language::Python));

        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].text.starts_with("def first"));
        assert!(chunks[1].text.starts_with("\ndef second"));
    }

    #[test]
    fn test_multibyte_text_splits_on_char_boundaries() {
        let text = "é".repeat(600); // 1200 bytes, no separators
        let chunks = chunker(500, 50).chunk(&doc(&text, Language::Plain));
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert_eq!(c.text, &text[c.start..c.end]); // would panic off-boundary
        }
    }

    #[test]
    fn test_chunk_ids_are_stable() {
        let text = "alpha\n\nbeta\n\ngamma\n";
        let chunks = chunker(750, 75).chunk(&doc(text, Language::Plain));
        assert_eq!(chunks[0].id, "mem/test.py:0");
    }
}
