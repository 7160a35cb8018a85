use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use swat_core::config::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use swat_core::error::AppError;

use super::model::{Chunk, Document};

/// Break candidates, strongest first. Within a tier the latest match wins.
const BREAK_TIERS: &[&[&str]] = &[
    &["\n\n"],
    &[". ", "! ", "? ", ".\n", "!\n", "?\n"],
    &["\n"],
    &[" "],
];

const PAGE_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkerConfig {
    max_chars: usize,
    overlap_chars: usize,
}

impl ChunkerConfig {
    pub fn new(max_chars: usize, overlap_chars: usize) -> Result<Self, AppError> {
        if max_chars == 0 {
            return Err(AppError::invalid_argument("Chunk size must be at least 1 character"));
        }
        if overlap_chars >= max_chars {
            return Err(AppError::invalid_argument(
                "Chunk overlap must be smaller than the chunk size",
            )
            .with_details(format!("max_chars={max_chars}; overlap_chars={overlap_chars}")));
        }
        Ok(Self {
            max_chars,
            overlap_chars,
        })
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    pub fn overlap_chars(&self) -> usize {
        self.overlap_chars
    }
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_CHUNK_SIZE,
            overlap_chars: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> ChunkerConfig {
        self.config
    }

    /// Splits a document into overlapping windows. Pages are joined with a blank line and
    /// each chunk is attributed to the page its first character came from.
    pub fn chunk_document(&self, doc: &Document) -> Vec<Chunk> {
        let (chars, page_starts) = join_pages(doc);
        let windows = split_windows(&chars, self.config.max_chars, self.config.overlap_chars);

        let mut out = Vec::new();
        for (start, end) in windows {
            let text: String = chars[start..end].iter().collect();
            if text.trim().is_empty() {
                continue;
            }
            let sequence_index = out.len() as u32;
            let text_sha256 = sha256_hex(text.as_bytes());
            let chunk_id = sha256_hex(
                format!("v1|{}|{}|{}", doc.rel_path, sequence_index, text_sha256).as_bytes(),
            );
            out.push(Chunk {
                chunk_id,
                source: doc.name.clone(),
                rel_path: doc.rel_path.clone(),
                page: page_at(&page_starts, start),
                sequence_index,
                text,
                text_sha256,
                char_range: [start as u32, end as u32],
            });
        }
        out
    }
}

pub(crate) fn normalize_text(s: &str) -> String {
    s.replace("\r\n", "\n").replace('\r', "\n")
}

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

// Returns the joined characters and (char offset, page) for every non-empty page.
fn join_pages(doc: &Document) -> (Vec<char>, Vec<(usize, Option<u32>)>) {
    let mut chars: Vec<char> = Vec::new();
    let mut page_starts = Vec::new();
    for p in doc.pages.iter() {
        let normalized = normalize_text(&p.text);
        let text = normalized.trim();
        if text.is_empty() {
            continue;
        }
        if !chars.is_empty() {
            chars.extend(PAGE_SEPARATOR.chars());
        }
        page_starts.push((chars.len(), p.page));
        chars.extend(text.chars());
    }
    (chars, page_starts)
}

fn page_at(page_starts: &[(usize, Option<u32>)], offset: usize) -> Option<u32> {
    page_starts
        .iter()
        .take_while(|(start, _)| *start <= offset)
        .last()
        .and_then(|(_, page)| *page)
}

/// Window boundaries as `[start, end)` char offsets. Consecutive windows overlap by exactly
/// `overlap` chars; requires `overlap < max`.
fn split_windows(chars: &[char], max: usize, overlap: usize) -> Vec<(usize, usize)> {
    let n = chars.len();
    let mut out = Vec::new();
    if n == 0 {
        return out;
    }

    let mut start = 0;
    loop {
        let window_end = (start + max).min(n);
        let end = if window_end < n {
            find_break(&chars[start..window_end], overlap)
                .map(|off| start + off)
                .unwrap_or(window_end)
        } else {
            n
        };
        out.push((start, end));
        if end >= n {
            break;
        }
        // end - start > overlap, so this always advances.
        start = end - overlap;
    }
    out
}

/// Offset just past the best natural break in `window`, if one lies past the overlap and
/// past the first third of the window.
fn find_break(window: &[char], overlap: usize) -> Option<usize> {
    let min_end = (overlap + 1).max(window.len() / 3);
    for tier in BREAK_TIERS {
        let best = tier
            .iter()
            .filter_map(|pat| rfind_end(window, pat))
            .filter(|end| *end >= min_end)
            .max();
        if best.is_some() {
            return best;
        }
    }
    None
}

fn rfind_end(hay: &[char], pat: &str) -> Option<usize> {
    let pat: Vec<char> = pat.chars().collect();
    if pat.is_empty() || pat.len() > hay.len() {
        return None;
    }
    (0..=hay.len() - pat.len())
        .rev()
        .find(|&i| hay[i..i + pat.len()] == pat[..])
        .map(|i| i + pat.len())
}
