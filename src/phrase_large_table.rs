//! String-level facade over [`PhraseBitmapIndex`].
//!
//! [`PhraseLargeTable`] converts `&str` phrases to code points, imports plain-text
//! dictionaries and saves/loads whole table images as Zstd-compressed files.
//!
//! ## Text format
//! One entry per line: `phrase<whitespace>token`, where `token` is decimal or
//! `0x`-prefixed hex. Extra columns are ignored; blank lines and lines starting
//! with `#` are skipped.
//!
//! ```text
//! # phrase  token
//! 你好      0x00000001
//! 你好      65538
//! ```
//!
//! ## File format
//! `zstd( [header_len: u32] [CBOR header] [table image] )`. The table image is
//! exactly what [`PhraseBitmapIndex::store`] writes at offset 0.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use zstd::{decode_all, Encoder};

use crate::debug_note;
use crate::error::{IndexResult, PhraseIndexError};
use crate::index_lib::PhraseBitmapIndex;
use crate::memory_chunk::{read_u32_le, MemoryChunk, SharedChunk};
use crate::phrase_tokens::{PhraseToken, PhraseTokens, SearchFlags, Ucs4};
use crate::MAX_PHRASE_LENGTH;

// Define a global mutable variable to store the error message
static LAST_ERROR: Mutex<Option<String>> = Mutex::new(None);

static LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\S+)\s+(0[xX][0-9A-Fa-f]+|[0-9]+)(?:\s.*)?$").unwrap()
});

const IMAGE_MAGIC: &str = "phrase-large-table";
const IMAGE_VERSION: u32 = 1;
const ZSTD_LEVEL: i32 = 19;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
struct ImageHeader {
    magic: String,
    version: u32,
    image_len: u64,
    records: u64,
}

/// Phrase index keyed by `&str`.
///
/// # Example
/// ```
/// use phrase_large_table::{PhraseLargeTable, PhraseTokens};
///
/// let mut table = PhraseLargeTable::new();
/// let added = table.load_text("你好 1\n你好吗 2\n# comment\n").unwrap();
/// assert_eq!(added, 2);
///
/// let mut tokens = PhraseTokens::all_enabled();
/// let flags = table.search("你好", &mut tokens);
/// assert!(flags.is_ok() && flags.is_continued());
/// ```
#[derive(Debug, Default)]
pub struct PhraseLargeTable {
    index: PhraseBitmapIndex,
}

impl PhraseLargeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from `(phrase, token)` pairs via the parallel bulk builder.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, PhraseToken)>,
        S: AsRef<str>,
    {
        let records = pairs
            .into_iter()
            .map(|(phrase, token)| (to_ucs4(phrase.as_ref()), token));
        Self {
            index: PhraseBitmapIndex::build_from_records(records),
        }
    }

    pub fn index(&self) -> &PhraseBitmapIndex {
        &self.index
    }

    pub fn index_mut(&mut self) -> &mut PhraseBitmapIndex {
        &mut self.index
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn reset(&mut self) {
        self.index.reset();
    }

    pub fn search(&self, phrase: &str, tokens: &mut PhraseTokens) -> SearchFlags {
        self.index.search(&to_ucs4(phrase), tokens)
    }

    pub fn add_index(&mut self, phrase: &str, token: PhraseToken) -> IndexResult<()> {
        self.index.add_index(&to_ucs4(phrase), token)
    }

    pub fn remove_index(&mut self, phrase: &str, token: PhraseToken) -> IndexResult<()> {
        self.index.remove_index(&to_ucs4(phrase), token)
    }

    /// Imports a text dictionary and returns the number of entries added.
    ///
    /// Malformed lines, over-long phrases and repeated `(phrase, token)` pairs are
    /// skipped (first-wins). A fresh table (no bucket ever created) is filled
    /// through the bulk builder; otherwise entries are inserted one by one so
    /// existing length slots are kept.
    pub fn load_text(&mut self, content: &str) -> IndexResult<usize> {
        let mut seen: FxHashSet<(Vec<Ucs4>, PhraseToken)> = FxHashSet::default();
        let mut records = Vec::new();

        for (lineno, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let Some((phrase, token)) = parse_line(trimmed) else {
                debug_note!("Invalid line format at {}: {}", lineno + 1, line);
                continue;
            };
            if phrase.len() >= MAX_PHRASE_LENGTH {
                debug_note!("Phrase too long at {}: {}", lineno + 1, line);
                continue;
            }
            if !seen.insert((phrase.clone(), token)) {
                debug_note!("duplicate entry ignored at {}: {}", lineno + 1, line);
                continue;
            }
            records.push((phrase, token));
        }

        let added = records.len();
        if self.index.bucket_count() == 0 {
            self.index = PhraseBitmapIndex::build_from_records(records);
        } else {
            for (phrase, token) in &records {
                self.index.add_index(phrase, *token)?;
            }
        }
        Ok(added)
    }

    /// Reads and imports a text dictionary file.
    pub fn load_text_file<P: AsRef<Path>>(&mut self, path: P) -> IndexResult<usize> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|err| {
            let msg = format!("Failed to read file {}: {}", path.display(), err);
            Self::set_last_error(&msg);
            PhraseIndexError::IoError(msg)
        })?;
        self.load_text(&content)
    }

    /// Serializes the whole index into a fresh buffer, starting at offset 0.
    pub fn store_image(&self) -> IndexResult<MemoryChunk> {
        let mut chunk = MemoryChunk::new();
        self.index.store(&mut chunk, 0)?;
        Ok(chunk)
    }

    /// Replaces the contents with the image in `chunk`. Record runs stay shared
    /// with `chunk` until they are modified.
    pub fn load_image(&mut self, chunk: &SharedChunk) -> IndexResult<()> {
        self.index.load(chunk, 0, chunk.len())
    }

    /// Saves the table to a Zstd-compressed image file.
    pub fn save_compressed<P: AsRef<Path>>(&self, path: P) -> IndexResult<()> {
        self.write_compressed(path.as_ref()).map_err(|err| {
            Self::set_last_error(&format!("Failed to save table: {}", err));
            err
        })
    }

    /// Loads a table from a file written by [`save_compressed`](Self::save_compressed).
    pub fn load_compressed<P: AsRef<Path>>(path: P) -> IndexResult<Self> {
        Self::read_compressed(path.as_ref()).map_err(|err| {
            Self::set_last_error(&format!("Failed to load table: {}", err));
            err
        })
    }

    fn write_compressed(&self, path: &Path) -> IndexResult<()> {
        let image = self.store_image()?;
        let header = ImageHeader {
            magic: IMAGE_MAGIC.to_string(),
            version: IMAGE_VERSION,
            image_len: image.current_end() as u64,
            records: self.len() as u64,
        };
        let header_bytes = serde_cbor::to_vec(&header)?;

        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        let mut encoder = Encoder::new(writer, ZSTD_LEVEL)?;
        encoder.write_all(&(header_bytes.len() as u32).to_le_bytes())?;
        encoder.write_all(&header_bytes)?;
        encoder.write_all(image.as_bytes())?;
        encoder.finish()?.flush()?;
        Ok(())
    }

    fn read_compressed(path: &Path) -> IndexResult<Self> {
        let file = File::open(path)?;
        let bytes = decode_all(BufReader::new(file))?;

        if bytes.len() < 4 {
            return Err(PhraseIndexError::ParseError("missing image header".to_string()));
        }
        let header_len = read_u32_le(&bytes) as usize;
        let body_at = 4usize
            .checked_add(header_len)
            .filter(|&at| at <= bytes.len())
            .ok_or_else(|| PhraseIndexError::ParseError("truncated image header".to_string()))?;
        let header: ImageHeader = serde_cbor::from_slice(&bytes[4..body_at])?;

        if header.magic != IMAGE_MAGIC || header.version != IMAGE_VERSION {
            return Err(PhraseIndexError::ParseError(format!(
                "unsupported image {:?} version {}",
                header.magic, header.version
            )));
        }
        let body = &bytes[body_at..];
        if header.image_len != body.len() as u64 {
            return Err(PhraseIndexError::corrupted(format!(
                "image is {} bytes, header says {}",
                body.len(),
                header.image_len
            )));
        }

        let mut table = Self::new();
        table.load_image(&SharedChunk::from(body))?;
        if table.len() as u64 != header.records {
            return Err(PhraseIndexError::corrupted(format!(
                "image holds {} records, header says {}",
                table.len(),
                header.records
            )));
        }
        Ok(table)
    }

    /// Records the last error message encountered while loading or saving.
    pub fn set_last_error(err_msg: &str) {
        if let Ok(mut last_error) = LAST_ERROR.lock() {
            *last_error = Some(err_msg.to_string());
        }
    }

    /// Retrieves the last error message set while loading or saving.
    pub fn get_last_error() -> Option<String> {
        LAST_ERROR.lock().ok().and_then(|last_error| last_error.clone())
    }
}

/// Converts `phrase` to its code points.
pub fn to_ucs4(phrase: &str) -> Vec<Ucs4> {
    phrase.chars().map(u32::from).collect()
}

fn parse_line(line: &str) -> Option<(Vec<Ucs4>, PhraseToken)> {
    let caps = LINE_RE.captures(line)?;
    let phrase = to_ucs4(caps.get(1)?.as_str());
    let raw = caps.get(2)?.as_str();
    let token = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => raw.parse::<u32>().ok()?,
    };
    Some((phrase, token))
}
