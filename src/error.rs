use std::error::Error;
use std::io;

/// Represents possible errors reported by the phrase index and its persistence layer.
///
/// Index operations (`add_index` / `remove_index` / `load`) return these as plain
/// `Result` errors; a child level's error is always propagated unchanged to the caller.
///
/// # Variants
/// - `PhraseTooLong(len)`: key length is at or beyond [`MAX_PHRASE_LENGTH`](crate::MAX_PHRASE_LENGTH).
///   Raised before any storage is touched.
/// - `ItemNotFound`: `remove_index` found no bucket, length slot or record for the key/token.
/// - `EmptyPhrase`: a zero-length key was given to `add_index` / `remove_index`.
/// - `CorruptedTable(String)`: a serialized buffer failed offset or length validation.
/// - `IoError(String)`: file access failed while saving or loading a table image.
/// - `ParseError(String)`: a table image header or a text dictionary could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhraseIndexError {
    PhraseTooLong(usize),
    ItemNotFound,
    EmptyPhrase,
    CorruptedTable(String),
    IoError(String),
    ParseError(String),
}

impl PhraseIndexError {
    pub(crate) fn corrupted(msg: impl Into<String>) -> Self {
        PhraseIndexError::CorruptedTable(msg.into())
    }
}

impl std::fmt::Display for PhraseIndexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PhraseIndexError::PhraseTooLong(len) => write!(f, "Phrase too long: length {}", len),
            PhraseIndexError::ItemNotFound => write!(f, "Item not found"),
            PhraseIndexError::EmptyPhrase => write!(f, "Empty phrase"),
            PhraseIndexError::CorruptedTable(msg) => write!(f, "Corrupted table: {}", msg),
            PhraseIndexError::IoError(msg) => write!(f, "I/O Error: {}", msg),
            PhraseIndexError::ParseError(msg) => write!(f, "Parse Error: {}", msg),
        }
    }
}

impl Error for PhraseIndexError {}

impl From<io::Error> for PhraseIndexError {
    fn from(err: io::Error) -> Self {
        PhraseIndexError::IoError(err.to_string())
    }
}

impl From<serde_cbor::Error> for PhraseIndexError {
    fn from(err: serde_cbor::Error) -> Self {
        PhraseIndexError::ParseError(err.to_string())
    }
}

/// Shorthand result type used throughout the crate.
pub type IndexResult<T> = Result<T, PhraseIndexError>;
