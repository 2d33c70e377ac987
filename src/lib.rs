//! # phrase-large-table
//!
//! Exact-match phrase index for phonetic input engines.
//!
//! A phrase key is a short sequence of Unicode code points; every key maps to
//! one or more opaque [`PhraseToken`]s, each tagged with the library (system
//! dictionary, user dictionary, ...) it belongs to. Lookups report tokens into
//! per-library sinks ([`PhraseTokens`]) so whole libraries can be switched off
//! per query.
//!
//! The index has three levels:
//!
//! 1. [`PhraseBitmapIndex`]: 256 buckets chosen by bits 8–15 of the first code point.
//! 2. [`PhraseLengthIndex`]: one slot per phrase length inside a bucket.
//! 3. [`PhraseArrayIndex`]: a sorted run of fixed-width `(key, token)` records,
//!    binary searched.
//!
//! The whole structure serializes into one contiguous buffer and loads back
//! without re-sorting; loaded record runs are read in place.
//!
//! ## Example
//! ```
//! use phrase_large_table::{PhraseLargeTable, PhraseTokens, SearchFlags};
//!
//! let mut table = PhraseLargeTable::new();
//! table.add_index("你好", 0x0000_0001).unwrap();
//! table.add_index("你好", 0x0001_0002).unwrap();
//!
//! // only the system library (0) enabled
//! let mut tokens = PhraseTokens::with_libraries(&[0]);
//! assert_eq!(table.search("你好", &mut tokens), SearchFlags::OK);
//! assert_eq!(tokens.iter().collect::<Vec<_>>(), vec![0x0000_0001]);
//! ```

/// Print a developer note to **stderr** in *debug* builds; **no-op** in release.
///
/// Accepts the same syntax as [`eprintln!`].
///
/// # Examples
/// ```
/// use phrase_large_table::debug_note;
///
/// debug_note!("invalid line skipped: {}", "ni3 hao3");
/// ```
///
/// # Use cases
/// - Soft diagnostics while importing user-supplied text dictionaries
/// - Skipped records during bulk builds
#[macro_export]
macro_rules! debug_note {
    ($($arg:tt)*) => {
        #[allow(unused)]
        {
            if cfg!(debug_assertions) {
                eprintln!($($arg)*);
            }
        }
    };
}

pub mod error;
pub mod index_lib;
pub mod memory_chunk;
pub mod phrase_large_table;
pub mod phrase_tokens;

pub use crate::error::{IndexResult, PhraseIndexError};
pub use crate::index_lib::{
    PhraseArrayIndex, PhraseArrayLevel, PhraseBitmapIndex, PhraseLengthIndex,
};
pub use crate::memory_chunk::{ChunkSlice, MemoryChunk, SharedChunk};
pub use crate::phrase_large_table::PhraseLargeTable;
pub use crate::phrase_tokens::{
    library_of, make_token, PhraseToken, PhraseTokens, SearchFlags, Ucs4,
    PHRASE_INDEX_LIBRARY_COUNT, PHRASE_INDEX_LIBRARY_MASK,
};

/// Upper bound on phrase length. Keys of this length or longer are rejected by
/// `add_index` / `remove_index`.
pub const MAX_PHRASE_LENGTH: usize = 16;
