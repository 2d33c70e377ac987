//! The three-level phrase index.
//!
//! - [`PhraseBitmapIndex`]: 256 buckets keyed by bits 8–15 of the first code point.
//! - [`PhraseLengthIndex`]: one slot per phrase length inside a bucket.
//! - [`PhraseArrayIndex`]: sorted `(key[L], token)` records for a single length `L`.
//!
//! Every level shares the same `load(chunk, offset, end)` / `store(chunk, offset) -> end`
//! protocol over one byte buffer, so a whole index is written once and later reopened
//! without re-sorting; loaded arrays read straight out of the shared buffer.

mod array_index;
mod bitmap_index;
mod builder;
mod length_index;

pub use array_index::{new_array_index, record_width, PhraseArrayIndex, PhraseArrayLevel};
pub use bitmap_index::{bucket_of, PhraseBitmapIndex, BITMAP_TABLE_SIZE, PHRASE_NUMBER_OF_BITMAP_INDEX};
pub use length_index::PhraseLengthIndex;
