//! Token layout, per-library result sinks and search flags.
//!
//! A [`PhraseToken`] is an opaque 32-bit id. Bits 16–19 carry the *library*
//! (sub-dictionary) the entry belongs to; the remaining bits are a local id
//! inside that library:
//!
//! ```text
//!  31        20 19  16 15             0
//! +------------+------+----------------+
//! |  local hi  | lib  |    local lo    |
//! +------------+------+----------------+
//! ```
//!
//! Lookups report tokens into a [`PhraseTokens`] sink set: one optional
//! vector per library. A disabled (absent) slot filters that library out of
//! the query.

use bitflags::bitflags;

/// A single Unicode code point of a phrase key. Never validated.
pub type Ucs4 = u32;

/// Opaque phrase identifier; see the module docs for the bit layout.
pub type PhraseToken = u32;

/// Number of libraries addressable by a token.
pub const PHRASE_INDEX_LIBRARY_COUNT: usize = 1 << 4;

/// Bits of a token holding the library index.
pub const PHRASE_INDEX_LIBRARY_MASK: u32 = 0x000F_0000;

const PHRASE_INDEX_LIBRARY_SHIFT: u32 = 16;

/// Extracts the library index of `token`.
///
/// # Example
/// ```
/// use phrase_large_table::library_of;
///
/// assert_eq!(library_of(0x0000_0001), 0);
/// assert_eq!(library_of(0x0001_0002), 1);
/// ```
#[inline]
pub const fn library_of(token: PhraseToken) -> usize {
    ((token & PHRASE_INDEX_LIBRARY_MASK) >> PHRASE_INDEX_LIBRARY_SHIFT) as usize
}

/// Builds a token from a library index and a local id.
///
/// Library bits already present in `local` are cleared; `library` is taken modulo
/// [`PHRASE_INDEX_LIBRARY_COUNT`].
#[inline]
pub const fn make_token(library: usize, local: u32) -> PhraseToken {
    let lib = ((library as u32) << PHRASE_INDEX_LIBRARY_SHIFT) & PHRASE_INDEX_LIBRARY_MASK;
    (local & !PHRASE_INDEX_LIBRARY_MASK) | lib
}

bitflags! {
    /// Result flags of a `search` call.
    ///
    /// An empty set is the "none" result: nothing reported for this key.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SearchFlags: u8 {
        /// At least one token was appended to an enabled sink.
        const OK = 1 << 0;
        /// Longer phrases may exist in the same bucket; extending the key is worth trying.
        const CONTINUED = 1 << 1;
    }
}

impl SearchFlags {
    /// The empty result, named after the `SEARCH_NONE` status of the input engine.
    pub const NONE: SearchFlags = SearchFlags::empty();

    #[inline]
    pub fn is_ok(self) -> bool {
        self.contains(SearchFlags::OK)
    }

    #[inline]
    pub fn is_continued(self) -> bool {
        self.contains(SearchFlags::CONTINUED)
    }
}

/// Per-library output sinks for a lookup.
///
/// Slot `i` collects tokens whose [`library_of`] is `i`. A `None` slot means the
/// library is excluded from the query.
///
/// # Example
/// ```
/// use phrase_large_table::{PhraseTokens, make_token};
///
/// let mut tokens = PhraseTokens::with_libraries(&[0, 1]);
/// assert!(tokens.is_enabled(1));
/// assert!(!tokens.is_enabled(2));
///
/// tokens.push(make_token(1, 7));
/// assert_eq!(tokens.get(1), Some(&[make_token(1, 7)][..]));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhraseTokens {
    slots: [Option<Vec<PhraseToken>>; PHRASE_INDEX_LIBRARY_COUNT],
}

impl PhraseTokens {
    /// All libraries disabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every library enabled.
    pub fn all_enabled() -> Self {
        let mut tokens = Self::default();
        for slot in tokens.slots.iter_mut() {
            *slot = Some(Vec::new());
        }
        tokens
    }

    /// Only the listed libraries enabled. Out-of-range indices are ignored.
    pub fn with_libraries(libraries: &[usize]) -> Self {
        let mut tokens = Self::default();
        for &lib in libraries {
            tokens.enable(lib);
        }
        tokens
    }

    pub fn enable(&mut self, library: usize) {
        if let Some(slot) = self.slots.get_mut(library) {
            slot.get_or_insert_with(Vec::new);
        }
    }

    /// Disables `library`, dropping anything it collected.
    pub fn disable(&mut self, library: usize) {
        if let Some(slot) = self.slots.get_mut(library) {
            *slot = None;
        }
    }

    #[inline]
    pub fn is_enabled(&self, library: usize) -> bool {
        matches!(self.slots.get(library), Some(Some(_)))
    }

    /// Appends `token` to its library's sink.
    ///
    /// Returns `false` (and drops the token) when that library is disabled.
    #[inline]
    pub fn push(&mut self, token: PhraseToken) -> bool {
        match &mut self.slots[library_of(token)] {
            Some(sink) => {
                sink.push(token);
                true
            }
            None => false,
        }
    }

    /// Tokens collected for `library`, or `None` if it is disabled.
    pub fn get(&self, library: usize) -> Option<&[PhraseToken]> {
        self.slots.get(library)?.as_deref()
    }

    /// Empties every enabled sink, keeping the enabled set.
    pub fn clear(&mut self) {
        for sink in self.slots.iter_mut().flatten() {
            sink.clear();
        }
    }

    /// Number of tokens collected across all libraries.
    pub fn total(&self) -> usize {
        self.slots.iter().flatten().map(Vec::len).sum()
    }

    /// Iterates collected tokens in library order.
    pub fn iter(&self) -> impl Iterator<Item = PhraseToken> + '_ {
        self.slots.iter().flatten().flat_map(|sink| sink.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn library_bits_round_trip() {
        for lib in 0..PHRASE_INDEX_LIBRARY_COUNT {
            let token = make_token(lib, 0xFFF0_FFFF);
            assert_eq!(library_of(token), lib);
            assert_eq!(token & !PHRASE_INDEX_LIBRARY_MASK, 0xFFF0_FFFF);
        }
    }

    #[test]
    fn disabled_library_drops_token() {
        let mut tokens = PhraseTokens::with_libraries(&[0]);
        assert!(tokens.push(0x0000_0001));
        assert!(!tokens.push(0x0001_0002));
        assert_eq!(tokens.total(), 1);
        assert_eq!(tokens.get(1), None);
    }

    #[test]
    fn clear_keeps_enabled_set() {
        let mut tokens = PhraseTokens::all_enabled();
        tokens.push(make_token(3, 1));
        tokens.clear();
        assert!(tokens.is_enabled(3));
        assert_eq!(tokens.total(), 0);
    }

    #[test]
    fn none_flag_is_empty() {
        assert!(SearchFlags::NONE.is_empty());
        assert!(!SearchFlags::NONE.is_ok());
        assert!((SearchFlags::OK | SearchFlags::CONTINUED).is_continued());
    }
}
