#![forbid(unsafe_code)]

//! Width and position oracle.
//!
//! Maps byte offsets to screen columns and back for text stored as raw bytes
//! in one of the three [`ByteEncoding`] regimes:
//!
//! - **Narrow**: one byte, one column.
//! - **Wide**: legacy double-byte CJK. A high-bit byte pair is one
//!   two-column character; see [`within_double_byte`].
//! - **UTF-8**: decoded and grouped into extended grapheme clusters. A
//!   cluster is never split; its width is 0, 1 or 2.
//!
//! Malformed UTF-8 never fails: each undecodable byte is treated as a
//! one-column `?`.
//!
//! [`TextMeasure`] captures the regime once. Layout and canvas code take a
//! measure at the top of each call so a concurrent encoding switch cannot
//! change widths mid-computation. The free functions resolve the current
//! encoding on every call.
//!
//! # Example
//!
//! ```
//! use strata_core::ByteEncoding;
//! use strata_text::width::TextMeasure;
//!
//! let m = TextMeasure::new(ByteEncoding::Utf8);
//! let text = "替洼 ok".as_bytes();
//! assert_eq!(m.calc_width(text, 0, text.len()), 7);
//! // Column 3 falls inside the second wide character: round down.
//! assert_eq!(m.calc_text_pos(text, 0, text.len(), 3), (3, 2));
//! ```

use strata_core::{ByteEncoding, current_encoding};
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthChar;

/// Initial number of bytes decoded when looking for a cluster boundary.
const CLUSTER_WINDOW: usize = 64;

// ============================================================================
// Character Widths
// ============================================================================

/// Screen column width of a single code point: 0, 1 or 2.
///
/// Control characters and combining marks are zero width; East Asian wide
/// and fullwidth characters (including emoji presentation) are two.
#[inline]
#[must_use]
pub fn get_width(ch: char) -> usize {
    if ch.is_ascii() {
        return usize::from(matches!(ch, ' '..='~'));
    }
    if ch.is_control() {
        return 0;
    }
    ch.width().unwrap_or(0).min(2)
}

#[inline]
fn is_emoji_codepoint(ch: char) -> bool {
    matches!(u32::from(ch), 0x1F000..=0x1FAFF)
}

/// Whether a multi-codepoint cluster renders as one emoji glyph.
///
/// Covers presentation selectors, ZWJ sequences, skin-tone modifiers and
/// regional-indicator flags.
#[inline]
fn is_emoji_cluster(cluster: &str) -> bool {
    cluster
        .chars()
        .any(|c| c == '\u{FE0F}' || is_emoji_codepoint(c))
}

/// Screen column width of one grapheme cluster.
#[must_use]
pub fn grapheme_width(cluster: &str) -> usize {
    let mut chars = cluster.chars();
    let Some(first) = chars.next() else {
        return 0;
    };
    if chars.as_str().is_empty() {
        return get_width(first);
    }
    if is_emoji_cluster(cluster) {
        return 2;
    }
    cluster.chars().map(get_width).max().unwrap_or(0)
}

/// Screen width of a Unicode string, independent of the byte encoding.
#[must_use]
pub fn str_width(text: &str) -> usize {
    if text.bytes().all(|b| (0x20..0x7F).contains(&b)) {
        return text.len();
    }
    text.graphemes(true).map(grapheme_width).sum()
}

// ============================================================================
// Byte-Level Decoding
// ============================================================================

/// Decode the UTF-8 character starting at `pos`.
///
/// Returns the character and the offset just past it. Truncated,
/// overlong, surrogate or otherwise malformed sequences decode to `?` and
/// advance by exactly one byte.
///
/// # Panics
///
/// Panics if `pos` is out of bounds.
#[must_use]
pub fn decode_one(text: &[u8], pos: usize) -> (char, usize) {
    let b1 = u32::from(text[pos]);
    if b1 & 0x80 == 0 {
        return (char::from(text[pos]), pos + 1);
    }
    let error = ('?', pos + 1);
    let avail = text.len() - pos;
    let cont = |i: usize| {
        let b = text[pos + i];
        (b & 0xC0 == 0x80).then_some(u32::from(b & 0x3F))
    };

    let (len, code, min) = if b1 & 0xE0 == 0xC0 {
        if avail < 2 {
            return error;
        }
        let Some(b2) = cont(1) else { return error };
        (2, ((b1 & 0x1F) << 6) | b2, 0x80)
    } else if b1 & 0xF0 == 0xE0 {
        if avail < 3 {
            return error;
        }
        let (Some(b2), Some(b3)) = (cont(1), cont(2)) else {
            return error;
        };
        (3, ((b1 & 0x0F) << 12) | (b2 << 6) | b3, 0x800)
    } else if b1 & 0xF8 == 0xF0 {
        if avail < 4 {
            return error;
        }
        let (Some(b2), Some(b3), Some(b4)) = (cont(1), cont(2), cont(3)) else {
            return error;
        };
        (
            4,
            ((b1 & 0x07) << 18) | (b2 << 12) | (b3 << 6) | b4,
            0x10000,
        )
    } else {
        return error;
    };

    if code < min {
        return error;
    }
    match char::from_u32(code) {
        Some(ch) => (ch, pos + len),
        None => error,
    }
}

/// Decode the UTF-8 character whose last byte is at `pos`.
///
/// Returns the character and the offset where it starts, or `None` if no
/// lead byte precedes `pos`.
#[must_use]
pub fn decode_one_right(text: &[u8], pos: usize) -> Option<(char, usize)> {
    let floor = pos.saturating_sub(3);
    (floor..=pos)
        .rev()
        .find(|&p| text[p] & 0xC0 != 0x80)
        .map(|p| (decode_one(text, p).0, p))
}

/// Classify `pos` relative to double-byte characters in the wide regime.
///
/// `line_start` is an offset known to begin a character. Returns 0 when
/// `pos` is not inside a double-byte character, 1 on the first half and 2 on
/// the second half. Bytes `0x40..0x7F` count as a second half when they
/// follow a first half (Big5, UHC and GBK trail bytes).
#[must_use]
pub fn within_double_byte(text: &[u8], line_start: usize, pos: usize) -> u8 {
    let v = text[pos];

    if (0x40..0x7F).contains(&v) {
        if pos == line_start {
            return 0;
        }
        if text[pos - 1] >= 0x81 && within_double_byte(text, line_start, pos - 1) == 1 {
            return 2;
        }
        return 0;
    }

    if v < 0x80 {
        return 0;
    }

    // Count the run of high-bit bytes ending at pos.
    let run = text[line_start..pos]
        .iter()
        .rev()
        .take_while(|&&b| b >= 0x80)
        .count();
    if run % 2 == 0 { 1 } else { 2 }
}

// ============================================================================
// Text Measure
// ============================================================================

/// Result of trimming a byte range to a column window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrimmedRange {
    /// First byte kept.
    pub start: usize,
    /// End of the kept bytes.
    pub end: usize,
    /// One column of padding replaces half a wide character on the left.
    pub pad_left: usize,
    /// One column of padding replaces half a wide character on the right.
    pub pad_right: usize,
}

/// Width oracle bound to one byte encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextMeasure {
    encoding: ByteEncoding,
}

impl TextMeasure {
    /// Oracle for an explicit encoding.
    #[inline]
    #[must_use]
    pub const fn new(encoding: ByteEncoding) -> Self {
        Self { encoding }
    }

    /// Oracle for the encoding in effect on this thread right now.
    #[inline]
    #[must_use]
    pub fn current() -> Self {
        Self::new(current_encoding().byte_encoding)
    }

    #[inline]
    #[must_use]
    pub const fn encoding(self) -> ByteEncoding {
        self.encoding
    }

    /// Byte length and width of the UTF-8 cluster at `pos`, never past `end`.
    fn utf8_cluster(text: &[u8], pos: usize, end: usize) -> (usize, usize) {
        let b = text[pos];
        if b < 0x80 && (pos + 1 >= end || text[pos + 1] < 0x80) {
            return (1, usize::from((0x20..0x7F).contains(&b)));
        }
        let mut window = CLUSTER_WINDOW;
        loop {
            let limit = end.min(pos.saturating_add(window));
            let chunk = &text[pos..limit];
            let valid = match std::str::from_utf8(chunk) {
                Ok(s) => s,
                Err(err) => std::str::from_utf8(&chunk[..err.valid_up_to()]).unwrap_or_default(),
            };
            let Some(cluster) = valid.graphemes(true).next() else {
                // Undecodable byte.
                return (1, 1);
            };
            if cluster.len() == valid.len() && limit < end {
                window *= 2;
                continue;
            }
            return (cluster.len(), grapheme_width(cluster));
        }
    }

    /// Total screen columns of `text[start..end]`.
    #[must_use]
    pub fn calc_width(self, text: &[u8], start: usize, end: usize) -> usize {
        if start >= end {
            return 0;
        }
        match self.encoding {
            ByteEncoding::Narrow | ByteEncoding::Wide => end - start,
            ByteEncoding::Utf8 => {
                let slice = &text[start..end];
                if slice.iter().all(|b| (0x20..0x7F).contains(b)) {
                    return slice.len();
                }
                let mut i = start;
                let mut sc = 0;
                while i < end {
                    let (len, w) = Self::utf8_cluster(text, i, end);
                    i += len;
                    sc += w;
                }
                sc
            }
        }
    }

    /// Closest offset in `text[start..end]` not past column `pref_col`.
    ///
    /// Returns `(offset, column)` where `column <= pref_col` is the width of
    /// `text[start..offset]`. A wide character or cluster straddling
    /// `pref_col` is excluded.
    #[must_use]
    pub fn calc_text_pos(
        self,
        text: &[u8],
        start: usize,
        end: usize,
        pref_col: usize,
    ) -> (usize, usize) {
        if start >= end {
            return (start, 0);
        }
        match self.encoding {
            ByteEncoding::Utf8 => {
                let mut i = start;
                let mut sc = 0;
                while i < end {
                    let (len, w) = Self::utf8_cluster(text, i, end);
                    if w + sc > pref_col {
                        return (i, sc);
                    }
                    i += len;
                    sc += w;
                }
                (i, sc)
            }
            ByteEncoding::Narrow | ByteEncoding::Wide => {
                let mut i = start.saturating_add(pref_col);
                if i >= end {
                    return (end, end - start);
                }
                if self.encoding == ByteEncoding::Wide && within_double_byte(text, start, i) == 2 {
                    i -= 1;
                }
                (i, i - start)
            }
        }
    }

    /// Whether the character at `offset` occupies two columns.
    #[must_use]
    pub fn is_wide_char(self, text: &[u8], offset: usize) -> bool {
        match self.encoding {
            ByteEncoding::Utf8 => Self::utf8_cluster(text, offset, text.len()).1 == 2,
            ByteEncoding::Wide => within_double_byte(text, offset, offset) == 1,
            ByteEncoding::Narrow => false,
        }
    }

    /// Offset of the character after the one at `start`, bounded by `end`.
    ///
    /// Returns `start` when `start >= end`.
    #[must_use]
    pub fn move_next_char(self, text: &[u8], start: usize, end: usize) -> usize {
        if start >= end {
            return start;
        }
        match self.encoding {
            ByteEncoding::Utf8 => start + Self::utf8_cluster(text, start, end).0,
            ByteEncoding::Wide if within_double_byte(text, start, start) == 1 => {
                (start + 2).min(end)
            }
            ByteEncoding::Wide | ByteEncoding::Narrow => start + 1,
        }
    }

    /// Offset of the character that ends at `end`, never before `start`.
    ///
    /// `start` must be a character boundary (normally the line start).
    /// Returns `end` when `start >= end`.
    #[must_use]
    pub fn move_prev_char(self, text: &[u8], start: usize, end: usize) -> usize {
        if start >= end {
            return end;
        }
        match self.encoding {
            ByteEncoding::Utf8 => {
                let prev = end - 1;
                if text[prev] < 0x80 && (prev == start || text[prev - 1] < 0x80) {
                    return prev;
                }
                let mut i = start;
                loop {
                    let next = i + Self::utf8_cluster(text, i, end).0;
                    if next >= end {
                        return i;
                    }
                    i = next;
                }
            }
            ByteEncoding::Wide if within_double_byte(text, start, end - 1) == 2 => {
                (end - 2).max(start)
            }
            ByteEncoding::Wide | ByteEncoding::Narrow => end - 1,
        }
    }

    /// Trim `text[start..end]` to the screen columns `start_col..end_col`.
    ///
    /// A wide character cut in half at either edge is dropped and reported
    /// as one column of padding.
    #[must_use]
    pub fn calc_trim_text(
        self,
        text: &[u8],
        start: usize,
        end: usize,
        start_col: usize,
        end_col: usize,
    ) -> TrimmedRange {
        let mut spos = start;
        let mut pad_left = 0;
        if start_col > 0 {
            let (pos, sc) = self.calc_text_pos(text, start, end, start_col);
            spos = pos;
            if sc < start_col {
                pad_left = 1;
                spos = self.calc_text_pos(text, start, end, start_col + 1).0;
            }
        }
        let run = end_col.saturating_sub(start_col).saturating_sub(pad_left);
        let (pos, sc) = self.calc_text_pos(text, spos, end, run);
        TrimmedRange {
            start: spos,
            end: pos,
            pad_left,
            pad_right: usize::from(sc < run),
        }
    }
}

// ============================================================================
// Current-Encoding Shorthands
// ============================================================================

/// [`TextMeasure::calc_width`] under the current encoding.
#[must_use]
pub fn calc_width(text: &[u8], start: usize, end: usize) -> usize {
    TextMeasure::current().calc_width(text, start, end)
}

/// [`TextMeasure::calc_text_pos`] under the current encoding.
#[must_use]
pub fn calc_text_pos(text: &[u8], start: usize, end: usize, pref_col: usize) -> (usize, usize) {
    TextMeasure::current().calc_text_pos(text, start, end, pref_col)
}

/// [`TextMeasure::is_wide_char`] under the current encoding.
#[must_use]
pub fn is_wide_char(text: &[u8], offset: usize) -> bool {
    TextMeasure::current().is_wide_char(text, offset)
}

/// [`TextMeasure::move_next_char`] under the current encoding.
#[must_use]
pub fn move_next_char(text: &[u8], start: usize, end: usize) -> usize {
    TextMeasure::current().move_next_char(text, start, end)
}

/// [`TextMeasure::move_prev_char`] under the current encoding.
#[must_use]
pub fn move_prev_char(text: &[u8], start: usize, end: usize) -> usize {
    TextMeasure::current().move_prev_char(text, start, end)
}

/// [`TextMeasure::calc_trim_text`] under the current encoding.
#[must_use]
pub fn calc_trim_text(
    text: &[u8],
    start: usize,
    end: usize,
    start_col: usize,
    end_col: usize,
) -> TrimmedRange {
    TextMeasure::current().calc_trim_text(text, start, end, start_col, end_col)
}
