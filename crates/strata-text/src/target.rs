#![forbid(unsafe_code)]

//! Conversion of Unicode text into canvas bytes.
//!
//! Canvas rows are bytes in the active encoding plus a charset RLE list.
//! On terminals without UTF-8 the box-drawing characters are sent through
//! the VT100 special graphics set instead: each one is replaced by an ASCII
//! byte and the run is tagged [`Charset::Dec`]. Shift-out/shift-in control
//! bytes (`SO`, `SI`) delimit such runs inside byte strings.
//!
//! # Example
//!
//! ```
//! use strata_core::EncodingConfig;
//! use strata_text::target::{Charset, apply_target_encoding};
//!
//! let (bytes, cs) = apply_target_encoding(EncodingConfig::ASCII, "a─b");
//! assert_eq!(bytes, b"aqb");
//! assert_eq!(cs, vec![(None, 1), (Some(Charset::Dec), 1), (None, 1)]);
//! ```

use std::fmt;

use memchr::memchr;
use strata_core::{ByteEncoding, EncodingConfig};

use crate::rle::{Rle, rle_append_modify};
use crate::width::decode_one;

/// Shift out: switch to the alternate (DEC special graphics) set.
pub const SO: u8 = 0x0E;
/// Shift in: switch back to the standard set.
pub const SI: u8 = 0x0F;

/// Characters drawable with the DEC special graphics set.
pub const DEC_SPECIAL_CHARS: &str = "▮◆▒␉␌␍␊°±␤␋┘┐┌└┼⎺⎻─⎼⎽├┤┴┬│≤≥π≠£·";
/// The byte that selects each of [`DEC_SPECIAL_CHARS`] in the alternate set.
pub const ALT_DEC_SPECIAL_CHARS: &[u8; 32] = b"_`abcdefghijklmnopqrstuvwxyz{|}~";

/// Charset tag attached to a run of canvas bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Charset {
    /// DEC special graphics (line drawing), tag `"0"`.
    Dec,
    /// Raw bytes passed through to the terminal untouched, tag `"U"`.
    Passthrough,
}

impl Charset {
    /// The single-character tag used by screen backends.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Dec => "0",
            Self::Passthrough => "U",
        }
    }

    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "0" => Some(Self::Dec),
            "U" => Some(Self::Passthrough),
            _ => None,
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// The alternate-set byte for a DEC drawable character.
#[must_use]
pub fn dec_special_byte(ch: char) -> Option<u8> {
    DEC_SPECIAL_CHARS
        .chars()
        .position(|c| c == ch)
        .map(|i| ALT_DEC_SPECIAL_CHARS[i])
}

/// Encode `text` for the configured target.
///
/// Returns the bytes and their charset RLE list. Characters the target
/// cannot represent become `?`.
#[must_use]
pub fn apply_target_encoding(config: EncodingConfig, text: &str) -> (Vec<u8>, Rle<Option<Charset>>) {
    let mut raw = Vec::with_capacity(text.len());
    for ch in text.chars() {
        if config.dec_special
            && let Some(alt) = dec_special_byte(ch)
        {
            // Adjacent shifts cancel out.
            if raw.last() == Some(&SI) {
                raw.pop();
            } else {
                raw.push(SO);
            }
            raw.push(alt);
            raw.push(SI);
            continue;
        }
        if !config.target.encode_char(ch, &mut raw) {
            raw.push(b'?');
        }
    }
    split_charset_runs(&raw)
}

/// Encode a slice of layout text (bytes in the configured byte encoding).
///
/// UTF-8 text is decoded, with each malformed byte read as `?`, and then
/// converted like [`apply_target_encoding`]. Narrow and wide text is already
/// in terminal form; only its `SO`/`SI` markers are interpreted.
#[must_use]
pub fn encode_layout_bytes(config: EncodingConfig, bytes: &[u8]) -> (Vec<u8>, Rle<Option<Charset>>) {
    if config.byte_encoding != ByteEncoding::Utf8 {
        return split_charset_runs(bytes);
    }
    if let Ok(text) = std::str::from_utf8(bytes) {
        return apply_target_encoding(config, text);
    }
    let mut text = String::with_capacity(bytes.len());
    let mut pos = 0;
    while pos < bytes.len() {
        let (ch, next) = decode_one(bytes, pos);
        text.push(ch);
        pos = next;
    }
    apply_target_encoding(config, &text)
}

/// Interpret `SO`/`SI` markers in `bytes`.
///
/// Returns the bytes with the markers removed and a charset list tagging
/// shifted-out runs as [`Charset::Dec`].
#[must_use]
pub fn split_charset_runs(bytes: &[u8]) -> (Vec<u8>, Rle<Option<Charset>>) {
    let mut out = Vec::with_capacity(bytes.len());
    let mut cs = Vec::new();

    let mut push = |chunk: &[u8], tag: Option<Charset>, out: &mut Vec<u8>| {
        let before = out.len();
        out.extend(chunk.iter().copied().filter(|&b| b != SI));
        let added = out.len() - before;
        if added > 0 {
            rle_append_modify(&mut cs, (tag, added));
        }
    };

    let (head, mut rest) = match memchr(SO, bytes) {
        Some(i) => (&bytes[..i], Some(&bytes[i + 1..])),
        None => (bytes, None),
    };
    push(head, None, &mut out);

    while let Some(part) = rest {
        let (section, next) = match memchr(SO, part) {
            Some(i) => (&part[..i], Some(&part[i + 1..])),
            None => (part, None),
        };
        match memchr(SI, section) {
            Some(i) => {
                push(&section[..i], Some(Charset::Dec), &mut out);
                push(&section[i + 1..], None, &mut out);
            }
            None => push(section, Some(Charset::Dec), &mut out),
        }
        rest = next;
    }
    (out, cs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::TargetEncoding;

    fn convert(text: &str) -> (Vec<u8>, Rle<Option<Charset>>) {
        apply_target_encoding(EncodingConfig::ASCII, text)
    }

    const DEC: Option<Charset> = Some(Charset::Dec);

    #[test]
    fn no_conversion_for_plain_ascii() {
        assert_eq!(convert("hello"), (b"hello".to_vec(), vec![(None, 5)]));
    }

    #[test]
    fn dec_special_runs() {
        assert_eq!(convert("£££££"), (b"}}}}}".to_vec(), vec![(DEC, 5)]));
        assert_eq!(
            convert("££abc"),
            (b"}}abc".to_vec(), vec![(DEC, 2), (None, 3)])
        );
        assert_eq!(
            convert("abc££"),
            (b"abc}}".to_vec(), vec![(None, 3), (DEC, 2)])
        );
        assert_eq!(
            convert("a££bc"),
            (b"a}}bc".to_vec(), vec![(None, 1), (DEC, 2), (None, 2)])
        );
        assert_eq!(
            convert("£a£b£"),
            (
                b"}a}b}".to_vec(),
                vec![(DEC, 1), (None, 1), (DEC, 1), (None, 1), (DEC, 1)]
            )
        );
    }

    #[test]
    fn unrepresentable_become_question_marks() {
        assert_eq!(convert("é替"), (b"??".to_vec(), vec![(None, 2)]));
        let latin1 = EncodingConfig::from_label("latin1");
        assert_eq!(apply_target_encoding(latin1, "é").0, vec![0xE9]);
    }

    #[test]
    fn utf8_target_keeps_box_drawing() {
        let (bytes, cs) = apply_target_encoding(EncodingConfig::UTF8, "┌─┐");
        assert_eq!(bytes, "┌─┐".as_bytes());
        assert_eq!(cs, vec![(None, 9)]);
    }

    #[test]
    fn dec_special_applies_to_any_non_utf8_target() {
        let cfg = EncodingConfig {
            byte_encoding: ByteEncoding::Narrow,
            target: TargetEncoding::Latin1,
            dec_special: true,
        };
        assert_eq!(apply_target_encoding(cfg, "│").0, b"x");
    }

    #[test]
    fn split_handles_raw_shift_bytes() {
        let (bytes, cs) = split_charset_runs(b"ab\x0eqq\x0fcd\x0ex");
        assert_eq!(bytes, b"abqqcdx");
        assert_eq!(cs, vec![(None, 2), (DEC, 2), (None, 2), (DEC, 1)]);
        assert_eq!(split_charset_runs(b""), (Vec::new(), Vec::new()));
    }

    #[test]
    fn layout_bytes_follow_byte_encoding() {
        let (bytes, cs) = encode_layout_bytes(EncodingConfig::UTF8, b"ab\xffc");
        assert_eq!(bytes, b"ab?c");
        assert_eq!(cs, vec![(None, 4)]);
        let narrow = EncodingConfig::new(ByteEncoding::Narrow);
        let (bytes, cs) = encode_layout_bytes(narrow, b"\xe9\x0eq\x0f");
        assert_eq!(bytes, b"\xe9q");
        assert_eq!(cs, vec![(None, 1), (DEC, 1)]);
    }

    #[test]
    fn charset_tags() {
        assert_eq!(Charset::Dec.tag(), "0");
        assert_eq!(Charset::from_tag("U"), Some(Charset::Passthrough));
        assert_eq!(Charset::from_tag("x"), None);
        assert_eq!(dec_special_byte('─'), Some(b'q'));
        assert_eq!(dec_special_byte('a'), None);
    }
}
