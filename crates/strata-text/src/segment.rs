#![forbid(unsafe_code)]

//! Layout structures: segments, lines, and per-line transforms.
//!
//! A [`Layout`] is one [`LineLayout`] per output row. Each line is a list of
//! [`LayoutSegment`]s that together describe exactly which source bytes land
//! in which screen columns, so offsets can be recovered from coordinates and
//! back (see [`crate::position`]).

use smallvec::SmallVec;

use crate::width::TextMeasure;

/// Inline storage for literal segment text (ellipses, trimmed wide chars).
pub type LiteralBytes = SmallVec<[u8; 8]>;

/// One instruction in a line layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LayoutSegment {
    /// `width` blank columns.
    ///
    /// With `offset: None` the pad is a shift applied to the whole line and
    /// may be negative (content scrolled left). With `offset: Some(o)` the
    /// blanks take the attribute at `o`; a zero-width pad with an offset marks
    /// an addressable position such as a removed space or newline.
    Pad { width: isize, offset: Option<usize> },
    /// Source bytes `start..end` occupying `width` columns.
    Range {
        width: usize,
        start: usize,
        end: usize,
    },
    /// Inserted bytes occupying `width` columns, attributed like `offset`.
    Literal {
        width: usize,
        offset: usize,
        text: LiteralBytes,
    },
}

impl LayoutSegment {
    /// A line shift of `amount` columns.
    #[inline]
    #[must_use]
    pub const fn shift(amount: isize) -> Self {
        Self::Pad {
            width: amount,
            offset: None,
        }
    }

    /// Blank columns attributed like `offset`.
    #[inline]
    #[must_use]
    pub const fn pad(width: usize, offset: usize) -> Self {
        Self::Pad {
            width: width as isize,
            offset: Some(offset),
        }
    }

    /// A zero-width marker at `offset`.
    #[inline]
    #[must_use]
    pub const fn marker(offset: usize) -> Self {
        Self::pad(0, offset)
    }

    #[inline]
    #[must_use]
    pub const fn range(width: usize, start: usize, end: usize) -> Self {
        Self::Range { width, start, end }
    }

    #[must_use]
    pub fn literal(width: usize, offset: usize, text: &[u8]) -> Self {
        Self::Literal {
            width,
            offset,
            text: LiteralBytes::from_slice(text),
        }
    }

    /// Screen columns covered. Only a shift can be negative.
    #[inline]
    #[must_use]
    pub const fn width(&self) -> isize {
        match self {
            Self::Pad { width, .. } => *width,
            Self::Range { width, .. } | Self::Literal { width, .. } => *width as isize,
        }
    }

    /// Source offset this segment refers to, if any.
    #[inline]
    #[must_use]
    pub const fn offset(&self) -> Option<usize> {
        match self {
            Self::Pad { offset, .. } => *offset,
            Self::Range { start, .. } => Some(*start),
            Self::Literal { offset, .. } => Some(*offset),
        }
    }

    /// Whether this is a line shift rather than content.
    #[inline]
    #[must_use]
    pub const fn is_shift(&self) -> bool {
        matches!(self, Self::Pad { offset: None, .. })
    }

    /// The segments covering columns `start..end` of this segment.
    ///
    /// Halves of wide characters at either edge become one-column blanks,
    /// so up to three segments can come back.
    #[must_use]
    pub fn subseg(
        &self,
        measure: TextMeasure,
        text: &[u8],
        start: isize,
        end: isize,
    ) -> Vec<LayoutSegment> {
        let start = start.max(0);
        let end = end.min(self.width());
        if start >= end {
            return Vec::new();
        }
        let cols = (end - start) as usize;
        let (start, end) = (start as usize, end as usize);

        match self {
            Self::Literal {
                offset, text: lit, ..
            } => {
                let trim = measure.calc_trim_text(lit, 0, lit.len(), start, end);
                let mut out = LiteralBytes::new();
                out.extend(std::iter::repeat_n(b' ', trim.pad_left));
                out.extend_from_slice(&lit[trim.start..trim.end]);
                out.extend(std::iter::repeat_n(b' ', trim.pad_right));
                vec![Self::Literal {
                    width: cols,
                    offset: *offset,
                    text: out,
                }]
            }
            Self::Range {
                start: s_off,
                end: e_off,
                ..
            } => {
                let trim = measure.calc_trim_text(text, *s_off, *e_off, start, end);
                let mut out = Vec::with_capacity(3);
                if trim.pad_left > 0 {
                    out.push(Self::pad(1, trim.start.saturating_sub(1)));
                }
                let inner = cols - trim.pad_left - trim.pad_right;
                if inner > 0 {
                    out.push(Self::range(inner, trim.start, trim.end));
                }
                if trim.pad_right > 0 {
                    out.push(Self::pad(1, trim.end));
                }
                out
            }
            Self::Pad { offset, .. } => vec![Self::Pad {
                width: cols as isize,
                offset: *offset,
            }],
        }
    }
}

/// Segments making up one output row.
pub type LineLayout = Vec<LayoutSegment>;

/// One [`LineLayout`] per output row.
pub type Layout = Vec<LineLayout>;

/// Screen width of a line, ignoring a leading shift.
#[must_use]
pub fn line_width(line: &[LayoutSegment]) -> usize {
    let segs = match line.first() {
        Some(first) if first.is_shift() => &line[1..],
        _ => line,
    };
    let total: isize = segs.iter().map(LayoutSegment::width).sum();
    usize::try_from(total).unwrap_or(0)
}

/// Shift a line right (positive) or left (negative) by `amount` columns.
///
/// An existing leading shift absorbs the amount; a net shift of zero is
/// removed.
#[must_use]
pub fn shift_line(line: &[LayoutSegment], amount: isize) -> LineLayout {
    let (amount, rest) = match line.first() {
        Some(LayoutSegment::Pad {
            width,
            offset: None,
        }) => (amount + width, &line[1..]),
        _ => (amount, line),
    };
    let mut out = Vec::with_capacity(rest.len() + 1);
    if amount != 0 {
        out.push(LayoutSegment::shift(amount));
    }
    out.extend_from_slice(rest);
    out
}

/// The part of `line` visible in screen columns `start..end`.
///
/// Boundary segments are split with [`LayoutSegment::subseg`]; a negative
/// leading shift hides that many columns of what follows.
#[must_use]
pub fn trim_line(
    measure: TextMeasure,
    line: &[LayoutSegment],
    text: &[u8],
    start: usize,
    end: usize,
) -> LineLayout {
    let mut result = Vec::new();
    let mut start = start as isize;
    let end = end as isize;
    let mut x: isize = 0;

    for seg in line {
        let sc = seg.width();
        if start != 0 || sc < 0 {
            if start >= sc {
                start -= sc;
                x += sc;
                continue;
            }
            if x + sc >= end {
                // Everything left fits inside this one segment.
                return seg.subseg(measure, text, start, end - x);
            }
            result.extend(seg.subseg(measure, text, start, sc));
            start = 0;
            x += sc;
            continue;
        }
        if x + sc > end {
            result.extend(seg.subseg(measure, text, 0, end - x));
            break;
        }
        result.push(seg.clone());
        x += sc;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::ByteEncoding;

    const WIDE: TextMeasure = TextMeasure::new(ByteEncoding::Wide);
    const NARROW: TextMeasure = TextMeasure::new(ByteEncoding::Narrow);

    fn shift(n: isize) -> LayoutSegment {
        LayoutSegment::shift(n)
    }
    fn pad(w: usize, o: usize) -> LayoutSegment {
        LayoutSegment::pad(w, o)
    }
    fn range(w: usize, s: usize, e: usize) -> LayoutSegment {
        LayoutSegment::range(w, s, e)
    }
    fn lit(w: usize, o: usize, t: &[u8]) -> LayoutSegment {
        LayoutSegment::literal(w, o, t)
    }

    // ========================================================================
    // subseg
    // ========================================================================

    #[test]
    fn subseg_padding() {
        assert_eq!(shift(10).subseg(WIDE, b"", 0, 8), vec![shift(8)]);
        assert_eq!(shift(10).subseg(WIDE, b"", 2, 10), vec![shift(8)]);
        assert_eq!(pad(10, 0).subseg(WIDE, b"", 3, 7), vec![pad(4, 0)]);
        assert_eq!(pad(10, 0).subseg(WIDE, b"", 0, 20), vec![pad(10, 0)]);
    }

    #[test]
    fn subseg_literal_text() {
        let digits = lit(10, 0, b"1234567890");
        assert_eq!(digits.subseg(WIDE, b"", 0, 8), vec![lit(8, 0, b"12345678")]);
        assert_eq!(digits.subseg(WIDE, b"", 2, 10), vec![lit(8, 0, b"34567890")]);

        let mixed = lit(10, 0, b"12\xA1\xA156\xA1\xA190");
        assert_eq!(
            mixed.subseg(WIDE, b"", 2, 8),
            vec![lit(6, 0, b"\xA1\xA156\xA1\xA1")]
        );
        assert_eq!(mixed.subseg(WIDE, b"", 3, 8), vec![lit(5, 0, b" 56\xA1\xA1")]);
        assert_eq!(mixed.subseg(WIDE, b"", 2, 7), vec![lit(5, 0, b"\xA1\xA156 ")]);
        assert_eq!(mixed.subseg(WIDE, b"", 3, 7), vec![lit(4, 0, b" 56 ")]);
        assert_eq!(mixed.subseg(WIDE, b"", 0, 20), vec![mixed.clone()]);
    }

    #[test]
    fn subseg_source_range() {
        let t = b"1234567890";
        assert_eq!(range(10, 0, 10).subseg(WIDE, t, 0, 8), vec![range(8, 0, 8)]);
        assert_eq!(range(10, 0, 10).subseg(WIDE, t, 2, 10), vec![range(8, 2, 10)]);
        assert_eq!(range(6, 2, 8).subseg(WIDE, t, 1, 6), vec![range(5, 3, 8)]);
        assert_eq!(range(6, 2, 8).subseg(WIDE, t, 0, 5), vec![range(5, 2, 7)]);
        assert_eq!(range(6, 2, 8).subseg(WIDE, t, 1, 5), vec![range(4, 3, 7)]);

        let t = b"12\xA1\xA156\xA1\xA190";
        assert_eq!(range(10, 0, 10).subseg(WIDE, t, 0, 8), vec![range(8, 0, 8)]);
        assert_eq!(range(10, 0, 10).subseg(WIDE, t, 2, 10), vec![range(8, 2, 10)]);
        assert_eq!(
            range(6, 2, 8).subseg(WIDE, t, 1, 6),
            vec![pad(1, 3), range(4, 4, 8)]
        );
        assert_eq!(
            range(6, 2, 8).subseg(WIDE, t, 0, 5),
            vec![range(4, 2, 6), pad(1, 6)]
        );
        assert_eq!(
            range(6, 2, 8).subseg(WIDE, t, 1, 5),
            vec![pad(1, 3), range(2, 4, 6), pad(1, 6)]
        );
    }

    #[test]
    fn subseg_empty_window() {
        assert!(range(5, 0, 5).subseg(NARROW, b"hello", 3, 3).is_empty());
        assert!(range(5, 0, 5).subseg(NARROW, b"hello", 6, 9).is_empty());
    }

    // ========================================================================
    // line_width / shift_line
    // ========================================================================

    #[test]
    fn line_width_ignores_leading_shift() {
        assert_eq!(line_width(&[shift(3), range(5, 0, 5), pad(0, 5)]), 5);
        assert_eq!(line_width(&[shift(-6), range(20, 0, 20)]), 20);
        assert_eq!(line_width(&[]), 0);
        assert_eq!(line_width(&[lit(1, 4, b"\xe2\x80\xa6"), pad(1, 4)]), 2);
    }

    #[test]
    fn shift_line_merges_existing_shift() {
        let line = vec![shift(2), range(5, 0, 5)];
        assert_eq!(shift_line(&line, 3), vec![shift(5), range(5, 0, 5)]);
        assert_eq!(shift_line(&line, -2), vec![range(5, 0, 5)]);
        assert_eq!(
            shift_line(&[range(5, 0, 5)], -1),
            vec![shift(-1), range(5, 0, 5)]
        );
        assert_eq!(shift_line(&[range(5, 0, 5)], 0), vec![range(5, 0, 5)]);
    }

    // ========================================================================
    // trim_line
    // ========================================================================

    #[test]
    fn trim_line_window() {
        let text = b"hello world";
        let line = vec![range(11, 0, 11), pad(0, 11)];
        assert_eq!(
            trim_line(NARROW, &line, text, 2, 7),
            vec![range(5, 2, 7)]
        );
        assert_eq!(trim_line(NARROW, &line, text, 0, 11), line);
    }

    #[test]
    fn trim_line_negative_shift_hides_columns() {
        let text = b"It's out of control!";
        let line = vec![shift(-3), range(20, 0, 20), pad(0, 20)];
        assert_eq!(trim_line(NARROW, &line, text, 0, 14), vec![range(14, 3, 17)]);
    }

    #[test]
    fn trim_line_positive_shift_is_kept() {
        let text = b"abc";
        let line = vec![shift(2), range(3, 0, 3)];
        assert_eq!(
            trim_line(NARROW, &line, text, 1, 4),
            vec![shift(1), range(2, 0, 2)]
        );
    }

    #[test]
    fn trim_line_halves_wide_char() {
        let text = b"a\xA1\xA1b";
        let line = vec![range(4, 0, 4)];
        assert_eq!(
            trim_line(WIDE, &line, text, 0, 2),
            vec![range(1, 0, 1), pad(1, 1)]
        );
    }
}
