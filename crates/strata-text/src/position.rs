#![forbid(unsafe_code)]

//! Mapping between screen coordinates and text offsets.
//!
//! These walk a [`Layout`] produced by [`crate::layout`] and answer "which
//! byte is under column x of row y" ([`calc_pos`]) and "where on screen is
//! byte offset p" ([`calc_coords`]).
//!
//! # Example
//!
//! ```
//! use strata_core::ByteEncoding;
//! use strata_text::position::{PrefCol, calc_coords, calc_pos};
//! use strata_text::segment::LayoutSegment;
//! use strata_text::width::TextMeasure;
//!
//! let m = TextMeasure::new(ByteEncoding::Utf8);
//! let text = b"hello world";
//! let layout = vec![
//!     vec![LayoutSegment::range(5, 0, 5), LayoutSegment::marker(5)],
//!     vec![LayoutSegment::range(5, 6, 11), LayoutSegment::marker(11)],
//! ];
//! assert_eq!(calc_pos(m, text, &layout, PrefCol::Col(2), 1), 8);
//! assert_eq!(calc_coords(m, text, &layout, 8), (2, 1));
//! ```

use crate::segment::{Layout, LayoutSegment};
use crate::width::TextMeasure;

/// Preferred column when moving between rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrefCol {
    /// Start of the line.
    Left,
    /// End of the line.
    Right,
    /// A screen column; may lie outside the line on either side.
    Col(isize),
}

impl From<isize> for PrefCol {
    fn from(col: isize) -> Self {
        Self::Col(col)
    }
}

/// Best candidate found so far while scanning a line.
enum Closest<'a> {
    Offset(usize),
    /// The last character of a range segment.
    EndOf(&'a LayoutSegment),
}

/// Offset of the last character inside a range segment, or the offset of
/// any other segment.
fn last_offset_in(measure: TextMeasure, text: &[u8], seg: &LayoutSegment) -> Option<usize> {
    match *seg {
        LayoutSegment::Range { width, start, end } => {
            Some(measure.calc_text_pos(text, start, end, width.saturating_sub(1)).0)
        }
        _ => seg.offset(),
    }
}

/// Offset closest to `pref` on one line, or `None` when the line has no
/// addressable segment.
#[must_use]
pub fn calc_line_pos(
    measure: TextMeasure,
    text: &[u8],
    line: &[LayoutSegment],
    pref: PrefCol,
) -> Option<usize> {
    let pref_col = match pref {
        PrefCol::Left => return line.iter().find_map(LayoutSegment::offset),
        PrefCol::Right => {
            let last = line.iter().rev().find(|s| s.offset().is_some())?;
            return last_offset_in(measure, text, last);
        }
        PrefCol::Col(col) => col,
    };

    let mut closest_sc: Option<isize> = None;
    let mut closest: Option<Closest<'_>> = None;
    let mut current_sc: isize = 0;

    for seg in line {
        let sc = seg.width();
        if let Some(offs) = seg.offset() {
            if let LayoutSegment::Range { start, end, .. } = *seg {
                if current_sc <= pref_col && pref_col < current_sc + sc {
                    let into = (pref_col - current_sc) as usize;
                    return Some(measure.calc_text_pos(text, start, end, into).0);
                }
                if current_sc <= pref_col {
                    closest_sc = Some(current_sc + sc - 1);
                    closest = Some(Closest::EndOf(seg));
                }
            }
            let nearer = closest_sc
                .is_none_or(|best| (pref_col - current_sc).abs() < (pref_col - best).abs());
            if nearer {
                closest_sc = Some(current_sc);
                closest = Some(Closest::Offset(offs));
            }
            if closest_sc.is_some_and(|best| current_sc > best) {
                break;
            }
        }
        current_sc += sc;
    }

    match closest? {
        Closest::Offset(offs) => Some(offs),
        Closest::EndOf(seg) => last_offset_in(measure, text, seg),
    }
}

/// Offset closest to `pref` on `row`.
///
/// When `row` has nothing addressable, rows above and below are tried
/// alternately, nearest first, until one yields a position. Returns 0 when
/// no row does.
///
/// # Panics
///
/// When `row` is not a row of `layout`.
#[must_use]
pub fn calc_pos(
    measure: TextMeasure,
    text: &[u8],
    layout: &Layout,
    pref: PrefCol,
    row: usize,
) -> usize {
    assert!(
        row < layout.len(),
        "row {row} out of layout range ({} rows)",
        layout.len()
    );

    if let Some(pos) = calc_line_pos(measure, text, &layout[row], pref) {
        return pos;
    }

    let mut above = (0..row).rev();
    let mut below = row + 1..layout.len();
    loop {
        let up = above.next();
        let down = below.next();
        if up.is_none() && down.is_none() {
            return 0;
        }
        for r in [up, down].into_iter().flatten() {
            if let Some(pos) = calc_line_pos(measure, text, &layout[r], pref) {
                return pos;
            }
        }
    }
}

/// Screen `(x, y)` of the byte offset `pos`.
///
/// Falls back to the coordinates of the nearest addressable segment when
/// `pos` is not displayed, and to `(0, 0)` for a layout with none.
#[must_use]
pub fn calc_coords(measure: TextMeasure, text: &[u8], layout: &Layout, pos: usize) -> (usize, usize) {
    let mut closest: Option<(usize, (usize, usize))> = None;

    for (y, line) in layout.iter().enumerate() {
        let mut x: isize = 0;
        for seg in line {
            let Some(offs) = seg.offset() else {
                x += seg.width();
                continue;
            };
            let col = x.max(0) as usize;
            if offs == pos {
                return (col, y);
            }
            let mut distance = offs.abs_diff(pos);
            if let LayoutSegment::Range { start, end, .. } = *seg {
                if (start..end).contains(&pos) {
                    return (col + measure.calc_width(text, start, pos), y);
                }
                if end < pos {
                    distance = pos - end + 1;
                }
            }
            if closest.is_none_or(|(best, _)| distance < best) {
                closest = Some((distance, (col, y)));
            }
            x += seg.width();
        }
    }

    closest.map_or((0, 0), |(_, coords)| coords)
}
