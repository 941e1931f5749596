#![forbid(unsafe_code)]

//! Text layout engine.
//!
//! [`StandardTextLayout`] turns `(text, width, align, wrap)` into a
//! [`Layout`]: one line of segments per output row.
//!
//! Layout runs in two steps:
//!
//! 1. [`StandardTextLayout::calculate_text_segments`] splits the text on
//!    newlines and wraps or trims each line according to [`WrapMode`].
//! 2. [`align_layout`] prepends a shift to lines narrower (or, when clipping,
//!    wider) than the available width.
//!
//! Every line keeps enough information to map offsets back to positions:
//! removed spaces and newlines leave a zero-width marker segment.
//!
//! # Example
//!
//! ```
//! use strata_core::EncodingConfig;
//! use strata_text::layout::{Align, StandardTextLayout, TextLayout, WrapMode};
//! use strata_text::segment::LayoutSegment;
//!
//! let layout = StandardTextLayout::with_encoding(EncodingConfig::UTF8);
//! let lines = layout.layout(b"hello world", 5, Align::Left, WrapMode::Space);
//! assert_eq!(
//!     lines,
//!     vec![
//!         vec![LayoutSegment::range(5, 0, 5), LayoutSegment::marker(5)],
//!         vec![LayoutSegment::range(5, 6, 11), LayoutSegment::marker(11)],
//!     ]
//! );
//! ```

use std::fmt;

use memchr::memchr;
use strata_core::{EncodingConfig, TargetEncoding, current_encoding};
use tracing::{debug, trace_span};

use crate::segment::{Layout, LayoutSegment, line_width};
use crate::width::TextMeasure;

const ELLIPSIS_UTF8: &[u8] = "…".as_bytes();
const ELLIPSIS_DOTS: &[u8] = b"...";

// ============================================================================
// Modes
// ============================================================================

/// Horizontal alignment of each output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

/// How lines wider than the available width are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WrapMode {
    /// Break at the exact column boundary.
    Any,
    /// Break at spaces where possible.
    #[default]
    Space,
    /// Keep the whole line; overflow is cut off when rendered.
    Clip,
    /// Cut the line and mark the cut with an ellipsis.
    Ellipsis,
}

// ============================================================================
// Errors
// ============================================================================

/// Errors from computing line segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutError {
    /// A single character at `offset` is wider than `width`.
    Unrenderable { offset: usize, width: usize },
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unrenderable { offset, width } => write!(
                f,
                "character at offset {offset} does not fit in {width} column(s)"
            ),
        }
    }
}

impl std::error::Error for LayoutError {}

// ============================================================================
// TextLayout
// ============================================================================

/// A strategy for laying out text.
pub trait TextLayout {
    /// Whether `align` is honored.
    fn supports_align(&self, _align: Align) -> bool {
        true
    }

    /// Whether `wrap` is honored.
    fn supports_wrap(&self, _wrap: WrapMode) -> bool {
        true
    }

    /// Lay out `text` (bytes in the current encoding) in `width` columns.
    ///
    /// Must always produce a layout, even for text that cannot be shown.
    fn layout(&self, text: &[u8], width: usize, align: Align, wrap: WrapMode) -> Layout;

    /// The smallest width at or below `maxcol` that yields the same number
    /// of lines as `layout`.
    fn pack(&self, maxcol: usize, layout: &Layout) -> usize {
        pack(maxcol, layout)
    }
}

/// Default layout: newline-separated lines, wrapped per [`WrapMode`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StandardTextLayout {
    encoding: Option<EncodingConfig>,
}

impl StandardTextLayout {
    /// Layout that follows the current encoding on every call.
    #[must_use]
    pub const fn new() -> Self {
        Self { encoding: None }
    }

    /// Layout pinned to `encoding` regardless of the process setting.
    #[must_use]
    pub const fn with_encoding(encoding: EncodingConfig) -> Self {
        Self {
            encoding: Some(encoding),
        }
    }

    #[inline]
    fn config(&self) -> EncodingConfig {
        self.encoding.unwrap_or_else(current_encoding)
    }

    /// Unaligned line segments for `text`.
    ///
    /// # Errors
    ///
    /// [`LayoutError::Unrenderable`] when a wrapping mode meets a character
    /// wider than `width`.
    pub fn calculate_text_segments(
        &self,
        text: &[u8],
        width: usize,
        wrap: WrapMode,
    ) -> Result<Layout, LayoutError> {
        segments_for(self.config(), text, width, wrap)
    }
}

impl TextLayout for StandardTextLayout {
    fn layout(&self, text: &[u8], width: usize, align: Align, wrap: WrapMode) -> Layout {
        let _span = trace_span!("layout", len = text.len(), width).entered();

        match segments_for(self.config(), text, width, wrap) {
            Ok(segs) => align_layout(width, segs, align),
            Err(err) => {
                debug!(error = %err, "text cannot be laid out; rendering one empty line");
                vec![Vec::new()]
            }
        }
    }
}

/// [`StandardTextLayout::layout`] under the current encoding.
#[must_use]
pub fn layout(text: &[u8], width: usize, align: Align, wrap: WrapMode) -> Layout {
    StandardTextLayout::new().layout(text, width, align, wrap)
}

/// Maximum line width in `layout`, capped at `maxcol`.
///
/// An empty layout packs to zero.
#[must_use]
pub fn pack(maxcol: usize, layout: &Layout) -> usize {
    let mut max_width = 0;
    for line in layout {
        let lw = line_width(line);
        if lw >= maxcol {
            return maxcol;
        }
        max_width = max_width.max(lw);
    }
    max_width
}

/// Shift each line of `segs` per `align`.
///
/// Left alignment and full-width lines are untouched. Right alignment
/// prepends the unused width; center alignment prepends half of it, rounded
/// up. Over-wide (clipped) lines get a negative shift.
#[must_use]
pub fn align_layout(width: usize, segs: Layout, align: Align) -> Layout {
    if align == Align::Left {
        return segs;
    }
    let width = width as isize;
    segs.into_iter()
        .map(|line| {
            let sc = line_width(&line) as isize;
            if sc == width {
                return line;
            }
            let shift = match align {
                Align::Right => width - sc,
                Align::Center => (width - sc + 1).div_euclid(2),
                Align::Left => 0,
            };
            if shift == 0 {
                return line;
            }
            let mut out = Vec::with_capacity(line.len() + 1);
            out.push(LayoutSegment::shift(shift));
            out.extend(line);
            out
        })
        .collect()
}

// ============================================================================
// Segment Calculation
// ============================================================================

/// End of the line starting at `idx`.
#[inline]
fn line_end(text: &[u8], idx: usize) -> usize {
    memchr(b'\n', &text[idx..]).map_or(text.len(), |i| idx + i)
}

/// The ellipsis inserted for `width` columns.
///
/// `…` fits any non-zero width, even if no text survives next to it. The
/// dotted form keeps at least one column of text, so it shortens as the
/// width shrinks and disappears at a width of one.
fn ellipsis_for(target: TargetEncoding, width: usize) -> &'static [u8] {
    if target == TargetEncoding::Utf8 {
        if width >= 1 { ELLIPSIS_UTF8 } else { &[] }
    } else {
        let room = width.saturating_sub(1);
        &ELLIPSIS_DOTS[..room.min(ELLIPSIS_DOTS.len())]
    }
}

fn segments_for(
    config: EncodingConfig,
    text: &[u8],
    width: usize,
    wrap: WrapMode,
) -> Result<Layout, LayoutError> {
    let measure = TextMeasure::new(config.byte_encoding);
    match wrap {
        WrapMode::Clip | WrapMode::Ellipsis => {
            Ok(trimmed_segments(config, measure, text, width, wrap))
        }
        WrapMode::Any | WrapMode::Space => wrapped_segments(measure, text, width, wrap),
    }
}

fn trimmed_segments(
    config: EncodingConfig,
    measure: TextMeasure,
    text: &[u8],
    width: usize,
    wrap: WrapMode,
) -> Layout {
    let ellipsis = ellipsis_for(config.target, width);
    let ellipsis_width = if ellipsis == ELLIPSIS_UTF8 {
        1
    } else {
        ellipsis.len()
    };

    let mut segments = Vec::new();
    let mut idx = 0;
    while idx <= text.len() {
        let nl = line_end(text, idx);
        let mut sc = measure.calc_width(text, idx, nl);
        let mut end = nl;
        let mut pad_right = 0;
        let trimmed = wrap == WrapMode::Ellipsis && sc > width;

        if trimmed {
            let keep = width - ellipsis_width;
            let trim = measure.calc_trim_text(text, idx, nl, 0, keep);
            end = trim.end;
            pad_right = trim.pad_right;
            sc = keep - pad_right;
        }

        let mut line = Vec::with_capacity(3);
        if idx != end {
            line.push(LayoutSegment::range(sc, idx, end));
        }
        if trimmed && ellipsis_width > 0 {
            line.push(LayoutSegment::literal(ellipsis_width, end, ellipsis));
        }
        line.push(LayoutSegment::pad(pad_right, end));
        segments.push(line);
        idx = nl + 1;
    }
    segments
}

fn wrapped_segments(
    measure: TextMeasure,
    text: &[u8],
    width: usize,
    wrap: WrapMode,
) -> Result<Layout, LayoutError> {
    let mut segments: Layout = Vec::new();
    let mut idx = 0;

    while idx <= text.len() {
        let nl = line_end(text, idx);
        let sc = measure.calc_width(text, idx, nl);
        if sc == 0 {
            segments.push(vec![LayoutSegment::marker(nl)]);
            idx = nl + 1;
            continue;
        }
        if sc <= width {
            segments.push(vec![
                LayoutSegment::range(sc, idx, nl),
                LayoutSegment::marker(nl),
            ]);
            idx = nl + 1;
            continue;
        }

        let (pos, sc) = measure.calc_text_pos(text, idx, nl, width);
        if pos == idx {
            return Err(LayoutError::Unrenderable { offset: idx, width });
        }

        if wrap == WrapMode::Any {
            segments.push(vec![LayoutSegment::range(sc, idx, pos)]);
            idx = pos;
            continue;
        }

        if text[pos] == b' ' {
            // Break exactly on a space.
            segments.push(vec![
                LayoutSegment::range(sc, idx, pos),
                LayoutSegment::marker(pos),
            ]);
            idx = pos + 1;
            continue;
        }

        if measure.is_wide_char(text, pos) {
            // Break exactly before a wide character.
            segments.push(vec![LayoutSegment::range(sc, idx, pos)]);
            idx = pos;
            continue;
        }

        if let Some(next) = break_backward(measure, text, idx, pos, &mut segments) {
            idx = next;
            continue;
        }

        if let Some(next) = rejoin_previous(measure, text, width, nl, &mut segments) {
            idx = next;
            continue;
        }

        // Nothing better: break inside the word.
        segments.push(vec![LayoutSegment::range(sc, idx, pos)]);
        idx = pos;
    }
    Ok(segments)
}

/// Look back from `pos` for a space to break at or a wide character to
/// break after. Pushes the line and returns where the next one starts.
fn break_backward(
    measure: TextMeasure,
    text: &[u8],
    idx: usize,
    pos: usize,
    segments: &mut Layout,
) -> Option<usize> {
    let mut prev = pos;
    while prev > idx {
        prev = measure.move_prev_char(text, idx, prev);
        if text[prev] == b' ' {
            let mut line = Vec::with_capacity(2);
            if idx != prev {
                line.push(LayoutSegment::range(
                    measure.calc_width(text, idx, prev),
                    idx,
                    prev,
                ));
            }
            line.push(LayoutSegment::marker(prev));
            segments.push(line);
            return Some(prev + 1);
        }
        if measure.is_wide_char(text, prev) {
            let next = measure.move_next_char(text, prev, pos);
            segments.push(vec![LayoutSegment::range(
                measure.calc_width(text, idx, next),
                idx,
                next,
            )]);
            return Some(next);
        }
    }
    None
}

/// Undo the previous line's break at a space when the current word has to
/// be split anyway, so the split happens as late as possible.
fn rejoin_previous(
    measure: TextMeasure,
    text: &[u8],
    width: usize,
    nl: usize,
    segments: &mut Layout,
) -> Option<usize> {
    let (p_sc, p_off, h_sc, h_off) = match segments.last()?.as_slice() {
        [
            LayoutSegment::Pad {
                width: h_sc,
                offset: Some(h_off),
            },
        ] => (0, *h_off, *h_sc, *h_off),
        [
            prev,
            LayoutSegment::Pad {
                width: h_sc,
                offset: Some(h_off),
            },
        ] => (prev.width(), prev.offset()?, *h_sc, *h_off),
        _ => return None,
    };

    if p_sc >= width as isize || h_sc != 0 || text.get(h_off) != Some(&b' ') {
        return None;
    }

    segments.pop();
    let (pos, sc) = measure.calc_text_pos(text, p_off, nl, width);
    let mut line = vec![LayoutSegment::range(sc, p_off, pos)];
    let mut idx = pos;
    if matches!(text.get(idx), Some(b' ' | b'\n')) {
        line.push(LayoutSegment::marker(idx));
        idx += 1;
    }
    segments.push(line);
    Some(idx)
}
