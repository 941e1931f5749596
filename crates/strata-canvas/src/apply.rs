#![forbid(unsafe_code)]

//! Rendering a text layout into a leaf canvas.

use strata_core::{EncodingConfig, current_encoding};
use strata_text::rle::{Rle, rle_append_modify, rle_join_modify, rle_len};
use strata_text::segment::{Layout, LayoutSegment, trim_line};
use strata_text::target::{Charset, encode_layout_bytes};
use strata_text::width::TextMeasure;

use crate::canvas::{Attr, CanvasError, TextCanvas};

/// Append a run unless it is empty.
fn push_run<A: PartialEq>(rle: &mut Rle<A>, a: A, run: usize) {
    if run > 0 {
        rle_append_modify(rle, (a, run));
    }
}

/// Cursor over the source attribute list.
///
/// Layout lines usually ask for ranges in increasing offset order, so the
/// walk resumes where the last lookup ended and only rewinds when asked for
/// an earlier offset.
struct AttrWalk<'a> {
    attr: &'a [(Option<Attr>, usize)],
    k: usize,
    off: usize,
}

impl<'a> AttrWalk<'a> {
    fn new(attr: &'a [(Option<Attr>, usize)]) -> Self {
        Self { attr, k: 0, off: 0 }
    }

    /// The attribute runs covering source bytes `start..end`.
    ///
    /// Always returns at least one run; for `start == end` that run names
    /// the attribute at `start` with length zero.
    fn range(&mut self, start: usize, end: usize) -> Rle<Option<Attr>> {
        if start < self.off {
            self.k = 0;
            self.off = 0;
        }
        let mut out = Vec::new();
        while self.off <= end {
            let Some((a, run)) = self.attr.get(self.k) else {
                // Past the last run: the rest is unattributed.
                out.push((None, end - start.max(self.off)));
                break;
            };
            if self.off + run <= start {
                self.k += 1;
                self.off += run;
                continue;
            }
            if end <= self.off + run {
                out.push((a.clone(), end - start.max(self.off)));
                break;
            }
            out.push((a.clone(), self.off + run - start.max(self.off)));
            self.k += 1;
            self.off += run;
        }
        out
    }
}

/// Builds one canvas row.
struct RowBuilder<'a> {
    config: EncodingConfig,
    text: &'a [u8],
    bytes: Vec<u8>,
    attr: Rle<Option<Attr>>,
    cs: Rle<Option<Charset>>,
}

impl<'a> RowBuilder<'a> {
    fn new(config: EncodingConfig, text: &'a [u8]) -> Self {
        Self {
            config,
            text,
            bytes: Vec::new(),
            attr: Vec::new(),
            cs: Vec::new(),
        }
    }

    /// Attribute `dest_len` output bytes after source bytes `start..end`.
    ///
    /// When encoding changed the byte count, each source run is re-encoded
    /// on its own to find how many output bytes it became.
    fn attr_range(&mut self, walk: &mut AttrWalk<'_>, start: usize, end: usize, dest_len: usize) {
        let runs = walk.range(start, end);
        if start == end {
            let a = runs.into_iter().next().and_then(|(a, _)| a);
            push_run(&mut self.attr, a, dest_len);
            return;
        }
        if dest_len == end - start {
            for (a, run) in runs {
                push_run(&mut self.attr, a, run);
            }
            return;
        }
        let mut o = start;
        let mut left = dest_len;
        for (a, run) in runs {
            if o + run == end {
                push_run(&mut self.attr, a, left);
                return;
            }
            let (_, cs) = encode_layout_bytes(self.config, &self.text[o..o + run]);
            let width = rle_len(&cs).min(left);
            push_run(&mut self.attr, a, width);
            o += run;
            left -= width;
        }
    }

    fn push_encoded(&mut self, walk: &mut AttrWalk<'_>, start: usize, end: usize, src: &[u8]) {
        let (bytes, cs) = encode_layout_bytes(self.config, src);
        self.attr_range(walk, start, end, rle_len(&cs));
        self.bytes.extend_from_slice(&bytes);
        rle_join_modify(&mut self.cs, cs.into_iter().filter(|(_, n)| *n > 0).collect());
    }

    fn push_blank(&mut self, attr: Option<Attr>, cols: usize) {
        self.bytes.resize(self.bytes.len() + cols, b' ');
        push_run(&mut self.attr, attr, cols);
        push_run(&mut self.cs, None, cols);
    }

    fn push_segment(&mut self, walk: &mut AttrWalk<'_>, seg: &LayoutSegment) {
        match seg {
            LayoutSegment::Range { start, end, .. } => {
                let text = self.text;
                self.push_encoded(walk, *start, *end, &text[*start..*end]);
            }
            LayoutSegment::Literal { offset, text, .. } => {
                self.push_encoded(walk, *offset, *offset, text);
            }
            LayoutSegment::Pad {
                width,
                offset: Some(offset),
            } => {
                let cols = (*width).max(0).unsigned_abs();
                if cols > 0 {
                    let a = walk
                        .range(*offset, *offset)
                        .into_iter()
                        .next()
                        .and_then(|(a, _)| a);
                    self.push_blank(a, cols);
                }
            }
            LayoutSegment::Pad { width, offset: None } => {
                self.push_blank(None, (*width).max(0).unsigned_abs());
            }
        }
    }
}

/// Render `layout` of `text` into a canvas `maxcol` columns wide.
///
/// Each line is trimmed to `maxcol` first. Attributes follow the source
/// offsets each segment refers to: ranges take the attributes of their
/// bytes, literals and attributed pads take the attribute at their offset,
/// and line shifts take the default attribute. Text is converted with the
/// encoding current on this thread.
///
/// # Errors
///
/// [`CanvasError::TextTooWide`] when an encoded line is wider than
/// `maxcol`.
pub fn apply_text_layout(
    text: &[u8],
    attr: &[(Option<Attr>, usize)],
    layout: &Layout,
    maxcol: usize,
) -> Result<TextCanvas, CanvasError> {
    let config = current_encoding();
    let measure = TextMeasure::new(config.byte_encoding);
    let mut walk = AttrWalk::new(attr);

    let mut rows = Vec::with_capacity(layout.len());
    let mut attrs = Vec::with_capacity(layout.len());
    let mut charsets = Vec::with_capacity(layout.len());
    for line in layout {
        let line = trim_line(measure, line, text, 0, maxcol);
        let mut row = RowBuilder::new(config, text);
        for seg in &line {
            row.push_segment(&mut walk, seg);
        }
        rows.push(row.bytes);
        attrs.push(row.attr);
        charsets.push(row.cs);
    }
    strata_core::trace!(rows = rows.len(), maxcol, "text layout applied");

    TextCanvas::from_parts_with(measure, rows, Some(attrs), Some(charsets), Some(maxcol))
}
