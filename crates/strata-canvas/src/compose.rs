#![forbid(unsafe_code)]

//! Composite canvases and the combinators that build them.
//!
//! A [`CompositeCanvas`] starts as a view of one canvas and accumulates
//! padding, trimming, overlays and attribute fills as edits to its shard
//! list. Child rows are never copied; they are read through the views when
//! [`Canvas::content`] runs.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use strata_canvas::canvas::{Canvas, TextCanvas};
//! use strata_canvas::compose::CompositeCanvas;
//!
//! let hello = Arc::new(TextCanvas::new(vec![b"Hello world".to_vec()]).unwrap());
//! let mut padded = CompositeCanvas::new(hello);
//! padded.pad_trim_left_right(2, 0).unwrap();
//! assert_eq!(padded.text(), vec![b"  Hello world".to_vec()]);
//! ```

use std::sync::Arc;

use strata_core::{RenderSize, WidgetId};

use crate::canvas::{
    Attr, AttrMap, Canvas, CanvasError, CanvasRef, ContentWindow, RowIter, WidgetInfo,
    blank_canvas,
};
use crate::shard::{
    CanvasView, Shard, ShardRows, shards_cols, shards_join, shards_rows, shards_trim_rows,
    shards_trim_sides, shards_trim_top,
};

/// Move a cursor; a cursor pushed off the top or left edge disappears.
fn shift_cursor(cursor: Option<(usize, usize)>, dx: isize, dy: isize) -> Option<(usize, usize)> {
    let (x, y) = cursor?;
    Some((x.checked_add_signed(dx)?, y.checked_add_signed(dy)?))
}

/// Translate every view of `shards` through `map`, composing with any map a
/// view already carries.
fn map_views(shards: &mut [Shard], map: &AttrMap) {
    let plain = Arc::new(map.clone());
    for view in shards.iter_mut().flat_map(|s| s.views.iter_mut()) {
        view.attr_map = Some(match &view.attr_map {
            None => Arc::clone(&plain),
            Some(inner) => Arc::new(inner.then(map)),
        });
    }
}

/// The shard list of `canvas`, or a single view of it for leaf canvases.
fn shards_of(canvas: &CanvasRef) -> Vec<Shard> {
    match canvas.shards() {
        Some(shards) => shards.to_vec(),
        None => vec![Shard::of(Arc::clone(canvas))],
    }
}

// ============================================================================
// CompositeCanvas
// ============================================================================

/// A canvas assembled from views of other canvases.
#[derive(Debug, Clone, Default)]
pub struct CompositeCanvas {
    shards: Vec<Shard>,
    children: Vec<CanvasRef>,
    cursor: Option<(usize, usize)>,
    depends_on: Option<Vec<WidgetId>>,
    widget_info: Option<WidgetInfo>,
}

impl CompositeCanvas {
    /// Wrap `canvas`. A composite's shard list is copied rather than nested.
    #[must_use]
    pub fn new(canvas: CanvasRef) -> Self {
        Self {
            shards: shards_of(&canvas),
            cursor: canvas.cursor(),
            children: vec![canvas],
            depends_on: None,
            widget_info: None,
        }
    }

    /// A canvas with no rows and no columns.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    fn check_mutable(&self) -> Result<(), CanvasError> {
        if self.widget_info.is_some() {
            return Err(CanvasError::Finalized);
        }
        Ok(())
    }

    /// Remove `top` rows, then keep `count` rows (or all the rest).
    ///
    /// # Errors
    ///
    /// [`CanvasError::TrimOutOfRange`] when `top` reaches the last row, and
    /// [`CanvasError::Finalized`] once finalized.
    pub fn trim(&mut self, top: usize, count: Option<usize>) -> Result<(), CanvasError> {
        let rows = self.rows();
        if top >= rows {
            return Err(CanvasError::TrimOutOfRange {
                amount: top,
                available: rows,
            });
        }
        self.check_mutable()?;

        if top > 0 {
            self.shards = shards_trim_top(&self.shards, top)?;
        }
        match count {
            Some(0) => self.shards.clear(),
            Some(count) => self.shards = shards_trim_rows(&self.shards, count),
            None => {}
        }
        self.cursor = shift_cursor(self.cursor, 0, -(top as isize));
        Ok(())
    }

    /// Remove `end` rows from the bottom.
    ///
    /// # Errors
    ///
    /// [`CanvasError::InvalidTrim`] for zero, [`CanvasError::TrimOutOfRange`]
    /// for more rows than the canvas has, and [`CanvasError::Finalized`] once
    /// finalized.
    pub fn trim_end(&mut self, end: usize) -> Result<(), CanvasError> {
        let rows = self.rows();
        if end == 0 {
            return Err(CanvasError::InvalidTrim { amount: 0 });
        }
        if end > rows {
            return Err(CanvasError::TrimOutOfRange {
                amount: end,
                available: rows,
            });
        }
        self.check_mutable()?;
        self.shards = shards_trim_rows(&self.shards, rows - end);
        Ok(())
    }

    /// Pad (positive) or trim (negative) columns on the left and right.
    ///
    /// # Errors
    ///
    /// [`CanvasError::InvalidTrim`] when trimming would leave no columns, and
    /// [`CanvasError::Finalized`] once finalized.
    pub fn pad_trim_left_right(&mut self, left: isize, right: isize) -> Result<(), CanvasError> {
        self.check_mutable()?;
        let mut shards = if left < 0 || right < 0 {
            let trim_left = left.min(0).unsigned_abs();
            let trim_right = right.min(0).unsigned_abs();
            let cols = self
                .cols()
                .checked_sub(trim_left + trim_right)
                .ok_or(CanvasError::InvalidTrim {
                    amount: left.min(0) + right.min(0),
                })?;
            shards_trim_sides(&self.shards, trim_left, cols)?
        } else {
            self.shards.clone()
        };

        let rows = self.rows();
        if let Some(first) = shards.first_mut() {
            if left > 0 {
                let pad = CanvasView::sized(blank_canvas(), left.unsigned_abs(), rows);
                first.views.insert(0, pad);
            }
            if right > 0 {
                let pad = CanvasView::sized(blank_canvas(), right.unsigned_abs(), rows);
                first.views.push(pad);
            }
        }

        self.shards = shards;
        self.cursor = shift_cursor(self.cursor, left, 0);
        Ok(())
    }

    /// Pad (positive) or trim (negative) rows on the top and bottom.
    ///
    /// # Errors
    ///
    /// As [`CompositeCanvas::trim`] when trimming, and
    /// [`CanvasError::InvalidTrim`] when trimming would leave no rows.
    pub fn pad_trim_top_bottom(&mut self, top: isize, bottom: isize) -> Result<(), CanvasError> {
        self.check_mutable()?;
        if top < 0 || bottom < 0 {
            let trim_top = top.min(0).unsigned_abs();
            let trim_bottom = bottom.min(0).unsigned_abs();
            let rows = self
                .rows()
                .checked_sub(trim_top + trim_bottom)
                .ok_or(CanvasError::InvalidTrim {
                    amount: top.min(0) + bottom.min(0),
                })?;
            self.trim(trim_top, Some(rows))?;
        }

        let cols = self.cols();
        if top > 0 {
            let rows = top.unsigned_abs();
            let pad = CanvasView::sized(blank_canvas(), cols, rows);
            self.shards.insert(0, Shard::new(rows, vec![pad]));
            self.cursor = shift_cursor(self.cursor, 0, top);
        }
        if bottom > 0 {
            let rows = bottom.unsigned_abs();
            let pad = CanvasView::sized(blank_canvas(), cols, rows);
            self.shards.push(Shard::new(rows, vec![pad]));
        }
        Ok(())
    }

    /// Draw `other` over this canvas with its top-left corner at
    /// (`left`, `top`).
    ///
    /// Covered columns show `other`; the rest keep this canvas's content.
    /// A cursor on `other` replaces this canvas's cursor.
    ///
    /// # Errors
    ///
    /// [`CanvasError::OverlaySize`] when `other` does not fit, and
    /// [`CanvasError::Finalized`] once finalized.
    pub fn overlay(&mut self, other: CanvasRef, left: usize, top: usize) -> Result<(), CanvasError> {
        self.check_mutable()?;
        let width = other.cols();
        let height = other.rows();
        let too_big = CanvasError::OverlaySize {
            cols: width,
            rows: height,
            left,
            top,
        };
        let right = self.cols().checked_sub(left + width).ok_or(too_big.clone())?;
        let bottom = self.rows().checked_sub(top + height).ok_or(too_big)?;
        strata_core::trace!(width, height, left, top, right, bottom, "overlay");

        let mut top_shards = Vec::new();
        let mut side_shards = self.shards.clone();
        let mut bottom_shards = Vec::new();
        if top > 0 {
            side_shards = shards_trim_top(&self.shards, top)?;
            top_shards = shards_trim_rows(&self.shards, top);
        }
        if bottom > 0 {
            bottom_shards = shards_trim_top(&side_shards, height)?;
            side_shards = shards_trim_rows(&side_shards, height);
        }

        let other_shards = shards_of(&other);
        let middle_shards = if self.rows() == 0 {
            Vec::new()
        } else if left > 0 || right > 0 {
            let left_shards = if left > 0 {
                shards_trim_sides(&side_shards, 0, left)?
            } else {
                Vec::new()
            };
            let right_shards = if right > 0 {
                shards_trim_sides(&side_shards, left + width, right)?
            } else {
                Vec::new()
            };
            let mut lists: Vec<&[Shard]> = Vec::with_capacity(3);
            if left > 0 {
                lists.push(&left_shards);
            }
            lists.push(&other_shards);
            if right > 0 {
                lists.push(&right_shards);
            }
            shards_join(&lists)?
        } else {
            other_shards
        };

        let mut shards = top_shards;
        shards.extend(middle_shards);
        shards.extend(bottom_shards);
        self.shards = shards;

        if let Some((x, y)) = other.cursor() {
            self.cursor = Some((x + left, y + top));
        }
        self.children.insert(0, other);
        Ok(())
    }

    /// Give every run with the default attribute the attribute `attr`.
    ///
    /// # Errors
    ///
    /// [`CanvasError::Finalized`] once finalized.
    pub fn fill_attr(&mut self, attr: Attr) -> Result<(), CanvasError> {
        self.fill_attr_apply(&AttrMap::fill(attr))
    }

    /// Translate the attributes of every child view through `map`.
    ///
    /// # Errors
    ///
    /// [`CanvasError::Finalized`] once finalized.
    pub fn fill_attr_apply(&mut self, map: &AttrMap) -> Result<(), CanvasError> {
        self.check_mutable()?;
        map_views(&mut self.shards, map);
        Ok(())
    }

    /// Declare the widgets this canvas must be re-rendered after.
    ///
    /// Replaces the dependencies inferred from child canvases.
    ///
    /// # Errors
    ///
    /// [`CanvasError::Finalized`] once finalized.
    pub fn set_depends(&mut self, widgets: Vec<WidgetId>) -> Result<(), CanvasError> {
        self.check_mutable()?;
        self.depends_on = Some(widgets);
        Ok(())
    }

    /// Set or clear the cursor.
    ///
    /// # Errors
    ///
    /// [`CanvasError::Finalized`] once finalized.
    pub fn set_cursor(&mut self, cursor: Option<(usize, usize)>) -> Result<(), CanvasError> {
        self.check_mutable()?;
        self.cursor = cursor;
        Ok(())
    }

    /// Record the render call and hand out the shared handle.
    ///
    /// # Errors
    ///
    /// [`CanvasError::Finalized`] when the canvas was already finalized.
    pub fn finalize(
        mut self,
        widget: WidgetId,
        size: RenderSize,
        focus: bool,
    ) -> Result<CanvasRef, CanvasError> {
        self.check_mutable()?;
        self.widget_info = Some(WidgetInfo {
            widget,
            size,
            focus,
        });
        Ok(Arc::new(self))
    }

    /// The shard list restricted to `window`.
    fn windowed(&self, window: &ContentWindow, cols: usize, rows: usize) -> Result<Vec<Shard>, CanvasError> {
        let mut shards = shards_trim_top(&self.shards, window.trim_top)?;
        if rows < self.rows() - window.trim_top {
            shards = shards_trim_rows(&shards, rows);
        }
        if window.trim_left > 0 || cols < self.cols() {
            shards = shards_trim_sides(&shards, window.trim_left, cols)?;
        }
        Ok(shards)
    }
}

impl Canvas for CompositeCanvas {
    fn cols(&self) -> usize {
        shards_cols(&self.shards)
    }

    fn rows(&self) -> usize {
        shards_rows(&self.shards)
    }

    fn cursor(&self) -> Option<(usize, usize)> {
        self.cursor
    }

    fn widget_info(&self) -> Option<&WidgetInfo> {
        self.widget_info.as_ref()
    }

    /// # Panics
    ///
    /// When the window reaches outside the canvas or a child view runs out
    /// of rows.
    fn content_window(&self, window: ContentWindow) -> RowIter<'_> {
        let (cols, rows) = window.resolve(self.cols(), self.rows());
        if rows == 0 {
            return Box::new(std::iter::empty());
        }
        if cols == 0 {
            return Box::new(std::iter::repeat_n(Vec::new(), rows));
        }
        let mut shards = match self.windowed(&window, cols, rows) {
            Ok(shards) => shards,
            Err(err) => panic!("invalid content window {window:?}: {err}"),
        };
        if let Some(map) = &window.attr_map {
            map_views(&mut shards, map);
        }
        Box::new(ShardRows::new(shards))
    }

    fn shards(&self) -> Option<&[Shard]> {
        Some(&self.shards)
    }

    fn children(&self) -> &[CanvasRef] {
        &self.children
    }

    fn depends_on(&self) -> Option<&[WidgetId]> {
        self.depends_on.as_deref()
    }
}

// ============================================================================
// Combinators
// ============================================================================

/// Stack canvases vertically, top to bottom.
///
/// The flag marks the child that holds focus; it is listed first among the
/// children. The last child showing a cursor provides the cursor.
#[must_use]
pub fn canvas_combine<I>(items: I) -> CompositeCanvas
where
    I: IntoIterator<Item = (CanvasRef, bool)>,
{
    let mut combined = CompositeCanvas::empty();
    let mut row = 0;
    let mut focus_index = 0;
    for (n, (canvas, focus)) in items.into_iter().enumerate() {
        if focus {
            focus_index = n;
        }
        if let Some((x, y)) = canvas.cursor() {
            combined.cursor = Some((x, y + row));
        }
        row += canvas.rows();
        combined.shards.extend(shards_of(&canvas));
        combined.children.push(canvas);
    }
    if focus_index > 0 {
        let focused = combined.children.remove(focus_index);
        combined.children.insert(0, focused);
    }
    combined
}

/// Place canvases side by side, left to right.
///
/// Each item is `(canvas, focus, cols)`: the canvas is padded on the right
/// (or trimmed) to `cols` columns, and shorter canvases are padded at the
/// bottom to the height of the tallest.
///
/// # Errors
///
/// [`CanvasError::InvalidTrim`] when `cols` is zero for a canvas that has
/// columns.
pub fn canvas_join<I>(items: I) -> Result<CompositeCanvas, CanvasError>
where
    I: IntoIterator<Item = (CanvasRef, bool, usize)>,
{
    let items: Vec<_> = items.into_iter().collect();
    let max_rows = items.iter().map(|(c, _, _)| c.rows()).max().unwrap_or(0);

    let mut joined = CompositeCanvas::empty();
    let mut lists = Vec::with_capacity(items.len());
    let mut focus_index = 0;
    let mut col = 0;
    for (n, (canvas, focus, cols)) in items.into_iter().enumerate() {
        if focus {
            focus_index = n;
        }
        let mut part = CompositeCanvas::new(Arc::clone(&canvas));
        let pad_right = cols as isize - canvas.cols() as isize;
        if pad_right != 0 {
            part.pad_trim_left_right(0, pad_right)?;
        }
        let rows = canvas.rows();
        if rows < max_rows {
            part.pad_trim_top_bottom(0, (max_rows - rows) as isize)?;
        }
        if let Some((x, y)) = part.cursor {
            joined.cursor = Some((x + col, y));
        }
        col += part.cols();
        lists.push(part.shards);
        joined.children.push(canvas);
    }
    if focus_index > 0 {
        let focused = joined.children.remove(focus_index);
        joined.children.insert(0, focused);
    }

    let slices: Vec<&[Shard]> = lists.iter().map(Vec::as_slice).collect();
    joined.shards = shards_join(&slices)?;
    Ok(joined)
}

/// Draw `top_canvas` over `bottom` at (`left`, `top`).
///
/// # Errors
///
/// [`CanvasError::OverlaySize`] when the top canvas does not fit.
pub fn canvas_overlay(
    top_canvas: CanvasRef,
    bottom: CanvasRef,
    left: usize,
    top: usize,
) -> Result<CompositeCanvas, CanvasError> {
    let mut overlaid = CompositeCanvas::new(bottom);
    overlaid.overlay(top_canvas, left, top)?;
    Ok(overlaid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{Run, TextCanvas};
    use strata_core::ByteEncoding;
    use strata_text::rle::Rle;
    use strata_text::width::TextMeasure;

    const UTF8: TextMeasure = TextMeasure::new(ByteEncoding::Utf8);

    fn leaf(text: &[u8], attr: &[(Option<&str>, usize)]) -> TextCanvas {
        let attr: Rle<Option<Attr>> = attr.iter().map(|&(a, n)| (a.map(Attr::new), n)).collect();
        TextCanvas::from_parts_with(UTF8, vec![text.to_vec()], Some(vec![attr]), None, None)
            .expect("valid canvas")
    }

    fn c(text: &[u8]) -> CanvasRef {
        Arc::new(leaf(text, &[]))
    }

    fn ca(text: &[u8], attr: &[(Option<&str>, usize)]) -> CanvasRef {
        Arc::new(leaf(text, attr))
    }

    fn r(attr: Option<&str>, text: &[u8]) -> Run {
        Run::new(attr.map(Attr::new), None, text)
    }

    fn rows(canvas: &dyn Canvas) -> Vec<Vec<Run>> {
        canvas.content().collect()
    }

    // ========================================================================
    // Padding and trimming
    // ========================================================================

    #[test]
    fn pad_and_trim_columns() {
        let cases: [(&str, isize, isize, Vec<Run>); 5] = [
            ("none", 0, 0, vec![r(None, b"asdf")]),
            ("left pad", 2, 0, vec![r(None, b"  "), r(None, b"asdf")]),
            ("right pad", 0, 2, vec![r(None, b"asdf"), r(None, b"  ")]),
            ("left trim", -2, 0, vec![r(None, b"df")]),
            ("right trim", 0, -2, vec![r(None, b"as")]),
        ];
        for (desc, left, right, expected) in cases {
            let mut canvas = CompositeCanvas::new(c(b"asdf"));
            canvas.pad_trim_left_right(left, right).expect(desc);
            assert_eq!(rows(&canvas), vec![expected], "{desc}");
        }
    }

    #[test]
    fn pad_left_of_hello_world() {
        let mut canvas = CompositeCanvas::new(c(b"Hello world"));
        assert_eq!(rows(&canvas), vec![vec![r(None, b"Hello world")]]);
        canvas.pad_trim_left_right(2, 0).expect("pad");
        assert_eq!(rows(&canvas), vec![vec![r(None, b"  "), r(None, b"Hello world")]]);
        assert_eq!(canvas.cols(), 13);
    }

    #[test]
    fn trimming_every_column_fails() {
        let mut canvas = CompositeCanvas::new(c(b"asdf"));
        assert_eq!(
            canvas.pad_trim_left_right(-3, -2),
            Err(CanvasError::InvalidTrim { amount: -5 })
        );
        assert_eq!(
            canvas.pad_trim_left_right(-2, -2),
            Err(CanvasError::InvalidTrim { amount: 0 })
        );
    }

    #[test]
    fn pad_and_trim_rows() {
        let three: CanvasRef = Arc::new(
            TextCanvas::from_parts_with(UTF8, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()], None, None, None)
                .expect("canvas"),
        );
        let mut canvas = CompositeCanvas::new(Arc::clone(&three));
        canvas.pad_trim_top_bottom(1, -1).expect("pad top, trim bottom");
        assert_eq!(canvas.text(), vec![b" ".to_vec(), b"a".to_vec(), b"b".to_vec()]);

        let mut canvas = CompositeCanvas::new(Arc::clone(&three));
        canvas.pad_trim_top_bottom(-2, 2).expect("trim top, pad bottom");
        assert_eq!(canvas.text(), vec![b"c".to_vec(), b" ".to_vec(), b" ".to_vec()]);

        let mut canvas = CompositeCanvas::new(three);
        canvas.trim(1, Some(1)).expect("trim");
        assert_eq!(canvas.text(), vec![b"b".to_vec()]);
        assert_eq!(
            canvas.trim(1, None),
            Err(CanvasError::TrimOutOfRange {
                amount: 1,
                available: 1
            })
        );
    }

    #[test]
    fn trim_end_rows() {
        let two: CanvasRef = Arc::new(
            TextCanvas::from_parts_with(UTF8, vec![b"a".to_vec(), b"b".to_vec()], None, None, None)
                .expect("canvas"),
        );
        let mut canvas = CompositeCanvas::new(two);
        assert_eq!(canvas.trim_end(0), Err(CanvasError::InvalidTrim { amount: 0 }));
        assert!(matches!(canvas.trim_end(3), Err(CanvasError::TrimOutOfRange { .. })));
        canvas.trim_end(1).expect("trim");
        assert_eq!(canvas.text(), vec![b"a".to_vec()]);
        canvas.trim_end(1).expect("trim to nothing");
        assert_eq!(canvas.rows(), 0);
        assert_eq!(canvas.content().count(), 0);
    }

    // ========================================================================
    // Overlay
    // ========================================================================

    fn overlay_rows(bg: CanvasRef, fg: CanvasRef, left: usize) -> Vec<Vec<Run>> {
        let mut canvas = CompositeCanvas::new(bg);
        canvas.overlay(fg, left, 0).expect("overlay fits");
        rows(&canvas)
    }

    #[test]
    fn overlay_positions() {
        let bg = || c(b"qxqxqxqx");
        assert_eq!(overlay_rows(bg(), c(b"HI"), 0), vec![vec![r(None, b"HI"), r(None, b"qxqxqx")]]);
        assert_eq!(overlay_rows(bg(), c(b"HI"), 6), vec![vec![r(None, b"qxqxqx"), r(None, b"HI")]]);
        assert_eq!(
            overlay_rows(bg(), c(b"HI"), 3),
            vec![vec![r(None, b"qxq"), r(None, b"HI"), r(None, b"xqx")]]
        );
        assert_eq!(
            overlay_rows(bg(), c(b"HI  "), 2),
            vec![vec![r(None, b"qx"), r(None, b"HI  "), r(None, b"qx")]]
        );
        assert_eq!(overlay_rows(c(b"rz"), c(b"HI"), 0), vec![vec![r(None, b"HI")]]);
    }

    #[test]
    fn overlay_keeps_attributes_apart() {
        let a = Some("a");
        let cases = [
            (
                "same",
                vec![(a, 9)],
                "HI",
                vec![(a, 2)],
                4,
                vec![r(a, b"asdf"), r(a, b"HI"), r(a, b"jkl")],
            ),
            (
                "diff",
                vec![(a, 9)],
                "HI",
                vec![(Some("b"), 2)],
                4,
                vec![r(a, b"asdf"), r(Some("b"), b"HI"), r(a, b"jkl")],
            ),
            (
                "None end",
                vec![(a, 9)],
                "HI  ",
                vec![(a, 2)],
                2,
                vec![r(a, b"as"), r(a, b"HI"), r(None, b"  "), r(a, b"jkl")],
            ),
            (
                "float end",
                vec![(a, 3)],
                "HI",
                vec![(a, 2)],
                4,
                vec![r(a, b"asd"), r(None, b"f"), r(a, b"HI"), r(None, b"jkl")],
            ),
            (
                "cover 2",
                vec![(a, 5), (Some("c"), 4)],
                "HI",
                vec![(Some("b"), 2)],
                4,
                vec![r(a, b"asdf"), r(Some("b"), b"HI"), r(Some("c"), b"jkl")],
            ),
            (
                "cover 2-2",
                vec![(a, 4), (Some("d"), 1), (Some("e"), 1), (Some("c"), 3)],
                "HI",
                vec![(Some("b"), 2)],
                4,
                vec![r(a, b"asdf"), r(Some("b"), b"HI"), r(Some("c"), b"jkl")],
            ),
        ];
        for (desc, bg_attr, fg_text, fg_attr, left, expected) in cases {
            let got = overlay_rows(ca(b"asdfghjkl", &bg_attr), ca(fg_text.as_bytes(), &fg_attr), left);
            assert_eq!(got, vec![expected], "{desc}");
        }
    }

    #[test]
    fn overlay_on_double_byte_text() {
        let wide = TextMeasure::new(ByteEncoding::Wide);
        let bg = || -> CanvasRef {
            Arc::new(
                TextCanvas::from_parts_with(wide, vec![b"\xa1\xa1\xa1\xa1\xa1\xa1".to_vec()], None, None, None)
                    .expect("wide canvas"),
            )
        };
        let cases: [(&[u8], usize, Vec<Run>); 4] = [
            (b"HI", 2, vec![r(None, b"\xa1\xa1"), r(None, b"HI"), r(None, b"\xa1\xa1")]),
            (b"OHI", 1, vec![r(None, b" "), r(None, b"OHI"), r(None, b"\xa1\xa1")]),
            (b"OHI", 2, vec![r(None, b"\xa1\xa1"), r(None, b"OHI"), r(None, b" ")]),
            (b"OHIO", 1, vec![r(None, b" "), r(None, b"OHIO"), r(None, b" ")]),
        ];
        for (fg, left, expected) in cases {
            assert_eq!(overlay_rows(bg(), c(fg), left), vec![expected], "{fg:?} at {left}");
        }
    }

    #[test]
    fn overlay_between_rows() {
        let bg: CanvasRef = Arc::new(
            TextCanvas::from_parts_with(UTF8, vec![b"....".to_vec(); 4], None, None, None).expect("bg"),
        );
        let fg = Arc::new(TextCanvas::new(vec![b"##".to_vec(); 2]).expect("fg").with_cursor((1, 1)));
        let overlaid = canvas_overlay(fg, bg, 1, 1).expect("fits");
        assert_eq!(
            overlaid.text(),
            vec![b"....".to_vec(), b".##.".to_vec(), b".##.".to_vec(), b"....".to_vec()]
        );
        assert_eq!(overlaid.cursor(), Some((2, 2)));
        assert_eq!(overlaid.children().len(), 2);
        assert_eq!(overlaid.children()[0].cols(), 2);
    }

    #[test]
    fn overlay_must_fit() {
        let mut canvas = CompositeCanvas::new(c(b"abc"));
        assert_eq!(
            canvas.overlay(c(b"HI"), 2, 0),
            Err(CanvasError::OverlaySize {
                cols: 2,
                rows: 1,
                left: 2,
                top: 0
            })
        );
    }

    // ========================================================================
    // Join and combine
    // ========================================================================

    #[test]
    fn join_pads_columns_and_rows() {
        let hello = c(b"hello");
        let there = ca(b"there", &[(Some("a"), 5)]);
        let a = c(b"a");
        let hi = c(b"hi");
        let how = ca(b"how", &[(Some("a"), 1)]);
        let dy = c(b"dy");
        let how_you: CanvasRef = Arc::new(
            TextCanvas::from_parts_with(UTF8, vec![b"how".to_vec(), b"you".to_vec()], None, None, None)
                .expect("canvas"),
        );

        let join = |items: &[(&CanvasRef, usize)]| -> Vec<Vec<Run>> {
            let joined = canvas_join(items.iter().map(|(c, n)| (Arc::clone(c), false, *n))).expect("join");
            rows(&joined)
        };

        assert_eq!(join(&[(&hello, 5)]), vec![vec![r(None, b"hello")]]);
        assert_eq!(
            join(&[(&hello, 5), (&there, 5)]),
            vec![vec![r(None, b"hello"), r(Some("a"), b"there")]]
        );
        assert_eq!(
            join(&[(&hello, 7), (&there, 5)]),
            vec![vec![r(None, b"hello"), r(None, b"  "), r(Some("a"), b"there")]]
        );
        assert_eq!(
            join(&[(&hi, 4), (&how, 3), (&dy, 2)]),
            vec![vec![
                r(None, b"hi"),
                r(None, b"  "),
                r(Some("a"), b"h"),
                r(None, b"ow"),
                r(None, b"dy"),
            ]]
        );
        assert_eq!(
            join(&[(&a, 2), (&hi, 3), (&dy, 3), (&a, 1)]),
            vec![vec![
                r(None, b"a"),
                r(None, b" "),
                r(None, b"hi"),
                r(None, b" "),
                r(None, b"dy"),
                r(None, b" "),
                r(None, b"a"),
            ]]
        );
        assert_eq!(
            join(&[(&how_you, 4), (&hi, 2)]),
            vec![
                vec![r(None, b"how"), r(None, b" "), r(None, b"hi")],
                vec![r(None, b"you"), r(None, b" "), r(None, b"  ")],
            ]
        );
        assert_eq!(
            join(&[(&hi, 4), (&how_you, 3)]),
            vec![
                vec![r(None, b"hi"), r(None, b"  "), r(None, b"how")],
                vec![r(None, b"    "), r(None, b"you")],
            ]
        );
    }

    #[test]
    fn join_moves_focus_child_first() {
        let (left, right) = (c(b"l"), c(b"r"));
        let joined = canvas_join([(Arc::clone(&left), false, 1), (Arc::clone(&right), true, 1)]).expect("join");
        assert!(Arc::ptr_eq(&joined.children()[0], &right));
        assert!(Arc::ptr_eq(&joined.children()[1], &left));
    }

    #[test]
    fn combine_stacks_rows() {
        let top = c(b"top");
        let bottom = Arc::new(TextCanvas::new(vec![b"bot".to_vec()]).expect("canvas").with_cursor((2, 0)));
        let combined = canvas_combine([(top, false), (bottom as CanvasRef, true)]);
        assert_eq!(combined.rows(), 2);
        assert_eq!(combined.text(), vec![b"top".to_vec(), b"bot".to_vec()]);
        assert_eq!(combined.cursor(), Some((2, 1)));
        assert_eq!(combined.children()[0].text(), vec![b"bot".to_vec()]);
    }

    #[test]
    fn nested_composites_share_shards() {
        let mut inner = CompositeCanvas::new(c(b"ab"));
        inner.pad_trim_left_right(1, 1).expect("pad");
        let inner: CanvasRef = Arc::new(inner);
        let outer = CompositeCanvas::new(Arc::clone(&inner));
        assert_eq!(outer.shards(), inner.shards());
        assert_eq!(outer.text(), vec![b" ab ".to_vec()]);
    }

    // ========================================================================
    // Attributes, windows and finalization
    // ========================================================================

    #[test]
    fn fill_attr_maps_default_runs() {
        let mut canvas = CompositeCanvas::new(ca(b"Hello world", &[(Some("a"), 5)]));
        canvas.pad_trim_left_right(1, 0).expect("pad");
        canvas.fill_attr(Attr::new("bg")).expect("fill");
        assert_eq!(
            rows(&canvas),
            vec![vec![r(Some("bg"), b" "), r(Some("a"), b"Hello"), r(Some("bg"), b" world")]]
        );

        let mut map = AttrMap::new();
        map.insert(Some(Attr::new("a")), Some(Attr::new("hi")));
        map.insert(Some(Attr::new("bg")), Some(Attr::new("dim")));
        canvas.fill_attr_apply(&map).expect("apply");
        assert_eq!(
            rows(&canvas),
            vec![vec![r(Some("dim"), b" "), r(Some("hi"), b"Hello"), r(Some("dim"), b" world")]]
        );
    }

    #[test]
    fn composite_content_window() {
        let bg: CanvasRef = Arc::new(
            TextCanvas::from_parts_with(UTF8, vec![b"abcd".to_vec(), b"efgh".to_vec()], None, None, None)
                .expect("canvas"),
        );
        let mut canvas = CompositeCanvas::new(bg);
        canvas.pad_trim_left_right(1, 0).expect("pad");
        let window: Vec<_> = canvas.content_window(ContentWindow::new(1, 1, 2, 1)).collect();
        assert_eq!(window, vec![vec![r(None, b"ef")]]);
        let empty: Vec<_> = canvas.content_window(ContentWindow::new(2, 0, 0, 2)).collect();
        assert_eq!(empty, vec![Vec::new(), Vec::new()]);
    }

    #[test]
    fn finalized_composite_rejects_changes() {
        let canvas = CompositeCanvas::new(c(b"x"));
        let widget = WidgetId(3);
        let shared = canvas.clone().finalize(widget, RenderSize::Fixed, false).expect("finalize");
        assert_eq!(shared.widget_info().map(|i| i.widget), Some(widget));

        let mut frozen = canvas;
        frozen.widget_info = shared.widget_info().copied();
        assert_eq!(frozen.pad_trim_left_right(1, 0), Err(CanvasError::Finalized));
        assert_eq!(frozen.fill_attr(Attr::new("a")), Err(CanvasError::Finalized));
        assert_eq!(frozen.set_depends(vec![widget]), Err(CanvasError::Finalized));
        assert_eq!(frozen.set_cursor(None), Err(CanvasError::Finalized));
        assert!(matches!(frozen.finalize(widget, RenderSize::Fixed, false), Err(CanvasError::Finalized)));
    }

    #[test]
    fn cursor_follows_padding() {
        let base = Arc::new(TextCanvas::new(vec![b"ab".to_vec(), b"cd".to_vec()]).expect("canvas").with_cursor((1, 1)));
        let mut canvas = CompositeCanvas::new(base);
        canvas.pad_trim_left_right(2, 0).expect("pad");
        canvas.pad_trim_top_bottom(1, 0).expect("pad");
        assert_eq!(canvas.cursor(), Some((3, 2)));
        canvas.trim(2, None).expect("trim");
        assert_eq!(canvas.cursor(), Some((3, 0)));
        canvas.pad_trim_left_right(-3, 0).expect("trim");
        assert_eq!(canvas.cursor(), Some((0, 0)));
        canvas.trim(0, Some(1)).expect("keep");
        canvas.pad_trim_left_right(-1, 0).expect_err("no columns left");
    }
}
