#![forbid(unsafe_code)]

//! Canvas model: the shared trait, leaf canvases and row content.
//!
//! A canvas is a rectangle of rendered rows. Each row is a list of [`Run`]s:
//! bytes in the terminal encoding tagged with a display attribute and a
//! charset. Screen backends consume nothing else.
//!
//! Leaf canvases own their rows:
//! - [`TextCanvas`] - literal rows with attribute and charset RLE lists
//! - [`SolidCanvas`] - one repeated glyph
//! - [`BlankCanvas`] - spaces, sized by whoever views it
//!
//! [`CompositeCanvas`](crate::compose::CompositeCanvas) arranges views of
//! other canvases without copying them.
//!
//! Once finalized a canvas is handed out as a [`CanvasRef`] and never
//! changes again; every transform wraps it instead.
//!
//! # Example
//!
//! ```
//! use strata_canvas::canvas::{Attr, Canvas, Run, TextCanvas};
//!
//! let canvas = TextCanvas::from_parts(
//!     vec![b"Hello world".to_vec()],
//!     Some(vec![vec![(Some(Attr::new("a")), 5)]]),
//!     None,
//!     None,
//! )
//! .unwrap();
//! let rows: Vec<_> = canvas.content().collect();
//! assert_eq!(
//!     rows,
//!     vec![vec![Run::new(Some(Attr::new("a")), None, b"Hello"), Run::plain(b" world")]]
//! );
//! ```

use std::fmt;
use std::sync::{Arc, LazyLock};

use rustc_hash::FxHashMap;
use strata_core::{RenderSize, WidgetId};
use strata_text::rle::{Rle, rle_append_modify, rle_len, rle_product, trim_text_attr_cs};
use strata_text::target::{Charset, apply_target_encoding};
use strata_text::width::TextMeasure;

use crate::shard::Shard;

// ============================================================================
// Errors
// ============================================================================

/// Errors from building or transforming canvases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanvasError {
    /// The canvas is finalized; wrap it in a composite to change it.
    Finalized,
    /// The canvas has no widget info and cannot be cached.
    NotFinalized,
    /// A text row is wider than the canvas.
    TextTooWide { row: usize, width: usize, maxcol: usize },
    /// An attribute list covers more bytes than its row.
    AttrOverflow { row: usize },
    /// A charset list covers more bytes than its row.
    CharsetOverflow { row: usize },
    /// A trim or pad amount outside what the operation accepts.
    InvalidTrim { amount: isize },
    /// An overlay does not fit inside the canvas below it.
    OverlaySize { cols: usize, rows: usize, left: usize, top: usize },
    /// Views in a shard overrun the columns left free by running views.
    ShardGapOverflow,
    /// Shard lists joined side by side cover different numbers of rows.
    RowMismatch { expected: usize, found: usize },
    /// Trimming would remove every row or column.
    TrimOutOfRange { amount: usize, available: usize },
    /// A rendered canvas does not match the size it was rendered for.
    SizeMismatch {
        widget: WidgetId,
        size: RenderSize,
        cols: usize,
        rows: usize,
    },
    /// A fill glyph that is not exactly one column wide.
    InvalidFill(String),
}

impl fmt::Display for CanvasError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finalized => f.write_str(
                "canvas is finalized; wrap it in a CompositeCanvas to make changes",
            ),
            Self::NotFinalized => f.write_str("cannot cache a canvas without widget info"),
            Self::TextTooWide { row, width, maxcol } => {
                write!(f, "row {row} is {width} columns wide, canvas allows {maxcol}")
            }
            Self::AttrOverflow { row } => write!(f, "attributes extend beyond text on row {row}"),
            Self::CharsetOverflow { row } => {
                write!(f, "character sets extend beyond text on row {row}")
            }
            Self::InvalidTrim { amount } => write!(f, "invalid trim amount {amount}"),
            Self::OverlaySize {
                cols,
                rows,
                left,
                top,
            } => write!(
                f,
                "overlay of {cols}x{rows} at ({left}, {top}) does not fit the canvas below"
            ),
            Self::ShardGapOverflow => f.write_str("canvas views overflow gaps in shard tail"),
            Self::RowMismatch { expected, found } => {
                write!(f, "cannot join shard lists of {expected} and {found} rows")
            }
            Self::TrimOutOfRange { amount, available } => {
                write!(f, "cannot trim {amount} from {available}")
            }
            Self::SizeMismatch {
                widget,
                size,
                cols,
                rows,
            } => write!(
                f,
                "{widget} rendered a {cols}x{rows} canvas when passed size {size}"
            ),
            Self::InvalidFill(fill) => write!(f, "invalid fill character {fill:?}"),
        }
    }
}

impl std::error::Error for CanvasError {}

// ============================================================================
// Attributes
// ============================================================================

/// A display attribute name, resolved to colors by the screen backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Attr(Arc<str>);

impl Attr {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Attr {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for Attr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Attribute translation applied to a view of a canvas.
///
/// Keys are the attributes found in the viewed canvas; `None` stands for the
/// default attribute. Attributes without an entry pass through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttrMap(FxHashMap<Option<Attr>, Option<Attr>>);

impl AttrMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Map only the default attribute to `attr`.
    #[must_use]
    pub fn fill(attr: Attr) -> Self {
        let mut map = Self::new();
        map.insert(None, Some(attr));
        map
    }

    pub fn insert(&mut self, from: Option<Attr>, to: Option<Attr>) {
        self.0.insert(from, to);
    }

    /// The replacement for `attr`, if one is mapped.
    #[must_use]
    pub fn get(&self, attr: &Option<Attr>) -> Option<&Option<Attr>> {
        self.0.get(attr)
    }

    /// `attr` after translation.
    #[must_use]
    pub fn apply(&self, attr: Option<Attr>) -> Option<Attr> {
        match self.0.get(&attr) {
            Some(mapped) => mapped.clone(),
            None => attr,
        }
    }

    /// The map equivalent to applying `self` and then `outer`.
    #[must_use]
    pub fn then(&self, outer: &AttrMap) -> AttrMap {
        let mut combined = outer.clone();
        for (from, to) in &self.0 {
            combined.insert(from.clone(), outer.apply(to.clone()));
        }
        combined
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(Option<Attr>, Option<Attr>)> for AttrMap {
    fn from_iter<I: IntoIterator<Item = (Option<Attr>, Option<Attr>)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ============================================================================
// Row Content
// ============================================================================

/// One run of a canvas row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub attr: Option<Attr>,
    pub charset: Option<Charset>,
    pub text: Vec<u8>,
}

impl Run {
    #[must_use]
    pub fn new(attr: Option<Attr>, charset: Option<Charset>, text: &[u8]) -> Self {
        Self {
            attr,
            charset,
            text: text.to_vec(),
        }
    }

    /// A run with the default attribute and charset.
    #[must_use]
    pub fn plain(text: &[u8]) -> Self {
        Self::new(None, None, text)
    }

    /// `cols` spaces in the default charset.
    #[must_use]
    pub fn blank(attr: Option<Attr>, cols: usize) -> Self {
        Self {
            attr,
            charset: None,
            text: vec![b' '; cols],
        }
    }
}

/// One output row.
pub type CanvasRow = Vec<Run>;

/// Lazily produced rows of a canvas.
pub type RowIter<'a> = Box<dyn Iterator<Item = CanvasRow> + 'a>;

/// Shared handle to a finalized canvas.
pub type CanvasRef = Arc<dyn Canvas>;

/// The part of a canvas to produce, and how to translate its attributes.
///
/// `cols`/`rows` of `None` mean "everything right of / below the trim".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentWindow {
    pub trim_left: usize,
    pub trim_top: usize,
    pub cols: Option<usize>,
    pub rows: Option<usize>,
    pub attr_map: Option<Arc<AttrMap>>,
}

impl ContentWindow {
    /// The whole canvas, untranslated.
    #[must_use]
    pub fn full() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn new(trim_left: usize, trim_top: usize, cols: usize, rows: usize) -> Self {
        Self {
            trim_left,
            trim_top,
            cols: Some(cols),
            rows: Some(rows),
            attr_map: None,
        }
    }

    #[must_use]
    pub fn with_attr_map(mut self, map: Option<Arc<AttrMap>>) -> Self {
        self.attr_map = map;
        self
    }

    /// Resolve to concrete `(cols, rows)` for a canvas of the given size.
    ///
    /// # Panics
    ///
    /// When the window reaches outside the canvas.
    #[must_use]
    pub fn resolve(&self, maxcol: usize, maxrow: usize) -> (usize, usize) {
        let cols = self
            .cols
            .unwrap_or_else(|| maxcol.saturating_sub(self.trim_left));
        let rows = self
            .rows
            .unwrap_or_else(|| maxrow.saturating_sub(self.trim_top));
        assert!(
            cols == 0 || self.trim_left + cols <= maxcol,
            "content window columns {}..{} outside canvas of {maxcol}",
            self.trim_left,
            self.trim_left + cols
        );
        assert!(
            rows == 0 || self.trim_top + rows <= maxrow,
            "content window rows {}..{} outside canvas of {maxrow}",
            self.trim_top,
            self.trim_top + rows
        );
        (cols, rows)
    }
}

/// Identity of the render call a canvas came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WidgetInfo {
    pub widget: WidgetId,
    pub size: RenderSize,
    pub focus: bool,
}

// ============================================================================
// Canvas Trait
// ============================================================================

/// A renderable rectangle of rows.
pub trait Canvas: fmt::Debug + Send + Sync {
    /// Screen columns.
    fn cols(&self) -> usize;

    fn rows(&self) -> usize;

    /// Cursor position, if the canvas shows one.
    fn cursor(&self) -> Option<(usize, usize)> {
        None
    }

    /// The render call this canvas was finalized against.
    fn widget_info(&self) -> Option<&WidgetInfo> {
        None
    }

    /// Rows inside `window`, translated through its attribute map.
    fn content_window(&self, window: ContentWindow) -> RowIter<'_>;

    /// Row `row` of `window`, counted from the window's top.
    ///
    /// `None` past the last row of the canvas.
    ///
    /// # Panics
    ///
    /// When the window reaches outside the canvas.
    fn row_at(&self, row: usize, window: &ContentWindow) -> Option<CanvasRow> {
        let line = ContentWindow {
            trim_top: window.trim_top + row,
            rows: Some(1),
            ..window.clone()
        };
        if line.trim_top >= self.rows() && self.rows() > 0 {
            return None;
        }
        self.content_window(line).next()
    }

    /// Every row.
    fn content(&self) -> RowIter<'_> {
        self.content_window(ContentWindow::full())
    }

    /// The shard list when this canvas is a composite.
    fn shards(&self) -> Option<&[Shard]> {
        None
    }

    /// Canvases this one was built from.
    fn children(&self) -> &[CanvasRef] {
        &[]
    }

    /// Widgets set explicitly as this canvas's cache dependencies.
    fn depends_on(&self) -> Option<&[WidgetId]> {
        None
    }

    /// The bytes of each row.
    fn text(&self) -> Vec<Vec<u8>> {
        self.content()
            .map(|row| row.into_iter().flat_map(|run| run.text).collect())
            .collect()
    }
}

// ============================================================================
// TextCanvas
// ============================================================================

/// Literal rows of text with their attributes and charsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextCanvas {
    text: Vec<Vec<u8>>,
    attr: Vec<Rle<Option<Attr>>>,
    cs: Vec<Rle<Option<Charset>>>,
    maxcol: usize,
    cursor: Option<(usize, usize)>,
    measure: TextMeasure,
    widget_info: Option<WidgetInfo>,
}

impl TextCanvas {
    /// Rows with default attributes, as wide as the widest row.
    ///
    /// # Errors
    ///
    /// Never for rows alone; see [`TextCanvas::from_parts`].
    pub fn new(text: Vec<Vec<u8>>) -> Result<Self, CanvasError> {
        Self::from_parts(text, None, None, None)
    }

    /// Build a canvas under the current encoding.
    ///
    /// Rows narrower than `maxcol` (default: the widest row) are padded with
    /// spaces; attribute and charset lists shorter than their row are
    /// extended with defaults.
    ///
    /// # Errors
    ///
    /// [`CanvasError::TextTooWide`] when a row exceeds `maxcol`, and
    /// [`CanvasError::AttrOverflow`] / [`CanvasError::CharsetOverflow`] when
    /// a list covers more bytes than its row.
    pub fn from_parts(
        text: Vec<Vec<u8>>,
        attr: Option<Vec<Rle<Option<Attr>>>>,
        cs: Option<Vec<Rle<Option<Charset>>>>,
        maxcol: Option<usize>,
    ) -> Result<Self, CanvasError> {
        Self::from_parts_with(TextMeasure::current(), text, attr, cs, maxcol)
    }

    /// [`TextCanvas::from_parts`] with an explicit width oracle.
    ///
    /// # Errors
    ///
    /// As [`TextCanvas::from_parts`].
    pub fn from_parts_with(
        measure: TextMeasure,
        mut text: Vec<Vec<u8>>,
        attr: Option<Vec<Rle<Option<Attr>>>>,
        cs: Option<Vec<Rle<Option<Charset>>>>,
        maxcol: Option<usize>,
    ) -> Result<Self, CanvasError> {
        let widths: Vec<usize> = text
            .iter()
            .map(|t| measure.calc_width(t, 0, t.len()))
            .collect();
        let maxcol = maxcol.unwrap_or_else(|| widths.iter().copied().max().unwrap_or(0));
        let mut attr = attr.unwrap_or_default();
        let mut cs = cs.unwrap_or_default();
        attr.resize_with(text.len(), Vec::new);
        cs.resize_with(text.len(), Vec::new);

        for (row, ((line, width), (a_row, cs_row))) in text
            .iter_mut()
            .zip(&widths)
            .zip(attr.iter_mut().zip(cs.iter_mut()))
            .enumerate()
        {
            if *width > maxcol {
                return Err(CanvasError::TextTooWide {
                    row,
                    width: *width,
                    maxcol,
                });
            }
            line.resize(line.len() + (maxcol - width), b' ');

            let a_len = rle_len(a_row);
            if a_len > line.len() {
                return Err(CanvasError::AttrOverflow { row });
            }
            if a_len < line.len() {
                rle_append_modify(a_row, (None, line.len() - a_len));
            }
            let cs_len = rle_len(cs_row);
            if cs_len > line.len() {
                return Err(CanvasError::CharsetOverflow { row });
            }
            if cs_len < line.len() {
                rle_append_modify(cs_row, (None, line.len() - cs_len));
            }
        }

        Ok(Self {
            text,
            attr,
            cs,
            maxcol,
            cursor: None,
            measure,
            widget_info: None,
        })
    }

    /// Set or clear the cursor.
    ///
    /// # Errors
    ///
    /// [`CanvasError::Finalized`] once finalized.
    pub fn set_cursor(&mut self, cursor: Option<(usize, usize)>) -> Result<(), CanvasError> {
        if self.widget_info.is_some() {
            return Err(CanvasError::Finalized);
        }
        self.cursor = cursor;
        Ok(())
    }

    /// Builder form of [`TextCanvas::set_cursor`] for fresh canvases.
    #[must_use]
    pub fn with_cursor(mut self, cursor: (usize, usize)) -> Self {
        self.cursor = Some(cursor);
        self
    }

    /// The raw rows, already padded to the canvas width.
    #[must_use]
    pub fn rows_text(&self) -> &[Vec<u8>] {
        &self.text
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
        if self.widget_info.is_some() {
            return Err(CanvasError::Finalized);
        }
        self.widget_info = Some(WidgetInfo {
            widget,
            size,
            focus,
        });
        Ok(Arc::new(self))
    }
}

impl Canvas for TextCanvas {
    fn cols(&self) -> usize {
        self.maxcol
    }

    fn rows(&self) -> usize {
        self.text.len()
    }

    fn cursor(&self) -> Option<(usize, usize)> {
        self.cursor
    }

    fn widget_info(&self) -> Option<&WidgetInfo> {
        self.widget_info.as_ref()
    }

    fn content_window(&self, window: ContentWindow) -> RowIter<'_> {
        let (cols, rows) = window.resolve(self.maxcol, self.text.len());
        Box::new(
            (window.trim_top..window.trim_top + rows)
                .map(move |i| self.window_row(i, window.trim_left, cols, window.attr_map.as_deref())),
        )
    }

    fn row_at(&self, row: usize, window: &ContentWindow) -> Option<CanvasRow> {
        let (cols, _) = window.resolve(self.maxcol, self.text.len());
        let i = window.trim_top + row;
        (i < self.text.len())
            .then(|| self.window_row(i, window.trim_left, cols, window.attr_map.as_deref()))
    }
}

impl TextCanvas {
    /// Row `i` cut to `cols` columns starting at `trim_left`.
    fn window_row(
        &self,
        i: usize,
        trim_left: usize,
        cols: usize,
        map: Option<&AttrMap>,
    ) -> CanvasRow {
        if cols == 0 {
            return Vec::new();
        }
        let (text, a_row, cs_row) = (&self.text[i], &self.attr[i], &self.cs[i]);
        if trim_left > 0 || cols < self.maxcol {
            let (text, a_row, cs_row) =
                trim_text_attr_cs(self.measure, text, a_row, cs_row, trim_left, trim_left + cols);
            split_runs(&text, &a_row, &cs_row, map)
        } else {
            split_runs(text, a_row, cs_row, map)
        }
    }
}

/// Cut `text` into runs at every attribute or charset boundary.
fn split_runs(
    text: &[u8],
    attr: &[(Option<Attr>, usize)],
    cs: &[(Option<Charset>, usize)],
    map: Option<&AttrMap>,
) -> CanvasRow {
    let mut i = 0;
    rle_product(attr, cs)
        .into_iter()
        .map(|((a, c), run)| {
            let a = match map {
                Some(m) => m.apply(a),
                None => a,
            };
            let end = (i + run).min(text.len());
            let out = Run::new(a, c, &text[i..end]);
            i = end;
            out
        })
        .collect()
}

// ============================================================================
// SolidCanvas / BlankCanvas
// ============================================================================

/// A canvas filled with one single-column glyph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolidCanvas {
    glyph: Vec<u8>,
    charset: Option<Charset>,
    cols: usize,
    rows: usize,
    widget_info: Option<WidgetInfo>,
}

impl SolidCanvas {
    /// Fill `cols` x `rows` with the first character of `fill`.
    ///
    /// # Errors
    ///
    /// [`CanvasError::InvalidFill`] when that character is not exactly one
    /// column wide.
    pub fn new(fill: &str, cols: usize, rows: usize) -> Result<Self, CanvasError> {
        let Some(ch) = fill.chars().next() else {
            return Err(CanvasError::InvalidFill(fill.to_owned()));
        };
        if strata_text::width::get_width(ch) != 1 {
            return Err(CanvasError::InvalidFill(fill.to_owned()));
        }
        let config = strata_core::current_encoding();
        let (glyph, cs) = apply_target_encoding(config, ch.encode_utf8(&mut [0; 4]));
        let charset = cs.first().and_then(|(c, _)| *c);
        Ok(Self {
            glyph,
            charset,
            cols,
            rows,
            widget_info: None,
        })
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
        if self.widget_info.is_some() {
            return Err(CanvasError::Finalized);
        }
        self.widget_info = Some(WidgetInfo {
            widget,
            size,
            focus,
        });
        Ok(Arc::new(self))
    }
}

/// Attribute a solid or blank view takes: the default, unless mapped.
fn default_attr(map: Option<&AttrMap>) -> Option<Attr> {
    map.and_then(|m| m.get(&None)).cloned().flatten()
}

impl Canvas for SolidCanvas {
    fn cols(&self) -> usize {
        self.cols
    }

    fn rows(&self) -> usize {
        self.rows
    }

    fn widget_info(&self) -> Option<&WidgetInfo> {
        self.widget_info.as_ref()
    }

    fn content_window(&self, window: ContentWindow) -> RowIter<'_> {
        let (cols, rows) = window.resolve(self.cols, self.rows);
        let line = vec![Run {
            attr: default_attr(window.attr_map.as_deref()),
            charset: self.charset,
            text: self.glyph.repeat(cols),
        }];
        Box::new(std::iter::repeat_n(line, rows))
    }
}

/// Spaces in the default attribute.
///
/// Has no size of its own: it fills whatever window a view asks for, which
/// makes it the padding used by composite canvases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlankCanvas;

static BLANK: LazyLock<CanvasRef> = LazyLock::new(|| Arc::new(BlankCanvas));

/// The shared blank canvas.
#[must_use]
pub fn blank_canvas() -> CanvasRef {
    Arc::clone(&BLANK)
}

impl Canvas for BlankCanvas {
    fn cols(&self) -> usize {
        0
    }

    fn rows(&self) -> usize {
        0
    }

    fn content_window(&self, window: ContentWindow) -> RowIter<'_> {
        let cols = window.cols.unwrap_or(0);
        let rows = window.rows.unwrap_or(0);
        let line = vec![Run::blank(default_attr(window.attr_map.as_deref()), cols)];
        Box::new(std::iter::repeat_n(line, rows))
    }
}
