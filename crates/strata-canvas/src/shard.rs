#![forbid(unsafe_code)]

//! Shard lists: how composite canvases arrange child canvases.
//!
//! A composite never copies child rows. It keeps a list of [`Shard`]s, each
//! a run of rows plus the [`CanvasView`]s that *start* in that run. A view
//! may be taller than its shard; it then keeps running through the shards
//! below, occupying the columns left free there. The bookkeeping for those
//! running views is the *tail* carried from one shard to the next.
//!
//! ```text
//!  shard 0 (3 rows): [ foo 10x5        ][ baz 5x8 ]
//!  shard 1 (2 rows):   (foo continues)    (baz continues)
//!  shard 2 (3 rows): [ bar 10x3        ]  (baz continues)
//! ```
//!
//! Here shard 1 has no views of its own and shard 2 lists only `bar`; the
//! tail tells [`shard_body`] that `bar` fills the 10-column gap to the left
//! of the still-running `baz`.

use std::fmt;
use std::sync::Arc;

use crate::canvas::{AttrMap, CanvasError, CanvasRef, CanvasRow, ContentWindow, RowIter};

// ============================================================================
// Views and Shards
// ============================================================================

/// A rectangular window onto a shared canvas.
#[derive(Clone)]
pub struct CanvasView {
    pub trim_left: usize,
    pub trim_top: usize,
    pub cols: usize,
    pub rows: usize,
    pub attr_map: Option<Arc<AttrMap>>,
    pub canvas: CanvasRef,
}

impl CanvasView {
    /// The whole of `canvas`.
    #[must_use]
    pub fn new(canvas: CanvasRef) -> Self {
        Self {
            trim_left: 0,
            trim_top: 0,
            cols: canvas.cols(),
            rows: canvas.rows(),
            attr_map: None,
            canvas,
        }
    }

    /// `cols` x `rows` of `canvas` starting at its top-left corner.
    #[must_use]
    pub fn sized(canvas: CanvasRef, cols: usize, rows: usize) -> Self {
        Self {
            trim_left: 0,
            trim_top: 0,
            cols,
            rows,
            attr_map: None,
            canvas,
        }
    }

    /// Keep only the first `rows` rows.
    #[must_use]
    pub fn trim_rows(mut self, rows: usize) -> Self {
        self.rows = rows;
        self
    }

    /// Drop `trim` rows from the top.
    #[must_use]
    pub fn trim_top(mut self, trim: usize) -> Self {
        self.trim_top += trim;
        self.rows -= trim;
        self
    }

    /// Drop `trim` columns from the left.
    #[must_use]
    pub fn trim_left(mut self, trim: usize) -> Self {
        self.trim_left += trim;
        self.cols -= trim;
        self
    }

    /// Keep only the first `cols` columns.
    #[must_use]
    pub fn trim_cols(mut self, cols: usize) -> Self {
        self.cols = cols;
        self
    }

    /// The content window this view reads.
    #[must_use]
    pub fn window(&self) -> ContentWindow {
        ContentWindow::new(self.trim_left, self.trim_top, self.cols, self.rows)
            .with_attr_map(self.attr_map.clone())
    }

    /// Lazily produce this view's rows.
    ///
    /// The iterator holds its own handle to the canvas, so it may outlive
    /// the view and the shard list it came from.
    ///
    /// # Panics
    ///
    /// While iterating, when the view reaches outside the canvas.
    #[must_use]
    pub fn rows_iter(&self) -> RowIter<'static> {
        let canvas = Arc::clone(&self.canvas);
        let window = self.window();
        Box::new((0..self.rows).map(move |row| {
            canvas.row_at(row, &window).unwrap_or_else(|| {
                panic!(
                    "canvas view row {} outside a canvas of {} rows",
                    window.trim_top + row,
                    canvas.rows()
                )
            })
        }))
    }
}

impl PartialEq for CanvasView {
    fn eq(&self, other: &Self) -> bool {
        self.trim_left == other.trim_left
            && self.trim_top == other.trim_top
            && self.cols == other.cols
            && self.rows == other.rows
            && self.attr_map == other.attr_map
            && std::ptr::addr_eq(Arc::as_ptr(&self.canvas), Arc::as_ptr(&other.canvas))
    }
}

impl fmt::Debug for CanvasView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CanvasView")
            .field("trim_left", &self.trim_left)
            .field("trim_top", &self.trim_top)
            .field("cols", &self.cols)
            .field("rows", &self.rows)
            .field("attr_map", &self.attr_map)
            .field("canvas", &Arc::as_ptr(&self.canvas))
            .finish()
    }
}

/// A run of rows and the views that start in it.
#[derive(Debug, Clone, PartialEq)]
pub struct Shard {
    pub rows: usize,
    pub views: Vec<CanvasView>,
}

impl Shard {
    #[must_use]
    pub fn new(rows: usize, views: Vec<CanvasView>) -> Self {
        Self { rows, views }
    }

    /// A shard holding one view of the whole canvas.
    #[must_use]
    pub fn of(canvas: CanvasRef) -> Self {
        let view = CanvasView::new(canvas);
        Self {
            rows: view.rows,
            views: vec![view],
        }
    }
}

/// Total rows of a shard list.
#[must_use]
pub fn shards_rows(shards: &[Shard]) -> usize {
    shards.iter().map(|s| s.rows).sum()
}

/// Total columns of a shard list: the width of its first shard.
#[must_use]
pub fn shards_cols(shards: &[Shard]) -> usize {
    shards
        .first()
        .map_or(0, |s| s.views.iter().map(|v| v.cols).sum())
}

// ============================================================================
// Body and Tail
// ============================================================================

/// One view active in the current shard.
pub struct BodyEntry {
    /// Rows of the view already produced by earlier shards.
    pub done_rows: usize,
    /// Row source; absent when the body is only used for bookkeeping.
    pub rows: Option<RowIter<'static>>,
    pub view: CanvasView,
}

impl BodyEntry {
    fn start(view: &CanvasView, create_iter: bool) -> Self {
        Self {
            done_rows: 0,
            rows: create_iter.then(|| view.rows_iter()),
            view: view.clone(),
        }
    }
}

impl fmt::Debug for BodyEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BodyEntry")
            .field("done_rows", &self.done_rows)
            .field("rows", &self.rows.as_ref().map(|_| ".."))
            .field("view", &self.view)
            .finish()
    }
}

/// A view still running after its shard ends.
pub struct TailEntry {
    /// Columns to its left freed by views that have finished.
    pub col_gap: usize,
    pub done_rows: usize,
    pub rows: Option<RowIter<'static>>,
    pub view: CanvasView,
}

impl fmt::Debug for TailEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TailEntry")
            .field("col_gap", &self.col_gap)
            .field("done_rows", &self.done_rows)
            .field("rows", &self.rows.as_ref().map(|_| ".."))
            .field("view", &self.view)
            .finish()
    }
}

/// Merge the views starting in a shard with the views running into it.
///
/// New views fill each tail entry's column gap, left to right, before that
/// entry; views left over go after the last tail entry. With `create_iter`
/// each new view gets a row iterator.
///
/// # Errors
///
/// [`CanvasError::ShardGapOverflow`] when a new view is wider than the gap
/// it lands in.
pub fn shard_body(
    views: &[CanvasView],
    tail: Vec<TailEntry>,
    create_iter: bool,
) -> Result<Vec<BodyEntry>, CanvasError> {
    let mut body = Vec::with_capacity(views.len() + tail.len());
    let mut new_views = views.iter();
    for entry in tail {
        let mut gap = entry.col_gap;
        while gap > 0 {
            let Some(view) = new_views.next() else {
                break;
            };
            gap = gap
                .checked_sub(view.cols)
                .ok_or(CanvasError::ShardGapOverflow)?;
            body.push(BodyEntry::start(view, create_iter));
        }
        body.push(BodyEntry {
            done_rows: entry.done_rows,
            rows: entry.rows,
            view: entry.view,
        });
    }
    body.extend(new_views.map(|view| BodyEntry::start(view, create_iter)));
    Ok(body)
}

/// Produce the next output row, advancing every view in `body` by one row.
///
/// # Panics
///
/// When an entry has no row iterator or its view has run out of rows.
pub fn shard_body_row(body: &mut [BodyEntry]) -> CanvasRow {
    let mut row = Vec::new();
    for entry in body {
        let Some(rows) = entry.rows.as_mut() else {
            panic!("shard body built without row iterators");
        };
        match rows.next() {
            Some(runs) => row.extend(runs),
            None => panic!("canvas view ran out of rows: {:?}", entry.view),
        }
    }
    row
}

/// The tail left after `num_rows` rows of `body` are produced.
///
/// Finished views turn into column gaps in front of the next running view;
/// a gap after the last running view is dropped.
#[must_use]
pub fn shard_body_tail(num_rows: usize, body: Vec<BodyEntry>) -> Vec<TailEntry> {
    let mut tail = Vec::new();
    let mut col_gap = 0;
    for entry in body {
        let done_rows = entry.done_rows + num_rows;
        if done_rows == entry.view.rows {
            col_gap += entry.view.cols;
            continue;
        }
        tail.push(TailEntry {
            col_gap,
            done_rows,
            rows: entry.rows,
            view: entry.view,
        });
        col_gap = 0;
    }
    tail
}

/// Rows of a shard list, produced lazily.
///
/// Owns the shard list, so it can be handed out by a canvas that built the
/// list on the fly.
///
/// # Panics
///
/// While iterating, when the shard list is malformed: views overflow a gap
/// or a view runs out of rows.
pub struct ShardRows {
    shards: std::vec::IntoIter<Shard>,
    body: Vec<BodyEntry>,
    /// Rows in the shard `body` belongs to.
    shard_rows: usize,
    rows_left: usize,
}

impl ShardRows {
    #[must_use]
    pub fn new(shards: Vec<Shard>) -> Self {
        Self {
            shards: shards.into_iter(),
            body: Vec::new(),
            shard_rows: 0,
            rows_left: 0,
        }
    }
}

impl Iterator for ShardRows {
    type Item = CanvasRow;

    fn next(&mut self) -> Option<CanvasRow> {
        while self.rows_left == 0 {
            let shard = self.shards.next()?;
            let tail = shard_body_tail(self.shard_rows, std::mem::take(&mut self.body));
            self.body = match shard_body(&shard.views, tail, true) {
                Ok(body) => body,
                Err(err) => panic!("malformed shard list: {err}"),
            };
            self.shard_rows = shard.rows;
            self.rows_left = shard.rows;
        }
        self.rows_left -= 1;
        Some(shard_body_row(&mut self.body))
    }
}

// ============================================================================
// Trimming
// ============================================================================

/// `shards` with the top `top` rows removed.
///
/// Shards entirely above the cut are dropped; every view in the shard the
/// cut lands in, including views running into it, is trimmed to start at
/// the cut.
///
/// # Errors
///
/// [`CanvasError::TrimOutOfRange`] when `top` covers every row, and
/// [`CanvasError::ShardGapOverflow`] for a malformed list.
pub fn shards_trim_top(shards: &[Shard], top: usize) -> Result<Vec<Shard>, CanvasError> {
    if top == 0 {
        return Ok(shards.to_vec());
    }
    let available = shards_rows(shards);
    let mut remaining = top;
    let mut tail = Vec::new();
    let mut iter = shards.iter();
    let cut = loop {
        let Some(shard) = iter.next() else {
            return Err(CanvasError::TrimOutOfRange {
                amount: top,
                available,
            });
        };
        if remaining < shard.rows {
            break shard;
        }
        let body = shard_body(&shard.views, tail, false)?;
        tail = shard_body_tail(shard.rows, body);
        remaining -= shard.rows;
    };

    let views = shard_body(&cut.views, tail, false)?
        .into_iter()
        .map(|entry| entry.view.trim_top(entry.done_rows + remaining))
        .collect();
    let mut trimmed = vec![Shard::new(cut.rows - remaining, views)];
    trimmed.extend(iter.cloned());
    Ok(trimmed)
}

/// The topmost `keep_rows` rows of `shards`.
#[must_use]
pub fn shards_trim_rows(shards: &[Shard], keep_rows: usize) -> Vec<Shard> {
    let mut trimmed = Vec::new();
    let mut done_rows = 0;
    for shard in shards {
        if done_rows >= keep_rows {
            break;
        }
        let left = keep_rows - done_rows;
        let views = shard
            .views
            .iter()
            .map(|view| {
                if view.rows > left {
                    view.clone().trim_rows(left)
                } else {
                    view.clone()
                }
            })
            .collect();
        trimmed.push(Shard::new(shard.rows.min(left), views));
        done_rows += shard.rows;
    }
    trimmed
}

/// `shards` seen through the columns `left..left + cols`.
///
/// Views outside the window are dropped and views crossing its edges are
/// narrowed. A shard left with no views of its own merges into the shard
/// above it.
///
/// # Errors
///
/// [`CanvasError::InvalidTrim`] when `cols` is zero, and
/// [`CanvasError::ShardGapOverflow`] for a malformed list.
pub fn shards_trim_sides(
    shards: &[Shard],
    left: usize,
    cols: usize,
) -> Result<Vec<Shard>, CanvasError> {
    if cols == 0 {
        return Err(CanvasError::InvalidTrim { amount: 0 });
    }
    let right = left + cols;
    let mut trimmed: Vec<Shard> = Vec::new();
    let mut tail = Vec::new();
    for shard in shards {
        let body = shard_body(&shard.views, tail, false)?;
        let mut views = Vec::new();
        let mut col = 0;
        for entry in &body {
            let next_col = col + entry.view.cols;
            if entry.done_rows > 0 || next_col <= left || col >= right {
                col = next_col;
                continue;
            }
            let mut view = entry.view.clone();
            if col < left {
                view = view.trim_left(left - col);
                col = left;
            }
            if next_col > right {
                view = view.trim_cols(right - col);
            }
            views.push(view);
            col = next_col;
        }
        tail = shard_body_tail(shard.rows, body);

        match trimmed.last_mut() {
            Some(prev) if views.is_empty() => prev.rows += shard.rows,
            _ => trimmed.push(Shard::new(shard.rows, views)),
        }
    }
    Ok(trimmed)
}

// ============================================================================
// Joining
// ============================================================================

/// Place shard lists side by side, in order.
///
/// The lists advance in lock step; a new shard starts wherever any list
/// starts one, and lists crossing a boundary contribute no views there.
///
/// # Errors
///
/// [`CanvasError::RowMismatch`] when the lists cover different numbers of
/// rows.
pub fn shards_join(shard_lists: &[&[Shard]]) -> Result<Vec<Shard>, CanvasError> {
    let Some(first) = shard_lists.first() else {
        return Ok(Vec::new());
    };
    let expected = shards_rows(first);
    if let Some(found) = shard_lists
        .iter()
        .map(|list| shards_rows(list))
        .find(|&rows| rows != expected)
    {
        return Err(CanvasError::RowMismatch { expected, found });
    }

    let mut iters: Vec<_> = shard_lists.iter().map(|list| list.iter()).collect();
    let mut current: Vec<(usize, Option<&[CanvasView]>)> = Vec::with_capacity(iters.len());
    for iter in &mut iters {
        match iter.next() {
            Some(shard) => current.push((shard.rows, Some(shard.views.as_slice()))),
            None => return Ok(Vec::new()),
        }
    }

    let mut joined = Vec::new();
    loop {
        let num_rows = current.iter().map(|(rows, _)| *rows).min().unwrap_or(0);
        let mut views = Vec::new();
        for (rows, starting) in &mut current {
            if let Some(starting) = starting.take() {
                views.extend_from_slice(starting);
            }
            *rows -= num_rows;
        }
        joined.push(Shard::new(num_rows, views));

        for ((rows, starting), iter) in current.iter_mut().zip(&mut iters) {
            if *rows > 0 {
                continue;
            }
            let Some(shard) = iter.next() else {
                return Ok(joined);
            };
            *rows = shard.rows;
            *starting = Some(shard.views.as_slice());
        }
    }
}
