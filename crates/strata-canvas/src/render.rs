#![forbid(unsafe_code)]

//! The widget-facing render contract and its cached entry points.
//!
//! A widget implements [`Render`]; callers go through [`cached_render`] and
//! [`cached_rows`], which consult a [`CanvasCache`] before rendering, check
//! the canvas against the requested size, and finalize and store fresh
//! canvases. The cache is handed down through every render call so container
//! widgets render their children through it too.

use std::any::TypeId;
use std::sync::Arc;

use strata_core::{RenderSize, WidgetId};

use crate::cache::CanvasCache;
use crate::canvas::{Canvas, CanvasError, CanvasRef, SolidCanvas, TextCanvas};
use crate::compose::CompositeCanvas;

/// What a widget's render call hands back.
#[derive(Debug)]
pub enum RenderOutput {
    Text(TextCanvas),
    Solid(SolidCanvas),
    Composite(CompositeCanvas),
    /// A canvas that already exists elsewhere, such as a child's render
    /// passed through unchanged. It is wrapped before being finalized.
    Shared(CanvasRef),
}

impl RenderOutput {
    #[must_use]
    pub fn as_canvas(&self) -> &dyn Canvas {
        match self {
            Self::Text(c) => c,
            Self::Solid(c) => c,
            Self::Composite(c) => c,
            Self::Shared(c) => c.as_ref(),
        }
    }

    /// Record the render call and hand out the shared handle.
    ///
    /// # Errors
    ///
    /// [`CanvasError::Finalized`] when an owned canvas was already finalized.
    pub fn finalize(
        self,
        widget: WidgetId,
        size: RenderSize,
        focus: bool,
    ) -> Result<CanvasRef, CanvasError> {
        match self {
            Self::Text(c) => c.finalize(widget, size, focus),
            Self::Solid(c) => c.finalize(widget, size, focus),
            Self::Composite(c) => c.finalize(widget, size, focus),
            Self::Shared(c) => CompositeCanvas::new(c).finalize(widget, size, focus),
        }
    }
}

impl From<TextCanvas> for RenderOutput {
    fn from(canvas: TextCanvas) -> Self {
        Self::Text(canvas)
    }
}

impl From<SolidCanvas> for RenderOutput {
    fn from(canvas: SolidCanvas) -> Self {
        Self::Solid(canvas)
    }
}

impl From<CompositeCanvas> for RenderOutput {
    fn from(canvas: CompositeCanvas) -> Self {
        Self::Composite(canvas)
    }
}

impl From<CanvasRef> for RenderOutput {
    fn from(canvas: CanvasRef) -> Self {
        Self::Shared(canvas)
    }
}

/// A renderable widget.
pub trait Render {
    /// The handle the cache files this widget's canvases under.
    fn widget_id(&self) -> WidgetId;

    /// Draw the widget at `size`.
    ///
    /// The canvas must be exactly as wide as `size` asks for, and for box
    /// sizes exactly as tall. Children are drawn with [`cached_render`]
    /// through `cache`.
    ///
    /// # Errors
    ///
    /// Whatever canvas construction fails with.
    fn render(
        &self,
        cache: &mut CanvasCache,
        size: RenderSize,
        focus: bool,
    ) -> Result<RenderOutput, CanvasError>;

    /// Rows the widget needs at a flow size.
    ///
    /// # Errors
    ///
    /// As [`Render::render`].
    fn rows(&self, cache: &mut CanvasCache, size: RenderSize, focus: bool) -> Result<usize, CanvasError> {
        Ok(self.render(cache, size, focus)?.as_canvas().rows())
    }

    /// Whether the widget renders the same with and without focus.
    fn ignore_focus(&self) -> bool {
        false
    }
}

/// Check that `canvas` has the dimensions `size` requested.
///
/// # Errors
///
/// [`CanvasError::SizeMismatch`] naming the widget and both sizes.
pub fn validate_size(
    widget: WidgetId,
    size: RenderSize,
    canvas: &dyn Canvas,
) -> Result<(), CanvasError> {
    let (cols, rows) = (canvas.cols(), canvas.rows());
    let cols_ok = size.cols().is_none_or(|c| c == cols);
    let rows_ok = size.rows().is_none_or(|r| r == rows);
    if cols_ok && rows_ok {
        Ok(())
    } else {
        Err(CanvasError::SizeMismatch {
            widget,
            size,
            cols,
            rows,
        })
    }
}

/// Render `widget` through `cache`.
///
/// A cached canvas for the same widget, size and focus is returned as is.
/// Otherwise the widget renders, the result is checked against `size`,
/// finalized and stored.
///
/// # Errors
///
/// Errors from [`Render::render`], and [`CanvasError::SizeMismatch`] when
/// the canvas does not match `size`.
pub fn cached_render<W>(
    cache: &mut CanvasCache,
    widget: &W,
    size: RenderSize,
    focus: bool,
) -> Result<CanvasRef, CanvasError>
where
    W: Render + 'static,
{
    let focus = focus && !widget.ignore_focus();
    let id = widget.widget_id();
    let scope = TypeId::of::<W>();
    if let Some(canvas) = cache.fetch(id, scope, size, focus) {
        return Ok(canvas);
    }

    strata_core::trace!(widget = %id, size = %size, focus, "render cache miss");
    let output = widget.render(cache, size, focus)?;
    validate_size(id, size, output.as_canvas())?;
    let canvas = output.finalize(id, size, focus)?;
    cache.store(scope, &canvas)?;
    Ok(canvas)
}

/// Rows `widget` needs at `size`, answered from a cached canvas when there
/// is one.
///
/// # Errors
///
/// Errors from [`Render::rows`].
pub fn cached_rows<W>(
    cache: &mut CanvasCache,
    widget: &W,
    size: RenderSize,
    focus: bool,
) -> Result<usize, CanvasError>
where
    W: Render + 'static,
{
    let focus = focus && !widget.ignore_focus();
    match cache.fetch(widget.widget_id(), TypeId::of::<W>(), size, focus) {
        Some(canvas) => Ok(canvas.rows()),
        None => widget.rows(cache, size, focus),
    }
}

/// Wrap a child's canvas so it can be returned from a parent's render.
#[must_use]
pub fn pass_through(child: &CanvasRef) -> RenderOutput {
    RenderOutput::Shared(Arc::clone(child))
}
