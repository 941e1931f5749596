#![forbid(unsafe_code)]

//! Canvases for Strata: the rendered output of widgets.
//!
//! - [`canvas`] - the [`Canvas`] trait and leaf canvases
//! - [`shard`] - the shard compositor behind composite canvases
//! - [`compose`] - [`CompositeCanvas`] and the stack/join/overlay combinators
//! - [`apply`] - rendering a text layout into a [`TextCanvas`]
//! - [`cache`] - the LRU [`CanvasCache`]
//! - [`render`] - the widget render contract and cached entry points
//!
//! Screen backends only need [`Canvas::content`]: rows of
//! `(attribute, charset, bytes)` runs.
//!
//! # Example
//! ```
//! use std::sync::Arc;
//! use strata_canvas::{Canvas, CanvasRef, TextCanvas, canvas_overlay};
//!
//! let bg: CanvasRef = Arc::new(TextCanvas::new(vec![b"qxqxqxqx".to_vec()]).unwrap());
//! let fg: CanvasRef = Arc::new(TextCanvas::new(vec![b"HI".to_vec()]).unwrap());
//! let overlaid = canvas_overlay(fg, bg, 3, 0).unwrap();
//! assert_eq!(overlaid.text(), vec![b"qxqHIxqx".to_vec()]);
//! ```

pub mod apply;
pub mod cache;
pub mod canvas;
pub mod compose;
pub mod render;
pub mod shard;

pub use apply::apply_text_layout;
pub use cache::{CacheKey, CacheStats, CanvasCache, DEFAULT_CACHE_CAPACITY};
pub use canvas::{
    Attr, AttrMap, BlankCanvas, Canvas, CanvasError, CanvasRef, CanvasRow, ContentWindow, Run,
    SolidCanvas, TextCanvas, WidgetInfo, blank_canvas,
};
pub use compose::{CompositeCanvas, canvas_combine, canvas_join, canvas_overlay};
pub use render::{Render, RenderOutput, cached_render, cached_rows, validate_size};
pub use shard::{CanvasView, Shard};
