#![forbid(unsafe_code)]

//! Text measurement and layout for Strata.
//!
//! Text is handled as raw bytes in the active encoding (see
//! [`strata_core::encoding`]). This crate provides:
//! - [`width`] - the width/position oracle over the three byte regimes
//! - [`rle`] - run-length encoded attribute lists
//! - [`segment`] - layout segments and per-line transforms
//! - [`layout`] - [`StandardTextLayout`], wrapping, alignment and ellipsis
//! - [`position`] - offset/coordinate mapping over a layout
//! - [`target`] - conversion of Unicode text to canvas bytes and charsets
//!
//! # Example
//! ```
//! use strata_core::EncodingConfig;
//! use strata_text::{Align, StandardTextLayout, TextLayout, WrapMode};
//!
//! let layout = StandardTextLayout::with_encoding(EncodingConfig::UTF8);
//! let lines = layout.layout(b"hello world\nout there. blah", 10, Align::Left, WrapMode::Space);
//! assert_eq!(lines.len(), 4);
//! assert_eq!(layout.pack(10, &lines), 10);
//! assert_eq!(layout.pack(20, &lines), 10);
//! ```

pub mod layout;
pub mod position;
pub mod rle;
pub mod segment;
pub mod target;
pub mod width;

pub use layout::{Align, LayoutError, StandardTextLayout, TextLayout, WrapMode, align_layout};
pub use position::{PrefCol, calc_coords, calc_line_pos, calc_pos};
pub use rle::Rle;
pub use segment::{Layout, LayoutSegment, LineLayout, line_width, shift_line, trim_line};
pub use target::{Charset, apply_target_encoding};
pub use width::{TextMeasure, TrimmedRange};
