#![forbid(unsafe_code)]

//! Core: the byte-encoding switch, render sizes and widget handles, and
//! logging plumbing shared by the text and canvas crates.

pub mod encoding;
pub mod geometry;
pub mod logging;

pub use encoding::{
    ByteEncoding, EncodingConfig, EncodingGuard, TargetEncoding, current_encoding,
    init_from_env, push_encoding, reset_encoding, set_encoding, set_encoding_label,
    with_encoding,
};
pub use geometry::{RenderSize, WidgetId};

#[cfg(feature = "tracing")]
pub use logging::{debug, trace};
