#![forbid(unsafe_code)]

//! Event macros for the render core.
//!
//! The canvas crate reports cache traffic (misses, skipped stores,
//! evictions, invalidation cascades) and overlay geometry through
//! `strata_core::trace!` and `strata_core::debug!`. With the `tracing`
//! feature those are `tracing`'s own macros and the events reach whatever
//! subscriber the host installed. Without it both expand to nothing, field
//! expressions included, so disabled logging costs nothing on the render
//! path.
//!
//! ```
//! let widgets = 3;
//! strata_core::debug!(widgets, "invalidated");
//! strata_core::trace!(rows = 2, maxcol = 10, "text layout applied");
//! ```

#[cfg(feature = "tracing")]
pub use tracing::{debug, trace};

#[cfg(not(feature = "tracing"))]
mod disabled {
    /// Discards a debug event.
    #[macro_export]
    macro_rules! debug {
        ($($event:tt)*) => {};
    }

    /// Discards a trace event.
    #[macro_export]
    macro_rules! trace {
        ($($event:tt)*) => {};
    }
}
