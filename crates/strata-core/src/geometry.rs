#![forbid(unsafe_code)]

//! Render sizes and widget handles.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// The size a widget is asked to render at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderSize {
    /// The widget chooses both dimensions.
    Fixed,
    /// The caller fixes the column count; the widget chooses its rows.
    Flow(usize),
    /// The caller fixes both dimensions: `(cols, rows)`.
    Box(usize, usize),
}

impl RenderSize {
    /// Requested column count, if the caller fixed one.
    #[inline]
    #[must_use]
    pub const fn cols(self) -> Option<usize> {
        match self {
            Self::Fixed => None,
            Self::Flow(cols) | Self::Box(cols, _) => Some(cols),
        }
    }

    /// Requested row count, if the caller fixed one.
    #[inline]
    #[must_use]
    pub const fn rows(self) -> Option<usize> {
        match self {
            Self::Box(_, rows) => Some(rows),
            Self::Fixed | Self::Flow(_) => None,
        }
    }
}

impl fmt::Display for RenderSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed => write!(f, "()"),
            Self::Flow(cols) => write!(f, "({cols},)"),
            Self::Box(cols, rows) => write!(f, "({cols}, {rows})"),
        }
    }
}

/// Stable handle identifying a widget for render caching.
///
/// Handles come only from [`WidgetId::next`] and are never reused, so a
/// cache entry left behind by a dropped widget can not be fetched by a new
/// one. The cache never dereferences them; a widget must invalidate its own
/// entries when its content changes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct WidgetId(pub u64);

static NEXT_WIDGET_ID: AtomicU64 = AtomicU64::new(1);

impl WidgetId {
    /// Issue a fresh process-unique handle.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_WIDGET_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "widget#{}", self.0)
    }
}
