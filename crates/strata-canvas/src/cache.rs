#![forbid(unsafe_code)]

//! LRU cache of finalized canvases.
//!
//! Widgets render the same content at the same size over and over; the cache
//! keeps the last canvas per `(widget, scope, size, focus)` so a render can be
//! skipped entirely. The cache cannot see a widget change, so widgets call
//! [`CanvasCache::invalidate`] whenever their content does. Invalidating a
//! widget also drops every cached canvas that was composed from it.
//!
//! # Example
//! ```
//! use std::any::TypeId;
//! use std::sync::Arc;
//! use strata_canvas::cache::CanvasCache;
//! use strata_canvas::canvas::TextCanvas;
//! use strata_core::{RenderSize, WidgetId};
//!
//! struct Label;
//! let widget = WidgetId::next();
//! let size = RenderSize::Box(5, 1);
//! let canvas = TextCanvas::new(vec![b"hello".to_vec()])
//!     .unwrap()
//!     .finalize(widget, size, false)
//!     .unwrap();
//!
//! let mut cache = CanvasCache::new(16);
//! cache.store(TypeId::of::<Label>(), &canvas).unwrap();
//! let hit = cache.fetch(widget, TypeId::of::<Label>(), size, false).unwrap();
//! assert!(Arc::ptr_eq(&hit, &canvas));
//!
//! cache.invalidate(widget);
//! assert!(cache.fetch(widget, TypeId::of::<Label>(), size, false).is_none());
//! ```

use std::any::TypeId;
use std::num::NonZeroUsize;

use lru::LruCache;
use rustc_hash::{FxHashMap, FxHashSet};
use strata_core::{RenderSize, WidgetId};

use crate::canvas::{Canvas, CanvasError, CanvasRef};

/// Default cache capacity.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Identity of one cached render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub widget: WidgetId,
    /// The type whose render produced the canvas; a widget rendered through
    /// a wrapper type caches separately from its own render.
    pub scope: TypeId,
    pub size: RenderSize,
    pub focus: bool,
}

/// Statistics about cache performance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    /// Number of fetch calls.
    pub fetches: u64,
    /// Number of fetches that returned a canvas.
    pub hits: u64,
    /// Entries dropped to make room.
    pub evictions: u64,
    /// Current number of entries.
    pub size: usize,
    /// Maximum capacity.
    pub capacity: usize,
}

impl CacheStats {
    /// Calculate hit rate (0.0 to 1.0).
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        if self.fetches == 0 {
            0.0
        } else {
            self.hits as f64 / self.fetches as f64
        }
    }
}

/// The widgets a canvas was composed from.
///
/// An explicit dependency list wins; otherwise the nearest finalized
/// descendants along every child path are collected.
fn canvas_depends(canvas: &dyn Canvas) -> Vec<WidgetId> {
    fn walk(canvas: &dyn Canvas, out: &mut Vec<WidgetId>) {
        for child in canvas.children() {
            match child.widget_info() {
                Some(info) => out.push(info.widget),
                None => walk(child.as_ref(), out),
            }
        }
    }

    if let Some(depends) = canvas.depends_on() {
        return depends.to_vec();
    }
    let mut out = Vec::new();
    walk(canvas, &mut out);
    out
}

/// Bounded cache of finalized canvases with dependency tracking.
///
/// Not thread-safe; a host rendering from several threads wraps it in a
/// mutex or keeps one cache per thread.
#[derive(Debug)]
pub struct CanvasCache {
    entries: LruCache<CacheKey, CanvasRef>,
    /// Cached keys per widget.
    widgets: FxHashMap<WidgetId, FxHashSet<CacheKey>>,
    /// Widgets whose cached canvases were composed from the key widget.
    dependents: FxHashMap<WidgetId, Vec<WidgetId>>,
    /// The reverse of `dependents`: what each cached widget was composed from.
    depends: FxHashMap<WidgetId, Vec<WidgetId>>,
    fetches: u64,
    hits: u64,
    evictions: u64,
}

impl Default for CanvasCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl CanvasCache {
    /// Create a new cache holding at most `capacity` canvases.
    ///
    /// If capacity is zero, defaults to 1.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            widgets: FxHashMap::default(),
            dependents: FxHashMap::default(),
            depends: FxHashMap::default(),
            fetches: 0,
            hits: 0,
            evictions: 0,
        }
    }

    /// Store a finalized canvas under its render identity.
    ///
    /// Returns `false` without storing when the canvas depends on a widget
    /// that has nothing cached: such a canvas could never be invalidated
    /// through that widget. The same holds when making room evicts the last
    /// canvas of one of its dependencies.
    ///
    /// # Errors
    ///
    /// [`CanvasError::NotFinalized`] for a canvas without render info.
    pub fn store(&mut self, scope: TypeId, canvas: &CanvasRef) -> Result<bool, CanvasError> {
        let info = *canvas.widget_info().ok_or(CanvasError::NotFinalized)?;
        let depends = canvas_depends(canvas.as_ref());
        if depends.iter().any(|w| !self.widgets.contains_key(w)) {
            strata_core::trace!(widget = %info.widget, "store skipped: dependency not cached");
            return Ok(false);
        }
        for dep in depends {
            let parents = self.dependents.entry(dep).or_default();
            if !parents.contains(&info.widget) {
                parents.push(info.widget);
            }
            let children = self.depends.entry(info.widget).or_default();
            if !children.contains(&dep) {
                children.push(dep);
            }
        }

        let key = CacheKey {
            widget: info.widget,
            scope,
            size: info.size,
            focus: info.focus,
        };
        self.widgets.entry(info.widget).or_default().insert(key);
        if let Some((old, _)) = self.entries.push(key, canvas.clone())
            && old != key
        {
            self.evictions += 1;
            strata_core::debug!(widget = %old.widget, size = %old.size, "canvas evicted");
            self.forget_key(&old);
        }
        Ok(self.entries.contains(&key))
    }

    /// The canvas stored for exactly this render call, if any.
    pub fn fetch(
        &mut self,
        widget: WidgetId,
        scope: TypeId,
        size: RenderSize,
        focus: bool,
    ) -> Option<CanvasRef> {
        self.fetches += 1;
        let key = CacheKey {
            widget,
            scope,
            size,
            focus,
        };
        let canvas = self.entries.get(&key).cloned();
        if canvas.is_some() {
            self.hits += 1;
        }
        canvas
    }

    /// Drop every canvas cached for `widget` and, transitively, for every
    /// widget whose canvas was composed from it.
    ///
    /// Returns the number of canvases dropped.
    pub fn invalidate(&mut self, widget: WidgetId) -> usize {
        let mut pending = vec![widget];
        let mut seen = FxHashSet::default();
        let mut dropped = 0usize;
        while let Some(widget) = pending.pop() {
            if !seen.insert(widget) {
                continue;
            }
            if let Some(keys) = self.widgets.remove(&widget) {
                for key in keys {
                    if self.entries.pop(&key).is_some() {
                        dropped += 1;
                    }
                }
            }
            self.unlink(widget);
            if let Some(parents) = self.dependents.remove(&widget) {
                pending.extend(parents);
            }
        }
        strata_core::debug!(widget = %widget, widgets = seen.len(), dropped, "invalidated");
        dropped
    }

    /// Whether anything is cached for `widget`.
    #[must_use]
    pub fn contains(&self, widget: WidgetId) -> bool {
        self.widgets.contains_key(&widget)
    }

    /// Empty the cache. Statistics are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.widgets.clear();
        self.dependents.clear();
        self.depends.clear();
    }

    /// Reset statistics.
    pub fn reset_stats(&mut self) {
        self.fetches = 0;
        self.hits = 0;
        self.evictions = 0;
    }

    /// Get cache statistics.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            fetches: self.fetches,
            hits: self.hits,
            evictions: self.evictions,
            size: self.entries.len(),
            capacity: self.entries.cap().get(),
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove an evicted key from the per-widget index.
    ///
    /// When the widget has nothing cached any more, canvases composed from
    /// it go too: they could no longer be invalidated through it.
    fn forget_key(&mut self, key: &CacheKey) {
        let Some(keys) = self.widgets.get_mut(&key.widget) else {
            return;
        };
        keys.remove(key);
        if !keys.is_empty() {
            return;
        }
        self.widgets.remove(&key.widget);
        self.unlink(key.widget);
        for parent in self.dependents.remove(&key.widget).unwrap_or_default() {
            self.evictions += self.invalidate(parent) as u64;
        }
    }

    /// Drop `widget` from the dependent lists of everything it was composed
    /// from.
    fn unlink(&mut self, widget: WidgetId) {
        for child in self.depends.remove(&widget).unwrap_or_default() {
            if let Some(parents) = self.dependents.get_mut(&child) {
                parents.retain(|&p| p != widget);
                if parents.is_empty() {
                    self.dependents.remove(&child);
                }
            }
        }
    }
}
