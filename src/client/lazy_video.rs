//! Deferred video loading.
//!
//! Videos marked `class="lazy"` ship with `data-src` on their `<source>`
//! children instead of `src`. Once a video first intersects the viewport its
//! sources are swapped in, the element is reloaded, the `lazy` class removed
//! and the element unregistered. Each video loads at most once.
//!
//! Without an intersection watcher nothing is installed and videos stay
//! deferred; that is a supported outcome, not an error.
//!
//! The browser rendition is `static/lazy-video.js`.

use super::dom::Dom;

pub const LAZY_CLASS: &str = "lazy";
pub const DEFERRED_ATTRIBUTE: &str = "data-src";

/// Viewport-intersection capability.
pub trait IntersectionWatcher<N> {
    fn observe(&mut self, node: N);
    fn unobserve(&mut self, node: N);
}

/// One intersection notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntersectionEntry<N> {
    pub target: N,
    pub is_intersecting: bool,
}

pub struct LazyVideoLoader<N, W> {
    watcher: W,
    pending: Vec<N>,
}

impl<N: Copy + Eq, W: IntersectionWatcher<N>> LazyVideoLoader<N, W> {
    /// Register every deferred video with `watcher`.
    ///
    /// Returns `None` when no watcher is available.
    pub fn install<D: Dom<Node = N>>(dom: &D, watcher: Option<W>) -> Option<Self> {
        let mut watcher = watcher?;
        let pending = dom.query_all("video", Some(LAZY_CLASS));
        for &video in &pending {
            watcher.observe(video);
        }
        Some(Self { watcher, pending })
    }

    /// Load every pending video that is now intersecting.
    ///
    /// Returns how many videos were loaded by this call.
    pub fn handle<D: Dom<Node = N>>(&mut self, dom: &mut D, entries: &[IntersectionEntry<N>]) -> usize {
        let mut loaded = 0;
        for entry in entries.iter().filter(|e| e.is_intersecting) {
            let video = entry.target;
            if !self.pending.contains(&video) {
                continue;
            }
            for source in dom.children(video, "source") {
                if let Some(src) = dom.attribute(source, DEFERRED_ATTRIBUTE) {
                    dom.set_attribute(source, "src", &src);
                }
            }
            dom.reload(video);
            dom.remove_class(video, LAZY_CLASS);
            self.watcher.unobserve(video);
            self.pending.retain(|&v| v != video);
            loaded += 1;
        }
        loaded
    }

    /// Videos still waiting for their first intersection.
    pub fn pending(&self) -> &[N] {
        &self.pending
    }

    pub fn watcher(&self) -> &W {
        &self.watcher
    }
}
