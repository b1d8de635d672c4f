//! Client-side behaviours shipped with every page.
//!
//! The browser runs the scripts in `static/`. This module holds the same
//! behaviours as state machines over capability traits, so the rules
//! (which elements, which attributes, fire-once, no retry) are spelled out
//! and tested in Rust:
//!
//! | Behaviour | Capabilities | Script |
//! |---|---|---|
//! | [`LazyVideoLoader`] | [`Dom`], [`IntersectionWatcher`] | `static/lazy-video.js` |
//! | [`CopyCodeWidget`] | [`Dom`], [`Clipboard`], [`Timer`] | `static/copy-code.js` |

pub mod copy_code;
pub mod dom;
pub mod lazy_video;

pub use copy_code::{Clipboard, ClipboardError, CopyCodeWidget, Timer};
pub use dom::{Dom, MemoryDom, NodeId};
pub use lazy_video::{IntersectionEntry, IntersectionWatcher, LazyVideoLoader};
