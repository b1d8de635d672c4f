//! Copy-to-clipboard buttons for code blocks.
//!
//! When clipboard writes are available, a `button.copy-code` labelled
//! `Copy` is inserted immediately before every `<pre>` present at install
//! time. Activating it writes the block's text to the clipboard and shows
//! `Copied!` (plus class `copied`) until the confirmation timer fires.
//!
//! A failed write is returned to the caller as-is; there is no retry and
//! the button keeps its resting label.
//!
//! The browser rendition is `static/copy-code.js`.

use super::dom::Dom;
use std::time::Duration;
use thiserror::Error;

pub const BUTTON_CLASS: &str = "copy-code";
pub const CONFIRMED_CLASS: &str = "copied";
pub const RESTING_LABEL: &str = "Copy";
pub const CONFIRMED_LABEL: &str = "Copied!";
/// How long the confirmation stays visible.
pub const CONFIRM_INTERVAL: Duration = Duration::from_millis(700);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClipboardError {
    #[error("clipboard write rejected: {0}")]
    Rejected(String),
}

/// Clipboard-write capability.
pub trait Clipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

/// One-shot timer; the host calls [`CopyCodeWidget::revert`] when it fires.
pub trait Timer<N> {
    fn schedule(&mut self, delay: Duration, target: N);
}

pub struct CopyCodeWidget<N, C, T> {
    clipboard: C,
    timer: T,
    /// (button, code block) pairs in document order.
    buttons: Vec<(N, N)>,
}

impl<N: Copy + Eq, C: Clipboard, T: Timer<N>> CopyCodeWidget<N, C, T> {
    /// Add a copy button before every `<pre>`.
    ///
    /// Returns `None`, leaving the document untouched, when no clipboard is
    /// available.
    pub fn install<D: Dom<Node = N>>(dom: &mut D, clipboard: Option<C>, timer: T) -> Option<Self> {
        let clipboard = clipboard?;
        let blocks = dom.query_all("pre", None);
        let mut buttons = Vec::with_capacity(blocks.len());
        for block in blocks {
            let button = dom.create_element("button");
            dom.set_attribute(button, "type", "button");
            dom.add_class(button, BUTTON_CLASS);
            dom.set_text(button, RESTING_LABEL);
            dom.insert_before(button, block);
            buttons.push((button, block));
        }
        Some(Self {
            clipboard,
            timer,
            buttons,
        })
    }

    /// The code block a button copies from.
    pub fn block_for(&self, button: N) -> Option<N> {
        self.buttons
            .iter()
            .find(|(b, _)| *b == button)
            .map(|&(_, block)| block)
    }

    /// Handle a click on `button`.
    ///
    /// Returns `Ok(false)` if `button` is not one of ours.
    pub fn activate<D: Dom<Node = N>>(&mut self, dom: &mut D, button: N) -> Result<bool, ClipboardError> {
        let Some(block) = self.block_for(button) else {
            return Ok(false);
        };
        let text = dom.text_content(block);
        self.clipboard.write_text(&text)?;

        dom.set_text(button, CONFIRMED_LABEL);
        dom.add_class(button, CONFIRMED_CLASS);
        self.timer.schedule(CONFIRM_INTERVAL, button);
        Ok(true)
    }

    /// Restore the resting label after the confirmation interval.
    pub fn revert<D: Dom<Node = N>>(&self, dom: &mut D, button: N) {
        if self.block_for(button).is_some() {
            dom.set_text(button, RESTING_LABEL);
            dom.remove_class(button, CONFIRMED_CLASS);
        }
    }

    pub fn buttons(&self) -> impl Iterator<Item = N> + '_ {
        self.buttons.iter().map(|&(button, _)| button)
    }

    pub fn clipboard(&self) -> &C {
        &self.clipboard
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::dom::{MemoryDom, NodeId};

    #[derive(Default)]
    struct RecordingClipboard {
        written: Vec<String>,
        reject: bool,
    }

    impl Clipboard for RecordingClipboard {
        fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
            if self.reject {
                return Err(ClipboardError::Rejected("permission denied".into()));
            }
            self.written.push(text.to_string());
            Ok(())
        }
    }

    #[derive(Default)]
    struct ManualTimer {
        scheduled: Vec<(Duration, NodeId)>,
    }

    impl Timer<NodeId> for ManualTimer {
        fn schedule(&mut self, delay: Duration, target: NodeId) {
            self.scheduled.push((delay, target));
        }
    }

    type Widget = CopyCodeWidget<NodeId, RecordingClipboard, ManualTimer>;

    /// Two code blocks, the first with a `<code>` child.
    fn page() -> (MemoryDom, NodeId, NodeId) {
        let mut dom = MemoryDom::new();
        dom.append(dom.root(), "p");
        let first = dom.append(dom.root(), "pre");
        let code = dom.append(first, "code");
        dom.set_text(code, "console.log(1)");
        let second = dom.append(dom.root(), "pre");
        dom.set_text(second, "ls -la");
        (dom, first, second)
    }

    fn install(dom: &mut MemoryDom, clipboard: RecordingClipboard) -> Widget {
        CopyCodeWidget::install(dom, Some(clipboard), ManualTimer::default()).unwrap()
    }

    #[test]
    fn buttons_inserted_before_each_block() {
        let (mut dom, first, second) = page();
        let widget = install(&mut dom, RecordingClipboard::default());

        let buttons: Vec<NodeId> = widget.buttons().collect();
        assert_eq!(buttons.len(), 2);
        let root = dom.child_nodes(dom.root()).to_vec();
        let before = |node: NodeId| root[root.iter().position(|&n| n == node).unwrap() - 1];
        assert_eq!(before(first), buttons[0]);
        assert_eq!(before(second), buttons[1]);

        for button in buttons {
            assert_eq!(dom.tag(button), "button");
            assert!(dom.has_class(button, BUTTON_CLASS));
            assert_eq!(dom.text_content(button), RESTING_LABEL);
        }
    }

    #[test]
    fn no_clipboard_means_no_buttons() {
        let (mut dom, _, _) = page();
        let widget: Option<Widget> = CopyCodeWidget::install(&mut dom, None, ManualTimer::default());
        assert!(widget.is_none());
        assert!(dom.query_all("button", None).is_empty());
    }

    #[test]
    fn activation_copies_block_text() {
        let (mut dom, first, _) = page();
        let mut widget = install(&mut dom, RecordingClipboard::default());
        let button = widget.buttons().next().unwrap();
        assert_eq!(widget.block_for(button), Some(first));

        assert!(widget.activate(&mut dom, button).unwrap());
        assert_eq!(widget.clipboard().written, vec!["console.log(1)".to_string()]);
    }

    #[test]
    fn activation_shows_confirmation_then_reverts() {
        let (mut dom, _, _) = page();
        let mut widget = install(&mut dom, RecordingClipboard::default());
        let button = widget.buttons().next().unwrap();

        widget.activate(&mut dom, button).unwrap();
        assert_eq!(dom.text_content(button), CONFIRMED_LABEL);
        assert!(dom.has_class(button, CONFIRMED_CLASS));
        assert_eq!(widget.timer().scheduled, vec![(Duration::from_millis(700), button)]);

        widget.revert(&mut dom, button);
        assert_eq!(dom.text_content(button), RESTING_LABEL);
        assert!(!dom.has_class(button, CONFIRMED_CLASS));
    }

    #[test]
    fn rejected_write_surfaces_error_without_retry() {
        let (mut dom, _, _) = page();
        let mut widget = install(
            &mut dom,
            RecordingClipboard {
                reject: true,
                ..RecordingClipboard::default()
            },
        );
        let button = widget.buttons().next().unwrap();

        let err = widget.activate(&mut dom, button).unwrap_err();
        assert_eq!(err, ClipboardError::Rejected("permission denied".into()));
        assert_eq!(dom.text_content(button), RESTING_LABEL);
        assert!(widget.timer().scheduled.is_empty());
    }

    #[test]
    fn unknown_button_ignored() {
        let (mut dom, first, _) = page();
        let mut widget = install(&mut dom, RecordingClipboard::default());
        assert!(!widget.activate(&mut dom, first).unwrap());
        assert!(widget.clipboard().written.is_empty());
    }

    #[test]
    fn blocks_added_after_install_get_no_button() {
        let (mut dom, _, _) = page();
        let widget = install(&mut dom, RecordingClipboard::default());
        dom.append(dom.root(), "pre");
        assert_eq!(widget.buttons().count(), 2);
    }
}
