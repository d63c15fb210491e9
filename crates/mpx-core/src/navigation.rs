//! Two-way binding between the selection and a navigable address history.
//!
//! The selected tag lives only in the fragment of the current address
//! (`http://host/#<tag>`); an address without a fragment means nothing is
//! selected. Selecting pushes a new history entry. Walking the history
//! (a pop) re-derives the selection from the popped address and never pushes.

use crate::{ErrorKind, SelectionReconciler, Snapshot};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use tracing::debug;
use url::Url;

const FRAGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'`');

/// Navigation capability of the host environment.
pub trait HistoryBackend {
    fn current(&self) -> &Url;

    fn push_state(&mut self, address: Url);
}

/// The tag encoded in `address`, if any.
pub fn tag_from_address(address: &Url) -> Option<String> {
    let fragment = address.fragment()?;
    let tag = percent_decode_str(fragment).decode_utf8_lossy();
    if tag.is_empty() {
        None
    } else {
        Some(tag.into_owned())
    }
}

/// `base` with its fragment replaced by `tag` (or removed).
pub fn address_for(base: &Url, tag: Option<&str>) -> Url {
    let mut address = base.clone();
    match tag {
        Some(tag) => {
            let encoded = utf8_percent_encode(tag, FRAGMENT).to_string();
            address.set_fragment(Some(&encoded));
        }
        None => address.set_fragment(None),
    }
    address
}

/// In-process back/forward stack.
#[derive(Debug, Clone)]
pub struct SessionHistory {
    entries: Vec<Url>,
    cursor: usize,
}

impl SessionHistory {
    pub fn new(initial: Url) -> Self {
        Self {
            entries: vec![initial],
            cursor: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn can_go_back(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_go_forward(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    /// Moves one entry back and returns the popped state.
    pub fn back(&mut self) -> Option<Url> {
        if !self.can_go_back() {
            return None;
        }
        self.cursor -= 1;
        self.entries.get(self.cursor).cloned()
    }

    pub fn forward(&mut self) -> Option<Url> {
        if !self.can_go_forward() {
            return None;
        }
        self.cursor += 1;
        self.entries.get(self.cursor).cloned()
    }
}

impl HistoryBackend for SessionHistory {
    fn current(&self) -> &Url {
        &self.entries[self.cursor]
    }

    fn push_state(&mut self, address: Url) {
        self.entries.truncate(self.cursor + 1);
        self.entries.push(address);
        self.cursor = self.entries.len() - 1;
    }
}

pub struct NavigationBridge<H: HistoryBackend> {
    history: H,
}

impl<H: HistoryBackend> NavigationBridge<H> {
    pub fn new(history: H) -> Self {
        Self { history }
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut H {
        &mut self.history
    }

    pub fn address(&self) -> &Url {
        self.history.current()
    }

    pub fn desired_from_address(&self) -> Option<String> {
        tag_from_address(self.history.current())
    }

    /// Seeds the desired selection from the initial address, before any snapshot exists.
    pub fn seed(&self, reconciler: &mut SelectionReconciler) {
        if let Some(tag) = self.desired_from_address() {
            debug!("selection_seeded: tag={tag}");
            reconciler.select(Some(tag));
        }
    }

    /// Selects `tag` (or clears the selection) and records it in history.
    ///
    /// Returns whether a history entry was pushed; re-selecting what the
    /// current address already encodes pushes nothing.
    pub fn select(&mut self, tag: Option<&str>, reconciler: &mut SelectionReconciler) -> bool {
        let tag = tag.filter(|tag| !tag.is_empty());
        reconciler.select(tag.map(str::to_string));

        if self.desired_from_address().as_deref() == tag {
            return false;
        }
        let address = address_for(self.history.current(), tag);
        self.history.push_state(address);
        true
    }

    /// Applies a popped history state. Never pushes.
    ///
    /// Returns [`ErrorKind::NavigationDesync`] when the popped tag is unknown
    /// to `snapshot`; the selection is still applied and resolves like any
    /// other miss.
    pub fn on_pop(
        &mut self,
        state: &Url,
        reconciler: &mut SelectionReconciler,
        snapshot: Option<&Snapshot>,
    ) -> Option<ErrorKind> {
        let tag = tag_from_address(state);
        debug!("history_pop: tag={}", tag.as_deref().unwrap_or("-"));

        let desync = match (tag.as_deref(), snapshot) {
            (Some(tag), Some(snapshot)) if snapshot.position(tag).is_none() => {
                Some(ErrorKind::NavigationDesync)
            }
            _ => None,
        };
        reconciler.select(tag);
        desync
    }
}
