use crate::{ServerEntry, Snapshot};
use tracing::debug;

/// Emitted when the resolved selection differs from the last exposed one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionChange {
    pub previous: Option<ServerEntry>,
    pub current: Option<ServerEntry>,
}

impl SelectionChange {
    /// True when the change moved to a different server (or opened/closed one),
    /// as opposed to fresh values for the same server.
    pub fn switched_server(&self) -> bool {
        self.previous.as_ref().map(|entry| entry.tag.as_str())
            != self.current.as_ref().map(|entry| entry.tag.as_str())
    }
}

/// Tracks the selected server by tag across wholesale snapshot replacement.
///
/// The desired tag is kept even when no snapshot contains it, so a selection
/// made before the first snapshot (or while a server is briefly missing)
/// resolves as soon as a snapshot carries that tag again.
#[derive(Debug, Clone, Default)]
pub struct SelectionReconciler {
    desired: Option<String>,
    exposed: Option<ServerEntry>,
}

impl SelectionReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(&mut self, tag: Option<String>) {
        self.desired = tag.filter(|tag| !tag.is_empty());
    }

    pub fn desired(&self) -> Option<&str> {
        self.desired.as_deref()
    }

    /// The value last handed out through a [`SelectionChange`].
    pub fn exposed(&self) -> Option<&ServerEntry> {
        self.exposed.as_ref()
    }

    pub fn resolve<'s>(&self, snapshot: &'s Snapshot) -> Option<&'s ServerEntry> {
        let tag = self.desired.as_deref()?;
        snapshot.find(tag)
    }

    pub fn position(&self, snapshot: &Snapshot) -> Option<usize> {
        let tag = self.desired.as_deref()?;
        snapshot.position(tag)
    }

    /// Re-resolves against `snapshot`; returns a change only when the resolved
    /// entry differs by value from the previously exposed one.
    pub fn on_snapshot_changed(&mut self, snapshot: &Snapshot) -> Option<SelectionChange> {
        let resolved = self.resolve(snapshot);
        if resolved.is_none() {
            if let Some(tag) = self.desired.as_deref() {
                debug!("selection_miss: tag={tag}");
            }
        }
        if resolved == self.exposed.as_ref() {
            return None;
        }

        let current = resolved.cloned();
        let previous = std::mem::replace(&mut self.exposed, current.clone());
        Some(SelectionChange { previous, current })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[test]
    fn identical_values_notify_once() {
        let mut reconciler = SelectionReconciler::new();
        reconciler.select(Some("b".to_string()));

        let first = testing::snapshot(&["a", "b"]);
        let change = reconciler.on_snapshot_changed(&first).expect("first resolve");
        assert_eq!(change.previous, None);
        assert_eq!(change.current.as_ref().map(|e| e.tag.as_str()), Some("b"));
        assert!(change.switched_server());

        for _ in 0..5 {
            let again = testing::snapshot(&["a", "b"]);
            assert!(reconciler.on_snapshot_changed(&again).is_none());
        }
    }

    #[test]
    fn value_change_of_same_server_notifies() {
        let mut reconciler = SelectionReconciler::new();
        reconciler.select(Some("a".to_string()));
        reconciler.on_snapshot_changed(&testing::snapshot(&["a"]));

        let mut next = testing::snapshot(&["a"]);
        next.servers[0].status.conn_alive += 1;
        let change = reconciler.on_snapshot_changed(&next).expect("changed");
        assert!(!change.switched_server());
        assert_eq!(change.current.map(|e| e.status.conn_alive), Some(2));
    }

    #[test]
    fn unrelated_server_changes_are_suppressed() {
        let mut reconciler = SelectionReconciler::new();
        reconciler.select(Some("a".to_string()));
        reconciler.on_snapshot_changed(&testing::snapshot(&["a", "b"]));

        let mut next = testing::snapshot(&["a", "b"]);
        next.servers[1].traffic.rx_bytes = 99;
        next.uptime += std::time::Duration::from_secs(1);
        assert!(reconciler.on_snapshot_changed(&next).is_none());
    }

    #[test]
    fn missing_tag_resolves_later_without_reselect() {
        let mut reconciler = SelectionReconciler::new();
        reconciler.select(Some("late".to_string()));

        let without = testing::snapshot(&["a"]);
        assert!(reconciler.resolve(&without).is_none());
        assert!(reconciler.on_snapshot_changed(&without).is_none());

        let with = testing::snapshot(&["a", "late"]);
        let change = reconciler.on_snapshot_changed(&with).expect("resolved");
        assert_eq!(change.current.map(|e| e.tag), Some("late".to_string()));
        assert_eq!(reconciler.position(&with), Some(1));
    }

    #[test]
    fn vanished_server_clears_exposed_value() {
        let mut reconciler = SelectionReconciler::new();
        reconciler.select(Some("a".to_string()));
        reconciler.on_snapshot_changed(&testing::snapshot(&["a", "b"]));

        let change = reconciler
            .on_snapshot_changed(&testing::snapshot(&["b"]))
            .expect("cleared");
        assert!(change.current.is_none());
        assert!(reconciler.exposed().is_none());
        assert_eq!(reconciler.desired(), Some("a"));
    }

    #[test]
    fn empty_tag_means_no_selection() {
        let mut reconciler = SelectionReconciler::new();
        reconciler.select(Some(String::new()));
        assert_eq!(reconciler.desired(), None);
    }
}
