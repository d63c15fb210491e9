use crate::{HistoryBackend, NavigationBridge, SelectionReconciler, Snapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Previous,
    Next,
}

impl Step {
    /// Letter aliases: vi-style `k`/`h` go back, `j`/`l` go forward.
    pub fn from_alias(ch: char) -> Option<Self> {
        match ch {
            'k' | 'h' => Some(Step::Previous),
            'j' | 'l' => Some(Step::Next),
            _ => None,
        }
    }
}

/// Tag of the neighbour of the current selection in snapshot order.
///
/// `None` when nothing resolves in `snapshot` or when the step would leave
/// the list; there is no wraparound.
pub fn step_target<'s>(
    step: Step,
    snapshot: &'s Snapshot,
    reconciler: &SelectionReconciler,
) -> Option<&'s str> {
    let current = reconciler.position(snapshot)?;
    let next = match step {
        Step::Previous => current.checked_sub(1)?,
        Step::Next => current + 1,
    };
    snapshot.servers.get(next).map(|entry| entry.tag.as_str())
}

/// Moves the selection one step and records the move in history.
/// Returns whether the selection moved.
pub fn navigate<H: HistoryBackend>(
    step: Step,
    snapshot: &Snapshot,
    reconciler: &mut SelectionReconciler,
    bridge: &mut NavigationBridge<H>,
) -> bool {
    let Some(target) = step_target(step, snapshot, reconciler) else {
        return false;
    };
    bridge.select(Some(target), reconciler);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use crate::SessionHistory;
    use url::Url;

    fn selected(tag: &str) -> SelectionReconciler {
        let mut reconciler = SelectionReconciler::new();
        reconciler.select(Some(tag.to_string()));
        reconciler
    }

    #[test]
    fn moves_within_bounds() {
        let snapshot = testing::snapshot(&["a", "b", "c"]);
        let reconciler = selected("b");
        assert_eq!(step_target(Step::Previous, &snapshot, &reconciler), Some("a"));
        assert_eq!(step_target(Step::Next, &snapshot, &reconciler), Some("c"));
    }

    #[test]
    fn edges_do_not_wrap() {
        let snapshot = testing::snapshot(&["a", "b", "c"]);
        assert_eq!(step_target(Step::Previous, &snapshot, &selected("a")), None);
        assert_eq!(step_target(Step::Next, &snapshot, &selected("c")), None);
    }

    #[test]
    fn ignored_without_resolvable_selection() {
        let snapshot = testing::snapshot(&["a", "b"]);
        let none = SelectionReconciler::new();
        assert_eq!(step_target(Step::Next, &snapshot, &none), None);
        assert_eq!(step_target(Step::Next, &snapshot, &selected("vanished")), None);
    }

    #[test]
    fn single_entry_list_is_stuck() {
        let snapshot = testing::snapshot(&["only"]);
        let reconciler = selected("only");
        assert_eq!(step_target(Step::Previous, &snapshot, &reconciler), None);
        assert_eq!(step_target(Step::Next, &snapshot, &reconciler), None);
    }

    #[test]
    fn aliases_map_many_to_one() {
        assert_eq!(Step::from_alias('k'), Some(Step::Previous));
        assert_eq!(Step::from_alias('h'), Some(Step::Previous));
        assert_eq!(Step::from_alias('j'), Some(Step::Next));
        assert_eq!(Step::from_alias('l'), Some(Step::Next));
        assert_eq!(Step::from_alias('x'), None);
    }

    #[test]
    fn navigate_pushes_history_for_each_move() {
        let snapshot = testing::snapshot(&["a", "b", "c"]);
        let base = Url::parse("http://127.0.0.1:8080/").expect("url");
        let mut bridge = NavigationBridge::new(SessionHistory::new(base));
        let mut reconciler = SelectionReconciler::new();
        bridge.select(Some("a"), &mut reconciler);

        assert!(navigate(Step::Next, &snapshot, &mut reconciler, &mut bridge));
        assert!(navigate(Step::Next, &snapshot, &mut reconciler, &mut bridge));
        assert!(!navigate(Step::Next, &snapshot, &mut reconciler, &mut bridge));

        assert_eq!(reconciler.desired(), Some("c"));
        assert_eq!(bridge.address().fragment(), Some("c"));
        assert_eq!(bridge.history().len(), 4);
    }
}
