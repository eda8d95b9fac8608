//! Change bridge between a live query and its subscribers.
//!
//! The bridge owns the subscriptions of one live query. Before a diff script
//! is handed out it can be replayed against the shape of the projection it
//! claims to describe; a script that does not turn the pre-change shape into
//! the post-change shape is rejected with `InconsistentDiff` and never
//! delivered, since a presentation layer fed a wrong script desynchronizes.

use crate::change_event::{ChangeEvent, IndexPath};
use crate::projection::Shape;
use crate::subscription::{Subscription, SubscriptionId, SubscriptionManager};
use hashbrown::HashSet;
use quiver_core::{Error, RecordId, Result};
use tracing::{error, trace};

/// Verifies and delivers diff scripts for one live query.
pub struct ChangeBridge {
    subscriptions: SubscriptionManager,
    verify: bool,
}

impl ChangeBridge {
    /// Creates a bridge; `verify` enables script checking.
    pub fn new(verify: bool) -> Self {
        Self {
            subscriptions: SubscriptionManager::new(),
            verify,
        }
    }

    /// Returns true when scripts are checked before delivery.
    #[inline]
    pub fn verifies(&self) -> bool {
        self.verify
    }

    pub fn subscribe(&mut self, subscription: Subscription) -> SubscriptionId {
        self.subscriptions.subscribe(subscription)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscriptions.unsubscribe(id)
    }

    /// Removes every subscription.
    pub fn clear(&mut self) {
        self.subscriptions.clear();
    }

    #[inline]
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Checks a script if verification is enabled.
    pub fn check(&self, script: &[ChangeEvent], before: &Shape, after: &Shape) -> Result<()> {
        if !self.verify {
            return Ok(());
        }
        verify(script, before, after).map_err(|err| {
            error!(events = script.len(), error = %err, "rejected diff script");
            err
        })
    }

    /// Delivers one cycle to every subscriber. Empty cycles are dropped.
    pub fn deliver(&self, events: &[ChangeEvent]) {
        if events.is_empty() {
            return;
        }
        trace!(
            events = events.len(),
            subscribers = self.subscriptions.len(),
            "delivering change cycle"
        );
        self.subscriptions.deliver_all(events);
    }
}

impl Default for ChangeBridge {
    fn default() -> Self {
        Self::new(true)
    }
}

fn inconsistent(event: &ChangeEvent, reason: &str) -> Error {
    Error::inconsistent_diff(format!("{}: {}", event, reason))
}

fn id_at(shape: &Shape, path: IndexPath) -> Option<RecordId> {
    shape.get(path.section)?.get(path.row).copied()
}

/// Replays `script` on `before` and checks that the result equals `after`.
///
/// Deletes, move sources and updates address `before`; inserts and move
/// destinations address `after`. Sections may only disappear through a
/// `SectionDelete` once every row in them was removed, and new sections
/// start empty.
pub fn verify(script: &[ChangeEvent], before: &Shape, after: &Shape) -> Result<()> {
    let mut removed: HashSet<IndexPath> = HashSet::new();
    let mut deleted_sections: HashSet<usize> = HashSet::new();
    let mut inserted_sections: Vec<usize> = Vec::new();
    let mut placements: Vec<(IndexPath, Option<RecordId>, &ChangeEvent)> = Vec::new();

    for event in script {
        match event {
            ChangeEvent::RowDelete(from) | ChangeEvent::RowMove(from, _) => {
                let id = id_at(before, *from)
                    .ok_or_else(|| inconsistent(event, "source out of range"))?;
                if !removed.insert(*from) {
                    return Err(inconsistent(event, "row removed twice"));
                }
                if let ChangeEvent::RowMove(_, to) = event {
                    placements.push((*to, Some(id), event));
                }
            }
            ChangeEvent::RowInsert(to) => placements.push((*to, None, event)),
            ChangeEvent::SectionInsert(section) => inserted_sections.push(*section),
            ChangeEvent::SectionDelete(section) => {
                if *section >= before.len() {
                    return Err(inconsistent(event, "section out of range"));
                }
                if !deleted_sections.insert(*section) {
                    return Err(inconsistent(event, "section deleted twice"));
                }
            }
            ChangeEvent::RowUpdate(_) => {}
        }
    }

    for event in script {
        match event {
            ChangeEvent::RowUpdate(path) => {
                if id_at(before, *path).is_none() {
                    return Err(inconsistent(event, "row out of range"));
                }
                if removed.contains(path) {
                    return Err(inconsistent(event, "row is also removed"));
                }
            }
            ChangeEvent::SectionDelete(section) => {
                let rows = before[*section].len();
                if (0..rows).any(|row| !removed.contains(&IndexPath::new(*section, row))) {
                    return Err(inconsistent(event, "section still has rows"));
                }
            }
            _ => {}
        }
    }

    let mut state: Shape = before
        .iter()
        .enumerate()
        .filter(|(section, _)| !deleted_sections.contains(section))
        .map(|(section, rows)| {
            rows.iter()
                .enumerate()
                .filter(|(row, _)| !removed.contains(&IndexPath::new(section, *row)))
                .map(|(_, id)| *id)
                .collect()
        })
        .collect();

    inserted_sections.sort_unstable();
    for pair in inserted_sections.windows(2) {
        if pair[0] == pair[1] {
            return Err(inconsistent(
                &ChangeEvent::SectionInsert(pair[0]),
                "section inserted twice",
            ));
        }
    }
    for section in &inserted_sections {
        if *section > state.len() {
            return Err(inconsistent(
                &ChangeEvent::SectionInsert(*section),
                "section out of range",
            ));
        }
        state.insert(*section, Vec::new());
    }

    placements.sort_by_key(|(path, _, _)| *path);
    for pair in placements.windows(2) {
        if pair[0].0 == pair[1].0 {
            return Err(inconsistent(pair[1].2, "destination used twice"));
        }
    }
    for (path, moved_id, event) in placements {
        let expected = id_at(after, path)
            .ok_or_else(|| inconsistent(event, "destination out of range"))?;
        if let Some(id) = moved_id {
            if id != expected {
                return Err(inconsistent(event, "moved row lands on another record"));
            }
        }
        let rows = state
            .get_mut(path.section)
            .ok_or_else(|| inconsistent(event, "destination section missing"))?;
        if path.row > rows.len() {
            return Err(inconsistent(event, "destination row out of range"));
        }
        rows.insert(path.row, expected);
    }

    if &state != after {
        return Err(Error::inconsistent_diff(format!(
            "script of {} events does not reproduce the new projection",
            script.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn p(section: usize, row: usize) -> IndexPath {
        IndexPath::new(section, row)
    }

    fn rejected(result: Result<()>) -> bool {
        matches!(result, Err(Error::Bridge(_)))
    }

    #[test]
    fn test_verify_accepts_empty_script_for_same_shape() {
        let shape = vec![vec![1, 2], vec![3]];
        assert!(verify(&[], &shape, &shape).is_ok());
    }

    #[test]
    fn test_verify_delete_with_section() {
        let before = vec![vec![1], vec![2]];
        let after = vec![vec![1]];
        let script = [ChangeEvent::RowDelete(p(1, 0)), ChangeEvent::SectionDelete(1)];
        assert!(verify(&script, &before, &after).is_ok());
        // Forgetting the section delete leaves an empty section behind.
        assert!(rejected(verify(&script[..1], &before, &after)));
    }

    #[test]
    fn test_verify_insert_into_new_section() {
        let before = vec![vec![1]];
        let after = vec![vec![2], vec![1]];
        let script = [ChangeEvent::SectionInsert(0), ChangeEvent::RowInsert(p(0, 0))];
        assert!(verify(&script, &before, &after).is_ok());
    }

    #[test]
    fn test_verify_move_between_sections() {
        let before = vec![vec![1, 2], vec![3]];
        let after = vec![vec![2], vec![1, 3]];
        let script = [ChangeEvent::RowMove(p(0, 0), p(1, 0))];
        assert!(verify(&script, &before, &after).is_ok());
        let wrong = [ChangeEvent::RowMove(p(0, 0), p(1, 1))];
        assert!(rejected(verify(&wrong, &before, &after)));
    }

    #[test]
    fn test_verify_rejects_out_of_range() {
        let before = vec![vec![1]];
        let after = vec![Vec::new()];
        assert!(rejected(verify(
            &[ChangeEvent::RowDelete(p(3, 0))],
            &before,
            &after
        )));
        assert!(rejected(verify(
            &[ChangeEvent::RowUpdate(p(0, 4))],
            &before,
            &before
        )));
        assert!(rejected(verify(
            &[ChangeEvent::SectionDelete(2)],
            &before,
            &before
        )));
    }

    #[test]
    fn test_verify_rejects_section_delete_with_rows_left() {
        let before = vec![vec![1, 2]];
        let after: Shape = Vec::new();
        let script = [ChangeEvent::RowDelete(p(0, 0)), ChangeEvent::SectionDelete(0)];
        assert!(rejected(verify(&script, &before, &after)));
    }

    #[test]
    fn test_verify_rejects_double_delete() {
        let before = vec![vec![1, 2]];
        let after = vec![vec![2]];
        let script = [ChangeEvent::RowDelete(p(0, 0)), ChangeEvent::RowDelete(p(0, 0))];
        assert!(rejected(verify(&script, &before, &after)));
    }

    #[test]
    fn test_verify_rejects_missing_events() {
        let before = vec![vec![1, 2]];
        let after = vec![vec![1, 2, 3]];
        assert!(rejected(verify(&[], &before, &after)));
    }

    #[test]
    fn test_check_respects_flag() {
        let before = vec![vec![1]];
        let after: Shape = Vec::new();
        let bad = [ChangeEvent::RowDelete(p(0, 0))];
        assert!(rejected(ChangeBridge::new(true).check(&bad, &before, &after)));
        assert!(ChangeBridge::new(false).check(&bad, &before, &after).is_ok());
    }

    #[test]
    fn test_deliver_skips_empty_cycles() {
        let mut bridge = ChangeBridge::default();
        let log = Rc::new(RefCell::new(Vec::new()));
        let (will, did) = (log.clone(), log.clone());
        bridge.subscribe(
            Subscription::new()
                .on_will_change(move || will.borrow_mut().push("will".to_string()))
                .on_did_change(move || did.borrow_mut().push("did".to_string())),
        );
        bridge.deliver(&[]);
        assert!(log.borrow().is_empty());
        bridge.deliver(&[ChangeEvent::RowUpdate(p(0, 0))]);
        assert_eq!(*log.borrow(), vec!["will", "did"]);
    }
}
