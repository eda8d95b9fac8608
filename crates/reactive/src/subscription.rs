//! Subscription management for live queries.
//!
//! A `Subscription` holds three callback slots. For every delivered cycle the
//! subscriber sees `will_change`, then each change event, then `did_change`.

use crate::change_event::ChangeEvent;
use hashbrown::HashMap;

/// Unique identifier for a subscription.
pub type SubscriptionId = u64;

/// Callback bracketing a change cycle.
pub type UpdateCallback = Box<dyn Fn()>;

/// Callback for a single change event.
pub type ChangeCallback = Box<dyn Fn(&ChangeEvent)>;

/// Three callback slots; unset slots are skipped.
#[derive(Default)]
pub struct Subscription {
    will_change: Option<UpdateCallback>,
    did_change: Option<UpdateCallback>,
    on_change: Option<ChangeCallback>,
}

impl Subscription {
    /// Creates a subscription with every slot empty.
    pub fn new() -> Self {
        Self::default()
    }

    /// Called before the first event of a cycle.
    pub fn on_will_change<F>(mut self, callback: F) -> Self
    where
        F: Fn() + 'static,
    {
        self.will_change = Some(Box::new(callback));
        self
    }

    /// Called after the last event of a cycle.
    pub fn on_did_change<F>(mut self, callback: F) -> Self
    where
        F: Fn() + 'static,
    {
        self.did_change = Some(Box::new(callback));
        self
    }

    /// Called once per change event.
    pub fn on_change<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ChangeEvent) + 'static,
    {
        self.on_change = Some(Box::new(callback));
        self
    }

    /// Delivers one cycle.
    pub fn deliver(&self, events: &[ChangeEvent]) {
        if let Some(cb) = &self.will_change {
            cb();
        }
        if let Some(cb) = &self.on_change {
            for event in events {
                cb(event);
            }
        }
        if let Some(cb) = &self.did_change {
            cb();
        }
    }
}

/// Manages subscriptions for a live query.
pub struct SubscriptionManager {
    subscriptions: HashMap<SubscriptionId, Subscription>,
    next_id: SubscriptionId,
}

impl Default for SubscriptionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriptionManager {
    /// Creates a new subscription manager.
    pub fn new() -> Self {
        Self {
            subscriptions: HashMap::new(),
            next_id: 1,
        }
    }

    /// Adds a subscription and returns its ID.
    pub fn subscribe(&mut self, subscription: Subscription) -> SubscriptionId {
        let id = self.next_id;
        self.next_id += 1;
        self.subscriptions.insert(id, subscription);
        id
    }

    /// Unsubscribes by ID.
    ///
    /// Returns true if the subscription was found and removed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscriptions.remove(&id).is_some()
    }

    /// Delivers one cycle to every subscription, oldest first.
    pub fn deliver_all(&self, events: &[ChangeEvent]) {
        let mut ids: Vec<SubscriptionId> = self.subscriptions.keys().copied().collect();
        ids.sort_unstable();
        for id in ids {
            if let Some(sub) = self.subscriptions.get(&id) {
                sub.deliver(events);
            }
        }
    }

    /// Returns the number of subscriptions.
    #[inline]
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    /// Returns true if there are no subscriptions.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Clears all subscriptions.
    pub fn clear(&mut self) {
        self.subscriptions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change_event::IndexPath;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recording(log: &Rc<RefCell<Vec<String>>>, tag: &'static str) -> Subscription {
        let (a, b, c) = (log.clone(), log.clone(), log.clone());
        Subscription::new()
            .on_will_change(move || a.borrow_mut().push(format!("{}:will", tag)))
            .on_change(move |e| b.borrow_mut().push(format!("{}:{}", tag, e)))
            .on_did_change(move || c.borrow_mut().push(format!("{}:did", tag)))
    }

    #[test]
    fn test_subscription_brackets_events() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sub = recording(&log, "s");
        sub.deliver(&[ChangeEvent::RowDelete(IndexPath::new(0, 0))]);
        assert_eq!(
            *log.borrow(),
            vec!["s:will", "s:row delete (0, 0)", "s:did"]
        );
    }

    #[test]
    fn test_empty_slots_are_skipped() {
        let count = Rc::new(RefCell::new(0));
        let c = count.clone();
        let sub = Subscription::new().on_change(move |_| *c.borrow_mut() += 1);
        sub.deliver(&[ChangeEvent::SectionInsert(0), ChangeEvent::SectionInsert(1)]);
        assert_eq!(*count.borrow(), 2);
    }

    #[test]
    fn test_manager_subscribe_unsubscribe() {
        let mut manager = SubscriptionManager::new();
        let id1 = manager.subscribe(Subscription::new());
        let id2 = manager.subscribe(Subscription::new());
        assert_eq!((id1, id2), (1, 2));
        assert_eq!(manager.len(), 2);
        assert!(manager.unsubscribe(id1));
        assert!(!manager.unsubscribe(id1));
        manager.clear();
        assert!(manager.is_empty());
    }

    #[test]
    fn test_manager_delivers_in_subscription_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut manager = SubscriptionManager::new();
        manager.subscribe(recording(&log, "first"));
        manager.subscribe(recording(&log, "second"));
        manager.deliver_all(&[ChangeEvent::SectionDelete(0)]);
        assert_eq!(
            *log.borrow(),
            vec![
                "first:will",
                "first:section delete 0",
                "first:did",
                "second:will",
                "second:section delete 0",
                "second:did",
            ]
        );
    }
}
