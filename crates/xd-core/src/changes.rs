//! Change notifications raised by object-model edits.
//!
//! Every edit appends to a `ChangeLog`. Consumers either keep a cursor and
//! read `since(cursor)`, or register a callback with `subscribe`.

use crate::id::{ObjectId, PropertyId};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionAction {
    Insert { index: usize },
    Remove { index: usize },
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentChange {
    ValueChanged { property: PropertyId },
    IsSetChanged { property: PropertyId, is_set: bool },
    CollectionChanged { property: PropertyId, action: CollectionAction },
    NameChanged {
        object: ObjectId,
        old: Option<String>,
        new: Option<String>,
    },
}

impl DocumentChange {
    pub fn property(&self) -> Option<PropertyId> {
        match self {
            DocumentChange::ValueChanged { property }
            | DocumentChange::IsSetChanged { property, .. }
            | DocumentChange::CollectionChanged { property, .. } => Some(*property),
            DocumentChange::NameChanged { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u32);

type Subscriber = Box<dyn FnMut(&DocumentChange)>;

#[derive(Default)]
pub struct ChangeLog {
    entries: Vec<DocumentChange>,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u32,
    muted: bool,
}

impl fmt::Debug for ChangeLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeLog")
            .field("entries", &self.entries)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl ChangeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, change: DocumentChange) {
        if self.muted {
            return;
        }
        for (_, subscriber) in &mut self.subscribers {
            subscriber(&change);
        }
        self.entries.push(change);
    }

    /// Suppress notifications while a document is being loaded.
    pub(crate) fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    /// Position to pass to `since` later.
    pub fn cursor(&self) -> usize {
        self.entries.len()
    }

    pub fn since(&self, cursor: usize) -> &[DocumentChange] {
        self.entries.get(cursor..).unwrap_or_default()
    }

    pub fn entries(&self) -> &[DocumentChange] {
        &self.entries
    }

    pub fn subscribe(&mut self, callback: impl FnMut(&DocumentChange) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(s, _)| *s != id);
        self.subscribers.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn cursor_and_subscribers() {
        let mut log = ChangeLog::new();
        let seen = Rc::new(RefCell::new(0));
        let counter = seen.clone();
        let sub = log.subscribe(move |_| *counter.borrow_mut() += 1);

        let p = PropertyId::from_index(0);
        log.push(DocumentChange::ValueChanged { property: p });
        let cursor = log.cursor();
        log.push(DocumentChange::IsSetChanged { property: p, is_set: true });
        assert_eq!(log.since(cursor).len(), 1);
        assert_eq!(log.since(cursor)[0].property(), Some(p));
        assert_eq!(*seen.borrow(), 2);

        assert!(log.unsubscribe(sub));
        log.push(DocumentChange::ValueChanged { property: p });
        assert_eq!(*seen.borrow(), 2);

        log.set_muted(true);
        log.push(DocumentChange::ValueChanged { property: p });
        assert_eq!(log.entries().len(), 3);
    }
}
