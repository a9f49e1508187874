//! Record of document edits, for undo.
//!
//! Every mutating operation on `XamlDocument` pushes one `UndoAction` while
//! recording is on. Reverting runs the inverse edit with recording paused.

use crate::document::XamlDocument;
use crate::error::XamlError;
use crate::id::{PropertyId, TextId};
use crate::object::XamlValue;

#[derive(Debug, Clone, PartialEq)]
pub enum UndoAction {
    SetValue {
        property: PropertyId,
        old: Option<XamlValue>,
        new: Option<XamlValue>,
    },
    Insert {
        property: PropertyId,
        index: usize,
        value: XamlValue,
    },
    Remove {
        property: PropertyId,
        index: usize,
        value: XamlValue,
    },
    SetText {
        text: TextId,
        old: String,
        new: String,
    },
}

impl XamlDocument {
    pub fn start_recording(&mut self) {
        if self.journal.is_none() {
            self.journal = Some(Vec::new());
        }
    }

    pub fn is_recording(&self) -> bool {
        self.journal.is_some()
    }

    pub fn recorded_len(&self) -> usize {
        self.journal.as_ref().map_or(0, Vec::len)
    }

    pub fn stop_recording(&mut self) -> Vec<UndoAction> {
        self.journal.take().unwrap_or_default()
    }

    /// Remove and return the actions recorded after the first `len`.
    pub fn take_recorded_since(&mut self, len: usize) -> Vec<UndoAction> {
        match &mut self.journal {
            Some(journal) if len < journal.len() => journal.split_off(len),
            _ => Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, action: UndoAction) {
        if let Some(journal) = &mut self.journal {
            journal.push(action);
        }
    }

    fn without_recording<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let journal = self.journal.take();
        let result = f(self);
        self.journal = journal;
        result
    }

    /// Undo one action.
    pub fn revert(&mut self, action: &UndoAction) -> Result<(), XamlError> {
        self.without_recording(|doc| match action {
            UndoAction::SetValue { property, old, .. } => doc.restore_value(*property, *old),
            UndoAction::Insert { property, index, .. } => doc.remove_item_at(*property, *index).map(|_| ()),
            UndoAction::Remove { property, index, value } => doc.insert_item(*property, *index, *value),
            UndoAction::SetText { text, old, .. } => doc.set_text(*text, old),
        })
    }

    /// Redo one action.
    pub fn reapply(&mut self, action: &UndoAction) -> Result<(), XamlError> {
        self.without_recording(|doc| match action {
            UndoAction::SetValue { property, new, .. } => doc.restore_value(*property, *new),
            UndoAction::Insert { property, index, value } => doc.insert_item(*property, *index, *value),
            UndoAction::Remove { property, index, .. } => doc.remove_item_at(*property, *index).map(|_| ()),
            UndoAction::SetText { text, new, .. } => doc.set_text(*text, new),
        })
    }

    fn restore_value(&mut self, prop: PropertyId, value: Option<XamlValue>) -> Result<(), XamlError> {
        match value {
            Some(value) => self.set_property_value(prop, value),
            None => self.reset_property(prop),
        }
    }
}
