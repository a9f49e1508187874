//! Undo/redo over change groups.
//!
//! A change group records every document edit between `open_group` and
//! `commit_group` and becomes one undo step. Groups nest: inner groups
//! fold into the outermost one, and aborting any group replays the
//! inverse of just the edits it staged.

use thiserror::Error;
use xd_core::{UndoAction, XamlDocument, XamlError};

#[derive(Debug, Error)]
pub enum UndoError {
    #[error("no change group is open")]
    NoOpenGroup,
    #[error("a change group is still open")]
    GroupOpen,
    #[error(transparent)]
    Xaml(#[from] XamlError),
}

/// One undoable step.
#[derive(Debug, Clone)]
pub struct ChangeGroup {
    pub title: String,
    pub actions: Vec<UndoAction>,
}

impl ChangeGroup {
    fn undo(&self, doc: &mut XamlDocument) -> Result<(), XamlError> {
        for action in self.actions.iter().rev() {
            doc.revert(action)?;
        }
        Ok(())
    }

    fn redo(&self, doc: &mut XamlDocument) -> Result<(), XamlError> {
        for action in &self.actions {
            doc.reapply(action)?;
        }
        Ok(())
    }
}

/// Manages undo/redo stacks of change groups.
#[derive(Debug)]
pub struct UndoService {
    undo_stack: Vec<ChangeGroup>,
    redo_stack: Vec<ChangeGroup>,
    /// Maximum undo depth.
    max_depth: usize,
    /// Open groups, outermost first: title and journal length at open.
    open: Vec<(String, usize)>,
    /// Whether the outermost group turned document recording on.
    owns_journal: bool,
}

impl UndoService {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: Vec::with_capacity(max_depth),
            redo_stack: Vec::new(),
            max_depth,
            open: Vec::new(),
            owns_journal: false,
        }
    }

    /// Start a change group. Edits made until the matching commit or
    /// abort belong to it.
    pub fn open_group(&mut self, doc: &mut XamlDocument, title: &str) {
        if self.open.is_empty() {
            self.owns_journal = !doc.is_recording();
            doc.start_recording();
        }
        self.open.push((title.to_string(), doc.recorded_len()));
    }

    pub fn is_open(&self) -> bool {
        !self.open.is_empty()
    }

    /// Close the innermost group. Closing the outermost one pushes the
    /// recorded edits as a single undo step.
    pub fn commit_group(&mut self, doc: &mut XamlDocument) -> Result<(), UndoError> {
        let (title, start) = self.open.pop().ok_or(UndoError::NoOpenGroup)?;
        if !self.open.is_empty() {
            return Ok(());
        }
        let actions = doc.take_recorded_since(start);
        self.release_journal(doc);
        if actions.is_empty() {
            log::debug!("change group {title:?} was empty");
            return Ok(());
        }
        log::debug!("committed {title:?} with {} edits", actions.len());
        self.push(ChangeGroup { title, actions });
        Ok(())
    }

    /// Close the innermost group and revert what it staged.
    pub fn abort_group(&mut self, doc: &mut XamlDocument) -> Result<(), UndoError> {
        let (title, start) = self.open.pop().ok_or(UndoError::NoOpenGroup)?;
        let group = ChangeGroup {
            actions: doc.take_recorded_since(start),
            title,
        };
        if self.open.is_empty() {
            self.release_journal(doc);
        }
        log::debug!("aborting {:?}, reverting {} edits", group.title, group.actions.len());
        group.undo(doc)?;
        Ok(())
    }

    /// Run `edit` inside its own group, aborting it on error.
    pub fn execute<T, E>(
        &mut self,
        doc: &mut XamlDocument,
        title: &str,
        edit: impl FnOnce(&mut XamlDocument) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<UndoError>,
    {
        self.open_group(doc, title);
        match edit(doc) {
            Ok(value) => {
                self.commit_group(doc)?;
                Ok(value)
            }
            Err(err) => {
                self.abort_group(doc)?;
                Err(err)
            }
        }
    }

    fn release_journal(&mut self, doc: &mut XamlDocument) {
        if std::mem::take(&mut self.owns_journal) {
            doc.stop_recording();
        }
    }

    fn push(&mut self, group: ChangeGroup) {
        self.undo_stack.push(group);
        if self.undo_stack.len() > self.max_depth {
            self.undo_stack.remove(0);
        }
        // Clear redo stack on new action
        self.redo_stack.clear();
    }

    /// Undo the last group. Returns its title.
    pub fn undo(&mut self, doc: &mut XamlDocument) -> Result<Option<String>, UndoError> {
        if self.is_open() {
            return Err(UndoError::GroupOpen);
        }
        let Some(group) = self.undo_stack.pop() else {
            return Ok(None);
        };
        group.undo(doc)?;
        let title = group.title.clone();
        self.redo_stack.push(group);
        Ok(Some(title))
    }

    /// Redo the last undone group. Returns its title.
    pub fn redo(&mut self, doc: &mut XamlDocument) -> Result<Option<String>, UndoError> {
        if self.is_open() {
            return Err(UndoError::GroupOpen);
        }
        let Some(group) = self.redo_stack.pop() else {
            return Ok(None);
        };
        group.redo(doc)?;
        let title = group.title.clone();
        self.undo_stack.push(group);
        Ok(Some(title))
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_titles(&self) -> impl Iterator<Item = &str> {
        self.undo_stack.iter().rev().map(|g| g.title.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PANEL: &str = r#"<StackPanel xmlns="http://schemas.microsoft.com/winfx/2006/xaml/presentation"><Button Content="A" /><Button Content="B" /></StackPanel>"#;

    fn buttons(doc: &XamlDocument) -> Vec<xd_core::ObjectId> {
        let root = doc.root_element().unwrap();
        doc.object_values(doc.find_property(root, "Children").unwrap())
    }

    #[test]
    fn nested_groups_collapse_into_one_step() {
        let mut doc = XamlDocument::parse(PANEL).unwrap();
        let mut undo = UndoService::new(10);
        let [a, b] = buttons(&doc)[..] else { panic!() };

        undo.open_group(&mut doc, "outer");
        doc.set_member_text(a, "Width", "10").unwrap();
        undo.open_group(&mut doc, "inner");
        doc.set_member_text(b, "Width", "20").unwrap();
        undo.commit_group(&mut doc).unwrap();
        undo.commit_group(&mut doc).unwrap();
        assert!(!doc.is_recording());

        assert_eq!(undo.undo_titles().collect::<Vec<_>>(), ["outer"]);
        assert_eq!(undo.undo(&mut doc).unwrap().as_deref(), Some("outer"));
        assert_eq!(doc.to_xml_string(), PANEL);
        assert_eq!(undo.redo(&mut doc).unwrap().as_deref(), Some("outer"));
        assert!(doc.to_xml_string().contains(r#"<Button Content="B" Width="20" />"#));
    }

    #[test]
    fn aborting_an_inner_group_keeps_outer_edits() {
        let mut doc = XamlDocument::parse(PANEL).unwrap();
        let mut undo = UndoService::new(10);
        let [a, b] = buttons(&doc)[..] else { panic!() };

        undo.open_group(&mut doc, "outer");
        doc.set_member_text(a, "Width", "10").unwrap();
        undo.open_group(&mut doc, "inner");
        doc.set_member_text(b, "Width", "20").unwrap();
        undo.abort_group(&mut doc).unwrap();
        undo.commit_group(&mut doc).unwrap();

        let xml = doc.to_xml_string();
        assert!(xml.contains(r#"<Button Content="A" Width="10" />"#), "{xml}");
        assert!(xml.contains(r#"<Button Content="B" />"#), "{xml}");
        undo.undo(&mut doc).unwrap();
        assert_eq!(doc.to_xml_string(), PANEL);
    }

    #[test]
    fn execute_aborts_failed_edits() {
        let mut doc = XamlDocument::parse(PANEL).unwrap();
        let mut undo = UndoService::new(10);
        let a = buttons(&doc)[0];

        let result: Result<(), UndoError> = undo.execute(&mut doc, "broken", |doc| {
            doc.set_member_text(a, "Width", "10")?;
            doc.set_member_text(a, "NoSuchMember", "wide")?;
            Ok(())
        });
        assert!(matches!(result, Err(UndoError::Xaml(_))));
        assert_eq!(doc.to_xml_string(), PANEL);
        assert!(!undo.can_undo());
    }

    #[test]
    fn depth_limit_drops_the_oldest_step() {
        let mut doc = XamlDocument::parse(PANEL).unwrap();
        let mut undo = UndoService::new(2);
        let a = buttons(&doc)[0];
        for width in ["1", "2", "3"] {
            undo.execute(&mut doc, width, |doc| doc.set_member_text(a, "Width", width).map_err(UndoError::from))
                .unwrap();
        }
        assert_eq!(undo.undo_titles().collect::<Vec<_>>(), ["3", "2"]);
        assert!(matches!(undo.commit_group(&mut doc), Err(UndoError::NoOpenGroup)));
    }
}
