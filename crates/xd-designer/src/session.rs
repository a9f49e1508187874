//! A document open in the designer.
//!
//! `DesignSession` owns the document, its laid-out view, the undo stack and
//! the behavior registry, and runs whole gestures against them. Hosts that
//! drive a gesture step by step use `placement_context` with
//! `PlacementOperation` directly.

use kurbo::{Point, Rect, Vec2};
use thiserror::Error;
use xd_core::{ObjectId, XamlDocument, XamlError, XamlLoadError};

use crate::hit::{container_at, hit_test};
use crate::layout::{LayoutView, Viewport, resolve_layout};
use crate::placement::{
    BehaviorRegistry, PlacementAlignment, PlacementContext, PlacementError, PlacementOperation, PlacementType,
    delete_items,
};
use crate::settings::DesignerSettings;
use crate::undo::{UndoError, UndoService};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Load(#[from] XamlLoadError),
    #[error(transparent)]
    Xaml(#[from] XamlError),
    #[error(transparent)]
    Placement(#[from] PlacementError),
    #[error(transparent)]
    Undo(#[from] UndoError),
}

pub struct DesignSession {
    document: XamlDocument,
    view: LayoutView,
    undo: UndoService,
    settings: DesignerSettings,
    behaviors: BehaviorRegistry,
    viewport: Viewport,
}

impl DesignSession {
    pub fn new(document: XamlDocument, settings: DesignerSettings) -> Self {
        let viewport = Viewport::default();
        let view = resolve_layout(&document, viewport);
        Self {
            undo: UndoService::new(settings.undo_depth),
            document,
            view,
            settings,
            behaviors: BehaviorRegistry::standard(),
            viewport,
        }
    }

    pub fn load(text: &str, settings: DesignerSettings) -> Result<Self, SessionError> {
        Ok(Self::new(XamlDocument::parse(text)?, settings))
    }

    pub fn document(&self) -> &XamlDocument {
        &self.document
    }

    pub fn view(&self) -> &LayoutView {
        &self.view
    }

    pub fn settings(&self) -> &DesignerSettings {
        &self.settings
    }

    pub fn undo_service(&self) -> &UndoService {
        &self.undo
    }

    pub fn behaviors_mut(&mut self) -> &mut BehaviorRegistry {
        &mut self.behaviors
    }

    pub fn to_xml_string(&self) -> String {
        self.document.to_xml_string()
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.refresh_view();
    }

    /// Lay the document out again after edits.
    pub fn refresh_view(&mut self) {
        self.view = resolve_layout(&self.document, self.viewport);
    }

    /// Split borrows for driving a `PlacementOperation` by hand.
    pub fn placement_context(&mut self) -> (PlacementContext<'_>, &BehaviorRegistry) {
        (
            PlacementContext {
                document: &mut self.document,
                view: &self.view,
                settings: &self.settings,
                undo: &mut self.undo,
            },
            &self.behaviors,
        )
    }

    pub fn element_at(&self, point: Point) -> Option<ObjectId> {
        hit_test(&self.view, point)
    }

    /// Move `items` by `delta`. With a drop point, the items also move into
    /// the innermost panel under it when that panel accepts them.
    pub fn move_items(
        &mut self,
        items: &[ObjectId],
        delta: Vec2,
        drop_at: Option<Point>,
    ) -> Result<(), SessionError> {
        let target = drop_at.and_then(|p| container_at(&self.view, &self.document, p, items));
        let (mut ctx, registry) = self.placement_context();
        let mut op = PlacementOperation::start(&mut ctx, registry, items, PlacementType::Move)?;
        let dragged = target
            .map_or(Ok(true), |container| op.change_container(&mut ctx, registry, container))
            .and_then(|_| op.move_by(&mut ctx, delta));
        finish(op, &mut ctx, dragged)?;
        self.refresh_view();
        Ok(())
    }

    /// Drag the `alignment` thumb of `item` by `delta`.
    pub fn resize_item(
        &mut self,
        item: ObjectId,
        alignment: PlacementAlignment,
        delta: Vec2,
    ) -> Result<(), SessionError> {
        let (mut ctx, registry) = self.placement_context();
        let mut op = PlacementOperation::start_resize(&mut ctx, registry, item, alignment)?;
        let resized = op.resize_by(&mut ctx, delta);
        finish(op, &mut ctx, resized)?;
        self.refresh_view();
        Ok(())
    }

    /// Create an element of `type_name` in `container` at `bounds`,
    /// relative to the container.
    pub fn add_element(
        &mut self,
        type_name: &str,
        container: ObjectId,
        bounds: Rect,
    ) -> Result<ObjectId, SessionError> {
        let item = self.document.create_object(type_name)?;
        let (mut ctx, registry) = self.placement_context();
        let items = [(item, bounds)];
        let op = PlacementOperation::start_insert(&mut ctx, registry, container, &items, PlacementType::AddItem)?;
        op.commit(&mut ctx)?;
        self.refresh_view();
        Ok(item)
    }

    /// Paste a XAML fragment into `container`. Names that clash with the
    /// container's scope are renumbered.
    pub fn paste(&mut self, text: &str, container: ObjectId) -> Result<ObjectId, SessionError> {
        let item = self.document.parse_snippet(text)?;
        self.document.make_names_unique(item, container)?;
        let (mut ctx, registry) = self.placement_context();
        let items = [(item, Rect::ZERO)];
        let op = PlacementOperation::start_insert(&mut ctx, registry, container, &items, PlacementType::PasteItem)?;
        op.commit(&mut ctx)?;
        self.refresh_view();
        Ok(item)
    }

    pub fn delete(&mut self, items: &[ObjectId]) -> Result<(), SessionError> {
        let (mut ctx, registry) = self.placement_context();
        delete_items(&mut ctx, registry, items)?;
        self.refresh_view();
        Ok(())
    }

    /// Undo the last change group, returning its title.
    pub fn undo(&mut self) -> Result<Option<String>, SessionError> {
        let title = self.undo.undo(&mut self.document)?;
        self.refresh_view();
        Ok(title)
    }

    pub fn redo(&mut self) -> Result<Option<String>, SessionError> {
        let title = self.undo.redo(&mut self.document)?;
        self.refresh_view();
        Ok(title)
    }
}

/// Commit `op` if the gesture succeeded, abort it otherwise.
fn finish(
    op: PlacementOperation,
    ctx: &mut PlacementContext<'_>,
    outcome: Result<(), PlacementError>,
) -> Result<(), PlacementError> {
    match outcome {
        Ok(()) => op.commit(ctx),
        Err(err) => {
            op.abort(ctx)?;
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::ViewProvider;
    use pretty_assertions::assert_eq;

    const DOC: &str = r#"<Canvas xmlns="http://schemas.microsoft.com/winfx/2006/xaml/presentation" xmlns:x="http://schemas.microsoft.com/winfx/2006/xaml" Width="400" Height="300"><Rectangle x:Name="box" Canvas.Left="40" Canvas.Top="40" Width="20" Height="20"/></Canvas>"#;

    #[test]
    fn gestures_become_undo_steps() {
        let mut session = DesignSession::load(DOC, DesignerSettings::default()).unwrap();
        let root = session.document().root_element().unwrap();
        let before = session.to_xml_string();

        let added = session.add_element("Rectangle", root, Rect::new(200.0, 100.0, 260.0, 130.0)).unwrap();
        assert_eq!(session.view().bounds(added), Some(Rect::new(200.0, 100.0, 260.0, 130.0)));
        session.delete(&[added]).unwrap();
        assert!(!session.view().contains(added));

        assert_eq!(session.undo().unwrap().as_deref(), Some("Delete"));
        assert_eq!(session.undo().unwrap().as_deref(), Some("Add"));
        assert_eq!(session.to_xml_string(), before);
        assert_eq!(session.redo().unwrap().as_deref(), Some("Add"));
        assert!(session.view().contains(added));
    }

    #[test]
    fn pasted_names_are_renumbered() {
        let mut session = DesignSession::load(DOC, DesignerSettings::default()).unwrap();
        let root = session.document().root_element().unwrap();
        let pasted = session
            .paste(r#"<Rectangle x:Name="box" Canvas.Left="40" Canvas.Top="40" Width="20" Height="20"/>"#, root)
            .unwrap();

        let doc = session.document();
        assert_ne!(doc.name_of(pasted).as_deref(), Some("box"));
        let inst = doc.instance_of(pasted).unwrap();
        assert_eq!(doc.instance_value(inst, "Canvas.Left").as_f64(), Some(50.0));
        assert_eq!(doc.instance_value(inst, "Canvas.Top").as_f64(), Some(50.0));
        let is_set = |obj, name| doc.find_property(obj, name).is_some_and(|p| doc.is_set(p));
        assert!(!is_set(pasted, "Canvas.Right"));
        assert!(!is_set(pasted, "Canvas.Bottom"));
    }

    #[test]
    fn paste_offsets_only_the_anchored_sides() {
        let mut session = DesignSession::load(DOC, DesignerSettings::default()).unwrap();
        let root = session.document().root_element().unwrap();
        let pasted = session
            .paste(r#"<Rectangle Canvas.Right="30" Canvas.Top="40" Width="20" Height="20"/>"#, root)
            .unwrap();

        let doc = session.document();
        let inst = doc.instance_of(pasted).unwrap();
        assert_eq!(doc.instance_value(inst, "Canvas.Right").as_f64(), Some(20.0));
        assert_eq!(doc.instance_value(inst, "Canvas.Top").as_f64(), Some(50.0));
        let is_set = |obj, name| doc.find_property(obj, name).is_some_and(|p| doc.is_set(p));
        assert!(!is_set(pasted, "Canvas.Left"));
        assert!(!is_set(pasted, "Canvas.Bottom"));
        assert!(session.to_xml_string().contains(r#"Canvas.Right="20" Canvas.Top="50""#));
    }
}
