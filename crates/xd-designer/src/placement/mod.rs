//! Placement: moving, resizing, inserting and deleting elements.
//!
//! A `PlacementOperation` drives one gesture. It asks the container's
//! behavior chain (see `BehaviorRegistry`) to turn item bounds into member
//! values, and stages every edit in an undo group so the gesture commits
//! or aborts as a unit.

mod behavior;
mod canvas;
mod grid;
mod raster;
mod snapline;
mod stack;

pub use behavior::{BehaviorRegistry, DefaultPlacementBehavior, PlacementBehavior};
pub use canvas::CanvasPlacementBehavior;
pub use grid::{GridPlacementBehavior, GridSplitterState, TrackAxis, resize_track};
pub use raster::RasterPlacementBehavior;
pub use snapline::SnaplinePlacementBehavior;
pub use stack::StackPanelPlacementBehavior;

use std::fmt;

use kurbo::{Rect, Vec2};
use thiserror::Error;
use xd_core::{ObjectId, PropertyId, Thickness, Value, XamlDocument, XamlError};

use crate::settings::DesignerSettings;
use crate::snapline::Snapline;
use crate::undo::{UndoError, UndoService};
use crate::view::ViewProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementType {
    Move,
    Resize,
    AddItem,
    PasteItem,
    Delete,
}

impl fmt::Display for PlacementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PlacementType::Move => "Move",
            PlacementType::Resize => "Resize",
            PlacementType::AddItem => "Add",
            PlacementType::PasteItem => "Paste",
            PlacementType::Delete => "Delete",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizontalEdge {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalEdge {
    Top,
    Center,
    Bottom,
}

/// The resize thumb being dragged. `Center` leaves that axis alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementAlignment {
    pub horizontal: HorizontalEdge,
    pub vertical: VerticalEdge,
}

impl PlacementAlignment {
    pub const TOP_LEFT: Self = Self::new(HorizontalEdge::Left, VerticalEdge::Top);
    pub const TOP_RIGHT: Self = Self::new(HorizontalEdge::Right, VerticalEdge::Top);
    pub const BOTTOM_LEFT: Self = Self::new(HorizontalEdge::Left, VerticalEdge::Bottom);
    pub const BOTTOM_RIGHT: Self = Self::new(HorizontalEdge::Right, VerticalEdge::Bottom);
    pub const LEFT: Self = Self::new(HorizontalEdge::Left, VerticalEdge::Center);
    pub const RIGHT: Self = Self::new(HorizontalEdge::Right, VerticalEdge::Center);
    pub const TOP: Self = Self::new(HorizontalEdge::Center, VerticalEdge::Top);
    pub const BOTTOM: Self = Self::new(HorizontalEdge::Center, VerticalEdge::Bottom);

    pub const fn new(horizontal: HorizontalEdge, vertical: VerticalEdge) -> Self {
        Self { horizontal, vertical }
    }

    /// `rect` with the dragged edges moved by `delta`. Edges never cross.
    pub fn resize(&self, rect: Rect, delta: Vec2) -> Rect {
        let mut r = rect;
        match self.horizontal {
            HorizontalEdge::Left => r.x0 = (r.x0 + delta.x).min(r.x1),
            HorizontalEdge::Right => r.x1 = (r.x1 + delta.x).max(r.x0),
            HorizontalEdge::Center => {}
        }
        match self.vertical {
            VerticalEdge::Top => r.y0 = (r.y0 + delta.y).min(r.y1),
            VerticalEdge::Bottom => r.y1 = (r.y1 + delta.y).max(r.y0),
            VerticalEdge::Center => {}
        }
        r
    }
}

/// One item taking part in a placement.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementInformation {
    pub item: ObjectId,
    /// Bounds when the operation started, relative to the container.
    pub original_bounds: Rect,
    /// Requested bounds, relative to the container.
    pub bounds: Rect,
    pub resize: Option<PlacementAlignment>,
}

/// What behaviors see of a running operation.
#[derive(Debug, Clone)]
pub struct PlacementState {
    pub kind: PlacementType,
    pub container: ObjectId,
    pub items: Vec<PlacementInformation>,
}

impl PlacementState {
    pub fn contains(&self, obj: ObjectId) -> bool {
        self.items.iter().any(|i| i.item == obj)
    }
}

#[derive(Debug, Error)]
pub enum PlacementError {
    #[error("no items to place")]
    NoItems,
    #[error("items do not share a container")]
    MixedContainers,
    #[error("item is not inside a container")]
    NotInContainer,
    #[error("{0} is not allowed here")]
    NotAllowed(PlacementType),
    #[error("invalid operation state: {0}")]
    InvalidState(&'static str),
    #[error(transparent)]
    Xaml(#[from] XamlError),
    #[error(transparent)]
    Undo(#[from] UndoError),
}

/// Everything a behavior may read or edit.
pub struct PlacementContext<'a> {
    pub document: &'a mut XamlDocument,
    pub view: &'a dyn ViewProvider,
    pub settings: &'a DesignerSettings,
    pub undo: &'a mut UndoService,
}

impl PlacementContext<'_> {
    fn member(&mut self, obj: ObjectId, name: &str) -> Result<PropertyId, XamlError> {
        match name.split_once('.') {
            Some((owner, member)) => self.document.attached_property(obj, owner, member),
            None => self.document.property_by_name(obj, name),
        }
    }

    /// Live value of a member, or its default.
    pub fn member_value(&self, obj: ObjectId, name: &str) -> Value {
        self.document
            .instance_of(obj)
            .map_or(Value::Null, |inst| self.document.instance_value(inst, name))
    }

    pub fn number(&self, obj: ObjectId, name: &str) -> f64 {
        self.member_value(obj, name).as_f64().unwrap_or(f64::NAN)
    }

    pub fn thickness(&self, obj: ObjectId, name: &str) -> Thickness {
        self.member_value(obj, name).as_thickness().unwrap_or_default()
    }

    pub fn is_member_set(&self, obj: ObjectId, name: &str) -> bool {
        self.document
            .find_property(obj, name)
            .is_some_and(|p| self.document.is_set(p))
    }

    /// Write a member through the document. A set member that already
    /// holds `value` is left alone.
    pub fn set_member(&mut self, obj: ObjectId, name: &str, value: Value) -> Result<(), XamlError> {
        let prop = self.member(obj, name)?;
        if self.document.is_set(prop) && self.document.value_on_instance(prop).is_ok_and(|v| v == value) {
            return Ok(());
        }
        log::trace!("{name} = {value}");
        self.document.set_value(prop, value)
    }

    /// Write a member unless its live value already equals `value`.
    pub fn set_member_if_changed(&mut self, obj: ObjectId, name: &str, value: Value) -> Result<(), XamlError> {
        if self.member_value(obj, name) == value {
            return Ok(());
        }
        self.set_member(obj, name, value)
    }

    pub fn reset_member(&mut self, obj: ObjectId, name: &str) -> Result<(), XamlError> {
        match self.document.find_property(obj, name) {
            Some(prop) if self.document.is_set(prop) => self.document.reset_property(prop),
            _ => Ok(()),
        }
    }
}

/// One placement gesture.
pub struct PlacementOperation {
    state: PlacementState,
    behavior: Box<dyn PlacementBehavior>,
}

impl fmt::Debug for PlacementOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlacementOperation").field("state", &self.state).finish_non_exhaustive()
    }
}

impl PlacementOperation {
    /// Start placing existing items. They must share one container.
    pub fn start(
        ctx: &mut PlacementContext<'_>,
        registry: &BehaviorRegistry,
        items: &[ObjectId],
        kind: PlacementType,
    ) -> Result<Self, PlacementError> {
        let (state, behavior) = Self::prepare(ctx, registry, items, kind)?;
        Self::begin(ctx, state, behavior)
    }

    /// Start resizing one item by the thumb at `alignment`.
    pub fn start_resize(
        ctx: &mut PlacementContext<'_>,
        registry: &BehaviorRegistry,
        item: ObjectId,
        alignment: PlacementAlignment,
    ) -> Result<Self, PlacementError> {
        let (mut state, behavior) = Self::prepare(ctx, registry, &[item], PlacementType::Resize)?;
        for info in &mut state.items {
            info.resize = Some(alignment);
        }
        Self::begin(ctx, state, behavior)
    }

    fn prepare(
        ctx: &PlacementContext<'_>,
        registry: &BehaviorRegistry,
        items: &[ObjectId],
        kind: PlacementType,
    ) -> Result<(PlacementState, Box<dyn PlacementBehavior>), PlacementError> {
        let first = *items.first().ok_or(PlacementError::NoItems)?;
        let container = ctx.document.parent_object(first).ok_or(PlacementError::NotInContainer)?;
        if items.iter().any(|&i| ctx.document.parent_object(i) != Some(container)) {
            return Err(PlacementError::MixedContainers);
        }
        let behavior = registry.behavior_for(ctx.document, container);
        let items = items
            .iter()
            .map(|&item| {
                let bounds = behavior.get_position(ctx, container, item);
                PlacementInformation {
                    item,
                    original_bounds: bounds,
                    bounds,
                    resize: None,
                }
            })
            .collect();
        Ok((PlacementState { kind, container, items }, behavior))
    }

    /// Insert detached items into `container` at the given bounds.
    /// Pasted items keep their own positions, shifted by the paste offset.
    pub fn start_insert(
        ctx: &mut PlacementContext<'_>,
        registry: &BehaviorRegistry,
        container: ObjectId,
        items: &[(ObjectId, Rect)],
        kind: PlacementType,
    ) -> Result<Self, PlacementError> {
        if !matches!(kind, PlacementType::AddItem | PlacementType::PasteItem) {
            return Err(PlacementError::InvalidState("only additions and pastes insert items"));
        }
        if items.is_empty() {
            return Err(PlacementError::NoItems);
        }
        if items.iter().any(|&(i, _)| ctx.document.parent_object(i).is_some()) {
            return Err(PlacementError::Xaml(XamlError::ValueAlreadyParented));
        }
        let behavior = registry.behavior_for(ctx.document, container);
        let state = PlacementState {
            kind,
            container,
            items: items
                .iter()
                .map(|&(item, bounds)| PlacementInformation {
                    item,
                    original_bounds: bounds,
                    bounds,
                    resize: None,
                })
                .collect(),
        };
        if !behavior.can_enter_container(ctx, &state) {
            return Err(PlacementError::NotAllowed(kind));
        }
        let mut op = Self::begin(ctx, state, behavior)?;
        if kind == PlacementType::AddItem {
            op.apply(ctx)?;
        }
        Ok(op)
    }

    fn begin(
        ctx: &mut PlacementContext<'_>,
        state: PlacementState,
        mut behavior: Box<dyn PlacementBehavior>,
    ) -> Result<Self, PlacementError> {
        if !behavior.can_place(ctx, &state) {
            return Err(PlacementError::NotAllowed(state.kind));
        }
        ctx.undo.open_group(ctx.document, &state.kind.to_string());
        let entered = match state.kind {
            PlacementType::AddItem | PlacementType::PasteItem => behavior.enter_container(ctx, &state),
            _ => Ok(()),
        };
        if let Err(err) = entered.and_then(|()| behavior.begin_placement(ctx, &state)) {
            ctx.undo.abort_group(ctx.document)?;
            return Err(err);
        }
        log::trace!("{} of {} item(s) started", state.kind, state.items.len());
        Ok(Self { state, behavior })
    }

    pub fn kind(&self) -> PlacementType {
        self.state.kind
    }

    pub fn container(&self) -> ObjectId {
        self.state.container
    }

    pub fn items(&self) -> &[PlacementInformation] {
        &self.state.items
    }

    /// Snap guides for the last update.
    pub fn guide_lines(&self) -> Vec<Snapline> {
        self.behavior.guide_lines()
    }

    /// Shift every item from its original bounds by `delta`.
    pub fn move_by(&mut self, ctx: &mut PlacementContext<'_>, delta: Vec2) -> Result<(), PlacementError> {
        if !matches!(
            self.state.kind,
            PlacementType::Move | PlacementType::AddItem | PlacementType::PasteItem
        ) {
            return Err(PlacementError::InvalidState("only moves and insertions can be dragged"));
        }
        for info in &mut self.state.items {
            info.bounds = info.original_bounds + delta;
        }
        self.apply(ctx)
    }

    /// Drag the resize thumb by `delta` from where it started.
    pub fn resize_by(&mut self, ctx: &mut PlacementContext<'_>, delta: Vec2) -> Result<(), PlacementError> {
        if self.state.kind != PlacementType::Resize {
            return Err(PlacementError::InvalidState("not a resize"));
        }
        for info in &mut self.state.items {
            if let Some(alignment) = info.resize {
                info.bounds = alignment.resize(info.original_bounds, delta);
            }
        }
        self.apply(ctx)
    }

    /// Request explicit bounds for one item.
    pub fn set_bounds(
        &mut self,
        ctx: &mut PlacementContext<'_>,
        item: ObjectId,
        bounds: Rect,
    ) -> Result<(), PlacementError> {
        let info = self
            .state
            .items
            .iter_mut()
            .find(|i| i.item == item)
            .ok_or(PlacementError::InvalidState("item is not part of this operation"))?;
        info.bounds = bounds;
        self.apply(ctx)
    }

    fn apply(&mut self, ctx: &mut PlacementContext<'_>) -> Result<(), PlacementError> {
        self.behavior.before_set_position(ctx, &mut self.state);
        for index in 0..self.state.items.len() {
            let info = self.state.items[index].clone();
            self.behavior.set_position(ctx, &self.state, &info)?;
        }
        Ok(())
    }

    /// Move the items into `container`. Returns `false`, changing nothing,
    /// when either container vetoes the move.
    pub fn change_container(
        &mut self,
        ctx: &mut PlacementContext<'_>,
        registry: &BehaviorRegistry,
        container: ObjectId,
    ) -> Result<bool, PlacementError> {
        if container == self.state.container {
            return Ok(true);
        }
        if self.state.kind != PlacementType::Move {
            return Err(PlacementError::InvalidState("only moves change container"));
        }
        if self
            .state
            .items
            .iter()
            .any(|i| ctx.document.is_ancestor_or_self(i.item, container))
        {
            return Ok(false);
        }
        let mut next = registry.behavior_for(ctx.document, container);
        let entering = PlacementState {
            container,
            ..self.state.clone()
        };
        if !self.behavior.can_leave_container(ctx, &self.state) || !next.can_enter_container(ctx, &entering) {
            log::debug!("container change vetoed");
            return Ok(false);
        }
        let offset = ctx
            .view
            .offset_between(self.state.container, container)
            .unwrap_or_default();

        self.behavior.leave_container(ctx, &self.state)?;
        self.behavior.end_placement(ctx, &self.state)?;
        self.state.container = container;
        for info in &mut self.state.items {
            info.original_bounds = info.original_bounds + offset;
            info.bounds = info.bounds + offset;
        }
        next.enter_container(ctx, &self.state)?;
        next.begin_placement(ctx, &self.state)?;
        self.behavior = next;
        self.apply(ctx)?;
        Ok(true)
    }

    /// Keep every edit as one undo step.
    pub fn commit(mut self, ctx: &mut PlacementContext<'_>) -> Result<(), PlacementError> {
        self.behavior.end_placement(ctx, &self.state)?;
        ctx.undo.commit_group(ctx.document)?;
        log::trace!("{} committed", self.state.kind);
        Ok(())
    }

    /// Revert every edit made since the operation started.
    pub fn abort(mut self, ctx: &mut PlacementContext<'_>) -> Result<(), PlacementError> {
        let ended = self.behavior.end_placement(ctx, &self.state);
        ctx.undo.abort_group(ctx.document)?;
        log::trace!("{} aborted", self.state.kind);
        ended
    }
}

/// Whether `item` may be resized by the thumb at `alignment`. Hosts use
/// this to pick which resize handles to show.
pub fn can_resize(
    ctx: &PlacementContext<'_>,
    registry: &BehaviorRegistry,
    item: ObjectId,
    alignment: PlacementAlignment,
) -> bool {
    let Ok((mut state, behavior)) = PlacementOperation::prepare(ctx, registry, &[item], PlacementType::Resize) else {
        return false;
    };
    for info in &mut state.items {
        info.resize = Some(alignment);
    }
    behavior.can_place(ctx, &state)
}

/// Delete items, each through its container's behavior, as one undo step.
/// Items inside other deleted items are skipped.
pub fn delete_items(
    ctx: &mut PlacementContext<'_>,
    registry: &BehaviorRegistry,
    items: &[ObjectId],
) -> Result<(), PlacementError> {
    if items.is_empty() {
        return Err(PlacementError::NoItems);
    }
    ctx.undo.open_group(ctx.document, "Delete");
    match delete_grouped(ctx, registry, items) {
        Ok(()) => {
            ctx.undo.commit_group(ctx.document)?;
            Ok(())
        }
        Err(err) => {
            ctx.undo.abort_group(ctx.document)?;
            Err(err)
        }
    }
}

fn delete_grouped(
    ctx: &mut PlacementContext<'_>,
    registry: &BehaviorRegistry,
    items: &[ObjectId],
) -> Result<(), PlacementError> {
    let doc = &*ctx.document;
    let roots: Vec<ObjectId> = items
        .iter()
        .copied()
        .filter(|&i| !items.iter().any(|&o| o != i && doc.is_ancestor_or_self(o, i)))
        .collect();
    let mut groups: Vec<(ObjectId, Vec<ObjectId>)> = Vec::new();
    for item in roots {
        let container = doc.parent_object(item).ok_or(PlacementError::NotInContainer)?;
        match groups.iter_mut().find(|(c, _)| *c == container) {
            Some((_, members)) => members.push(item),
            None => groups.push((container, vec![item])),
        }
    }
    for (_, members) in groups {
        let mut op = PlacementOperation::start(ctx, registry, &members, PlacementType::Delete)?;
        op.behavior.leave_container(ctx, &op.state)?;
        op.commit(ctx)?;
    }
    Ok(())
}
