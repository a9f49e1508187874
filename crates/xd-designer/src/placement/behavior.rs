//! The behavior chain.
//!
//! Container behaviors wrap a base behavior and forward whatever they do
//! not override. A chain reads container → snaplines → raster → default;
//! each layer lets its base run first and then adjusts the result.

use std::collections::HashMap;

use kurbo::{Point, Rect};
use xd_core::{ObjectId, Value, XamlDocument, XamlValue};

use super::{
    CanvasPlacementBehavior, GridPlacementBehavior, PlacementContext, PlacementError, PlacementInformation,
    PlacementState, PlacementType, RasterPlacementBehavior, SnaplinePlacementBehavior, StackPanelPlacementBehavior,
};
use crate::layout::is_element;
use crate::snapline::Snapline;

/// How one kind of container places its children.
///
/// Every method forwards to `base()` unless overridden. The chain ends at
/// `DefaultPlacementBehavior`, which overrides all of them.
pub trait PlacementBehavior {
    fn base(&self) -> &dyn PlacementBehavior;
    fn base_mut(&mut self) -> &mut dyn PlacementBehavior;

    fn can_place(&self, ctx: &PlacementContext<'_>, state: &PlacementState) -> bool {
        self.base().can_place(ctx, state)
    }

    fn begin_placement(&mut self, ctx: &mut PlacementContext<'_>, state: &PlacementState) -> Result<(), PlacementError> {
        self.base_mut().begin_placement(ctx, state)
    }

    fn end_placement(&mut self, ctx: &mut PlacementContext<'_>, state: &PlacementState) -> Result<(), PlacementError> {
        self.base_mut().end_placement(ctx, state)
    }

    /// Current bounds of `item`, relative to `container`.
    fn get_position(&self, ctx: &PlacementContext<'_>, container: ObjectId, item: ObjectId) -> Rect {
        self.base().get_position(ctx, container, item)
    }

    /// Adjust requested bounds before they are applied.
    fn before_set_position(&mut self, ctx: &PlacementContext<'_>, state: &mut PlacementState) {
        self.base_mut().before_set_position(ctx, state);
    }

    /// Write member values that put `info.item` at `info.bounds`.
    fn set_position(
        &mut self,
        ctx: &mut PlacementContext<'_>,
        state: &PlacementState,
        info: &PlacementInformation,
    ) -> Result<(), PlacementError> {
        self.base_mut().set_position(ctx, state, info)
    }

    fn can_leave_container(&self, ctx: &PlacementContext<'_>, state: &PlacementState) -> bool {
        self.base().can_leave_container(ctx, state)
    }

    fn leave_container(&mut self, ctx: &mut PlacementContext<'_>, state: &PlacementState) -> Result<(), PlacementError> {
        self.base_mut().leave_container(ctx, state)
    }

    fn can_enter_container(&self, ctx: &PlacementContext<'_>, state: &PlacementState) -> bool {
        self.base().can_enter_container(ctx, state)
    }

    fn enter_container(&mut self, ctx: &mut PlacementContext<'_>, state: &PlacementState) -> Result<(), PlacementError> {
        self.base_mut().enter_container(ctx, state)
    }

    /// Adjust a free point, e.g. where a drawing tool starts.
    fn place_point(&self, ctx: &PlacementContext<'_>, point: Point) -> Point {
        self.base().place_point(ctx, point)
    }

    /// Guides to draw for the last adjustment.
    fn guide_lines(&self) -> Vec<Snapline> {
        self.base().guide_lines()
    }
}

/// Whether `container`'s content member can take `count` more items.
pub(crate) fn accepts_content(doc: &XamlDocument, container: ObjectId, count: usize) -> bool {
    let registry = doc.registry();
    let ty = doc.object(container).element_type();
    let Some(name) = registry.content_property(ty) else {
        return registry.collection_kind(ty).is_some();
    };
    match doc.find_property(container, name.as_str()) {
        Some(prop) if doc.property(prop).is_collection() => true,
        Some(prop) => count == 1 && !doc.is_set(prop),
        None => registry
            .find_property(ty, name.as_str())
            .is_some_and(|(_, schema)| registry.collection_kind(schema.value_type).is_some() || count == 1),
    }
}

/// Sizes items on resize and moves them in and out of the content member.
#[derive(Debug, Default)]
pub struct DefaultPlacementBehavior;

impl PlacementBehavior for DefaultPlacementBehavior {
    fn base(&self) -> &dyn PlacementBehavior {
        self
    }

    fn base_mut(&mut self) -> &mut dyn PlacementBehavior {
        self
    }

    fn can_place(&self, ctx: &PlacementContext<'_>, state: &PlacementState) -> bool {
        match state.kind {
            PlacementType::Move | PlacementType::Resize => {
                state.items.iter().all(|i| is_element(ctx.document, i.item))
            }
            PlacementType::AddItem | PlacementType::PasteItem | PlacementType::Delete => true,
        }
    }

    fn begin_placement(&mut self, _: &mut PlacementContext<'_>, _: &PlacementState) -> Result<(), PlacementError> {
        Ok(())
    }

    fn end_placement(&mut self, _: &mut PlacementContext<'_>, _: &PlacementState) -> Result<(), PlacementError> {
        Ok(())
    }

    fn get_position(&self, ctx: &PlacementContext<'_>, container: ObjectId, item: ObjectId) -> Rect {
        match (ctx.view.bounds(item), ctx.view.bounds(container)) {
            (Some(item), Some(container)) => item - container.origin().to_vec2(),
            _ => Rect::ZERO,
        }
    }

    fn before_set_position(&mut self, _: &PlacementContext<'_>, _: &mut PlacementState) {}

    fn set_position(
        &mut self,
        ctx: &mut PlacementContext<'_>,
        state: &PlacementState,
        info: &PlacementInformation,
    ) -> Result<(), PlacementError> {
        let sized = state.kind == PlacementType::AddItem;
        let resized = state.kind == PlacementType::Resize;
        let width = info.bounds.width();
        let height = info.bounds.height();
        if (sized && width > 0.0) || (resized && width != info.original_bounds.width()) {
            ctx.set_member(info.item, "Width", length(width))?;
        }
        if (sized && height > 0.0) || (resized && height != info.original_bounds.height()) {
            ctx.set_member(info.item, "Height", length(height))?;
        }
        Ok(())
    }

    fn can_leave_container(&self, _: &PlacementContext<'_>, _: &PlacementState) -> bool {
        true
    }

    fn leave_container(&mut self, ctx: &mut PlacementContext<'_>, state: &PlacementState) -> Result<(), PlacementError> {
        for info in &state.items {
            ctx.document.remove_from_parent(XamlValue::Object(info.item))?;
        }
        Ok(())
    }

    fn can_enter_container(&self, ctx: &PlacementContext<'_>, state: &PlacementState) -> bool {
        accepts_content(ctx.document, state.container, state.items.len())
    }

    fn enter_container(&mut self, ctx: &mut PlacementContext<'_>, state: &PlacementState) -> Result<(), PlacementError> {
        let prop = ctx
            .document
            .content_property(state.container)
            .ok_or(PlacementError::NotAllowed(state.kind))?;
        for info in &state.items {
            let item = XamlValue::Object(info.item);
            if ctx.document.property(prop).is_collection() {
                ctx.document.add_item(prop, item)?;
            } else {
                ctx.document.set_property_value(prop, item)?;
            }
        }
        Ok(())
    }

    fn place_point(&self, _: &PlacementContext<'_>, point: Point) -> Point {
        point
    }

    fn guide_lines(&self) -> Vec<Snapline> {
        Vec::new()
    }
}

/// A length for output, rounded to two decimals.
pub(crate) fn length(value: f64) -> Value {
    Value::Double((value * 100.0).round() / 100.0)
}

type Factory = fn(Box<dyn PlacementBehavior>) -> Box<dyn PlacementBehavior>;

/// Container behaviors by type name. Lookups walk the container's base
/// types, so a registration for `Panel` covers every panel.
pub struct BehaviorRegistry {
    factories: HashMap<String, Factory>,
}

impl BehaviorRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Canvas, Grid and StackPanel behaviors.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register("Canvas", |base| Box::new(CanvasPlacementBehavior::new(base)));
        registry.register("Grid", |base| Box::new(GridPlacementBehavior::new(base)));
        registry.register("StackPanel", |base| Box::new(StackPanelPlacementBehavior::new(base)));
        registry
    }

    pub fn register(&mut self, type_name: &str, factory: Factory) {
        self.factories.insert(type_name.to_string(), factory);
    }

    /// A fresh behavior chain for `container`.
    pub fn behavior_for(&self, doc: &XamlDocument, container: ObjectId) -> Box<dyn PlacementBehavior> {
        let base: Box<dyn PlacementBehavior> = Box::new(SnaplinePlacementBehavior::new(Box::new(
            RasterPlacementBehavior::new(Box::new(DefaultPlacementBehavior)),
        )));
        let registry = doc.registry();
        let factory = registry
            .ancestry(doc.object(container).element_type())
            .find_map(|ty| self.factories.get(registry.type_name(ty)));
        match factory {
            Some(factory) => factory(base),
            None => base,
        }
    }
}

impl Default for BehaviorRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NS: &str = r#"xmlns="http://schemas.microsoft.com/winfx/2006/xaml/presentation""#;

    #[test]
    fn content_acceptance() {
        let doc = XamlDocument::parse(&format!(
            r#"<StackPanel {NS}><Border /><Border><Button /></Border><Rectangle /></StackPanel>"#
        ))
        .unwrap();
        let root = doc.root_element().unwrap();
        let children = doc.object_values(doc.find_property(root, "Children").unwrap());

        assert!(accepts_content(&doc, root, 3));
        assert!(accepts_content(&doc, children[0], 1));
        assert!(!accepts_content(&doc, children[0], 2));
        assert!(!accepts_content(&doc, children[1], 1));
        assert!(!accepts_content(&doc, children[2], 1));
    }

    #[test]
    fn values_are_rounded_for_output() {
        assert_eq!(length(10.004), Value::Double(10.0));
        assert_eq!(length(12.3456), Value::Double(12.35));
    }
}
