use xd_core::XamlValue;

use super::{PlacementBehavior, PlacementContext, PlacementError, PlacementInformation, PlacementState, PlacementType};

const FOREIGN_MEMBERS: [&str; 8] = [
    "Canvas.Left",
    "Canvas.Top",
    "Canvas.Right",
    "Canvas.Bottom",
    "Grid.Row",
    "Grid.Column",
    "Grid.RowSpan",
    "Grid.ColumnSpan",
];

/// Reorders children: a dragged item goes before the first sibling whose
/// midpoint lies past its own.
pub struct StackPanelPlacementBehavior {
    base: Box<dyn PlacementBehavior>,
    horizontal: bool,
    /// Sibling midpoints along the stacking axis, in document order.
    mids: Vec<f64>,
}

impl StackPanelPlacementBehavior {
    pub fn new(base: Box<dyn PlacementBehavior>) -> Self {
        Self {
            base,
            horizontal: false,
            mids: Vec::new(),
        }
    }

    fn mid(&self, info: &PlacementInformation) -> f64 {
        let center = info.bounds.center();
        if self.horizontal { center.x } else { center.y }
    }
}

impl PlacementBehavior for StackPanelPlacementBehavior {
    fn base(&self) -> &dyn PlacementBehavior {
        self.base.as_ref()
    }

    fn base_mut(&mut self) -> &mut dyn PlacementBehavior {
        self.base.as_mut()
    }

    fn begin_placement(&mut self, ctx: &mut PlacementContext<'_>, state: &PlacementState) -> Result<(), PlacementError> {
        self.base.begin_placement(ctx, state)?;
        self.horizontal = ctx
            .member_value(state.container, "Orientation")
            .as_enum()
            .is_some_and(|n| n.as_str() == "Horizontal");
        let horizontal = self.horizontal;
        self.mids = ctx
            .view
            .visual_children(state.container)
            .into_iter()
            .filter(|&c| !state.contains(c))
            .filter_map(|c| ctx.view.bounds_in(c, state.container))
            .map(|b| if horizontal { b.center().x } else { b.center().y })
            .collect();
        Ok(())
    }

    fn before_set_position(&mut self, ctx: &PlacementContext<'_>, state: &mut PlacementState) {
        if state.kind != PlacementType::Move {
            self.base.before_set_position(ctx, state);
        }
    }

    fn set_position(
        &mut self,
        ctx: &mut PlacementContext<'_>,
        state: &PlacementState,
        info: &PlacementInformation,
    ) -> Result<(), PlacementError> {
        self.base.set_position(ctx, state, info)?;
        if !matches!(
            state.kind,
            PlacementType::Move | PlacementType::AddItem | PlacementType::PasteItem
        ) {
            return Ok(());
        }
        let Some(prop) = ctx.document.content_property(state.container) else {
            return Ok(());
        };
        let mid = self.mid(info);
        let target = self.mids.iter().filter(|&&m| m < mid).count();
        let value = XamlValue::Object(info.item);
        let Some(current) = ctx.document.property(prop).items().iter().position(|&v| v == value) else {
            return Ok(());
        };
        if current != target {
            log::trace!("stack item {current} -> {target}");
            ctx.document.move_item(prop, current, target)?;
        }
        Ok(())
    }

    fn enter_container(&mut self, ctx: &mut PlacementContext<'_>, state: &PlacementState) -> Result<(), PlacementError> {
        self.base.enter_container(ctx, state)?;
        for info in &state.items {
            for name in FOREIGN_MEMBERS {
                ctx.reset_member(info.item, name)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{Viewport, resolve_layout};
    use crate::placement::{BehaviorRegistry, PlacementOperation};
    use crate::settings::DesignerSettings;
    use crate::undo::UndoService;
    use kurbo::Vec2;
    use pretty_assertions::assert_eq;
    use xd_core::XamlDocument;

    #[test]
    fn horizontal_stacks_reorder_along_x() {
        let mut doc = XamlDocument::parse(
            r#"<StackPanel xmlns="http://schemas.microsoft.com/winfx/2006/xaml/presentation" xmlns:x="http://schemas.microsoft.com/winfx/2006/xaml" Orientation="Horizontal"><Rectangle x:Name="a" Width="20"/><Rectangle x:Name="b" Width="20"/><Rectangle x:Name="c" Width="20"/></StackPanel>"#,
        )
        .unwrap();
        let view = resolve_layout(&doc, Viewport::default());
        let root = doc.root_element().unwrap();
        let a = doc.find_by_name(root, "a").unwrap();
        let settings = DesignerSettings::default();
        let mut undo = UndoService::new(10);
        let mut ctx = PlacementContext {
            document: &mut doc,
            view: &view,
            settings: &settings,
            undo: &mut undo,
        };
        let registry = BehaviorRegistry::standard();
        let mut op = PlacementOperation::start(&mut ctx, &registry, &[a], PlacementType::Move).unwrap();
        op.move_by(&mut ctx, Vec2::new(25.0, 0.0)).unwrap();
        op.commit(&mut ctx).unwrap();

        let children = doc.object_values(doc.find_property(root, "Children").unwrap());
        let names: Vec<String> = children.iter().filter_map(|&c| doc.name_of(c)).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }
}
