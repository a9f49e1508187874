use super::behavior::length;
use super::{PlacementBehavior, PlacementContext, PlacementError, PlacementInformation, PlacementState, PlacementType};

const OFFSETS: [&str; 4] = ["Canvas.Left", "Canvas.Top", "Canvas.Right", "Canvas.Bottom"];

/// Positions children through `Canvas.Left`/`Top`, or `Right`/`Bottom`
/// when an item is already anchored that way.
pub struct CanvasPlacementBehavior {
    base: Box<dyn PlacementBehavior>,
}

impl CanvasPlacementBehavior {
    pub fn new(base: Box<dyn PlacementBehavior>) -> Self {
        Self { base }
    }
}

/// Whether `far` anchors the item instead of `near`.
fn anchored_far(ctx: &PlacementContext<'_>, info: &PlacementInformation, near: &str, far: &str) -> bool {
    ctx.is_member_set(info.item, far) && !ctx.is_member_set(info.item, near)
}

impl PlacementBehavior for CanvasPlacementBehavior {
    fn base(&self) -> &dyn PlacementBehavior {
        self.base.as_ref()
    }

    fn base_mut(&mut self) -> &mut dyn PlacementBehavior {
        self.base.as_mut()
    }

    fn set_position(
        &mut self,
        ctx: &mut PlacementContext<'_>,
        state: &PlacementState,
        info: &PlacementInformation,
    ) -> Result<(), PlacementError> {
        self.base.set_position(ctx, state, info)?;
        let size = ctx.view.bounds(state.container).map(|r| r.size()).unwrap_or_default();
        let margin = ctx.thickness(info.item, "Margin");
        let b = info.bounds;

        if anchored_far(ctx, info, "Canvas.Left", "Canvas.Right") {
            ctx.set_member(info.item, "Canvas.Right", length(size.width - b.x1 - margin.right))?;
        } else {
            ctx.set_member(info.item, "Canvas.Left", length(b.x0 - margin.left))?;
        }
        if anchored_far(ctx, info, "Canvas.Top", "Canvas.Bottom") {
            ctx.set_member(info.item, "Canvas.Bottom", length(size.height - b.y1 - margin.bottom))?;
        } else {
            ctx.set_member(info.item, "Canvas.Top", length(b.y0 - margin.top))?;
        }
        Ok(())
    }

    fn enter_container(&mut self, ctx: &mut PlacementContext<'_>, state: &PlacementState) -> Result<(), PlacementError> {
        self.base.enter_container(ctx, state)?;
        if state.kind != PlacementType::PasteItem {
            return Ok(());
        }
        let offset = ctx.settings.paste_offset;
        for info in &state.items {
            for (name, sign) in OFFSETS.iter().zip([1.0, 1.0, -1.0, -1.0]) {
                if ctx.is_member_set(info.item, name) {
                    let value = ctx.number(info.item, name);
                    ctx.set_member(info.item, name, length(value + sign * offset))?;
                }
            }
        }
        Ok(())
    }

    fn leave_container(&mut self, ctx: &mut PlacementContext<'_>, state: &PlacementState) -> Result<(), PlacementError> {
        if state.kind != PlacementType::Delete {
            for info in &state.items {
                for name in OFFSETS {
                    ctx.reset_member(info.item, name)?;
                }
            }
        }
        self.base.leave_container(ctx, state)
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

    const NS: &str = r#"xmlns="http://schemas.microsoft.com/winfx/2006/xaml/presentation" xmlns:x="http://schemas.microsoft.com/winfx/2006/xaml""#;

    fn drag(body: &str, name: &str, delta: Vec2) -> XamlDocument {
        let mut doc = XamlDocument::parse(&format!(r#"<Canvas {NS} Width="400" Height="300">{body}</Canvas>"#)).unwrap();
        let view = resolve_layout(&doc, Viewport::default());
        let item = doc.find_by_name(doc.root_element().unwrap(), name).unwrap();
        let settings = DesignerSettings {
            use_snaplines: false,
            ..DesignerSettings::default()
        };
        let mut undo = UndoService::new(10);
        let mut ctx = PlacementContext {
            document: &mut doc,
            view: &view,
            settings: &settings,
            undo: &mut undo,
        };
        let registry = BehaviorRegistry::standard();
        let mut op = PlacementOperation::start(&mut ctx, &registry, &[item], PlacementType::Move).unwrap();
        op.move_by(&mut ctx, delta).unwrap();
        op.commit(&mut ctx).unwrap();
        doc
    }

    #[test]
    fn moves_write_left_and_top() {
        let doc = drag(
            r#"<Rectangle x:Name="r" Canvas.Left="10" Canvas.Top="20" Width="30" Height="40"/>"#,
            "r",
            Vec2::new(5.0, 5.0),
        );
        let xml = doc.to_xml_string();
        assert!(
            xml.contains(r#"<Rectangle x:Name="r" Canvas.Left="15" Canvas.Top="25" Width="30" Height="40""#),
            "{xml}"
        );
    }

    #[test]
    fn right_anchored_items_stay_anchored() {
        let doc = drag(
            r#"<Rectangle x:Name="r" Canvas.Right="10" Canvas.Top="0" Width="30" Height="40"/>"#,
            "r",
            Vec2::new(-20.0, 0.0),
        );
        let r = doc.find_by_name(doc.root_element().unwrap(), "r").unwrap();
        let inst = doc.instance_of(r).unwrap();
        assert_eq!(doc.instance_value(inst, "Canvas.Right").as_f64(), Some(30.0));
        assert!(doc.instance_value(inst, "Canvas.Left").as_f64().unwrap().is_nan());
    }
}
