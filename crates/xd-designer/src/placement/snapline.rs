use kurbo::{Rect, Vec2};

use super::{
    HorizontalEdge, PlacementBehavior, PlacementContext, PlacementError, PlacementState, PlacementType,
    VerticalEdge,
};
use crate::snapline::{Snapline, SnaplineMap, draw_lines, input_lines, snap};

/// Snaps moved items and dragged edges to the container and siblings.
pub struct SnaplinePlacementBehavior {
    base: Box<dyn PlacementBehavior>,
    map: SnaplineMap,
    drawn: Vec<Snapline>,
}

impl SnaplinePlacementBehavior {
    pub fn new(base: Box<dyn PlacementBehavior>) -> Self {
        Self {
            base,
            map: SnaplineMap::default(),
            drawn: Vec::new(),
        }
    }

    fn build_map(&mut self, ctx: &PlacementContext<'_>, state: &PlacementState) {
        let margin = ctx.settings.snapline_margin;
        let mut map = SnaplineMap::default();
        if let Some(bounds) = ctx.view.bounds(state.container) {
            let own = Rect::from_origin_size((0.0, 0.0), bounds.size());
            map.add_rect(own, 0.0, false);
            map.add_rect(own, -margin, false);
        }
        for sibling in ctx.view.visual_children(state.container) {
            if state.contains(sibling) {
                continue;
            }
            let Some(bounds) = ctx.view.bounds_in(sibling, state.container) else {
                continue;
            };
            map.add_rect(bounds, 0.0, false);
            map.add_rect(bounds, margin, true);
            if let Some(baseline) = ctx.view.baseline(sibling) {
                map.add_baseline(bounds, baseline);
            }
        }
        log::trace!(
            "snap map: {} horizontal, {} vertical",
            map.horizontal.len(),
            map.vertical.len()
        );
        self.map = map;
    }

    fn snap_move(&mut self, ctx: &PlacementContext<'_>, state: &mut PlacementState) {
        let Some(union) = state.items.iter().map(|i| i.bounds).reduce(|a, b| a.union(b)) else {
            return;
        };
        let baseline = match state.items.as_slice() {
            [single] => ctx.view.baseline(single.item),
            _ => None,
        };
        let input = input_lines(union, baseline, None);
        let accuracy = ctx.settings.snapline_accuracy;
        let dx = snap(&input.vertical, &self.map.vertical, accuracy).unwrap_or(0.0);
        let dy = snap(&input.horizontal, &self.map.horizontal, accuracy).unwrap_or(0.0);
        for info in &mut state.items {
            info.bounds = info.bounds + Vec2::new(dx, dy);
        }
        self.drawn.extend(draw_lines(&input.vertical, &self.map.vertical, dx));
        self.drawn.extend(draw_lines(&input.horizontal, &self.map.horizontal, dy));
    }

    fn snap_resize(&mut self, ctx: &PlacementContext<'_>, state: &mut PlacementState) {
        let accuracy = ctx.settings.snapline_accuracy;
        for info in &mut state.items {
            let Some(alignment) = info.resize else {
                continue;
            };
            let input = input_lines(info.bounds, None, Some(alignment));
            let dx = snap(&input.vertical, &self.map.vertical, accuracy).unwrap_or(0.0);
            let dy = snap(&input.horizontal, &self.map.horizontal, accuracy).unwrap_or(0.0);
            let b = &mut info.bounds;
            match alignment.horizontal {
                HorizontalEdge::Left => b.x0 = (b.x0 + dx).min(b.x1),
                HorizontalEdge::Right => b.x1 = (b.x1 + dx).max(b.x0),
                HorizontalEdge::Center => {}
            }
            match alignment.vertical {
                VerticalEdge::Top => b.y0 = (b.y0 + dy).min(b.y1),
                VerticalEdge::Bottom => b.y1 = (b.y1 + dy).max(b.y0),
                VerticalEdge::Center => {}
            }
            self.drawn.extend(draw_lines(&input.vertical, &self.map.vertical, dx));
            self.drawn.extend(draw_lines(&input.horizontal, &self.map.horizontal, dy));
        }
    }
}

impl PlacementBehavior for SnaplinePlacementBehavior {
    fn base(&self) -> &dyn PlacementBehavior {
        self.base.as_ref()
    }

    fn base_mut(&mut self) -> &mut dyn PlacementBehavior {
        self.base.as_mut()
    }

    fn begin_placement(&mut self, ctx: &mut PlacementContext<'_>, state: &PlacementState) -> Result<(), PlacementError> {
        self.base.begin_placement(ctx, state)?;
        self.build_map(ctx, state);
        Ok(())
    }

    fn end_placement(&mut self, ctx: &mut PlacementContext<'_>, state: &PlacementState) -> Result<(), PlacementError> {
        self.base.end_placement(ctx, state)?;
        self.map = SnaplineMap::default();
        self.drawn.clear();
        Ok(())
    }

    fn before_set_position(&mut self, ctx: &PlacementContext<'_>, state: &mut PlacementState) {
        self.base.before_set_position(ctx, state);
        self.drawn.clear();
        if !ctx.settings.use_snaplines {
            return;
        }
        match state.kind {
            PlacementType::Move | PlacementType::AddItem => self.snap_move(ctx, state),
            PlacementType::Resize => self.snap_resize(ctx, state),
            PlacementType::PasteItem | PlacementType::Delete => {}
        }
    }

    fn guide_lines(&self) -> Vec<Snapline> {
        self.drawn.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{Viewport, resolve_layout};
    use crate::placement::{DefaultPlacementBehavior, PlacementAlignment, PlacementInformation};
    use crate::settings::DesignerSettings;
    use crate::undo::UndoService;
    use pretty_assertions::assert_eq;
    use xd_core::XamlDocument;

    const DOC: &str = r#"<Canvas xmlns="http://schemas.microsoft.com/winfx/2006/xaml/presentation" Width="400" Height="300"><Rectangle Canvas.Left="100" Canvas.Top="100" Width="50" Height="50"/><Rectangle Canvas.Left="200" Canvas.Top="40" Width="20" Height="20"/></Canvas>"#;

    fn state(doc: &XamlDocument, bounds: Rect, kind: PlacementType) -> PlacementState {
        let root = doc.root_element().unwrap();
        let item = doc.object_values(doc.find_property(root, "Children").unwrap())[1];
        PlacementState {
            kind,
            container: root,
            items: vec![PlacementInformation {
                item,
                original_bounds: bounds,
                bounds,
                resize: None,
            }],
        }
    }

    #[test]
    fn moved_item_snaps_to_a_sibling_edge() {
        let mut doc = XamlDocument::parse(DOC).unwrap();
        let view = resolve_layout(&doc, Viewport::default());
        let settings = DesignerSettings::default();
        let mut undo = UndoService::new(1);
        let mut state = state(&doc, Rect::new(250.0, 40.0, 270.0, 60.0), PlacementType::Move);
        let mut ctx = PlacementContext {
            document: &mut doc,
            view: &view,
            settings: &settings,
            undo: &mut undo,
        };
        let mut behavior = SnaplinePlacementBehavior::new(Box::new(DefaultPlacementBehavior));
        behavior.begin_placement(&mut ctx, &state).unwrap();

        behavior.before_set_position(&ctx, &mut state);
        assert_eq!(state.items[0].bounds, Rect::new(250.0, 40.0, 270.0, 60.0));
        assert!(behavior.guide_lines().is_empty());

        // left edge 3 right of the sibling's right edge, top 2 below its top
        state.items[0].bounds = Rect::new(153.0, 102.0, 173.0, 122.0);
        behavior.before_set_position(&ctx, &mut state);
        assert_eq!(state.items[0].bounds, Rect::new(150.0, 100.0, 170.0, 120.0));
        assert!(!behavior.guide_lines().is_empty());

        let off = DesignerSettings {
            use_snaplines: false,
            ..settings.clone()
        };
        let ctx = PlacementContext { settings: &off, ..ctx };
        state.items[0].bounds = Rect::new(153.0, 102.0, 173.0, 122.0);
        behavior.before_set_position(&ctx, &mut state);
        assert_eq!(state.items[0].bounds, Rect::new(153.0, 102.0, 173.0, 122.0));
    }

    #[test]
    fn resize_snaps_only_the_dragged_edge() {
        let mut doc = XamlDocument::parse(DOC).unwrap();
        let view = resolve_layout(&doc, Viewport::default());
        let settings = DesignerSettings::default();
        let mut undo = UndoService::new(1);
        let mut state = state(&doc, Rect::new(200.0, 40.0, 397.0, 60.0), PlacementType::Resize);
        state.items[0].resize = Some(PlacementAlignment::RIGHT);
        let mut ctx = PlacementContext {
            document: &mut doc,
            view: &view,
            settings: &settings,
            undo: &mut undo,
        };
        let mut behavior = SnaplinePlacementBehavior::new(Box::new(DefaultPlacementBehavior));
        behavior.begin_placement(&mut ctx, &state).unwrap();
        behavior.before_set_position(&ctx, &mut state);
        assert_eq!(state.items[0].bounds, Rect::new(200.0, 40.0, 400.0, 60.0));
    }

    #[test]
    fn every_resized_item_keeps_its_guides() {
        let mut doc = XamlDocument::parse(DOC).unwrap();
        let view = resolve_layout(&doc, Viewport::default());
        let settings = DesignerSettings::default();
        let mut undo = UndoService::new(1);
        let root = doc.root_element().unwrap();
        let items = doc.object_values(doc.find_property(root, "Children").unwrap());
        let resized = |item, bounds| PlacementInformation {
            item,
            original_bounds: bounds,
            bounds,
            resize: Some(PlacementAlignment::RIGHT),
        };
        let mut state = PlacementState {
            kind: PlacementType::Resize,
            container: root,
            items: vec![
                resized(items[0], Rect::new(100.0, 100.0, 197.0, 150.0)),
                resized(items[1], Rect::new(200.0, 40.0, 389.0, 60.0)),
            ],
        };
        let mut ctx = PlacementContext {
            document: &mut doc,
            view: &view,
            settings: &settings,
            undo: &mut undo,
        };
        let mut behavior = SnaplinePlacementBehavior::new(Box::new(DefaultPlacementBehavior));
        behavior.begin_placement(&mut ctx, &state).unwrap();
        behavior.before_set_position(&ctx, &mut state);

        assert_eq!(state.items[0].bounds.x1, 200.0);
        assert_eq!(state.items[1].bounds.x1, 392.0);
        let offsets: Vec<f64> = behavior.guide_lines().iter().map(|l| l.offset).collect();
        assert_eq!(offsets, vec![200.0, 392.0]);
    }
}
