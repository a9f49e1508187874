use kurbo::{Point, Rect};

use super::{HorizontalEdge, PlacementBehavior, PlacementContext, PlacementState, PlacementType, VerticalEdge};

/// Rounds moved and resized edges to the raster when it is enabled.
pub struct RasterPlacementBehavior {
    base: Box<dyn PlacementBehavior>,
}

impl RasterPlacementBehavior {
    pub fn new(base: Box<dyn PlacementBehavior>) -> Self {
        Self { base }
    }
}

fn round_to(value: f64, raster: f64) -> f64 {
    (value / raster).round() * raster
}

fn raster_of(ctx: &PlacementContext<'_>) -> Option<f64> {
    (ctx.settings.use_raster && ctx.settings.raster > 0.0).then_some(ctx.settings.raster)
}

impl PlacementBehavior for RasterPlacementBehavior {
    fn base(&self) -> &dyn PlacementBehavior {
        self.base.as_ref()
    }

    fn base_mut(&mut self) -> &mut dyn PlacementBehavior {
        self.base.as_mut()
    }

    fn before_set_position(&mut self, ctx: &PlacementContext<'_>, state: &mut PlacementState) {
        self.base.before_set_position(ctx, state);
        let Some(raster) = raster_of(ctx) else {
            return;
        };
        for info in &mut state.items {
            let b = info.bounds;
            info.bounds = match (state.kind, info.resize) {
                (PlacementType::Resize, Some(alignment)) => {
                    let mut r = b;
                    match alignment.horizontal {
                        HorizontalEdge::Left => r.x0 = round_to(b.x0, raster).min(b.x1),
                        HorizontalEdge::Right => r.x1 = round_to(b.x1, raster).max(b.x0),
                        HorizontalEdge::Center => {}
                    }
                    match alignment.vertical {
                        VerticalEdge::Top => r.y0 = round_to(b.y0, raster).min(b.y1),
                        VerticalEdge::Bottom => r.y1 = round_to(b.y1, raster).max(b.y0),
                        VerticalEdge::Center => {}
                    }
                    r
                }
                (PlacementType::Delete, _) => b,
                _ => b.with_origin(Point::new(round_to(b.x0, raster), round_to(b.y0, raster))),
            };
        }
    }

    fn place_point(&self, ctx: &PlacementContext<'_>, point: Point) -> Point {
        let point = self.base.place_point(ctx, point);
        match raster_of(ctx) {
            Some(raster) => Point::new(round_to(point.x, raster), round_to(point.y, raster)),
            None => point,
        }
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

    #[test]
    fn rounds_only_when_enabled() {
        let mut doc = XamlDocument::parse(
            r#"<Canvas xmlns="http://schemas.microsoft.com/winfx/2006/xaml/presentation"><Rectangle /></Canvas>"#,
        )
        .unwrap();
        let view = resolve_layout(&doc, Viewport::default());
        let root = doc.root_element().unwrap();
        let item = doc.object_values(doc.find_property(root, "Children").unwrap())[0];
        let mut undo = UndoService::new(1);
        let mut behavior = RasterPlacementBehavior::new(Box::new(DefaultPlacementBehavior));
        let rect = Rect::new(13.0, 21.0, 43.0, 51.0);
        let mut state = PlacementState {
            kind: PlacementType::Move,
            container: root,
            items: vec![PlacementInformation {
                item,
                original_bounds: rect,
                bounds: rect,
                resize: None,
            }],
        };

        let off = DesignerSettings::default();
        let ctx = PlacementContext {
            document: &mut doc,
            view: &view,
            settings: &off,
            undo: &mut undo,
        };
        behavior.before_set_position(&ctx, &mut state);
        assert_eq!(state.items[0].bounds, rect);

        let on = DesignerSettings {
            use_raster: true,
            ..DesignerSettings::default()
        };
        let ctx = PlacementContext { settings: &on, ..ctx };
        behavior.before_set_position(&ctx, &mut state);
        assert_eq!(state.items[0].bounds, Rect::new(16.0, 24.0, 46.0, 54.0));
        assert_eq!(behavior.place_point(&ctx, Point::new(3.0, 5.0)), Point::new(0.0, 8.0));

        state.kind = PlacementType::Resize;
        state.items[0].bounds = rect;
        state.items[0].resize = Some(PlacementAlignment::BOTTOM_RIGHT);
        behavior.before_set_position(&ctx, &mut state);
        assert_eq!(state.items[0].bounds, Rect::new(13.0, 21.0, 40.0, 48.0));
    }
}
