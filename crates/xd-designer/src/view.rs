//! The geometry a design surface exposes to placement and hit testing.

use kurbo::{Affine, Point, Rect, Vec2};
use xd_core::ObjectId;

use crate::layout::GridTracks;

/// Read-only access to laid-out elements.
///
/// All coordinates are in the space of the view's root element.
pub trait ViewProvider {
    fn root(&self) -> Option<ObjectId>;

    /// Layout slot of `obj`, before its render transform.
    fn bounds(&self, obj: ObjectId) -> Option<Rect>;

    /// Accumulated render transform of `obj` and its visual ancestors.
    fn render_transform(&self, obj: ObjectId) -> Affine;

    fn visual_parent(&self, obj: ObjectId) -> Option<ObjectId>;

    /// Visual children in z-order, back to front.
    fn visual_children(&self, obj: ObjectId) -> Vec<ObjectId>;

    /// Distance from the top of `obj` to its first text baseline.
    fn baseline(&self, _obj: ObjectId) -> Option<f64> {
        None
    }

    /// Resolved rows and columns when `obj` is a grid.
    fn grid_tracks(&self, _obj: ObjectId) -> Option<&GridTracks> {
        None
    }

    /// Bounding box of `obj` after its render transform.
    fn transformed_bounds(&self, obj: ObjectId) -> Option<Rect> {
        let bounds = self.bounds(obj)?;
        Some(self.render_transform(obj).transform_rect_bbox(bounds))
    }

    /// Transformed bounds of `obj` relative to the top-left of `container`.
    fn bounds_in(&self, obj: ObjectId, container: ObjectId) -> Option<Rect> {
        let origin = self.bounds(container)?.origin().to_vec2();
        Some(self.transformed_bounds(obj)? - origin)
    }

    /// Offset that maps `from`-relative coordinates to `to`-relative ones.
    fn offset_between(&self, from: ObjectId, to: ObjectId) -> Option<Vec2> {
        let a = self.bounds(from)?.origin();
        let b = self.bounds(to)?.origin();
        Some(a - b)
    }

    fn transform_point(&self, point: Point, from: ObjectId, to: ObjectId) -> Option<Point> {
        Some(point + self.offset_between(from, to)?)
    }
}
