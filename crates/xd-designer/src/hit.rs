//! Hit testing: point → element lookup.
//!
//! Walks the view tree front-to-back, so the last painted element wins.
//! Points are mapped through each element's render transform.

use kurbo::{Point, Rect};
use xd_core::{ObjectId, XamlDocument};

use crate::layout::is_panel;
use crate::view::ViewProvider;

fn contains(view: &(impl ViewProvider + ?Sized), obj: ObjectId, point: Point) -> bool {
    let Some(bounds) = view.bounds(obj) else {
        return false;
    };
    let transform = view.render_transform(obj);
    if transform.determinant() == 0.0 {
        return false;
    }
    bounds.contains(transform.inverse() * point)
}

/// Find the topmost element at `point`.
/// Returns `None` outside the root.
pub fn hit_test(view: &(impl ViewProvider + ?Sized), point: Point) -> Option<ObjectId> {
    view.root().and_then(|root| hit_test_node(view, root, point, &|_: ObjectId| true))
}

fn hit_test_node(
    view: &(impl ViewProvider + ?Sized),
    obj: ObjectId,
    point: Point,
    accept: &dyn Fn(ObjectId) -> bool,
) -> Option<ObjectId> {
    // Check children in reverse (topmost first)
    for child in view.visual_children(obj).into_iter().rev() {
        if let Some(hit) = hit_test_node(view, child, point, accept) {
            return Some(hit);
        }
    }
    (accept(obj) && contains(view, obj, point)).then_some(obj)
}

/// All non-root elements whose transformed bounds intersect `rect`.
/// Used for marquee selection.
pub fn hit_test_rect(view: &(impl ViewProvider + ?Sized), rect: Rect) -> Vec<ObjectId> {
    let mut result = Vec::new();
    if let Some(root) = view.root() {
        for child in view.visual_children(root) {
            collect_intersecting(view, child, rect, &mut result);
        }
    }
    result
}

fn collect_intersecting(view: &(impl ViewProvider + ?Sized), obj: ObjectId, rect: Rect, out: &mut Vec<ObjectId>) {
    if let Some(bounds) = view.transformed_bounds(obj)
        && bounds.intersect(rect).area() > 0.0
    {
        out.push(obj);
    }
    for child in view.visual_children(obj) {
        collect_intersecting(view, child, rect, out);
    }
}

/// The innermost panel at `point` that is not one of `dragged` or inside
/// them. Used to pick a drop target while moving items.
pub fn container_at(
    view: &(impl ViewProvider + ?Sized),
    doc: &XamlDocument,
    point: Point,
    dragged: &[ObjectId],
) -> Option<ObjectId> {
    let root = view.root()?;
    let accept = |obj: ObjectId| {
        is_panel(doc, obj) && !dragged.iter().any(|&d| doc.is_ancestor_or_self(d, obj))
    };
    hit_test_node(view, root, point, &accept)
}
