//! Measure/arrange layout over the live instances.
//!
//! Produces a `LayoutView`: a petgraph tree of laid-out elements with
//! their slots, accumulated render transforms and text baselines. Panels
//! follow the usual WPF rules: Canvas positions children absolutely,
//! StackPanel stacks them, Grid sizes pixel/auto/star tracks, Border and
//! content controls inset their single child.

use std::collections::HashMap;

use kurbo::{Affine, Point, Rect, Size, Vec2};
use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use xd_core::{GridLength, GridUnit, InstanceId, ObjectId, Thickness, Value, XamlDocument};

use crate::view::ViewProvider;

/// Approximate glyph metrics, relative to the font size.
const CHAR_WIDTH: f64 = 0.6;
const LINE_HEIGHT: f64 = 4.0 / 3.0;
const ASCENT: f64 = 1.0;

/// The design surface dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
        }
    }
}

/// One laid-out element.
#[derive(Debug, Clone)]
pub struct ViewNode {
    pub object: ObjectId,
    /// Layout slot in root coordinates, margin excluded.
    pub bounds: Rect,
    /// Render transform of this element and its ancestors.
    pub transform: Affine,
    /// Offset of the first text baseline from `bounds.y0`.
    pub baseline: Option<f64>,
}

/// A resolved row or column, relative to the grid's top-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Track {
    pub offset: f64,
    pub size: f64,
}

impl Track {
    pub fn end(&self) -> f64 {
        self.offset + self.size
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridTracks {
    pub columns: Vec<Track>,
    pub rows: Vec<Track>,
}

impl GridTracks {
    /// Column containing `x`, clamped to the grid.
    pub fn column_at(&self, x: f64) -> usize {
        track_at(&self.columns, x)
    }

    pub fn row_at(&self, y: f64) -> usize {
        track_at(&self.rows, y)
    }

    /// Rectangle covered by a cell and its spans, relative to the grid.
    pub fn cell(&self, column: usize, row: usize, column_span: usize, row_span: usize) -> Rect {
        let span = |tracks: &[Track], start: usize, len: usize| -> (f64, f64) {
            let Some(first) = tracks.get(start) else {
                return (0.0, 0.0);
            };
            let last = tracks
                .get(start + len.max(1) - 1)
                .or(tracks.last())
                .unwrap_or(first);
            (first.offset, last.end())
        };
        let (x0, x1) = span(&self.columns, column, column_span);
        let (y0, y1) = span(&self.rows, row, row_span);
        Rect::new(x0, y0, x1, y1)
    }
}

fn track_at(tracks: &[Track], pos: f64) -> usize {
    tracks
        .iter()
        .position(|t| pos < t.end())
        .unwrap_or(tracks.len().saturating_sub(1))
}

/// Laid-out element tree.
#[derive(Debug, Default)]
pub struct LayoutView {
    graph: StableDiGraph<ViewNode, ()>,
    root: Option<NodeIndex>,
    index: HashMap<ObjectId, NodeIndex>,
    grids: HashMap<ObjectId, GridTracks>,
}

impl LayoutView {
    pub fn node(&self, obj: ObjectId) -> Option<&ViewNode> {
        self.index.get(&obj).map(|&idx| &self.graph[idx])
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn contains(&self, obj: ObjectId) -> bool {
        self.index.contains_key(&obj)
    }

    fn add_node(&mut self, parent: Option<NodeIndex>, node: ViewNode) -> NodeIndex {
        let obj = node.object;
        let idx = self.graph.add_node(node);
        match parent {
            Some(parent) => {
                self.graph.add_edge(parent, idx, ());
            }
            None => self.root = Some(idx),
        }
        self.index.insert(obj, idx);
        idx
    }

    /// Children in insertion (document) order.
    fn children_of(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut children: Vec<NodeIndex> = self.graph.neighbors_directed(idx, Direction::Outgoing).collect();
        children.sort();
        children
    }
}

impl ViewProvider for LayoutView {
    fn root(&self) -> Option<ObjectId> {
        self.root.map(|idx| self.graph[idx].object)
    }

    fn bounds(&self, obj: ObjectId) -> Option<Rect> {
        self.node(obj).map(|n| n.bounds)
    }

    fn render_transform(&self, obj: ObjectId) -> Affine {
        self.node(obj).map_or(Affine::IDENTITY, |n| n.transform)
    }

    fn visual_parent(&self, obj: ObjectId) -> Option<ObjectId> {
        let idx = *self.index.get(&obj)?;
        self.graph
            .neighbors_directed(idx, Direction::Incoming)
            .next()
            .map(|p| self.graph[p].object)
    }

    fn visual_children(&self, obj: ObjectId) -> Vec<ObjectId> {
        self.index
            .get(&obj)
            .map(|&idx| self.children_of(idx).into_iter().map(|c| self.graph[c].object).collect())
            .unwrap_or_default()
    }

    fn baseline(&self, obj: ObjectId) -> Option<f64> {
        self.node(obj).and_then(|n| n.baseline)
    }

    fn grid_tracks(&self, obj: ObjectId) -> Option<&GridTracks> {
        self.grids.get(&obj)
    }
}

/// Lay out the document's root element inside `viewport`.
pub fn resolve_layout(doc: &XamlDocument, viewport: Viewport) -> LayoutView {
    let mut solver = Solver {
        doc,
        view: LayoutView::default(),
    };
    if let Some(root) = doc.root_element().filter(|&r| is_element(doc, r))
        && let Some(inst) = doc.instance_of(root)
    {
        let margin = solver.thickness(inst, "Margin");
        let width = solver.number(inst, "Width");
        let height = solver.number(inst, "Height");
        let slot = Size::new(
            if width.is_nan() { viewport.width } else { width + margin.left + margin.right },
            if height.is_nan() { viewport.height } else { height + margin.top + margin.bottom },
        );
        solver.arrange(None, root, slot.to_rect(), Affine::IDENTITY);
    }
    log::debug!("laid out {} elements", solver.view.len());
    solver.view
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Kind {
    Canvas,
    Stack,
    Grid,
    Panel,
    Border,
    Content,
    Text,
    Leaf,
}

fn kind_of(doc: &XamlDocument, obj: ObjectId) -> Kind {
    let registry = doc.registry();
    for ty in registry.ancestry(doc.object(obj).element_type()) {
        match registry.type_name(ty) {
            "Canvas" => return Kind::Canvas,
            "StackPanel" => return Kind::Stack,
            "Grid" => return Kind::Grid,
            "Panel" => return Kind::Panel,
            "Border" => return Kind::Border,
            "ContentControl" => return Kind::Content,
            "TextBlock" | "TextBox" => return Kind::Text,
            _ => {}
        }
    }
    Kind::Leaf
}

/// Whether `obj` takes part in layout.
pub fn is_element(doc: &XamlDocument, obj: ObjectId) -> bool {
    let registry = doc.registry();
    registry
        .ancestry(doc.object(obj).element_type())
        .any(|t| registry.type_name(t) == "FrameworkElement")
}

/// Whether `obj` lays out a list of children.
pub fn is_panel(doc: &XamlDocument, obj: ObjectId) -> bool {
    matches!(
        kind_of(doc, obj),
        Kind::Canvas | Kind::Stack | Kind::Grid | Kind::Panel
    )
}

/// Elements laid out inside `obj`, in document order.
pub fn layout_children(doc: &XamlDocument, obj: ObjectId) -> Vec<ObjectId> {
    let member = match kind_of(doc, obj) {
        Kind::Canvas | Kind::Stack | Kind::Grid | Kind::Panel => "Children",
        Kind::Border => "Child",
        Kind::Content => "Content",
        Kind::Text | Kind::Leaf => return Vec::new(),
    };
    doc.find_property(obj, member)
        .map(|p| doc.object_values(p))
        .unwrap_or_default()
        .into_iter()
        .filter(|&c| is_element(doc, c))
        .collect()
}

struct Solver<'d> {
    doc: &'d XamlDocument,
    view: LayoutView,
}

impl Solver<'_> {
    fn number(&self, inst: InstanceId, key: &str) -> f64 {
        self.doc.instance_value(inst, key).as_f64().unwrap_or(f64::NAN)
    }

    fn thickness(&self, inst: InstanceId, key: &str) -> Thickness {
        self.doc.instance_value(inst, key).as_thickness().unwrap_or_default()
    }

    fn is_member(&self, inst: InstanceId, key: &str, member: &str) -> bool {
        self.doc
            .instance_value(inst, key)
            .as_enum()
            .is_some_and(|n| n.as_str() == member)
    }

    fn font_size(&self, inst: InstanceId) -> f64 {
        let size = self.number(inst, "FontSize");
        if size.is_nan() { 12.0 } else { size }
    }

    /// Border thickness plus padding.
    fn chrome(&self, inst: InstanceId) -> Thickness {
        let border = self.thickness(inst, "BorderThickness");
        let padding = self.thickness(inst, "Padding");
        Thickness::new(
            border.left + padding.left,
            border.top + padding.top,
            border.right + padding.right,
            border.bottom + padding.bottom,
        )
    }

    /// Text shown directly by `inst`, for text blocks and content controls.
    fn text_content(&self, inst: InstanceId, kind: Kind) -> Option<String> {
        let key = match kind {
            Kind::Text => "Text",
            Kind::Content => "Content",
            _ => return None,
        };
        match self.doc.instance_value(inst, key) {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    fn text_size(&self, text: &str, font_size: f64) -> Size {
        let lines = text.lines().count().max(1);
        let widest = text.lines().map(|l| l.chars().count()).max().unwrap_or(0);
        Size::new(
            widest as f64 * font_size * CHAR_WIDTH,
            lines as f64 * font_size * LINE_HEIGHT,
        )
    }

    /// Desired size of `obj`, margin included.
    fn measure(&self, obj: ObjectId, available: Size) -> Size {
        let Some(inst) = self.doc.instance_of(obj) else {
            return Size::ZERO;
        };
        let margin = self.thickness(inst, "Margin");
        let width = self.number(inst, "Width");
        let height = self.number(inst, "Height");
        let inner = Size::new(
            if width.is_nan() {
                (available.width - margin.left - margin.right).max(0.0)
            } else {
                width
            },
            if height.is_nan() {
                (available.height - margin.top - margin.bottom).max(0.0)
            } else {
                height
            },
        );
        let content = self.measure_content(obj, inst, inner);
        let width = if width.is_nan() {
            content.width.max(self.number(inst, "MinWidth"))
        } else {
            width
        };
        let height = if height.is_nan() {
            content.height.max(self.number(inst, "MinHeight"))
        } else {
            height
        };
        Size::new(
            width + margin.left + margin.right,
            height + margin.top + margin.bottom,
        )
    }

    fn measure_content(&self, obj: ObjectId, inst: InstanceId, available: Size) -> Size {
        let kind = kind_of(self.doc, obj);
        let children = layout_children(self.doc, obj);
        match kind {
            Kind::Text | Kind::Border | Kind::Content => {
                let chrome = self.chrome(inst);
                let inner = Size::new(
                    (available.width - chrome.left - chrome.right).max(0.0),
                    (available.height - chrome.top - chrome.bottom).max(0.0),
                );
                let content = match (children.first(), self.text_content(inst, kind)) {
                    (Some(&child), _) => self.measure(child, inner),
                    (None, Some(text)) => self.text_size(&text, self.font_size(inst)),
                    (None, None) => Size::ZERO,
                };
                Size::new(
                    content.width + chrome.left + chrome.right,
                    content.height + chrome.top + chrome.bottom,
                )
            }
            Kind::Stack => {
                let horizontal = self.is_member(inst, "Orientation", "Horizontal");
                children.iter().fold(Size::ZERO, |acc, &child| {
                    let d = if horizontal {
                        self.measure(child, Size::new(f64::INFINITY, available.height))
                    } else {
                        self.measure(child, Size::new(available.width, f64::INFINITY))
                    };
                    if horizontal {
                        Size::new(acc.width + d.width, acc.height.max(d.height))
                    } else {
                        Size::new(acc.width.max(d.width), acc.height + d.height)
                    }
                })
            }
            Kind::Grid => {
                let tracks = self.grid_tracks(obj, available, &children);
                Size::new(
                    tracks.columns.last().map_or(0.0, Track::end),
                    tracks.rows.last().map_or(0.0, Track::end),
                )
            }
            Kind::Panel => children.iter().fold(Size::ZERO, |acc, &child| {
                let d = self.measure(child, available);
                Size::new(acc.width.max(d.width), acc.height.max(d.height))
            }),
            Kind::Canvas | Kind::Leaf => Size::ZERO,
        }
    }

    /// Place `obj` inside `slot` and recurse into its children.
    fn arrange(&mut self, parent: Option<NodeIndex>, obj: ObjectId, slot: Rect, parent_transform: Affine) {
        let Some(inst) = self.doc.instance_of(obj) else {
            return;
        };
        let margin = self.thickness(inst, "Margin");
        let inner = Rect::new(
            slot.x0 + margin.left,
            slot.y0 + margin.top,
            (slot.x1 - margin.right).max(slot.x0 + margin.left),
            (slot.y1 - margin.bottom).max(slot.y0 + margin.top),
        );
        let desired = self.measure(obj, slot.size());
        let desired = Size::new(
            desired.width - margin.left - margin.right,
            desired.height - margin.top - margin.bottom,
        );

        let (x, width) = self.align(
            inner.x0,
            inner.width(),
            self.number(inst, "Width"),
            desired.width,
            [
                ("HorizontalAlignment", "Left"),
                ("HorizontalAlignment", "Right"),
                ("HorizontalAlignment", "Stretch"),
            ],
            inst,
        );
        let (y, height) = self.align(
            inner.y0,
            inner.height(),
            self.number(inst, "Height"),
            desired.height,
            [
                ("VerticalAlignment", "Top"),
                ("VerticalAlignment", "Bottom"),
                ("VerticalAlignment", "Stretch"),
            ],
            inst,
        );
        let bounds = Rect::new(x, y, x + width, y + height);
        let transform = parent_transform * self.element_transform(inst, bounds);

        let kind = kind_of(self.doc, obj);
        let chrome = self.chrome(inst);
        let baseline = match kind {
            Kind::Text | Kind::Content if self.text_content(inst, kind).is_some() => {
                Some(chrome.top + self.font_size(inst) * ASCENT)
            }
            _ => None,
        };
        let idx = self.view.add_node(
            parent,
            ViewNode {
                object: obj,
                bounds,
                transform,
                baseline,
            },
        );

        let children = layout_children(self.doc, obj);
        match kind {
            Kind::Canvas => {
                for child in children {
                    let slot = self.canvas_slot(child, bounds);
                    self.arrange(Some(idx), child, slot, transform);
                }
            }
            Kind::Stack => {
                let horizontal = self.is_member(inst, "Orientation", "Horizontal");
                let mut cursor = if horizontal { bounds.x0 } else { bounds.y0 };
                for child in children {
                    let slot = if horizontal {
                        let d = self.measure(child, Size::new(f64::INFINITY, bounds.height()));
                        Rect::new(cursor, bounds.y0, cursor + d.width, bounds.y1)
                    } else {
                        let d = self.measure(child, Size::new(bounds.width(), f64::INFINITY));
                        Rect::new(bounds.x0, cursor, bounds.x1, cursor + d.height)
                    };
                    cursor = if horizontal { slot.x1 } else { slot.y1 };
                    self.arrange(Some(idx), child, slot, transform);
                }
            }
            Kind::Grid => {
                let tracks = self.grid_tracks(obj, bounds.size(), &children);
                for &child in &children {
                    let (column, row, column_span, row_span) =
                        self.cell_of(child, tracks.columns.len(), tracks.rows.len());
                    let slot = tracks.cell(column, row, column_span, row_span) + bounds.origin().to_vec2();
                    self.arrange(Some(idx), child, slot, transform);
                }
                self.view.grids.insert(obj, tracks);
            }
            Kind::Panel => {
                for child in children {
                    self.arrange(Some(idx), child, bounds, transform);
                }
            }
            Kind::Border | Kind::Content => {
                let inner = Rect::new(
                    bounds.x0 + chrome.left,
                    bounds.y0 + chrome.top,
                    (bounds.x1 - chrome.right).max(bounds.x0 + chrome.left),
                    (bounds.y1 - chrome.bottom).max(bounds.y0 + chrome.top),
                );
                if let Some(&child) = children.first() {
                    self.arrange(Some(idx), child, inner, transform);
                }
            }
            Kind::Text | Kind::Leaf => {}
        }
    }

    /// Position and length along one axis. `names` holds the start, end
    /// and stretch alignment members.
    fn align(
        &self,
        start: f64,
        available: f64,
        explicit: f64,
        desired: f64,
        names: [(&str, &str); 3],
        inst: InstanceId,
    ) -> (f64, f64) {
        let [(key, near), (_, far), (_, stretch)] = names;
        let stretched = self.is_member(inst, key, stretch);
        let length = if !explicit.is_nan() {
            explicit
        } else if stretched {
            available
        } else {
            desired.min(available)
        };
        let offset = if self.is_member(inst, key, near) {
            0.0
        } else if self.is_member(inst, key, far) {
            available - length
        } else {
            (available - length) / 2.0
        };
        (start + offset, length)
    }

    fn canvas_slot(&self, child: ObjectId, canvas: Rect) -> Rect {
        let desired = self.measure(child, Size::new(f64::INFINITY, f64::INFINITY));
        let Some(inst) = self.doc.instance_of(child) else {
            return Rect::from_origin_size(canvas.origin(), desired);
        };
        let left = self.number(inst, "Canvas.Left");
        let top = self.number(inst, "Canvas.Top");
        let right = self.number(inst, "Canvas.Right");
        let bottom = self.number(inst, "Canvas.Bottom");
        let x = if !left.is_nan() {
            canvas.x0 + left
        } else if !right.is_nan() {
            canvas.x1 - right - desired.width
        } else {
            canvas.x0
        };
        let y = if !top.is_nan() {
            canvas.y0 + top
        } else if !bottom.is_nan() {
            canvas.y1 - bottom - desired.height
        } else {
            canvas.y0
        };
        Rect::from_origin_size(Point::new(x, y), desired)
    }

    /// Column, row and spans of a grid child, clamped to the grid.
    fn cell_of(&self, child: ObjectId, columns: usize, rows: usize) -> (usize, usize, usize, usize) {
        let Some(inst) = self.doc.instance_of(child) else {
            return (0, 0, 1, 1);
        };
        let read = |key: &str, default: i64| self.doc.instance_value(inst, key).as_i64().unwrap_or(default);
        let clamp = |index: i64, count: usize| (index.max(0) as usize).min(count.saturating_sub(1));
        let column = clamp(read("Grid.Column", 0), columns);
        let row = clamp(read("Grid.Row", 0), rows);
        let column_span = (read("Grid.ColumnSpan", 1).max(1) as usize).min(columns - column);
        let row_span = (read("Grid.RowSpan", 1).max(1) as usize).min(rows - row);
        (column, row, column_span, row_span)
    }

    fn definitions(&self, grid: ObjectId, collection: &str, member: &str) -> Vec<GridLength> {
        let lengths: Vec<GridLength> = self
            .doc
            .find_property(grid, collection)
            .map(|p| self.doc.object_values(p))
            .unwrap_or_default()
            .into_iter()
            .filter_map(|def| self.doc.instance_of(def))
            .map(|inst| match self.doc.instance_value(inst, member) {
                Value::GridLength(g) => g,
                _ => GridLength::star(1.0),
            })
            .collect();
        if lengths.is_empty() { vec![GridLength::star(1.0)] } else { lengths }
    }

    fn grid_tracks(&self, grid: ObjectId, available: Size, children: &[ObjectId]) -> GridTracks {
        let columns = self.definitions(grid, "ColumnDefinitions", "Width");
        let rows = self.definitions(grid, "RowDefinitions", "Height");
        let mut column_content = vec![0.0_f64; columns.len()];
        let mut row_content = vec![0.0_f64; rows.len()];
        for &child in children {
            let (column, row, column_span, row_span) = self.cell_of(child, columns.len(), rows.len());
            let desired = self.measure(child, Size::new(f64::INFINITY, f64::INFINITY));
            if column_span == 1 {
                column_content[column] = column_content[column].max(desired.width);
            }
            if row_span == 1 {
                row_content[row] = row_content[row].max(desired.height);
            }
        }
        GridTracks {
            columns: resolve_tracks(&columns, &column_content, available.width),
            rows: resolve_tracks(&rows, &row_content, available.height),
        }
    }

    /// Render transform of one element, in root coordinates.
    fn element_transform(&self, inst: InstanceId, bounds: Rect) -> Affine {
        let Some(transform) = self.doc.instance_value(inst, "RenderTransform").as_instance() else {
            return Affine::IDENTITY;
        };
        let (ox, oy) = match self.doc.instance_value(inst, "RenderTransformOrigin") {
            Value::Point(x, y) => (x, y),
            _ => (0.0, 0.0),
        };
        let origin = bounds.origin().to_vec2() + Vec2::new(ox * bounds.width(), oy * bounds.height());
        Affine::translate(origin) * self.transform_value(transform) * Affine::translate(-origin)
    }

    /// A transform instance in its element's local coordinates.
    fn transform_value(&self, transform: InstanceId) -> Affine {
        let registry = self.doc.registry();
        let n = |key: &str| {
            let v = self.number(transform, key);
            if v.is_nan() { 0.0 } else { v }
        };
        let about = |center: Vec2, inner: Affine| Affine::translate(center) * inner * Affine::translate(-center);
        let center = Vec2::new(n("CenterX"), n("CenterY"));
        match registry.type_name(self.doc.instances().type_of(transform)) {
            "RotateTransform" => about(center, Affine::rotate(n("Angle").to_radians())),
            "ScaleTransform" => about(
                center,
                Affine::scale_non_uniform(
                    self.doc.instance_value(transform, "ScaleX").as_f64().unwrap_or(1.0),
                    self.doc.instance_value(transform, "ScaleY").as_f64().unwrap_or(1.0),
                ),
            ),
            "SkewTransform" => about(
                center,
                Affine::skew(n("AngleX").to_radians().tan(), n("AngleY").to_radians().tan()),
            ),
            "TranslateTransform" => Affine::translate(Vec2::new(n("X"), n("Y"))),
            "TransformGroup" => {
                let Some(children) = self.doc.instance_value(transform, "Children").as_instance() else {
                    return Affine::IDENTITY;
                };
                self.doc
                    .instances()
                    .items(children)
                    .iter()
                    .filter_map(Value::as_instance)
                    .fold(Affine::IDENTITY, |acc, child| self.transform_value(child) * acc)
            }
            _ => Affine::IDENTITY,
        }
    }
}

/// Size tracks: pixels as given, auto to content, stars share the rest.
fn resolve_tracks(definitions: &[GridLength], content: &[f64], available: f64) -> Vec<Track> {
    let fixed: f64 = definitions
        .iter()
        .zip(content)
        .map(|(d, c)| match d.unit {
            GridUnit::Pixel => d.value,
            GridUnit::Auto => *c,
            GridUnit::Star => 0.0,
        })
        .sum();
    let stars: f64 = definitions
        .iter()
        .filter(|d| d.unit == GridUnit::Star)
        .map(|d| d.value)
        .sum();
    let remaining = (available - fixed).max(0.0);

    let mut offset = 0.0;
    definitions
        .iter()
        .zip(content)
        .map(|(d, c)| {
            let size = match d.unit {
                GridUnit::Pixel => d.value,
                GridUnit::Auto => *c,
                GridUnit::Star if available.is_finite() && stars > 0.0 => remaining * d.value / stars,
                GridUnit::Star => *c,
            };
            let track = Track { offset, size };
            offset += size;
            track
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const NS: &str = r#"xmlns="http://schemas.microsoft.com/winfx/2006/xaml/presentation" xmlns:x="http://schemas.microsoft.com/winfx/2006/xaml""#;

    fn layout(body: &str) -> (XamlDocument, LayoutView) {
        let doc = XamlDocument::parse(&body.replace("NS", NS)).unwrap();
        let view = resolve_layout(&doc, Viewport::default());
        (doc, view)
    }

    fn named(doc: &XamlDocument, name: &str) -> ObjectId {
        doc.find_by_name(doc.root_element().unwrap(), name).unwrap()
    }

    #[test]
    fn canvas_children_sit_at_their_offsets() {
        let (doc, view) = layout(
            r#"<Canvas NS><Rectangle x:Name="a" Canvas.Left="10" Canvas.Top="20" Width="30" Height="40"/><Rectangle x:Name="b" Canvas.Right="10" Canvas.Bottom="10" Width="50" Height="50"/></Canvas>"#,
        );
        assert_eq!(view.bounds(named(&doc, "a")), Some(Rect::new(10.0, 20.0, 40.0, 60.0)));
        assert_eq!(view.bounds(named(&doc, "b")), Some(Rect::new(740.0, 540.0, 790.0, 590.0)));
        assert_eq!(view.visual_children(doc.root_element().unwrap()).len(), 2);
    }

    #[test]
    fn stack_panel_stacks_in_document_order() {
        let (doc, view) = layout(
            r#"<StackPanel NS Width="100"><Rectangle x:Name="a" Height="20"/><Rectangle x:Name="b" Height="30" Margin="5"/></StackPanel>"#,
        );
        assert_eq!(view.bounds(named(&doc, "a")), Some(Rect::new(0.0, 0.0, 100.0, 20.0)));
        assert_eq!(view.bounds(named(&doc, "b")), Some(Rect::new(5.0, 25.0, 95.0, 55.0)));
    }

    #[test]
    fn grid_tracks_share_star_space() {
        let (doc, view) = layout(
            r#"<Grid NS Width="300" Height="100"><Grid.ColumnDefinitions><ColumnDefinition Width="100"/><ColumnDefinition Width="*"/><ColumnDefinition Width="3*"/></Grid.ColumnDefinitions><Rectangle x:Name="r" Grid.Column="2"/></Grid>"#,
        );
        let grid = doc.root_element().unwrap();
        let tracks = view.grid_tracks(grid).unwrap();
        assert_eq!(
            tracks.columns,
            vec![
                Track { offset: 0.0, size: 100.0 },
                Track { offset: 100.0, size: 50.0 },
                Track { offset: 150.0, size: 150.0 },
            ]
        );
        assert_eq!(tracks.column_at(120.0), 1);
        assert_eq!(tracks.column_at(1000.0), 2);
        assert_eq!(view.bounds(named(&doc, "r")), Some(Rect::new(150.0, 0.0, 300.0, 100.0)));
    }

    #[test]
    fn auto_columns_fit_their_content() {
        let (doc, view) = layout(
            r#"<Grid NS Width="200"><Grid.ColumnDefinitions><ColumnDefinition Width="Auto"/><ColumnDefinition/></Grid.ColumnDefinitions><Rectangle Width="40"/></Grid>"#,
        );
        let tracks = view.grid_tracks(doc.root_element().unwrap()).unwrap();
        assert_eq!(tracks.columns[0].size, 40.0);
        assert_eq!(tracks.columns[1], Track { offset: 40.0, size: 160.0 });
    }

    #[test]
    fn border_insets_its_child_and_text_has_a_baseline() {
        let (doc, view) = layout(
            r#"<Canvas NS><Border x:Name="b" BorderThickness="2" Padding="3"><TextBlock x:Name="t" Text="Hi" FontSize="10"/></Border></Canvas>"#,
        );
        let border = view.bounds(named(&doc, "b")).unwrap();
        let text = view.bounds(named(&doc, "t")).unwrap();
        assert_eq!(text.origin(), Point::new(5.0, 5.0));
        assert_eq!(border.width(), text.width() + 10.0);
        assert_eq!(view.baseline(named(&doc, "t")), Some(10.0));
    }

    #[test]
    fn render_transforms_rotate_about_the_origin_point() {
        let (doc, view) = layout(
            r#"<Canvas NS><Rectangle x:Name="r" Canvas.Left="100" Canvas.Top="100" Width="20" Height="10" RenderTransformOrigin="0.5,0.5"><Rectangle.RenderTransform><RotateTransform Angle="90"/></Rectangle.RenderTransform></Rectangle></Canvas>"#,
        );
        let rotated = view.transformed_bounds(named(&doc, "r")).unwrap();
        let round = |v: f64| (v * 1000.0).round() / 1000.0;
        assert_eq!(
            (round(rotated.x0), round(rotated.y0), round(rotated.x1), round(rotated.y1)),
            (105.0, 95.0, 115.0, 115.0)
        );
    }
}
