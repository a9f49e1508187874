use xd_core::{GridLength, Name, ObjectId, PropertyId, Thickness, Value, XamlDocument};

use super::behavior::length;
use super::{PlacementBehavior, PlacementContext, PlacementError, PlacementInformation, PlacementState, PlacementType};
use crate::layout::Track;
use crate::view::ViewProvider;

const CANVAS_OFFSETS: [&str; 4] = ["Canvas.Left", "Canvas.Top", "Canvas.Right", "Canvas.Bottom"];
const CELL_MEMBERS: [&str; 7] = [
    "Grid.Row",
    "Grid.Column",
    "Grid.RowSpan",
    "Grid.ColumnSpan",
    "Margin",
    "HorizontalAlignment",
    "VerticalAlignment",
];

/// Places children into the cell under their bounds and keeps them there
/// with alignment and margin.
pub struct GridPlacementBehavior {
    base: Box<dyn PlacementBehavior>,
}

impl GridPlacementBehavior {
    pub fn new(base: Box<dyn PlacementBehavior>) -> Self {
        Self { base }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Near,
    Far,
    Stretch,
}

impl Align {
    fn suggest(near_gap: f64, far_gap: f64) -> Self {
        if near_gap.abs() < 1.0 && far_gap.abs() < 1.0 {
            Align::Stretch
        } else if near_gap <= far_gap {
            Align::Near
        } else {
            Align::Far
        }
    }

    /// Margins on the near and far side for the given gaps.
    fn margins(self, near_gap: f64, far_gap: f64) -> (f64, f64) {
        match self {
            Align::Near => (near_gap, 0.0),
            Align::Far => (0.0, far_gap),
            Align::Stretch => (near_gap, far_gap),
        }
    }
}

fn round(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn set_cell_index(
    ctx: &mut PlacementContext<'_>,
    item: ObjectId,
    name: &str,
    value: usize,
    default: usize,
) -> Result<(), PlacementError> {
    if value == default && !ctx.is_member_set(item, name) {
        return Ok(());
    }
    ctx.set_member(item, name, Value::Int(value as i64))?;
    Ok(())
}

impl PlacementBehavior for GridPlacementBehavior {
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
        let view = ctx.view;
        let Some(tracks) = view.grid_tracks(state.container) else {
            return Ok(());
        };
        let b = info.bounds;
        let column = tracks.column_at(b.x0);
        let row = tracks.row_at(b.y0);
        let column_span = tracks.column_at((b.x1 - 1.0).max(b.x0)).max(column) - column + 1;
        let row_span = tracks.row_at((b.y1 - 1.0).max(b.y0)).max(row) - row + 1;
        set_cell_index(ctx, info.item, "Grid.Column", column, 0)?;
        set_cell_index(ctx, info.item, "Grid.Row", row, 0)?;
        set_cell_index(ctx, info.item, "Grid.ColumnSpan", column_span, 1)?;
        set_cell_index(ctx, info.item, "Grid.RowSpan", row_span, 1)?;

        let cell = tracks.cell(column, row, column_span, row_span);
        let (left_gap, right_gap) = (b.x0 - cell.x0, cell.x1 - b.x1);
        let (top_gap, bottom_gap) = (b.y0 - cell.y0, cell.y1 - b.y1);
        let horizontal = Align::suggest(left_gap, right_gap);
        let vertical = Align::suggest(top_gap, bottom_gap);
        let (left, right) = horizontal.margins(left_gap, right_gap);
        let (top, bottom) = vertical.margins(top_gap, bottom_gap);
        let margin = Thickness::new(round(left), round(top), round(right), round(bottom));
        ctx.set_member_if_changed(info.item, "Margin", Value::Thickness(margin))?;

        let names = [
            ("HorizontalAlignment", horizontal, ["Left", "Right", "Stretch"], "Width", b.width()),
            ("VerticalAlignment", vertical, ["Top", "Bottom", "Stretch"], "Height", b.height()),
        ];
        for (member, align, [near, far, stretch], size_member, size) in names {
            let name = match align {
                Align::Near => near,
                Align::Far => far,
                Align::Stretch => stretch,
            };
            ctx.set_member_if_changed(info.item, member, Value::Enum(Name::intern(name)))?;
            if align != Align::Stretch && ctx.number(info.item, size_member).is_nan() {
                ctx.set_member(info.item, size_member, length(size))?;
            }
        }
        Ok(())
    }

    fn enter_container(&mut self, ctx: &mut PlacementContext<'_>, state: &PlacementState) -> Result<(), PlacementError> {
        self.base.enter_container(ctx, state)?;
        for info in &state.items {
            for name in CANVAS_OFFSETS {
                ctx.reset_member(info.item, name)?;
            }
            if state.kind == PlacementType::PasteItem {
                let offset = ctx.settings.paste_offset;
                let m = ctx.thickness(info.item, "Margin");
                let shifted = Thickness::new(m.left + offset, m.top + offset, m.right, m.bottom);
                ctx.set_member(info.item, "Margin", Value::Thickness(shifted))?;
            }
        }
        Ok(())
    }

    fn leave_container(&mut self, ctx: &mut PlacementContext<'_>, state: &PlacementState) -> Result<(), PlacementError> {
        if state.kind != PlacementType::Delete {
            for info in &state.items {
                for name in CELL_MEMBERS {
                    ctx.reset_member(info.item, name)?;
                }
            }
        }
        self.base.leave_container(ctx, state)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackAxis {
    Column,
    Row,
}

impl TrackAxis {
    fn collection(self) -> &'static str {
        match self {
            TrackAxis::Column => "ColumnDefinitions",
            TrackAxis::Row => "RowDefinitions",
        }
    }

    fn size_member(self) -> &'static str {
        match self {
            TrackAxis::Column => "Width",
            TrackAxis::Row => "Height",
        }
    }
}

/// Splitter lines of one grid, recomputed only after the grid's row or
/// column definitions change.
#[derive(Debug, Clone)]
pub struct GridSplitterState {
    grid: ObjectId,
    cursor: usize,
    dirty: bool,
    column_lines: Vec<f64>,
    row_lines: Vec<f64>,
}

impl GridSplitterState {
    pub fn new(grid: ObjectId, doc: &XamlDocument) -> Self {
        Self {
            grid,
            cursor: doc.changes().cursor(),
            dirty: true,
            column_lines: Vec::new(),
            row_lines: Vec::new(),
        }
    }

    pub fn grid(&self) -> ObjectId {
        self.grid
    }

    /// Scan document changes since the last call and mark the lines stale
    /// if a definition was added, removed or resized.
    pub fn observe(&mut self, doc: &XamlDocument) -> bool {
        let touches_definitions = |prop: PropertyId| {
            let p = doc.property(prop);
            let owner = p.parent_object();
            if owner == self.grid {
                return matches!(p.name(), "ColumnDefinitions" | "RowDefinitions");
            }
            doc.parent_object(owner) == Some(self.grid)
                && matches!(doc.type_name(owner), "ColumnDefinition" | "RowDefinition")
        };
        if doc
            .changes()
            .since(self.cursor)
            .iter()
            .filter_map(|change| change.property())
            .any(touches_definitions)
        {
            self.dirty = true;
        }
        self.cursor = doc.changes().cursor();
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Recompute the lines from `view` if stale. Returns whether they were
    /// recomputed.
    pub fn flush_if_dirty(&mut self, view: &(impl ViewProvider + ?Sized)) -> bool {
        if !self.dirty {
            return false;
        }
        let interior = |tracks: &[Track]| -> Vec<f64> {
            tracks
                .split_last()
                .map(|(_, rest)| rest.iter().map(Track::end).collect())
                .unwrap_or_default()
        };
        match view.grid_tracks(self.grid) {
            Some(tracks) => {
                self.column_lines = interior(&tracks.columns);
                self.row_lines = interior(&tracks.rows);
            }
            None => {
                self.column_lines.clear();
                self.row_lines.clear();
            }
        }
        self.dirty = false;
        true
    }

    /// Interior column boundaries, relative to the grid.
    pub fn column_lines(&self) -> &[f64] {
        &self.column_lines
    }

    pub fn row_lines(&self) -> &[f64] {
        &self.row_lines
    }
}

/// Drag the boundary after track `index` by `delta`, fixing both
/// neighbouring definitions to pixel sizes. Sizes never go below zero.
pub fn resize_track(
    ctx: &mut PlacementContext<'_>,
    grid: ObjectId,
    axis: TrackAxis,
    index: usize,
    delta: f64,
) -> Result<(), PlacementError> {
    let view = ctx.view;
    let tracks = view
        .grid_tracks(grid)
        .ok_or(PlacementError::InvalidState("not a laid out grid"))?;
    let tracks = match axis {
        TrackAxis::Column => &tracks.columns,
        TrackAxis::Row => &tracks.rows,
    };
    let definitions = ctx
        .document
        .find_property(grid, axis.collection())
        .map(|p| ctx.document.object_values(p))
        .unwrap_or_default();
    let (Some(&first), Some(&second), Some(a), Some(b)) = (
        definitions.get(index),
        definitions.get(index + 1),
        tracks.get(index),
        tracks.get(index + 1),
    ) else {
        return Err(PlacementError::InvalidState("no such track boundary"));
    };
    let grown = (a.size + delta).clamp(0.0, a.size + b.size);
    let sizes = [(first, grown), (second, a.size + b.size - grown)];
    let member = axis.size_member();
    log::debug!("{axis:?} {index} resized to {grown}");
    ctx.undo.execute(ctx.document, "Resize", |doc| {
        for (definition, size) in sizes {
            let prop = doc.property_by_name(definition, member)?;
            doc.set_value(prop, Value::GridLength(GridLength::pixels(round(size))))?;
        }
        Ok::<(), PlacementError>(())
    })
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

    const GRID: &str = r#"<Grid xmlns="http://schemas.microsoft.com/winfx/2006/xaml/presentation" xmlns:x="http://schemas.microsoft.com/winfx/2006/xaml" Width="200" Height="200"><Grid.ColumnDefinitions><ColumnDefinition Width="100"/><ColumnDefinition Width="100"/></Grid.ColumnDefinitions><Grid.RowDefinitions><RowDefinition Height="100"/><RowDefinition Height="100"/></Grid.RowDefinitions><Rectangle x:Name="r" Width="30" Height="30" Margin="10,10,0,0" HorizontalAlignment="Left" VerticalAlignment="Top"/></Grid>"#;

    fn value(doc: &XamlDocument, obj: ObjectId, key: &str) -> Value {
        doc.instance_value(doc.instance_of(obj).unwrap(), key)
    }

    #[test]
    fn moved_items_land_in_the_cell_under_them() {
        let mut doc = XamlDocument::parse(GRID).unwrap();
        let view = resolve_layout(&doc, Viewport::default());
        let root = doc.root_element().unwrap();
        let r = doc.find_by_name(root, "r").unwrap();
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
        let mut op = PlacementOperation::start(&mut ctx, &registry, &[r], PlacementType::Move).unwrap();
        assert_eq!(op.items()[0].original_bounds, kurbo::Rect::new(10.0, 10.0, 40.0, 40.0));
        op.move_by(&mut ctx, Vec2::new(100.0, 100.0)).unwrap();
        op.commit(&mut ctx).unwrap();

        assert_eq!(value(&doc, r, "Grid.Column"), Value::Int(1));
        assert_eq!(value(&doc, r, "Grid.Row"), Value::Int(1));
        assert_eq!(value(&doc, r, "Margin"), Value::Thickness(Thickness::new(10.0, 10.0, 0.0, 0.0)));
        assert_eq!(value(&doc, r, "Width"), Value::Double(30.0));
        let xml = doc.to_xml_string();
        assert!(!xml.contains("ColumnSpan"), "{xml}");
    }

    #[test]
    fn alignment_follows_the_nearer_cell_edge() {
        assert_eq!(Align::suggest(0.2, 0.5), Align::Stretch);
        assert_eq!(Align::suggest(10.0, 60.0), Align::Near);
        assert_eq!(Align::suggest(60.0, 10.0), Align::Far);
        assert_eq!(Align::Far.margins(60.0, 10.0), (0.0, 10.0));
    }

    #[test]
    fn splitter_lines_refresh_after_definition_edits() {
        let mut doc = XamlDocument::parse(GRID).unwrap();
        let root = doc.root_element().unwrap();
        let mut splitter = GridSplitterState::new(root, &doc);
        let view = resolve_layout(&doc, Viewport::default());
        assert!(splitter.flush_if_dirty(&view));
        assert_eq!(splitter.column_lines(), &[100.0]);
        assert!(!splitter.observe(&doc));
        assert!(!splitter.flush_if_dirty(&view));

        let r = doc.find_by_name(root, "r").unwrap();
        let width = doc.property_by_name(r, "Width").unwrap();
        doc.set_value(width, Value::Double(20.0)).unwrap();
        assert!(!splitter.observe(&doc));

        let settings = DesignerSettings::default();
        let mut undo = UndoService::new(10);
        let mut ctx = PlacementContext {
            document: &mut doc,
            view: &view,
            settings: &settings,
            undo: &mut undo,
        };
        resize_track(&mut ctx, root, TrackAxis::Column, 0, 20.0).unwrap();
        assert!(undo.can_undo());
        assert!(splitter.observe(&doc));

        let view = resolve_layout(&doc, Viewport::default());
        assert!(splitter.flush_if_dirty(&view));
        assert_eq!(splitter.column_lines(), &[120.0]);
        assert_eq!(splitter.row_lines(), &[100.0]);
    }
}
