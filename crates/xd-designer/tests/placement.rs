//! Integration tests: document → layout → placement gesture → document.
//!
//! Each test drives a whole gesture through the behavior chain and checks
//! both the XML and the live instance values it leaves behind.

use kurbo::{Point, Rect, Vec2};
use pretty_assertions::assert_eq;
use xd_core::{ObjectId, Thickness, Value, XamlDocument};
use xd_designer::placement::{
    BehaviorRegistry, CanvasPlacementBehavior, PlacementAlignment, PlacementBehavior, PlacementOperation,
    PlacementType,
};
use xd_designer::{DesignSession, DesignerSettings, ViewProvider, can_resize};

const CANVAS: &str = include_str!("fixtures/canvas.xaml");
const STACK: &str = include_str!("fixtures/stack.xaml");
const GRID: &str = include_str!("fixtures/grid.xaml");

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn named(session: &DesignSession, name: &str) -> ObjectId {
    let doc = session.document();
    doc.find_by_name(doc.root_element().unwrap(), name)
        .unwrap_or_else(|| panic!("no element named {name}"))
}

fn value(doc: &XamlDocument, obj: ObjectId, key: &str) -> Value {
    doc.instance_value(doc.instance_of(obj).unwrap(), key)
}

// ─── Canvas ──────────────────────────────────────────────────────────────

#[test]
fn canvas_move_updates_offsets_only() {
    init();
    let mut session = DesignSession::load(CANVAS, DesignerSettings::default()).unwrap();
    let bx = named(&session, "box");

    session.move_items(&[bx], Vec2::new(5.0, 5.0), None).unwrap();

    let doc = session.document();
    assert_eq!(value(doc, bx, "Canvas.Left"), Value::Double(15.0));
    assert_eq!(value(doc, bx, "Canvas.Top"), Value::Double(25.0));
    assert_eq!(value(doc, bx, "Width"), Value::Double(30.0));
    assert_eq!(value(doc, bx, "Height"), Value::Double(40.0));
    let xml = session.to_xml_string();
    assert!(xml.contains(r#"Canvas.Left="15" Canvas.Top="25" Width="30" Height="40""#), "{xml}");
    assert_eq!(session.view().bounds(bx), Some(Rect::new(15.0, 25.0, 45.0, 65.0)));
}

#[test]
fn aborted_gesture_restores_xml_and_instances() {
    init();
    let mut session = DesignSession::load(CANVAS, DesignerSettings::default()).unwrap();
    let bx = named(&session, "box");
    let before = session.to_xml_string();

    let (mut ctx, registry) = session.placement_context();
    let mut op = PlacementOperation::start(&mut ctx, registry, &[bx], PlacementType::Move).unwrap();
    op.move_by(&mut ctx, Vec2::new(40.0, 40.0)).unwrap();
    assert_eq!(value(ctx.document, bx, "Canvas.Left"), Value::Double(50.0));
    op.abort(&mut ctx).unwrap();

    assert_eq!(session.to_xml_string(), before);
    assert_eq!(value(session.document(), bx, "Canvas.Left"), Value::Double(10.0));
    assert_eq!(value(session.document(), bx, "Canvas.Top"), Value::Double(20.0));
    assert!(!session.undo_service().can_undo());
}

#[test]
fn resize_with_raster_rounds_the_dragged_corner() {
    init();
    let settings = DesignerSettings {
        use_raster: true,
        use_snaplines: false,
        ..DesignerSettings::default()
    };
    let mut session = DesignSession::load(CANVAS, settings).unwrap();
    let bx = named(&session, "box");

    session
        .resize_item(bx, PlacementAlignment::BOTTOM_RIGHT, Vec2::new(13.0, 3.0))
        .unwrap();

    let doc = session.document();
    assert_eq!(value(doc, bx, "Width"), Value::Double(46.0));
    assert_eq!(value(doc, bx, "Height"), Value::Double(44.0));
    assert_eq!(value(doc, bx, "Canvas.Left"), Value::Double(10.0));
    assert_eq!(session.undo_service().undo_titles().collect::<Vec<_>>(), vec!["Resize"]);
}

#[test]
fn only_parented_elements_offer_resize_handles() {
    let mut session = DesignSession::load(CANVAS, DesignerSettings::default()).unwrap();
    let bx = named(&session, "box");
    let root = session.document().root_element().unwrap();

    let (ctx, registry) = session.placement_context();
    assert!(can_resize(&ctx, registry, bx, PlacementAlignment::TOP_LEFT));
    assert!(!can_resize(&ctx, registry, root, PlacementAlignment::TOP_LEFT));
}

#[test]
fn drop_into_a_grid_moves_the_element_between_containers() {
    init();
    let mut session = DesignSession::load(CANVAS, DesignerSettings::default()).unwrap();
    let bx = named(&session, "box");
    let panel = named(&session, "panel");

    session
        .move_items(&[bx], Vec2::new(320.0, 0.0), Some(Point::new(330.0, 30.0)))
        .unwrap();

    let doc = session.document();
    assert_eq!(doc.parent_object(bx), Some(panel));
    assert!(!doc.find_property(bx, "Canvas.Left").is_some_and(|p| doc.is_set(p)));
    assert_eq!(value(doc, bx, "Margin"), Value::Thickness(Thickness::new(30.0, 20.0, 0.0, 0.0)));
    assert_eq!(value(doc, bx, "HorizontalAlignment").to_string(), "Left");
    assert_eq!(value(doc, bx, "VerticalAlignment").to_string(), "Top");
    assert_eq!(session.view().bounds(bx), Some(Rect::new(330.0, 20.0, 360.0, 60.0)));

    assert_eq!(session.undo().unwrap().as_deref(), Some("Move"));
    let doc = session.document();
    assert_eq!(doc.parent_object(bx), doc.root_element());
    assert_eq!(value(doc, bx, "Canvas.Left"), Value::Double(10.0));
    assert!(!doc.find_property(bx, "Margin").is_some_and(|p| doc.is_set(p)));
    assert_eq!(session.view().bounds(bx), Some(Rect::new(10.0, 20.0, 40.0, 60.0)));
}

#[test]
fn deleting_a_panel_with_its_child_is_one_step() {
    init();
    let mut session = DesignSession::load(CANVAS, DesignerSettings::default()).unwrap();
    let panel = named(&session, "panel");
    let inner = named(&session, "inner");

    session.delete(&[inner, panel]).unwrap();
    assert!(!session.to_xml_string().contains("panel"));
    assert_eq!(session.document().parent_object(inner), Some(panel));
    assert!(!session.view().contains(inner));

    assert_eq!(session.undo().unwrap().as_deref(), Some("Delete"));
    let doc = session.document();
    assert_eq!(doc.parent_object(panel), doc.root_element());
    assert!(session.to_xml_string().contains(r#"<Grid x:Name="panel""#));
    assert!(!session.undo_service().can_undo());
}

// ─── StackPanel ──────────────────────────────────────────────────────────

#[test]
fn stack_panel_reorders_on_drag() {
    init();
    let mut session = DesignSession::load(STACK, DesignerSettings::default()).unwrap();
    let third = named(&session, "third");

    session.move_items(&[third], Vec2::new(0.0, -50.0), None).unwrap();

    let doc = session.document();
    let root = doc.root_element().unwrap();
    let order: Vec<String> = doc
        .object_values(doc.find_property(root, "Children").unwrap())
        .into_iter()
        .filter_map(|c| doc.name_of(c))
        .collect();
    assert_eq!(order, vec!["third", "first", "second"]);
    assert_eq!(session.view().bounds(third).map(|b| b.y0), Some(0.0));
}

// ─── Grid ────────────────────────────────────────────────────────────────

#[test]
fn grid_move_changes_cell_and_keeps_margin() {
    init();
    let mut session = DesignSession::load(GRID, DesignerSettings::default()).unwrap();
    let cell = named(&session, "cell");

    session.move_items(&[cell], Vec2::new(100.0, 100.0), None).unwrap();

    let doc = session.document();
    assert_eq!(value(doc, cell, "Grid.Column"), Value::Int(1));
    assert_eq!(value(doc, cell, "Grid.Row"), Value::Int(1));
    assert_eq!(value(doc, cell, "Margin"), Value::Thickness(Thickness::new(10.0, 10.0, 0.0, 0.0)));
    let xml = session.to_xml_string();
    assert!(xml.contains(r#"Margin="10,10,0,0""#), "{xml}");
    assert_eq!(session.view().bounds(cell), Some(Rect::new(110.0, 110.0, 140.0, 140.0)));
}

#[test]
fn grid_add_picks_alignment_from_the_drawn_rect() {
    init();
    let mut session = DesignSession::load(GRID, DesignerSettings::default()).unwrap();
    let root = session.document().root_element().unwrap();

    let added = session
        .add_element("Border", root, Rect::new(150.0, 20.0, 190.0, 60.0))
        .unwrap();

    let doc = session.document();
    assert_eq!(value(doc, added, "Grid.Column"), Value::Int(1));
    assert!(!doc.find_property(added, "Grid.Row").is_some_and(|p| doc.is_set(p)));
    assert_eq!(value(doc, added, "HorizontalAlignment").to_string(), "Right");
    assert_eq!(value(doc, added, "VerticalAlignment").to_string(), "Top");
    assert_eq!(value(doc, added, "Margin"), Value::Thickness(Thickness::new(0.0, 20.0, 10.0, 0.0)));
    assert_eq!(session.view().bounds(added), Some(Rect::new(150.0, 20.0, 190.0, 60.0)));
}

#[test]
fn registrations_apply_to_derived_container_types() {
    init();
    let mut session = DesignSession::load(GRID, DesignerSettings::default()).unwrap();
    let cell = named(&session, "cell");
    let mut registry = BehaviorRegistry::new();
    registry.register("Panel", |base| Box::new(CanvasPlacementBehavior::new(base)));

    let (mut ctx, _) = session.placement_context();
    let mut op = PlacementOperation::start(&mut ctx, &registry, &[cell], PlacementType::Move).unwrap();
    op.move_by(&mut ctx, Vec2::new(100.0, 100.0)).unwrap();
    op.commit(&mut ctx).unwrap();

    let doc = session.document();
    assert_eq!(value(doc, cell, "Canvas.Left"), Value::Double(100.0));
    assert!(!doc.find_property(cell, "Grid.Column").is_some_and(|p| doc.is_set(p)));

    let empty = BehaviorRegistry::new();
    let root = doc.root_element().unwrap();
    assert!(empty.behavior_for(doc, root).guide_lines().is_empty());
}
