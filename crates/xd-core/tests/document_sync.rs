use pretty_assertions::assert_eq;
use xd_core::{ObjectId, PropertyId, Value, XamlDocument, XamlError, XamlValue};

const PANEL: &str = r#"<StackPanel xmlns="http://schemas.microsoft.com/winfx/2006/xaml/presentation" xmlns:x="http://schemas.microsoft.com/winfx/2006/xaml"><Button x:Name="ok" Content="OK" /><Button x:Name="cancel" Content="Cancel" /></StackPanel>"#;

fn children(doc: &mut XamlDocument) -> (ObjectId, PropertyId) {
    let root = doc.root_element().unwrap();
    (root, doc.content_property(root).unwrap())
}

/// The live collection holds exactly the graph's items, in order.
fn assert_in_sync(doc: &XamlDocument, prop: PropertyId) {
    let collection = doc.value_on_instance(prop).unwrap().as_instance().unwrap();
    let expected: Vec<Value> = doc
        .object_values(prop)
        .into_iter()
        .map(|o| Value::Instance(doc.instance_of(o).unwrap()))
        .collect();
    assert_eq!(doc.instances().items(collection), expected.as_slice());
}

fn names(doc: &XamlDocument, prop: PropertyId) -> Vec<String> {
    doc.object_values(prop)
        .into_iter()
        .map(|o| doc.name_of(o).unwrap_or_default())
        .collect()
}

#[test]
fn collection_stays_in_sync_after_every_edit() {
    let mut doc = XamlDocument::parse(PANEL).unwrap();
    let (_, items) = children(&mut doc);
    assert_in_sync(&doc, items);

    let help = doc.create_object("Button").unwrap();
    doc.rename(help, Some("help")).unwrap();
    doc.insert_item(items, 0, XamlValue::Object(help)).unwrap();
    assert_in_sync(&doc, items);
    assert_eq!(names(&doc, items), ["help", "ok", "cancel"]);

    doc.move_item(items, 0, 2).unwrap();
    assert_in_sync(&doc, items);
    assert_eq!(names(&doc, items), ["ok", "cancel", "help"]);

    let removed = doc.remove_item_at(items, 1).unwrap();
    assert_in_sync(&doc, items);
    assert_eq!(names(&doc, items), ["ok", "help"]);

    doc.add_item(items, removed).unwrap();
    assert_in_sync(&doc, items);
    assert_eq!(names(&doc, items), ["ok", "help", "cancel"]);

    let xml = doc.to_xml_string();
    let ok = xml.find(r#"x:Name="ok""#).unwrap();
    let help = xml.find(r#"Name="help""#).unwrap();
    let cancel = xml.find(r#"x:Name="cancel""#).unwrap();
    assert!(ok < help && help < cancel, "{xml}");
}

#[test]
fn rename_to_a_taken_name_is_rejected() {
    let mut doc = XamlDocument::parse(PANEL).unwrap();
    let root = doc.root_element().unwrap();
    let cancel = doc.find_by_name(root, "cancel").unwrap();
    let before = doc.to_xml_string();

    assert_eq!(doc.rename(cancel, Some("ok")), Err(XamlError::DuplicateName("ok".into())));
    assert_eq!(doc.to_xml_string(), before);
    assert_eq!(doc.name_of(cancel).as_deref(), Some("cancel"));

    doc.rename(cancel, Some("dismiss")).unwrap();
    assert_eq!(doc.find_by_name(root, "dismiss"), Some(cancel));
    assert_eq!(doc.find_by_name(root, "cancel"), None);
    assert!(doc.to_xml_string().contains(r#"<Button x:Name="dismiss" Content="Cancel" />"#));
}

#[test]
fn pasted_snippets_get_fresh_names() {
    let mut doc = XamlDocument::parse(PANEL).unwrap();
    let (root, items) = children(&mut doc);

    let pasted = doc.parse_snippet(r#"<Button x:Name="ok" Content="Again" />"#).unwrap();
    assert_eq!(doc.parent_object(pasted), None);
    doc.make_names_unique(pasted, root).unwrap();
    doc.add_item(items, XamlValue::Object(pasted)).unwrap();

    assert_eq!(doc.name_of(pasted).as_deref(), Some("ok1"));
    assert_eq!(doc.find_by_name(root, "ok1"), Some(pasted));
    assert!(doc.to_xml_string().contains(r#"<Button x:Name="ok1" Content="Again" /></StackPanel>"#));
    assert_in_sync(&doc, items);
}

const BOUND: &str = r#"<Button xmlns="http://schemas.microsoft.com/winfx/2006/xaml/presentation" Content="{Binding Path=A}" />"#;

fn binding(doc: &XamlDocument) -> ObjectId {
    let button = doc.root_element().unwrap();
    let content = doc.find_property(button, "Content").unwrap();
    doc.property(content).value().and_then(XamlValue::as_object).unwrap()
}

#[test]
fn extension_promotes_and_demotes_around_an_unprintable_member() {
    let mut direct = XamlDocument::parse(BOUND).unwrap();
    let ext = binding(&direct);
    direct.set_member_text(ext, "Mode", "TwoWay").unwrap();
    assert_eq!(
        direct.to_xml_string(),
        r#"<Button xmlns="http://schemas.microsoft.com/winfx/2006/xaml/presentation" Content="{Binding A, Mode=TwoWay}" />"#
    );

    let mut detour = XamlDocument::parse(BOUND).unwrap();
    let ext = binding(&detour);
    let converter = detour.property_by_name(ext, "Converter").unwrap();
    let brush = detour.create_object("SolidColorBrush").unwrap();
    detour.set_property_value(converter, XamlValue::Object(brush)).unwrap();

    let promoted = detour.to_xml_string();
    assert!(!promoted.contains("Content="), "{promoted}");
    assert!(promoted.contains("<Binding.Converter><SolidColorBrush /></Binding.Converter>"), "{promoted}");
    assert!(!detour.can_print(ext));

    detour.set_member_text(ext, "Mode", "TwoWay").unwrap();
    assert!(detour.to_xml_string().contains(r#"Mode="TwoWay""#));

    detour.reset_property(converter).unwrap();
    assert!(detour.can_print(ext));
    assert_eq!(detour.to_xml_string(), direct.to_xml_string());
}

#[test]
fn bindings_show_their_fallback_at_design_time() {
    let mut doc = XamlDocument::parse(
        r#"<TextBlock xmlns="http://schemas.microsoft.com/winfx/2006/xaml/presentation" Text="{Binding Name}" />"#,
    )
    .unwrap();
    let block = doc.root_element().unwrap();
    let text = doc.find_property(block, "Text").unwrap();
    assert_eq!(doc.value_on_instance(text).unwrap(), Value::String(String::new()));

    let ext = doc.property(text).value().and_then(XamlValue::as_object).unwrap();
    doc.set_member_text(ext, "FallbackValue", "Preview").unwrap();
    assert_eq!(doc.value_on_instance(text).unwrap(), Value::String("Preview".into()));
    assert!(doc.to_xml_string().contains(r#"Text="{Binding Name, FallbackValue=Preview}""#));
}

#[test]
fn journal_undoes_a_whole_edit_sequence() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut doc = XamlDocument::parse(PANEL).unwrap();
    let (root, items) = children(&mut doc);
    let before = doc.to_xml_string();

    doc.start_recording();
    let ok = doc.find_by_name(root, "ok").unwrap();
    doc.set_member_text(ok, "Width", "80").unwrap();
    doc.move_item(items, 0, 1).unwrap();
    doc.rename(ok, Some("accept")).unwrap();
    let actions = doc.stop_recording();
    assert_eq!(actions.len(), 4);

    for action in actions.iter().rev() {
        doc.revert(action).unwrap();
    }
    assert_eq!(doc.to_xml_string(), before);
    assert_eq!(doc.find_by_name(root, "ok"), Some(ok));
    assert_in_sync(&doc, items);
}

#[test]
fn preview_values_touch_only_the_instance() {
    let mut doc = XamlDocument::parse(PANEL).unwrap();
    let root = doc.root_element().unwrap();
    let ok = doc.find_by_name(root, "ok").unwrap();
    let before = doc.to_xml_string();

    let width = doc.property_by_name(ok, "Width").unwrap();
    doc.set_value_on_instance(width, Value::Double(75.0)).unwrap();
    assert_eq!(doc.value_on_instance(width).unwrap(), Value::Double(75.0));
    assert!(!doc.is_set(width));
    assert_eq!(doc.to_xml_string(), before);
}

fn with_brushes(background: &str) -> String {
    format!(
        r#"<Window xmlns="http://schemas.microsoft.com/winfx/2006/xaml/presentation" xmlns:x="http://schemas.microsoft.com/winfx/2006/xaml"><Window.Resources><ResourceDictionary><SolidColorBrush x:Key="r" Color="Red" /><SolidColorBrush x:Key="g" Color="Green" /></ResourceDictionary></Window.Resources><Button Background="{background}" /></Window>"#
    )
}

/// The button's `Background` member and the extension assigned to it.
fn background(doc: &XamlDocument) -> (PropertyId, ObjectId) {
    let window = doc.root_element().unwrap();
    let button = doc.object_values(doc.find_property(window, "Content").unwrap())[0];
    let prop = doc.find_property(button, "Background").unwrap();
    let ext = doc.property(prop).value().and_then(XamlValue::as_object).unwrap();
    (prop, ext)
}

#[test]
fn edited_resource_reference_prints_its_markup_name() {
    let mut doc = XamlDocument::parse(&with_brushes("{StaticResource r}")).unwrap();
    let window = doc.root_element().unwrap();
    let (prop, ext) = background(&doc);

    doc.set_member_text(ext, "ResourceKey", "g").unwrap();

    let xml = doc.to_xml_string();
    assert!(xml.contains(r#"<Button Background="{StaticResource g}" />"#), "{xml}");
    assert_eq!(doc.value_on_instance(prop).ok(), doc.find_resource(window, "g"));
}

#[test]
fn nested_extension_edits_reach_the_outer_target() {
    let mut doc = XamlDocument::parse(&with_brushes("{Binding X, FallbackValue={StaticResource r}}")).unwrap();
    let window = doc.root_element().unwrap();
    let red = doc.find_resource(window, "r").unwrap();
    let green = doc.find_resource(window, "g").unwrap();
    assert_ne!(red, green);

    let (prop, binding) = background(&doc);
    assert_eq!(doc.value_on_instance(prop).unwrap(), red);

    let fallback = doc.find_property(binding, "FallbackValue").unwrap();
    let inner = doc.property(fallback).value().and_then(XamlValue::as_object).unwrap();
    doc.set_member_text(inner, "ResourceKey", "g").unwrap();

    assert_eq!(doc.value_on_instance(prop).unwrap(), green);
    let xml = doc.to_xml_string();
    assert!(xml.contains(r#"Background="{Binding X, FallbackValue={StaticResource g}}""#), "{xml}");
}
