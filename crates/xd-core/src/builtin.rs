//! The built-in WPF-style type set.

use crate::convert::ConverterKind;
use crate::id::Name;
use crate::schema::{CollectionKind, TypeRegistry};
use crate::value::{GridLength, Thickness, Value};

pub const PRESENTATION_NS: &str = "http://schemas.microsoft.com/winfx/2006/xaml/presentation";
pub const XAML_NS: &str = "http://schemas.microsoft.com/winfx/2006/xaml";
pub const MARKUP_COMPATIBILITY_NS: &str = "http://schemas.openxmlformats.org/markup-compatibility/2006";
pub const DESIGN_NS: &str = "http://schemas.microsoft.com/expression/blend/2008";

const CORLIB: &str = "mscorlib";
const FRAMEWORK: &str = "PresentationFramework";
const SYSTEM: &str = "System";
const WINDOWS: &str = "System.Windows";
const CONTROLS: &str = "System.Windows.Controls";
const MEDIA: &str = "System.Windows.Media";
const SHAPES: &str = "System.Windows.Shapes";
const DATA: &str = "System.Windows.Data";
const MARKUP: &str = "System.Windows.Markup";

fn member(name: &str) -> Value {
    Value::Enum(Name::intern(name))
}

/// Registry with the presentation and XAML-language types the designer
/// understands.
pub fn wpf_registry() -> TypeRegistry {
    let mut r = TypeRegistry::new();

    for ns in [WINDOWS, CONTROLS, MEDIA, SHAPES, DATA] {
        r.map_xmlns(PRESENTATION_NS, ns, FRAMEWORK, None);
    }
    r.map_xmlns(XAML_NS, MARKUP, FRAMEWORK, Some("x"));
    r.map_xmlns(XAML_NS, SYSTEM, CORLIB, Some("x"));

    // ─── Primitives ──────────────────────────────────────────────────────
    let object = r.define(SYSTEM, CORLIB, "Object").finish();
    let string = r
        .define(SYSTEM, CORLIB, "String")
        .base(object)
        .converter(ConverterKind::String)
        .abstract_type()
        .finish();
    let double = r
        .define(SYSTEM, CORLIB, "Double")
        .base(object)
        .converter(ConverterKind::Double)
        .value_type()
        .finish();
    let int = r
        .define(SYSTEM, CORLIB, "Int32")
        .base(object)
        .converter(ConverterKind::Int)
        .value_type()
        .finish();
    let boolean = r
        .define(SYSTEM, CORLIB, "Boolean")
        .base(object)
        .converter(ConverterKind::Bool)
        .value_type()
        .finish();
    let type_ty = r
        .define(SYSTEM, CORLIB, "Type")
        .base(object)
        .converter(ConverterKind::Type)
        .abstract_type()
        .finish();

    // ─── Structs & enums ─────────────────────────────────────────────────
    let thickness = r
        .define(WINDOWS, FRAMEWORK, "Thickness")
        .base(object)
        .converter(ConverterKind::Thickness)
        .value_type()
        .finish();
    let grid_length = r
        .define(WINDOWS, FRAMEWORK, "GridLength")
        .base(object)
        .converter(ConverterKind::GridLength)
        .value_type()
        .finish();
    let point = r
        .define(WINDOWS, FRAMEWORK, "Point")
        .base(object)
        .converter(ConverterKind::Point)
        .value_type()
        .finish();
    let color = r
        .define(MEDIA, FRAMEWORK, "Color")
        .base(object)
        .converter(ConverterKind::Color)
        .value_type()
        .finish();
    let h_align = r
        .define(WINDOWS, FRAMEWORK, "HorizontalAlignment")
        .base(object)
        .converter(ConverterKind::enumeration(&["Left", "Center", "Right", "Stretch"]))
        .value_type()
        .finish();
    let v_align = r
        .define(WINDOWS, FRAMEWORK, "VerticalAlignment")
        .base(object)
        .converter(ConverterKind::enumeration(&["Top", "Center", "Bottom", "Stretch"]))
        .value_type()
        .finish();
    let orientation = r
        .define(CONTROLS, FRAMEWORK, "Orientation")
        .base(object)
        .converter(ConverterKind::enumeration(&["Horizontal", "Vertical"]))
        .value_type()
        .finish();
    let visibility = r
        .define(WINDOWS, FRAMEWORK, "Visibility")
        .base(object)
        .converter(ConverterKind::enumeration(&["Visible", "Hidden", "Collapsed"]))
        .value_type()
        .finish();
    let binding_mode = r
        .define(DATA, FRAMEWORK, "BindingMode")
        .base(object)
        .converter(ConverterKind::enumeration(&[
            "TwoWay",
            "OneWay",
            "OneTime",
            "OneWayToSource",
            "Default",
        ]))
        .value_type()
        .finish();

    // ─── Dependency objects ──────────────────────────────────────────────
    let dependency_object = r.define(WINDOWS, FRAMEWORK, "DependencyObject").base(object).finish();
    let brush = r
        .define(MEDIA, FRAMEWORK, "Brush")
        .base(dependency_object)
        .converter(ConverterKind::Brush)
        .abstract_type()
        .finish();
    r.define(MEDIA, FRAMEWORK, "SolidColorBrush")
        .base(brush)
        .property("Color", color, Value::Color(crate::value::Color::argb(0, 0, 0, 0)))
        .property("Opacity", double, Value::Double(1.0))
        .finish();

    let resource_dictionary = r
        .define(WINDOWS, FRAMEWORK, "ResourceDictionary")
        .base(object)
        .collection(CollectionKind::Dictionary)
        .finish();

    // Transforms
    let transform = r
        .define(MEDIA, FRAMEWORK, "Transform")
        .base(dependency_object)
        .abstract_type()
        .finish();
    r.define(MEDIA, FRAMEWORK, "RotateTransform")
        .base(transform)
        .property("Angle", double, Value::Double(0.0))
        .property("CenterX", double, Value::Double(0.0))
        .property("CenterY", double, Value::Double(0.0))
        .constructor(&["angle"])
        .finish();
    r.define(MEDIA, FRAMEWORK, "ScaleTransform")
        .base(transform)
        .property("ScaleX", double, Value::Double(1.0))
        .property("ScaleY", double, Value::Double(1.0))
        .property("CenterX", double, Value::Double(0.0))
        .property("CenterY", double, Value::Double(0.0))
        .finish();
    r.define(MEDIA, FRAMEWORK, "SkewTransform")
        .base(transform)
        .property("AngleX", double, Value::Double(0.0))
        .property("AngleY", double, Value::Double(0.0))
        .property("CenterX", double, Value::Double(0.0))
        .property("CenterY", double, Value::Double(0.0))
        .finish();
    r.define(MEDIA, FRAMEWORK, "TranslateTransform")
        .base(transform)
        .property("X", double, Value::Double(0.0))
        .property("Y", double, Value::Double(0.0))
        .finish();
    let transform_collection = r
        .define(MEDIA, FRAMEWORK, "TransformCollection")
        .base(object)
        .collection(CollectionKind::List)
        .finish();
    r.define(MEDIA, FRAMEWORK, "TransformGroup")
        .base(transform)
        .read_only("Children", transform_collection)
        .content("Children")
        .finish();

    // ─── Elements ────────────────────────────────────────────────────────
    let ui_element = r
        .define(WINDOWS, FRAMEWORK, "UIElement")
        .base(dependency_object)
        .property("Visibility", visibility, member("Visible"))
        .property("Opacity", double, Value::Double(1.0))
        .property("RenderTransform", transform, Value::Null)
        .property("RenderTransformOrigin", point, Value::Point(0.0, 0.0))
        .property("IsEnabled", boolean, Value::Bool(true))
        .event("MouseDown")
        .event("MouseUp")
        .abstract_type()
        .finish();
    let framework_element = r
        .define(WINDOWS, FRAMEWORK, "FrameworkElement")
        .base(ui_element)
        .property("Name", string, Value::Null)
        .property("Width", double, Value::Double(f64::NAN))
        .property("Height", double, Value::Double(f64::NAN))
        .property("MinWidth", double, Value::Double(0.0))
        .property("MinHeight", double, Value::Double(0.0))
        .property("Margin", thickness, Value::Thickness(Thickness::default()))
        .property("HorizontalAlignment", h_align, member("Stretch"))
        .property("VerticalAlignment", v_align, member("Stretch"))
        .property("Tag", object, Value::Null)
        .property("DataContext", object, Value::Null)
        .property("ToolTip", object, Value::Null)
        .read_only("Resources", resource_dictionary)
        .computed("ActualWidth", double, Value::Double(0.0))
        .computed("ActualHeight", double, Value::Double(0.0))
        .name_property("Name")
        .event("Loaded")
        .abstract_type()
        .finish();
    let ui_element_collection = r
        .define(CONTROLS, FRAMEWORK, "UIElementCollection")
        .base(object)
        .collection(CollectionKind::List)
        .finish();

    // Panels
    let panel = r
        .define(CONTROLS, FRAMEWORK, "Panel")
        .base(framework_element)
        .property("Background", brush, Value::Null)
        .read_only("Children", ui_element_collection)
        .content("Children")
        .abstract_type()
        .finish();
    let canvas = r.define(CONTROLS, FRAMEWORK, "Canvas").base(panel).finish();
    for side in ["Left", "Top", "Right", "Bottom"] {
        r.attach(canvas, side, double, Value::Double(f64::NAN));
    }
    r.define(CONTROLS, FRAMEWORK, "StackPanel")
        .base(panel)
        .property("Orientation", orientation, member("Vertical"))
        .finish();
    r.define(CONTROLS, FRAMEWORK, "WrapPanel")
        .base(panel)
        .property("Orientation", orientation, member("Horizontal"))
        .finish();
    let dock_panel = r
        .define(CONTROLS, FRAMEWORK, "DockPanel")
        .base(panel)
        .property("LastChildFill", boolean, Value::Bool(true))
        .finish();
    let dock = r
        .define(CONTROLS, FRAMEWORK, "Dock")
        .base(object)
        .converter(ConverterKind::enumeration(&["Left", "Top", "Right", "Bottom"]))
        .value_type()
        .finish();
    r.attach(dock_panel, "Dock", dock, member("Left"));

    let definition_base = r
        .define(CONTROLS, FRAMEWORK, "DefinitionBase")
        .base(dependency_object)
        .property("Name", string, Value::Null)
        .name_property("Name")
        .abstract_type()
        .finish();
    r.define(CONTROLS, FRAMEWORK, "RowDefinition")
        .base(definition_base)
        .property("Height", grid_length, Value::GridLength(GridLength::star(1.0)))
        .property("MinHeight", double, Value::Double(0.0))
        .finish();
    r.define(CONTROLS, FRAMEWORK, "ColumnDefinition")
        .base(definition_base)
        .property("Width", grid_length, Value::GridLength(GridLength::star(1.0)))
        .property("MinWidth", double, Value::Double(0.0))
        .finish();
    let row_definitions = r
        .define(CONTROLS, FRAMEWORK, "RowDefinitionCollection")
        .base(object)
        .collection(CollectionKind::List)
        .finish();
    let column_definitions = r
        .define(CONTROLS, FRAMEWORK, "ColumnDefinitionCollection")
        .base(object)
        .collection(CollectionKind::List)
        .finish();
    let grid = r
        .define(CONTROLS, FRAMEWORK, "Grid")
        .base(panel)
        .read_only("RowDefinitions", row_definitions)
        .read_only("ColumnDefinitions", column_definitions)
        .property("ShowGridLines", boolean, Value::Bool(false))
        .finish();
    r.attach(grid, "Row", int, Value::Int(0));
    r.attach(grid, "Column", int, Value::Int(0));
    r.attach(grid, "RowSpan", int, Value::Int(1));
    r.attach(grid, "ColumnSpan", int, Value::Int(1));
    r.define(CONTROLS, FRAMEWORK, "GridSplitter")
        .base(framework_element)
        .property("Background", brush, Value::Null)
        .finish();

    // Templates open their own name scope.
    let framework_template = r
        .define(WINDOWS, FRAMEWORK, "FrameworkTemplate")
        .base(dependency_object)
        .property("VisualTree", object, Value::Null)
        .content("VisualTree")
        .name_scope()
        .abstract_type()
        .finish();
    let control_template = r
        .define(CONTROLS, FRAMEWORK, "ControlTemplate")
        .base(framework_template)
        .property("TargetType", type_ty, Value::Null)
        .finish();
    r.define(WINDOWS, FRAMEWORK, "DataTemplate")
        .base(framework_template)
        .property("DataType", object, Value::Null)
        .finish();

    // Decorators and controls
    r.define(CONTROLS, FRAMEWORK, "Border")
        .base(framework_element)
        .property("Child", ui_element, Value::Null)
        .property("Background", brush, Value::Null)
        .property("BorderBrush", brush, Value::Null)
        .property("BorderThickness", thickness, Value::Thickness(Thickness::default()))
        .property("Padding", thickness, Value::Thickness(Thickness::default()))
        .property("CornerRadius", double, Value::Double(0.0))
        .content("Child")
        .finish();
    let control = r
        .define(CONTROLS, FRAMEWORK, "Control")
        .base(framework_element)
        .property("Background", brush, Value::Null)
        .property("Foreground", brush, Value::Null)
        .property("BorderBrush", brush, Value::Null)
        .property("BorderThickness", thickness, Value::Thickness(Thickness::default()))
        .property("Padding", thickness, Value::Thickness(Thickness::default()))
        .property("FontSize", double, Value::Double(12.0))
        .property("Template", control_template, Value::Null)
        .abstract_type()
        .finish();
    let content_control = r
        .define(CONTROLS, FRAMEWORK, "ContentControl")
        .base(control)
        .property("Content", object, Value::Null)
        .content("Content")
        .finish();
    r.define(CONTROLS, FRAMEWORK, "Button")
        .base(content_control)
        .property("IsDefault", boolean, Value::Bool(false))
        .event("Click")
        .finish();
    r.define(CONTROLS, FRAMEWORK, "Label").base(content_control).finish();
    r.define(CONTROLS, FRAMEWORK, "CheckBox")
        .base(content_control)
        .property("IsChecked", boolean, Value::Bool(false))
        .event("Click")
        .event("Checked")
        .finish();
    r.define(WINDOWS, FRAMEWORK, "Window")
        .base(content_control)
        .property("Title", string, Value::Null)
        .finish();
    r.define(CONTROLS, FRAMEWORK, "UserControl").base(content_control).finish();
    r.define(CONTROLS, FRAMEWORK, "TextBox")
        .base(control)
        .property("Text", string, Value::String(String::new()))
        .content("Text")
        .event("TextChanged")
        .finish();
    r.define(CONTROLS, FRAMEWORK, "TextBlock")
        .base(framework_element)
        .property("Text", string, Value::String(String::new()))
        .property("FontSize", double, Value::Double(12.0))
        .property("Foreground", brush, Value::Null)
        .property("Padding", thickness, Value::Thickness(Thickness::default()))
        .content("Text")
        .finish();

    // Shapes
    let shape = r
        .define(SHAPES, FRAMEWORK, "Shape")
        .base(framework_element)
        .property("Fill", brush, Value::Null)
        .property("Stroke", brush, Value::Null)
        .property("StrokeThickness", double, Value::Double(1.0))
        .abstract_type()
        .finish();
    r.define(SHAPES, FRAMEWORK, "Rectangle")
        .base(shape)
        .property("RadiusX", double, Value::Double(0.0))
        .property("RadiusY", double, Value::Double(0.0))
        .finish();
    r.define(SHAPES, FRAMEWORK, "Ellipse").base(shape).finish();

    // ─── Markup extensions ───────────────────────────────────────────────
    let markup_extension = r
        .define(MARKUP, FRAMEWORK, "MarkupExtension")
        .base(object)
        .markup_extension()
        .abstract_type()
        .finish();
    r.define(DATA, FRAMEWORK, "Binding")
        .base(markup_extension)
        .property("Path", string, Value::Null)
        .property("ElementName", string, Value::Null)
        .property("Mode", binding_mode, member("Default"))
        .property("Converter", object, Value::Null)
        .property("ConverterParameter", object, Value::Null)
        .property("StringFormat", string, Value::Null)
        .property("Source", object, Value::Null)
        .property("FallbackValue", object, Value::Null)
        .constructor(&["path"])
        .finish();
    r.define(WINDOWS, FRAMEWORK, "StaticResourceExtension")
        .base(markup_extension)
        .property("ResourceKey", object, Value::Null)
        .constructor(&["resourceKey"])
        .finish();
    r.define(WINDOWS, FRAMEWORK, "DynamicResourceExtension")
        .base(markup_extension)
        .property("ResourceKey", object, Value::Null)
        .constructor(&["resourceKey"])
        .finish();
    r.define(MARKUP, FRAMEWORK, "NullExtension")
        .base(markup_extension)
        .finish();
    r.define(MARKUP, FRAMEWORK, "TypeExtension")
        .base(markup_extension)
        .property("TypeName", string, Value::Null)
        .property("Type", type_ty, Value::Null)
        .constructor(&["typeName"])
        .finish();
    r.define(MARKUP, FRAMEWORK, "StaticExtension")
        .base(markup_extension)
        .property("Member", string, Value::Null)
        .constructor(&["member"])
        .finish();

    r
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_shape() {
        let r = wpf_registry();
        let canvas = r.find(CONTROLS, "Canvas").unwrap();
        let button = r.find(CONTROLS, "Button").unwrap();
        let content_control = r.find(CONTROLS, "ContentControl").unwrap();
        assert!(r.find_attached(canvas, "Left").is_some());
        assert_eq!(r.content_property(canvas).map(|n| n.to_string()), Some("Children".into()));
        assert_eq!(r.content_property(button).map(|n| n.to_string()), Some("Content".into()));
        assert!(r.is_assignable(content_control, button));
        assert!(r.find_event(button, "Click").is_some());
        assert_eq!(r.name_property(button).map(|n| n.to_string()), Some("Name".into()));
        let binding = r.find(DATA, "Binding").unwrap();
        assert!(r.is_markup_extension(binding));
        assert_eq!(r.markup_name(binding), "Binding");
        let static_resource = r.find(WINDOWS, "StaticResourceExtension").unwrap();
        assert_eq!(r.markup_name(static_resource), "StaticResource");
        let null = r.find(MARKUP, "NullExtension").unwrap();
        assert_eq!(r.markup_name(null), "Null");
        let template = r.find(CONTROLS, "ControlTemplate").unwrap();
        assert!(r.is_name_scope(template));
    }
}
