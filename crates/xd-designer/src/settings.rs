//! Designer options.

use serde::{Deserialize, Serialize};

/// Placement and undo options for a design surface.
///
/// Every field has a default, so a settings file only needs the keys it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DesignerSettings {
    /// Raster cell size in pixels.
    pub raster: f64,
    /// Round moved and resized edges to the raster. Default: **false**.
    pub use_raster: bool,
    /// Snap to sibling and container edges. Default: **true**.
    pub use_snaplines: bool,
    /// Extra alignment lines this far outside siblings and inside the
    /// container.
    pub snapline_margin: f64,
    /// Largest distance, in pixels, that still snaps.
    pub snapline_accuracy: f64,
    /// Shift applied to pasted items.
    pub paste_offset: f64,
    /// Change groups kept on the undo stack.
    pub undo_depth: usize,
}

impl Default for DesignerSettings {
    fn default() -> Self {
        Self {
            raster: 8.0,
            use_raster: false,
            use_snaplines: true,
            snapline_margin: 8.0,
            snapline_accuracy: 5.0,
            paste_offset: 10.0,
            undo_depth: 100,
        }
    }
}

impl DesignerSettings {
    /// Read settings from JSON; missing keys keep their defaults.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_json_keeps_defaults() {
        let settings = DesignerSettings::from_json(r#"{ "useRaster": true, "raster": 4 }"#).unwrap();
        assert_eq!(
            settings,
            DesignerSettings {
                raster: 4.0,
                use_raster: true,
                ..DesignerSettings::default()
            }
        );
    }

    #[test]
    fn unknown_shapes_are_rejected() {
        assert!(DesignerSettings::from_json(r#"{ "raster": "wide" }"#).is_err());
    }
}
