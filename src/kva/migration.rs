//! Legacy KVA format migration.
//!
//! Files between format 1.3 and 2.0 wrapped every drawing in a
//! `<Drawing Type="...">` element with the implementation class name. The
//! migration rewrites those into the 2.0 element names before parsing.
//! Anything older than 1.3 is rejected outright.

use log::{debug, error};

use crate::kva::error::KvaError;
use crate::kva::xml::XmlNode;
use crate::kva::{FORMAT_VERSION, MINIMUM_FORMAT_VERSION};

/// Parses and validates the declared format version.
pub fn check_version(root: &XmlNode) -> Result<f64, KvaError> {
    let text = root
        .child_text("FormatVersion")
        .ok_or_else(|| KvaError::missing_field("FormatVersion"))?;

    let version: f64 = text.trim().parse().map_err(|_| {
        KvaError::invalid_document(format!("Unreadable format version: {}", text))
    })?;

    if version < MINIMUM_FORMAT_VERSION {
        return Err(KvaError::UnsupportedVersion {
            found: text.trim().to_string(),
            minimum: MINIMUM_FORMAT_VERSION.to_string(),
        });
    }

    Ok(version)
}

/// True when the document needs the legacy rewrite before parsing.
pub fn needs_migration(version: f64) -> bool {
    version < 2.0
}

/// Rewrites a legacy document in place to the current element names.
///
/// Unknown legacy types are logged and left as-is; the parser skips them
/// later. Migration failures never abort a load.
pub fn migrate(root: &mut XmlNode) {
    debug!(
        "Older format detected. Starting conversion to {}",
        FORMAT_VERSION
    );
    rewrite(root);

    if let Some(version) = root.children.iter_mut().find(|c| c.name == "FormatVersion") {
        version.text = FORMAT_VERSION.to_string();
    }
}

fn rewrite(node: &mut XmlNode) {
    if node.name == "Drawing" {
        match node.attributes.get("Type").map(String::as_str) {
            Some(legacy) => match modern_name(legacy) {
                Some(name) => {
                    node.name = name.to_string();
                    node.attributes.remove("Type");
                }
                None => {
                    error!("No conversion for legacy drawing type: {}", legacy);
                }
            },
            None => {
                error!("Legacy drawing element without a type attribute");
            }
        }
    }

    for child in &mut node.children {
        rewrite(child);
    }
}

fn modern_name(legacy: &str) -> Option<&'static str> {
    match legacy {
        "DrawingAngle2D" => Some("Angle"),
        "DrawingChrono" => Some("Chrono"),
        "DrawingCircle" => Some("Circle"),
        "DrawingCross2D" => Some("CrossMark"),
        "DrawingLine2D" => Some("Line"),
        "DrawingPencil" => Some("Pencil"),
        "DrawingPlane" => Some("Plane"),
        "DrawingText" => Some("Label"),
        _ => None,
    }
}
