//! Manifest variant checks and the loader's JSON manifest.

use eyegaze_dispatch::{ExtensionName, LAYER_NAME, LayerManifest, ManifestVariant};
use serde::Serialize;
use serde_json::json;

use crate::error::HarnessError;

/// Parse a variant name as accepted on the command line.
pub fn parse_variant(name: &str) -> Result<ManifestVariant, HarnessError> {
    ManifestVariant::from_str_loose(name).ok_or_else(|| HarnessError::UnknownVariant(name.to_string()))
}

/// What `check` prints for a valid variant.
#[derive(Debug, Clone, Serialize)]
pub struct ManifestReport {
    pub variant: ManifestVariant,
    pub layer_name: &'static str,
    pub manifest: LayerManifest,
    pub override_count: usize,
    pub requested_count: usize,
}

/// Validate the variant's name lists.
pub fn check_variant(variant: ManifestVariant) -> Result<ManifestReport, HarnessError> {
    let (overrides, requested, extensions) = variant.lists();
    let manifest = LayerManifest::from_lists(overrides, requested, extensions)?;
    Ok(ManifestReport {
        variant,
        layer_name: LAYER_NAME,
        override_count: manifest.override_functions().len(),
        requested_count: manifest.requested_functions().len(),
        manifest,
    })
}

/// Loader manifest (`XR_APILAYER_*.json`) pointing at `library_path`.
///
/// Only `XR_EXT_eye_gaze_interaction` is advertised; the other declared
/// extensions are consumed from the layer below.
#[must_use]
pub fn loader_manifest(library_path: &str) -> serde_json::Value {
    let disable = format!("DISABLE_{}", LAYER_NAME.to_ascii_uppercase());
    json!({
        "file_format_version": "1.0.0",
        "api_layer": {
            "name": LAYER_NAME,
            "library_path": library_path,
            "api_version": "1.0",
            "implementation_version": env!("CARGO_PKG_VERSION"),
            "description": "Eye gaze interaction from simulated or social eye trackers",
            "instance_extensions": [{
                "name": ExtensionName::EyeGazeInteraction.as_str(),
                "extension_version": "1",
            }],
            "disable_environment": disable,
        }
    })
}
