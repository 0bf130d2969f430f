//! Layer manifest: which functions are intercepted, which are called on the
//! next layer, and which extensions the layer depends on.
//!
//! The manifest is an explicit value handed to [`crate::LayerRuntime::new`], so
//! several configurations can coexist (tests build their own). The shipped
//! layer picks one of the [`ManifestVariant`]s at build time.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::error::ManifestError;
use crate::extension::{ExtensionName, ExtensionSet};
use crate::function::{FunctionName, FunctionSet};

/// Which list of the manifest an entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestList {
    OverrideFunctions,
    RequestedFunctions,
    Extensions,
}

impl fmt::Display for ManifestList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::OverrideFunctions => "override_functions",
            Self::RequestedFunctions => "requested_functions",
            Self::Extensions => "extensions",
        })
    }
}

const EYE_GAZE_OVERRIDES: &[&str] = &[
    "xrGetSystem",
    "xrGetSystemProperties",
    "xrSuggestInteractionProfileBindings",
    "xrCreateSession",
    "xrDestroySession",
    "xrGetCurrentInteractionProfile",
    "xrCreateActionSpace",
    "xrDestroySpace",
    "xrGetActionStatePose",
    "xrWaitFrame",
    "xrBeginFrame",
    "xrLocateSpace",
    "xrEnumerateBoundSourcesForAction",
    "xrGetInputSourceLocalizedName",
];

const EYE_GAZE_REQUESTED: &[&str] = &[
    "xrGetInstanceProperties",
    "xrGetSystemProperties",
    "xrCreateReferenceSpace",
    "xrStringToPath",
    "xrPathToString",
];

const SOCIAL_REQUESTED: &[&str] = &[
    "xrGetInstanceProperties",
    "xrGetSystemProperties",
    "xrCreateReferenceSpace",
    "xrStringToPath",
    "xrPathToString",
    "xrCreateEyeTrackerFB",
    "xrGetEyeGazesFB",
];

const EYE_GAZE_EXTENSIONS: &[&str] = &["XR_EXT_eye_gaze_interaction"];

const SOCIAL_EXTENSIONS: &[&str] = &["XR_EXT_eye_gaze_interaction", "XR_FB_eye_tracking_social"];

/// Build-time selectable manifest flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestVariant {
    /// Eye gaze interaction only.
    EyeGaze,
    /// Eye gaze interaction plus the `XR_FB_eye_tracking_social` tracker.
    EyeGazeWithSocial,
}

impl ManifestVariant {
    pub const ALL: &'static [ManifestVariant] = &[Self::EyeGaze, Self::EyeGazeWithSocial];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EyeGaze => "eye-gaze",
            Self::EyeGazeWithSocial => "eye-gaze-social",
        }
    }

    /// Parse from string (case-insensitive).
    #[must_use]
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "eye-gaze" | "eye_gaze" | "base" => Some(Self::EyeGaze),
            "eye-gaze-social" | "eye_gaze_social" | "social" => Some(Self::EyeGazeWithSocial),
            _ => None,
        }
    }

    /// The three name lists of this variant, as written in the manifest.
    #[must_use]
    pub const fn lists(self) -> (&'static [&'static str], &'static [&'static str], &'static [&'static str]) {
        match self {
            Self::EyeGaze => (EYE_GAZE_OVERRIDES, EYE_GAZE_REQUESTED, EYE_GAZE_EXTENSIONS),
            Self::EyeGazeWithSocial => (EYE_GAZE_OVERRIDES, SOCIAL_REQUESTED, SOCIAL_EXTENSIONS),
        }
    }

    /// Validated manifest for this variant.
    ///
    /// # Panics
    ///
    /// Panics if the built-in lists fail validation, which is a build defect
    /// caught by this crate's tests.
    #[must_use]
    pub fn manifest(self) -> LayerManifest {
        let (overrides, requested, extensions) = self.lists();
        LayerManifest::from_lists(overrides, requested, extensions)
            .unwrap_or_else(|err| panic!("built-in manifest {} is invalid: {err}", self.as_str()))
    }
}

/// Validated override/request/extension sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerManifest {
    override_functions: FunctionSet,
    requested_functions: FunctionSet,
    extensions: ExtensionSet,
}

impl LayerManifest {
    /// Validate the three name lists.
    ///
    /// Every function name must be catalogued, every extension name known, no
    /// list may repeat an entry, and a function owned by an extension needs
    /// that extension declared. A function may appear in both function lists.
    pub fn from_lists(
        override_functions: &[&str],
        requested_functions: &[&str],
        extensions: &[&str],
    ) -> Result<Self, ManifestError> {
        let mut declared = ExtensionSet::empty();
        check_duplicates(ManifestList::Extensions, extensions)?;
        for &name in extensions {
            let ext = ExtensionName::from_name(name)
                .ok_or_else(|| ManifestError::UnknownExtension(name.to_string()))?;
            declared.insert(ext);
        }

        let overrides =
            parse_functions(ManifestList::OverrideFunctions, override_functions, declared)?;
        let requested =
            parse_functions(ManifestList::RequestedFunctions, requested_functions, declared)?;

        Ok(Self {
            override_functions: overrides,
            requested_functions: requested,
            extensions: declared,
        })
    }

    /// Build from already-typed names; only ownership of extension functions
    /// needs checking.
    pub fn new(
        override_functions: &[FunctionName],
        requested_functions: &[FunctionName],
        extensions: &[ExtensionName],
    ) -> Result<Self, ManifestError> {
        let overrides: Vec<&str> = override_functions.iter().map(|f| f.as_str()).collect();
        let requested: Vec<&str> = requested_functions.iter().map(|f| f.as_str()).collect();
        let exts: Vec<&str> = extensions.iter().map(|e| e.as_str()).collect();
        Self::from_lists(&overrides, &requested, &exts)
    }

    #[must_use]
    pub const fn override_functions(&self) -> FunctionSet {
        self.override_functions
    }

    #[must_use]
    pub const fn requested_functions(&self) -> FunctionSet {
        self.requested_functions
    }

    #[must_use]
    pub const fn extensions(&self) -> ExtensionSet {
        self.extensions
    }

    #[must_use]
    pub const fn is_overridden(&self, name: FunctionName) -> bool {
        self.override_functions.contains(name)
    }

    #[must_use]
    pub const fn is_requested(&self, name: FunctionName) -> bool {
        self.requested_functions.contains(name)
    }

    #[must_use]
    pub const fn declares(&self, ext: ExtensionName) -> bool {
        self.extensions.contains(ext)
    }
}

fn check_duplicates(list: ManifestList, names: &[&str]) -> Result<(), ManifestError> {
    let mut seen = HashSet::with_capacity(names.len());
    for &name in names {
        if !seen.insert(name) {
            return Err(ManifestError::Duplicate {
                list,
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

fn parse_functions(
    list: ManifestList,
    names: &[&str],
    declared: ExtensionSet,
) -> Result<FunctionSet, ManifestError> {
    check_duplicates(list, names)?;
    let mut set = FunctionSet::empty();
    for &name in names {
        let function =
            FunctionName::from_name(name).ok_or_else(|| ManifestError::UnknownFunction {
                list,
                name: name.to_string(),
            })?;
        if let Some(extension) = function.owning_extension()
            && !declared.contains(extension)
        {
            return Err(ManifestError::UndeclaredExtension {
                list,
                function,
                extension,
            });
        }
        set.insert(function);
    }
    Ok(set)
}
