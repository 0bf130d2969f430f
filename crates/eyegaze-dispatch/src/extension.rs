//! Optional API extensions and per-instance negotiation.

use std::fmt;

use serde::{Serialize, Serializer};

/// An optional extension of the wrapped API known to this build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ExtensionName {
    /// `XR_EXT_eye_gaze_interaction`: eye gaze as an input action.
    EyeGazeInteraction,
    /// `XR_FB_eye_tracking_social`: per-eye gaze poses.
    EyeTrackingSocialFB,
    /// `XR_EXT_hand_tracking`.
    HandTracking,
}

impl ExtensionName {
    pub const ALL: &'static [ExtensionName] = &[
        ExtensionName::EyeGazeInteraction,
        ExtensionName::EyeTrackingSocialFB,
        ExtensionName::HandTracking,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EyeGazeInteraction => "XR_EXT_eye_gaze_interaction",
            Self::EyeTrackingSocialFB => "XR_FB_eye_tracking_social",
            Self::HandTracking => "XR_EXT_hand_tracking",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|ext| ext.as_str() == name)
    }

    const fn bit(self) -> u32 {
        1_u32 << (self as u8)
    }
}

impl fmt::Display for ExtensionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ExtensionName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Set of catalogued extensions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ExtensionSet {
    bits: u32,
}

impl ExtensionSet {
    #[must_use]
    pub const fn empty() -> Self {
        Self { bits: 0 }
    }

    #[must_use]
    pub fn from_slice(names: &[ExtensionName]) -> Self {
        names.iter().copied().collect()
    }

    /// Build a set from extension strings reported by another layer.
    ///
    /// Names outside the catalogue are ignored: nothing in this layer can
    /// depend on them.
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        names
            .into_iter()
            .filter_map(ExtensionName::from_name)
            .collect()
    }

    pub fn insert(&mut self, name: ExtensionName) -> bool {
        let fresh = self.bits & name.bit() == 0;
        self.bits |= name.bit();
        fresh
    }

    #[must_use]
    pub const fn contains(self, name: ExtensionName) -> bool {
        self.bits & name.bit() != 0
    }

    #[must_use]
    pub const fn intersection(self, other: Self) -> Self {
        Self {
            bits: self.bits & other.bits,
        }
    }

    #[must_use]
    pub const fn difference(self, other: Self) -> Self {
        Self {
            bits: self.bits & !other.bits,
        }
    }

    #[must_use]
    pub const fn len(self) -> usize {
        self.bits.count_ones() as usize
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.bits == 0
    }

    pub fn iter(self) -> impl Iterator<Item = ExtensionName> {
        ExtensionName::ALL
            .iter()
            .copied()
            .filter(move |ext| self.contains(*ext))
    }
}

impl FromIterator<ExtensionName> for ExtensionSet {
    fn from_iter<T: IntoIterator<Item = ExtensionName>>(iter: T) -> Self {
        let mut set = Self::empty();
        for ext in iter {
            set.insert(ext);
        }
        set
    }
}

impl Serialize for ExtensionSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

/// Lifecycle of one extension for one instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtensionState {
    /// Named by the manifest, not yet negotiated.
    Declared,
    /// Asked for at instance creation, negotiation still pending.
    Requested,
    /// Confirmed available by the next layer.
    Enabled,
    /// The next layer does not offer it.
    Unavailable,
}

/// Which declared extensions are usable for one instance.
///
/// Immutable once negotiated; instance contexts hold it by value and
/// trampolines read it without locking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionRegistry {
    declared: ExtensionSet,
    requested: ExtensionSet,
    enabled: ExtensionSet,
    negotiated: bool,
}

impl ExtensionRegistry {
    /// Registry for the extensions a manifest declares.
    #[must_use]
    pub fn register(declared: ExtensionSet) -> Self {
        Self {
            declared,
            ..Self::default()
        }
    }

    /// Mark declared extensions as asked for at instance creation.
    pub fn request(&mut self, names: ExtensionSet) {
        self.requested = self.declared.intersection(names);
    }

    /// Intersect the declared set with what the layer below offers.
    pub fn negotiate(&mut self, available_below: ExtensionSet) -> ExtensionSet {
        if !self.negotiated && self.requested.is_empty() {
            self.requested = self.declared;
        }
        self.enabled = self.declared.intersection(available_below);
        self.negotiated = true;
        self.enabled
    }

    /// Whether a declared extension is enabled.
    ///
    /// # Panics
    ///
    /// Panics if `name` was never declared: the manifest is fixed at build
    /// time, so asking about anything else is a bug in the caller.
    #[must_use]
    pub fn is_enabled(&self, name: ExtensionName) -> bool {
        assert!(
            self.declared.contains(name),
            "extension {name} queried but not declared by the layer manifest"
        );
        self.enabled.contains(name)
    }

    /// Non-panicking variant used by resolution gating: undeclared extensions
    /// are never usable.
    #[must_use]
    pub const fn permits(&self, name: ExtensionName) -> bool {
        self.declared.contains(name) && self.enabled.contains(name)
    }

    /// # Panics
    ///
    /// Panics if `name` was never declared.
    #[must_use]
    pub fn state(&self, name: ExtensionName) -> ExtensionState {
        assert!(
            self.declared.contains(name),
            "extension {name} queried but not declared by the layer manifest"
        );
        if self.enabled.contains(name) {
            ExtensionState::Enabled
        } else if self.negotiated {
            ExtensionState::Unavailable
        } else if self.requested.contains(name) {
            ExtensionState::Requested
        } else {
            ExtensionState::Declared
        }
    }

    #[must_use]
    pub const fn declared(&self) -> ExtensionSet {
        self.declared
    }

    #[must_use]
    pub const fn enabled(&self) -> ExtensionSet {
        self.enabled
    }

    #[must_use]
    pub const fn is_negotiated(&self) -> bool {
        self.negotiated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use ExtensionName::{EyeGazeInteraction as A, EyeTrackingSocialFB as B, HandTracking as C};

    #[test]
    fn negotiation_is_set_intersection() {
        let mut registry = ExtensionRegistry::register(ExtensionSet::from_slice(&[A, B]));
        let enabled = registry.negotiate(ExtensionSet::from_slice(&[B, C]));
        assert_eq!(enabled, ExtensionSet::from_slice(&[B]));
        assert!(!registry.is_enabled(A));
        assert!(registry.is_enabled(B));
    }

    #[test]
    fn lifecycle_moves_from_declared_to_enabled_or_unavailable() {
        let mut registry = ExtensionRegistry::register(ExtensionSet::from_slice(&[A, B]));
        assert_eq!(registry.state(A), ExtensionState::Declared);
        registry.request(ExtensionSet::from_slice(&[A]));
        assert_eq!(registry.state(A), ExtensionState::Requested);
        assert_eq!(registry.state(B), ExtensionState::Declared);
        registry.negotiate(ExtensionSet::from_slice(&[A]));
        assert_eq!(registry.state(A), ExtensionState::Enabled);
        assert_eq!(registry.state(B), ExtensionState::Unavailable);
    }

    #[test]
    fn empty_availability_disables_everything() {
        let mut registry = ExtensionRegistry::register(ExtensionSet::from_slice(&[A]));
        assert!(registry.negotiate(ExtensionSet::empty()).is_empty());
        assert_eq!(registry.state(A), ExtensionState::Unavailable);
    }

    #[test]
    #[should_panic(expected = "not declared")]
    fn querying_undeclared_extension_is_a_bug() {
        let registry = ExtensionRegistry::register(ExtensionSet::from_slice(&[A]));
        let _ = registry.is_enabled(C);
    }

    #[test]
    fn permits_never_panics() {
        let mut registry = ExtensionRegistry::register(ExtensionSet::from_slice(&[A]));
        registry.negotiate(ExtensionSet::from_slice(&[A, C]));
        assert!(registry.permits(A));
        assert!(!registry.permits(C));
    }

    #[test]
    fn reported_names_outside_catalogue_are_ignored() {
        let set = ExtensionSet::from_names([
            "XR_KHR_vulkan_enable2",
            "XR_FB_eye_tracking_social",
            "XR_EXT_hand_tracking",
        ]);
        assert_eq!(set, ExtensionSet::from_slice(&[B, C]));
    }
}
