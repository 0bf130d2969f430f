//! Catalogue of API entry points known to this build.
//!
//! Every table in the dispatch core is an array indexed by [`FunctionName`], so
//! adding an entry point here is the only change needed to give it a slot.

use std::ffi::CStr;
use std::fmt;

use serde::{Serialize, Serializer};

use crate::extension::ExtensionName;

macro_rules! function_catalogue {
    (
        $(
            $variant:ident => $name:literal $(, ext = $ext:ident)? ;
        )+
    ) => {
        /// One entry point of the wrapped API.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u8)]
        pub enum FunctionName {
            $( $variant, )+
        }

        impl FunctionName {
            /// Every catalogued entry point, in slot order.
            pub const ALL: &'static [FunctionName] = &[ $( FunctionName::$variant, )+ ];

            /// API spelling of the entry point.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $( FunctionName::$variant => $name, )+
                }
            }

            /// NUL-terminated spelling, as passed to `xrGetInstanceProcAddr`.
            #[must_use]
            pub const fn as_cstr(self) -> &'static CStr {
                match self {
                    $(
                        FunctionName::$variant => {
                            match CStr::from_bytes_with_nul(concat!($name, "\0").as_bytes()) {
                                Ok(name) => name,
                                Err(_) => panic!("catalogue name contains an interior NUL"),
                            }
                        }
                    )+
                }
            }

            /// Extension that must be enabled before this entry point may be
            /// resolved, or `None` for core functions.
            #[must_use]
            pub const fn owning_extension(self) -> Option<ExtensionName> {
                match self {
                    $( FunctionName::$variant => function_catalogue!(@ext $($ext)?), )+
                }
            }
        }
    };
    (@ext) => { None };
    (@ext $ext:ident) => { Some(ExtensionName::$ext) };
}

function_catalogue! {
    GetInstanceProcAddr => "xrGetInstanceProcAddr";
    EnumerateInstanceExtensionProperties => "xrEnumerateInstanceExtensionProperties";
    CreateInstance => "xrCreateInstance";
    DestroyInstance => "xrDestroyInstance";
    GetInstanceProperties => "xrGetInstanceProperties";
    PollEvent => "xrPollEvent";
    GetSystem => "xrGetSystem";
    GetSystemProperties => "xrGetSystemProperties";
    StringToPath => "xrStringToPath";
    PathToString => "xrPathToString";
    SuggestInteractionProfileBindings => "xrSuggestInteractionProfileBindings";
    AttachSessionActionSets => "xrAttachSessionActionSets";
    CreateSession => "xrCreateSession";
    DestroySession => "xrDestroySession";
    BeginSession => "xrBeginSession";
    EndSession => "xrEndSession";
    GetCurrentInteractionProfile => "xrGetCurrentInteractionProfile";
    CreateReferenceSpace => "xrCreateReferenceSpace";
    CreateActionSpace => "xrCreateActionSpace";
    DestroySpace => "xrDestroySpace";
    LocateSpace => "xrLocateSpace";
    SyncActions => "xrSyncActions";
    GetActionStatePose => "xrGetActionStatePose";
    EnumerateBoundSourcesForAction => "xrEnumerateBoundSourcesForAction";
    GetInputSourceLocalizedName => "xrGetInputSourceLocalizedName";
    WaitFrame => "xrWaitFrame";
    BeginFrame => "xrBeginFrame";
    EndFrame => "xrEndFrame";
    CreateEyeTrackerFB => "xrCreateEyeTrackerFB", ext = EyeTrackingSocialFB;
    DestroyEyeTrackerFB => "xrDestroyEyeTrackerFB", ext = EyeTrackingSocialFB;
    GetEyeGazesFB => "xrGetEyeGazesFB", ext = EyeTrackingSocialFB;
}

impl FunctionName {
    /// Number of catalogued entry points (slot count of every table).
    pub const COUNT: usize = Self::ALL.len();

    /// Slot index in the array-backed tables.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Look up a catalogued entry point by its API spelling.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.as_str() == name)
    }

    /// Same as [`FunctionName::from_name`] for names coming from C callers.
    #[must_use]
    pub fn from_cstr(name: &CStr) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.as_cstr() == name)
    }
}

const _: () = assert!(FunctionName::COUNT <= 64, "FunctionSet is a u64 bitset");

impl fmt::Display for FunctionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FunctionName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Set of catalogued entry points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FunctionSet {
    bits: u64,
}

impl FunctionSet {
    /// Empty set.
    #[must_use]
    pub const fn empty() -> Self {
        Self { bits: 0 }
    }

    /// Set containing exactly `names`.
    #[must_use]
    pub fn from_slice(names: &[FunctionName]) -> Self {
        let mut set = Self::empty();
        for &name in names {
            set.insert(name);
        }
        set
    }

    /// Insert `name`; returns false if it was already present.
    pub fn insert(&mut self, name: FunctionName) -> bool {
        let bit = 1_u64 << name.index();
        let fresh = self.bits & bit == 0;
        self.bits |= bit;
        fresh
    }

    #[must_use]
    pub const fn contains(self, name: FunctionName) -> bool {
        self.bits & (1_u64 << name.index()) != 0
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self {
            bits: self.bits | other.bits,
        }
    }

    #[must_use]
    pub const fn intersection(self, other: Self) -> Self {
        Self {
            bits: self.bits & other.bits,
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

    /// Members in catalogue order.
    pub fn iter(self) -> impl Iterator<Item = FunctionName> {
        FunctionName::ALL
            .iter()
            .copied()
            .filter(move |name| self.contains(*name))
    }
}

impl FromIterator<FunctionName> for FunctionSet {
    fn from_iter<T: IntoIterator<Item = FunctionName>>(iter: T) -> Self {
        let mut set = Self::empty();
        for name in iter {
            set.insert(name);
        }
        set
    }
}

impl Serialize for FunctionSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}
