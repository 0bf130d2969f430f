//! Next-layer function table.
//!
//! One single-assignment cell per catalogued entry point. A cell is empty until
//! the first caller resolves it; after that the stored answer (a pointer, or
//! "the layer below returned null") is read without locking.

use std::fmt;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::DispatchError;
use crate::extension::{ExtensionName, ExtensionRegistry};
use crate::function::FunctionName;

/// Untyped entry point, as handed out by `xrGetInstanceProcAddr`.
pub type VoidFunction = openxr_sys::pfn::VoidFunction;

/// Lookup of entry points on the layer below, scoped to one instance.
pub trait ProcResolver: Send + Sync {
    /// Ask the layer below for `name`. `None` means it returned null or
    /// failed the lookup.
    fn lookup(&self, name: FunctionName) -> Option<VoidFunction>;
}

impl<F> ProcResolver for F
where
    F: Fn(FunctionName) -> Option<VoidFunction> + Send + Sync,
{
    fn lookup(&self, name: FunctionName) -> Option<VoidFunction> {
        self(name)
    }
}

/// Outcome of resolving one entry point on the layer below.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Resolved(VoidFunction),
    /// The layer below does not implement it.
    Missing,
    /// Owned by an extension that is not enabled; the layer below was not asked.
    ExtensionDisabled(ExtensionName),
}

impl Resolution {
    #[must_use]
    pub fn function(self) -> Option<VoidFunction> {
        match self {
            Self::Resolved(f) => Some(f),
            Self::Missing | Self::ExtensionDisabled(_) => None,
        }
    }

    /// Turn a non-pointer outcome into the matching error.
    pub fn into_result(self, name: FunctionName) -> Result<VoidFunction, DispatchError> {
        match self {
            Self::Resolved(f) => Ok(f),
            Self::Missing => Err(DispatchError::Unsupported(name)),
            Self::ExtensionDisabled(extension) => Err(DispatchError::ExtensionDisabled {
                function: name,
                extension,
            }),
        }
    }
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolved(ptr) => write!(f, "Resolved({:#x})", *ptr as usize),
            Self::Missing => f.write_str("Missing"),
            Self::ExtensionDisabled(ext) => write!(f, "ExtensionDisabled({ext})"),
        }
    }
}

/// Resolve-once cache in front of a [`ProcResolver`].
pub struct NextLayerTable {
    resolver: Box<dyn ProcResolver>,
    slots: [OnceLock<Option<VoidFunction>>; FunctionName::COUNT],
    lookups: AtomicU64,
}

impl NextLayerTable {
    pub fn new(resolver: impl ProcResolver + 'static) -> Self {
        Self {
            resolver: Box::new(resolver),
            slots: std::array::from_fn(|_| OnceLock::new()),
            lookups: AtomicU64::new(0),
        }
    }

    /// Resolve `name`, asking the layer below at most once per slot.
    ///
    /// Functions owned by an extension the registry does not permit are
    /// answered with [`Resolution::ExtensionDisabled`] and the slot stays
    /// empty.
    pub fn resolve(&self, name: FunctionName, extensions: &ExtensionRegistry) -> Resolution {
        if let Some(ext) = name.owning_extension()
            && !extensions.permits(ext)
        {
            return Resolution::ExtensionDisabled(ext);
        }
        let slot = self.slots[name.index()].get_or_init(|| {
            self.lookups.fetch_add(1, Ordering::Relaxed);
            self.resolver.lookup(name)
        });
        match *slot {
            Some(f) => Resolution::Resolved(f),
            None => Resolution::Missing,
        }
    }

    /// Cached state of a slot: `None` if never resolved, `Some(None)` if the
    /// layer below returned null.
    #[must_use]
    pub fn peek(&self, name: FunctionName) -> Option<Option<VoidFunction>> {
        self.slots[name.index()].get().copied()
    }

    /// Number of lookups forwarded to the layer below so far.
    #[must_use]
    pub fn lookups(&self) -> u64 {
        self.lookups.load(Ordering::Relaxed)
    }

    /// Slots holding a non-null pointer.
    #[must_use]
    pub fn resolved_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot.get(), Some(Some(_))))
            .count()
    }

    /// Resolve and reinterpret as the typed signature `F`.
    ///
    /// # Safety
    ///
    /// `F` must be the `extern "system"` function pointer type matching the
    /// API signature of `name`.
    pub unsafe fn resolve_as<F: Copy>(
        &self,
        name: FunctionName,
        extensions: &ExtensionRegistry,
    ) -> Result<F, DispatchError> {
        let f = self.resolve(name, extensions).into_result(name)?;
        // SAFETY: the caller guarantees F is a function pointer type for
        // `name`; function pointers share one size and representation.
        Ok(unsafe { cast_function::<F>(f) })
    }
}

impl fmt::Debug for NextLayerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NextLayerTable")
            .field("lookups", &self.lookups())
            .field("resolved", &self.resolved_count())
            .finish_non_exhaustive()
    }
}

/// Reinterpret an untyped entry point as `F`.
///
/// # Safety
///
/// `F` must be a function pointer type whose ABI matches the function `f`
/// actually points to.
pub unsafe fn cast_function<F: Copy>(f: VoidFunction) -> F {
    assert_eq!(
        std::mem::size_of::<F>(),
        std::mem::size_of::<VoidFunction>(),
        "cast target is not a function pointer"
    );
    // SAFETY: sizes checked above; ABI guaranteed by the caller.
    unsafe { std::mem::transmute_copy::<VoidFunction, F>(&f) }
}
