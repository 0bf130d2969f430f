//! Error types of the dispatch core.
//!
//! Nothing here crosses the C boundary as-is: [`DispatchError::to_xr_result`]
//! folds every variant into the wrapped API's own result codes.

use openxr_sys as xr;
use thiserror::Error;

use crate::extension::ExtensionName;
use crate::function::FunctionName;
use crate::manifest::ManifestList;

/// Invalid layer manifest. Fatal: the manifest is fixed at build time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManifestError {
    #[error("{list}: `{name}` is not an API function known to this build")]
    UnknownFunction { list: ManifestList, name: String },
    #[error("extensions: `{0}` is not an extension known to this build")]
    UnknownExtension(String),
    #[error("{list}: `{name}` is listed more than once")]
    Duplicate { list: ManifestList, name: String },
    #[error("{list}: `{function}` belongs to `{extension}`, which the manifest does not declare")]
    UndeclaredExtension {
        list: ManifestList,
        function: FunctionName,
        extension: ExtensionName,
    },
}

/// Runtime failure inside the dispatch core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("no trampoline available for intercepted function {0}")]
    MissingTrampoline(FunctionName),
    #[error("{0} is not implemented by the next layer")]
    Unsupported(FunctionName),
    #[error("{function} requires {extension}, which is not enabled for this instance")]
    ExtensionDisabled {
        function: FunctionName,
        extension: ExtensionName,
    },
    #[error("handle {0:#x} is not tracked by this layer")]
    UnknownHandle(u64),
    #[error("invalid `{0}` structure passed by the caller")]
    InvalidArgument(&'static str),
    #[error("next layer failed with result {0}")]
    NextLayer(i32),
    #[error("layer runtime has been shut down")]
    ShutDown,
}

impl DispatchError {
    /// Result code reported to the caller above.
    #[must_use]
    pub fn to_xr_result(&self) -> xr::Result {
        match self {
            Self::MissingTrampoline(_) => xr::Result::ERROR_RUNTIME_FAILURE,
            Self::Unsupported(_) | Self::ExtensionDisabled { .. } => {
                xr::Result::ERROR_FUNCTION_UNSUPPORTED
            }
            Self::UnknownHandle(_) => xr::Result::ERROR_HANDLE_INVALID,
            Self::InvalidArgument(_) => xr::Result::ERROR_VALIDATION_FAILURE,
            Self::NextLayer(raw) => xr::Result::from_raw(*raw),
            Self::ShutDown => xr::Result::ERROR_INSTANCE_LOST,
        }
    }

    /// Wrap a failure code returned by the next layer.
    #[must_use]
    pub fn from_next(result: xr::Result) -> Self {
        Self::NextLayer(result.into_raw())
    }
}
