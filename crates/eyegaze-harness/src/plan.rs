//! Dispatch plan of a manifest variant.
//!
//! The plan is built from the manifest alone, with placeholder trampolines, so
//! it can be produced without loading the layer library. Its digest changes
//! whenever a route, a requested flag or an owning extension changes.

use eyegaze_dispatch::{
    DispatchTable, FunctionName, LAYER_NAME, ManifestVariant, RoutePlanEntry, VoidFunction,
};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::HarnessError;

extern "system" fn placeholder() {}

fn placeholder_trampoline(_: FunctionName) -> Option<VoidFunction> {
    Some(placeholder as VoidFunction)
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanReport {
    pub layer_name: &'static str,
    pub variant: ManifestVariant,
    pub trampolines: usize,
    pub pass_through: usize,
    /// Lower-case hex SHA-256 of the serialized `routes`.
    pub digest: String,
    pub routes: Vec<RoutePlanEntry>,
}

pub fn build_plan(variant: ManifestVariant) -> Result<PlanReport, HarnessError> {
    let manifest = crate::manifest::check_variant(variant)?.manifest;
    let table = DispatchTable::build(&manifest, &placeholder_trampoline)?;
    let routes = table.plan();
    let trampolines = routes.iter().filter(|r| r.route == "trampoline").count();
    let digest = hex_lower(&Sha256::digest(serde_json::to_vec(&routes)?));
    Ok(PlanReport {
        layer_name: LAYER_NAME,
        variant,
        trampolines,
        pass_through: routes.len() - trampolines,
        digest,
        routes,
    })
}

fn hex_lower(bytes: &[u8]) -> String {
    use std::fmt::Write;
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}
