//! Cross-module merging of summary files.

use crate::error::{Result, SummaryError};
use crate::format;
use crate::summary::ModuleSummaryIndex;
use log::debug;
use std::fs;
use std::path::PathBuf;

/// Load each summary file into one combined index named `label`.
///
/// The merge is commutative with respect to set contents (function GUIDs,
/// slot implementations as sets); edge and implementation order reflects
/// load order.
pub fn load_combined_index(paths: &[PathBuf], label: &str) -> Result<ModuleSummaryIndex> {
    let mut index = ModuleSummaryIndex::default();
    for path in paths {
        debug!("loading module summary {}", path.display());
        let bytes = fs::read(path).map_err(|source| SummaryError::io(path.as_path(), source))?;
        format::read_module_summary(&bytes, &mut index)?;
    }
    index.module_name = label.to_string();
    Ok(index)
}
