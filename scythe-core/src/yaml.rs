//! Textual representation of a summary index.
//!
//! Used by the round-trip converter tool and by humans inspecting summary
//! files. Only the binary format is part of the on-disk contract; this form
//! may change freely.

use crate::error::Result;
use crate::summary::ModuleSummaryIndex;

pub fn to_yaml(index: &ModuleSummaryIndex) -> Result<String> {
    Ok(serde_yaml::to_string(index)?)
}

pub fn from_yaml(text: &str) -> Result<ModuleSummaryIndex> {
    Ok(serde_yaml::from_str(text)?)
}
