//! Dead-code elimination against a loaded combined index.
//!
//! Functions the index does not know about belong to modules outside the
//! analysis and are left untouched. Known-but-dead functions are erased
//! bottom-up by GUID so output order is stable; dead virtual-table entries
//! and default-witness slots are stripped alongside.

use crate::guid::guid_from_unique_name;
use crate::ir;
use crate::summary::ModuleSummaryIndex;
use log::debug;

/// Whether `name` is present in the index and not live. Unknown symbols are
/// never dead: their module was not part of the analysis.
fn is_dead(index: &ModuleSummaryIndex, name: &str) -> bool {
    index
        .function(guid_from_unique_name(name))
        .map(|summary| !summary.live)
        .unwrap_or(false)
}

/// Prune `module` against the combined index. Returns the number of erased
/// functions.
pub fn eliminate_dead_functions(module: &mut ir::Module, index: &ModuleSummaryIndex) -> usize {
    let mut dead: Vec<(u64, String)> = module
        .functions
        .iter()
        .filter(|function| is_dead(index, &function.name))
        .map(|function| (guid_from_unique_name(&function.name), function.name.clone()))
        .collect();
    dead.sort_by(|a, b| b.0.cmp(&a.0));

    let mut erased = 0;
    for (_, name) in dead {
        if module.erase_function(&name) {
            debug!("eliminating dead function {}", name);
            erased += 1;
        }
    }

    for vtable in &mut module.vtables {
        vtable
            .entries
            .retain(|entry| !is_dead(index, &entry.implementation));
    }

    for table in &mut module.witness_tables {
        table.entries.retain(|entry| match &entry.witness {
            Some(witness) => !is_dead(index, witness),
            None => true,
        });
    }

    for table in &mut module.default_witness_tables {
        for slot in &mut table.entries {
            if slot.as_deref().is_some_and(|witness| is_dead(index, witness)) {
                *slot = None;
            }
        }
    }

    debug!("eliminated {} dead functions from '{}'", erased, module.name);
    erased
}
