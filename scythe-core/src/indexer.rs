//! Walks one module into a populated [`ModuleSummaryIndex`].
//!
//! Per function, every instruction yields at most one call-graph edge
//! classified by dispatch kind. Dispatch tables populate the slot maps.
//! Structural roots (implementations of external protocols, deallocators,
//! overrides of externally declared methods, key-path targets) are pinned
//! through synthetic preservation summaries so the liveness engine only
//! ever sees ordinary call-graph edges.

use crate::bail_index;
use crate::error::Result;
use crate::guid::{
    guid_from_unique_name, is_reserved_guid, Guid, SYNTHETIC_EXTERNAL_WITNESSES,
    SYNTHETIC_KEY_PATHS, SYNTHETIC_VTABLE_ANCHORS,
};
use crate::ir;
use crate::summary::{Call, CallKind, FunctionSummary, ModuleSummaryIndex, SlotKind, VirtualMethodSlot};
use log::debug;

/// Hash a natural symbol, rejecting the reserved synthetic range.
fn natural_guid(name: &str) -> Result<Guid> {
    let guid = guid_from_unique_name(name);
    if is_reserved_guid(guid) {
        bail_index!(
            "symbol '{}' hashes into the GUID range reserved for synthetic summaries",
            name
        );
    }
    Ok(guid)
}

fn should_preserve_function(function: &ir::Function) -> bool {
    function.has_foreign_convention || function.has_c_references
}

struct FunctionSummaryIndexer<'a> {
    function: &'a ir::Function,
    summary: FunctionSummary,
}

impl<'a> FunctionSummaryIndexer<'a> {
    fn new(function: &'a ir::Function) -> Result<Self> {
        let guid = natural_guid(&function.name)?;
        let mut summary = FunctionSummary::new(guid);
        summary.debug_name = function.name.clone();
        Ok(FunctionSummaryIndexer { function, summary })
    }

    fn index_direct_call(&mut self, callee: &str) -> Result<()> {
        let guid = natural_guid(callee)?;
        self.summary.add_call(Call::new(guid, CallKind::Direct, callee));
        Ok(())
    }

    fn index_indirect_call(&mut self, method: &str, kind: CallKind) -> Result<()> {
        let guid = natural_guid(method)?;
        self.summary.add_call(Call::new(guid, kind, method));
        Ok(())
    }

    fn index_instruction(&mut self, instruction: &ir::Instruction) -> Result<()> {
        match instruction {
            ir::Instruction::FunctionRef { callee } => self.index_direct_call(callee),
            ir::Instruction::WitnessMethod { method } => {
                self.index_indirect_call(method, CallKind::Witness)
            }
            ir::Instruction::ClassMethod { method } => {
                self.index_indirect_call(method, CallKind::VTable)
            }
            ir::Instruction::KeyPath { components } => {
                for component in components {
                    index_key_path_component(component, &mut self.summary)?;
                }
                Ok(())
            }
        }
    }

    fn index_function(mut self) -> Result<FunctionSummary> {
        for instruction in &self.function.instructions {
            self.index_instruction(instruction)?;
        }
        self.summary.preserved = should_preserve_function(self.function);
        Ok(self.summary)
    }
}

/// Add the edges of one key-path component to `summary`: a `Direct` edge
/// per referenced function, a `Witness` or `VTable` edge per referenced
/// abstract method depending on its declaring context.
fn index_key_path_component(
    component: &ir::KeyPathComponent,
    summary: &mut FunctionSummary,
) -> Result<()> {
    for function in &component.functions {
        let guid = natural_guid(function)?;
        summary.add_call(Call::new(guid, CallKind::Direct, function));
    }
    for method in &component.methods {
        let kind = match method.context {
            ir::MethodContext::Class => CallKind::VTable,
            ir::MethodContext::Protocol => CallKind::Witness,
        };
        let guid = natural_guid(&method.mangled_name)?;
        summary.add_call(Call::new(guid, kind, method.mangled_name.as_str()));
    }
    Ok(())
}

/// Build the summary of a single function.
pub fn build_function_summary(function: &ir::Function) -> Result<FunctionSummary> {
    FunctionSummaryIndexer::new(function)?.index_function()
}

/// Record witness-table implementations in the slot maps. Witnesses of
/// external protocols are reachable through foreign conformances, so they
/// are additionally pinned on the synthetic root.
fn index_witness_tables(
    index: &mut ModuleSummaryIndex,
    module: &ir::Module,
) -> Result<FunctionSummary> {
    let mut synthetic = FunctionSummary::new(SYNTHETIC_EXTERNAL_WITNESSES);
    synthetic.preserved = true;
    synthetic.debug_name = "__external_witnesses_preserved".to_string();

    for table in &module.witness_tables {
        for entry in &table.entries {
            let Some(witness) = &entry.witness else {
                continue;
            };
            let impl_guid = natural_guid(witness)?;
            let slot = VirtualMethodSlot::new(SlotKind::Witness, natural_guid(&entry.requirement)?);
            index.add_implementation(slot, impl_guid);
            if table.is_external {
                synthetic.add_call(Call::new(impl_guid, CallKind::Direct, witness.as_str()));
            }
        }
    }

    debug!(
        "pinned {} witnesses of external protocols",
        synthetic.calls.len()
    );
    Ok(synthetic)
}

/// Record vtable implementations in the slot maps. Deallocators and ivar
/// destroyers are reachable from runtime release, overrides of externally
/// declared methods from clients outside the analyzed set; both are pinned
/// on the synthetic root.
fn index_vtables(index: &mut ModuleSummaryIndex, module: &ir::Module) -> Result<FunctionSummary> {
    let mut synthetic = FunctionSummary::new(SYNTHETIC_VTABLE_ANCHORS);
    synthetic.preserved = true;
    synthetic.debug_name = "__vtable_anchors_preserved".to_string();

    for table in &module.vtables {
        for entry in &table.entries {
            let impl_guid = natural_guid(&entry.implementation)?;
            let is_destructor = matches!(
                entry.kind,
                ir::MethodKind::Deallocator | ir::MethodKind::IvarDestroyer
            );
            if is_destructor || (entry.is_override && entry.method_is_external) {
                synthetic.add_call(Call::new(
                    impl_guid,
                    CallKind::Direct,
                    entry.implementation.as_str(),
                ));
            }
            let slot = VirtualMethodSlot::new(SlotKind::VTable, natural_guid(&entry.method)?);
            index.add_implementation(slot, impl_guid);
        }
    }

    debug!(
        "pinned {} vtable destructors and external overrides",
        synthetic.calls.len()
    );
    Ok(synthetic)
}

/// Pin functions and methods referenced by key-path property descriptors.
fn index_key_paths(module: &ir::Module) -> Result<FunctionSummary> {
    let mut synthetic = FunctionSummary::new(SYNTHETIC_KEY_PATHS);
    synthetic.preserved = true;
    synthetic.debug_name = "__key_path_preserved".to_string();

    for property in &module.properties {
        if let Some(component) = &property.component {
            index_key_path_component(component, &mut synthetic)?;
        }
    }
    Ok(synthetic)
}

/// Walk `module` and produce its summary index. All `live` flags start
/// false; they only become meaningful after liveness propagation over a
/// combined index.
pub fn build_module_summary(module: &ir::Module) -> Result<ModuleSummaryIndex> {
    let mut index = ModuleSummaryIndex::new(module.name.clone());

    for function in &module.functions {
        index.add_function_summary(build_function_summary(function)?);
    }

    let witnesses = index_witness_tables(&mut index, module)?;
    let anchors = index_vtables(&mut index, module)?;
    let key_paths = index_key_paths(module)?;
    for synthetic in [witnesses, anchors, key_paths] {
        if !synthetic.calls.is_empty() {
            index.add_function_summary(synthetic);
        }
    }

    Ok(index)
}
