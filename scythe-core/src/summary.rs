//! Summary data model: per-function call-graph summaries and the
//! module-level index that owns them.
//!
//! The index keeps functions and virtual-method implementation lists in
//! GUID-ordered maps so every traversal (serialization included) is
//! deterministic without a separate sort pass.

use crate::guid::Guid;
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// Dispatch kind of a call-graph edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallKind {
    /// Static reference to a concrete function.
    Direct,
    /// Dispatch through a protocol witness table.
    Witness,
    /// Dispatch through a class vtable.
    VTable,
}

/// Dispatch kind of a virtual-method slot. Distinct from [`CallKind`]:
/// direct calls have no slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotKind {
    Witness,
    VTable,
}

/// A call-graph edge. For `Direct` edges `callee` is a concrete function
/// GUID; for `Witness`/`VTable` edges it is the GUID of the abstract
/// requirement, resolved through the slot maps during liveness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    #[serde(rename = "callee_name")]
    pub debug_name: String,
    pub callee: Guid,
    pub kind: CallKind,
}

impl Call {
    pub fn new(callee: Guid, kind: CallKind, debug_name: impl Into<String>) -> Self {
        Call {
            debug_name: debug_name.into(),
            callee,
            kind,
        }
    }

    /// The virtual-method slot this edge resolves through, or `None` for a
    /// static call.
    pub fn slot(&self) -> Option<VirtualMethodSlot> {
        let kind = match self.kind {
            CallKind::Direct => return None,
            CallKind::Witness => SlotKind::Witness,
            CallKind::VTable => SlotKind::VTable,
        };
        Some(VirtualMethodSlot::new(kind, self.callee))
    }
}

/// Abstract dispatch target: slot kind plus the GUID of the requirement.
///
/// Ordered by kind, then requirement GUID; the writer relies on this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VirtualMethodSlot {
    pub kind: SlotKind,
    pub virtual_func_id: Guid,
}

impl VirtualMethodSlot {
    pub fn new(kind: SlotKind, virtual_func_id: Guid) -> Self {
        VirtualMethodSlot {
            kind,
            virtual_func_id,
        }
    }
}

/// Per-function metadata plus outgoing call-graph edges.
///
/// `live` is meaningful only after liveness propagation over a combined
/// index; per-module summaries leave it false. `preserved` marks a liveness
/// root declared before any propagation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSummary {
    #[serde(rename = "name")]
    pub debug_name: String,
    pub guid: Guid,
    pub live: bool,
    pub preserved: bool,
    pub calls: Vec<Call>,
}

impl FunctionSummary {
    pub fn new(guid: Guid) -> Self {
        FunctionSummary {
            debug_name: String::new(),
            guid,
            live: false,
            preserved: false,
            calls: Vec::new(),
        }
    }

    pub fn add_call(&mut self, call: Call) {
        self.calls.push(call);
    }
}

/// A module's (or a merged set of modules') summary: functions keyed by
/// GUID and the two virtual-method maps keyed by requirement GUID.
///
/// Witness and vtable implementations live in separate maps so a single
/// requirement GUID can appear in both dispatch spaces without collision;
/// [`VirtualMethodSlot`] selects the map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleSummaryIndex {
    pub module_name: String,
    pub functions: BTreeMap<Guid, FunctionSummary>,
    pub witness_impls: BTreeMap<Guid, Vec<Guid>>,
    pub vtable_impls: BTreeMap<Guid, Vec<Guid>>,
}

impl ModuleSummaryIndex {
    pub fn new(module_name: impl Into<String>) -> Self {
        ModuleSummaryIndex {
            module_name: module_name.into(),
            ..Default::default()
        }
    }

    pub fn function(&self, guid: Guid) -> Option<&FunctionSummary> {
        self.functions.get(&guid)
    }

    pub fn function_mut(&mut self, guid: Guid) -> Option<&mut FunctionSummary> {
        self.functions.get_mut(&guid)
    }

    /// Insert a freshly built summary. The GUID must not already be present;
    /// merging readers go through [`merge_function_summary`] instead.
    ///
    /// [`merge_function_summary`]: ModuleSummaryIndex::merge_function_summary
    pub fn add_function_summary(&mut self, summary: FunctionSummary) {
        self.functions.insert(summary.guid, summary);
    }

    /// Fold an incoming summary into the index. If the GUID is new the
    /// summary is inserted as-is. Otherwise flags are ORed (liveness and
    /// preservation are monotone across merges), edges are appended in
    /// arrival order, and the existing debug name wins unless it is empty.
    pub fn merge_function_summary(&mut self, incoming: FunctionSummary) {
        match self.functions.entry(incoming.guid) {
            Entry::Occupied(mut slot) => {
                let existing = slot.get_mut();
                existing.live |= incoming.live;
                existing.preserved |= incoming.preserved;
                existing.calls.extend(incoming.calls);
                if existing.debug_name.is_empty() {
                    existing.debug_name = incoming.debug_name;
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(incoming);
            }
        }
    }

    fn impl_map(&self, kind: SlotKind) -> &BTreeMap<Guid, Vec<Guid>> {
        match kind {
            SlotKind::Witness => &self.witness_impls,
            SlotKind::VTable => &self.vtable_impls,
        }
    }

    /// Record `impl_guid` as an implementation of `slot`. Duplicates are
    /// dropped; first-arrival order is preserved across merges.
    pub fn add_implementation(&mut self, slot: VirtualMethodSlot, impl_guid: Guid) {
        let map = match slot.kind {
            SlotKind::Witness => &mut self.witness_impls,
            SlotKind::VTable => &mut self.vtable_impls,
        };
        let impls = map.entry(slot.virtual_func_id).or_default();
        if !impls.contains(&impl_guid) {
            impls.push(impl_guid);
        }
    }

    /// Implementations recorded for `slot`, or `None` when no module
    /// contributed any.
    pub fn implementations(&self, slot: VirtualMethodSlot) -> Option<&[Guid]> {
        self.impl_map(slot.kind)
            .get(&slot.virtual_func_id)
            .map(Vec::as_slice)
    }
}
