#![cfg(test)]
//! Tests for liveness propagation: reachability scenarios, fixed-point
//! properties, and merge commutativity of the final flags.

use crate::format::{read_module_summary, write_module_summary};
use crate::guid::{guid_from_unique_name, Guid};
use crate::liveness::{mark_live, mark_live_traced};
use crate::summary::{
    Call, CallKind, FunctionSummary, ModuleSummaryIndex, SlotKind, VirtualMethodSlot,
};

fn function(guid: Guid, name: &str, preserved: bool) -> FunctionSummary {
    let mut summary = FunctionSummary::new(guid);
    summary.debug_name = name.to_string();
    summary.preserved = preserved;
    summary
}

fn is_live(index: &ModuleSummaryIndex, guid: Guid) -> bool {
    index.function(guid).map(|f| f.live).unwrap_or(false)
}

#[test]
fn test_smoke_direct_chain() {
    // entry (preserved) --direct--> helper; both must end up live.
    let entry_guid = guid_from_unique_name("entry");
    let helper_guid = guid_from_unique_name("helper");

    let mut index = ModuleSummaryIndex::new("m");
    let mut entry = function(entry_guid, "entry", true);
    entry.add_call(Call::new(helper_guid, CallKind::Direct, "helper"));
    index.add_function_summary(entry);
    index.add_function_summary(function(helper_guid, "helper", false));

    mark_live(&mut index);

    assert!(is_live(&index, entry_guid));
    assert!(is_live(&index, helper_guid));
    assert!(index.function(entry_guid).unwrap().preserved);
    assert!(!index.function(helper_guid).unwrap().preserved);
}

#[test]
fn test_dead_leaf_stays_dead() {
    let mut index = ModuleSummaryIndex::new("m");
    index.add_function_summary(function(10, "entry", true));
    index.add_function_summary(function(20, "dead", false));

    mark_live(&mut index);

    assert!(is_live(&index, 10));
    assert!(!is_live(&index, 20));
}

#[test]
fn test_witness_devirtualization_across_modules() {
    let requirement = 900;
    let root_guid = 10;
    let impl_guid = 20;

    // Module a alone: the witness edge resolves to nothing.
    let mut only_a = ModuleSummaryIndex::new("a");
    let mut root = function(root_guid, "root", true);
    root.add_call(Call::new(requirement, CallKind::Witness, "req"));
    only_a.add_function_summary(root.clone());
    mark_live(&mut only_a);
    assert!(is_live(&only_a, root_guid));
    assert!(only_a.functions.len() == 1);

    // Merged with module b's witness table entry, the impl becomes live.
    let mut combined = ModuleSummaryIndex::new("combined");
    combined.add_function_summary(root);
    combined.add_function_summary(function(impl_guid, "impl", false));
    combined.add_implementation(
        VirtualMethodSlot::new(SlotKind::Witness, requirement),
        impl_guid,
    );
    mark_live(&mut combined);
    assert!(is_live(&combined, root_guid));
    assert!(is_live(&combined, impl_guid));
}

#[test]
fn test_vtable_slot_marks_every_implementation() {
    let requirement = 900;
    let mut index = ModuleSummaryIndex::new("combined");
    let mut caller = function(10, "caller", true);
    caller.add_call(Call::new(requirement, CallKind::VTable, "m"));
    index.add_function_summary(caller);
    index.add_function_summary(function(21, "i1", false));
    index.add_function_summary(function(22, "i2", false));
    let slot = VirtualMethodSlot::new(SlotKind::VTable, requirement);
    index.add_implementation(slot, 21);
    index.add_implementation(slot, 22);

    mark_live(&mut index);

    assert!(is_live(&index, 21));
    assert!(is_live(&index, 22));
}

#[test]
fn test_slot_kinds_do_not_bleed_into_each_other() {
    // A witness edge must not resolve through the vtable map for the same
    // requirement GUID.
    let requirement = 900;
    let mut index = ModuleSummaryIndex::new("combined");
    let mut caller = function(10, "caller", true);
    caller.add_call(Call::new(requirement, CallKind::Witness, "m"));
    index.add_function_summary(caller);
    index.add_function_summary(function(21, "vtable_impl", false));
    index.add_implementation(VirtualMethodSlot::new(SlotKind::VTable, requirement), 21);

    mark_live(&mut index);

    assert!(!is_live(&index, 21));
}

#[test]
fn test_dangling_direct_edge_is_not_an_error() {
    let mut index = ModuleSummaryIndex::new("a");
    let mut root = function(10, "root", true);
    root.add_call(Call::new(0xDEAD_BEEF, CallKind::Direct, "external"));
    index.add_function_summary(root);

    mark_live(&mut index);

    assert!(is_live(&index, 10));
    // No entry is created for the dangling callee.
    assert_eq!(index.functions.len(), 1);
    assert!(index.function(0xDEAD_BEEF).is_none());
}

#[test]
fn test_cycles_terminate() {
    let mut index = ModuleSummaryIndex::new("m");
    let mut a = function(10, "a", true);
    a.add_call(Call::new(20, CallKind::Direct, "b"));
    let mut b = function(20, "b", false);
    b.add_call(Call::new(10, CallKind::Direct, "a"));
    index.add_function_summary(a);
    index.add_function_summary(b);

    mark_live(&mut index);

    assert!(is_live(&index, 10));
    assert!(is_live(&index, 20));
}

#[test]
fn test_every_preserved_function_is_live() {
    let mut index = ModuleSummaryIndex::new("m");
    for guid in [10, 20, 30] {
        index.add_function_summary(function(guid, "", guid != 20));
    }
    mark_live(&mut index);
    for summary in index.functions.values() {
        if summary.preserved {
            assert!(summary.live);
        }
    }
}

#[test]
fn test_marking_resets_stale_live_flags() {
    let mut index = ModuleSummaryIndex::new("m");
    let mut stale = function(20, "stale", false);
    stale.live = true;
    index.add_function_summary(stale);
    index.add_function_summary(function(10, "root", true));

    mark_live(&mut index);

    assert!(!is_live(&index, 20));
}

#[test]
fn test_marking_is_idempotent() {
    let mut index = ModuleSummaryIndex::new("m");
    let mut root = function(10, "root", true);
    root.add_call(Call::new(900, CallKind::Witness, "req"));
    index.add_function_summary(root);
    index.add_function_summary(function(20, "impl", false));
    index.add_function_summary(function(30, "dead", false));
    index.add_implementation(VirtualMethodSlot::new(SlotKind::Witness, 900), 20);

    mark_live(&mut index);
    let first: Vec<(Guid, bool)> = index.functions.values().map(|f| (f.guid, f.live)).collect();
    mark_live(&mut index);
    let second: Vec<(Guid, bool)> = index.functions.values().map(|f| (f.guid, f.live)).collect();
    assert_eq!(first, second);
}

#[test]
fn test_merge_order_does_not_change_liveness() {
    let mut a = ModuleSummaryIndex::new("a");
    let mut root = function(10, "root", true);
    root.add_call(Call::new(900, CallKind::Witness, "req"));
    a.add_function_summary(root);
    a.add_implementation(VirtualMethodSlot::new(SlotKind::Witness, 900), 20);

    let mut b = ModuleSummaryIndex::new("b");
    b.add_function_summary(function(20, "impl", false));
    b.add_function_summary(function(30, "dead", false));
    b.add_implementation(VirtualMethodSlot::new(SlotKind::Witness, 900), 21);
    b.add_function_summary(function(21, "other_impl", false));

    let bytes_a = write_module_summary(&a, true);
    let bytes_b = write_module_summary(&b, true);

    let mut ab = ModuleSummaryIndex::default();
    read_module_summary(&bytes_a, &mut ab).unwrap();
    read_module_summary(&bytes_b, &mut ab).unwrap();
    mark_live(&mut ab);

    let mut ba = ModuleSummaryIndex::default();
    read_module_summary(&bytes_b, &mut ba).unwrap();
    read_module_summary(&bytes_a, &mut ba).unwrap();
    mark_live(&mut ba);

    let guids_ab: Vec<Guid> = ab.functions.keys().copied().collect();
    let guids_ba: Vec<Guid> = ba.functions.keys().copied().collect();
    assert_eq!(guids_ab, guids_ba);
    for guid in guids_ab {
        let fa = ab.function(guid).unwrap();
        let fb = ba.function(guid).unwrap();
        assert_eq!(fa.live, fb.live, "live flag differs for {}", guid);
        assert_eq!(fa.preserved, fb.preserved);
    }

    // Impl lists agree as sets.
    let slot = VirtualMethodSlot::new(SlotKind::Witness, 900);
    let mut impls_ab = ab.implementations(slot).unwrap().to_vec();
    let mut impls_ba = ba.implementations(slot).unwrap().to_vec();
    impls_ab.sort_unstable();
    impls_ba.sort_unstable();
    assert_eq!(impls_ab, impls_ba);
}

#[test]
fn test_trace_reports_chain_back_to_root() {
    let mut index = ModuleSummaryIndex::new("m");
    let mut root = function(10, "root", true);
    root.add_call(Call::new(20, CallKind::Direct, "middle"));
    let mut middle = function(20, "middle", false);
    middle.add_call(Call::new(30, CallKind::Direct, "leaf"));
    index.add_function_summary(root);
    index.add_function_summary(middle);
    index.add_function_summary(function(30, "leaf", false));

    let chains = mark_live_traced(&mut index, "leaf");

    assert_eq!(chains.len(), 1);
    let chain = &chains[0];
    assert!(chain.starts_with("leaf is referenced by:"));
    assert!(chain.contains("middle"));
    assert!(chain.contains("root"));
    // The trace never affects the live set.
    assert!(is_live(&index, 30));
}

#[test]
fn test_trace_for_unknown_symbol_is_empty() {
    let mut index = ModuleSummaryIndex::new("m");
    index.add_function_summary(function(10, "root", true));
    let chains = mark_live_traced(&mut index, "nothing");
    assert!(chains.is_empty());
}
