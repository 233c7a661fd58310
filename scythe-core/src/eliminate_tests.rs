#![cfg(test)]
//! Tests for the elimination pass: function erasure, table pruning, and
//! the leave-alone rule for symbols outside the analysis.

use crate::eliminate::eliminate_dead_functions;
use crate::indexer::build_module_summary;
use crate::ir;
use crate::liveness::mark_live;
use crate::summary::ModuleSummaryIndex;

fn preserved_function(name: &str) -> ir::Function {
    let mut function = ir::Function::new(name);
    function.has_c_references = true;
    function
}

/// Index `module`, mark liveness, and return the annotated index.
fn marked_index(module: &ir::Module) -> ModuleSummaryIndex {
    let mut index = build_module_summary(module).unwrap();
    mark_live(&mut index);
    index
}

#[test]
fn test_dead_leaf_is_erased() {
    let mut module = ir::Module::new("m");
    module.functions.push(preserved_function("entry"));
    module.functions.push(ir::Function::new("dead"));

    let index = marked_index(&module);
    let erased = eliminate_dead_functions(&mut module, &index);

    assert_eq!(erased, 1);
    assert!(module.function("entry").is_some());
    assert!(module.function("dead").is_none());
}

#[test]
fn test_live_chain_is_retained_with_body_intact() {
    let mut entry = preserved_function("entry");
    entry.instructions = vec![
        ir::Instruction::FunctionRef {
            callee: "helper".to_string(),
        },
        ir::Instruction::FunctionRef {
            callee: "helper".to_string(),
        },
    ];
    let mut module = ir::Module::new("m");
    module.functions.push(entry);
    module.functions.push(ir::Function::new("helper"));

    let index = marked_index(&module);
    let erased = eliminate_dead_functions(&mut module, &index);

    assert_eq!(erased, 0);
    // Retained functions keep all their original body edges.
    assert_eq!(module.function("entry").unwrap().instructions.len(), 2);
    assert!(module.function("helper").is_some());
}

#[test]
fn test_functions_outside_the_index_are_left_alone() {
    let mut analyzed = ir::Module::new("m");
    analyzed.functions.push(preserved_function("entry"));
    let index = marked_index(&analyzed);

    let mut other = ir::Module::new("other");
    other.functions.push(ir::Function::new("not_analyzed"));
    let erased = eliminate_dead_functions(&mut other, &index);

    assert_eq!(erased, 0);
    assert!(other.function("not_analyzed").is_some());
}

#[test]
fn test_dead_vtable_entries_are_removed() {
    let mut module = ir::Module::new("m");
    module.functions.push(preserved_function("entry"));
    module.functions.push(ir::Function::new("dead_impl"));
    module.functions.push(ir::Function::new("kept_impl"));
    // kept_impl is a deallocator, so the vtable anchors root keeps it live.
    module.vtables.push(ir::VTable {
        class_name: "C".to_string(),
        entries: vec![
            ir::VTableEntry {
                method: "C.dead".to_string(),
                implementation: "dead_impl".to_string(),
                kind: ir::MethodKind::Normal,
                is_override: false,
                method_is_external: false,
            },
            ir::VTableEntry {
                method: "C.deinit".to_string(),
                implementation: "kept_impl".to_string(),
                kind: ir::MethodKind::Deallocator,
                is_override: false,
                method_is_external: false,
            },
        ],
    });

    let index = marked_index(&module);
    eliminate_dead_functions(&mut module, &index);

    let entries = &module.vtables[0].entries;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].implementation, "kept_impl");
    assert!(module.function("dead_impl").is_none());
    assert!(module.function("kept_impl").is_some());
}

#[test]
fn test_dead_witnesses_are_removed() {
    let mut module = ir::Module::new("m");
    module.functions.push(preserved_function("entry"));
    module.functions.push(ir::Function::new("dead_witness"));
    module.witness_tables.push(ir::WitnessTable {
        protocol_name: "P".to_string(),
        is_external: false,
        entries: vec![
            ir::WitnessTableEntry {
                requirement: "P.req".to_string(),
                witness: Some("dead_witness".to_string()),
            },
            ir::WitnessTableEntry {
                requirement: "P.absent".to_string(),
                witness: None,
            },
        ],
    });

    let index = marked_index(&module);
    eliminate_dead_functions(&mut module, &index);

    let entries = &module.witness_tables[0].entries;
    assert_eq!(entries.len(), 1);
    assert!(entries[0].witness.is_none());
}

#[test]
fn test_dead_default_witness_slots_are_cleared() {
    let mut module = ir::Module::new("m");
    module.functions.push(preserved_function("entry"));
    module.functions.push(ir::Function::new("dead_default"));
    module.default_witness_tables.push(ir::DefaultWitnessTable {
        protocol_name: "P".to_string(),
        entries: vec![
            Some("dead_default".to_string()),
            Some("unknown_function".to_string()),
            None,
        ],
    });

    let index = marked_index(&module);
    eliminate_dead_functions(&mut module, &index);

    let entries = &module.default_witness_tables[0].entries;
    // Dead slot cleared, unknown implementation retained, empty untouched.
    assert_eq!(
        entries,
        &vec![None, Some("unknown_function".to_string()), None]
    );
}
