//! Liveness propagation over a combined summary index.
//!
//! Worklist fixed point from the preserved roots. Direct edges push their
//! callee; witness and vtable edges push every implementation recorded at
//! the slot (conservative conformance-based devirtualization). Dangling
//! GUIDs, that is references to functions whose defining module was not
//! loaded, are skipped rather than treated as errors. The final live set is
//! the least fixed point and is independent of pop order.

use crate::guid::Guid;
use crate::summary::{CallKind, ModuleSummaryIndex, SlotKind, VirtualMethodSlot};
use log::debug;
use std::fmt::Write;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MarkReason {
    Preserved,
    StaticRef,
    IndirectRef,
}

impl MarkReason {
    fn label(self) -> &'static str {
        match self {
            MarkReason::Preserved => "preserved",
            MarkReason::StaticRef => "direct",
            MarkReason::IndirectRef => "indirect",
        }
    }
}

/// Back-pointer chain node recording who pushed a GUID and why. Kept
/// out-of-band; never touches the index or the on-disk format.
struct TraceNode {
    marked_by: Option<Rc<TraceNode>>,
    guid: Guid,
    symbol: String,
    reason: MarkReason,
}

struct Work {
    guid: Guid,
    trace: Option<Rc<TraceNode>>,
}

fn render_chain(node: &TraceNode) -> String {
    let mut out = String::new();
    if node.symbol.is_empty() {
        let _ = write!(out, "**missing name** ({})", node.guid);
    } else {
        out.push_str(&node.symbol);
    }
    out.push_str(" is referenced by:\n");

    let mut current = node.marked_by.clone();
    while let Some(ancestor) = current {
        out.push_str(" - ");
        if ancestor.symbol.is_empty() {
            out.push_str("**missing name**");
        } else {
            out.push_str(&ancestor.symbol);
        }
        let _ = writeln!(out, " ({}) [{}]", ancestor.guid, ancestor.reason.label());
        current = ancestor.marked_by.clone();
    }
    out
}

fn enqueue(
    index: &ModuleSummaryIndex,
    worklist: &mut Vec<Work>,
    parent: &Option<Rc<TraceNode>>,
    tracing: bool,
    guid: Guid,
    reason: MarkReason,
) {
    let trace = if tracing {
        let symbol = index
            .function(guid)
            .map(|summary| summary.debug_name.clone())
            .unwrap_or_default();
        Some(Rc::new(TraceNode {
            marked_by: parent.clone(),
            guid,
            symbol,
            reason,
        }))
    } else {
        None
    };
    worklist.push(Work { guid, trace });
}

fn mark(index: &mut ModuleSummaryIndex, trace_symbol: Option<&str>) -> Vec<String> {
    let tracing = trace_symbol.is_some();

    for summary in index.functions.values_mut() {
        summary.live = false;
    }

    let mut worklist: Vec<Work> = Vec::new();
    for summary in index.functions.values() {
        if summary.preserved {
            let trace = tracing.then(|| {
                Rc::new(TraceNode {
                    marked_by: None,
                    guid: summary.guid,
                    symbol: summary.debug_name.clone(),
                    reason: MarkReason::Preserved,
                })
            });
            worklist.push(Work {
                guid: summary.guid,
                trace,
            });
        }
    }

    let mut chains = Vec::new();
    while let Some(work) = worklist.pop() {
        // Dangling external reference.
        let Some(summary) = index.functions.get_mut(&work.guid) else {
            continue;
        };
        if summary.live {
            continue;
        }
        summary.live = true;
        if summary.debug_name.is_empty() {
            debug!("marking ({}) as live", summary.guid);
        } else {
            debug!("marking {} as live", summary.debug_name);
        }

        if let (Some(symbol), Some(trace)) = (trace_symbol, &work.trace) {
            if trace.symbol == symbol {
                chains.push(render_chain(trace));
            }
        }

        let edges: Vec<(CallKind, Guid)> = summary
            .calls
            .iter()
            .map(|call| (call.kind, call.callee))
            .collect();
        for (kind, callee) in edges {
            match kind {
                CallKind::Direct => {
                    enqueue(
                        index,
                        &mut worklist,
                        &work.trace,
                        tracing,
                        callee,
                        MarkReason::StaticRef,
                    );
                }
                CallKind::Witness | CallKind::VTable => {
                    let slot_kind = match kind {
                        CallKind::Witness => SlotKind::Witness,
                        _ => SlotKind::VTable,
                    };
                    let slot = VirtualMethodSlot::new(slot_kind, callee);
                    let impls: Vec<Guid> = index
                        .implementations(slot)
                        .map(|impls| impls.to_vec())
                        .unwrap_or_default();
                    for impl_guid in impls {
                        enqueue(
                            index,
                            &mut worklist,
                            &work.trace,
                            tracing,
                            impl_guid,
                            MarkReason::IndirectRef,
                        );
                    }
                }
            }
        }
    }
    chains
}

/// Set `live` on exactly the summaries reachable from the preserved roots.
pub fn mark_live(index: &mut ModuleSummaryIndex) {
    mark(index, None);
}

/// Like [`mark_live`], additionally collecting a rendered reference chain
/// for every live function whose debug name equals `symbol`.
pub fn mark_live_traced(index: &mut ModuleSummaryIndex, symbol: &str) -> Vec<String> {
    mark(index, Some(symbol))
}
