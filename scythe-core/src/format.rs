//! Binary serialization of a [`ModuleSummaryIndex`].
//!
//! A summary file is a `MODS` signature, a blockinfo block naming the
//! record block and its records for diagnostic tools, and a single record
//! block holding the summary records in a fixed grammar:
//!
//! ```text
//! ModuleSummary  ::= MODULE_METADATA  FunctionGroup*  SlotGroup*
//! FunctionGroup  ::= FUNC_METADATA    CALL_GRAPH_EDGE*
//! SlotGroup      ::= METHOD_METADATA  METHOD_IMPL*
//! ```
//!
//! Record layouts (bit widths are part of the on-disk contract):
//!
//! | record            | payload                                          |
//! |-------------------|--------------------------------------------------|
//! | `MODULE_METADATA` | blob module name                                 |
//! | `FUNC_METADATA`   | vbr16 guid, fixed1 live, fixed1 preserved, blob  |
//! | `CALL_GRAPH_EDGE` | fixed2 kind, vbr16 callee guid, blob             |
//! | `METHOD_METADATA` | fixed1 slot kind, vbr16 virtual func guid        |
//! | `METHOD_IMPL`     | vbr16 impl guid                                  |
//!
//! Reading accumulates into a caller-supplied index; reading several files
//! into the same index is how cross-module merging works. A `FUNC_METADATA`
//! whose GUID is already present updates the existing summary (flags ORed,
//! edges appended) instead of inserting a new one.

use crate::bitstream::{
    BitstreamReader, BitstreamWriter, END_BLOCK, ENTER_SUBBLOCK, TOP_LEVEL_ABBREV_WIDTH,
};
use crate::error::{Result, SummaryError};
use crate::guid::Guid;
use crate::summary::{Call, CallKind, FunctionSummary, ModuleSummaryIndex, SlotKind, VirtualMethodSlot};
use crate::{bail_orphan, bail_truncated};
use log::debug;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub const MODULE_SUMMARY_SIGNATURE: [u8; 4] = *b"MODS";

const BLOCKINFO_BLOCK_ID: u64 = 0;
const RECORD_BLOCK_ID: u64 = 8;

const BLOCKINFO_ABBREV_WIDTH: u32 = 2;
const RECORD_ABBREV_WIDTH: u32 = 4;
/// Abbreviation IDs 0..=3 are reserved control codes; record layouts start
/// here.
const RECORD_ABBREV_BASE: u64 = 4;

// Blockinfo record codes.
const SETBID: u64 = 1;
const BLOCKNAME: u64 = 2;
const SETRECORDNAME: u64 = 3;

// Record codes within the record block.
const MODULE_METADATA: u64 = 0;
const FUNC_METADATA: u64 = 1;
const CALL_GRAPH_EDGE: u64 = 2;
const METHOD_METADATA: u64 = 3;
const METHOD_IMPL: u64 = 4;

const RECORD_NAMES: [(u64, &str); 5] = [
    (MODULE_METADATA, "MODULE_METADATA"),
    (FUNC_METADATA, "FUNC_METADATA"),
    (CALL_GRAPH_EDGE, "CALL_GRAPH_EDGE"),
    (METHOD_METADATA, "METHOD_METADATA"),
    (METHOD_IMPL, "METHOD_IMPL"),
];

fn encode_call_kind(kind: CallKind) -> u64 {
    match kind {
        CallKind::Direct => 0,
        CallKind::Witness => 1,
        CallKind::VTable => 2,
    }
}

fn decode_call_kind(value: u64) -> Result<CallKind> {
    match value {
        0 => Ok(CallKind::Direct),
        1 => Ok(CallKind::Witness),
        2 => Ok(CallKind::VTable),
        _ => Err(SummaryError::BadEnum {
            what: "call kind",
            value,
        }),
    }
}

fn encode_slot_kind(kind: SlotKind) -> u64 {
    match kind {
        SlotKind::Witness => 0,
        SlotKind::VTable => 1,
    }
}

fn decode_slot_kind(value: u64) -> Result<SlotKind> {
    match value {
        0 => Ok(SlotKind::Witness),
        1 => Ok(SlotKind::VTable),
        _ => Err(SummaryError::BadEnum {
            what: "slot kind",
            value,
        }),
    }
}

struct Serializer {
    out: BitstreamWriter,
    embed_debug_names: bool,
}

impl Serializer {
    fn new(embed_debug_names: bool) -> Self {
        Serializer {
            out: BitstreamWriter::new(),
            embed_debug_names,
        }
    }

    fn write_signature(&mut self) {
        for byte in MODULE_SUMMARY_SIGNATURE {
            self.out.emit(byte as u64, 8);
        }
    }

    /// Name the record block and its records so generic dump tools can
    /// label the stream. Readers are free to skip this block.
    fn write_blockinfo(&mut self) {
        self.out
            .enter_subblock(BLOCKINFO_BLOCK_ID, BLOCKINFO_ABBREV_WIDTH);
        self.out.emit_unabbrev_record(SETBID, &[RECORD_BLOCK_ID]);
        let block_name: Vec<u64> = "RECORD_BLOCK".bytes().map(u64::from).collect();
        self.out.emit_unabbrev_record(BLOCKNAME, &block_name);
        for (code, name) in RECORD_NAMES {
            let mut ops = vec![code];
            ops.extend(name.bytes().map(u64::from));
            self.out.emit_unabbrev_record(SETRECORDNAME, &ops);
        }
        self.out.end_block();
    }

    fn debug_name<'a>(&self, name: &'a str) -> &'a str {
        if self.embed_debug_names {
            name
        } else {
            ""
        }
    }

    fn write_function(&mut self, summary: &FunctionSummary) {
        let name = self.debug_name(&summary.debug_name);
        self.out.emit_abbrev_id(RECORD_ABBREV_BASE + FUNC_METADATA);
        self.out.emit_vbr(summary.guid, 16);
        self.out.emit(summary.live as u64, 1);
        self.out.emit(summary.preserved as u64, 1);
        self.out.emit_blob(name.as_bytes());

        for call in &summary.calls {
            let edge_name = self.debug_name(&call.debug_name);
            self.out.emit_abbrev_id(RECORD_ABBREV_BASE + CALL_GRAPH_EDGE);
            self.out.emit(encode_call_kind(call.kind), 2);
            self.out.emit_vbr(call.callee, 16);
            self.out.emit_blob(edge_name.as_bytes());
        }
    }

    fn write_slots(&mut self, kind: SlotKind, impls: &BTreeMap<Guid, Vec<Guid>>) {
        for (&virtual_func_id, impl_guids) in impls {
            self.out.emit_abbrev_id(RECORD_ABBREV_BASE + METHOD_METADATA);
            self.out.emit(encode_slot_kind(kind), 1);
            self.out.emit_vbr(virtual_func_id, 16);
            for &impl_guid in impl_guids {
                self.out.emit_abbrev_id(RECORD_ABBREV_BASE + METHOD_IMPL);
                self.out.emit_vbr(impl_guid, 16);
            }
        }
    }

    fn write_index(&mut self, index: &ModuleSummaryIndex) {
        self.out.enter_subblock(RECORD_BLOCK_ID, RECORD_ABBREV_WIDTH);

        self.out.emit_abbrev_id(RECORD_ABBREV_BASE + MODULE_METADATA);
        self.out.emit_blob(index.module_name.as_bytes());

        for summary in index.functions.values() {
            self.write_function(summary);
        }
        self.write_slots(SlotKind::Witness, &index.witness_impls);
        self.write_slots(SlotKind::VTable, &index.vtable_impls);

        self.out.end_block();
    }

    fn finish(self) -> Vec<u8> {
        self.out.finish()
    }
}

/// Serialize `index` to the binary summary format. Debug-name blobs are
/// emitted only when `embed_debug_names` is set; either way the stream
/// decodes to the same summaries.
pub fn write_module_summary(index: &ModuleSummaryIndex, embed_debug_names: bool) -> Vec<u8> {
    let mut serializer = Serializer::new(embed_debug_names);
    serializer.write_signature();
    serializer.write_blockinfo();
    serializer.write_index(index);
    serializer.finish()
}

/// Serialize `index` to `path`. A partially-written file is removed on
/// failure.
pub fn write_module_summary_to_path(
    index: &ModuleSummaryIndex,
    embed_debug_names: bool,
    path: &Path,
) -> Result<()> {
    let bytes = write_module_summary(index, embed_debug_names);
    fs::write(path, bytes).map_err(|source| {
        let _ = fs::remove_file(path);
        SummaryError::io(path, source)
    })
}

struct Deserializer<'a, 'b> {
    cursor: BitstreamReader<'a>,
    index: &'b mut ModuleSummaryIndex,
    current_function: Option<Guid>,
    current_slot: Option<VirtualMethodSlot>,
}

impl<'a, 'b> Deserializer<'a, 'b> {
    fn new(bytes: &'a [u8], index: &'b mut ModuleSummaryIndex) -> Self {
        Deserializer {
            cursor: BitstreamReader::new(bytes),
            index,
            current_function: None,
            current_slot: None,
        }
    }

    fn read_signature(&mut self) -> Result<()> {
        for expected in MODULE_SUMMARY_SIGNATURE {
            let byte = self
                .cursor
                .read(8)
                .map_err(|_| SummaryError::MalformedSignature)?;
            if byte != expected as u64 {
                return Err(SummaryError::MalformedSignature);
            }
        }
        Ok(())
    }

    fn read_blob_string(&mut self) -> Result<String> {
        let bytes = self.cursor.read_blob()?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn read_function_metadata(&mut self) -> Result<()> {
        let guid = self.cursor.read_vbr(16)?;
        let live = self.cursor.read(1)? != 0;
        let preserved = self.cursor.read(1)? != 0;
        let debug_name = self.read_blob_string()?;

        let mut summary = FunctionSummary::new(guid);
        summary.live = live;
        summary.preserved = preserved;
        summary.debug_name = debug_name;
        self.index.merge_function_summary(summary);
        self.current_function = Some(guid);
        Ok(())
    }

    fn read_call_graph_edge(&mut self) -> Result<()> {
        let kind = decode_call_kind(self.cursor.read(2)?)?;
        let callee = self.cursor.read_vbr(16)?;
        let debug_name = self.read_blob_string()?;

        let Some(guid) = self.current_function else {
            bail_orphan!("call graph edge before any function metadata");
        };
        let summary = self
            .index
            .function_mut(guid)
            .expect("current function group was just merged into the index");
        summary.add_call(Call::new(callee, kind, debug_name));
        Ok(())
    }

    fn read_method_metadata(&mut self) -> Result<()> {
        let kind = decode_slot_kind(self.cursor.read(1)?)?;
        let virtual_func_id = self.cursor.read_vbr(16)?;
        self.current_slot = Some(VirtualMethodSlot::new(kind, virtual_func_id));
        Ok(())
    }

    fn read_method_impl(&mut self) -> Result<()> {
        let impl_guid = self.cursor.read_vbr(16)?;
        let Some(slot) = self.current_slot else {
            bail_orphan!("method impl before any method metadata");
        };
        self.index.add_implementation(slot, impl_guid);
        Ok(())
    }

    fn read_record_block(&mut self) -> Result<()> {
        // The module metadata record must come first.
        let first = self.cursor.read(RECORD_ABBREV_WIDTH)?;
        if first != RECORD_ABBREV_BASE + MODULE_METADATA {
            bail_orphan!("module metadata record must precede all other records");
        }
        let module_name = self.read_blob_string()?;
        debug!("reading module summary for '{}'", module_name);
        self.index.module_name = module_name;

        loop {
            let abbrev = self.cursor.read(RECORD_ABBREV_WIDTH)?;
            if abbrev == END_BLOCK {
                self.cursor.align32();
                return Ok(());
            }
            match abbrev.checked_sub(RECORD_ABBREV_BASE) {
                Some(MODULE_METADATA) => {
                    self.index.module_name = self.read_blob_string()?;
                }
                Some(FUNC_METADATA) => self.read_function_metadata()?,
                Some(CALL_GRAPH_EDGE) => self.read_call_graph_edge()?,
                Some(METHOD_METADATA) => self.read_method_metadata()?,
                Some(METHOD_IMPL) => self.read_method_impl()?,
                _ => return Err(SummaryError::UnknownRecord(abbrev)),
            }
        }
    }

    fn read_top_level(&mut self) -> Result<()> {
        while !self.cursor.at_end() {
            let abbrev = self.cursor.read(TOP_LEVEL_ABBREV_WIDTH)?;
            if abbrev != ENTER_SUBBLOCK {
                return Err(SummaryError::UnknownRecord(abbrev));
            }
            let block_id = self.cursor.read_vbr(8)?;
            let abbrev_width = self.cursor.read_vbr(4)? as u32;
            self.cursor.align32();
            let block_words = self.cursor.read(32)?;

            match block_id {
                BLOCKINFO_BLOCK_ID => self.cursor.skip_words(block_words)?,
                RECORD_BLOCK_ID => {
                    if abbrev_width != RECORD_ABBREV_WIDTH {
                        bail_truncated!(
                            "record block declares abbreviation width {}, expected {}",
                            abbrev_width,
                            RECORD_ABBREV_WIDTH
                        );
                    }
                    self.read_record_block()?;
                }
                other => return Err(SummaryError::UnknownRecord(other)),
            }
        }
        Ok(())
    }
}

/// Deserialize a summary stream, accumulating into `index`. Call once per
/// input file with the same index to merge several summaries; function
/// flags are ORed, edges appended, and slot implementation lists extended
/// without duplicates.
pub fn read_module_summary(bytes: &[u8], index: &mut ModuleSummaryIndex) -> Result<()> {
    let mut deserializer = Deserializer::new(bytes, index);
    deserializer.read_signature()?;
    deserializer.read_top_level()
}
