//! The `LocalVariableTable` attribute (§4.3): maps a `Code` attribute's local-variable
//! slots back to source names and descriptors over the byte-offset ranges in which they
//! hold a value.
//!
//! Grounded on `examples/SarahGreyWolf-JVM-rs/src/attributes.rs`'s `LocalVariable`/
//! `LocalVariableTable` structs for the on-wire shape; resolution of the name/descriptor
//! indices goes through `ConstantPoolTable` rather than storing raw indices.

use std::io::Cursor;

use byteorder::{ReadBytesExt, BE};

use crate::constants::ConstantPoolTable;
use crate::errors::{Error, Result};

#[derive(Clone, Debug)]
pub struct LocalVariableEntry {
    pub start_pc: u16,
    pub length: u16,
    pub name: String,
    pub descriptor: String,
    pub index: u16,
}

#[derive(Clone, Debug, Default)]
pub struct LocalVariableTable {
    entries: Vec<LocalVariableEntry>,
}

impl LocalVariableTable {
    /// Reads a `LocalVariableTable` attribute's body (the part following
    /// `attribute_name_index`/`attribute_length`) from `cursor`.
    pub fn read(cursor: &mut Cursor<&[u8]>, pool: &ConstantPoolTable) -> Result<LocalVariableTable> {
        let count = read_u16(cursor)?;
        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let start_pc = read_u16(cursor)?;
            let length = read_u16(cursor)?;
            let name_index = read_u16(cursor)?;
            let descriptor_index = read_u16(cursor)?;
            let index = read_u16(cursor)?;
            entries.push(LocalVariableEntry {
                start_pc,
                length,
                name: pool.entry_to_string(name_index, false)?,
                descriptor: pool.entry_to_string(descriptor_index, false)?,
                index,
            });
        }
        Ok(LocalVariableTable { entries })
    }

    /// The variable occupying `slot` whose `[start_pc, start_pc + length)` range covers
    /// `pc`, if the attribute recorded one. §4.5 Phase B consults this when a backward
    /// walk lands on a local-variable producer.
    pub fn lookup(&self, slot: u16, pc: u16) -> Option<&LocalVariableEntry> {
        self.entries.iter().find(|entry| {
            entry.index == slot && pc >= entry.start_pc && pc < entry.start_pc + entry.length
        })
    }

    pub fn entries(&self) -> &[LocalVariableEntry] {
        &self.entries
    }

    /// Builds a table directly from already-resolved entries, bypassing byte parsing.
    /// The production host adapter's `get_local_variable_table` (§6) hands back
    /// structured `(start_pc, length, name, descriptor, index)` tuples from the host's
    /// own reflection call rather than a `LocalVariableTable` attribute's raw bytes, so
    /// there is no byte stream to parse in that path.
    pub fn from_entries(entries: Vec<LocalVariableEntry>) -> LocalVariableTable {
        LocalVariableTable { entries }
    }

    /// Appends one entry. Used by `from_entries`'s callers and by tests that build a
    /// table without round-tripping through its on-wire byte encoding.
    pub fn insert(&mut self, start_pc: u16, length: u16, name: &str, descriptor: &str, index: u16) {
        self.entries.push(LocalVariableEntry {
            start_pc,
            length,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            index,
        });
    }

    /// Test-only alias for `insert` matching the call shape analyzer tests use.
    #[cfg(test)]
    pub fn push_for_test(&mut self, start_pc: u16, length: u16, name: &str, descriptor: &str, index: u16) {
        self.insert(start_pc, length, name, descriptor, index);
    }
}

fn read_u16(cursor: &mut Cursor<&[u8]>) -> Result<u16> {
    cursor.read_u16::<BE>().map_err(|e| Error::MalformedConstantPool(e.to_string()))
}
