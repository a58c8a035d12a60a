//! Attribute bodies the analyzer and CLI actually consult, beyond `Code` (which has its
//! own module, §4.3) and `LocalVariableTable` (likewise, §3).
//!
//! Grounded on `examples/SarahGreyWolf-JVM-rs/src/attributes.rs`'s `ConstantValue`/
//! `LineNumberTable`/`LineNumber` structs (field shapes and doc-comment style kept).
//! The teacher models all 27 JVM attribute kinds (`StackMapTable`, `BootstrapMethods`,
//! `InnerClasses`, the `RuntimeVisible*Annotations` family, `Signature`, `Record`, ...);
//! none of those feed the NPE analyzer or the disassembler, so they are represented only
//! by the generic `Unknown` skip variant in `class_file.rs` rather than modeled
//! individually.

use std::io::Cursor;

use byteorder::{ReadBytesExt, BE};

use crate::errors::{Error, Result};

/// A field's compile-time constant initializer (`static final` fields), resolved to a
/// constant-pool index. The analyzer doesn't consult this; the CLI uses it for
/// `javap`-style pretty-printing of `static final` fields.
#[derive(Clone, Debug)]
pub struct ConstantValue {
    pub constant_value_index: u16,
}

impl ConstantValue {
    pub fn read(cursor: &mut Cursor<&[u8]>) -> Result<ConstantValue> {
        Ok(ConstantValue { constant_value_index: read_u16(cursor)? })
    }
}

/// One `(start_pc, line_number)` pair: the bytecode offset at which a new source line
/// begins, per `examples/SarahGreyWolf-JVM-rs/src/attributes.rs`'s `LineNumber`.
#[derive(Clone, Debug)]
pub struct LineNumber {
    pub start_pc: u16,
    pub line_number: u16,
}

/// The `LineNumberTable` attribute. Not consulted by the analyzer (§1's non-goals
/// exclude source-level location); kept because the CLI's disassembler annotates offsets
/// with source lines when debug info is present.
#[derive(Clone, Debug, Default)]
pub struct LineNumberTable {
    entries: Vec<LineNumber>,
}

impl LineNumberTable {
    pub fn read(cursor: &mut Cursor<&[u8]>) -> Result<LineNumberTable> {
        let count = read_u16(cursor)?;
        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let start_pc = read_u16(cursor)?;
            let line_number = read_u16(cursor)?;
            entries.push(LineNumber { start_pc, line_number });
        }
        Ok(LineNumberTable { entries })
    }

    /// The source line active at `pc`, if the table records one.
    pub fn line_for(&self, pc: u16) -> Option<u16> {
        self.entries
            .iter()
            .filter(|e| e.start_pc <= pc)
            .max_by_key(|e| e.start_pc)
            .map(|e| e.line_number)
    }
}

fn read_u16(cursor: &mut Cursor<&[u8]>) -> Result<u16> {
    cursor.read_u16::<BE>().map_err(|e| Error::MalformedConstantPool(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_for_picks_the_nearest_preceding_entry() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&2u16.to_be_bytes()); // count
        bytes.extend_from_slice(&0u16.to_be_bytes());
        bytes.extend_from_slice(&10u16.to_be_bytes());
        bytes.extend_from_slice(&5u16.to_be_bytes());
        bytes.extend_from_slice(&11u16.to_be_bytes());
        let mut cursor = Cursor::new(bytes.as_slice());
        let table = LineNumberTable::read(&mut cursor).unwrap();
        assert_eq!(table.line_for(0), Some(10));
        assert_eq!(table.line_for(4), Some(10));
        assert_eq!(table.line_for(5), Some(11));
    }
}
