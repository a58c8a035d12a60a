//! The `Code` attribute (§4.3): a method's bytecode plus its local-variable table,
//! decoded into an ordered instruction sequence (invariant C4).
//!
//! Grounded on `examples/SarahGreyWolf-JVM-rs/src/attributes.rs`'s `Code` struct for the
//! on-wire shape; trimmed to the sub-attributes §4.3/§4.5 actually consult
//! (`LocalVariableTable`) and skipping everything else (`LineNumberTable`,
//! `StackMapTable`, debug attributes) as opaque bytes.

use std::io::Cursor;

use byteorder::{ReadBytesExt, BE};

use crate::attributes::LineNumberTable;
use crate::constants::ConstantPoolTable;
use crate::errors::{Error, Result};
use crate::instructions::{self, Instruction};
use crate::local_variables::LocalVariableTable;

#[derive(Clone, Debug)]
pub struct CodeAttribute {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,
    pub local_variables: LocalVariableTable,
    pub line_numbers: Option<LineNumberTable>,
    instructions: Vec<Instruction>,
}

impl CodeAttribute {
    /// Reads a `Code` attribute's body (the part following `attribute_name_index`/
    /// `attribute_length`) from `cursor`.
    pub fn read(cursor: &mut Cursor<&[u8]>, pool: &ConstantPoolTable) -> Result<CodeAttribute> {
        let max_stack = read_u16(cursor)?;
        let max_locals = read_u16(cursor)?;
        let code_length = read_u32(cursor)?;
        let mut code = vec![0u8; code_length as usize];
        for byte in code.iter_mut() {
            *byte = read_u8(cursor)?;
        }

        let exception_table_length = read_u16(cursor)?;
        for _ in 0..exception_table_length {
            // start_pc, end_pc, handler_pc, catch_type
            read_u16(cursor)?;
            read_u16(cursor)?;
            read_u16(cursor)?;
            read_u16(cursor)?;
        }

        let mut local_variables = LocalVariableTable::default();
        let mut line_numbers = None;
        let attributes_count = read_u16(cursor)?;
        for _ in 0..attributes_count {
            let name_index = read_u16(cursor)?;
            let attribute_length = read_u32(cursor)?;
            let name = pool.entry_to_string(name_index, false)?;
            if name == "LocalVariableTable" {
                local_variables = LocalVariableTable::read(cursor, pool)?;
            } else if name == "LineNumberTable" {
                line_numbers = Some(LineNumberTable::read(cursor)?);
            } else {
                skip(cursor, attribute_length as usize)?;
            }
        }

        let instructions = instructions::decode_all(&code)?;
        Ok(CodeAttribute { max_stack, max_locals, code, local_variables, line_numbers, instructions })
    }

    /// Builds a `CodeAttribute` from already-decoded parts, bypassing the on-wire byte
    /// layout entirely. Used where the code array and local-variable table are already
    /// in hand: the production host adapter (§6's `get_bytecodes`/
    /// `get_local_variable_table` return decoded values directly, not a `Code`
    /// attribute's raw bytes) and tests.
    pub fn from_parts(
        max_stack: u16,
        max_locals: u16,
        code: Vec<u8>,
        local_variables: LocalVariableTable,
    ) -> Result<CodeAttribute> {
        let instructions = instructions::decode_all(&code)?;
        Ok(CodeAttribute { max_stack, max_locals, code, local_variables, line_numbers: None, instructions })
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// The instruction whose decoded range covers byte offset `pc`, if any.
    pub fn instruction_at(&self, pc: usize) -> Option<&Instruction> {
        self.instructions.iter().find(|i| i.offset == pc)
    }

    /// The instruction immediately preceding the one at `pc` in program order, per
    /// invariant C4's strictly-increasing offset sequence. Used by §4.5 Phase B's
    /// backward walk.
    pub fn instruction_before(&self, pc: usize) -> Option<&Instruction> {
        let position = self.instructions.iter().position(|i| i.offset == pc)?;
        position.checked_sub(1).map(|prev| &self.instructions[prev])
    }

    /// Disassembles every instruction, resolving pool-index and local-variable
    /// operands against `pool` and this attribute's own `LocalVariableTable` (§4.3).
    pub fn disassembly(&self, pool: &ConstantPoolTable) -> String {
        self.instructions
            .iter()
            .map(|instruction| instructions::format_instruction(instruction, pool, &self.local_variables))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn skip(cursor: &mut Cursor<&[u8]>, len: usize) -> Result<()> {
    for _ in 0..len {
        read_u8(cursor)?;
    }
    Ok(())
}

fn read_u8(cursor: &mut Cursor<&[u8]>) -> Result<u8> {
    cursor.read_u8().map_err(|e| Error::MalformedConstantPool(e.to_string()))
}

fn read_u16(cursor: &mut Cursor<&[u8]>) -> Result<u16> {
    cursor.read_u16::<BE>().map_err(|e| Error::MalformedConstantPool(e.to_string()))
}

fn read_u32(cursor: &mut Cursor<&[u8]>) -> Result<u32> {
    cursor.read_u32::<BE>().map_err(|e| Error::MalformedConstantPool(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instructions::{ALOAD_0, ARETURN, ATHROW, GETFIELD, RETURN};

    fn empty_pool() -> ConstantPoolTable {
        ConstantPoolTable::read_all(&[]).unwrap()
    }

    #[test]
    fn reads_code_with_no_sub_attributes() {
        let mut body = Vec::new();
        body.extend_from_slice(&2u16.to_be_bytes()); // max_stack
        body.extend_from_slice(&1u16.to_be_bytes()); // max_locals
        let code = vec![ALOAD_0, GETFIELD, 0x00, 0x01, ARETURN];
        body.extend_from_slice(&(code.len() as u32).to_be_bytes());
        body.extend_from_slice(&code);
        body.extend_from_slice(&0u16.to_be_bytes()); // exception_table_length
        body.extend_from_slice(&0u16.to_be_bytes()); // attributes_count

        let mut cursor = Cursor::new(body.as_slice());
        let attr = CodeAttribute::read(&mut cursor, &empty_pool()).unwrap();
        assert_eq!(attr.instructions().len(), 3);
        assert_eq!(attr.instruction_at(1).unwrap().mnemonic(), "getfield");
        assert_eq!(attr.instruction_before(4).unwrap().mnemonic(), "getfield");
    }

    #[test]
    fn instruction_before_first_is_none() {
        let mut body = Vec::new();
        body.extend_from_slice(&1u16.to_be_bytes());
        body.extend_from_slice(&1u16.to_be_bytes());
        let code = vec![RETURN];
        body.extend_from_slice(&(code.len() as u32).to_be_bytes());
        body.extend_from_slice(&code);
        body.extend_from_slice(&0u16.to_be_bytes());
        body.extend_from_slice(&0u16.to_be_bytes());
        let mut cursor = Cursor::new(body.as_slice());
        let attr = CodeAttribute::read(&mut cursor, &empty_pool()).unwrap();
        assert!(attr.instruction_before(0).is_none());
        let _ = ATHROW;
    }
}
