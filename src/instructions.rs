//! Bytecode instruction decoding (§4.3): opcode mnemonics, fixed/variable instruction
//! lengths, and the `wide`/`tableswitch`/`lookupswitch` padding rules.
//!
//! Grounded on `examples/original_source/src/main/cpp/bytecode/Constants.cpp`'s
//! `OpcodeMnemonic`/`InstructionLength` tables (ported here as `match` arms over the
//! real JVM opcode set rather than a 256-entry array, since most of the unused byte
//! values have no mnemonic worth naming) and on `analyzer.cpp`'s instruction-length
//! computation for the three variable-length families.

use crate::constants::ConstantPoolTable;
use crate::errors::{Error, Result};
use crate::local_variables::LocalVariableTable;

pub const NOP: u8 = 0x00;
pub const ACONST_NULL: u8 = 0x01;
pub const BIPUSH: u8 = 0x10;
pub const SIPUSH: u8 = 0x11;
pub const ILOAD: u8 = 0x15;
pub const LLOAD: u8 = 0x16;
pub const FLOAD: u8 = 0x17;
pub const DLOAD: u8 = 0x18;
pub const ALOAD: u8 = 0x19;
pub const ILOAD_0: u8 = 0x1a;
pub const ALOAD_0: u8 = 0x2a;
pub const ALOAD_3: u8 = 0x2d;
pub const ISTORE: u8 = 0x36;
pub const LSTORE: u8 = 0x37;
pub const FSTORE: u8 = 0x38;
pub const DSTORE: u8 = 0x39;
pub const ASTORE: u8 = 0x3a;
pub const ISTORE_0: u8 = 0x3b;
pub const ASTORE_3: u8 = 0x4e;
pub const IALOAD: u8 = 0x2e;
pub const AALOAD: u8 = 0x32;
pub const BALOAD: u8 = 0x33;
pub const CALOAD: u8 = 0x34;
pub const SALOAD: u8 = 0x35;
pub const LALOAD: u8 = 0x2f;
pub const DALOAD: u8 = 0x31;
pub const IASTORE: u8 = 0x4f;
pub const LASTORE: u8 = 0x50;
pub const FASTORE: u8 = 0x51;
pub const DASTORE: u8 = 0x52;
pub const AASTORE: u8 = 0x53;
pub const BASTORE: u8 = 0x54;
pub const CASTORE: u8 = 0x55;
pub const SASTORE: u8 = 0x56;
pub const POP: u8 = 0x57;
pub const POP2: u8 = 0x58;
pub const DUP: u8 = 0x59;
pub const DUP_X1: u8 = 0x5a;
pub const DUP_X2: u8 = 0x5b;
pub const DUP2: u8 = 0x5c;
pub const DUP2_X1: u8 = 0x5d;
pub const DUP2_X2: u8 = 0x5e;
pub const SWAP: u8 = 0x5f;
pub const GETSTATIC: u8 = 0xb2;
pub const PUTSTATIC: u8 = 0xb3;
pub const GETFIELD: u8 = 0xb4;
pub const PUTFIELD: u8 = 0xb5;
pub const INVOKEVIRTUAL: u8 = 0xb6;
pub const INVOKESPECIAL: u8 = 0xb7;
pub const INVOKESTATIC: u8 = 0xb8;
pub const INVOKEINTERFACE: u8 = 0xb9;
pub const INVOKEDYNAMIC: u8 = 0xba;
pub const NEW: u8 = 0xbb;
pub const NEWARRAY: u8 = 0xbc;
pub const ANEWARRAY: u8 = 0xbd;
pub const ARRAYLENGTH: u8 = 0xbe;
pub const ATHROW: u8 = 0xbf;
pub const CHECKCAST: u8 = 0xc0;
pub const MULTIANEWARRAY: u8 = 0xc5;
pub const WIDE: u8 = 0xc4;
pub const TABLESWITCH: u8 = 0xaa;
pub const LOOKUPSWITCH: u8 = 0xab;
pub const GOTO: u8 = 0xa7;
pub const JSR: u8 = 0xa8;
pub const RET: u8 = 0xa9;
pub const IFEQ: u8 = 0x99;
pub const IF_ACMPNE: u8 = 0xa6;
pub const IFNULL: u8 = 0xc6;
pub const IFNONNULL: u8 = 0xc7;
pub const GOTO_W: u8 = 0xc8;
pub const JSR_W: u8 = 0xc9;
pub const IINC: u8 = 0x84;
pub const LDC: u8 = 0x12;
pub const LDC_W: u8 = 0x13;
pub const LDC2_W: u8 = 0x14;
pub const MONITORENTER: u8 = 0xc2;
pub const MONITOREXIT: u8 = 0xc3;
pub const ARETURN: u8 = 0xb0;
pub const RETURN: u8 = 0xb1;
pub const INSTANCEOF: u8 = 0xc1;

/// An opcode's mnemonic, per the JVMS opcode table. Unused/reserved byte values return
/// `"<unknown>"`.
pub fn mnemonic(opcode: u8) -> &'static str {
    match opcode {
        0x00 => "nop",
        0x01 => "aconst_null",
        0x02 => "iconst_m1",
        0x03 => "iconst_0",
        0x04 => "iconst_1",
        0x05 => "iconst_2",
        0x06 => "iconst_3",
        0x07 => "iconst_4",
        0x08 => "iconst_5",
        0x09 => "lconst_0",
        0x0a => "lconst_1",
        0x0b => "fconst_0",
        0x0c => "fconst_1",
        0x0d => "fconst_2",
        0x0e => "dconst_0",
        0x0f => "dconst_1",
        0x10 => "bipush",
        0x11 => "sipush",
        0x12 => "ldc",
        0x13 => "ldc_w",
        0x14 => "ldc2_w",
        0x15 => "iload",
        0x16 => "lload",
        0x17 => "fload",
        0x18 => "dload",
        0x19 => "aload",
        0x1a => "iload_0",
        0x1b => "iload_1",
        0x1c => "iload_2",
        0x1d => "iload_3",
        0x1e => "lload_0",
        0x1f => "lload_1",
        0x20 => "lload_2",
        0x21 => "lload_3",
        0x22 => "fload_0",
        0x23 => "fload_1",
        0x24 => "fload_2",
        0x25 => "fload_3",
        0x26 => "dload_0",
        0x27 => "dload_1",
        0x28 => "dload_2",
        0x29 => "dload_3",
        0x2a => "aload_0",
        0x2b => "aload_1",
        0x2c => "aload_2",
        0x2d => "aload_3",
        0x2e => "iaload",
        0x2f => "laload",
        0x30 => "faload",
        0x31 => "daload",
        0x32 => "aaload",
        0x33 => "baload",
        0x34 => "caload",
        0x35 => "saload",
        0x36 => "istore",
        0x37 => "lstore",
        0x38 => "fstore",
        0x39 => "dstore",
        0x3a => "astore",
        0x3b => "istore_0",
        0x3c => "istore_1",
        0x3d => "istore_2",
        0x3e => "istore_3",
        0x3f => "lstore_0",
        0x40 => "lstore_1",
        0x41 => "lstore_2",
        0x42 => "lstore_3",
        0x43 => "fstore_0",
        0x44 => "fstore_1",
        0x45 => "fstore_2",
        0x46 => "fstore_3",
        0x47 => "dstore_0",
        0x48 => "dstore_1",
        0x49 => "dstore_2",
        0x4a => "dstore_3",
        0x4b => "astore_0",
        0x4c => "astore_1",
        0x4d => "astore_2",
        0x4e => "astore_3",
        0x4f => "iastore",
        0x50 => "lastore",
        0x51 => "fastore",
        0x52 => "dastore",
        0x53 => "aastore",
        0x54 => "bastore",
        0x55 => "castore",
        0x56 => "sastore",
        0x57 => "pop",
        0x58 => "pop2",
        0x59 => "dup",
        0x5a => "dup_x1",
        0x5b => "dup_x2",
        0x5c => "dup2",
        0x5d => "dup2_x1",
        0x5e => "dup2_x2",
        0x5f => "swap",
        0x60 => "iadd",
        0x61 => "ladd",
        0x62 => "fadd",
        0x63 => "dadd",
        0x64 => "isub",
        0x65 => "lsub",
        0x66 => "fsub",
        0x67 => "dsub",
        0x68 => "imul",
        0x69 => "lmul",
        0x6a => "fmul",
        0x6b => "dmul",
        0x6c => "idiv",
        0x6d => "ldiv",
        0x6e => "fdiv",
        0x6f => "ddiv",
        0x70 => "irem",
        0x71 => "lrem",
        0x72 => "frem",
        0x73 => "drem",
        0x74 => "ineg",
        0x75 => "lneg",
        0x76 => "fneg",
        0x77 => "dneg",
        0x78 => "ishl",
        0x79 => "lshl",
        0x7a => "ishr",
        0x7b => "lshr",
        0x7c => "iushr",
        0x7d => "lushr",
        0x7e => "iand",
        0x7f => "land",
        0x80 => "ior",
        0x81 => "lor",
        0x82 => "ixor",
        0x83 => "lxor",
        0x84 => "iinc",
        0x85 => "i2l",
        0x86 => "i2f",
        0x87 => "i2d",
        0x88 => "l2i",
        0x89 => "l2f",
        0x8a => "l2d",
        0x8b => "f2i",
        0x8c => "f2l",
        0x8d => "f2d",
        0x8e => "d2i",
        0x8f => "d2l",
        0x90 => "d2f",
        0x91 => "i2b",
        0x92 => "i2c",
        0x93 => "i2s",
        0x94 => "lcmp",
        0x95 => "fcmpl",
        0x96 => "fcmpg",
        0x97 => "dcmpl",
        0x98 => "dcmpg",
        0x99 => "ifeq",
        0x9a => "ifne",
        0x9b => "iflt",
        0x9c => "ifge",
        0x9d => "ifgt",
        0x9e => "ifle",
        0x9f => "if_icmpeq",
        0xa0 => "if_icmpne",
        0xa1 => "if_icmplt",
        0xa2 => "if_icmpge",
        0xa3 => "if_icmpgt",
        0xa4 => "if_icmple",
        0xa5 => "if_acmpeq",
        0xa6 => "if_acmpne",
        0xa7 => "goto",
        0xa8 => "jsr",
        0xa9 => "ret",
        0xaa => "tableswitch",
        0xab => "lookupswitch",
        0xac => "ireturn",
        0xad => "lreturn",
        0xae => "freturn",
        0xaf => "dreturn",
        0xb0 => "areturn",
        0xb1 => "return",
        0xb2 => "getstatic",
        0xb3 => "putstatic",
        0xb4 => "getfield",
        0xb5 => "putfield",
        0xb6 => "invokevirtual",
        0xb7 => "invokespecial",
        0xb8 => "invokestatic",
        0xb9 => "invokeinterface",
        0xba => "invokedynamic",
        0xbb => "new",
        0xbc => "newarray",
        0xbd => "anewarray",
        0xbe => "arraylength",
        0xbf => "athrow",
        0xc0 => "checkcast",
        0xc1 => "instanceof",
        0xc2 => "monitorenter",
        0xc3 => "monitorexit",
        0xc4 => "wide",
        0xc5 => "multianewarray",
        0xc6 => "ifnull",
        0xc7 => "ifnonnull",
        0xc8 => "goto_w",
        0xc9 => "jsr_w",
        _ => "<unknown>",
    }
}

/// `ArrayType`, ported from `Constants.cpp`, indexed by `newarray`'s `atype` operand.
pub const ARRAY_TYPE: [&str; 12] =
    ["", "", "", "", "boolean", "char", "float", "double", "byte", "short", "int", "long"];

fn fixed_length(opcode: u8) -> Option<usize> {
    Some(match opcode {
        TABLESWITCH | LOOKUPSWITCH | WIDE => return None,
        0x10 | 0x12 | 0x15..=0x19 | 0x36..=0x3a | 0xbc => 2,
        0x11 | 0x13 | 0x14 | 0x84 | 0x99..=0xa9 | 0xb2..=0xb8 | 0xbb | 0xbd | 0xc0 | 0xc1
        | 0xc6 | 0xc7 => 3,
        0xba | 0xb9 | 0xc8 | 0xc9 => 5,
        0xc5 => 4,
        _ => 1,
    })
}

/// The total length in bytes of the instruction starting at `offset`, including the
/// opcode byte itself. `wide`, `tableswitch` and `lookupswitch` are variable-length and
/// depend on alignment relative to the start of the code array.
pub fn instruction_length(code: &[u8], offset: usize) -> Result<usize> {
    let opcode = *code
        .get(offset)
        .ok_or_else(|| Error::InvalidArgument(format!("offset {offset} is out of bounds")))?;

    match opcode {
        TABLESWITCH | LOOKUPSWITCH => {
            // Padding brings the following operands onto a 4-byte boundary relative to
            // the start of the code array. The outer `% 4` reduces the already-mod-4
            // padding count back into [0, 4) — the original source's formula omitted
            // this reduction and could produce a negative-looking pad of 4.
            let pad = (4 - (offset + 1) % 4) % 4;
            let mut cursor = offset + 1 + pad;
            let default_end = cursor + 4;
            let default_bytes: [u8; 4] = code
                .get(cursor..default_end)
                .ok_or_else(|| Error::InvalidArgument("truncated switch default".into()))?
                .try_into()
                .unwrap();
            let _ = default_bytes;
            cursor = default_end;

            if opcode == TABLESWITCH {
                let low_bytes: [u8; 4] = code
                    .get(cursor..cursor + 4)
                    .ok_or_else(|| Error::InvalidArgument("truncated tableswitch low".into()))?
                    .try_into()
                    .unwrap();
                let high_bytes: [u8; 4] = code
                    .get(cursor + 4..cursor + 8)
                    .ok_or_else(|| Error::InvalidArgument("truncated tableswitch high".into()))?
                    .try_into()
                    .unwrap();
                let low = i32::from_be_bytes(low_bytes);
                let high = i32::from_be_bytes(high_bytes);
                let entries = (high - low + 1).max(0) as usize;
                Ok(cursor + 8 + entries * 4 - offset)
            } else {
                let count_bytes: [u8; 4] = code
                    .get(cursor..cursor + 4)
                    .ok_or_else(|| Error::InvalidArgument("truncated lookupswitch count".into()))?
                    .try_into()
                    .unwrap();
                let count = i32::from_be_bytes(count_bytes).max(0) as usize;
                Ok(cursor + 4 + count * 8 - offset)
            }
        }
        WIDE => {
            let modified = *code
                .get(offset + 1)
                .ok_or_else(|| Error::InvalidArgument("truncated wide instruction".into()))?;
            if modified == IINC {
                Ok(6)
            } else {
                Ok(4)
            }
        }
        _ => fixed_length(opcode)
            .ok_or_else(|| Error::InvalidArgument(format!("no length rule for opcode 0x{opcode:02x}"))),
    }
}

#[derive(Clone, Debug)]
pub struct Instruction {
    pub offset: usize,
    pub opcode: u8,
    pub operands: Vec<u8>,
}

impl Instruction {
    pub fn mnemonic(&self) -> &'static str {
        mnemonic(self.opcode)
    }

    /// `ubyte`/`ushort` immediate helpers for the common one- and two-operand forms.
    pub fn u8_operand(&self, at: usize) -> Option<u8> {
        self.operands.get(at).copied()
    }

    pub fn u16_operand(&self, at: usize) -> Option<u16> {
        let hi = *self.operands.get(at)? as u16;
        let lo = *self.operands.get(at + 1)? as u16;
        Some((hi << 8) | lo)
    }

    pub fn i16_operand(&self, at: usize) -> Option<i16> {
        self.u16_operand(at).map(|v| v as i16)
    }

    pub fn i32_operand(&self, at: usize) -> Option<i32> {
        let bytes: [u8; 4] = self.operands.get(at..at + 4)?.try_into().ok()?;
        Some(i32::from_be_bytes(bytes))
    }
}

/// Decodes the single instruction starting at `offset`.
pub fn decode_at(code: &[u8], offset: usize) -> Result<Instruction> {
    let opcode = code[offset];
    let length = instruction_length(code, offset)?;
    let operands = code
        .get(offset + 1..offset + length)
        .ok_or_else(|| Error::InvalidArgument(format!("truncated instruction at {offset}")))?
        .to_vec();
    Ok(Instruction { offset, opcode, operands })
}

/// Decodes every instruction in `code` in program order (invariant C4: offsets strictly
/// increase and every byte belongs to exactly one instruction).
pub fn decode_all(code: &[u8]) -> Result<Vec<Instruction>> {
    let mut offset = 0;
    let mut out = Vec::new();
    while offset < code.len() {
        let instruction = decode_at(code, offset)?;
        offset += 1 + instruction.operands.len();
        out.push(instruction);
    }
    Ok(out)
}

/// Pretty-prints an instruction the way a disassembler would (§4.3): offset,
/// left-padded mnemonic, then the operand rendered via `pool` or `locals` as the
/// opcode calls for. `tableswitch`/`lookupswitch` print their mnemonic alone — their
/// jump tables aren't operands worth spelling out byte-by-byte.
pub fn format_instruction(
    instruction: &Instruction,
    pool: &ConstantPoolTable,
    locals: &LocalVariableTable,
) -> String {
    format!(
        "{:>5}: {:<15}{}",
        instruction.offset,
        instruction.mnemonic(),
        render_operand(instruction, pool, locals)
    )
}

fn render_operand(instruction: &Instruction, pool: &ConstantPoolTable, locals: &LocalVariableTable) -> String {
    let opcode = instruction.opcode;
    match opcode {
        TABLESWITCH | LOOKUPSWITCH => String::new(),
        WIDE => render_wide(instruction, locals),

        LDC => pool_operand(instruction.u8_operand(0).map(|b| b as u16), pool),
        LDC_W | LDC2_W => pool_operand(instruction.u16_operand(0), pool),

        GETSTATIC | PUTSTATIC | GETFIELD | PUTFIELD | INVOKEVIRTUAL | INVOKESPECIAL
        | INVOKESTATIC | INVOKEDYNAMIC | NEW | ANEWARRAY | CHECKCAST | INSTANCEOF => {
            pool_operand(instruction.u16_operand(0), pool)
        }

        INVOKEINTERFACE => {
            let target = pool_operand(instruction.u16_operand(0), pool);
            match instruction.u8_operand(2) {
                Some(count) => format!("{target}, count {count}"),
                None => target,
            }
        }

        MULTIANEWARRAY => {
            let target = pool_operand(instruction.u16_operand(0), pool);
            match instruction.u8_operand(2) {
                Some(dimensions) => format!("{target}, {dimensions} dimensions"),
                None => target,
            }
        }

        ILOAD | LLOAD | FLOAD | DLOAD | ALOAD | ISTORE | LSTORE | FSTORE | DSTORE | ASTORE => {
            slot_operand(instruction.u8_operand(0).map(|b| b as u16), instruction.offset, locals)
        }

        op if (ILOAD_0..=ALOAD_3).contains(&op) => {
            slot_operand(Some(((op - ILOAD_0) % 4) as u16), instruction.offset, locals)
        }
        op if (ISTORE_0..=ASTORE_3).contains(&op) => {
            slot_operand(Some(((op - ISTORE_0) % 4) as u16), instruction.offset, locals)
        }

        RET => slot_operand(instruction.u8_operand(0).map(|b| b as u16), instruction.offset, locals),

        IINC => match (instruction.u8_operand(0), instruction.u8_operand(1)) {
            (Some(slot), Some(constant)) => {
                format!("{}, {}", slot_operand(Some(slot as u16), instruction.offset, locals), constant as i8)
            }
            _ => String::new(),
        },

        BIPUSH => instruction.u8_operand(0).map(|b| (b as i8).to_string()).unwrap_or_default(),
        SIPUSH => instruction.i16_operand(0).map(|v| v.to_string()).unwrap_or_default(),

        NEWARRAY => instruction
            .u8_operand(0)
            .and_then(|atype| ARRAY_TYPE.get(atype as usize))
            .map(|name| name.to_string())
            .unwrap_or_default(),

        op if (IFEQ..=IF_ACMPNE).contains(&op) || op == GOTO || op == JSR || op == IFNULL || op == IFNONNULL => {
            branch_target(instruction, instruction.i16_operand(0).map(|v| v as i32))
        }
        GOTO_W | JSR_W => branch_target(instruction, instruction.i32_operand(0)),

        _ => String::new(),
    }
}

fn pool_operand(index: Option<u16>, pool: &ConstantPoolTable) -> String {
    match index {
        Some(index) => pool.entry_to_string(index, true).unwrap_or_else(|_| format!("#{index}")),
        None => String::new(),
    }
}

fn slot_operand(slot: Option<u16>, pc: usize, locals: &LocalVariableTable) -> String {
    let Some(slot) = slot else { return String::new() };
    match locals.lookup(slot, pc as u16) {
        Some(entry) => format!("{slot} [{}:{}]", entry.name, entry.descriptor),
        None => slot.to_string(),
    }
}

fn branch_target(instruction: &Instruction, relative: Option<i32>) -> String {
    match relative {
        Some(relative) => (instruction.offset as i32 + relative).to_string(),
        None => String::new(),
    }
}

fn render_wide(instruction: &Instruction, locals: &LocalVariableTable) -> String {
    let (Some(modified), Some(slot)) = (instruction.u8_operand(0), instruction.u16_operand(1)) else {
        return String::new();
    };
    let slot = slot_operand(Some(slot), instruction.offset, locals);
    if modified == IINC {
        match instruction.i16_operand(3) {
            Some(constant) => format!("{slot}, {constant}"),
            None => slot,
        }
    } else {
        slot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_simple_method_body() {
        // aload_0 ; getfield #2 ; ifnonnull 7 ; aconst_null ; athrow ; return
        let code = vec![
            ALOAD_0, GETFIELD, 0x00, 0x02, 0xc7, 0x00, 0x07, ACONST_NULL, ATHROW, RETURN,
        ];
        let decoded = decode_all(&code).unwrap();
        let mnemonics: Vec<_> = decoded.iter().map(|i| i.mnemonic()).collect();
        assert_eq!(
            mnemonics,
            vec!["aload_0", "getfield", "ifnonnull", "aconst_null", "athrow", "return"]
        );
        assert_eq!(decoded[1].u16_operand(0), Some(2));
    }

    #[test]
    fn tableswitch_length_respects_mod4_reduced_padding() {
        // tableswitch at offset 1: pad should be (4 - 2 % 4) % 4 = 2
        let mut code = vec![NOP, TABLESWITCH];
        code.extend_from_slice(&[0, 0]); // padding (2 bytes)
        code.extend_from_slice(&0i32.to_be_bytes()); // default
        code.extend_from_slice(&0i32.to_be_bytes()); // low
        code.extend_from_slice(&1i32.to_be_bytes()); // high -> 2 entries
        code.extend_from_slice(&0i32.to_be_bytes());
        code.extend_from_slice(&0i32.to_be_bytes());
        let len = instruction_length(&code, 1).unwrap();
        assert_eq!(len, code.len() - 1);
    }

    #[test]
    fn wide_iinc_is_six_bytes() {
        let code = vec![WIDE, IINC, 0x00, 0x01, 0x00, 0x02];
        assert_eq!(instruction_length(&code, 0).unwrap(), 6);
    }

    fn utf8_pool(strings: &[&str]) -> ConstantPoolTable {
        let mut bytes = Vec::new();
        for s in strings {
            bytes.push(1u8);
            bytes.extend_from_slice(&(s.len() as u16).to_be_bytes());
            bytes.extend_from_slice(s.as_bytes());
        }
        ConstantPoolTable::read_all(&bytes).unwrap()
    }

    #[test]
    fn format_instruction_resolves_field_ref_through_the_pool() {
        // #1 = Utf8 "Fieldref" stand-in isn't how a real pool works, but entry_to_string
        // on an out-of-range index falls back to `#index`, which is enough to prove the
        // operand came from the pool rather than from the raw byte.
        let pool = utf8_pool(&["x"]);
        let instruction = Instruction { offset: 0, opcode: GETFIELD, operands: vec![0x00, 0x09] };
        let rendered = format_instruction(&instruction, &pool, &LocalVariableTable::default());
        assert!(rendered.contains("getfield"));
        assert!(rendered.contains("#9"));
    }

    #[test]
    fn format_instruction_resolves_local_slot_through_the_variable_table() {
        let pool = utf8_pool(&[]);
        let mut locals = LocalVariableTable::default();
        locals.push_for_test(0, 10, "count", "I", 1);
        let instruction = Instruction { offset: 2, opcode: ILOAD, operands: vec![0x01] };
        let rendered = format_instruction(&instruction, &pool, &locals);
        assert!(rendered.contains("1 [count:I]"));
    }

    #[test]
    fn format_instruction_prints_implicit_slot_forms_too() {
        let pool = utf8_pool(&[]);
        let mut locals = LocalVariableTable::default();
        locals.push_for_test(0, 10, "this", "Lpkg/Thing;", 0);
        let instruction = Instruction { offset: 0, opcode: ALOAD_0, operands: vec![] };
        let rendered = format_instruction(&instruction, &pool, &locals);
        assert!(rendered.contains("0 [this:Lpkg/Thing;]"));
    }

    #[test]
    fn format_instruction_prints_switch_mnemonic_with_no_operand() {
        let pool = utf8_pool(&[]);
        let instruction = Instruction {
            offset: 0,
            opcode: TABLESWITCH,
            operands: vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
        };
        let rendered = format_instruction(&instruction, &pool, &LocalVariableTable::default());
        assert_eq!(rendered.trim_end(), "    0: tableswitch");
    }

    #[test]
    fn format_instruction_resolves_goto_to_an_absolute_target() {
        let pool = utf8_pool(&[]);
        let instruction = Instruction { offset: 10, opcode: GOTO, operands: vec![0xff, 0xfb] }; // -5
        let rendered = format_instruction(&instruction, &pool, &LocalVariableTable::default());
        assert!(rendered.contains(" 5"));
    }
}
