//! The NPE cause analyzer (§4.5): the reason this crate exists. Classifies which
//! bytecode operation faulted, then walks backward through the method simulating
//! operand-stack height until it finds the instruction that produced the null value.
//!
//! Grounded on `examples/original_source/src/main/cpp/analyzer.cpp`'s
//! `describeNPEInstruction`/`traceDetailedCause` — this module is a close port of that
//! backward walk, with two deliberate deviations the spec calls for over the original
//! (§9, and recorded in `DESIGN.md`): array-store/array-load initial `stack_excess`
//! values, and per-element-type array descriptions instead of a generic "array value".

use crate::code_attribute::CodeAttribute;
use crate::constants::ConstantPoolTable;
use crate::errors::{Error, Result};
use crate::field::Field;
use crate::instructions::{self, Instruction};
use crate::method::{CurrentMethod, Method};
use crate::stack_oracle::{self, EffectContext};

/// One JVMS "array type" slice of the `*aload`/`*astore` opcode ranges, used both for
/// the lead phrase's element-type word and for the array-store width split (§9).
fn array_element_type(opcode: u8) -> Option<&'static str> {
    Some(match opcode {
        instructions::IALOAD | instructions::IASTORE => "int",
        instructions::LALOAD | instructions::LASTORE => "long",
        0x30 | 0x51 => "float",  // faload, fastore
        instructions::DALOAD | instructions::DASTORE => "double",
        instructions::AALOAD | instructions::AASTORE => "object",
        instructions::BALOAD | instructions::BASTORE => "byte",
        instructions::CALOAD | instructions::CASTORE => "char",
        instructions::SALOAD | instructions::SASTORE => "short",
        _ => return None,
    })
}

fn is_array_store(opcode: u8) -> bool {
    (instructions::IASTORE..=instructions::SASTORE).contains(&opcode)
}

fn is_array_load(opcode: u8) -> bool {
    matches!(
        opcode,
        instructions::IALOAD
            | instructions::LALOAD
            | 0x30
            | instructions::DALOAD
            | instructions::AALOAD
            | instructions::BALOAD
            | instructions::CALOAD
            | instructions::SALOAD
    )
}

/// Phase A (§4.5): classifies the faulting opcode into a lead phrase plus the initial
/// `stack_excess` Phase B starts its backward walk with. Returns `None` for "otherwise"
/// (`[Unknown NPE cause] `), which skips Phase B entirely.
fn classify_fault(
    pool: &ConstantPoolTable,
    code: &CodeAttribute,
    instruction: &Instruction,
) -> Result<Option<(String, i32)>> {
    let opcode = instruction.opcode;
    Ok(match opcode {
        instructions::INVOKEVIRTUAL
        | instructions::INVOKESPECIAL
        | instructions::INVOKEINTERFACE
        | instructions::INVOKEDYNAMIC => {
            let index = instruction
                .u16_operand(0)
                .ok_or_else(|| Error::InvalidArgument("invoke missing pool-index operand".into()))?;
            let method = Method::from_ref(pool, index)?;
            let lead = format!("Invoking {} on null ", method.label());
            Some((lead, method.parameter_length as i32))
        }
        instructions::INVOKESTATIC => {
            let index = instruction
                .u16_operand(0)
                .ok_or_else(|| Error::InvalidArgument("invoke missing pool-index operand".into()))?;
            let method = Method::from_ref(pool, index)?;
            if method.is_objects_require_non_null() {
                Some(("Assertion Objects#requireNonNull failed for null ".to_string(), 0))
            } else {
                None
            }
        }
        instructions::GETFIELD => {
            let field = field_at(pool, instruction)?;
            Some((format!("Getting field {} of null ", field.label()), 0))
        }
        instructions::PUTFIELD => {
            let field = field_at(pool, instruction)?;
            Some((format!("Setting field {} of null ", field.label()), 1))
        }
        _ if is_array_store(opcode) => {
            let elem = array_element_type(opcode).unwrap();
            let excess = if matches!(opcode, instructions::LASTORE | instructions::DASTORE) { 3 } else { 2 };
            Some((format!("Storing {elem} to null array - "), excess))
        }
        _ if is_array_load(opcode) => {
            let elem = array_element_type(opcode).unwrap();
            Some((format!("Loading {elem} from null array - "), 1))
        }
        instructions::ARRAYLENGTH => Some(("Getting array length of null ".to_string(), 0)),
        instructions::ATHROW => Some(("Throwing null ".to_string(), 0)),
        instructions::MONITORENTER | instructions::MONITOREXIT => {
            Some(("Synchronizing on null ".to_string(), 0))
        }
        _ => {
            let _ = code;
            None
        }
    })
}

fn field_at(pool: &ConstantPoolTable, instruction: &Instruction) -> Result<Field> {
    let index = instruction
        .u16_operand(0)
        .ok_or_else(|| Error::InvalidArgument("field access missing pool-index operand".into()))?;
    Field::from_ref(pool, index)
}

/// Builds the stack-effect oracle's `EffectContext` for whichever instruction Phase B is
/// currently stepping over. Most opcodes need none; the dynamic-delta families (§4.4)
/// each resolve their operand through the constant pool first.
fn context_for(
    pool: &ConstantPoolTable,
    instruction: &Instruction,
    opcode: u8,
    stack_excess: i32,
) -> Result<EffectContext> {
    match opcode {
        instructions::GETSTATIC | instructions::PUTSTATIC | instructions::GETFIELD
        | instructions::PUTFIELD => {
            let field = field_at(pool, instruction)?;
            let is_static = matches!(opcode, instructions::GETSTATIC | instructions::PUTSTATIC);
            let is_get = matches!(opcode, instructions::GETSTATIC | instructions::GETFIELD);
            Ok(EffectContext::FieldAccess { value_width: field.value_width(), is_static, is_get })
        }
        instructions::INVOKEVIRTUAL
        | instructions::INVOKESPECIAL
        | instructions::INVOKESTATIC
        | instructions::INVOKEINTERFACE => {
            let index = instruction
                .u16_operand(0)
                .ok_or_else(|| Error::InvalidArgument("invoke missing pool-index operand".into()))?;
            let method = Method::from_ref(pool, index)?;
            let return_width = if method.return_type == "void" {
                0
            } else if method.return_type == "long" || method.return_type == "double" {
                2
            } else {
                1
            };
            Ok(EffectContext::Invoke {
                parameter_length: method.parameter_length,
                has_receiver: opcode != instructions::INVOKESTATIC,
                return_width,
            })
        }
        instructions::INVOKEDYNAMIC => {
            // A `Dynamic`/`InvokeDynamic` call site has no receiver; its parameter
            // width still comes from the `NameAndType` descriptor half of the entry.
            let index = instruction
                .u16_operand(0)
                .ok_or_else(|| Error::InvalidArgument("invokedynamic missing operand".into()))?;
            let descriptor = invoke_dynamic_descriptor(pool, index)?;
            let (params, return_type) = crate::descriptors::parse_method_signature(&descriptor)?;
            let parameter_length = crate::descriptors::parameter_length(&params)?;
            let return_width = if return_type == "void" {
                0
            } else if return_type == "long" || return_type == "double" {
                2
            } else {
                1
            };
            Ok(EffectContext::Invoke { parameter_length, has_receiver: false, return_width })
        }
        instructions::MULTIANEWARRAY => {
            let dimensions = instruction
                .u8_operand(2)
                .ok_or_else(|| Error::InvalidArgument("multianewarray missing dimensions operand".into()))?;
            Ok(EffectContext::MultiANewArray { dimensions })
        }
        instructions::SWAP
        | instructions::DUP
        | instructions::DUP_X1
        | instructions::DUP_X2
        | instructions::DUP2
        | instructions::DUP2_X1
        | instructions::DUP2_X2 => Ok(EffectContext::StackShuffle { stack_excess }),
        _ => Ok(EffectContext::None),
    }
}

fn invoke_dynamic_descriptor(pool: &ConstantPoolTable, index: u16) -> Result<String> {
    use crate::constants::ConstantPool;
    let name_and_type_index = match pool.get(index)? {
        ConstantPool::InvokeDynamic { name_and_type_index, .. } => *name_and_type_index,
        other => {
            return Err(Error::MalformedConstantPool(format!(
                "index {index} expected InvokeDynamic, found {other:?}"
            )))
        }
    };
    match pool.get(name_and_type_index)? {
        ConstantPool::NameAndType { descriptor_index, .. } => {
            pool.entry_to_string(*descriptor_index, false)
        }
        other => Err(Error::MalformedConstantPool(format!(
            "index {name_and_type_index} expected NameAndType, found {other:?}"
        ))),
    }
}

/// The local-variable-load slot an `iload`/`aload`/... family instruction (including its
/// `wide`-prefixed and implicit-slot `_0`..`_3` forms) addresses.
fn load_slot(instruction: &Instruction) -> Option<u16> {
    match instruction.opcode {
        instructions::WIDE => {
            let modified = instruction.u8_operand(0)?;
            if (instructions::ILOAD..=instructions::ALOAD).contains(&modified) {
                instruction.u16_operand(1)
            } else {
                None
            }
        }
        instructions::ILOAD..=instructions::ALOAD => instruction.u8_operand(0).map(|b| b as u16),
        op if (0x1a..=0x2d).contains(&op) => Some(((op - 0x1a) % 4) as u16),
        _ => None,
    }
}

fn is_load_opcode(instruction: &Instruction) -> bool {
    match instruction.opcode {
        instructions::WIDE => instruction
            .u8_operand(0)
            .is_some_and(|m| (instructions::ILOAD..=instructions::ALOAD).contains(&m)),
        op => (instructions::ILOAD..=instructions::ALOAD).contains(&op) || (0x1a..=0x2d).contains(&op),
    }
}

/// Phase B (§4.5): walks backward from the faulting instruction, simulating the
/// operand-stack height via the stack-effect oracle, until it finds the producer of the
/// null slot. Returns the producer's description (without the lead phrase).
fn trace_producer(
    method: &CurrentMethod,
    pool: &ConstantPoolTable,
    code: &CodeAttribute,
    fault_offset: usize,
    mut stack_excess: i32,
) -> Result<String> {
    let instructions = code.instructions();
    let mut idx = instructions
        .iter()
        .position(|i| i.offset == fault_offset)
        .ok_or_else(|| Error::InvalidArgument(format!("offset {fault_offset} is not an instruction boundary")))?;

    while stack_excess >= 0 && idx != 0 {
        idx -= 1;
        let instruction = &instructions[idx];
        let opcode = if instruction.opcode == instructions::WIDE {
            instruction
                .u8_operand(0)
                .ok_or_else(|| Error::InvalidArgument("wide instruction missing modified opcode".into()))?
        } else {
            instruction.opcode
        };

        let ctx = context_for(pool, instruction, opcode, stack_excess)?;
        let delta = stack_oracle::stack_delta(instruction, ctx)?;
        log::trace!(
            target: "Analyzer",
            "op {} at {} delta {delta} excess {stack_excess}",
            instructions::mnemonic(opcode),
            instruction.offset
        );

        if delta == -127 {
            // A terminator/unconditional jump: the walk must not step through it (§4.4).
            break;
        }

        stack_excess -= delta;
        if stack_excess > 0 || (stack_excess == 0 && delta != 0) {
            continue;
        }

        if is_load_opcode(instruction) {
            let slot = load_slot(instruction)
                .ok_or_else(|| Error::InvalidArgument("load instruction missing slot".into()))?;
            let pc = instruction.offset as u16;
            let is_param = method.slot_is_parameter(slot);
            return Ok(if let Some(entry) = code.local_variables.lookup(slot, pc) {
                let kind = if is_param { "method parameter" } else { "local variable" };
                let (human_type, _) = crate::descriptors::parse_type(&entry.descriptor, 0)?;
                format!("{kind} {}:{}", entry.name, human_type)
            } else if is_param {
                match method.parameter_index_for_slot(slot) {
                    Some(index) => format!("method parameter at index {index}"),
                    None => format!("local variable in slot {slot}"),
                }
            } else {
                format!("local variable in slot {slot}")
            });
        }

        return Ok(match opcode {
            instructions::ACONST_NULL => "constant".to_string(),
            instructions::GETFIELD => format!("instance field {}", field_at(pool, instruction)?.label()),
            instructions::GETSTATIC => format!("static field {}", field_at(pool, instruction)?.label()),
            instructions::INVOKEVIRTUAL
            | instructions::INVOKESPECIAL
            | instructions::INVOKESTATIC
            | instructions::INVOKEINTERFACE => {
                let index = instruction.u16_operand(0).ok_or_else(|| {
                    Error::InvalidArgument("invoke missing pool-index operand".into())
                })?;
                let invoked = Method::from_ref(pool, index)?;
                if invoked.return_type == "void" {
                    "UNKNOWN".to_string()
                } else {
                    format!("object returned from {}", invoked.label())
                }
            }
            _ => "UNKNOWN".to_string(),
        });
    }

    Ok("UNKNOWN".to_string())
}

/// Runs the full analyzer (§4.5 Phase A + B) over `method`'s code, returning the
/// complete detail-message sentence. Phase A' (the `Objects.requireNonNull` frame
/// retarget) is the caller's responsibility (`exception_callback.rs`), since it needs a
/// second frame from the host adapter this module has no access to.
pub fn describe_npe(
    method: &CurrentMethod,
    pool: &ConstantPoolTable,
    code: &CodeAttribute,
    fault_offset: usize,
) -> Result<String> {
    let instruction = code
        .instruction_at(fault_offset)
        .ok_or_else(|| Error::InvalidArgument(format!("offset {fault_offset} is not an instruction boundary")))?
        .clone();

    let Some((lead, stack_excess)) = classify_fault(pool, code, &instruction)? else {
        return Ok("[Unknown NPE cause] ".to_string());
    };

    let producer = trace_producer(method, pool, code, fault_offset, stack_excess)?;
    Ok(format!("{lead}{producer}"))
}
