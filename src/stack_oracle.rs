//! The stack-effect oracle (§4.4): given a decoded instruction, returns how many
//! operand-stack slots it nets (pushes minus pops).
//!
//! Grounded on `examples/original_source/src/main/cpp/analyzer.cpp`'s `getStackDelta()`:
//! a static table for opcodes whose effect never varies, plus dynamic rules for the
//! invoke family, `multianewarray`, field access, and the stack-shuffling opcodes
//! (`swap`, the `dup` family) whose delta depends on how far from the top of the stack
//! the value of interest sits (`stack_excess`).

use crate::errors::{Error, Result};
use crate::instructions::{self, Instruction};

/// Extra facts the oracle needs for opcodes whose delta isn't determined by the opcode
/// alone. Built by the caller (the analyzer, via `Method`/`Field` resolution) before
/// asking for a delta.
#[derive(Clone, Copy, Debug)]
pub enum EffectContext {
    None,
    /// `invokevirtual`/`invokespecial`/`invokestatic`/`invokeinterface`/`invokedynamic`.
    Invoke { parameter_length: u8, has_receiver: bool, return_width: u8 },
    /// `getstatic`/`putstatic`/`getfield`/`putfield`.
    FieldAccess { value_width: u8, is_static: bool, is_get: bool },
    MultiANewArray { dimensions: u8 },
    /// `swap`/`dup*`: how many stack slots down from the top the value the analyzer is
    /// tracking currently sits.
    StackShuffle { stack_excess: i32 },
}

fn static_delta(opcode: u8) -> Option<i32> {
    Some(match opcode {
        0x00 => 0, // nop
        0x01..=0x0f => 1, // aconst_null .. dconst_1 (long/double constants count as 1 push here, width handled by caller)
        0x10 | 0x11 => 1, // bipush, sipush
        0x15 | 0x17 | 0x19 => 1, // iload, fload, aload
        0x16 | 0x18 => 1, // lload, dload (a single value, width handled elsewhere)
        0x1a..=0x2d => 1, // iload_0..aload_3
        0x2e | 0x30 | 0x32..=0x35 => -1, // iaload, faload, aaload, baload, caload, saload
        0x2f | 0x31 => -1, // laload, daload
        0x36..=0x3a => -1, // istore..astore
        0x3b..=0x4e => -1, // istore_0..astore_3
        0x4f | 0x51 | 0x53..=0x56 => -3, // iastore, fastore, aastore, bastore, castore, sastore
        0x50 | 0x52 => -4, // lastore, dastore
        0x57 => -1, // pop
        0x58 => -2, // pop2
        0x60..=0x83 => -1, // binary arithmetic / bitwise ops, net one operand consumed
        0x74..=0x77 => 0, // ineg, lneg, fneg, dneg
        0x84 => 0, // iinc
        0x85..=0x93 => 0, // widening/narrowing conversions
        0x94..=0x98 => -1, // lcmp, fcmpl, fcmpg, dcmpl, dcmpg
        0x99..=0x9e => -1, // ifeq..ifle
        0x9f..=0xa6 => -2, // if_icmp*, if_acmp*
        0xa7 => -127, // goto: never continues forward
        0xa8 => 1, // jsr
        0xa9 => 0, // ret
        0xaa | 0xab => -1, // tableswitch, lookupswitch
        0xac..=0xb0 => -127, // *return, areturn: terminal
        0xb1 => -127, // return
        0xbb => 1, // new
        0xbc | 0xbd => 0, // newarray, anewarray (pop count, push array -> net 0)
        0xbe => 0, // arraylength (pop arrayref, push length)
        0xbf => -127, // athrow: terminal
        0xc0 | 0xc1 => 0, // checkcast, instanceof
        0xc2 | 0xc3 => -1, // monitorenter, monitorexit
        0xc6 | 0xc7 => -1, // ifnull, ifnonnull
        0xc8 => -127, // goto_w
        0xc9 => 1, // jsr_w
        _ => return None,
    })
}

/// Computes the net stack-slot delta of `instruction`.
pub fn stack_delta(instruction: &Instruction, ctx: EffectContext) -> Result<i32> {
    let opcode = if instruction.opcode == instructions::WIDE {
        instruction.u8_operand(0).ok_or_else(|| {
            Error::InvalidArgument("wide instruction missing modified opcode".into())
        })?
    } else {
        instruction.opcode
    };

    match opcode {
        instructions::GETSTATIC | instructions::PUTSTATIC | instructions::GETFIELD
        | instructions::PUTFIELD => match ctx {
            EffectContext::FieldAccess { value_width, is_static, is_get } => {
                let width = value_width as i32;
                Ok(match (is_static, is_get) {
                    (true, true) => width,
                    (true, false) => -width,
                    (false, true) => width - 1,
                    (false, false) => -(width + 1),
                })
            }
            _ => Err(Error::InvalidArgument("field access requires a FieldAccess context".into())),
        },
        instructions::INVOKEVIRTUAL
        | instructions::INVOKESPECIAL
        | instructions::INVOKESTATIC
        | instructions::INVOKEINTERFACE
        | instructions::INVOKEDYNAMIC => match ctx {
            EffectContext::Invoke { parameter_length, has_receiver, return_width } => {
                let popped = parameter_length as i32 + if has_receiver { 1 } else { 0 };
                Ok(return_width as i32 - popped)
            }
            _ => Err(Error::InvalidArgument("invoke requires an Invoke context".into())),
        },
        instructions::MULTIANEWARRAY => match ctx {
            EffectContext::MultiANewArray { dimensions } => Ok(1 - dimensions as i32),
            _ => Err(Error::InvalidArgument(
                "multianewarray requires a MultiANewArray context".into(),
            )),
        },
        instructions::SWAP => match ctx {
            EffectContext::StackShuffle { stack_excess } => Ok(match stack_excess {
                1 => 1,
                0 => -1,
                _ => 0,
            }),
            _ => Err(Error::InvalidArgument("swap requires a StackShuffle context".into())),
        },
        instructions::DUP => Ok(1),
        instructions::DUP2 => match ctx {
            EffectContext::StackShuffle { stack_excess } => Ok(if stack_excess >= 2 { 2 } else { 0 }),
            _ => Err(Error::InvalidArgument("dup2 requires a StackShuffle context".into())),
        },
        instructions::DUP_X1 => match ctx {
            EffectContext::StackShuffle { stack_excess } => Ok(match stack_excess {
                2 => 2,
                e if e < 2 => 0,
                _ => 1,
            }),
            _ => Err(Error::InvalidArgument("dup_x1 requires a StackShuffle context".into())),
        },
        instructions::DUP_X2 => match ctx {
            EffectContext::StackShuffle { stack_excess } => Ok(match stack_excess {
                3 => 3,
                e if e < 3 => 0,
                _ => 1,
            }),
            _ => Err(Error::InvalidArgument("dup_x2 requires a StackShuffle context".into())),
        },
        instructions::DUP2_X1 => match ctx {
            EffectContext::StackShuffle { stack_excess } => Ok(match stack_excess {
                3 | 4 => 3,
                e if e < 3 => 0,
                _ => 2,
            }),
            _ => Err(Error::InvalidArgument("dup2_x1 requires a StackShuffle context".into())),
        },
        instructions::DUP2_X2 => match ctx {
            EffectContext::StackShuffle { stack_excess } => Ok(match stack_excess {
                4 | 5 => 4,
                e if e < 4 => 0,
                _ => 2,
            }),
            _ => Err(Error::InvalidArgument("dup2_x2 requires a StackShuffle context".into())),
        },
        _ => static_delta(opcode)
            .ok_or_else(|| Error::UnsupportedStackOpcode(opcode)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instructions::Instruction;

    fn instr(opcode: u8) -> Instruction {
        Instruction { offset: 0, opcode, operands: vec![] }
    }

    #[test]
    fn simple_pop_opcodes() {
        assert_eq!(stack_delta(&instr(0x57), EffectContext::None).unwrap(), -1);
        assert_eq!(stack_delta(&instr(0xbf), EffectContext::None).unwrap(), -127);
    }

    #[test]
    fn invoke_pops_args_and_receiver_pushes_return() {
        let ctx = EffectContext::Invoke { parameter_length: 1, has_receiver: true, return_width: 1 };
        // one-arg instance method returning a reference: pop 1(arg) + 1(this), push 1
        assert_eq!(stack_delta(&instr(instructions::INVOKEVIRTUAL), ctx).unwrap(), -1);
    }

    #[test]
    fn static_field_get_pushes_value_width() {
        let ctx = EffectContext::FieldAccess { value_width: 2, is_static: true, is_get: true };
        assert_eq!(stack_delta(&instr(instructions::GETSTATIC), ctx).unwrap(), 2);
    }

    #[test]
    fn field_access_without_context_is_invalid_argument() {
        assert!(matches!(
            stack_delta(&instr(instructions::GETFIELD), EffectContext::None),
            Err(Error::InvalidArgument(_))
        ));
    }

    /// Property P4 (§8): for each stack-shuffling opcode, the delta at every
    /// `stack_excess` from 0 to 5 matches the value the tracked slot's new depth
    /// implies, not just the one or two cases exercised above.
    fn assert_shuffle_sweep(opcode: u8, expected: [i32; 6]) {
        for stack_excess in 0..=5 {
            let ctx = EffectContext::StackShuffle { stack_excess };
            assert_eq!(
                stack_delta(&instr(opcode), ctx).unwrap(),
                expected[stack_excess as usize],
                "opcode 0x{opcode:02x} at stack_excess={stack_excess}"
            );
        }
    }

    #[test]
    fn swap_stack_excess_sweep() {
        assert_shuffle_sweep(instructions::SWAP, [-1, 1, 0, 0, 0, 0]);
    }

    #[test]
    fn dup_stack_excess_sweep() {
        // dup's delta never depends on stack_excess; it always pushes one slot.
        assert_shuffle_sweep(instructions::DUP, [1, 1, 1, 1, 1, 1]);
    }

    #[test]
    fn dup_x1_stack_excess_sweep() {
        assert_shuffle_sweep(instructions::DUP_X1, [0, 0, 2, 1, 1, 1]);
    }

    #[test]
    fn dup_x2_stack_excess_sweep() {
        assert_shuffle_sweep(instructions::DUP_X2, [0, 0, 0, 3, 1, 1]);
    }

    #[test]
    fn dup2_stack_excess_sweep() {
        assert_shuffle_sweep(instructions::DUP2, [0, 0, 2, 2, 2, 2]);
    }

    #[test]
    fn dup2_x1_stack_excess_sweep() {
        assert_shuffle_sweep(instructions::DUP2_X1, [0, 0, 0, 3, 3, 2]);
    }

    #[test]
    fn dup2_x2_stack_excess_sweep() {
        assert_shuffle_sweep(instructions::DUP2_X2, [0, 0, 0, 0, 4, 4]);
    }
}
