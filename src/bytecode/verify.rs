use std::collections::BTreeSet;

use crate::bytecode::image::ImageError;
use crate::bytecode::op::Op;

/// Addresses at which an instruction starts, decoding linearly from 0.
///
/// Stops at the first word that is not an opcode or whose operands run
/// past the end.
fn decode(code: &[i64]) -> Result<BTreeSet<usize>, ImageError> {
    let mut starts = BTreeSet::new();
    let mut ip = 0;

    while ip < code.len() {
        let op = Op::try_from(code[ip])
            .map_err(|word| ImageError::UnknownOpcode { addr: ip, word })?;
        if ip + op.arity() >= code.len() {
            return Err(ImageError::TruncatedOperand { addr: ip, op });
        }
        starts.insert(ip);
        ip += 1 + op.arity();
    }

    Ok(starts)
}

/// Checks that `code` decodes cleanly and that every jump lands on an
/// instruction.
///
/// Call targets travel through the stack as plain `PUSH` operands and
/// cannot be told apart from other integers, so they are not checked here.
pub fn verify(code: &[i64]) -> Result<(), ImageError> {
    let starts = decode(code)?;

    for &ip in &starts {
        let Ok(op) = Op::try_from(code[ip]) else {
            continue;
        };
        if !op.is_jump() {
            continue;
        }
        let target = code[ip + 1];
        let lands = usize::try_from(target).is_ok_and(|t| starts.contains(&t));
        if !lands {
            return Err(ImageError::JumpOutOfRange { addr: ip, target });
        }
    }

    // The entry stub must be able to finish.
    if !starts.is_empty() && !starts.iter().any(|&ip| code[ip] == Op::Exit.word()) {
        return Err(ImageError::NoExit);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn w(op: Op) -> i64 {
        op.word()
    }

    #[test]
    fn test_generated_shape_passes() {
        let code = vec![
            w(Op::Push),
            5,
            w(Op::Call),
            0,
            w(Op::Exit),
            w(Op::Push),
            1,
            w(Op::Jmpz),
            10,
            w(Op::Ret),
            w(Op::Ret),
        ];
        assert!(verify(&code).is_ok());
    }

    #[test]
    fn test_empty_stream_is_trivially_fine() {
        assert!(verify(&[]).is_ok());
    }

    #[test]
    fn test_unknown_opcode() {
        let code = vec![w(Op::Exit), 0];
        assert!(matches!(
            verify(&code),
            Err(ImageError::UnknownOpcode { addr: 1, word: 0 })
        ));
    }

    #[test]
    fn test_truncated_operand() {
        let code = vec![w(Op::Exit), w(Op::Push)];
        assert!(matches!(
            verify(&code),
            Err(ImageError::TruncatedOperand { addr: 1, op: Op::Push })
        ));
    }

    #[test]
    fn test_jump_outside_code() {
        let code = vec![w(Op::Jmp), 40, w(Op::Exit)];
        assert!(matches!(
            verify(&code),
            Err(ImageError::JumpOutOfRange { addr: 0, target: 40 })
        ));
    }

    #[test]
    fn test_jump_into_operand() {
        // address 1 is PUSH's operand, not an instruction
        let code = vec![w(Op::Push), 7, w(Op::Jmp), 1, w(Op::Exit)];
        assert!(matches!(
            verify(&code),
            Err(ImageError::JumpOutOfRange { addr: 2, target: 1 })
        ));
    }

    #[test]
    fn test_missing_exit() {
        let code = vec![w(Op::Push), 1, w(Op::Ret)];
        assert!(matches!(verify(&code), Err(ImageError::NoExit)));
    }
}
