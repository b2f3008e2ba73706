use std::collections::{BTreeSet, HashMap};
use std::io::{self, Write};

use crate::bytecode::op::Op;
use crate::bytecode::strings::StringTable;

/// Writes a listing of `code`, one instruction per line.
///
/// Jump targets get a `►` marker and function entries (from `symbols`) a
/// header. `PUSH` operands that name a function are annotated with it; the
/// operand of a `PUSH` followed by `OUT_STRING` is shown as its string.
pub fn write_listing(
    out: &mut impl Write,
    code: &[i64],
    strings: &StringTable,
    symbols: &[(String, usize)],
) -> io::Result<()> {
    let targets = collect_jump_targets(code);
    let entries: HashMap<usize, &str> = symbols
        .iter()
        .map(|(name, addr)| (*addr, name.as_str()))
        .collect();

    writeln!(out, "=== BYTECODE PROGRAM ===")?;
    writeln!(out, " {} words, {} strings", code.len(), strings.len())?;

    let mut ip = 0;
    while ip < code.len() {
        if let Some(name) = entries.get(&ip) {
            writeln!(out)?;
            writeln!(out, "════════════════════════════════════════")?;
            writeln!(out, " {}", name)?;
            writeln!(out, "════════════════════════════════════════")?;
        }

        let marker = if targets.contains(&ip) { "► " } else { "  " };
        write!(out, "{:04} {}", ip, marker)?;

        let Ok(op) = Op::try_from(code[ip]) else {
            writeln!(out, "??? {}", code[ip])?;
            ip += 1;
            continue;
        };

        let Some(&operand) = code.get(ip + 1).filter(|_| op.arity() == 1) else {
            if op.arity() == 1 {
                writeln!(out, "{:<11} <truncated>", op.mnemonic())?;
            } else {
                writeln!(out, "{}", op.mnemonic())?;
            }
            ip += 1 + op.arity();
            continue;
        };

        let next = code.get(ip + 2).and_then(|w| Op::try_from(*w).ok());
        let note = match op {
            Op::Push => match (usize::try_from(operand).ok().and_then(|a| entries.get(&a)), next) {
                (_, Some(Op::OutString)) => strings.get(operand).map(|s| format!("{:?}", s)),
                (Some(name), _) => Some(format!("<{}>", name)),
                (None, _) => None,
            },
            Op::Jmp | Op::Jmpz => Some(format!("-> {:04}", operand)),
            Op::Call => Some(format!("{} arg(s)", operand)),
            _ => None,
        };

        match note {
            Some(note) => writeln!(out, "{:<11} {:<6} ; {}", op.mnemonic(), operand, note)?,
            None => writeln!(out, "{:<11} {}", op.mnemonic(), operand)?,
        }
        ip += 2;
    }
    Ok(())
}

/// Prints a listing to stdout.
pub fn print_bc(code: &[i64], strings: &StringTable, symbols: &[(String, usize)]) -> io::Result<()> {
    let stdout = io::stdout();
    write_listing(&mut stdout.lock(), code, strings, symbols)
}

fn collect_jump_targets(code: &[i64]) -> BTreeSet<usize> {
    let mut targets = BTreeSet::new();
    let mut ip = 0;

    while ip < code.len() {
        let Ok(op) = Op::try_from(code[ip]) else {
            ip += 1;
            continue;
        };
        if op.is_jump()
            && let Some(target) = code.get(ip + 1).and_then(|t| usize::try_from(*t).ok())
        {
            targets.insert(target);
        }
        ip += 1 + op.arity();
    }

    targets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(code: &[i64], strings: &StringTable, symbols: &[(String, usize)]) -> String {
        let mut out = Vec::new();
        write_listing(&mut out, code, strings, symbols).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_listing_marks_targets_and_functions() {
        let code = vec![
            Op::Push.word(),
            5,
            Op::Call.word(),
            0,
            Op::Exit.word(),
            Op::Push.word(),
            0,
            Op::Jmpz.word(),
            5,
            Op::Ret.word(),
        ];
        let text = listing(&code, &StringTable::new(), &[("main".to_string(), 5)]);

        assert!(text.contains(" main\n"));
        assert!(text.contains("0000   PUSH        5      ; <main>"));
        assert!(text.contains("0005 ► PUSH        0"));
        assert!(text.contains("JMPZ        5      ; -> 0005"));
        assert!(text.contains("0009   RET"));
    }

    #[test]
    fn test_listing_shows_strings_and_bad_words() {
        let mut strings = StringTable::new();
        strings.intern("hello");
        let code = vec![Op::Push.word(), 0, Op::OutString.word(), 999];
        let text = listing(&code, &strings, &[]);

        assert!(text.contains("; \"hello\""));
        assert!(text.contains("0003   ??? 999"));
    }

    #[test]
    fn test_truncated_operand() {
        let code = vec![Op::Jmp.word()];
        let text = listing(&code, &StringTable::new(), &[]);
        assert!(text.contains("JMP         <truncated>"));
    }
}
