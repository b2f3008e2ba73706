use std::io::{self, BufRead, Write};

use tracing::{debug, trace};

use crate::bytecode::op::Op;
use crate::bytecode::strings::StringTable;
use crate::runtime::config::VmConfig;
use crate::runtime::runtime_error::VmError;

/// The Cinder stack machine.
///
/// Code and stack share one flat word buffer: the code occupies
/// `mem[..code_len]` and the stack grows upward from `code_len`. Frames are
/// addressed relative to `bp`; see [`crate::analysis::resolver`] for the
/// layout.
pub struct Vm<R, W> {
    mem: Vec<i64>,
    code_len: usize,
    ip: usize,
    sp: usize,
    bp: usize,
    strings: StringTable,
    input: R,
    output: W,
    config: VmConfig,
    steps: u64,
    rng: u64,
}

impl Vm<io::StdinLock<'static>, io::Stdout> {
    /// A VM wired to the process's stdin and stdout.
    pub fn stdio(code: &[i64], strings: StringTable, config: VmConfig) -> Self {
        Vm::new(code, strings, io::stdin().lock(), io::stdout(), config)
    }
}

impl<R: BufRead, W: Write> Vm<R, W> {
    pub fn new(code: &[i64], strings: StringTable, input: R, output: W, config: VmConfig) -> Self {
        let code_len = code.len();
        let mut mem = Vec::with_capacity(code_len + config.stack_cells);
        mem.extend_from_slice(code);
        mem.resize(code_len + config.stack_cells, 0);

        Self {
            mem,
            code_len,
            ip: 0,
            sp: code_len,
            bp: code_len,
            strings,
            input,
            output,
            rng: config.seed,
            config,
            steps: 0,
        }
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    pub fn into_output(self) -> W {
        self.output
    }

    pub fn strings(&self) -> &StringTable {
        &self.strings
    }

    /// Number of values currently on the stack.
    pub fn depth(&self) -> usize {
        self.sp - self.code_len
    }

    // =========================================================================
    // Memory
    // =========================================================================

    fn fault(&self, addr: i64) -> VmError {
        VmError::MemoryFault { ip: self.ip, addr }
    }

    /// Checks that `addr` lies in the stack region.
    fn stack_addr(&self, addr: i64) -> Result<usize, VmError> {
        match usize::try_from(addr) {
            Ok(a) if a >= self.code_len && a < self.mem.len() => Ok(a),
            _ => Err(self.fault(addr)),
        }
    }

    fn frame_addr(&self, offset: i64) -> Result<usize, VmError> {
        let addr = (self.bp as i64)
            .checked_add(offset)
            .ok_or_else(|| self.fault(offset))?;
        self.stack_addr(addr)
    }

    fn push(&mut self, value: i64) -> Result<(), VmError> {
        if self.sp >= self.mem.len() {
            return Err(self.fault(self.sp as i64));
        }
        self.mem[self.sp] = value;
        self.sp += 1;
        Ok(())
    }

    fn pop(&mut self) -> Result<i64, VmError> {
        if self.sp <= self.code_len {
            return Err(self.fault(self.sp as i64 - 1));
        }
        self.sp -= 1;
        Ok(self.mem[self.sp])
    }

    fn pop_float(&mut self) -> Result<f64, VmError> {
        Ok(f64::from_bits(self.pop()? as u64))
    }

    fn push_float(&mut self, value: f64) -> Result<(), VmError> {
        self.push(value.to_bits() as i64)
    }

    fn push_bool(&mut self, value: bool) -> Result<(), VmError> {
        self.push(value as i64)
    }

    /// Pops `b` then `a`, returning `(a, b)`.
    fn pop_pair(&mut self) -> Result<(i64, i64), VmError> {
        let b = self.pop()?;
        let a = self.pop()?;
        Ok((a, b))
    }

    fn pop_float_pair(&mut self) -> Result<(f64, f64), VmError> {
        let b = self.pop_float()?;
        let a = self.pop_float()?;
        Ok((a, b))
    }

    fn fetch(&mut self) -> Result<i64, VmError> {
        if self.ip >= self.code_len {
            return Err(self.fault(self.ip as i64));
        }
        let word = self.mem[self.ip];
        self.ip += 1;
        Ok(word)
    }

    fn jump(&mut self, target: i64) -> Result<(), VmError> {
        match usize::try_from(target) {
            Ok(t) if t < self.code_len => {
                self.ip = t;
                Ok(())
            }
            _ => Err(self.fault(target)),
        }
    }

    // =========================================================================
    // Host I/O
    // =========================================================================

    fn read_line(&mut self) -> Result<String, VmError> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(VmError::InvalidInput("unexpected end of input".to_string()));
        }
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(line)
    }

    fn next_random(&mut self, bound: i64) -> i64 {
        self.rng = self.rng.wrapping_mul(1103515245).wrapping_add(12345);
        if bound <= 0 {
            return 0;
        }
        ((self.rng >> 16) % bound as u64) as i64
    }

    fn check_limits(&mut self) -> Result<(), VmError> {
        self.steps += 1;
        if let Some(max) = self.config.max_steps
            && self.steps > max
        {
            return Err(VmError::StepLimit(max));
        }
        Ok(())
    }

    // =========================================================================
    // Execution
    // =========================================================================

    /// Runs from address 0 until `EXIT`, returning the exit status: the top
    /// of the stack, or 0 when it is empty.
    pub fn run(&mut self) -> Result<i64, VmError> {
        self.ip = 0;
        self.sp = self.code_len;
        self.bp = self.code_len;
        self.steps = 0;

        let status = self.run_loop();
        self.output.flush()?;
        debug!(steps = self.steps, "vm halted");
        status
    }

    fn run_loop(&mut self) -> Result<i64, VmError> {
        loop {
            self.check_limits()?;

            let at = self.ip;
            let word = self.fetch()?;
            let op = Op::try_from(word).map_err(|word| VmError::UnknownOpcode { ip: at, word })?;
            trace!(ip = at, sp = self.sp, bp = self.bp, op = op.mnemonic());

            match op {
                // Integer arithmetic
                Op::Add => {
                    let (a, b) = self.pop_pair()?;
                    self.push(a.wrapping_add(b))?;
                }
                Op::Sub => {
                    let (a, b) = self.pop_pair()?;
                    self.push(a.wrapping_sub(b))?;
                }
                Op::Mul => {
                    let (a, b) = self.pop_pair()?;
                    self.push(a.wrapping_mul(b))?;
                }
                Op::Div => {
                    let (a, b) = self.pop_pair()?;
                    if b == 0 {
                        return Err(VmError::DivisionByZero { ip: at });
                    }
                    self.push(a.wrapping_div(b))?;
                }
                Op::Mod => {
                    let (a, b) = self.pop_pair()?;
                    if b == 0 {
                        return Err(VmError::DivisionByZero { ip: at });
                    }
                    self.push(a.wrapping_rem(b))?;
                }

                // Float arithmetic
                Op::AddF => {
                    let (a, b) = self.pop_float_pair()?;
                    self.push_float(a + b)?;
                }
                Op::SubF => {
                    let (a, b) = self.pop_float_pair()?;
                    self.push_float(a - b)?;
                }
                Op::MulF => {
                    let (a, b) = self.pop_float_pair()?;
                    self.push_float(a * b)?;
                }
                Op::DivF => {
                    let (a, b) = self.pop_float_pair()?;
                    self.push_float(a / b)?;
                }

                // Comparison
                Op::Eq => {
                    let (a, b) = self.pop_pair()?;
                    self.push_bool(a == b)?;
                }
                Op::Ne => {
                    let (a, b) = self.pop_pair()?;
                    self.push_bool(a != b)?;
                }
                Op::Lt => {
                    let (a, b) = self.pop_pair()?;
                    self.push_bool(a < b)?;
                }
                Op::Le => {
                    let (a, b) = self.pop_pair()?;
                    self.push_bool(a <= b)?;
                }
                Op::Gt => {
                    let (a, b) = self.pop_pair()?;
                    self.push_bool(a > b)?;
                }
                Op::Ge => {
                    let (a, b) = self.pop_pair()?;
                    self.push_bool(a >= b)?;
                }
                Op::EqF => {
                    let (a, b) = self.pop_float_pair()?;
                    self.push_bool(a == b)?;
                }
                Op::NeF => {
                    let (a, b) = self.pop_float_pair()?;
                    self.push_bool(a != b)?;
                }
                Op::LtF => {
                    let (a, b) = self.pop_float_pair()?;
                    self.push_bool(a < b)?;
                }
                Op::LeF => {
                    let (a, b) = self.pop_float_pair()?;
                    self.push_bool(a <= b)?;
                }
                Op::GtF => {
                    let (a, b) = self.pop_float_pair()?;
                    self.push_bool(a > b)?;
                }
                Op::GeF => {
                    let (a, b) = self.pop_float_pair()?;
                    self.push_bool(a >= b)?;
                }

                // Logic
                Op::And => {
                    let (a, b) = self.pop_pair()?;
                    self.push_bool(a != 0 && b != 0)?;
                }
                Op::Or => {
                    let (a, b) = self.pop_pair()?;
                    self.push_bool(a != 0 || b != 0)?;
                }
                Op::Not => {
                    let a = self.pop()?;
                    self.push_bool(a == 0)?;
                }

                // Stack
                Op::Pop => {
                    self.pop()?;
                }
                Op::Dup => {
                    let a = self.pop()?;
                    self.push(a)?;
                    self.push(a)?;
                }
                Op::Push => {
                    let imm = self.fetch()?;
                    self.push(imm)?;
                }

                // Frame memory
                Op::Peek => {
                    let offset = self.fetch()?;
                    let addr = self.frame_addr(offset)?;
                    self.push(self.mem[addr])?;
                }
                Op::Poke => {
                    let offset = self.fetch()?;
                    let addr = self.frame_addr(offset)?;
                    let value = self.pop()?;
                    self.mem[addr] = value;
                }
                Op::PeekI => {
                    let base = self.fetch()?;
                    let index = self.pop()?;
                    let addr = self.frame_addr(base.wrapping_add(index))?;
                    self.push(self.mem[addr])?;
                }
                Op::PokeI => {
                    let base = self.fetch()?;
                    let index = self.pop()?;
                    let value = self.pop()?;
                    let addr = self.frame_addr(base.wrapping_add(index))?;
                    self.mem[addr] = value;
                }
                Op::Alloc => {
                    let cells = self.fetch()?;
                    let top = match (self.sp as i64).checked_add(cells) {
                        Some(top) if cells >= 0 && top <= self.mem.len() as i64 => top,
                        Some(top) => return Err(self.fault(top)),
                        None => return Err(self.fault(cells)),
                    };
                    self.sp = top as usize;
                }

                // Conversion
                Op::Itof => {
                    let a = self.pop()?;
                    self.push_float(a as f64)?;
                }
                Op::Ftoi => {
                    let a = self.pop_float()?;
                    self.push(a as i64)?;
                }

                // Control flow
                Op::Call => {
                    let argc = self.fetch()?;
                    // The target sits just below the arguments.
                    let below = argc
                        .checked_add(1)
                        .filter(|_| argc >= 0)
                        .and_then(|n| (self.sp as i64).checked_sub(n))
                        .ok_or_else(|| self.fault(argc))?;
                    let target_cell = self.stack_addr(below)?;
                    let target = self.mem[target_cell];

                    self.push(self.ip as i64)?;
                    self.push(self.bp as i64)?;
                    self.push(target_cell as i64)?;
                    self.bp = self.sp;
                    self.jump(target)?;
                }
                Op::Ret => self.ret()?,
                Op::RetV => {
                    let value = self.pop()?;
                    self.ret()?;
                    self.push(value)?;
                }
                Op::Exit => {
                    return Ok(if self.sp > self.code_len {
                        self.mem[self.sp - 1]
                    } else {
                        0
                    });
                }
                Op::Jmp => {
                    let target = self.fetch()?;
                    self.jump(target)?;
                }
                Op::Jmpz => {
                    let target = self.fetch()?;
                    if self.pop()? == 0 {
                        self.jump(target)?;
                    }
                }

                // Output
                Op::OutInt => {
                    let a = self.pop()?;
                    write!(self.output, "{}", a)?;
                }
                Op::OutFloat => {
                    let a = self.pop_float()?;
                    // Debug keeps the fractional part: 2.0, not 2.
                    write!(self.output, "{:?}", a)?;
                }
                Op::OutString => {
                    let key = self.pop()?;
                    let s = self
                        .strings
                        .get(key)
                        .ok_or(VmError::UnknownString { ip: at, key })?;
                    self.output.write_all(s.as_bytes())?;
                }
                Op::OutChar => {
                    let a = self.pop()?;
                    let c = u32::try_from(a)
                        .ok()
                        .and_then(char::from_u32)
                        .unwrap_or(char::REPLACEMENT_CHARACTER);
                    write!(self.output, "{}", c)?;
                }
                Op::OutBool => {
                    let a = self.pop()?;
                    write!(self.output, "{}", a != 0)?;
                }

                // Input
                Op::InInt => {
                    self.output.flush()?;
                    let line = self.read_line()?;
                    let n = line
                        .trim()
                        .parse::<i64>()
                        .map_err(|_| VmError::InvalidInput(format!("expected an integer, got {:?}", line)))?;
                    self.push(n)?;
                }
                Op::InFloat => {
                    self.output.flush()?;
                    let line = self.read_line()?;
                    let f = line
                        .trim()
                        .parse::<f64>()
                        .map_err(|_| VmError::InvalidInput(format!("expected a number, got {:?}", line)))?;
                    self.push_float(f)?;
                }
                Op::InChar => {
                    self.output.flush()?;
                    let line = self.read_line()?;
                    let c = line
                        .chars()
                        .next()
                        .ok_or_else(|| VmError::InvalidInput("expected a character".to_string()))?;
                    self.push(c as i64)?;
                }
                Op::InString => {
                    self.output.flush()?;
                    let line = self.read_line()?;
                    let key = self.strings.intern(&line);
                    self.push(key)?;
                }

                Op::Rand => {
                    let bound = self.pop()?;
                    let n = self.next_random(bound);
                    self.push(n)?;
                }
            }
        }
    }

    /// Unwinds the current frame using the three saved cells below `bp`.
    fn ret(&mut self) -> Result<(), VmError> {
        let ip = self.mem[self.frame_addr(-3)?];
        let bp = self.mem[self.frame_addr(-2)?];
        let sp = self.mem[self.frame_addr(-1)?];

        self.sp = self.stack_addr(sp)?;
        // The outermost frame's bp is the stack base itself.
        self.bp = match usize::try_from(bp) {
            Ok(b) if b >= self.code_len && b <= self.mem.len() => b,
            _ => return Err(self.fault(bp)),
        };
        self.jump(ip)
    }
}

/// Runs `code` against stdin/stdout with the default configuration.
pub fn execute(code: &[i64], strings: StringTable) -> Result<i64, VmError> {
    Vm::stdio(code, strings, VmConfig::default()).run()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Asm(Vec<i64>);

    impl Asm {
        fn new() -> Self {
            Asm(Vec::new())
        }

        fn op(mut self, op: Op) -> Self {
            self.0.push(op.word());
            self
        }

        fn op1(mut self, op: Op, operand: i64) -> Self {
            self.0.push(op.word());
            self.0.push(operand);
            self
        }

        fn here(&self) -> i64 {
            self.0.len() as i64
        }
    }

    fn run_with(code: &[i64], strings: StringTable, input: &str) -> (Result<i64, VmError>, String) {
        let mut vm = Vm::new(
            code,
            strings,
            input.as_bytes(),
            Vec::new(),
            VmConfig {
                stack_cells: 256,
                max_steps: Some(10_000),
                seed: 1,
            },
        );
        let status = vm.run();
        (status, String::from_utf8(vm.into_output()).unwrap())
    }

    fn run(code: &[i64]) -> Result<i64, VmError> {
        run_with(code, StringTable::new(), "").0
    }

    #[test]
    fn test_arithmetic_and_exit_status() {
        let code = Asm::new()
            .op1(Op::Push, 7)
            .op1(Op::Push, 3)
            .op(Op::Sub)
            .op1(Op::Push, 5)
            .op(Op::Mul)
            .op(Op::Exit);
        assert_eq!(run(&code.0).unwrap(), 20);
    }

    #[test]
    fn test_empty_stack_exits_zero() {
        assert_eq!(run(&[Op::Exit.word()]).unwrap(), 0);
    }

    #[test]
    fn test_float_ops() {
        let code = Asm::new()
            .op1(Op::Push, 1)
            .op(Op::Itof)
            .op1(Op::Push, 2.5f64.to_bits() as i64)
            .op(Op::AddF)
            .op(Op::Ftoi)
            .op(Op::Exit);
        assert_eq!(run(&code.0).unwrap(), 3);
    }

    #[test]
    fn test_call_and_return_restore_frame() {
        // entry: PUSH f; PUSH 4; CALL 1; EXIT
        // f:     PEEK -4; PEEK -4; MUL; RET_V
        let entry_len = 7;
        let code = Asm::new()
            .op1(Op::Push, entry_len)
            .op1(Op::Push, 4)
            .op1(Op::Call, 1)
            .op(Op::Exit)
            .op1(Op::Peek, -4)
            .op1(Op::Peek, -4)
            .op(Op::Mul)
            .op(Op::RetV);
        assert_eq!(code.0.len(), 13);

        let mut vm = Vm::new(&code.0, StringTable::new(), "".as_bytes(), Vec::new(), VmConfig::default());
        assert_eq!(vm.run().unwrap(), 16);
        // only the return value is left
        assert_eq!(vm.depth(), 1);
        assert_eq!(vm.bp, vm.code_len);
    }

    #[test]
    fn test_plain_ret_drops_target_and_args() {
        let code = Asm::new()
            .op1(Op::Push, 9)
            .op1(Op::Push, 1)
            .op1(Op::Push, 2)
            .op1(Op::Call, 2)
            .op(Op::Exit)
            .op(Op::Ret);
        let mut vm = Vm::new(&code.0, StringTable::new(), "".as_bytes(), Vec::new(), VmConfig::default());
        assert_eq!(vm.run().unwrap(), 0);
        assert_eq!(vm.depth(), 0);
    }

    #[test]
    fn test_locals_and_indexed_access() {
        let code = Asm::new()
            .op1(Op::Alloc, 3)
            .op1(Op::Push, 11)
            .op1(Op::Push, 2)
            .op1(Op::PokeI, 0)
            .op1(Op::Push, 2)
            .op1(Op::PeekI, 0)
            .op(Op::Exit);
        assert_eq!(run(&code.0).unwrap(), 11);
    }

    #[test]
    fn test_jmpz_loop() {
        // count down from 3, summing into slot 1
        let mut asm = Asm::new()
            .op1(Op::Alloc, 2)
            .op1(Op::Push, 3)
            .op1(Op::Poke, 0)
            .op1(Op::Push, 0)
            .op1(Op::Poke, 1);
        let top = asm.here();
        asm = asm.op1(Op::Peek, 0).op1(Op::Jmpz, 0);
        let exit_site = asm.here() - 1;
        asm = asm
            .op1(Op::Peek, 1)
            .op1(Op::Peek, 0)
            .op(Op::Add)
            .op1(Op::Poke, 1)
            .op1(Op::Peek, 0)
            .op1(Op::Push, 1)
            .op(Op::Sub)
            .op1(Op::Poke, 0)
            .op1(Op::Jmp, top);
        let end = asm.here();
        asm.0[exit_site as usize] = end;
        asm = asm.op1(Op::Peek, 1).op(Op::Exit);

        assert_eq!(run(&asm.0).unwrap(), 6);
    }

    #[test]
    fn test_output_formats() {
        let mut strings = StringTable::new();
        let key = strings.intern("x=");
        let code = Asm::new()
            .op1(Op::Push, key)
            .op(Op::OutString)
            .op1(Op::Push, -4)
            .op(Op::OutInt)
            .op1(Op::Push, ' ' as i64)
            .op(Op::OutChar)
            .op1(Op::Push, 1.5f64.to_bits() as i64)
            .op(Op::OutFloat)
            .op1(Op::Push, ' ' as i64)
            .op(Op::OutChar)
            .op1(Op::Push, 2.0f64.to_bits() as i64)
            .op(Op::OutFloat)
            .op1(Op::Push, 'x' as i64)
            .op(Op::OutChar)
            .op1(Op::Push, 1)
            .op(Op::OutBool)
            .op(Op::Exit);
        let (status, out) = run_with(&code.0, strings, "");
        assert_eq!(status.unwrap(), 0);
        assert_eq!(out, "x=-4 1.5 2.0xtrue");
    }

    #[test]
    fn test_input_ops() {
        let code = Asm::new()
            .op(Op::InInt)
            .op(Op::InString)
            .op(Op::OutString)
            .op(Op::InChar)
            .op(Op::OutChar)
            .op(Op::Exit);
        let (status, out) = run_with(&code.0, StringTable::new(), "42\nhello\nz\n");
        assert_eq!(status.unwrap(), 42);
        assert_eq!(out, "helloz");
    }

    #[test]
    fn test_bad_input() {
        let code = Asm::new().op(Op::InInt).op(Op::Exit);
        let (status, _) = run_with(&code.0, StringTable::new(), "abc\n");
        assert!(matches!(status, Err(VmError::InvalidInput(_))));

        let (status, _) = run_with(&code.0, StringTable::new(), "");
        assert!(matches!(status, Err(VmError::InvalidInput(_))));
    }

    #[test]
    fn test_unknown_opcode() {
        let code = [Op::Push.word(), 1, 999];
        assert!(matches!(
            run(&code),
            Err(VmError::UnknownOpcode { ip: 2, word: 999 })
        ));
    }

    #[test]
    fn test_division_by_zero() {
        let code = Asm::new()
            .op1(Op::Push, 1)
            .op1(Op::Push, 0)
            .op(Op::Mod)
            .op(Op::Exit);
        assert!(matches!(run(&code.0), Err(VmError::DivisionByZero { ip: 4 })));
    }

    #[test]
    fn test_stack_underflow_and_overflow() {
        assert!(matches!(
            run(&[Op::Pop.word(), Op::Exit.word()]),
            Err(VmError::MemoryFault { .. })
        ));

        // PUSH 1; JMP 0 never stops pushing
        let code = Asm::new().op1(Op::Push, 1).op1(Op::Jmp, 0);
        assert!(matches!(run(&code.0), Err(VmError::MemoryFault { .. })));
    }

    #[test]
    fn test_frame_offset_outside_stack() {
        let code = Asm::new().op1(Op::Peek, -1).op(Op::Exit);
        assert!(matches!(run(&code.0), Err(VmError::MemoryFault { ip: 2, .. })));
    }

    #[test]
    fn test_huge_alloc_faults() {
        let code = Asm::new().op1(Op::Alloc, i64::MAX).op(Op::Exit);
        assert!(matches!(run(&code.0), Err(VmError::MemoryFault { .. })));

        let code = Asm::new().op1(Op::Alloc, -1).op(Op::Exit);
        assert!(matches!(run(&code.0), Err(VmError::MemoryFault { .. })));
    }

    #[test]
    fn test_extreme_frame_offsets_fault() {
        for offset in [i64::MAX, i64::MIN] {
            let code = Asm::new().op1(Op::Peek, offset).op(Op::Exit);
            assert!(matches!(run(&code.0), Err(VmError::MemoryFault { .. })));
        }

        let code = Asm::new()
            .op1(Op::Push, 1)
            .op1(Op::Push, i64::MAX)
            .op1(Op::PokeI, 1)
            .op(Op::Exit);
        assert!(matches!(run(&code.0), Err(VmError::MemoryFault { .. })));
    }

    #[test]
    fn test_bad_argument_counts_fault() {
        for argc in [i64::MIN, i64::MAX, -1, 5] {
            let code = Asm::new().op1(Op::Push, 0).op1(Op::Call, argc).op(Op::Exit);
            assert!(
                matches!(run(&code.0), Err(VmError::MemoryFault { .. })),
                "argc {}",
                argc
            );
        }
    }

    #[test]
    fn test_step_limit() {
        let code = Asm::new().op1(Op::Jmp, 0);
        assert!(matches!(run(&code.0), Err(VmError::StepLimit(10_000))));
    }

    #[test]
    fn test_random_is_bounded_and_seeded() {
        let code = Asm::new().op1(Op::Push, 6).op(Op::Rand).op(Op::Exit);
        let first = run(&code.0).unwrap();
        assert!((0..6).contains(&first));
        assert_eq!(run(&code.0).unwrap(), first);
    }

    #[test]
    fn test_running_off_the_end() {
        let code = Asm::new().op1(Op::Push, 1);
        assert!(matches!(run(&code.0), Err(VmError::MemoryFault { .. })));
    }
}
