// =============================================================================
// OP - Bytecode instructions
// =============================================================================

/// A Cinder opcode.
///
/// Instructions are stored in the flat `Vec<i64>` stream: the opcode word is
/// followed by exactly [`Op::arity`] operand words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i64)]
pub enum Op {
    // integer arithmetic
    Add = 1,
    Sub,
    Mul,
    Div,
    Mod,

    // float arithmetic
    AddF,
    SubF,
    MulF,
    DivF,

    // integer comparison
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
    Ne,

    // float comparison
    EqF,
    LtF,
    LeF,
    GtF,
    GeF,
    NeF,

    // logic
    And,
    Or,
    Not,

    // stack
    Pop,
    Dup,
    /// `PUSH imm`
    Push,

    // ==========================================================================
    // Frame memory, addressed relative to bp
    // ==========================================================================
    /// `PEEK i`: push `mem[bp + i]`.
    Peek,
    /// `POKE i`: pop into `mem[bp + i]`.
    Poke,
    /// `PEEK_I b`: pop an index, push `mem[bp + b + index]`.
    PeekI,
    /// `POKE_I b`: pop an index, then a value, store at `bp + b + index`.
    PokeI,
    /// `ALLOC n`: reserve `n` uninitialized cells.
    Alloc,

    // conversion
    Itof,
    Ftoi,

    // ==========================================================================
    // Control flow
    // ==========================================================================
    /// `CALL argc`: the target address sits below the arguments.
    Call,
    Ret,
    /// Return with the top of the stack as the result.
    RetV,
    Exit,
    /// `JMP t`: absolute jump.
    Jmp,
    /// `JMPZ t`: pop, jump when zero.
    Jmpz,

    // I/O
    OutInt,
    OutFloat,
    OutString,
    OutChar,
    OutBool,
    InInt,
    InFloat,
    InChar,
    InString,

    /// Pop a bound `n`, push a pseudo-random integer in `[0, n)`.
    Rand,
}

impl Op {
    pub const ALL: [Op; 50] = [
        Op::Add,
        Op::Sub,
        Op::Mul,
        Op::Div,
        Op::Mod,
        Op::AddF,
        Op::SubF,
        Op::MulF,
        Op::DivF,
        Op::Eq,
        Op::Lt,
        Op::Le,
        Op::Gt,
        Op::Ge,
        Op::Ne,
        Op::EqF,
        Op::LtF,
        Op::LeF,
        Op::GtF,
        Op::GeF,
        Op::NeF,
        Op::And,
        Op::Or,
        Op::Not,
        Op::Pop,
        Op::Dup,
        Op::Push,
        Op::Peek,
        Op::Poke,
        Op::PeekI,
        Op::PokeI,
        Op::Alloc,
        Op::Itof,
        Op::Ftoi,
        Op::Call,
        Op::Ret,
        Op::RetV,
        Op::Exit,
        Op::Jmp,
        Op::Jmpz,
        Op::OutInt,
        Op::OutFloat,
        Op::OutString,
        Op::OutChar,
        Op::OutBool,
        Op::InInt,
        Op::InFloat,
        Op::InChar,
        Op::InString,
        Op::Rand,
    ];

    /// Number of operand words following the opcode.
    pub fn arity(self) -> usize {
        match self {
            Op::Push
            | Op::Peek
            | Op::Poke
            | Op::PeekI
            | Op::PokeI
            | Op::Alloc
            | Op::Call
            | Op::Jmp
            | Op::Jmpz => 1,
            _ => 0,
        }
    }

    /// Whether the single operand is a code address.
    pub fn is_jump(self) -> bool {
        matches!(self, Op::Jmp | Op::Jmpz)
    }

    pub fn word(self) -> i64 {
        self as i64
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Op::Add => "ADD",
            Op::Sub => "SUB",
            Op::Mul => "MUL",
            Op::Div => "DIV",
            Op::Mod => "MOD",
            Op::AddF => "ADD_F",
            Op::SubF => "SUB_F",
            Op::MulF => "MUL_F",
            Op::DivF => "DIV_F",
            Op::Eq => "EQ",
            Op::Lt => "LT",
            Op::Le => "LE",
            Op::Gt => "GT",
            Op::Ge => "GE",
            Op::Ne => "NE",
            Op::EqF => "EQ_F",
            Op::LtF => "LT_F",
            Op::LeF => "LE_F",
            Op::GtF => "GT_F",
            Op::GeF => "GE_F",
            Op::NeF => "NE_F",
            Op::And => "AND",
            Op::Or => "OR",
            Op::Not => "NOT",
            Op::Pop => "POP",
            Op::Dup => "DUP",
            Op::Push => "PUSH",
            Op::Peek => "PEEK",
            Op::Poke => "POKE",
            Op::PeekI => "PEEK_I",
            Op::PokeI => "POKE_I",
            Op::Alloc => "ALLOC",
            Op::Itof => "ITOF",
            Op::Ftoi => "FTOI",
            Op::Call => "CALL",
            Op::Ret => "RET",
            Op::RetV => "RET_V",
            Op::Exit => "EXIT",
            Op::Jmp => "JMP",
            Op::Jmpz => "JMPZ",
            Op::OutInt => "OUT_INT",
            Op::OutFloat => "OUT_FLOAT",
            Op::OutString => "OUT_STRING",
            Op::OutChar => "OUT_CHAR",
            Op::OutBool => "OUT_BOOL",
            Op::InInt => "IN_INT",
            Op::InFloat => "IN_FLOAT",
            Op::InChar => "IN_CHAR",
            Op::InString => "IN_STRING",
            Op::Rand => "RAND",
        }
    }
}

impl TryFrom<i64> for Op {
    type Error = i64;

    /// Decodes an opcode word, handing back the word when it is unknown.
    fn try_from(word: i64) -> Result<Self, Self::Error> {
        if word < Op::Add.word() || word > Op::Rand.word() {
            return Err(word);
        }
        Ok(Op::ALL[(word - Op::Add.word()) as usize])
    }
}

impl std::fmt::Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}
