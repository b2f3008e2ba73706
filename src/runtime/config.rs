/// Limits and knobs for one VM run.
#[derive(Debug, Clone)]
pub struct VmConfig {
    /// Cells available to the operand/call stack, on top of the code.
    pub stack_cells: usize,
    /// Abort after this many dispatched instructions.
    pub max_steps: Option<u64>,
    /// Seed of the `RAND` generator.
    pub seed: u64,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            stack_cells: 65_536,
            max_steps: None,
            seed: 0x5EED,
        }
    }
}
