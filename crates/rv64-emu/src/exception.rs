//! Synchronous exceptions raised while executing a single instruction.
use thiserror::Error;

/// An exception is an unusual condition occurring at run time associated with an instruction
/// in the current hart. Each variant carries the architectural `cause` code and, where defined,
/// a `tval` (trap value) payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Exception {
    #[error("instruction address misaligned: {0:#x}")]
    InstructionAddressMisaligned(u64),
    #[error("instruction access fault")]
    InstructionAccessFault,
    #[error("illegal instruction: {0:#010x}")]
    IllegalInstruction(u64),
    #[error("breakpoint")]
    Breakpoint,
    #[error("load address misaligned")]
    LoadAddressMisaligned,
    #[error("load access fault")]
    LoadAccessFault,
    #[error("store/amo address misaligned")]
    StoreAMOAddressMisaligned,
    #[error("store/amo access fault")]
    StoreAMOAccessFault,
    #[error("environment call from u-mode")]
    EnvironmentCallFromUMode,
    #[error("environment call from s-mode")]
    EnvironmentCallFromSMode,
    #[error("environment call from m-mode")]
    EnvironmentCallFromMMode,
    #[error("instruction page fault: {0:#x}")]
    InstructionPageFault(u64),
    #[error("load page fault: {0:#x}")]
    LoadPageFault(u64),
    #[error("store/amo page fault: {0:#x}")]
    StoreAMOPageFault(u64),
}

impl Exception {
    /// The architectural exception code (mcause/scause low bits, bit 63 clear).
    pub fn code(&self) -> u64 {
        match self {
            Exception::InstructionAddressMisaligned(_) => 0,
            Exception::InstructionAccessFault => 1,
            Exception::IllegalInstruction(_) => 2,
            Exception::Breakpoint => 3,
            Exception::LoadAddressMisaligned => 4,
            Exception::LoadAccessFault => 5,
            Exception::StoreAMOAddressMisaligned => 6,
            Exception::StoreAMOAccessFault => 7,
            Exception::EnvironmentCallFromUMode => 8,
            Exception::EnvironmentCallFromSMode => 9,
            Exception::EnvironmentCallFromMMode => 11,
            Exception::InstructionPageFault(_) => 12,
            Exception::LoadPageFault(_) => 13,
            Exception::StoreAMOPageFault(_) => 15,
        }
    }

    /// The value written to `mtval`/`stval` on trap entry.
    pub fn trap_value(&self, inst_addr: u64) -> u64 {
        match self {
            Exception::InstructionAddressMisaligned(addr)
            | Exception::InstructionPageFault(addr)
            | Exception::LoadPageFault(addr)
            | Exception::StoreAMOPageFault(addr) => *addr,
            Exception::IllegalInstruction(inst) => *inst,
            _ => inst_addr,
        }
    }

}
