//! This module handles the integer registers.
use crate::primitives::constants::{NUM_REGISTERS, POINTER_TO_DTB, RAM_BASE, RAM_SIZE};

/// RV64 integer register file.
#[derive(Debug)]
pub struct IntRegister {
    regs: [u64; NUM_REGISTERS],
}

impl IntRegister {
    /// Function creates new integer register file.
    pub fn new() -> Self {
        let mut regs = [0; NUM_REGISTERS];
        // The stack pointer is set to the top of the default DRAM image.
        regs[2] = RAM_BASE + RAM_SIZE;
        // From riscv-pk:
        // https://github.com/riscv/riscv-pk/blob/master/machine/mentry.S#L233-L235
        //   save a0 and a1; arguments from previous boot loader stage:
        //   // li x10, 0
        //   // li x11, 0
        //
        // void init_first_hart(uintptr_t hartid, uintptr_t dtb)
        //   x10 (a0): hartid
        //   x11 (a1): pointer to dtb
        regs[10] = 0;
        regs[11] = POINTER_TO_DTB;

        Self { regs }
    }

    /// Read the value from a register.
    pub fn read(&self, index: u64) -> u64 {
        self.regs[index as usize]
    }

    /// Write the value to a register. Register x0 is hardwired with all bits equal to 0.
    pub fn write(&mut self, index: u64, value: u64) {
        if index != 0 {
            self.regs[index as usize] = value;
        }
    }
}

impl core::fmt::Display for IntRegister {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let abi = [
            "zero", "  ra", "  sp", "  gp", "  tp", "  t0", "  t1", "  t2", "  s0", "  s1", "  a0",
            "  a1", "  a2", "  a3", "  a4", "  a5", "  a6", "  a7", "  s2", "  s3", "  s4", "  s5",
            "  s6", "  s7", "  s8", "  s9", " s10", " s11", "  t3", "  t4", "  t5", "  t6",
        ];
        for i in (0..NUM_REGISTERS).step_by(4) {
            writeln!(
                f,
                "x{:02}({})={:>#18x} x{:02}({})={:>#18x} x{:02}({})={:>#18x} x{:02}({})={:>#18x}",
                i,
                abi[i],
                self.read(i as u64),
                i + 1,
                abi[i + 1],
                self.read(i as u64 + 1),
                i + 2,
                abi[i + 2],
                self.read(i as u64 + 2),
                i + 3,
                abi[i + 3],
                self.read(i as u64 + 3),
            )?;
        }
        Ok(())
    }
}
