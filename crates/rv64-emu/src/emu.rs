//! Top-level driver: owns the `CPU` and runs the fetch/decode/execute/trap tick loop.
use anyhow::{Context, Result};

use crate::cpu::CPU;
use crate::trap;

/// Exit code read out of `a0` when the hart halts. `x10` is the ABI register for `a0`.
const A0_REGISTER: u64 = 10;

#[derive(Debug)]
pub struct Emu {
    pub cpu: CPU,
    /// Optional cycle ceiling (`--debug[=N]`); the loop exits cleanly at this count rather
    /// than running forever, so regression tests can drive the interpreter without a terminal.
    cycle_ceiling: Option<u64>,
}

impl Default for Emu {
    fn default() -> Self {
        Self::new()
    }
}

impl Emu {
    pub fn new() -> Self {
        Emu {
            cpu: CPU::new(),
            cycle_ceiling: None,
        }
    }

    pub fn restart(&mut self) {
        self.cpu = CPU::new();
    }

    /// Load a flat image at the start of DRAM. Used directly by tests; the CLI goes through
    /// the ELF loader instead.
    pub fn initialize_dram(&mut self, data: Vec<u8>) {
        self.cpu.bus.dram.load(data);
    }

    pub fn initialize_pc(&mut self, pc: u64) {
        self.cpu.pc = pc;
    }

    /// Attach a disk image to the virtio block device.
    pub fn initialize_disk(&mut self, image: Vec<u8>) {
        self.cpu.bus.virtio.load_disk(image);
    }

    /// Limit the tick loop to `n` cycles, returning cleanly with the guest's last-known `a0`
    /// instead of treating the ceiling as an error.
    pub fn set_cycle_ceiling(&mut self, n: u64) {
        self.cycle_ceiling = Some(n);
    }

    pub fn dram_size(&self) -> usize {
        self.cpu.bus.dram.size()
    }

    /// Copy bytes into DRAM at a byte offset. Used by the ELF loader, which must report a
    /// malformed image as a host-fatal error rather than a guest trap.
    pub fn write_dram(&mut self, offset: usize, bytes: &[u8]) -> Result<()> {
        self.cpu
            .bus
            .dram
            .write_bytes(offset, bytes)
            .map_err(|e| anyhow::anyhow!("{e}"))
            .context("DRAM bounds check failed")
    }

    /// Run the tick loop to completion and return the exit code (the low 32 bits of `a0`).
    ///
    /// One cycle is fetch/decode/execute, then (on an `Err`) trap delivery, then device ticks,
    /// then an interrupt check. The loop halts when the PC reaches the termination sentinel
    /// (address 0 — an unhandled trap with no installed vector, or an explicit guest halt) or
    /// when the configured cycle ceiling is reached.
    pub fn start(&mut self) -> u32 {
        let mut cycles: u64 = 0;

        loop {
            if self.cpu.pc == 0 {
                break;
            }
            if let Some(ceiling) = self.cycle_ceiling {
                if cycles >= ceiling {
                    break;
                }
            }

            let instr_addr = self.cpu.pc;
            let _tick_span =
                tracing::span!(tracing::Level::TRACE, "tick", cycle = cycles, pc = instr_addr)
                    .entered();
            match self.cpu.execute() {
                Ok(_) => {}
                Err(exception) => {
                    tracing::debug!(?exception, pc = instr_addr, "delivering exception");
                    trap::take_exception(&mut self.cpu, exception, instr_addr);
                }
            }

            self.cpu.devices_increment();

            if let Some(interrupt) = self.cpu.check_pending_interrupt() {
                self.cpu.idle = false;
                tracing::debug!(?interrupt, pc = self.cpu.pc, "delivering interrupt");
                let pc = self.cpu.pc;
                trap::take_interrupt(&mut self.cpu, interrupt, pc);
            }

            cycles += 1;
        }

        self.cpu.int_regs.read(A0_REGISTER) as u32
    }
}
