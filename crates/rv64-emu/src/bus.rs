//! System bus: decodes physical addresses to DRAM or one of the memory-mapped devices.
use crate::cpu::{BYTE, DOUBLEWORD, HALFWORD, WORD};
use crate::devices::clint::{Clint, CLINT_BASE, CLINT_SIZE};
use crate::devices::plic::{Plic, PLIC_BASE, PLIC_SIZE};
use crate::devices::uart_cli::{Uart, UART_BASE, UART_SIZE};
use crate::devices::virtio_blk::{Virtio, VIRTIO_BASE, VIRTIO_SIZE};
use crate::exception::Exception;
use crate::mem::Dram;
use crate::primitives::constants::RAM_SIZE;

/// Physical base address of DRAM. Everything at or above this address and not claimed by a
/// device window falls through to DRAM.
pub const DRAM_BASE: u64 = 0x8000_0000;

#[derive(Debug)]
pub struct Bus {
    pub dram: Dram,
    pub uart: Uart,
    pub clint: Clint,
    pub plic: Plic,
    pub virtio: Virtio,
}

impl Bus {
    pub fn new() -> Self {
        Self {
            dram: Dram::new(RAM_SIZE as usize),
            uart: Uart::new(),
            clint: Clint::new(),
            plic: Plic::new(),
            virtio: Virtio::new(),
        }
    }

    fn read8(&mut self, addr: u64) -> Result<u8, Exception> {
        if (UART_BASE..UART_BASE + UART_SIZE).contains(&addr) {
            Ok(self.uart.read(addr - UART_BASE))
        } else if (CLINT_BASE..CLINT_BASE + CLINT_SIZE).contains(&addr) {
            Ok(self.clint.read(addr - CLINT_BASE))
        } else if (PLIC_BASE..PLIC_BASE + PLIC_SIZE).contains(&addr) {
            Ok(self.plic.read(addr - PLIC_BASE))
        } else if (VIRTIO_BASE..VIRTIO_BASE + VIRTIO_SIZE).contains(&addr) {
            Ok(self.virtio.read(addr - VIRTIO_BASE))
        } else if addr >= DRAM_BASE {
            self.dram.read(addr - DRAM_BASE, BYTE).map(|v| v as u8)
        } else {
            tracing::warn!(addr, "load from address outside every device window");
            Err(Exception::LoadAccessFault)
        }
    }

    fn write8(&mut self, addr: u64, val: u8) -> Result<(), Exception> {
        if (UART_BASE..UART_BASE + UART_SIZE).contains(&addr) {
            self.uart.write(addr - UART_BASE, val);
            Ok(())
        } else if (CLINT_BASE..CLINT_BASE + CLINT_SIZE).contains(&addr) {
            self.clint.write(addr - CLINT_BASE, val);
            Ok(())
        } else if (PLIC_BASE..PLIC_BASE + PLIC_SIZE).contains(&addr) {
            self.plic.write(addr - PLIC_BASE, val);
            Ok(())
        } else if (VIRTIO_BASE..VIRTIO_BASE + VIRTIO_SIZE).contains(&addr) {
            self.virtio.write(addr - VIRTIO_BASE, val);
            Ok(())
        } else if addr >= DRAM_BASE {
            self.dram.write(addr - DRAM_BASE, val as u64, BYTE)
        } else {
            tracing::warn!(addr, "store to address outside every device window");
            Err(Exception::StoreAMOAccessFault)
        }
    }

    /// Read `size` (8/16/32/64) bits at `addr`. MMIO windows are always decomposed into
    /// byte-granular reads; DRAM uses its own native multi-byte access.
    pub fn read(&mut self, addr: u64, size: u8) -> Result<u64, Exception> {
        if addr >= DRAM_BASE
            && !(UART_BASE..UART_BASE + UART_SIZE).contains(&addr)
            && !(CLINT_BASE..CLINT_BASE + CLINT_SIZE).contains(&addr)
            && !(PLIC_BASE..PLIC_BASE + PLIC_SIZE).contains(&addr)
            && !(VIRTIO_BASE..VIRTIO_BASE + VIRTIO_SIZE).contains(&addr)
        {
            return self.dram.read(addr - DRAM_BASE, size);
        }

        match size {
            BYTE => self.read8(addr).map(|v| v as u64),
            HALFWORD => {
                let mut val = 0u64;
                for i in 0..2 {
                    val |= (self.read8(addr + i)? as u64) << (8 * i);
                }
                Ok(val)
            }
            WORD => {
                let mut val = 0u64;
                for i in 0..4 {
                    val |= (self.read8(addr + i)? as u64) << (8 * i);
                }
                Ok(val)
            }
            DOUBLEWORD => {
                let mut val = 0u64;
                for i in 0..8 {
                    val |= (self.read8(addr + i)? as u64) << (8 * i);
                }
                Ok(val)
            }
            _ => Err(Exception::LoadAccessFault),
        }
    }

    /// Write `size` (8/16/32/64) bits of `value` at `addr`, same decomposition rule as `read`.
    pub fn write(&mut self, addr: u64, value: u64, size: u8) -> Result<(), Exception> {
        if addr >= DRAM_BASE
            && !(UART_BASE..UART_BASE + UART_SIZE).contains(&addr)
            && !(CLINT_BASE..CLINT_BASE + CLINT_SIZE).contains(&addr)
            && !(PLIC_BASE..PLIC_BASE + PLIC_SIZE).contains(&addr)
            && !(VIRTIO_BASE..VIRTIO_BASE + VIRTIO_SIZE).contains(&addr)
        {
            return self.dram.write(addr - DRAM_BASE, value, size);
        }

        match size {
            BYTE => self.write8(addr, value as u8),
            HALFWORD => {
                for i in 0..2 {
                    self.write8(addr + i, (value >> (8 * i)) as u8)?;
                }
                Ok(())
            }
            WORD => {
                for i in 0..4 {
                    self.write8(addr + i, (value >> (8 * i)) as u8)?;
                }
                Ok(())
            }
            DOUBLEWORD => {
                for i in 0..8 {
                    self.write8(addr + i, (value >> (8 * i)) as u8)?;
                }
                Ok(())
            }
            _ => Err(Exception::StoreAMOAccessFault),
        }
    }
}
