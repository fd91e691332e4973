//! ELF64 kernel image loader. A thin adapter around `goblin`: parses just enough of the
//! executable to place its loadable sections into DRAM and hand back a start PC.
use anyhow::{bail, Context, Result};
use goblin::elf::section_header::SHT_PROGBITS;
use goblin::elf::Elf;

use crate::bus::DRAM_BASE;
use crate::emu::Emu;

/// Load an `ET_EXEC` ELF64 image's `PROGBITS` sections into the emulator's DRAM and return the
/// entry point. A malformed image is a host-fatal error, never a guest trap.
pub fn load(emu: &mut Emu, elf_data: &[u8]) -> Result<u64> {
    let elf = Elf::parse(elf_data).context("parsing ELF header")?;

    if !elf.is_64 {
        bail!("kernel image is not a 64-bit ELF");
    }
    if elf.header.e_type != goblin::elf::header::ET_EXEC {
        bail!("kernel image is not ET_EXEC (got e_type={})", elf.header.e_type);
    }
    if elf.header.e_machine != goblin::elf::header::EM_RISCV {
        bail!(
            "kernel image is not built for RISC-V (got e_machine={})",
            elf.header.e_machine
        );
    }

    let dram_size = emu.dram_size() as u64;

    for sh in &elf.section_headers {
        if sh.sh_type != SHT_PROGBITS || sh.sh_addr == 0 {
            continue;
        }

        if sh.sh_addr < DRAM_BASE {
            bail!(
                "section at {:#x} falls below DRAM base {:#x}",
                sh.sh_addr,
                DRAM_BASE
            );
        }
        let offset = sh.sh_addr - DRAM_BASE;
        if offset + sh.sh_size > dram_size {
            bail!(
                "section at {:#x} (size {:#x}) runs off the end of DRAM ({:#x} bytes)",
                sh.sh_addr,
                sh.sh_size,
                dram_size
            );
        }

        let file_start = sh.sh_offset as usize;
        let file_end = file_start + sh.sh_size as usize;
        let bytes = elf_data
            .get(file_start..file_end)
            .with_context(|| format!("section at {:#x} extends past end of file", sh.sh_addr))?;

        emu.write_dram(offset as usize, bytes)
            .with_context(|| format!("copying section at {:#x} into DRAM", sh.sh_addr))?;
    }

    Ok(elf.header.e_entry)
}
