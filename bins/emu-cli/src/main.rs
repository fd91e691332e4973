//! emu-cli: boots a kernel image under the RV64 emulator.
mod cli;
mod console;

use std::fs;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use console::{NullConsole, RawTerminalConsole};
use rv64_emu::elf;
use rv64_emu::emu::Emu;

fn init_logger(verbosity: u8) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if verbosity > 0 {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    fmt::fmt().with_env_filter(filter).with_target(false).init();
}

fn run(cli: Cli) -> Result<u32> {
    let elf_bytes = fs::read(&cli.elf)
        .with_context(|| format!("reading kernel image {}", cli.elf.display()))?;

    let mut emu = Emu::new();
    let entry = elf::load(&mut emu, &elf_bytes).context("loading kernel image")?;
    emu.initialize_pc(entry);

    if let Some(disk_path) = &cli.disk {
        let image = fs::read(disk_path)
            .with_context(|| format!("reading disk image {}", disk_path.display()))?;
        emu.initialize_disk(image);
    }

    let exit_code = if let Some(ceiling) = cli.debug {
        emu.set_cycle_ceiling(ceiling);
        emu.cpu.bus.uart.set_backend(Box::new(NullConsole::new()));
        emu.start()
    } else {
        let console = RawTerminalConsole::spawn().context("setting up the host terminal")?;
        emu.cpu.bus.uart.set_backend(Box::new(console));
        emu.start()
    };

    tracing::info!(?emu.cpu.int_regs, "hart halted");
    Ok(exit_code)
}

fn main() {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    match run(cli) {
        Ok(exit_code) => std::process::exit(exit_code as i32),
        Err(err) => {
            eprintln!("error: {err:?}");
            std::process::exit(1);
        }
    }
}
