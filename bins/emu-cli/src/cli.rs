//! Command-line argument table: `emu [--debug[=N]] <elf> [--disk <image>]`.
use std::path::PathBuf;

use clap::Parser;

/// Default cycle ceiling when `--debug` is given with no explicit value.
const DEFAULT_DEBUG_CEILING: &str = "100000000";

#[derive(Parser)]
#[command(name = "emu", version, about = "RV64GC full-system emulator")]
pub struct Cli {
    /// Path to an ET_EXEC RISC-V ELF64 kernel image.
    pub elf: PathBuf,

    /// Attach a disk image to the virtio block device.
    #[arg(long)]
    pub disk: Option<PathBuf>,

    /// Run with a bounded cycle ceiling instead of an interactive terminal, exiting cleanly
    /// with the guest's last-known a0 when the ceiling is reached. Useful for regression tests.
    #[arg(long, num_args = 0..=1, default_missing_value = DEFAULT_DEBUG_CEILING)]
    pub debug: Option<u64>,

    /// Increase log verbosity (stackable).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
