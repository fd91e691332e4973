//! Memory-mapped peripherals.
pub mod clint;
pub mod console;
pub mod plic;
pub mod uart_cli;
pub mod virtio_blk;
