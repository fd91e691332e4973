use rv64_emu::bus::DRAM_BASE;
use rv64_emu::emu::Emu;
use rv64_emu::reg::csr::MEPC;

/// An instruction the decoder can't map (here, a reserved compressed encoding) traps as
/// `IllegalInstruction` with `mepc` pointing at the faulting instruction, not past it. With no
/// trap handler installed (`mtvec == 0`), the redirected PC of 0 is the loop's halt sentinel, so
/// the run stops after exactly one trap.
#[test]
fn illegal_isa() {
    let mut emu = Emu::new();

    let data = vec![
        0x93, 0x0f, 0x50, 0x00, // addi x31, x0, 5
        0xaa, 0xaa, 0xaa, 0xaa, // reserved compressed encoding
        0x93, 0x0f, 0x50, 0x00, // addi x31, x0, 5 (never reached)
    ];

    emu.initialize_dram(data);
    emu.initialize_pc(DRAM_BASE);

    emu.start();

    assert_eq!(4 + DRAM_BASE, emu.cpu.state.read(MEPC));
    assert_eq!(0, emu.cpu.pc);
}
