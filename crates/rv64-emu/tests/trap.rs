//! Privilege-mode transition and trap-delegation scenarios.
use rv64_emu::bus::DRAM_BASE;
use rv64_emu::cpu::{Mode, CPU};
use rv64_emu::reg::csr::{
    MEDELEG, MSTATUS_MIE, MSTATUS_MPIE, MSTATUS_MPP, SATP, SCAUSE, SEPC,
};
use rv64_emu::trap;

#[test]
fn page_fault_on_fetch_with_empty_page_table() {
    let mut cpu = CPU::new();
    cpu.mode = Mode::User;
    cpu.pc = 0x1000;

    // Sv39, root page table at DRAM_BASE. The table is freshly zeroed DRAM, so every PTE has
    // V=0 and the first-level walk faults immediately.
    let satp = (8u64 << 60) | (DRAM_BASE / 4096);
    cpu.state.write(SATP, satp);
    cpu.update_paging();

    // Delegate instruction page faults (cause 12) to S-mode.
    cpu.state.write(MEDELEG, 1 << 12);

    let faulting_pc = cpu.pc;
    let exception = cpu.execute().expect_err("an empty page table must fault");
    trap::take_exception(&mut cpu, exception, faulting_pc);

    assert_eq!(12, exception.code());
    assert_eq!(Mode::Supervisor, cpu.mode);
    assert_eq!(faulting_pc, cpu.state.read(SEPC));
    assert_eq!(12, cpu.state.read(SCAUSE));
}

#[test]
fn mret_restores_previous_mode_and_stacked_interrupt_enable() {
    let mut cpu = CPU::new();
    cpu.mode = Mode::Machine;
    cpu.state.write(rv64_emu::reg::csr::MEPC, DRAM_BASE + 0x100);
    cpu.state.write_mstatus(MSTATUS_MPP, Mode::Supervisor as u64);
    cpu.state.write_mstatus(MSTATUS_MPIE, 1);
    cpu.state.write_mstatus(MSTATUS_MIE, 0);

    cpu.bus.dram.load(vec![0x73, 0x00, 0x20, 0x30]); // mret
    cpu.pc = DRAM_BASE;

    cpu.execute().expect("mret does not trap");

    assert_eq!(Mode::Supervisor, cpu.mode);
    assert_eq!(1, cpu.state.read_mstatus(MSTATUS_MIE));
    assert_eq!(1, cpu.state.read_mstatus(MSTATUS_MPIE));
    assert_eq!(0, cpu.state.read_mstatus(MSTATUS_MPP));
    assert_eq!(DRAM_BASE + 0x100, cpu.pc);
}
