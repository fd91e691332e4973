//! Base-ISA arithmetic and immediate-assembly scenarios.
use rv64_emu::bus::DRAM_BASE;
use rv64_emu::emu::Emu;

fn run_one(emu: &mut Emu) {
    emu.cpu.execute().expect("instruction should not trap");
}

fn le_bytes(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}

#[test]
fn addi_propagation() {
    let mut emu = Emu::new();
    // addi x2, x1, -3
    emu.initialize_dram(le_bytes(&[0xFFD0_8113]));
    emu.initialize_pc(DRAM_BASE);
    emu.cpu.int_regs.write(1, 5);

    run_one(&mut emu);

    assert_eq!(2, emu.cpu.int_regs.read(2));
    assert_eq!(DRAM_BASE + 4, emu.cpu.pc);
}

#[test]
fn lui_addi_immediate_assembly() {
    let mut emu = Emu::new();
    // lui x5, 0x12345 ; addi x5, x5, 0x678
    emu.initialize_dram(le_bytes(&[0x1234_52b7, 0x6782_8293]));
    emu.initialize_pc(DRAM_BASE);

    run_one(&mut emu);
    run_one(&mut emu);

    assert_eq!(0x1234_5678, emu.cpu.int_regs.read(5));
}

#[test]
fn x0_is_always_zero() {
    let mut emu = Emu::new();
    // addi x0, x0, 5 — x0 is hardwired, must read back 0 regardless of what's written.
    emu.initialize_dram(le_bytes(&[0x0050_0013]));
    emu.initialize_pc(DRAM_BASE);

    run_one(&mut emu);

    assert_eq!(0, emu.cpu.int_regs.read(0));
}

#[test]
fn div_rem_divu_by_zero() {
    let mut emu = Emu::new();
    let data = le_bytes(&[
        0x0070_0093, // addi x1, x0, 7
        0x0000_0113, // addi x2, x0, 0
        0x0220_C1B3, // div  x3, x1, x2
        0x0220_E233, // rem  x4, x1, x2
        0x0220_D2B3, // divu x5, x1, x2
    ]);
    emu.initialize_dram(data);
    emu.initialize_pc(DRAM_BASE);

    for _ in 0..5 {
        run_one(&mut emu);
    }

    assert_eq!(u64::MAX, emu.cpu.int_regs.read(3)); // DIV(a, 0) == -1
    assert_eq!(7, emu.cpu.int_regs.read(4)); // REM(a, 0) == a
    assert_eq!(u64::MAX, emu.cpu.int_regs.read(5)); // DIVU(a, 0) == 2^64-1
}

#[test]
fn div_rem_signed_overflow() {
    let mut emu = Emu::new();
    let data = le_bytes(&[
        0xFFF0_0313, // addi x6, x0, -1
        0x03F3_1313, // slli x6, x6, 63   (x6 = INT64_MIN)
        0xFFF0_0113, // addi x2, x0, -1
        0x0223_43B3, // div  x7, x6, x2
        0x0223_6433, // rem  x8, x6, x2
    ]);
    emu.initialize_dram(data);
    emu.initialize_pc(DRAM_BASE);

    for _ in 0..5 {
        run_one(&mut emu);
    }

    assert_eq!(1u64 << 63, emu.cpu.int_regs.read(7)); // DIV(INT64_MIN, -1) == INT64_MIN
    assert_eq!(0, emu.cpu.int_regs.read(8)); // REM(INT64_MIN, -1) == 0
}

#[test]
fn amoadd_w() {
    let mut emu = Emu::new();
    // amoadd.w x3, x2, (x1)
    let data = le_bytes(&[0x0020_A1AF]);
    emu.initialize_dram(data);
    emu.initialize_pc(DRAM_BASE);

    emu.cpu.int_regs.write(1, DRAM_BASE + 0x1000);
    emu.cpu.int_regs.write(2, 2);
    emu.cpu
        .bus
        .write(DRAM_BASE + 0x1000, 1, rv64_emu::cpu::WORD)
        .unwrap();

    run_one(&mut emu);

    assert_eq!(1, emu.cpu.int_regs.read(3));
    assert_eq!(
        3,
        emu.cpu.bus.read(DRAM_BASE + 0x1000, rv64_emu::cpu::WORD).unwrap()
    );
}
