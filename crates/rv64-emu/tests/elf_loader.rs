//! ELF64 kernel-image loading: hand-builds a minimal `ET_EXEC`/`EM_RISCV` image with one
//! `PROGBITS` section and checks it lands byte-identical in DRAM at the right offset.
use rv64_emu::bus::DRAM_BASE;
use rv64_emu::elf;
use rv64_emu::emu::Emu;

const EM_RISCV: u16 = 243;
const ET_EXEC: u16 = 2;
const SHT_PROGBITS: u32 = 1;

fn push_u16(buf: &mut Vec<u8>, v: u16) {
    buf.extend_from_slice(&v.to_le_bytes());
}
fn push_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}
fn push_u64(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_le_bytes());
}

/// Builds a one-section `ET_EXEC` ELF64 image: `.text`-like PROGBITS at `load_addr`, containing
/// `payload`, with `e_entry == load_addr`.
fn build_elf(load_addr: u64, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::new();

    // e_ident
    buf.extend_from_slice(&[0x7f, b'E', b'L', b'F']);
    buf.push(2); // ELFCLASS64
    buf.push(1); // ELFDATA2LSB
    buf.push(1); // EI_VERSION
    buf.push(0); // EI_OSABI
    buf.extend_from_slice(&[0; 8]); // padding

    push_u16(&mut buf, ET_EXEC);
    push_u16(&mut buf, EM_RISCV);
    push_u32(&mut buf, 1); // e_version
    push_u64(&mut buf, load_addr); // e_entry
    push_u64(&mut buf, 0); // e_phoff
    let shoff_pos = buf.len();
    push_u64(&mut buf, 0); // e_shoff, patched below
    push_u32(&mut buf, 0); // e_flags
    push_u16(&mut buf, 64); // e_ehsize
    push_u16(&mut buf, 0); // e_phentsize
    push_u16(&mut buf, 0); // e_phnum
    push_u16(&mut buf, 64); // e_shentsize
    push_u16(&mut buf, 2); // e_shnum (null + ours)
    push_u16(&mut buf, 0); // e_shstrndx

    assert_eq!(64, buf.len(), "ELF64 header must be exactly 64 bytes");

    let section_offset = buf.len() as u64;
    buf.extend_from_slice(payload);

    let shoff = buf.len() as u64;
    buf[shoff_pos..shoff_pos + 8].copy_from_slice(&shoff.to_le_bytes());

    // Section 0: SHT_NULL, all zero.
    buf.extend_from_slice(&[0u8; 64]);

    // Section 1: our PROGBITS section.
    push_u32(&mut buf, 0); // sh_name
    push_u32(&mut buf, SHT_PROGBITS);
    push_u64(&mut buf, 0); // sh_flags
    push_u64(&mut buf, load_addr); // sh_addr
    push_u64(&mut buf, section_offset); // sh_offset
    push_u64(&mut buf, payload.len() as u64); // sh_size
    push_u32(&mut buf, 0); // sh_link
    push_u32(&mut buf, 0); // sh_info
    push_u64(&mut buf, 1); // sh_addralign
    push_u64(&mut buf, 0); // sh_entsize

    buf
}

#[test]
fn loads_progbits_section_into_dram_and_returns_entry() {
    let payload = vec![
        0x93, 0x0f, 0x50, 0x00, // addi x31, x0, 5
        0x73, 0x00, 0x00, 0x00, // ecall
    ];
    let image = build_elf(DRAM_BASE, &payload);

    let mut emu = Emu::new();
    let entry = elf::load(&mut emu, &image).expect("well-formed image must load");

    assert_eq!(DRAM_BASE, entry);
    for (i, byte) in payload.iter().enumerate() {
        assert_eq!(
            *byte as u64,
            emu.cpu.bus.read(DRAM_BASE + i as u64, rv64_emu::cpu::BYTE).unwrap()
        );
    }
}

#[test]
fn rejects_non_exec_image() {
    let mut image = build_elf(DRAM_BASE, &[0u8; 4]);
    image[16] = 3; // e_type = ET_DYN

    let mut emu = Emu::new();
    assert!(elf::load(&mut emu, &image).is_err());
}

#[test]
fn rejects_wrong_machine_image() {
    let mut image = build_elf(DRAM_BASE, &[0u8; 4]);
    image[18] = 0x3e; // e_machine = EM_X86_64, not EM_RISCV
    image[19] = 0x00;

    let mut emu = Emu::new();
    assert!(elf::load(&mut emu, &image).is_err());
}
