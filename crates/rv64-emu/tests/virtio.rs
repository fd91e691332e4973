//! Virtio-block single-sector write then read round trip through one descriptor chain.
use rv64_emu::bus::DRAM_BASE;
use rv64_emu::cpu::{CPU, BYTE, DOUBLEWORD, HALFWORD, WORD};
use rv64_emu::devices::virtio_blk::{Virtio, VIRTIO_BASE};

// Register offsets from `devices::virtio_blk` (legacy MMIO virtio-block layout).
const GUEST_PAGE_SIZE: u64 = 0x028;
const QUEUE_NUM: u64 = 0x038;
const QUEUE_PFN: u64 = 0x040;
const QUEUE_NOTIFY: u64 = 0x050;
const INTERRUPT_ACK: u64 = 0x064;

const VRING_DESC_SIZE: u64 = 16;
const QUEUE_DEPTH: u64 = 8;
const SECTOR_SIZE: u64 = 512;

fn write_reg(cpu: &mut CPU, offset: u64, value: u32) {
    for i in 0..4u64 {
        cpu.bus
            .write(VIRTIO_BASE + offset + i, ((value >> (8 * i)) & 0xff) as u64, BYTE)
            .unwrap();
    }
}

/// Lay out a three-descriptor chain (header, data, status) for a single sector, and the
/// one-entry available ring pointing at it, matching `Virtio::disk_access`'s expectations.
fn build_descriptor_chain(cpu: &mut CPU, desc_addr: u64, data_write_flag: u16) {
    let header_addr = desc_addr + 0x2000;
    let data_addr = desc_addr + 0x3000;
    let status_addr = desc_addr + 0x4000;
    let avail_addr = desc_addr + QUEUE_DEPTH * VRING_DESC_SIZE;

    // Descriptor 0: request header (type, reserved, sector).
    cpu.bus.write(desc_addr, header_addr, DOUBLEWORD).unwrap(); // addr
    cpu.bus.write(desc_addr + 8, 16, WORD).unwrap(); // len (unused by disk_access)
    cpu.bus.write(desc_addr + 12, 0, HALFWORD).unwrap(); // flags
    cpu.bus.write(desc_addr + 14, 1, HALFWORD).unwrap(); // next -> descriptor 1
    cpu.bus.write(header_addr + 8, 0, DOUBLEWORD).unwrap(); // sector 0

    // Descriptor 1: data buffer. VIRTQ_DESC_F_WRITE (2) means the device writes into it.
    let desc1 = desc_addr + VRING_DESC_SIZE;
    cpu.bus.write(desc1, data_addr, DOUBLEWORD).unwrap();
    cpu.bus.write(desc1 + 8, SECTOR_SIZE, WORD).unwrap(); // len
    cpu.bus.write(desc1 + 12, data_write_flag as u64, HALFWORD).unwrap();
    cpu.bus.write(desc1 + 14, 2, HALFWORD).unwrap(); // next -> descriptor 2

    // Descriptor 2: device-writable status byte.
    let desc2 = desc_addr + VRING_DESC_SIZE * 2;
    cpu.bus.write(desc2, status_addr, DOUBLEWORD).unwrap();
    cpu.bus.write(desc2 + 12, 2, HALFWORD).unwrap(); // VIRTQ_DESC_F_WRITE

    // Available ring: head index 0, for every request id this test dispatches.
    cpu.bus.write(avail_addr + 4, 0, HALFWORD).unwrap();
    cpu.bus.write(avail_addr + 6, 0, HALFWORD).unwrap();
}

#[test]
fn write_then_read_round_trips_through_disk() {
    let mut cpu = CPU::new();
    cpu.bus.virtio.load_disk(vec![0u8; SECTOR_SIZE as usize]);

    let guest_page_size = 4096u32;
    let queue_pfn = ((DRAM_BASE + 0x10000) / guest_page_size as u64) as u32;
    write_reg(&mut cpu, GUEST_PAGE_SIZE, guest_page_size);
    write_reg(&mut cpu, QUEUE_NUM, 8);
    write_reg(&mut cpu, QUEUE_PFN, queue_pfn);

    let desc_addr = queue_pfn as u64 * guest_page_size as u64;
    let data_addr = desc_addr + 0x3000;

    // Phase 1: guest buffer -> disk. flags=0 means the device reads this descriptor.
    build_descriptor_chain(&mut cpu, desc_addr, 0);

    let pattern: Vec<u8> = (0..SECTOR_SIZE).map(|i| (i % 251) as u8).collect();
    for (i, byte) in pattern.iter().enumerate() {
        cpu.bus.write(data_addr + i as u64, *byte as u64, BYTE).unwrap();
    }

    write_reg(&mut cpu, QUEUE_NOTIFY, 0); // any non-sentinel value notifies the queue
    assert!(cpu.bus.virtio.is_interrupting());
    Virtio::disk_access(&mut cpu).expect("servicing a well-formed descriptor chain must not trap");

    write_reg(&mut cpu, INTERRUPT_ACK, 1);
    assert!(!cpu.bus.virtio.is_interrupting());

    // Phase 2: disk -> guest buffer. Clear the buffer first so the read is actually exercised.
    for i in 0..SECTOR_SIZE {
        cpu.bus.write(data_addr + i, 0, BYTE).unwrap();
    }
    build_descriptor_chain(&mut cpu, desc_addr, 2);

    write_reg(&mut cpu, QUEUE_NOTIFY, 0);
    assert!(cpu.bus.virtio.is_interrupting());
    Virtio::disk_access(&mut cpu).expect("servicing a well-formed descriptor chain must not trap");

    for (i, expected) in pattern.iter().enumerate() {
        let got = cpu.bus.read(data_addr + i as u64, BYTE).unwrap() as u8;
        assert_eq!(*expected, got, "byte {i} mismatched after disk round trip");
    }
}
