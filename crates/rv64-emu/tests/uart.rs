//! UART echo and PLIC claim scenario.
use rv64_emu::cpu::CPU;
use rv64_emu::devices::console::QueueBackend;
use rv64_emu::devices::uart_cli::UART_IRQ;

const IER: u64 = 1;
const RBR: u64 = 0;
const LSR: u64 = 5;
const LSR_DR: u8 = 1;

// PLIC register offsets (see `devices::plic`): priority array at +4, enable bitmap at +0x2080.
const PLIC_PRIORITY_IRQ10: u64 = 0x0004 + 10 * 4;
const PLIC_ENABLE_BYTE1: u64 = 0x2081; // covers IRQ8..15

#[test]
fn uart_echo_sets_data_ready_and_claims_plic() {
    let mut cpu = CPU::new();
    let backend = QueueBackend::new();
    let input = backend.input_queue();
    cpu.bus.uart.set_backend(Box::new(backend));

    // IER.0 = 1: enable "data ready" interrupts.
    cpu.bus.uart.write(IER, 1);
    cpu.bus.plic.write(PLIC_PRIORITY_IRQ10, 1);
    cpu.bus.plic.write(PLIC_ENABLE_BYTE1, 1 << (UART_IRQ - 8));

    {
        let (queue, condvar) = &*input;
        queue.lock().unwrap().push_back(0x41);
        condvar.notify_one();
    }

    cpu.bus.uart.tick();

    assert_eq!(LSR_DR, cpu.bus.uart.read(LSR) & LSR_DR);

    let irq = if cpu.bus.uart.is_interrupting() {
        UART_IRQ
    } else {
        0
    };
    assert_eq!(UART_IRQ, irq);
    cpu.bus.plic.update_pending(irq);
    assert_eq!(UART_IRQ as u32, cpu.bus.plic.pending_claim());

    assert_eq!(0x41, cpu.bus.uart.read(RBR));
    assert_eq!(0, cpu.bus.uart.read(LSR) & LSR_DR);
}
