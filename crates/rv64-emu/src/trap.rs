//! Trap delivery: routes a synchronous exception or a selected interrupt into the correct
//! privilege mode's handler, following the delegation registers (`medeleg`/`mideleg`).
use crate::{
    cpu::{Mode, CPU},
    exception::Exception,
    interrupt::Interrupt,
    reg::csr::{
        MCAUSE, MEDELEG, MEPC, MIDELEG, MSTATUS_MIE, MSTATUS_MPIE, MSTATUS_MPP, MTVAL, MTVEC,
        SCAUSE, SEPC, STVAL, STVEC, XSTATUS_SIE, XSTATUS_SPIE, XSTATUS_SPP,
    },
};

/// Deliver a synchronous exception raised while executing the instruction at `instr_addr`.
pub fn take_exception(cpu: &mut CPU, exception: Exception, instr_addr: u64) {
    let cause = exception.code();
    let tval = exception.trap_value(instr_addr);
    deliver(cpu, cause, tval, instr_addr);
}

/// Deliver an interrupt that preempted the instruction about to execute at `instr_addr`.
pub fn take_interrupt(cpu: &mut CPU, interrupt: Interrupt, instr_addr: u64) {
    deliver(cpu, interrupt.code(), 0, instr_addr);
}

/// Common trap-entry sequence: pick the target privilege mode via delegation, save the
/// epc/cause/tval, vector the pc, and stack the interrupt-enable/privilege bits.
fn deliver(cpu: &mut CPU, cause: u64, tval: u64, instr_addr: u64) {
    let prev_mode = cpu.mode;
    let is_interrupt = cause & (1 << 63) != 0;
    let code = cause & !(1 << 63);

    let deleg = if is_interrupt { MIDELEG } else { MEDELEG };
    let delegated_to_supervisor =
        prev_mode <= Mode::Supervisor && (cpu.state.read(deleg) >> code) & 1 != 0;

    if delegated_to_supervisor {
        cpu.mode = Mode::Supervisor;
        cpu.state.write(SEPC, instr_addr);
        cpu.state.write(SCAUSE, cause);
        cpu.state.write(STVAL, tval);

        let tvec = cpu.state.read(STVEC);
        cpu.pc = if is_interrupt && tvec & 1 != 0 {
            (tvec & !1) + 4 * code
        } else {
            tvec & !1
        };

        cpu.state
            .write_sstatus(XSTATUS_SPIE, cpu.state.read_sstatus(XSTATUS_SIE));
        cpu.state.write_sstatus(XSTATUS_SIE, 0);
        cpu.state.write_sstatus(
            XSTATUS_SPP,
            if prev_mode == Mode::User { 0 } else { 1 },
        );
    } else {
        cpu.mode = Mode::Machine;
        cpu.state.write(MEPC, instr_addr);
        cpu.state.write(MCAUSE, cause);
        cpu.state.write(MTVAL, tval);

        let tvec = cpu.state.read(MTVEC);
        cpu.pc = if is_interrupt && tvec & 1 != 0 {
            (tvec & !1) + 4 * code
        } else {
            tvec & !1
        };

        cpu.state
            .write_mstatus(MSTATUS_MPIE, cpu.state.read_mstatus(MSTATUS_MIE));
        cpu.state.write_mstatus(MSTATUS_MIE, 0);
        cpu.state.write_mstatus(MSTATUS_MPP, prev_mode as u64);
    }
}
