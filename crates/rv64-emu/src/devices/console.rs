//! Host console abstraction. `Uart` only ever talks to a `ConsoleBackend`; it never knows
//! whether the other end is a raw terminal, a headless null sink, or a test harness.
use std::collections::VecDeque;
use std::io::Write;
use std::sync::{Arc, Condvar, Mutex};

/// Shared queue a host input source feeds bytes into. Kept separate from any one backend so a
/// reader thread and the tick loop can both hold a handle without aliasing `&mut`.
pub type InputQueue = Arc<(Mutex<VecDeque<u8>>, Condvar)>;

/// Non-blocking byte source and sink the UART model talks to. `recv` must return immediately
/// with `None` rather than block when no host byte is queued, and `send` must not block the
/// tick loop waiting on the host side.
pub trait ConsoleBackend: Send {
    fn recv(&mut self) -> Option<u8>;
    fn send(&mut self, byte: u8);
}

/// Default backend: drains a shared input queue and echoes transmitted bytes to stdout. Used
/// whenever nothing more specific (a real terminal, a headless sink) has been wired in.
pub struct QueueBackend {
    input: InputQueue,
}

impl QueueBackend {
    pub fn new() -> Self {
        Self::with_input(Arc::new((Mutex::new(VecDeque::new()), Condvar::new())))
    }

    pub fn with_input(input: InputQueue) -> Self {
        Self { input }
    }

    pub fn input_queue(&self) -> InputQueue {
        Arc::clone(&self.input)
    }
}

impl ConsoleBackend for QueueBackend {
    fn recv(&mut self) -> Option<u8> {
        self.input.0.lock().unwrap().pop_front()
    }

    fn send(&mut self, byte: u8) {
        let mut stdout = std::io::stdout();
        let _ = stdout.write_all(&[byte]);
        let _ = stdout.flush();
    }
}
