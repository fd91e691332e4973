//! Host-side console front-ends. Each implements `rv64_emu`'s `ConsoleBackend` trait, so the
//! UART model never knows whether it's talking to a real terminal or a headless null sink.
use std::collections::VecDeque;
use std::io::{Read, Write};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use crossterm::terminal;
use rv64_emu::devices::console::ConsoleBackend;

type ByteQueue = Arc<(Mutex<VecDeque<u8>>, Condvar)>;

/// Puts the host terminal into raw mode and forwards stdin bytes to the UART on a background
/// thread. Raw mode is torn down on drop, including when `run` returns via an error, so a
/// crashed emulator never leaves the user's shell in raw mode.
pub struct RawTerminalConsole {
    queue: ByteQueue,
    _reader: JoinHandle<()>,
}

impl RawTerminalConsole {
    pub fn spawn() -> anyhow::Result<Self> {
        terminal::enable_raw_mode()?;
        let queue: ByteQueue = Arc::new((Mutex::new(VecDeque::new()), Condvar::new()));
        let reader_queue = Arc::clone(&queue);
        let reader = thread::spawn(move || {
            let mut stdin = std::io::stdin();
            let mut byte = [0u8; 1];
            loop {
                match stdin.read(&mut byte) {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {
                        let (queue, condvar) = &*reader_queue;
                        queue.lock().unwrap().push_back(byte[0]);
                        condvar.notify_one();
                    }
                }
            }
        });
        Ok(Self {
            queue,
            _reader: reader,
        })
    }
}

impl ConsoleBackend for RawTerminalConsole {
    fn recv(&mut self) -> Option<u8> {
        self.queue.0.lock().unwrap().pop_front()
    }

    fn send(&mut self, byte: u8) {
        let mut stdout = std::io::stdout();
        let _ = stdout.write_all(&[byte]);
        let _ = stdout.flush();
    }
}

impl Drop for RawTerminalConsole {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Trivial backend for the `--debug` regression path: never feeds input, discards output,
/// never touches the terminal. Driving a real TTY from a bounded test run is neither possible
/// nor desirable.
pub struct NullConsole;

impl NullConsole {
    pub fn new() -> Self {
        NullConsole
    }
}

impl ConsoleBackend for NullConsole {
    fn recv(&mut self) -> Option<u8> {
        None
    }

    fn send(&mut self, _byte: u8) {}
}
