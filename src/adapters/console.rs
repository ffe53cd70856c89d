//! Serial console watcher.
//!
//! Ctrl-C (0x03) arriving on the console UART sets the shared stop flag,
//! which ends the scheduler loop and runs the shutdown sequence. Any other
//! input is ignored.

use std::io::{ErrorKind, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use log::{info, warn};

/// ASCII ETX, what a terminal sends for Ctrl-C.
pub const INTERRUPT: u8 = 0x03;

const STACK_KB: usize = 4;
/// ESP-IDF's console VFS is non-blocking; back off between empty reads.
const IDLE_POLL: Duration = Duration::from_millis(50);

/// Read `input` until Ctrl-C or end of input. Returns whether the stop
/// flag was raised.
pub fn watch_for_interrupt<R: Read>(mut input: R, stop: &AtomicBool) -> bool {
    let mut buf = [0u8; 16];
    loop {
        match input.read(&mut buf) {
            Ok(0) => return false,
            Ok(n) => {
                if buf[..n].contains(&INTERRUPT) {
                    warn!("Console: interrupt received, shutting down");
                    stop.store(true, Ordering::Relaxed);
                    return true;
                }
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) if e.kind() == ErrorKind::WouldBlock => std::thread::sleep(IDLE_POLL),
            Err(e) => {
                warn!("Console: read failed ({}), interrupt disabled", e);
                return false;
            }
        }
    }
}

/// Watch stdin on a background thread.
pub fn spawn(stop: &'static AtomicBool) -> std::io::Result<JoinHandle<()>> {
    info!("Console: Ctrl-C stops the controller");
    std::thread::Builder::new()
        .name("console".into())
        .stack_size(STACK_KB * 1024)
        .spawn(move || {
            watch_for_interrupt(std::io::stdin(), stop);
        })
}
