//! Cancellation on SIGINT and SIGTERM.

use std::io;

use modhunt_core::CancellationToken;
use signal_hook::SigId;
use signal_hook::consts::signal::{SIGINT, SIGTERM};

/// Keeps the handlers registered; dropping it unregisters them.
#[derive(Debug)]
pub(crate) struct SignalGuard {
    ids: Vec<SigId>,
}

impl Drop for SignalGuard {
    fn drop(&mut self) {
        for id in self.ids.drain(..) {
            signal_hook::low_level::unregister(id);
        }
    }
}

/// Routes SIGINT and SIGTERM to `cancel` for as long as the guard lives.
///
/// The running host leads its own process group, so a terminal interrupt
/// reaches only this process; the runner then kills the host.
pub(crate) fn install(cancel: &CancellationToken) -> io::Result<SignalGuard> {
    let mut guard = SignalGuard { ids: Vec::new() };
    for signal in [SIGINT, SIGTERM] {
        let id = signal_hook::flag::register(signal, cancel.flag())?;
        guard.ids.push(id);
    }
    Ok(guard)
}
