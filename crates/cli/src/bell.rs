//! Terminal bell alerts.

use std::io::Write;

use digitrestau_client::{AlertError, AlertPlayer, AlertSound};

/// Rings the terminal bell: twice for a new order, once for a status change.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalBell;

impl TerminalBell {
    const fn rings(sound: AlertSound) -> &'static [u8] {
        match sound {
            AlertSound::NewOrder => b"\x07\x07",
            AlertSound::StatusChange => b"\x07",
        }
    }
}

impl AlertPlayer for TerminalBell {
    fn play(&self, sound: AlertSound) -> Result<(), AlertError> {
        let mut out = std::io::stdout().lock();
        out.write_all(Self::rings(sound))
            .and_then(|()| out.flush())
            .map_err(|e| AlertError(e.to_string()))
    }
}
