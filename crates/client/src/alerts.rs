//! Audible alerts for realtime order events.
//!
//! Playback is a side channel: callers log and discard every failure.

use thiserror::Error;

/// Which alert to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertSound {
    /// A new order arrived (administrators only).
    NewOrder,
    /// An existing order changed status.
    StatusChange,
}

impl AlertSound {
    /// Source of the chime.
    #[must_use]
    pub const fn url(self) -> &'static str {
        match self {
            Self::NewOrder => "https://assets.mixkit.co/active_storage/sfx/2869/2869-preview.mp3",
            Self::StatusChange => {
                "https://assets.mixkit.co/active_storage/sfx/2864/2864-preview.mp3"
            }
        }
    }
}

#[derive(Debug, Error)]
#[error("alert playback failed: {0}")]
pub struct AlertError(pub String);

/// Plays alert sounds.
pub trait AlertPlayer: Send + Sync {
    /// Start playing `sound`. Must not block.
    ///
    /// # Errors
    ///
    /// Returns `AlertError` if playback could not start.
    fn play(&self, sound: AlertSound) -> Result<(), AlertError>;
}

/// Plays nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentAlerts;

impl AlertPlayer for SilentAlerts {
    fn play(&self, _sound: AlertSound) -> Result<(), AlertError> {
        Ok(())
    }
}

/// Play `sound`, swallowing any failure.
pub(crate) fn play_quietly(player: &dyn AlertPlayer, sound: AlertSound) {
    if let Err(e) = player.play(sound) {
        tracing::debug!(error = %e, ?sound, "Alert playback failed");
    }
}
