//! Edge-triggered input transmission.
//!
//! The server treats movement as "continuous while true", so the client only
//! needs to send an envelope when the held-key set actually changes. Bomb
//! requests are discrete events and always go out.

use bubble_shared::protocol::ClientMessage;

/// Tracks the last transmitted movement state and emits an envelope only on
/// change.
#[derive(Debug, Default)]
pub struct InputTracker {
    last_sent: Option<(bool, bool, bool, bool)>,
}

impl InputTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sample the currently held movement keys. Returns the envelope to send
    /// when the set differs from the last transmitted one, `None` otherwise.
    pub fn sample(
        &mut self,
        up: bool,
        down: bool,
        left: bool,
        right: bool,
    ) -> Option<ClientMessage> {
        let state = (up, down, left, right);
        if self.last_sent == Some(state) {
            return None;
        }
        self.last_sent = Some(state);
        Some(ClientMessage::Input {
            up,
            down,
            left,
            right,
        })
    }

    /// Bomb presses are discrete events, never deduplicated.
    pub fn bomb(&self) -> ClientMessage {
        ClientMessage::Bomb
    }

    /// Forget the transmitted state, forcing the next sample to send. Called
    /// after a reconnect so the server learns the current keys.
    pub fn reset(&mut self) {
        self.last_sent = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sample_always_sends() {
        let mut tracker = InputTracker::new();
        assert!(tracker.sample(false, false, false, false).is_some());
    }

    #[test]
    fn unchanged_state_is_suppressed() {
        let mut tracker = InputTracker::new();
        tracker.sample(false, false, true, false);
        assert!(tracker.sample(false, false, true, false).is_none());
        assert!(tracker.sample(false, false, true, false).is_none());
    }

    #[test]
    fn any_flag_change_sends() {
        let mut tracker = InputTracker::new();
        tracker.sample(false, false, true, false);
        let sent = tracker.sample(false, false, false, false);
        match sent {
            Some(ClientMessage::Input { left, .. }) => assert!(!left),
            other => panic!("expected input envelope, got {:?}", other),
        }
    }

    #[test]
    fn reset_forces_retransmission() {
        let mut tracker = InputTracker::new();
        tracker.sample(true, false, false, false);
        assert!(tracker.sample(true, false, false, false).is_none());
        tracker.reset();
        assert!(tracker.sample(true, false, false, false).is_some());
    }
}
