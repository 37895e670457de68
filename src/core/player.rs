use super::session::Ticket;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// Nothing loaded, or the list ran out.
    #[default]
    Idle,
    /// A play request is out; waiting for the output to start.
    Loading,
    Playing,
    /// The output refused to start; waiting for the user to press play.
    Blocked,
}

/// Playback state machine. Every `load` issues a fresh ticket and only the
/// outcome carrying the latest ticket may move the state.
#[derive(Debug, Default)]
pub struct Player {
    state: PlaybackState,
    generation: Ticket,
}

impl Player {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_latest(&self, ticket: Ticket) -> bool {
        ticket == self.generation
    }

    pub fn load(&mut self) -> Ticket {
        self.generation += 1;
        self.state = PlaybackState::Loading;
        self.generation
    }

    /// Applies the outcome of a start attempt. Returns false for stale tickets.
    pub fn started(&mut self, ticket: Ticket, accepted: bool) -> bool {
        if !self.is_latest(ticket) {
            return false;
        }
        self.state = if accepted {
            PlaybackState::Playing
        } else {
            PlaybackState::Blocked
        };
        true
    }

    /// Back to idle. Outstanding start attempts become stale.
    pub fn stop(&mut self) {
        self.generation += 1;
        self.state = PlaybackState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_then_accept() {
        let mut p = Player::new();
        assert_eq!(p.state(), PlaybackState::Idle);
        let t = p.load();
        assert_eq!(p.state(), PlaybackState::Loading);
        assert!(p.started(t, true));
        assert_eq!(p.state(), PlaybackState::Playing);
    }

    #[test]
    fn test_rejection_blocks() {
        let mut p = Player::new();
        let t = p.load();
        assert!(p.started(t, false));
        assert_eq!(p.state(), PlaybackState::Blocked);
    }

    #[test]
    fn test_superseded_outcome_is_ignored() {
        let mut p = Player::new();
        let old = p.load();
        let new = p.load();
        assert!(!p.started(old, false));
        assert_eq!(p.state(), PlaybackState::Loading);
        assert!(p.started(new, true));
        assert!(!p.started(old, false));
        assert_eq!(p.state(), PlaybackState::Playing);
    }

    #[test]
    fn test_stop_invalidates_pending_start() {
        let mut p = Player::new();
        let t = p.load();
        p.stop();
        assert!(!p.started(t, true));
        assert_eq!(p.state(), PlaybackState::Idle);
    }
}
