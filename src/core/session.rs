use crate::models::Track;

/// Generation number handed out with every issued request.
pub type Ticket = u64;

/// Track list of the latest accepted search plus the selected index.
#[derive(Debug, Default)]
pub struct Session {
    tracks: Vec<Track>,
    current: Option<usize>,
    search_generation: Ticket,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn current(&self) -> Option<usize> {
        self.current
    }

    /// Issues a ticket for a new search; any earlier ticket becomes stale.
    pub fn begin_search(&mut self) -> Ticket {
        self.search_generation += 1;
        self.search_generation
    }

    pub fn is_latest_search(&self, ticket: Ticket) -> bool {
        ticket == self.search_generation
    }

    /// Installs a new track list and clears the selection.
    pub fn replace_tracks(&mut self, tracks: Vec<Track>) {
        self.tracks = tracks;
        self.current = None;
    }

    /// Selects `index` if it is in range.
    pub fn select(&mut self, index: usize) -> bool {
        if index >= self.tracks.len() {
            return false;
        }
        self.current = Some(index);
        true
    }

    /// Index auto-advance should move to: the one after the selection, or the
    /// first track when nothing is selected. `None` at the end of the list.
    pub fn next_index(&self) -> Option<usize> {
        let next = match self.current {
            Some(i) => i + 1,
            None => 0,
        };
        (next < self.tracks.len()).then_some(next)
    }
}
