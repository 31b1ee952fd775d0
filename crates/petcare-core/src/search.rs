//! Search-as-you-type controller for list screens.
//!
//! Keystrokes restart a quiet period; a request ticket is issued only once the
//! user stops typing for the debounce window. Every ticket carries a
//! generation number, and only the response to the newest ticket is applied.
//!
//! The controller never reads the clock itself: callers pass `now`, which keeps
//! it deterministic under test.

use std::time::{Duration, Instant};

use crate::config::SearchSettings;

/// A request the screen should send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTicket {
    pub generation: u64,
    pub term: String,
    pub page: u32,
}

/// Debounce and stale-response state for one list screen.
#[derive(Debug)]
pub struct SearchController {
    debounce: Duration,
    term: String,
    page: u32,
    /// Set while a keystroke is waiting out its quiet period
    pending_since: Option<Instant>,
    /// Set when a page change should go out on the next poll
    page_dirty: bool,
    issued: u64,
}

impl SearchController {
    pub fn new(settings: &SearchSettings) -> Self {
        Self::with_debounce(settings.debounce())
    }

    pub fn with_debounce(debounce: Duration) -> Self {
        Self {
            debounce,
            term: String::new(),
            page: 1,
            pending_since: None,
            page_dirty: false,
            issued: 0,
        }
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    /// The newest issued generation, 0 before the first ticket.
    pub fn generation(&self) -> u64 {
        self.issued
    }

    /// Record a keystroke. Resets to page 1 and restarts the quiet period.
    pub fn input(&mut self, term: &str, now: Instant) {
        self.term = term.to_string();
        self.page = 1;
        self.page_dirty = false;
        self.pending_since = Some(now);
    }

    /// Jump to a page. Not debounced; goes out on the next poll.
    pub fn set_page(&mut self, page: u32) {
        self.page = page.max(1);
        self.page_dirty = true;
    }

    /// Issue a ticket if a quiet period has completed or a page change is waiting.
    ///
    /// Polling again without new input returns None.
    pub fn poll(&mut self, now: Instant) -> Option<SearchTicket> {
        let quiet = match self.pending_since {
            Some(since) => now.saturating_duration_since(since) >= self.debounce,
            None => false,
        };
        if !quiet && !(self.page_dirty && self.pending_since.is_none()) {
            return None;
        }

        self.pending_since = None;
        self.page_dirty = false;
        self.issued += 1;
        tracing::debug!(
            generation = self.issued,
            term = %self.term,
            page = self.page,
            "Issuing search request"
        );
        Some(SearchTicket {
            generation: self.issued,
            term: self.term.clone(),
            page: self.page,
        })
    }

    /// Whether a response for `ticket` should be applied.
    pub fn accept(&self, ticket: &SearchTicket) -> bool {
        let fresh = ticket.generation == self.issued;
        if !fresh {
            tracing::warn!(
                generation = ticket.generation,
                latest = self.issued,
                term = %ticket.term,
                "Dropping stale search response"
            );
        }
        fresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_keystrokes_inside_window_coalesce() {
        let start = Instant::now();
        let mut search = SearchController::with_debounce(ms(400));

        search.input("a", start);
        assert_eq!(search.poll(start + ms(100)), None);
        search.input("an", start + ms(150));
        assert_eq!(search.poll(start + ms(500)), None);

        let ticket = search.poll(start + ms(550)).unwrap();
        assert_eq!(ticket.term, "an");
        assert_eq!(ticket.page, 1);
        assert_eq!(search.poll(start + ms(2000)), None);
    }

    #[test]
    fn test_typing_resets_page() {
        let start = Instant::now();
        let mut search = SearchController::with_debounce(ms(400));
        search.set_page(3);
        assert_eq!(search.poll(start).unwrap().page, 3);

        search.input("mi", start);
        assert_eq!(search.page(), 1);
        assert_eq!(search.poll(start + ms(400)).unwrap().page, 1);
    }

    #[test]
    fn test_page_change_waits_for_pending_keystroke() {
        let start = Instant::now();
        let mut search = SearchController::with_debounce(ms(400));
        search.input("milo", start);
        search.set_page(2);
        assert_eq!(search.poll(start + ms(10)), None);

        let ticket = search.poll(start + ms(400)).unwrap();
        assert_eq!((ticket.term.as_str(), ticket.page), ("milo", 2));
    }

    #[test]
    fn test_only_latest_response_is_accepted() {
        let start = Instant::now();
        let mut search = SearchController::with_debounce(ms(400));

        search.input("a", start);
        let first = search.poll(start + ms(400)).unwrap();
        search.input("an", start + ms(450));
        let second = search.poll(start + ms(850)).unwrap();

        assert!(second.generation > first.generation);
        assert!(!search.accept(&first));
        assert!(search.accept(&second));
    }

    #[test]
    fn test_defaults_from_settings() {
        let search = SearchController::new(&SearchSettings::default());
        assert_eq!(search.debounce, ms(400));
        assert_eq!(search.generation(), 0);
    }
}
