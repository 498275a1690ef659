//! Cooperative continuation queue.
//!
//! Pacing delays (row advance, pattern interrupt, Stage 2 trial timer) are
//! modelled as continuations scheduled at a virtual time and fired by the
//! owner when its clock reaches them. Each entry has a [`Token`]; a cancelled
//! token never fires, and a token fires at most once.

use std::time::Duration;

/// Handle to a scheduled continuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token(u64);

#[derive(Debug, Clone)]
struct Entry<C> {
    due: Duration,
    token: Token,
    continuation: C,
}

/// Time-ordered queue of pending continuations.
#[derive(Debug, Clone)]
pub struct Timeline<C> {
    entries: Vec<Entry<C>>,
    next_token: u64,
}

impl<C> Default for Timeline<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Timeline<C> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_token: 1,
        }
    }

    /// Schedule `continuation` to fire at `now + delay`.
    pub fn schedule(&mut self, now: Duration, delay: Duration, continuation: C) -> Token {
        let token = Token(self.next_token);
        self.next_token += 1;
        self.entries.push(Entry {
            due: now + delay,
            token,
            continuation,
        });
        token
    }

    /// Cancel a pending continuation. Returns it if it had not fired yet.
    pub fn cancel(&mut self, token: Token) -> Option<C> {
        let pos = self.entries.iter().position(|e| e.token == token)?;
        Some(self.entries.remove(pos).continuation)
    }

    /// Move a pending continuation to `now + delay`, keeping its token.
    pub fn reschedule(&mut self, token: Token, now: Duration, delay: Duration) -> bool {
        match self.entries.iter_mut().find(|e| e.token == token) {
            Some(entry) => {
                entry.due = now + delay;
                true
            }
            None => false,
        }
    }

    /// Due time of a pending continuation.
    pub fn due(&self, token: Token) -> Option<Duration> {
        self.entries.iter().find(|e| e.token == token).map(|e| e.due)
    }

    /// Time remaining before a pending continuation fires.
    pub fn remaining(&self, token: Token, now: Duration) -> Option<Duration> {
        self.due(token).map(|due| due.saturating_sub(now))
    }

    pub fn is_pending(&self, token: Token) -> bool {
        self.entries.iter().any(|e| e.token == token)
    }

    /// Earliest due time, if anything is pending.
    pub fn next_due(&self) -> Option<Duration> {
        self.entries.iter().map(|e| e.due).min()
    }

    /// Remove and return the earliest continuation due at or before `now`.
    ///
    /// Ties fire in scheduling order.
    pub fn pop_due(&mut self, now: Duration) -> Option<(Token, C)> {
        let pos = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.due <= now)
            .min_by_key(|(_, e)| (e.due, e.token))
            .map(|(i, _)| i)?;
        let entry = self.entries.remove(pos);
        Some((entry.token, entry.continuation))
    }

    /// Drop everything pending.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_fires_in_due_order() {
        let mut timeline = Timeline::new();
        timeline.schedule(ms(0), ms(600), "advance");
        timeline.schedule(ms(0), ms(120), "practice");

        assert!(timeline.pop_due(ms(100)).is_none());
        assert_eq!(timeline.pop_due(ms(700)).map(|(_, c)| c), Some("practice"));
        assert_eq!(timeline.pop_due(ms(700)).map(|(_, c)| c), Some("advance"));
        assert!(timeline.is_empty());
    }

    #[test]
    fn test_ties_fire_in_schedule_order() {
        let mut timeline = Timeline::new();
        timeline.schedule(ms(0), ms(10), 1);
        timeline.schedule(ms(0), ms(10), 2);
        assert_eq!(timeline.pop_due(ms(10)).map(|(_, c)| c), Some(1));
        assert_eq!(timeline.pop_due(ms(10)).map(|(_, c)| c), Some(2));
    }

    #[test]
    fn test_cancel_prevents_firing() {
        let mut timeline = Timeline::new();
        let token = timeline.schedule(ms(0), ms(10), ());
        assert_eq!(timeline.cancel(token), Some(()));
        assert_eq!(timeline.cancel(token), None);
        assert!(timeline.pop_due(ms(100)).is_none());
    }

    #[test]
    fn test_reschedule_keeps_token() {
        let mut timeline = Timeline::new();
        let token = timeline.schedule(ms(0), ms(3000), "interrupt");
        assert_eq!(timeline.remaining(token, ms(1000)), Some(ms(2000)));

        assert!(timeline.reschedule(token, ms(1000), ms(1000)));
        assert_eq!(timeline.next_due(), Some(ms(2000)));
        let (fired, _) = timeline.pop_due(ms(2000)).unwrap();
        assert_eq!(fired, token);
        assert!(!timeline.reschedule(token, ms(2000), ms(10)));
    }
}
