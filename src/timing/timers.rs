//! One-shot timer queue with cancellation tokens.

use std::time::Duration;

use super::SharedClock;

/// Handle returned by [`TimerQueue::schedule`], used to cancel the timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken(u64);

struct Pending<A> {
    token: TimerToken,
    due: Duration,
    action: A,
}

/// One-shot timers carrying plain-data actions.
///
/// Timers never call back into their owner. The owner pulls due actions
/// with [`TimerQueue::pop_due`] one at a time, so a fired action may cancel
/// timers that are also due before they are delivered.
pub struct TimerQueue<A> {
    clock: SharedClock,
    next_id: u64,
    pending: Vec<Pending<A>>,
}

impl<A> TimerQueue<A> {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            clock,
            next_id: 0,
            pending: Vec::new(),
        }
    }

    /// Schedule `action` to fire `delay` from now
    pub fn schedule(&mut self, delay: Duration, action: A) -> TimerToken {
        let token = TimerToken(self.next_id);
        self.next_id += 1;
        self.pending.push(Pending {
            token,
            due: self.clock.now() + delay,
            action,
        });
        token
    }

    /// Cancel a pending timer. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, token: TimerToken) -> bool {
        let before = self.pending.len();
        self.pending.retain(|p| p.token != token);
        self.pending.len() != before
    }

    /// Cancel every timer in `tokens`
    pub fn cancel_all(&mut self, tokens: impl IntoIterator<Item = TimerToken>) {
        for token in tokens {
            self.cancel(token);
        }
    }

    pub fn is_pending(&self, token: TimerToken) -> bool {
        self.pending.iter().any(|p| p.token == token)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Earliest deadline among pending timers
    pub fn next_due(&self) -> Option<Duration> {
        self.pending.iter().map(|p| p.due).min()
    }

    /// Remove and return the earliest timer that is due now.
    ///
    /// Timers with equal deadlines fire in scheduling order.
    pub fn pop_due(&mut self) -> Option<A> {
        let now = self.clock.now();
        let index = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, p)| p.due <= now)
            .min_by_key(|(_, p)| (p.due, p.token.0))
            .map(|(index, _)| index)?;
        Some(self.pending.remove(index).action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timing::ManualClock;

    fn queue() -> (ManualClock, TimerQueue<&'static str>) {
        let clock = ManualClock::new();
        let queue = TimerQueue::new(clock.shared());
        (clock, queue)
    }

    #[test]
    fn test_fires_in_deadline_order() {
        let (clock, mut timers) = queue();
        timers.schedule(Duration::from_millis(300), "late");
        timers.schedule(Duration::from_millis(100), "early");
        timers.schedule(Duration::from_millis(100), "early-second");

        assert_eq!(timers.pop_due(), None);

        clock.set_ms(1000);
        assert_eq!(timers.pop_due(), Some("early"));
        assert_eq!(timers.pop_due(), Some("early-second"));
        assert_eq!(timers.pop_due(), Some("late"));
        assert_eq!(timers.pop_due(), None);
        assert!(timers.is_empty());
    }

    #[test]
    fn test_delay_is_relative_to_schedule_time() {
        let (clock, mut timers) = queue();
        clock.set_ms(1000);
        timers.schedule(Duration::from_millis(500), "a");

        assert_eq!(timers.next_due(), Some(Duration::from_millis(1500)));
        clock.set_ms(1499);
        assert_eq!(timers.pop_due(), None);
        clock.set_ms(1500);
        assert_eq!(timers.pop_due(), Some("a"));
    }

    #[test]
    fn test_cancelled_timer_never_fires() {
        let (clock, mut timers) = queue();
        let a = timers.schedule(Duration::from_millis(100), "a");
        let b = timers.schedule(Duration::from_millis(200), "b");

        assert!(timers.cancel(a));
        assert!(!timers.cancel(a));
        assert!(timers.is_pending(b));

        clock.set_ms(500);
        assert_eq!(timers.pop_due(), Some("b"));
        assert!(!timers.cancel(b));
    }

    #[test]
    fn test_cancel_all() {
        let (clock, mut timers) = queue();
        let tokens: Vec<_> = (1..=3)
            .map(|i| timers.schedule(Duration::from_millis(i * 100), "x"))
            .collect();
        timers.schedule(Duration::from_millis(50), "keep");

        timers.cancel_all(tokens);
        assert_eq!(timers.len(), 1);

        clock.set_ms(1000);
        assert_eq!(timers.pop_due(), Some("keep"));
        assert_eq!(timers.pop_due(), None);
    }
}
