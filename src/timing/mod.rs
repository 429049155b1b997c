//! Time sources and one-shot timers.
//!
//! Everything that happens "later" in the intro (phase advances, the
//! auto-complete fallback, audio teardown after a fade) is a one-shot timer
//! on a [`TimerQueue`]. The queue reads time from a [`Clock`], so tests drive
//! it with a [`ManualClock`] and the binary with a [`SystemClock`].

mod clock;
mod timers;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use timers::{TimerQueue, TimerToken};
