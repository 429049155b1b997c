//! Threshold intro sequencer.
//!
//! States run `Idle → Running → Completing → Done`. An activation either
//! finds the session flag already set and completes at once, or starts the
//! ambience and arms one timer per phase plus an auto-complete fallback.
//! Every exit path (Enter, Skip, auto-complete) cancels the live timer
//! generation before the completion callback runs.

use tracing::{debug, info};

use crate::audio::Ambience;
use crate::error::ConfigError;
use crate::params::IntroConfig;
use crate::session::{SessionFlag, SessionStore};
use crate::timing::{SharedClock, TimerQueue, TimerToken};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntroState {
    Idle,
    Running,
    Completing,
    Done,
}

/// How the last activation finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// Session flag was already set; nothing was shown
    AlreadySeen,
    Enter,
    Skip,
    AutoComplete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PhaseTimer {
    Advance(u32),
    AutoComplete,
}

/// Drives one intro at a time
pub struct IntroSequencer<S, A> {
    config: IntroConfig,
    flag: SessionFlag<S>,
    audio: A,
    timers: TimerQueue<PhaseTimer>,
    generation: Vec<TimerToken>,
    state: IntroState,
    phase: u32,
    exit: Option<ExitReason>,
    on_complete: Option<Box<dyn FnMut()>>,
}

impl<S: SessionStore, A: Ambience> IntroSequencer<S, A> {
    pub fn new(
        config: IntroConfig,
        store: S,
        audio: A,
        clock: SharedClock,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let flag = SessionFlag::new(store, config.session_key.clone());
        Ok(Self {
            config,
            flag,
            audio,
            timers: TimerQueue::new(clock),
            generation: Vec::new(),
            state: IntroState::Idle,
            phase: 0,
            exit: None,
            on_complete: None,
        })
    }

    pub fn state(&self) -> IntroState {
        self.state
    }

    pub fn phase(&self) -> u32 {
        self.phase
    }

    pub fn exit_reason(&self) -> Option<ExitReason> {
        self.exit
    }

    pub fn is_done(&self) -> bool {
        self.state == IntroState::Done
    }

    pub fn audio(&self) -> &A {
        &self.audio
    }

    pub fn store(&self) -> &S {
        self.flag.store()
    }

    /// Timers of the live generation still waiting to fire
    pub fn pending_timers(&self) -> usize {
        self.generation
            .iter()
            .filter(|t| self.timers.is_pending(**t))
            .count()
    }

    /// Start the intro and register the completion callback.
    ///
    /// While an intro is already running this is a no-op. When the intro is
    /// already done, the new callback fires immediately.
    pub fn activate(&mut self, on_complete: impl FnMut() + 'static) {
        match self.state {
            IntroState::Running | IntroState::Completing => {
                debug!(state = ?self.state, "intro already active, activate ignored");
            }
            IntroState::Done => {
                self.on_complete = Some(Box::new(on_complete));
                self.notify();
            }
            IntroState::Idle => {
                self.on_complete = Some(Box::new(on_complete));
                self.begin();
            }
        }
    }

    /// User confirmed entry
    pub fn enter(&mut self) {
        self.finish(ExitReason::Enter);
    }

    /// User skipped the remaining phases
    pub fn skip(&mut self) {
        self.finish(ExitReason::Skip);
    }

    /// Forget that the intro was seen and play it again from phase 0
    pub fn replay(&mut self) {
        self.timers.cancel_all(self.generation.drain(..));
        self.flag.clear();
        self.state = IntroState::Idle;
        info!("intro replay requested");
        self.begin();
    }

    /// Fire due timers and let the ambience run its deferred work
    pub fn poll(&mut self) {
        while let Some(timer) = self.timers.pop_due() {
            match timer {
                PhaseTimer::Advance(phase) => self.advance_to(phase),
                PhaseTimer::AutoComplete => {
                    self.advance_to(self.config.max_phase());
                    self.finish(ExitReason::AutoComplete);
                }
            }
        }
        self.audio.poll();
    }

    fn begin(&mut self) {
        self.phase = 0;
        self.exit = None;

        if self.flag.is_set() {
            info!("intro already seen this session");
            self.exit = Some(ExitReason::AlreadySeen);
            self.state = IntroState::Done;
            self.notify();
            return;
        }

        self.state = IntroState::Running;
        let fades = self.config.fades;
        self.audio.start(fades.volume, fades.fade_in_ms);

        for step in &self.config.steps {
            let token = self
                .timers
                .schedule(step.delay(), PhaseTimer::Advance(step.phase));
            self.generation.push(token);
        }
        let token = self
            .timers
            .schedule(self.config.auto_complete(), PhaseTimer::AutoComplete);
        self.generation.push(token);

        info!(
            phases = self.config.steps.len(),
            auto_complete_ms = self.config.auto_complete_ms,
            "intro started"
        );
    }

    fn advance_to(&mut self, phase: u32) {
        if self.state != IntroState::Running {
            return;
        }
        let phase = phase.min(self.config.max_phase());
        if phase > self.phase {
            self.phase = phase;
            debug!(phase, "intro phase advanced");
        }
    }

    fn finish(&mut self, reason: ExitReason) {
        if self.state != IntroState::Running {
            debug!(?reason, state = ?self.state, "intro not running, exit ignored");
            return;
        }

        self.state = IntroState::Completing;
        self.timers.cancel_all(self.generation.drain(..));
        self.flag.set();
        self.audio.stop(self.config.fades.fade_out_ms);
        self.exit = Some(reason);
        self.state = IntroState::Done;

        info!(?reason, phase = self.phase, "intro complete");
        self.notify();
    }

    fn notify(&mut self) {
        if let Some(on_complete) = self.on_complete.as_mut() {
            on_complete();
        }
    }
}
