//! Ambient audio engine: builds the soundscape, fades it in and out, and
//! tears the graph down once the fade-out has finished.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tracing::{debug, info, warn};

use super::context::{AudioContext, NodeId, ParamKind, SharedContext};
use super::layers::LAYERS;
use super::output::{AudioBackend, OutputHandle};
use crate::error::AudioError;
use crate::params::audio_constants::TEARDOWN_MARGIN_MS;
use crate::params::AmbienceParams;
use crate::timing::{SharedClock, TimerQueue, TimerToken};

/// Background sound driven by the intro sequencer
pub trait Ambience {
    /// Fade in to `volume` over `fade_in_ms`. No-op while running.
    fn start(&mut self, volume: f32, fade_in_ms: u64);

    /// Fade out over `fade_out_ms`, then release everything. No-op while stopped.
    fn stop(&mut self, fade_out_ms: u64);

    fn is_running(&self) -> bool;

    /// Run deferred work that has come due
    fn poll(&mut self);
}

impl<A: Ambience + ?Sized> Ambience for Box<A> {
    fn start(&mut self, volume: f32, fade_in_ms: u64) {
        (**self).start(volume, fade_in_ms)
    }

    fn stop(&mut self, fade_out_ms: u64) {
        (**self).stop(fade_out_ms)
    }

    fn is_running(&self) -> bool {
        (**self).is_running()
    }

    fn poll(&mut self) {
        (**self).poll()
    }
}

/// Ambience that never makes a sound
#[derive(Debug, Default, Clone, Copy)]
pub struct Silence;

impl Ambience for Silence {
    fn start(&mut self, _volume: f32, _fade_in_ms: u64) {}

    fn stop(&mut self, _fade_out_ms: u64) {}

    fn is_running(&self) -> bool {
        false
    }

    fn poll(&mut self) {}
}

enum EngineTimer {
    Teardown,
}

/// Everything one `start` created
struct LiveGraph {
    context: SharedContext,
    master: NodeId,
    nodes: Vec<NodeId>,
    output: OutputHandle,
}

enum EngineState {
    Stopped,
    Playing(LiveGraph),
    FadingOut(LiveGraph, TimerToken),
}

/// Procedural ambience rendered through an [`AudioBackend`]
pub struct AmbientEngine {
    params: AmbienceParams,
    backend: Box<dyn AudioBackend>,
    timers: TimerQueue<EngineTimer>,
    state: EngineState,
}

impl AmbientEngine {
    pub fn new(params: AmbienceParams, backend: Box<dyn AudioBackend>, clock: SharedClock) -> Self {
        Self {
            params,
            backend,
            timers: TimerQueue::new(clock),
            state: EngineState::Stopped,
        }
    }

    /// Context of the live graph, if any
    pub fn context(&self) -> Option<SharedContext> {
        match &self.state {
            EngineState::Playing(live) | EngineState::FadingOut(live, _) => {
                Some(Arc::clone(&live.context))
            }
            EngineState::Stopped => None,
        }
    }

    /// Current master gain, if a graph is live
    pub fn master_level(&self) -> Option<f32> {
        match &self.state {
            EngineState::Playing(live) | EngineState::FadingOut(live, _) => live
                .context
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .param_value(live.master, ParamKind::Gain)
                .ok(),
            EngineState::Stopped => None,
        }
    }

    pub fn is_fading_out(&self) -> bool {
        matches!(self.state, EngineState::FadingOut(..))
    }

    fn build(&mut self, volume: f32, fade_in_ms: u64) -> Result<LiveGraph, AudioError> {
        let mut ctx = AudioContext::new(self.backend.sample_rate()?);

        let master = ctx.create_gain(0.0)?;
        ctx.connect(master, ctx.destination())?;

        let mut nodes = Vec::new();
        for (name, build) in LAYERS {
            let layer = build(&mut ctx, master, &self.params)?;
            debug!(layer = name, nodes = layer.len(), "built ambience layer");
            nodes.extend(layer);
        }

        ctx.ramp_param(
            master,
            ParamKind::Gain,
            volume.clamp(0.0, 1.0),
            fade_in_ms as f64 / 1000.0,
        )?;

        let context = Arc::new(Mutex::new(ctx));
        let output = self.backend.open(Arc::clone(&context))?;

        Ok(LiveGraph {
            context,
            master,
            nodes,
            output,
        })
    }

    fn teardown(live: LiveGraph) {
        let LiveGraph {
            context,
            master,
            nodes,
            output,
        } = live;

        {
            let mut ctx = context.lock().unwrap_or_else(PoisonError::into_inner);
            for &node in &nodes {
                // Every id came from this context, so these cannot fail
                let _ = ctx.stop(node);
                let _ = ctx.disconnect(node);
            }
            let _ = ctx.disconnect(master);
            ctx.close();
        }

        drop(output);
        info!(nodes = nodes.len() + 1, "ambient audio torn down");
    }
}

impl Ambience for AmbientEngine {
    fn start(&mut self, volume: f32, fade_in_ms: u64) {
        if !matches!(self.state, EngineState::Stopped) {
            debug!("ambient audio already running");
            return;
        }

        match self.build(volume, fade_in_ms) {
            Ok(live) => {
                info!(volume, fade_in_ms, "ambient audio started");
                self.state = EngineState::Playing(live);
            }
            Err(e) => warn!("ambient audio unavailable, continuing silently: {e}"),
        }
    }

    fn stop(&mut self, fade_out_ms: u64) {
        let live = match std::mem::replace(&mut self.state, EngineState::Stopped) {
            EngineState::Playing(live) => live,
            other => {
                debug!("ambient audio not playing, stop ignored");
                self.state = other;
                return;
            }
        };

        {
            let mut ctx = live.context.lock().unwrap_or_else(PoisonError::into_inner);
            if let Err(e) = ctx.ramp_param(
                live.master,
                ParamKind::Gain,
                0.0,
                fade_out_ms as f64 / 1000.0,
            ) {
                warn!("failed to schedule fade-out: {e}");
            }
        }

        let token = self.timers.schedule(
            Duration::from_millis(fade_out_ms + TEARDOWN_MARGIN_MS),
            EngineTimer::Teardown,
        );
        debug!(fade_out_ms, "ambient audio fading out");
        self.state = EngineState::FadingOut(live, token);
    }

    fn is_running(&self) -> bool {
        !matches!(self.state, EngineState::Stopped)
    }

    fn poll(&mut self) {
        while let Some(EngineTimer::Teardown) = self.timers.pop_due() {
            match std::mem::replace(&mut self.state, EngineState::Stopped) {
                EngineState::FadingOut(live, _) => Self::teardown(live),
                other => self.state = other,
            }
        }
    }
}

impl Drop for AmbientEngine {
    /// Dropping mid-fade tears down immediately
    fn drop(&mut self) {
        match std::mem::replace(&mut self.state, EngineState::Stopped) {
            EngineState::Playing(live) => Self::teardown(live),
            EngineState::FadingOut(live, token) => {
                self.timers.cancel(token);
                Self::teardown(live);
            }
            EngineState::Stopped => {}
        }
    }
}
