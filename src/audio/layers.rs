//! Procedural soundscape layers.
//!
//! Each layer wires its nodes into the given master bus, starts its sources
//! and returns every node it created, so the engine can tear all of them down
//! uniformly. No layer connects to the destination directly.

use std::sync::Arc;

use super::context::{AudioContext, NodeId, ParamKind};
use super::dsp::{brown_noise, FilterKind};
use crate::error::GraphError;
use crate::params::{AmbienceParams, DroneParams, ShimmerParams, WindParams};

/// Builds one layer into `master`
pub type LayerBuilder =
    fn(&mut AudioContext, NodeId, &AmbienceParams) -> Result<Vec<NodeId>, GraphError>;

/// All layers of the ambience, in build order
pub const LAYERS: [(&str, LayerBuilder); 3] = [
    ("wind", build_wind),
    ("drone", build_drone),
    ("shimmer", build_shimmer),
];

fn build_wind(
    ctx: &mut AudioContext,
    master: NodeId,
    params: &AmbienceParams,
) -> Result<Vec<NodeId>, GraphError> {
    wind(ctx, master, &params.wind)
}

fn build_drone(
    ctx: &mut AudioContext,
    master: NodeId,
    params: &AmbienceParams,
) -> Result<Vec<NodeId>, GraphError> {
    drone(ctx, master, &params.drone)
}

fn build_shimmer(
    ctx: &mut AudioContext,
    master: NodeId,
    params: &AmbienceParams,
) -> Result<Vec<NodeId>, GraphError> {
    shimmer(ctx, master, &params.shimmer)
}

/// Looped brown noise through a low-pass whose cutoff breathes with a slow LFO
pub fn wind(
    ctx: &mut AudioContext,
    master: NodeId,
    params: &WindParams,
) -> Result<Vec<NodeId>, GraphError> {
    let len = (params.buffer_secs * ctx.sample_rate() as f32).max(1.0) as usize;
    let buffer: Arc<[f32]> = brown_noise(len, params.walk_step, params.boost, params.seed).into();

    let source = ctx.create_buffer_source(buffer, true)?;
    let filter = ctx.create_filter(FilterKind::LowPass, params.cutoff_hz, params.q)?;
    let lfo = ctx.create_oscillator(params.lfo_hz)?;
    let lfo_depth = ctx.create_gain(params.lfo_depth_hz)?;
    let gain = ctx.create_gain(params.gain)?;

    ctx.connect(lfo, lfo_depth)?;
    ctx.connect_param(lfo_depth, filter, ParamKind::Frequency)?;
    ctx.connect(source, filter)?;
    ctx.connect(filter, gain)?;
    ctx.connect(gain, master)?;

    ctx.start(lfo)?;
    ctx.start(source)?;

    Ok(vec![source, filter, lfo, lfo_depth, gain])
}

/// Sustained tones, each doubled by a detuned companion, each with its own tremolo
pub fn drone(
    ctx: &mut AudioContext,
    master: NodeId,
    params: &DroneParams,
) -> Result<Vec<NodeId>, GraphError> {
    let mut nodes = Vec::with_capacity(params.frequencies_hz.len() * 5);

    for (i, &hz) in params.frequencies_hz.iter().enumerate() {
        let osc = ctx.create_oscillator(hz)?;
        let detuned = ctx.create_oscillator(hz * params.detune_ratio)?;
        let tone_gain = ctx.create_gain(params.tone_gain(i))?;
        let tremolo = ctx.create_oscillator(params.tremolo_hz(i))?;
        let tremolo_depth = ctx.create_gain(params.tremolo_depth)?;

        ctx.connect(tremolo, tremolo_depth)?;
        ctx.connect_param(tremolo_depth, tone_gain, ParamKind::Gain)?;
        ctx.connect(osc, tone_gain)?;
        ctx.connect(detuned, tone_gain)?;
        ctx.connect(tone_gain, master)?;

        ctx.start(osc)?;
        ctx.start(detuned)?;
        ctx.start(tremolo)?;

        nodes.extend([osc, detuned, tremolo, tremolo_depth, tone_gain]);
    }

    Ok(nodes)
}

/// Faint high tone through a narrow band-pass, slowly amplitude modulated
pub fn shimmer(
    ctx: &mut AudioContext,
    master: NodeId,
    params: &ShimmerParams,
) -> Result<Vec<NodeId>, GraphError> {
    let osc = ctx.create_oscillator(params.tone_hz)?;
    let filter = ctx.create_filter(FilterKind::BandPass, params.band_hz, params.q)?;
    let gain = ctx.create_gain(params.gain)?;
    let lfo = ctx.create_oscillator(params.lfo_hz)?;
    let lfo_depth = ctx.create_gain(params.lfo_depth)?;

    ctx.connect(lfo, lfo_depth)?;
    ctx.connect_param(lfo_depth, gain, ParamKind::Gain)?;
    ctx.connect(osc, filter)?;
    ctx.connect(filter, gain)?;
    ctx.connect(gain, master)?;

    ctx.start(osc)?;
    ctx.start(lfo)?;

    Ok(vec![osc, filter, gain, lfo, lfo_depth])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::context::{Playback, Target};

    fn context_with_master() -> (AudioContext, NodeId) {
        let mut ctx = AudioContext::new(8000);
        let master = ctx.create_gain(1.0).unwrap();
        ctx.connect(master, ctx.destination()).unwrap();
        (ctx, master)
    }

    #[test]
    fn test_layers_only_feed_the_master() {
        let params = AmbienceParams::default();

        for (name, build) in LAYERS {
            let (mut ctx, master) = context_with_master();
            let nodes = build(&mut ctx, master, &params).unwrap();
            assert!(!nodes.is_empty(), "{name}");

            for node in &nodes {
                assert!(
                    !ctx.connections_from(*node)
                        .contains(&Target::Node(ctx.destination())),
                    "{name} node {node:?} bypasses the master"
                );
            }
            let into_master = nodes
                .iter()
                .filter(|n| ctx.connections_from(**n).contains(&Target::Node(master)))
                .count();
            assert!(into_master >= 1, "{name} never reaches the master");
        }
    }

    #[test]
    fn test_drone_builds_five_nodes_per_tone() {
        let (mut ctx, master) = context_with_master();
        let params = DroneParams::default();

        let nodes = drone(&mut ctx, master, &params).unwrap();
        assert_eq!(nodes.len(), params.frequencies_hz.len() * 5);

        let into_master = nodes
            .iter()
            .filter(|n| ctx.connections_from(**n).contains(&Target::Node(master)))
            .count();
        assert_eq!(into_master, params.frequencies_hz.len());
    }

    #[test]
    fn test_sources_are_started() {
        let (mut ctx, master) = context_with_master();
        let nodes = wind(&mut ctx, master, &WindParams::default()).unwrap();

        // Buffer source and LFO play; the filter and gains are not sources
        let playing = nodes
            .iter()
            .filter(|n| ctx.playback(**n) == Ok(Playback::Playing))
            .count();
        assert_eq!(playing, 2);
    }

    #[test]
    fn test_full_soundscape_is_audible_and_bounded() {
        let (mut ctx, master) = context_with_master();
        let params = AmbienceParams::default();
        for (_, build) in LAYERS {
            build(&mut ctx, master, &params).unwrap();
        }

        let mut out = vec![0.0; 8000];
        ctx.render(&mut out);

        let peak = out.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
        assert!(peak > 0.01, "peak {peak}");
        assert!(peak < 4.0, "peak {peak}");
        assert!(out.iter().all(|s| s.is_finite()));
    }
}
