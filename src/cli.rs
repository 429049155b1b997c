//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::params::{FadeParams, IntroConfig, ScheduleVariant};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "manifestorium")]
#[command(about = "The Manifestorium threshold intro with procedural ambience", long_about = None)]
pub struct Args {
    /// Phase timing: threshold (default), brief
    #[arg(long, value_name = "VARIANT", default_value = "threshold")]
    pub variant: String,

    /// Play the intro again even if it was already shown this session
    #[arg(long)]
    pub replay: bool,

    /// Run the intro without sound
    #[arg(long)]
    pub mute: bool,

    /// Master volume reached after the fade-in (0-1)
    #[arg(long, value_name = "LEVEL", default_value = "0.15")]
    pub volume: f32,

    /// Render the ambience offline to a WAV file (duration in seconds)
    #[arg(long, value_name = "SECONDS")]
    pub render: Option<f32>,

    /// Output path for --render
    #[arg(long, value_name = "PATH", default_value = "ambience.wav")]
    pub output: PathBuf,

    /// Print spectral band levels of the ambience (duration in seconds)
    #[arg(long, value_name = "SECONDS")]
    pub analyze: Option<f32>,

    /// Log debug output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Parse the schedule variant, falling back to the default on unknown names
    pub fn parse_variant(&self) -> ScheduleVariant {
        self.variant.parse().unwrap_or_else(|e| {
            eprintln!("Warning: {e}, using threshold");
            ScheduleVariant::default()
        })
    }

    /// Master envelope with the command-line volume applied
    pub fn fades(&self) -> FadeParams {
        FadeParams {
            volume: self.volume.clamp(0.0, 1.0),
            ..FadeParams::default()
        }
    }

    pub fn intro_config(&self) -> IntroConfig {
        IntroConfig {
            fades: self.fades(),
            ..self.parse_variant().config()
        }
    }

    /// Default log filter when `RUST_LOG` is unset
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "manifestorium=debug"
        } else {
            "warn"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["manifestorium"]).unwrap();

        assert_eq!(args.parse_variant(), ScheduleVariant::Threshold);
        assert!(!args.replay && !args.mute);
        assert_eq!(args.fades(), FadeParams::default());
        assert_eq!(args.intro_config().auto_complete_ms, 15_000);
        assert_eq!(args.log_filter(), "warn");
    }

    #[test]
    fn test_variant_and_volume() {
        let args = Args::try_parse_from([
            "manifestorium",
            "--variant",
            "brief",
            "--volume",
            "2.0",
            "--replay",
            "-v",
        ])
        .unwrap();

        let config = args.intro_config();
        assert_eq!(config.auto_complete_ms, 8_000);
        assert_eq!(config.fades.volume, 1.0);
        assert!(config.validate().is_ok());
        assert!(args.replay);
        assert_eq!(args.log_filter(), "manifestorium=debug");
    }

    #[test]
    fn test_unknown_variant_falls_back() {
        let args = Args::try_parse_from(["manifestorium", "--variant", "cinematic"]).unwrap();
        assert_eq!(args.parse_variant(), ScheduleVariant::Threshold);
    }

    #[test]
    fn test_render_options() {
        let args =
            Args::try_parse_from(["manifestorium", "--render", "12.5", "--output", "out.wav"])
                .unwrap();
        assert_eq!(args.render, Some(12.5));
        assert_eq!(args.output, PathBuf::from("out.wav"));
    }
}
