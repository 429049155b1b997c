//! Intro phase schedule configuration.

use std::str::FromStr;
use std::time::Duration;

use super::FadeParams;
use crate::error::ConfigError;

/// Session storage key recording that the intro has been shown
pub const SESSION_KEY: &str = "hasSeenThreshold";

/// One scheduled phase advance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseStep {
    /// Phase reached when the step fires (1-based, consecutive)
    pub phase: u32,

    /// Delay from activation (milliseconds)
    pub delay_ms: u64,
}

impl PhaseStep {
    pub const fn new(phase: u32, delay_ms: u64) -> Self {
        Self { phase, delay_ms }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Intro sequencing configuration
#[derive(Debug, Clone)]
pub struct IntroConfig {
    /// Content phases in firing order
    pub steps: Vec<PhaseStep>,

    /// Fallback auto-complete delay from activation (milliseconds)
    /// Behaves exactly like the user pressing Enter
    pub auto_complete_ms: u64,

    /// Session storage key for the "already seen" flag
    pub session_key: String,

    /// Ambience envelope while the intro plays
    pub fades: FadeParams,
}

impl Default for IntroConfig {
    fn default() -> Self {
        ScheduleVariant::Threshold.config()
    }
}

impl IntroConfig {
    /// Terminal phase, one past the last content phase
    pub fn max_phase(&self) -> u32 {
        self.steps.len() as u32 + 1
    }

    /// Last content phase (where Enter is offered)
    pub fn final_content_phase(&self) -> u32 {
        self.steps.len() as u32
    }

    pub fn auto_complete(&self) -> Duration {
        Duration::from_millis(self.auto_complete_ms)
    }

    /// Validate configuration (phases consecutive from 1, delays increasing)
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.fades.validate()?;
        if self.steps.is_empty() {
            return Err(ConfigError::EmptySchedule);
        }

        let mut last_ms = None;
        for (index, step) in self.steps.iter().enumerate() {
            let expected = index as u32 + 1;
            if step.phase != expected {
                return Err(ConfigError::PhaseOrder {
                    index,
                    expected,
                    found: step.phase,
                });
            }
            if last_ms.is_some_and(|last| step.delay_ms <= last) {
                return Err(ConfigError::DelayOrder {
                    index,
                    delay_ms: step.delay_ms,
                });
            }
            last_ms = Some(step.delay_ms);
        }

        let last_ms = last_ms.unwrap_or_default();
        if self.auto_complete_ms <= last_ms {
            return Err(ConfigError::AutoCompleteTooEarly {
                auto_ms: self.auto_complete_ms,
                last_ms,
            });
        }
        Ok(())
    }
}

/// Named phase timings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScheduleVariant {
    /// Slow, dramatic reveal with a 15 second fallback
    #[default]
    Threshold,

    /// Compressed reveal with an 8 second fallback
    Brief,
}

impl ScheduleVariant {
    pub fn steps(self) -> Vec<PhaseStep> {
        match self {
            // First line, title reveal, tagline + Enter
            Self::Threshold => vec![
                PhaseStep::new(1, 800),
                PhaseStep::new(2, 3500),
                PhaseStep::new(3, 6500),
            ],
            Self::Brief => vec![
                PhaseStep::new(1, 500),
                PhaseStep::new(2, 2500),
                PhaseStep::new(3, 5000),
            ],
        }
    }

    pub fn auto_complete_ms(self) -> u64 {
        match self {
            Self::Threshold => 15_000,
            Self::Brief => 8_000,
        }
    }

    pub fn config(self) -> IntroConfig {
        IntroConfig {
            steps: self.steps(),
            auto_complete_ms: self.auto_complete_ms(),
            session_key: SESSION_KEY.to_string(),
            fades: FadeParams::default(),
        }
    }
}

impl FromStr for ScheduleVariant {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "threshold" => Ok(Self::Threshold),
            "brief" => Ok(Self::Brief),
            other => Err(ConfigError::UnknownVariant(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variants_validate() {
        for variant in [ScheduleVariant::Threshold, ScheduleVariant::Brief] {
            let config = variant.config();
            assert!(config.validate().is_ok(), "{variant:?}");
            assert_eq!(config.max_phase(), 4);
            assert_eq!(config.final_content_phase(), 3);
        }
    }

    #[test]
    fn test_rejects_out_of_order_phases() {
        let config = IntroConfig {
            steps: vec![PhaseStep::new(1, 100), PhaseStep::new(3, 200)],
            auto_complete_ms: 1000,
            session_key: SESSION_KEY.to_string(),
            fades: FadeParams::default(),
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::PhaseOrder {
                index: 1,
                expected: 2,
                found: 3
            })
        );
    }

    #[test]
    fn test_rejects_non_increasing_delays() {
        let config = IntroConfig {
            steps: vec![PhaseStep::new(1, 500), PhaseStep::new(2, 500)],
            auto_complete_ms: 1000,
            session_key: SESSION_KEY.to_string(),
            fades: FadeParams::default(),
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DelayOrder { index: 1, .. })
        ));
    }

    #[test]
    fn test_rejects_early_auto_complete() {
        let mut config = ScheduleVariant::Brief.config();
        config.auto_complete_ms = 5000;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::AutoCompleteTooEarly { .. })
        ));

        config.steps.clear();
        assert_eq!(config.validate(), Err(ConfigError::EmptySchedule));
    }

    #[test]
    fn test_variant_from_str() {
        assert_eq!("BRIEF".parse::<ScheduleVariant>(), Ok(ScheduleVariant::Brief));
        assert!(matches!(
            "cinematic".parse::<ScheduleVariant>(),
            Err(ConfigError::UnknownVariant(_))
        ));
    }
}
