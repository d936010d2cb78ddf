use crate::SampleIndex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown trigger feature code {0}")]
    UnknownFeature(i32),
    #[error("unknown merge mode code {0}")]
    UnknownMergeMode(i32),
}

/// What a condition processor looks for on its input line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum TriggerFeature {
    #[default]
    #[strum(to_string = "level-high")]
    LevelHigh,
    #[strum(to_string = "level-low")]
    LevelLow,
    #[strum(to_string = "edge-rising")]
    EdgeRising,
    #[strum(to_string = "edge-falling")]
    EdgeFalling,
}

impl TriggerFeature {
    pub fn code(self) -> i32 {
        match self {
            Self::LevelHigh => 0,
            Self::LevelLow => 1,
            Self::EdgeRising => 2,
            Self::EdgeFalling => 3,
        }
    }
}

impl TryFrom<i32> for TriggerFeature {
    type Error = ConfigError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::LevelHigh),
            1 => Ok(Self::LevelLow),
            2 => Ok(Self::EdgeRising),
            3 => Ok(Self::EdgeFalling),
            other => Err(ConfigError::UnknownFeature(other)),
        }
    }
}

/// Settings for processing conditions on one line.
///
/// All times are in samples. External editing of the fields is fine;
/// [`force_sanity`] makes a configuration valid and self-consistent
/// before a processor uses it.
///
/// [`force_sanity`]: ConditionConfig::force_sanity
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionConfig {
    pub feature: TriggerFeature,
    /// Inclusive range the output pulse delay is drawn from.
    pub delay_min: SampleIndex,
    pub delay_max: SampleIndex,
    /// Output pulse width.
    pub sustain: SampleIndex,
    /// Minimum interval between successive trigger assertions.
    pub dead_time: SampleIndex,
    /// Number of samples a level must persist before it counts as stable.
    pub deglitch: SampleIndex,
    pub output_active_high: bool,
}

impl Default for ConditionConfig {
    fn default() -> Self {
        Self {
            feature: TriggerFeature::LevelHigh,
            delay_min: 0,
            delay_max: 0,
            sustain: 10,
            dead_time: 100,
            deglitch: 0,
            output_active_high: true,
        }
    }
}

impl ConditionConfig {
    /// Restores the known-sane default state.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Forces the parameters to be valid and self-consistent.
    ///
    /// A delay shorter than the deglitch interval would require seeing
    /// the future, and a dead time shorter than the maximum pulse
    /// footprint would allow overlapping pulses; both are clamped.
    pub fn force_sanity(&mut self) {
        if self.sustain < 1 {
            self.sustain = 1;
        }
        if self.deglitch < 0 {
            self.deglitch = 0;
        }
        if self.delay_min < self.deglitch {
            self.delay_min = self.deglitch;
        }
        if self.delay_max < self.delay_min {
            self.delay_max = self.delay_min;
        }
        if self.dead_time < self.delay_max + self.sustain {
            self.dead_time = self.delay_max + self.sustain;
        }
    }
}
