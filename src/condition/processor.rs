use super::config::{ConditionConfig, TriggerFeature};
use crate::node::{EventFifo, LogicNode};
use crate::{SampleIndex, Tag, BOGUS_TIMESTAMP};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::debug;

/// Condition processing for one line: deglitching, edge/level trigger
/// selection, and delayed monostable pulse generation with dead time.
///
/// Input events are buffered internally so that a level change can be
/// proven stable before it is acted on; nothing is evaluated until
/// [`advance_to_time`] is called. Output pulses are a rising transition
/// to the configured active level followed by a falling transition back,
/// `sustain` samples apart. Input tags are stripped, since input events
/// do not map 1:1 to output pulses.
///
/// [`advance_to_time`]: LogicNode::advance_to_time
pub struct ConditionProcessor {
    config: ConditionConfig,
    output: EventFifo,
    stage: EventFifo,
    rng: StdRng,
    /// No earlier sample at which the current level counts as stable.
    next_stable_time: SampleIndex,
    /// No earlier sample at which a new trigger is permitted.
    next_ready_time: SampleIndex,
    /// A level change whose persistence is not yet proven.
    pending_change: Option<(SampleIndex, bool)>,
}

impl Default for ConditionProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl ConditionProcessor {
    pub fn new() -> Self {
        Self::with_config(ConditionConfig::default())
    }

    pub fn with_config(config: ConditionConfig) -> Self {
        let mut processor = Self {
            config: ConditionConfig::default(),
            output: EventFifo::new(),
            stage: EventFifo::new(),
            rng: StdRng::from_entropy(),
            next_stable_time: BOGUS_TIMESTAMP,
            next_ready_time: BOGUS_TIMESTAMP,
            pending_change: None,
        };
        processor.set_config(config);
        processor
    }

    /// Installs a configuration, forcing it sane first, and resets
    /// buffered and trigger state. Compare with [`config`] afterwards to
    /// detect clamping.
    ///
    /// [`config`]: ConditionProcessor::config
    pub fn set_config(&mut self, config: ConditionConfig) {
        let mut config = config;
        config.force_sanity();
        self.config = config;
        self.clear_buffer();
        self.reset_trigger();
    }

    pub fn config(&self) -> ConditionConfig {
        self.config
    }

    /// Reseeds the delay generator for reproducible pulse timing.
    pub fn seed_random(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Clears trigger scheduling history.
    pub fn reset_trigger(&mut self) {
        self.next_stable_time = BOGUS_TIMESTAMP;
        self.next_ready_time = BOGUS_TIMESTAMP;
        self.pending_change = None;
    }

    /// Deglitch filter for released input events. A level change only
    /// reaches trigger evaluation once it has persisted for the
    /// deglitch interval; a change that reverts inside its window never
    /// happened.
    fn filter_released(&mut self, time: SampleIndex, level: bool) {
        if let Some((change_time, change_level)) = self.pending_change {
            if time >= change_time + self.config.deglitch {
                // The change survived its window.
                self.pending_change = None;
                self.evaluate_at(change_time, change_level);
            } else if level == change_level {
                // Repeat inside the window; proves nothing new.
                return;
            } else {
                // Reverted inside the window.
                self.pending_change = None;
                self.evaluate_at(time, level);
                return;
            }
        }
        if self.config.deglitch > 0 && level != self.output.last_input_level() {
            self.pending_change = Some((time, level));
        } else {
            self.evaluate_at(time, level);
        }
    }

    fn evaluate_at(&mut self, time: SampleIndex, level: bool) {
        self.run_phantoms_until(time);
        self.check_for_trigger(time, level);
    }

    /// Evaluates phantom points (becoming stable, becoming ready) up to
    /// `bound`, replaying the last seen level. Becoming stable can only
    /// happen once per edge, but re-triggering recurs every dead time.
    fn run_phantoms_until(&mut self, bound: SampleIndex) {
        loop {
            let prev_time = self.output.last_input_time();
            let prev_level = self.output.last_input_level();
            let due = [self.next_stable_time, self.next_ready_time]
                .into_iter()
                .filter(|&t| t > prev_time && t <= bound)
                .min();
            match due {
                Some(time) => self.check_for_trigger(time, prev_level),
                None => break,
            }
        }
    }

    /// Tests the trigger condition at one evaluation point and schedules
    /// an output pulse if it holds.
    fn check_for_trigger(&mut self, this_time: SampleIndex, this_level: bool) {
        let have_rising = this_level && !self.output.last_input_level();
        let have_falling = !this_level && self.output.last_input_level();

        let is_stable = this_time >= self.next_stable_time;
        let is_ready = this_time >= self.next_ready_time;

        if have_rising || have_falling {
            self.next_stable_time = this_time + self.config.deglitch;
        }

        if is_stable && is_ready {
            let want_assert = match self.config.feature {
                TriggerFeature::LevelHigh => this_level,
                TriggerFeature::LevelLow => !this_level,
                TriggerFeature::EdgeRising => have_rising,
                TriggerFeature::EdgeFalling => have_falling,
            };

            if want_assert {
                self.next_ready_time = this_time + self.config.dead_time;

                let delay = self.draw_delay();
                let level = self.config.output_active_high;
                debug!(
                    "pulsing {} from {} to {} (trigger {})",
                    if level { "high" } else { "low" },
                    this_time + delay,
                    this_time + delay + self.config.sustain,
                    this_time
                );
                self.output.enqueue_output(this_time + delay, level, 0);
                self.output
                    .enqueue_output(this_time + delay + self.config.sustain, !level, 0);
            }
        }

        self.output.set_prev_input(this_time, this_level, 0);
    }

    fn draw_delay(&mut self) -> SampleIndex {
        let span = 1 + self.config.delay_max - self.config.delay_min;
        let mut raw: i64 = self.rng.gen();
        // Fold negative draws; some remainder implementations adopt the
        // dividend's sign.
        if raw < 0 {
            raw = -(raw + 1);
        }
        raw % span + self.config.delay_min
    }
}

impl LogicNode for ConditionProcessor {
    fn fifo(&self) -> &EventFifo {
        &self.output
    }

    fn fifo_mut(&mut self) -> &mut EventFifo {
        &mut self.output
    }

    fn handle_input(&mut self, time: SampleIndex, level: bool, _tag: Tag) {
        self.stage.handle_input(time, level, 0);
    }

    fn advance_to_time(&mut self, new_time: SampleIndex) {
        // Events can only be evaluated once their full deglitch
        // look-ahead window has been seen.
        let horizon = new_time - self.config.deglitch;

        while self.stage.has_pending_output() && self.stage.peek_next_output_time() <= horizon {
            let time = self.stage.peek_next_output_time();
            // Staged events sharing a timestamp collapse to their final
            // value.
            while self.stage.has_pending_output() && self.stage.peek_next_output_time() == time {
                self.stage.acknowledge_output();
            }
            let level = self.stage.last_acknowledged_level();
            self.filter_released(time, level);
        }

        // A pending change commits once its window is fully visible and
        // nothing contradicted it.
        if let Some((change_time, change_level)) = self.pending_change {
            let settled = !self.stage.has_pending_output()
                || self.stage.peek_next_output_time() >= change_time + self.config.deglitch;
            if settled {
                self.pending_change = None;
                self.evaluate_at(change_time, change_level);
            }
        }

        let bound = match self.pending_change {
            Some((change_time, _)) => change_time,
            None => horizon,
        };
        self.run_phantoms_until(bound);
    }

    fn clear_buffer(&mut self) {
        self.stage.clear_buffer();
        self.output.clear_buffer();
        // Idle output reflects the configured polarity.
        self.output
            .set_acknowledged_level(!self.config.output_active_high);
        self.pending_change = None;
    }
}
