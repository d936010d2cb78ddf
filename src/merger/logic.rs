use super::{MergerCore, SharedNode};
use crate::condition::ConfigError;
use crate::node::{EventFifo, LogicNode};
use crate::{SampleIndex, Tag};
use serde::{Deserialize, Serialize};

/// Boolean operation applied across a logic merger's inputs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum MergeMode {
    #[default]
    #[strum(to_string = "and")]
    And,
    #[strum(to_string = "or")]
    Or,
}

impl MergeMode {
    pub fn code(self) -> i32 {
        match self {
            Self::And => 0,
            Self::Or => 1,
        }
    }

    fn identity(self) -> bool {
        matches!(self, Self::And)
    }

    fn fold(self, accumulator: bool, level: bool) -> bool {
        match self {
            Self::And => accumulator && level,
            Self::Or => accumulator || level,
        }
    }
}

impl TryFrom<i32> for MergeMode {
    type Error = ConfigError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::And),
            1 => Ok(Self::Or),
            other => Err(ConfigError::UnknownMergeMode(other)),
        }
    }
}

/// Fan-in node computing a boolean AND or OR over its inputs.
///
/// One output event is emitted per distinct input timestamp, carrying
/// the fold of every input's latest acknowledged level; unchanged
/// output levels are not suppressed. Input tags are stripped, since
/// input events do not map 1:1 to output events.
pub struct LogicMerger {
    output: EventFifo,
    core: MergerCore,
    mode: MergeMode,
}

impl Default for LogicMerger {
    fn default() -> Self {
        Self::new(MergeMode::And)
    }
}

impl LogicMerger {
    pub fn new(mode: MergeMode) -> Self {
        Self {
            output: EventFifo::new(),
            core: MergerCore::new(),
            mode,
        }
    }

    pub fn set_merge_mode(&mut self, mode: MergeMode) {
        self.mode = mode;
    }

    pub fn merge_mode(&self) -> MergeMode {
        self.mode
    }

    pub fn clear_input_list(&mut self) {
        self.core.clear_input_list();
    }

    pub fn add_input(&mut self, source: &SharedNode, id_tag: Tag) {
        self.core.add_input(source, id_tag);
    }

    pub fn have_pending_input(&self) -> bool {
        self.core.have_pending_input()
    }

    pub fn find_next_input_time(&self) -> Option<SampleIndex> {
        self.core.find_next_input_time()
    }

    /// Pulls and merges input events up to and including `until`.
    pub fn process_pending_input_until(&mut self, until: SampleIndex) {
        while let Some(time) = self.core.find_next_input_time().filter(|&t| t <= until) {
            self.core.acknowledge_inputs_until(time);

            let mut level = self.mode.identity();
            for input in self.core.inputs() {
                if let Some(node) = input.upgrade() {
                    level = self
                        .mode
                        .fold(level, node.borrow().fifo().last_acknowledged_level());
                }
            }

            self.output.enqueue_output(time, level, 0);
        }
    }
}

impl LogicNode for LogicMerger {
    fn fifo(&self) -> &EventFifo {
        &self.output
    }

    fn fifo_mut(&mut self) -> &mut EventFifo {
        &mut self.output
    }

    fn handle_input(&mut self, time: SampleIndex, level: bool, tag: Tag) {
        self.output.handle_input(time, level, tag);
    }

    fn advance_to_time(&mut self, time: SampleIndex) {
        self.process_pending_input_until(time);
    }

    fn clear_buffer(&mut self) {
        self.output.clear_buffer();
        self.core.clear_inputs();
    }
}
