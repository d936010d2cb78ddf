pub mod logic;
pub mod mux;

pub use logic::{LogicMerger, MergeMode};
pub use mux::MuxMerger;

use crate::node::LogicNode;
use crate::{SampleIndex, Tag};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Shared handle to a node in a processing graph. Graph owners keep the
/// strong references; mergers hold weak links to their inputs and never
/// destroy them.
pub type SharedNode = Rc<RefCell<dyn LogicNode>>;

pub(crate) struct MergerInput {
    node: Weak<RefCell<dyn LogicNode>>,
    id_tag: Tag,
}

impl MergerInput {
    pub(crate) fn upgrade(&self) -> Option<Rc<RefCell<dyn LogicNode>>> {
        self.node.upgrade()
    }

    pub(crate) fn id_tag(&self) -> Tag {
        self.id_tag
    }
}

/// Input-list machinery shared by the fan-in nodes. Mergers work by
/// pulling, to avoid needing input buffers of their own; a dangling
/// input slot is skipped silently so inputs can be pre-allocated and
/// filled later.
pub(crate) struct MergerCore {
    inputs: Vec<MergerInput>,
}

impl MergerCore {
    pub(crate) fn new() -> Self {
        Self { inputs: Vec::new() }
    }

    pub(crate) fn clear_input_list(&mut self) {
        self.inputs.clear();
    }

    pub(crate) fn add_input(&mut self, source: &SharedNode, id_tag: Tag) {
        self.inputs.push(MergerInput {
            node: Rc::downgrade(source),
            id_tag,
        });
    }

    pub(crate) fn inputs(&self) -> &[MergerInput] {
        &self.inputs
    }

    /// Cascades a buffer clear to every live input.
    pub(crate) fn clear_inputs(&mut self) {
        for input in &self.inputs {
            if let Some(node) = input.upgrade() {
                node.borrow_mut().clear_buffer();
            }
        }
    }

    pub(crate) fn have_pending_input(&self) -> bool {
        self.inputs.iter().any(|input| {
            input
                .upgrade()
                .map_or(false, |node| node.borrow().fifo().has_pending_output())
        })
    }

    /// Earliest timestamp pending across all live inputs.
    pub(crate) fn find_next_input_time(&self) -> Option<SampleIndex> {
        self.inputs
            .iter()
            .filter_map(|input| {
                let node = input.upgrade()?;
                let node = node.borrow();
                node.fifo()
                    .has_pending_output()
                    .then(|| node.fifo().peek_next_output_time())
            })
            .min()
    }

    /// Acknowledges every input event at or before `time`, updating each
    /// input's acknowledged record. Produces no output of its own.
    pub(crate) fn acknowledge_inputs_until(&mut self, time: SampleIndex) {
        for input in &self.inputs {
            if let Some(node) = input.upgrade() {
                let mut node = node.borrow_mut();
                let fifo = node.fifo_mut();
                while fifo.has_pending_output() && fifo.peek_next_output_time() <= time {
                    fifo.acknowledge_output();
                }
            }
        }
    }
}
