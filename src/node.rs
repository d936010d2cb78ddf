use crate::buffer::CircularBuffer;
use crate::{SampleIndex, Tag, BOGUS_TIMESTAMP, EVENT_BUFFER_SIZE};
use tracing::warn;

/// One edge event on the sample timeline: a line level taking effect at a
/// sample index, labelled with an integer tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Event {
    pub time: SampleIndex,
    pub level: bool,
    pub tag: Tag,
}

impl Event {
    pub(crate) fn bogus() -> Self {
        Self {
            time: BOGUS_TIMESTAMP,
            level: false,
            tag: 0,
        }
    }
}

/// Buffered event handling shared by every node in a processing graph.
///
/// An `EventFifo` holds pending output events column-wise in three
/// parallel circular buffers, together with a record of the last input it
/// observed and the last output a consumer acknowledged. Used directly it
/// acts as a pass-through: [`handle_input`] copies each input event
/// straight to the pending output.
///
/// The acknowledged record doubles as the node's currently-asserted
/// level for pull-based consumers.
///
/// [`handle_input`]: EventFifo::handle_input
#[derive(Clone, Debug)]
pub struct EventFifo {
    pending_times: CircularBuffer<SampleIndex>,
    pending_levels: CircularBuffer<bool>,
    pending_tags: CircularBuffer<Tag>,
    last_input: Event,
    last_ack: Event,
}

impl Default for EventFifo {
    fn default() -> Self {
        Self::new()
    }
}

impl EventFifo {
    pub fn new() -> Self {
        Self::with_capacity(EVENT_BUFFER_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pending_times: CircularBuffer::new(capacity),
            pending_levels: CircularBuffer::new(capacity),
            pending_tags: CircularBuffer::new(capacity),
            last_input: Event::bogus(),
            last_ack: Event::bogus(),
        }
    }

    /// Flushes pending output and resets the acknowledged record to
    /// "nothing asserted". The last-input record is left alone.
    pub fn clear_buffer(&mut self) {
        self.pending_times.clear();
        self.pending_levels.clear();
        self.pending_tags.clear();
        self.last_ack = Event::bogus();
    }

    /// Overwrites the last-input record without emitting anything.
    /// Used for initialisation.
    pub fn set_prev_input(&mut self, time: SampleIndex, level: bool, tag: Tag) {
        self.last_input = Event { time, level, tag };
    }

    /// Copies an input event to the pending output, then records it as
    /// the last input seen.
    pub fn handle_input(&mut self, time: SampleIndex, level: bool, tag: Tag) {
        self.enqueue_output(time, level, tag);
        self.set_prev_input(time, level, tag);
    }

    pub(crate) fn enqueue_output(&mut self, time: SampleIndex, level: bool, tag: Tag) {
        // Output times must not run backwards past input already seen.
        // This check can false-alarm if the input record was never
        // initialised before the first enqueue.
        if self.last_input.time >= time {
            warn!(
                "event enqueued out of order (prev time {}, new {})",
                self.last_input.time, time
            );
        }
        self.pending_times.enqueue(time);
        self.pending_levels.enqueue(level);
        self.pending_tags.enqueue(tag);
    }

    pub fn has_pending_output(&self) -> bool {
        self.pending_times.count() > 0
    }

    pub fn pending_output_count(&self) -> usize {
        self.pending_times.count()
    }

    pub fn peek_next_output_time(&self) -> SampleIndex {
        self.pending_times.snoop()
    }

    pub fn peek_next_output_level(&self) -> bool {
        self.pending_levels.snoop()
    }

    pub fn peek_next_output_tag(&self) -> Tag {
        self.pending_tags.snoop()
    }

    /// Removes the head pending event and records it as the last
    /// acknowledged output. No-op when nothing is pending.
    pub fn acknowledge_output(&mut self) {
        if self.has_pending_output() {
            self.last_ack = Event {
                time: self.pending_times.dequeue(),
                level: self.pending_levels.dequeue(),
                tag: self.pending_tags.dequeue(),
            };
        }
    }

    /// Acknowledges and discards output up to and including `time`.
    pub fn drain_output_until(&mut self, time: SampleIndex) {
        while self.has_pending_output() && self.peek_next_output_time() <= time {
            self.acknowledge_output();
        }
    }

    pub fn last_input_time(&self) -> SampleIndex {
        self.last_input.time
    }

    pub fn last_input_level(&self) -> bool {
        self.last_input.level
    }

    pub fn last_input_tag(&self) -> Tag {
        self.last_input.tag
    }

    pub fn last_acknowledged_time(&self) -> SampleIndex {
        self.last_ack.time
    }

    pub fn last_acknowledged_level(&self) -> bool {
        self.last_ack.level
    }

    pub fn last_acknowledged_tag(&self) -> Tag {
        self.last_ack.tag
    }

    pub(crate) fn set_acknowledged_level(&mut self, level: bool) {
        self.last_ack.level = level;
    }

    /// Independent snapshot of this node's output state, as a plain
    /// pass-through FIFO. Used for splitting one output stream to
    /// several consumers.
    pub fn clone_by_value(&self) -> EventFifo {
        self.clone()
    }
}

/// Capability set shared by every node: push input, advance the node's
/// notion of time, reset, and expose the output FIFO.
///
/// Only these operations are dispatched; everything output-side goes
/// through the [`EventFifo`] returned by [`fifo`]/[`fifo_mut`].
///
/// [`fifo`]: LogicNode::fifo
/// [`fifo_mut`]: LogicNode::fifo_mut
pub trait LogicNode {
    fn fifo(&self) -> &EventFifo;

    fn fifo_mut(&mut self) -> &mut EventFifo;

    fn handle_input(&mut self, time: SampleIndex, level: bool, tag: Tag);

    fn advance_to_time(&mut self, time: SampleIndex);

    fn clear_buffer(&mut self);

    /// Drains `source`'s pending output up to and including `until`,
    /// delivering each event through this node's input handling.
    ///
    /// Source events sharing a timestamp collapse to their final value:
    /// a zero-width glitch within one sample never propagates.
    fn pull_from_fifo_until(&mut self, source: &mut EventFifo, until: SampleIndex) {
        while source.has_pending_output() && source.peek_next_output_time() <= until {
            let time = source.peek_next_output_time();
            while source.has_pending_output() && source.peek_next_output_time() == time {
                source.acknowledge_output();
            }
            self.handle_input(
                time,
                source.last_acknowledged_level(),
                source.last_acknowledged_tag(),
            );
        }
    }
}

impl LogicNode for EventFifo {
    fn fifo(&self) -> &EventFifo {
        self
    }

    fn fifo_mut(&mut self) -> &mut EventFifo {
        self
    }

    fn handle_input(&mut self, time: SampleIndex, level: bool, tag: Tag) {
        EventFifo::handle_input(self, time, level, tag);
    }

    fn advance_to_time(&mut self, _time: SampleIndex) {}

    fn clear_buffer(&mut self) {
        EventFifo::clear_buffer(self);
    }
}
