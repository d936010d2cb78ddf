//! This crate provides an event-driven processing graph for digital
//! (two-level, "TTL") event streams on a discrete sample-indexed
//! timeline.
//!
//! A stream is a sequence of edge events `(time, level, tag)`. Nodes
//! share one output contract, a queue of pending events drained by
//! acknowledging them, and are composed into acyclic graphs:
//! [`EventFifo`] passes events through and splits streams,
//! [`ConditionProcessor`] deglitches a line and turns edge or level
//! features into delayed monostable pulses with dead time,
//! [`LogicMerger`] folds several lines with boolean AND/OR, and
//! [`MuxMerger`] interleaves several lines into one tagged stream in
//! timestamp order.
//!
//! Graphs are driven by pushing raw events into source-facing nodes and
//! then advancing sinks; mergers pull from their upstream sources, so
//! no input-side buffering is needed. Typical usage:
//!
//! ```rust
//! use ttl_event_logic::{ConditionConfig, ConditionProcessor, LogicNode, TriggerFeature};
//!
//! let mut trigger = ConditionProcessor::with_config(ConditionConfig {
//!     feature: TriggerFeature::EdgeRising,
//!     delay_min: 2,
//!     delay_max: 2,
//!     sustain: 4,
//!     ..Default::default()
//! });
//!
//! trigger.handle_input(0, false, 0);
//! trigger.handle_input(10, true, 0);
//! trigger.advance_to_time(100);
//!
//! let mut pulse = Vec::new();
//! while trigger.fifo().has_pending_output() {
//!     pulse.push((
//!         trigger.fifo().peek_next_output_time(),
//!         trigger.fifo().peek_next_output_level(),
//!     ));
//!     trigger.fifo_mut().acknowledge_output();
//! }
//! assert_eq!(pulse, vec![(12, true), (16, false)]);
//! ```

pub mod buffer;
pub mod condition;
pub mod merger;
pub mod node;

pub use buffer::CircularBuffer;
pub use condition::{ConditionConfig, ConditionProcessor, ConfigError, TriggerFeature};
pub use merger::{LogicMerger, MergeMode, MuxMerger, SharedNode};
pub use node::{Event, EventFifo, LogicNode};

/// Signed sample index; the atomic unit of the timeline.
pub type SampleIndex = i64;

/// Integer label carried alongside an event: a stream identifier for the
/// multiplexer, an opaque payload for pass-through nodes.
pub type Tag = i32;

/// Placeholder timestamp for "no event seen yet". This timestamp could
/// happen, but we need something as the default; it is never enqueued.
pub const BOGUS_TIMESTAMP: SampleIndex = -1;

/// Maximum number of pending events in a single node. Keeping this a
/// power of two lets the index arithmetic optimise well.
pub const EVENT_BUFFER_SIZE: usize = 16384;
