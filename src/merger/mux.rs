use super::{MergerCore, SharedNode};
use crate::node::{EventFifo, LogicNode};
use crate::{SampleIndex, Tag};

/// Fan-in node combining several input streams into one in-order output
/// stream with input identification tags.
///
/// Every acknowledged input event at a timestamp yields one output
/// event tagged with its input's id tag; the events of inputs sharing a
/// timestamp are emitted in the order the inputs were added. Same-
/// timestamp events within one input collapse to their final value.
pub struct MuxMerger {
    output: EventFifo,
    core: MergerCore,
}

impl Default for MuxMerger {
    fn default() -> Self {
        Self::new()
    }
}

impl MuxMerger {
    pub fn new() -> Self {
        Self {
            output: EventFifo::new(),
            core: MergerCore::new(),
        }
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

    /// Pulls and interleaves input events up to and including `until`.
    pub fn process_pending_input_until(&mut self, until: SampleIndex) {
        while let Some(time) = self.core.find_next_input_time().filter(|&t| t <= until) {
            self.core.acknowledge_inputs_until(time);

            for input in self.core.inputs() {
                if let Some(node) = input.upgrade() {
                    let node = node.borrow();
                    let fifo = node.fifo();
                    if fifo.last_acknowledged_time() == time {
                        self.output
                            .enqueue_output(time, fifo.last_acknowledged_level(), input.id_tag());
                    }
                }
            }
        }
    }
}

impl LogicNode for MuxMerger {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::{ConditionConfig, ConditionProcessor, TriggerFeature};
    use crate::merger::{LogicMerger, MergeMode};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn drain(merger: &mut MuxMerger) -> Vec<(SampleIndex, bool, Tag)> {
        let mut events = Vec::new();
        while merger.fifo().has_pending_output() {
            events.push((
                merger.fifo().peek_next_output_time(),
                merger.fifo().peek_next_output_level(),
                merger.fifo().peek_next_output_tag(),
            ));
            merger.fifo_mut().acknowledge_output();
        }
        events
    }

    #[test]
    fn interleaves_in_time_then_input_order() {
        let a: SharedNode = Rc::new(RefCell::new(EventFifo::new()));
        let b: SharedNode = Rc::new(RefCell::new(EventFifo::new()));
        let mut merger = MuxMerger::new();
        merger.add_input(&a, 1);
        merger.add_input(&b, 2);

        a.borrow_mut().handle_input(10, true, 0);
        a.borrow_mut().handle_input(30, false, 0);
        b.borrow_mut().handle_input(10, false, 0);
        b.borrow_mut().handle_input(20, true, 0);

        merger.process_pending_input_until(100);

        assert_eq!(
            drain(&mut merger),
            vec![
                (10, true, 1),
                (10, false, 2),
                (20, true, 2),
                (30, false, 1),
            ]
        );
    }

    #[test]
    fn every_acknowledged_event_is_represented() {
        let a: SharedNode = Rc::new(RefCell::new(EventFifo::new()));
        let b: SharedNode = Rc::new(RefCell::new(EventFifo::new()));
        let c: SharedNode = Rc::new(RefCell::new(EventFifo::new()));
        let mut merger = MuxMerger::new();
        merger.add_input(&a, 10);
        merger.add_input(&b, 20);
        merger.add_input(&c, 30);

        let mut expected_count = 0;
        for (k, node) in [&a, &b, &c].into_iter().enumerate() {
            for step in 0..4i64 {
                let time = step * 7 + (k as SampleIndex) * 3;
                node.borrow_mut().handle_input(time, step % 2 == 0, 0);
                expected_count += 1;
            }
        }

        merger.process_pending_input_until(1000);

        let events = drain(&mut merger);
        assert_eq!(events.len(), expected_count);
        // Output times never run backwards.
        for pair in events.windows(2) {
            assert!(pair[0].0 <= pair[1].0);
        }
    }

    #[test]
    fn same_timestamp_events_coalesce_per_input() {
        let a: SharedNode = Rc::new(RefCell::new(EventFifo::new()));
        let mut merger = MuxMerger::new();
        merger.add_input(&a, 4);

        a.borrow_mut().handle_input(10, true, 0);
        a.borrow_mut().handle_input(10, false, 0);

        merger.process_pending_input_until(100);
        assert_eq!(drain(&mut merger), vec![(10, false, 4)]);
    }

    #[test]
    fn input_tags_are_replaced_by_id_tags() {
        let a: SharedNode = Rc::new(RefCell::new(EventFifo::new()));
        let mut merger = MuxMerger::new();
        merger.add_input(&a, 9);

        a.borrow_mut().handle_input(1, true, 777);
        merger.process_pending_input_until(10);
        assert_eq!(drain(&mut merger), vec![(1, true, 9)]);
    }

    #[test]
    fn dropped_input_is_skipped() {
        let a: SharedNode = Rc::new(RefCell::new(EventFifo::new()));
        let mut merger = MuxMerger::new();
        {
            let ghost: SharedNode = Rc::new(RefCell::new(EventFifo::new()));
            merger.add_input(&ghost, 1);
        }
        merger.add_input(&a, 2);

        a.borrow_mut().handle_input(5, true, 0);
        merger.process_pending_input_until(10);
        assert_eq!(drain(&mut merger), vec![(5, true, 2)]);
    }

    // Two deglitched trigger lines merged into a single tagged stream,
    // driven the way a host acquisition loop would.
    #[test]
    fn condition_graph_end_to_end() {
        let config = ConditionConfig {
            feature: TriggerFeature::EdgeRising,
            delay_min: 2,
            delay_max: 2,
            sustain: 3,
            dead_time: 50,
            deglitch: 2,
            ..Default::default()
        };

        let line_a = ConditionProcessor::with_config(config);
        let line_b = ConditionProcessor::with_config(config);
        let a: SharedNode = Rc::new(RefCell::new(line_a));
        let b: SharedNode = Rc::new(RefCell::new(line_b));

        let mut merger = MuxMerger::new();
        merger.add_input(&a, 1);
        merger.add_input(&b, 2);

        a.borrow_mut().handle_input(0, false, 0);
        a.borrow_mut().handle_input(10, true, 0);
        b.borrow_mut().handle_input(0, false, 0);
        b.borrow_mut().handle_input(20, true, 0);

        a.borrow_mut().advance_to_time(200);
        b.borrow_mut().advance_to_time(200);
        merger.process_pending_input_until(200);

        assert_eq!(
            drain(&mut merger),
            vec![
                (12, true, 1),
                (15, false, 1),
                (22, true, 2),
                (25, false, 2),
            ]
        );
    }

    // The logic merger also composes under the multiplexer: a pulse
    // stream and a raw line ANDed, then tagged.
    #[test]
    fn merger_chain_end_to_end() {
        let a: SharedNode = Rc::new(RefCell::new(EventFifo::new()));
        let b: SharedNode = Rc::new(RefCell::new(EventFifo::new()));

        let mut and = LogicMerger::new(MergeMode::And);
        and.add_input(&a, 0);
        and.add_input(&b, 0);
        let and: SharedNode = Rc::new(RefCell::new(and));

        let mut merger = MuxMerger::new();
        merger.add_input(&and, 7);

        a.borrow_mut().handle_input(0, true, 0);
        b.borrow_mut().handle_input(5, true, 0);
        b.borrow_mut().handle_input(9, false, 0);

        and.borrow_mut().advance_to_time(100);
        merger.process_pending_input_until(100);

        assert_eq!(
            drain(&mut merger),
            vec![(0, false, 7), (5, true, 7), (9, false, 7)]
        );
    }
}
