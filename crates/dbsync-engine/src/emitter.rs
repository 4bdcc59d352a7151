//! Change emission.
//!
//! Diff results are delivered after the transaction commits, one event at
//! a time, primary key ascending. A `ChangeSet` is itself the batch form;
//! anything implementing [`ChangeSink`] receives the streaming form.

use dbsync_core::diff::{ChangeEvent, ChangeSet};
use std::sync::mpsc::Sender;

/// Receiver of streamed change events
pub trait ChangeSink {
    fn deliver(&mut self, event: ChangeEvent);
}

impl<F> ChangeSink for F
where
    F: FnMut(&ChangeEvent),
{
    fn deliver(&mut self, event: ChangeEvent) {
        self(&event)
    }
}

/// Channel mode. A disconnected receiver drops the remaining events.
impl ChangeSink for Sender<ChangeEvent> {
    fn deliver(&mut self, event: ChangeEvent) {
        if self.send(event).is_err() {
            tracing::debug!("Change receiver disconnected");
        }
    }
}

/// Push every event of `changes` into `sink`, returning the count
pub fn emit<S>(changes: ChangeSet, sink: &mut S) -> usize
where
    S: ChangeSink + ?Sized,
{
    let mut delivered = 0;
    for event in changes {
        sink.deliver(event);
        delivered += 1;
    }
    delivered
}
