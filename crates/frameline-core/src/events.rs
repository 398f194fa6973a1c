//! Change notifications delivered to the editing shell.

use crate::animation::Easing;
use crate::types::{FrameNumber, LayerId};
use crossbeam_channel::{unbounded, Receiver, Sender};

#[derive(Debug, Clone, PartialEq)]
pub enum TimelineEvent {
    FrameChanged {
        frame: FrameNumber,
    },
    CurrentLayerChanged {
        layer: LayerId,
        index: usize,
    },
    LayerAdded {
        layer: LayerId,
        index: usize,
    },
    LayerRemoved {
        layer: LayerId,
        index: usize,
    },
    LayerMoved {
        layer: LayerId,
        from: usize,
        to: usize,
    },
    /// Name, visibility, lock, opacity or blend mode changed.
    LayerChanged {
        layer: LayerId,
    },
    KeyframeAdded {
        layer: LayerId,
        frame: FrameNumber,
    },
    KeyframeRemoved {
        layer: LayerId,
        frame: FrameNumber,
    },
    FrameExtended {
        layer: LayerId,
        from: FrameNumber,
        to: FrameNumber,
    },
    TweeningApplied {
        layer: LayerId,
        start: FrameNumber,
        end: FrameNumber,
        easing: Easing,
    },
    TweeningRemoved {
        layer: LayerId,
        start: FrameNumber,
    },
    FrameImported {
        layer: LayerId,
        frame: FrameNumber,
    },
    TotalFramesChanged {
        total: FrameNumber,
    },
}

/// Fan-out of events to every live subscriber.
#[derive(Debug, Default)]
pub struct EventHub {
    subscribers: Vec<Sender<TimelineEvent>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Receiver<TimelineEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Sends to all subscribers, dropping the ones whose receiver is gone.
    pub fn emit(&mut self, event: TimelineEvent) {
        self.subscribers
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
