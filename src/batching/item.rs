use std::time::Instant;

use tokio::sync::oneshot;

use super::error::BatchError;

/// One caller-supplied payload plus its private result slot.
///
/// Owned by the admission queue until the assembler moves it into a batch;
/// from then on owned by that batch until its slot is resolved. The slot is
/// written exactly once by result distribution and read exactly once by the
/// submitting caller.
pub struct Item<P, R> {
    pub payload: P,
    pub slot: oneshot::Sender<Result<R, BatchError>>,
    pub enqueued_at: Instant,
}

impl<P, R> Item<P, R> {
    /// Create an item and the receiver half of its result slot.
    pub fn new(payload: P) -> (Self, oneshot::Receiver<Result<R, BatchError>>) {
        let (tx, rx) = oneshot::channel();
        let item = Self {
            payload,
            slot: tx,
            enqueued_at: Instant::now(),
        };
        (item, rx)
    }
}

/// An ordered group of items dispatched together in one worker call.
///
/// `opened_at` is the enqueue time of the first item, not the wall-clock
/// time the batch value was constructed; the flush timer is anchored to it.
pub struct Batch<P, R> {
    items: Vec<Item<P, R>>,
    opened_at: Instant,
}

impl<P, R> Batch<P, R> {
    /// Open a batch around its first item. A batch never exists empty.
    pub fn open(first: Item<P, R>) -> Self {
        let opened_at = first.enqueued_at;
        Self {
            items: vec![first],
            opened_at,
        }
    }

    pub fn push(&mut self, item: Item<P, R>) {
        self.items.push(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn opened_at(&self) -> Instant {
        self.opened_at
    }

    pub fn into_items(self) -> Vec<Item<P, R>> {
        self.items
    }
}
