//! Bounded FIFO hand-off between the host listener and the session worker
//! pool (C1).
//!
//! The reference server built this from a mutex-guarded ring buffer plus a
//! pair of named POSIX semaphores ("empty slots" / "full slots"). There is
//! exactly one producer (the host listener) in this process, so the whole
//! thing is re-expressed as a single in-process bounded `crossbeam` channel
//! with the same blocking/FIFO semantics — see DESIGN.md.

use crossbeam::channel::{bounded, Receiver, RecvError, SendError, Sender};

/// A registration request parsed off the register pipe by the host
/// listener (C9), consumed by a session worker (C8).
#[derive(Debug, Clone)]
pub struct ConnectionRequest {
    pub client_id: i32,
    pub request_pipe: String,
    pub notification_pipe: String,
}

/// Default capacity of the request queue (§3 names 10 in the reference
/// implementation).
pub const DEFAULT_CAPACITY: usize = 10;

/// FIFO of pending connection requests (C1).
pub struct RequestQueue {
    sender: Sender<ConnectionRequest>,
    receiver: Receiver<ConnectionRequest>,
}

impl RequestQueue {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self { sender, receiver }
    }

    /// Clone of the producer handle, for the host listener.
    pub fn producer(&self) -> RequestQueueProducer {
        RequestQueueProducer {
            sender: self.sender.clone(),
        }
    }

    /// Clone of the consumer handle, for a session worker.
    pub fn consumer(&self) -> RequestQueueConsumer {
        RequestQueueConsumer {
            receiver: self.receiver.clone(),
        }
    }

    /// Number of requests currently queued (`count` in §3's invariant).
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.sender.capacity().unwrap_or(0)
    }

    /// Drop both ends, unblocking any thread parked in `insert`/`remove`.
    pub fn destroy(self) {
        drop(self.sender);
        drop(self.receiver);
    }
}

#[derive(Clone)]
pub struct RequestQueueProducer {
    sender: Sender<ConnectionRequest>,
}

impl RequestQueueProducer {
    /// Blocks until an empty slot exists (§4.1 `insert`).
    pub fn insert(&self, req: ConnectionRequest) -> Result<(), SendError<ConnectionRequest>> {
        self.sender.send(req)
    }
}

#[derive(Clone)]
pub struct RequestQueueConsumer {
    receiver: Receiver<ConnectionRequest>,
}

impl RequestQueueConsumer {
    /// Blocks until a full slot exists (§4.1 `remove`).
    pub fn remove(&self) -> Result<ConnectionRequest, RecvError> {
        self.receiver.recv()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(id: i32) -> ConnectionRequest {
        ConnectionRequest {
            client_id: id,
            request_pipe: format!("/tmp/{id}_request"),
            notification_pipe: format!("/tmp/{id}_notification"),
        }
    }

    #[test]
    fn fifo_order_is_preserved() {
        let queue = RequestQueue::new(DEFAULT_CAPACITY);
        let producer = queue.producer();
        let consumer = queue.consumer();
        producer.insert(req(1)).unwrap();
        producer.insert(req(2)).unwrap();
        assert_eq!(consumer.remove().unwrap().client_id, 1);
        assert_eq!(consumer.remove().unwrap().client_id, 2);
    }

    #[test]
    fn count_matches_capacity_invariant() {
        let queue = RequestQueue::new(3);
        let producer = queue.producer();
        assert_eq!(queue.len(), 0);
        producer.insert(req(1)).unwrap();
        producer.insert(req(2)).unwrap();
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.capacity() - queue.len(), 1);
    }

    #[test]
    fn insert_blocks_a_producer_thread_until_a_slot_frees() {
        use std::sync::Arc;
        use std::thread;
        use std::time::Duration;

        let queue = Arc::new(RequestQueue::new(1));
        let producer = queue.producer();
        producer.insert(req(1)).unwrap();

        let blocked_producer = queue.producer();
        let handle = thread::spawn(move || {
            blocked_producer.insert(req(2)).unwrap();
        });

        thread::sleep(Duration::from_millis(50));
        assert!(!handle.is_finished());

        let consumer = queue.consumer();
        consumer.remove().unwrap();
        handle.join().unwrap();
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn destroy_unblocks_a_waiting_consumer() {
        use std::thread;

        let queue = RequestQueue::new(1);
        let consumer = queue.consumer();
        let handle = thread::spawn(move || consumer.remove().is_err());
        queue.destroy();
        assert!(handle.join().unwrap());
    }
}
