/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 *
 * Unless you explicitly state otherwise, any contribution intentionally
 * submitted for inclusion in the work by you, as defined in the Apache-2.0
 * license, shall be dual licensed as above, without any additional terms or
 * conditions.
 */

//! FIFO handoff of completed frames between the recycler and the dispatcher.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use crate::error::{JitterBufferError, Result};
use crate::frame::FrameAssembler;

/// A guarded FIFO the recycler fills strictly in frame-number order and the
/// dispatcher drains one frame at a time.
#[derive(Debug, Default)]
pub struct ReadyQueue {
    queue: Mutex<VecDeque<FrameAssembler>>,
    ready: Condvar,
}

impl ReadyQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a batch of completed frames and wakes one waiting consumer.
    pub fn push_back_all(&self, batch: Vec<FrameAssembler>) -> Result<()> {
        let mut queue = self
            .queue
            .lock()
            .map_err(|_| JitterBufferError::poisoned("ready queue"))?;
        queue.extend(batch);
        drop(queue);
        self.ready.notify_one();
        Ok(())
    }

    /// Pops the front frame, waiting up to `timeout` if the queue is empty.
    /// Returns `None` when the wait expires without a frame arriving.
    pub fn pop_front_or_wait(&self, timeout: Duration) -> Result<Option<FrameAssembler>> {
        let queue = self
            .queue
            .lock()
            .map_err(|_| JitterBufferError::poisoned("ready queue"))?;
        let mut queue = if queue.is_empty() {
            let (queue, _wait) = self
                .ready
                .wait_timeout(queue, timeout)
                .map_err(|_| JitterBufferError::poisoned("ready queue"))?;
            queue
        } else {
            queue
        };
        Ok(queue.pop_front())
    }

    /// Wakes every waiting consumer, used on shutdown.
    pub fn wake_all(&self) {
        self.ready.notify_all();
    }

    pub fn len(&self) -> usize {
        self.queue.lock().map(|queue| queue.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn pop_returns_immediately_when_a_frame_is_queued() {
        let queue = ReadyQueue::new();
        queue
            .push_back_all(vec![FrameAssembler::new(0, 1, 0, b"frame")])
            .unwrap();

        let started = Instant::now();
        let frame = queue
            .pop_front_or_wait(Duration::from_secs(1))
            .unwrap()
            .expect("frame should be queued");
        assert_eq!(frame.frame_number(), 0);
        assert!(started.elapsed() < Duration::from_millis(500));
    }

    #[test]
    fn pop_times_out_on_an_empty_queue() {
        let queue = ReadyQueue::new();
        let frame = queue.pop_front_or_wait(Duration::from_millis(5)).unwrap();
        assert!(frame.is_none());
    }

    #[test]
    fn push_wakes_a_waiting_consumer() {
        let queue = Arc::new(ReadyQueue::new());
        let consumer = {
            let queue = Arc::clone(&queue);
            // Re-waits on spurious wakeups, the way the dispatcher loop does.
            thread::spawn(move || {
                let deadline = Instant::now() + Duration::from_secs(5);
                while Instant::now() < deadline {
                    if let Some(frame) =
                        queue.pop_front_or_wait(Duration::from_millis(50)).unwrap()
                    {
                        return Some(frame);
                    }
                }
                None
            })
        };

        // Give the consumer a moment to park on the condvar.
        thread::sleep(Duration::from_millis(20));
        queue
            .push_back_all(vec![FrameAssembler::new(3, 1, 0, b"frame")])
            .unwrap();

        let frame = consumer.join().unwrap().expect("consumer should be woken");
        assert_eq!(frame.frame_number(), 3);
    }

    #[test]
    fn frames_come_out_in_insertion_order() {
        let queue = ReadyQueue::new();
        queue
            .push_back_all(vec![
                FrameAssembler::new(0, 1, 0, b"a"),
                FrameAssembler::new(1, 1, 0, b"b"),
            ])
            .unwrap();
        queue
            .push_back_all(vec![FrameAssembler::new(2, 1, 0, b"c")])
            .unwrap();

        for expected in 0..3 {
            let frame = queue
                .pop_front_or_wait(Duration::from_millis(5))
                .unwrap()
                .expect("frame should be queued");
            assert_eq!(frame.frame_number(), expected);
        }
        assert!(queue.is_empty());
    }
}
