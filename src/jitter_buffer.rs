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

//! The JitterBuffer core: packet ingress, worker lifecycle, and the
//! in-order release protocol between reassembly and decode.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::decoder::{Decoder, MAX_DECODED_SIZE};
use crate::error::{JitterBufferError, Result};
use crate::frame::FrameAssembler;
use crate::ready_queue::ReadyQueue;
use crate::renderer::Renderer;
use crate::store::{PacketDisposition, UnsortedStore};

/// Bounded condition-variable wait used by both workers between
/// iterations. Keeps them responsive to shutdown even if a signal is lost.
const WORKER_WAIT: Duration = Duration::from_millis(5);

/// Point-in-time view of the buffer's occupancy and health.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JitterBufferStats {
    /// Frames resident in the staging store, complete or not.
    pub pending_frames: usize,
    /// Completed frames queued for decode.
    pub ready_frames: usize,
    /// Frames that have gone through decode and render.
    pub frames_rendered: u64,
    /// Whether a worker failure has latched the buffer shut.
    pub processing_blocked: bool,
}

/// State shared between the ingress caller and the two worker threads.
struct Shared {
    /// Staging store plus emission watermark, guarded by one mutex. This
    /// lock is never held together with the ready queue's.
    store: Mutex<UnsortedStore>,
    /// Signalled by ingress on every accepted packet.
    recycle: Condvar,
    ready_queue: ReadyQueue,
    decoder: Box<dyn Decoder>,
    renderer: Box<dyn Renderer>,
    shutdown_requested: AtomicBool,
    processing_blocked: AtomicBool,
    frames_rendered: AtomicU64,
}

struct Workers {
    recycler: JoinHandle<()>,
    dispatcher: JoinHandle<()>,
}

/// A staging area between an unreliable, out-of-order, fragmented packet
/// source and a strictly ordered decode/render pipeline.
///
/// Fragments arrive through [`receive_packet`](Self::receive_packet) in any
/// order. Two background threads, started lazily on the first accepted
/// packet, do the rest: the recycler promotes completed frames out of the
/// staging store the moment they are next in sequence, and the dispatcher
/// assembles, decodes, and renders them. Frames reach the decoder in
/// strictly increasing frame-number order with no gaps.
///
/// A decoder or renderer failure latches the buffer shut: every subsequent
/// ingress call fails with [`JitterBufferError::ProcessingBlocked`] until
/// the instance is dropped and a new one is built.
pub struct JitterBuffer {
    shared: Arc<Shared>,
    workers: Mutex<Option<Workers>>,
}

impl JitterBuffer {
    /// Creates a buffer draining into `decoder` and `renderer`. No threads
    /// are started until the first packet is accepted.
    pub fn new(decoder: Box<dyn Decoder>, renderer: Box<dyn Renderer>) -> Self {
        Self {
            shared: Arc::new(Shared {
                store: Mutex::new(UnsortedStore::new()),
                recycle: Condvar::new(),
                ready_queue: ReadyQueue::new(),
                decoder,
                renderer,
                shutdown_requested: AtomicBool::new(false),
                processing_blocked: AtomicBool::new(false),
                frames_rendered: AtomicU64::new(0),
            }),
            workers: Mutex::new(None),
        }
    }

    /// Accepts one frame fragment.
    ///
    /// Stale frames, retransmitted fragments, and fragments for frames that
    /// are already complete are debug-logged successes. The call never
    /// waits on the decoder or renderer; its only suspension point is the
    /// staging store mutex.
    pub fn receive_packet(
        &self,
        payload: &[u8],
        frame_number: u64,
        fragment_index: u32,
        expected_fragments: u32,
    ) -> Result<()> {
        if payload.is_empty() {
            return Err(JitterBufferError::InvalidArgument(
                "payload is empty".to_string(),
            ));
        }
        if expected_fragments == 0 {
            return Err(JitterBufferError::InvalidArgument(
                "frame must have at least 1 fragment".to_string(),
            ));
        }

        // Either worker hitting a critical error makes the component unable
        // to keep its delivery contract, so refuse further input.
        if self.shared.processing_blocked.load(Ordering::Acquire) {
            return Err(JitterBufferError::ProcessingBlocked);
        }

        let disposition = {
            let mut store = self
                .shared
                .store
                .lock()
                .map_err(|_| JitterBufferError::poisoned("store"))?;
            store.insert_or_append(frame_number, expected_fragments, fragment_index, payload)?
        };

        if disposition == PacketDisposition::Stale {
            log::debug!("Frame #{frame_number} is already processed, skipping it");
            return Ok(());
        }

        self.ensure_workers()?;

        // Wake the recycler on every accepted packet so completed in-order
        // frames leave the staging store promptly.
        self.shared.recycle.notify_one();
        Ok(())
    }

    /// Whether a worker failure has latched the buffer shut. The latch is
    /// sticky; the only recovery is to drop the instance and build a new one.
    pub fn is_blocked(&self) -> bool {
        self.shared.processing_blocked.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> JitterBufferStats {
        let pending_frames = self
            .shared
            .store
            .lock()
            .map(|store| store.len())
            .unwrap_or(0);
        JitterBufferStats {
            pending_frames,
            ready_frames: self.shared.ready_queue.len(),
            frames_rendered: self.shared.frames_rendered.load(Ordering::Relaxed),
            processing_blocked: self.is_blocked(),
        }
    }

    /// Starts the recycler and dispatcher, each at most once per instance.
    fn ensure_workers(&self) -> Result<()> {
        let mut workers = self
            .workers
            .lock()
            .map_err(|_| JitterBufferError::poisoned("workers"))?;
        if workers.is_none() {
            let recycler = thread::spawn({
                let shared = Arc::clone(&self.shared);
                move || recycler_loop(&shared)
            });
            let dispatcher = thread::spawn({
                let shared = Arc::clone(&self.shared);
                move || dispatcher_loop(&shared)
            });
            *workers = Some(Workers {
                recycler,
                dispatcher,
            });
        }
        Ok(())
    }
}

impl Drop for JitterBuffer {
    fn drop(&mut self) {
        self.shared.shutdown_requested.store(true, Ordering::Release);
        self.shared.recycle.notify_all();
        self.shared.ready_queue.wake_all();

        if let Ok(mut workers) = self.workers.lock() {
            if let Some(workers) = workers.take() {
                if workers.recycler.join().is_err() {
                    log::error!("Recycler thread panicked during shutdown");
                }
                if workers.dispatcher.join().is_err() {
                    log::error!("Dispatcher thread panicked during shutdown");
                }
            }
        }
    }
}

/// Recycler thread routine: moves the contiguous run of completed frames
/// from the staging store to the ready queue, preserving frame order. Any
/// error latches the buffer shut and ends the thread.
fn recycler_loop(shared: &Shared) {
    while !shared.shutdown_requested.load(Ordering::Acquire) {
        if let Err(err) = recycle_pass(shared) {
            log::error!("Recycler stopped: {err}");
            shared.processing_blocked.store(true, Ordering::Release);
            return;
        }
    }
}

fn recycle_pass(shared: &Shared) -> Result<()> {
    let batch = {
        let store = shared
            .store
            .lock()
            .map_err(|_| JitterBufferError::poisoned("store"))?;
        // The wait doubles as the pacing of the loop; ingress wakes it
        // early whenever a packet lands.
        let (mut store, _wait) = shared
            .recycle
            .wait_timeout(store, WORKER_WAIT)
            .map_err(|_| JitterBufferError::poisoned("store"))?;
        store.drain_sequential()
    };

    // The store lock is released before the ready queue is touched.
    if !batch.is_empty() {
        shared.ready_queue.push_back_all(batch)?;
    }
    Ok(())
}

/// Dispatcher thread routine: assembles each ready frame, runs it through
/// the decoder, and hands the decoded bytes to the renderer. Any error
/// latches the buffer shut and ends the thread.
fn dispatcher_loop(shared: &Shared) {
    // The decoder's output bound is fixed, so one scratch buffer serves the
    // whole loop.
    let mut decoded = vec![0u8; MAX_DECODED_SIZE];

    while !shared.shutdown_requested.load(Ordering::Acquire) {
        let frame = match shared.ready_queue.pop_front_or_wait(WORKER_WAIT) {
            Ok(Some(frame)) => frame,
            Ok(None) => continue,
            Err(err) => {
                log::error!("Dispatcher stopped: {err}");
                shared.processing_blocked.store(true, Ordering::Release);
                return;
            }
        };

        if let Err(err) = dispatch_frame(shared, &frame, &mut decoded) {
            log::error!("Dispatcher stopped on frame #{}: {err}", frame.frame_number());
            shared.processing_blocked.store(true, Ordering::Release);
            return;
        }
    }
}

fn dispatch_frame(shared: &Shared, frame: &FrameAssembler, decoded: &mut [u8]) -> Result<()> {
    log::debug!("Reassembling frame #{}", frame.frame_number());

    let mut frame_data = vec![0u8; frame.size()];
    frame.assemble(&mut frame_data);

    let decoded_len = shared.decoder.decode(&frame_data, decoded)?;
    if decoded_len > decoded.len() {
        return Err(JitterBufferError::Unexpected(format!(
            "decoder produced {decoded_len} bytes, limit is {MAX_DECODED_SIZE}"
        )));
    }

    shared.renderer.render(&decoded[..decoded_len])?;
    shared.frames_rendered.fetch_add(1, Ordering::Relaxed);
    Ok(())
}
