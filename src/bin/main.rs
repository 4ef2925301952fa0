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

//! Simulation binary: feeds the jitter buffer from a fake network that
//! fragments, reorders, and retransmits frames.

use rand::seq::SliceRandom;
use rand::{thread_rng, Rng};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use videocall_jitter::{Decoder, JitterBuffer, Renderer, Result};

const FRAME_COUNT: u64 = 300;
const MTU: usize = 64;

/// Stand-in for a real codec: output equals input.
struct PassthroughDecoder;

impl Decoder for PassthroughDecoder {
    fn decode(&self, frame: &[u8], output: &mut [u8]) -> Result<usize> {
        output[..frame.len()].copy_from_slice(frame);
        Ok(frame.len())
    }
}

/// Counts rendered frames and bytes, reporting every thirtieth frame.
#[derive(Clone, Default)]
struct ConsoleRenderer {
    frames: Arc<AtomicU64>,
    bytes: Arc<AtomicU64>,
}

impl Renderer for ConsoleRenderer {
    fn render(&self, frame: &[u8]) -> Result<()> {
        let rendered = self.frames.fetch_add(1, Ordering::Relaxed) + 1;
        self.bytes.fetch_add(frame.len() as u64, Ordering::Relaxed);
        if rendered % 30 == 0 {
            println!(
                "[RENDERER] {rendered} frames rendered ({} bytes total)",
                self.bytes.load(Ordering::Relaxed)
            );
        }
        Ok(())
    }
}

fn main() {
    env_logger::init();

    println!("--- Video Jitter Buffer Simulation ---");

    let renderer = ConsoleRenderer::default();
    let buffer = JitterBuffer::new(Box::new(PassthroughDecoder), Box::new(renderer.clone()));

    let mut rng = thread_rng();
    for frame_number in 0..FRAME_COUNT {
        let frame: Vec<u8> = (0..rng.gen_range(200..1500)).map(|_| rng.gen()).collect();
        let chunks: Vec<&[u8]> = frame.chunks(MTU).collect();

        // Scramble fragment arrival and retransmit the occasional fragment,
        // the way a lossy link reorders and duplicates.
        let mut packets: Vec<(u32, &[u8])> = chunks
            .iter()
            .enumerate()
            .map(|(index, chunk)| (index as u32, *chunk))
            .collect();
        if rng.gen_bool(0.2) {
            let duplicate = packets.choose(&mut rng).copied();
            if let Some(duplicate) = duplicate {
                packets.push(duplicate);
            }
        }
        packets.shuffle(&mut rng);

        for (fragment_index, payload) in packets {
            if let Err(err) =
                buffer.receive_packet(payload, frame_number, fragment_index, chunks.len() as u32)
            {
                eprintln!("receive_packet failed on frame #{frame_number}: {err}");
                return;
            }
        }
    }

    // Let the workers drain everything we handed them.
    let deadline = Instant::now() + Duration::from_secs(5);
    while renderer.frames.load(Ordering::Relaxed) < FRAME_COUNT && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }

    let stats = buffer.stats();
    println!(
        "\n[STATS] rendered: {} | pending: {} | ready: {} | blocked: {}",
        stats.frames_rendered, stats.pending_frames, stats.ready_frames, stats.processing_blocked
    );
}
