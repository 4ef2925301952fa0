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

//! A strictly-ordered reassembly jitter buffer for packetized video.
//!
//! Frame fragments arrive out of order from the network; the buffer
//! reassembles each frame, releases completed frames to a [`Decoder`] in
//! monotonically increasing frame-number order with no gaps, and forwards
//! the decoded bytes to a [`Renderer`], all without blocking the ingress
//! caller on decode or render.
//!
//! Data flow: ingress -> staging store -> recycler thread -> ready queue ->
//! dispatcher thread -> decoder -> renderer.

pub mod decoder;
pub mod error;
pub mod frame;
pub mod jitter_buffer;
pub mod ready_queue;
pub mod renderer;
pub mod store;

pub use decoder::{Decoder, MAX_DECODED_SIZE};
pub use error::{JitterBufferError, Result};
pub use frame::{Fragment, FrameAssembler};
pub use jitter_buffer::{JitterBuffer, JitterBufferStats};
pub use renderer::Renderer;
pub use store::MAX_FRAMES;
