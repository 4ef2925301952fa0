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

//! The decoder contract consumed by the dispatch worker.

use crate::error::Result;

/// Upper bound on the number of bytes a decoder may produce for one frame.
/// The dispatcher pre-allocates its scratch buffer at this size.
pub const MAX_DECODED_SIZE: usize = 1024 * 1024; // 1 MiB

/// A synchronous video decoder.
///
/// The dispatch worker hands it one fully assembled frame at a time, in
/// strictly increasing frame-number order with no gaps.
pub trait Decoder: Send + Sync {
    /// Decodes `frame` into `output` and returns the number of bytes
    /// written, which must not exceed [`MAX_DECODED_SIZE`]. The input slice
    /// is not retained past the call.
    fn decode(&self, frame: &[u8], output: &mut [u8]) -> Result<usize>;
}
