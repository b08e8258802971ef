// SPDX-License-Identifier: MPL-2.0

//! Photo capture pipeline
//!
//! ```text
//! Live stream → latest frame → mirror (front camera) → JPEG
//! ```
//!
//! Encoding runs on the blocking pool so the session task stays responsive.

pub mod capture;
pub mod encoding;

pub use capture::{ImageBuffer, PhotoCapture};
pub use encoding::PhotoEncoder;
