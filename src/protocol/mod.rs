//! Protocol module for decoding characteristic payloads.
//!
//! This module contains the implementations for:
//! - IEEE-11073 32-bit FLOAT decoding
//! - Temperature Measurement parsing

pub mod ieee11073;
pub mod measurement;

pub use measurement::{decode, encode};
