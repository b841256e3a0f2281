//! Shared protocol crate for the stake-arena server.
//!
//! This crate contains:
//! - Binary reading/writing utilities
//! - Packet definitions and builders
//! - Shared types (Hue)

mod binary;
mod error;
pub mod packets;

pub use binary::{BinaryReader, BinaryWriter};
pub use error::ProtocolError;

/// Player hue in degrees, 0..360. Clients derive the full palette from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Hue(pub u16);

impl Hue {
    pub const fn new(deg: u16) -> Self {
        Self(deg % 360)
    }
}
