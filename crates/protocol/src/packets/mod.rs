//! Packet definitions for the stake-arena protocol.
//!
//! Client -> server packets are parsed; server -> client packets are built.

mod client;
mod server;

pub use client::ClientPacket;
pub use server::*;
