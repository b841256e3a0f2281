//! Authoritative simulation core for a stake-based cell arena.
//!
//! Players buy in with a monetary stake that rides on their cells: splitting
//! divides it, merging recombines it, predation transfers it. The tick loop
//! in [`server::game`] drives movement, collisions, the shrinking hazard
//! zone, the bomb field and mass balancing, then ships one visibility-culled
//! snapshot per client each tick.

pub mod bombs;
pub mod collision;
pub mod config;
pub mod entity;
pub mod hazard;
pub mod math;
pub mod player;
pub mod server;
pub mod settlement;
pub mod world;
