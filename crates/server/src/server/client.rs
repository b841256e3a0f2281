//! Per-connection session state tracked by the simulation.

use std::net::SocketAddr;
use std::time::Instant;

#[derive(Debug)]
pub struct Client {
    pub id: u32,
    pub addr: SocketAddr,
    /// Updated on every inbound packet; drives the heartbeat timeout.
    pub last_activity: Instant,
}

impl Client {
    pub fn new(id: u32, addr: SocketAddr) -> Self {
        Self {
            id,
            addr,
            last_activity: Instant::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    pub fn idle_secs(&self) -> f32 {
        self.last_activity.elapsed().as_secs_f32()
    }
}
