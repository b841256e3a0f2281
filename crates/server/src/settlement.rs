//! Boundary toward the persistence/payment layer.
//!
//! The simulation never talks to storage directly: on session end it hands a
//! `SessionResult` to a [`SettlementSink`] and moves on. Sinks must not block
//! the tick loop; the provided channel sink is fire-and-forget.

use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    /// Terminal death in the arena; remaining stake already transferred out.
    Death,
    /// The player cashed out voluntarily.
    VoluntaryExit,
}

/// Final accounting for one finished session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionResult {
    pub player_id: u32,
    pub final_stake: f64,
    pub duration_alive: Duration,
    pub kind: ResultKind,
}

#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("settlement channel closed")]
    ChannelClosed,
}

/// Sink for finished sessions.
pub trait SettlementSink: Send + Sync {
    fn settle(&self, result: SessionResult) -> Result<(), SettlementError>;
}

/// Channel-backed sink; the receiving side does the actual persistence work
/// outside the tick loop.
pub struct ChannelSettlement {
    tx: mpsc::UnboundedSender<SessionResult>,
}

impl ChannelSettlement {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SessionResult>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl SettlementSink for ChannelSettlement {
    fn settle(&self, result: SessionResult) -> Result<(), SettlementError> {
        self.tx
            .send(result)
            .map_err(|_| SettlementError::ChannelClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_sink_delivers() {
        let (sink, mut rx) = ChannelSettlement::new();
        let result = SessionResult {
            player_id: 3,
            final_stake: 12.5,
            duration_alive: Duration::from_secs(60),
            kind: ResultKind::VoluntaryExit,
        };
        sink.settle(result.clone()).unwrap();
        assert_eq!(rx.try_recv().unwrap(), result);
    }

    #[test]
    fn test_closed_channel_reports_fault() {
        let (sink, rx) = ChannelSettlement::new();
        drop(rx);
        let result = SessionResult {
            player_id: 3,
            final_stake: 0.0,
            duration_alive: Duration::ZERO,
            kind: ResultKind::Death,
        };
        assert!(sink.settle(result).is_err());
    }
}
