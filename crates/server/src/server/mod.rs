//! WebSocket transport: accept loop and per-connection tasks.

pub mod client;
pub mod game;

use crate::config::Config;
use crate::settlement::ChannelSettlement;
use futures_util::{SinkExt, StreamExt};
use game::{BroadcastMessage, GameState, TargetedMessage};
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, RwLock, broadcast};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// Connection accounting used to enforce total and per-IP limits.
#[derive(Debug, Default)]
struct ConnectionState {
    total: usize,
    per_ip: HashMap<IpAddr, usize>,
}

impl ConnectionState {
    fn try_register(&mut self, ip: IpAddr, max_total: usize, max_per_ip: usize) -> bool {
        let per_ip = self.per_ip.entry(ip).or_insert(0);
        if self.total >= max_total || *per_ip >= max_per_ip {
            return false;
        }
        *per_ip += 1;
        self.total += 1;
        true
    }

    fn unregister(&mut self, ip: IpAddr) {
        self.total = self.total.saturating_sub(1);
        if let Some(count) = self.per_ip.get_mut(&ip) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.per_ip.remove(&ip);
            }
        }
    }
}

/// Start the server: settlement worker, tick loop, accept loop.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let (targeted_tx, _) = broadcast::channel::<TargetedMessage>(1024);
    let (broadcast_tx, _) = broadcast::channel::<BroadcastMessage>(256);

    let (settlement, mut settlement_rx) = ChannelSettlement::new();
    tokio::spawn(async move {
        // Stand-in for the persistence/payment layer; results are consumed
        // outside the tick loop.
        while let Some(result) = settlement_rx.recv().await {
            info!(
                player_id = result.player_id,
                final_stake = result.final_stake,
                kind = ?result.kind,
                "session settled"
            );
        }
    });

    let addr = format!("{}:{}", config.server.bind, config.server.port);
    let max_connections = config.server.max_connections;
    let ip_limit = config.server.ip_limit;
    let server_name = config.server.name.clone();

    let state = Arc::new(RwLock::new(GameState::new(
        config,
        Arc::new(settlement),
        targeted_tx.clone(),
        broadcast_tx.clone(),
    )));
    tokio::spawn(game::run_game_loop(state.clone()));

    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, name = %server_name, "listening");

    let connections = Arc::new(Mutex::new(ConnectionState::default()));
    loop {
        let (stream, peer) = listener.accept().await?;
        let ip = peer.ip();
        if !connections
            .lock()
            .await
            .try_register(ip, max_connections, ip_limit)
        {
            warn!(%peer, "connection rejected by limit");
            continue;
        }

        let state = state.clone();
        let targeted_rx = targeted_tx.subscribe();
        let broadcast_rx = broadcast_tx.subscribe();
        let connections = connections.clone();
        tokio::spawn(async move {
            if let Err(err) = handle_connection(stream, peer, state, targeted_rx, broadcast_rx).await
            {
                debug!(%peer, %err, "connection closed with error");
            }
            connections.lock().await.unregister(ip);
        });
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    state: Arc<RwLock<GameState>>,
    mut targeted_rx: broadcast::Receiver<TargetedMessage>,
    mut broadcast_rx: broadcast::Receiver<BroadcastMessage>,
) -> anyhow::Result<()> {
    let ws = tokio_tungstenite::accept_async(stream).await?;
    let (mut ws_tx, mut ws_rx) = ws.split();
    let client_id = state.write().await.add_client(peer);

    loop {
        tokio::select! {
            incoming = ws_rx.next() => {
                match incoming {
                    Some(Ok(Message::Binary(data))) => {
                        state.write().await.handle_packet(client_id, &data);
                    }
                    Some(Ok(Message::Ping(data))) => {
                        ws_tx.send(Message::Pong(data)).await?;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        debug!(client_id, %err, "websocket error");
                        break;
                    }
                }
            }
            message = targeted_rx.recv() => {
                match message {
                    Ok(message) if message.client_id == client_id => {
                        ws_tx.send(Message::Binary(message.payload)).await?;
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(client_id, skipped, "targeted channel lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            message = broadcast_rx.recv() => {
                match message {
                    Ok(message) => {
                        ws_tx.send(Message::Binary(message.payload)).await?;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(client_id, skipped, "broadcast channel lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    state.write().await.remove_client(client_id);
    Ok(())
}
