//! WebSocket front end.
//!
//! Accepts connections, parses JSON events into registry calls, and
//! drives the periodic broadcast/regeneration tasks. The registry is
//! the only shared state; every mutation goes through its lock.

use crate::config::Config;
use crate::registry::RoomRegistry;
use futures_util::{SinkExt, StreamExt};
use protocol::{ClientEvent, ServerEvent};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{RwLock, mpsc};
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{error, info, warn};

/// Server wall-clock in milliseconds since the epoch.
fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Spawn one independent periodic task over the registry.
fn spawn_periodic(
    registry: Arc<RwLock<RoomRegistry>>,
    period_ms: u64,
    task: fn(&mut RoomRegistry),
) {
    tokio::spawn(async move {
        let start = Instant::now() + Duration::from_millis(period_ms);
        let mut ticker = interval_at(start, Duration::from_millis(period_ms));
        // Skip missed ticks instead of bursting to catch up.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            task(&mut *registry.write().await);
        }
    });
}

/// Run the game server.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let config = Arc::new(config);
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on ws://{}", addr);

    let registry = Arc::new(RwLock::new(RoomRegistry::new(Arc::clone(&config))));

    spawn_periodic(
        Arc::clone(&registry),
        config.timing.broadcast_interval_ms,
        RoomRegistry::broadcast_tick,
    );
    spawn_periodic(
        Arc::clone(&registry),
        config.timing.gem_regen_interval_ms,
        RoomRegistry::regenerate_gems,
    );
    spawn_periodic(
        Arc::clone(&registry),
        config.timing.trap_regen_interval_ms,
        RoomRegistry::regenerate_traps,
    );

    let connections = Arc::new(AtomicUsize::new(0));
    let mut next_conn_id: u64 = 1;

    loop {
        let (stream, addr) = listener.accept().await?;

        if connections.load(Ordering::Acquire) >= config.server.max_connections {
            warn!("Connection rejected (limit reached): {}", addr);
            continue;
        }
        connections.fetch_add(1, Ordering::AcqRel);

        let conn_id = next_conn_id;
        next_conn_id += 1;

        let registry = Arc::clone(&registry);
        let connections = Arc::clone(&connections);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, addr, conn_id, Arc::clone(&registry)).await {
                error!("Connection error from {}: {}", addr, e);
            }
            // Always clean up, whatever ended the connection.
            registry.write().await.remove_player(conn_id);
            connections.fetch_sub(1, Ordering::AcqRel);
        });
    }
}

/// Handle a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    conn_id: u64,
    registry: Arc<RwLock<RoomRegistry>>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("New connection from {}", addr);

    let (mut write, mut read) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();

    loop {
        tokio::select! {
            // Inbound events.
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match protocol::parse_client_event(text.as_str()) {
                            Ok(ClientEvent::Subscribe { name }) => {
                                registry
                                    .write()
                                    .await
                                    .add_new_player(conn_id, name, tx.clone(), now_ms());
                            }
                            Ok(ClientEvent::Angle(buffer)) => {
                                registry
                                    .write()
                                    .await
                                    .update_player_position(conn_id, &buffer, now_ms());
                            }
                            Err(e) => {
                                warn!("Malformed event from {}: {}", addr, e);
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!("Client {} disconnected", addr);
                        break;
                    }
                    Some(Err(e)) => {
                        error!("WebSocket error from {}: {}", addr, e);
                        break;
                    }
                    None => break,
                    _ => {}
                }
            }
            // Outbound events queued by the registry.
            event = rx.recv() => {
                let Some(event) = event else { break };
                let text = match protocol::encode_server_event(&event) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("Failed to encode event for {}: {}", addr, e);
                        continue;
                    }
                };
                let last = matches!(event, ServerEvent::GameOver {});
                if let Err(e) = write.send(Message::Text(text.into())).await {
                    warn!("Failed to send to {}: {}", addr, e);
                    break;
                }
                // The player was eliminated; its session is already
                // gone, so close the socket.
                if last {
                    break;
                }
            }
        }
    }

    Ok(())
}
