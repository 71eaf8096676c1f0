//! # Module Discovery
//!
//! Broadcast-based presence protocol. The collector sends a reserved
//! `discover` probe to the broadcast address and accumulates replies into a
//! deduplicated roster. The listening socket lives only for the duration of
//! the call; nothing persists once the window elapses.

use crate::config::DiscoveryConfig;
use crate::core::codec;
use crate::core::message::{
    Command, Message, ModuleType, Response, DISCOVER_ACTION, WILDCARD_ID,
};
use crate::error::{ModuleError, Result};
use crate::utils::time::unix_timestamp_ms;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tokio::net::UdpSocket;
use tokio::time::Instant;
use tracing::{debug, instrument};

/// A module learned through discovery. Never expired by the core; staleness
/// policy belongs to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRecord {
    pub id: String,
    pub module_type: ModuleType,
    pub address: IpAddr,
    pub port: u16,
    /// Milliseconds since the Unix epoch of the latest reply from this
    /// identity. Refreshed, not replaced, on repeated replies.
    pub last_seen: u64,
}

/// The reserved presence probe: wildcard-addressed, `discover` action.
pub fn discovery_probe() -> Command {
    Command {
        module_id: WILDCARD_ID.to_string(),
        module_type: ModuleType::Custom,
        action: DISCOVER_ACTION.to_string(),
        params: Map::new(),
    }
}

/// Broadcast the presence probe and collect replies until the window
/// elapses. Probes are divided evenly across `config.attempts`
/// transmissions. Replies are deduplicated by `(module_id, address, port)`;
/// replies without a `module_type` in their data are ignored.
#[instrument(skip(config), fields(broadcast = %config.broadcast_address, port = config.port))]
pub async fn discover(config: &DiscoveryConfig) -> Result<Vec<ModuleRecord>> {
    let broadcast_ip: Ipv4Addr = config.broadcast_address.parse().map_err(|_| {
        ModuleError::Config(format!(
            "invalid broadcast address: {}",
            config.broadcast_address
        ))
    })?;
    let destination = SocketAddr::from((broadcast_ip, config.port));

    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
    socket.set_broadcast(true)?;

    let payload = codec::encode_message(&Message::new(vec![discovery_probe()], None))?;

    let attempts = config.attempts.max(1);
    let window = config.timeout / attempts;
    let mut roster = Roster::default();
    let mut buf = [0u8; 2048];

    for attempt in 0..attempts {
        socket.send_to(&payload, destination).await?;
        debug!(attempt, "discovery probe sent");

        let deadline = Instant::now() + window;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            let received = match tokio::time::timeout(remaining, socket.recv_from(&mut buf)).await
            {
                Err(_elapsed) => break,
                Ok(Err(error)) => {
                    debug!(%error, "discovery receive failed");
                    continue;
                }
                Ok(Ok(received)) => received,
            };

            let (len, source) = received;
            match codec::decode_response(&buf[..len]) {
                Ok(response) => roster.observe(&response, source),
                Err(error) => {
                    debug!(%source, %error, "ignoring malformed discovery reply");
                }
            }
        }
    }

    let modules = roster.into_records();
    debug!(modules = modules.len(), "discovery finished");
    Ok(modules)
    // The transient socket is dropped here; the listener never outlives the call.
}

/// Accumulates discovery replies, collapsing repeats from the same
/// `(module_id, address, port)` identity into one record.
#[derive(Debug, Default)]
struct Roster {
    records: Vec<ModuleRecord>,
    seen: HashMap<(String, IpAddr, u16), usize>,
}

impl Roster {
    fn observe(&mut self, response: &Response, source: SocketAddr) {
        let Some(module_type) = reply_module_type(response) else {
            // Not a discovery reply; unrelated unicast noise is ignored.
            return;
        };

        let key = (response.module_id.clone(), source.ip(), source.port());
        let now = unix_timestamp_ms();
        match self.seen.get(&key) {
            Some(&index) => {
                self.records[index].last_seen = now;
            }
            None => {
                self.seen.insert(key, self.records.len());
                self.records.push(ModuleRecord {
                    id: response.module_id.clone(),
                    module_type,
                    address: source.ip(),
                    port: source.port(),
                    last_seen: now,
                });
            }
        }
    }

    fn into_records(self) -> Vec<ModuleRecord> {
        self.records
    }
}

fn reply_module_type(response: &Response) -> Option<ModuleType> {
    let value = response.data.as_ref()?.get("module_type")?;
    match value {
        Value::String(_) => serde_json::from_value(value.clone()).ok(),
        _ => None,
    }
}
