//! The broadcast fabric (spec.md §4.7 C7): `send_packet`, `broadcast_to_others`,
//! and targeted-subset send. Every function here takes the clients-table lock
//! only long enough to snapshot the `Arc<ClientHandle>`s it needs, then
//! releases it before touching any individual channel — per spec.md §4.7 and
//! §5, the outer table lock must never be held across I/O that can suspend.
//! Because sends go through each client's bounded outbound queue rather than
//! a socket write directly, "I/O" here is just a channel push; the real
//! socket write happens later on that client's writer task.

use anyhow::Result;
use bytes::BytesMut;
use pickaxe_protocol_core::{ConnectionState, InternalPacket, ProtocolAdapter};
use uuid::Uuid;

use crate::context::{ClientHandle, OutboundFrame, ServerContext};

fn encode(ctx: &ServerContext, state: ConnectionState, packet: &InternalPacket) -> Result<OutboundFrame> {
    let mut encoded: BytesMut = ctx.adapter.encode_packet(state, packet)?;
    let packet_id = pickaxe_protocol_core::read_varint(&mut encoded)?;
    Ok(OutboundFrame {
        packet_id,
        payload: encoded.freeze(),
    })
}

/// Send one packet to one client (spec.md §4.7 `sendPacket`).
pub fn send_packet(ctx: &ServerContext, client: &ClientHandle, packet: &InternalPacket) -> Result<()> {
    let frame = encode(ctx, ConnectionState::Play, packet)?;
    client.try_send(frame);
    Ok(())
}

/// Send a packet using a non-Play encode state (Status/Login/Configuration).
pub fn send_packet_in_state(
    ctx: &ServerContext,
    client: &ClientHandle,
    state: ConnectionState,
    packet: &InternalPacket,
) -> Result<()> {
    let frame = encode(ctx, state, packet)?;
    client.try_send(frame);
    Ok(())
}

/// Broadcast to every connected client (spec.md §4.7 `broadcastToOthers`,
/// no-exclusion form).
pub fn broadcast_to_all(ctx: &ServerContext, packet: &InternalPacket) -> Result<()> {
    broadcast_to_others(ctx, packet, None)
}

/// Broadcast to every connected client except `exclude`, matching spec.md
/// §4.7's two `broadcastToOthers` overloads. Takes the clients-table lock
/// only to clone the `Arc`s out, then releases it before sending.
pub fn broadcast_to_others(ctx: &ServerContext, packet: &InternalPacket, exclude: Option<Uuid>) -> Result<()> {
    let frame = encode(ctx, ConnectionState::Play, packet)?;
    let targets: Vec<_> = {
        let clients = ctx.connected_clients.read().unwrap();
        clients
            .iter()
            .filter(|(uuid, _)| Some(**uuid) != exclude)
            .map(|(_, handle)| handle.clone())
            .collect()
    };
    for client in targets {
        client.try_send(frame.clone());
    }
    Ok(())
}

/// Send to a caller-provided subset of clients (spec.md §4.7 targeted-subset
/// send). Entries whose connection is gone are skipped rather than erroring.
pub fn send_to_subset(ctx: &ServerContext, targets: &[Uuid], packet: &InternalPacket) -> Result<()> {
    let frame = encode(ctx, ConnectionState::Play, packet)?;
    let clients = ctx.connected_clients.read().unwrap();
    for uuid in targets {
        if let Some(client) = clients.get(uuid) {
            client.try_send(frame.clone());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::context::ClientHandle;
    use pickaxe_types::TextComponent;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn make_client(ctx: &ServerContext, uuid: Uuid) -> (Arc<ClientHandle>, mpsc::Receiver<OutboundFrame>) {
        let (tx, rx) = mpsc::channel(64);
        let client = Arc::new(ClientHandle::new(uuid, "127.0.0.1:1".parse().unwrap(), 1, tx));
        ctx.connected_clients.write().unwrap().insert(uuid, client.clone());
        (client, rx)
    }

    #[test]
    fn test_broadcast_to_others_excludes_named_client() {
        let ctx = ServerContext::new(ServerConfig::default());
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let (_ca, mut rx_a) = make_client(&ctx, a);
        let (_cb, mut rx_b) = make_client(&ctx, b);

        broadcast_to_others(
            &ctx,
            &InternalPacket::Disconnect { reason: TextComponent::plain("bye") },
            Some(a),
        )
        .unwrap();

        assert!(rx_a.try_recv().is_err(), "excluded client should receive nothing");
        assert!(rx_b.try_recv().is_ok(), "other client should receive the broadcast");
    }

    #[test]
    fn test_send_to_subset_skips_missing_clients() {
        let ctx = ServerContext::new(ServerConfig::default());
        let a = Uuid::new_v4();
        let missing = Uuid::new_v4();
        let (_ca, mut rx_a) = make_client(&ctx, a);

        send_to_subset(
            &ctx,
            &[a, missing],
            &InternalPacket::Disconnect { reason: TextComponent::plain("bye") },
        )
        .unwrap();

        assert!(rx_a.try_recv().is_ok());
    }
}
