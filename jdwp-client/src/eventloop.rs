// JDWP socket event loop
//
// One task owns the socket halves, routes replies to waiting commands by
// packet id, and broadcasts VM-initiated event packets.

use crate::events::{parse_event_packet, EventSet};
use crate::protocol::{CommandPacket, JdwpError, JdwpResult, ReplyPacket, HEADER_SIZE, REPLY_FLAG};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

/// Upper bound on a single packet; guards against a corrupt length field.
const MAX_PACKET_SIZE: usize = 10 * 1024 * 1024;

pub struct CommandRequest {
    pub packet: CommandPacket,
    pub reply_tx: oneshot::Sender<JdwpResult<ReplyPacket>>,
}

/// Cloneable handle for sending commands and draining events.
#[derive(Clone, Debug)]
pub struct EventLoopHandle {
    command_tx: mpsc::Sender<CommandRequest>,
    event_rx: Arc<tokio::sync::Mutex<mpsc::Receiver<EventSet>>>,
}

impl EventLoopHandle {
    pub async fn send_command(&self, packet: CommandPacket) -> JdwpResult<ReplyPacket> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.command_tx
            .send(CommandRequest { packet, reply_tx })
            .await
            .map_err(|_| JdwpError::ConnectionClosed)?;

        reply_rx.await.map_err(|_| JdwpError::ConnectionClosed)?
    }

    /// Non-blocking event poll.
    pub async fn try_recv_event(&self) -> Option<EventSet> {
        let mut rx = self.event_rx.lock().await;
        rx.try_recv().ok()
    }

    /// Wait for the next event.
    pub async fn recv_event(&self) -> Option<EventSet> {
        let mut rx = self.event_rx.lock().await;
        rx.recv().await
    }
}

pub fn spawn_event_loop(reader: OwnedReadHalf, writer: OwnedWriteHalf) -> EventLoopHandle {
    let (command_tx, command_rx) = mpsc::channel(32);
    // Events (breakpoints, steps) must not be dropped under load
    let (event_tx, event_rx) = mpsc::channel(256);

    tokio::spawn(event_loop_task(reader, writer, command_rx, event_tx));

    EventLoopHandle {
        command_tx,
        event_rx: Arc::new(tokio::sync::Mutex::new(event_rx)),
    }
}

async fn event_loop_task(
    mut reader: OwnedReadHalf,
    mut writer: OwnedWriteHalf,
    mut command_rx: mpsc::Receiver<CommandRequest>,
    event_tx: mpsc::Sender<EventSet>,
) {
    debug!("Event loop started");

    let mut pending_replies: HashMap<u32, oneshot::Sender<JdwpResult<ReplyPacket>>> =
        HashMap::new();

    loop {
        tokio::select! {
            Some(cmd) = command_rx.recv() => {
                let packet_id = cmd.packet.id;

                let encoded = cmd.packet.encode();
                if let Err(e) = writer.write_all(&encoded).await {
                    error!("Failed to write command: {}", e);
                    cmd.reply_tx.send(Err(JdwpError::Io(e))).ok();
                    continue;
                }
                if let Err(e) = writer.flush().await {
                    error!("Failed to flush command: {}", e);
                    cmd.reply_tx.send(Err(JdwpError::Io(e))).ok();
                    continue;
                }

                pending_replies.insert(packet_id, cmd.reply_tx);
            }

            result = read_packet(&mut reader) => {
                match result {
                    Ok((is_reply, packet_id, data)) => {
                        if is_reply {
                            if let Some(tx) = pending_replies.remove(&packet_id) {
                                tx.send(ReplyPacket::decode(&data)).ok();
                            } else {
                                warn!("Reply for unknown command id={}", packet_id);
                            }
                        } else {
                            // VM-initiated event; body starts after the header
                            match parse_event_packet(&data[HEADER_SIZE..]) {
                                Ok(event_set) => {
                                    info!(
                                        "Event set: {} event(s), suspend_policy={}",
                                        event_set.events.len(),
                                        event_set.suspend_policy
                                    );
                                    match event_tx.try_send(event_set) {
                                        Ok(_) => {}
                                        Err(mpsc::error::TrySendError::Full(set)) => {
                                            error!(
                                                "Event channel full, dropping {} event(s)",
                                                set.events.len()
                                            );
                                        }
                                        Err(mpsc::error::TrySendError::Closed(_)) => {
                                            warn!("Event receiver dropped");
                                        }
                                    }
                                }
                                Err(e) => warn!("Failed to parse event packet: {}", e),
                            }
                        }
                    }
                    Err(e) => {
                        error!("Failed to read packet: {}", e);
                        break;
                    }
                }
            }
        }
    }

    // Wake up everything still waiting on a reply
    for (_, tx) in pending_replies {
        tx.send(Err(JdwpError::ConnectionClosed)).ok();
    }

    debug!("Event loop shut down");
}

/// Read one packet; returns (is_reply, packet id, full packet bytes).
async fn read_packet(reader: &mut OwnedReadHalf) -> JdwpResult<(bool, u32, Vec<u8>)> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header).await.map_err(JdwpError::Io)?;

    let length = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
    let packet_id = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);
    let flags = header[8];

    if length < HEADER_SIZE {
        return Err(JdwpError::Protocol(format!(
            "Invalid packet length: {}",
            length
        )));
    }
    if length > MAX_PACKET_SIZE {
        return Err(JdwpError::Protocol(format!(
            "Packet too large: {} bytes (max {})",
            length, MAX_PACKET_SIZE
        )));
    }

    let mut full_packet = header.to_vec();
    let data_len = length - HEADER_SIZE;
    if data_len > 0 {
        let mut data = vec![0u8; data_len];
        reader.read_exact(&mut data).await.map_err(JdwpError::Io)?;
        full_packet.extend_from_slice(&data);
    }

    Ok((flags == REPLY_FLAG, packet_id, full_packet))
}
