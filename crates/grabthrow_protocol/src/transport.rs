use std::io::{self, Read, Write};
use std::sync::{Mutex, mpsc};

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;

use crate::protocol::{ClientMessage, ServerMessage};

/// Client id used by the in-process transport.
pub const LOCAL_CLIENT_ID: u64 = 0;

/// Transport trait for the client side (sends ClientMessage, receives ServerMessage).
pub trait ClientTransport: Send + Sync + 'static {
    fn send(&self, msg: ClientMessage);
    fn receive(&self) -> Vec<ServerMessage>;
}

/// Transport trait for the server side (sends ServerMessage, receives ClientMessage).
///
/// Implementations must deliver messages to a given client in the order they were sent.
pub trait ServerTransport: Send + Sync + 'static {
    fn send(&self, client_id: u64, msg: ServerMessage);
    fn broadcast(&self, msg: ServerMessage);
    fn broadcast_except(&self, exclude_id: u64, msg: ServerMessage);
    fn receive(&self) -> Vec<(u64, ClientMessage)>;
    fn disconnect(&self, client_id: u64);
}

// --- Serialization helpers (length-prefixed bincode framing) ---

/// Largest compressed frame a peer may announce.
pub const MAX_FRAME: usize = 1 << 20;
/// Largest inflated payload accepted from one frame.
pub const MAX_PAYLOAD: u64 = 4 << 20;

/// Write a length-prefixed, zlib-compressed bincode message to a writer.
pub fn write_message<W: Write, T: serde::Serialize>(writer: &mut W, msg: &T) -> io::Result<()> {
    let data =
        bincode::serialize(msg).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::fast());
    encoder.write_all(&data)?;
    let compressed = encoder.finish()?;
    let len = (compressed.len() as u32).to_be_bytes();
    writer.write_all(&len)?;
    writer.write_all(&compressed)?;
    writer.flush()?;
    Ok(())
}

/// Read a length-prefixed, zlib-compressed bincode message from a reader.
pub fn read_message<R: Read, T: serde::de::DeserializeOwned>(reader: &mut R) -> io::Result<T> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame of {len} bytes exceeds {MAX_FRAME}"),
        ));
    }
    let mut compressed = vec![0u8; len];
    reader.read_exact(&mut compressed)?;
    let mut decoder = ZlibDecoder::new(&compressed[..]).take(MAX_PAYLOAD + 1);
    let mut data = Vec::new();
    decoder.read_to_end(&mut data)?;
    if data.len() as u64 > MAX_PAYLOAD {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "inflated payload too large",
        ));
    }
    bincode::deserialize(&data).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn drain<T>(rx: &Mutex<mpsc::Receiver<T>>) -> Vec<T> {
    let Ok(rx) = rx.lock() else {
        return Vec::new();
    };
    rx.try_iter().collect()
}

// --- Local transport (same-process via mpsc channels) ---

/// Local client transport using mpsc channels (same-process communication).
pub struct LocalClientTransport {
    tx: mpsc::Sender<ClientMessage>,
    rx: Mutex<mpsc::Receiver<ServerMessage>>,
}

impl ClientTransport for LocalClientTransport {
    fn send(&self, msg: ClientMessage) {
        let _ = self.tx.send(msg);
    }

    fn receive(&self) -> Vec<ServerMessage> {
        drain(&self.rx)
    }
}

/// Local server transport using mpsc channels (same-process communication).
pub struct LocalServerTransport {
    tx: mpsc::Sender<ServerMessage>,
    rx: Mutex<mpsc::Receiver<ClientMessage>>,
}

impl ServerTransport for LocalServerTransport {
    fn send(&self, client_id: u64, msg: ServerMessage) {
        if client_id == LOCAL_CLIENT_ID {
            let _ = self.tx.send(msg);
        }
    }

    fn broadcast(&self, msg: ServerMessage) {
        let _ = self.tx.send(msg);
    }

    fn broadcast_except(&self, exclude_id: u64, msg: ServerMessage) {
        // The only local client is LOCAL_CLIENT_ID.
        if exclude_id != LOCAL_CLIENT_ID {
            let _ = self.tx.send(msg);
        }
    }

    fn receive(&self) -> Vec<(u64, ClientMessage)> {
        drain(&self.rx)
            .into_iter()
            .map(|msg| (LOCAL_CLIENT_ID, msg))
            .collect()
    }

    fn disconnect(&self, _client_id: u64) {
        // No-op for local transport
    }
}

/// Create a pair of local transports connected by mpsc channels.
/// Used for solo play (client and server in the same process).
pub fn create_local_transport() -> (LocalClientTransport, LocalServerTransport) {
    let (client_tx, server_rx) = mpsc::channel();
    let (server_tx, client_rx) = mpsc::channel();
    (
        LocalClientTransport {
            tx: client_tx,
            rx: Mutex::new(client_rx),
        },
        LocalServerTransport {
            tx: server_tx,
            rx: Mutex::new(server_rx),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy_math::Vec3;

    #[test]
    fn framed_message_survives_a_stream() {
        let mut buf = Vec::new();
        write_message(
            &mut buf,
            &ServerMessage::ObjectMoved {
                id: 7,
                position: Vec3::new(1.0, 2.0, 3.0),
            },
        )
        .unwrap();
        write_message(&mut buf, &ServerMessage::ThrowAnimation { character_id: 3 }).unwrap();

        let mut reader = &buf[..];
        let first: ServerMessage = read_message(&mut reader).unwrap();
        let second: ServerMessage = read_message(&mut reader).unwrap();
        assert!(matches!(
            first,
            ServerMessage::ObjectMoved { id: 7, position } if position == Vec3::new(1.0, 2.0, 3.0)
        ));
        assert!(matches!(
            second,
            ServerMessage::ThrowAnimation { character_id: 3 }
        ));
    }

    #[test]
    fn truncated_frame_is_an_error() {
        let mut buf = Vec::new();
        write_message(&mut buf, &ClientMessage::RequestPickup).unwrap();
        buf.truncate(buf.len() - 1);
        let result: io::Result<ClientMessage> = read_message(&mut &buf[..]);
        assert!(result.is_err());

        // A huge announced length is refused before anything is allocated.
        let oversized = ((MAX_FRAME + 1) as u32).to_be_bytes();
        let result: io::Result<ClientMessage> = read_message(&mut &oversized[..]);
        let err = result.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn oversized_payload_is_refused_after_inflating() {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
        encoder
            .write_all(&vec![0u8; MAX_PAYLOAD as usize + 1024])
            .unwrap();
        let compressed = encoder.finish().unwrap();
        assert!(compressed.len() <= MAX_FRAME);

        let mut buf = (compressed.len() as u32).to_be_bytes().to_vec();
        buf.extend_from_slice(&compressed);
        let result: io::Result<ClientMessage> = read_message(&mut &buf[..]);
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn local_transport_preserves_order() {
        let (client, server) = create_local_transport();
        client.send(ClientMessage::RequestPickup);
        client.send(ClientMessage::RequestThrow);

        let received = server.receive();
        assert_eq!(received.len(), 2);
        assert!(matches!(received[0], (LOCAL_CLIENT_ID, ClientMessage::RequestPickup)));
        assert!(matches!(received[1], (LOCAL_CLIENT_ID, ClientMessage::RequestThrow)));

        server.broadcast_except(LOCAL_CLIENT_ID, ServerMessage::CharacterLeft { character_id: 1 });
        server.broadcast(ServerMessage::ThrowAnimation { character_id: 0 });
        let messages = client.receive();
        assert_eq!(messages.len(), 1);
        assert!(matches!(
            messages[0],
            ServerMessage::ThrowAnimation { character_id: 0 }
        ));
    }
}
