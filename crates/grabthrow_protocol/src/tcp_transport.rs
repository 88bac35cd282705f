use std::collections::HashMap;
use std::io::{self, BufReader, BufWriter};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use crate::protocol::{ClientMessage, ServerMessage};
use crate::transport::{ClientTransport, ServerTransport, read_message, write_message};

/// Reader threads never hold a lock across a panic point, so a poisoned
/// mutex still guards consistent data.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// --- TCP Server Transport ---

struct TcpClient {
    writer: BufWriter<TcpStream>,
}

type Inbox = Arc<Mutex<Vec<(u64, ClientMessage)>>>;
type Clients = Arc<Mutex<HashMap<u64, TcpClient>>>;

pub struct TcpServerTransport {
    /// Incoming messages from all clients: (client_id, ClientMessage)
    incoming: Inbox,
    /// Connected clients (writer half)
    clients: Clients,
    local_addr: SocketAddr,
}

impl TcpServerTransport {
    /// Bind a listener and start accepting clients on a background thread.
    pub fn bind(addr: impl ToSocketAddrs) -> io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(false)?;
        let local_addr = listener.local_addr()?;

        let incoming: Inbox = Arc::new(Mutex::new(Vec::new()));
        let clients: Clients = Arc::new(Mutex::new(HashMap::new()));
        let next_id = Arc::new(AtomicU64::new(1));

        let incoming_clone = Arc::clone(&incoming);
        let clients_clone = Arc::clone(&clients);

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else {
                    continue;
                };
                let _ = stream.set_nodelay(true);

                let client_id = next_id.fetch_add(1, Ordering::SeqCst);

                let read_stream = match stream.try_clone() {
                    Ok(s) => s,
                    Err(_) => continue,
                };

                lock(&clients_clone).insert(
                    client_id,
                    TcpClient {
                        writer: BufWriter::new(stream),
                    },
                );

                let incoming_for_reader = Arc::clone(&incoming_clone);
                let clients_for_reader = Arc::clone(&clients_clone);

                thread::spawn(move || {
                    read_client(client_id, read_stream, incoming_for_reader, clients_for_reader)
                });
            }
        });

        Ok(Self {
            incoming,
            clients,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    fn write_filtered(&self, msg: &ServerMessage, skip: Option<u64>) {
        let mut clients = lock(&self.clients);
        let mut disconnected = Vec::new();
        for (&id, client) in clients.iter_mut() {
            if Some(id) == skip {
                continue;
            }
            if write_message(&mut client.writer, msg).is_err() {
                disconnected.push(id);
            }
        }
        for id in disconnected {
            clients.remove(&id);
        }
    }
}

fn read_client(client_id: u64, stream: TcpStream, incoming: Inbox, clients: Clients) {
    let mut reader = BufReader::new(stream);
    loop {
        match read_message::<_, ClientMessage>(&mut reader) {
            Ok(msg) => lock(&incoming).push((client_id, msg)),
            Err(_) => {
                // Connection closed or garbage on the wire: the tick sees a Disconnect.
                lock(&incoming).push((client_id, ClientMessage::Disconnect));
                lock(&clients).remove(&client_id);
                break;
            }
        }
    }
}

impl ServerTransport for TcpServerTransport {
    fn send(&self, client_id: u64, msg: ServerMessage) {
        let mut clients = lock(&self.clients);
        if let Some(client) = clients.get_mut(&client_id) {
            if write_message(&mut client.writer, &msg).is_err() {
                clients.remove(&client_id);
            }
        }
    }

    fn broadcast(&self, msg: ServerMessage) {
        self.write_filtered(&msg, None);
    }

    fn broadcast_except(&self, exclude_id: u64, msg: ServerMessage) {
        self.write_filtered(&msg, Some(exclude_id));
    }

    fn receive(&self) -> Vec<(u64, ClientMessage)> {
        std::mem::take(&mut *lock(&self.incoming))
    }

    fn disconnect(&self, client_id: u64) {
        if let Some(client) = lock(&self.clients).remove(&client_id) {
            let _ = client.writer.get_ref().shutdown(std::net::Shutdown::Both);
        }
    }
}

// --- TCP Client Transport ---

pub struct TcpClientTransport {
    writer: Mutex<BufWriter<TcpStream>>,
    incoming: Arc<Mutex<Vec<ServerMessage>>>,
}

impl TcpClientTransport {
    pub fn connect(addr: impl ToSocketAddrs) -> io::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        let read_stream = stream.try_clone()?;

        let incoming: Arc<Mutex<Vec<ServerMessage>>> = Arc::new(Mutex::new(Vec::new()));
        let incoming_clone = Arc::clone(&incoming);

        thread::spawn(move || {
            let mut reader = BufReader::new(read_stream);
            while let Ok(msg) = read_message::<_, ServerMessage>(&mut reader) {
                lock(&incoming_clone).push(msg);
            }
            tracing::warn!("connection to server lost");
        });

        Ok(Self {
            writer: Mutex::new(BufWriter::new(stream)),
            incoming,
        })
    }
}

impl ClientTransport for TcpClientTransport {
    fn send(&self, msg: ClientMessage) {
        let mut writer = lock(&self.writer);
        let _ = write_message(&mut *writer, &msg);
    }

    fn receive(&self) -> Vec<ServerMessage> {
        std::mem::take(&mut *lock(&self.incoming))
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;

    fn wait_for<T>(mut poll: impl FnMut() -> Vec<T>) -> Vec<T> {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let items = poll();
            if !items.is_empty() || Instant::now() > deadline {
                return items;
            }
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn loopback_request_and_broadcast() {
        let server = TcpServerTransport::bind("127.0.0.1:0").unwrap();
        let client = TcpClientTransport::connect(server.local_addr()).unwrap();

        client.send(ClientMessage::RequestPickup);
        let received = wait_for(|| server.receive());
        assert_eq!(received.len(), 1);
        let (client_id, msg) = &received[0];
        assert!(matches!(msg, ClientMessage::RequestPickup));

        server.send(
            *client_id,
            ServerMessage::PossessionChanged {
                character_id: *client_id,
                held: Some(4),
            },
        );
        let messages = wait_for(|| client.receive());
        assert!(matches!(
            messages[0],
            ServerMessage::PossessionChanged { held: Some(4), .. }
        ));
    }
}
