//! WebSocket listener, dialer, and connection over `tokio-tungstenite`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::{Connection, ConnectionId, Listener, TransportError};

/// Counter for connection IDs, shared by both the accept and dial sides.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Accepted and dialed sockets share one stream type by wrapping plain
/// TCP in `MaybeTlsStream::Plain`.
type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A WebSocket [`Listener`] bound to a local address.
pub struct WsListener {
    listener: TcpListener,
}

impl WsListener {
    /// Binds to the given address (`host:port`; port 0 picks a free one).
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr).await.map_err(TransportError::Bind)?;
        tracing::info!(addr, "websocket listener bound");
        Ok(Self { listener })
    }
}

impl Listener for WsListener {
    type Connection = WsConnection;

    async fn accept(&mut self) -> Result<WsConnection, TransportError> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::Accept)?;

        let ws = tokio_tungstenite::accept_async(MaybeTlsStream::Plain(stream))
            .await
            .map_err(TransportError::Handshake)?;

        let conn = WsConnection::new(ws);
        tracing::debug!(id = %conn.id(), %peer, "accepted websocket connection");
        Ok(conn)
    }

    fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }
}

/// Dials a WebSocket server at `host:port` and returns the connection.
pub async fn ws_connect(addr: &str) -> Result<WsConnection, TransportError> {
    let url = format!("ws://{addr}");
    let (ws, _response) = tokio_tungstenite::connect_async(&url)
        .await
        .map_err(TransportError::Connect)?;

    let conn = WsConnection::new(ws);
    tracing::debug!(id = %conn.id(), addr, "dialed websocket connection");
    Ok(conn)
}

/// One WebSocket connection.
///
/// The stream is split so that a task blocked in [`recv`](Connection::recv)
/// never holds the lock a concurrent [`send`](Connection::send) needs —
/// the store server pushes subscription events while its read loop is
/// parked on the socket.
#[derive(Clone)]
pub struct WsConnection {
    id: ConnectionId,
    sink: Arc<Mutex<SplitSink<WsStream, Message>>>,
    stream: Arc<Mutex<SplitStream<WsStream>>>,
}

impl WsConnection {
    fn new(ws: WsStream) -> Self {
        let (sink, stream) = ws.split();
        Self {
            id: ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed)),
            sink: Arc::new(Mutex::new(sink)),
            stream: Arc::new(Mutex::new(stream)),
        }
    }
}

impl Connection for WsConnection {
    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let msg = Message::Binary(data.to_vec().into());
        self.sink
            .lock()
            .await
            .send(msg)
            .await
            .map_err(TransportError::Send)
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        loop {
            let msg = self.stream.lock().await.next().await;
            match msg {
                Some(Ok(Message::Binary(data))) => return Ok(Some(data.into())),
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(text.as_bytes().to_vec()));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // ping/pong/raw frame
                Some(Err(e)) => return Err(TransportError::Receive(e)),
            }
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.sink
            .lock()
            .await
            .send(Message::Close(None))
            .await
            .map_err(TransportError::Send)
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
