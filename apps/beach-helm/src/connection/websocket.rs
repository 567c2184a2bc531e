use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::debug;
use url::Url;

use super::{Connector, Link, TransportError};

/// Dials the controller's websocket endpoint. Each `connect` yields a fresh
/// link backed by its own pump task.
pub struct WebSocketConnector {
    endpoint: Url,
}

impl WebSocketConnector {
    pub fn new(endpoint: Url) -> Self {
        Self { endpoint }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self) -> Result<Link, TransportError> {
        let (ws_stream, _) = connect_async(self.endpoint.as_str())
            .await
            .map_err(|err| TransportError::Connect {
                endpoint: self.endpoint.to_string(),
                reason: err.to_string(),
            })?;

        let (tx_out, rx_out) = mpsc::unbounded_channel::<String>();
        let (tx_in, rx_in) = mpsc::unbounded_channel::<String>();
        tokio::spawn(pump(ws_stream, rx_out, tx_in));

        Ok(Link {
            outbound: tx_out,
            inbound: rx_in,
        })
    }
}

/// Moves frames between the socket and the link channels until either side
/// goes away. Dropping the inbound sender is what tells the manager the link
/// has closed.
async fn pump(
    ws_stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    mut rx_out: mpsc::UnboundedReceiver<String>,
    tx_in: mpsc::UnboundedSender<String>,
) {
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let send_task = tokio::spawn(async move {
        while let Some(text) = rx_out.recv().await {
            if ws_sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        let _ = ws_sender.close().await;
    });

    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                if tx_in.send(text).is_err() {
                    break;
                }
            }
            Ok(Message::Binary(data)) => match String::from_utf8(data) {
                Ok(text) => {
                    if tx_in.send(text).is_err() {
                        break;
                    }
                }
                Err(_) => {
                    debug!(target = "helm::connection", "dropping non-utf8 binary frame");
                }
            },
            Ok(Message::Close(frame)) => {
                debug!(target = "helm::connection", ?frame, "peer closed websocket");
                break;
            }
            Err(err) => {
                debug!(target = "helm::connection", error = %err, "websocket read failed");
                break;
            }
            _ => {}
        }
    }

    send_task.abort();
    let _ = send_task.await;
}
