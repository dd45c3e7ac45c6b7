//! Connection management and request correlation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, warn};

use super::auth;
use super::protocol::{
    opcode, Envelope, ExecutionType, Hello, Identified, Identify, Request, RequestBatch,
    RequestBatchResponse, RequestResponse,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Errors from the OBS client.
#[derive(Error, Debug)]
pub enum ObsError {
    #[error("websocket error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("failed to decode protocol message: {0}")]
    Protocol(#[from] serde_json::Error),

    #[error("the server requires a password and none is configured")]
    AuthRequired,

    #[error("identification rejected by the server (wrong password?)")]
    IdentifyRejected,

    #[error("unexpected message during handshake (op {0})")]
    UnexpectedMessage(u8),

    #[error("connection closed")]
    Closed,

    #[error("request '{request_type}' failed with code {code}: {comment}")]
    RequestFailed {
        request_type: String,
        code: i64,
        comment: String,
    },
}

/// Result type for OBS client operations.
pub type ObsResult<T> = Result<T, ObsError>;

#[derive(Default)]
struct Pending {
    requests: HashMap<String, oneshot::Sender<RequestResponse>>,
    batches: HashMap<String, oneshot::Sender<Vec<RequestResponse>>>,
}

/// Client for one identified obs-websocket session.
///
/// Requests may be issued concurrently; responses are matched back by
/// request id through the shared pending map.
pub struct ObsClient {
    tx: mpsc::UnboundedSender<Message>,
    pending: Arc<Mutex<Pending>>,
    next_id: AtomicU64,
    websocket_version: String,
    rpc_version: u32,
}

impl ObsClient {
    /// Connect to an obs-websocket server and perform the
    /// `Hello`/`Identify` handshake.
    pub async fn connect(url: &str, password: Option<&str>) -> ObsResult<Self> {
        debug!("connecting to {url}");
        let (mut stream, _) = connect_async(url).await?;

        let hello: Hello = expect_payload(&mut stream, opcode::HELLO).await?;
        let authentication = match (&hello.authentication, password) {
            (Some(challenge), Some(password)) => Some(auth::authentication_string(
                password,
                &challenge.salt,
                &challenge.challenge,
            )),
            (Some(_), None) => return Err(ObsError::AuthRequired),
            (None, _) => None,
        };

        let identify = Envelope::new(
            opcode::IDENTIFY,
            Identify {
                rpc_version: 1,
                authentication,
                event_subscriptions: 0,
            },
        )?;
        stream
            .send(Message::Text(serde_json::to_string(&identify)?.into()))
            .await?;

        // A bad password makes the server close the socket instead of
        // answering; surface that as a rejection.
        let identified: Identified = match expect_payload(&mut stream, opcode::IDENTIFIED).await
        {
            Ok(identified) => identified,
            Err(ObsError::Closed) => return Err(ObsError::IdentifyRejected),
            Err(other) => return Err(other),
        };
        debug!(
            "identified against obs-websocket {} (rpc {})",
            hello.obs_web_socket_version, identified.negotiated_rpc_version
        );

        let (write, read) = stream.split();
        let (tx, rx) = mpsc::unbounded_channel();
        let pending = Arc::new(Mutex::new(Pending::default()));

        tokio::spawn(sender_task(write, rx));
        tokio::spawn(receiver_task(read, Arc::clone(&pending)));

        Ok(Self {
            tx,
            pending,
            next_id: AtomicU64::new(1),
            websocket_version: hello.obs_web_socket_version,
            rpc_version: identified.negotiated_rpc_version,
        })
    }

    /// obs-websocket plugin version reported in `Hello`.
    pub fn websocket_version(&self) -> &str {
        &self.websocket_version
    }

    /// RPC version negotiated during the handshake.
    pub fn rpc_version(&self) -> u32 {
        self.rpc_version
    }

    fn next_request_id(&self) -> String {
        format!("r{}", self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Issue a single request and wait for its response data.
    ///
    /// A failed request status becomes [`ObsError::RequestFailed`].
    pub async fn call(
        &self,
        request_type: &str,
        data: Option<serde_json::Value>,
    ) -> ObsResult<serde_json::Value> {
        let request_id = self.next_request_id();
        let (response_tx, response_rx) = oneshot::channel();
        self.pending
            .lock()
            .expect("pending map poisoned")
            .requests
            .insert(request_id.clone(), response_tx);

        let mut request = Request::new(request_type, request_id.clone());
        request.request_data = data;
        let envelope = Envelope::new(opcode::REQUEST, request)?;
        if self
            .tx
            .send(Message::Text(serde_json::to_string(&envelope)?.into()))
            .is_err()
        {
            self.pending
                .lock()
                .expect("pending map poisoned")
                .requests
                .remove(&request_id);
            return Err(ObsError::Closed);
        }

        let response = response_rx.await.map_err(|_| ObsError::Closed)?;
        into_result(response)
    }

    /// Issue a request batch and return the raw per-request responses.
    ///
    /// Individual failures are reported in each entry's status; callers
    /// decide whether a failed entry aborts their operation.
    pub async fn call_batch(
        &self,
        requests: Vec<Request>,
        execution_type: ExecutionType,
        halt_on_failure: bool,
    ) -> ObsResult<Vec<RequestResponse>> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        let batch_id = self.next_request_id();
        let (response_tx, response_rx) = oneshot::channel();
        self.pending
            .lock()
            .expect("pending map poisoned")
            .batches
            .insert(batch_id.clone(), response_tx);

        let envelope = Envelope::new(
            opcode::REQUEST_BATCH,
            RequestBatch {
                request_id: batch_id.clone(),
                halt_on_failure,
                execution_type: execution_type.code(),
                requests,
            },
        )?;
        if self
            .tx
            .send(Message::Text(serde_json::to_string(&envelope)?.into()))
            .is_err()
        {
            self.pending
                .lock()
                .expect("pending map poisoned")
                .batches
                .remove(&batch_id);
            return Err(ObsError::Closed);
        }

        response_rx.await.map_err(|_| ObsError::Closed)
    }
}

/// Turn a response into its data, mapping a failed status to an error.
fn into_result(response: RequestResponse) -> ObsResult<serde_json::Value> {
    if response.request_status.result {
        Ok(response.response_data.unwrap_or(serde_json::Value::Null))
    } else {
        Err(ObsError::RequestFailed {
            request_type: response.request_type,
            code: response.request_status.code,
            comment: response.request_status.comment.unwrap_or_default(),
        })
    }
}

/// Read envelopes until one with the wanted opcode arrives (used only
/// during the handshake, before the receiver task owns the stream).
async fn expect_payload<T: serde::de::DeserializeOwned>(
    stream: &mut WsStream,
    want_op: u8,
) -> ObsResult<T> {
    loop {
        let message = stream.next().await.ok_or(ObsError::Closed)??;
        match message {
            Message::Text(text) => {
                let envelope: Envelope = serde_json::from_str(text.as_ref())?;
                if envelope.op == want_op {
                    return Ok(serde_json::from_value(envelope.d)?);
                }
                return Err(ObsError::UnexpectedMessage(envelope.op));
            }
            Message::Close(_) => return Err(ObsError::Closed),
            // Ping/pong and binary frames are not part of the handshake.
            _ => continue,
        }
    }
}

/// Pumps outgoing messages from the channel into the socket.
async fn sender_task(
    mut write: SplitSink<WsStream, Message>,
    mut rx: mpsc::UnboundedReceiver<Message>,
) {
    while let Some(message) = rx.recv().await {
        if let Err(e) = write.send(message).await {
            error!("failed to send websocket message: {e}");
            break;
        }
    }
    debug!("sender task terminated");
}

/// Routes incoming responses to their waiting callers.
async fn receiver_task(mut read: SplitStream<WsStream>, pending: Arc<Mutex<Pending>>) {
    while let Some(message) = read.next().await {
        let text = match message {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(frame)) => {
                warn!("server closed the connection: {frame:?}");
                break;
            }
            Ok(_) => continue,
            Err(e) => {
                error!("websocket receive error: {e}");
                break;
            }
        };

        let envelope: Envelope = match serde_json::from_str(text.as_ref()) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("ignoring undecodable message: {e}");
                continue;
            }
        };

        match envelope.op {
            opcode::REQUEST_RESPONSE => {
                match serde_json::from_value::<RequestResponse>(envelope.d) {
                    Ok(response) => {
                        let waiter = pending
                            .lock()
                            .expect("pending map poisoned")
                            .requests
                            .remove(&response.request_id);
                        match waiter {
                            Some(tx) => {
                                let _ = tx.send(response);
                            }
                            None => warn!(
                                "response for unknown request id {}",
                                response.request_id
                            ),
                        }
                    }
                    Err(e) => warn!("bad request response: {e}"),
                }
            }
            opcode::REQUEST_BATCH_RESPONSE => {
                match serde_json::from_value::<RequestBatchResponse>(envelope.d) {
                    Ok(response) => {
                        let waiter = pending
                            .lock()
                            .expect("pending map poisoned")
                            .batches
                            .remove(&response.request_id);
                        match waiter {
                            Some(tx) => {
                                let _ = tx.send(response.results);
                            }
                            None => warn!(
                                "batch response for unknown request id {}",
                                response.request_id
                            ),
                        }
                    }
                    Err(e) => warn!("bad batch response: {e}"),
                }
            }
            // This client subscribes to no events, but tolerate them.
            opcode::EVENT => {}
            other => debug!("ignoring message with op {other}"),
        }
    }

    // Wake every waiter so calls fail fast instead of hanging.
    let mut pending = pending.lock().expect("pending map poisoned");
    pending.requests.clear();
    pending.batches.clear();
    debug!("receiver task terminated");
}
