//! Background transfer encoder.
//!
//! Converts raw byte buffers into a text-safe base64 representation on a
//! dedicated worker thread, so encoding a large payload never blocks the
//! interactive task.  Communication is one-shot message passing: each
//! request carries its own reply channel and receives exactly one result.
//!
//! The encoding is total over all byte values and reversible; [`decode`]
//! is the inverse and makes the round-trip law checkable.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tokio::sync::oneshot;

/// Errors from the transfer encoding layer.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// The worker thread is gone (request or reply channel closed).
    #[error("transfer encoder worker is not running")]
    WorkerUnavailable,

    /// The input to [`decode`] is not valid transfer encoding.
    #[error("invalid transfer encoding: {0}")]
    Decode(#[from] base64::DecodeError),

    /// The worker thread could not be started.
    #[error("failed to start transfer encoder worker: {0}")]
    Spawn(#[from] std::io::Error),
}

/// One encode request: a buffer in, a reply channel out.
struct EncodeRequest {
    bytes: Vec<u8>,
    reply: oneshot::Sender<String>,
}

/// Handle to the background encoding worker.
///
/// Dropping the handle closes the request channel, which ends the worker
/// thread after it drains any queued requests.
pub struct TransferEncoder {
    tx: std::sync::mpsc::Sender<EncodeRequest>,
}

impl TransferEncoder {
    /// Start the worker thread.
    pub fn spawn() -> Result<Self, EncodeError> {
        let (tx, rx) = std::sync::mpsc::channel::<EncodeRequest>();

        std::thread::Builder::new()
            .name("transfer-encoder".into())
            .spawn(move || {
                while let Ok(request) = rx.recv() {
                    let encoded = STANDARD.encode(&request.bytes);
                    // A dropped reply receiver means the caller gave up;
                    // nothing to do with the result.
                    let _ = request.reply.send(encoded);
                }
            })?;

        Ok(Self { tx })
    }

    /// Encode one buffer on the worker thread.
    ///
    /// Requests are processed in submission order, one result per request.
    pub async fn encode(&self, bytes: Vec<u8>) -> Result<String, EncodeError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EncodeRequest {
                bytes,
                reply: reply_tx,
            })
            .map_err(|_| EncodeError::WorkerUnavailable)?;
        reply_rx.await.map_err(|_| EncodeError::WorkerUnavailable)
    }
}

/// Decode a transfer-encoded string back to the original bytes.
pub fn decode(encoded: &str) -> Result<Vec<u8>, EncodeError> {
    Ok(STANDARD.decode(encoded)?)
}
