//! Job lifecycle client for the Cadenza composer service.
//!
//! Wraps the composer HTTP API (file upload and training, status polling,
//! cancellation, artifact retrieval) and drives a
//! [`JobSession`](session::JobSession): submit a job, poll its status on a
//! fixed interval until a terminal state, and retrieve the generated
//! composition.  Session state transitions are delegated to the pure
//! reducer in `cadenza-core`; this crate owns the I/O around it.

pub mod api;
pub mod config;
pub mod events;
pub mod poller;
pub mod retry;
pub mod session;

pub use api::{ComposerApi, ComposerApiError, UploadFile};
pub use config::ClientConfig;
pub use events::SessionEvent;
pub use poller::{PollConfig, PollHandle};
pub use retry::RetryConfig;
pub use session::JobSession;
