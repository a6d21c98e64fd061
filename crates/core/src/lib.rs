//! Domain types and session state machine for the Cadenza composer client.
//!
//! This crate is I/O-free: it defines the [`JobStatus`](status::JobStatus)
//! vocabulary shared with the remote composer service, the
//! [`Artifact`](artifact::Artifact) produced by a finished job, and a pure
//! reducer over session state so that every transition can be unit-tested
//! without a network or a rendered front-end.

pub mod artifact;
pub mod session;
pub mod status;
