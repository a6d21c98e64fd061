//! The downloadable output of a completed job.

/// Suggested filename offered to the user for a generated composition.
pub const ARTIFACT_FILENAME: &str = "ai_composition.mid";

/// A generated composition retrieved from the composer service.
///
/// The artifact is transient: it lives only as long as the session that
/// produced it and is discarded whenever a new file selection replaces
/// the current job.
#[derive(Debug, Clone)]
pub struct Artifact {
    /// Raw MIDI bytes as returned by the service.
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Filename under which the artifact should be offered for download.
    pub fn suggested_filename(&self) -> &'static str {
        ARTIFACT_FILENAME
    }
}
