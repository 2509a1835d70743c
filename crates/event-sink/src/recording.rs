//! Session recording hand-off

use std::future::Future;
use std::path::PathBuf;

use tracing::{error, info};
use uuid::Uuid;

use crate::SinkError;

/// Consumes a finished recording exactly once
///
/// Taking `self` by value means a handoff cannot be reused for a second
/// recording.
pub trait RecordingHandoff: Send {
    fn hand_off(
        self,
        session_id: Uuid,
        recording: Vec<u8>,
    ) -> impl Future<Output = Result<PathBuf, SinkError>> + Send;
}

/// Writes recordings to `{dir}/{session_id}.rec`
#[derive(Debug, Clone)]
pub struct LocalRecordingStore {
    dir: PathBuf,
}

impl LocalRecordingStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, session_id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.rec", session_id))
    }
}

impl RecordingHandoff for LocalRecordingStore {
    async fn hand_off(self, session_id: Uuid, recording: Vec<u8>) -> Result<PathBuf, SinkError> {
        if recording.is_empty() {
            return Err(SinkError::Storage("Recording is empty".to_string()));
        }
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(session_id);
        tokio::fs::write(&path, &recording).await?;
        Ok(path)
    }
}

/// Hand off a recording, logging the outcome
pub async fn hand_off_once<H: RecordingHandoff>(
    handoff: H,
    session_id: Uuid,
    recording: Vec<u8>,
) -> Option<PathBuf> {
    let size = recording.len();
    match handoff.hand_off(session_id, recording).await {
        Ok(path) => {
            info!("Recording for session {} stored at {} ({} bytes)", session_id, path.display(), size);
            Some(path)
        }
        Err(e) => {
            error!("Recording hand-off failed for session {}: {}", session_id, e);
            None
        }
    }
}
