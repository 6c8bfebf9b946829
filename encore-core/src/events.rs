//! Events broadcast by the engine.
//!
//! | Event | Subscription |
//! |-------|--------------|
//! | `EngineStatusEvent` | `EncoreEngine::subscribe_status` |
//! | `SessionEvent` | `EncoreEngine::subscribe_session` |
//!
//! Both serialize to camelCase JSON so a front end can mirror them.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Session events
// ---------------------------------------------------------------------------

/// Coarse session state, without the per-state payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionStateKind {
    Listening,
    CommandMode,
    WaitingSelection,
}

/// Emitted after every transcript the worker handles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEvent {
    /// Monotonically increasing event sequence number.
    pub seq: u64,
    /// Sequence number of the transcript that produced this event.
    pub transcript_seq: u64,
    pub state: SessionStateKind,
    /// Short description of what the worker did (e.g. `"command"`).
    pub outcome: String,
    /// Candidates pending a spoken selection, in prompt order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<String>,
}

// ---------------------------------------------------------------------------
// Engine status events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatusEvent {
    pub status: EngineStatus,
    /// Optional human-readable detail (e.g. error message).
    pub detail: Option<String>,
}

/// Current state of the Encore engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineStatus {
    /// Engine created but `start()` not yet called.
    Idle,
    /// Worker running and accepting transcripts.
    Running,
    /// Worker stopped; engine may be restarted.
    Stopped,
    /// The user asked the assistant to quit. Terminal.
    Quit,
}
