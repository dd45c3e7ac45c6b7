//! obs-websocket v5 client.
//!
//! The protocol is JSON envelopes over a WebSocket: a `Hello`/`Identify`
//! handshake (with optional challenge/salt authentication), then
//! request/response pairs correlated by request id, plus request batches
//! with a caller-chosen execution type.

mod auth;
mod client;
mod protocol;
mod requests;

pub use client::{ObsClient, ObsError, ObsResult};
pub use protocol::{ExecutionType, Request, RequestResponse, RequestStatus};
pub use requests::{
    InputSettings, SceneItem, SceneItemTransform, SourceFilter, VersionInfo,
    MEDIA_ACTION_PAUSE, MEDIA_ACTION_PLAY, VIDEO_DELAY_FILTER_KIND,
};
