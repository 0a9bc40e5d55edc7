//! Audient IPC protocol
//!
//! Command/response envelope and the length-framed transport connecting the
//! supervisor to the audit worker.

pub mod model;
pub mod transport;

pub use model::{
    Command, CommandAction, CommandResponse, HookEvent, HookEventType, HttpRequestData,
    HttpResponseData,
};
pub use transport::{FrameReceiver, FrameSender, TransportError, MAX_FRAME_BYTES};
