//! Application layer: port trait definitions and use-case orchestration.
//!
//! This module depends only on `crate::domain` and the shared model crate,
//! never on `crate::infra`, `crate::commands`, or `crate::output`.

pub mod ports;
pub mod services;

pub use ports::{
    ApiRequest, ApiResponse, ApiTransport, CapturedOutput, CommandRunner, CommandSpec,
    ConfigStore, NullSink, OutputSink, ProgressReporter, RemoteExecutor, SettingsLookup,
    TokenProvider,
};
