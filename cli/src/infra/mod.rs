//! Infrastructure layer: concrete implementations of application port traits.
//!
//! Process execution, SSH/SCP, HTTP, and configuration and manifest files.
//!
//! Imports from `crate::domain` and `crate::application::ports` are allowed.
//! Imports from `crate::commands` or `crate::output` are forbidden.

pub mod command_runner;
pub mod config;
pub mod http;
pub mod manifest;
pub mod ssh;
pub mod token;
