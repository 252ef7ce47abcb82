//! Command implementations

pub mod connection;
pub mod deploy;
pub mod modules;
pub mod project;
pub mod status;
