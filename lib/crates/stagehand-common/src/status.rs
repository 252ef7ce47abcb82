//! Status derivation: the pure half of the component state machine.

use crate::types::{DeployStatus, RemoteVersionInfo};

/// Derive a component's status from what is known locally and remotely.
///
/// `remote` is `None` until remote versions have been fetched. A missing
/// artifact always wins: nothing can be deployed until it is built. A
/// `Timestamp` remote is never compared against a version string.
#[must_use]
pub fn derive_status(
    has_artifact: bool,
    local_version: Option<&str>,
    remote: Option<&RemoteVersionInfo>,
) -> DeployStatus {
    if !has_artifact {
        return DeployStatus::BuildRequired;
    }
    match remote {
        None | Some(RemoteVersionInfo::Timestamp(_)) => DeployStatus::Unknown,
        Some(RemoteVersionInfo::NotDeployed) => DeployStatus::NotDeployed,
        Some(RemoteVersionInfo::Version(remote)) => match local_version {
            None => DeployStatus::Unknown,
            Some(local) if local == remote => DeployStatus::Current,
            Some(_) => DeployStatus::NeedsUpdate,
        },
    }
}
