//! Foreground location permission.
//!
//! Presenting a permission dialog is the front end's business; the pipeline
//! only asks a [`PermissionGate`] for the current answer.

use async_trait::async_trait;

use crate::config::LocationPermission;

/// Answer to a foreground location permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

impl PermissionStatus {
    pub fn is_granted(self) -> bool {
        self == PermissionStatus::Granted
    }
}

/// Source of truth for whether the position may be read.
#[async_trait]
pub trait PermissionGate: Send + Sync {
    /// Request (or look up) foreground location access.
    async fn request_foreground(&self) -> PermissionStatus;
}

/// Gate backed by the `location.permission` setting.
#[derive(Debug, Clone, Copy)]
pub struct StoredPermission(pub LocationPermission);

#[async_trait]
impl PermissionGate for StoredPermission {
    async fn request_foreground(&self) -> PermissionStatus {
        match self.0 {
            LocationPermission::Granted => PermissionStatus::Granted,
            LocationPermission::Denied => PermissionStatus::Denied,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stored_grant_is_granted() {
        let gate = StoredPermission(LocationPermission::Granted);
        assert!(gate.request_foreground().await.is_granted());
    }

    #[tokio::test]
    async fn stored_denial_is_denied() {
        let gate = StoredPermission(LocationPermission::Denied);
        assert_eq!(gate.request_foreground().await, PermissionStatus::Denied);
    }
}
