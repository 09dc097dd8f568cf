//! Error types for Stagehand
//!
//! Provides error handling for:
//! - Unknown resource names in a transition request
//! - Catalog construction failures (duplicate or unrecognised entries)
//! - Host provider faults during load, unload and cleanup
//! - Descriptor registry lookups
//!
//! Requests that are merely ignored (a transition already in flight, or a
//! request for the active descriptor) are not errors; see
//! [`crate::orchestrator::RejectReason`].

use std::fmt;

/// Main Stagehand error type
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StagehandError {
    /// A requested resource is not in the catalog
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Catalog could not be built from the host's registered resources
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Host failed a load, unload or cleanup request
    #[error("provider fault: {0}")]
    Provider(#[from] ProviderFault),

    /// Descriptor registry lookup or registration failed
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Phase machine was asked to skip or reverse a phase
    #[error("phase error: {0}")]
    Phase(#[from] PhaseError),
}

impl StagehandError {
    /// Fatal errors leave the orchestrator or catalog unusable
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Provider(_) | Self::Catalog(_) | Self::Phase(_))
    }

    /// Recoverable errors leave all state untouched; the caller may retry
    /// with a corrected request
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !self.is_fatal()
    }
}

/// Request validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Name does not match any catalog entry (case-insensitive)
    #[error("unknown resource: {name}")]
    UnknownResource { name: String },
}

/// Catalog construction errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    /// Two registered paths derive the same case-insensitive name
    #[error("duplicate resource name '{name}': {first} and {second}")]
    DuplicateName {
        name: String,
        first: String,
        second: String,
    },

    /// Registered path does not follow the catalog naming rule
    #[error("cannot derive a resource name from path: {path}")]
    UnrecognisedPath { path: String },

    /// Naming rule could not be compiled
    #[error("invalid naming rule: {0}")]
    InvalidRule(String),
}

/// Descriptor registry errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// No constructor registered under this id
    #[error("unknown descriptor: {id}")]
    UnknownDescriptor { id: String },

    /// Id already has a constructor
    #[error("descriptor already registered: {id}")]
    DuplicateId { id: String },
}

/// Phase sequencing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PhaseError {
    /// Requested phase is not the successor of the current one
    #[error("illegal phase transition: {from:?} -> {to:?}")]
    IllegalTransition {
        from: crate::orchestrator::Phase,
        to: crate::orchestrator::Phase,
    },
}

/// Host operation that faulted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ProviderOperation {
    Load,
    Unload,
    ReleaseUnused,
    SetActive,
}

impl fmt::Display for ProviderOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ProviderOperation::Load => "load",
            ProviderOperation::Unload => "unload",
            ProviderOperation::ReleaseUnused => "release-unused",
            ProviderOperation::SetActive => "set-active",
        };
        f.write_str(label)
    }
}

/// Unrecoverable host failure
///
/// Never retried. A transition that hits one stays in whatever phase it
/// reached.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{operation} failed for {}: {reason}", .resource.as_deref().unwrap_or("<all resources>"))]
pub struct ProviderFault {
    /// Operation that failed
    pub operation: ProviderOperation,
    /// Resource involved, if the operation targets one
    pub resource: Option<String>,
    /// Host-supplied reason
    pub reason: String,
}

impl ProviderFault {
    /// Fault for an operation on a single resource
    #[inline]
    #[must_use]
    pub fn new(operation: ProviderOperation, resource: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            operation,
            resource: Some(resource.into()),
            reason: reason.into(),
        }
    }

    /// Fault for a host-wide operation
    #[inline]
    #[must_use]
    pub fn global(operation: ProviderOperation, reason: impl Into<String>) -> Self {
        Self {
            operation,
            resource: None,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_fault_display_names_resource() {
        let fault = ProviderFault::new(ProviderOperation::Load, "A1", "handle was null");
        assert_eq!(fault.to_string(), "load failed for A1: handle was null");

        let global = ProviderFault::global(ProviderOperation::ReleaseUnused, "busy");
        assert_eq!(global.to_string(), "release-unused failed for <all resources>: busy");
    }

    #[test]
    fn fatal_classification() {
        let fault: StagehandError =
            ProviderFault::new(ProviderOperation::Unload, "A1", "gone").into();
        assert!(fault.is_fatal());
        assert!(!fault.is_recoverable());

        let unknown: StagehandError = ValidationError::UnknownResource {
            name: "Nowhere".to_string(),
        }
        .into();
        assert!(unknown.is_recoverable());

        let duplicate: StagehandError = CatalogError::DuplicateName {
            name: "main".to_string(),
            first: "Assets/A/Main.unity".to_string(),
            second: "Assets/B/main.unity".to_string(),
        }
        .into();
        assert!(duplicate.is_fatal());
    }

    #[test]
    fn validation_error_display() {
        let err = StagehandError::from(ValidationError::UnknownResource {
            name: "Z9".to_string(),
        });
        assert!(err.to_string().contains("unknown resource: Z9"));
    }
}
