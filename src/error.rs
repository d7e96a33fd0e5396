use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RegistryError>;

/// Errors surfaced by the registry workflow
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("invalid status {0:?}, expected one of pending, approved, rejected")]
    InvalidStatus(String),

    #[error("validation failed: {}", describe_fields(.0))]
    Validation(BTreeMap<String, String>),

    #[error("document storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Stable, client-facing classification of a [`RegistryError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    InvalidStatus,
    ValidationError,
    StorageUnavailable,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::InvalidStatus => "invalid_status",
            ErrorKind::ValidationError => "validation_error",
            ErrorKind::StorageUnavailable => "storage_unavailable",
            ErrorKind::Internal => "internal",
        }
    }
}

impl RegistryError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        RegistryError::NotFound { entity, id }
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        RegistryError::Forbidden(reason.into())
    }

    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        RegistryError::Validation(BTreeMap::from([(field.into(), message.into())]))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::NotFound { .. } => ErrorKind::NotFound,
            RegistryError::Forbidden(_) => ErrorKind::Forbidden,
            RegistryError::InvalidStatus(_) => ErrorKind::InvalidStatus,
            RegistryError::Validation(_) => ErrorKind::ValidationError,
            RegistryError::StorageUnavailable(_) => ErrorKind::StorageUnavailable,
            RegistryError::Database(_) | RegistryError::Migration(_) | RegistryError::Io(_) => {
                ErrorKind::Internal
            }
        }
    }
}

fn describe_fields(fields: &BTreeMap<String, String>) -> String {
    fields
        .iter()
        .map(|(field, message)| format!("{field}: {message}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Collects per-field validation failures before reporting them together
#[derive(Debug, Default)]
pub struct FieldErrors {
    fields: BTreeMap<String, String>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields.insert(field.into(), message.into());
    }

    pub fn require(&mut self, field: impl Into<String>, value: &str) {
        if value.trim().is_empty() {
            self.push(field, "is required");
        }
    }

    pub fn result(self) -> Result<()> {
        if self.fields.is_empty() {
            Ok(())
        } else {
            Err(RegistryError::Validation(self.fields))
        }
    }
}
