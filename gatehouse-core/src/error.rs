//! Unified error handling
//!
//! Provides structured error types with context, recovery suggestions, and
//! proper error chaining.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

pub type GatehouseResult<T> = Result<T, GatehouseError>;

/// Error context providing additional information for debugging and recovery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Timestamp when error occurred
    pub timestamp: DateTime<Utc>,
    /// Component where error originated
    pub component: String,
    /// Operation being performed when error occurred
    pub operation: Option<String>,
    /// Recovery suggestions
    pub recovery_suggestions: Vec<String>,
}

impl ErrorContext {
    pub fn new(component: &str) -> Self {
        Self {
            error_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            component: component.to_string(),
            operation: None,
            recovery_suggestions: Vec::new(),
        }
    }

    pub fn with_operation(mut self, operation: &str) -> Self {
        self.operation = Some(operation.to_string());
        self
    }

    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.recovery_suggestions.push(suggestion.to_string());
        self
    }
}

/// Main error type for the Gatehouse toolkit
#[derive(Error, Debug)]
pub enum GatehouseError {
    #[error("Session error: {message}")]
    Session {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Resource not found: {resource}")]
    NotFound {
        resource: String,
        context: ErrorContext,
    },

    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GatehouseError {
    /// Get the error context
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            GatehouseError::Session { context, .. } => Some(context),
            GatehouseError::Config { context, .. } => Some(context),
            GatehouseError::Storage { context, .. } => Some(context),
            GatehouseError::NotFound { context, .. } => Some(context),
            GatehouseError::Internal { context, .. } => Some(context),
            _ => None,
        }
    }

    /// Check if error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            GatehouseError::Config { .. } => false,
            GatehouseError::NotFound { .. } => false,
            GatehouseError::Storage { .. } => true,
            _ => false,
        }
    }

    /// Log the error with appropriate level
    pub fn log(&self) {
        match self {
            GatehouseError::Internal { .. } | GatehouseError::Config { .. } => {
                error!(
                    error_id = ?self.context().map(|c| &c.error_id),
                    error = %self,
                    "Error occurred"
                );
            }
            _ => {
                warn!(
                    error_id = ?self.context().map(|c| &c.error_id),
                    error = %self,
                    "Recoverable error occurred"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_builders_accumulate() {
        let context = ErrorContext::new("store")
            .with_operation("save")
            .with_suggestion("Check the token value");

        assert_eq!(context.component, "store");
        assert_eq!(context.operation.as_deref(), Some("save"));
        assert_eq!(context.recovery_suggestions.len(), 1);
        assert!(!context.error_id.is_empty());
    }

    #[test]
    fn config_errors_are_not_recoverable() {
        let err = GatehouseError::Config {
            message: "bad value".to_string(),
            source: None,
            context: ErrorContext::new("config"),
        };
        assert!(!err.is_recoverable());
        assert!(err.context().is_some());
    }
}
