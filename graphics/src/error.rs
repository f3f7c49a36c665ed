//! Graphics error types.

use thiserror::Error;

/// Errors that can occur in the graphics system.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphicsError {
    /// Failed to initialize the graphics system.
    #[error("initialization failed: {0}")]
    InitializationFailed(String),
    /// Failed to create a resource.
    #[error("resource creation failed: {0}")]
    ResourceCreationFailed(String),
    /// An invalid parameter was provided.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GraphicsError::InitializationFailed("no backend found".to_string());
        assert_eq!(err.to_string(), "initialization failed: no backend found");

        let err = GraphicsError::InvalidParameter("texture width is zero".to_string());
        assert_eq!(err.to_string(), "invalid parameter: texture width is zero");
    }
}
