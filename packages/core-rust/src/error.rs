use crate::types::Key;

/// Errors surfaced by data providers and the views layered over them.
///
/// Not-found conditions are never errors: a missing key is represented by
/// its absence from a result.
#[derive(Debug, thiserror::Error)]
pub enum DataProviderError {
    #[error("data provider does not support capability `{capability}`")]
    CapabilityNotSupported { capability: &'static str },
    #[error("row {index} has no usable value for key attribute `{attribute}`")]
    MissingKeyAttribute { attribute: String, index: usize },
    #[error("duplicate key {key:?} at row {index}")]
    DuplicateKey { key: Key, index: usize },
    #[error("invalid filter criterion: {0}")]
    InvalidFilter(String),
    #[error("provider failure: {0}")]
    Provider(#[from] anyhow::Error),
}

/// Result alias used across the data provider APIs.
pub type Result<T, E = DataProviderError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_error_names_the_capability() {
        let err = DataProviderError::CapabilityNotSupported {
            capability: "fetchByOffset",
        };
        assert_eq!(
            err.to_string(),
            "data provider does not support capability `fetchByOffset`"
        );
    }

    #[test]
    fn anyhow_errors_convert_into_provider_failures() {
        let err: DataProviderError = anyhow::anyhow!("connection reset").into();
        assert!(matches!(err, DataProviderError::Provider(_)));
        assert_eq!(err.to_string(), "provider failure: connection reset");
    }
}
