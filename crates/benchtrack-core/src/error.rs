use thiserror::Error;

/// Canonical error type for analytics and publishing operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Datasource URI uses a scheme other than `file://` or `s3://`.
    #[error("unknown datasource `{uri}`: valid schemes are file:// or s3://")]
    UnknownDatasource {
        /// The rejected URI.
        uri: String,
    },

    /// Metrics store URI uses a scheme no backend understands.
    #[error("unable to determine the service associated with URI `{uri}`: valid schemes are es:// or es+aws://")]
    UnsupportedScheme {
        /// The rejected URI.
        uri: String,
    },

    /// Metrics store URI could not be interpreted.
    #[error("invalid URI `{uri}`: {reason}")]
    InvalidUri {
        /// The rejected URI.
        uri: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The metrics backend could not be reached.
    #[error("store `{endpoint}` unavailable: {message}")]
    StoreUnavailable {
        /// Backend endpoint that failed.
        endpoint: String,
        /// Transport or status details.
        message: String,
    },

    /// Collection existence check or creation failed.
    #[error("collection `{collection}` could not be verified: {message}")]
    CollectionError {
        /// Target collection.
        collection: String,
        /// Backend answer.
        message: String,
    },

    /// The backend refused to index a document.
    #[error("document rejected by collection `{collection}` (status {status}): {message}")]
    DocumentRejected {
        /// Target collection.
        collection: String,
        /// HTTP status returned by the backend.
        status: u16,
        /// Backend answer.
        message: String,
    },

    /// Cloud credentials could not be resolved or used.
    #[error("credentials error: {0}")]
    Credentials(String),

    /// A required dataset column is absent.
    #[error("schema error: column `{column}` is missing")]
    SchemaError {
        /// Missing column name.
        column: String,
    },

    /// A metadata key shadows one of the reserved document fields.
    #[error("meta key `{key}` collides with a reserved document field")]
    ReservedMetaKey {
        /// Offending key.
        key: String,
    },

    /// A metadata key was supplied twice.
    #[error("meta key `{key}` is already present")]
    DuplicateMetaKey {
        /// Offending key.
        key: String,
    },

    /// Validation error for input data.
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Dataset could not be fetched or decoded.
    #[error("datasource error: {0}")]
    DatasourceError(String),

    /// I/O error occurred during file or network operations.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization error occurred.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Deserialization error occurred.
    #[error("deserialization error: {0}")]
    DeserializationError(String),
}

impl CoreError {
    /// Creates a `SchemaError` variant.
    #[must_use]
    pub fn missing_column(column: impl Into<String>) -> Self {
        Self::SchemaError {
            column: column.into(),
        }
    }

    /// Creates an `InvalidUri` variant.
    #[must_use]
    pub fn invalid_uri(uri: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUri {
            uri: uri.into(),
            reason: reason.into(),
        }
    }

    /// Creates a `StoreUnavailable` variant.
    #[must_use]
    pub fn unavailable(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Creates a `CollectionError` variant.
    #[must_use]
    pub fn collection(collection: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CollectionError {
            collection: collection.into(),
            message: message.into(),
        }
    }

    /// Whether retrying the same operation may succeed.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::StoreUnavailable { .. } | Self::CollectionError { .. } | Self::IoError(_)
        )
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_eof() || err.is_syntax() {
            Self::DeserializationError(err.to_string())
        } else {
            Self::SerializationError(err.to_string())
        }
    }
}

/// Convenient result alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
