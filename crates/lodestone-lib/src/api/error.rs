/// Failures surfaced by a catalog source
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The service answered 404. Definitive, never retried.
    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    #[error("Catalog unavailable at {url}: {reason}")]
    Unavailable { url: String, reason: String },

    #[error("Malformed catalog response from {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl CatalogError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, CatalogError::Unavailable { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogError::NotFound { .. })
    }

    pub(crate) fn unavailable(url: &str, reason: impl ToString) -> Self {
        CatalogError::Unavailable {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}
