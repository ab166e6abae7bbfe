use thiserror::Error;

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StoreError {
    /// A copying or non-destructive operation was attempted on a config tree.
    /// Any copy would be detached from the owner's change tracking.
    #[error("config trees do not support `{operation}`")]
    Unsupported { operation: &'static str },

    /// Stored content decoded to something other than a map.
    #[error("stored config must decode to a map, found {found}")]
    TypeMismatch { found: String },

    /// The column holds foreign (non-YAML) text that was passed through.
    #[error("attribute `{attribute}` holds foreign content and cannot be configured")]
    ForeignContent { attribute: String },

    /// An opaque object was given a tag the loader reads back as a map.
    #[error("`{tag}` cannot tag an object: it is empty or reserved for maps")]
    ReservedTag { tag: String },

    /// A value could not be encoded or decoded.
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Store settings could not be read or parsed.
    #[error("settings error: {0}")]
    Settings(String),
}

impl StoreError {
    pub(crate) fn unsupported(operation: &'static str) -> Self {
        StoreError::Unsupported { operation }
    }
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;
