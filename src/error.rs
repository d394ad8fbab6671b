use thiserror::Error;

/// Errors that can occur while importing a recipe into Mealie
#[derive(Error, Debug)]
pub enum ImportError {
    /// The recipe reference matches none of the shapes the source accepts
    #[error("{reference:?} is in a format that cannot be handled by the {source_name} importer")]
    InvalidReference {
        source_name: &'static str,
        reference: String,
    },

    /// No importer exists for the requested source selector
    #[error("{0} does not exist as an importer yet")]
    UnknownSource(String),

    /// The recipe site answered with a non-success status
    #[error("Failed to fetch {url}: HTTP {status}")]
    UpstreamFetch {
        url: String,
        status: reqwest::StatusCode,
    },

    /// An ingredient uses a unit Mealie does not know about
    #[error("Unit not found {0}, please add manually")]
    UnitNotFound(String),

    /// The stub recipe could not be created
    #[error("Failed to create recipe: {0}")]
    CreateFailed(String),

    /// A destination call failed after the stub recipe was created
    #[error("Failed to publish recipe: {0}")]
    PublishFailed(String),

    /// Cleaning up the stub recipe failed as well
    #[error("Error deleting recipe with slug {slug}, delete manually")]
    RollbackFailed { slug: String },

    /// The client went away before the import finished
    #[error("Import cancelled")]
    Cancelled,

    /// Failed to talk to a remote service
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Error parsing HTTP headers
    #[error("Header parse error: {0}")]
    HeaderError(#[from] reqwest::header::InvalidHeaderValue),

    /// Failed to read or write a local file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Payload did not have the expected shape
    #[error("Invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(#[from] config::ConfigError),
}

pub type Result<T> = std::result::Result<T, ImportError>;
