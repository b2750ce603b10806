use thiserror::Error;

/// Library error type for gallery operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The catalog provider could not produce a listing.
    #[error("catalog unavailable: {0}")]
    Catalog(String),

    /// Fetching the bytes behind a catalog URI failed.
    #[error("failed to fetch {uri}: {reason}")]
    Fetch { uri: String, reason: String },

    /// The fetched bytes are not a decodable image.
    #[error("failed to decode {uri}: {source}")]
    Decode {
        uri: String,
        #[source]
        source: image::ImageError,
    },

    /// Downscaling a decoded image failed.
    #[error("failed to resize {uri}: {reason}")]
    Resize { uri: String, reason: String },

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// HTTP transport error from the catalog or texture fetches.
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
