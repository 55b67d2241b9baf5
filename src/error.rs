use std::path::PathBuf;

/// Error type for building URLs and self-hosting stylesheets
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The source URL does not point at the configured fonts API host
    #[error("invalid Google Fonts URL: {url}")]
    InvalidSourceUrl { url: String },

    /// Fetching the stylesheet itself failed
    #[cfg(feature = "download")]
    #[error("failed to fetch {url}")]
    UpstreamFetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Creating a directory or writing a file failed
    #[error("filesystem error at {}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The request has no families, so there is no URL to build
    #[error("no font families given, cannot construct a URL")]
    NotConstructible,

    /// Unknown `font-display` strategy
    #[error("invalid display strategy {0:?}, expected one of auto, block, swap, fallback, optional")]
    InvalidDisplay(String),

    /// Bad downloader configuration (header names, client setup)
    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidSourceUrl {
            url: "https://example.com/font.css".to_string(),
        };
        assert_eq!(
            format!("{}", err),
            "invalid Google Fonts URL: https://example.com/font.css"
        );

        let err = Error::InvalidDisplay("sometimes".to_string());
        assert!(err.to_string().starts_with("invalid display strategy \"sometimes\""));
    }
}
