use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status} from '{url}'")]
    Status { status: u16, url: String },

    #[error("Content of '{url}' is not an image ({mime_type})")]
    NotAnImage { url: String, mime_type: String },

    #[error("Empty payload from '{0}'")]
    EmptyPayload(String),
}

pub type Result<T> = std::result::Result<T, FetchError>;
