use std::path::PathBuf;

use thiserror::Error;

/// Failure talking to the Moodle web-service endpoint.
///
/// Every variant aborts the session except when raised by
/// [`MoodleApi::download_file`](crate::api::MoodleApi::download_file), whose
/// callers skip the file and carry on.
#[derive(Error, Debug)]
pub enum WsError {
    #[error("request to {function} with {params:?} failed: {source}")]
    Request {
        function: String,
        params: Vec<(String, String)>,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {function} with {params:?} failed with status {status}")]
    Status {
        function: String,
        params: Vec<(String, String)>,
        status: reqwest::StatusCode,
    },

    #[error("{function} with {params:?} failed: {errorcode}: {message}")]
    Api {
        function: String,
        params: Vec<(String, String)>,
        errorcode: String,
        message: String,
    },

    #[error("unexpected response from {function}: {source}")]
    Malformed {
        function: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
