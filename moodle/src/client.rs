use std::{fs, path::Path};

use serde::Deserialize;

use crate::error::ConfigError;

/// Contents of the JSON configuration file.
///
/// `wstoken` is the web-service token found under the user's security keys in
/// Moodle and `url` the REST endpoint, for example
/// `https://moodle.example.org/webservice/rest/server.php`.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    pub wstoken: String,
    pub url: String,
    #[serde(default)]
    pub courseid: Option<i64>,
    #[serde(default)]
    pub rolename: Option<String>,
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;

        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }
}

pub struct MoodleClient {
    token: String,
    url: String,
}

impl MoodleClient {
    #[must_use]
    pub fn new(token: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            url: url.into(),
        }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.wstoken, &config.url)
    }

    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}
