use std::{path::Path, time::Instant};

use futures_util::StreamExt;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::{fs, io::AsyncWriteExt};
use tracing::{info, warn};

use crate::client::MoodleClient;
use crate::error::WsError;
use crate::models::{AssignmentsResponse, Decoded, EnrolledUser, SubmissionsResponse, Warning};

pub struct MoodleApi {
    http_client: Client,
    moodle_client: MoodleClient,
}

impl MoodleApi {
    #[must_use]
    pub fn new(moodle_client: MoodleClient) -> Self {
        Self {
            http_client: Client::new(),
            moodle_client,
        }
    }

    /// Calls a web-service function and returns its JSON result.
    ///
    /// `params` are the function-specific parameters; token, function name and
    /// response format are added here. A JSON object carrying an `exception`
    /// key is turned into [`WsError::Api`].
    pub async fn make_request(
        &self,
        function: &str,
        params: &[(String, String)],
    ) -> Result<Value, WsError> {
        info!("Requesting {function} with {params:?}...");

        let mut args = vec![
            ("moodlewsrestformat".to_string(), "json".to_string()),
            ("wstoken".to_string(), self.moodle_client.token().to_string()),
            ("wsfunction".to_string(), function.to_string()),
        ];
        args.extend_from_slice(params);

        let request_error = |source| WsError::Request {
            function: function.to_string(),
            params: params.to_vec(),
            source,
        };

        let started = Instant::now();

        let resp = self
            .http_client
            .post(self.moodle_client.url())
            .query(&args)
            .send()
            .await
            .map_err(request_error)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(WsError::Status {
                function: function.to_string(),
                params: params.to_vec(),
                status,
            });
        }

        let body = resp.bytes().await.map_err(request_error)?;

        info!(
            "... result for {function} in {} ms",
            started.elapsed().as_millis()
        );

        let res: Value = serde_json::from_slice(&body).map_err(|source| WsError::Malformed {
            function: function.to_string(),
            source,
        })?;

        if res.get("exception").is_some() {
            let field = |key: &str| {
                res.get(key)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            };
            return Err(WsError::Api {
                function: function.to_string(),
                params: params.to_vec(),
                errorcode: field("errorcode"),
                message: field("message"),
            });
        }

        Ok(res)
    }

    /// Returns recently accessed items. Useful to check that token and url work.
    pub async fn block_recentlyaccesseditems_get_recent_items(&self) -> Result<Value, WsError> {
        self.make_request("block_recentlyaccesseditems_get_recent_items", &[])
            .await
    }

    /// Returns the sections and modules of a course.
    pub async fn core_course_get_contents(&self, course_id: i64) -> Result<Value, WsError> {
        self.make_request(
            "core_course_get_contents",
            &[("courseid".to_string(), course_id.to_string())],
        )
        .await
    }

    /// Returns all users of a course, with every role and group.
    pub async fn core_enrol_get_enrolled_users(
        &self,
        course_id: i64,
    ) -> Result<Decoded<Vec<EnrolledUser>>, WsError> {
        let function = "core_enrol_get_enrolled_users";
        let params = [("courseid".to_string(), course_id.to_string())];

        let raw = self.make_request(function, &params).await?;

        decode(function, raw)
    }

    pub async fn mod_assign_get_assignments(
        &self,
        course_ids: &[i64],
    ) -> Result<Decoded<AssignmentsResponse>, WsError> {
        let function = "mod_assign_get_assignments";
        let params = build_array("courseids", course_ids);

        let raw = self.make_request(function, &params).await?;
        let decoded: Decoded<AssignmentsResponse> = decode(function, raw)?;
        log_warnings(function, &decoded.data.warnings);

        Ok(decoded)
    }

    pub async fn mod_assign_get_submissions(
        &self,
        assignment_ids: &[i64],
    ) -> Result<Decoded<SubmissionsResponse>, WsError> {
        let function = "mod_assign_get_submissions";
        let params = build_array("assignmentids", assignment_ids);

        let raw = self.make_request(function, &params).await?;
        let decoded: Decoded<SubmissionsResponse> = decode(function, raw)?;
        log_warnings(function, &decoded.data.warnings);

        Ok(decoded)
    }

    pub async fn mod_assign_get_grades(&self, assignment_ids: &[i64]) -> Result<Value, WsError> {
        self.make_request(
            "mod_assign_get_grades",
            &build_array("assignmentids", assignment_ids),
        )
        .await
    }

    /// Streams the file at `url` into `path`, returning the number of bytes
    /// written.
    pub async fn download_file(&self, url: &str, path: &Path) -> Result<u64, WsError> {
        let function = "download";
        let request_error = |source| WsError::Request {
            function: function.to_string(),
            params: vec![("url".to_string(), url.to_string())],
            source,
        };

        let download = self
            .http_client
            .get(url)
            .query(&[("token", self.moodle_client.token())])
            .send()
            .await
            .map_err(request_error)?;

        let status = download.status();
        if !status.is_success() {
            return Err(WsError::Status {
                function: function.to_string(),
                params: vec![("url".to_string(), url.to_string())],
                status,
            });
        }

        let io_error = |source| WsError::Io {
            path: path.to_owned(),
            source,
        };

        let mut file = fs::File::create(path).await.map_err(io_error)?;
        let mut stream = download.bytes_stream();
        let mut written = 0;

        while let Some(item) = stream.next().await {
            let chunk = item.map_err(request_error)?;
            file.write_all(&chunk).await.map_err(io_error)?;
            written += chunk.len() as u64;
        }

        file.flush().await.map_err(io_error)?;

        Ok(written)
    }
}

/// Encodes a list as `key[0]=.., key[1]=..`, the way the REST server expects
/// array parameters.
#[must_use]
pub fn build_array(key: &str, vals: &[i64]) -> Vec<(String, String)> {
    vals.iter()
        .enumerate()
        .map(|(index, val)| (format!("{key}[{index}]"), val.to_string()))
        .collect()
}

fn decode<T: DeserializeOwned>(function: &str, raw: Value) -> Result<Decoded<T>, WsError> {
    let data = T::deserialize(&raw).map_err(|source| WsError::Malformed {
        function: function.to_string(),
        source,
    })?;

    Ok(Decoded { data, raw })
}

fn log_warnings(function: &str, warnings: &[Warning]) {
    for w in warnings {
        warn!(
            item = w.item.as_deref(),
            itemid = w.itemid,
            code = w.warningcode.as_deref(),
            "{function}: {}",
            w.message
        );
    }
}
