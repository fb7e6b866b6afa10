use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

/// A typed response together with the JSON it was decoded from, so the raw
/// payload can still be dumped to disk.
#[derive(Debug)]
pub struct Decoded<T> {
    pub data: T,
    pub raw: Value,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Role {
    pub shortname: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Group {
    pub id: i64,
    pub name: String,
}

/// One entry of `core_enrol_get_enrolled_users`.
#[derive(Deserialize, Debug, Clone)]
pub struct EnrolledUser {
    pub id: i64,
    pub fullname: String,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub groups: Vec<Group>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Warning {
    #[serde(default)]
    pub item: Option<String>,
    #[serde(default)]
    pub itemid: Option<i64>,
    #[serde(default)]
    pub warningcode: Option<String>,
    pub message: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AssignmentInfo {
    pub id: i64,
    pub name: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub duedate: DateTime<Utc>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct CourseAssignments {
    pub id: i64,
    pub assignments: Vec<AssignmentInfo>,
}

/// Response of `mod_assign_get_assignments`.
#[derive(Deserialize, Debug, Clone)]
pub struct AssignmentsResponse {
    pub courses: Vec<CourseAssignments>,
    #[serde(default)]
    pub warnings: Vec<Warning>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct SubmittedFile {
    pub filename: String,
    pub fileurl: String,
    pub filesize: u64,
    pub mimetype: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct FileArea {
    #[serde(default)]
    pub area: Option<String>,
    #[serde(default)]
    pub files: Vec<SubmittedFile>,
}

/// A submission-type handler: file upload, online text, comments...
#[derive(Deserialize, Debug, Clone)]
pub struct Plugin {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub fileareas: Vec<FileArea>,
}

impl Plugin {
    #[must_use]
    pub fn is_file_upload(&self) -> bool {
        self.kind == "file"
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct SubmissionInfo {
    pub userid: i64,
    pub groupid: i64,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub timemodified: DateTime<Utc>,
    #[serde(default)]
    pub plugins: Vec<Plugin>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AssignmentSubmissions {
    pub assignmentid: i64,
    pub submissions: Vec<SubmissionInfo>,
}

/// Response of `mod_assign_get_submissions`.
#[derive(Deserialize, Debug, Clone)]
pub struct SubmissionsResponse {
    pub assignments: Vec<AssignmentSubmissions>,
    #[serde(default)]
    pub warnings: Vec<Warning>,
}
