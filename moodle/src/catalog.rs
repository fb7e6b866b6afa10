//! In-memory model of a course built from web-service responses.
//!
//! A [`Catalog`] starts empty and is filled by three independent calls, one per
//! response kind. Entries are only ever added or overwritten, never removed.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Local, Utc};
use tracing::debug;

use crate::models::{AssignmentsResponse, EnrolledUser, SubmissionsResponse};

#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub group_id: i64,
    pub user_id: i64,
    pub file_name: String,
    pub file_url: String,
    pub file_size: u64,
    pub file_type: String,
    pub file_time: DateTime<Local>,
}

impl Submission {
    #[must_use]
    pub fn is_zip(&self) -> bool {
        self.file_type == "application/zip"
    }
}

/// An assignment may be created by a submissions response before the
/// assignments response names it, hence the optional fields.
///
/// `submissions` is `None` until a submissions response lists at least one file
/// for this assignment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Assignment {
    pub name: Option<String>,
    pub due: Option<DateTime<Local>>,
    pub submissions: Option<Vec<Submission>>,
}

impl Assignment {
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("(unnamed)")
    }

    #[must_use]
    pub fn submission_count(&self) -> usize {
        self.submissions.as_ref().map_or(0, Vec::len)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    pub users: HashMap<i64, String>,
    pub groups: HashMap<i64, String>,
    pub assignments: BTreeMap<i64, Assignment>,
}

impl Catalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records users and their groups.
    ///
    /// With `role` set, users whose first role has another short name are
    /// skipped together with their groups. Later roles are not looked at.
    pub fn add_enrolled_users(&mut self, users: &[EnrolledUser], role: Option<&str>) {
        for user in users {
            if let Some(role) = role {
                let first = user.roles.first().map(|r| r.shortname.as_str());
                if first != Some(role) {
                    debug!(user = user.id, ?first, "skipping user with another role");
                    continue;
                }
            }

            self.users.insert(user.id, title_case(&user.fullname));

            for group in &user.groups {
                self.groups
                    .entry(group.id)
                    .or_insert_with(|| group.name.clone());
            }
        }
    }

    /// Sets name and due date of every assignment in every course.
    pub fn add_assignments(&mut self, response: &AssignmentsResponse) {
        for course in &response.courses {
            for info in &course.assignments {
                let assignment = self.assignments.entry(info.id).or_default();
                assignment.name = Some(info.name.clone());
                assignment.due = Some(to_local(info.duedate));
            }
        }
    }

    /// Appends one [`Submission`] per uploaded file. Submissions without a
    /// file upload plugin contribute nothing.
    pub fn add_submissions(&mut self, response: &SubmissionsResponse) {
        for entry in &response.assignments {
            for submission in &entry.submissions {
                let files = submission
                    .plugins
                    .iter()
                    .filter(|p| p.is_file_upload())
                    .flat_map(|p| &p.fileareas)
                    .flat_map(|area| &area.files);

                for file in files {
                    self.assignments
                        .entry(entry.assignmentid)
                        .or_default()
                        .submissions
                        .get_or_insert_with(Vec::new)
                        .push(Submission {
                            group_id: submission.groupid,
                            user_id: submission.userid,
                            file_name: file.filename.clone(),
                            file_url: file.fileurl.clone(),
                            file_size: file.filesize,
                            file_type: file.mimetype.clone(),
                            file_time: to_local(submission.timemodified),
                        });
                }
            }
        }
    }

    /// Assignments that have a submissions list, in id order.
    #[must_use]
    pub fn submitted_assignments(&self) -> Vec<(i64, &Assignment)> {
        self.assignments
            .iter()
            .filter(|(_, a)| a.submissions.is_some())
            .map(|(id, a)| (*id, a))
            .collect()
    }

    /// Picks from [`Catalog::submitted_assignments`] by 1-based position.
    #[must_use]
    pub fn choose_assignment(&self, index: usize) -> Option<(i64, &Assignment)> {
        index
            .checked_sub(1)
            .and_then(|i| self.submitted_assignments().into_iter().nth(i))
    }

    /// Group name for group submissions, user name otherwise.
    #[must_use]
    pub fn submitter_name(&self, submission: &Submission) -> Option<&str> {
        if submission.group_id != 0 {
            self.groups.get(&submission.group_id).map(String::as_str)
        } else {
            self.users.get(&submission.user_id).map(String::as_str)
        }
    }
}

/// Title-cases every word and lower-cases the rest. A word is a run of cased
/// characters, so digits, punctuation and uncased scripts all start a new one.
#[must_use]
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;

    for c in text.chars() {
        if !is_cased(c) {
            out.push(c);
            in_word = false;
        } else if in_word {
            out.extend(c.to_lowercase());
        } else {
            match titlecase_digraph(c) {
                Some(title) => out.push(title),
                None => out.extend(c.to_uppercase()),
            }
            in_word = true;
        }
    }

    out
}

fn is_cased(c: char) -> bool {
    c.is_uppercase() || c.is_lowercase() || titlecase_digraph(c).is_some()
}

// the only letters whose titlecase differs from their uppercase
fn titlecase_digraph(c: char) -> Option<char> {
    match c {
        'Ǆ' | 'ǅ' | 'ǆ' => Some('ǅ'),
        'Ǉ' | 'ǈ' | 'ǉ' => Some('ǈ'),
        'Ǌ' | 'ǋ' | 'ǌ' => Some('ǋ'),
        'Ǳ' | 'ǲ' | 'ǳ' => Some('ǲ'),
        _ => None,
    }
}

#[must_use]
pub fn format_timestamp(time: &DateTime<Local>) -> String {
    time.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn to_local(time: DateTime<Utc>) -> DateTime<Local> {
    time.with_timezone(&Local)
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    fn local(secs: i64) -> DateTime<Local> {
        DateTime::from_timestamp(secs, 0).unwrap().with_timezone(&Local)
    }

    fn users(value: Value) -> Vec<EnrolledUser> {
        serde_json::from_value(value).unwrap()
    }

    fn assignments(value: Value) -> AssignmentsResponse {
        serde_json::from_value(value).unwrap()
    }

    fn submissions(value: Value) -> SubmissionsResponse {
        serde_json::from_value(value).unwrap()
    }

    fn file(name: &str) -> Value {
        json!({
            "filepath": "/",
            "filename": name,
            "filesize": 100,
            "fileurl": format!("http://x/{name}"),
            "timemodified": 1700000500,
            "mimetype": "application/pdf"
        })
    }

    #[test]
    fn title_case_words() {
        assert_eq!(title_case("ana lopez"), "Ana Lopez");
        assert_eq!(title_case("JUAN PÉREZ"), "Juan Pérez");
        assert_eq!(title_case("mary-jane o'neil"), "Mary-Jane O'Neil");
        assert_eq!(title_case("group 2b"), "Group 2B");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn title_case_uncased_scripts_split_words() {
        assert_eq!(title_case("日本abc"), "日本Abc");
        assert_eq!(title_case("王 li"), "王 Li");
    }

    #[test]
    fn title_case_uses_titlecase_digraphs() {
        assert_eq!(title_case("ǆemal"), "ǅemal");
        assert_eq!(title_case("ǅEMAL ǉubica"), "ǅemal ǈubica");
    }

    #[test]
    fn enrolled_user_with_group() {
        let mut catalog = Catalog::new();

        catalog.add_enrolled_users(
            &users(json!([{
                "id": 7,
                "fullname": "ana lopez",
                "roles": [{"shortname": "student"}],
                "groups": [{"id": 2, "name": "G1"}]
            }])),
            None,
        );

        assert_eq!(catalog.users, HashMap::from([(7, "Ana Lopez".to_string())]));
        assert_eq!(catalog.groups, HashMap::from([(2, "G1".to_string())]));
    }

    #[test]
    fn first_group_name_wins() {
        let mut catalog = Catalog::new();

        catalog.add_enrolled_users(
            &users(json!([
                {"id": 1, "fullname": "a", "roles": [{"shortname": "student"}], "groups": [{"id": 2, "name": "First"}]},
                {"id": 3, "fullname": "b", "roles": [{"shortname": "student"}], "groups": [{"id": 2, "name": "Second"}]}
            ])),
            None,
        );
        catalog.add_enrolled_users(
            &users(json!([
                {"id": 4, "fullname": "c", "roles": [{"shortname": "student"}], "groups": [{"id": 2, "name": "Third"}]}
            ])),
            None,
        );

        assert_eq!(catalog.groups[&2], "First");
        assert_eq!(catalog.users.len(), 3);
    }

    #[test]
    fn role_filter_checks_only_first_role() {
        let mut catalog = Catalog::new();
        let enrolled = users(json!([
            {
                "id": 1,
                "fullname": "teacher who studies",
                "roles": [{"shortname": "editingteacher"}, {"shortname": "student"}],
                "groups": [{"id": 5, "name": "Staff"}]
            },
            {
                "id": 2,
                "fullname": "plain student",
                "roles": [{"shortname": "student"}],
                "groups": [{"id": 6, "name": "G6"}]
            },
            {"id": 3, "fullname": "no roles", "roles": [], "groups": []}
        ]));

        catalog.add_enrolled_users(&enrolled, Some("student"));

        assert_eq!(catalog.users, HashMap::from([(2, "Plain Student".to_string())]));
        assert_eq!(catalog.groups, HashMap::from([(6, "G6".to_string())]));
    }

    #[test]
    fn no_filter_keeps_users_without_roles() {
        let mut catalog = Catalog::new();

        catalog.add_enrolled_users(&users(json!([{"id": 3, "fullname": "no roles"}])), None);

        assert_eq!(catalog.users[&3], "No Roles");
    }

    #[test]
    fn assignment_name_and_due() {
        let mut catalog = Catalog::new();

        catalog.add_assignments(&assignments(json!({
            "courses": [{"id": 1, "assignments": [{"id": 9, "name": "TP1", "duedate": 1700000000}]}]
        })));

        let assignment = &catalog.assignments[&9];
        assert_eq!(assignment.name.as_deref(), Some("TP1"));
        assert_eq!(assignment.due, Some(local(1_700_000_000)));
        assert_eq!(assignment.submissions, None);
    }

    #[test]
    fn assignments_across_courses_last_write_wins() {
        let mut catalog = Catalog::new();
        let response = assignments(json!({
            "courses": [
                {"id": 1, "assignments": [{"id": 9, "name": "TP1", "duedate": 100}, {"id": 10, "name": "TP2", "duedate": 200}]},
                {"id": 2, "assignments": [{"id": 11, "name": "Essay", "duedate": 300}]}
            ]
        }));

        catalog.add_assignments(&response);
        catalog.add_assignments(&response);
        catalog.add_assignments(&assignments(json!({
            "courses": [{"id": 1, "assignments": [{"id": 9, "name": "TP1 (extended)", "duedate": 150}]}]
        })));

        assert_eq!(catalog.assignments.keys().copied().collect::<Vec<_>>(), vec![9, 10, 11]);
        assert_eq!(catalog.assignments[&9].name.as_deref(), Some("TP1 (extended)"));
        assert_eq!(catalog.assignments[&9].due, Some(local(150)));
        assert_eq!(catalog.assignments[&11].name.as_deref(), Some("Essay"));
    }

    #[test]
    fn single_zip_submission() {
        let mut catalog = Catalog::new();
        catalog.add_assignments(&assignments(json!({
            "courses": [{"id": 1, "assignments": [{"id": 9, "name": "TP1", "duedate": 1700000000}]}]
        })));

        catalog.add_submissions(&submissions(json!({
            "assignments": [{
                "assignmentid": 9,
                "submissions": [{
                    "userid": 7,
                    "groupid": 0,
                    "timemodified": 1700000100,
                    "plugins": [{
                        "type": "file",
                        "fileareas": [{
                            "area": "submission_files",
                            "files": [{
                                "filename": "a.zip",
                                "fileurl": "http://x/f",
                                "filesize": 100,
                                "mimetype": "application/zip"
                            }]
                        }]
                    }]
                }]
            }]
        })));

        assert_eq!(
            catalog.assignments[&9].submissions,
            Some(vec![Submission {
                group_id: 0,
                user_id: 7,
                file_name: "a.zip".to_string(),
                file_url: "http://x/f".to_string(),
                file_size: 100,
                file_type: "application/zip".to_string(),
                file_time: local(1_700_000_100),
            }])
        );
        assert_eq!(catalog.assignments[&9].name.as_deref(), Some("TP1"));
    }

    #[test]
    fn one_record_per_file() {
        let mut catalog = Catalog::new();

        catalog.add_submissions(&submissions(json!({
            "assignments": [{
                "assignmentid": 4,
                "submissions": [{
                    "userid": 7,
                    "groupid": 3,
                    "timemodified": 1700000100,
                    "plugins": [
                        {"type": "file", "fileareas": [{"area": "submission_files", "files": [file("a.pdf"), file("b.pdf")]}]},
                        {"type": "comments", "name": "Submission comments"}
                    ]
                }]
            }]
        })));

        let subs = catalog.assignments[&4].submissions.as_ref().unwrap();
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].file_name, "a.pdf");
        assert_eq!(subs[1].file_name, "b.pdf");
        assert!(subs.iter().all(|s| s.user_id == 7 && s.group_id == 3));
        assert_eq!(catalog.assignments[&4].name, None);
    }

    #[test]
    fn online_text_only_yields_nothing() {
        let mut catalog = Catalog::new();

        catalog.add_submissions(&submissions(json!({
            "assignments": [{
                "assignmentid": 4,
                "submissions": [{
                    "userid": 7,
                    "groupid": 0,
                    "timemodified": 1700000100,
                    "plugins": [{
                        "type": "onlinetext",
                        "fileareas": [{"area": "submissions_onlinetext", "files": [file("image.png")]}],
                        "editorfields": [{"name": "onlinetext", "text": "hello"}]
                    }]
                }]
            }]
        })));

        assert!(catalog.assignments.is_empty());
    }

    #[test]
    fn reparsing_submissions_appends() {
        let mut catalog = Catalog::new();
        let response = submissions(json!({
            "assignments": [{
                "assignmentid": 4,
                "submissions": [{
                    "userid": 7,
                    "groupid": 0,
                    "timemodified": 1700000100,
                    "plugins": [{"type": "file", "fileareas": [{"files": [file("a.pdf")]}]}]
                }]
            }]
        }));

        catalog.add_submissions(&response);
        catalog.add_submissions(&response);

        assert_eq!(catalog.assignments[&4].submission_count(), 2);
    }

    #[test]
    fn choose_assignment_is_one_based() {
        let mut catalog = Catalog::new();
        catalog.add_assignments(&assignments(json!({
            "courses": [{"id": 1, "assignments": [
                {"id": 3, "name": "Nobody submitted", "duedate": 0},
                {"id": 5, "name": "First", "duedate": 0},
                {"id": 8, "name": "Second", "duedate": 0}
            ]}]
        })));
        for id in [8, 5] {
            catalog.add_submissions(&submissions(json!({
                "assignments": [{
                    "assignmentid": id,
                    "submissions": [{
                        "userid": 7,
                        "groupid": 0,
                        "timemodified": 0,
                        "plugins": [{"type": "file", "fileareas": [{"files": [file("a.pdf")]}]}]
                    }]
                }]
            })));
        }

        assert_eq!(catalog.submitted_assignments().len(), 2);
        assert!(catalog.choose_assignment(0).is_none());
        assert_eq!(catalog.choose_assignment(1).unwrap().0, 5);
        assert_eq!(catalog.choose_assignment(2).unwrap().1.display_name(), "Second");
        assert!(catalog.choose_assignment(3).is_none());
    }

    #[test]
    fn submitter_name_prefers_group() {
        let mut catalog = Catalog::new();
        catalog.users.insert(7, "Ana Lopez".to_string());
        catalog.groups.insert(2, "G1".to_string());
        let mut submission = Submission {
            group_id: 0,
            user_id: 7,
            file_name: "a.zip".to_string(),
            file_url: "http://x/f".to_string(),
            file_size: 100,
            file_type: "application/zip".to_string(),
            file_time: local(0),
        };

        assert_eq!(catalog.submitter_name(&submission), Some("Ana Lopez"));

        submission.group_id = 2;
        assert_eq!(catalog.submitter_name(&submission), Some("G1"));

        submission.group_id = 99;
        assert_eq!(catalog.submitter_name(&submission), None);
        assert!(submission.is_zip());
    }

    #[test]
    fn timestamp_rendering() {
        let time = Local.with_ymd_and_hms(2023, 11, 14, 22, 13, 20).unwrap();

        assert_eq!(format_timestamp(&time), "2023-11-14 22:13:20");
    }
}
