use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use std::{ffi::OsStr, path::Path, time::Instant};
use tokio::fs;
use tracing::{info, warn};

use moodle::{
    api::MoodleApi,
    catalog::{Assignment, Catalog, Submission},
};

use crate::utils::{folder_name, unzip_submission};

pub struct DownloadSummary {
    pub downloaded: usize,
    pub failed: usize,
}

/// Downloads every file of an assignment into
/// `<root>/<course>/<assignment>/<submitter>/`, one after another.
/// A file that cannot be fetched or extracted is reported and skipped.
pub async fn download_assignment_submissions(
    api: &MoodleApi,
    catalog: &Catalog,
    root: &Path,
    course_id: i64,
    assignment_id: i64,
    assignment: &Assignment,
) -> Result<DownloadSummary, Box<dyn std::error::Error>> {
    let started = Instant::now();
    let submissions = assignment.submissions.as_deref().unwrap_or_default();

    println!(
        " :: {} {} files of {} [CID {course_id}/AID {assignment_id}]",
        "Fetching".green().bold(),
        submissions.len(),
        assignment.display_name()
    );

    let bar = ProgressBar::new(submissions.len() as u64);
    bar.set_draw_target(ProgressDrawTarget::stdout_with_hz(1));
    bar.set_style(
        ProgressStyle::with_template(
            " ::{prefix:>12.cyan.bold} [{bar:57}] {pos}/{len} {percent}%",
        )?
        .progress_chars("## "),
    );
    bar.set_prefix("Downloading");

    let path = root
        .join(course_id.to_string())
        .join(assignment_id.to_string());
    fs::create_dir_all(&path).await?;

    let mut summary = DownloadSummary {
        downloaded: 0,
        failed: 0,
    };

    for submission in submissions {
        let name = folder_name(catalog, submission);

        match fetch_submission(api, submission, &path, &path.join(&name)).await {
            Ok(()) => {
                info!("saved {} for {name}", submission.file_name);
                summary.downloaded += 1;
            }
            Err(e) => {
                warn!("could not save {} for {name}: {e}", submission.file_name);
                bar.println(format!(
                    " :: {} {} ({}) {}",
                    "Error".red().bold(),
                    name.bold(),
                    submission.file_name,
                    e
                ));
                summary.failed += 1;
            }
        }

        bar.inc(1);
    }

    bar.finish();

    println!(
        " :: {} {} files ({} failed) in {:.2}s",
        "Finished".green().bold(),
        summary.downloaded,
        summary.failed,
        Instant::now().duration_since(started).as_secs_f32()
    );

    Ok(summary)
}

/// Fetches into a temporary file under `scratch` and only then creates
/// `dir`, so a failed download leaves neither a stray archive nor an empty
/// folder behind.
async fn fetch_submission(
    api: &MoodleApi,
    submission: &Submission,
    scratch: &Path,
    dir: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    // deleted on drop unless persisted
    let suffix = if submission.is_zip() { ".zip" } else { ".part" };
    let temp = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile_in(scratch)?;
    api.download_file(&submission.file_url, temp.path()).await?;

    if submission.is_zip() {
        unzip_submission(temp.path(), dir)?;
    } else {
        let file_name = Path::new(&submission.file_name)
            .file_name()
            .unwrap_or_else(|| OsStr::new("submission"));
        fs::create_dir_all(dir).await?;
        temp.persist(dir.join(file_name))?;
    }

    Ok(())
}
