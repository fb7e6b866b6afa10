use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

use moodle::catalog::{Catalog, Submission};
use serde_json::Value;
use tracing::warn;

/// Writes a JSON value pretty-printed with two-space indentation. Key order
/// and non-ASCII text are kept as they came from the server.
pub fn dump_response(
    result: &Value,
    output_file: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let file = File::create(output_file)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, result)?;
    writer.flush()?;

    Ok(())
}

/// Reads back a response written by [`dump_response`], so it can be decoded
/// and normalized without talking to the server.
pub fn load_response(input_file: &Path) -> Result<Value, Box<dyn std::error::Error>> {
    let file = File::open(input_file)?;
    let value = serde_json::from_reader(BufReader::new(file))?;

    Ok(value)
}

/// Extracts every file of the archive under `out_dir`, returning how many
/// files were written. Entries that would land outside `out_dir` are skipped.
pub fn unzip_submission(
    zip_path: &Path,
    out_dir: &Path,
) -> Result<usize, Box<dyn std::error::Error>> {
    let zip_file = File::open(zip_path)?;
    let mut archive = zip::ZipArchive::new(zip_file)?;

    std::fs::create_dir_all(out_dir)?;

    let mut extracted = 0;

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;

        let Some(relative) = file.enclosed_name() else {
            warn!("skipping unsafe archive entry {}", file.name());
            continue;
        };

        let out_path = out_dir.join(relative);

        if file.is_dir() {
            std::fs::create_dir_all(&out_path)?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut out_file = File::create(&out_path)?;
        std::io::copy(&mut file, &mut out_file)?;
        extracted += 1;
    }

    Ok(extracted)
}

/// Folder a submission is saved under: the group name for group submissions,
/// the user name otherwise.
pub fn folder_name(catalog: &Catalog, submission: &Submission) -> String {
    let name = match catalog.submitter_name(submission) {
        Some(name) => name.to_string(),
        None if submission.group_id != 0 => {
            warn!("unknown group {}", submission.group_id);
            format!("group-{}", submission.group_id)
        }
        None => {
            warn!("unknown user {}", submission.user_id);
            format!("user-{}", submission.user_id)
        }
    };

    let name: String = name
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    let name = name.trim();

    if name.is_empty() || name == "." || name == ".." {
        "_".to_string()
    } else {
        name.to_string()
    }
}
