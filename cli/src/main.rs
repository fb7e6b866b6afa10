use clap::Parser;
use colored::Colorize;
use dialoguer::{
    Input,
    console::{Style, style},
    theme::ColorfulTheme,
};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{debug, error, warn};
use tracing_subscriber::EnvFilter;

use cli::Cli;
use downloader::download_assignment_submissions;
use moodle::{
    api::MoodleApi,
    catalog::{Catalog, format_timestamp},
    client::{Config, MoodleClient},
};
use utils::dump_response;

mod cli;
mod downloader;
mod utils;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Cli::parse();

    let config = match Config::from_file(&args.config_file) {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return Ok(());
        }
    };

    let api = MoodleApi::new(MoodleClient::from_config(&config));
    let own_theme = theme();

    println!(" :: Moodle Offline Grader");

    check_connection(&api).await;

    let course_id = match config.courseid {
        Some(id) => id,
        None => {
            let answer: String = Input::with_theme(&own_theme)
                .with_prompt("Course id")
                .interact_text()?;
            match answer.trim().parse() {
                Ok(id) => id,
                Err(_) => return Ok(()),
            }
        }
    };

    println!(
        " :: {} users, assignments and submissions [CID {course_id}]",
        "Fetching".green().bold()
    );

    let mut catalog = Catalog::new();

    let enrolled = api.core_enrol_get_enrolled_users(course_id).await?;
    catalog.add_enrolled_users(&enrolled.data, config.rolename.as_deref());

    let assignments = api.mod_assign_get_assignments(&[course_id]).await?;
    catalog.add_assignments(&assignments.data);

    let assignment_ids: Vec<i64> = catalog.assignments.keys().copied().collect();
    if assignment_ids.is_empty() {
        println!(" :: No assignments in course {course_id}");
        return Ok(());
    }

    let submissions = api.mod_assign_get_submissions(&assignment_ids).await?;
    catalog.add_submissions(&submissions.data);

    if let Some(output_file) = &args.output_file {
        let mut dump = Map::new();
        dump.insert("enrolled_users".to_string(), enrolled.raw);
        dump.insert("assignments".to_string(), assignments.raw);
        dump.insert("submissions".to_string(), submissions.raw);
        add_optional_responses(&api, course_id, &assignment_ids, &mut dump).await;
        dump_response(&Value::Object(dump), output_file)?;

        println!(
            " :: {} raw responses at {}",
            "Saved".green().bold(),
            output_file.display()
        );
    }

    let submitted = catalog.submitted_assignments();
    if submitted.is_empty() {
        println!(" :: Nothing has been submitted yet");
        return Ok(());
    }

    println!();
    for (index, (_, assignment)) in submitted.iter().enumerate() {
        let due = assignment
            .due
            .as_ref()
            .map_or_else(|| "unknown".to_string(), format_timestamp);
        println!(
            "{}\t -- {} (due {due}, {} submissions)",
            index + 1,
            assignment.display_name(),
            assignment.submission_count()
        );
    }
    println!();

    let answer: String = Input::with_theme(&own_theme)
        .with_prompt("Index of assignment to download? (0 to cancel)")
        .interact_text()?;

    let Some((assignment_id, assignment)) = answer
        .trim()
        .parse()
        .ok()
        .and_then(|index| catalog.choose_assignment(index))
    else {
        println!(" :: Cancelled");
        return Ok(());
    };

    println!(
        " :: {} {} [AID {assignment_id}]",
        "Selected".green().bold(),
        assignment.display_name().bold()
    );

    download_assignment_submissions(
        &api,
        &catalog,
        Path::new("./submissions"),
        course_id,
        assignment_id,
        assignment,
    )
    .await?;

    Ok(())
}

/// Logs whether the token works. A server that does not expose the
/// recent-items function is not a reason to stop.
async fn check_connection(api: &MoodleApi) -> bool {
    match api.block_recentlyaccesseditems_get_recent_items().await {
        Ok(recent) => {
            debug!(
                "connected, {} recently accessed items",
                recent.as_array().map_or(0, Vec::len)
            );
            true
        }
        Err(e) => {
            warn!("connection check failed: {e}");
            false
        }
    }
}

/// Adds grades and course contents to a raw dump. Either one is `null` when
/// its call fails.
async fn add_optional_responses(
    api: &MoodleApi,
    course_id: i64,
    assignment_ids: &[i64],
    dump: &mut Map<String, Value>,
) {
    let grades = api.mod_assign_get_grades(assignment_ids).await;
    let contents = api.core_course_get_contents(course_id).await;

    for (key, result) in [("grades", grades), ("course_contents", contents)] {
        let value = result.unwrap_or_else(|e| {
            warn!("leaving {key} out of the dump: {e}");
            Value::Null
        });
        dump.insert(key.to_string(), value);
    }
}

fn theme() -> ColorfulTheme {
    ColorfulTheme {
        active_item_style: Style::new().for_stderr().green().bold(),
        prompt_suffix: style("›".to_string()).for_stderr().black().bright(),
        defaults_style: Style::new().for_stderr().green(),
        values_style: Style::new().for_stderr().green().bold(),
        success_prefix: style(" ::".to_string()).for_stderr().white(),
        success_suffix: style("·".to_string()).for_stderr().black().bright(),
        prompt_prefix: style(" ::".to_string()).for_stderr().green().bold(),
        prompt_style: Style::new().for_stderr().white(),
        ..ColorfulTheme::default()
    }
}
