use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "offline-grader",
    about = "Download Moodle assignment submissions for offline grading"
)]
pub struct Cli {
    /// Configuration file with the web-service token and server url
    #[arg(long = "config_file", default_value = "config.json")]
    pub config_file: PathBuf,

    /// Where to write the raw responses, pretty-printed
    #[arg(long = "output_file")]
    pub output_file: Option<PathBuf>,
}
