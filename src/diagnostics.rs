//! System diagnostics and dependency checking.
//!
//! Verifies that the ffmpeg tools are installed and the speech service is
//! configured.

use crate::config::{Config, ServiceConfig};
use crate::speech::ServiceEndpoint;
use owo_colors::OwoColorize;
use std::process::Command;

/// Result of a dependency check.
#[derive(Debug, PartialEq)]
pub enum CheckResult {
    /// Tool is installed and working
    Ok,
    /// Tool or setting is missing
    NotFound,
    /// Present but unusable
    Warning(String),
}

/// Check if a command exists and runs. ffmpeg tools take `-version`.
fn check_command(command: &str, version_flag: &str) -> CheckResult {
    match Command::new(command).arg(version_flag).output() {
        Ok(output) if output.status.success() => CheckResult::Ok,
        Ok(_) => CheckResult::Warning(format!("'{}' found but {} failed", command, version_flag)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => CheckResult::NotFound,
        Err(e) => CheckResult::Warning(format!("Error checking '{}': {}", command, e)),
    }
}

/// Check that an API key is set and the endpoint parses.
fn check_service(service: &ServiceConfig) -> CheckResult {
    if service.api_key.as_deref().is_none_or(|k| k.trim().is_empty()) {
        return CheckResult::NotFound;
    }
    match ServiceEndpoint::new(service) {
        Ok(_) => CheckResult::Ok,
        Err(e) => CheckResult::Warning(e.to_string()),
    }
}

fn report(label: &str, result: &CheckResult, hint: &[&str]) -> bool {
    print!("{label}: ");
    match result {
        CheckResult::Ok => {
            println!("{} OK", "✓".green());
            true
        }
        CheckResult::NotFound => {
            println!("{} NOT FOUND", "✗".red());
            for line in hint {
                println!("  {line}");
            }
            false
        }
        CheckResult::Warning(msg) => {
            println!("{} WARNING: {}", "⚠".yellow(), msg);
            false
        }
    }
}

/// Run all dependency checks and print results.
///
/// Returns `true` when a `recognize` run could work.
pub fn check_dependencies(config: &Config) -> bool {
    println!("Checking system dependencies...\n");

    let ffmpeg = report(
        &format!("ffmpeg ({})", config.transcoder.ffmpeg),
        &check_command(&config.transcoder.ffmpeg, "-version"),
        &[
            "Install: sudo apt install ffmpeg  (Debian/Ubuntu)",
            "         sudo pacman -S ffmpeg    (Arch)",
            "         brew install ffmpeg      (macOS)",
        ],
    );
    let ffprobe = report(
        &format!("ffprobe ({})", config.transcoder.ffprobe),
        &check_command(&config.transcoder.ffprobe, "-version"),
        &["ffprobe ships with ffmpeg"],
    );
    let service = report(
        "speech service API key",
        &check_service(&config.service),
        &[
            "Set service.api_key in the config file",
            "or export CHUNKSCRIBE_API_KEY",
        ],
    );

    println!();
    let ready = ffmpeg && ffprobe && service;
    if ready {
        println!("{} Ready to transcribe.", "✓".green());
    } else {
        println!("{} Fix the items above before running recognize.", "⚠".yellow());
    }
    ready
}
