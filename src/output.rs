use std::io::{self, Write};

use serde::Serialize;

use crate::app::{ProgressEvent, ProgressSink, SyncReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Console,
    Json,
}

/// Plain progress lines on stdout.
pub struct ConsoleOutput;

impl ConsoleOutput {
    pub fn print_summary(report: &SyncReport) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        stdout.write_all(render_summary(report).as_bytes())
    }
}

impl ProgressSink for ConsoleOutput {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => println!("{} ({:.1}s)", event.message, elapsed.as_secs_f64()),
            None => println!("{}", event.message),
        }
    }
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_report(report: &SyncReport) -> io::Result<()> {
        Self::print_json(report)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

pub fn render_summary(report: &SyncReport) -> String {
    let mut out = String::new();
    if report.dry_run {
        out.push_str(&format!(
            "dry run: {} of {} items missing from {}\n",
            report.missing, report.latest, report.archive_root
        ));
        return out;
    }
    out.push_str(&format!(
        "completed {} / attempted {} (latest #{})\n",
        report.completed, report.attempted, report.latest
    ));
    for index in &report.partial {
        out.push_str(&format!(
            "partial: #{index} (remove {}/{index} to refetch)\n",
            report.archive_root.trim_end_matches('/')
        ));
    }
    for failed in &report.failed {
        out.push_str(&format!("failed: #{} {}\n", failed.index, failed.error));
    }
    out
}
