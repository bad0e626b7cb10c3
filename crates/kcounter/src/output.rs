use std::io::Write;

use clap::ValueEnum;
use kcounter_ioctl::{CheckReport, Command};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Raw,
}

#[derive(Serialize)]
struct RequestOutput {
    name: &'static str,
    request: String,
    direction: &'static str,
    size: usize,
}

impl RequestOutput {
    fn of(command: Command) -> Self {
        Self {
            name: command.name(),
            request: command.request().to_string(),
            direction: command.direction().as_str(),
            size: command.payload_size(),
        }
    }
}

#[derive(Serialize)]
struct CheckOutput {
    schema_id: &'static str,
    device: String,
    probe: RequestOutput,
    probe_errno: Option<i32>,
    read: RequestOutput,
    message: String,
    message_len: usize,
    passed: bool,
}

pub fn print_report(report: &CheckReport, format: OutputFormat) {
    match format {
        OutputFormat::Text => {
            println!("Message received: {}", display_text(&report.message.text()));
        }
        OutputFormat::Json => {
            let out = CheckOutput {
                schema_id: "kcounter/check-report/v1",
                device: report.device_path.display().to_string(),
                probe: RequestOutput::of(Command::UnsupportedProbe),
                probe_errno: report.probe.errno,
                read: RequestOutput::of(Command::ReadMessage),
                message: report.message.text(),
                message_len: report.message.len(),
                passed: true,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Raw => print_raw(report.message.as_bytes()),
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

/// The driver ends its greeting with a newline; don't print a blank line after it.
fn display_text(text: &str) -> &str {
    text.trim_end_matches(['\r', '\n'])
}
