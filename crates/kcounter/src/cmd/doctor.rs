use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{FileTypeExt, MetadataExt};
use std::path::Path;

use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use kcounter_ioctl::Command;
use serde::Serialize;

use crate::cmd::{Context, DoctorArgs};
use crate::exit::{CliResult, HEALTH_CHECK_FAILED, SUCCESS};
use crate::output::OutputFormat;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Pass,
    Fail,
    Info,
    Skip,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    name: String,
    status: CheckStatus,
    detail: String,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct DoctorOutput {
    schema_id: &'static str,
    device: String,
    checks: Vec<CheckResult>,
    overall: &'static str,
}

/// Opening the node would bump the driver's counter and hold its exclusive
/// lock, so every check here works from metadata and `access(2)` only.
pub fn run(_args: DoctorArgs, ctx: &Context) -> CliResult<i32> {
    let checks = vec![
        platform_check(),
        node_exists_check(&ctx.device),
        node_type_check(&ctx.device),
        node_access_check(&ctx.device),
        command_table_check(),
    ];

    let has_fail = checks.iter().any(|c| c.status == CheckStatus::Fail);
    for check in checks.iter().filter(|c| c.status == CheckStatus::Fail) {
        tracing::warn!(check = %check.name, detail = %check.detail, "doctor check failed");
    }
    let output = DoctorOutput {
        schema_id: "kcounter/doctor-report/v1",
        device: ctx.device.display().to_string(),
        checks,
        overall: if has_fail { "fail" } else { "pass" },
    };

    print_doctor(&output, ctx.format);

    if has_fail {
        Ok(HEALTH_CHECK_FAILED)
    } else {
        Ok(SUCCESS)
    }
}

fn print_doctor(output: &DoctorOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(output).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Text => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["STATUS", "CHECK", "DETAIL"]);
            for c in &output.checks {
                table.add_row(vec![
                    status_text(c.status).to_string(),
                    c.name.clone(),
                    c.detail.clone(),
                ]);
            }
            println!("kcounter doctor ({})\n", output.device);
            println!("{table}");
            if output.overall == "pass" {
                println!("\nResult: all checks passed");
            } else {
                println!("\nResult: one or more checks failed");
            }
        }
        OutputFormat::Raw => {
            println!("{}", output.overall);
        }
    }
}

fn status_text(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::Pass => "PASS",
        CheckStatus::Fail => "FAIL",
        CheckStatus::Info => "INFO",
        CheckStatus::Skip => "SKIP",
    }
}

fn platform_check() -> CheckResult {
    CheckResult::new(
        "platform",
        CheckStatus::Pass,
        format!(
            "{}/{}, ioctl(2) available",
            std::env::consts::OS,
            std::env::consts::ARCH
        ),
    )
}

fn node_exists_check(path: &Path) -> CheckResult {
    match std::fs::metadata(path) {
        Ok(_) => CheckResult::new("node_exists", CheckStatus::Pass, "present"),
        Err(err) => CheckResult::new(
            "node_exists",
            CheckStatus::Fail,
            format!("{}: {err} (is the module loaded?)", path.display()),
        ),
    }
}

fn node_type_check(path: &Path) -> CheckResult {
    let Ok(metadata) = std::fs::metadata(path) else {
        return CheckResult::new("node_type", CheckStatus::Skip, "node missing");
    };

    if metadata.file_type().is_char_device() {
        CheckResult::new(
            "node_type",
            CheckStatus::Pass,
            format!("character device (rdev {:#x})", metadata.rdev()),
        )
    } else {
        CheckResult::new("node_type", CheckStatus::Fail, "not a character device")
    }

}

fn node_access_check(path: &Path) -> CheckResult {
    if !path.exists() {
        return CheckResult::new("node_access", CheckStatus::Skip, "node missing");
    }

    let Ok(c_path) = CString::new(path.as_os_str().as_bytes()) else {
        return CheckResult::new("node_access", CheckStatus::Fail, "path contains NUL");
    };
    // SAFETY: `c_path` is a valid NUL-terminated string for the duration of the call.
    let rc = unsafe { libc::access(c_path.as_ptr(), libc::R_OK | libc::W_OK) };
    if rc == 0 {
        CheckResult::new("node_access", CheckStatus::Pass, "read-write permitted")
    } else {
        CheckResult::new(
            "node_access",
            CheckStatus::Fail,
            format!("read-write denied: {}", std::io::Error::last_os_error()),
        )
    }
}

fn command_table_check() -> CheckResult {
    let detail = Command::ALL
        .iter()
        .map(|c| format!("{}={}", c.name(), c.request()))
        .collect::<Vec<_>>()
        .join(", ");
    CheckResult::new("commands", CheckStatus::Info, detail)
}
