mod cmd;
mod exit;
mod logging;
mod output;

use std::path::PathBuf;

use clap::Parser;
use kcounter_ioctl::DEFAULT_DEVICE_PATH;

use crate::cmd::{CheckArgs, Command, Context};
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(
    name = "kcounter",
    version,
    about = "Exercise the kcounter misc device over ioctl"
)]
struct Cli {
    /// Device node to open.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_DEVICE_PATH, global = true)]
    device: PathBuf,

    /// Output format.
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    format: OutputFormat,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    /// Defaults to `check`.
    #[command(subcommand)]
    command: Option<Command>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let ctx = Context {
        device: cli.device,
        format: cli.format,
    };
    let command = cli
        .command
        .unwrap_or_else(|| Command::Check(CheckArgs::default()));

    match cmd::run(command, &ctx) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_arguments_runs_check_on_default_node() {
        let cli = Cli::try_parse_from(["kcounter"]).expect("bare invocation should parse");
        assert!(cli.command.is_none());
        assert_eq!(cli.device, PathBuf::from("/dev/kcounter-rs"));
    }

    #[test]
    fn device_flag_is_global() {
        let cli = Cli::try_parse_from(["kcounter", "doctor", "--device", "/tmp/kc"])
            .expect("doctor args should parse");
        assert!(matches!(cli.command, Some(Command::Doctor(_))));
        assert_eq!(cli.device, PathBuf::from("/tmp/kc"));
    }

    #[test]
    fn rejects_unknown_format() {
        let err = Cli::try_parse_from(["kcounter", "--format", "xml"])
            .expect_err("unknown format should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
    }

    #[test]
    fn format_defaults_to_text_and_accepts_raw() {
        let cli = Cli::try_parse_from(["kcounter"]).expect("bare invocation should parse");
        assert!(matches!(cli.format, OutputFormat::Text));

        let cli = Cli::try_parse_from(["kcounter", "--format", "raw"])
            .expect("raw format should parse");
        assert!(matches!(cli.format, OutputFormat::Raw));
    }
}
