use kcounter_ioctl::{CharDevice, CheckReport, ClientConfig, ControlChannelClient, DeviceNode};

use crate::cmd::{CheckArgs, Context};
use crate::exit::{client_error, CliResult, SUCCESS};
use crate::output::print_report;

pub fn run(_args: CheckArgs, ctx: &Context) -> CliResult<i32> {
    let report = check_with(CharDevice, ctx)?;
    print_report(&report, ctx.format);
    Ok(SUCCESS)
}

fn check_with<N: DeviceNode>(node: N, ctx: &Context) -> CliResult<CheckReport> {
    let config = ClientConfig {
        device_path: ctx.device.clone(),
    };
    tracing::debug!(device = ?config.device_path, format = ?ctx.format, "running check");
    ControlChannelClient::new(node, config)
        .run_check()
        .map_err(client_error)
}
