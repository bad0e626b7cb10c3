use kcounter_ioctl::{Command, KCOUNTER_MAGIC, MESSAGE_CAPACITY};

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("kcounter {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: kcounter");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("KCOUNTER_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("ioctl_magic: {:?}", KCOUNTER_MAGIC as char);
    println!("message_capacity: {MESSAGE_CAPACITY}");
    for command in Command::ALL {
        println!("command: {} {}", command.name(), command.request());
    }

    Ok(SUCCESS)
}
