mod cli;

use std::io;
use std::process::ExitCode;

use anyhow::Result;
use fork_probe::{Probe, SystemFork};

use crate::cli::Action;

fn main() -> Result<ExitCode> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match Action::parse()? {
        Action::Help => {
            cli::print_help();
            return Ok(ExitCode::SUCCESS);
        }
        Action::Version => {
            cli::print_version();
            return Ok(ExitCode::SUCCESS);
        }
        Action::Probe => {}
    }

    // SAFETY: nothing above spawns threads, and env_logger writes to stderr
    // synchronously
    let fork = unsafe { SystemFork::new() };
    let report = Probe::new(fork).run(&mut io::stdout())?;

    Ok(ExitCode::from(report.exit_code()))
}
