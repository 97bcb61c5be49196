use anyhow::{bail, Result};
use lexopt::Parser;

pub fn print_version() {
    println!(
        "{crate_name} {crate_version}",
        crate_name = env!("CARGO_PKG_NAME"),
        crate_version = env!("CARGO_PKG_VERSION")
    );
}

pub fn print_help() {
    println!(
        "{}",
        format!(
            r#"
{crate_name} {crate_version}
{crate_authors}

{crate_name} forks exactly once. The original process prints "Father", the new
process prints "Son", and both exit with 0. If the fork fails, the single
process prints "Fork Error!" and exits with 1. The parent does not wait for
the child, so the two lines may appear in either order.

Project home page: {crate_homepage}

USAGE:
    {bin}

OPTIONS:
    -h, --help
        Print this message and exit.

    -v, --version
        Print the version and exit.

ENVIRONMENT:
    RUST_LOG
        Diagnostic log filter (e.g. RUST_LOG=debug). Logs go to stderr and
        never mix with the probe's output on stdout.
"#,
            bin = env!("CARGO_BIN_NAME"),
            crate_name = env!("CARGO_PKG_NAME"),
            crate_version = env!("CARGO_PKG_VERSION"),
            crate_homepage = env!("CARGO_PKG_HOMEPAGE"),
            crate_authors = env!("CARGO_PKG_AUTHORS")
                .split(':')
                .collect::<Vec<_>>()
                .join("\n")
                .trim(),
        )
        .trim()
    );
}

#[derive(Debug, PartialEq, Eq)]
pub enum Action {
    Probe,
    Help,
    Version,
}

impl Action {
    pub fn parse() -> Result<Action> {
        Action::parse_impl(lexopt::Parser::from_env())
    }

    fn parse_impl(mut parser: Parser) -> Result<Action> {
        use lexopt::prelude::*;

        let mut action = Action::Probe;

        while let Some(arg) = parser.next()? {
            match arg {
                // -h, --help
                Short('h') | Long("help") => action = Action::Help,

                // -v, --version
                Short('v') | Long("version") => {
                    if action != Action::Help {
                        action = Action::Version;
                    }
                }

                _ => bail!(arg.unexpected()),
            }
        }

        Ok(action)
    }
}
