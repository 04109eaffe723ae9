// Entrypoint for the CLI application.
// - Keeps `main` small: set up logging, parse arguments and hand over to
//   `commands::run`.
// - Every failure ends up here and is turned into an exit status.

use aurcli::cli::Cli;
use aurcli::commands::{self, exit_status_for, ExitStatus};
use aurcli::config::Config;
use aurcli::ui::Palette;
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    // Logs go to stderr so they never mix with results; `AURCLI_LOG`
    // takes the usual filter syntax, e.g. `AURCLI_LOG=aurcli=debug`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("AURCLI_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitStatus::OptionError.into()
            } else {
                ExitStatus::Success.into()
            };
        }
    };

    let palette = Palette::new(!cli.no_color);
    match commands::run(cli, Config::from_env()) {
        Ok(status) => status.into(),
        Err(e) => {
            eprint!("{}", palette.err(&format!("{e:#}")));
            exit_status_for(&e).into()
        }
    }
}
