use std::path::Path;
use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

fn main() -> ExitCode {
    if let Err(err) = try_main() {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn try_main() -> anyhow::Result<()> {
    let cli = coursewatch::cli::Cli::parse();
    coursewatch::logging::init(cli.log_file.as_deref().map(Path::new)).context("init logging")?;
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        coursewatch::cli::Command::Scrape(args) => {
            let settings = coursewatch::config::Settings::from_env().context("load settings")?;
            coursewatch::scrape::run(&args, &settings).context("scrape")?;
        }
        coursewatch::cli::Command::Notify(args) => {
            let settings = coursewatch::config::Settings::from_env().context("load settings")?;
            let outcome = coursewatch::notify::run(&args, &settings).context("notify")?;
            if outcome.new_records > 0 && !outcome.sent {
                tracing::warn!(
                    new_records = outcome.new_records,
                    "notification was not delivered; records are marked as notified anyway"
                );
            }
        }
        coursewatch::cli::Command::Run(args) => {
            let settings = coursewatch::config::Settings::from_env().context("load settings")?;
            coursewatch::pipeline::run(&args, &settings).context("run")?;
        }
        coursewatch::cli::Command::Credentials {
            command: coursewatch::cli::CredentialsCommand::Init(args),
        } => {
            coursewatch::credentials::init(&args).context("credentials init")?;
        }
    }

    Ok(())
}
