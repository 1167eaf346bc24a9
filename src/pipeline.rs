use anyhow::Context as _;

use crate::cli::{NotifyArgs, RunArgs, ScrapeArgs};
use crate::config::Settings;
use crate::notify::{self, NotifyOutcome};
use crate::scrape::{self, ScrapeOutcome};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub scrape: ScrapeOutcome,
    pub notify: NotifyOutcome,
}

/// Runs the scrape stage and then the notify stage. A failed scrape skips
/// notification.
pub fn run(args: &RunArgs, settings: &Settings) -> anyhow::Result<RunOutcome> {
    tracing::info!(url = %args.url, data_dir = %args.data_dir, "run: scrape");
    let scrape = scrape::run(
        &ScrapeArgs {
            url: args.url.clone(),
            data_dir: args.data_dir.clone(),
        },
        settings,
    )
    .context("scrape")?;

    tracing::info!("run: notify");
    let notify = notify::run(
        &NotifyArgs {
            data_dir: args.data_dir.clone(),
            credentials_file: args.credentials_file.clone(),
            key_file: args.key_file.clone(),
        },
        settings,
    )
    .context("notify")?;

    tracing::info!("run: finished");
    Ok(RunOutcome { scrape, notify })
}
