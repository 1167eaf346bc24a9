use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use reqwest::header::{ACCEPT, USER_AGENT};
use url::Url;

use crate::cli::ScrapeArgs;
use crate::config::Settings;
use crate::dedup;
use crate::extract;
use crate::record_store::{self, StorePaths};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrapeOutcome {
    /// Matching records on the page.
    pub found: usize,
    /// Records appended to the store.
    pub added: usize,
}

pub fn run(args: &ScrapeArgs, settings: &Settings) -> anyhow::Result<ScrapeOutcome> {
    let url = Url::parse(&args.url).context("parse --url")?;
    if url.scheme() != "http" && url.scheme() != "https" {
        anyhow::bail!("--url must be http/https: {url}");
    }
    let stores = StorePaths::in_data_dir(&PathBuf::from(&args.data_dir));

    tracing::info!(%url, "fetching course page");
    let html = fetch_page(&url)?;

    scrape_html(&html, &settings.search_terms, &stores.records)
}

/// Extracts records from `html` and appends the unseen ones to the store at
/// `records_path`.
pub fn scrape_html(
    html: &str,
    search_terms: &[String],
    records_path: &Path,
) -> anyhow::Result<ScrapeOutcome> {
    let candidates = extract::extract_from_html(html, search_terms)?;
    let found = candidates.len();

    let existing = record_store::load(records_path)?;
    let merged = dedup::merge_new(existing, candidates);
    let added = merged.added.len();

    if added > 0 {
        record_store::save(records_path, &merged.updated)
            .with_context(|| format!("save records: {}", records_path.display()))?;
        tracing::info!(added, path = %records_path.display(), "new records saved");
    } else {
        tracing::info!("no new records");
    }
    tracing::info!(found, added, "scrape finished");

    Ok(ScrapeOutcome { found, added })
}

pub fn fetch_page(url: &Url) -> anyhow::Result<String> {
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .context("build http client")?;

    let response = client
        .get(url.clone())
        .header(USER_AGENT, concat!("coursewatch/", env!("CARGO_PKG_VERSION")))
        .header(ACCEPT, "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8")
        .send()
        .with_context(|| format!("GET {url}"))?;

    let status = response.status();
    if !status.is_success() {
        anyhow::bail!("GET {url}: unexpected status {status}");
    }

    let bytes = response.bytes().context("read course page body")?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(description_cell: &str) -> String {
        format!(
            r#"<html><body><table>
<tr><th>Termin</th><th>Lehrgang</th><th>Ort</th></tr>
<tr><td>01.01.2026</td><td>{description_cell}</td><td>Feuerwache Nürtingen</td></tr>
</table></body></html>"#
        )
    }

    #[test]
    fn status_change_on_later_run_adds_nothing() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let path = temp.path().join(record_store::RECORDS_FILE_NAME);
        let terms = vec!["TM2".to_owned()];

        let first = scrape_html(&page("<h3>TM2</h3>geplant"), &terms, &path)?;
        assert_eq!(first, ScrapeOutcome { found: 1, added: 1 });
        assert_eq!(record_store::load(&path)?.len(), 1);

        let second = scrape_html(&page("<h3>TM2</h3>eingeladen"), &terms, &path)?;
        assert_eq!(second, ScrapeOutcome { found: 1, added: 0 });

        let stored = record_store::load(&path)?;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].description, "TM2 - geplant");
        Ok(())
    }

    #[test]
    fn malformed_store_entry_does_not_drop_stored_records() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let path = temp.path().join(record_store::RECORDS_FILE_NAME);
        std::fs::write(
            &path,
            r#"[
    {"termin": "01.01.2025", "beschreibung": "Atemschutz - geplant", "ort": "A", "kursname": "Atemschutz", "status": "geplant"},
    {"termin": "02.02.2025", "beschreibung": "TM2 - geplant", "ort": null}
]"#,
        )?;

        let outcome = scrape_html(&page("<h3>TM2</h3>geplant"), &["TM2".to_owned()], &path)?;
        assert_eq!(outcome, ScrapeOutcome { found: 1, added: 1 });

        let stored = record_store::load(&path)?;
        let dates = stored
            .iter()
            .map(|r| r.date_spec.as_str())
            .collect::<Vec<_>>();
        assert_eq!(dates, ["01.01.2025", "01.01.2026"]);
        Ok(())
    }

    #[test]
    fn page_without_table_leaves_store_untouched() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let path = temp.path().join(record_store::RECORDS_FILE_NAME);

        let outcome = scrape_html("<html><body>Wartung</body></html>", &["TM2".to_owned()], &path)?;

        assert_eq!(outcome, ScrapeOutcome { found: 0, added: 0 });
        assert!(!path.exists());
        Ok(())
    }
}
