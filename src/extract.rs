use anyhow::Context as _;
use scraper::{ElementRef, Html, Selector};

use crate::formats::Record;
use crate::identity::{self, DESCRIPTION_SEPARATOR};

/// Joins the earliest and latest date of a multi-date row.
pub const DATE_RANGE_SEPARATOR: &str = " - ";

pub const DEFAULT_SEARCH_TERMS: [&str; 3] = ["TM2", "Atemschutz", "Truppmann"];

/// Splits a comma separated `SEARCH_TEXT` value into search terms.
///
/// Falls back to [`DEFAULT_SEARCH_TERMS`] when the value is unset or holds no
/// terms.
pub fn parse_search_terms(raw: Option<&str>) -> Vec<String> {
    let terms = raw
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .map(str::to_owned)
        .collect::<Vec<_>>();

    if terms.is_empty() {
        tracing::warn!("no search terms configured; using defaults");
        return DEFAULT_SEARCH_TERMS.iter().map(|t| (*t).to_owned()).collect();
    }

    tracing::info!(?terms, "search terms");
    terms
}

struct CourseTableSelectors {
    table: Selector,
    row: Selector,
    cell: Selector,
    heading: Selector,
}

impl CourseTableSelectors {
    fn new() -> anyhow::Result<Self> {
        Ok(Self {
            table: selector("table")?,
            row: selector("tr")?,
            cell: selector("td")?,
            heading: selector("h3")?,
        })
    }
}

fn selector(css: &str) -> anyhow::Result<Selector> {
    Selector::parse(css).map_err(|err| anyhow::anyhow!("parse css selector {css:?}: {err}"))
}

/// Parses `html` and extracts the matching course records.
pub fn extract_from_html(html: &str, search_terms: &[String]) -> anyhow::Result<Vec<Record>> {
    let document = Html::parse_document(html);
    extract(&document, search_terms).context("extract course table")
}

/// Extracts course records from the first table of `document`.
///
/// Rows need exactly three cells: dates, description (`<h3>` course name plus
/// status lines) and location. Only rows whose description contains one of
/// `search_terms` (case-insensitive) are kept. A missing table is logged and
/// yields no records.
pub fn extract(document: &Html, search_terms: &[String]) -> anyhow::Result<Vec<Record>> {
    let selectors = CourseTableSelectors::new()?;

    let Some(table) = document.select(&selectors.table).next() else {
        tracing::error!("no table found in course page");
        return Ok(Vec::new());
    };

    let rows = table.select(&selectors.row).collect::<Vec<_>>();
    if rows.len() <= 1 {
        tracing::warn!(rows = rows.len(), "course table has no data rows");
        return Ok(Vec::new());
    }

    let terms_lower = search_terms
        .iter()
        .map(|term| term.to_lowercase())
        .collect::<Vec<_>>();

    let mut records = Vec::new();
    for row in rows {
        let cells = row.select(&selectors.cell).collect::<Vec<_>>();
        let [dates_cell, description_cell, location_cell] = cells.as_slice() else {
            continue;
        };

        let mut dates = non_empty_lines(*dates_cell);
        if dates.is_empty() {
            continue;
        }

        let description = row_description(*description_cell, &selectors.heading);
        let description_lower = description.to_lowercase();
        if !terms_lower
            .iter()
            .any(|term| description_lower.contains(term.as_str()))
        {
            continue;
        }

        let location = identity::normalize_whitespace(&joined_text(*location_cell));

        if dates.len() >= 2 {
            dates.sort();
            let first = dates.first().map(String::as_str).unwrap_or_default();
            let last = dates.last().map(String::as_str).unwrap_or_default();
            let date_range = format!("{first}{DATE_RANGE_SEPARATOR}{last}");
            records.push(Record::new(date_range, description, location));
        } else {
            for date in dates {
                records.push(Record::new(date, description.clone(), location.clone()));
            }
        }
    }

    tracing::debug!(count = records.len(), "extracted course records");
    Ok(records)
}

fn row_description(cell: ElementRef<'_>, heading: &Selector) -> String {
    let course_name = cell
        .select(heading)
        .next()
        .map(|h3| h3.text().map(str::trim).collect::<String>())
        .unwrap_or_default();
    let status = non_empty_lines(cell).pop().unwrap_or_default();

    if course_name.is_empty() {
        status
    } else {
        format!("{course_name}{DESCRIPTION_SEPARATOR}{status}")
    }
}

fn joined_text(element: ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join("\n")
}

fn non_empty_lines(element: ElementRef<'_>) -> Vec<String> {
    joined_text(element)
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_owned()).collect()
    }

    fn page(rows: &str) -> String {
        format!(
            r#"<!doctype html>
<html><body>
<table>
  <tr><th>Termin</th><th>Lehrgang</th><th>Ort</th></tr>
  {rows}
</table>
</body></html>"#
        )
    }

    #[test]
    fn extracts_single_date_row() -> anyhow::Result<()> {
        let html = page(
            r#"<tr>
  <td>01.01.2026</td>
  <td><h3>TM2</h3><p>geplant</p></td>
  <td>Feuerwache<br>  Nürtingen</td>
</tr>"#,
        );

        let records = extract_from_html(&html, &terms(&["tm2"]))?;
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.date_spec, "01.01.2026");
        assert_eq!(record.description, "TM2 - geplant");
        assert_eq!(record.course_name, "TM2");
        assert_eq!(record.status, "geplant");
        assert_eq!(record.location, "Feuerwache Nürtingen");
        Ok(())
    }

    #[test]
    fn collapses_multiple_dates_into_sorted_range() -> anyhow::Result<()> {
        let html = page(
            r#"<tr>
  <td>25.10.2025<br>10.10.2025</td>
  <td><h3>Atemschutzgeräteträger</h3>eingeladen</td>
  <td>Esslingen</td>
</tr>"#,
        );

        let records = extract_from_html(&html, &terms(&["Atemschutz"]))?;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].date_spec, "10.10.2025 - 25.10.2025");
        assert_eq!(records[0].description, "Atemschutzgeräteträger - eingeladen");
        Ok(())
    }

    #[test]
    fn filters_rows_without_search_term() -> anyhow::Result<()> {
        let html = page(
            r#"<tr><td>01.02.2026</td><td><h3>Maschinist</h3>geplant</td><td>A</td></tr>
<tr><td>02.02.2026</td><td><h3>truppmann teil 1</h3>geplant</td><td>B</td></tr>"#,
        );

        let records = extract_from_html(&html, &terms(&["TRUPPMANN"]))?;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].course_name, "truppmann teil 1");
        Ok(())
    }

    #[test]
    fn row_without_heading_uses_status_as_description() -> anyhow::Result<()> {
        let html = page(r#"<tr><td>03.03.2026</td><td>TM2 ausgebucht</td><td>C</td></tr>"#);

        let records = extract_from_html(&html, &terms(&["TM2"]))?;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].description, "TM2 ausgebucht");
        assert_eq!(records[0].course_name, "TM2 ausgebucht");
        assert_eq!(records[0].status, "");
        Ok(())
    }

    #[test]
    fn skips_malformed_rows_and_keeps_order() -> anyhow::Result<()> {
        let html = page(
            r#"<tr><td>04.04.2026</td><td><h3>TM2</h3>geplant</td><td>A</td></tr>
<tr><td>only</td><td>two cells TM2</td></tr>
<tr><td>   </td><td><h3>TM2</h3>geplant</td><td>B</td></tr>
<tr><td>01.04.2026</td><td><h3>TM2</h3>eingeladen</td><td>C</td></tr>"#,
        );

        let records = extract_from_html(&html, &terms(&["TM2"]))?;
        let dates = records
            .iter()
            .map(|r| r.date_spec.as_str())
            .collect::<Vec<_>>();
        assert_eq!(dates, ["04.04.2026", "01.04.2026"]);
        Ok(())
    }

    #[test]
    fn missing_table_yields_no_records() -> anyhow::Result<()> {
        let records = extract_from_html("<html><body><p>TM2</p></body></html>", &terms(&["TM2"]))?;
        assert!(records.is_empty());
        Ok(())
    }

    #[test]
    fn header_only_or_empty_table_yields_no_records() -> anyhow::Result<()> {
        let header_only = extract_from_html(&page(""), &terms(&["TM2"]))?;
        assert_eq!(header_only, Vec::new());

        let empty = extract_from_html(
            "<html><body><table></table><p>TM2</p></body></html>",
            &terms(&["TM2"]),
        )?;
        assert_eq!(empty, Vec::new());
        Ok(())
    }

    #[test]
    fn search_terms_fall_back_to_defaults() {
        assert_eq!(parse_search_terms(None), DEFAULT_SEARCH_TERMS);
        assert_eq!(parse_search_terms(Some(" , ")), DEFAULT_SEARCH_TERMS);
        assert_eq!(
            parse_search_terms(Some(" TM2 , Sprechfunker,,")),
            ["TM2", "Sprechfunker"]
        );
    }
}
