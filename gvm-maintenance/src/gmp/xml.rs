//! Parsing of `gvm-cli` XML responses.

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::ReportSummary;

fn attribute(element: &BytesStart<'_>, name: &str) -> Result<Option<String>> {
    match element.try_get_attribute(name)? {
        Some(attr) => Ok(Some(attr.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

/// Fails unless the root element carries a 2xx `status` attribute.
pub fn check_status(xml: &str) -> Result<()> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event().context("Malformed management response")? {
            Event::Start(e) | Event::Empty(e) => {
                let root = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                let status = attribute(&e, "status")?
                    .ok_or_else(|| anyhow!("<{}> has no status attribute", root))?;
                if status.starts_with('2') {
                    return Ok(());
                }
                let text = attribute(&e, "status_text")?.unwrap_or_default();
                bail!("<{}> returned status {}: {}", root, status, text);
            }
            Event::Eof => bail!("Empty management response"),
            _ => {}
        }
    }
}

/// Accepts `2024-01-15T10:30:00Z`, offsets, or a bare naive timestamp
/// taken as UTC.
pub fn parse_report_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

/// Reports that are direct children of the response root, each with the
/// first `<timestamp>` found inside it. Nested `<report>` elements (the
/// inner detail copy) are not listed separately.
pub fn parse_reports(xml: &str) -> Result<Vec<ReportSummary>> {
    check_status(xml)?;

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut reports = Vec::new();
    let mut depth = 0usize;
    let mut current: Option<(String, Option<String>)> = None;
    let mut in_timestamp = false;

    loop {
        match reader.read_event().context("Malformed get_reports response")? {
            Event::Start(e) => {
                depth += 1;
                let name = e.name();
                if depth == 2 && name.as_ref() == b"report" {
                    let id = attribute(&e, "id")?.unwrap_or_default();
                    current = Some((id, None));
                } else if name.as_ref() == b"timestamp" {
                    if let Some((_, None)) = &current {
                        in_timestamp = true;
                    }
                }
            }
            Event::Empty(e) => {
                if depth == 1 && e.name().as_ref() == b"report" {
                    let id = attribute(&e, "id")?.unwrap_or_default();
                    reports.push(ReportSummary { id, timestamp: None });
                }
            }
            Event::Text(t) => {
                if in_timestamp {
                    if let Some((_, timestamp @ None)) = &mut current {
                        *timestamp = Some(t.unescape()?.into_owned());
                    }
                }
            }
            Event::End(e) => {
                if e.name().as_ref() == b"timestamp" {
                    in_timestamp = false;
                }
                if depth == 2 && e.name().as_ref() == b"report" {
                    if let Some((id, timestamp)) = current.take() {
                        reports.push(ReportSummary {
                            id,
                            timestamp: timestamp.as_deref().and_then(parse_report_timestamp),
                        });
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(reports.into_iter().filter(|r| !r.id.is_empty()).collect())
}
