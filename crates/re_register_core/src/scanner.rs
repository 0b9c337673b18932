use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::lemma::{Chapter, LemmaField, LemmaPatch, Redirect};
use crate::registers::Registers;
use crate::updater::Updater;
use crate::wiki::WikiPageSource;
use crate::wikitext::{VolumeGroup, group_by_volume, parse_re_page};

const TITLE_PREFIX: &str = "RE:";

#[derive(Debug, Clone, Copy, Default)]
pub struct ScanOptions {
    /// Wall-clock limit for the page loop; checked before each page.
    pub budget: Option<Duration>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    pub pages_scanned: usize,
    pub updates: Vec<ScanUpdate>,
    pub failures: Vec<ScanFailure>,
    pub missing_pages: Vec<String>,
    pub stopped_early: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanUpdate {
    pub lemma: String,
    pub volume: String,
    pub strategy: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanFailure {
    pub lemma: String,
    pub volume: String,
    pub reason: String,
}

/// Fetch every page in `titles` and apply its volume groups to the matching
/// registers. Per-lemma failures are logged and reported; fetch errors abort.
/// Nothing is persisted here.
pub fn scan_pages<S>(
    registers: &mut Registers,
    source: &mut S,
    titles: &[String],
    options: &ScanOptions,
) -> Result<ScanReport>
where
    S: WikiPageSource + ?Sized,
{
    let started = Instant::now();
    let mut report = ScanReport::default();

    for title in titles {
        if let Some(budget) = options.budget
            && started.elapsed() >= budget
        {
            warn!(
                scanned = report.pages_scanned,
                remaining = titles.len() - report.pages_scanned - report.missing_pages.len(),
                "scan budget exhausted"
            );
            report.stopped_early = true;
            break;
        }

        let Some(text) = source
            .get_page_text(title)
            .with_context(|| format!("failed to fetch {title}"))?
        else {
            debug!(title = title.as_str(), "page missing");
            report.missing_pages.push(title.clone());
            continue;
        };
        report.pages_scanned += 1;

        for group in group_by_volume(parse_re_page(&text)) {
            let (patch, remove_items) = extract_update(title, &group);
            let Some(register) = registers.volume_register_mut(&group.volume) else {
                record_failure(
                    &mut report,
                    &patch.lemma,
                    &group.volume,
                    "no register for this volume".to_string(),
                );
                continue;
            };
            match Updater::new(register).update_lemma(&patch, &remove_items, group.self_supplement) {
                Ok(strategy) => {
                    debug!(
                        lemma = patch.lemma.as_str(),
                        volume = group.volume.as_str(),
                        strategy = strategy.as_str(),
                        "updated lemma"
                    );
                    report.updates.push(ScanUpdate {
                        lemma: patch.lemma.clone(),
                        volume: group.volume.clone(),
                        strategy: strategy.as_str().to_string(),
                    });
                }
                Err(err) => record_failure(&mut report, &patch.lemma, &group.volume, err.to_string()),
            }
        }
    }

    info!(
        pages = report.pages_scanned,
        updates = report.updates.len(),
        failures = report.failures.len(),
        missing = report.missing_pages.len(),
        "scan finished"
    );
    Ok(report)
}

fn record_failure(report: &mut ScanReport, lemma: &str, volume: &str, reason: String) {
    error!(lemma, volume, reason = reason.as_str(), "lemma update failed");
    report.failures.push(ScanFailure {
        lemma: lemma.to_string(),
        volume: volume.to_string(),
        reason,
    });
}

/// Build the patch for one volume group of the page `title`. Empty or `OFF`
/// parameters turn into removals.
pub fn extract_update(title: &str, group: &VolumeGroup) -> (LemmaPatch, Vec<LemmaField>) {
    let header = group.header();
    let lemma = title.strip_prefix(TITLE_PREFIX).unwrap_or(title).trim();
    let mut patch = LemmaPatch::new(lemma);
    let mut remove_items = Vec::new();

    let mut text_field = |key: &str, field: LemmaField, prefix: &str| match value_of(header.param(key)) {
        Some(value) => Some(format!("{prefix}{value}")),
        None => {
            remove_items.push(field);
            None
        }
    };
    patch.previous = text_field("VORGÄNGER", LemmaField::Previous, "");
    patch.next = text_field("NACHFOLGER", LemmaField::Next, "");
    patch.sort_key = text_field("SORTIERUNG", LemmaField::SortKey, "");
    patch.short_description = text_field("KURZTEXT", LemmaField::ShortDescription, "");
    patch.wp_link = text_field("WIKIPEDIA", LemmaField::WpLink, "w:de:");
    patch.ws_link = text_field("WIKISOURCE", LemmaField::WsLink, "s:de:");

    if is_on(header.param("VERWEIS")) {
        patch.redirect = Some(match group.articles[0].redirect_target() {
            Some(target) => Redirect::Target(target.to_string()),
            None => Redirect::Flag(true),
        });
    } else {
        remove_items.push(LemmaField::Redirect);
    }

    match header.param("KORREKTURSTAND").map(str::to_lowercase).as_deref() {
        Some("fertig") => patch.proof_read = Some(3),
        Some("korrigiert") => patch.proof_read = Some(2),
        Some("unkorrigiert") => patch.proof_read = Some(1),
        _ => remove_items.push(LemmaField::ProofRead),
    }

    if is_on(header.param("KEINE_SCHÖPFUNGSHÖHE")) {
        patch.no_creative_height = Some(true);
    } else {
        remove_items.push(LemmaField::NoCreativeHeight);
    }

    let chapters: Vec<Chapter> = group
        .articles
        .iter()
        .filter_map(|article| {
            let start = article.header.param("SPALTE_START")?.parse::<u32>().ok()?;
            let end = match article.header.param("SPALTE_END") {
                Some("OFF") => Some(start),
                Some(value) => value.parse::<u32>().ok(),
                None => None,
            };
            Some(Chapter::new(start, end, article.author.as_deref()))
        })
        .collect();
    if chapters.is_empty() {
        remove_items.push(LemmaField::Chapters);
    } else {
        patch.chapters = Some(chapters);
    }

    (patch, remove_items)
}

fn value_of(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim)
        .filter(|value| !value.is_empty() && *value != "OFF")
}

fn is_on(raw: Option<&str>) -> bool {
    raw.map(str::trim) == Some("ON")
}
