use anyhow::{Context, Result};
use serde::Serialize;
use similar::TextDiff;
use tracing::{debug, info};

use crate::registers::Registers;
use crate::wiki::{WikiPageSink, WikiPageSource};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub title: String,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct PublishOptions {
    pub page_prefix: String,
    pub current_year: i32,
}

#[derive(Debug, Clone)]
pub struct SaveOptions {
    pub edit_summary: String,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PublishReport {
    pub saved: Vec<String>,
    pub unchanged: Vec<String>,
    /// Unified diffs of the pages a dry run would have saved.
    pub diffs: Vec<PageDiff>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageDiff {
    pub title: String,
    pub diff: String,
}

/// Every register page: volumes, alphabetic ranges, authors, the public
/// domain list of `current_year` and one short register per main issue.
pub fn render_pages(registers: &Registers, options: &PublishOptions) -> Vec<RenderedPage> {
    let prefix = options.page_prefix.trim_end_matches('/');
    let title = |name: &str| format!("{prefix}/{name}");
    let authors = registers.authors();
    let mut pages = Vec::new();

    for register in registers.volume_registers() {
        pages.push(RenderedPage {
            title: title(register.volume().name()),
            text: register.get_register_str(authors, options.current_year),
        });
    }
    for register in registers.alphabetic_registers() {
        pages.push(RenderedPage {
            title: title(&register.page_name()),
            text: register.get_register_str(options.current_year),
        });
    }
    for register in registers.author_registers() {
        pages.push(RenderedPage {
            title: title(register.author().name()),
            text: register.get_register_str(options.current_year),
        });
    }
    let public_domain = registers.public_domain_register(options.current_year);
    pages.push(RenderedPage {
        title: title(&format!("PD {}", options.current_year)),
        text: public_domain.get_register_str(),
    });
    for register in registers.short_registers() {
        pages.push(RenderedPage {
            title: title(&format!("Kurz {}", register.main_issue())),
            text: register.get_register_str(),
        });
    }

    debug!(pages = pages.len(), "rendered register pages");
    pages
}

/// Save every page whose live text differs. In dry-run mode nothing is
/// written and the report carries the diffs instead.
pub fn publish_pages<A>(pages: &[RenderedPage], api: &mut A, options: &SaveOptions) -> Result<PublishReport>
where
    A: WikiPageSource + WikiPageSink + ?Sized,
{
    let mut report = PublishReport::default();
    for page in pages {
        let current = api
            .get_page_text(&page.title)
            .with_context(|| format!("failed to fetch {}", page.title))?
            .unwrap_or_default();
        if current.trim_end() == page.text.trim_end() {
            report.unchanged.push(page.title.clone());
            continue;
        }

        if options.dry_run {
            report.diffs.push(PageDiff {
                title: page.title.clone(),
                diff: unified_diff(&page.title, &current, &page.text),
            });
            continue;
        }

        api.save_page(&page.title, &page.text, &options.edit_summary)
            .with_context(|| format!("failed to save {}", page.title))?;
        report.saved.push(page.title.clone());
    }

    info!(
        saved = report.saved.len(),
        unchanged = report.unchanged.len(),
        pending = report.diffs.len(),
        dry_run = options.dry_run,
        "publish finished"
    );
    Ok(report)
}

fn unified_diff(title: &str, current: &str, proposed: &str) -> String {
    TextDiff::from_lines(current, proposed)
        .unified_diff()
        .context_radius(2)
        .header(&format!("{title} (live)"), &format!("{title} (rendered)"))
        .to_string()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{PublishOptions, SaveOptions, publish_pages, render_pages};
    use crate::authors::tests::fixture_authors;
    use crate::registers::Registers;
    use crate::volume_register::tests::register_from_json;
    use crate::wiki::tests::MockWiki;

    const PREFIX: &str = "RE/Register";

    fn registers() -> Registers {
        Registers::from_parts(
            fixture_authors(),
            vec![
                register_from_json(
                    "I,1",
                    1893,
                    json!([{"lemma": "Aal", "chapters": [{"start": 1, "author": "Abel."}]}]),
                ),
                register_from_json("S I", 1903, json!([{"lemma": "Zeus"}])),
            ],
        )
    }

    fn options() -> PublishOptions {
        PublishOptions {
            page_prefix: format!("{PREFIX}/"),
            current_year: 1996,
        }
    }

    #[test]
    fn renders_every_register_kind() {
        let pages = render_pages(&registers(), &options());
        let titles: Vec<&str> = pages.iter().map(|page| page.title.as_str()).collect();
        assert_eq!(titles[0], "RE/Register/I,1");
        assert_eq!(titles[1], "RE/Register/S I");
        assert!(titles.contains(&"RE/Register/A"));
        assert!(titles.contains(&"RE/Register/Herman Abel"));
        assert!(titles.contains(&"RE/Register/PD 1996"));
        assert!(titles.contains(&"RE/Register/Kurz I"));
        assert!(titles.contains(&"RE/Register/Kurz S I"));
        assert!(pages.iter().all(|page| !page.text.is_empty()));
    }

    #[test]
    fn publish_skips_unchanged_and_saves_the_rest() {
        let pages = render_pages(&registers(), &options());
        let mut wiki =
            MockWiki::default().with_page(&pages[0].title, &format!("{}\n", pages[0].text));
        let save = SaveOptions {
            edit_summary: "Register aktualisiert".to_string(),
            dry_run: false,
        };

        let report = publish_pages(&pages, &mut wiki, &save).expect("publish");
        assert_eq!(report.unchanged, vec![pages[0].title.clone()]);
        assert_eq!(report.saved.len(), pages.len() - 1);
        assert!(wiki.saves.iter().all(|(_, _, reason)| reason == "Register aktualisiert"));

        let again = publish_pages(&pages, &mut wiki, &save).expect("publish");
        assert!(again.saved.is_empty());
        assert_eq!(again.unchanged.len(), pages.len());
    }

    #[test]
    fn dry_run_reports_diffs_without_saving() {
        let pages = render_pages(&registers(), &options());
        let mut wiki = MockWiki::default().with_page(&pages[0].title, "{{RERegister}}\nalt\n");
        let save = SaveOptions {
            edit_summary: "Test".to_string(),
            dry_run: true,
        };

        let report = publish_pages(&pages[..1], &mut wiki, &save).expect("publish");
        assert!(wiki.saves.is_empty());
        assert_eq!(report.diffs.len(), 1);
        let diff = &report.diffs[0].diff;
        assert!(diff.starts_with("--- RE/Register/I,1 (live)\n+++ RE/Register/I,1 (rendered)\n"));
        assert!(diff.contains("-alt\n"));
        assert!(diff.contains("+|BAND=I,1\n"));
    }
}
