use crate::authors::{Author, Authors};
use crate::lemma::{Chapter, Lemma, ProofRead};
use crate::volumes::Volume;

pub const PUBLIC_DOMAIN_COLOR: &str = "#B9FFC5";
pub const PROTECTED_COLOR: &str = "#FFCBCB";
pub const NO_AUTHOR_COLOR: &str = "#CBCBCB";

/// A lemma together with the volume it was printed in.
#[derive(Debug, Clone, Copy)]
pub struct RegisterRow<'a> {
    pub lemma: &'a Lemma,
    pub volume: &'a Volume,
}

impl<'a> RegisterRow<'a> {
    pub fn new(lemma: &'a Lemma, volume: &'a Volume) -> Self {
        Self { lemma, volume }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProofReadCounts {
    pub sum: usize,
    pub unknown: usize,
    pub proofed: usize,
    pub finished: usize,
}

impl ProofReadCounts {
    pub fn count<'a>(lemmas: impl IntoIterator<Item = &'a Lemma>) -> Self {
        let mut counts = Self::default();
        for lemma in lemmas {
            counts.sum += 1;
            match lemma.proof_read() {
                ProofRead::Finished => counts.finished += 1,
                ProofRead::Proofed => counts.proofed += 1,
                ProofRead::Unproofed | ProofRead::Unknown => counts.unknown += 1,
            }
        }
        counts
    }

    pub(crate) fn header_fields(&self) -> [String; 4] {
        [
            format!("SUM={}", self.sum),
            format!("UNK={}", self.unknown),
            format!("KOR={}", self.proofed),
            format!("FER={}", self.finished),
        ]
    }
}

/// Consecutive rows with the same lemma name share one link cell.
pub fn squash_lemmas<'r, 'a>(rows: &'r [RegisterRow<'a>]) -> Vec<&'r [RegisterRow<'a>]> {
    rows.chunk_by(|left, right| left.lemma.lemma() == right.lemma.lemma())
        .collect()
}

pub(crate) fn render_header(fields: &[String]) -> String {
    let mut header = Vec::with_capacity(fields.len() + 1);
    header.push("RERegister");
    header.extend(fields.iter().map(String::as_str));
    format!("{{{{{}\n}}}}\n", header.join("\n|"))
}

pub(crate) fn render_table(
    rows: &[RegisterRow<'_>],
    authors: &Authors,
    current_year: i32,
    print_volume: bool,
) -> String {
    let mut lines = vec!["{|class=\"wikitable sortable\"".to_string(), "!Artikel".to_string()];
    if print_volume {
        lines.push("!Band".to_string());
    }
    for column in ["!Kurztext", "!Wikilinks", "!Seite", "!Autor", "!Sterbejahr"] {
        lines.push(column.to_string());
    }

    for group in squash_lemmas(rows) {
        let first = group[0].lemma;
        let span: usize = group
            .iter()
            .map(|row| row.lemma.chapters().len().max(1))
            .sum();
        lines.push("|-".to_string());
        lines.push(format!(
            "|{}data-sort-value=\"{}\"|{}",
            rowspan(span),
            first.sort_key(),
            lemma_link(first)
        ));
        for (index, row) in group.iter().enumerate() {
            if index > 0 {
                lines.push("|-".to_string());
            }
            push_lemma_cells(&mut lines, *row, authors, current_year, print_volume);
        }
    }
    lines.push("|}".to_string());
    lines.join("\n")
}

fn push_lemma_cells(
    lines: &mut Vec<String>,
    row: RegisterRow<'_>,
    authors: &Authors,
    current_year: i32,
    print_volume: bool,
) {
    let lemma = row.lemma;
    let span = lemma.chapters().len();
    if print_volume {
        lines.push(spanned_cell(span, row.volume.name()));
    }
    lines.push(spanned_cell(span, &short_description(lemma)));
    lines.push(spanned_cell(span, &wiki_links(lemma)));

    if lemma.chapters().is_empty() {
        lines.push(format!("|style=\"background:{}\"|", lemma.proof_read().color()));
        lines.push("|".to_string());
        lines.push(format!("|style=\"background:{NO_AUTHOR_COLOR}\"|"));
        return;
    }
    for (index, chapter) in lemma.chapters().iter().enumerate() {
        if index > 0 {
            lines.push("|-".to_string());
        }
        let resolved = resolve_chapter_authors(chapter, row.volume, authors);
        lines.push(format!(
            "|style=\"background:{}\"|{}",
            lemma.proof_read().color(),
            pages(chapter, row.volume)
        ));
        lines.push(format!("|{}", author_cell(chapter, &resolved)));
        lines.push(format!(
            "|style=\"background:{}\"|{}",
            year_color(lemma, &resolved, current_year),
            death_year(&resolved)
        ));
    }
}

fn rowspan(span: usize) -> String {
    if span > 1 {
        format!("rowspan={span} ")
    } else {
        String::new()
    }
}

fn spanned_cell(span: usize, text: &str) -> String {
    if span > 1 {
        format!("|rowspan={span}|{text}")
    } else {
        format!("|{text}")
    }
}

pub(crate) fn lemma_link(lemma: &Lemma) -> String {
    let name = lemma.lemma();
    if lemma.is_redirect() {
        format!("[[RE:{name}|''{{{{Anker2|{name}}}}}'']]")
    } else {
        format!("[[RE:{name}|'''{{{{Anker2|{name}}}}}''']]")
    }
}

fn short_description(lemma: &Lemma) -> String {
    if let Some(description) = lemma.short_description() {
        return description.to_string();
    }
    match lemma.redirect().and_then(|redirect| redirect.target()) {
        Some(target) => format!("→ [[RE:{target}|{target}]]"),
        None => String::new(),
    }
}

fn wiki_links(lemma: &Lemma) -> String {
    let mut links = Vec::new();
    if let Some(link) = lemma.wp_link() {
        links.push(format!("[[{link}|{}]]<sup>(WP)</sup>", link_label(link)));
    }
    if let Some(link) = lemma.ws_link() {
        links.push(format!("[[{link}|{}]]<sup>(WS)</sup>", link_label(link)));
    }
    links.join("<br />")
}

fn link_label(link: &str) -> &str {
    match link.rsplit_once(':') {
        Some((_, label)) => label,
        None => link,
    }
}

/// Scans are named after the odd column of a double page.
fn pages(chapter: &Chapter, volume: &Volume) -> String {
    let scan = if chapter.start % 2 == 0 {
        chapter.start - 1
    } else {
        chapter.start
    };
    let mut rendered = format!(
        "[[Spezial:Dateipfad/Pauly-Wissowa_{}_{:04}.jpg|{}]]",
        volume.file_name(),
        scan,
        chapter.start
    );
    if let Some(end) = chapter.end.filter(|end| *end != chapter.start) {
        rendered.push_str(&format!("-{end}"));
    }
    rendered
}

pub(crate) fn resolve_chapter_authors<'a>(
    chapter: &Chapter,
    volume: &Volume,
    authors: &'a Authors,
) -> Vec<&'a Author> {
    match chapter.author.as_deref() {
        Some(signature) => authors.get_author_by_mapping(signature, volume.name()),
        None => Vec::new(),
    }
}

fn author_cell(chapter: &Chapter, resolved: &[&Author]) -> String {
    if resolved.is_empty() {
        return chapter.author.clone().unwrap_or_default();
    }
    resolved
        .iter()
        .map(|author| author.name())
        .collect::<Vec<_>>()
        .join(", ")
}

fn death_year(resolved: &[&Author]) -> String {
    resolved
        .iter()
        .filter_map(|author| author.death())
        .max()
        .map(|year| year.to_string())
        .unwrap_or_default()
}

fn year_color(lemma: &Lemma, resolved: &[&Author], current_year: i32) -> &'static str {
    if lemma.no_creative_height() {
        return PUBLIC_DOMAIN_COLOR;
    }
    match resolved.iter().map(|author| author.year_public_domain()).max() {
        None => NO_AUTHOR_COLOR,
        Some(year) if year <= current_year => PUBLIC_DOMAIN_COLOR,
        Some(_) => PROTECTED_COLOR,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{ProofReadCounts, RegisterRow, render_header, render_table, squash_lemmas};
    use crate::authors::tests::fixture_authors;
    use crate::lemma::Lemma;
    use crate::volumes::Volume;

    fn lemmas(value: serde_json::Value) -> Vec<Lemma> {
        serde_json::from_value(value).expect("lemmas")
    }

    #[test]
    fn header_joins_fields() {
        let header = render_header(&["BAND=I,1".to_string(), "SUM=2".to_string()]);
        assert_eq!(header, "{{RERegister\n|BAND=I,1\n|SUM=2\n}}\n");
    }

    #[test]
    fn renders_single_chapter_row() {
        let volume = Volume::new("I,1", 1893);
        let entries = lemmas(json!([{
            "lemma": "Aal",
            "proof_read": 3,
            "short_description": "Fisch",
            "wp_link": "w:de:Aal",
            "chapters": [{"start": 2, "end": 3, "author": "Abel."}]
        }]));
        let rows: Vec<RegisterRow<'_>> = entries
            .iter()
            .map(|lemma| RegisterRow::new(lemma, &volume))
            .collect();
        let table = render_table(&rows, &fixture_authors(), 2024, false);
        assert_eq!(
            table,
            "{|class=\"wikitable sortable\"\n!Artikel\n!Kurztext\n!Wikilinks\n!Seite\n!Autor\n!Sterbejahr\n\
             |-\n\
             |data-sort-value=\"aal\"|[[RE:Aal|'''{{Anker2|Aal}}''']]\n\
             |Fisch\n\
             |[[w:de:Aal|Aal]]<sup>(WP)</sup>\n\
             |style=\"background:#556B2F\"|[[Spezial:Dateipfad/Pauly-Wissowa_I_1_0001.jpg|2]]-3\n\
             |Herman Abel\n\
             |style=\"background:#B9FFC5\"|1925\n\
             |}"
        );
    }

    #[test]
    fn groups_and_chapters_span_rows() {
        let first = Volume::new("I,1", 1893);
        let supplement = Volume::new("S I", 1903);
        let entries = lemmas(json!([
            {"lemma": "Aal", "chapters": [
                {"start": 1, "author": "Abert."},
                {"start": 3, "author": "Unbekannt."}
            ]},
            {"lemma": "Aal", "redirect": "Aale"}
        ]));
        let rows = vec![
            RegisterRow::new(&entries[0], &first),
            RegisterRow::new(&entries[1], &supplement),
        ];
        let table = render_table(&rows, &fixture_authors(), 1990, true);
        let body: Vec<&str> = table.lines().skip(8).collect();
        assert_eq!(
            body,
            vec![
                "|-",
                "|rowspan=3 data-sort-value=\"aal\"|[[RE:Aal|'''{{Anker2|Aal}}''']]",
                "|rowspan=2|I,1",
                "|rowspan=2|",
                "|rowspan=2|",
                "|style=\"background:#AA0000\"|[[Spezial:Dateipfad/Pauly-Wissowa_I_1_0001.jpg|1]]",
                "|Hermann Abert",
                "|style=\"background:#FFCBCB\"|1927",
                "|-",
                "|style=\"background:#AA0000\"|[[Spezial:Dateipfad/Pauly-Wissowa_I_1_0003.jpg|3]]",
                "|Unbekannt.",
                "|style=\"background:#CBCBCB\"|",
                "|-",
                "|S I",
                "|→ [[RE:Aale|Aale]]",
                "|",
                "|style=\"background:#AA0000\"|",
                "|",
                "|style=\"background:#CBCBCB\"|",
                "|}",
            ]
        );
    }

    #[test]
    fn squash_groups_consecutive_names_only() {
        let volume = Volume::new("I,1", 1893);
        let entries = lemmas(json!([
            {"lemma": "Aal"}, {"lemma": "Aal"}, {"lemma": "Aba"}, {"lemma": "Aal"}
        ]));
        let rows: Vec<RegisterRow<'_>> = entries
            .iter()
            .map(|lemma| RegisterRow::new(lemma, &volume))
            .collect();
        let sizes: Vec<usize> = squash_lemmas(&rows).iter().map(|group| group.len()).collect();
        assert_eq!(sizes, vec![2, 1, 1]);
    }

    #[test]
    fn counts_proof_read_states() {
        let entries = lemmas(json!([
            {"lemma": "A", "proof_read": 3},
            {"lemma": "B", "proof_read": 2},
            {"lemma": "C", "proof_read": 1},
            {"lemma": "D"}
        ]));
        assert_eq!(
            ProofReadCounts::count(entries.iter()),
            ProofReadCounts {
                sum: 4,
                unknown: 2,
                proofed: 1,
                finished: 1
            }
        );
    }
}
