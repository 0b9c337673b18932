use std::collections::HashSet;

use crate::render::{ProofReadCounts, RegisterRow, lemma_link, render_header};
use crate::volume_register::VolumeRegister;

/// Condensed list of the lemmas of one main issue (`I` covers `I,1` and
/// `I,2`), one row per lemma name.
#[derive(Debug)]
pub struct ShortRegister<'a> {
    main_issue: String,
    rows: Vec<ShortRow<'a>>,
}

#[derive(Debug)]
pub struct ShortRow<'a> {
    pub row: RegisterRow<'a>,
    /// Every volume of the issue in which the lemma appears.
    pub volumes: Vec<&'a str>,
}

impl<'a> ShortRegister<'a> {
    pub fn new(main_issue: &str, registers: &'a [VolumeRegister]) -> Self {
        let mut all: Vec<RegisterRow<'a>> = registers
            .iter()
            .filter(|register| register.volume().main_issue() == main_issue)
            .flat_map(|register| register.rows())
            .collect();
        all.sort_by_cached_key(|row| (row.lemma.sort_key().to_string(), row.volume.sort_key()));

        let mut rows: Vec<ShortRow<'a>> = Vec::new();
        let mut seen = HashSet::new();
        for row in all {
            if seen.insert(row.lemma.lemma()) {
                rows.push(ShortRow {
                    row,
                    volumes: vec![row.volume.name()],
                });
            } else if let Some(existing) = rows
                .iter_mut()
                .find(|existing| existing.row.lemma.lemma() == row.lemma.lemma())
                && !existing.volumes.contains(&row.volume.name())
            {
                existing.volumes.push(row.volume.name());
            }
        }
        Self {
            main_issue: main_issue.to_string(),
            rows,
        }
    }

    pub fn main_issue(&self) -> &str {
        &self.main_issue
    }

    pub fn rows(&self) -> &[ShortRow<'a>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get_register_str(&self) -> String {
        let mut fields = vec![format!("BAND={}", self.main_issue)];
        fields.extend(ProofReadCounts::count(self.rows.iter().map(|row| row.row.lemma)).header_fields());
        let header = render_header(&fields);

        let mut lines = vec![
            "{|class=\"wikitable sortable\"".to_string(),
            "!Artikel".to_string(),
            "!Band".to_string(),
            "!Status".to_string(),
        ];
        for short in &self.rows {
            let lemma = short.row.lemma;
            lines.push("|-".to_string());
            lines.push(format!(
                "|data-sort-value=\"{}\"|{}",
                lemma.sort_key(),
                lemma_link(lemma)
            ));
            lines.push(format!("|{}", short.volumes.join(", ")));
            lines.push(format!("|style=\"background:{}\"|", lemma.proof_read().color()));
        }
        lines.push("|}".to_string());

        format!(
            "{header}\n{}\n[[Kategorie:RE:Kurzregister|{}]]",
            lines.join("\n"),
            self.main_issue
        )
    }
}
