use crate::authors::Authors;
use crate::render::{ProofReadCounts, RegisterRow, render_header, render_table};
use crate::volume_register::VolumeRegister;

/// Start keys of the alphabetic register pages.
pub const RE_ALPHABET: &[&str] = &[
    "a", "ak", "an", "ar", "as", "b", "ca", "ch", "da", "di", "ea", "er", "f", "g", "ha", "hi",
    "i", "k", "kal", "kap", "kas", "kl", "ko", "la", "lf", "m", "mb", "mi", "mo", "n", "o", "p",
    "pe", "pi", "po", "pr", "q", "r", "sa", "se", "so", "ta", "th", "ti", "u", "uf", "x", "y",
    "z",
];

/// All lemmas of all volumes whose sort key lies in `start..end`.
#[derive(Debug)]
pub struct AlphabeticRegister<'a> {
    start: String,
    end: Option<String>,
    before_start: Option<String>,
    after_next: Option<String>,
    rows: Vec<RegisterRow<'a>>,
    authors: &'a Authors,
}

impl<'a> AlphabeticRegister<'a> {
    pub fn new(
        start: &str,
        end: Option<&str>,
        before_start: Option<&str>,
        after_next: Option<&str>,
        registers: &'a [VolumeRegister],
        authors: &'a Authors,
    ) -> Self {
        let mut rows: Vec<RegisterRow<'a>> = registers
            .iter()
            .flat_map(|register| register.rows())
            .filter(|row| {
                let sort_key = row.lemma.sort_key();
                sort_key >= start && end.is_none_or(|end| sort_key < end)
            })
            .collect();
        rows.sort_by_cached_key(|row| (row.lemma.sort_key().to_string(), row.volume.sort_key()));
        Self {
            start: start.to_string(),
            end: end.map(ToString::to_string),
            before_start: before_start.map(ToString::to_string),
            after_next: after_next.map(ToString::to_string),
            rows,
            authors,
        }
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn end(&self) -> Option<&str> {
        self.end.as_deref()
    }

    pub fn rows(&self) -> &[RegisterRow<'a>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Page title suffix: the capitalized start key.
    pub fn page_name(&self) -> String {
        capitalize(&self.start)
    }

    pub fn get_register_str(&self, current_year: i32) -> String {
        let mut fields = vec![format!("ALPHABET={}", self.start)];
        if let Some(before_start) = &self.before_start {
            fields.push(format!("VG={before_start}"));
        }
        fields.push(format!("NF={}", self.end.as_deref().unwrap_or_default()));
        fields.push(format!(
            "NFNF={}",
            self.after_next.as_deref().unwrap_or_default()
        ));
        fields.extend(ProofReadCounts::count(self.rows.iter().map(|row| row.lemma)).header_fields());
        let header = render_header(&fields);
        let table = render_table(&self.rows, self.authors, current_year, true);
        format!("{header}\n{table}\n[[Kategorie:RE:Register|!]]")
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// One alphabetic register per entry of [`RE_ALPHABET`].
pub fn alphabetic_registers<'a>(
    registers: &'a [VolumeRegister],
    authors: &'a Authors,
) -> Vec<AlphabeticRegister<'a>> {
    RE_ALPHABET
        .iter()
        .enumerate()
        .map(|(index, start)| {
            let before_start = index
                .checked_sub(1)
                .and_then(|before| RE_ALPHABET.get(before))
                .copied();
            let end = RE_ALPHABET.get(index + 1).copied();
            let after_next = RE_ALPHABET.get(index + 2).copied();
            AlphabeticRegister::new(start, end, before_start, after_next, registers, authors)
        })
        .collect()
}
