use crate::authors::{Author, Authors};
use crate::render::{RegisterRow, render_table, resolve_chapter_authors};
use crate::volume_register::VolumeRegister;

/// Lemmas with a contribution by an author whose work enters the public
/// domain in `year`.
#[derive(Debug)]
pub struct PublicDomainRegister<'a> {
    year: i32,
    pd_authors: Vec<&'a Author>,
    rows: Vec<RegisterRow<'a>>,
    authors: &'a Authors,
}

impl<'a> PublicDomainRegister<'a> {
    pub fn new(year: i32, registers: &'a [VolumeRegister], authors: &'a Authors) -> Self {
        let pd_authors = pd_authors(year, authors);
        let rows = registers
            .iter()
            .flat_map(|register| register.rows())
            .filter(|row| {
                row.lemma.chapters().iter().any(|chapter| {
                    resolve_chapter_authors(chapter, row.volume, authors)
                        .iter()
                        .any(|resolved| {
                            pd_authors
                                .iter()
                                .any(|candidate| candidate.name() == resolved.name())
                        })
                })
            })
            .collect();
        Self {
            year,
            pd_authors,
            rows,
            authors,
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn pd_authors(&self) -> &[&'a Author] {
        &self.pd_authors
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

    pub fn get_register_str(&self) -> String {
        let table = render_table(&self.rows, self.authors, self.year, true);
        format!("{table}\n[[Kategorie:RE:Register|!]]")
    }
}

fn pd_authors(year: i32, authors: &Authors) -> Vec<&Author> {
    authors
        .iter()
        .filter(|author| author.year_public_domain() == year)
        .collect()
}
