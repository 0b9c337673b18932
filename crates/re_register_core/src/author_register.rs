use crate::authors::{Author, Authors};
use crate::render::{
    ProofReadCounts, RegisterRow, render_header, render_table, resolve_chapter_authors,
};
use crate::volume_register::VolumeRegister;

/// Every lemma with at least one chapter signed by `author`, in volume order.
#[derive(Debug)]
pub struct AuthorRegister<'a> {
    author: &'a Author,
    rows: Vec<RegisterRow<'a>>,
    authors: &'a Authors,
}

impl<'a> AuthorRegister<'a> {
    pub fn new(author: &'a Author, registers: &'a [VolumeRegister], authors: &'a Authors) -> Self {
        let rows = registers
            .iter()
            .flat_map(|register| register.rows())
            .filter(|row| {
                row.lemma.chapters().iter().any(|chapter| {
                    resolve_chapter_authors(chapter, row.volume, authors)
                        .iter()
                        .any(|resolved| resolved.name() == author.name())
                })
            })
            .collect();
        Self {
            author,
            rows,
            authors,
        }
    }

    pub fn author(&self) -> &'a Author {
        self.author
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

    pub fn get_register_str(&self, current_year: i32) -> String {
        let mut fields = vec![format!("AUTHOR={}", self.author.name())];
        fields.extend(ProofReadCounts::count(self.rows.iter().map(|row| row.lemma)).header_fields());
        let header = render_header(&fields);
        let table = render_table(&self.rows, self.authors, current_year, true);
        format!(
            "{header}\n{table}\n[[Kategorie:RE:Register|{}, {}]]",
            self.author.last_name(),
            self.author.first_name()
        )
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::AuthorRegister;
    use crate::authors::tests::fixture_authors;
    use crate::volume_register::tests::register_from_json;

    #[test]
    fn collects_lemmas_resolved_per_issue() {
        let registers = vec![
            register_from_json(
                "I,1",
                1893,
                json!([
                    {"lemma": "Aal", "chapters": [{"start": 1, "author": "Fabricius."}]},
                    {"lemma": "Aba", "chapters": [{"start": 2, "author": "Abel und Crusius."}]},
                    {"lemma": "Abae", "chapters": [{"start": 3, "author": "Abel."}]}
                ]),
            ),
            register_from_json(
                "III,2",
                1899,
                json!([{"lemma": "Zeus", "chapters": [{"start": 9, "author": "Fabricius."}]}]),
            ),
        ];
        let authors = fixture_authors();

        let crusius = authors.get_author("Otto Crusius").expect("crusius");
        let register = AuthorRegister::new(crusius, &registers, &authors);
        let lemmas: Vec<&str> = register.rows().iter().map(|row| row.lemma.lemma()).collect();
        assert_eq!(lemmas, vec!["Aba", "Zeus"]);

        let fabricius = authors.get_author("Ernst Fabricius").expect("fabricius");
        let register = AuthorRegister::new(fabricius, &registers, &authors);
        let lemmas: Vec<&str> = register.rows().iter().map(|row| row.lemma.lemma()).collect();
        assert_eq!(lemmas, vec!["Aal"]);
    }

    #[test]
    fn category_sorts_by_last_then_first_name() {
        let registers = vec![register_from_json(
            "I,1",
            1893,
            json!([{"lemma": "Aal", "chapters": [{"start": 1, "author": "Abert."}]}]),
        )];
        let authors = fixture_authors();
        let abert = authors.get_author("Abert").expect("abert");
        let rendered = AuthorRegister::new(abert, &registers, &authors).get_register_str(2024);
        assert!(rendered.starts_with("{{RERegister\n|AUTHOR=Hermann Abert\n|SUM=1\n"));
        assert!(rendered.ends_with("[[Kategorie:RE:Register|Abert, Hermann]]"));
    }

    #[test]
    fn author_borrow_outlives_the_register() {
        let registers = vec![register_from_json(
            "I,1",
            1893,
            json!([{"lemma": "Aal", "chapters": [{"start": 1, "author": "Abel."}]}]),
        )];
        let authors = fixture_authors();
        let names: Vec<&str> = authors
            .iter()
            .map(|author| AuthorRegister::new(author, &registers, &authors).author().name())
            .collect();
        assert!(names.contains(&"Herman Abel"));
    }
}
