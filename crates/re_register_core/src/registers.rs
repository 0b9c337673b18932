use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::info;

use crate::alphabetic::{AlphabeticRegister, alphabetic_registers};
use crate::author_register::AuthorRegister;
use crate::authors::Authors;
use crate::public_domain::PublicDomainRegister;
use crate::short_register::ShortRegister;
use crate::volume_register::VolumeRegister;
use crate::volumes::Volumes;

/// Owner of the author directory and every volume register. Derived
/// registers are built on demand and borrow from here.
#[derive(Debug)]
pub struct Registers {
    data_dir: PathBuf,
    authors: Authors,
    registers: Vec<VolumeRegister>,
}

impl Registers {
    /// Load the author directory and every catalogue volume that has a
    /// register file, in catalogue order.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let authors = Authors::load(data_dir)?;
        let mut registers = Vec::new();
        for volume in Volumes::new().iter() {
            if let Some(register) = VolumeRegister::load(volume, data_dir)? {
                registers.push(register);
            }
        }
        info!(
            volumes = registers.len(),
            lemmas = registers.iter().map(VolumeRegister::len).sum::<usize>(),
            "loaded registers"
        );
        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            authors,
            registers,
        })
    }

    pub fn from_parts(authors: Authors, registers: Vec<VolumeRegister>) -> Self {
        Self {
            data_dir: PathBuf::new(),
            authors,
            registers,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn authors(&self) -> &Authors {
        &self.authors
    }

    pub fn authors_mut(&mut self) -> &mut Authors {
        &mut self.authors
    }

    pub fn volume_registers(&self) -> &[VolumeRegister] {
        &self.registers
    }

    pub fn volume_register(&self, volume: &str) -> Option<&VolumeRegister> {
        self.registers
            .iter()
            .find(|register| register.volume().name() == volume)
    }

    pub fn volume_register_mut(&mut self, volume: &str) -> Option<&mut VolumeRegister> {
        self.registers
            .iter_mut()
            .find(|register| register.volume().name() == volume)
    }

    pub fn lemma_count(&self) -> usize {
        self.registers.iter().map(VolumeRegister::len).sum()
    }

    pub fn alphabetic_registers(&self) -> Vec<AlphabeticRegister<'_>> {
        alphabetic_registers(&self.registers, &self.authors)
    }

    /// Registers of every canonical author credited with at least one lemma.
    pub fn author_registers(&self) -> Vec<AuthorRegister<'_>> {
        self.authors
            .iter()
            .map(|author| AuthorRegister::new(author, &self.registers, &self.authors))
            .filter(|register| !register.is_empty())
            .collect()
    }

    pub fn author_register(&self, key: &str) -> Option<AuthorRegister<'_>> {
        self.authors
            .get_author(key)
            .map(|author| AuthorRegister::new(author, &self.registers, &self.authors))
    }

    pub fn public_domain_register(&self, year: i32) -> PublicDomainRegister<'_> {
        PublicDomainRegister::new(year, &self.registers, &self.authors)
    }

    /// Main issues of the loaded volumes in catalogue order.
    pub fn main_issues(&self) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        self.registers
            .iter()
            .map(|register| register.volume().main_issue())
            .filter(|issue| seen.insert(*issue))
            .collect()
    }

    pub fn short_registers(&self) -> Vec<ShortRegister<'_>> {
        self.main_issues()
            .into_iter()
            .map(|issue| ShortRegister::new(issue, &self.registers))
            .collect()
    }

    /// Write every volume register and the author tables.
    pub fn persist(&self) -> Result<()> {
        for register in &self.registers {
            register.persist()?;
        }
        self.authors.persist()?;
        info!(volumes = self.registers.len(), "persisted registers");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::json;
    use tempfile::tempdir;

    use super::Registers;
    use crate::authors::tests::fixture_authors;
    use crate::volume_register::tests::register_from_json;

    fn sample() -> Registers {
        Registers::from_parts(
            fixture_authors(),
            vec![
                register_from_json(
                    "I,1",
                    1893,
                    json!([{"lemma": "Aal", "chapters": [{"start": 1, "author": "Abel."}]}]),
                ),
                register_from_json(
                    "I,2",
                    1894,
                    json!([{"lemma": "Aba", "chapters": [{"start": 1, "author": "Fabricius."}]}]),
                ),
                register_from_json("S I", 1903, json!([{"lemma": "Zeus"}])),
            ],
        )
    }

    #[test]
    fn builds_derived_registers_from_shared_state() {
        let registers = sample();
        assert_eq!(registers.lemma_count(), 3);
        assert_eq!(registers.main_issues(), vec!["I", "S I"]);
        assert_eq!(registers.short_registers().len(), 2);

        let authors: Vec<&str> = registers
            .author_registers()
            .iter()
            .map(|register| register.author().name())
            .collect();
        assert_eq!(authors, vec!["Herman Abel", "Otto Crusius"]);
        assert_eq!(registers.public_domain_register(1996).len(), 1);
        assert!(registers.author_register("Unbekannt").is_none());
    }

    #[test]
    fn load_skips_volumes_without_file() {
        let temp = tempdir().expect("tempdir");
        let registers = sample();
        let authors = fixture_authors().with_data_dir(temp.path());
        authors.persist().expect("authors");
        for register in registers.volume_registers() {
            register
                .clone()
                .with_data_dir(temp.path())
                .persist()
                .expect("persist");
        }
        fs::remove_file(temp.path().join("I_2.json")).expect("remove");

        let loaded = Registers::load(temp.path()).expect("load");
        let volumes: Vec<&str> = loaded
            .volume_registers()
            .iter()
            .map(|register| register.volume().name())
            .collect();
        assert_eq!(volumes, vec!["I,1", "S I"]);
        assert!(loaded.volume_register("I,1").is_some());
        assert!(loaded.volume_register("I,2").is_none());
    }
}
