use std::fs;
use std::path::{Path, PathBuf};
use std::ptr;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::authors::Authors;
use crate::fsutil::write_json_atomic;
use crate::lemma::Lemma;
use crate::render::{ProofReadCounts, RegisterRow, render_header, render_table};
use crate::sort_key::make_sort_key;
use crate::volumes::{Volume, Volumes};

/// Either a lemma name or a lemma borrowed from the register itself.
#[derive(Debug, Clone, Copy)]
pub enum LemmaRef<'a> {
    Name(&'a str),
    Lemma(&'a Lemma),
}

impl<'a> From<&'a str> for LemmaRef<'a> {
    fn from(name: &'a str) -> Self {
        Self::Name(name)
    }
}

impl<'a> From<&'a Lemma> for LemmaRef<'a> {
    fn from(lemma: &'a Lemma) -> Self {
        Self::Lemma(lemma)
    }
}

/// Ordered lemmas of one printed volume. Array order is book order.
#[derive(Debug, Clone)]
pub struct VolumeRegister {
    volume: Volume,
    data_dir: PathBuf,
    lemmas: Vec<Lemma>,
}

impl VolumeRegister {
    /// `Ok(None)` when the volume has no register file yet.
    pub fn load(volume: &Volume, data_dir: &Path) -> Result<Option<Self>> {
        let path = register_path(volume, data_dir);
        if !path.exists() {
            debug!(volume = volume.name(), "no register file");
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let lemmas: Vec<Lemma> = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        debug!(volume = volume.name(), lemmas = lemmas.len(), "loaded register");
        Ok(Some(Self {
            volume: volume.clone(),
            data_dir: data_dir.to_path_buf(),
            lemmas,
        }))
    }

    pub fn from_lemmas(volume: Volume, lemmas: Vec<Lemma>) -> Self {
        Self {
            volume,
            data_dir: PathBuf::new(),
            lemmas,
        }
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn volume(&self) -> &Volume {
        &self.volume
    }

    pub fn lemmas(&self) -> &[Lemma] {
        &self.lemmas
    }

    pub(crate) fn lemmas_mut(&mut self) -> &mut Vec<Lemma> {
        &mut self.lemmas
    }

    pub fn len(&self) -> usize {
        self.lemmas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lemmas.is_empty()
    }

    pub fn rows(&self) -> Vec<RegisterRow<'_>> {
        self.lemmas
            .iter()
            .map(|lemma| RegisterRow::new(lemma, &self.volume))
            .collect()
    }

    pub fn get_lemma_by_name(&self, name: &str, self_supplement: bool) -> Option<&Lemma> {
        self.index_by_name(name, self_supplement)
            .map(|index| &self.lemmas[index])
    }

    pub fn get_lemma_by_sort_key(&self, sort_key: &str, self_supplement: bool) -> Option<&Lemma> {
        self.index_by_sort_key(sort_key, self_supplement)
            .map(|index| &self.lemmas[index])
    }

    pub fn get_index_of_lemma<'a>(
        &self,
        lemma: impl Into<LemmaRef<'a>>,
        self_supplement: bool,
    ) -> Option<usize> {
        match lemma.into() {
            LemmaRef::Name(name) => self.index_by_name(name, self_supplement),
            LemmaRef::Lemma(lemma) => self
                .lemmas
                .iter()
                .position(|candidate| ptr::eq(candidate, lemma)),
        }
    }

    pub(crate) fn index_by_name(&self, name: &str, self_supplement: bool) -> Option<usize> {
        nth_match(&self.lemmas, self_supplement, |lemma| lemma.lemma() == name)
    }

    /// `sort_key` is normalized before comparing.
    pub(crate) fn index_by_sort_key(&self, sort_key: &str, self_supplement: bool) -> Option<usize> {
        let sort_key = make_sort_key(sort_key);
        nth_match(&self.lemmas, self_supplement, |lemma| {
            lemma.sort_key() == sort_key
        })
    }

    pub fn proof_read_counts(&self) -> ProofReadCounts {
        ProofReadCounts::count(self.lemmas.iter())
    }

    pub fn file_path(&self) -> PathBuf {
        register_path(&self.volume, &self.data_dir)
    }

    pub fn persist(&self) -> Result<()> {
        let path = self.file_path();
        write_json_atomic(&path, &self.lemmas)?;
        info!(
            volume = self.volume.name(),
            lemmas = self.lemmas.len(),
            "persisted register"
        );
        Ok(())
    }

    pub fn get_register_str(&self, authors: &Authors, current_year: i32) -> String {
        let volumes = Volumes::new();
        let (previous, next) = volumes.neighbours(self.volume.name());
        let counts = self.proof_read_counts();
        let mut fields = vec![
            format!("BAND={}", self.volume.name()),
            format!("VG={}", previous.unwrap_or_default()),
            format!("NF={}", next.unwrap_or_default()),
        ];
        fields.extend(counts.header_fields());
        let header = render_header(&fields);
        let table = render_table(&self.rows(), authors, current_year, false);
        format!("{header}\n{table}\n[[Kategorie:RE:Register|!]]")
    }
}

fn register_path(volume: &Volume, data_dir: &Path) -> PathBuf {
    data_dir.join(format!("{}.json", volume.file_name()))
}

/// First match, or the second one for a volume that supplements itself.
fn nth_match(
    lemmas: &[Lemma],
    self_supplement: bool,
    predicate: impl Fn(&Lemma) -> bool,
) -> Option<usize> {
    let skip = usize::from(self_supplement);
    lemmas
        .iter()
        .enumerate()
        .filter(|(_, lemma)| predicate(lemma))
        .nth(skip)
        .map(|(index, _)| index)
}
