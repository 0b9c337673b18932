use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::fsutil::write_json_atomic;

pub const AUTHORS_FILENAME: &str = "authors.json";
pub const AUTHORS_MAPPING_FILENAME: &str = "authors_mapping.json";

/// A contribution becomes public domain this many years after the death of
/// its author ...
pub const YEARS_AFTER_DEATH: i32 = 71;
/// ... or, with no known death year, this many years after the birth.
pub const YEARS_AFTER_BIRTH: i32 = 171;
/// Fallback for authors without any known dates: never public domain until
/// proven otherwise.
pub const UNKNOWN_PUBLIC_DOMAIN_YEAR: i32 = 2100;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub death: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ws_lemma: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wp_lemma: Option<String>,
}

impl AuthorRecord {
    /// Field-by-field merge; fields unset in `update` keep their value.
    fn merge(&mut self, update: &AuthorRecord) {
        fn take(target: &mut Option<String>, source: &Option<String>) {
            if source.is_some() {
                target.clone_from(source);
            }
        }
        take(&mut self.first_name, &update.first_name);
        take(&mut self.last_name, &update.last_name);
        take(&mut self.redirect, &update.redirect);
        take(&mut self.ws_lemma, &update.ws_lemma);
        take(&mut self.wp_lemma, &update.wp_lemma);
        if update.birth.is_some() {
            self.birth = update.birth;
        }
        if update.death.is_some() {
            self.death = update.death;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    name: String,
    record: AuthorRecord,
}

impl Author {
    pub fn new(name: impl Into<String>, record: AuthorRecord) -> Self {
        Self {
            name: name.into(),
            record,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn record(&self) -> &AuthorRecord {
        &self.record
    }

    pub fn birth(&self) -> Option<i32> {
        self.record.birth
    }

    pub fn death(&self) -> Option<i32> {
        self.record.death
    }

    pub fn redirect(&self) -> Option<&str> {
        self.record.redirect.as_deref()
    }

    /// Stored last name, else the last word of the name.
    pub fn last_name(&self) -> &str {
        if let Some(last_name) = self.record.last_name.as_deref() {
            return last_name;
        }
        match self.name.rsplit_once(' ') {
            Some((_, last)) => last,
            None => &self.name,
        }
    }

    /// Stored first name, else everything before the last word.
    pub fn first_name(&self) -> &str {
        if let Some(first_name) = self.record.first_name.as_deref() {
            return first_name;
        }
        match self.name.rsplit_once(' ') {
            Some((first, _)) => first,
            None => "",
        }
    }

    pub fn year_public_domain(&self) -> i32 {
        if let Some(death) = self.record.death {
            return death + YEARS_AFTER_DEATH;
        }
        if let Some(birth) = self.record.birth {
            return birth + YEARS_AFTER_BIRTH;
        }
        UNKNOWN_PUBLIC_DOMAIN_YEAR
    }
}

/// Value of one entry in `authors_mapping.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AuthorMapping {
    Single(String),
    Multiple(Vec<String>),
    /// Signature meaning different authors depending on the issue; `"*"` is
    /// the fallback for issues without an explicit entry.
    ByIssue(BTreeMap<String, AuthorMapping>),
}

impl AuthorMapping {
    fn keys_for_issue(&self, issue: &str) -> Vec<&str> {
        match self {
            Self::Single(key) => vec![key.as_str()],
            Self::Multiple(keys) => keys.iter().map(String::as_str).collect(),
            Self::ByIssue(by_issue) => match by_issue.get(issue).or_else(|| by_issue.get("*")) {
                Some(mapping) => mapping.keys_for_issue(issue),
                None => Vec::new(),
            },
        }
    }
}

/// Directory of canonical authors plus the signature mapping used to resolve
/// the raw signatures printed below each article.
#[derive(Debug, Default)]
pub struct Authors {
    data_dir: PathBuf,
    authors: BTreeMap<String, Author>,
    mapping: BTreeMap<String, AuthorMapping>,
    mapping_cache: RefCell<HashMap<(String, String), Vec<String>>>,
}

impl Authors {
    pub fn load(data_dir: &Path) -> Result<Self> {
        let authors_path = data_dir.join(AUTHORS_FILENAME);
        let content = fs::read_to_string(&authors_path)
            .with_context(|| format!("failed to read {}", authors_path.display()))?;
        let records: BTreeMap<String, AuthorRecord> = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", authors_path.display()))?;

        let mapping_path = data_dir.join(AUTHORS_MAPPING_FILENAME);
        let content = fs::read_to_string(&mapping_path)
            .with_context(|| format!("failed to read {}", mapping_path.display()))?;
        let mapping: BTreeMap<String, AuthorMapping> = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", mapping_path.display()))?;

        info!(
            authors = records.len(),
            mappings = mapping.len(),
            "loaded author directory"
        );
        let mut directory = Self::from_parts(records, mapping);
        directory.data_dir = data_dir.to_path_buf();
        Ok(directory)
    }

    pub fn from_parts(
        records: BTreeMap<String, AuthorRecord>,
        mapping: BTreeMap<String, AuthorMapping>,
    ) -> Self {
        let authors = records
            .into_iter()
            .map(|(key, record)| (key.clone(), Author::new(key, record)))
            .collect();
        Self {
            data_dir: PathBuf::new(),
            authors,
            mapping,
            mapping_cache: RefCell::default(),
        }
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn len(&self) -> usize {
        self.authors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.authors.is_empty()
    }

    /// Exact lookup by canonical key; follows one redirect hop.
    pub fn get_author(&self, key: &str) -> Option<&Author> {
        let author = self.authors.get(&key.replace('|', ""))?;
        match author.redirect() {
            Some(target) => self.authors.get(target),
            None => Some(author),
        }
    }

    /// Resolve a scraped signature for the given issue. Unknown signatures
    /// resolve to no author at all, which is a valid outcome.
    pub fn get_author_by_mapping(&self, signature: &str, issue: &str) -> Vec<&Author> {
        let cache_key = (signature.to_string(), issue.to_string());
        if let Some(keys) = self.mapping_cache.borrow().get(&cache_key) {
            return keys.iter().filter_map(|key| self.authors.get(key)).collect();
        }

        let mut resolved = Vec::new();
        if let Some(mapping) = self.mapping.get(signature) {
            for key in mapping.keys_for_issue(issue) {
                match self.get_author(key) {
                    Some(author) => resolved.push(author),
                    None => debug!(signature, key, "mapping points to unknown author"),
                }
            }
        }

        self.mapping_cache.borrow_mut().insert(
            cache_key,
            resolved.iter().map(|author| author.name.clone()).collect(),
        );
        resolved
    }

    pub fn set_mappings(&mut self, mappings: BTreeMap<String, AuthorMapping>) {
        self.mapping.extend(mappings);
        self.mapping_cache.get_mut().clear();
    }

    pub fn set_author(&mut self, records: BTreeMap<String, AuthorRecord>) {
        for (key, record) in records {
            match self.authors.get_mut(&key) {
                Some(author) => author.record.merge(&record),
                None => {
                    self.authors.insert(key.clone(), Author::new(key, record));
                }
            }
        }
        self.mapping_cache.get_mut().clear();
    }

    /// Canonical (non-redirect) authors in key order.
    pub fn iter(&self) -> impl Iterator<Item = &Author> {
        self.authors
            .values()
            .filter(|author| author.redirect().is_none())
    }

    pub fn mapping(&self) -> &BTreeMap<String, AuthorMapping> {
        &self.mapping
    }

    pub fn persist(&self) -> Result<()> {
        let records: BTreeMap<&str, &AuthorRecord> = self
            .authors
            .iter()
            .map(|(key, author)| (key.as_str(), &author.record))
            .collect();
        write_json_atomic(&self.data_dir.join(AUTHORS_FILENAME), &records)?;
        write_json_atomic(&self.data_dir.join(AUTHORS_MAPPING_FILENAME), &self.mapping)?;
        info!(
            authors = self.authors.len(),
            mappings = self.mapping.len(),
            "persisted author directory"
        );
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::BTreeMap;
    use std::fs;

    use serde_json::json;
    use tempfile::tempdir;

    use super::{AUTHORS_FILENAME, AUTHORS_MAPPING_FILENAME, AuthorMapping, AuthorRecord, Authors};

    pub(crate) fn fixture_authors() -> Authors {
        let records: BTreeMap<String, AuthorRecord> = serde_json::from_value(json!({
            "Herman Abel": {"birth": 1850, "death": 1925},
            "Abert": {"redirect": "Hermann Abert"},
            "Hermann Abert": {"first_name": "Hermann", "last_name": "Abert", "death": 1927},
            "Otto Crusius": {"death": 1918},
            "Ernst Fabricius": {"birth": 1857},
            "Anonymus": {}
        }))
        .expect("records");
        let mapping: BTreeMap<String, AuthorMapping> = serde_json::from_value(json!({
            "Abel.": "Herman Abel",
            "Abert.": "Abert",
            "Abel und Crusius.": ["Herman Abel", "Otto Crusius"],
            "Fabricius.": {"I,1": "Ernst Fabricius", "*": "Otto Crusius"},
            "Nur I,2.": {"I,2": "Herman Abel"},
            "Verwaist.": "Niemand"
        }))
        .expect("mapping");
        Authors::from_parts(records, mapping)
    }

    fn names(authors: &[&super::Author]) -> Vec<String> {
        authors.iter().map(|author| author.name().to_string()).collect()
    }

    #[test]
    fn get_author_follows_one_redirect_and_strips_pipes() {
        let authors = fixture_authors();
        assert_eq!(
            authors.get_author("Abert").map(|author| author.name()),
            Some("Hermann Abert")
        );
        assert_eq!(
            authors.get_author("Herman Abel|").map(|author| author.name()),
            Some("Herman Abel")
        );
        assert!(authors.get_author("Unbekannt").is_none());
    }

    #[test]
    fn mapping_shapes_resolve() {
        let authors = fixture_authors();
        assert_eq!(
            names(&authors.get_author_by_mapping("Abel.", "I,1")),
            vec!["Herman Abel"]
        );
        assert_eq!(
            names(&authors.get_author_by_mapping("Abert.", "I,1")),
            vec!["Hermann Abert"]
        );
        assert_eq!(
            names(&authors.get_author_by_mapping("Abel und Crusius.", "I,1")),
            vec!["Herman Abel", "Otto Crusius"]
        );
        assert_eq!(
            names(&authors.get_author_by_mapping("Fabricius.", "I,1")),
            vec!["Ernst Fabricius"]
        );
        assert_eq!(
            names(&authors.get_author_by_mapping("Fabricius.", "III,2")),
            vec!["Otto Crusius"]
        );
    }

    #[test]
    fn unknown_signatures_resolve_to_nobody() {
        let authors = fixture_authors();
        assert!(
            authors
                .get_author_by_mapping("Unknown Signature", "I,1")
                .is_empty()
        );
        assert!(authors.get_author_by_mapping("Nur I,2.", "I,1").is_empty());
        assert!(authors.get_author_by_mapping("Verwaist.", "I,1").is_empty());
    }

    #[test]
    fn mutations_invalidate_the_lookup_cache() {
        let mut authors = fixture_authors();
        assert!(authors.get_author_by_mapping("Neu.", "I,1").is_empty());

        authors.set_mappings(BTreeMap::from([(
            "Neu.".to_string(),
            AuthorMapping::Single("Neuer Autor".to_string()),
        )]));
        authors.set_author(BTreeMap::from([(
            "Neuer Autor".to_string(),
            AuthorRecord {
                death: Some(1950),
                ..AuthorRecord::default()
            },
        )]));
        assert_eq!(
            names(&authors.get_author_by_mapping("Neu.", "I,1")),
            vec!["Neuer Autor"]
        );

        authors.set_author(BTreeMap::from([(
            "Neuer Autor".to_string(),
            AuthorRecord {
                birth: Some(1880),
                ..AuthorRecord::default()
            },
        )]));
        let author = authors.get_author("Neuer Autor").expect("author");
        assert_eq!(author.birth(), Some(1880));
        assert_eq!(author.death(), Some(1950));
    }

    #[test]
    fn public_domain_year_prefers_death_then_birth() {
        let authors = fixture_authors();
        assert_eq!(
            authors
                .get_author("Herman Abel")
                .map(|author| author.year_public_domain()),
            Some(1996)
        );
        assert_eq!(
            authors
                .get_author("Ernst Fabricius")
                .map(|author| author.year_public_domain()),
            Some(2028)
        );
        assert_eq!(
            authors
                .get_author("Anonymus")
                .map(|author| author.year_public_domain()),
            Some(2100)
        );
    }

    #[test]
    fn names_fall_back_to_splitting() {
        let authors = fixture_authors();
        let abel = authors.get_author("Herman Abel").expect("abel");
        assert_eq!(abel.last_name(), "Abel");
        assert_eq!(abel.first_name(), "Herman");
        let anonymus = authors.get_author("Anonymus").expect("anonymus");
        assert_eq!(anonymus.last_name(), "Anonymus");
        assert_eq!(anonymus.first_name(), "");
    }

    #[test]
    fn iter_skips_redirects() {
        let authors = fixture_authors();
        let keys: Vec<&str> = authors.iter().map(|author| author.name()).collect();
        assert!(!keys.contains(&"Abert"));
        assert!(keys.contains(&"Hermann Abert"));
    }

    #[test]
    fn persist_and_load_roundtrip_sorted() {
        let temp = tempdir().expect("tempdir");
        let authors = fixture_authors().with_data_dir(temp.path());
        authors.persist().expect("persist");

        let written = fs::read_to_string(temp.path().join(AUTHORS_FILENAME)).expect("read");
        let abel = written.find("\"Herman Abel\"").expect("abel");
        let crusius = written.find("\"Otto Crusius\"").expect("crusius");
        assert!(abel < crusius);
        assert!(written.contains("\"birth\": 1850"));

        let reloaded = Authors::load(temp.path()).expect("load");
        assert_eq!(reloaded.len(), authors.len());
        assert_eq!(
            names(&reloaded.get_author_by_mapping("Fabricius.", "I,1")),
            vec!["Ernst Fabricius"]
        );
        assert!(temp.path().join(AUTHORS_MAPPING_FILENAME).exists());
    }
}
