use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RegisterError;
use crate::sort_key::make_sort_key;

/// One physical page range of a lemma written under one signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub start: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

impl Chapter {
    pub fn new(start: u32, end: Option<u32>, author: Option<&str>) -> Self {
        Self {
            start,
            end,
            author: author.map(ToString::to_string),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.start > 0 && self.end.is_none_or(|end| end >= self.start)
    }

    pub fn end_or_start(&self) -> u32 {
        self.end.unwrap_or(self.start)
    }
}

/// `redirect` is either a bare marker or the name of the target lemma.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Redirect {
    Flag(bool),
    Target(String),
}

impl Redirect {
    pub fn is_redirect(&self) -> bool {
        match self {
            Self::Flag(flag) => *flag,
            Self::Target(target) => !target.is_empty(),
        }
    }

    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Target(target) if !target.is_empty() => Some(target),
            _ => None,
        }
    }
}

/// Proofreading status as stored in `proof_read`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofRead {
    Unknown,
    Unproofed,
    Proofed,
    Finished,
}

impl ProofRead {
    pub fn from_level(level: Option<u8>) -> Self {
        match level {
            Some(3) => Self::Finished,
            Some(2) => Self::Proofed,
            Some(1) => Self::Unproofed,
            _ => Self::Unknown,
        }
    }

    pub fn level(self) -> Option<u8> {
        match self {
            Self::Finished => Some(3),
            Self::Proofed => Some(2),
            Self::Unproofed => Some(1),
            Self::Unknown => None,
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Self::Finished => "#556B2F",
            Self::Proofed => "#669966",
            Self::Unproofed | Self::Unknown => "#AA0000",
        }
    }
}

/// Fields of a lemma that an update may remove.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LemmaField {
    Previous,
    Next,
    SortKey,
    Redirect,
    ProofRead,
    ShortDescription,
    WpLink,
    WsLink,
    WdLink,
    NoCreativeHeight,
    Chapters,
}

impl LemmaField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Previous => "previous",
            Self::Next => "next",
            Self::SortKey => "sort_key",
            Self::Redirect => "redirect",
            Self::ProofRead => "proof_read",
            Self::ShortDescription => "short_description",
            Self::WpLink => "wp_link",
            Self::WsLink => "ws_link",
            Self::WdLink => "wd_link",
            Self::NoCreativeHeight => "no_creative_height",
            Self::Chapters => "chapters",
        }
    }
}

/// Persisted form of a lemma; field order is the on-disk key order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LemmaRecord {
    pub lemma: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<Redirect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof_read: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wp_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ws_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wd_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_creative_height: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chapters: Vec<Chapter>,
}

impl LemmaRecord {
    fn remove(&mut self, field: LemmaField) {
        match field {
            LemmaField::Previous => self.previous = None,
            LemmaField::Next => self.next = None,
            LemmaField::SortKey => self.sort_key = None,
            LemmaField::Redirect => self.redirect = None,
            LemmaField::ProofRead => self.proof_read = None,
            LemmaField::ShortDescription => self.short_description = None,
            LemmaField::WpLink => self.wp_link = None,
            LemmaField::WsLink => self.ws_link = None,
            LemmaField::WdLink => self.wd_link = None,
            LemmaField::NoCreativeHeight => self.no_creative_height = None,
            LemmaField::Chapters => self.chapters.clear(),
        }
    }

    fn apply(&mut self, patch: &LemmaPatch) {
        fn set<T: Clone>(target: &mut Option<T>, source: &Option<T>) {
            if source.is_some() {
                target.clone_from(source);
            }
        }
        self.lemma.clone_from(&patch.lemma);
        set(&mut self.previous, &patch.previous);
        set(&mut self.next, &patch.next);
        set(&mut self.sort_key, &patch.sort_key);
        set(&mut self.redirect, &patch.redirect);
        set(&mut self.proof_read, &patch.proof_read);
        set(&mut self.short_description, &patch.short_description);
        set(&mut self.wp_link, &patch.wp_link);
        set(&mut self.ws_link, &patch.ws_link);
        set(&mut self.wd_link, &patch.wd_link);
        set(&mut self.no_creative_height, &patch.no_creative_height);
        if let Some(chapters) = &patch.chapters {
            self.chapters.clone_from(chapters);
        }
    }
}

/// Partial lemma scraped from a live page. Unset fields leave the stored
/// value untouched; removals travel separately as [`LemmaField`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LemmaPatch {
    pub lemma: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<Redirect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof_read: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wp_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ws_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wd_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_creative_height: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapters: Option<Vec<Chapter>>,
}

impl LemmaPatch {
    pub fn new(lemma: impl Into<String>) -> Self {
        Self {
            lemma: lemma.into(),
            ..Self::default()
        }
    }

    pub fn with_previous(mut self, previous: impl Into<String>) -> Self {
        self.previous = Some(previous.into());
        self
    }

    pub fn with_next(mut self, next: impl Into<String>) -> Self {
        self.next = Some(next.into());
        self
    }

    /// Sort key the patch will have once applied.
    pub fn normalized_sort_key(&self) -> String {
        make_sort_key(self.sort_key.as_deref().unwrap_or(&self.lemma))
    }
}

impl fmt::Display for LemmaPatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&rendered)
    }
}

/// One register entry. The sort key is cached and recomputed on every
/// mutation, so it always reflects the current `sort_key`/`lemma` fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "LemmaRecord", into = "LemmaRecord")]
pub struct Lemma {
    record: LemmaRecord,
    sort_key: String,
}

impl TryFrom<LemmaRecord> for Lemma {
    type Error = RegisterError;

    fn try_from(record: LemmaRecord) -> Result<Self, Self::Error> {
        Self::new(record)
    }
}

impl From<Lemma> for LemmaRecord {
    fn from(lemma: Lemma) -> Self {
        lemma.record
    }
}

impl Lemma {
    pub fn new(record: LemmaRecord) -> Result<Self, RegisterError> {
        validate(&record)?;
        let sort_key = compute_sort_key(&record);
        Ok(Self { record, sort_key })
    }

    pub fn from_patch(patch: &LemmaPatch) -> Result<Self, RegisterError> {
        let mut record = LemmaRecord::default();
        record.apply(patch);
        Self::new(record)
    }

    /// Placeholder created when a supplement claims a neighbour that is not
    /// in the register yet.
    pub(crate) fn stub(
        name: &str,
        previous: Option<&str>,
        next: Option<&str>,
    ) -> Result<Self, RegisterError> {
        Self::new(LemmaRecord {
            lemma: name.to_string(),
            previous: previous.map(ToString::to_string),
            next: next.map(ToString::to_string),
            ..LemmaRecord::default()
        })
    }

    pub fn record(&self) -> &LemmaRecord {
        &self.record
    }

    pub fn lemma(&self) -> &str {
        &self.record.lemma
    }

    pub fn previous(&self) -> Option<&str> {
        self.record.previous.as_deref()
    }

    pub fn next(&self) -> Option<&str> {
        self.record.next.as_deref()
    }

    pub fn sort_key(&self) -> &str {
        &self.sort_key
    }

    pub fn redirect(&self) -> Option<&Redirect> {
        self.record.redirect.as_ref()
    }

    pub fn is_redirect(&self) -> bool {
        self.record
            .redirect
            .as_ref()
            .is_some_and(Redirect::is_redirect)
    }

    pub fn proof_read(&self) -> ProofRead {
        ProofRead::from_level(self.record.proof_read)
    }

    pub fn short_description(&self) -> Option<&str> {
        self.record.short_description.as_deref()
    }

    pub fn wp_link(&self) -> Option<&str> {
        self.record.wp_link.as_deref()
    }

    pub fn ws_link(&self) -> Option<&str> {
        self.record.ws_link.as_deref()
    }

    pub fn wd_link(&self) -> Option<&str> {
        self.record.wd_link.as_deref()
    }

    pub fn no_creative_height(&self) -> bool {
        self.record.no_creative_height.unwrap_or(false)
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.record.chapters
    }

    /// Apply a patch and then the removals. The result is validated before
    /// it replaces the current state, so a rejected update leaves the lemma
    /// unchanged.
    pub fn update(
        &mut self,
        patch: &LemmaPatch,
        remove_items: &[LemmaField],
    ) -> Result<(), RegisterError> {
        let mut record = self.record.clone();
        record.apply(patch);
        for field in remove_items {
            record.remove(*field);
        }
        validate(&record)?;
        self.sort_key = compute_sort_key(&record);
        self.record = record;
        Ok(())
    }

    pub(crate) fn set_previous(&mut self, previous: Option<&str>) {
        self.record.previous = previous.map(ToString::to_string);
    }

    pub(crate) fn set_next(&mut self, next: Option<&str>) {
        self.record.next = next.map(ToString::to_string);
    }
}

fn compute_sort_key(record: &LemmaRecord) -> String {
    make_sort_key(record.sort_key.as_deref().unwrap_or(&record.lemma))
}

fn validate(record: &LemmaRecord) -> Result<(), RegisterError> {
    if record.lemma.trim().is_empty() {
        return Err(RegisterError::invalid_lemma(
            format!("{record:?}"),
            "Key lemma missing",
        ));
    }
    if let Some(chapter) = record.chapters.iter().find(|chapter| !chapter.is_valid()) {
        return Err(RegisterError::invalid_lemma(
            record.lemma.clone(),
            format!("Invalid chapter {chapter:?}"),
        ));
    }
    Ok(())
}
