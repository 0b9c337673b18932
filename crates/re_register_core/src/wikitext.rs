use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReTemplateKind {
    /// `{{REDaten}}`, opens an article and names its volume.
    Daten,
    /// `{{REAbschnitt}}`, continues the preceding article.
    Abschnitt,
}

/// A header template with its named parameters, keys and values trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReTemplate {
    pub kind: ReTemplateKind,
    pub params: BTreeMap<String, String>,
}

impl ReTemplate {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

/// One header template together with the text up to the next header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReArticle {
    pub header: ReTemplate,
    /// Signature from the `{{REAutor|…}}` closing this article.
    pub author: Option<String>,
    pub text: String,
}

impl ReArticle {
    pub fn redirect_target(&self) -> Option<&str> {
        redirect_regex()
            .captures(&self.text)
            .and_then(|captures| captures.get(1))
            .map(|target| target.as_str().trim())
            .filter(|target| !target.is_empty())
    }
}

/// Articles of one page belonging to the same volume: a `REDaten` followed
/// by its `REAbschnitt` continuations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeGroup {
    pub volume: String,
    /// The volume already occurred earlier on the same page.
    pub self_supplement: bool,
    pub articles: Vec<ReArticle>,
}

impl VolumeGroup {
    pub fn header(&self) -> &ReTemplate {
        &self.articles[0].header
    }
}

fn header_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"\{\{\s*(REDaten|REAbschnitt)\s*[|}]").expect("header regex must compile")
    })
}

fn author_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"\{\{\s*REAutor\s*\|([^|}]*)").expect("author regex must compile")
    })
}

fn redirect_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"\{\{\s*RE siehe\s*\|([^|}]+)").expect("redirect regex must compile")
    })
}

/// Split an RE page into its header templates in page order.
pub fn parse_re_page(text: &str) -> Vec<ReArticle> {
    let mut headers: Vec<(usize, usize, ReTemplate)> = Vec::new();
    let mut cursor = 0;
    while let Some(found) = header_regex().captures_at(text, cursor) {
        let (Some(whole), Some(name)) = (found.get(0), found.get(1)) else {
            break;
        };
        let start = whole.start();
        let Some(end) = find_template_end(text, start) else {
            warn!(offset = start, "unterminated {} template", name.as_str());
            break;
        };
        let kind = if name.as_str() == "REDaten" {
            ReTemplateKind::Daten
        } else {
            ReTemplateKind::Abschnitt
        };
        let inner = &text[start + 2..end - 2];
        headers.push((start, end, ReTemplate {
            kind,
            params: parse_params(inner),
        }));
        cursor = end;
    }

    let mut articles = Vec::with_capacity(headers.len());
    for (position, (_, end, header)) in headers.iter().enumerate() {
        let body_end = headers
            .get(position + 1)
            .map_or(text.len(), |(next_start, _, _)| *next_start);
        let body = &text[*end..body_end];
        let author = author_regex()
            .captures(body)
            .and_then(|captures| captures.get(1))
            .map(|signature| signature.as_str().trim().to_string())
            .filter(|signature| !signature.is_empty() && signature != "OFF");
        articles.push(ReArticle {
            header: header.clone(),
            author,
            text: body.to_string(),
        });
    }
    articles
}

/// Group articles per volume. `REAbschnitt`s before the first `REDaten` have
/// no volume and are dropped.
pub fn group_by_volume(articles: Vec<ReArticle>) -> Vec<VolumeGroup> {
    let mut groups: Vec<VolumeGroup> = Vec::new();
    for article in articles {
        match article.header.kind {
            ReTemplateKind::Daten => {
                let volume = article.header.param("BAND").unwrap_or_default().to_string();
                let self_supplement = groups.iter().any(|group| group.volume == volume);
                groups.push(VolumeGroup {
                    volume,
                    self_supplement,
                    articles: vec![article],
                });
            }
            ReTemplateKind::Abschnitt => match groups.last_mut() {
                Some(group) => group.articles.push(article),
                None => warn!("REAbschnitt without preceding REDaten"),
            },
        }
    }
    groups
}

/// Byte offset just past the `}}` closing the template opened at `start`.
fn find_template_end(text: &str, start: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut index = start;
    while index + 1 < bytes.len() {
        match (bytes[index], bytes[index + 1]) {
            (b'{', b'{') => {
                depth += 1;
                index += 2;
            }
            (b'}', b'}') => {
                depth = depth.saturating_sub(1);
                index += 2;
                if depth == 0 {
                    return Some(index);
                }
            }
            _ => index += 1,
        }
    }
    None
}

/// Named parameters of a template body; pipes inside nested templates or
/// links do not split.
fn parse_params(inner: &str) -> BTreeMap<String, String> {
    let bytes = inner.as_bytes();
    let mut segments = Vec::new();
    let mut braces = 0usize;
    let mut brackets = 0usize;
    let mut segment_start = 0;
    let mut index = 0;
    while index < bytes.len() {
        let pair = bytes.get(index + 1).map(|next| (bytes[index], *next));
        match pair {
            Some((b'{', b'{')) => {
                braces += 1;
                index += 2;
                continue;
            }
            Some((b'}', b'}')) => {
                braces = braces.saturating_sub(1);
                index += 2;
                continue;
            }
            Some((b'[', b'[')) => {
                brackets += 1;
                index += 2;
                continue;
            }
            Some((b']', b']')) => {
                brackets = brackets.saturating_sub(1);
                index += 2;
                continue;
            }
            _ => {}
        }
        if bytes[index] == b'|' && braces == 0 && brackets == 0 {
            segments.push(&inner[segment_start..index]);
            segment_start = index + 1;
        }
        index += 1;
    }
    segments.push(&inner[segment_start..]);

    segments
        .into_iter()
        .skip(1)
        .filter_map(|segment| segment.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect()
}
