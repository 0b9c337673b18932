use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::error::RegisterError;
use crate::lemma::{Lemma, LemmaField, LemmaPatch};
use crate::sort_key::make_sort_key;
use crate::volume_register::VolumeRegister;

/// How an update was placed into the register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateStrategy {
    UpdateLemmaByName,
    UpdateBySortkey,
    UpdatePreAndPostExists,
    UpdatePreExists,
    UpdatePostExists,
}

impl UpdateStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UpdateLemmaByName => "update_lemma_by_name",
            Self::UpdateBySortkey => "update_by_sortkey",
            Self::UpdatePreAndPostExists => "update_pre_and_post_exists",
            Self::UpdatePreExists => "update_pre_exists",
            Self::UpdatePostExists => "update_post_exists",
        }
    }
}

impl fmt::Display for UpdateStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resolution {
    ByName(usize),
    BySortKey(usize),
    BothNeighbours { pre: usize, post: usize },
    PreviousOnly(usize),
    NextOnly(usize),
    NoMatch,
}

pub struct Updater<'a> {
    register: &'a mut VolumeRegister,
}

impl<'a> Updater<'a> {
    pub fn new(register: &'a mut VolumeRegister) -> Self {
        Self { register }
    }

    /// Place `patch` into the register.
    ///
    /// There is no rollback: when a later step fails, the steps before it
    /// stay applied.
    pub fn update_lemma(
        &mut self,
        patch: &LemmaPatch,
        remove_items: &[LemmaField],
        self_supplement: bool,
    ) -> Result<UpdateStrategy, RegisterError> {
        let resolution = self.resolve(patch, self_supplement);
        debug!(
            volume = self.register.volume().name(),
            lemma = patch.lemma.as_str(),
            ?resolution,
            "resolved update"
        );
        match resolution {
            Resolution::ByName(index) => {
                self.update_lemma_by_name(index, patch, remove_items)?;
                Ok(UpdateStrategy::UpdateLemmaByName)
            }
            Resolution::BySortKey(index) => {
                self.update_by_sortkey(index, patch, remove_items)?;
                Ok(UpdateStrategy::UpdateBySortkey)
            }
            Resolution::BothNeighbours { pre, post } => {
                self.update_pre_and_post_exists(pre, post, patch)?;
                Ok(UpdateStrategy::UpdatePreAndPostExists)
            }
            Resolution::PreviousOnly(pre) => {
                self.update_pre_exists(pre, patch)?;
                Ok(UpdateStrategy::UpdatePreExists)
            }
            Resolution::NextOnly(post) => {
                self.update_post_exists(post, patch)?;
                Ok(UpdateStrategy::UpdatePostExists)
            }
            Resolution::NoMatch => Err(RegisterError::NoStrategy {
                volume: self.register.volume().name().to_string(),
                patch: patch.to_string(),
            }),
        }
    }

    fn resolve(&self, patch: &LemmaPatch, self_supplement: bool) -> Resolution {
        if let Some(index) = self.register.index_by_name(&patch.lemma, self_supplement) {
            return Resolution::ByName(index);
        }
        let sort_key = patch.sort_key.as_deref().unwrap_or(&patch.lemma);
        if let Some(index) = self.register.index_by_sort_key(sort_key, self_supplement) {
            return Resolution::BySortKey(index);
        }
        let pre = patch
            .previous
            .as_deref()
            .and_then(|previous| self.register.index_by_sort_key(previous, false));
        let post = patch
            .next
            .as_deref()
            .and_then(|next| self.register.index_by_sort_key(next, false));
        match (pre, post) {
            (Some(pre), Some(post)) => Resolution::BothNeighbours { pre, post },
            (Some(pre), None) => Resolution::PreviousOnly(pre),
            (None, Some(post)) => Resolution::NextOnly(post),
            (None, None) => Resolution::NoMatch,
        }
    }

    fn update_lemma_by_name(
        &mut self,
        index: usize,
        patch: &LemmaPatch,
        remove_items: &[LemmaField],
    ) -> Result<(), RegisterError> {
        self.register.lemmas_mut()[index].update(patch, remove_items)?;
        let index = self.create_missing_neighbours(index, patch)?;
        self.try_update_next_and_previous(patch, index);
        Ok(())
    }

    fn update_by_sortkey(
        &mut self,
        index: usize,
        patch: &LemmaPatch,
        remove_items: &[LemmaField],
    ) -> Result<(), RegisterError> {
        if !self.allows_neighbour_creation() {
            self.try_update_previous_next_of_surrounding_lemmas(
                index,
                &patch.lemma,
                patch.previous.as_deref(),
                patch.next.as_deref(),
            )?;
        }
        self.register.lemmas_mut()[index].update(patch, remove_items)?;
        let index = self.create_missing_neighbours(index, patch)?;
        self.try_update_next_and_previous(patch, index);
        Ok(())
    }

    fn update_pre_and_post_exists(
        &mut self,
        pre: usize,
        post: usize,
        patch: &LemmaPatch,
    ) -> Result<(), RegisterError> {
        let lemma = Lemma::from_patch(patch)?;
        match post.checked_sub(pre) {
            Some(1) => self.register.lemmas_mut().insert(post, lemma),
            Some(2) => self.register.lemmas_mut()[pre + 1] = lemma,
            _ => {
                return Err(RegisterError::NeighbourGap {
                    volume: self.register.volume().name().to_string(),
                    patch: patch.to_string(),
                });
            }
        }
        self.try_update_next_and_previous(patch, pre + 1);
        Ok(())
    }

    fn update_pre_exists(&mut self, pre: usize, patch: &LemmaPatch) -> Result<(), RegisterError> {
        let patch = LemmaPatch {
            next: None,
            ..patch.clone()
        };
        let lemma = Lemma::from_patch(&patch)?;
        let lemmas = self.register.lemmas_mut();
        if let Some(successor) = lemmas.get_mut(pre + 1) {
            successor.set_previous(None);
        }
        lemmas.insert(pre + 1, lemma);
        self.try_update_next_and_previous(&patch, pre + 1);
        Ok(())
    }

    fn update_post_exists(&mut self, post: usize, patch: &LemmaPatch) -> Result<(), RegisterError> {
        let patch = LemmaPatch {
            previous: None,
            ..patch.clone()
        };
        let lemma = Lemma::from_patch(&patch)?;
        let lemmas = self.register.lemmas_mut();
        if let Some(predecessor) = post.checked_sub(1).and_then(|index| lemmas.get_mut(index)) {
            predecessor.set_next(None);
        }
        lemmas.insert(post, lemma);
        self.try_update_next_and_previous(&patch, post);
        Ok(())
    }

    fn allows_neighbour_creation(&self) -> bool {
        self.register
            .volume()
            .volume_type()
            .allows_neighbour_creation()
    }

    /// Splice in stub lemmas for neighbours claimed by `patch` that are not
    /// physically adjacent. Only supplement and register volumes do this. Returns the
    /// new index of the updated lemma.
    fn create_missing_neighbours(
        &mut self,
        index: usize,
        patch: &LemmaPatch,
    ) -> Result<usize, RegisterError> {
        if !self.allows_neighbour_creation() {
            return Ok(index);
        }
        let mut index = index;
        let lemmas = self.register.lemmas_mut();
        let name = lemmas[index].lemma().to_string();

        if let Some(previous) = claimed_neighbour(patch.previous.as_deref()) {
            let adjacent = index
                .checked_sub(1)
                .and_then(|pre| lemmas.get(pre))
                .is_some_and(|pre| pre.sort_key() == make_sort_key(previous));
            if !adjacent {
                if let Some(displaced) = index.checked_sub(1).and_then(|pre| lemmas.get_mut(pre))
                    && displaced.next() == Some(name.as_str())
                {
                    displaced.set_next(None);
                }
                debug!(lemma = name.as_str(), stub = previous, "creating previous stub");
                lemmas.insert(index, Lemma::stub(previous, None, Some(&name))?);
                index += 1;
            }
        }

        if let Some(next) = claimed_neighbour(patch.next.as_deref()) {
            let adjacent = lemmas
                .get(index + 1)
                .is_some_and(|post| post.sort_key() == make_sort_key(next));
            if !adjacent {
                if let Some(displaced) = lemmas.get_mut(index + 1)
                    && displaced.previous() == Some(name.as_str())
                {
                    displaced.set_previous(None);
                }
                debug!(lemma = name.as_str(), stub = next, "creating next stub");
                lemmas.insert(index + 1, Lemma::stub(next, Some(&name), None)?);
            }
        }
        Ok(index)
    }

    /// Point the physical neighbours at the updated lemma when they are the
    /// ones the update claims, then re-check their own links.
    fn try_update_next_and_previous(&mut self, patch: &LemmaPatch, index: usize) {
        if let Some(previous) = patch.previous.as_deref()
            && let Some(pre) = index.checked_sub(1)
            && self.register.lemmas()[pre].sort_key() == make_sort_key(previous)
        {
            let (name, pre_previous) = {
                let neighbour = &self.register.lemmas()[pre];
                (
                    neighbour.lemma().to_string(),
                    neighbour.previous().map(ToString::to_string),
                )
            };
            if let Err(error) = self.try_update_previous_next_of_surrounding_lemmas(
                pre,
                &name,
                pre_previous.as_deref(),
                Some(&patch.lemma),
            ) {
                debug!(lemma = name.as_str(), %error, "previous neighbour keeps its links");
            }
            self.register.lemmas_mut()[pre].set_next(Some(&patch.lemma));
        }

        if let Some(next) = patch.next.as_deref()
            && index + 1 < self.register.len()
            && self.register.lemmas()[index + 1].sort_key() == make_sort_key(next)
        {
            let post = index + 1;
            let (name, post_next) = {
                let neighbour = &self.register.lemmas()[post];
                (
                    neighbour.lemma().to_string(),
                    neighbour.next().map(ToString::to_string),
                )
            };
            if let Err(error) = self.try_update_previous_next_of_surrounding_lemmas(
                post,
                &name,
                Some(&patch.lemma),
                post_next.as_deref(),
            ) {
                debug!(lemma = name.as_str(), %error, "next neighbour keeps its links");
            }
            self.register.lemmas_mut()[post].set_previous(Some(&patch.lemma));
        }
    }

    /// Check that the lemma at `index`, its physical neighbours and the
    /// proposed links agree, then point the neighbours at `proposed_lemma`.
    /// A missing link or a missing neighbour at either end is consistent.
    pub fn try_update_previous_next_of_surrounding_lemmas(
        &mut self,
        index: usize,
        proposed_lemma: &str,
        proposed_previous: Option<&str>,
        proposed_next: Option<&str>,
    ) -> Result<(), RegisterError> {
        let lemmas = self.register.lemmas();
        let Some(current) = lemmas.get(index) else {
            return Ok(());
        };

        let mut pre_to_update = None;
        if let Some(current_previous) = current.previous()
            && let Some(pre) = index.checked_sub(1)
        {
            let neighbour = &lemmas[pre];
            let agrees = make_sort_key(current_previous) == neighbour.sort_key()
                && proposed_previous.map(make_sort_key).as_deref() == Some(neighbour.sort_key());
            if !agrees {
                return Err(RegisterError::PreviousMismatch {
                    current: current_previous.to_string(),
                    actual: neighbour.lemma().to_string(),
                    proposed: proposed_previous.unwrap_or("no key").to_string(),
                });
            }
            pre_to_update = Some(pre);
        }

        let mut post_to_update = None;
        if let Some(current_next) = current.next()
            && let Some(neighbour) = lemmas.get(index + 1)
        {
            let agrees = make_sort_key(current_next) == neighbour.sort_key()
                && proposed_next.map(make_sort_key).as_deref() == Some(neighbour.sort_key());
            if !agrees {
                return Err(RegisterError::NextMismatch {
                    current: current_next.to_string(),
                    actual: neighbour.lemma().to_string(),
                    proposed: proposed_next.unwrap_or("no key").to_string(),
                });
            }
            post_to_update = Some(index + 1);
        }

        let lemmas = self.register.lemmas_mut();
        if let Some(pre) = pre_to_update {
            lemmas[pre].set_next(Some(proposed_lemma));
        }
        if let Some(post) = post_to_update {
            lemmas[post].set_previous(Some(proposed_lemma));
        }
        Ok(())
    }
}

fn claimed_neighbour(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
