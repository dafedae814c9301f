//! Incremental filtering over the current listing (flat) or a bounded
//! subtree walk (recursive).
//!
//! Every query change recomputes matches from the unfiltered candidate set,
//! so shortening a query never loses entries.

use std::cmp::Ordering;
use std::path::PathBuf;
use std::sync::Arc;

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use tracing::debug;

use crate::config::{Preferences, SearchLimits};
use crate::error::FsResult;
use crate::fs::listing::{compare_entries, DirectoryListing, Entry};
use crate::fs::walk;

/// Which candidate set an active search filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// Entries of the current listing.
    Flat,
    /// Entries found by a bounded walk below the current directory.
    Recursive,
}

impl SearchMode {
    pub fn toggled(self) -> Self {
        match self {
            SearchMode::Flat => SearchMode::Recursive,
            SearchMode::Recursive => SearchMode::Flat,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SearchMode::Flat => "Filter",
            SearchMode::Recursive => "Search",
        }
    }
}

/// Quality of a subsequence match. Lower sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct MatchScore {
    /// Characters skipped between the first and last matched character.
    pub gaps: usize,
    /// Character offset of the first matched character.
    pub start: usize,
}

/// One entry that satisfied the query.
#[derive(Debug, Clone)]
pub struct SearchMatch {
    pub entry: Entry,
    pub score: MatchScore,
    /// Path relative to the directory the search started in.
    pub source_path: PathBuf,
    /// Character positions in `entry.name` that matched the query.
    pub indices: Vec<usize>,
}

/// Case-insensitive fuzzy subsequence matcher.
pub struct Matcher {
    inner: SkimMatcherV2,
}

impl Default for Matcher {
    fn default() -> Self {
        Self {
            inner: SkimMatcherV2::default().ignore_case(),
        }
    }
}

impl Matcher {
    /// Score `name` against a non-empty `query`, or `None` if the query is
    /// not a subsequence of the name.
    pub fn score(&self, name: &str, query: &str) -> Option<(MatchScore, Vec<usize>)> {
        let (_, indices) = self.inner.fuzzy_indices(name, query)?;
        let first = *indices.first()?;
        let last = *indices.last()?;
        let span = last - first + 1;
        let score = MatchScore {
            gaps: span.saturating_sub(indices.len()),
            start: first,
        };
        Some((score, indices))
    }
}

/// Ranking used for every match list: score first, then the listing
/// comparator, then the relative path for same-named entries.
pub fn compare_matches(a: &SearchMatch, b: &SearchMatch, prefs: &Preferences) -> Ordering {
    a.score
        .cmp(&b.score)
        .then_with(|| compare_entries(&a.entry, &b.entry, prefs.sort_by, prefs.dirs_first))
        .then_with(|| a.source_path.cmp(&b.source_path))
}

/// Pure filter from `(candidates, query)` to ranked matches.
///
/// An empty query keeps every candidate in its given order.
pub fn rank<'a, I>(matcher: &Matcher, candidates: I, query: &str, prefs: &Preferences) -> Vec<SearchMatch>
where
    I: IntoIterator<Item = (&'a Entry, PathBuf)>,
{
    if query.is_empty() {
        return candidates
            .into_iter()
            .map(|(entry, source_path)| SearchMatch {
                entry: entry.clone(),
                score: MatchScore::default(),
                source_path,
                indices: Vec::new(),
            })
            .collect();
    }

    let mut matches: Vec<SearchMatch> = candidates
        .into_iter()
        .filter_map(|(entry, source_path)| {
            let (score, indices) = matcher.score(&entry.name, query)?;
            Some(SearchMatch {
                entry: entry.clone(),
                score,
                source_path,
                indices,
            })
        })
        .collect();
    matches.sort_by(|a, b| compare_matches(a, b, prefs));
    matches
}

/// State of an active search. Dropped as a whole when the search ends.
pub struct SearchState {
    pub query: String,
    pub mode: SearchMode,
    pub matches: Vec<SearchMatch>,
    /// The recursive walk stopped at its scan cap.
    pub truncated: bool,
    listing: Arc<DirectoryListing>,
    prefs: Preferences,
    limits: SearchLimits,
    walked: Option<Vec<walk::WalkEntry>>,
    matcher: Matcher,
}

impl SearchState {
    /// Start a search over `listing` with an empty query.
    pub fn begin(
        mode: SearchMode,
        listing: Arc<DirectoryListing>,
        prefs: Preferences,
        limits: SearchLimits,
    ) -> Self {
        debug!(?mode, dir = %listing.path.display(), "search started");
        let mut state = Self {
            query: String::new(),
            mode,
            matches: Vec::new(),
            truncated: false,
            listing,
            prefs,
            limits,
            walked: None,
            matcher: Matcher::default(),
        };
        state.recompute();
        state
    }

    /// Replace the query and recompute matches from the full candidate set.
    ///
    /// The only fallible step is the first recursive walk; on failure the
    /// match list is left empty.
    pub fn update_query(&mut self, query: &str) -> FsResult<&[SearchMatch]> {
        self.query = query.to_string();
        if self.mode == SearchMode::Recursive && !self.query.is_empty() && self.walked.is_none() {
            match walk::walk(&self.listing.path, &self.limits, self.prefs.show_hidden) {
                Ok(outcome) => {
                    self.truncated = outcome.truncated;
                    self.walked = Some(outcome.entries);
                }
                Err(e) => {
                    self.matches.clear();
                    return Err(e);
                }
            }
        }
        self.recompute();
        Ok(&self.matches)
    }

    /// Switch between flat and recursive filtering, keeping the query.
    pub fn set_mode(&mut self, mode: SearchMode) -> FsResult<&[SearchMatch]> {
        self.mode = mode;
        let query = self.query.clone();
        self.update_query(&query)
    }

    /// The listing the search was started from.
    pub fn listing(&self) -> &Arc<DirectoryListing> {
        &self.listing
    }

    fn recompute(&mut self) {
        self.matches = match self.mode {
            SearchMode::Flat => {
                let show_hidden = self.prefs.show_hidden;
                let candidates = self
                    .listing
                    .entries
                    .iter()
                    .filter(|e| show_hidden || !e.is_hidden)
                    .map(|e| (e, PathBuf::from(&e.name)));
                rank(&self.matcher, candidates, &self.query, &self.prefs)
            }
            SearchMode::Recursive if self.query.is_empty() => Vec::new(),
            SearchMode::Recursive => {
                let candidates = self
                    .walked
                    .iter()
                    .flatten()
                    .map(|w| (&w.entry, w.relative.clone()));
                let mut ranked = rank(&self.matcher, candidates, &self.query, &self.prefs);
                ranked.truncate(self.limits.max_results);
                ranked
            }
        };
        debug!(query = %self.query, matches = self.matches.len(), "search recomputed");
    }
}
