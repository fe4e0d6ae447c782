//! Mood-based recommendations.
//!
//! Each [`Mood`] maps to a [`FilterSpec`] of TMDB genre and keyword ids. The
//! resolver first asks the catalog for movies matching both lists; when that
//! comes back sparse it retries with genres alone and returns that result
//! instead.

use crate::models::CatalogRecord;
use crate::tmdb::{DiscoverQuery, TmdbApi};
use anyhow::bail;
use once_cell::sync::Lazy;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Mood {
    Happy,
    Sad,
    Scared,
    Cool,
    Thoughtful,
    Funny,
}

impl Mood {
    pub const ALL: [Mood; 6] = [
        Mood::Happy,
        Mood::Sad,
        Mood::Scared,
        Mood::Cool,
        Mood::Thoughtful,
        Mood::Funny,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Mood::Happy => "Happy",
            Mood::Sad => "Sad",
            Mood::Scared => "Scared",
            Mood::Cool => "Cool",
            Mood::Thoughtful => "Thoughtful",
            Mood::Funny => "Funny",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Mood::Happy => "😊",
            Mood::Sad => "😢",
            Mood::Scared => "😨",
            Mood::Cool => "😎",
            Mood::Thoughtful => "🤔",
            Mood::Funny => "😂",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Mood {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Mood::ALL
            .into_iter()
            .find(|m| m.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ResolveError::InvalidMood(s.to_string()))
    }
}

impl Serialize for Mood {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

#[derive(Debug, Error)]
pub enum ResolveError {
    /// The label is not one of [`Mood::ALL`]. Raised before any catalog call.
    #[error("unrecognized mood '{0}'")]
    InvalidMood(String),
    #[error("catalog source unavailable")]
    DataSource(#[source] anyhow::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterSpec {
    pub genres: Vec<u32>,
    pub keywords: Vec<u32>,
}

impl FilterSpec {
    pub fn new(genres: &[u32], keywords: &[u32]) -> Self {
        Self {
            genres: genres.to_vec(),
            keywords: keywords.to_vec(),
        }
    }

    fn strict_query(&self) -> DiscoverQuery {
        DiscoverQuery::by_popularity()
            .with_genres(&self.genres)
            .with_keywords(&self.keywords)
    }

    fn relaxed_query(&self) -> DiscoverQuery {
        DiscoverQuery::by_popularity().with_genres(&self.genres)
    }
}

const DEFAULT_FILTERS: [(Mood, &[u32], &[u32]); 6] = [
    (Mood::Happy, &[35, 10751], &[9713, 6054]),
    (Mood::Sad, &[18, 10749], &[10683, 9672]),
    (Mood::Scared, &[27, 53], &[6152, 12339]),
    (Mood::Cool, &[28, 80, 12], &[9715, 9748]),
    (Mood::Thoughtful, &[878, 9648, 99], &[4565, 818]),
    (Mood::Funny, &[35], &[9716, 10123]),
];

static DEFAULT_TABLE: Lazy<MoodTable> = Lazy::new(|| MoodTable {
    entries: DEFAULT_FILTERS
        .iter()
        .map(|(mood, genres, keywords)| (*mood, FilterSpec::new(genres, keywords)))
        .collect(),
});

/// One filter specification per mood. Construction fails if any mood is missing.
#[derive(Debug, Clone)]
pub struct MoodTable {
    entries: HashMap<Mood, FilterSpec>,
}

impl MoodTable {
    pub fn new(entries: impl IntoIterator<Item = (Mood, FilterSpec)>) -> anyhow::Result<Self> {
        let entries: HashMap<Mood, FilterSpec> = entries.into_iter().collect();
        for mood in Mood::ALL {
            if !entries.contains_key(&mood) {
                bail!("no filter specification for mood '{}'", mood);
            }
        }
        Ok(Self { entries })
    }

    pub fn with_filter(mut self, mood: Mood, spec: FilterSpec) -> Self {
        self.entries.insert(mood, spec);
        self
    }

    pub fn get(&self, mood: Mood) -> Option<&FilterSpec> {
        self.entries.get(&mood)
    }

    /// Entries in display order.
    pub fn iter(&self) -> impl Iterator<Item = (Mood, &FilterSpec)> {
        Mood::ALL
            .into_iter()
            .filter_map(move |m| self.entries.get(&m).map(|spec| (m, spec)))
    }
}

impl Default for MoodTable {
    fn default() -> Self {
        DEFAULT_TABLE.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackPolicy {
    /// A strict result with fewer records than this triggers the genre-only query.
    pub min_results: usize,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self { min_results: 5 }
    }
}

impl FallbackPolicy {
    fn should_relax(&self, strict_count: usize, spec: &FilterSpec) -> bool {
        strict_count < self.min_results && !spec.genres.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryTier {
    Strict,
    Relaxed,
}

#[derive(Debug, Clone)]
pub struct Resolution {
    pub mood: Mood,
    pub tier: QueryTier,
    pub movies: Vec<CatalogRecord>,
}

#[derive(Clone)]
pub struct MoodResolver {
    source: Arc<dyn TmdbApi>,
    table: Arc<MoodTable>,
    policy: FallbackPolicy,
}

impl MoodResolver {
    pub fn new(source: Arc<dyn TmdbApi>, table: MoodTable, policy: FallbackPolicy) -> Self {
        Self {
            source,
            table: Arc::new(table),
            policy,
        }
    }

    pub fn table(&self) -> &MoodTable {
        &self.table
    }

    pub fn policy(&self) -> FallbackPolicy {
        self.policy
    }

    /// Parses `label` and returns the movies for that mood.
    pub async fn resolve_movies_for_mood(
        &self,
        label: &str,
    ) -> Result<Vec<CatalogRecord>, ResolveError> {
        let mood: Mood = label.parse()?;
        Ok(self.resolve(mood).await?.movies)
    }

    pub async fn resolve(&self, mood: Mood) -> Result<Resolution, ResolveError> {
        let spec = self
            .table
            .get(mood)
            .ok_or_else(|| ResolveError::InvalidMood(mood.label().to_string()))?;

        let strict = self
            .source
            .discover(&spec.strict_query())
            .await
            .map_err(ResolveError::DataSource)?;
        let strict_count = strict.results.len();
        debug!(mood = %mood, count = strict_count, "Strict mood query returned");

        if !self.policy.should_relax(strict_count, spec) {
            return Ok(Resolution {
                mood,
                tier: QueryTier::Strict,
                movies: strict.results,
            });
        }

        info!(
            mood = %mood,
            count = strict_count,
            min = self.policy.min_results,
            "Strict mood query sparse, retrying with genres only"
        );
        let relaxed = self
            .source
            .discover(&spec.relaxed_query())
            .await
            .map_err(ResolveError::DataSource)?;
        Ok(Resolution {
            mood,
            tier: QueryTier::Relaxed,
            movies: relaxed.results,
        })
    }
}
