//! Page models served by the HTTP layer, one builder per page.
//! Builders that need several catalog calls issue them together and fail as a
//! whole if any one of them fails.

use crate::config::Config;
use crate::models::{
    CastCredit, CatalogRecord, MovieDetails, MoviePage, Person, PersonCredit, WatchProviders,
};
use crate::mood::{Mood, MoodTable, QueryTier, Resolution};
use crate::tmdb::{average_vote, image_url, MovieList, TimeWindow, TmdbApi};
use crate::watch::{player_embed, trailer_embed, EmbedLink};
use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::debug;

const FEATURED_COUNT: usize = 5;
const HOME_TRENDING_COUNT: usize = 10;
const SIMILAR_COUNT: usize = 6;
const TOP_CAST_COUNT: usize = 10;

#[derive(Debug, Clone)]
pub struct PageSettings {
    pub image_base: String,
    pub watch_region: String,
    pub player_embed_url: Option<String>,
}

impl From<&Config> for PageSettings {
    fn from(config: &Config) -> Self {
        Self {
            image_base: config.image_base.clone(),
            watch_region: config.watch_region.clone(),
            player_embed_url: config.player_embed_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MoodOption {
    pub mood: Mood,
    pub emoji: &'static str,
    pub genres: Vec<u32>,
    pub keywords: Vec<u32>,
}

pub fn mood_options(table: &MoodTable) -> Vec<MoodOption> {
    table
        .iter()
        .map(|(mood, spec)| MoodOption {
            mood,
            emoji: mood.emoji(),
            genres: spec.genres.clone(),
            keywords: spec.keywords.clone(),
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct HomePage {
    pub featured: Vec<CatalogRecord>,
    pub trending: Vec<CatalogRecord>,
    pub moods: Vec<MoodOption>,
}

pub async fn home(tmdb: &dyn TmdbApi, table: &MoodTable) -> Result<HomePage> {
    let (now_playing, trending) = tokio::try_join!(
        tmdb.movie_list(MovieList::NowPlaying),
        tmdb.trending(TimeWindow::Day),
    )
    .context("loading home page")?;

    Ok(HomePage {
        featured: take(now_playing.results, FEATURED_COUNT),
        trending: take(trending.results, HOME_TRENDING_COUNT),
        moods: mood_options(table),
    })
}

/// Blank queries short-circuit to an empty page without touching the catalog.
pub async fn search(tmdb: &dyn TmdbApi, query: &str) -> Result<MoviePage> {
    let query = query.trim();
    if query.is_empty() {
        return Ok(MoviePage::empty());
    }
    tmdb.search_movies(query)
        .await
        .with_context(|| format!("searching for '{}'", query))
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RecommendationSource {
    Mood { mood: Mood, tier: QueryTier },
    Movie { movie_id: i64 },
}

#[derive(Debug, Clone, Serialize)]
pub struct RecommendationsPage {
    pub source: RecommendationSource,
    pub count: usize,
    pub average_rating: Option<f64>,
    pub movies: Vec<CatalogRecord>,
}

impl RecommendationsPage {
    fn new(source: RecommendationSource, movies: Vec<CatalogRecord>) -> Self {
        Self {
            source,
            count: movies.len(),
            average_rating: average_vote(&movies),
            movies,
        }
    }
}

pub fn mood_recommendations(resolution: Resolution) -> RecommendationsPage {
    RecommendationsPage::new(
        RecommendationSource::Mood {
            mood: resolution.mood,
            tier: resolution.tier,
        },
        resolution.movies,
    )
}

pub async fn movie_recommendations(
    tmdb: &dyn TmdbApi,
    movie_id: i64,
) -> Result<RecommendationsPage> {
    let page = tmdb
        .movie_recommendations(movie_id)
        .await
        .with_context(|| format!("loading recommendations for movie {}", movie_id))?;
    Ok(RecommendationsPage::new(
        RecommendationSource::Movie { movie_id },
        page.results,
    ))
}

#[derive(Debug, Clone, Serialize)]
pub struct MovieDetailsPage {
    pub movie: MovieDetails,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
    pub directors: Vec<String>,
    pub top_cast: Vec<CastCredit>,
    pub similar: Vec<CatalogRecord>,
    pub providers: Option<WatchProviders>,
    pub trailer: Option<EmbedLink>,
    pub player: Option<EmbedLink>,
}

pub async fn movie_details(
    tmdb: &dyn TmdbApi,
    settings: &PageSettings,
    id: i64,
) -> Result<MovieDetailsPage> {
    let (movie, similar, providers) = tokio::try_join!(
        tmdb.movie_details(id),
        tmdb.similar_movies(id),
        tmdb.watch_providers(id, &settings.watch_region),
    )
    .with_context(|| format!("loading details for movie {}", id))?;

    let directors = movie
        .credits
        .crew
        .iter()
        .filter(|c| c.job.as_deref() == Some("Director"))
        .map(|c| c.name.clone())
        .collect();
    let mut top_cast = movie.credits.cast.clone();
    top_cast.sort_by_key(|c| c.order);
    top_cast.truncate(TOP_CAST_COUNT);

    Ok(MovieDetailsPage {
        poster_url: image_url(&settings.image_base, "w500", movie.poster_path.as_deref()),
        backdrop_url: image_url(&settings.image_base, "original", movie.backdrop_path.as_deref()),
        directors,
        top_cast,
        similar: take(similar.results, SIMILAR_COUNT),
        providers,
        trailer: trailer_embed(&movie.videos),
        player: player_embed(settings.player_embed_url.as_deref(), movie.id),
        movie,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SocialLinks {
    pub imdb: Option<String>,
    pub twitter: Option<String>,
    pub instagram: Option<String>,
    pub facebook: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CastProfilePage {
    pub person: Person,
    pub profile_url: Option<String>,
    pub social: SocialLinks,
    pub years: Vec<i32>,
    pub selected_year: Option<i32>,
    pub credits: Vec<PersonCredit>,
}

pub async fn cast_profile(
    tmdb: &dyn TmdbApi,
    settings: &PageSettings,
    id: i64,
    year: Option<i32>,
) -> Result<CastProfilePage> {
    let (person, credits) = tokio::try_join!(tmdb.person(id), tmdb.person_movie_credits(id))
        .with_context(|| format!("loading cast profile {}", id))?;

    let credits = sort_credits_newest_first(credits);
    let years = release_years(&credits);
    let credits = match year {
        Some(y) => credits
            .into_iter()
            .filter(|c| credit_year(c) == Some(y))
            .collect(),
        None => credits,
    };
    debug!(person = id, credits = credits.len(), "Cast profile assembled");

    Ok(CastProfilePage {
        profile_url: image_url(&settings.image_base, "w500", person.profile_path.as_deref()),
        social: social_links(&person),
        years,
        selected_year: year,
        credits,
        person,
    })
}

fn take(mut records: Vec<CatalogRecord>, n: usize) -> Vec<CatalogRecord> {
    records.truncate(n);
    records
}

fn parse_date(raw: Option<&str>) -> Option<NaiveDate> {
    raw.and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
}

fn credit_year(credit: &PersonCredit) -> Option<i32> {
    parse_date(credit.release_date.as_deref()).map(|d| d.year())
}

/// Newest first; credits without a usable date go last in their original order.
fn sort_credits_newest_first(mut credits: Vec<PersonCredit>) -> Vec<PersonCredit> {
    credits.sort_by(|a, b| {
        let a = parse_date(a.release_date.as_deref());
        let b = parse_date(b.release_date.as_deref());
        b.cmp(&a)
    });
    credits
}

fn release_years(credits: &[PersonCredit]) -> Vec<i32> {
    let years: BTreeSet<i32> = credits.iter().filter_map(credit_year).collect();
    years.into_iter().rev().collect()
}

fn social_links(person: &Person) -> SocialLinks {
    let Some(ids) = person.external_ids.as_ref() else {
        return SocialLinks::default();
    };
    SocialLinks {
        imdb: ids
            .imdb_id
            .as_ref()
            .map(|id| format!("https://www.imdb.com/name/{id}")),
        twitter: ids
            .twitter_id
            .as_ref()
            .map(|id| format!("https://twitter.com/{id}")),
        instagram: ids
            .instagram_id
            .as_ref()
            .map(|id| format!("https://instagram.com/{id}")),
        facebook: ids
            .facebook_id
            .as_ref()
            .map(|id| format!("https://facebook.com/{id}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExternalIds;

    fn credit(id: i64, date: Option<&str>) -> PersonCredit {
        PersonCredit {
            id,
            title: format!("Movie {id}"),
            character: None,
            release_date: date.map(|d| d.to_string()),
            poster_path: None,
            vote_average: 0.0,
        }
    }

    #[test]
    fn credits_sort_newest_first_with_undated_last() {
        let sorted = sort_credits_newest_first(vec![
            credit(1, Some("2001-05-01")),
            credit(2, None),
            credit(3, Some("2019-12-20")),
            credit(4, Some("not a date")),
            credit(5, Some("2010-01-01")),
        ]);
        let ids: Vec<i64> = sorted.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![3, 5, 1, 2, 4]);
    }

    #[test]
    fn years_are_distinct_and_descending() {
        let credits = vec![
            credit(1, Some("2001-05-01")),
            credit(2, Some("2019-02-01")),
            credit(3, Some("2019-12-20")),
            credit(4, None),
        ];
        assert_eq!(release_years(&credits), vec![2019, 2001]);
    }

    #[test]
    fn social_links_only_for_known_handles() {
        let person = Person {
            id: 1,
            name: "Someone".to_string(),
            biography: String::new(),
            birthday: None,
            deathday: None,
            place_of_birth: None,
            profile_path: None,
            known_for_department: None,
            external_ids: Some(ExternalIds {
                imdb_id: Some("nm0000206".to_string()),
                twitter_id: None,
                instagram_id: Some("someone".to_string()),
                facebook_id: None,
            }),
        };
        let links = social_links(&person);
        assert_eq!(links.imdb.as_deref(), Some("https://www.imdb.com/name/nm0000206"));
        assert_eq!(links.instagram.as_deref(), Some("https://instagram.com/someone"));
        assert_eq!(links.twitter, None);
    }

    #[test]
    fn options_follow_display_order() {
        let options = mood_options(&MoodTable::default());
        let moods: Vec<Mood> = options.iter().map(|o| o.mood).collect();
        assert_eq!(moods, Mood::ALL.to_vec());
    }
}
