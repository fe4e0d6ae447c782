use crate::config::Config;
use crate::models::{
    CatalogRecord, Genre, MovieDetails, MoviePage, Person, PersonCredit, WatchProviders,
    WatchProvidersResponse,
};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

pub const TMDB_BASE: &str = "https://api.themoviedb.org/3";

#[derive(Debug, Clone)]
pub struct TmdbClient {
    client: Client,
    api_key: String,
    base_url: String,
}

/// Read-only view of the movie catalog. Every page and the mood resolver go
/// through this trait so they can run against an in-memory catalog in tests.
#[async_trait]
pub trait TmdbApi: Send + Sync {
    async fn trending(&self, window: TimeWindow) -> Result<MoviePage>;
    async fn movie_list(&self, list: MovieList) -> Result<MoviePage>;
    async fn search_movies(&self, query: &str) -> Result<MoviePage>;
    async fn discover(&self, query: &DiscoverQuery) -> Result<MoviePage>;
    async fn genres(&self) -> Result<Vec<Genre>>;
    async fn movie_details(&self, id: i64) -> Result<MovieDetails>;
    async fn similar_movies(&self, id: i64) -> Result<MoviePage>;
    async fn movie_recommendations(&self, id: i64) -> Result<MoviePage>;
    async fn watch_providers(&self, id: i64, region: &str) -> Result<Option<WatchProviders>>;
    async fn person(&self, id: i64) -> Result<Person>;
    async fn person_movie_credits(&self, id: i64) -> Result<Vec<PersonCredit>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    Day,
    #[default]
    Week,
}

impl TimeWindow {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeWindow::Day => "day",
            TimeWindow::Week => "week",
        }
    }
}

impl FromStr for TimeWindow {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "day" => Ok(TimeWindow::Day),
            "week" => Ok(TimeWindow::Week),
            other => Err(anyhow!("unknown trending window '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovieList {
    NowPlaying,
    Popular,
    TopRated,
    Upcoming,
}

impl MovieList {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovieList::NowPlaying => "now_playing",
            MovieList::Popular => "popular",
            MovieList::TopRated => "top_rated",
            MovieList::Upcoming => "upcoming",
        }
    }
}

impl FromStr for MovieList {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "now_playing" => Ok(MovieList::NowPlaying),
            "popular" => Ok(MovieList::Popular),
            "top_rated" => Ok(MovieList::TopRated),
            "upcoming" => Ok(MovieList::Upcoming),
            other => Err(anyhow!("unknown movie list '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    PopularityDesc,
    VoteAverageDesc,
    ReleaseDateDesc,
    RevenueDesc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::PopularityDesc => "popularity.desc",
            SortOrder::VoteAverageDesc => "vote_average.desc",
            SortOrder::ReleaseDateDesc => "primary_release_date.desc",
            SortOrder::RevenueDesc => "revenue.desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "popularity.desc" => Ok(SortOrder::PopularityDesc),
            "vote_average.desc" => Ok(SortOrder::VoteAverageDesc),
            "primary_release_date.desc" | "release_date.desc" => Ok(SortOrder::ReleaseDateDesc),
            "revenue.desc" => Ok(SortOrder::RevenueDesc),
            other => Err(anyhow!("unsupported sort order '{}'", other)),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a list of ids combines inside one discover filter.
/// TMDB reads `|` as OR and `,` as AND.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdMatch {
    #[default]
    Any,
    All,
}

impl IdMatch {
    fn separator(&self) -> &'static str {
        match self {
            IdMatch::Any => "|",
            IdMatch::All => ",",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoverQuery {
    pub genres: Vec<u32>,
    pub genre_match: IdMatch,
    pub keywords: Vec<u32>,
    pub year: Option<i32>,
    pub sort_by: SortOrder,
    pub page: u32,
}

impl Default for DiscoverQuery {
    fn default() -> Self {
        Self {
            genres: Vec::new(),
            genre_match: IdMatch::Any,
            keywords: Vec::new(),
            year: None,
            sort_by: SortOrder::PopularityDesc,
            page: 1,
        }
    }
}

impl DiscoverQuery {
    pub fn by_popularity() -> Self {
        Self::default()
    }

    pub fn with_genres(mut self, ids: &[u32]) -> Self {
        self.genres = ids.to_vec();
        self
    }

    pub fn with_keywords(mut self, ids: &[u32]) -> Self {
        self.keywords = ids.to_vec();
        self
    }

    /// Query parameters, excluding the credential. Empty filters are omitted.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("sort_by", self.sort_by.as_str().to_string()),
            ("page", self.page.max(1).to_string()),
        ];
        if !self.genres.is_empty() {
            params.push(("with_genres", join_ids(&self.genres, self.genre_match)));
        }
        if !self.keywords.is_empty() {
            params.push(("with_keywords", join_ids(&self.keywords, IdMatch::Any)));
        }
        if let Some(year) = self.year {
            params.push(("primary_release_year", year.to_string()));
        }
        params
    }
}

fn join_ids(ids: &[u32], how: IdMatch) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(how.separator())
}

impl TmdbClient {
    pub fn new(api_key: impl Into<String>, base_url: &str, timeout: Duration) -> Result<Self> {
        let user_agent = format!("moodreel/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .context("Failed to build TMDB HTTP client")?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.tmdb_api_key.clone(),
            &config.tmdb_base_url,
            config.http_timeout,
        )
    }

    fn url(&self, path: &str, params: &[(&str, String)]) -> String {
        let mut url = format!(
            "{}{}?api_key={}",
            self.base_url,
            path,
            urlencoding::encode(&self.api_key)
        );
        for (key, value) in params {
            url.push('&');
            url.push_str(key);
            url.push('=');
            url.push_str(&urlencoding::encode(value));
        }
        url
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let url = self.url(path, params);
        debug!(path = %path, "TMDB request");
        let res = self
            .client
            .get(&url)
            .send()
            .await
            // The URL carries the API key, so it is stripped from transport errors.
            .map_err(|e| e.without_url())
            .with_context(|| format!("request to {} failed", path))?;
        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| e.without_url())
            .context("reading body failed")?;
        if !status.is_success() {
            return Err(anyhow!("{} -> {}: {}", path, status, upstream_detail(&text)));
        }
        let parsed: T = serde_json::from_str(&text)
            .with_context(|| format!("JSON parse failed for {}", path))?;
        Ok(parsed)
    }
}

#[async_trait]
impl TmdbApi for TmdbClient {
    async fn trending(&self, window: TimeWindow) -> Result<MoviePage> {
        let path = format!("/trending/movie/{}", window.as_str());
        self.get_json(&path, &[]).await
    }

    async fn movie_list(&self, list: MovieList) -> Result<MoviePage> {
        let path = format!("/movie/{}", list.as_str());
        self.get_json(&path, &[]).await
    }

    async fn search_movies(&self, query: &str) -> Result<MoviePage> {
        self.get_json(
            "/search/movie",
            &[
                ("query", query.to_string()),
                ("include_adult", "false".to_string()),
            ],
        )
        .await
    }

    async fn discover(&self, query: &DiscoverQuery) -> Result<MoviePage> {
        self.get_json("/discover/movie", &query.params()).await
    }

    async fn genres(&self) -> Result<Vec<Genre>> {
        #[derive(Deserialize)]
        struct GenreList {
            genres: Vec<Genre>,
        }

        let data: GenreList = self.get_json("/genre/movie/list", &[]).await?;
        Ok(data.genres)
    }

    async fn movie_details(&self, id: i64) -> Result<MovieDetails> {
        let path = format!("/movie/{id}");
        self.get_json(
            &path,
            &[("append_to_response", "credits,videos".to_string())],
        )
        .await
    }

    async fn similar_movies(&self, id: i64) -> Result<MoviePage> {
        let path = format!("/movie/{id}/similar");
        self.get_json(&path, &[]).await
    }

    async fn movie_recommendations(&self, id: i64) -> Result<MoviePage> {
        let path = format!("/movie/{id}/recommendations");
        self.get_json(&path, &[]).await
    }

    async fn watch_providers(&self, id: i64, region: &str) -> Result<Option<WatchProviders>> {
        let path = format!("/movie/{id}/watch/providers");
        let mut data: WatchProvidersResponse = self.get_json(&path, &[]).await?;
        Ok(data.results.remove(region))
    }

    async fn person(&self, id: i64) -> Result<Person> {
        let path = format!("/person/{id}");
        self.get_json(
            &path,
            &[("append_to_response", "external_ids".to_string())],
        )
        .await
    }

    async fn person_movie_credits(&self, id: i64) -> Result<Vec<PersonCredit>> {
        #[derive(Deserialize)]
        struct MovieCredits {
            #[serde(default)]
            cast: Vec<PersonCredit>,
        }

        let path = format!("/person/{id}/movie_credits");
        let data: MovieCredits = self.get_json(&path, &[]).await?;
        Ok(data.cast)
    }
}

const MAX_DETAIL_CHARS: usize = 200;

/// TMDB's `status_message` when the error body has one, else the body cut short.
fn upstream_detail(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        status_message: String,
    }

    if let Ok(err) = serde_json::from_str::<ErrorBody>(body) {
        return err.status_message;
    }
    let mut detail: String = body.chars().take(MAX_DETAIL_CHARS).collect();
    if body.chars().count() > MAX_DETAIL_CHARS {
        detail.push_str("...");
    }
    detail
}

/// Full image URL for a TMDB image path, e.g. `w500` posters or `original` backdrops.
pub fn image_url(image_base: &str, size: &str, path: Option<&str>) -> Option<String> {
    path.filter(|p| !p.is_empty())
        .map(|p| format!("{}/{}{}", image_base.trim_end_matches('/'), size, p))
}

/// Mean vote of a result set; `None` when there is nothing to average.
pub fn average_vote(records: &[CatalogRecord]) -> Option<f64> {
    if records.is_empty() {
        return None;
    }
    let sum: f64 = records.iter().map(|r| r.vote_average).sum();
    Some(sum / records.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> TmdbClient {
        TmdbClient::new("k3y", "http://catalog.test/3/", Duration::from_secs(1))
            .expect("client builds")
    }

    #[test]
    fn strict_discover_params_use_or_lists() {
        let q = DiscoverQuery::by_popularity()
            .with_genres(&[35, 10751])
            .with_keywords(&[9715, 180547]);
        let params = q.params();
        assert!(params.contains(&("sort_by", "popularity.desc".to_string())));
        assert!(params.contains(&("with_genres", "35|10751".to_string())));
        assert!(params.contains(&("with_keywords", "9715|180547".to_string())));
        assert!(!params.iter().any(|(k, _)| *k == "primary_release_year"));
    }

    #[test]
    fn empty_filters_are_omitted() {
        let params = DiscoverQuery::by_popularity().with_genres(&[18]).params();
        assert!(params.iter().all(|(k, _)| *k != "with_keywords"));
        let params = DiscoverQuery::by_popularity().with_keywords(&[1]).params();
        assert!(params.iter().all(|(k, _)| *k != "with_genres"));
    }

    #[test]
    fn all_match_joins_with_commas() {
        let q = DiscoverQuery {
            genres: vec![28, 12],
            genre_match: IdMatch::All,
            year: Some(1999),
            ..DiscoverQuery::default()
        };
        let params = q.params();
        assert!(params.contains(&("with_genres", "28,12".to_string())));
        assert!(params.contains(&("primary_release_year", "1999".to_string())));
    }

    #[test]
    fn url_encodes_values_and_trims_base() {
        let url = client().url("/search/movie", &[("query", "alien & co".to_string())]);
        assert_eq!(
            url,
            "http://catalog.test/3/search/movie?api_key=k3y&query=alien%20%26%20co"
        );
    }

    #[test]
    fn parses_list_and_sort_names() {
        assert_eq!("top_rated".parse::<MovieList>().unwrap(), MovieList::TopRated);
        assert!("latest".parse::<MovieList>().is_err());
        assert_eq!(
            "release_date.desc".parse::<SortOrder>().unwrap(),
            SortOrder::ReleaseDateDesc
        );
        assert!("title.asc".parse::<SortOrder>().is_err());
    }

    #[test]
    fn image_url_skips_missing_paths() {
        let base = "https://image.tmdb.org/t/p/";
        assert_eq!(
            image_url(base, "w500", Some("/a.jpg")).as_deref(),
            Some("https://image.tmdb.org/t/p/w500/a.jpg")
        );
        assert_eq!(image_url(base, "w500", None), None);
        assert_eq!(image_url(base, "w500", Some("")), None);
    }

    #[test]
    fn upstream_detail_prefers_status_message() {
        let body = r#"{"status_code":7,"status_message":"Invalid API key: You must be granted a valid key.","success":false}"#;
        assert_eq!(
            upstream_detail(body),
            "Invalid API key: You must be granted a valid key."
        );
    }

    #[test]
    fn upstream_detail_truncates_long_bodies() {
        let body = "x".repeat(5_000);
        let detail = upstream_detail(&body);
        assert_eq!(detail.chars().count(), MAX_DETAIL_CHARS + 3);
        assert!(detail.ends_with("..."));
        assert_eq!(upstream_detail("Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn trending_window_parses_known_names() {
        assert_eq!("day".parse::<TimeWindow>().unwrap(), TimeWindow::Day);
        assert!("month".parse::<TimeWindow>().is_err());
    }

    #[test]
    fn average_vote_of_empty_set_is_none() {
        assert_eq!(average_vote(&[]), None);
    }
}
