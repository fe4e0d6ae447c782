use crate::config::Config;
use crate::error::AppError;
use crate::models::{Genre, MoviePage};
use crate::mood::{Mood, MoodResolver, MoodTable};
use crate::pages::{self, PageSettings};
use crate::tmdb::{DiscoverQuery, IdMatch, MovieList, SortOrder, TimeWindow, TmdbApi, TmdbClient};
use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

/// TMDB serves at most this many pages for any list.
const MAX_PAGE: u32 = 500;

#[derive(Clone)]
pub struct AppState {
    pub tmdb: Arc<dyn TmdbApi>,
    pub resolver: MoodResolver,
    pub settings: Arc<PageSettings>,
}

impl AppState {
    pub fn new(tmdb: Arc<dyn TmdbApi>, config: &Config) -> Self {
        let resolver = MoodResolver::new(tmdb.clone(), MoodTable::default(), config.fallback);
        Self {
            tmdb,
            resolver,
            settings: Arc::new(PageSettings::from(config)),
        }
    }
}

pub async fn run_server(config: Config) -> Result<()> {
    config.log_summary();
    let tmdb: Arc<dyn TmdbApi> = Arc::new(TmdbClient::from_config(&config)?);
    let state = AppState::new(tmdb, &config);
    let app = build_router(state).layer(TraceLayer::new_for_http());

    info!("Listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/home", get(home))
        .route("/api/moods", get(moods))
        .route("/api/trending", get(trending))
        .route("/api/movies/:list", get(movie_list))
        .route("/api/search", get(search))
        .route("/api/genres", get(genres))
        .route("/api/discover", get(discover))
        .route("/api/recommendations", get(recommendations))
        .route("/api/movie/:id", get(movie_details))
        .route("/api/cast/:id", get(cast_profile))
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn home(State(state): State<AppState>) -> Result<Json<pages::HomePage>, AppError> {
    let page = pages::home(state.tmdb.as_ref(), state.resolver.table()).await?;
    Ok(Json(page))
}

async fn moods(State(state): State<AppState>) -> Json<Vec<pages::MoodOption>> {
    Json(pages::mood_options(state.resolver.table()))
}

#[derive(Debug, Deserialize)]
struct TrendingParams {
    window: Option<String>,
}

async fn trending(
    State(state): State<AppState>,
    Query(params): Query<TrendingParams>,
) -> Result<Json<MoviePage>, AppError> {
    let window = parse_optional::<TimeWindow>("trending window", params.window.as_deref())?
        .unwrap_or_default();
    let page = state.tmdb.trending(window).await?;
    Ok(Json(page))
}

async fn movie_list(
    State(state): State<AppState>,
    Path(list): Path<String>,
) -> Result<Json<MoviePage>, AppError> {
    let list: MovieList = list
        .parse()
        .map_err(|e: anyhow::Error| AppError::NotFound(e.to_string()))?;
    let page = state.tmdb.movie_list(list).await?;
    Ok(Json(page))
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
}

async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<MoviePage>, AppError> {
    let page = pages::search(state.tmdb.as_ref(), &params.q).await?;
    Ok(Json(page))
}

async fn genres(State(state): State<AppState>) -> Result<Json<Vec<Genre>>, AppError> {
    let genres = state.tmdb.genres().await?;
    Ok(Json(genres))
}

#[derive(Debug, Deserialize)]
struct DiscoverParams {
    genres: Option<String>,
    year: Option<String>,
    sort_by: Option<String>,
    page: Option<String>,
}

impl DiscoverParams {
    fn into_query(self) -> Result<DiscoverQuery, AppError> {
        let genres = match self.genres.as_deref() {
            Some(raw) => parse_id_list(raw)?,
            None => Vec::new(),
        };
        let sort_by = match self.sort_by.as_deref() {
            Some(raw) => raw
                .parse::<SortOrder>()
                .map_err(|e| AppError::BadRequest(e.to_string()))?,
            None => SortOrder::default(),
        };
        let year = parse_optional::<i32>("year", self.year.as_deref())?;
        let page = parse_optional::<u32>("page", self.page.as_deref())?.unwrap_or(1);
        if !(1..=MAX_PAGE).contains(&page) {
            return Err(AppError::BadRequest(format!(
                "page must be between 1 and {}",
                MAX_PAGE
            )));
        }
        Ok(DiscoverQuery {
            genres,
            genre_match: IdMatch::All,
            year,
            sort_by,
            page,
            ..DiscoverQuery::default()
        })
    }
}

/// Parses a path or query value, turning failures into a JSON 400.
fn parse_param<T: FromStr>(name: &str, raw: &str) -> Result<T, AppError> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| AppError::BadRequest(format!("invalid {} '{}'", name, raw)))
}

fn parse_optional<T: FromStr>(name: &str, raw: Option<&str>) -> Result<Option<T>, AppError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => parse_param(name, raw).map(Some),
        None => Ok(None),
    }
}

fn parse_id_list(raw: &str) -> Result<Vec<u32>, AppError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u32>()
                .map_err(|_| AppError::BadRequest(format!("invalid genre id '{}'", s)))
        })
        .collect()
}

async fn discover(
    State(state): State<AppState>,
    Query(params): Query<DiscoverParams>,
) -> Result<Json<MoviePage>, AppError> {
    let query = params.into_query()?;
    let page = state.tmdb.discover(&query).await?;
    Ok(Json(page))
}

#[derive(Debug, Deserialize)]
struct RecommendationParams {
    mood: Option<String>,
    movie_id: Option<String>,
}

async fn recommendations(
    State(state): State<AppState>,
    Query(params): Query<RecommendationParams>,
) -> Result<Json<pages::RecommendationsPage>, AppError> {
    if let Some(movie_id) = parse_optional::<i64>("movie id", params.movie_id.as_deref())? {
        debug!(movie_id, "Recommendations by movie");
        let page = pages::movie_recommendations(state.tmdb.as_ref(), movie_id).await?;
        return Ok(Json(page));
    }
    let Some(label) = params.mood else {
        return Err(AppError::BadRequest(
            "No valid mood or movie ID specified".to_string(),
        ));
    };
    let mood: Mood = label.parse()?;
    let resolution = state.resolver.resolve(mood).await?;
    info!(
        mood = %resolution.mood,
        tier = ?resolution.tier,
        count = resolution.movies.len(),
        "Resolved mood recommendations"
    );
    Ok(Json(pages::mood_recommendations(resolution)))
}

async fn movie_details(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<pages::MovieDetailsPage>, AppError> {
    let id: i64 = parse_param("movie id", &id)?;
    let page = pages::movie_details(state.tmdb.as_ref(), &state.settings, id).await?;
    Ok(Json(page))
}

#[derive(Debug, Deserialize)]
struct CastParams {
    year: Option<String>,
}

async fn cast_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<CastParams>,
) -> Result<Json<pages::CastProfilePage>, AppError> {
    let id: i64 = parse_param("person id", &id)?;
    let year = parse_optional::<i32>("year", params.year.as_deref())?;
    let page = pages::cast_profile(state.tmdb.as_ref(), &state.settings, id, year).await?;
    Ok(Json(page))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        term.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}
