//! Resolve a mood against the live TMDB API and print which query tier won.
//! Usage:
//!   cargo run --bin mood_probe -- <mood>
//!   cargo run --bin mood_probe -- all
//! Requires TMDB_API_KEY in the environment (.env supported).

use anyhow::{Context, Result};
use dotenvy::dotenv;
use moodreel::config::Config;
use moodreel::mood::{Mood, MoodResolver, MoodTable};
use moodreel::tmdb::{TmdbApi, TmdbClient};
use std::env;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let arg = env::args()
        .nth(1)
        .context("usage: mood_probe <mood|all>")?;
    let config = Config::from_env()?;
    let tmdb: Arc<dyn TmdbApi> = Arc::new(TmdbClient::from_config(&config)?);
    let resolver = MoodResolver::new(tmdb, MoodTable::default(), config.fallback);

    let moods: Vec<Mood> = if arg.eq_ignore_ascii_case("all") {
        Mood::ALL.to_vec()
    } else {
        vec![arg.parse::<Mood>()?]
    };

    for mood in moods {
        let spec = resolver.table().get(mood).context("mood has no filters")?;
        println!(
            "{} {}  genres={:?} keywords={:?}",
            mood.emoji(),
            mood,
            spec.genres,
            spec.keywords
        );
        let resolution = resolver.resolve(mood).await?;
        println!(
            "  tier={:?} results={}",
            resolution.tier,
            resolution.movies.len()
        );
        for movie in resolution.movies.iter().take(10) {
            println!(
                "  - {} ({}) pop={:.1} vote={:.1}",
                movie.title,
                movie.release_date.as_deref().unwrap_or("????"),
                movie.popularity,
                movie.vote_average
            );
        }
    }

    Ok(())
}
