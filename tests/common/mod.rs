#![allow(dead_code)]

use anyhow::anyhow;
use moodreel::models::{
    CastCredit, CatalogRecord, Credits, CrewCredit, ExternalIds, Genre, MovieDetails, MoviePage,
    Person, PersonCredit, Provider, Video, Videos, WatchProviders,
};
use moodreel::tmdb::{DiscoverQuery, MovieList, TimeWindow, TmdbApi};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// In-memory catalog. Discover queries with keywords get `strict`, the rest get `relaxed`.
#[derive(Default)]
pub struct FakeCatalog {
    pub strict: Vec<CatalogRecord>,
    pub relaxed: Vec<CatalogRecord>,
    pub fail_strict: bool,
    pub fail_relaxed: bool,
    pub fail_similar: bool,
    pub calls: AtomicUsize,
    pub discover_queries: Mutex<Vec<DiscoverQuery>>,
}

impl FakeCatalog {
    pub fn with_results(strict: usize, relaxed: usize) -> Self {
        Self {
            strict: records("strict", strict),
            relaxed: records("relaxed", relaxed),
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn discover_queries(&self) -> Vec<DiscoverQuery> {
        self.discover_queries.lock().unwrap().clone()
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn records(prefix: &str, n: usize) -> Vec<CatalogRecord> {
    (0..n)
        .map(|i| CatalogRecord {
            id: i as i64 + 1,
            title: format!("{prefix} {i}"),
            overview: String::new(),
            release_date: Some("2020-01-01".to_string()),
            poster_path: Some(format!("/{prefix}{i}.jpg")),
            backdrop_path: None,
            popularity: 100.0 - i as f64,
            vote_average: 7.0,
            genre_ids: vec![18],
        })
        .collect()
}

fn page(results: Vec<CatalogRecord>) -> MoviePage {
    MoviePage {
        page: 1,
        total_pages: 1,
        total_results: results.len() as u32,
        results,
    }
}

#[async_trait::async_trait]
impl TmdbApi for FakeCatalog {
    async fn trending(&self, window: TimeWindow) -> anyhow::Result<MoviePage> {
        self.hit();
        Ok(page(records(window.as_str(), 12)))
    }

    async fn movie_list(&self, list: MovieList) -> anyhow::Result<MoviePage> {
        self.hit();
        Ok(page(records(list.as_str(), 8)))
    }

    async fn search_movies(&self, query: &str) -> anyhow::Result<MoviePage> {
        self.hit();
        Ok(page(records(query, 3)))
    }

    async fn discover(&self, query: &DiscoverQuery) -> anyhow::Result<MoviePage> {
        self.hit();
        self.discover_queries.lock().unwrap().push(query.clone());
        if query.keywords.is_empty() {
            if self.fail_relaxed {
                return Err(anyhow!("/discover/movie -> 503 Service Unavailable"));
            }
            Ok(page(self.relaxed.clone()))
        } else {
            if self.fail_strict {
                return Err(anyhow!("/discover/movie -> 503 Service Unavailable"));
            }
            Ok(page(self.strict.clone()))
        }
    }

    async fn genres(&self) -> anyhow::Result<Vec<Genre>> {
        self.hit();
        Ok(vec![
            Genre {
                id: 18,
                name: "Drama".to_string(),
            },
            Genre {
                id: 35,
                name: "Comedy".to_string(),
            },
        ])
    }

    async fn movie_details(&self, id: i64) -> anyhow::Result<MovieDetails> {
        self.hit();
        Ok(MovieDetails {
            id,
            title: "Fixture Movie".to_string(),
            tagline: None,
            overview: "Overview".to_string(),
            release_date: Some("1999-03-31".to_string()),
            runtime: Some(136),
            poster_path: Some("/poster.jpg".to_string()),
            backdrop_path: Some("/backdrop.jpg".to_string()),
            popularity: 80.0,
            vote_average: 8.2,
            genres: vec![Genre {
                id: 878,
                name: "Science Fiction".to_string(),
            }],
            credits: Credits {
                cast: vec![
                    CastCredit {
                        id: 2,
                        name: "Second Billed".to_string(),
                        character: Some("B".to_string()),
                        profile_path: None,
                        order: 1,
                    },
                    CastCredit {
                        id: 1,
                        name: "Top Billed".to_string(),
                        character: Some("A".to_string()),
                        profile_path: None,
                        order: 0,
                    },
                ],
                crew: vec![
                    CrewCredit {
                        id: 10,
                        name: "The Director".to_string(),
                        job: Some("Director".to_string()),
                        department: Some("Directing".to_string()),
                    },
                    CrewCredit {
                        id: 11,
                        name: "The Writer".to_string(),
                        job: Some("Screenplay".to_string()),
                        department: Some("Writing".to_string()),
                    },
                ],
            },
            videos: Videos {
                results: vec![Video {
                    name: "Official Trailer".to_string(),
                    key: "trailerkey".to_string(),
                    site: "YouTube".to_string(),
                    video_type: "Trailer".to_string(),
                }],
            },
            production_companies: Vec::new(),
            spoken_languages: Vec::new(),
        })
    }

    async fn similar_movies(&self, _id: i64) -> anyhow::Result<MoviePage> {
        self.hit();
        if self.fail_similar {
            return Err(anyhow!("/movie/similar -> 500 Internal Server Error"));
        }
        Ok(page(records("similar", 10)))
    }

    async fn movie_recommendations(&self, _id: i64) -> anyhow::Result<MoviePage> {
        self.hit();
        Ok(page(records("recommended", 4)))
    }

    async fn watch_providers(
        &self,
        _id: i64,
        region: &str,
    ) -> anyhow::Result<Option<WatchProviders>> {
        self.hit();
        if region != "US" {
            return Ok(None);
        }
        Ok(Some(WatchProviders {
            link: None,
            flatrate: Some(vec![Provider {
                provider_id: 8,
                provider_name: "Streamer".to_string(),
                logo_path: Some("/logo.png".to_string()),
            }]),
            rent: None,
            buy: None,
        }))
    }

    async fn person(&self, id: i64) -> anyhow::Result<Person> {
        self.hit();
        Ok(Person {
            id,
            name: "Fixture Actor".to_string(),
            biography: "Bio".to_string(),
            birthday: Some("1964-09-02".to_string()),
            deathday: None,
            place_of_birth: None,
            profile_path: Some("/face.jpg".to_string()),
            known_for_department: Some("Acting".to_string()),
            external_ids: Some(ExternalIds {
                imdb_id: Some("nm0000206".to_string()),
                twitter_id: None,
                instagram_id: None,
                facebook_id: None,
            }),
        })
    }

    async fn person_movie_credits(&self, _id: i64) -> anyhow::Result<Vec<PersonCredit>> {
        self.hit();
        let credit = |id: i64, date: Option<&str>| PersonCredit {
            id,
            title: format!("Credit {id}"),
            character: None,
            release_date: date.map(|d| d.to_string()),
            poster_path: None,
            vote_average: 6.5,
        };
        Ok(vec![
            credit(1, Some("1999-03-31")),
            credit(2, Some("2019-05-17")),
            credit(3, None),
            credit(4, Some("2019-01-01")),
        ])
    }
}
