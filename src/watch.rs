use crate::models::Videos;
use serde::Serialize;

const YOUTUBE_EMBED: &str = "https://www.youtube.com/embed";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedLink {
    pub name: String,
    pub url: String,
}

/// Picks a YouTube trailer, falling back to a teaser.
pub fn trailer_embed(videos: &Videos) -> Option<EmbedLink> {
    let youtube = |kind: &str| {
        videos
            .results
            .iter()
            .find(|v| v.site.eq_ignore_ascii_case("YouTube") && v.video_type == kind)
    };
    youtube("Trailer").or_else(|| youtube("Teaser")).map(|v| EmbedLink {
        name: v.name.clone(),
        url: format!("{YOUTUBE_EMBED}/{}?autoplay=1", v.key),
    })
}

/// Fills the configured player template for a movie. Without a template there is no player.
pub fn player_embed(template: Option<&str>, movie_id: i64) -> Option<EmbedLink> {
    template.map(|t| EmbedLink {
        name: "Watch".to_string(),
        url: t.replace("{id}", &movie_id.to_string()),
    })
}
