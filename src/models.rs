use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

pub const DEFAULT_CATEGORY: &str = "Uncategorized";
pub const MAX_RATING: f64 = 5.0;

/// Offered by the edit form; categories stay free text.
pub const SUGGESTED_CATEGORIES: &[&str] = &[
    "Uncategorized",
    "Action",
    "Animation",
    "Adventure",
    "Comedy",
    "Crime",
    "Documentary",
    "Drama",
    "Fantasy",
    "War",
    "Horror",
    "Mystery",
    "Romance",
    "Science-Fiction",
    "Thriller",
    "Western",
];

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Film,
    Series,
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Film => "film",
            ContentType::Series => "series",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "film" | "movie" => Some(ContentType::Film),
            "series" => Some(ContentType::Series),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One catalog entry as stored for an owner.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Movie {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub iframe_url: String,
    pub cover_image: String,
    pub backdrop_url: Option<String>,
    pub rating: f64,
    pub category: String,
    pub tags: Vec<String>,
    pub duration: String,
    pub year: Option<i32>,
    pub is_favorite: bool,
    pub view_count: u64,
    pub last_viewed_at: Option<Timestamp>,
    pub content_type: ContentType,
    pub episodes: Vec<Episode>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Movie {
    pub fn is_series(&self) -> bool {
        self.content_type == ContentType::Series
    }

    /// A series that actually carries episodes; only these switch sources per episode.
    pub fn has_episodes(&self) -> bool {
        self.is_series() && !self.episodes.is_empty()
    }
}

/// User-editable fields of a record, as produced by the edit form or a CSV row.
#[derive(Clone, Debug, PartialEq)]
pub struct MovieForm {
    pub title: String,
    pub description: String,
    pub iframe_url: String,
    pub cover_image: String,
    pub backdrop_url: Option<String>,
    pub rating: f64,
    pub category: String,
    pub tags: Vec<String>,
    pub duration: String,
    pub year: Option<i32>,
    pub content_type: ContentType,
    pub episodes: Vec<Episode>,
}

impl Default for MovieForm {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            iframe_url: String::new(),
            cover_image: String::new(),
            backdrop_url: None,
            rating: 0.0,
            category: DEFAULT_CATEGORY.to_string(),
            tags: Vec::new(),
            duration: String::new(),
            year: None,
            content_type: ContentType::Film,
            episodes: Vec::new(),
        }
    }
}

impl MovieForm {
    pub fn from_movie(movie: &Movie) -> Self {
        Self {
            title: movie.title.clone(),
            description: movie.description.clone(),
            iframe_url: movie.iframe_url.clone(),
            cover_image: movie.cover_image.clone(),
            backdrop_url: movie.backdrop_url.clone(),
            rating: movie.rating,
            category: movie.category.clone(),
            tags: movie.tags.clone(),
            duration: movie.duration.clone(),
            year: movie.year,
            content_type: movie.content_type,
            episodes: movie.episodes.clone(),
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.title.trim().is_empty() {
            return Err(AppError::BadRequest("title is required".into()));
        }
        if self.content_type == ContentType::Film && self.iframe_url.trim().is_empty() {
            return Err(AppError::BadRequest("a film needs a video URL".into()));
        }
        if !is_valid_rating(self.rating) {
            return Err(AppError::BadRequest(format!("rating must be between 0 and {MAX_RATING}")));
        }
        if let Some(ep) = self.episodes.iter().find(|e| e.url.trim().is_empty()) {
            return Err(AppError::BadRequest(format!("episode \"{}\" has no URL", ep.name)));
        }
        Ok(())
    }

    /// Category with the blank case folded into the default.
    pub fn category_or_default(&self) -> &str {
        let category = self.category.trim();
        if category.is_empty() { DEFAULT_CATEGORY } else { category }
    }
}

/// Targeted single-field updates. `None` leaves the column untouched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MoviePatch {
    pub is_favorite: Option<bool>,
    pub rating: Option<f64>,
    pub view_count: Option<u64>,
    pub last_viewed_at: Option<Timestamp>,
}

pub fn is_valid_rating(rating: f64) -> bool {
    rating.is_finite() && (0.0..=MAX_RATING).contains(&rating)
}

pub fn clamp_rating(rating: f64) -> f64 {
    if rating.is_finite() { rating.clamp(0.0, MAX_RATING) } else { 0.0 }
}

/// Raw add/edit form submission.
#[derive(Debug, Default, Deserialize)]
pub struct MovieFormInput {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub iframe_url: String,
    #[serde(default)]
    pub cover_image: String,
    #[serde(default)]
    pub backdrop_url: String,
    #[serde(default)]
    pub rating: String,
    #[serde(default)]
    pub category: String,
    /// Comma separated.
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub content_type: String,
    /// One episode per line, see [`parse_episodes`].
    #[serde(default)]
    pub episodes: String,
}

impl MovieFormInput {
    pub fn into_form(self) -> AppResult<MovieForm> {
        let rating = match self.rating.trim() {
            "" => 0.0,
            s => s
                .parse::<f64>()
                .map_err(|_| AppError::BadRequest(format!("invalid rating: {s}")))?,
        };
        let year = match self.year.trim() {
            "" => None,
            s => Some(
                s.parse::<i32>()
                    .map_err(|_| AppError::BadRequest(format!("invalid year: {s}")))?,
            ),
        };
        let content_type = match self.content_type.trim() {
            "" => ContentType::Film,
            s => ContentType::from_code(s)
                .ok_or_else(|| AppError::BadRequest(format!("unknown content type: {s}")))?,
        };
        let episodes = if content_type == ContentType::Series {
            parse_episodes(&self.episodes)
        } else {
            Vec::new()
        };

        let form = MovieForm {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            iframe_url: self.iframe_url.trim().to_string(),
            cover_image: self.cover_image.trim().to_string(),
            backdrop_url: Some(self.backdrop_url.trim().to_string()).filter(|s| !s.is_empty()),
            rating,
            category: self.category.trim().to_string(),
            tags: split_tags(&self.tags, ','),
            duration: self.duration.trim().to_string(),
            year,
            content_type,
            episodes,
        };
        form.validate()?;
        Ok(form)
    }
}

pub fn split_tags(raw: &str, sep: char) -> Vec<String> {
    raw.split(sep).map(str::trim).filter(|t| !t.is_empty()).map(str::to_string).collect()
}

/// Parses the episode textarea: `name | url | description`, one per line.
///
/// A line without `|` is taken as a bare URL and named after its position.
pub fn parse_episodes(text: &str) -> Vec<Episode> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(idx, line)| {
            let mut parts = line.splitn(3, '|').map(str::trim);
            let first = parts.next().unwrap_or_default();
            match parts.next() {
                Some(url) => Episode {
                    name: if first.is_empty() {
                        default_episode_name(idx)
                    } else {
                        first.to_string()
                    },
                    url: url.to_string(),
                    description: parts.next().filter(|d| !d.is_empty()).map(str::to_string),
                },
                None => Episode {
                    name: default_episode_name(idx),
                    url: first.to_string(),
                    description: None,
                },
            }
        })
        .collect()
}

pub fn format_episodes(episodes: &[Episode]) -> String {
    episodes
        .iter()
        .map(|ep| match &ep.description {
            Some(desc) => format!("{} | {} | {}", ep.name, ep.url, desc),
            None => format!("{} | {}", ep.name, ep.url),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn default_episode_name(idx: usize) -> String {
    format!("Episode {}", idx + 1)
}

pub const THEME_COOKIE: &str = "movie-theme";

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    /// Unknown or missing values fall back to dark.
    pub fn from_cookie(value: Option<&str>) -> Self {
        match value {
            Some("light") => Theme::Light,
            _ => Theme::Dark,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}
