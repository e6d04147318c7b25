use std::{cmp::Reverse, collections::BTreeSet};

use serde::Deserialize;

use crate::models::Movie;

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum SortOption {
    #[default]
    YearDesc,
    YearAsc,
    DateAddedDesc,
    DateAddedAsc,
    TitleAsc,
    TitleDesc,
    RatingDesc,
    ViewsDesc,
}

impl SortOption {
    pub const ALL: [SortOption; 8] = [
        SortOption::YearDesc,
        SortOption::YearAsc,
        SortOption::DateAddedDesc,
        SortOption::DateAddedAsc,
        SortOption::TitleAsc,
        SortOption::TitleDesc,
        SortOption::RatingDesc,
        SortOption::ViewsDesc,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SortOption::YearDesc => "year_desc",
            SortOption::YearAsc => "year_asc",
            SortOption::DateAddedDesc => "date_added_desc",
            SortOption::DateAddedAsc => "date_added_asc",
            SortOption::TitleAsc => "title_asc",
            SortOption::TitleDesc => "title_desc",
            SortOption::RatingDesc => "rating_desc",
            SortOption::ViewsDesc => "views_desc",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortOption::YearDesc => "Newest release",
            SortOption::YearAsc => "Oldest release",
            SortOption::DateAddedDesc => "Recently added",
            SortOption::DateAddedAsc => "First added",
            SortOption::TitleAsc => "Title (A-Z)",
            SortOption::TitleDesc => "Title (Z-A)",
            SortOption::RatingDesc => "Best rated",
            SortOption::ViewsDesc => "Most viewed",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    #[default]
    Grid,
    List,
}

/// Library page query string.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct LibraryQuery {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub favorites: bool,
    #[serde(default)]
    pub sort: SortOption,
    #[serde(default)]
    pub view: ViewMode,
}

impl LibraryQuery {
    fn search_term(&self) -> Option<String> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty()).map(str::to_lowercase)
    }

    fn category_filter(&self) -> Option<&str> {
        self.category.as_deref().map(str::trim).filter(|c| !c.is_empty() && *c != "all")
    }

    /// Filters then sorts a copy of the library.
    pub fn apply<'a>(&self, movies: &'a [Movie]) -> Vec<&'a Movie> {
        let term = self.search_term();
        let category = self.category_filter();

        let mut out: Vec<&Movie> = movies
            .iter()
            .filter(|m| term.as_deref().is_none_or(|t| matches_search(m, t)))
            .filter(|m| category.is_none_or(|c| m.category == c))
            .filter(|m| !self.favorites || m.is_favorite)
            .collect();

        sort(&mut out, self.sort);
        out
    }
}

fn matches_search(movie: &Movie, term: &str) -> bool {
    movie.title.to_lowercase().contains(term)
        || movie.description.to_lowercase().contains(term)
        || movie.tags.iter().any(|tag| tag.to_lowercase().contains(term))
}

pub fn sort(movies: &mut [&Movie], option: SortOption) {
    match option {
        SortOption::YearDesc => movies.sort_by_key(|m| Reverse(m.year.unwrap_or(0))),
        SortOption::YearAsc => movies.sort_by_key(|m| m.year.unwrap_or(0)),
        SortOption::DateAddedDesc => movies.sort_by_key(|m| Reverse(m.created_at)),
        SortOption::DateAddedAsc => movies.sort_by_key(|m| m.created_at),
        SortOption::TitleAsc => movies.sort_by_cached_key(|m| m.title.to_lowercase()),
        SortOption::TitleDesc => movies.sort_by_cached_key(|m| Reverse(m.title.to_lowercase())),
        SortOption::RatingDesc => movies.sort_by(|a, b| b.rating.total_cmp(&a.rating)),
        SortOption::ViewsDesc => movies.sort_by_key(|m| Reverse(m.view_count)),
    }
}

/// Distinct categories present in the library, sorted.
pub fn categories(movies: &[Movie]) -> Vec<String> {
    movies.iter().map(|m| m.category.clone()).collect::<BTreeSet<_>>().into_iter().collect()
}

#[derive(Clone, Debug, PartialEq)]
pub struct LibraryStats {
    pub total: usize,
    pub favorites: usize,
    pub total_views: u64,
    pub average_rating: f64,
}

impl LibraryStats {
    pub fn compute(movies: &[Movie]) -> Self {
        let total = movies.len();
        let average_rating = if total == 0 {
            0.0
        } else {
            movies.iter().map(|m| m.rating).sum::<f64>() / total as f64
        };
        Self {
            total,
            favorites: movies.iter().filter(|m| m.is_favorite).count(),
            total_views: movies.iter().map(|m| m.view_count).sum(),
            average_rating,
        }
    }

    pub fn average_rating_display(&self) -> String {
        format!("{:.1}", self.average_rating)
    }
}

/// Other titles ranked by resemblance: same category, close release year,
/// shared tags.
pub fn similar_to<'a>(movie: &Movie, all: &'a [Movie], limit: usize) -> Vec<&'a Movie> {
    let mut scored: Vec<(u8, &Movie)> = all
        .iter()
        .filter(|m| m.id != movie.id)
        .map(|m| (similarity(movie, m), m))
        .collect();
    scored.sort_by_key(|(score, _)| Reverse(*score));
    scored.into_iter().take(limit).map(|(_, m)| m).collect()
}

fn similarity(reference: &Movie, other: &Movie) -> u8 {
    let mut score = 0;
    if other.category == reference.category {
        score += 3;
    }
    if other.year.unwrap_or(0).abs_diff(reference.year.unwrap_or(0)) <= 5 {
        score += 2;
    }
    if other.tags.iter().any(|t| reference.tags.contains(t)) {
        score += 1;
    }
    score
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;

    use super::*;
    use crate::models::ContentType;

    fn movie(id: &str, title: &str) -> Movie {
        Movie {
            id: id.into(),
            user_id: "owner".into(),
            title: title.into(),
            description: String::new(),
            iframe_url: format!("https://v.example/{id}"),
            cover_image: String::new(),
            backdrop_url: None,
            rating: 0.0,
            category: "Uncategorized".into(),
            tags: Vec::new(),
            duration: String::new(),
            year: None,
            is_favorite: false,
            view_count: 0,
            last_viewed_at: None,
            content_type: ContentType::Film,
            episodes: Vec::new(),
            created_at: Timestamp::UNIX_EPOCH,
            updated_at: Timestamp::UNIX_EPOCH,
        }
    }

    fn library() -> Vec<Movie> {
        let mut heat = movie("1", "Heat");
        heat.category = "Crime".into();
        heat.year = Some(1995);
        heat.rating = 4.5;
        heat.tags = vec!["Heist".into()];
        heat.is_favorite = true;
        heat.view_count = 3;

        let mut alien = movie("2", "alien");
        alien.category = "Science-Fiction".into();
        alien.year = Some(1979);
        alien.rating = 5.0;
        alien.description = "In space no one can hear you scream".into();
        alien.view_count = 10;

        let mut ronin = movie("3", "Ronin");
        ronin.category = "Crime".into();
        ronin.year = Some(1998);
        ronin.rating = 3.0;
        ronin.tags = vec!["heist".into(), "paris".into()];

        let undated = movie("4", "Zodiac");
        vec![heat, alien, ronin, undated]
    }

    fn ids(movies: &[&Movie]) -> Vec<String> {
        movies.iter().map(|m| m.id.clone()).collect()
    }

    #[test]
    fn search_matches_title_description_and_tags() {
        let lib = library();
        let by_title = LibraryQuery { q: Some("RON".into()), ..Default::default() };
        assert_eq!(ids(&by_title.apply(&lib)), vec!["3"]);

        let by_description = LibraryQuery { q: Some("space".into()), ..Default::default() };
        assert_eq!(ids(&by_description.apply(&lib)), vec!["2"]);

        let by_tag = LibraryQuery {
            q: Some("heist".into()),
            sort: SortOption::TitleAsc,
            ..Default::default()
        };
        assert_eq!(ids(&by_tag.apply(&lib)), vec!["1", "3"]);
    }

    #[test]
    fn category_and_favorite_filters_combine() {
        let lib = library();
        let crime = LibraryQuery { category: Some("Crime".into()), ..Default::default() };
        assert_eq!(ids(&crime.apply(&lib)), vec!["3", "1"]);

        let fav =
            LibraryQuery { category: Some("Crime".into()), favorites: true, ..Default::default() };
        assert_eq!(ids(&fav.apply(&lib)), vec!["1"]);

        let all = LibraryQuery { category: Some("all".into()), ..Default::default() };
        assert_eq!(all.apply(&lib).len(), 4);
    }

    #[test]
    fn sort_options_order_as_labelled() {
        let lib = library();
        let order = |sort| ids(&LibraryQuery { sort, ..Default::default() }.apply(&lib));

        assert_eq!(order(SortOption::YearDesc), vec!["3", "1", "2", "4"]);
        assert_eq!(order(SortOption::YearAsc), vec!["4", "2", "1", "3"]);
        assert_eq!(order(SortOption::TitleAsc), vec!["2", "1", "3", "4"]);
        assert_eq!(order(SortOption::TitleDesc), vec!["4", "3", "1", "2"]);
        assert_eq!(order(SortOption::RatingDesc), vec!["2", "1", "3", "4"]);
        assert_eq!(order(SortOption::ViewsDesc), vec!["2", "1", "3", "4"]);
    }

    #[test]
    fn sort_query_values_deserialize() {
        let raw = r#"{"sort":"date_added_asc","view":"list","favorites":true}"#;
        let q: LibraryQuery = serde_json::from_str(raw).unwrap();
        assert_eq!(q.sort, SortOption::DateAddedAsc);
        assert_eq!(q.view, ViewMode::List);
        assert!(q.favorites);
        for option in SortOption::ALL {
            let parsed: SortOption = serde_json::from_value(option.as_str().into()).unwrap();
            assert_eq!(parsed, option);
        }
    }

    #[test]
    fn categories_are_distinct_and_sorted() {
        assert_eq!(categories(&library()), vec!["Crime", "Science-Fiction", "Uncategorized"]);
    }

    #[test]
    fn stats_summarise_library() {
        let stats = LibraryStats::compute(&library());
        assert_eq!(stats.total, 4);
        assert_eq!(stats.favorites, 1);
        assert_eq!(stats.total_views, 13);
        assert_eq!(stats.average_rating_display(), "3.1");

        assert_eq!(LibraryStats::compute(&[]).average_rating_display(), "0.0");
    }

    #[test]
    fn similar_prefers_category_then_year_then_tags() {
        let lib = library();
        let similar = similar_to(&lib[0], &lib, 10);
        assert_eq!(ids(&similar), vec!["3", "2", "4"]);
        assert_eq!(similar_to(&lib[0], &lib, 1).len(), 1);
    }

    #[test]
    fn similar_handles_extreme_years() {
        let mut far_future = movie("a", "Far Future");
        far_future.year = Some(2_000_000_000);
        let mut far_past = movie("b", "Far Past");
        far_past.year = Some(-2_000_000_000);
        let mut last = movie("c", "Last Year");
        last.year = Some(i32::MAX);

        let lib = vec![far_future.clone(), far_past, last];
        let similar = similar_to(&far_future, &lib, 10);
        assert_eq!(ids(&similar), vec!["b", "c"]);
        assert_eq!(similarity(&far_future, &lib[1]), 3);
        assert_eq!(similarity(&far_future, &lib[2]), 3);
    }
}
