use maud::{DOCTYPE, Markup, PreEscaped, html};

use crate::{
    library::{LibraryQuery, LibraryStats, SortOption, ViewMode},
    models::{self, ContentType, MAX_RATING, Movie, MovieForm, SUGGESTED_CATEGORIES, Theme},
    player::{PlaybackSource, PlayerView},
};

const TAILWIND_CDN: &str = "https://cdn.tailwindcss.com";
const DATASTAR_CDN: &str =
    "https://cdn.jsdelivr.net/npm/@sudodevnull/datastar@0.19.9/dist/datastar.js";

const INPUT: &str = "mt-1 w-full rounded-md border border-slate-300 bg-white px-3 py-2 text-slate-900 dark:border-slate-600 dark:bg-slate-800 dark:text-slate-100 focus:border-blue-500 focus:outline-none";
const BUTTON: &str = "rounded-md bg-blue-600 px-4 py-2 font-semibold text-white hover:bg-blue-700";
const LINK: &str = "text-sm text-blue-600 hover:text-blue-800 dark:text-blue-400";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AuthMode {
    SignIn,
    SignUp,
}

pub fn auth_page(mode: AuthMode, theme: Theme, email: &str, error: Option<&str>) -> String {
    let (heading, action, submit, alt_text, alt_href, alt_label) = match mode {
        AuthMode::SignIn => {
            ("Sign in", "/login", "Sign in", "No account yet?", "/signup", "Create one")
        },
        AuthMode::SignUp => {
            ("Create an account", "/signup", "Sign up", "Already registered?", "/login", "Sign in")
        },
    };

    page(
        heading,
        theme,
        html! {
            div class="min-h-screen flex items-center justify-center px-6" {
                div class="w-full max-w-md rounded-lg bg-white p-8 shadow dark:bg-slate-900" {
                    h1 class="text-2xl font-bold" { "reelshelf" }
                    p class="mt-1 text-slate-500" { (heading) }

                    @if let Some(error) = error {
                        div class="mt-4 rounded-md bg-red-50 px-4 py-3 text-sm text-red-700 dark:bg-red-950 dark:text-red-300" { (error) }
                    }

                    form class="mt-6 space-y-4" method="post" action=(action) {
                        div {
                            label class="block text-sm font-medium" for="email" { "Email" }
                            input class=(INPUT) type="email" name="email" id="email" value=(email) required;
                        }
                        div {
                            label class="block text-sm font-medium" for="password" { "Password" }
                            input class=(INPUT) type="password" name="password" id="password" required;
                        }
                        button class=(format!("w-full {BUTTON}")) type="submit" { (submit) }
                    }

                    p class="mt-6 text-sm text-slate-500" {
                        (alt_text) " " a class=(LINK) href=(alt_href) { (alt_label) }
                    }
                }
            }
        },
    )
}

pub struct LibraryPage<'a> {
    pub email: &'a str,
    pub theme: Theme,
    pub query: &'a LibraryQuery,
    pub movies: &'a [&'a Movie],
    pub categories: &'a [String],
    pub stats: &'a LibraryStats,
    pub notice: Option<String>,
}

pub fn library_page(p: &LibraryPage<'_>) -> String {
    let selected_category = p.query.category.as_deref().unwrap_or("all");
    let list_classes = match p.query.view {
        ViewMode::Grid => "mt-6 grid gap-6 sm:grid-cols-2 lg:grid-cols-4",
        ViewMode::List => "mt-6 space-y-3",
    };

    page(
        "Library",
        p.theme,
        html! {
            header class="border-b border-slate-200 bg-white dark:border-slate-800 dark:bg-slate-900" {
                div class="mx-auto flex max-w-7xl items-center justify-between gap-4 px-6 py-4" {
                    h1 class="text-2xl font-bold" { "reelshelf" }
                    div class="flex items-center gap-3 text-sm" {
                        span class="text-slate-500" { (p.email) }
                        form method="post" action="/theme" {
                            button class="rounded-md border px-3 py-1" type="submit" {
                                @if p.theme == Theme::Dark { "Light mode" } @else { "Dark mode" }
                            }
                        }
                        a class=(BUTTON) href="/movies/new" { "Add" }
                        form method="post" action="/logout" {
                            button class="rounded-md border px-3 py-1" type="submit" { "Sign out" }
                        }
                    }
                }
            }

            main class="mx-auto max-w-7xl px-6 py-8" {
                (stats_bar(p.stats))

                @if let Some(notice) = &p.notice {
                    div class="mt-6 rounded-md bg-green-50 px-4 py-3 text-sm text-green-800 dark:bg-green-950 dark:text-green-300" { (notice) }
                }

                form class="mt-6 flex flex-wrap items-end gap-3" method="get" action="/" {
                    input class=(INPUT) style="max-width: 20rem" type="search" name="q" placeholder="Search titles, descriptions, tags" value=(p.query.q.as_deref().unwrap_or(""));
                    select class=(INPUT) style="max-width: 14rem" name="category" {
                        option value="all" selected[selected_category == "all"] { "All categories" }
                        @for cat in p.categories {
                            option value=(cat) selected[selected_category == cat.as_str()] { (cat) }
                        }
                    }
                    select class=(INPUT) style="max-width: 14rem" name="sort" {
                        @for sort in SortOption::ALL {
                            option value=(sort.as_str()) selected[p.query.sort == sort] { (sort.label()) }
                        }
                    }
                    select class=(INPUT) style="max-width: 8rem" name="view" {
                        option value="grid" selected[p.query.view == ViewMode::Grid] { "Grid" }
                        option value="list" selected[p.query.view == ViewMode::List] { "List" }
                    }
                    label class="flex items-center gap-2 text-sm" {
                        input type="checkbox" name="favorites" value="true" checked[p.query.favorites];
                        "Favorites only"
                    }
                    button class=(BUTTON) type="submit" { "Apply" }
                }

                @if p.movies.is_empty() {
                    div class="mt-10 rounded-lg bg-white p-8 text-slate-500 shadow dark:bg-slate-900" {
                        "Nothing here yet. Add a title or import a CSV file."
                    }
                } @else {
                    div class=(list_classes) {
                        @for movie in p.movies {
                            (movie_card(movie, p.query.view))
                        }
                    }
                }

                (csv_manager())
            }
        },
    )
}

fn stats_bar(stats: &LibraryStats) -> Markup {
    html! {
        div class="grid grid-cols-2 gap-4 md:grid-cols-4" {
            (stat("Titles", stats.total.to_string()))
            (stat("Favorites", stats.favorites.to_string()))
            (stat("Views", stats.total_views.to_string()))
            (stat("Average rating", stats.average_rating_display()))
        }
    }
}

fn stat(label: &str, value: String) -> Markup {
    html! {
        div class="rounded-lg bg-white p-4 shadow dark:bg-slate-900" {
            p class="text-sm text-slate-500" { (label) }
            p class="text-2xl font-bold" { (value) }
        }
    }
}

fn movie_card(movie: &Movie, view: ViewMode) -> Markup {
    let container = match view {
        ViewMode::Grid => "overflow-hidden rounded-lg bg-white shadow dark:bg-slate-900",
        ViewMode::List => "flex gap-4 overflow-hidden rounded-lg bg-white shadow dark:bg-slate-900",
    };
    let cover = match view {
        ViewMode::Grid => "aspect-[2/3] w-full object-cover",
        ViewMode::List => "h-32 w-24 flex-shrink-0 object-cover",
    };

    html! {
        article class=(container) data-movie-id=(movie.id) {
            a href=(format!("/play/{}", movie.id)) {
                @if movie.cover_image.is_empty() {
                    div class=(format!("{cover} bg-slate-200 dark:bg-slate-800")) {}
                } @else {
                    img class=(cover) src=(movie.cover_image) alt=(movie.title) loading="lazy";
                }
            }
            div class="flex-1 p-4" {
                div class="flex items-start justify-between gap-2" {
                    h2 class="font-semibold" {
                        a href=(format!("/play/{}", movie.id)) { (movie.title) }
                    }
                    form method="post" action=(format!("/movies/{}/favorite", movie.id)) {
                        button type="submit" title=(if movie.is_favorite { "Remove from favorites" } else { "Add to favorites" }) {
                            @if movie.is_favorite { "♥" } @else { "♡" }
                        }
                    }
                }
                p class="mt-1 text-sm text-slate-500" { (meta_line(movie)) }
                div class="mt-2 flex items-center gap-2 text-sm" {
                    span class="text-amber-500" { (stars(movie.rating)) }
                    span class="text-slate-500" { (movie.rating) "/" (MAX_RATING) }
                    span class="text-slate-400" { "· " (movie.view_count) " views" }
                }
                @if !movie.tags.is_empty() {
                    div class="mt-2 flex flex-wrap gap-1" {
                        @for tag in &movie.tags {
                            span class="rounded bg-slate-100 px-2 py-0.5 text-xs dark:bg-slate-800" { (tag) }
                        }
                    }
                }
                div class="mt-3 flex items-center gap-3 text-sm" {
                    form class="flex items-center gap-1" method="post" action=(format!("/movies/{}/rating", movie.id)) {
                        select class="rounded border px-1 dark:bg-slate-800" name="rating" {
                            @for step in 0..=10u8 {
                                @let value = f64::from(step) / 2.0;
                                option value=(value) selected[value == movie.rating] { (value) }
                            }
                        }
                        button class=(LINK) type="submit" { "Rate" }
                    }
                    a class=(LINK) href=(format!("/movies/{}/edit", movie.id)) { "Edit" }
                    form method="post" action=(format!("/movies/{}/delete", movie.id)) {
                        button class="text-sm text-red-600 hover:text-red-800" type="submit" { "Delete" }
                    }
                }
            }
        }
    }
}

fn meta_line(movie: &Movie) -> String {
    let mut parts = Vec::new();
    if let Some(year) = movie.year {
        parts.push(year.to_string());
    }
    parts.push(movie.category.clone());
    if !movie.duration.is_empty() {
        parts.push(movie.duration.clone());
    }
    if movie.content_type == ContentType::Series {
        parts.push(format!("{} episodes", movie.episodes.len()));
    }
    parts.join(" • ")
}

fn stars(rating: f64) -> String {
    let full = rating.floor() as usize;
    let half = usize::from(rating - rating.floor() >= 0.5);
    let empty = (MAX_RATING as usize).saturating_sub(full + half);
    format!("{}{}{}", "★".repeat(full), "⯪".repeat(half), "☆".repeat(empty))
}

fn csv_manager() -> Markup {
    html! {
        section class="mt-12 rounded-lg bg-white p-6 shadow dark:bg-slate-900" {
            h2 class="text-lg font-semibold" { "Import / export" }
            div class="mt-4 flex flex-wrap items-center gap-4" {
                a class=(BUTTON) href="/csv/export" { "Export CSV" }
                a class=(LINK) href="/csv/template" { "Download template" }
                form
                    class="flex flex-col gap-2"
                    method="post"
                    action="/csv/import"
                    enctype="multipart/form-data"
                {
                    input type="file" name="file" accept=".csv,text/csv";
                    textarea
                        class=(INPUT)
                        name="csv_text"
                        rows="4"
                        placeholder="...or paste CSV text here" {}
                    button class=(BUTTON) type="submit" { "Import" }
                }
            }
            ul class="mt-4 space-y-1 text-sm text-slate-500" {
                li { "Columns: title, description, iframe_url, cover_image, rating, category, tags, duration, year" }
                li { "Separate tags with a pipe: action|thriller|2024" }
                li { "title and iframe_url are required; other rows are skipped" }
            }
        }
    }
}

pub fn movie_form_page(
    theme: Theme,
    editing: Option<&Movie>,
    form: &MovieForm,
    error: Option<&str>,
) -> String {
    let (heading, action) = match editing {
        Some(movie) => ("Edit title", format!("/movies/{}", movie.id)),
        None => ("Add a title", "/movies".to_string()),
    };
    let is_series = form.content_type == ContentType::Series;

    page(
        heading,
        theme,
        html! {
            div class="mx-auto max-w-3xl px-6 py-10" {
                div class="flex items-center justify-between" {
                    h1 class="text-2xl font-bold" { (heading) }
                    a class=(LINK) href="/" { "Back to library" }
                }

                @if let Some(error) = error {
                    div class="mt-4 rounded-md bg-red-50 px-4 py-3 text-sm text-red-700 dark:bg-red-950 dark:text-red-300" { (error) }
                }

                form class="mt-6 space-y-4 rounded-lg bg-white p-6 shadow dark:bg-slate-900" method="post" action=(action) {
                    (field("Title", html! { input class=(INPUT) name="title" value=(form.title) required; }))
                    (field("Description", html! { textarea class=(INPUT) name="description" rows="3" { (form.description) } }))
                    (field("Type", html! {
                        select class=(INPUT) name="content_type" {
                            option value="film" selected[!is_series] { "Film" }
                            option value="series" selected[is_series] { "Series" }
                        }
                    }))
                    (field("Video URL (iframe)", html! { input class=(INPUT) type="url" name="iframe_url" value=(form.iframe_url); }))
                    (field("Episodes (series only, one per line: name | url | description)", html! {
                        textarea class=(INPUT) name="episodes" rows="5" { (models::format_episodes(&form.episodes)) }
                    }))
                    (field("Cover image URL", html! { input class=(INPUT) type="url" name="cover_image" value=(form.cover_image); }))
                    (field("Backdrop image URL", html! { input class=(INPUT) type="url" name="backdrop_url" value=(form.backdrop_url.as_deref().unwrap_or("")); }))
                    div class="grid gap-4 md:grid-cols-3" {
                        (field("Category", html! {
                            input class=(INPUT) name="category" list="categories" value=(form.category);
                            datalist id="categories" {
                                @for cat in SUGGESTED_CATEGORIES { option value=(cat) {} }
                            }
                        }))
                        (field("Year", html! { input class=(INPUT) type="number" name="year" min="1900" max="2100" value=(form.year.map(|y| y.to_string()).unwrap_or_default()); }))
                        (field("Duration", html! { input class=(INPUT) name="duration" placeholder="2h 15min" value=(form.duration); }))
                    }
                    div class="grid gap-4 md:grid-cols-2" {
                        (field("Rating", html! {
                            select class=(INPUT) name="rating" {
                                @for step in 0..=10u8 {
                                    @let value = f64::from(step) / 2.0;
                                    option value=(value) selected[value == form.rating] { (value) " ★" }
                                }
                            }
                        }))
                        (field("Tags (comma separated)", html! { input class=(INPUT) name="tags" value=(form.tags.join(", ")); }))
                    }
                    button class=(BUTTON) type="submit" { @if editing.is_some() { "Save changes" } @else { "Add" } }
                }
            }
        },
    )
}

fn field(label: &str, input: Markup) -> Markup {
    html! {
        div {
            label class="block text-sm font-medium" { (label) }
            (input)
        }
    }
}

pub fn player_page(theme: Theme, view: &PlayerView, similar: &[&Movie]) -> String {
    let movie = &view.record;
    let backdrop = movie
        .backdrop_url
        .as_deref()
        .map(|url| format!("background-image: linear-gradient(rgba(0,0,0,.7), rgba(0,0,0,.7)), url('{url}'); background-size: cover; background-position: center;"))
        .unwrap_or_default();

    page(
        &movie.title,
        theme,
        html! {
            div class="min-h-screen bg-black text-white" style=(backdrop) {
                div class="mx-auto flex max-w-6xl flex-col gap-4 px-4 py-4" {
                    div class="flex items-center justify-between gap-4" {
                        div class="min-w-0" {
                            h1 class="truncate text-xl font-bold" { (movie.title) }
                            p class="text-sm text-slate-300" { (meta_line(movie)) }
                        }
                        div class="flex items-center gap-2" {
                            form method="post" action="/player/favorite" {
                                button class="rounded px-2 py-1 hover:bg-white/20" type="submit" {
                                    @if movie.is_favorite { "♥ Favorite" } @else { "♡ Favorite" }
                                }
                            }
                            @if view.source.url().is_some() {
                                a class="rounded px-2 py-1 hover:bg-white/20" href="/player/external" target="_blank" rel="noopener noreferrer" { "Open in new window" }
                            }
                            form method="post" action="/player/close" {
                                button class="rounded px-2 py-1 hover:bg-white/20" type="submit" title="Close" { "✕" }
                            }
                        }
                    }

                    (frame_markup(view))

                    @if !movie.description.is_empty() {
                        div class="rounded bg-black/50 p-4" {
                            h2 class="text-sm font-semibold" { "Description" }
                            p class="mt-2 text-sm text-slate-300" { (movie.description) }
                            @if !movie.tags.is_empty() {
                                div class="mt-3 flex flex-wrap gap-2" {
                                    @for tag in &movie.tags {
                                        span class="rounded bg-white/10 px-2 py-0.5 text-xs" { (tag) }
                                    }
                                }
                            }
                        }
                    }

                    @if !similar.is_empty() {
                        div {
                            h2 class="text-sm font-semibold" { "You might also like" }
                            div class="mt-2 flex gap-3 overflow-x-auto" {
                                @for other in similar {
                                    a class="w-32 flex-shrink-0" href=(format!("/play/{}", other.id)) {
                                        @if !other.cover_image.is_empty() {
                                            img class="aspect-[2/3] w-full rounded object-cover" src=(other.cover_image) alt=(other.title) loading="lazy";
                                        }
                                        p class="mt-1 truncate text-xs" { (other.title) }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        },
    )
}

/// Playback area: episode controls, the embed and the advance status.
pub fn player_frame(view: &PlayerView) -> String {
    frame_markup(view).into_string()
}

/// Advance indicator. While an advance is pending it polls with the episode
/// it was rendered for, so the embed is only swapped on a real transition.
pub fn player_status(view: &PlayerView) -> String {
    status_markup(view).into_string()
}

fn status_markup(view: &PlayerView) -> Markup {
    let poll = view
        .advance_pending
        .then(|| format!("@get('/player/status?episode={}')", view.selected_episode));

    html! {
        div id="player-status" data-on-interval=[poll] {
            @if view.advance_pending {
                span class="text-xs text-slate-400" { "Next episode starts shortly" }
            }
        }
    }
}

fn frame_markup(view: &PlayerView) -> Markup {
    let movie = &view.record;

    html! {
        div id="player-frame" class="flex flex-col gap-3" {
            @if movie.has_episodes() {
                div class="flex flex-wrap items-center gap-3 rounded bg-black/50 p-3" {
                    form class="flex items-center gap-2" method="post" action="/player/episode" {
                        label class="text-sm text-slate-300" for="episode" { "Episode" }
                        select class="rounded bg-black/40 px-3 py-1" name="episode" id="episode" {
                            @for (idx, ep) in movie.episodes.iter().enumerate() {
                                option value=(idx) selected[idx == view.selected_episode] { (ep.name) }
                            }
                        }
                        button class="rounded bg-white/20 px-3 py-1 text-sm" type="submit" { "Play" }
                    }
                    form method="post" action="/player/auto-advance" {
                        button class="rounded bg-white/20 px-3 py-1 text-sm" type="submit" {
                            "Auto-play next: " @if view.auto_advance { "ON" } @else { "OFF" }
                        }
                    }
                    (status_markup(view))
                }
            }

            div class="relative w-full" style="aspect-ratio: 16 / 9" {
                @match &view.source {
                    PlaybackSource::Embed(url) => {
                        iframe class="absolute inset-0 h-full w-full" src=(url) allowfullscreen
                            allow="accelerometer; autoplay; clipboard-write; encrypted-media; gyroscope; picture-in-picture"
                            title=(format!("Player - {}", movie.title)) {}
                    }
                    PlaybackSource::Unavailable => {
                        div class="absolute inset-0 flex items-center justify-center bg-black/30" {
                            p class="text-slate-300" { "Video unavailable" }
                        }
                    }
                }
            }

            @if let Some(ep) = view.record.episodes.get(view.selected_episode).filter(|_| movie.has_episodes()) {
                @if let Some(desc) = &ep.description {
                    p class="text-sm text-slate-300" { (desc) }
                }
            }
        }
    }
}

pub fn error_page(message: &str) -> String {
    page(
        "Error",
        Theme::default(),
        html! {
            div class="min-h-screen flex items-center justify-center" {
                div class="max-w-xl w-full px-6" {
                    div class="rounded-lg bg-white p-8 shadow dark:bg-slate-900" {
                        h1 class="text-2xl font-bold" { "Error" }
                        p class="mt-4" { (message) }
                        a class=(format!("mt-6 inline-block {LINK}")) href="/" { "Back" }
                    }
                }
            }
        },
    )
}

fn page(title: &str, theme: Theme, body: Markup) -> String {
    html! {
        (DOCTYPE)
        html lang="en" class=(theme.as_str()) {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) " · reelshelf" }
                script { (PreEscaped("tailwind = window.tailwind || {}; tailwind.config = { darkMode: 'class' };")) }
                script src=(TAILWIND_CDN) {}
                script type="module" src=(DATASTAR_CDN) {}
            }
            body class="bg-slate-50 text-slate-900 dark:bg-slate-950 dark:text-slate-100" { (body) }
        }
    }
    .into_string()
}
