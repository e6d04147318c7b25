use std::sync::Arc;

use axum::{
    extract::{Form, FromRequestParts, Multipart, Path, Query, State},
    http::{HeaderValue, StatusCode, header, request::Parts},
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use cookie::{Cookie, SameSite};
use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    AppState,
    auth::{SESSION_COOKIE, User},
    csv,
    error::{AppError, AppResult},
    library::{self, LibraryQuery, LibraryStats},
    models::{MovieForm, MovieFormInput, THEME_COOKIE, Theme},
    player::PlaybackSession,
    templates::{self, AuthMode, LibraryPage},
};

/// The signed-in user behind the session cookie.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub User);

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar.get(SESSION_COOKIE).ok_or(AppError::Unauthorized)?.value().to_string();
        let user = state.auth.current_user(&token).await?.ok_or(AppError::Unauthorized)?;
        Ok(Self(user))
    }
}

fn theme(jar: &CookieJar) -> Theme {
    Theme::from_cookie(jar.get(THEME_COOKIE).map(|c| c.value()))
}

#[derive(Debug, Deserialize)]
pub struct Credentials {
    email: String,
    password: String,
}

pub async fn login_page(jar: CookieJar) -> Html<String> {
    Html(templates::auth_page(AuthMode::SignIn, theme(&jar), "", None))
}

pub async fn signup_page(jar: CookieJar) -> Html<String> {
    Html(templates::auth_page(AuthMode::SignUp, theme(&jar), "", None))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(creds): Form<Credentials>,
) -> AppResult<Response> {
    let result = state.auth.sign_in(&creds.email, &creds.password).await;
    authenticated(&state, jar, AuthMode::SignIn, &creds.email, result)
}

pub async fn signup(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(creds): Form<Credentials>,
) -> AppResult<Response> {
    let result = state.auth.sign_up(&creds.email, &creds.password).await;
    authenticated(&state, jar, AuthMode::SignUp, &creds.email, result)
}

/// Sets the session cookie, or re-renders the form with the auth error inline.
fn authenticated(
    state: &AppState,
    jar: CookieJar,
    mode: AuthMode,
    email: &str,
    result: AppResult<(User, String)>,
) -> AppResult<Response> {
    match result {
        Ok((user, token)) => {
            info!(user_id = %user.id, "session started");
            let cookie = Cookie::build((SESSION_COOKIE, token))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax)
                .secure(state.config.secure_cookies)
                .max_age(time::Duration::days(state.config.session_ttl_days));
            Ok((jar.add(cookie), Redirect::to("/")).into_response())
        },
        Err(AppError::Auth(err)) => {
            let body = templates::auth_page(mode, theme(&jar), email, Some(&err.to_string()));
            Ok((StatusCode::BAD_REQUEST, Html(body)).into_response())
        },
        Err(err) => Err(err),
    }
}

pub async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> AppResult<Response> {
    if let Some(token) = jar.get(SESSION_COOKIE).map(|c| c.value().to_string()) {
        if let Some(user) = state.auth.current_user(&token).await? {
            state.players.remove(&user.id);
        }
        state.auth.sign_out(&token).await?;
    }
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    Ok((jar, Redirect::to("/login")).into_response())
}

pub async fn toggle_theme(jar: CookieJar) -> impl IntoResponse {
    let next = theme(&jar).toggled();
    let cookie = Cookie::build((THEME_COOKIE, next.as_str()))
        .path("/")
        .same_site(SameSite::Lax)
        .max_age(time::Duration::days(365));
    (jar.add(cookie), Redirect::to("/"))
}

#[derive(Debug, Default, Deserialize)]
pub struct ImportNotice {
    imported: Option<usize>,
    failed: Option<usize>,
}

impl ImportNotice {
    fn message(&self) -> Option<String> {
        let imported = self.imported?;
        Some(match self.failed.unwrap_or(0) {
            0 => format!("Imported {imported} titles."),
            failed => format!("Imported {imported} titles, {failed} failed."),
        })
    }
}

pub async fn index(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    jar: CookieJar,
    Query(query): Query<LibraryQuery>,
    Query(notice): Query<ImportNotice>,
) -> AppResult<Html<String>> {
    let movies = state.movies.list(&user.id).await?;
    let visible = query.apply(&movies);
    let categories = library::categories(&movies);
    let stats = LibraryStats::compute(&movies);

    Ok(Html(templates::library_page(&LibraryPage {
        email: &user.email,
        theme: theme(&jar),
        query: &query,
        movies: &visible,
        categories: &categories,
        stats: &stats,
        notice: notice.message(),
    })))
}

pub async fn new_movie(CurrentUser(_): CurrentUser, jar: CookieJar) -> Html<String> {
    Html(templates::movie_form_page(theme(&jar), None, &MovieForm::default(), None))
}

pub async fn create_movie(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Form(input): Form<MovieFormInput>,
) -> AppResult<Redirect> {
    let form = input.into_form()?;
    let movie = state.movies.insert(&user.id, &form).await?;
    info!(owner = %user.id, movie_id = %movie.id, "movie added");
    Ok(Redirect::to("/"))
}

pub async fn edit_movie(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    jar: CookieJar,
    Path(id): Path<String>,
) -> AppResult<Html<String>> {
    let movie = state.movies.get(&user.id, &id).await?;
    let form = MovieForm::from_movie(&movie);
    Ok(Html(templates::movie_form_page(theme(&jar), Some(&movie), &form, None)))
}

pub async fn update_movie(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Form(input): Form<MovieFormInput>,
) -> AppResult<Redirect> {
    let form = input.into_form()?;
    let movie = state.movies.replace(&user.id, &id, &form).await?;
    state.players.refresh(&user.id, &movie);
    Ok(Redirect::to("/"))
}

pub async fn delete_movie(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Redirect> {
    state.movies.delete(&user.id, &id).await?;
    state.players.forget(&user.id, &id);
    info!(owner = %user.id, movie_id = %id, "movie deleted");
    Ok(Redirect::to("/"))
}

pub async fn toggle_favorite(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Redirect> {
    let movie = state.movies.get(&user.id, &id).await?;
    let movie = state.movies.set_favorite(&user.id, &id, !movie.is_favorite).await?;
    state.players.refresh(&user.id, &movie);
    Ok(Redirect::to("/"))
}

#[derive(Debug, Deserialize)]
pub struct RatingInput {
    rating: String,
}

pub async fn rate_movie(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Form(input): Form<RatingInput>,
) -> AppResult<Redirect> {
    let rating: f64 = input
        .rating
        .trim()
        .parse()
        .map_err(|_| AppError::BadRequest(format!("invalid rating: {}", input.rating)))?;
    let movie = state.movies.set_rating(&user.id, &id, rating).await?;
    state.players.refresh(&user.id, &movie);
    Ok(Redirect::to("/"))
}

pub async fn play(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Redirect> {
    let movie = state.movies.get(&user.id, &id).await?;
    state.players.session(&user.id).play(movie);
    Ok(Redirect::to("/player"))
}

fn open_session(state: &AppState, owner: &str) -> AppResult<Arc<PlaybackSession>> {
    state.players.get(owner).filter(|s| s.is_open()).ok_or(AppError::NotFound)
}

pub async fn player(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    jar: CookieJar,
) -> AppResult<Response> {
    let Some(view) = state.players.get(&user.id).and_then(|s| s.snapshot()) else {
        return Ok(Redirect::to("/").into_response());
    };

    let all = state.movies.list(&user.id).await?;
    let similar = library::similar_to(&view.record, &all, 10);
    Ok(Html(templates::player_page(theme(&jar), &view, &similar)).into_response())
}

fn fragment(body: String, selector: &'static str) -> Response {
    let mut resp = Html(body).into_response();
    resp.headers_mut().insert("datastar-selector", HeaderValue::from_static(selector));
    resp.headers_mut().insert("datastar-mode", HeaderValue::from_static("outer"));
    resp
}

pub async fn player_frame(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Response {
    let Some(view) = state.players.get(&user.id).and_then(|s| s.snapshot()) else {
        return StatusCode::NO_CONTENT.into_response();
    };
    fragment(templates::player_frame(&view), "#player-frame")
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    episode: Option<usize>,
}

/// Polled while an advance is pending. Only the status swaps until the
/// episode the page shows is no longer the selected one.
pub async fn player_status(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<StatusQuery>,
) -> Response {
    let Some(view) = state.players.get(&user.id).and_then(|s| s.snapshot()) else {
        return StatusCode::NO_CONTENT.into_response();
    };

    if query.episode == Some(view.selected_episode) {
        fragment(templates::player_status(&view), "#player-status")
    } else {
        fragment(templates::player_frame(&view), "#player-frame")
    }
}

#[derive(Debug, Deserialize)]
pub struct EpisodeInput {
    episode: String,
}

pub async fn select_episode(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Form(input): Form<EpisodeInput>,
) -> AppResult<Redirect> {
    open_session(&state, &user.id)?
        .select_episode_str(&input.episode)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    Ok(Redirect::to("/player"))
}

pub async fn toggle_auto_advance(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Redirect> {
    open_session(&state, &user.id)?.toggle_auto_advance();
    Ok(Redirect::to("/player"))
}

pub async fn player_favorite(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Redirect> {
    open_session(&state, &user.id)?.toggle_favorite();
    Ok(Redirect::to("/player"))
}

pub async fn close_player(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Redirect {
    if let Some(session) = state.players.get(&user.id) {
        session.close();
    }
    Redirect::to("/")
}

pub async fn open_external(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Response {
    match state.players.get(&user.id).and_then(|s| s.external_url()) {
        Some(url) => Redirect::to(&url).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

fn csv_download(filename: &str, body: String) -> Response {
    let disposition = format!("attachment; filename=\"{filename}\"");
    let mut resp = body.into_response();
    resp.headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("text/csv; charset=utf-8"));
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        resp.headers_mut().insert(header::CONTENT_DISPOSITION, value);
    }
    resp
}

pub async fn export_csv(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Response> {
    let movies = state.movies.list(&user.id).await?;
    let today = jiff::Zoned::now().date();
    Ok(csv_download(&format!("movies_{today}.csv"), csv::encode(&movies)))
}

pub async fn csv_template() -> Response {
    csv_download("template_movies.csv", csv::template())
}

pub async fn import_csv(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    mut multipart: Multipart,
) -> AppResult<Redirect> {
    let mut upload = Vec::new();
    let mut pasted = String::new();
    while let Some(field) =
        multipart.next_field().await.map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        match field.name() {
            Some("file") => {
                let bytes = field.bytes().await.map_err(|e| AppError::BadRequest(e.body_text()))?;
                upload = bytes.to_vec();
            },
            Some("csv_text") => {
                pasted = field.text().await.map_err(|e| AppError::BadRequest(e.body_text()))?;
            },
            _ => {},
        }
    }

    // A chosen file wins over pasted text.
    let forms = if !upload.is_empty() {
        csv::decode_bytes(&upload)?
    } else if !pasted.trim().is_empty() {
        csv::decode_bytes(pasted.as_bytes())?
    } else {
        return Err(AppError::BadRequest("choose a CSV file or paste CSV text".into()));
    };

    let (mut imported, mut failed) = (0usize, 0usize);
    for form in &forms {
        match state.movies.insert(&user.id, form).await {
            Ok(_) => imported += 1,
            Err(err) => {
                failed += 1;
                warn!(
                    owner = %user.id,
                    title = %form.title,
                    error = %err,
                    "failed to import row"
                );
            },
        }
    }

    info!(owner = %user.id, imported, failed, "CSV import finished");
    Ok(Redirect::to(&format!("/?imported={imported}&failed={failed}")))
}
