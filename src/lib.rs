pub mod auth;
pub mod config;
pub mod csv;
pub mod db;
pub mod entities;
pub mod error;
pub mod library;
pub mod models;
pub mod player;
pub mod registry;
pub mod repository;
pub mod routes;
pub mod templates;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    auth::AuthService, config::Config, registry::PlayerRegistry, repository::MovieRepository,
};

pub struct AppState {
    pub config: Arc<Config>,
    pub auth: AuthService,
    pub movies: MovieRepository,
    pub players: PlayerRegistry,
}

impl AppState {
    pub fn new(config: Arc<Config>, db: DatabaseConnection) -> Self {
        let movies = MovieRepository::new(db.clone());
        Self {
            auth: AuthService::new(db, config.session_ttl_days, config.min_password_len),
            players: PlayerRegistry::new(movies.clone(), config.player_idle_ttl()),
            movies,
            config,
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route("/login", get(routes::login_page).post(routes::login))
        .route("/signup", get(routes::signup_page).post(routes::signup))
        .route("/logout", post(routes::logout))
        .route("/theme", post(routes::toggle_theme))
        .route("/movies", post(routes::create_movie))
        .route("/movies/new", get(routes::new_movie))
        .route("/movies/{id}", post(routes::update_movie))
        .route("/movies/{id}/edit", get(routes::edit_movie))
        .route("/movies/{id}/delete", post(routes::delete_movie))
        .route("/movies/{id}/favorite", post(routes::toggle_favorite))
        .route("/movies/{id}/rating", post(routes::rate_movie))
        .route("/play/{id}", get(routes::play))
        .route("/player", get(routes::player))
        .route("/player/frame", get(routes::player_frame))
        .route("/player/status", get(routes::player_status))
        .route("/player/episode", post(routes::select_episode))
        .route("/player/auto-advance", post(routes::toggle_auto_advance))
        .route("/player/favorite", post(routes::player_favorite))
        .route("/player/close", post(routes::close_player))
        .route("/player/external", get(routes::open_external))
        .route("/csv/export", get(routes::export_csv))
        .route("/csv/template", get(routes::csv_template))
        .route("/csv/import", post(routes::import_csv))
        .with_state(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}
