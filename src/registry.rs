use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::{
    models::Movie,
    player::{PlaybackSession, PlayerCallbacks},
    repository::MovieRepository,
};

#[derive(Debug)]
struct Entry {
    session: Arc<PlaybackSession>,
    last_seen: Instant,
}

/// One playback session per signed-in owner. Sessions nobody touched for
/// `idle_ttl` are closed and dropped.
#[derive(Debug)]
pub struct PlayerRegistry {
    repo: MovieRepository,
    idle_ttl: Duration,
    sessions: Mutex<HashMap<String, Entry>>,
}

impl PlayerRegistry {
    pub fn new(repo: MovieRepository, idle_ttl: Duration) -> Self {
        Self { repo, idle_ttl, sessions: Mutex::new(HashMap::new()) }
    }

    /// Returns the owner's session, creating it on first use.
    pub fn session(&self, owner: &str) -> Arc<PlaybackSession> {
        let mut sessions = self.lock();
        self.evict_idle(&mut sessions);
        let entry = sessions.entry(owner.to_string()).or_insert_with(|| Entry {
            session: Arc::new(PlaybackSession::new(self.callbacks(owner))),
            last_seen: Instant::now(),
        });
        entry.last_seen = Instant::now();
        entry.session.clone()
    }

    pub fn get(&self, owner: &str) -> Option<Arc<PlaybackSession>> {
        let mut sessions = self.lock();
        self.evict_idle(&mut sessions);
        let entry = sessions.get_mut(owner)?;
        entry.last_seen = Instant::now();
        Some(entry.session.clone())
    }

    /// Drops the owner's session; its pending advance dies with it.
    pub fn remove(&self, owner: &str) {
        let removed = self.lock().remove(owner);
        if let Some(entry) = removed {
            entry.session.close();
        }
    }

    /// Pushes an edited record into the owner's session if it is open there.
    pub fn refresh(&self, owner: &str, movie: &Movie) {
        if let Some(session) = self.get(owner) {
            session.refresh(movie.clone());
        }
    }

    /// Closes the owner's player when it shows a record that is gone.
    pub fn forget(&self, owner: &str, id: &str) {
        if let Some(session) = self.get(owner) {
            session.close_if_showing(id);
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.sessions.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn evict_idle(&self, sessions: &mut HashMap<String, Entry>) {
        let ttl = self.idle_ttl;
        sessions.retain(|owner, entry| {
            let keep = entry.last_seen.elapsed() < ttl;
            if !keep {
                debug!(owner = %owner, "evicting idle player session");
                entry.session.close();
            }
            keep
        });
    }

    fn callbacks(&self, owner: &str) -> PlayerCallbacks {
        let close_owner = owner.to_string();

        let play_repo = self.repo.clone();
        let play_owner = owner.to_string();

        let fav_repo = self.repo.clone();
        let fav_owner = owner.to_string();

        PlayerCallbacks {
            on_close: Box::new(move || debug!(owner = %close_owner, "player closed")),
            on_play_record: Box::new(move |movie| {
                let repo = play_repo.clone();
                let owner = play_owner.clone();
                let id = movie.id.clone();
                tokio::spawn(async move {
                    if let Err(err) = repo.record_view(&owner, &id).await {
                        warn!(
                            owner = %owner,
                            movie_id = %id,
                            error = %err,
                            "failed to record view"
                        );
                    }
                });
            }),
            on_toggle_favorite: Box::new(move |id, favorite| {
                let repo = fav_repo.clone();
                let owner = fav_owner.clone();
                let id = id.to_string();
                tokio::spawn(async move {
                    if let Err(err) = repo.set_favorite(&owner, &id, favorite).await {
                        warn!(
                            owner = %owner,
                            movie_id = %id,
                            error = %err,
                            "failed to persist favorite"
                        );
                    }
                });
            }),
        }
    }
}
