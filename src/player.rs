//! Playback session: which video source is active for an open record,
//! episode switching, and the auto-advance timer for series.
//!
//! Every transition cancels the pending timer before possibly arming a new
//! one, so a session never has more than one advance in flight. A timer
//! that already woke up when it was cancelled is neutralised by the
//! generation counter.

use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use tokio::task::AbortHandle;
use tracing::debug;

use crate::models::Movie;

/// Delay before the next episode starts on its own.
pub const AUTO_ADVANCE_DELAY: Duration = Duration::from_secs(5);

type CloseFn = Box<dyn Fn() + Send + Sync>;
type PlayRecordFn = Box<dyn Fn(&Movie) + Send + Sync>;
type ToggleFavoriteFn = Box<dyn Fn(&str, bool) + Send + Sync>;

/// Handlers the owning view injects into a session.
pub struct PlayerCallbacks {
    pub on_close: CloseFn,
    pub on_play_record: PlayRecordFn,
    pub on_toggle_favorite: ToggleFavoriteFn,
}

impl PlayerCallbacks {
    pub fn noop() -> Self {
        Self {
            on_close: Box::new(|| {}),
            on_play_record: Box::new(|_| {}),
            on_toggle_favorite: Box::new(|_, _| {}),
        }
    }
}

impl std::fmt::Debug for PlayerCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerCallbacks").finish_non_exhaustive()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlaybackSource {
    Embed(String),
    Unavailable,
}

impl PlaybackSource {
    pub fn url(&self) -> Option<&str> {
        match self {
            PlaybackSource::Embed(url) => Some(url),
            PlaybackSource::Unavailable => None,
        }
    }
}

/// Owned copy of the session state for rendering.
#[derive(Clone, Debug)]
pub struct PlayerView {
    pub record: Movie,
    pub selected_episode: usize,
    pub auto_advance: bool,
    pub advance_pending: bool,
    pub source: PlaybackSource,
}

impl PlayerView {
    pub fn has_next_episode(&self) -> bool {
        has_next_episode(&self.record, self.selected_episode)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid episode selection: {0:?}")]
pub struct EpisodeParseError(String);

#[derive(Debug)]
struct PlayerState {
    active: Option<Movie>,
    selected_episode: usize,
    auto_advance: bool,
    pending: Option<AbortHandle>,
    generation: u64,
}

impl PlayerState {
    fn cancel_pending(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    fn should_arm(&self) -> bool {
        self.auto_advance
            && self.active.as_ref().is_some_and(|m| has_next_episode(m, self.selected_episode))
    }
}

#[derive(Debug)]
pub struct PlaybackSession {
    state: Arc<Mutex<PlayerState>>,
    callbacks: PlayerCallbacks,
}

impl PlaybackSession {
    pub fn new(callbacks: PlayerCallbacks) -> Self {
        Self {
            state: Arc::new(Mutex::new(PlayerState {
                active: None,
                selected_episode: 0,
                auto_advance: true,
                pending: None,
                generation: 0,
            })),
            callbacks,
        }
    }

    pub fn open(&self, record: Movie) {
        let mut state = lock(&self.state);
        debug!(movie_id = %record.id, series = record.has_episodes(), "opening player");
        state.active = Some(record);
        state.selected_episode = 0;
        rearm(&self.state, &mut state);
    }

    /// Notifies the play handler, then opens the record.
    pub fn play(&self, record: Movie) {
        (self.callbacks.on_play_record)(&record);
        self.open(record);
    }

    pub fn close(&self) {
        {
            let mut state = lock(&self.state);
            state.cancel_pending();
            state.active = None;
            state.selected_episode = 0;
        }
        (self.callbacks.on_close)();
    }

    /// Swaps in a newer copy of the open record, keeping the episode
    /// position. A pending advance keeps running while it still applies.
    pub fn refresh(&self, record: Movie) {
        let mut state = lock(&self.state);
        if !state.active.as_ref().is_some_and(|m| m.id == record.id) {
            return;
        }
        debug!(movie_id = %record.id, "refreshing open record");
        state.active = Some(record);
        if state.pending.is_some() != state.should_arm() {
            rearm(&self.state, &mut state);
        }
    }

    /// Closes the session when it shows the given record.
    pub fn close_if_showing(&self, id: &str) {
        let showing = lock(&self.state).active.as_ref().is_some_and(|m| m.id == id);
        if showing {
            self.close();
        }
    }

    pub fn select_episode(&self, index: usize) {
        let mut state = lock(&self.state);
        if state.active.is_none() {
            return;
        }
        debug!(episode = index, "episode selected");
        state.selected_episode = index;
        rearm(&self.state, &mut state);
    }

    /// Selects an episode from a form control value.
    pub fn select_episode_str(&self, raw: &str) -> Result<(), EpisodeParseError> {
        let index = raw.trim().parse::<usize>().map_err(|_| EpisodeParseError(raw.to_string()))?;
        self.select_episode(index);
        Ok(())
    }

    pub fn toggle_auto_advance(&self) -> bool {
        let mut state = lock(&self.state);
        state.auto_advance = !state.auto_advance;
        debug!(enabled = state.auto_advance, "auto-advance toggled");
        rearm(&self.state, &mut state);
        state.auto_advance
    }

    /// Flips the favorite flag of the open record and reports the new value.
    pub fn toggle_favorite(&self) -> Option<bool> {
        let (id, favorite) = {
            let mut state = lock(&self.state);
            let record = state.active.as_mut()?;
            record.is_favorite = !record.is_favorite;
            (record.id.clone(), record.is_favorite)
        };
        (self.callbacks.on_toggle_favorite)(&id, favorite);
        Some(favorite)
    }

    pub fn source(&self) -> PlaybackSource {
        let state = lock(&self.state);
        match &state.active {
            Some(record) => resolve_source(record, state.selected_episode),
            None => PlaybackSource::Unavailable,
        }
    }

    /// URL for the open-in-new-window action.
    pub fn external_url(&self) -> Option<String> {
        self.source().url().map(str::to_string)
    }

    pub fn selected_episode(&self) -> usize {
        lock(&self.state).selected_episode
    }

    pub fn auto_advance(&self) -> bool {
        lock(&self.state).auto_advance
    }

    pub fn is_open(&self) -> bool {
        lock(&self.state).active.is_some()
    }

    pub fn advance_pending(&self) -> bool {
        lock(&self.state).pending.is_some()
    }

    pub fn snapshot(&self) -> Option<PlayerView> {
        let state = lock(&self.state);
        let record = state.active.clone()?;
        let source = resolve_source(&record, state.selected_episode);
        Some(PlayerView {
            record,
            selected_episode: state.selected_episode,
            auto_advance: state.auto_advance,
            advance_pending: state.pending.is_some(),
            source,
        })
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        lock(&self.state).cancel_pending();
    }
}

/// Resolves the embed URL for a record at an episode index.
pub fn resolve_source(record: &Movie, episode: usize) -> PlaybackSource {
    let url = if record.has_episodes() {
        record.episodes.get(episode).map(|ep| ep.url.as_str())
    } else {
        Some(record.iframe_url.as_str())
    };

    match url.map(str::trim) {
        Some(url) if !url.is_empty() => PlaybackSource::Embed(url.to_string()),
        _ => PlaybackSource::Unavailable,
    }
}

fn has_next_episode(record: &Movie, episode: usize) -> bool {
    record.has_episodes() && episode + 1 < record.episodes.len()
}

fn lock(state: &Mutex<PlayerState>) -> MutexGuard<'_, PlayerState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn rearm(shared: &Arc<Mutex<PlayerState>>, state: &mut PlayerState) {
    state.cancel_pending();
    if !state.should_arm() {
        return;
    }

    let generation = state.generation;
    let weak = Arc::downgrade(shared);
    let task = tokio::spawn(async move {
        tokio::time::sleep(AUTO_ADVANCE_DELAY).await;
        let Some(shared) = weak.upgrade() else {
            return;
        };
        let mut state = lock(&shared);
        if state.generation != generation {
            return;
        }
        state.pending = None;
        if !state.should_arm() {
            return;
        }
        state.selected_episode += 1;
        debug!(episode = state.selected_episode, "auto-advanced to next episode");
        rearm(&shared, &mut state);
    });
    state.pending = Some(task.abort_handle());
}
