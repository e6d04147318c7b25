use jiff::Timestamp;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set, sea_query::Expr,
};
use tracing::debug;
use uuid::Uuid;

use crate::{
    entities::movie,
    error::{AppError, AppResult},
    models::{self, ContentType, Episode, Movie, MovieForm, MoviePatch},
};

/// Owner-scoped CRUD over the movies table.
#[derive(Clone, Debug)]
pub struct MovieRepository {
    db: DatabaseConnection,
}

impl MovieRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Newest first.
    pub async fn list(&self, owner: &str) -> AppResult<Vec<Movie>> {
        let rows = movie::Entity::find()
            .filter(movie::Column::UserId.eq(owner))
            .order_by_desc(movie::Column::CreatedAt)
            .order_by_desc(movie::Column::Id)
            .all(&self.db)
            .await?;

        rows.into_iter().map(Movie::try_from).collect()
    }

    pub async fn get(&self, owner: &str, id: &str) -> AppResult<Movie> {
        self.find_model(owner, id).await?.try_into()
    }

    pub async fn insert(&self, owner: &str, form: &MovieForm) -> AppResult<Movie> {
        let now = now_ms();
        let model = movie::ActiveModel {
            id: Set(Uuid::now_v7().to_string()),
            user_id: Set(owner.to_string()),
            title: Set(form.title.trim().to_string()),
            description: Set(form.description.clone()),
            iframe_url: Set(form.iframe_url.trim().to_string()),
            cover_image: Set(form.cover_image.clone()),
            backdrop_url: Set(form.backdrop_url.clone()),
            rating: Set(models::clamp_rating(form.rating)),
            category: Set(form.category_or_default().to_string()),
            tags: Set(serde_json::to_string(&form.tags)?),
            duration: Set(form.duration.clone()),
            year: Set(form.year),
            is_favorite: Set(false),
            view_count: Set(0),
            last_viewed_at: Set(None),
            content_type: Set(form.content_type.as_str().to_string()),
            episodes: Set(serde_json::to_string(&form.episodes)?),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let stored = model.insert(&self.db).await?;
        debug!(owner = %owner, movie_id = %stored.id, "inserted movie");
        stored.try_into()
    }

    /// Replaces every editable field, keeping engagement counters.
    pub async fn replace(&self, owner: &str, id: &str, form: &MovieForm) -> AppResult<Movie> {
        let mut model = self.find_model(owner, id).await?.into_active_model();
        model.title = Set(form.title.trim().to_string());
        model.description = Set(form.description.clone());
        model.iframe_url = Set(form.iframe_url.trim().to_string());
        model.cover_image = Set(form.cover_image.clone());
        model.backdrop_url = Set(form.backdrop_url.clone());
        model.rating = Set(models::clamp_rating(form.rating));
        model.category = Set(form.category_or_default().to_string());
        model.tags = Set(serde_json::to_string(&form.tags)?);
        model.duration = Set(form.duration.clone());
        model.year = Set(form.year);
        model.content_type = Set(form.content_type.as_str().to_string());
        model.episodes = Set(serde_json::to_string(&form.episodes)?);
        model.updated_at = Set(now_ms());

        let stored = model.update(&self.db).await?;
        debug!(owner = %owner, movie_id = %id, "replaced movie");
        stored.try_into()
    }

    pub async fn update(&self, owner: &str, id: &str, patch: &MoviePatch) -> AppResult<Movie> {
        if let Some(rating) = patch.rating {
            if !models::is_valid_rating(rating) {
                return Err(AppError::BadRequest(format!(
                    "rating must be between 0 and {}",
                    models::MAX_RATING
                )));
            }
        }

        let mut model = self.find_model(owner, id).await?.into_active_model();
        if let Some(favorite) = patch.is_favorite {
            model.is_favorite = Set(favorite);
        }
        if let Some(rating) = patch.rating {
            model.rating = Set(rating);
        }
        if let Some(count) = patch.view_count {
            model.view_count = Set(i64::try_from(count).unwrap_or(i64::MAX));
        }
        if let Some(at) = patch.last_viewed_at {
            model.last_viewed_at = Set(Some(at.as_millisecond()));
        }
        model.updated_at = Set(now_ms());

        model.update(&self.db).await?.try_into()
    }

    pub async fn delete(&self, owner: &str, id: &str) -> AppResult<()> {
        let res = movie::Entity::delete_many()
            .filter(movie::Column::Id.eq(id))
            .filter(movie::Column::UserId.eq(owner))
            .exec(&self.db)
            .await?;

        if res.rows_affected == 0 {
            return Err(AppError::NotFound);
        }
        debug!(owner = %owner, movie_id = %id, "deleted movie");
        Ok(())
    }

    pub async fn set_favorite(&self, owner: &str, id: &str, favorite: bool) -> AppResult<Movie> {
        self.update(owner, id, &MoviePatch { is_favorite: Some(favorite), ..Default::default() })
            .await
    }

    pub async fn set_rating(&self, owner: &str, id: &str, rating: f64) -> AppResult<Movie> {
        self.update(owner, id, &MoviePatch { rating: Some(rating), ..Default::default() }).await
    }

    /// Bumps the view counter in place and stamps the viewing time.
    pub async fn record_view(&self, owner: &str, id: &str) -> AppResult<Movie> {
        let now = now_ms();
        let res = movie::Entity::update_many()
            .col_expr(movie::Column::ViewCount, Expr::col(movie::Column::ViewCount).add(1))
            .col_expr(movie::Column::LastViewedAt, Expr::value(now))
            .col_expr(movie::Column::UpdatedAt, Expr::value(now))
            .filter(movie::Column::Id.eq(id))
            .filter(movie::Column::UserId.eq(owner))
            .exec(&self.db)
            .await?;

        if res.rows_affected == 0 {
            return Err(AppError::NotFound);
        }
        self.get(owner, id).await
    }

    async fn find_model(&self, owner: &str, id: &str) -> AppResult<movie::Model> {
        movie::Entity::find_by_id(id.to_string())
            .filter(movie::Column::UserId.eq(owner))
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)
    }
}

impl TryFrom<movie::Model> for Movie {
    type Error = AppError;

    fn try_from(row: movie::Model) -> Result<Self, Self::Error> {
        let tags: Vec<String> = serde_json::from_str(&row.tags)?;
        let episodes: Vec<Episode> = serde_json::from_str(&row.episodes)?;
        let content_type = ContentType::from_code(&row.content_type).ok_or_else(|| {
            AppError::Other(anyhow::anyhow!("unknown content type {:?}", row.content_type))
        })?;

        Ok(Movie {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            description: row.description,
            iframe_url: row.iframe_url,
            cover_image: row.cover_image,
            backdrop_url: row.backdrop_url,
            rating: row.rating,
            category: row.category,
            tags,
            duration: row.duration,
            year: row.year,
            is_favorite: row.is_favorite,
            view_count: u64::try_from(row.view_count).unwrap_or(0),
            last_viewed_at: row.last_viewed_at.map(from_ms).transpose()?,
            content_type,
            episodes,
            created_at: from_ms(row.created_at)?,
            updated_at: from_ms(row.updated_at)?,
        })
    }
}

fn now_ms() -> i64 {
    Timestamp::now().as_millisecond()
}

fn from_ms(ms: i64) -> AppResult<Timestamp> {
    Timestamp::from_millisecond(ms).map_err(|e| AppError::Other(e.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn repo() -> MovieRepository {
        let db = db::connect_and_migrate("sqlite::memory:").await.unwrap();
        MovieRepository::new(db)
    }

    fn form(title: &str) -> MovieForm {
        MovieForm {
            title: title.into(),
            iframe_url: format!("https://v.example/{}", title.to_lowercase()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn insert_assigns_defaults_and_server_fields() {
        let repo = repo().await;
        let draft = MovieForm { category: "  ".into(), tags: vec!["a".into()], ..form("Heat") };
        let stored = repo.insert("alice", &draft).await.unwrap();

        assert!(!stored.id.is_empty());
        assert_eq!(stored.user_id, "alice");
        assert_eq!(stored.category, "Uncategorized");
        assert_eq!(stored.tags, vec!["a"]);
        assert!(!stored.is_favorite);
        assert_eq!(stored.view_count, 0);
        assert_eq!(stored.last_viewed_at, None);
        assert_eq!(stored.created_at, stored.updated_at);
    }

    #[tokio::test]
    async fn list_is_scoped_to_owner_newest_first() {
        let repo = repo().await;
        let first = repo.insert("alice", &form("Heat")).await.unwrap();
        let second = repo.insert("alice", &form("Ronin")).await.unwrap();
        repo.insert("bob", &form("Alien")).await.unwrap();

        let listed = repo.list("alice").await.unwrap();
        let ids: Vec<_> = listed.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec![second.id.as_str(), first.id.as_str()]);
        assert!(repo.list("carol").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn other_owners_cannot_read_or_delete() {
        let repo = repo().await;
        let heat = repo.insert("alice", &form("Heat")).await.unwrap();

        assert!(matches!(repo.get("bob", &heat.id).await, Err(AppError::NotFound)));
        assert!(matches!(repo.delete("bob", &heat.id).await, Err(AppError::NotFound)));
        assert!(repo.get("alice", &heat.id).await.is_ok());
    }

    #[tokio::test]
    async fn replace_keeps_engagement_fields() {
        let repo = repo().await;
        let heat = repo.insert("alice", &form("Heat")).await.unwrap();
        repo.set_favorite("alice", &heat.id, true).await.unwrap();
        repo.record_view("alice", &heat.id).await.unwrap();

        let series = MovieForm {
            content_type: ContentType::Series,
            episodes: vec![Episode {
                name: "Pilot".into(),
                url: "https://v.example/1".into(),
                description: None,
            }],
            year: Some(1995),
            ..form("Heat: The Series")
        };
        let updated = repo.replace("alice", &heat.id, &series).await.unwrap();

        assert_eq!(updated.title, "Heat: The Series");
        assert_eq!(updated.content_type, ContentType::Series);
        assert_eq!(updated.episodes.len(), 1);
        assert!(updated.is_favorite);
        assert_eq!(updated.view_count, 1);
        assert_eq!(updated.created_at, heat.created_at);
    }

    #[tokio::test]
    async fn targeted_updates() {
        let repo = repo().await;
        let heat = repo.insert("alice", &form("Heat")).await.unwrap();

        let rated = repo.set_rating("alice", &heat.id, 4.5).await.unwrap();
        assert_eq!(rated.rating, 4.5);
        assert!(matches!(
            repo.set_rating("alice", &heat.id, 8.0).await,
            Err(AppError::BadRequest(_))
        ));

        repo.record_view("alice", &heat.id).await.unwrap();
        let viewed = repo.record_view("alice", &heat.id).await.unwrap();
        assert_eq!(viewed.view_count, 2);
        assert!(viewed.last_viewed_at.is_some());

        assert!(matches!(
            repo.set_favorite("alice", "missing", true).await,
            Err(AppError::NotFound)
        ));
        assert!(matches!(repo.record_view("bob", &heat.id).await, Err(AppError::NotFound)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_views_are_all_counted() {
        let repo = repo().await;
        let heat = repo.insert("alice", &form("Heat")).await.unwrap();

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let repo = repo.clone();
                let id = heat.id.clone();
                tokio::spawn(async move { repo.record_view("alice", &id).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(repo.get("alice", &heat.id).await.unwrap().view_count, 20);
    }

    #[tokio::test]
    async fn delete_removes_row() {
        let repo = repo().await;
        let heat = repo.insert("alice", &form("Heat")).await.unwrap();
        repo.delete("alice", &heat.id).await.unwrap();
        assert!(repo.list("alice").await.unwrap().is_empty());
        assert!(matches!(repo.delete("alice", &heat.id).await, Err(AppError::NotFound)));
    }
}
