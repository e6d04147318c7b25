use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "movies")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub iframe_url: String,
    pub cover_image: String,
    pub backdrop_url: Option<String>,
    pub rating: f64,
    pub category: String,
    /// JSON array of strings.
    pub tags: String,
    pub duration: String,
    pub year: Option<i32>,
    pub is_favorite: bool,
    pub view_count: i64,
    pub last_viewed_at: Option<i64>,
    pub content_type: String,
    /// JSON array of `{name, url, description}` objects.
    pub episodes: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
