use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Movies::Table)
                    .if_not_exists()
                    .col(string(Movies::Id).primary_key())
                    .col(string(Movies::UserId))
                    .col(string(Movies::Title))
                    .col(text(Movies::Description))
                    .col(string(Movies::IframeUrl))
                    .col(string(Movies::CoverImage))
                    .col(string_null(Movies::BackdropUrl))
                    .col(double(Movies::Rating).default(0.0))
                    .col(string(Movies::Category).default("Uncategorized"))
                    .col(text(Movies::Tags))
                    .col(string(Movies::Duration))
                    .col(integer_null(Movies::Year))
                    .col(boolean(Movies::IsFavorite).default(false))
                    .col(big_integer(Movies::ViewCount).default(0))
                    .col(big_integer_null(Movies::LastViewedAt))
                    .col(string(Movies::ContentType).default("film"))
                    .col(text(Movies::Episodes))
                    .col(big_integer(Movies::CreatedAt))
                    .col(big_integer(Movies::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Movies::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Movies {
    Table,
    Id,
    UserId,
    Title,
    Description,
    IframeUrl,
    CoverImage,
    BackdropUrl,
    Rating,
    Category,
    Tags,
    Duration,
    Year,
    IsFavorite,
    ViewCount,
    LastViewedAt,
    ContentType,
    Episodes,
    CreatedAt,
    UpdatedAt,
}
