use crate::entities::{episodes, prelude::*, seasons, user_series};
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

const SEASON_NUMBER_INDEX: &str = "idx_seasons_series_number";
const EPISODE_NUMBER_INDEX: &str = "idx_episodes_series_season_number";
const USER_SERIES_INDEX: &str = "idx_user_series_user_series";

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .name(SEASON_NUMBER_INDEX)
                    .table(Seasons)
                    .col(seasons::Column::SeriesId)
                    .col(seasons::Column::Number)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name(EPISODE_NUMBER_INDEX)
                    .table(Episodes)
                    .col(episodes::Column::SeriesId)
                    .col(episodes::Column::SeasonNumber)
                    .col(episodes::Column::Number)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // Rating and state upserts target this key.
        manager
            .create_index(
                Index::create()
                    .name(USER_SERIES_INDEX)
                    .table(UserSeries)
                    .col(user_series::Column::UserId)
                    .col(user_series::Column::SeriesId)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name(USER_SERIES_INDEX).table(UserSeries).to_owned())
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name(EPISODE_NUMBER_INDEX)
                    .table(Episodes)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(Index::drop().name(SEASON_NUMBER_INDEX).table(Seasons).to_owned())
            .await?;

        Ok(())
    }
}
