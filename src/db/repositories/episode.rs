use sea_orm::{
    ActiveModelTrait, ActiveValue::Unchanged, ColumnTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, Set,
};

use crate::db::{PageWindow, Paged, StoreError, StoreResult, now, paged_query};
use crate::entities::{episodes, prelude::*, seasons};
use crate::resource::Validated;

pub struct EpisodeRepository {
    conn: DatabaseConnection,
}

impl EpisodeRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list(
        &self,
        series_id: i32,
        season_number: i32,
        window: PageWindow,
    ) -> StoreResult<Paged<episodes::Model>> {
        let select = Episodes::find()
            .filter(episodes::Column::SeriesId.eq(series_id))
            .filter(episodes::Column::SeasonNumber.eq(season_number))
            .order_by_asc(episodes::Column::Number);
        Ok(paged_query(&self.conn, select, window).await?)
    }

    pub async fn all_for_season(&self, season_id: i32) -> StoreResult<Vec<episodes::Model>> {
        Ok(Episodes::find()
            .filter(episodes::Column::SeasonId.eq(season_id))
            .order_by_asc(episodes::Column::Number)
            .all(&self.conn)
            .await?)
    }

    pub async fn get(
        &self,
        series_id: i32,
        season_number: i32,
        number: i32,
    ) -> StoreResult<Option<episodes::Model>> {
        Ok(Episodes::find()
            .filter(episodes::Column::SeriesId.eq(series_id))
            .filter(episodes::Column::SeasonNumber.eq(season_number))
            .filter(episodes::Column::Number.eq(number))
            .one(&self.conn)
            .await?)
    }

    /// Fails with [`StoreError::Duplicate`] when the season already has an
    /// episode with that number.
    pub async fn create(
        &self,
        season: &seasons::Model,
        fields: &Validated,
    ) -> StoreResult<episodes::Model> {
        let now = now();
        let mut active = episodes::ActiveModel {
            series_id: Set(season.series_id),
            season_id: Set(season.id),
            season_number: Set(season.number),
            created: Set(now.clone()),
            updated: Set(now),
            ..Default::default()
        };
        fields.apply_to(&mut active)?;

        Ok(active.insert(&self.conn).await?)
    }

    pub async fn update(
        &self,
        series_id: i32,
        season_number: i32,
        number: i32,
        fields: &Validated,
    ) -> StoreResult<episodes::Model> {
        let existing = self
            .get(series_id, season_number, number)
            .await?
            .ok_or(StoreError::NotFound)?;

        let mut active = episodes::ActiveModel {
            id: Unchanged(existing.id),
            updated: Set(now()),
            ..Default::default()
        };
        fields.apply_to(&mut active)?;

        Ok(active.update(&self.conn).await?)
    }

    pub async fn delete(&self, series_id: i32, season_number: i32, number: i32) -> StoreResult<()> {
        Episodes::delete_many()
            .filter(episodes::Column::SeriesId.eq(series_id))
            .filter(episodes::Column::SeasonNumber.eq(season_number))
            .filter(episodes::Column::Number.eq(number))
            .exec(&self.conn)
            .await?;
        Ok(())
    }
}
