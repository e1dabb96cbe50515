use sea_orm::{
    ActiveModelTrait, ActiveValue::Unchanged, ColumnTrait, DatabaseConnection, EntityTrait,
    FromQueryResult, PaginatorTrait, QueryFilter, QueryOrder, Set, Value,
    sea_query::OnConflict,
};
use serde::Serialize;

use crate::db::{PageWindow, Paged, StoreResult, now, paged_query, query_raw};
use crate::entities::{genres, prelude::*, series, series_genres, user_series};
use crate::resource::Validated;

#[derive(Debug, Default, FromQueryResult)]
struct RatingSummary {
    average_rating: Option<f64>,
    rating_count: i64,
}

/// The calling user's own rating and watch state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonalRating {
    pub rating: Option<i32>,
    pub state: Option<String>,
}

/// A series row together with its aggregate rating.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesView {
    #[serde(flatten)]
    pub series: series::Model,
    pub average_rating: Option<f64>,
    pub rating_count: i64,
    #[serde(flatten)]
    pub personal: Option<PersonalRating>,
}

pub struct SeriesRepository {
    conn: DatabaseConnection,
}

impl SeriesRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list(&self, window: PageWindow) -> StoreResult<Paged<series::Model>> {
        let select = Series::find().order_by_asc(series::Column::Id);
        Ok(paged_query(&self.conn, select, window).await?)
    }

    pub async fn get(&self, id: i32) -> StoreResult<Option<series::Model>> {
        Ok(Series::find_by_id(id).one(&self.conn).await?)
    }

    pub async fn exists(&self, id: i32) -> StoreResult<bool> {
        let count = Series::find()
            .filter(series::Column::Id.eq(id))
            .count(&self.conn)
            .await?;
        Ok(count > 0)
    }

    /// Loads a series with its rating aggregate and, for a signed-in
    /// caller, their own rating and state.
    pub async fn view(&self, id: i32, user_id: Option<i32>) -> StoreResult<Option<SeriesView>> {
        let Some(series) = self.get(id).await? else {
            return Ok(None);
        };

        let summary = query_raw::<RatingSummary, _>(
            &self.conn,
            "SELECT AVG(rating) AS average_rating, COUNT(rating) AS rating_count \
             FROM user_series WHERE series_id = ?",
            [Value::from(id)],
        )
        .await?
        .into_iter()
        .next()
        .unwrap_or_default();

        let personal = match user_id {
            Some(user_id) => {
                let row = UserSeries::find()
                    .filter(user_series::Column::UserId.eq(user_id))
                    .filter(user_series::Column::SeriesId.eq(id))
                    .one(&self.conn)
                    .await?;

                Some(PersonalRating {
                    rating: row.as_ref().and_then(|r| r.rating),
                    state: row.and_then(|r| r.state),
                })
            }
            None => None,
        };

        Ok(Some(SeriesView {
            series,
            average_rating: summary.average_rating,
            rating_count: summary.rating_count,
            personal,
        }))
    }

    pub async fn genres(&self, id: i32) -> StoreResult<Vec<genres::Model>> {
        let rows = SeriesGenres::find()
            .filter(series_genres::Column::SeriesId.eq(id))
            .order_by_asc(series_genres::Column::GenreName)
            .all(&self.conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| genres::Model {
                name: row.genre_name,
            })
            .collect())
    }

    pub async fn create(
        &self,
        fields: &Validated,
        image: Option<String>,
    ) -> StoreResult<series::Model> {
        let now = now();
        let mut active = series::ActiveModel {
            image: Set(image),
            created: Set(now.clone()),
            updated: Set(now),
            ..Default::default()
        };
        fields.apply_to(&mut active)?;

        Ok(active.insert(&self.conn).await?)
    }

    /// Writes only the supplied columns and touches `updated`.
    pub async fn update(
        &self,
        id: i32,
        fields: &Validated,
        image: Option<String>,
    ) -> StoreResult<series::Model> {
        let mut active = series::ActiveModel {
            id: Unchanged(id),
            updated: Set(now()),
            ..Default::default()
        };
        fields.apply_to(&mut active)?;
        if let Some(image) = image {
            active.image = Set(Some(image));
        }

        Ok(active.update(&self.conn).await?)
    }

    pub async fn delete(&self, id: i32) -> StoreResult<()> {
        Series::delete_by_id(id).exec(&self.conn).await?;
        Ok(())
    }

    /// Links a genre to a series, creating the genre if needed.
    pub async fn link_genre(&self, id: i32, genre: &str) -> StoreResult<()> {
        Genres::insert(genres::ActiveModel {
            name: Set(genre.to_string()),
        })
        .on_conflict(
            OnConflict::column(genres::Column::Name)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(&self.conn)
        .await?;

        SeriesGenres::insert(series_genres::ActiveModel {
            series_id: Set(id),
            genre_name: Set(genre.to_string()),
        })
        .on_conflict(
            OnConflict::columns([
                series_genres::Column::SeriesId,
                series_genres::Column::GenreName,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(&self.conn)
        .await?;

        Ok(())
    }
}
