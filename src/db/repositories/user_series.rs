use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait, Value,
    sea_query::{Expr, OnConflict},
};

use crate::db::{StoreError, StoreResult};
use crate::entities::{prelude::*, user_series};

/// One of the two independent per-user columns of a `user_series` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Rating,
    State,
}

impl Slot {
    #[must_use]
    pub const fn column(self) -> user_series::Column {
        match self {
            Self::Rating => user_series::Column::Rating,
            Self::State => user_series::Column::State,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Rating => "rating",
            Self::State => "state",
        }
    }
}

pub struct UserSeriesRepository {
    conn: DatabaseConnection,
}

impl UserSeriesRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get(
        &self,
        user_id: i32,
        series_id: i32,
    ) -> StoreResult<Option<user_series::Model>> {
        Ok(UserSeries::find()
            .filter(user_series::Column::UserId.eq(user_id))
            .filter(user_series::Column::SeriesId.eq(series_id))
            .one(&self.conn)
            .await?)
    }

    /// Fills an empty slot in a single statement: inserts the row, or sets
    /// the slot on the existing row only while it is still NULL. Returns
    /// [`StoreError::Duplicate`] when the slot already holds a value.
    pub async fn fill(
        &self,
        user_id: i32,
        series_id: i32,
        slot: Slot,
        value: Value,
    ) -> StoreResult<user_series::Model> {
        let mut active = user_series::ActiveModel {
            user_id: Set(user_id),
            series_id: Set(series_id),
            ..Default::default()
        };
        active.set(slot.column(), value);

        let affected = UserSeries::insert(active)
            .on_conflict(
                OnConflict::columns([user_series::Column::UserId, user_series::Column::SeriesId])
                    .update_column(slot.column())
                    .action_and_where(Expr::col((UserSeries, slot.column())).is_null())
                    .to_owned(),
            )
            .exec_without_returning(&self.conn)
            .await?;

        if affected == 0 {
            return Err(StoreError::Duplicate);
        }

        self.get(user_id, series_id)
            .await?
            .ok_or(StoreError::NotFound)
    }

    /// Overwrites a slot that already holds a value.
    pub async fn replace(
        &self,
        user_id: i32,
        series_id: i32,
        slot: Slot,
        value: Value,
    ) -> StoreResult<user_series::Model> {
        let result = UserSeries::update_many()
            .col_expr(slot.column(), Expr::value(value))
            .filter(user_series::Column::UserId.eq(user_id))
            .filter(user_series::Column::SeriesId.eq(series_id))
            .filter(slot.column().is_not_null())
            .exec(&self.conn)
            .await?;

        if result.rows_affected == 0 {
            return Err(StoreError::NotFound);
        }

        self.get(user_id, series_id)
            .await?
            .ok_or(StoreError::NotFound)
    }

    /// Empties a slot, dropping the row once both slots are empty.
    pub async fn clear(&self, user_id: i32, series_id: i32, slot: Slot) -> StoreResult<()> {
        let txn = self.conn.begin().await?;

        let result = UserSeries::update_many()
            .col_expr(slot.column(), Expr::value(Value::from(None::<String>)))
            .filter(user_series::Column::UserId.eq(user_id))
            .filter(user_series::Column::SeriesId.eq(series_id))
            .filter(slot.column().is_not_null())
            .exec(&txn)
            .await?;

        if result.rows_affected == 0 {
            return Err(StoreError::NotFound);
        }

        UserSeries::delete_many()
            .filter(user_series::Column::UserId.eq(user_id))
            .filter(user_series::Column::SeriesId.eq(series_id))
            .filter(user_series::Column::Rating.is_null())
            .filter(user_series::Column::State.is_null())
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(())
    }
}
