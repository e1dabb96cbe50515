//! Query helpers shared by every repository.

use sea_orm::{
    ConnectionTrait, DbErr, EntityTrait, FromQueryResult, PaginatorTrait, QuerySelect, Select,
    Statement, Value,
};
use serde::Serialize;

/// Offset/limit window of a list request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub offset: u64,
    pub limit: u64,
}

impl Default for PageWindow {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 10,
        }
    }
}

/// One page of rows plus the unwindowed row count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub total: u64,
}

impl<T> Paged<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paged<U> {
        Paged {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
        }
    }
}

/// Counts `select`, then runs it inside `window`.
pub async fn paged_query<E, M, C>(
    conn: &C,
    select: Select<E>,
    window: PageWindow,
) -> Result<Paged<M>, DbErr>
where
    E: EntityTrait,
    E::Model: Sync,
    M: FromQueryResult + Send + Sync,
    C: ConnectionTrait,
{
    let total = select.clone().count(conn).await?;

    let items = select
        .offset(window.offset)
        .limit(window.limit)
        .into_model::<M>()
        .all(conn)
        .await?;

    Ok(Paged { items, total })
}

/// Runs parameterized SQL (`?` placeholders) and maps each row to `M`.
pub async fn query_raw<M, C>(
    conn: &C,
    sql: &str,
    values: impl IntoIterator<Item = Value>,
) -> Result<Vec<M>, DbErr>
where
    M: FromQueryResult,
    C: ConnectionTrait,
{
    let statement = Statement::from_sql_and_values(conn.get_database_backend(), sql, values);
    M::find_by_statement(statement).all(conn).await
}
