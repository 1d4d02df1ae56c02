use serde_json::{Map, Value};
use sqlx::{self, postgres::PgRow, FromRow, PgPool};

use crate::database::manager::DatabaseError;
use crate::database::query_builder::{QueryBuilder, UpdateBuilder};
use crate::filter::FilterData;
use crate::types::Actor;

/// A table-backed row type.
///
/// `PROJECTION` is trusted SQL owned by the entity and may embed correlated
/// subqueries that reference the table by its bare name.
pub trait Entity: for<'r> FromRow<'r, PgRow> + Send + Unpin {
    const TABLE: &'static str;
    const LABEL: &'static str;
    const PROJECTION: &'static str = "*";
    const SOFT_DELETE: bool = false;
    /// Column holding the owning user's id, for owner-or-admin checks
    const OWNER_COLUMN: &'static str = "user_id";
}

pub struct Repository<T> {
    pool: PgPool,
    _phantom: std::marker::PhantomData<T>,
}

impl<T: Entity> Repository<T> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _phantom: std::marker::PhantomData,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn query(&self) -> Result<QueryBuilder<T>, DatabaseError> {
        Ok(QueryBuilder::<T>::new(T::TABLE)?
            .projection(T::PROJECTION)
            .soft_delete(T::SOFT_DELETE))
    }

    pub async fn select_any(&self, filter_data: FilterData) -> Result<Vec<T>, DatabaseError> {
        self.query()?.filter(filter_data)?.select_all(&self.pool).await
    }

    /// List ordered by a trusted entity expression instead of plain columns
    pub async fn select_ranked(
        &self,
        filter_data: FilterData,
        order_expr: &'static str,
    ) -> Result<Vec<T>, DatabaseError> {
        self.query()?
            .order_expr(Some(order_expr))
            .filter(filter_data)?
            .select_all(&self.pool)
            .await
    }

    pub async fn select_one(&self, where_clause: Value) -> Result<Option<T>, DatabaseError> {
        self.query()?
            .filter(FilterData::matching(where_clause))?
            .select_optional(&self.pool)
            .await
    }

    pub async fn select_404(&self, where_clause: Value) -> Result<T, DatabaseError> {
        self.select_one(where_clause)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("{} not found", T::LABEL)))
    }

    pub async fn count(&self, where_clause: Value) -> Result<i64, DatabaseError> {
        self.query()?
            .filter(FilterData::matching(where_clause))?
            .count(&self.pool)
            .await
    }

    pub async fn exists(&self, where_clause: Value) -> Result<bool, DatabaseError> {
        Ok(self.count(where_clause).await? > 0)
    }

    /// Count-then-Act precondition: the predicate must match exactly one live row
    pub async fn exactly_one(&self, where_clause: Value) -> Result<(), DatabaseError> {
        match self.count(where_clause).await? {
            0 => Err(DatabaseError::NotFound(format!("{} not found", T::LABEL))),
            1 => Ok(()),
            n => Err(DatabaseError::Conflict(format!(
                "{} rows in {} matched a single-row predicate",
                n,
                T::TABLE
            ))),
        }
    }

    /// Applies `update` to the single row matching `where_clause`.
    ///
    /// Zero affected rows after a successful count means a counter guard
    /// refused the change (or the row vanished in between).
    pub async fn update_one(&self, where_clause: Value, update: UpdateBuilder) -> Result<(), DatabaseError> {
        self.exactly_one(where_clause.clone()).await?;

        let affected = self
            .query()?
            .filter(FilterData::matching(where_clause))?
            .update(&update, &self.pool)
            .await?;

        match affected {
            1 => Ok(()),
            0 if update.is_guarded() => Err(DatabaseError::NotAllowed(format!(
                "Not allowed: {} value out of range",
                T::LABEL
            ))),
            0 => Err(DatabaseError::NotFound(format!("{} not found", T::LABEL))),
            n => Err(DatabaseError::Conflict(format!("{} rows in {} updated", n, T::TABLE))),
        }
    }

    pub async fn soft_delete_one(&self, where_clause: Value) -> Result<(), DatabaseError> {
        self.update_one(where_clause, UpdateBuilder::touching().mark_deleted()).await
    }

    /// Owner id of the live row with this id, or NotFound
    pub async fn owner_of(&self, id: i64) -> Result<i64, DatabaseError> {
        let sql = format!(
            "SELECT \"{owner}\" FROM \"{table}\" WHERE \"id\" = $1{live}",
            owner = T::OWNER_COLUMN,
            table = T::TABLE,
            live = if T::SOFT_DELETE { " AND \"deleted_at\" IS NULL" } else { "" },
        );
        sqlx::query_scalar::<_, i64>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("{} not found", T::LABEL)))
    }
}

/// Narrows a where document to the actor's own rows; admins are unscoped
pub fn scoped(where_clause: Value, actor: Actor, owner_column: &str) -> Value {
    match (actor.owner_id(), where_clause) {
        (Some(owner), Value::Object(mut map)) => {
            map.insert(owner_column.to_string(), Value::from(owner));
            Value::Object(map)
        }
        (Some(owner), Value::Null) => {
            let mut map = Map::new();
            map.insert(owner_column.to_string(), Value::from(owner));
            Value::Object(map)
        }
        (_, other) => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn owner_scope_adds_predicate() {
        assert_eq!(
            scoped(json!({ "id": 3 }), Actor::Owner(7), "user_id"),
            json!({ "id": 3, "user_id": 7 })
        );
    }

    #[test]
    fn admin_scope_is_unchanged() {
        assert_eq!(scoped(json!({ "id": 3 }), Actor::Admin, "user_id"), json!({ "id": 3 }));
    }
}
