use serde_json::Value;
use sqlx::{self, postgres::PgArguments, FromRow, PgPool, Row};

use crate::database::manager::DatabaseError;
use crate::filter::types::SqlResult;
use crate::filter::{Filter, FilterData, FilterError};

pub struct QueryBuilder<T> {
    filter: Filter,
    _phantom: std::marker::PhantomData<T>,
}

impl<T> QueryBuilder<T>
where
    T: for<'r> FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin,
{
    pub fn new(table_name: &str) -> Result<Self, DatabaseError> {
        Ok(Self {
            filter: Filter::new(table_name)?,
            _phantom: std::marker::PhantomData,
        })
    }

    pub fn projection(mut self, projection: &'static str) -> Self {
        self.filter.projection(projection);
        self
    }

    pub fn soft_delete(mut self, enabled: bool) -> Self {
        self.filter.soft_delete(enabled);
        self
    }

    pub fn order_expr(mut self, expr: Option<&'static str>) -> Self {
        if let Some(expr) = expr {
            self.filter.order_expr(expr);
        }
        self
    }

    pub fn filter(mut self, filter_data: FilterData) -> Result<Self, DatabaseError> {
        self.filter.assign(filter_data)?;
        Ok(self)
    }

    pub async fn select_all(self, pool: &PgPool) -> Result<Vec<T>, DatabaseError> {
        let sql_result = self.filter.to_sql()?;
        let mut q = sqlx::query_as::<_, T>(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query_as(q, p);
        }
        let rows = q.fetch_all(pool).await?;
        Ok(rows)
    }

    pub async fn select_optional(mut self, pool: &PgPool) -> Result<Option<T>, DatabaseError> {
        self.filter.limit(1)?;
        let sql_result = self.filter.to_sql()?;
        let mut q = sqlx::query_as::<_, T>(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query_as(q, p);
        }
        let row = q.fetch_optional(pool).await?;
        Ok(row)
    }

    pub async fn count(self, pool: &PgPool) -> Result<i64, DatabaseError> {
        let sql_result = self.filter.to_count_sql()?;
        let mut q = sqlx::query(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query(q, p);
        }
        let row = q.fetch_one(pool).await?;
        let count: i64 = row.try_get("count")?;
        Ok(count)
    }

    /// Executes an UPDATE against the rows this builder's filter matches
    pub async fn update(self, update: &UpdateBuilder, pool: &PgPool) -> Result<u64, DatabaseError> {
        let sql_result = update.to_sql(&self.filter)?;
        let mut q = sqlx::query(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query(q, p);
        }
        let result = q.execute(pool).await?;
        Ok(result.rows_affected())
    }
}

#[derive(Debug, Clone)]
enum Assignment {
    Value { value: Value, cast: Option<&'static str> },
    Adjust(i64),
    Now,
}

/// Partial `UPDATE ... SET` compiled from the fields a caller actually provided.
///
/// Decrements registered through [`UpdateBuilder::adjust`] carry an atomic
/// `col + delta >= 0` guard in the same statement, and an increment carries
/// a `col <= i64::MAX - delta` ceiling, so a refused adjustment shows up as
/// zero affected rows.
#[derive(Debug, Clone, Default)]
pub struct UpdateBuilder {
    assignments: Vec<(&'static str, Assignment)>,
    touch_updated_at: bool,
}

impl UpdateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also stamps `updated_at = now()`
    pub fn touching() -> Self {
        Self {
            touch_updated_at: true,
            ..Self::default()
        }
    }

    pub fn set(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.assignments.push((column, Assignment::Value { value: value.into(), cast: None }));
        self
    }

    /// Binds as text and casts server-side, for columns like DATE
    pub fn set_cast(mut self, column: &'static str, value: impl Into<Value>, cast: &'static str) -> Self {
        self.assignments.push((column, Assignment::Value { value: value.into(), cast: Some(cast) }));
        self
    }

    pub fn set_if<V: Into<Value>>(self, column: &'static str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.set(column, v),
            None => self,
        }
    }

    /// Relative counter update `col = col + delta`
    pub fn adjust(mut self, column: &'static str, delta: i64) -> Self {
        self.assignments.push((column, Assignment::Adjust(delta)));
        self
    }

    /// `col = now()`
    pub fn stamp(mut self, column: &'static str) -> Self {
        self.assignments.push((column, Assignment::Now));
        self
    }

    /// Soft delete marker `deleted_at = now()`
    pub fn mark_deleted(self) -> Self {
        self.stamp("deleted_at")
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// True when the statement carries a range guard on a counter
    pub fn is_guarded(&self) -> bool {
        self.assignments
            .iter()
            .any(|(_, a)| matches!(a, Assignment::Adjust(delta) if *delta != 0))
    }

    pub fn to_sql(&self, filter: &Filter) -> Result<SqlResult, FilterError> {
        if self.assignments.is_empty() {
            return Err(FilterError::EmptyUpdate);
        }

        let mut params: Vec<Value> = Vec::new();
        let mut sets = Vec::with_capacity(self.assignments.len() + 1);
        let mut guards = Vec::new();

        for (column, assignment) in &self.assignments {
            crate::filter::error::validate_column(column)?;
            match assignment {
                Assignment::Value { value, cast } => {
                    params.push(value.clone());
                    let placeholder = match cast {
                        Some(cast) => format!("${}::{}", params.len(), cast),
                        None => format!("${}", params.len()),
                    };
                    sets.push(format!("\"{}\" = {}", column, placeholder));
                }
                Assignment::Adjust(delta) => {
                    params.push(Value::from(*delta));
                    sets.push(format!("\"{col}\" = \"{col}\" + ${n}", col = column, n = params.len()));
                    if *delta < 0 {
                        guards.push(format!("\"{col}\" + ${n} >= 0", col = column, n = params.len()));
                    } else if *delta > 0 {
                        guards.push(format!("\"{col}\" <= {max} - ${n}", col = column, max = i64::MAX, n = params.len()));
                    }
                }
                Assignment::Now => sets.push(format!("\"{}\" = now()", column)),
            }
        }
        if self.touch_updated_at {
            sets.push("\"updated_at\" = now()".to_string());
        }

        let where_result = filter.to_where_sql_from(params.len())?;
        params.extend(where_result.params);

        let mut conditions = Vec::new();
        if !where_result.query.is_empty() {
            conditions.push(where_result.query);
        }
        conditions.extend(guards);

        let mut query = format!("UPDATE \"{}\" SET {}", filter.table_name(), sets.join(", "));
        if !conditions.is_empty() {
            query.push_str(" WHERE ");
            query.push_str(&conditions.join(" AND "));
        }
        Ok(SqlResult { query, params })
    }
}

pub(crate) fn bind_param_query<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    v: &'q Value,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s),
        // Arrays are expanded by FilterWhere; anything left is bound as JSONB
        Value::Array(_) | Value::Object(_) => q.bind(sqlx::types::Json(v)),
    }
}

pub(crate) fn bind_param_query_as<'q, O>(
    q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>,
    v: &'q Value,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>
where
    O: for<'r> FromRow<'r, sqlx::postgres::PgRow>,
{
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s),
        Value::Array(_) | Value::Object(_) => q.bind(sqlx::types::Json(v)),
    }
}
