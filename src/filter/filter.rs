use serde_json::Value;

use super::error::{is_identifier, FilterError};
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{FilterData, FilterOrderInfo, FilterWhereOptions, SqlResult};

/// Upper bound on rows returned by any list query
pub const MAX_LIMIT: i64 = 100;

pub struct Filter {
    table_name: String,
    projection: &'static str,
    where_data: Option<Value>,
    order_data: Vec<FilterOrderInfo>,
    order_expr: Option<&'static str>,
    limit: Option<i64>,
    options: FilterWhereOptions,
}

impl Filter {
    pub fn new(table_name: impl Into<String>) -> Result<Self, FilterError> {
        let table_name = table_name.into();
        Self::validate_table_name(&table_name)?;
        Ok(Self {
            table_name,
            projection: "*",
            where_data: None,
            order_data: vec![],
            order_expr: None,
            limit: None,
            options: FilterWhereOptions::default(),
        })
    }

    pub fn assign(&mut self, data: FilterData) -> Result<&mut Self, FilterError> {
        if let Some(where_clause) = data.where_clause {
            self.where_clause(where_clause)?;
        }
        if let Some(order) = data.order {
            self.order(order)?;
        }
        if let Some(limit) = data.limit {
            self.limit(limit)?;
        }
        Ok(self)
    }

    /// Entity-owned select list; may contain correlated subqueries
    pub fn projection(&mut self, projection: &'static str) -> &mut Self {
        self.projection = projection;
        self
    }

    pub fn soft_delete(&mut self, enabled: bool) -> &mut Self {
        self.options.soft_delete = enabled;
        self
    }

    pub fn where_clause(&mut self, conditions: Value) -> Result<&mut Self, FilterError> {
        FilterWhere::validate(&conditions)?;
        self.where_data = Some(conditions);
        Ok(self)
    }

    pub fn order(&mut self, order_spec: Value) -> Result<&mut Self, FilterError> {
        self.order_data = FilterOrder::validate_and_parse(&order_spec)?;
        Ok(self)
    }

    /// Entity-owned ORDER BY expression, used instead of column ordering
    pub fn order_expr(&mut self, expr: &'static str) -> &mut Self {
        self.order_expr = Some(expr);
        self
    }

    pub fn limit(&mut self, limit: i64) -> Result<&mut Self, FilterError> {
        if limit <= 0 {
            return Err(FilterError::InvalidLimit("Limit must be positive".to_string()));
        }
        if limit > MAX_LIMIT {
            tracing::debug!("Limit {} exceeds max {}, capping to max", limit, MAX_LIMIT);
        }
        self.limit = Some(limit.min(MAX_LIMIT));
        Ok(self)
    }

    pub fn to_sql(&self) -> Result<SqlResult, FilterError> {
        let where_result = self.to_where_sql()?;
        let order_clause = match self.order_expr {
            Some(expr) => format!("ORDER BY {}", expr),
            None => FilterOrder::generate(&self.order_data),
        };

        let query = [
            format!("SELECT {}", self.projection),
            format!("FROM \"{}\"", self.table_name),
            Self::where_prefix(&where_result.query),
            order_clause,
            format!("LIMIT {}", self.limit.unwrap_or(MAX_LIMIT)),
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        Ok(SqlResult { query, params: where_result.params })
    }

    /// WHERE body (without the keyword), numbered from `$starting_param_index + 1`
    pub fn to_where_sql_from(&self, starting_param_index: usize) -> Result<SqlResult, FilterError> {
        let (where_clause, params) = match self.where_data {
            Some(ref where_data) => FilterWhere::generate(where_data, starting_param_index, &self.options)?,
            None => FilterWhere::generate_empty(&self.options),
        };
        Ok(SqlResult { query: where_clause, params })
    }

    pub fn to_where_sql(&self) -> Result<SqlResult, FilterError> {
        self.to_where_sql_from(0)
    }

    pub fn to_count_sql(&self) -> Result<SqlResult, FilterError> {
        let where_result = self.to_where_sql()?;
        let query = [
            format!("SELECT COUNT(*) AS count FROM \"{}\"", self.table_name),
            Self::where_prefix(&where_result.query),
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
        Ok(SqlResult { query, params: where_result.params })
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    fn where_prefix(clause: &str) -> String {
        if clause.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clause)
        }
    }

    fn validate_table_name(name: &str) -> Result<(), FilterError> {
        if !is_identifier(name) {
            return Err(FilterError::InvalidTableName(format!("Invalid table name format: {}", name)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn select_with_soft_delete_order_and_cap() {
        let mut filter = Filter::new("posts").unwrap();
        filter
            .soft_delete(true)
            .assign(FilterData {
                where_clause: Some(json!({ "challenge_id": 3, "id": { "$gt": 10 } })),
                order: Some(json!("created_at desc")),
                limit: Some(500),
            })
            .unwrap();
        let sql = filter.to_sql().unwrap();
        assert_eq!(
            sql.query,
            "SELECT * FROM \"posts\" WHERE \"deleted_at\" IS NULL AND \"challenge_id\" = $1 AND \"id\" > $2 ORDER BY \"created_at\" DESC LIMIT 100"
        );
        assert_eq!(sql.params, vec![json!(3), json!(10)]);
    }

    #[test]
    fn count_without_filter() {
        let filter = Filter::new("levels").unwrap();
        assert_eq!(filter.to_count_sql().unwrap().query, "SELECT COUNT(*) AS count FROM \"levels\"");
    }

    #[test]
    fn order_expression_overrides_columns() {
        let mut filter = Filter::new("challenges").unwrap();
        filter.order(json!("id asc")).unwrap();
        filter.order_expr("\"weight\" DESC").limit(20).unwrap();
        let sql = filter.to_sql().unwrap();
        assert!(sql.query.ends_with("ORDER BY \"weight\" DESC LIMIT 20"));
    }

    #[test]
    fn rejects_invalid_table_and_limit() {
        assert!(Filter::new("users; drop").is_err());
        assert!(Filter::new("users").unwrap().limit(0).is_err());
    }
}
