use serde_json::Value;

use super::error::{validate_column, FilterError};
use super::types::{FilterOp, FilterWhereInfo, FilterWhereOptions};

/// Mean Earth radius used for great-circle distances, in meters
const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Compiles a JSON filter document into a WHERE clause with positional params.
///
/// Every value ends up in `param_values`; the clause text only ever contains
/// quoted, validated column names, operators and `$n` placeholders.
pub struct FilterWhere {
    param_values: Vec<Value>,
    param_offset: usize,
}

impl FilterWhere {
    /// `starting_param_index` is the number of params already bound by the
    /// caller (e.g. the SET list of an UPDATE), so the first placeholder is
    /// `$starting_param_index + 1`.
    pub fn new(starting_param_index: usize) -> Self {
        Self {
            param_values: vec![],
            param_offset: starting_param_index,
        }
    }

    pub fn generate(
        where_data: &Value,
        starting_param_index: usize,
        options: &FilterWhereOptions,
    ) -> Result<(String, Vec<Value>), FilterError> {
        let mut filter_where = Self::new(starting_param_index);
        filter_where.build(where_data, options)
    }

    pub fn generate_empty(options: &FilterWhereOptions) -> (String, Vec<Value>) {
        let where_clause = if options.soft_delete {
            "\"deleted_at\" IS NULL".to_string()
        } else {
            String::new()
        };
        (where_clause, vec![])
    }

    pub fn validate(where_data: &Value) -> Result<(), FilterError> {
        match where_data {
            Value::Null | Value::Object(_) => Ok(()),
            _ => Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
        }
    }

    fn build(&mut self, where_data: &Value, options: &FilterWhereOptions) -> Result<(String, Vec<Value>), FilterError> {
        self.param_values.clear();

        let mut sql_conditions = vec![];
        if options.soft_delete {
            sql_conditions.push("\"deleted_at\" IS NULL".to_string());
        }
        if !where_data.is_null() {
            sql_conditions.extend(self.render(where_data)?);
        }

        Ok((sql_conditions.join(" AND "), self.param_values.clone()))
    }

    /// Renders one object level into a list of ANDed conditions
    fn render(&mut self, where_data: &Value) -> Result<Vec<String>, FilterError> {
        let obj = where_data
            .as_object()
            .ok_or_else(|| FilterError::InvalidWhereClause("Unsupported WHERE format".to_string()))?;

        let mut conditions = Vec::new();
        for (key, value) in obj {
            if key.starts_with('$') {
                conditions.push(self.parse_logical_operator(key, value)?);
            } else {
                for info in Self::parse_field_condition(key, value)? {
                    conditions.push(self.build_sql_condition(&info)?);
                }
            }
        }
        Ok(conditions)
    }

    fn render_group(&mut self, value: &Value) -> Result<String, FilterError> {
        let parts = self.render(value)?;
        Ok(if parts.is_empty() { "TRUE".to_string() } else { parts.join(" AND ") })
    }

    fn parse_logical_operator(&mut self, op: &str, value: &Value) -> Result<String, FilterError> {
        let info = match op {
            "$and" | "$or" => {
                let arr = value
                    .as_array()
                    .ok_or_else(|| FilterError::InvalidOperatorData(format!("{} requires array", op)))?;
                if arr.is_empty() {
                    return Err(FilterError::InvalidOperatorData(format!("{} requires at least one clause", op)));
                }
                let mut sql_parts = Vec::with_capacity(arr.len());
                for v in arr {
                    sql_parts.push(format!("({})", self.render_group(v)?));
                }
                let joiner = if op == "$and" { " AND " } else { " OR " };
                FilterWhereInfo::Group(format!("({})", sql_parts.join(joiner)))
            }
            "$not" => FilterWhereInfo::Group(format!("NOT ({})", self.render_group(value)?)),
            "$within_radius" => FilterWhereInfo::Group(self.within_radius(value)?),
            _ => return Err(FilterError::UnsupportedOperator(op.to_string())),
        };
        self.build_sql_condition(&info)
    }

    /// `{"$within_radius": {"long": x, "lat": y, "meters": r}}` over the
    /// `longitude`/`latitude` columns, using the haversine formula.
    fn within_radius(&mut self, value: &Value) -> Result<String, FilterError> {
        let number = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_f64)
                .ok_or_else(|| FilterError::InvalidOperatorData(format!("$within_radius requires numeric {}", key)))
        };
        let (long, lat, meters) = (number("long")?, number("lat")?, number("meters")?);
        if meters < 0.0 {
            return Err(FilterError::InvalidOperatorData("$within_radius requires non-negative meters".to_string()));
        }

        let lat_p = self.param(Value::from(lat));
        let long_p = self.param(Value::from(long));
        let meters_p = self.param(Value::from(meters));
        Ok(format!(
            "({r} * 2 * asin(sqrt(power(sin(radians(\"latitude\" - {lat}) / 2), 2) + cos(radians({lat})) * cos(radians(\"latitude\")) * power(sin(radians(\"longitude\" - {long}) / 2), 2)))) <= {meters}",
            r = EARTH_RADIUS_METERS,
            lat = lat_p,
            long = long_p,
            meters = meters_p,
        ))
    }

    fn parse_field_condition(field: &str, value: &Value) -> Result<Vec<FilterWhereInfo>, FilterError> {
        validate_column(field)?;
        match value {
            Value::Object(obj) if obj.keys().any(|k| k.starts_with('$')) => obj
                .iter()
                .map(|(op_key, op_val)| {
                    Ok(FilterWhereInfo::Field {
                        column: field.to_string(),
                        operator: Self::map_operator(op_key)?,
                        data: op_val.clone(),
                    })
                })
                .collect(),
            // Implicit equality: { field: value }
            _ => Ok(vec![FilterWhereInfo::Field {
                column: field.to_string(),
                operator: FilterOp::Eq,
                data: value.clone(),
            }]),
        }
    }

    fn map_operator(op_key: &str) -> Result<FilterOp, FilterError> {
        Ok(match op_key {
            "$eq" => FilterOp::Eq,
            "$ne" | "$neq" => FilterOp::Ne,
            "$gt" => FilterOp::Gt,
            "$gte" => FilterOp::Gte,
            "$lt" => FilterOp::Lt,
            "$lte" => FilterOp::Lte,
            "$like" => FilterOp::Like,
            "$ilike" => FilterOp::ILike,
            "$in" => FilterOp::In,
            "$nin" => FilterOp::NIn,
            "$between" => FilterOp::Between,
            other => return Err(FilterError::UnsupportedOperator(other.to_string())),
        })
    }

    fn build_sql_condition(&mut self, condition: &FilterWhereInfo) -> Result<String, FilterError> {
        let (column, operator, data) = match condition {
            FilterWhereInfo::Group(sql) => return Ok(sql.clone()),
            FilterWhereInfo::Field { column, operator, data } => (column, *operator, data),
        };

        let quoted_column = format!("\"{}\"", column);
        let binary = |this: &mut Self, op: &str| -> Result<String, FilterError> {
            if data.is_array() || data.is_object() {
                return Err(FilterError::InvalidOperatorData(format!("{} requires a scalar on {}", op, column)));
            }
            Ok(format!("{} {} {}", quoted_column, op, this.param(data.clone())))
        };

        match operator {
            FilterOp::Eq if data.is_null() => Ok(format!("{} IS NULL", quoted_column)),
            FilterOp::Ne if data.is_null() => Ok(format!("{} IS NOT NULL", quoted_column)),
            FilterOp::Eq => binary(self, "="),
            FilterOp::Ne => binary(self, "<>"),
            FilterOp::Gt => binary(self, ">"),
            FilterOp::Gte => binary(self, ">="),
            FilterOp::Lt => binary(self, "<"),
            FilterOp::Lte => binary(self, "<="),
            FilterOp::Like => binary(self, "LIKE"),
            FilterOp::ILike => binary(self, "ILIKE"),
            FilterOp::In | FilterOp::NIn => {
                let values = data
                    .as_array()
                    .ok_or_else(|| FilterError::InvalidOperatorData("$in/$nin requires array".to_string()))?;
                let negate = operator == FilterOp::NIn;
                if values.is_empty() {
                    return Ok(if negate { "1=1" } else { "1=0" }.to_string());
                }
                let params: Vec<String> = values.iter().map(|v| self.param(v.clone())).collect();
                let keyword = if negate { "NOT IN" } else { "IN" };
                Ok(format!("{} {} ({})", quoted_column, keyword, params.join(", ")))
            }
            FilterOp::Between => match data.as_array().map(Vec::as_slice) {
                Some([low, high]) => Ok(format!(
                    "{} BETWEEN {} AND {}",
                    quoted_column,
                    self.param(low.clone()),
                    self.param(high.clone())
                )),
                _ => Err(FilterError::InvalidOperatorData("$between requires exactly 2 values".to_string())),
            },
        }
    }

    fn param(&mut self, value: Value) -> String {
        self.param_values.push(value);
        format!("${}", self.param_offset + self.param_values.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn soft() -> FilterWhereOptions {
        FilterWhereOptions { soft_delete: true }
    }

    #[test]
    fn values_are_always_bound() {
        let (sql, params) = FilterWhere::generate(
            &json!({ "name": "x'; DROP TABLE users; --", "id": { "$gt": 5 } }),
            0,
            &FilterWhereOptions::default(),
        )
        .unwrap();
        assert!(!sql.contains("DROP"));
        assert!(sql.contains("\"id\" > $"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn soft_delete_predicate_is_prepended() {
        let (sql, params) = FilterWhere::generate(&json!({ "user_id": 7 }), 0, &soft()).unwrap();
        assert_eq!(sql, "\"deleted_at\" IS NULL AND \"user_id\" = $1");
        assert_eq!(params, vec![json!(7)]);
    }

    #[test]
    fn numbering_starts_after_existing_params() {
        let (sql, params) = FilterWhere::generate(
            &json!({ "id": { "$in": [1, 2] }, "$or": [{ "from_id": 3 }, { "to_id": 3 }] }),
            2,
            &FilterWhereOptions::default(),
        )
        .unwrap();
        // Object keys iterate in sorted order, so `$or` renders before `id`
        assert_eq!(sql, "((\"from_id\" = $3) OR (\"to_id\" = $4)) AND \"id\" IN ($5, $6)");
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn not_and_null_handling() {
        let (sql, _) = FilterWhere::generate(
            &json!({ "$not": { "status": "inactive" }, "email": null }),
            0,
            &FilterWhereOptions::default(),
        )
        .unwrap();
        assert_eq!(sql, "NOT (\"status\" = $1) AND \"email\" IS NULL");
    }

    #[test]
    fn within_radius_binds_coordinates() {
        let (sql, params) = FilterWhere::generate(
            &json!({ "$within_radius": { "long": 4.35, "lat": 50.85, "meters": 1000 } }),
            0,
            &FilterWhereOptions::default(),
        )
        .unwrap();
        assert!(sql.contains("asin(sqrt("));
        assert!(sql.ends_with("<= $3"));
        assert_eq!(params, vec![json!(50.85), json!(4.35), json!(1000.0)]);
    }

    #[test]
    fn rejects_bad_columns_and_operators() {
        let opts = FilterWhereOptions::default();
        assert!(FilterWhere::generate(&json!({ "id;--": 1 }), 0, &opts).is_err());
        assert!(FilterWhere::generate(&json!({ "id": { "$regex": ".*" } }), 0, &opts).is_err());
        assert!(FilterWhere::generate(&json!({ "$or": [] }), 0, &opts).is_err());
        assert!(FilterWhere::validate(&json!("1=1")).is_err());
    }

    #[test]
    fn empty_in_matches_nothing() {
        let (sql, params) =
            FilterWhere::generate(&json!({ "id": { "$in": [] } }), 0, &FilterWhereOptions::default()).unwrap();
        assert_eq!(sql, "1=0");
        assert!(params.is_empty());
    }
}
