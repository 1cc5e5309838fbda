use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{
    MySql, MySqlPool,
    mysql::MySqlArguments,
    query::{Query, QueryAs, QueryScalar},
};

use crate::error::ApiError;

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    U64(u64),
    U32(u32),
    F64(f64),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
    Null,
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::String(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::String(v)
    }
}

impl From<u64> for SqlValue {
    fn from(v: u64) -> Self {
        SqlValue::U64(v)
    }
}

impl From<u32> for SqlValue {
    fn from(v: u32) -> Self {
        SqlValue::U32(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::F64(v)
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(v: NaiveDate) -> Self {
        SqlValue::Date(v)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(v: DateTime<Utc>) -> Self {
        SqlValue::DateTime(v)
    }
}

macro_rules! bind_each {
    ($query:expr, $values:expr) => {{
        let mut query = $query;
        for value in $values {
            query = match value.clone() {
                SqlValue::String(v) => query.bind(v),
                SqlValue::U64(v) => query.bind(v),
                SqlValue::U32(v) => query.bind(v),
                SqlValue::F64(v) => query.bind(v),
                SqlValue::Date(v) => query.bind(v),
                SqlValue::DateTime(v) => query.bind(v),
                SqlValue::Null => query.bind(None::<String>),
            };
        }
        query
    }};
}

pub fn bind_query<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    values: &[SqlValue],
) -> Query<'q, MySql, MySqlArguments> {
    bind_each!(query, values)
}

pub fn bind_query_as<'q, O>(
    query: QueryAs<'q, MySql, O, MySqlArguments>,
    values: &[SqlValue],
) -> QueryAs<'q, MySql, O, MySqlArguments> {
    bind_each!(query, values)
}

pub fn bind_scalar<'q, O>(
    query: QueryScalar<'q, MySql, O, MySqlArguments>,
    values: &[SqlValue],
) -> QueryScalar<'q, MySql, O, MySqlArguments> {
    bind_each!(query, values)
}

/// ===============================
/// WHERE clause for list endpoints
/// ===============================
#[derive(Debug, Default)]
pub struct WhereClause {
    conditions: Vec<String>,
    values: Vec<SqlValue>,
}

impl WhereClause {
    pub fn eq(&mut self, column: &str, value: impl Into<SqlValue>) -> &mut Self {
        self.conditions.push(format!("{column} = ?"));
        self.values.push(value.into());
        self
    }

    /// Case-insensitive substring match over any of `columns`.
    /// Blank terms add nothing.
    pub fn search(&mut self, columns: &[&str], term: &str) -> &mut Self {
        let term = term.trim();
        if term.is_empty() || columns.is_empty() {
            return self;
        }

        let pattern = like_pattern(term);
        let any = columns
            .iter()
            .map(|c| format!("LOWER({c}) LIKE ?"))
            .collect::<Vec<_>>()
            .join(" OR ");
        self.conditions.push(format!("({any})"));
        for _ in columns {
            self.values.push(SqlValue::String(pattern.clone()));
        }
        self
    }

    /// Leading space included; empty when there are no conditions.
    pub fn sql(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.conditions.join(" AND "))
        }
    }

    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }
}

/// `%term%`, lowercased, with LIKE wildcards in the term escaped.
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.to_lowercase().chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

/// ===============================
/// Partial UPDATE builder
/// ===============================
#[derive(Debug)]
pub struct SqlUpdate {
    table: &'static str,
    assignments: Vec<&'static str>,
    values: Vec<SqlValue>,
}

impl SqlUpdate {
    pub fn new(table: &'static str) -> Self {
        Self {
            table,
            assignments: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn set(&mut self, column: &'static str, value: impl Into<SqlValue>) -> &mut Self {
        self.assignments.push(column);
        self.values.push(value.into());
        self
    }

    pub fn set_opt<T: Into<SqlValue>>(
        &mut self,
        column: &'static str,
        value: Option<T>,
    ) -> &mut Self {
        if let Some(v) = value {
            self.set(column, v);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn sql(&self) -> String {
        let set_clause = self
            .assignments
            .iter()
            .map(|c| format!("{c} = ?"))
            .collect::<Vec<_>>()
            .join(", ");
        format!("UPDATE {} SET {} WHERE id = ?", self.table, set_clause)
    }

    /// Runs the update against row `id`. Fails with 404 when the row does
    /// not exist and 400 when no column was set.
    pub async fn execute(&self, pool: &MySqlPool, id: u64, what: &str) -> Result<(), ApiError> {
        if self.is_empty() {
            return Err(ApiError::BadRequest("No fields provided for update".into()));
        }

        let sql = self.sql();
        let result = bind_query(sqlx::query(&sql), &self.values)
            .bind(id)
            .execute(pool)
            .await?;

        // Zero rows can also mean nothing changed, so confirm the row exists.
        if result.rows_affected() == 0 && !row_exists(pool, self.table, id).await? {
            return Err(ApiError::not_found(what));
        }
        Ok(())
    }
}

pub async fn row_exists(pool: &MySqlPool, table: &str, id: u64) -> Result<bool, sqlx::Error> {
    let sql = format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?)");
    let exists = sqlx::query_scalar::<_, i64>(&sql)
        .bind(id)
        .fetch_one(pool)
        .await?;
    Ok(exists != 0)
}

pub async fn delete_row(
    pool: &MySqlPool,
    table: &'static str,
    id: u64,
    what: &str,
) -> Result<(), ApiError> {
    let sql = format!("DELETE FROM {table} WHERE id = ?");
    let result = sqlx::query(&sql).bind(id).execute(pool).await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found(what));
    }
    Ok(())
}

/// Binds: new status, id, expected current status.
pub fn transition_sql(table: &str, extra: Option<&str>) -> String {
    match extra {
        Some(assignment) => {
            format!("UPDATE {table} SET status = ?, {assignment} WHERE id = ? AND status = ?")
        }
        None => format!("UPDATE {table} SET status = ? WHERE id = ? AND status = ?"),
    }
}

/// Moves row `id` from status `from` to status `to`, touching nothing else
/// except the optional `extra` assignment (e.g. `payment_date = NOW()`).
///
/// The `from` status is part of the WHERE clause, so the transition happens
/// at most once. A row in any other status yields 409 with its current
/// status; a missing row yields 404.
pub async fn transition_status(
    pool: &MySqlPool,
    table: &'static str,
    id: u64,
    from: &str,
    to: &str,
    extra: Option<&str>,
    what: &str,
) -> Result<(), ApiError> {
    let sql = transition_sql(table, extra);
    let result = sqlx::query(&sql)
        .bind(to)
        .bind(id)
        .bind(from)
        .execute(pool)
        .await?;

    if result.rows_affected() > 0 {
        return Ok(());
    }

    let current_sql = format!("SELECT status FROM {table} WHERE id = ?");
    let current = sqlx::query_scalar::<_, String>(&current_sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    match current {
        None => Err(ApiError::not_found(what)),
        Some(status) => Err(ApiError::Conflict(format!("{what} is already {status}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("B-2"), "%b-2%");
        assert_eq!(like_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }

    #[test]
    fn empty_where_clause_renders_nothing() {
        let clause = WhereClause::default();
        assert_eq!(clause.sql(), "");
        assert!(clause.values().is_empty());
    }

    #[test]
    fn where_clause_combines_filters_and_search() {
        let mut clause = WhereClause::default();
        clause
            .eq("status", "Pending")
            .search(&["student_name", "roll_no"], "  Asha ");

        assert_eq!(
            clause.sql(),
            " WHERE status = ? AND (LOWER(student_name) LIKE ? OR LOWER(roll_no) LIKE ?)"
        );
        assert_eq!(
            clause.values(),
            &[
                SqlValue::String("Pending".into()),
                SqlValue::String("%asha%".into()),
                SqlValue::String("%asha%".into()),
            ]
        );
    }

    #[test]
    fn blank_search_is_ignored() {
        let mut clause = WhereClause::default();
        clause.search(&["name"], "   ");
        assert_eq!(clause.sql(), "");
    }

    #[test]
    fn update_lists_only_set_columns() {
        let mut update = SqlUpdate::new("rooms");
        update
            .set("room_no", "A-101")
            .set_opt("capacity", Some(3u32))
            .set_opt::<u32>("occupied", None);

        assert!(!update.is_empty());
        assert_eq!(update.sql(), "UPDATE rooms SET room_no = ?, capacity = ? WHERE id = ?");
        assert_eq!(update.values.len(), 2);
    }

    #[test]
    fn transition_touches_one_row_in_the_expected_status() {
        assert_eq!(
            transition_sql("leave_requests", None),
            "UPDATE leave_requests SET status = ? WHERE id = ? AND status = ?"
        );
        assert_eq!(
            transition_sql("fee_records", Some("payment_date = NOW()")),
            "UPDATE fee_records SET status = ?, payment_date = NOW() WHERE id = ? AND status = ?"
        );
    }

    #[test]
    fn empty_update_is_detected() {
        assert!(SqlUpdate::new("students").is_empty());
    }
}
