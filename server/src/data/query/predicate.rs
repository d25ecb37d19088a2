//! Store-native predicates
//!
//! The compiler produces [`Predicate`] values; rendering them to SQL is the
//! only place column references and placeholders meet. Values always travel
//! as bind parameters.

use crate::data::sql::{SqlDialect, SqlParams, SqlValue};

use super::table::{ColumnRef, ColumnType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Gte,
    Lte,
}

impl CompareOp {
    fn as_sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Gt => ">",
            CompareOp::Lt => "<",
            CompareOp::Gte => ">=",
            CompareOp::Lte => "<=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare {
        column: ColumnRef,
        op: CompareOp,
        value: SqlValue,
    },
    IsNull {
        column: ColumnRef,
        negated: bool,
    },
    /// Case-insensitive LIKE; `pattern` is already escaped
    Like {
        column: ColumnRef,
        pattern: String,
        negated: bool,
    },
    InList {
        column: ColumnRef,
        values: Vec<SqlValue>,
        negated: bool,
    },
    /// Inclusive range
    Between {
        column: ColumnRef,
        low: SqlValue,
        high: SqlValue,
    },
    /// OR group
    Any(Vec<Predicate>),
}

impl Predicate {
    /// Render to a SQL fragment, appending bind values to `params`
    pub fn to_sql(&self, dialect: &dyn SqlDialect, params: &mut SqlParams) -> String {
        match self {
            Self::Compare { column, op, value } => {
                let col = dialect.quote_ident(&column.column);
                let ph = params.push(value.clone(), dialect);
                format!("{} {} {}", col, op.as_sql(), ph)
            }
            Self::IsNull { column, negated } => {
                let col = dialect.quote_ident(&column.column);
                if *negated {
                    format!("{} IS NOT NULL", col)
                } else {
                    format!("{} IS NULL", col)
                }
            }
            Self::Like {
                column,
                pattern,
                negated,
            } => {
                let col = dialect.quote_ident(&column.column);
                let expr = if column.column_type == ColumnType::Text {
                    col
                } else {
                    dialect.cast_to_string(&col)
                };
                let ph = params.push(SqlValue::Text(pattern.clone()), dialect);
                dialect.ilike(&expr, &ph, *negated)
            }
            Self::InList {
                column,
                values,
                negated,
            } => {
                let col = dialect.quote_ident(&column.column);
                let placeholders: Vec<String> = values
                    .iter()
                    .map(|v| params.push(v.clone(), dialect))
                    .collect();
                let op = if *negated { "NOT IN" } else { "IN" };
                format!("{} {} ({})", col, op, placeholders.join(", "))
            }
            Self::Between { column, low, high } => {
                let col = dialect.quote_ident(&column.column);
                let low = params.push(low.clone(), dialect);
                let high = params.push(high.clone(), dialect);
                format!("{} BETWEEN {} AND {}", col, low, high)
            }
            Self::Any(preds) => {
                let parts: Vec<String> = preds.iter().map(|p| p.to_sql(dialect, params)).collect();
                format!("({})", parts.join(" OR "))
            }
        }
    }
}

/// AND all predicates into a `WHERE ...` clause; empty when there are none
pub fn where_clause(
    predicates: &[Predicate],
    dialect: &dyn SqlDialect,
    params: &mut SqlParams,
) -> String {
    if predicates.is_empty() {
        return String::new();
    }
    let parts: Vec<String> = predicates
        .iter()
        .map(|p| p.to_sql(dialect, params))
        .collect();
    format!(" WHERE {}", parts.join(" AND "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sql::{PostgresDialect, SqliteDialect};

    fn col(name: &str, column_type: ColumnType) -> ColumnRef {
        ColumnRef {
            column: name.to_string(),
            column_type,
        }
    }

    #[test]
    fn test_compare_all_operators() {
        let operators = [
            (CompareOp::Eq, "="),
            (CompareOp::Ne, "<>"),
            (CompareOp::Gt, ">"),
            (CompareOp::Lt, "<"),
            (CompareOp::Gte, ">="),
            (CompareOp::Lte, "<="),
        ];
        for (op, expected) in operators {
            let pred = Predicate::Compare {
                column: col("age", ColumnType::Integer),
                op,
                value: SqlValue::Int(30),
            };
            let mut params = SqlParams::default();
            let sql = pred.to_sql(&PostgresDialect, &mut params);
            assert_eq!(sql, format!("\"age\" {} $1", expected));
            assert_eq!(params.values, vec![SqlValue::Int(30)]);
        }
    }

    #[test]
    fn test_like_casts_non_text_columns() {
        let pred = Predicate::Like {
            column: col("age", ColumnType::Integer),
            pattern: "%4%".into(),
            negated: false,
        };
        let mut params = SqlParams::default();
        assert_eq!(
            pred.to_sql(&PostgresDialect, &mut params),
            r#""age"::TEXT ILIKE $1 ESCAPE '\'"#
        );
        assert_eq!(params.values, vec![SqlValue::Text("%4%".into())]);
    }

    #[test]
    fn test_in_list_and_between() {
        let pred = Predicate::InList {
            column: col("role", ColumnType::Text),
            values: vec![SqlValue::Text("admin".into()), SqlValue::Text("user".into())],
            negated: true,
        };
        let mut params = SqlParams::default();
        assert_eq!(
            pred.to_sql(&SqliteDialect, &mut params),
            "\"role\" NOT IN (?, ?)"
        );

        let pred = Predicate::Between {
            column: col("score", ColumnType::Real),
            low: SqlValue::Int(10),
            high: SqlValue::Int(20),
        };
        assert_eq!(
            pred.to_sql(&PostgresDialect, &mut params),
            "\"score\" BETWEEN $3 AND $4"
        );
        assert_eq!(params.values.len(), 4);
    }

    #[test]
    fn test_or_group_and_where_clause() {
        let search = Predicate::Any(vec![
            Predicate::Like {
                column: col("name", ColumnType::Text),
                pattern: "%a%".into(),
                negated: false,
            },
            Predicate::Like {
                column: col("email", ColumnType::Text),
                pattern: "%a%".into(),
                negated: false,
            },
        ]);
        let deleted = Predicate::IsNull {
            column: col("deleted_at", ColumnType::Timestamp),
            negated: false,
        };
        let mut params = SqlParams::default();
        let sql = where_clause(&[deleted, search], &SqliteDialect, &mut params);
        assert_eq!(
            sql,
            r#" WHERE "deleted_at" IS NULL AND ("name" LIKE ? ESCAPE '\' OR "email" LIKE ? ESCAPE '\')"#
        );
        assert_eq!(params.values.len(), 2);
    }

    #[test]
    fn test_empty_where_clause() {
        let mut params = SqlParams::default();
        assert_eq!(where_clause(&[], &PostgresDialect, &mut params), "");
    }
}
