//! Filter composition for list endpoints.
//!
//! Each resource describes its optional filters as an ordered list of
//! [`Predicate`]s; [`CriteriaBuilder`] turns that list into a complete
//! `SELECT` statement. Predicates are appended in the order given: the first
//! one opens the `WHERE`, the rest are joined with `AND`, and placeholders are
//! numbered by how many values have actually been bound so far.

use serde_json::Value;

use super::manager::DatabaseError;
use super::sql::SqlResult;

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Case-insensitive substring match, binds `%text%`
    Contains { column: &'static str, text: String },
    /// `column >= $N`
    AtLeast { column: &'static str, value: Value },
    /// `column <= $N`
    AtMost { column: &'static str, value: Value },
    /// Constant condition that binds nothing, e.g. `equity > 0`
    Literal(&'static str),
}

/// A resource filter that knows how to express itself as predicates.
///
/// `predicates` returns only the filters that are present, in the
/// resource's declared order, and may reject invalid combinations.
pub trait Criteria {
    fn predicates(&self) -> Result<Vec<Predicate>, DatabaseError>;
}

/// A filter value counts as provided only when it is set and not the type's
/// zero value (empty text, numeric `0`).
pub fn provided<T: Default + PartialEq>(value: &Option<T>) -> Option<&T> {
    value.as_ref().filter(|v| **v != T::default())
}

pub struct CriteriaBuilder {
    base: &'static str,
    order_by: &'static str,
    clauses: Vec<String>,
    params: Vec<Value>,
}

impl CriteriaBuilder {
    pub fn new(base: &'static str, order_by: &'static str) -> Self {
        Self {
            base,
            order_by,
            clauses: vec![],
            params: vec![],
        }
    }

    /// Compose the full statement for `criteria`
    pub fn build_for<C: Criteria>(
        base: &'static str,
        order_by: &'static str,
        criteria: &C,
    ) -> Result<SqlResult, DatabaseError> {
        let mut builder = Self::new(base, order_by);
        for predicate in criteria.predicates()? {
            builder.push(predicate);
        }
        Ok(builder.build())
    }

    pub fn push(&mut self, predicate: Predicate) {
        let clause = match predicate {
            Predicate::Contains { column, text } => {
                format!("{} ILIKE {}", column, self.param(Value::String(format!("%{}%", text))))
            }
            Predicate::AtLeast { column, value } => format!("{} >= {}", column, self.param(value)),
            Predicate::AtMost { column, value } => format!("{} <= {}", column, self.param(value)),
            Predicate::Literal(sql) => sql.to_string(),
        };
        self.clauses.push(clause);
    }

    pub fn build(self) -> SqlResult {
        let mut query = self.base.to_string();
        for (idx, clause) in self.clauses.iter().enumerate() {
            query.push_str(if idx == 0 { " WHERE " } else { " AND " });
            query.push_str(clause);
        }
        query.push_str(" ORDER BY ");
        query.push_str(self.order_by);

        SqlResult {
            query,
            params: self.params,
        }
    }

    fn param(&mut self, value: Value) -> String {
        self.params.push(value);
        format!("${}", self.params.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Fixed(Vec<Predicate>);

    impl Criteria for Fixed {
        fn predicates(&self) -> Result<Vec<Predicate>, DatabaseError> {
            Ok(self.0.clone())
        }
    }

    struct Rejects;

    impl Criteria for Rejects {
        fn predicates(&self) -> Result<Vec<Predicate>, DatabaseError> {
            Err(DatabaseError::bad_request("nope"))
        }
    }

    #[test]
    fn no_predicates_means_no_where() {
        let sql = CriteriaBuilder::build_for("SELECT * FROM t", "name", &Fixed(vec![])).unwrap();
        assert_eq!(sql.query, "SELECT * FROM t ORDER BY name");
        assert!(sql.params.is_empty());
    }

    #[test]
    fn first_predicate_opens_where_rest_use_and() {
        let sql = CriteriaBuilder::build_for(
            "SELECT * FROM t",
            "name",
            &Fixed(vec![
                Predicate::Contains { column: "name", text: "net".into() },
                Predicate::AtLeast { column: "n", value: json!(2) },
                Predicate::AtMost { column: "n", value: json!(9) },
            ]),
        )
        .unwrap();
        assert_eq!(
            sql.query,
            "SELECT * FROM t WHERE name ILIKE $1 AND n >= $2 AND n <= $3 ORDER BY name"
        );
        assert_eq!(sql.params, vec![json!("%net%"), json!(2), json!(9)]);
    }

    #[test]
    fn literal_predicates_do_not_consume_placeholders() {
        let sql = CriteriaBuilder::build_for(
            "SELECT * FROM t",
            "title",
            &Fixed(vec![
                Predicate::Literal("equity > 0"),
                Predicate::AtLeast { column: "salary", value: json!(100) },
            ]),
        )
        .unwrap();
        assert_eq!(sql.query, "SELECT * FROM t WHERE equity > 0 AND salary >= $1 ORDER BY title");
        assert_eq!(sql.params, vec![json!(100)]);
    }

    #[test]
    fn placeholders_follow_bound_count_not_position() {
        let sql = CriteriaBuilder::build_for(
            "SELECT * FROM t",
            "title",
            &Fixed(vec![
                Predicate::Literal("equity = 0"),
                Predicate::Contains { column: "title", text: "x".into() },
                Predicate::Literal("1 = 1"),
                Predicate::AtMost { column: "salary", value: json!(5) },
            ]),
        )
        .unwrap();
        assert!(sql.query.contains("title ILIKE $1"));
        assert!(sql.query.contains("salary <= $2"));
        assert_eq!(sql.params.len(), 2);
    }

    #[test]
    fn zero_values_are_not_provided() {
        assert_eq!(provided(&Some(0)), None);
        assert_eq!(provided(&Some(String::new())), None);
        assert_eq!(provided::<i32>(&None), None);
        assert_eq!(provided(&Some(3)), Some(&3));
    }

    #[test]
    fn rejection_short_circuits() {
        let err = CriteriaBuilder::build_for("SELECT * FROM t", "name", &Rejects).unwrap_err();
        assert!(matches!(err, DatabaseError::BadRequest(_)));
    }
}
