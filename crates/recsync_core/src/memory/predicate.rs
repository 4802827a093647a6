//! Condition predicates understood by the in-memory remote store.
//!
//! Conditions are parsed as SQL expressions. Comparisons of a field with a
//! literal (`Field = 'text'`, `Field != 42`, `Field <> null`,
//! `Field IS NULL`) can be combined with `AND`, `OR` and parentheses.

use crate::error::{SyncError, SyncResult};
use crate::record::RemoteRecord;
use crate::store::REMOTE_ID_FIELD;
use crate::value::Value;
use sqlparser::ast::{self, BinaryOperator, Expr, UnaryOperator};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use sqlparser::tokenizer::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Op {
    Eq,
    Ne,
}

/// A parsed condition over the fields of a remote record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Predicate {
    Compare { field: String, op: Op, value: Value },
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
}

impl Predicate {
    /// Parses a condition string.
    pub(crate) fn parse(input: &str) -> SyncResult<Self> {
        let dialect = GenericDialect {};
        let mut parser = Parser::new(&dialect)
            .try_with_sql(input)
            .map_err(|e| invalid(input, &e.to_string()))?;
        let expr = parser
            .parse_expr()
            .map_err(|e| invalid(input, &e.to_string()))?;
        if parser.peek_token().token != Token::EOF {
            return Err(invalid(input, "unexpected trailing input"));
        }
        lower(&expr).map_err(|reason| invalid(input, &reason))
    }

    /// Returns true if the record satisfies the condition.
    pub(crate) fn matches(&self, record: &RemoteRecord) -> bool {
        match self {
            Predicate::Compare { field, op, value } => {
                let actual = if field == REMOTE_ID_FIELD {
                    Value::Text(record.id.clone())
                } else {
                    record.fields.get(field).cloned().unwrap_or_default()
                };
                match op {
                    Op::Eq => actual == *value,
                    Op::Ne => actual != *value,
                }
            }
            Predicate::And(left, right) => left.matches(record) && right.matches(record),
            Predicate::Or(left, right) => left.matches(record) || right.matches(record),
        }
    }
}

fn invalid(input: &str, reason: &str) -> SyncError {
    SyncError::InvalidCondition(format!("{reason} in `{input}`"))
}

fn lower(expr: &Expr) -> Result<Predicate, String> {
    match expr {
        Expr::Nested(inner) => lower(inner),
        Expr::BinaryOp { left, op, right } => match op {
            BinaryOperator::And => Ok(Predicate::And(
                Box::new(lower(left)?),
                Box::new(lower(right)?),
            )),
            BinaryOperator::Or => Ok(Predicate::Or(
                Box::new(lower(left)?),
                Box::new(lower(right)?),
            )),
            BinaryOperator::Eq => compare(left, Op::Eq, right),
            BinaryOperator::NotEq => compare(left, Op::Ne, right),
            other => Err(format!("unsupported operator `{other}`")),
        },
        Expr::IsNull(inner) => Ok(Predicate::Compare {
            field: field(inner)?,
            op: Op::Eq,
            value: Value::Null,
        }),
        Expr::IsNotNull(inner) => Ok(Predicate::Compare {
            field: field(inner)?,
            op: Op::Ne,
            value: Value::Null,
        }),
        other => Err(format!("unsupported expression `{other}`")),
    }
}

fn compare(left: &Expr, op: Op, right: &Expr) -> Result<Predicate, String> {
    let (field, value) = match (field(left), literal(right)) {
        (Ok(field), Ok(value)) => (field, value),
        // Allow the literal on the left as well.
        _ => (field(right)?, literal(left)?),
    };
    Ok(Predicate::Compare { field, op, value })
}

fn field(expr: &Expr) -> Result<String, String> {
    match expr {
        Expr::Identifier(ident) => Ok(ident.value.clone()),
        Expr::CompoundIdentifier(idents) => Ok(idents
            .iter()
            .map(|i| i.value.as_str())
            .collect::<Vec<_>>()
            .join(".")),
        other => Err(format!("expected a field name, found `{other}`")),
    }
}

fn literal(expr: &Expr) -> Result<Value, String> {
    match expr {
        Expr::Value(value) => match &value.value {
            ast::Value::SingleQuotedString(s) => Ok(Value::Text(s.clone())),
            ast::Value::Number(n, _) => n
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| format!("unsupported number `{n}`")),
            ast::Value::Boolean(b) => Ok(Value::Bool(*b)),
            ast::Value::Null => Ok(Value::Null),
            other => Err(format!("unsupported literal `{other}`")),
        },
        Expr::UnaryOp {
            op: UnaryOperator::Minus,
            expr,
        } => match literal(expr)? {
            Value::Integer(n) => Ok(Value::Integer(-n)),
            _ => Err(format!("cannot negate `{expr}`")),
        },
        other => Err(format!("expected a literal, found `{other}`")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> RemoteRecord {
        RemoteRecord::new("CustomObject__c", "a001")
            .with_field("Name", "Are you going to Scarborough Fair?")
            .with_field("Count__c", 3)
            .with_field("Active__c", true)
    }

    #[test]
    fn equality_and_inequality() {
        let eq = Predicate::parse("Name = 'Are you going to Scarborough Fair?'").unwrap();
        assert!(eq.matches(&record()));

        let ne = Predicate::parse("Name != 'Are you going to Scarborough Fair?'").unwrap();
        assert!(!ne.matches(&record()));

        let ne = Predicate::parse("Name <> 'Parsley'").unwrap();
        assert!(ne.matches(&record()));
    }

    #[test]
    fn conjunction_of_literals() {
        let p = Predicate::parse("Count__c = 3 and Active__c = TRUE AND Id = 'a001'").unwrap();
        assert!(p.matches(&record()));

        let p = Predicate::parse("Count__c = 3 AND Id = 'a002'").unwrap();
        assert!(!p.matches(&record()));
    }

    #[test]
    fn disjunction_and_grouping() {
        let p = Predicate::parse("(Id = 'a002' OR Id = 'a001') AND Count__c <> -1").unwrap();
        assert!(p.matches(&record()));

        let p = Predicate::parse("Id = 'a002' OR Count__c = 4").unwrap();
        assert!(!p.matches(&record()));
    }

    #[test]
    fn missing_field_reads_as_null() {
        assert!(Predicate::parse("Missing__c = null").unwrap().matches(&record()));
        assert!(!Predicate::parse("Missing__c != null").unwrap().matches(&record()));
        assert!(Predicate::parse("Missing__c IS NULL").unwrap().matches(&record()));
        assert!(Predicate::parse("Name IS NOT NULL").unwrap().matches(&record()));
    }

    #[test]
    fn doubled_quotes() {
        let record = RemoteRecord::new("Contact", "003").with_field("Name", "O'Hara");
        assert!(Predicate::parse("Name = 'O''Hara'").unwrap().matches(&record));
    }

    #[test]
    fn literal_on_the_left() {
        assert!(Predicate::parse("3 = Count__c").unwrap().matches(&record()));
    }

    #[test]
    fn malformed_conditions() {
        assert!(Predicate::parse("Name = ").is_err());
        assert!(Predicate::parse("Name LIKE 'x'").is_err());
        assert!(Predicate::parse("Name = 'x' extra").is_err());
        assert!(Predicate::parse("Name = 'unterminated").is_err());
        assert!(Predicate::parse("Name = Other__c").is_err());
        assert!(Predicate::parse("Count__c > 2").is_err());
    }
}
