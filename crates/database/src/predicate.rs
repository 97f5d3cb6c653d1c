//! Plain-Rust `WHERE`-clause builder.
//!
//! The query builders (`select`/`update`/`delete`) accept predicates built
//! from [`col`] rather than a raw [`velio_query::ast::Expr`], so callers
//! never need to know a column's storage index or a table's schema up
//! front. A [`Predicate`] only resolves against a concrete [`Table`] when a
//! builder is frozen into a query context, at which point column names are
//! looked up and bind slots are left as `Expr::Param` for later `bind`.

use alloc::boxed::Box;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use velio_core::schema::Table;
use velio_core::Value;
use velio_query::ast::Expr;

use crate::error::{EngineError, EngineResult};

/// A value supplied to a comparison: either resolved up front, or a bind
/// slot filled in later via `bind`.
#[derive(Clone, Debug)]
pub enum Operand {
    Value(Value),
    Slot(usize),
}

impl<T> From<T> for Operand
where
    T: Into<Value>,
{
    fn from(value: T) -> Self {
        Operand::Value(value.into())
    }
}

/// Names a bind-parameter slot to be filled in later by `bind(values)`.
pub fn param(index: usize) -> Operand {
    Operand::Slot(index)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// An unresolved reference to a column by name, the entry point for
/// building comparisons: `col("age").gt(25)`.
#[derive(Clone, Debug)]
pub struct Col(String);

/// Creates a column reference for use in a predicate.
pub fn col(name: impl Into<String>) -> Col {
    Col(name.into())
}

impl Col {
    fn compare(self, op: CompareOp, value: impl Into<Operand>) -> Predicate {
        Predicate(Node::Compare {
            column: self.0,
            op,
            value: value.into(),
        })
    }

    pub fn eq(self, value: impl Into<Operand>) -> Predicate {
        self.compare(CompareOp::Eq, value)
    }

    pub fn ne(self, value: impl Into<Operand>) -> Predicate {
        self.compare(CompareOp::Ne, value)
    }

    pub fn lt(self, value: impl Into<Operand>) -> Predicate {
        self.compare(CompareOp::Lt, value)
    }

    pub fn le(self, value: impl Into<Operand>) -> Predicate {
        self.compare(CompareOp::Le, value)
    }

    pub fn gt(self, value: impl Into<Operand>) -> Predicate {
        self.compare(CompareOp::Gt, value)
    }

    pub fn ge(self, value: impl Into<Operand>) -> Predicate {
        self.compare(CompareOp::Ge, value)
    }

    pub fn is_null(self) -> Predicate {
        Predicate(Node::IsNull(self.0))
    }

    pub fn is_not_null(self) -> Predicate {
        Predicate(Node::IsNotNull(self.0))
    }

    pub fn between(self, low: impl Into<Operand>, high: impl Into<Operand>) -> Predicate {
        Predicate(Node::Between {
            column: self.0,
            low: low.into(),
            high: high.into(),
        })
    }

    pub fn in_list(self, values: Vec<impl Into<Operand>>) -> Predicate {
        Predicate(Node::In {
            column: self.0,
            values: values.into_iter().map(Into::into).collect(),
        })
    }

    pub fn like(self, pattern: impl Into<String>) -> Predicate {
        Predicate(Node::Like {
            column: self.0,
            pattern: pattern.into(),
        })
    }
}

#[derive(Clone, Debug)]
enum Node {
    Compare {
        column: String,
        op: CompareOp,
        value: Operand,
    },
    IsNull(String),
    IsNotNull(String),
    Between {
        column: String,
        low: Operand,
        high: Operand,
    },
    In {
        column: String,
        values: Vec<Operand>,
    },
    Like {
        column: String,
        pattern: String,
    },
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
    Not(Box<Node>),
}

/// A frozen `WHERE`-clause tree, resolved against a table's schema via
/// [`Predicate::to_ast`] when a builder is frozen into a query context.
#[derive(Clone, Debug)]
pub struct Predicate(Node);

impl Predicate {
    pub fn and(self, other: Predicate) -> Predicate {
        Predicate(Node::And(Box::new(self.0), Box::new(other.0)))
    }

    pub fn or(self, other: Predicate) -> Predicate {
        Predicate(Node::Or(Box::new(self.0), Box::new(other.0)))
    }

    pub fn not(self) -> Predicate {
        Predicate(Node::Not(Box::new(self.0)))
    }

    /// Resolves column names against `table`'s schema, producing a plan
    /// expression with `Expr::Param` left in place of any bind slot.
    pub fn to_ast(&self, table: &Table) -> EngineResult<Expr> {
        node_to_ast(&self.0, table)
    }
}

fn column_expr(table: &Table, name: &str) -> EngineResult<Expr> {
    let index = table
        .get_column_index(name)
        .ok_or_else(|| EngineError::Syntax(format!("unknown column '{name}' on table '{}'", table.name())))?;
    Ok(Expr::column(table.name().to_string(), name.to_string(), index))
}

fn operand_expr(operand: &Operand) -> Expr {
    match operand {
        Operand::Value(v) => Expr::literal(v.clone()),
        Operand::Slot(i) => Expr::param(*i),
    }
}

fn node_to_ast(node: &Node, table: &Table) -> EngineResult<Expr> {
    Ok(match node {
        Node::Compare { column, op, value } => {
            let left = column_expr(table, column)?;
            let right = operand_expr(value);
            match op {
                CompareOp::Eq => Expr::eq(left, right),
                CompareOp::Ne => Expr::ne(left, right),
                CompareOp::Lt => Expr::lt(left, right),
                CompareOp::Le => Expr::le(left, right),
                CompareOp::Gt => Expr::gt(left, right),
                CompareOp::Ge => Expr::ge(left, right),
            }
        }
        Node::IsNull(column) => Expr::is_null(column_expr(table, column)?),
        Node::IsNotNull(column) => Expr::is_not_null(column_expr(table, column)?),
        Node::Between { column, low, high } => Expr::between(
            column_expr(table, column)?,
            operand_expr(low),
            operand_expr(high),
        ),
        Node::In { column, values } => Expr::in_list(
            column_expr(table, column)?,
            values.iter().map(operand_expr).collect(),
        ),
        Node::Like { column, pattern } => Expr::like(column_expr(table, column)?, pattern),
        Node::And(l, r) => Expr::and(node_to_ast(l, table)?, node_to_ast(r, table)?),
        Node::Or(l, r) => Expr::or(node_to_ast(l, table)?, node_to_ast(r, table)?),
        Node::Not(inner) => Expr::not(node_to_ast(inner, table)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use velio_core::schema::TableBuilder;
    use velio_core::DataType;

    fn users_table() -> Table {
        TableBuilder::new("users")
            .unwrap()
            .add_column("id", DataType::Int64)
            .unwrap()
            .add_column("age", DataType::Int32)
            .unwrap()
            .add_primary_key(&["id"], false)
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn test_simple_comparison_resolves_column_index() {
        let table = users_table();
        let pred = col("age").gt(25);
        let ast = pred.to_ast(&table).unwrap();
        match ast {
            Expr::BinaryOp { left, .. } => {
                assert!(matches!(*left, Expr::Column(_)));
            }
            other => panic!("expected BinaryOp, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_column_is_syntax_error() {
        let table = users_table();
        let err = col("nope").eq(1).to_ast(&table).unwrap_err();
        assert!(matches!(err, EngineError::Syntax(_)));
    }

    #[test]
    fn test_bind_slot_round_trips_through_param() {
        let table = users_table();
        let pred = col("age").eq(param(0));
        let ast = pred.to_ast(&table).unwrap();
        match ast {
            Expr::BinaryOp { right, .. } => assert!(matches!(*right, Expr::Param(0))),
            other => panic!("expected BinaryOp, got {other:?}"),
        }
    }

    #[test]
    fn test_and_or_not_combinators() {
        let table = users_table();
        let pred = col("age").gt(18).and(col("age").lt(65)).or(col("id").eq(1)).not();
        let ast = pred.to_ast(&table).unwrap();
        assert!(matches!(ast, Expr::UnaryOp { .. }));
    }
}
