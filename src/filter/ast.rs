//! Filter expression AST

use std::cmp::Ordering;
use std::fmt;

use serde_json::Value;

use crate::table::value::{compare, loose_eq};
use crate::table::ColumnRef;

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }

    /// Applies the operator to two cells. Nulls never satisfy it.
    pub fn test(&self, left: &Value, right: &Value) -> bool {
        if left.is_null() || right.is_null() {
            return false;
        }
        match self {
            CompareOp::Eq => loose_eq(left, right),
            CompareOp::Ne => !loose_eq(left, right),
            ordered => compare(left, right).map_or(false, |o| ordered.accepts(o)),
        }
    }

    fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Ne => ordering != Ordering::Equal,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Le => ordering != Ordering::Greater,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Ge => ordering != Ordering::Less,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Right-hand side of a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Column(ColumnRef),
    Literal(Value),
}

/// Row predicate over one or more tables
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    Comparison {
        left: ColumnRef,
        op: CompareOp,
        right: Operand,
    },
    And(Vec<FilterExpr>),
    IsNull(ColumnRef),
    IsNotNull(ColumnRef),
}

impl FilterExpr {
    /// Every column referenced, in source order
    pub fn references(&self) -> Vec<&ColumnRef> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a ColumnRef>) {
        match self {
            FilterExpr::Comparison { left, right, .. } => {
                out.push(left);
                if let Operand::Column(r) = right {
                    out.push(r);
                }
            }
            FilterExpr::And(parts) => parts.iter().for_each(|p| p.collect_references(out)),
            FilterExpr::IsNull(r) | FilterExpr::IsNotNull(r) => out.push(r),
        }
    }
}

/// Condition of a categorization rule: `op literal` clauses joined by AND
#[derive(Debug, Clone, PartialEq)]
pub struct CutCondition {
    pub clauses: Vec<(CompareOp, Value)>,
}

impl CutCondition {
    /// True when every clause holds for `value`
    pub fn matches(&self, value: &Value) -> bool {
        self.clauses.iter().all(|(op, bound)| op.test(value, bound))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_compare_ops() {
        assert!(CompareOp::Lt.test(&json!(17), &json!(18)));
        assert!(CompareOp::Ge.test(&json!(18), &json!(18)));
        assert!(CompareOp::Ne.test(&json!("M"), &json!("F")));
        assert!(!CompareOp::Ne.test(&Value::Null, &json!("F")));
        assert!(!CompareOp::Gt.test(&json!("x"), &json!(3)));
    }

    #[test]
    fn test_references_in_order() {
        let expr = FilterExpr::And(vec![
            FilterExpr::Comparison {
                left: ColumnRef::parse("VS.VSTESTCD"),
                op: CompareOp::Eq,
                right: Operand::Literal(json!("WEIGHT")),
            },
            FilterExpr::IsNotNull(ColumnRef::parse("VSSTRESN")),
        ]);
        let refs: Vec<String> = expr.references().iter().map(|r| r.to_string()).collect();
        assert_eq!(refs, vec!["VS.VSTESTCD", "VSSTRESN"]);
    }

    #[test]
    fn test_cut_condition() {
        let cond = CutCondition {
            clauses: vec![(CompareOp::Ge, json!(18)), (CompareOp::Lt, json!(65))],
        };
        assert!(cond.matches(&json!(18)));
        assert!(cond.matches(&json!(64)));
        assert!(!cond.matches(&json!(65)));
        assert!(!cond.matches(&Value::Null));
    }
}
