//! Constant folding
//!
//! Runs before translation so constant subexpressions never reach the
//! parameter list. Folding only removes work; anything it cannot decide is
//! left in place for the translator to accept or reject. Short-circuits drop
//! whole operands, so the translator validates the unfolded tree first.

use crate::ast::{CompareOp, Expr, Literal, StringMatch};
use std::cmp::Ordering;

/// Fold constant subexpressions bottom-up
pub fn fold(expr: &Expr) -> Expr {
    match expr {
        Expr::Const(_) | Expr::Field(_) => expr.clone(),
        Expr::Compare { op, lhs, rhs } => {
            let lhs = fold(lhs);
            let rhs = fold(rhs);
            match (&lhs, &rhs) {
                (Expr::Const(a), Expr::Const(b)) => match compare_literals(*op, a, b) {
                    Some(result) => Expr::Const(Literal::Bool(result)),
                    None => Expr::compare(*op, lhs, rhs),
                },
                _ => Expr::compare(*op, lhs, rhs),
            }
        }
        Expr::And(l, r) => {
            let l = fold(l);
            let r = fold(r);
            match (as_bool(&l), as_bool(&r)) {
                (Some(false), _) | (_, Some(false)) => Expr::never(),
                (Some(true), _) => r,
                (_, Some(true)) => l,
                _ => l.and(r),
            }
        }
        Expr::Or(l, r) => {
            let l = fold(l);
            let r = fold(r);
            match (as_bool(&l), as_bool(&r)) {
                (Some(true), _) | (_, Some(true)) => Expr::always(),
                (Some(false), _) => r,
                (_, Some(false)) => l,
                _ => l.or(r),
            }
        }
        Expr::Not(inner) => match fold(inner) {
            Expr::Const(Literal::Bool(b)) => Expr::Const(Literal::Bool(!b)),
            Expr::Not(double) => *double,
            other => other.negate(),
        },
        Expr::StringMatch {
            kind,
            target,
            pattern,
        } => {
            let target = fold(target);
            let pattern = fold(pattern);
            if let (Expr::Const(Literal::Text(t)), Expr::Const(Literal::Text(p))) =
                (&target, &pattern)
            {
                let hit = match kind {
                    StringMatch::Contains => t.contains(p.as_str()),
                    StringMatch::StartsWith => t.starts_with(p.as_str()),
                    StringMatch::EndsWith => t.ends_with(p.as_str()),
                };
                return Expr::Const(Literal::Bool(hit));
            }
            Expr::StringMatch {
                kind: *kind,
                target: Box::new(target),
                pattern: Box::new(pattern),
            }
        }
        Expr::In { target, values } => {
            let target = fold(target);
            let values: Vec<Expr> = values.iter().map(fold).collect();
            if let Expr::Const(needle) = &target {
                let mut hit = false;
                for value in &values {
                    match value {
                        Expr::Const(candidate) => {
                            if compare_literals(CompareOp::Eq, needle, candidate) == Some(true) {
                                hit = true;
                            }
                        }
                        _ => {
                            return Expr::In {
                                target: Box::new(target),
                                values,
                            }
                        }
                    }
                }
                return Expr::Const(Literal::Bool(hit));
            }
            Expr::In {
                target: Box::new(target),
                values,
            }
        }
        Expr::Call {
            target,
            method,
            args,
        } => Expr::Call {
            target: Box::new(fold(target)),
            method: method.clone(),
            args: args.iter().map(fold).collect(),
        },
        Expr::Index { target, index } => Expr::Index {
            target: Box::new(fold(target)),
            index: Box::new(fold(index)),
        },
    }
}

fn as_bool(expr: &Expr) -> Option<bool> {
    match expr {
        Expr::Const(Literal::Bool(b)) => Some(*b),
        _ => None,
    }
}

/// Evaluate `a op b` when both sides are constants of comparable types
///
/// Null only takes part in equality. Mixed int/float compare numerically.
fn compare_literals(op: CompareOp, a: &Literal, b: &Literal) -> Option<bool> {
    let ordering = match (a, b) {
        (Literal::Null, Literal::Null) => Some(Ordering::Equal),
        (Literal::Null, _) | (_, Literal::Null) => {
            return match op {
                CompareOp::Eq => Some(false),
                CompareOp::Ne => Some(true),
                _ => None,
            };
        }
        (Literal::Bool(x), Literal::Bool(y)) => Some(x.cmp(y)),
        (Literal::Int(x), Literal::Int(y)) => Some(x.cmp(y)),
        (Literal::Text(x), Literal::Text(y)) => Some(x.cmp(y)),
        (Literal::Int(x), Literal::Float(y)) => (*x as f64).partial_cmp(y),
        (Literal::Float(x), Literal::Int(y)) => x.partial_cmp(&(*y as f64)),
        (Literal::Float(x), Literal::Float(y)) => x.partial_cmp(y),
        _ => None,
    }?;
    if matches!(a, Literal::Null) && !op.is_equality() {
        return None;
    }
    Some(match op {
        CompareOp::Eq => ordering == Ordering::Equal,
        CompareOp::Ne => ordering != Ordering::Equal,
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::Le => ordering != Ordering::Greater,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::Ge => ordering != Ordering::Less,
    })
}
