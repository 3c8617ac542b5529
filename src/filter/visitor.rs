//! Recursive walks over [`FilterExpression`] trees.

use super::{FilterExpression, FilterPredicate};

/// Push every NOT down to the leaves.
///
/// De Morgan's laws move negation through AND and OR, double negation
/// cancels, and a negated predicate becomes the predicate with the negated
/// operator. The result contains no `Not` nodes.
pub fn normalize(expression: &FilterExpression) -> FilterExpression {
    match expression {
        FilterExpression::Predicate(p) => FilterExpression::Predicate(p.clone()),
        FilterExpression::And(l, r) => FilterExpression::and(normalize(l), normalize(r)),
        FilterExpression::Or(l, r) => FilterExpression::or(normalize(l), normalize(r)),
        FilterExpression::Not(inner) => negate(inner),
    }
}

fn negate(expression: &FilterExpression) -> FilterExpression {
    match expression {
        FilterExpression::Predicate(p) => FilterExpression::Predicate(p.negate()),
        FilterExpression::And(l, r) => FilterExpression::or(negate(l), negate(r)),
        FilterExpression::Or(l, r) => FilterExpression::and(negate(l), negate(r)),
        FilterExpression::Not(inner) => normalize(inner),
    }
}

/// Leaf predicates in left-to-right order.
pub fn predicates(expression: &FilterExpression) -> Vec<&FilterPredicate> {
    let mut out = Vec::new();
    collect(expression, &mut out);
    out
}

fn collect<'a>(expression: &'a FilterExpression, out: &mut Vec<&'a FilterPredicate>) {
    match expression {
        FilterExpression::Predicate(p) => out.push(p),
        FilterExpression::And(l, r) | FilterExpression::Or(l, r) => {
            collect(l, out);
            collect(r, out);
        }
        FilterExpression::Not(inner) => collect(inner, out),
    }
}
