//! Matching client filters against required filter templates.
//!
//! A template is an ordinary filter expression whose values may be
//! placeholders such as `{{code}}`. A client filter satisfies it when the
//! filter, or one of its top-level conjuncts, has the same shape with any
//! concrete value in place of each placeholder. Placeholder values are
//! returned as arguments.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::filter::visitor::normalize;
use crate::filter::{FilterExpression, FilterPredicate};
use crate::path::Path;
use crate::projection::Argument;

static TEMPLATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\{\{(\w+)\}\}$").unwrap());

/// Match `client` against `template`.
///
/// Returns the extracted template variables on success and `None` when the
/// client filter is missing or does not match.
pub fn match_template(
    template: &FilterExpression,
    client: Option<&FilterExpression>,
) -> Option<BTreeMap<String, Argument>> {
    let client = client?;
    let template = normalize(template);
    let client = normalize(client);
    contains_match(&template, &client)
}

fn contains_match(template: &FilterExpression, client: &FilterExpression) -> Option<BTreeMap<String, Argument>> {
    let mut arguments = BTreeMap::new();
    if matches(template, client, &mut arguments) {
        return Some(arguments);
    }
    match client {
        FilterExpression::And(l, r) => contains_match(template, l).or_else(|| contains_match(template, r)),
        _ => None,
    }
}

fn matches(template: &FilterExpression, client: &FilterExpression, arguments: &mut BTreeMap<String, Argument>) -> bool {
    match (template, client) {
        (FilterExpression::And(tl, tr), FilterExpression::And(cl, cr))
        | (FilterExpression::Or(tl, tr), FilterExpression::Or(cl, cr)) => {
            matches(tl, cl, arguments) && matches(tr, cr, arguments)
        }
        (FilterExpression::Not(t), FilterExpression::Not(c)) => matches(t, c, arguments),
        (FilterExpression::Predicate(t), FilterExpression::Predicate(c)) => predicate_matches(t, c, arguments),
        _ => false,
    }
}

fn predicate_matches(
    template: &FilterPredicate,
    client: &FilterPredicate,
    arguments: &mut BTreeMap<String, Argument>,
) -> bool {
    if template.operator != client.operator || !path_matches(&template.path, &client.path) {
        return false;
    }
    if template.values == client.values {
        return true;
    }

    let [value] = template.values.as_slice() else {
        return false;
    };
    let Some(captures) = TEMPLATE_PATTERN.captures(value) else {
        return false;
    };
    let name = &captures[1];
    arguments.insert(name.to_string(), Argument::new(name, client.values.join(",")));
    true
}

/// Same types and fields hop by hop. Arguments only count when the template
/// declares them.
fn path_matches(template: &Path, client: &Path) -> bool {
    template.len() == client.len()
        && template.elements().iter().zip(client.elements()).all(|(t, c)| {
            t.entity_type == c.entity_type
                && t.field_name == c.field_name
                && (t.arguments.is_empty() || t.arguments == c.arguments)
        })
}
