//! Automatic playlist queries
//!
//! Rhythmbox stores smart playlist criteria as nested XML. They are compiled
//! into [`FilterExpr`]s so automatic playlists resolve to concrete tracks.

use super::database::tag_for_field;
use crate::filter::{FilterExpr, Predicate, TextMatch};
use crate::platform::xml::Element;

/// Compile the query elements of an automatic playlist; all must hold
pub(super) fn compile_query<'a>(elements: impl Iterator<Item = &'a Element>) -> FilterExpr {
    let mut filters: Vec<FilterExpr> = elements.map(compile).collect();
    if filters.len() == 1 {
        filters.remove(0)
    } else {
        FilterExpr::and(filters)
    }
}

fn compile(element: &Element) -> FilterExpr {
    match element.name.as_str() {
        "conjunction" | "subquery" => compile_group(element),
        "disjunction" => FilterExpr::or(element.child_elements().map(compile).collect()),
        "equals" | "like" | "not-like" | "prefix" | "suffix" | "less" | "greater" => {
            compile_criterion(element)
        }
        other => {
            log::warn!("Unsupported smart playlist element <{}>", other);
            FilterExpr::Const(false)
        }
    }
}

/// A group is a conjunction whose branches may be split by empty `<disjunction/>` markers
fn compile_group(element: &Element) -> FilterExpr {
    let mut branches: Vec<Vec<FilterExpr>> = vec![Vec::new()];
    for child in element.child_elements() {
        if child.name == "disjunction" && child.children.is_empty() {
            branches.push(Vec::new());
        } else if let Some(branch) = branches.last_mut() {
            branch.push(compile(child));
        }
    }

    if branches.len() == 1 {
        FilterExpr::and(branches.remove(0))
    } else {
        FilterExpr::or(branches.into_iter().map(FilterExpr::and).collect())
    }
}

fn compile_criterion(element: &Element) -> FilterExpr {
    let prop = element.attr("prop").unwrap_or_default();
    let prop = prop.strip_suffix("-folded").unwrap_or(prop);
    let value = element.text();

    // every entry we load is a song
    if prop == "type" {
        return FilterExpr::Const(value == "song");
    }

    let Some(tag) = tag_for_field(prop) else {
        log::warn!("Unsupported smart playlist property '{}'", prop);
        return FilterExpr::Const(false);
    };

    let text = |mode| FilterExpr::Predicate(Predicate::text(tag, mode, value.clone()));
    let number = value.trim().parse::<f64>();

    match (element.name.as_str(), number) {
        ("equals", _) => text(TextMatch::Equals),
        ("like", _) => text(TextMatch::Contains),
        ("not-like", _) => FilterExpr::not(text(TextMatch::Contains)),
        ("prefix", _) => text(TextMatch::StartsWith),
        ("suffix", _) => text(TextMatch::EndsWith),
        ("less", Ok(n)) => Predicate::Less { tag, value: n }.into(),
        ("greater", Ok(n)) => Predicate::Greater { tag, value: n }.into(),
        (name, _) => {
            log::warn!("Cannot compare '{}' with <{}>{}", prop, name, value);
            FilterExpr::Const(false)
        }
    }
}
