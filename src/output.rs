//! Terminal rendering for plans, states and listings.

use serde_json::Value;
use tabled::builder::Builder;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use termtree::Tree;

use stackform::datasource::ListResult;
use stackform::plan::{AttributeChange, Plan};
use stackform::resource::ResourceState;
use stackform::schema::ResourceSpec;

const REDACTED: &str = "(sensitive)";

#[derive(Tabled)]
pub struct KindRow {
    #[tabled(rename = "TYPE")]
    pub type_name: String,
    #[tabled(rename = "KIND")]
    pub kind: &'static str,
}

pub fn kinds_table(rows: Vec<KindRow>) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

/// One row per item: id and name first, then the requested attributes.
pub fn listing_table(result: &ListResult, columns: &[&str]) -> String {
    let mut builder = Builder::default();
    let mut header = vec!["ID".to_string(), "NAME".to_string()];
    header.extend(columns.iter().map(|c| c.to_uppercase()));
    builder.push_record(header);

    for item in &result.items {
        let mut row = vec![item.id.clone(), item.name.clone()];
        row.extend(
            columns
                .iter()
                .map(|c| item.attributes.get(*c).map(display_value).unwrap_or_default()),
        );
        builder.push_record(row);
    }

    builder.build().with(Style::rounded()).to_string()
}

/// Sensitive attribute values are replaced with a marker.
pub fn plan_tree(plan: &Plan, spec: &ResourceSpec) -> Tree<String> {
    let root = format!("{}: {}", plan.resource_type, plan.action);
    Tree::new(root).with_leaves(plan.changes.iter().map(|c| change_line(c, spec)))
}

/// Sensitive attribute values are replaced with a marker.
pub fn state_tree(state: &ResourceState, spec: &ResourceSpec) -> Tree<String> {
    let root = format!("{} ({})", state.resource_type, state.id);
    Tree::new(root).with_leaves(state.attributes.iter().map(|(name, value)| {
        format!("{} = {}", name, shown_value(spec, name, value))
    }))
}

fn change_line(change: &AttributeChange, spec: &ResourceSpec) -> String {
    let before = change.before.as_ref().map(|v| shown_value(spec, &change.name, v));
    let after = change.after.as_ref().map(|v| shown_value(spec, &change.name, v));
    let line = match (before, after) {
        (None, Some(after)) => format!("+ {} = {}", change.name, after),
        (Some(before), None) => format!("- {} = {}", change.name, before),
        (Some(before), Some(after)) => format!("~ {}: {} -> {}", change.name, before, after),
        (None, None) => format!("~ {}", change.name),
    };
    if change.requires_replace {
        format!("{} (forces replacement)", line)
    } else {
        line
    }
}

fn shown_value(spec: &ResourceSpec, name: &str, value: &Value) -> String {
    if spec.field(name).is_some_and(|f| f.sensitive) {
        REDACTED.to_string()
    } else {
        display_value(value)
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
