use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use annotator_core::{AnnotationReport, CollectionIdentity};
use annotator_rules::{Override, RuleSet};

/// Prints the run summary to stderr so stdout stays free for the tree document.
pub fn print_report(report: &AnnotationReport) {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Item"), header_cell("Result")]);
    apply_summary_table_style(&mut table);

    match &report.identity {
        Some(identity) => {
            table.add_row(vec![label_cell("Collection"), Cell::new(&identity.short_name)]);
            table.add_row(vec![label_cell("Mission"), Cell::new(&identity.mission)]);
        }
        None => {
            table.add_row(vec![
                label_cell("Collection"),
                Cell::new("unmapped, passed through").fg(Color::Yellow),
            ]);
        }
    }
    table.add_row(vec![label_cell("Rules"), Cell::new(rules_label(report))]);
    table.add_row(vec![label_cell("Updated paths"), count_cell(report.updated.len(), Color::Green)]);
    table.add_row(vec![label_cell("Attribute edits"), count_cell(report.edits, Color::Green)]);
    table.add_row(vec![label_cell("Deletions"), count_cell(report.deletions, Color::Yellow)]);
    table.add_row(vec![label_cell("Created"), list_cell(&report.created)]);
    table.add_row(vec![label_cell("Suppressed"), list_cell(&report.suppressed)]);
    let synthesized: Vec<String> = report
        .synthesized
        .iter()
        .map(|scale| {
            format!(
                "{} ({}, start {}, {} values)",
                scale.path, scale.axis, scale.start_index, scale.length
            )
        })
        .collect();
    table.add_row(vec![label_cell("Synthesized"), list_cell(&synthesized)]);
    table.add_row(vec![
        label_cell("Temporary attributes removed"),
        count_cell(report.temporary_stripped, Color::DarkGrey),
    ]);
    table.add_row(vec![
        label_cell("History"),
        if report.history_recorded {
            Cell::new("recorded").fg(Color::Green)
        } else {
            dim_cell("unchanged")
        },
    ]);
    align_column(&mut table, 1, CellAlignment::Left);
    eprintln!("{table}");
}

pub fn print_identity(identity: &CollectionIdentity) {
    println!("short name: {}", identity.short_name);
    println!("mission: {}", identity.mission);
}

pub fn print_overrides(rules: &RuleSet, identity: &CollectionIdentity, overrides: &[&Override]) {
    println!(
        "{} ({}): {} of {} overrides apply",
        identity.short_name,
        identity.mission,
        overrides.len(),
        rules.overrides.len()
    );
    if overrides.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("#"),
        header_cell("Variable pattern"),
        header_cell("Sets"),
        header_cell("Deletes"),
        header_cell("Description"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    align_column(&mut table, 2, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Right);
    for rule in overrides {
        let deletes = rule
            .attributes
            .iter()
            .filter(|edit| edit.is_deletion())
            .count();
        let pattern = match &rule.applicability.variable_pattern {
            Some(pattern) if rule.applicability.exact_path().is_some() => {
                Cell::new(pattern).fg(Color::Blue).add_attribute(Attribute::Bold)
            }
            Some(pattern) => Cell::new(pattern),
            None => dim_cell("(every path)"),
        };
        table.add_row(vec![
            Cell::new(rule.index),
            pattern,
            Cell::new(rule.attributes.len() - deletes),
            count_cell(deletes, Color::Yellow),
            rule.description
                .as_deref()
                .map_or_else(|| dim_cell("-"), Cell::new),
        ]);
    }
    println!("{table}");
}

fn rules_label(report: &AnnotationReport) -> String {
    let fingerprint = report
        .rules_fingerprint
        .get(..12)
        .unwrap_or(report.rules_fingerprint.as_str());
    match report.rules_version {
        Some(version) => format!("v{version} ({fingerprint})"),
        None => format!("unversioned ({fingerprint})"),
    }
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(140);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn label_cell(label: &str) -> Cell {
    Cell::new(label).add_attribute(Attribute::Bold)
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color)
    } else {
        dim_cell(count)
    }
}

fn list_cell(items: &[String]) -> Cell {
    if items.is_empty() {
        dim_cell("-")
    } else {
        Cell::new(items.join("\n"))
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
