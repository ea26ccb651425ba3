use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{
    Attribute, Cell, CellAlignment, Color, ColumnConstraint, ContentArrangement, Table, Width,
};

use formkit_cli::pipeline::{FieldSummary, ValidationReport};

pub fn print_summary(report: &ValidationReport) {
    println!("Schema: {}", report.schema.display());
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Field"),
        header_cell("Type"),
        header_cell("Classification"),
        header_cell("Status"),
        header_cell("Errors"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 3, CellAlignment::Center);
    for field in &report.fields {
        table.add_row(vec![
            Cell::new(&field.name)
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            Cell::new(&field.input_type),
            dim_cell(field.classification),
            status_cell(field),
            errors_cell(&field.errors),
        ]);
    }
    let failing = report.fields.iter().filter(|field| !field.is_valid()).count();
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        dim_cell("-"),
        dim_cell("-"),
        Cell::new(format!("{}/{}", report.fields.len() - failing, report.fields.len()))
            .add_attribute(Attribute::Bold),
        count_cell(report.error_count()).add_attribute(Attribute::Bold),
    ]);
    println!("{table}");
    if !report.form_errors.is_empty() {
        eprintln!("Form errors:");
        for error in &report.form_errors {
            eprintln!("- {error}");
        }
    }
    if report.submitted {
        println!("Submitted.");
    } else {
        println!("Submission suppressed: the form has validation errors.");
    }
}

/// Print the rule library as a one-column table.
pub fn print_rules<'a>(names: impl IntoIterator<Item = &'a str>) {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Rule")]);
    apply_table_style(&mut table);
    for name in names {
        table.add_row(vec![Cell::new(name)]);
    }
    println!("{table}");
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(140);
    if table.column_count() >= 5 {
        table.set_constraints(vec![
            ColumnConstraint::UpperBoundary(Width::Percentage(25)),
            ColumnConstraint::UpperBoundary(Width::Fixed(16)),
            ColumnConstraint::UpperBoundary(Width::Fixed(16)),
            ColumnConstraint::LowerBoundary(Width::Fixed(8)),
            ColumnConstraint::UpperBoundary(Width::Percentage(50)),
        ]);
    }
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn status_cell(field: &FieldSummary) -> Cell {
    if field.is_valid() {
        Cell::new("✓")
            .fg(Color::Green)
            .add_attribute(Attribute::Bold)
    } else {
        Cell::new("✗").fg(Color::Red).add_attribute(Attribute::Bold)
    }
}

fn errors_cell(errors: &[String]) -> Cell {
    if errors.is_empty() {
        dim_cell("-")
    } else {
        Cell::new(errors.join("\n")).fg(Color::Red)
    }
}

fn count_cell(count: usize) -> Cell {
    if count > 0 {
        Cell::new(count).fg(Color::Red)
    } else {
        dim_cell(count)
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
