//! Output formatters for listings and migration reports.

use clap::ValueEnum;
use comfy_table::Table;
use dbtweak_core::MigrationReport;
use dbtweak_proto::{AttributeDescriptor, IndexDescriptor};

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format
    Table,
    /// JSON format
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Trait for formatting output.
pub trait Formatter: Send + Sync {
    /// Format the attributes of a collection.
    fn format_attributes(&self, attributes: &[AttributeDescriptor]) -> String;

    /// Format the indexes of a collection.
    fn format_indexes(&self, indexes: &[IndexDescriptor]) -> String;

    /// Format the outcome of a recipe.
    fn format_report(&self, report: &MigrationReport) -> String;
}

/// Create a formatter for the given output format.
pub fn create_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Table => Box::new(TableFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
    }
}

/// Table formatter using comfy-table.
pub struct TableFormatter;

impl Formatter for TableFormatter {
    fn format_attributes(&self, attributes: &[AttributeDescriptor]) -> String {
        if attributes.is_empty() {
            return "No attributes".to_string();
        }

        let mut table = Table::new();
        table.set_header(vec![
            "key",
            "type",
            "constraints",
            "required",
            "array",
            "default",
            "status",
        ]);

        for attribute in attributes {
            table.add_row(vec![
                attribute.key.clone(),
                attribute.attribute_type.label(),
                attribute.attribute_type.constraints(),
                yes_no(attribute.required),
                yes_no(attribute.array),
                attribute
                    .default
                    .as_ref()
                    .map(|v| v.to_string())
                    .unwrap_or_default(),
                attribute.status.to_string(),
            ]);
        }

        table.to_string()
    }

    fn format_indexes(&self, indexes: &[IndexDescriptor]) -> String {
        if indexes.is_empty() {
            return "No indexes".to_string();
        }

        let mut table = Table::new();
        table.set_header(vec!["key", "type", "attributes", "orders", "status"]);

        for index in indexes {
            let orders: Vec<String> = index.orders.iter().map(ToString::to_string).collect();
            table.add_row(vec![
                index.key.clone(),
                index.index_type.to_string(),
                index.attributes.join(", "),
                orders.join(", "),
                index.status.to_string(),
            ]);
        }

        table.to_string()
    }

    fn format_report(&self, report: &MigrationReport) -> String {
        let mut lines = Vec::new();

        let header = if report.dry_run {
            format!(
                "Plan for {} on \"{}\" ({} steps, nothing executed)",
                report.recipe, report.collection, report.total_steps
            )
        } else {
            format!(
                "{} on \"{}\": {}/{} steps executed",
                report.recipe, report.collection, report.steps_executed, report.total_steps
            )
        };
        lines.push(header);

        for (i, step) in report.steps.iter().enumerate() {
            lines.push(format!("  {:>2}. {}", i + 1, step));
        }

        if !report.dry_run {
            let mut table = Table::new();
            table.set_header(vec!["documents updated", "documents created", "indexes rebuilt"]);
            table.add_row(vec![
                report.documents_updated.to_string(),
                report.documents_created.to_string(),
                report.indexes_rebuilt.to_string(),
            ]);
            lines.push(table.to_string());
        }

        for index in &report.unreplayed_indexes {
            lines.push(format!(
                "Warning: index \"{}\" on [{}] was not replayed on the clone",
                index.key,
                index.attributes.join(", ")
            ));
        }

        for note in &report.notes {
            lines.push(format!("Note: {}", note));
        }

        lines.join("\n")
    }
}

/// JSON formatter.
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format_attributes(&self, attributes: &[AttributeDescriptor]) -> String {
        to_json(attributes)
    }

    fn format_indexes(&self, indexes: &[IndexDescriptor]) -> String {
        to_json(indexes)
    }

    fn format_report(&self, report: &MigrationReport) -> String {
        to_json(report)
    }
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }).to_string())
}

fn yes_no(value: bool) -> String {
    if value { "yes" } else { "no" }.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbtweak_core::MigrationPlan;
    use dbtweak_proto::IndexType;

    fn attributes() -> Vec<AttributeDescriptor> {
        vec![
            AttributeDescriptor::string("name", 50).with_required(true),
            AttributeDescriptor::integer("age", Some(0), None),
        ]
    }

    #[test]
    fn test_table_attributes() {
        let output = TableFormatter.format_attributes(&attributes());
        assert!(output.contains("name"));
        assert!(output.contains("size=50"));
        assert!(output.contains("min=0 max=-"));
        assert!(output.contains("integer"));
    }

    #[test]
    fn test_table_empty_listings() {
        assert_eq!(TableFormatter.format_attributes(&[]), "No attributes");
        assert_eq!(TableFormatter.format_indexes(&[]), "No indexes");
    }

    #[test]
    fn test_table_indexes() {
        let index = IndexDescriptor::new(
            "idx_full",
            IndexType::Unique,
            vec!["first".into(), "last".into()],
        );
        let output = TableFormatter.format_indexes(&[index]);
        assert!(output.contains("idx_full"));
        assert!(output.contains("unique"));
        assert!(output.contains("first, last"));
        assert!(output.contains("ASC, ASC"));
    }

    #[test]
    fn test_table_dry_run_report() {
        let plan = MigrationPlan::delete_attribute("users", "age");
        let report = MigrationReport::planned(&plan, true);
        let output = TableFormatter.format_report(&report);
        assert!(output.starts_with("Plan for delete-attribute on \"users\""));
        assert!(output.contains("1. delete attribute \"age\""));
        assert!(!output.contains("documents updated"));
    }

    #[test]
    fn test_json_report() {
        let plan = MigrationPlan::delete_attribute("users", "age")
            .with_notes(vec!["nothing else".into()]);
        let report = MigrationReport::planned(&plan, true);
        let parsed: serde_json::Value =
            serde_json::from_str(&JsonFormatter.format_report(&report)).unwrap();
        assert_eq!(parsed["recipe"], "delete-attribute");
        assert_eq!(parsed["collection"], "users");
        assert_eq!(parsed["dry_run"], true);
        assert_eq!(parsed["notes"][0], "nothing else");
    }

    #[test]
    fn test_json_attributes() {
        let parsed: serde_json::Value =
            serde_json::from_str(&JsonFormatter.format_attributes(&attributes())).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), 2);
        assert_eq!(parsed[0]["key"], "name");
    }
}
