//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use serde::Serialize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::config::{ConfigHasher, ValidationResult};
use crate::planner::{ActionType, DiffType};
use crate::reconciler::{DriftReport, PlanReport, ReconciliationResult, RefreshResult};
use crate::schema::{FieldDescriptor, FieldKind, Identity, ListOrder, ResourceDescriptor, SchemaRegistry, Scope};
use crate::state::{LockInfo, ResourceRecord, SyncState};

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Plan action row for table display.
#[derive(Tabled)]
struct PlanActionRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "Type")]
    resource_type: String,
    #[tabled(rename = "Fields")]
    fields: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

/// Managed resource row for table display.
#[derive(Tabled)]
struct ResourceRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    resource_type: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "Hash")]
    hash: String,
}

/// Resource type row for table display.
#[derive(Tabled)]
struct SchemaRow {
    #[tabled(rename = "Type")]
    name: String,
    #[tabled(rename = "Scope")]
    scope: String,
    #[tabled(rename = "Identity")]
    identity: String,
    #[tabled(rename = "Path")]
    path: String,
}

/// Field row for table display.
#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    name: String,
    #[tabled(rename = "Wire name")]
    wire: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Default")]
    default: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Whether output is JSON.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Formats a plan for display.
    #[must_use]
    pub fn format_plan(&self, report: &PlanReport, detailed: bool) -> String {
        match self.format {
            OutputFormat::Json => to_json(report),
            OutputFormat::Text => Self::format_plan_text(report, detailed),
        }
    }

    fn format_plan_text(report: &PlanReport, detailed: bool) -> String {
        let plan = &report.plan;
        if plan.is_empty() {
            return format!(
                "{} No changes required - FortiManager matches the configuration.\n",
                "✓".green()
            );
        }

        let mut output = String::new();
        output.push_str("\nSync plan\n");
        let _ = write!(
            output,
            "   Config hash: {}\n\n",
            ConfigHasher::short_hash(&plan.config_hash)
        );

        let rows: Vec<PlanActionRow> = plan
            .actions
            .iter()
            .enumerate()
            .map(|(i, a)| PlanActionRow {
                index: i + 1,
                action: Self::format_action_type(a.action_type),
                resource: a.resource_name.clone(),
                resource_type: a.resource_type.clone(),
                fields: Self::truncate(&a.touched.iter().cloned().collect::<Vec<_>>().join(", "), 30),
                reason: Self::truncate(&a.reason, 40),
            })
            .collect();

        output.push_str(&Table::new(rows).to_string());
        output.push('\n');

        if detailed {
            for diff in report.diff.diffs.iter().filter(|d| !d.details.is_empty()) {
                let _ = write!(output, "\n   {} ({}):\n", diff.name.bold(), diff.resource_type);
                for detail in &diff.details {
                    let _ = writeln!(
                        output,
                        "     {}: {} -> {}",
                        detail.field,
                        detail.old_value.as_deref().unwrap_or("(unset)").red(),
                        detail.new_value.as_deref().unwrap_or("(unset)").green()
                    );
                }
            }
        }

        let _ = write!(
            output,
            "\nPlan: {} to create, {} to update, {} to adopt, {} to delete\n",
            plan.count(ActionType::Create).to_string().green(),
            plan.count(ActionType::Update).to_string().yellow(),
            plan.count(ActionType::Adopt).to_string().cyan(),
            plan.count(ActionType::Delete).to_string().red()
        );

        let replaced = report.diff.of_type(DiffType::Replace).len();
        if replaced > 0 {
            let _ = writeln!(
                output,
                "{} {replaced} resource(s) will be deleted and re-created",
                "⚠".yellow()
            );
        }

        output
    }

    /// Formats a reconciliation or destroy result.
    #[must_use]
    pub fn format_reconciliation(&self, result: &ReconciliationResult) -> String {
        match self.format {
            OutputFormat::Json => to_json(result),
            OutputFormat::Text => {
                let status = if result.success {
                    format!("{} Sync successful", "✓".green())
                } else {
                    format!("{} Sync failed", "✗".red())
                };

                let mut output = format!("{status}\n\n");
                let _ = writeln!(output, "   Created: {}", result.created);
                let _ = writeln!(output, "   Updated: {}", result.updated);
                let _ = writeln!(output, "   Deleted: {}", result.deleted);
                let _ = writeln!(output, "   Unchanged: {}", result.unchanged);

                if !result.errors.is_empty() {
                    let _ = write!(output, "\n{} Errors:\n", "⚠".yellow());
                    for error in &result.errors {
                        let _ = writeln!(output, "   - {error}");
                    }
                }

                output
            }
        }
    }

    /// Formats a refresh result.
    #[must_use]
    pub fn format_refresh(&self, result: &RefreshResult) -> String {
        match self.format {
            OutputFormat::Json => to_json(result),
            OutputFormat::Text => {
                let mut output = format!(
                    "{} Refreshed {} resource(s)\n",
                    "✓".green(),
                    result.refreshed.len()
                );
                for name in &result.removed {
                    let _ = writeln!(output, "   {} {name} no longer exists, removed from state", "-".red());
                }
                for error in &result.errors {
                    let _ = writeln!(output, "   {} {error}", "✗".red());
                }
                output
            }
        }
    }

    /// Formats a drift report.
    #[must_use]
    pub fn format_drift(&self, report: &DriftReport) -> String {
        match self.format {
            OutputFormat::Json => to_json(report),
            OutputFormat::Text => {
                if report.is_converged() {
                    return format!("{} No drift detected - state is converged.\n", "✓".green());
                }

                let mut output = String::new();
                if report.has_drift {
                    let _ = write!(output, "{} Drift detected:\n\n", "⚠".yellow());
                    for diff in &report.drifted {
                        let fields: Vec<&str> = diff.touched.iter().map(String::as_str).collect();
                        let _ = writeln!(output, "   - {} [{}]", diff.name, fields.join(", "));
                    }
                }
                if !report.missing.is_empty() {
                    let _ = write!(output, "\n{} Deleted outside fortisync:\n", "✗".red());
                    for name in &report.missing {
                        let _ = writeln!(output, "   - {name}");
                    }
                }
                if !report.pending.is_empty() {
                    output.push_str("\nPending configuration changes:\n");
                    for name in &report.pending {
                        let _ = writeln!(output, "   - {name}");
                    }
                }
                let _ = write!(
                    output,
                    "\n{}/{} managed resources have drifted.\n",
                    report.drifted.len() + report.missing.len(),
                    report.managed_resources
                );
                output
            }
        }
    }

    /// Formats the validation result.
    #[must_use]
    pub fn format_validation(&self, result: &ValidationResult, show_warnings: bool) -> String {
        match self.format {
            OutputFormat::Json => {
                let errors: Vec<_> = result
                    .errors
                    .iter()
                    .map(|e| serde_json::json!({ "field": e.field, "message": e.message }))
                    .collect();
                to_json(&serde_json::json!({
                    "valid": result.errors.is_empty(),
                    "errors": errors,
                    "warnings": result.warnings,
                }))
            }
            OutputFormat::Text => {
                let mut output = if result.errors.is_empty() {
                    format!("{} Configuration is valid\n", "✓".green())
                } else {
                    let mut s = format!("{} Configuration has {} error(s):\n", "✗".red(), result.errors.len());
                    for error in &result.errors {
                        let _ = writeln!(s, "   - {}: {}", error.field, error.message);
                    }
                    s
                };
                if show_warnings && !result.warnings.is_empty() {
                    let _ = write!(output, "\n{} Warnings:\n", "⚠".yellow());
                    for warning in &result.warnings {
                        let _ = writeln!(output, "   - {warning}");
                    }
                }
                output
            }
        }
    }

    /// Formats sync state.
    #[must_use]
    pub fn format_state(&self, state: &SyncState) -> String {
        match self.format {
            OutputFormat::Json => to_json(state),
            OutputFormat::Text => {
                let mut output = String::new();

                let _ = write!(output, "\nState: {}\n\n", state.endpoint);
                let _ = writeln!(output, "   Version: {}", state.version);
                let _ = writeln!(output, "   Config hash: {}", ConfigHasher::short_hash(&state.config_hash));
                let _ = writeln!(output, "   Last updated: {}", state.last_updated);
                let _ = writeln!(output, "   Resources: {}", state.resources.len());

                if !state.resources.is_empty() {
                    let rows: Vec<ResourceRow> = state.resources.values().map(Self::resource_row).collect();
                    output.push('\n');
                    output.push_str(&Table::new(rows).to_string());
                    output.push('\n');
                }

                if !state.history.is_empty() {
                    let _ = writeln!(output, "\n   Recent history ({}):", state.history.len());
                    for entry in state.history.iter().rev().take(5) {
                        let status = if entry.success { "✓".green() } else { "✗".red() };
                        let _ = writeln!(
                            output,
                            "     {status} {} - {} ({})",
                            entry.timestamp.format("%Y-%m-%d %H:%M"),
                            entry.operation,
                            entry.resources.join(", ")
                        );
                    }
                }

                output
            }
        }
    }

    /// Formats an imported resource record.
    #[must_use]
    pub fn format_record(&self, record: &ResourceRecord) -> String {
        match self.format {
            OutputFormat::Json => to_json(record),
            OutputFormat::Text => format!(
                "{} Imported {} '{}' as {}\n",
                "✓".green(),
                record.resource_type,
                record.id,
                record.name
            ),
        }
    }

    /// Formats lock information.
    #[must_use]
    pub fn format_lock(&self, lock: &LockInfo) -> String {
        match self.format {
            OutputFormat::Json => to_json(lock),
            OutputFormat::Text => format!(
                "State locked by {} for {} (id {}, expires in {}s)\n",
                lock.holder,
                lock.operation,
                lock.lock_id,
                lock.remaining_secs()
            ),
        }
    }

    /// Formats the list of known resource types.
    #[must_use]
    pub fn format_schema_list(&self, registry: &SchemaRegistry) -> String {
        match self.format {
            OutputFormat::Json => {
                let names: Vec<&str> = registry.iter().map(|d| d.name.as_str()).collect();
                to_json(&names)
            }
            OutputFormat::Text => {
                let rows: Vec<SchemaRow> = registry
                    .iter()
                    .map(|d| SchemaRow {
                        name: d.name.clone(),
                        scope: Self::format_scope(d.scope).to_string(),
                        identity: match &d.identity {
                            Identity::Singleton { id } => format!("singleton ({id})"),
                            Identity::Key { field } => format!("key {field}"),
                        },
                        path: d.path.clone(),
                    })
                    .collect();
                format!("{}\n", Table::new(rows))
            }
        }
    }

    /// Formats one resource descriptor.
    #[must_use]
    pub fn format_schema(&self, descriptor: &ResourceDescriptor) -> String {
        match self.format {
            OutputFormat::Json => to_json(descriptor),
            OutputFormat::Text => {
                let mut output = format!("\n{}\n", descriptor.name.bold());
                if let Some(description) = &descriptor.description {
                    let _ = writeln!(output, "   {description}");
                }
                let _ = writeln!(output, "   Scope: {}", Self::format_scope(descriptor.scope));
                let _ = writeln!(output, "   Path: {}", descriptor.path);
                if !descriptor.parents.is_empty() {
                    let _ = writeln!(output, "   Parents: {}", descriptor.parents.join(", "));
                }

                let mut rows = Vec::new();
                Self::field_rows(&descriptor.fields, "", &mut rows);
                output.push('\n');
                output.push_str(&Table::new(rows).to_string());
                output.push('\n');
                output
            }
        }
    }

    /// Flattens nested fields into dotted rows.
    fn field_rows(fields: &[FieldDescriptor], prefix: &str, rows: &mut Vec<FieldRow>) {
        for field in fields {
            let name = format!("{prefix}{}", field.name);
            let kind = match &field.kind {
                FieldKind::Scalar => String::from("scalar"),
                FieldKind::List { order: ListOrder::Ordered } => String::from("list"),
                FieldKind::List { order: ListOrder::Set } => String::from("set"),
                FieldKind::Block { .. } => String::from("block"),
                FieldKind::Table { .. } => String::from("table"),
            };
            rows.push(FieldRow {
                name: if field.required { format!("{name} *") } else { name.clone() },
                wire: field.wire_name().into_owned(),
                kind,
                default: field.default.as_ref().map(ToString::to_string).unwrap_or_default(),
            });
            if let Some(nested) = field.nested_fields() {
                Self::field_rows(nested, &format!("{name}."), rows);
            }
        }
    }

    fn resource_row(record: &ResourceRecord) -> ResourceRow {
        let location: Vec<String> = record.params.iter().map(|(k, v)| format!("{k}={v}")).collect();
        ResourceRow {
            name: record.name.clone(),
            resource_type: record.resource_type.clone(),
            id: Self::truncate(&record.id, 24),
            location: location.join(" "),
            hash: ConfigHasher::short_hash(&record.config_hash).to_string(),
        }
    }

    /// Formats an action type with color.
    fn format_action_type(action_type: ActionType) -> String {
        match action_type {
            ActionType::Create => "+create".green().to_string(),
            ActionType::Update => "~update".yellow().to_string(),
            ActionType::Adopt => "=adopt".cyan().to_string(),
            ActionType::Delete => "-delete".red().to_string(),
        }
    }

    const fn format_scope(scope: Scope) -> &'static str {
        match scope {
            Scope::Vdom => "vdom",
            Scope::Global => "global",
            Scope::Adom => "adom",
        }
    }

    /// Truncates a string to a maximum number of characters.
    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
            format!("{head}...")
        }
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::{DiffResult, SyncPlan};
    use crate::resource::PathParams;

    #[test]
    fn test_truncate() {
        assert_eq!(OutputFormatter::truncate("short", 10), "short");
        assert_eq!(OutputFormatter::truncate("abcdefghijkl", 8), "abcde...");
    }

    #[test]
    fn test_empty_plan_text() {
        let report = PlanReport {
            diff: DiffResult::default(),
            plan: SyncPlan::from_diff(&DiffResult::default(), &SyncState::new("x"), "cfg"),
        };
        let output = OutputFormatter::new(OutputFormat::Text).format_plan(&report, false);
        assert!(output.contains("No changes required"));
    }

    #[test]
    fn test_state_json_is_parseable() {
        let mut state = SyncState::new("https://fmg");
        state.set_resource(ResourceRecord::new(
            "public",
            "system_snmp_community",
            "5",
            PathParams::from_pairs([("device", "fgt1"), ("vdom", "root")]),
        ));
        let output = OutputFormatter::new(OutputFormat::Json).format_state(&state);
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["resources"]["public"]["id"], "5");
    }

    #[test]
    fn test_schema_show_lists_nested_fields() {
        let registry = SchemaRegistry::with_builtins();
        let descriptor = registry.get("system_snmp_community").unwrap();
        let output = OutputFormatter::new(OutputFormat::Text).format_schema(descriptor);
        assert!(output.contains("system_snmp_community"));
        assert!(output.contains("hosts."));
    }
}
