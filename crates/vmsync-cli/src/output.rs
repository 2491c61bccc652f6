use anyhow::{Context, Result};
use colored::Colorize;
use tabled::builder::Builder;
use tabled::settings::Style;
use vmsync_core::{AttributeMap, AttributeValue, RunSummary};
use vmsync_vsphere::CollectedObject;
use vmsync_vsphere::collector::FOLDER_DELIMITER;

use crate::cli::ListFormat;

/// Columns of the CSV and getallvmscols listings.
pub const LISTING_COLUMNS: [&str; 13] = [
    "name",
    "folder_hierarchy",
    "tags",
    "is_template",
    "vm_path_name",
    "esxi_host_name",
    "hostname",
    "guest_os",
    "instance_uuid",
    "uuid",
    "power_state",
    "tools_status",
    "ip_address",
];

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

pub fn print_warning(msg: &str) {
    println!("{} {}", "!".yellow(), msg);
}

pub fn print_summary(title: &str, summary: &RunSummary) {
    let mut builder = Builder::default();
    builder.push_record(["Outcome", "Objects"]);
    builder.push_record(["created".to_string(), summary.created.to_string()]);
    builder.push_record(["updated".to_string(), summary.updated.to_string()]);
    builder.push_record(["unchanged".to_string(), summary.unchanged.to_string()]);
    for (reason, count) in &summary.skipped {
        builder.push_record([format!("skipped ({reason})"), count.to_string()]);
    }
    builder.push_record(["failed".to_string(), summary.failed.to_string()]);

    println!("{}", title.cyan());
    println!("{}", builder.build().with(Style::rounded()));
    for (object, message) in &summary.errors {
        print_error(&format!("{object}: {message}"));
    }
}

pub fn render_objects(objects: &[CollectedObject], format: ListFormat) -> Result<String> {
    match format {
        ListFormat::Table => Ok(render_table(objects)),
        ListFormat::Csv => render_csv(objects),
        ListFormat::Json => {
            let maps: Vec<&AttributeMap> = objects.iter().map(|o| &o.attributes).collect();
            serde_json::to_string_pretty(&maps).context("Failed to serialize objects")
        }
        ListFormat::Getallvmscols => Ok(render_getallvmscols(objects)),
    }
}

fn render_table(objects: &[CollectedObject]) -> String {
    if objects.is_empty() {
        return "No VMs found.".to_string();
    }
    let mut builder = Builder::default();
    builder.push_record(["Name", "Folder", "Template", "ESXi host", "IP", "State"]);
    for object in objects {
        let attrs = &object.attributes;
        let folder = text(attrs, "folder_hierarchy")
            .rsplit(FOLDER_DELIMITER)
            .next()
            .unwrap_or_default()
            .to_string();
        let template = if is_template(attrs) { "yes" } else { "no" };
        builder.push_record([
            object.name.clone(),
            folder,
            template.to_string(),
            text(attrs, "esxi_host_name"),
            text(attrs, "ip_address"),
            text(attrs, "power_state"),
        ]);
    }
    builder.build().with(Style::rounded()).to_string()
}

fn render_csv(objects: &[CollectedObject]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(LISTING_COLUMNS)?;
    for object in objects {
        writer.write_record(listing_row(&object.attributes))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV output: {}", e.error()))?;
    String::from_utf8(bytes).context("CSV output is not UTF-8")
}

/// One `'value';'value';...` line per object.
pub fn render_getallvmscols(objects: &[CollectedObject]) -> String {
    objects
        .iter()
        .map(|object| {
            listing_row(&object.attributes)
                .iter()
                .map(|value| format!("'{value}'"))
                .collect::<Vec<_>>()
                .join(";")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn listing_row(attrs: &AttributeMap) -> Vec<String> {
    LISTING_COLUMNS
        .iter()
        .map(|column| match *column {
            "tags" => tag_names(attrs),
            "is_template" => {
                let flag = if is_template(attrs) { "True" } else { "False" };
                flag.to_string()
            }
            other => text(attrs, other),
        })
        .collect()
}

fn text(attrs: &AttributeMap, key: &str) -> String {
    attrs.get_text(key).unwrap_or_default()
}

fn is_template(attrs: &AttributeMap) -> bool {
    attrs
        .get("is_template")
        .and_then(AttributeValue::as_bool)
        .unwrap_or(false)
}

fn tag_names(attrs: &AttributeMap) -> String {
    attrs
        .get("tags")
        .and_then(AttributeValue::as_list)
        .map(|tags| {
            tags.iter()
                .filter_map(|tag| tag.as_record()?.get("name").map(AttributeValue::to_text))
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default()
}
