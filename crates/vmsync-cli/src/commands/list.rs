use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;
use colored::Colorize;
use tabled::builder::Builder;
use tabled::settings::Style;
use vmsync_core::AttributeValue;
use vmsync_vsphere::{AttributeCollector, CollectFilter, CollectedObject};

use crate::cli::ListFormat;
use crate::context::AccountContext;
use crate::output::{render_getallvmscols, render_objects};

pub async fn list(ctx: &AccountContext, include_templates: bool, format: ListFormat) -> Result<()> {
    let filter = CollectFilter::all().with_templates(include_templates);
    let collection = ctx.collector().collect(&filter).await?;

    println!("{}", render_objects(&collection.objects, format)?);
    if format == ListFormat::Table {
        println!("{} VMs", collection.objects.len());
    }
    Ok(())
}

/// Fields seen across the collection with their value kinds and how many objects carry them.
#[derive(Debug, Default, PartialEq)]
pub struct FieldReport {
    pub fields: BTreeMap<String, (BTreeSet<&'static str>, usize)>,
    pub total: usize,
    pub templates: usize,
    pub active: usize,
}

impl FieldReport {
    pub fn from_objects(objects: &[CollectedObject]) -> Self {
        let mut report = Self {
            total: objects.len(),
            ..Self::default()
        };
        for object in objects {
            let attrs = &object.attributes;
            for (key, value) in attrs {
                let entry = report.fields.entry(key.clone()).or_default();
                entry.0.insert(value.type_name());
                entry.1 += 1;
            }
            if attrs
                .get("is_template")
                .and_then(AttributeValue::as_bool)
                .unwrap_or(false)
            {
                report.templates += 1;
            } else if attrs.get_text("power_state").is_some_and(|s| is_powered_on(&s)) {
                report.active += 1;
            }
        }
        report
    }
}

/// Accepts both `poweredOn` and `POWERED_ON`.
fn is_powered_on(state: &str) -> bool {
    state.replace('_', "").eq_ignore_ascii_case("poweredon")
}

pub async fn compare(ctx: &AccountContext) -> Result<()> {
    let filter = CollectFilter::all().with_templates(true);
    let collection = ctx.collector().collect(&filter).await?;
    let report = FieldReport::from_objects(&collection.objects);

    let mut builder = Builder::default();
    builder.push_record(["Field", "Types", "Objects"]);
    for (field, (types, count)) in &report.fields {
        let types: Vec<&str> = types.iter().copied().collect();
        builder.push_record([field.clone(), types.join(", "), count.to_string()]);
    }
    println!("{}", builder.build().with(Style::rounded()));

    println!("{}: {}", "VMs".cyan(), report.total);
    println!("{}: {}", "Templates".cyan(), report.templates);
    println!("{}: {}", "Powered on".cyan(), report.active);
    println!("{}: {}", "Fields".cyan(), report.fields.len());
    println!();
    println!("{}", render_getallvmscols(&collection.objects));
    Ok(())
}
