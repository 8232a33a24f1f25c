//! Bonus computation: classify a sales export and write the report

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use pointbook_core::import::sales_reader;
use pointbook_core::{
    aggregate, build_stage2, build_stage3, AppConfig, Classifier, Database, JsonTemplateLoader,
    PersonSummary, ProductGroupIndex, ReportBuilder, ReportOptions, RepurchaseResolver, RowEdit,
    SpreadsheetReader, Stage1Row, StaffDirectory, Templates, XlsxWriter,
};
use serde::Deserialize;
use tracing::info;

use crate::cli::ComputeArgs;

/// One entry of an edits file: `{"row": 3, "edit": {"kind": "set_status", "value": "DEVELOP"}}`
#[derive(Debug, Deserialize)]
pub struct RowEditEntry {
    pub row: usize,
    pub edit: RowEdit,
}

pub fn read_edits(path: &Path) -> Result<Vec<RowEditEntry>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Invalid edits file {}", path.display()))
}

/// Apply edits by row id, in file order
pub fn apply_edits(rows: &mut [Stage1Row], edits: Vec<RowEditEntry>) -> Result<usize> {
    let mut applied = 0;
    for entry in edits {
        let row = rows
            .iter_mut()
            .find(|r| r.id == entry.row)
            .with_context(|| format!("No classified row with id {}", entry.row))?;
        row.apply(entry.edit)
            .with_context(|| format!("Edit rejected for row {}", entry.row))?;
        applied += 1;
    }
    Ok(applied)
}

pub fn cmd_compute(db: &Database, config: &AppConfig, args: &ComputeArgs) -> Result<()> {
    let file = File::open(&args.file)
        .with_context(|| format!("Failed to open {}", args.file.display()))?;
    let reader = sales_reader(&config.columns);
    let raw_rows = reader
        .read_rows(&mut BufReader::new(file))
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    println!("📄 {} rows read from {}", raw_rows.len(), args.file.display());

    let directory = StaffDirectory::load(db)?;
    let index = ProductGroupIndex::load(db)?;
    let mut resolver = RepurchaseResolver::new(db, &index);
    let classifier = Classifier::new(&config.columns, &config.classification, &directory);
    let mut classification = classifier
        .classify(&raw_rows, &mut resolver)
        .context("Classification failed")?;

    if let Some(path) = &args.edits {
        let applied = apply_edits(&mut classification.rows, read_edits(path)?)?;
        println!("   Applied {} edits", applied);
    }

    let stage2 = build_stage2(&raw_rows, &config.columns, &config.rewards, &directory);
    let stage3 = build_stage3(&raw_rows, &config.columns, &config.cosmetic_brands, &directory);
    let people = aggregate(&classification.rows, &stage2, &stage3, &directory);

    let (templates, template_errors) = Templates::load(
        &JsonTemplateLoader,
        args.sales_template.as_deref(),
        args.pharmacist_template.as_deref(),
    );
    for e in &template_errors {
        println!("⚠️  {}; using the plain layout", e);
    }

    let options = ReportOptions {
        store_name: config.store_name.clone(),
        period: args.period.clone(),
        selected: (!args.staff.is_empty()).then(|| args.staff.clone()),
    };
    let workbook = ReportBuilder::new(&config.export, &templates, &options)
        .build(&people, &classification.rows);
    pointbook_core::export::write_report(&XlsxWriter, &workbook, &args.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    info!(sheets = workbook.sheets.len(), "Report written");

    println!(
        "   Accepted {} rows, dropped {}",
        classification.rows.len(),
        classification.dropped_total()
    );
    for (reason, count) in &classification.dropped {
        println!("     {:?}: {}", reason, count);
    }
    print_people(&people);
    println!("✅ Report written to {}", args.output.display());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&classification.rows)?);
    }

    Ok(())
}

fn print_people(people: &[PersonSummary]) {
    if people.is_empty() {
        return;
    }
    println!();
    println!(
        "{:<12} {:<10} {:>8} {:>8} {:>10} {:>10}",
        "NAME", "ROLE", "POINTS", "REPURCH", "REWARDS", "COSMETICS"
    );
    println!("{}", "-".repeat(63));
    for p in people {
        println!(
            "{:<12} {:<10} {:>8} {:>8} {:>10.0} {:>10.0}",
            super::truncate(&p.name, 12),
            p.role.label(),
            p.total_points(),
            p.repurchase_points,
            p.reward_total(),
            p.cosmetic_total()
        );
    }
    println!();
}
