//! Result file writers.

use anyhow::{Context, Result};
use jobhound_core::{JobRecord, OutputFormat};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

const RULE_WIDTH: usize = 60;

/// Write `records` to `path` in `format`, creating parent directories.
pub fn write_records(records: &[JobRecord], path: &Path, format: OutputFormat) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    match format {
        OutputFormat::Json => write_json(records, &mut writer)?,
        OutputFormat::Csv => write_csv(records, &mut writer)?,
        OutputFormat::Txt => write_txt(records, &mut writer)?,
    }
    writer.flush()?;

    tracing::debug!("Wrote {} records as {} to {}", records.len(), format, path.display());
    Ok(())
}

fn write_json<W: Write>(records: &[JobRecord], writer: W) -> Result<()> {
    serde_json::to_writer_pretty(writer, records).context("failed to encode JSON")
}

fn write_csv<W: Write>(records: &[JobRecord], writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for record in records {
        csv.serialize(record).context("failed to encode CSV row")?;
    }
    csv.flush()?;
    Ok(())
}

fn write_txt<W: Write>(records: &[JobRecord], mut writer: W) -> Result<()> {
    let rule = "=".repeat(RULE_WIDTH);
    for (index, record) in records.iter().enumerate() {
        writeln!(writer, "{rule}")?;
        writeln!(writer, "职位 #{}", index + 1)?;
        writeln!(writer, "{rule}")?;
        writeln!(writer, "公司: {}", record.company())?;
        writeln!(writer, "职位: {}", record.title())?;
        writeln!(writer, "薪资: {}", record.salary())?;
        writeln!(writer, "工作年限: {}", record.experience())?;
        writeln!(writer, "城市: {}", record.city())?;
        writeln!(writer, "链接: {}", record.url())?;
        writeln!(writer, "\n职位描述:\n{}", record.description())?;
        writeln!(writer, "\n{rule}\n")?;
    }
    Ok(())
}
