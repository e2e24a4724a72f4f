//! File export for processed records.
//!
//! A run writes `<keyword>_products.csv` and/or `.json` into the output
//! directory, replacing files left by a previous run with the same
//! keyword.

use std::path::{Path, PathBuf};

use chrono::Utc;
use shelfscan_core::{NormalizedRecord, OutputFormat};

/// CSV column order; also advertised in the JSON metadata envelope.
const COLUMNS: [&str; 11] = [
    "item_id",
    "title",
    "url",
    "current_price",
    "list_price",
    "discount_percent",
    "rating",
    "review_count",
    "stock_status",
    "variants",
    "scraped_at",
];

/// Where and how a run's records are written.
#[derive(Debug, Clone)]
pub(crate) struct OutputPlan {
    pub(crate) format: OutputFormat,
    pub(crate) directory: PathBuf,
    /// Raw search keyword; sanitized into the file stem.
    pub(crate) keyword: String,
}

/// Writes `records` according to `plan` and returns the files written,
/// CSV before JSON. The output directory is created when absent.
///
/// # Errors
///
/// Returns an error when the directory cannot be created or a file
/// cannot be written.
pub(crate) fn write_records(
    records: &[NormalizedRecord],
    plan: &OutputPlan,
) -> anyhow::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(&plan.directory)
        .map_err(|e| anyhow::anyhow!("failed to create {}: {e}", plan.directory.display()))?;

    let stem = format!("{}_products", sanitize_filename(&plan.keyword));
    let mut paths = Vec::new();

    if plan.format.writes_csv() {
        let path = plan.directory.join(format!("{stem}.csv"));
        write_csv(records, &path)?;
        tracing::info!(path = %path.display(), records = records.len(), "wrote csv export");
        paths.push(path);
    }
    if plan.format.writes_json() {
        let path = plan.directory.join(format!("{stem}.json"));
        write_json(records, &path)?;
        tracing::info!(path = %path.display(), records = records.len(), "wrote json export");
        paths.push(path);
    }

    Ok(paths)
}

fn write_csv(records: &[NormalizedRecord], path: &Path) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| anyhow::anyhow!("failed to create {}: {e}", path.display()))?;
    writer.write_record(COLUMNS)?;
    for record in records {
        writer.write_record(csv_row(record)?)?;
    }
    writer.flush()?;
    Ok(())
}

/// One CSV cell per column; absent values become empty cells and the
/// variant map becomes a compact JSON object.
fn csv_row(record: &NormalizedRecord) -> anyhow::Result<Vec<String>> {
    Ok(vec![
        record.item_id.clone().unwrap_or_default(),
        record.title.clone(),
        record.url.clone(),
        record.current_price.to_string(),
        number_cell(record.list_price),
        number_cell(record.discount_percent),
        number_cell(record.rating),
        record
            .review_count
            .map(|count| count.to_string())
            .unwrap_or_default(),
        record.stock_status.clone().unwrap_or_default(),
        serde_json::to_string(&record.variants)?,
        record.scraped_at.to_rfc3339(),
    ])
}

fn number_cell(value: Option<f64>) -> String {
    value.map(|number| number.to_string()).unwrap_or_default()
}

fn write_json(records: &[NormalizedRecord], path: &Path) -> anyhow::Result<()> {
    let envelope = serde_json::json!({
        "metadata": {
            "scraped_at": Utc::now().to_rfc3339(),
            "total_products": records.len(),
            "columns": COLUMNS,
        },
        "products": records,
    });
    let text = serde_json::to_string_pretty(&envelope)?;
    std::fs::write(path, text)
        .map_err(|e| anyhow::anyhow!("failed to write {}: {e}", path.display()))?;
    Ok(())
}

/// Reduces a keyword to a safe file stem: spaces to underscores, ASCII
/// alphanumerics and underscores kept, capped at 50 characters,
/// lowercased. Anything that sanitizes to nothing becomes `products`.
fn sanitize_filename(name: &str) -> String {
    let mut cleaned: String = name
        .trim()
        .chars()
        .map(|c| if c == ' ' { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    cleaned.truncate(50);
    let cleaned = cleaned.to_ascii_lowercase();
    if cleaned.is_empty() {
        "products".to_owned()
    } else {
        cleaned
    }
}
