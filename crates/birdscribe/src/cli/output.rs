//! Rendering of command results in the selected [`OutputFormat`].

use std::fmt::Write as _;

use crate::annotation::{Annotation, SeedReport};
use crate::backend::BackendStatus;
use crate::error::Result;
use crate::records::UploadRecord;
use crate::session::{render_text, SessionState};

use super::OutputFormat;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render a session state.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_state(state: &SessionState, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(state)?),
        OutputFormat::Plain | OutputFormat::Table => Ok(render_text(state)),
    }
}

/// Render a list of uploads.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_uploads(records: &[UploadRecord], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(records)?),
        OutputFormat::Plain => {
            let mut out = String::new();
            for record in records {
                let _ = writeln!(
                    out,
                    "{}  {}  {}  {}",
                    record.id,
                    record.created_at.format(TIME_FORMAT),
                    record.file_name,
                    record.image_url
                );
            }
            Ok(out)
        }
        OutputFormat::Table => Ok(upload_table(records)),
    }
}

fn upload_table(records: &[UploadRecord]) -> String {
    if records.is_empty() {
        return "No uploads.\n".to_string();
    }

    let name_width = records
        .iter()
        .map(|r| r.file_name.chars().count())
        .max()
        .unwrap_or(0)
        .max("FILE".len());

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<36}  {:<19}  {:<name_width$}  URL",
        "ID", "CREATED", "FILE"
    );
    for record in records {
        let _ = writeln!(
            out,
            "{:<36}  {:<19}  {:<name_width$}  {}",
            record.id.to_string(),
            record.created_at.format(TIME_FORMAT).to_string(),
            record.file_name,
            record.image_url
        );
    }
    out
}

/// Render one upload.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_upload(record: &UploadRecord, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(record)?),
        OutputFormat::Plain | OutputFormat::Table => Ok(format!(
            "ID:       {}\nCreated:  {}\nFile:     {}\nURL:      {}\n",
            record.id,
            record.created_at.to_rfc3339(),
            record.file_name,
            record.image_url
        )),
    }
}

/// Render an annotation. Missing halves are left out of text output.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_annotation(annotation: &Annotation, format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        return Ok(serde_json::to_string_pretty(annotation)?);
    }

    let mut out = String::new();
    if let Some(description) = &annotation.description {
        let _ = writeln!(out, "== {} ==\n{}", description.bird_name, description.description);
    }
    if let Some(analysis) = &annotation.analysis {
        if !out.is_empty() {
            out.push('\n');
        }
        let _ = writeln!(out, "== Analysis ==\n{}", analysis.response);
    }
    if out.is_empty() {
        out.push_str("No annotation available.\n");
    }
    Ok(out)
}

/// Render a seeding report.
#[must_use]
pub fn format_seed_report(report: &SeedReport) -> String {
    if report.descriptions == 0 && report.responses == 0 {
        return "Annotation tables already populated.\n".to_string();
    }
    format!(
        "Seeded {} bird descriptions and {} responses.\n",
        report.descriptions, report.responses
    )
}

/// Render backend status.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_status(status: &BackendStatus, json: bool) -> Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(status)?);
    }

    let mut out = String::new();
    let _ = writeln!(out, "birdscribe status");
    let _ = writeln!(out, "-----------------");
    let _ = writeln!(out, "Backend:       {:?}", status.backend);
    let _ = writeln!(out, "Bucket:        {}", status.bucket);
    let _ = writeln!(out, "Annotations:   {}", status.strategy);
    let _ = writeln!(out, "Uploads:       {}", status.uploads);
    let _ = writeln!(out, "Descriptions:  {}", status.descriptions);
    let _ = writeln!(out, "Responses:     {}", status.responses);
    if let Some(db) = &status.database {
        let _ = writeln!(out, "Database size: {} bytes", db.db_size_bytes);
        if let Some(newest) = db.newest_upload {
            let _ = writeln!(out, "Last upload:   {}", newest.format(TIME_FORMAT));
        }
    }
    Ok(out)
}
