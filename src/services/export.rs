use crate::error::Result;
use crate::services::analysis_ledger::{AnalysisEntry, AnalysisLedger, string_list};

pub const CSV_HEADER: [&str; 11] = [
    "analysis_id",
    "upload_id",
    "filename",
    "original_name",
    "analysis_time",
    "confidence_score",
    "confidence_level",
    "issue_count",
    "recommendation_count",
    "model_used",
    "analysis_result",
];

/// Quotes a field when it holds a delimiter, quote or line break.
fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn write_record(out: &mut String, fields: &[String]) {
    let line: Vec<String> = fields.iter().map(|f| escape_field(f)).collect();
    out.push_str(&line.join(","));
    out.push_str("\r\n");
}

/// Renders analyses (already newest first) as CSV.
pub fn analyses_to_csv(entries: &[AnalysisEntry]) -> String {
    let mut out = String::new();
    write_record(&mut out, &CSV_HEADER.map(str::to_string));

    for entry in entries {
        let a = &entry.analysis;
        write_record(
            &mut out,
            &[
                a.analysis_id.clone(),
                a.upload_id.clone(),
                a.filename.clone(),
                entry
                    .upload
                    .as_ref()
                    .map(|u| u.original_name.clone())
                    .unwrap_or_default(),
                a.analysis_time.to_rfc3339(),
                format!("{:.4}", a.confidence_score),
                entry.confidence_level().to_string(),
                string_list(&a.detected_issues).len().to_string(),
                string_list(&a.recommendations).len().to_string(),
                a.model_used.clone(),
                a.analysis_result.clone(),
            ],
        );
    }
    out
}

pub async fn export_analyses(ledger: &AnalysisLedger, limit: Option<u64>) -> Result<String> {
    let entries = ledger.list_analyses(limit).await?;
    Ok(analyses_to_csv(&entries))
}
