use super::domain::Redemption;

/// Failures while rendering the audit export.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("csv write failed: {0}")]
    Write(#[from] csv::Error),
    #[error("csv flush failed: {0}")]
    Flush(String),
    #[error("export produced invalid utf-8")]
    Encoding,
}

/// Render the redemption ledger as CSV for offline audit.
///
/// The `csv` writer applies RFC-4180 quoting: fields containing commas,
/// quotes, or newlines are quoted and embedded quotes are doubled.
pub fn redemptions_csv(redemptions: &[Redemption]) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record([
        "redemption_id",
        "user_id",
        "amount_cents",
        "status",
        "provider_ref",
        "note",
        "created_at",
        "updated_at",
    ])?;

    for redemption in redemptions {
        writer.write_record([
            redemption.id.0.as_str(),
            redemption.user_id.0.as_str(),
            &redemption.amount_cents.to_string(),
            redemption.status.label(),
            redemption.provider_ref.as_deref().unwrap_or(""),
            redemption.note.as_deref().unwrap_or(""),
            &redemption.created_at.to_rfc3339(),
            &redemption.updated_at.to_rfc3339(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| ExportError::Flush(err.to_string()))?;
    String::from_utf8(bytes).map_err(|_| ExportError::Encoding)
}
