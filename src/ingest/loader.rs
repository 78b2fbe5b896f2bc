use serde_json::Value as JsonValue;

use crate::error::ScoreResult;

use super::types::TransactionRecord;

/// A parsed transaction log.
#[derive(Debug, Default)]
pub struct TransactionLog {
    pub records: Vec<TransactionRecord>,
    /// Lines of a line-delimited log that were not valid JSON.
    pub skipped_lines: usize,
}

/// Read a transaction log from disk. The file is either a JSON array of
/// records or newline-delimited JSON.
pub fn load_transactions(path: &str) -> eyre::Result<TransactionLog> {
    tracing::info!(path, "Loading transactions");

    let content = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("Failed to read transaction log '{}': {}", path, e))?;

    let log = parse_transactions(&content)?;

    tracing::info!(
        records = log.records.len(),
        skipped_lines = log.skipped_lines,
        "Transactions loaded"
    );
    Ok(log)
}

/// Parse log content. Any record that parses as JSON but fails validation
/// aborts the whole parse with a `DataError`.
pub fn parse_transactions(content: &str) -> ScoreResult<TransactionLog> {
    if let Ok(values) = serde_json::from_str::<Vec<JsonValue>>(content) {
        let records = values
            .iter()
            .enumerate()
            .map(|(index, value)| TransactionRecord::from_json(index, value))
            .collect::<ScoreResult<Vec<_>>>()?;
        return Ok(TransactionLog {
            records,
            skipped_lines: 0,
        });
    }

    tracing::debug!("Input is not a JSON array, reading line by line");

    let mut log = TransactionLog::default();
    let mut index = 0usize;

    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<JsonValue>(line) {
            Ok(value) => {
                log.records.push(TransactionRecord::from_json(index, &value)?);
                index += 1;
            }
            Err(e) => {
                tracing::warn!(line = line_no + 1, error = %e, "Skipping unparseable line");
                log.skipped_lines += 1;
            }
        }
    }

    Ok(log)
}
