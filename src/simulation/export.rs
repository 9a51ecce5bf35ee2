//! CSV export of checkpoint series.

use thiserror::Error;

use super::Checkpoint;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(String),
}

#[derive(serde::Serialize)]
struct Row {
    deposit_index: u64,
    active_positions: usize,
    completed_cycles: u64,
    exit_rate: String,
    net_flow_ratio: String,
    avg_wait_time: String,
    global_pool: String,
    stranded_positions: usize,
}

impl From<&Checkpoint> for Row {
    fn from(c: &Checkpoint) -> Self {
        Self {
            deposit_index: c.deposit_index,
            active_positions: c.active_positions,
            completed_cycles: c.completed_cycles,
            exit_rate: c.exit_rate.to_canonical_string(),
            net_flow_ratio: c.net_flow_ratio.to_canonical_string(),
            avg_wait_time: c
                .avg_wait_time
                .map(|w| w.to_canonical_string())
                .unwrap_or_default(),
            global_pool: c.global_pool.to_canonical_string(),
            stranded_positions: c.stranded_positions,
        }
    }
}

/// Render checkpoints as CSV with a header row. Amounts are canonical decimals.
pub fn checkpoints_to_csv(checkpoints: &[Checkpoint]) -> Result<String, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(Vec::new());

    for checkpoint in checkpoints {
        writer
            .serialize(Row::from(checkpoint))
            .map_err(|e| ExportError::Csv(e.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Csv(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ExportError::Csv(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Decimal;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn checkpoint(index: u64, wait: Option<&str>) -> Checkpoint {
        Checkpoint {
            deposit_index: index,
            active_positions: 3,
            completed_cycles: 5,
            exit_rate: d("62.5000"),
            net_flow_ratio: d("25"),
            avg_wait_time: wait.map(d),
            global_pool: d("2.646806"),
            stranded_positions: 0,
        }
    }

    #[test]
    fn test_header_and_rows() {
        let csv = checkpoints_to_csv(&[checkpoint(8, Some("1.6")), checkpoint(9, None)]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines[0],
            "deposit_index,active_positions,completed_cycles,exit_rate,net_flow_ratio,avg_wait_time,global_pool,stranded_positions"
        );
        assert_eq!(lines[1], "8,3,5,62.5,25,1.6,2.646806,0");
        assert_eq!(lines[2], "9,3,5,62.5,25,,2.646806,0");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_empty_series() {
        assert_eq!(checkpoints_to_csv(&[]).unwrap(), "");
    }
}
