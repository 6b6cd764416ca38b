//! Append-only event log. The single source of truth for post-hoc
//! summaries and export; records are never mutated after append.

use crate::error::{ConsoleError, ConsoleResult};
use crate::types::ActionKind;
use alloy_primitives::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Severity/status of a log record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogStatus {
    Info,
    Success,
    Warning,
    Error,
    Skipped,
}

impl LogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogStatus::Info => "INFO",
            LogStatus::Success => "SUCCESS",
            LogStatus::Warning => "WARNING",
            LogStatus::Error => "ERROR",
            LogStatus::Skipped => "SKIPPED",
        }
    }
}

/// One immutable log record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub chain_id: Option<u64>,
    pub wallet_address: Option<Address>,
    pub action: Option<ActionKind>,
    pub status: LogStatus,
    pub details: String,
    pub delay_used_ms: Option<u64>,
    pub gas_factor_used: Option<f64>,
    pub persona: Option<String>,
    pub user_agent: Option<String>,
}

impl LogRecord {
    /// Detail text is sanitized once here, at append time
    pub fn new(status: LogStatus, details: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            chain_id: None,
            wallet_address: None,
            action: None,
            status,
            details: sanitize_details(&details.into()),
            delay_used_ms: None,
            gas_factor_used: None,
            persona: None,
            user_agent: None,
        }
    }

    pub fn chain(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    pub fn wallet(mut self, address: Address) -> Self {
        self.wallet_address = Some(address);
        self
    }

    pub fn action(mut self, action: ActionKind) -> Self {
        self.action = Some(action);
        self
    }

    pub fn delay_ms(mut self, delay: u64) -> Self {
        self.delay_used_ms = Some(delay);
        self
    }

    pub fn gas_factor(mut self, factor: f64) -> Self {
        self.gas_factor_used = Some(factor);
        self
    }

    pub fn persona(mut self, name: &str, user_agent: &str) -> Self {
        self.persona = Some(name.to_string());
        self.user_agent = Some(user_agent.to_string());
        self
    }
}

/// Strip markup and escape field separators so a record exports cleanly.
/// Commas become semicolons; anything between angle brackets is dropped.
pub fn sanitize_details(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_tag = false;
    for ch in raw.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            ',' if !in_tag => out.push(';'),
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

const CSV_HEADER: &str =
    "Timestamp,ChainID,WalletAddress,Action,Status,Details,DelayUsedMs,GasFactorUsed,Persona,UserAgent";

/// The append-only log for one run
#[derive(Debug, Default)]
pub struct LogBook {
    records: Vec<LogRecord>,
}

impl LogBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: LogRecord) -> &LogRecord {
        self.records.push(record);
        self.records.last().expect("record just pushed")
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Export as delimited text, one row per record
    pub fn export_csv(&self) -> String {
        let mut out = String::from(CSV_HEADER);
        out.push('\n');
        for record in &self.records {
            let row = [
                record.timestamp.to_rfc3339(),
                record.chain_id.map(|c| c.to_string()).unwrap_or_default(),
                record
                    .wallet_address
                    .map(|a| a.to_string())
                    .unwrap_or_default(),
                record
                    .action
                    .map(|a| a.to_string())
                    .unwrap_or_else(|| "log".to_string()),
                record.status.as_str().to_string(),
                record.details.clone(),
                record
                    .delay_used_ms
                    .map(|d| d.to_string())
                    .unwrap_or_default(),
                record
                    .gas_factor_used
                    .map(|g| format!("{:.2}", g))
                    .unwrap_or_default(),
                record.persona.clone().unwrap_or_default(),
                record.user_agent.clone().unwrap_or_default(),
            ];
            out.push_str(&row.join(","));
            out.push('\n');
        }
        out
    }

    /// Export as a structured JSON list
    pub fn export_json(&self) -> ConsoleResult<String> {
        serde_json::to_string_pretty(&self.records)
            .map_err(|e| ConsoleError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn sample_address() -> Address {
        Address::from_str("0x000000000000000000000000000000000000dEaD").unwrap()
    }

    #[test]
    fn test_sanitize_strips_markup_and_commas() {
        let raw = r#"Tx sent! Hash: <a href="https://example.org/tx/0xabc">0xabc</a>, confirmed"#;
        assert_eq!(sanitize_details(raw), "Tx sent! Hash: 0xabc; confirmed");
    }

    #[test]
    fn test_append_preserves_field_set() {
        let mut book = LogBook::new();
        let record = LogRecord::new(LogStatus::Success, "sent 0.0001 ETH")
            .chain(11155111)
            .wallet(sample_address())
            .action(ActionKind::Send)
            .delay_ms(12_345)
            .gas_factor(1.23)
            .persona("speedy", "Mozilla/5.0");
        book.append(record);

        let stored = &book.records()[0];
        assert_eq!(stored.chain_id, Some(11155111));
        assert_eq!(stored.action, Some(ActionKind::Send));
        assert_eq!(stored.delay_used_ms, Some(12_345));
        assert_eq!(stored.persona.as_deref(), Some("speedy"));
    }

    #[test]
    fn test_csv_export_round_trips() {
        let mut book = LogBook::new();
        book.append(
            LogRecord::new(LogStatus::Success, "sent, and <b>confirmed</b>")
                .chain(1)
                .wallet(sample_address())
                .action(ActionKind::Send)
                .delay_ms(1500)
                .gas_factor(1.07)
                .persona("lazy", "Mozilla/5.0"),
        );
        book.append(LogRecord::new(LogStatus::Warning, "gas too high"));

        let csv = book.export_csv();
        let lines: Vec<&str> = csv.trim_end().split('\n').collect();
        assert_eq!(lines.len(), 1 + book.len());
        assert_eq!(lines[0], CSV_HEADER);

        // Sanitization happened at append time, so every row splits into
        // exactly the documented fields.
        for line in &lines[1..] {
            assert_eq!(line.split(',').count(), 10);
        }
        let first: Vec<&str> = lines[1].split(',').collect();
        assert_eq!(first[1], "1");
        assert_eq!(first[3], "send");
        assert_eq!(first[4], "SUCCESS");
        assert_eq!(first[5], "sent; and confirmed");
        assert_eq!(first[6], "1500");
        assert_eq!(first[7], "1.07");
        assert_eq!(first[8], "lazy");
    }

    #[test]
    fn test_json_export_preserves_rows() {
        let mut book = LogBook::new();
        book.append(LogRecord::new(LogStatus::Info, "one"));
        book.append(LogRecord::new(LogStatus::Error, "two"));

        let json = book.export_json().unwrap();
        let parsed: Vec<LogRecord> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1].details, "two");
    }
}
