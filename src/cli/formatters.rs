use crate::models::{RiskLevel, TokenApproval};
use alloy_primitives::TxHash;
use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use csv::Writer;
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "csv" => OutputFormat::Csv,
            _ => OutputFormat::Table,
        }
    }
}

pub fn format_approvals(approvals: &[TokenApproval], format: &OutputFormat) -> String {
    match format {
        OutputFormat::Table => format_approvals_table(approvals),
        OutputFormat::Json => format_approvals_json(approvals),
        OutputFormat::Csv => format_approvals_csv(approvals),
    }
}

fn risk_color(level: RiskLevel) -> Color {
    match level {
        RiskLevel::High => Color::Red,
        RiskLevel::Medium => Color::Yellow,
        RiskLevel::Low => Color::Green,
    }
}

fn format_approvals_table(approvals: &[TokenApproval]) -> String {
    if approvals.is_empty() {
        return "No risky approvals found.".to_string();
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            "Token",
            "Token Address",
            "Spender",
            "Spender Address",
            "Allowance",
            "Risk",
            "Value at Risk",
        ]);

    for approval in approvals {
        table.add_row(vec![
            Cell::new(format!("{} ({})", approval.token_name, approval.token_symbol)),
            Cell::new(format!("{:?}", approval.token_address)),
            Cell::new(&approval.spender_name),
            Cell::new(format!("{:?}", approval.spender_address)),
            Cell::new(approval.allowance.to_string()),
            Cell::new(approval.risk_level.as_str().to_uppercase())
                .fg(risk_color(approval.risk_level)),
            Cell::new(&approval.value_at_risk),
        ]);
    }

    table.to_string()
}

fn format_approvals_json(approvals: &[TokenApproval]) -> String {
    serde_json::to_string_pretty(approvals).unwrap_or_else(|_| "[]".to_string())
}

fn format_approvals_csv(approvals: &[TokenApproval]) -> String {
    let mut wtr = Writer::from_writer(vec![]);

    let _ = wtr.write_record([
        "token_address",
        "token_name",
        "token_symbol",
        "spender_address",
        "spender_name",
        "allowance",
        "risk_level",
        "value_at_risk",
        "logo_url",
    ]);

    for approval in approvals {
        let _ = wtr.write_record([
            format!("{:?}", approval.token_address),
            approval.token_name.clone(),
            approval.token_symbol.clone(),
            format!("{:?}", approval.spender_address),
            approval.spender_name.clone(),
            approval.allowance.to_string(),
            approval.risk_level.to_string(),
            approval.value_at_risk.clone(),
            approval.logo_url.clone().unwrap_or_default(),
        ]);
    }

    String::from_utf8(wtr.into_inner().unwrap_or_default()).unwrap_or_default()
}

pub fn format_revocation(tx_hash: &TxHash, format: &OutputFormat) -> String {
    match format {
        OutputFormat::Table => format!("Revocation submitted: {tx_hash:?}"),
        OutputFormat::Json => json!({ "transaction_hash": format!("{tx_hash:?}") }).to_string(),
        OutputFormat::Csv => format!("transaction_hash\n{tx_hash:?}\n"),
    }
}
