use crate::cli::formatters::{OutputFormat, format_approvals, format_revocation};
use crate::revoke::{AllowanceWriter, Revoker};
use crate::scanner::{LogProgress, Scanner};
use alloy_primitives::Address;
use anyhow::Result;
use std::str::FromStr;

pub fn parse_address(value: &str, what: &str) -> Result<Address> {
    Address::from_str(value.trim())
        .map_err(|_| anyhow::anyhow!("Invalid {} address format: {}", what, value))
}

pub async fn cmd_scan(scanner: &Scanner, account: &str, format: &OutputFormat) -> Result<()> {
    let account = parse_address(account, "account")?;

    let approvals = scanner
        .try_scan_with_progress(account, &LogProgress)
        .await?;
    let output = format_approvals(&approvals, format);
    println!("{output}");

    Ok(())
}

pub async fn cmd_revoke<W: AllowanceWriter>(
    revoker: &Revoker<W>,
    token: &str,
    spender: &str,
    format: &OutputFormat,
) -> Result<()> {
    let token = parse_address(token, "token")?;
    let spender = parse_address(spender, "spender")?;

    let tx_hash = revoker.revoke_allowance(token, spender).await?;
    let output = format_revocation(&tx_hash, format);
    println!("{output}");

    Ok(())
}
