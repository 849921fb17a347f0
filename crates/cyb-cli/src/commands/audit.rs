//! `cyb-cli audit ...`

use anyhow::{Context, Result};
use cyb_audit::{AuditLog, ChainVerification};

use crate::cli::AuditAction;

pub async fn run(action: AuditAction, audit: &AuditLog) -> Result<()> {
    match action {
        AuditAction::Verify => {
            match audit.verify_integrity(None, None).await.context("verification failed")? {
                ChainVerification::Ok { verified_entries, chain_intact } => {
                    println!("ok: {verified_entries} entries verified, chain_intact={chain_intact}");
                }
                ChainVerification::Invalid { reason, entry_id } => {
                    println!("invalid: {reason:?} at entry {entry_id}");
                    std::process::exit(1);
                }
            }
            Ok(())
        }
        AuditAction::Rotate => {
            let record = audit.rotate().await.context("rotation failed")?;
            println!(
                "archived {} entries into {}, bridging entry {}",
                record.archived_entries, record.archive_id, record.bridging_entry
            );
            Ok(())
        }
        AuditAction::Len => {
            println!("{}", audit.len().await);
            Ok(())
        }
    }
}
