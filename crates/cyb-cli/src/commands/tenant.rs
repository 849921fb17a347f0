//! `cyb-cli tenant ...`

use anyhow::{Context, Result};
use cyb_auth::TenantDirectory;

use crate::cli::TenantAction;

pub async fn run(action: TenantAction, tenants: &TenantDirectory) -> Result<()> {
    match action {
        TenantAction::Add { name } => {
            let tenant = tenants.create(name).await.context("failed to create tenant")?;
            println!("{}\t{}", tenant.id, tenant.display_name);
            Ok(())
        }
        TenantAction::List => {
            let all = tenants.list().await.context("failed to list tenants")?;
            for tenant in all {
                println!("{}\t{}\t{}", tenant.id, tenant.display_name, tenant.created_at);
            }
            Ok(())
        }
    }
}
