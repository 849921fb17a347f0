//! `cyb-cli api-key ...`

use std::str::FromStr;

use anyhow::{Context, Result};
use cyb_auth::{ApiKeyOptions, AuthManager, Role};
use cyb_core::TenantId;

use crate::cli::ApiKeyAction;

pub async fn run(action: ApiKeyAction, auth: &AuthManager) -> Result<()> {
    match action {
        ApiKeyAction::Issue { tenant, name, roles, ttl_secs } => {
            let tenant_id = TenantId::parse(&tenant).context("invalid tenant id")?;
            let roles = roles
                .iter()
                .map(|r| Role::from_str(r))
                .collect::<Result<Vec<_>, _>>()
                .context("unrecognized role")?;
            let (id, plaintext) = auth
                .create_api_key(name, tenant_id, roles, ApiKeyOptions { ttl_secs })
                .await
                .context("failed to issue api key")?;
            println!("issued key {id}");
            println!("{plaintext}");
            Ok(())
        }
        ApiKeyAction::Revoke { token_or_key } => {
            auth.revoke(&token_or_key).await.context("failed to revoke")?;
            println!("revoked");
            Ok(())
        }
    }
}
