//! `cyb-cli user ...`

use std::str::FromStr;

use anyhow::{Context, Result};
use cyb_auth::{AuthManager, Role, User};
use cyb_core::{TenantId, UserId};
use cyb_crypto::PasswordHasherService;

use crate::cli::UserAction;

pub async fn run(action: UserAction, auth: &AuthManager, password_hasher: &PasswordHasherService) -> Result<()> {
    match action {
        UserAction::Add { tenant, name, password, roles } => {
            let tenant_id = TenantId::parse(&tenant).context("invalid tenant id")?;
            let roles = roles
                .iter()
                .map(|r| Role::from_str(r))
                .collect::<Result<Vec<_>, _>>()
                .context("unrecognized role")?;
            let password_hash = password_hasher.hash(&password).context("failed to hash password")?;
            let user = User {
                id: UserId::new(),
                tenant_id,
                username: name.clone(),
                password_hash,
                roles,
            };
            auth.upsert_user(user).await.context("failed to register user")?;
            println!("registered user {name}");
            Ok(())
        }
        UserAction::List => {
            let users = auth.list_users().await.context("failed to list users")?;
            for user in users {
                let roles = user.roles.iter().map(|r| format!("{r:?}")).collect::<Vec<_>>().join(",");
                println!("{}\t{}\t{}\t{}", user.id, user.tenant_id, user.username, roles);
            }
            Ok(())
        }
    }
}
