//! Turns `CYBERNETIC_USER_<NAME>` declarations (spec §6) into registered
//! [`User`]s at startup.

use std::str::FromStr;

use cyb_auth::{AuthManager, Role, User};
use cyb_config::UserDeclaration;
use cyb_core::{CybernikError, CybernikResult, ErrorKind, TenantId, UserId};
use cyb_crypto::PasswordHasherService;

/// Hash and register every declared bootstrap user against `tenant_id`.
/// Unrecognized role names are a config error: a typo here should fail
/// loudly at startup rather than silently grant fewer permissions than
/// the operator intended.
///
/// # Errors
///
/// Returns an error if a declared role is unrecognized, hashing fails, or
/// the auth manager fails to persist the user.
pub async fn seed_users(
    auth: &AuthManager,
    password_hasher: &PasswordHasherService,
    declarations: &[UserDeclaration],
    tenant_id: TenantId,
) -> CybernikResult<usize> {
    let mut seeded = 0;
    for decl in declarations {
        let roles = decl
            .roles
            .iter()
            .map(|r| Role::from_str(r))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CybernikError::new(ErrorKind::ServerError, e.to_string()))?;

        let password_hash = password_hasher
            .hash(&decl.password)
            .map_err(|e| CybernikError::new(ErrorKind::ServerError, e.to_string()))?;

        let user = User {
            id: UserId::new(),
            tenant_id,
            username: decl.name.clone(),
            password_hash,
            roles,
        };
        auth.upsert_user(user).await?;
        seeded += 1;
    }
    Ok(seeded)
}
