//! The flat env-var configuration surface (spec §6), loaded once at
//! process start.

use std::collections::{BTreeMap, HashMap};

use base64::Engine;

use crate::error::{ConfigError, ConfigResult};

const MIN_SECRET_BYTES: usize = 32;
const USER_PREFIX: &str = "CYBERNETIC_USER_";
const SYSTEM_API_KEY_VAR: &str = "CYBERNETIC_SYSTEM_API_KEY";
const JWT_SECRET_VAR: &str = "JWT_SECRET";
const PASSWORD_SALT_VAR: &str = "PASSWORD_SALT";
const AUDIT_SIGNING_KEY_VAR: &str = "AUDIT_SIGNING_KEY";

/// Known provider API key variables (spec §6 "provider API keys per
/// adapter"). Missing keys simply leave that provider unconfigured; the
/// router (C10) skips providers it has no credential for rather than
/// treating this as a config error.
const PROVIDER_KEY_VARS: &[(&str, &str)] = &[
    ("openai", "OPENAI_API_KEY"),
    ("anthropic", "ANTHROPIC_API_KEY"),
    ("together", "TOGETHER_API_KEY"),
    ("ollama", "OLLAMA_API_KEY"),
];

/// A bootstrap user declared via `CYBERNETIC_USER_<NAME>=<password>:<role,role>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDeclaration {
    pub name: String,
    pub password: String,
    pub roles: Vec<String>,
}

/// The fully validated configuration surface.
#[derive(Debug, Clone)]
pub struct Settings {
    /// HMAC signing secret for session JWTs. Never logged or displayed.
    pub jwt_secret: String,
    /// Pepper mixed into every password hash (cyb-crypto's `PasswordHasherService`).
    pub password_salt: String,
    /// 32-byte HMAC key for the audit chain's `ChainSigner`.
    pub audit_signing_key: [u8; 32],
    /// Optional pre-provisioned system API key, bypassing interactive login.
    pub system_api_key: Option<String>,
    /// Bootstrap users declared at startup.
    pub users: Vec<UserDeclaration>,
    /// Provider name -> API key, for whichever providers have credentials configured.
    pub provider_keys: HashMap<String, String>,
}

impl Settings {
    /// Load and validate settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a required variable is missing or
    /// malformed. Callers at the process entrypoint should map this to
    /// exit code 64 (spec §6).
    pub fn load_from_env() -> ConfigResult<Self> {
        let vars: BTreeMap<String, String> = std::env::vars().collect();
        Self::load_from(&vars)
    }

    /// Load and validate settings from an explicit variable map. Exposed
    /// separately from [`Self::load_from_env`] so tests don't need to
    /// mutate real process environment state.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a required variable is missing or malformed.
    pub fn load_from(vars: &BTreeMap<String, String>) -> ConfigResult<Self> {
        let jwt_secret = require(vars, JWT_SECRET_VAR)?;
        if jwt_secret.len() < MIN_SECRET_BYTES {
            return Err(ConfigError::TooShort {
                name: JWT_SECRET_VAR,
                min_bytes: MIN_SECRET_BYTES,
                actual: jwt_secret.len(),
            });
        }

        let password_salt = require(vars, PASSWORD_SALT_VAR)?;

        let audit_signing_key = parse_signing_key(vars)?;

        let system_api_key = vars.get(SYSTEM_API_KEY_VAR).cloned();

        let users = parse_users(vars)?;

        let provider_keys = PROVIDER_KEY_VARS
            .iter()
            .filter_map(|(name, var)| vars.get(*var).map(|key| ((*name).to_string(), key.clone())))
            .collect();

        Ok(Self {
            jwt_secret,
            password_salt,
            audit_signing_key,
            system_api_key,
            users,
            provider_keys,
        })
    }
}

fn require(vars: &BTreeMap<String, String>, name: &'static str) -> ConfigResult<String> {
    vars.get(name).cloned().ok_or(ConfigError::Missing(name))
}

fn parse_signing_key(vars: &BTreeMap<String, String>) -> ConfigResult<[u8; 32]> {
    let raw = require(vars, AUDIT_SIGNING_KEY_VAR)?;
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(raw.trim())
        .map_err(|source| ConfigError::InvalidBase64 {
            name: AUDIT_SIGNING_KEY_VAR,
            source,
        })?;
    let len = decoded.len();
    decoded
        .try_into()
        .map_err(|_| ConfigError::WrongDecodedLength {
            name: AUDIT_SIGNING_KEY_VAR,
            expected: 32,
            actual: len,
        })
}

fn parse_users(vars: &BTreeMap<String, String>) -> ConfigResult<Vec<UserDeclaration>> {
    vars.iter()
        .filter_map(|(key, value)| {
            key.strip_prefix(USER_PREFIX).map(|name| (key, name, value))
        })
        .map(|(var, name, value)| {
            let (password, roles_raw) = value
                .split_once(':')
                .ok_or_else(|| ConfigError::MalformedUser { var: var.clone() })?;
            let roles: Vec<String> = roles_raw
                .split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string)
                .collect();
            if roles.is_empty() {
                return Err(ConfigError::NoRoles { var: var.clone() });
            }
            Ok(UserDeclaration {
                name: name.to_string(),
                password: password.to_string(),
                roles,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_vars() -> BTreeMap<String, String> {
        let mut vars = BTreeMap::new();
        vars.insert(JWT_SECRET_VAR.to_string(), "a".repeat(32));
        vars.insert(PASSWORD_SALT_VAR.to_string(), "pepper".to_string());
        vars.insert(
            AUDIT_SIGNING_KEY_VAR.to_string(),
            base64::engine::general_purpose::STANDARD.encode([7u8; 32]),
        );
        vars
    }

    #[test]
    fn loads_minimal_valid_configuration() {
        let settings = Settings::load_from(&base_vars()).unwrap();
        assert_eq!(settings.audit_signing_key, [7u8; 32]);
        assert!(settings.users.is_empty());
        assert!(settings.provider_keys.is_empty());
    }

    #[test]
    fn missing_jwt_secret_is_config_error() {
        let mut vars = base_vars();
        vars.remove(JWT_SECRET_VAR);
        assert!(matches!(
            Settings::load_from(&vars),
            Err(ConfigError::Missing(JWT_SECRET_VAR))
        ));
    }

    #[test]
    fn short_jwt_secret_is_rejected() {
        let mut vars = base_vars();
        vars.insert(JWT_SECRET_VAR.to_string(), "too-short".to_string());
        assert!(matches!(
            Settings::load_from(&vars),
            Err(ConfigError::TooShort { .. })
        ));
    }

    #[test]
    fn wrong_length_signing_key_is_rejected() {
        let mut vars = base_vars();
        vars.insert(
            AUDIT_SIGNING_KEY_VAR.to_string(),
            base64::engine::general_purpose::STANDARD.encode([1u8; 16]),
        );
        assert!(matches!(
            Settings::load_from(&vars),
            Err(ConfigError::WrongDecodedLength { .. })
        ));
    }

    #[test]
    fn parses_declared_users_and_roles() {
        let mut vars = base_vars();
        vars.insert(
            "CYBERNETIC_USER_ALICE".to_string(),
            "hunter2:admin,operator".to_string(),
        );
        let settings = Settings::load_from(&vars).unwrap();
        assert_eq!(settings.users.len(), 1);
        assert_eq!(settings.users[0].name, "ALICE");
        assert_eq!(settings.users[0].password, "hunter2");
        assert_eq!(settings.users[0].roles, vec!["admin", "operator"]);
    }

    #[test]
    fn malformed_user_declaration_is_rejected() {
        let mut vars = base_vars();
        vars.insert("CYBERNETIC_USER_BOB".to_string(), "no-colon-here".to_string());
        assert!(matches!(
            Settings::load_from(&vars),
            Err(ConfigError::MalformedUser { .. })
        ));
    }

    #[test]
    fn user_with_no_roles_is_rejected() {
        let mut vars = base_vars();
        vars.insert("CYBERNETIC_USER_BOB".to_string(), "pw:".to_string());
        assert!(matches!(Settings::load_from(&vars), Err(ConfigError::NoRoles { .. })));
    }

    #[test]
    fn provider_keys_are_collected_by_name() {
        let mut vars = base_vars();
        vars.insert("OPENAI_API_KEY".to_string(), "sk-test".to_string());
        let settings = Settings::load_from(&vars).unwrap();
        assert_eq!(settings.provider_keys.get("openai").unwrap(), "sk-test");
        assert!(!settings.provider_keys.contains_key("anthropic"));
    }
}
