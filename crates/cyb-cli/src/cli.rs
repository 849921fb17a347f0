//! Argument parsing for the admin CLI.

use clap::{Parser, Subcommand};

/// Administrative tooling for a running control plane: user/tenant
/// management, API-key issuance, audit-chain verification, and inspection
/// of the rate limiter, breaker, and cache. Operates directly against the
/// same storage backend the daemon uses — there is no admin HTTP surface.
#[derive(Parser, Debug)]
#[command(name = "cyb-cli")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage users.
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Manage tenants.
    Tenant {
        #[command(subcommand)]
        action: TenantAction,
    },
    /// Issue, list, or revoke API keys.
    ApiKey {
        #[command(subcommand)]
        action: ApiKeyAction,
    },
    /// Inspect or repair the audit chain.
    Audit {
        #[command(subcommand)]
        action: AuditAction,
    },
    /// Inspect rate limiter, breaker, and cache state.
    Inspect {
        #[command(subcommand)]
        target: InspectTarget,
    },
}

#[derive(Subcommand, Debug)]
pub enum UserAction {
    /// Register a new user.
    Add {
        #[arg(long)]
        tenant: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        password: String,
        /// Comma-separated role list: admin, operator, viewer, agent, system.
        #[arg(long, value_delimiter = ',')]
        roles: Vec<String>,
    },
    /// List every registered user.
    List,
}

#[derive(Subcommand, Debug)]
pub enum TenantAction {
    /// Create a tenant.
    Add {
        #[arg(long)]
        name: String,
    },
    /// List every tenant.
    List,
}

#[derive(Subcommand, Debug)]
pub enum ApiKeyAction {
    /// Issue a new API key for a tenant.
    Issue {
        #[arg(long)]
        tenant: String,
        #[arg(long)]
        name: String,
        #[arg(long, value_delimiter = ',')]
        roles: Vec<String>,
        /// Key lifetime in seconds. Omit for a non-expiring key.
        #[arg(long)]
        ttl_secs: Option<i64>,
    },
    /// Revoke a session, refresh token, or API key.
    Revoke {
        token_or_key: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum AuditAction {
    /// Verify the full chain's integrity.
    Verify,
    /// Rotate the chain, archiving everything before the bridging entry.
    Rotate,
    /// Report the number of entries currently held.
    Len,
}

#[derive(Subcommand, Debug)]
pub enum InspectTarget {
    /// Deterministic cache hit rate, size, and false-positive rate.
    Cache,
    /// Circuit breaker state for one service id.
    Breaker { service_id: String },
    /// Tokens consumed against a rate-limit budget for one subject.
    Budget { budget: String, subject: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_user_add_with_comma_separated_roles() {
        let cli = Cli::parse_from([
            "cyb-cli",
            "user",
            "add",
            "--tenant",
            "00000000-0000-0000-0000-000000000000",
            "--name",
            "alice",
            "--password",
            "hunter2",
            "--roles",
            "admin,operator",
        ]);
        let Command::User { action: UserAction::Add { roles, name, .. } } = cli.command else {
            panic!("expected User::Add");
        };
        assert_eq!(name, "alice");
        assert_eq!(roles, vec!["admin", "operator"]);
    }

    #[test]
    fn parses_inspect_budget() {
        let cli = Cli::parse_from(["cyb-cli", "inspect", "budget", "s4_llm", "tenant-1"]);
        let Command::Inspect { target: InspectTarget::Budget { budget, subject } } = cli.command else {
            panic!("expected Inspect::Budget");
        };
        assert_eq!(budget, "s4_llm");
        assert_eq!(subject, "tenant-1");
    }
}
