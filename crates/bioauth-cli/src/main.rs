use anyhow::{bail, Context, Result};
use bioauth_core::{IdentitySummary, MatchResult, Verification};
use clap::{Parser, Subcommand};

mod input;
mod proxy;

use proxy::RegistryProxy;

#[derive(Parser)]
#[command(name = "bioauth", about = "bioauth face-descriptor identity CLI")]
struct Cli {
    /// Talk to a daemon on the system bus instead of the session bus
    #[arg(long, global = true)]
    system: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enroll a new identity
    Enroll {
        /// Display name
        #[arg(short, long)]
        name: String,
        /// Email, used as the login key; must be unique
        #[arg(short, long)]
        email: String,
        /// JSON descriptor file, or "-" for stdin
        #[arg(short, long)]
        descriptor: String,
    },
    /// Find the enrolled identity closest to a descriptor
    Match {
        /// JSON descriptor file, or "-" for stdin
        #[arg(short, long)]
        descriptor: String,
    },
    /// Log in: check a descriptor against the identity enrolled under an email
    Verify {
        #[arg(short, long)]
        email: String,
        /// JSON descriptor file, or "-" for stdin
        #[arg(short, long)]
        descriptor: String,
    },
    /// List enrolled identities
    List,
    /// Remove all enrolled identities
    Clear {
        /// Confirm removal of every identity
        #[arg(long)]
        yes: bool,
    },
    /// Show daemon status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let connection = if cli.system {
        zbus::Connection::system().await
    } else {
        zbus::Connection::session().await
    }
    .context("connecting to D-Bus")?;
    let registry = RegistryProxy::new(&connection)
        .await
        .context("bioauthd is not reachable")?;
    tracing::debug!(system_bus = cli.system, "connected to registry daemon");

    match cli.command {
        Commands::Enroll {
            name,
            email,
            descriptor,
        } => {
            let descriptor = input::read_descriptor(&descriptor)?;
            let reply = registry.enroll(&name, &email, &descriptor).await?;
            let identity: IdentitySummary = serde_json::from_str(&reply)?;
            println!("Enrolled {} <{}> (id {})", identity.name, identity.email, identity.id);
        }
        Commands::Match { descriptor } => {
            let descriptor = input::read_descriptor(&descriptor)?;
            let reply = registry.match_descriptor(&descriptor).await?;
            let result: MatchResult = serde_json::from_str(&reply)?;
            println!("{}", describe_match(&result));
        }
        Commands::Verify { email, descriptor } => {
            let descriptor = input::read_descriptor(&descriptor)?;
            let reply = registry.verify(&email, &descriptor).await?;
            let verification: Verification = serde_json::from_str(&reply)?;
            println!("{}", describe_verification(&verification));
            if !verification.is_verified() {
                std::process::exit(1);
            }
        }
        Commands::List => {
            let reply = registry.list_identities().await?;
            let identities: Vec<IdentitySummary> = serde_json::from_str(&reply)?;
            if identities.is_empty() {
                println!("No identities enrolled");
            }
            for identity in identities {
                println!("{}  {:<24} {}", identity.id, identity.email, identity.name);
            }
        }
        Commands::Clear { yes } => {
            if !yes {
                bail!("refusing to remove every identity without --yes");
            }
            let removed = registry.clear_all().await?;
            println!("Removed {removed} identities");
        }
        Commands::Status => {
            let reply = registry.status().await?;
            let status: serde_json::Value = serde_json::from_str(&reply)?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }

    Ok(())
}

fn describe_match(result: &MatchResult) -> String {
    match result.email() {
        Some(email) => format!("Matched {email} (distance {:.4})", result.distance),
        None => format!("No match (closest distance {:.4})", result.distance),
    }
}

fn describe_verification(verification: &Verification) -> String {
    match verification {
        Verification::Verified { identity, distance } => {
            format!("Identity verified: {} (distance {distance:.4})", identity.name)
        }
        Verification::Mismatch { .. } => "Face does not match the provided email".to_string(),
        Verification::Unrecognized { .. } => "Face not recognized".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_enroll() {
        let cli = Cli::try_parse_from([
            "bioauth", "enroll", "--name", "Alice", "--email", "a@x.com", "--descriptor", "-",
        ])
        .unwrap();
        assert!(!cli.system);
        assert!(matches!(
            cli.command,
            Commands::Enroll { ref email, ref descriptor, .. } if email == "a@x.com" && descriptor == "-"
        ));
    }

    #[test]
    fn test_describe_match() {
        let hit = MatchResult {
            matched_email: "a@x.com".into(),
            distance: 0.25,
            is_match: true,
        };
        assert_eq!(describe_match(&hit), "Matched a@x.com (distance 0.2500)");
        assert_eq!(
            describe_match(&MatchResult::unknown(1.0)),
            "No match (closest distance 1.0000)"
        );
    }

    #[test]
    fn test_mismatch_does_not_leak_other_email() {
        let v = Verification::Mismatch {
            matched_email: "other@x.com".into(),
            distance: 0.1,
        };
        assert!(!describe_verification(&v).contains("other@x.com"));
    }
}
