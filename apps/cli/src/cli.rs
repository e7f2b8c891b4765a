//! Command line arguments.

use atelier_core::HeightPolicy;
use atelier_gateway::QuoteRequest;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "atelier")]
#[command(version, about = "Furniture specification codes: validate, price, generate, store")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List preset families and their schema
    Presets,

    /// List price tiers and supplements from the configuration
    Catalog,

    /// Parse and validate a code
    Check {
        /// e.g. M1(1000,400,1000)bE
        code: String,
    },

    /// Price a code
    Quote {
        code: String,

        #[command(flatten)]
        pricing: PricingArgs,
    },

    /// Generate 3D/DXF artifacts for one or more codes
    Generate {
        #[arg(required = true)]
        codes: Vec<String>,

        /// Closed unit (back and sides)
        #[arg(long)]
        closed: bool,
    },

    /// Price, generate and store a named configuration
    Finalize {
        name: String,

        code: String,

        #[command(flatten)]
        pricing: PricingArgs,

        /// Closed unit (back and sides)
        #[arg(long)]
        closed: bool,
    },

    /// Delete a stored configuration
    Delete { id: String },

    /// Write a default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Clone, Default, Args)]
pub struct PricingArgs {
    /// Price tier (defaults to [pricing].default_tier)
    #[arg(long)]
    pub tier: Option<String>,

    /// Supplement pick, repeatable
    #[arg(long = "supplement", value_name = "ID=QTY", value_parser = parse_supplement)]
    pub supplements: Vec<(String, u32)>,

    /// Height rule for sloped presets: declared_height | average_with_maximum
    #[arg(long, value_parser = parse_policy)]
    pub policy: Option<HeightPolicy>,
}

impl PricingArgs {
    pub fn to_request(&self) -> QuoteRequest {
        QuoteRequest {
            tier: self.tier.clone(),
            supplements: self.supplements.clone(),
            policy: self.policy,
        }
    }
}

/// `drawer=2` → `("drawer", 2)`; a bare `drawer` means one.
fn parse_supplement(value: &str) -> Result<(String, u32), String> {
    let (id, quantity) = match value.split_once('=') {
        Some((id, quantity)) => {
            let quantity = quantity
                .parse::<u32>()
                .map_err(|_| format!("invalid quantity '{quantity}'"))?;
            (id, quantity)
        }
        None => (value, 1),
    };
    if id.is_empty() {
        return Err("supplement id is empty".to_string());
    }
    Ok((id.to_string(), quantity))
}

fn parse_policy(value: &str) -> Result<HeightPolicy, String> {
    value.parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_quote() {
        let cli = Cli::try_parse_from([
            "atelier",
            "quote",
            "M2(2000,450,700,1200)E",
            "--tier",
            "oak",
            "--supplement",
            "drawer=2",
            "--supplement",
            "rail",
            "--policy",
            "average",
            "--json",
        ])
        .unwrap();

        assert!(cli.json);
        match cli.command {
            Command::Quote { code, pricing } => {
                assert_eq!(code, "M2(2000,450,700,1200)E");
                let request = pricing.to_request();
                assert_eq!(request.tier.as_deref(), Some("oak"));
                assert_eq!(
                    request.supplements,
                    vec![("drawer".to_string(), 2), ("rail".to_string(), 1)]
                );
                assert_eq!(request.policy, Some(HeightPolicy::AverageWithMaximum));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_generate_requires_a_code() {
        assert!(Cli::try_parse_from(["atelier", "generate", "--closed"]).is_err());

        let cli = Cli::try_parse_from(["atelier", "generate", "M1(1000,400,1000)b", "M4(800,400,600)b"])
            .unwrap();
        assert!(matches!(cli.command, Command::Generate { ref codes, closed: false } if codes.len() == 2));
    }

    #[test]
    fn test_parse_supplement() {
        assert_eq!(parse_supplement("drawer=3").unwrap(), ("drawer".to_string(), 3));
        assert_eq!(parse_supplement("plinth").unwrap(), ("plinth".to_string(), 1));
        assert!(parse_supplement("drawer=-1").is_err());
        assert!(parse_supplement("=2").is_err());
    }

    #[test]
    fn test_unknown_policy_is_rejected() {
        assert!(Cli::try_parse_from(["atelier", "quote", "M1(1000,400,1000)b", "--policy", "max"]).is_err());
    }
}
