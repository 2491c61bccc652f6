use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "vmsync")]
#[command(about = "vmsync: reconcile vSphere VM attributes with the host inventory")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (overrides ./vmsync.toml and ~/.vmsync/vmsync.toml)
    #[arg(short, long, global = true, env = "VMSYNC_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Import VMs as host records
    Import(AccountArgs),
    /// Store VM summary and detail labels in the host inventory
    Inventorize(InventorizeArgs),
    /// Write rule-derived custom attributes back to the VMs
    ExportCustomAttributes(ExportArgs),
    /// Store the collected attribute maps in the host inventory
    InventorizeCustomAttributes(InventorizeArgs),
    /// List VMs with their collected attributes
    List(ListArgs),
    /// Show the collected fields, totals and the getallvmscols listing
    Compare(AccountArgs),
    /// Check connection and collection capabilities
    TestConnection(AccountArgs),
}

impl Commands {
    pub fn account(&self) -> &AccountArgs {
        match self {
            Self::Import(args) | Self::Compare(args) | Self::TestConnection(args) => args,
            Self::Inventorize(args) | Self::InventorizeCustomAttributes(args) => &args.account,
            Self::ExportCustomAttributes(args) => &args.account,
            Self::List(args) => &args.account,
        }
    }
}

#[derive(clap::Args)]
pub struct AccountArgs {
    /// Account name from the configuration
    pub account: String,
    /// Raise errors instead of logging them
    #[arg(long)]
    pub debug: bool,
}

#[derive(clap::Args)]
pub struct InventorizeArgs {
    #[command(flatten)]
    pub account: AccountArgs,
    /// Submit one host at a time instead of one bulk call
    #[arg(long)]
    pub individual: bool,
}

#[derive(clap::Args)]
pub struct ExportArgs {
    #[command(flatten)]
    pub account: AccountArgs,
    /// Show the changes without writing them
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(clap::Args)]
pub struct ListArgs {
    #[command(flatten)]
    pub account: AccountArgs,
    /// Include templates
    #[arg(long)]
    pub include_templates: bool,
    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    pub format: ListFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Default)]
pub enum ListFormat {
    #[default]
    Table,
    Csv,
    Json,
    Getallvmscols,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_subcommands() {
        let cli = Cli::parse_from(["vmsync", "inventorize", "lab", "--individual"]);
        match &cli.command {
            Commands::Inventorize(args) => {
                assert!(args.individual);
                assert_eq!(args.account.account, "lab");
                assert!(!args.account.debug);
            }
            _ => panic!("expected inventorize"),
        }

        let cli = Cli::parse_from(["vmsync", "export-custom-attributes", "lab", "--dry-run", "--debug"]);
        assert!(cli.command.account().debug);

        let cli = Cli::parse_from(["vmsync", "list", "lab", "--format", "getallvmscols"]);
        match cli.command {
            Commands::List(args) => assert_eq!(args.format, ListFormat::Getallvmscols),
            _ => panic!("expected list"),
        }
    }

    #[test]
    fn test_config_flag_is_global() {
        let cli = Cli::parse_from(["vmsync", "test-connection", "lab", "--config", "/tmp/v.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/v.toml")));
    }
}
