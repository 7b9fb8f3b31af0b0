use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Override every operation timeout, in seconds
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    #[arg(long, env = "ALIBABACLOUDSTACK_ACCESS_KEY", global = true)]
    pub access_key: Option<String>,

    #[arg(
        long,
        env = "ALIBABACLOUDSTACK_SECRET_KEY",
        hide_env_values = true,
        global = true
    )]
    pub secret_key: Option<String>,

    #[arg(long, env = "ALIBABACLOUDSTACK_REGION", global = true)]
    pub region: Option<String>,

    #[arg(long, env = "ALIBABACLOUDSTACK_DEPARTMENT", global = true)]
    pub department: Option<String>,

    #[arg(long, env = "ALIBABACLOUDSTACK_ENDPOINT", global = true)]
    pub endpoint: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long, env = "ALIBABACLOUDSTACK_INSECURE", global = true)]
    pub insecure: bool,

    /// Route one product to its own gateway
    #[arg(long, value_name = "PRODUCT=URL", value_parser = parse_key_value, global = true)]
    pub product_endpoint: Vec<(String, String)>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List supported resource kinds and data sources
    Resources,
    /// Show what applying a configuration would change
    Plan(PlanArgs),
    Create(ApplyArgs),
    /// Refresh a state file from the remote side
    Read(StateArgs),
    Update(ApplyArgs),
    Delete(StateArgs),
    /// Adopt an existing remote resource into a new state file
    Import(ImportArgs),
    /// Run a data source
    List(ListArgs),
}

#[derive(clap::Args, Debug)]
pub struct PlanArgs {
    pub resource_type: String,

    /// Declared attributes as a JSON object
    #[arg(long)]
    pub config: PathBuf,

    /// Prior state; omitted means the resource does not exist yet
    #[arg(long)]
    pub state: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct ApplyArgs {
    pub resource_type: String,

    #[arg(long)]
    pub config: PathBuf,

    #[arg(long)]
    pub state: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct StateArgs {
    #[arg(long)]
    pub state: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct ImportArgs {
    pub resource_type: String,

    pub id: String,

    #[arg(long)]
    pub state: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    pub data_source: String,

    #[arg(long, value_delimiter = ',')]
    pub ids: Vec<String>,

    #[arg(long)]
    pub name_regex: Option<String>,

    /// Exact-match filter on a mapped attribute
    #[arg(long, value_name = "ATTR=VALUE", value_parser = parse_key_value)]
    pub filter: Vec<(String, String)>,

    #[arg(long, value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub tag: Vec<(String, String)>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub output: OutputFormat,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))?;
    if key.is_empty() {
        return Err(format!("empty key in '{}'", raw));
    }
    Ok((key.to_string(), value.to_string()))
}
