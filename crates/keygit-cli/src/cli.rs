use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use keygit_server::EngineKind;

#[derive(Parser)]
#[command(
    name = "keygit",
    about = "Git smart-HTTP server backed by a shared key-value store",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// TOML configuration file; flags override its values.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the store log.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Serve repositories over smart HTTP
    Serve(ServeArgs),
    /// List the refs of a stored repository
    LsRefs(LsRefsArgs),
    /// Print a stored object
    CatObject(CatObjectArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    #[arg(long)]
    pub bind: Option<SocketAddr>,
    #[arg(long, value_enum)]
    pub engine: Option<EngineArg>,
    /// fsync after every write
    #[arg(long)]
    pub sync_writes: bool,
    /// Ref HEAD points at, e.g. refs/heads/main
    #[arg(long)]
    pub default_branch: Option<String>,
    /// Largest accepted request body in bytes
    #[arg(long)]
    pub max_pack_size: Option<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum EngineArg {
    Log,
    Memory,
}

impl From<EngineArg> for EngineKind {
    fn from(arg: EngineArg) -> Self {
        match arg {
            EngineArg::Log => EngineKind::Log,
            EngineArg::Memory => EngineKind::Memory,
        }
    }
}

#[derive(Args)]
pub struct LsRefsArgs {
    /// Repository path, e.g. /owner/name
    pub repo: String,
}

#[derive(Args)]
pub struct CatObjectArgs {
    /// Repository path, e.g. /owner/name
    pub repo: String,
    /// Object id (40 hex digits)
    pub id: String,
    /// Print the object type instead of its contents
    #[arg(short = 't', conflicts_with = "size")]
    pub kind: bool,
    /// Print the object size instead of its contents
    #[arg(short = 's')]
    pub size: bool,
}
