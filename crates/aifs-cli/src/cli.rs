use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "aifs",
    about = "AIFS — content-addressed, versioned storage for ML workloads",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Storage directory (overrides AIFS_STORAGE_DIR).
    #[arg(long, global = true)]
    pub storage_dir: Option<PathBuf>,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the AIFS server
    Serve(ServeArgs),
    /// Store a file as an asset
    Put(PutArgs),
    /// Fetch an asset's bytes to a file or stdout
    Get(GetArgs),
    /// List visible assets
    List(ListArgs),
    /// Create a signed snapshot of a namespace
    Snapshot(SnapshotArgs),
    /// Verify a snapshot signature
    Verify(VerifyArgs),
    /// Create or inspect branches
    Branch(BranchArgs),
    /// Create or inspect tags
    Tag(TagArgs),
    /// Mint a capability token
    Token(TokenArgs),
    /// Remove chunks with no remaining references
    Prune(PruneArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// Bind port (overrides AIFS_PORT).
    #[arg(long)]
    pub port: Option<u16>,
    /// Development mode enables introspection.
    #[arg(long)]
    pub development: bool,
}

#[derive(Args)]
pub struct PutArgs {
    pub file: PathBuf,
    #[arg(long, default_value = "default")]
    pub namespace: String,
    #[arg(long, default_value = "blob")]
    pub kind: String,
    /// Parent asset ids (repeatable).
    #[arg(long = "parent")]
    pub parents: Vec<String>,
}

#[derive(Args)]
pub struct GetArgs {
    pub asset_id: String,
    /// Output path; stdout when omitted.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct ListArgs {
    #[arg(long)]
    pub namespace: Option<String>,
    #[arg(long, default_value_t = 50)]
    pub limit: u32,
}

#[derive(Args)]
pub struct SnapshotArgs {
    #[arg(long, default_value = "default")]
    pub namespace: String,
}

#[derive(Args)]
pub struct VerifyArgs {
    pub snapshot_id: String,
    /// Verify against this public key instead of the engine key.
    #[arg(long)]
    pub public_key: Option<String>,
}

#[derive(Args)]
pub struct BranchArgs {
    #[arg(long, default_value = "default")]
    pub namespace: String,
    /// Branch name; lists branches when omitted.
    pub name: Option<String>,
    /// Snapshot to point the branch at (creates/moves the branch).
    #[arg(long)]
    pub snapshot: Option<String>,
    /// Show the branch history instead of the pointer.
    #[arg(long)]
    pub history: bool,
}

#[derive(Args)]
pub struct TagArgs {
    #[arg(long, default_value = "default")]
    pub namespace: String,
    /// Tag name; lists tags when omitted.
    pub name: Option<String>,
    /// Snapshot to tag (creates the tag).
    #[arg(long)]
    pub snapshot: Option<String>,
}

#[derive(Args)]
pub struct TokenArgs {
    /// Token-verification secret, 64 hex chars.
    #[arg(long, env = "AIFS_TOKEN_SECRET")]
    pub secret: String,
    #[arg(long, default_value = "cli")]
    pub identifier: String,
    /// Restrict to a namespace.
    #[arg(long)]
    pub namespace: Option<String>,
    /// Allowed methods, comma-separated.
    #[arg(long)]
    pub methods: Option<String>,
    /// Expiry as epoch seconds.
    #[arg(long)]
    pub expires: Option<u64>,
}

#[derive(Args)]
pub struct PruneArgs {}
