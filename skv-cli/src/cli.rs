use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// JSON client configuration. Falls back to SKV_* environment variables.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Server address, overriding the configuration.
    #[arg(long, global = true)]
    pub addr: Option<String>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check that the store answers.
    Ping,
    /// Print a string value.
    Get { key: String },
    /// Store a string value.
    Set(SetArgs),
    /// List keys matching a glob pattern.
    Scan(ScanArgs),
    /// Try to take an expiring lock.
    Lock(LockArgs),
    /// Append a message to a stream.
    Xadd(XaddArgs),
    /// Read, print and acknowledge messages through a consumer group.
    Consume(ConsumeArgs),
}

#[derive(Args, Debug, Clone)]
pub struct SetArgs {
    pub key: String,
    pub value: String,

    /// Expiry in seconds; zero or negative keeps the value forever.
    #[arg(long, default_value_t = 0)]
    pub ttl: i64,

    /// Only write when the key does not exist.
    #[arg(long)]
    pub nx: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ScanArgs {
    #[arg(default_value = "*")]
    pub pattern: String,

    /// Per-round-trip batch size hint.
    #[arg(long, default_value_t = 100)]
    pub count: u64,
}

#[derive(Args, Debug, Clone)]
pub struct LockArgs {
    pub key: String,

    /// Token stored as the lock value. Defaults to the current unix millis.
    #[arg(long)]
    pub token: Option<String>,

    /// Lock lifetime in milliseconds.
    #[arg(long, default_value_t = 30_000)]
    pub ttl_ms: u64,
}

#[derive(Args, Debug, Clone)]
pub struct XaddArgs {
    pub stream: String,

    /// `field=value` pairs. A bare value is stored under the `data` field.
    #[arg(required = true)]
    pub fields: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ConsumeArgs {
    pub stream: String,
    pub group: String,

    #[arg(long, default_value = "skv-cli")]
    pub consumer: String,

    /// Messages per read.
    #[arg(long, default_value_t = 10)]
    pub count: u64,

    /// How long each read waits for new messages, in milliseconds.
    #[arg(long, default_value_t = 5_000, value_parser = clap::value_parser!(u64).range(1..))]
    pub block_ms: u64,

    /// Stop after this many messages. Zero keeps reading forever.
    #[arg(long, default_value_t = 0)]
    pub limit: u64,

    /// Delete messages from the stream after acknowledging them.
    #[arg(long)]
    pub delete: bool,
}

/// Splits `field=value`; a bare value becomes `data=value`.
pub fn split_field(raw: &str) -> (&str, &str) {
    match raw.split_once('=') {
        Some((field, value)) if !field.is_empty() => (field, value),
        _ => (skv_client::DATA_FIELD, raw),
    }
}
