//! # skv
//!
//! Purpose: Poke at a store from a shell through the same pooled client
//! services use. Logs go to stderr, results to stdout.

mod cli;

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::{json, Map, Value};
use skv_client::{ClientConfig, Expiry, MessageId, StoreClient, StreamMessage};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command, ConsumeArgs};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(addr) = cli.addr {
        config.addr = addr;
    }
    debug!(addr = %config.addr, pool_size = config.effective_pool_size(), "connecting");
    let client = StoreClient::initialize(config).context("store is not usable")?;

    let mut out = io::stdout().lock();
    match cli.command {
        Command::Ping => {
            let reply = client.ping(None)?;
            writeln!(out, "{}", String::from_utf8_lossy(&reply))?;
        }
        Command::Get { key } => {
            let value = client
                .get_bytes(&key)
                .with_context(|| format!("get {key}"))?;
            writeln!(out, "{}", String::from_utf8_lossy(&value))?;
        }
        Command::Set(args) => {
            let expiry = Expiry::from_secs(args.ttl);
            if args.nx {
                let written = client.set_if_absent(&args.key, &args.value, expiry)?;
                writeln!(out, "{}", if written { "OK" } else { "exists" })?;
            } else {
                client.set(&args.key, &args.value, expiry)?;
                writeln!(out, "OK")?;
            }
        }
        Command::Scan(args) => {
            for batch in client.scan(&args.pattern, args.count) {
                for key in batch? {
                    writeln!(out, "{key}")?;
                }
            }
        }
        Command::Lock(args) => {
            let ttl = Duration::from_millis(args.ttl_ms);
            let acquired = match &args.token {
                Some(token) => client.try_lock(&args.key, token, ttl)?,
                None => client.lock_timestamp(&args.key, ttl)?,
            };
            writeln!(out, "{}", if acquired { "acquired" } else { "held" })?;
        }
        Command::Xadd(args) => {
            let fields: Vec<(&str, &str)> =
                args.fields.iter().map(|raw| cli::split_field(raw)).collect();
            let id = client.append(&args.stream, &fields)?;
            writeln!(out, "{id}")?;
        }
        Command::Consume(args) => consume(&client, &args, &mut out)?,
    }
    Ok(())
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<ClientConfig> {
    match path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
        }
        None => ClientConfig::from_env().context("reading SKV_* environment"),
    }
}

fn consume(client: &StoreClient, args: &ConsumeArgs, out: &mut impl Write) -> Result<()> {
    let outcome = client.ensure_group(&args.stream, &args.group)?;
    info!(stream = %args.stream, group = %args.group, ?outcome, "consuming");

    let block = Duration::from_millis(args.block_ms);
    let mut seen = 0u64;
    loop {
        let mut count = args.count;
        if args.limit > 0 {
            count = count.min(args.limit - seen);
        }
        let messages =
            client.read_group_blocking(&args.stream, &args.group, &args.consumer, count, block)?;
        if messages.is_empty() {
            continue;
        }

        for message in &messages {
            writeln!(out, "{}", message_json(message))?;
        }
        out.flush()?;

        let ids: Vec<MessageId> = messages.iter().map(|message| message.id).collect();
        client.acknowledge(&args.stream, &args.group, &ids)?;
        if args.delete {
            client.delete_messages(&args.stream, &ids)?;
        }

        seen += ids.len() as u64;
        if args.limit > 0 && seen >= args.limit {
            return Ok(());
        }
    }
}

fn message_json(message: &StreamMessage) -> Value {
    let fields: Map<String, Value> = message
        .fields
        .iter()
        .map(|(name, value)| {
            (
                name.clone(),
                Value::String(String::from_utf8_lossy(value).into_owned()),
            )
        })
        .collect();
    json!({ "id": message.id.to_string(), "fields": fields })
}
