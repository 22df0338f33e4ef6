use std::collections::BTreeMap;
use std::io::Write;

use anyhow::{bail, Context};

use aifs_auth::{Authorizer, Caveat, Method};
use aifs_engine::{AifsEngine, EngineConfig, Mode, ParentRef, PutOptions, VerifyWith};
use aifs_meta::AssetFilter;
use aifs_server::{AifsServer, ServerConfig};
use aifs_types::{AssetId, AssetKind, AssetUri, SnapshotId};

use crate::cli::{Cli, Command, OutputFormat};

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(ref args) => {
            let mut config = ServerConfig::from_env();
            if let Some(dir) = cli.storage_dir.clone() {
                config.storage_dir = dir;
            }
            if let Some(port) = args.port {
                config.port = port;
            }
            if args.development {
                config.mode = Mode::Development;
            }
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(async {
                AifsServer::new(config)?.serve().await?;
                Ok(())
            })
        }
        ref command => run_engine_command(&cli, command),
    }
}

fn open_engine(cli: &Cli) -> anyhow::Result<AifsEngine> {
    let mut config = EngineConfig::default();
    if let Some(dir) = cli.storage_dir.clone() {
        config.storage_dir = dir;
    } else if let Ok(dir) = std::env::var("AIFS_STORAGE_DIR") {
        config.storage_dir = dir.into();
    }
    Ok(AifsEngine::open(config)?)
}

fn run_engine_command(cli: &Cli, command: &Command) -> anyhow::Result<()> {
    match command {
        Command::Put(args) => {
            let engine = open_engine(cli)?;
            let data = std::fs::read(&args.file)
                .with_context(|| format!("reading {}", args.file.display()))?;
            let kind = AssetKind::parse(&args.kind)?;
            let parents = args
                .parents
                .iter()
                .map(|p| {
                    Ok(ParentRef {
                        asset_id: AssetId::from_hex(p)?,
                        transform_name: None,
                        transform_digest: None,
                    })
                })
                .collect::<anyhow::Result<Vec<_>>>()?;
            let asset_id = engine.put_asset(
                &data,
                kind,
                PutOptions {
                    namespace: args.namespace.clone(),
                    parents,
                    ..Default::default()
                },
            )?;
            let uri = AssetUri::new(args.namespace.clone(), asset_id).with_kind(kind);
            match cli.format {
                OutputFormat::Text => println!("{uri}"),
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::json!({ "asset_id": asset_id.to_hex(), "uri": uri.to_string() })
                ),
            }
            Ok(())
        }
        Command::Get(args) => {
            let engine = open_engine(cli)?;
            let asset_id = AssetId::from_hex(&args.asset_id)?;
            let view = engine.get_asset(&asset_id, true)?;
            let bytes = view.bytes.unwrap_or_default();
            match &args.output {
                Some(path) => std::fs::write(path, &bytes)
                    .with_context(|| format!("writing {}", path.display()))?,
                None => std::io::stdout().write_all(&bytes)?,
            }
            Ok(())
        }
        Command::List(args) => {
            let engine = open_engine(cli)?;
            let records = engine.list_assets(&AssetFilter {
                namespace: args.namespace.clone(),
                kind: None,
                limit: args.limit,
                cursor: None,
            })?;
            for record in records {
                match cli.format {
                    OutputFormat::Text => println!(
                        "{}  {:>8}  {:>10}  {}",
                        record.asset_id.to_hex(),
                        record.kind,
                        record.size,
                        record.namespace
                    ),
                    OutputFormat::Json => println!(
                        "{}",
                        serde_json::json!({
                            "asset_id": record.asset_id.to_hex(),
                            "kind": record.kind.as_str(),
                            "size": record.size,
                            "namespace": record.namespace,
                            "created_at": record.created_at.to_rfc3339(),
                        })
                    ),
                }
            }
            Ok(())
        }
        Command::Snapshot(args) => {
            let engine = open_engine(cli)?;
            let snapshot = engine.create_snapshot(&args.namespace, None, BTreeMap::new())?;
            println!(
                "{}  root={}  assets={}",
                snapshot.snapshot_id.to_hex(),
                hex::encode(snapshot.merkle_root),
                snapshot.asset_ids.len()
            );
            Ok(())
        }
        Command::Verify(args) => {
            let engine = open_engine(cli)?;
            let snapshot_id = SnapshotId::from_hex(&args.snapshot_id)?;
            let own_key = engine.public_key_hex();
            let key = args.public_key.as_deref().unwrap_or(&own_key);
            let valid = engine.verify_snapshot(&snapshot_id, VerifyWith::PublicKey(key))?;
            println!("{}", if valid { "valid" } else { "INVALID" });
            if !valid {
                bail!("snapshot signature did not verify");
            }
            Ok(())
        }
        Command::Branch(args) => {
            let engine = open_engine(cli)?;
            match (&args.name, &args.snapshot) {
                (Some(name), Some(snapshot)) => {
                    let snapshot_id = SnapshotId::from_hex(snapshot)?;
                    let record = engine.create_branch(
                        &args.namespace,
                        name,
                        &snapshot_id,
                        BTreeMap::new(),
                    )?;
                    println!("{} -> {}", record.name, record.snapshot_id.to_hex());
                }
                (Some(name), None) if args.history => {
                    for entry in engine.get_branch_history(&args.namespace, name, 100)? {
                        let old = entry
                            .old_snapshot_id
                            .map(|s| s.to_hex())
                            .unwrap_or_else(|| "-".into());
                        println!("{}  {} -> {}", entry.at, old, entry.new_snapshot_id.to_hex());
                    }
                }
                (Some(name), None) => {
                    let record = engine.get_branch(&args.namespace, name)?;
                    println!("{} -> {}", record.name, record.snapshot_id.to_hex());
                }
                (None, _) => {
                    for record in engine.list_branches(&args.namespace, 100)? {
                        println!("{} -> {}", record.name, record.snapshot_id.to_hex());
                    }
                }
            }
            Ok(())
        }
        Command::Tag(args) => {
            let engine = open_engine(cli)?;
            match (&args.name, &args.snapshot) {
                (Some(name), Some(snapshot)) => {
                    let snapshot_id = SnapshotId::from_hex(snapshot)?;
                    let record =
                        engine.create_tag(&args.namespace, name, &snapshot_id, BTreeMap::new())?;
                    println!("{} -> {}", record.name, record.snapshot_id.to_hex());
                }
                (Some(name), None) => {
                    let record = engine.get_tag(&args.namespace, name)?;
                    println!("{} -> {}", record.name, record.snapshot_id.to_hex());
                }
                (None, _) => {
                    for record in engine.list_tags(&args.namespace, 100)? {
                        println!("{} -> {}", record.name, record.snapshot_id.to_hex());
                    }
                }
            }
            Ok(())
        }
        Command::Token(args) => {
            let secret: [u8; 32] = hex::decode(&args.secret)
                .ok()
                .and_then(|b| b.try_into().ok())
                .context("secret must be 64 hex chars")?;
            let authorizer = Authorizer::new(secret, "aifs://cli");

            let mut caveats = Vec::new();
            if let Some(ns) = &args.namespace {
                caveats.push(Caveat::Namespace(ns.clone()));
            }
            if let Some(methods) = &args.methods {
                let parsed: Option<Vec<Method>> =
                    methods.split(',').map(|m| Method::parse(m.trim())).collect();
                caveats.push(Caveat::Methods(
                    parsed.context("unknown method in --methods")?,
                ));
            }
            if let Some(expires) = args.expires {
                caveats.push(Caveat::Expires(expires));
            }
            println!("{}", authorizer.mint(&args.identifier, &caveats).serialize());
            Ok(())
        }
        Command::Prune(_) => {
            let engine = open_engine(cli)?;
            let pruned = engine.prune_chunks()?;
            println!("pruned {pruned} chunks");
            Ok(())
        }
        Command::Serve(_) => unreachable!("serve handled in run_command"),
    }
}
