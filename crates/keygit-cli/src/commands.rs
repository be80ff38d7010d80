use std::io::Write;
use std::sync::Arc;

use anyhow::{bail, Context};
use colored::Colorize;
use keygit_kv::KvEngine;
use keygit_protocol::{AdvertisedRefs, Service};
use keygit_repo::RepositoryLoader;
use keygit_server::context::open_engine;
use keygit_server::{AppContext, EngineKind, KeygitServer, ServerConfig};
use keygit_store::ObjectStore;
use keygit_types::ObjectId;
use tracing::warn;

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    match cli.command {
        Command::Serve(args) => cmd_serve(apply_serve_args(config, args)).await,
        Command::LsRefs(args) => cmd_ls_refs(&config, args),
        Command::CatObject(args) => cmd_cat_object(&config, args),
    }
}

/// Defaults, then the config file, then global flags.
fn load_config(cli: &Cli) -> anyhow::Result<ServerConfig> {
    let mut config = match &cli.config {
        Some(path) => ServerConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ServerConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    Ok(config)
}

fn apply_serve_args(mut config: ServerConfig, args: ServeArgs) -> ServerConfig {
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(engine) = args.engine {
        config.engine = engine.into();
    }
    if args.sync_writes {
        config.sync_writes = true;
    }
    if let Some(branch) = args.default_branch {
        config.default_branch = branch;
    }
    if let Some(limit) = args.max_pack_size {
        config.max_pack_size = limit;
    }
    config
}

async fn cmd_serve(config: ServerConfig) -> anyhow::Result<()> {
    println!(
        "{} keygit on {} ({:?} engine, data: {})",
        "▶".green().bold(),
        config.bind_addr.to_string().bold(),
        config.engine,
        config.data_dir.display()
    );
    let context = AppContext::open(config).context("opening store")?;
    KeygitServer::new(context)
        .serve_with_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for ctrl-c; running until killed");
        std::future::pending::<()>().await;
    }
}

/// Open the on-disk store for offline inspection.
fn open_store(config: &ServerConfig) -> anyhow::Result<Arc<dyn KvEngine>> {
    if config.engine == EngineKind::Memory {
        bail!("the memory engine keeps nothing to inspect");
    }
    Ok(open_engine(config)?)
}

fn cmd_ls_refs(config: &ServerConfig, args: LsRefsArgs) -> anyhow::Result<()> {
    let loader = RepositoryLoader::new(open_store(config)?)
        .with_default_branch(config.default_branch.as_str());
    let repo = loader.load(&args.repo);
    let adv = AdvertisedRefs::load(&repo, Service::UploadPack)?;
    if adv.is_empty() {
        println!("{}", "(no refs)".dimmed());
        return Ok(());
    }
    if let Some(head) = adv.head {
        println!("{}\t{}", head.to_string().yellow(), "HEAD".cyan());
    }
    for (name, id) in &adv.refs {
        println!("{}\t{name}", id.to_string().yellow());
    }
    Ok(())
}

fn cmd_cat_object(config: &ServerConfig, args: CatObjectArgs) -> anyhow::Result<()> {
    let id = ObjectId::from_hex(&args.id).with_context(|| format!("bad object id {:?}", args.id))?;
    let repo = RepositoryLoader::new(open_store(config)?).load(&args.repo);
    let object = ObjectStore::get(&repo, &id)?;
    if args.kind {
        println!("{}", object.kind);
    } else if args.size {
        println!("{}", object.size);
    } else {
        std::io::stdout().write_all(&object.data)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::path::PathBuf;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn flags_override_defaults() {
        let cli = parse(&[
            "keygit",
            "serve",
            "--engine",
            "memory",
            "--sync-writes",
            "--default-branch",
            "refs/heads/main",
        ]);
        let config = load_config(&cli).unwrap();
        let Command::Serve(args) = cli.command else {
            panic!("wrong command");
        };
        let config = apply_serve_args(config, args);
        assert_eq!(config.engine, EngineKind::Memory);
        assert!(config.sync_writes);
        assert_eq!(config.default_branch, "refs/heads/main");
        assert_eq!(config.bind_addr, ServerConfig::default().bind_addr);
    }

    #[test]
    fn data_dir_flag_beats_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keygit.toml");
        std::fs::write(&path, "data_dir = \"/from/file\"\nsync_writes = true\n").unwrap();
        let cli = parse(&[
            "keygit",
            "ls-refs",
            "/o/r",
            "--config",
            path.to_str().unwrap(),
            "--data-dir",
            "/from/flag",
        ]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/from/flag"));
        assert!(config.sync_writes);
    }

    #[test]
    fn missing_config_file_fails() {
        let cli = parse(&["keygit", "ls-refs", "/o/r", "--config", "/no/such/keygit.toml"]);
        assert!(load_config(&cli).is_err());
    }

    #[test]
    fn memory_engine_cannot_be_inspected() {
        let config = ServerConfig {
            engine: EngineKind::Memory,
            ..ServerConfig::default()
        };
        assert!(open_store(&config).is_err());
    }

    #[test]
    fn inspection_refuses_a_directory_in_use() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            data_dir: dir.path().to_path_buf(),
            ..ServerConfig::default()
        };
        let serving = open_store(&config).unwrap();
        let args = LsRefsArgs {
            repo: "/o/r".into(),
        };
        assert!(cmd_ls_refs(&config, args).is_err());
        drop(serving);
        assert!(open_store(&config).is_ok());
    }

    #[test]
    fn inspect_commands_read_log_store() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            data_dir: dir.path().to_path_buf(),
            ..ServerConfig::default()
        };
        let object = keygit_store::StoredObject::hashed(
            keygit_types::ObjectKind::Blob,
            b"stored\n".to_vec(),
        );
        {
            let repo = RepositoryLoader::new(open_store(&config).unwrap()).load("/o/r");
            repo.put(&object).unwrap();
        }

        cmd_ls_refs(
            &config,
            LsRefsArgs {
                repo: "/o/r".into(),
            },
        )
        .unwrap();
        cmd_cat_object(
            &config,
            CatObjectArgs {
                repo: "/o/r".into(),
                id: object.id.to_hex(),
                kind: true,
                size: false,
            },
        )
        .unwrap();
        assert!(cmd_cat_object(
            &config,
            CatObjectArgs {
                repo: "/o/r".into(),
                id: "not-hex".into(),
                kind: false,
                size: false,
            },
        )
        .is_err());
    }
}
