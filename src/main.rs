use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

use infinite_gallery::config::Configuration;
use infinite_gallery::events::{LoadTextures, TextureEvent};
use infinite_gallery::gallery::fallback::FlatList;
use infinite_gallery::tasks::{catalog, loader, viewer};

const DEFAULT_CONFIG: &str = "config.yaml";

#[derive(Debug, Parser)]
#[command(
    name = "infinite-gallery",
    version,
    about = "Endless 3D scroll through a photo collection"
)]
struct Args {
    /// Path to YAML config
    #[arg(value_name = "CONFIG", default_value = DEFAULT_CONFIG)]
    config: PathBuf,
    /// Print the catalog as a flat list without opening a window
    #[arg(long)]
    list: bool,
    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    let mut filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if verbosity > 0 {
        let level = if verbosity == 1 {
            Level::DEBUG
        } else {
            Level::TRACE
        };
        filter = filter.add_directive(format!("infinite_gallery={level}").parse()?);
    }
    filter = filter
        .add_directive("wgpu=warn".parse()?)
        .add_directive("naga=warn".parse()?)
        .add_directive("winit=warn".parse()?);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
    Ok(())
}

fn load_configuration(path: &Path) -> Result<Configuration> {
    let cfg = if !path.exists() && path == Path::new(DEFAULT_CONFIG) {
        info!(path = %path.display(), "no configuration file; using defaults");
        Configuration::default()
    } else {
        Configuration::from_yaml_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?
    };
    cfg.validated().context("invalid configuration values")
}

#[tokio::main]
async fn main() -> Result<()> {
    let Args {
        config,
        list,
        verbose,
    } = Args::parse();
    init_tracing(verbose)?;

    let cfg = load_configuration(&config)?;
    tracing::debug!("Loaded configuration from {}:\n{:#?}", config.display(), cfg);

    let client = reqwest::Client::builder()
        .user_agent(concat!("infinite-gallery/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")?;

    let entries = catalog::list_images(&cfg.catalog, &client)
        .await
        .context("failed to list the image catalog")?;

    if entries.is_empty() || list {
        print!("{}", FlatList::new(&entries));
        return Ok(());
    }

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!("ctrl-c handler failed: {err}");
                return;
            }
            tracing::info!("ctrl-c received; initiating shutdown");
            cancel.cancel();
        });
    }

    // Main -> Loader: one batch with the whole catalog
    let (load_tx, load_rx) = mpsc::channel::<LoadTextures>(1);
    // Loader -> Viewer
    let (texture_tx, texture_rx) =
        mpsc::channel::<TextureEvent>(cfg.loader_max_concurrent_fetches * 2);

    load_tx
        .send(LoadTextures(entries.iter().map(|e| e.uri.clone()).collect()))
        .await
        .context("loader request channel closed")?;
    drop(load_tx);

    let mut tasks = JoinSet::new();
    tasks.spawn({
        let client = client.clone();
        let cancel = cancel.clone();
        let limits = loader::LoaderLimits {
            max_in_flight: cfg.loader_max_concurrent_fetches,
            max_texture_dim: cfg.max_texture_dim,
        };
        async move {
            loader::run(load_rx, texture_tx, client, cancel, limits)
                .await
                .context("loader task failed")
        }
    });

    // The viewer owns the main thread until the window closes or cancellation occurs
    match viewer::run_windowed(cfg.clone(), &entries, texture_rx, cancel.clone())
        .context("viewer failed")
    {
        Ok(viewer::ViewerOutcome::Closed) => info!("viewer closed"),
        Ok(viewer::ViewerOutcome::Fallback) => {
            info!(images = entries.len(), "showing flat list");
            print!("{}", FlatList::new(&entries));
        }
        Err(e) => tracing::error!("{e:?}"),
    }
    cancel.cancel();

    while let Some(res) = tasks.join_next().await {
        match res {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!("task error: {e:?}"),
            Err(e) => tracing::error!("join error: {e}"),
        }
    }

    Ok(())
}
