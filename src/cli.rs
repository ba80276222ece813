use crate::badge::{BadgeCompositor, DirectorySaver, Rasterizer, ResvgRasterizer};
use crate::config::{Config, load_config};
use crate::image_source::NetImageSource;
use crate::network::{layout_network, render_network_svg};
use crate::pledge::{BadgeSpec, NewPledge, Pledge, clean_username, random_suggestion, suggestion};
use crate::resolver::{ProfileResolver, Resolution};
use crate::store::{MemoryStore, PledgeService, parse_records};
use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

const DEFAULT_STORE_PATH: &str = "pledges.json";
const NETWORK_SIZE: f32 = 600.0;

#[derive(Parser, Debug)]
#[command(name = "pledge", version, about = "Succinct allegiance pledge badges and community gallery")]
pub struct Args {
    /// Config file (JSON5)
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Pledge store file; overrides `store.path` from the config
    #[arg(long = "store", global = true)]
    pub store: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compose a badge PNG and save it
    Badge {
        #[arg(short = 'u', long)]
        username: String,
        /// Pledge body; the username prefix is added automatically
        #[arg(short = 'm', long, default_value = "")]
        message: String,
        /// Profile image URL, `data:` URL or asset path
        #[arg(long = "profile-url")]
        profile_url: Option<String>,
        #[arg(short = 'o', long = "out-dir", default_value = ".")]
        out_dir: PathBuf,
    },
    /// Print the first avatar URL that resolves for a username
    Resolve { username: String },
    /// Lay out a pledge list as a clustered network
    Network {
        /// Pledge JSON array, or '-' for stdin
        #[arg(short = 'i', long)]
        input: PathBuf,
        /// Defaults to stdout for json/svg
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
        #[arg(short = 'e', long, value_enum, default_value = "json")]
        format: NetworkFormat,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Record a pledge (one per username)
    Submit {
        #[arg(short = 'u', long)]
        username: String,
        #[arg(short = 'm', long)]
        message: String,
    },
    /// Show the newest pledges
    List {
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Remove a pledge by id
    Delete { id: String },
    /// Print a pledge suggestion
    Suggest {
        #[arg(long)]
        index: Option<usize>,
    },
    /// Serve the avatar image proxy until interrupted
    Proxy,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkFormat {
    Json,
    Svg,
    Png,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    let mut config = load_config(args.config.as_deref())?;
    if let Some(store) = &args.store {
        config.store.path = Some(store.clone());
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(execute(args.command, config))
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "pledge_badge=debug"
    } else {
        "pledge_badge=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

async fn execute(command: Command, config: Config) -> Result<()> {
    match command {
        Command::Badge {
            username,
            message,
            profile_url,
            out_dir,
        } => {
            let mut spec = BadgeSpec::preview(&username, &message, Utc::now())
                .context("please enter your username")?;
            if let Some(url) = profile_url {
                spec.profile_url = url;
            }
            let compositor = compositor(&config);
            let saver = DirectorySaver::new(out_dir);
            let path = compositor
                .download(&spec, &saver)
                .await
                .map_err(|err| anyhow::anyhow!("{}: {err}", err.user_message()))?;
            println!("{}", path.display());
        }
        Command::Resolve { username } => {
            let source = Arc::new(NetImageSource::new(&config.badge.asset_dir));
            let resolver = ProfileResolver::new(source, config.resolver.clone());
            match resolver.resolve(&clean_username(&username)).await {
                Resolution::Resolved { url, .. } => println!("{url}"),
                Resolution::Exhausted { attempts } => {
                    for attempt in &attempts {
                        debug!(url = %attempt.url, error = %attempt.error, "candidate failed");
                    }
                    println!("exhausted");
                }
            }
        }
        Command::Network {
            input,
            output,
            format,
            seed,
        } => {
            let pledges = read_pledges(&input)?;
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            let layout = layout_network(&pledges, &config.network, &mut rng);
            debug!(
                nodes = layout.nodes.len(),
                edges = layout.edges.len(),
                fallback = layout.fallback_placements,
                "network laid out"
            );
            match format {
                NetworkFormat::Json => {
                    write_text(&serde_json::to_string_pretty(&layout)?, output.as_deref())?
                }
                NetworkFormat::Svg => write_text(
                    &render_network_svg(&layout, &config.theme, NETWORK_SIZE),
                    output.as_deref(),
                )?,
                NetworkFormat::Png => {
                    let output = output.context("output path required for png output")?;
                    let svg = render_network_svg(&layout, &config.theme, NETWORK_SIZE);
                    let png = ResvgRasterizer::new().rasterize(
                        &svg,
                        NETWORK_SIZE,
                        NETWORK_SIZE,
                        config.badge.scale,
                    )?;
                    std::fs::write(&output, png)?;
                }
            }
        }
        Command::Submit { username, message } => {
            let pledge = NewPledge::from_form(&username, &message, Utc::now())?;
            let service = service(&config).await?;
            match service.submit(pledge).await {
                Ok(stored) => println!(
                    "pledged as @{} ({})",
                    stored.username,
                    stored.id.as_deref().unwrap_or_default()
                ),
                Err(err) => {
                    debug!(error = %err, "submission rejected");
                    anyhow::bail!("{}", err.user_message());
                }
            }
        }
        Command::List { limit } => {
            let service = service(&config).await?;
            let limit = limit.unwrap_or(config.store.subscribe_limit);
            for pledge in service.recent(limit).await? {
                println!(
                    "{}  {}  @{}: {}",
                    pledge.id.as_deref().unwrap_or("-"),
                    pledge.timestamp.format("%Y-%m-%d %H:%M"),
                    pledge.username,
                    pledge.message
                );
            }
            println!("{} pledges total", service.count().await);
        }
        Command::Delete { id } => {
            service(&config).await?.delete(&id).await?;
            println!("deleted {id}");
        }
        Command::Suggest { index } => {
            let text = match index {
                Some(index) => suggestion(index),
                None => random_suggestion(&mut rand::thread_rng()),
            };
            println!("{text}");
        }
        Command::Proxy => crate::proxy::serve(config.proxy.clone()).await?,
    }
    Ok(())
}

fn compositor(config: &Config) -> BadgeCompositor {
    let rasterizer = ResvgRasterizer::new().with_font_family(primary_family(&config.theme.font_family));
    BadgeCompositor::new(
        Arc::new(NetImageSource::new(&config.badge.asset_dir)),
        Arc::new(rasterizer),
        config.resolver.clone(),
        config.badge.clone(),
        config.theme.clone(),
    )
}

async fn service(config: &Config) -> Result<PledgeService> {
    let path = config
        .store
        .path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH));
    let store = MemoryStore::open(&path)
        .await
        .with_context(|| format!("opening pledge store {}", path.display()))?;
    Ok(PledgeService::new(Arc::new(store)))
}

/// First entry of a CSS font-family list, unquoted.
fn primary_family(family: &str) -> String {
    family
        .split(',')
        .next()
        .unwrap_or(family)
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string()
}

fn read_pledges(path: &Path) -> Result<Vec<Pledge>> {
    let contents = if path == Path::new("-") {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?
    };
    Ok(parse_records(&contents)?)
}

fn write_text(text: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, text)?,
        None => println!("{text}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_badge_with_global_flags() {
        let args = Args::try_parse_from([
            "pledge", "-v", "badge", "--username", "@alice", "--message", "hodl", "--config",
            "pledge.json5",
        ])
        .unwrap();
        assert!(args.verbose);
        assert_eq!(args.config.as_deref(), Some(Path::new("pledge.json5")));
        match args.command {
            Command::Badge {
                username, out_dir, ..
            } => {
                assert_eq!(username, "@alice");
                assert_eq!(out_dir, PathBuf::from("."));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn network_format_defaults_to_json() {
        let args = Args::try_parse_from(["pledge", "network", "-i", "p.json", "--seed", "7"]).unwrap();
        match args.command {
            Command::Network { format, seed, .. } => {
                assert_eq!(format, NetworkFormat::Json);
                assert_eq!(seed, Some(7));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn primary_family_strips_fallbacks() {
        assert_eq!(primary_family("Arial, sans-serif"), "Arial");
        assert_eq!(primary_family("'Inter Tight', Arial"), "Inter Tight");
    }

    #[test]
    fn reads_pledge_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pledges.json");
        std::fs::write(
            &path,
            r#"[{"id": "x", "username": "alice", "message": "I, alice, hodl", "timestamp": "2024-05-01T12:00:00Z"}]"#,
        )
        .unwrap();
        let pledges = read_pledges(&path).unwrap();
        assert_eq!(pledges.len(), 1);
        assert_eq!(pledges[0].username, "alice");
    }
}
