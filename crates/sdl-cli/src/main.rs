use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use sdl_config::{
    fallback_runtime_config, fetch_runtime_config, load_runtime_config_file, stream_endpoint,
    PublicEnv,
};
use sdl_reconcile::check_mode_gate;
use sdl_schemas::{GameId, ReplaySpeed, RuntimeConfig, StreamMode};
use sdl_stream::SubscriptionKey;

mod commands;

#[derive(Parser)]
#[command(name = "sdl")]
#[command(about = "Sideline live game stream CLI", long_about = None)]
struct Cli {
    /// Read runtime config from a local YAML/JSON file instead of the backend
    #[arg(long, global = true, conflicts_with = "offline")]
    config_file: Option<String>,

    /// Skip the backend and use built-in runtime config defaults
    #[arg(long, global = true, default_value_t = false)]
    offline: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the socket URL a subscription would open
    Endpoint(SubscriptionArgs),

    /// Print the effective runtime config as JSON
    Config,

    /// Subscribe and print each reconciled update until Ctrl-C, replay
    /// completion, or the stream closing
    Watch {
        #[command(flatten)]
        sub: SubscriptionArgs,

        /// Print every published snapshot as one JSON line
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[derive(Args)]
struct SubscriptionArgs {
    /// Game (event) id
    #[arg(long)]
    game: String,

    /// live | replay
    #[arg(long, default_value = "live")]
    mode: StreamMode,

    /// Replay speed multiplier (replay only)
    #[arg(long, default_value = "1")]
    speed: ReplaySpeed,
}

impl SubscriptionArgs {
    fn key(&self) -> Result<SubscriptionKey> {
        let game_id = GameId::parse(&self.game).context("--game must not be blank")?;
        Ok(SubscriptionKey {
            game_id: Some(game_id),
            mode: self.mode,
            speed: self.speed,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env.local if present (dev convenience).
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cli = Cli::parse();
    let env = PublicEnv::from_env();
    let runtime = resolve_runtime(&cli, &env).await?;

    match cli.cmd {
        Commands::Endpoint(sub) => {
            let key = sub.key()?;
            let gate = check_mode_gate(key.mode, &runtime.feature_flags);
            if gate.is_demoted() {
                eprintln!("replay disabled by runtime config; using live");
            }
            let game_id = key.game_id.context("--game must not be blank")?;
            let url = stream_endpoint(
                &env.ws_url,
                runtime.game_updates_path(),
                &game_id,
                gate.applied(),
                Some(key.speed),
            )?;
            println!("{url}");
        }

        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&runtime)?);
        }

        Commands::Watch { sub, json } => {
            commands::watch::run(env, runtime, sub.key()?, json).await?;
        }
    }

    Ok(())
}

async fn resolve_runtime(cli: &Cli, env: &PublicEnv) -> Result<RuntimeConfig> {
    if let Some(path) = &cli.config_file {
        return load_runtime_config_file(path, env);
    }
    if cli.offline {
        return Ok(fallback_runtime_config(env));
    }
    let client = reqwest::Client::builder()
        .build()
        .context("building http client")?;
    Ok(fetch_runtime_config(&client, env).await)
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}
