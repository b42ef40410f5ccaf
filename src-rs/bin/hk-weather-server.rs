use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::Parser;
use tracing::info;

use hk_weather_rs::config::ServerConfig;
use hk_weather_rs::error::StartupError;
use hk_weather_rs::helpers::build_llm_router;
use hk_weather_rs::logging::init_tracing;
use hk_weather_rs::mcp::{serve, ServerContext};
use hk_weather_rs::tools::{register_weather_tools, ToolRegistry, WorkerPool};
use hk_weather_rs::weather::{ChromiumEngine, PageExtractor, WeatherFetcher};

/// Hong Kong weather tools over MCP on stdin/stdout.
#[derive(Debug, Parser)]
#[command(name = "hk-weather-server", version)]
struct Args {
    /// Concurrent browser sessions.
    #[arg(long)]
    workers: Option<usize>,
    /// Where screenshots are written.
    #[arg(long)]
    screenshot_dir: Option<PathBuf>,
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(&args.log_level);

    let mut config = ServerConfig::from_env();
    if let Some(workers) = args.workers {
        config.workers = workers.max(1);
    }
    if let Some(dir) = args.screenshot_dir {
        config.screenshot_dir = dir;
    }

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            if let Some(hint) = err.downcast_ref::<StartupError>().and_then(StartupError::hint) {
                eprintln!("{}", hint);
            }
            ExitCode::from(1)
        }
    }
}

fn run(config: ServerConfig) -> anyhow::Result<()> {
    // The blocking HTTP client is built and dropped outside the async runtime.
    let router = Arc::new(build_llm_router(&config.llm)?);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(StartupError::Runtime)?;

    let served = runtime.block_on(async {
        let extractor = Arc::new(PageExtractor::new(
            router.clone(),
            config.llm.clone(),
            config.page_text_limit,
        ));
        let engine = Arc::new(ChromiumEngine::new(extractor));
        let fetcher = Arc::new(WeatherFetcher::new(engine, config.screenshot_dir.clone()));

        let pool = WorkerPool::new(config.workers);
        let registry = ToolRegistry::new();
        register_weather_tools(&registry, fetcher, pool.clone())
            .map_err(|err| anyhow!("failed to register weather tools: {}", err))?;
        info!(
            workers = pool.size(),
            screenshot_dir = %config.screenshot_dir.display(),
            tools = registry.count(),
            "weather tools registered"
        );

        let ctx = Arc::new(ServerContext::new(Arc::new(registry)));
        let served = serve(ctx, tokio::io::stdin(), tokio::io::stdout()).await;
        pool.close();
        anyhow::Ok(served)
    })?;

    drop(runtime);
    drop(router);
    served.context("stdio transport failed")?;
    info!("server stopped");
    Ok(())
}
