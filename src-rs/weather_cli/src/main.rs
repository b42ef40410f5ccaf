mod cli;
mod models;
mod repl;
mod render;

use std::io;
use std::process::ExitCode;

use hk_weather_rs::error::StartupError;
use hk_weather_rs::helpers::build_llm_router;
use hk_weather_rs::logging::init_tracing;
use hk_weather_rs::mcp::{McpClient, ToolTransport};
use hk_weather_rs::WeatherAssistant;
use tracing::info;

use models::CliConfig;
use repl::REPL;

fn main() -> ExitCode {
    let config = cli::parse_config();
    init_tracing(&config.log_level);

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let hint = err.downcast_ref::<StartupError>().and_then(StartupError::hint);
            render::error(&format!("{:#}", err), hint);
            ExitCode::from(1)
        }
    }
}

fn run(config: CliConfig) -> anyhow::Result<()> {
    let router = build_llm_router(&config.assistant.llm)?;
    info!(server = %config.server_path, "starting client");
    let mut client = McpClient::connect(&config.server_path).map_err(StartupError::from)?;
    let tools = client.list_tools().map_err(StartupError::from)?;
    info!(tools = tools.len(), "tools listed");

    let stdout = io::stdout();
    let mut out = stdout.lock();
    render::connected(&mut out, &tools)?;

    let assistant = WeatherAssistant::new(router, config.assistant.clone())
        .with_progress(Box::new(|line: &str| println!("{}", line)))
        .with_tools(tools);
    let mut repl = REPL::new(config, client, assistant);
    let stdin = io::stdin();
    repl.run(&mut stdin.lock(), &mut out)?;
    Ok(())
}
