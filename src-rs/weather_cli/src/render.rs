use std::io::{self, Write};

use hk_weather_rs::tools::ToolSpec;
use hk_weather_rs::DispatchMode;

use crate::models::CliConfig;

pub fn banner<W: Write>(out: &mut W, cfg: &CliConfig) -> io::Result<()> {
    writeln!(out, "\n=== Hong Kong Weather Assistant ===")?;
    writeln!(out, "Type 'exit' or 'quit' to end the session")?;
    if cfg.assistant.mode == DispatchMode::Model {
        writeln!(
            out,
            "This assistant uses {} ({}) to understand your queries and call appropriate tools",
            cfg.assistant.llm.provider,
            cfg.assistant.llm.resolved_model()
        )?;
    }
    Ok(())
}

pub fn connected<W: Write>(out: &mut W, tools: &[ToolSpec]) -> io::Result<()> {
    let names: Vec<&str> = tools.iter().map(|tool| tool.name.as_str()).collect();
    writeln!(out, "\nConnected to server with tools: {:?}", names)
}

pub fn prompt<W: Write>(out: &mut W) -> io::Result<()> {
    write!(out, "\nWhat would you like to know about Hong Kong's weather? ")?;
    out.flush()
}

pub fn processing<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "\nProcessing your request...")?;
    out.flush()
}

pub fn answer<W: Write>(out: &mut W, text: &str) -> io::Result<()> {
    writeln!(out, "\n{}", text)
}

pub fn error(msg: &str, hint: Option<String>) {
    eprintln!("Error: {}", msg);
    if let Some(hint) = hint {
        eprintln!("{}", hint);
    }
}
