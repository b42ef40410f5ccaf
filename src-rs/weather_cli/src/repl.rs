use std::io::{self, BufRead, Write};

use hk_weather_rs::mcp::ToolTransport;
use hk_weather_rs::WeatherAssistant;
use tracing::info;

use crate::models::{CliConfig, SessionState};
use crate::render;

pub struct REPL<T: ToolTransport> {
    pub config: CliConfig,
    pub state: SessionState,
    transport: T,
    assistant: WeatherAssistant,
}

impl<T: ToolTransport> REPL<T> {
    pub fn new(config: CliConfig, transport: T, assistant: WeatherAssistant) -> Self {
        Self {
            config,
            state: SessionState::Connected,
            transport,
            assistant,
        }
    }

    /// Reads queries until exit or EOF. The transport is closed on every path out.
    pub fn run<R: BufRead, W: Write>(&mut self, input: &mut R, out: &mut W) -> io::Result<()> {
        let outcome = self.read_loop(input, out);
        self.close();
        outcome
    }

    fn read_loop<R: BufRead, W: Write>(&mut self, input: &mut R, out: &mut W) -> io::Result<()> {
        render::banner(out, &self.config)?;
        loop {
            self.state = SessionState::AwaitingInput;
            render::prompt(out)?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                writeln!(out)?;
                return Ok(());
            }
            let query = line.trim();
            if query.is_empty() {
                continue;
            }
            if is_exit(query) {
                info!("user requested to exit");
                return Ok(());
            }

            self.state = SessionState::Processing;
            render::processing(out)?;
            let answer = self.assistant.process_query(&mut self.transport, query);
            render::answer(out, &answer)?;
        }
    }

    pub fn close(&mut self) {
        if self.state != SessionState::Closed {
            self.transport.close();
            self.state = SessionState::Closed;
        }
    }
}

fn is_exit(query: &str) -> bool {
    query.eq_ignore_ascii_case("exit") || query.eq_ignore_ascii_case("quit")
}
