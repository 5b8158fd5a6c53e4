use thiserror::Error;

use crate::web::DEFAULT_PAGE_TTL;

#[derive(Error, Debug, PartialEq)]
pub enum CliError {
    #[error("Invalid command line flag: {0}")]
    InvalidCommandLineFlag(String),
    #[error("Invalid command line flag value for {0}")]
    InvalidCommandLineFlagValue(&'static str),
    #[error("Missing subcommand (expected store, get, page, replay or demo)")]
    MissingSubcommand,
    #[error("Invalid subcommand: {0}")]
    InvalidSubcommand(String),
    #[error("Missing argument for subcommand {0}")]
    MissingSubcommandArgument(&'static str),
    #[error("Unexpected argument: {0}")]
    UnexpectedArgument(String),
}

#[derive(Debug, PartialEq)]
pub enum Subcommand {
    /// Store a value under a random key and print the key.
    Store(String),
    /// Print the value stored at a key.
    Get(String),
    /// Fetch a page through the page cache.
    Page(String),
    /// Print the recorded calls to `Cache.store`.
    Replay,
    /// Walk through the caches end to end, optionally against a given URL.
    Demo(Option<String>),
}

#[derive(Debug, PartialEq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub ttl: u64,
    pub memory: bool,
    pub subcommand: Subcommand,
}

impl Config {
    pub fn new<I: IntoIterator<Item = String>>(command_line_args: I) -> Result<Self, CliError> {
        let mut iter = command_line_args.into_iter().skip(1);
        let mut host: Option<String> = None;
        let mut port: Option<u16> = None;
        let mut ttl: Option<u64> = None;
        let mut memory = false;

        let subcommand_name = loop {
            let Some(arg) = iter.next() else {
                return Err(CliError::MissingSubcommand);
            };

            if !arg.starts_with("--") {
                break arg;
            }

            match arg.as_str() {
                "--host" => {
                    let Some(host_str) = iter.next() else {
                        return Err(CliError::InvalidCommandLineFlagValue("--host"));
                    };

                    if host_str.is_empty() {
                        return Err(CliError::InvalidCommandLineFlagValue("--host"));
                    }

                    host = Some(host_str);
                }
                "--port" => {
                    let Some(port_str) = iter.next() else {
                        return Err(CliError::InvalidCommandLineFlagValue("--port"));
                    };

                    let port_number = port_str
                        .parse::<u32>()
                        .map_err(|_| CliError::InvalidCommandLineFlagValue("--port"))?;

                    if !(1..=65535).contains(&port_number) {
                        return Err(CliError::InvalidCommandLineFlagValue("--port"));
                    }

                    port = Some(port_number as u16);
                }
                "--ttl" => {
                    let Some(ttl_str) = iter.next() else {
                        return Err(CliError::InvalidCommandLineFlagValue("--ttl"));
                    };

                    let seconds = ttl_str
                        .parse::<u64>()
                        .map_err(|_| CliError::InvalidCommandLineFlagValue("--ttl"))?;

                    if seconds == 0 {
                        return Err(CliError::InvalidCommandLineFlagValue("--ttl"));
                    }

                    ttl = Some(seconds);
                }
                "--memory" => memory = true,
                flag => return Err(CliError::InvalidCommandLineFlag(flag.to_string())),
            }
        };

        let subcommand = match subcommand_name.as_str() {
            "store" => Subcommand::Store(next_argument(&mut iter, "store")?),
            "get" => Subcommand::Get(next_argument(&mut iter, "get")?),
            "page" => Subcommand::Page(next_argument(&mut iter, "page")?),
            "replay" => Subcommand::Replay,
            "demo" => Subcommand::Demo(iter.next()),
            other => return Err(CliError::InvalidSubcommand(other.to_string())),
        };

        if let Some(extra) = iter.next() {
            return Err(CliError::UnexpectedArgument(extra));
        }

        Ok(Config {
            host: host.unwrap_or_else(|| "127.0.0.1".to_string()),
            port: port.unwrap_or(6379),
            ttl: ttl.unwrap_or(DEFAULT_PAGE_TTL),
            memory,
            subcommand,
        })
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn next_argument<I: Iterator<Item = String>>(
    iter: &mut I,
    subcommand: &'static str,
) -> Result<String, CliError> {
    iter.next()
        .ok_or(CliError::MissingSubcommandArgument(subcommand))
}
