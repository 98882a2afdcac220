use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::controller::{KeyEvent, UiEvent};

#[derive(Parser)]
#[command(name = "wikisearch")]
#[command(about = "wikisearch - Search wiki titles as you type.")]
#[command(version = env!("VERSION"))]
pub struct Cli {
    /// Path to one or more config files (merged in order). Defaults to
    /// `config.toml` if present.
    #[arg(long, action = clap::ArgAction::Append)]
    pub config: Vec<PathBuf>,

    /// Word index endpoint. Overrides `app.endpoint` from the config.
    #[arg(long)]
    pub endpoint: Option<String>,

    /// How the result page is printed.
    #[arg(long, value_enum, default_value_t = Format::Text)]
    pub format: Format,

    /// Pre-fill the search input.
    #[arg(long)]
    pub word: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Html,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a sample config file.
    NewConfig {
        /// Output path for config file.
        #[arg(short, long, default_value = "config.toml")]
        path: PathBuf,
    },

    /// Look up a single word, print the result page and exit.
    Query {
        /// Word to look up.
        word: String,
    },

    /// Run the development word index server.
    Serve {
        /// Wiki and title file to load, as `code=path`. Repeat for more wikis.
        #[arg(long = "wiki", value_parser = parse_wiki, required = true)]
        wikis: Vec<(String, PathBuf)>,

        /// Address to listen on. Overrides `server.address` from the config.
        #[arg(long)]
        address: Option<String>,
    },
}

/// Parse a `code=path` wiki argument.
fn parse_wiki(s: &str) -> Result<(String, PathBuf), String> {
    match s.split_once('=') {
        Some((code, path)) if !code.is_empty() && !path.is_empty() => {
            Ok((code.to_string(), PathBuf::from(path)))
        }
        _ => Err(format!("expected code=path, got '{}'", s)),
    }
}

/// Turn a line typed at the interactive prompt into an input event.
/// An empty line presses Enter. Returns `None` on `:quit`.
pub fn parse_line(line: String) -> Option<UiEvent> {
    match line.as_str() {
        ":quit" | ":q" => None,
        "" => Some(UiEvent::Key(KeyEvent::enter())),
        ":clear" => Some(UiEvent::Input(String::new())),
        _ => Some(UiEvent::Input(line)),
    }
}
