mod cli;
mod client;
mod controller;
mod http;
mod index;
mod init;
mod models;
mod nav;
mod page;
mod render;

use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
};

use cli::{Commands, Format};
use client::HttpBackend;
use controller::{InputController, UiEvent};
use models::{Config, Settings};
use nav::PrintNavigator;
use page::{HtmlView, TextView, View};

/// Default listen address of the development index server.
const DEFAULT_ADDRESS: &str = "127.0.0.1:53172";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init::init_logger();

    let cli = cli::Cli::parse();

    // Load config.
    let mut config = match init::init_config(&init::config_paths(&cli.config)) {
        Ok(c) => c,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };
    if let Some(endpoint) = &cli.endpoint {
        config.app.endpoint = endpoint.clone();
    }

    // Handle CLI commands.
    if let Some(cmd) = cli.command {
        match cmd {
            // Generate a new config file.
            Commands::NewConfig { path } => {
                match init::generate_config(&path) {
                    Ok(_) => {
                        log::info!("config file generated: {}", path.display());
                    }
                    Err(e) => {
                        log::error!("error generating config: {}", e);
                        std::process::exit(1);
                    }
                }
                return;
            }

            // Run the development index server.
            Commands::Serve { wikis, address } => {
                serve(&config, &wikis, address).await;
                return;
            }

            // One-shot lookup.
            Commands::Query { word } => {
                let mut c = init_controller(&config, cli.format);
                c.on_input(&word);
                c.flush();
                if c.client().dispatched() > 0 {
                    c.process_reply().await;
                }
                if c.page().error.is_some() {
                    std::process::exit(1);
                }
                return;
            }
        }
    }

    // Interactive search.
    let mut c = init_controller(&config, cli.format);

    log::info!("type to search, empty line opens the top result, :clear empties, :quit exits");

    if let Some(word) = cli.word.filter(|w| !w.is_empty()) {
        c.on_input(&word);
    }

    let (tx, rx) = mpsc::channel(64);
    tokio::spawn(read_input(tx));
    c.run(rx).await;
}

/// Build the search controller, exiting on configuration errors.
fn init_controller(
    config: &Config,
    format: Format,
) -> InputController<HttpBackend, Box<dyn View>, PrintNavigator<std::io::Stdout>> {
    let settings = init::init_settings(config).unwrap_or_else(|e| {
        log::error!("{}", e);
        std::process::exit(1);
    });

    let view: Box<dyn View> = match format {
        Format::Text => Box::new(TextView::new(std::io::stdout())),
        Format::Html => {
            let tpl = init::init_templates().unwrap_or_else(|e| {
                log::error!("{}", e);
                std::process::exit(1);
            });
            Box::new(HtmlView::new(tpl, std::io::stdout()))
        }
    };

    let backend = HttpBackend::new(settings.endpoint.clone()).unwrap_or_else(|e| {
        log::error!("error initializing HTTP client: {}", e);
        std::process::exit(1);
    });

    log_settings(&settings);

    InputController::new(
        settings,
        backend,
        view,
        PrintNavigator::new(std::io::stdout()),
    )
}

fn log_settings(s: &Settings) {
    log::info!(
        "index: {} (min length {}, max {} results, timeout {:?})",
        s.endpoint,
        s.min_length,
        s.max_completions,
        s.timeout
    );
}

/// Feed stdin lines to the controller until EOF or `:quit`.
async fn read_input(tx: mpsc::Sender<UiEvent>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(l)) => l,
            Ok(None) => break,
            Err(e) => {
                log::error!("error reading input: {}", e);
                break;
            }
        };

        let Some(ev) = cli::parse_line(line) else {
            break;
        };
        if tx.send(ev).await.is_err() {
            break;
        }
    }
}

/// Load the title files and serve the word index over HTTP.
async fn serve(config: &Config, wikis: &[(String, PathBuf)], address: Option<String>) {
    let mut b = index::IndexBuilder::new();
    for (wiki, path) in wikis {
        if let Err(e) = b.load_file(wiki, path) {
            log::error!("error loading {} from {}: {}", wiki, path.display(), e);
            std::process::exit(1);
        }
    }

    let ctx = Arc::new(http::Ctx {
        index: b.build(),
        max_completions: config
            .server
            .max_completions
            .unwrap_or(http::DEFAULT_SERVER_COMPLETIONS),
    });

    let addr = address
        .or_else(|| Some(config.server.address.clone()).filter(|a| !a.is_empty()))
        .unwrap_or_else(|| DEFAULT_ADDRESS.to_string());

    log::info!("starting server on {}", addr);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            log::error!("error listening on {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, http::init_handlers(ctx)).await {
        log::error!("server error: {}", e);
        std::process::exit(1);
    }
}
