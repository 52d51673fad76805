//! document-search-mcp: MCP client and server for a local document collection
//!
//! `serve` answers MCP requests on stdin/stdout; `chat` starts a server as a
//! child process and drives it from an interactive prompt.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info, warn, Level};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

use document_search_mcp::client::{ChatClient, Session};
use document_search_mcp::config::{self, Config};
use document_search_mcp::server::{
    CapabilityProvider, DocumentSearch, Echo, McpServer, RequestRouter, ServerContext,
};

/// MCP client and server for searching and reading a local document collection.
#[derive(Parser, Debug)]
#[command(name = "document-search-mcp")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    mode: Mode,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Serve MCP requests over stdin/stdout
    Serve {
        /// Capability set to expose
        #[arg(long, value_enum, default_value_t = Profile::Documents)]
        profile: Profile,

        /// Path to configuration file
        #[arg(short, long, value_name = "CONFIG_FILE")]
        config: Option<PathBuf>,
    },

    /// Start a server process and chat with it
    Chat {
        /// Path to configuration file
        #[arg(short, long, value_name = "CONFIG_FILE")]
        config: Option<PathBuf>,

        /// Program that runs the server
        #[arg(value_name = "SERVER_COMMAND")]
        server: String,

        /// Arguments passed to the server program
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

impl Mode {
    fn config(&self) -> Option<&std::path::Path> {
        match self {
            Self::Serve { config, .. } | Self::Chat { config, .. } => config.as_deref(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Profile {
    /// Document search tools, document resources, analysis prompts
    Documents,
    /// Echo tool, resource and prompt
    Echo,
}

type FilterHandle = reload::Handle<EnvFilter, Registry>;

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "warn" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN, // Default to warn for unknown levels
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn build_filter(level: Level) -> EnvFilter {
    EnvFilter::from_default_env().add_directive(level.into())
}

/// Initialises the tracing subscriber for logging.
///
/// Returns a handle for swapping the filter at runtime.
fn init_tracing(level: Level) -> FilterHandle {
    let (filter, handle) = reload::Layer::new(build_filter(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    handle
}

/// Level used while `/debug` is on: at least `debug`, never quieter than
/// the base level.
fn debug_level(base: Level) -> Level {
    if base < Level::DEBUG {
        Level::DEBUG
    } else {
        base
    }
}

/// Entry point for document-search-mcp.
fn main() -> ExitCode {
    let args = Args::parse();

    // Load configuration
    let config_path = args.mode.config();
    let cfg = match config::load_config(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            if config_path.is_none() {
                if let Some(default_path) = config::default_config_path() {
                    eprintln!("\nExpected config at: {}", default_path.display());
                }
            }
            return ExitCode::FAILURE;
        }
    };

    // Initialise logging
    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    let filter = init_tracing(log_level);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    let code = match args.mode {
        Mode::Serve { profile, .. } => runtime.block_on(serve(profile, &cfg)),
        Mode::Chat {
            server, args: argv, ..
        } => runtime.block_on(chat(&server, &argv, &cfg, log_level, filter)),
    };

    // A pending read on stdin would otherwise hold the runtime open.
    runtime.shutdown_background();
    code
}

async fn serve(profile: Profile, cfg: &Config) -> ExitCode {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        profile = ?profile,
        "Starting document-search-mcp server"
    );

    let provider: Arc<dyn CapabilityProvider> = match profile {
        Profile::Documents => {
            info!(
                documents_dir = %cfg.server.documents_dir.display(),
                extension = %cfg.server.document_extension,
                "Document collection configured"
            );
            Arc::new(DocumentSearch::new(ServerContext::from_config(&cfg.server)))
        }
        Profile::Echo => Arc::new(Echo),
    };

    let mut server = McpServer::stdio(RequestRouter::new(provider));
    info!("MCP server ready, waiting for client connection...");

    match server.run().await {
        Ok(()) => {
            info!("Server shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}

async fn chat(
    server: &str,
    args: &[String],
    cfg: &Config,
    base_level: Level,
    filter: FilterHandle,
) -> ExitCode {
    let timeout = Duration::from_secs(cfg.client.request_timeout_secs);
    let session = match Session::connect(server, args, timeout).await {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Failed to connect to server {server}: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut client = ChatClient::new(session, cfg.client.display_limit).with_debug_hook(
        move |enabled| {
            let level = if enabled {
                debug_level(base_level)
            } else {
                base_level
            };
            if let Err(e) = filter.reload(build_filter(level)) {
                warn!(error = %e, "Failed to change log level");
            }
        },
    );

    let outcome = match client.refresh().await {
        Err(e) if e.is_fatal() => Err(e),
        refreshed => {
            if let Err(e) = refreshed {
                warn!(error = %e, "Initial capability refresh failed");
            }
            let mut stdout = std::io::stdout();
            match client.print_banner(&mut stdout) {
                Err(e) => Err(e.into()),
                Ok(()) => {
                    let input = tokio::io::BufReader::new(tokio::io::stdin());
                    tokio::select! {
                        result = client.run(input, &mut stdout) => result,
                        _ = tokio::signal::ctrl_c() => {
                            info!("Interrupted, closing session");
                            Ok(())
                        }
                    }
                }
            }
        }
    };

    client.close().await;

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }

    #[test]
    fn parses_chat_with_server_arguments() {
        let args = Args::try_parse_from([
            "document-search-mcp",
            "-v",
            "chat",
            "document-search-mcp",
            "serve",
            "--profile",
            "echo",
        ])
        .unwrap();

        assert_eq!(args.verbose, 1);
        let Mode::Chat { server, args, .. } = args.mode else {
            panic!("Expected chat mode");
        };
        assert_eq!(server, "document-search-mcp");
        assert_eq!(args, vec!["serve", "--profile", "echo"]);
    }

    #[test]
    fn serve_defaults_to_documents() {
        let args = Args::try_parse_from(["document-search-mcp", "serve"]).unwrap();
        assert!(matches!(
            args.mode,
            Mode::Serve {
                profile: Profile::Documents,
                config: None
            }
        ));
    }

    #[test]
    fn log_level_precedence() {
        assert_eq!(get_log_level(0, true, "trace"), Level::ERROR);
        assert_eq!(get_log_level(0, false, "info"), Level::INFO);
        assert_eq!(get_log_level(0, false, "bogus"), Level::WARN);
        assert_eq!(get_log_level(2, false, "error"), Level::DEBUG);
    }

    #[test]
    fn debug_level_never_lowers_verbosity() {
        assert_eq!(debug_level(Level::WARN), Level::DEBUG);
        assert_eq!(debug_level(Level::TRACE), Level::TRACE);
    }
}
