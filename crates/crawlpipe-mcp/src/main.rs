use anyhow::Result;
use clap::{Parser, Subcommand};
use crawlpipe::config::{self, CrawlerArgs, RelayArgs};
use crawlpipe::logging;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "crawlpipe")]
#[command(about = "Drive an external crawler from HTTP clients and MCP tool callers", long_about = None)]
struct Cli {
    /// Debug-level logs (stderr). `RUST_LOG` still takes precedence.
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the synchronous HTTP API (`/crawl`, `/scrape`, `/links`, `/health`).
    Serve(ServeCmd),
    /// Run as an MCP stdio server driving the crawler directly.
    #[cfg(feature = "mcp")]
    McpStdio(McpStdioCmd),
    /// Run an MCP server over streamable HTTP (`/mcp`) that relays to a crawler API.
    #[cfg(feature = "mcp")]
    McpHttp(McpHttpCmd),
    /// Print version info.
    Version(VersionCmd),
}

#[derive(clap::Args, Debug)]
struct ServeCmd {
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,
    #[command(flatten)]
    crawler: CrawlerArgs,
}

#[derive(clap::Args, Debug)]
struct McpStdioCmd {
    #[command(flatten)]
    crawler: CrawlerArgs,
}

#[derive(clap::Args, Debug)]
struct McpHttpCmd {
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,
    #[command(flatten)]
    relay: RelayArgs,
}

#[derive(clap::Args, Debug)]
struct VersionCmd {
    /// Output format: json (default) or text.
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

fn main() -> Result<()> {
    // Environment edits happen before any runtime thread exists.
    config::load_env_file();
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cli.command))
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Serve(args) => {
            let crawler = Arc::new(args.crawler.crawler());
            crawlpipe::api::serve(&format!("{}:{}", args.host, args.port), crawler).await?;
        }
        #[cfg(feature = "mcp")]
        Commands::McpStdio(args) => {
            let crawler = args.crawler.crawler();
            if !crawler.is_available() {
                tracing::warn!(
                    crawler = %crawler.executable().display(),
                    "crawler executable not found; tool calls will fail"
                );
            }
            crawlpipe::mcp::serve_stdio(Arc::new(crawler))
                .await
                .map_err(|e| anyhow::anyhow!(e.to_string()))?;
        }
        #[cfg(feature = "mcp")]
        Commands::McpHttp(args) => {
            let relay = args.relay.relay()?;
            tracing::info!(
                api_url = relay.base_url(),
                single_page_timeout_s = relay.single_page_timeout().as_secs(),
                "relaying tool calls"
            );
            crawlpipe::mcp::serve_http(&format!("{}:{}", args.host, args.port), Arc::new(relay))
                .await?;
        }
        Commands::Version(args) => {
            let v = serde_json::json!({
                "name": "crawlpipe",
                "version": env!("CARGO_PKG_VERSION"),
            });
            match args.output.to_ascii_lowercase().as_str() {
                "text" => println!("crawlpipe {}", env!("CARGO_PKG_VERSION")),
                _ => println!("{v}"),
            }
        }
    }

    Ok(())
}
