use anyhow::Context;
use clap::Parser;
use docindex::search::engine::DEFAULT_LINE_COUNTER;
use docindex::server::protocol::DEFAULT_SERVER_PIPE;
use docindex::server::{Broker, ServerConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Document index server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Folder holding the indexed documents and the index file
    document_folder: PathBuf,

    /// Number of documents kept in the lookup cache
    cache_size: usize,

    /// Shared FIFO the server reads requests from
    #[arg(long, env = "DOCINDEX_SERVER_PIPE", default_value = DEFAULT_SERVER_PIPE)]
    server_pipe: PathBuf,

    /// Grep-compatible program used to count matching lines
    #[arg(long = "grep", env = "DOCINDEX_GREP", default_value = DEFAULT_LINE_COUNTER)]
    line_counter: String,

    /// Log level used when RUST_LOG is not set
    #[arg(long, env = "DOCINDEX_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ServerConfig {
        document_root: args.document_folder,
        cache_capacity: args.cache_size,
        server_pipe: args.server_pipe,
        line_counter: args.line_counter,
    };

    let broker = Broker::bind(config.clone()).with_context(|| {
        format!(
            "failed to start server for {}",
            config.document_root.display()
        )
    })?;

    broker.run().await?;
    Ok(())
}
