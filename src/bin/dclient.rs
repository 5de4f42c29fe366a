use anyhow::Context;
use clap::{Parser, Subcommand};
use docindex::client::Client;
use docindex::server::protocol::DEFAULT_SERVER_PIPE;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Client for the document index server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Shared FIFO the server reads requests from
    #[arg(long, env = "DOCINDEX_SERVER_PIPE", default_value = DEFAULT_SERVER_PIPE)]
    server_pipe: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Index a document (path relative to the server's document folder)
    Add {
        title: String,
        authors: String,
        year: String,
        path: String,
    },
    /// Show the metadata of a document
    Consult { key: u32 },
    /// Remove a document from the index
    Delete { key: u32 },
    /// Count the lines of a document containing a keyword
    Lines { key: u32, keyword: String },
    /// List the documents containing a keyword, using WORKERS parallel workers if > 0
    Search {
        keyword: String,
        #[arg(default_value_t = 0)]
        workers: usize,
    },
    /// Stop the server
    Shutdown,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let client = Client::new(&args.server_pipe);

    let reply = match args.command {
        Command::Add {
            title,
            authors,
            year,
            path,
        } => client.add(&title, &authors, &year, &path).await,
        Command::Consult { key } => client.consult(key).await,
        Command::Delete { key } => client.delete(key).await,
        Command::Lines { key, keyword } => client.count_lines(key, &keyword).await,
        Command::Search { keyword, workers } => client.search(&keyword, workers).await,
        Command::Shutdown => client.shutdown().await,
    }
    .with_context(|| format!("request to {} failed", args.server_pipe.display()))?;

    println!("{}", reply);
    Ok(())
}
