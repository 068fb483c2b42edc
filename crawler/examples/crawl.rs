//! Example of crawling the mesh for cohort peers through a local daemon.

use clap::Parser;
use log::LevelFilter;
use mesh_peers_crawler::{
    cohorts, peer_lines, AdminClient, CrawlerBuilder, Endpoint, NodeKey,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// host:port of the daemon's TCP admin endpoint.
    #[arg(short, long, default_value = "localhost:9001")]
    endpoint: String,

    /// Path of a unix admin socket to use instead of TCP.
    #[arg(short, long)]
    socket: Option<PathBuf>,

    /// Maximum confirmed cohort members to find.
    #[arg(short, long, default_value = "16")]
    budget: usize,

    /// Seed keys; defaults to the daemon's neighbors.
    #[arg(long)]
    seed: Vec<String>,

    /// Log level.
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let log_level = match args.log_level.to_lowercase().as_str() {
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    };

    // Configure fern logger
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}] {} - {}",
                record.level(),
                record.target(),
                message
            ))
        })
        .level(log_level)
        .chain(std::io::stderr())
        .apply()
        .unwrap();

    let endpoint = match args.socket {
        Some(path) => Endpoint::Unix(path),
        None => Endpoint::Tcp(args.endpoint),
    };

    log::info!("CRAWLING THE MESH FOR COHORT PEERS");

    let mut client = AdminClient::connect(endpoint).await?;

    let seeds = args
        .seed
        .iter()
        .map(NodeKey::new)
        .collect::<Result<Vec<_>, _>>()?;

    let mut crawler = CrawlerBuilder::new()
        .with_seeds(seeds)
        .with_member_budget(args.budget)
        .build()?;

    let report = crawler.run(&mut client).await?;
    log::info!(
        "Found {} members ({})",
        report.discovered.len(),
        report.termination
    );

    let map = cohorts(&report.discovered, client.local_groups());
    for line in peer_lines(&map) {
        println!("{line}");
    }

    Ok(())
}
