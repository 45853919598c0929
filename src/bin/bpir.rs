//! bpir: Runs the Byzantine-robust PIR protocol end-to-end, in a single process.
//!
//! Encodes a random database once, then repeatedly retrieves the configured record while simulating dishonest servers,
//! checking every decoded record against the original.

use std::error::Error;
use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use rayon::prelude::*;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

use byzantine_pir::{
    client::inject_fault,
    config::Config,
    encoder::{self, RecordDatabase},
};

#[derive(Parser)]
#[command(name = "bpir")]
#[command(about = "Byzantine-robust multi-server PIR simulation")]
#[command(version)]
struct Args {
    /// Path to key=value configuration file
    #[arg(long, default_value = "bpir.conf")]
    config: PathBuf,

    /// Record to retrieve, overrides `I`
    #[arg(long)]
    target_index: Option<usize>,

    /// Number of servers simulated as dishonest, overrides `errorCount`
    #[arg(long)]
    dishonest: Option<usize>,

    /// Number of retrieval rounds, overrides `rounds`
    #[arg(long)]
    rounds: Option<usize>,

    /// Log at debug level
    #[arg(long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = Config::from_file(&args.config)?;
    if let Some(target_index) = args.target_index {
        config.target_index = target_index;
    }
    if let Some(dishonest) = args.dishonest {
        config.dishonest_count = dishonest;
    }
    if let Some(rounds) = args.rounds {
        config.rounds = rounds;
    }
    config.validate()?;

    info!(
        "n = {}, m = {}, l = {}, element size = {} bytes, target = {}, dishonest = {}",
        config.num_servers, config.num_records, config.record_len, config.elem_byte_len, config.target_index, config.dishonest_count
    );

    info!("Preprocessing...");
    let setup_start = Instant::now();

    let db = RecordDatabase::generate(config.record_len, config.num_records, config.elem_byte_len)?;
    let (servers, client) = encoder::setup(&config, &db)?;

    info!("Preprocessing time: {:.2?}", setup_start.elapsed());

    let expected = db.record(config.target_index)?;
    let simulated_dishonest = (0..config.dishonest_count).collect::<Vec<usize>>();
    let mut mismatches = 0usize;

    for round in 0..config.rounds {
        let round_start = Instant::now();

        let query_start = Instant::now();
        let queries = client.query(config.target_index)?;
        info!("[round {}] Query generation time: {:.2?}", round, query_start.elapsed());

        let respond_start = Instant::now();
        let responses = servers
            .par_iter()
            .zip(queries.par_iter())
            .map(|(server, query)| server.respond(query))
            .collect::<Result<Vec<_>, _>>()?;
        info!("[round {}] Server response time: {:.2?}", round, respond_start.elapsed());

        let process_start = Instant::now();
        let mut raw = client.combine_responses(&responses)?;
        inject_fault(&simulated_dishonest, &mut raw)?;
        let retrieval = client.recover_record(config.target_index, &raw)?;
        info!("[round {}] Verification, reconstruction and decoding time: {:.2?}", round, process_start.elapsed());

        info!("[round {}] Dishonest servers: {:?}", round, retrieval.dishonest);
        if retrieval.record == expected {
            info!("[round {}] Decoded record matches original, total time: {:.2?}", round, round_start.elapsed());
        } else {
            mismatches += 1;
            error!("[round {}] Decoded record {:?} differs from original {:?}", round, retrieval.record, expected);
        }
    }

    if mismatches > 0 {
        return Err(format!("{} of {} rounds decoded a wrong record", mismatches, config.rounds).into());
    }

    Ok(())
}
