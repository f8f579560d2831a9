//! graphseed - synthetic social graph generator

use clap::Parser;
use tracing::{error, info, warn};

use graphseed::{
    config::GenerateArgs,
    logging::{self, SummaryWriter},
    seed::{clean_existing, Scheduler},
    with_deadline, MongoStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = GenerateArgs::parse();

    logging::init(&args.store.log_level, args.store.verbose, args.store.log_json);

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    let config = args.seed_config();

    info!("======================================");
    info!("  graphseed - social graph generator");
    info!("======================================");
    info!("MongoDB: {} / {}", args.store.mongodb_uri, args.store.mongodb_db);
    info!("Accounts: {}", config.accounts);
    info!("Mode: {}", config.mode);
    info!("Features: {}", if args.minimal { "minimal" } else { "full" });
    if let Some(seed) = config.seed {
        info!("Seed: {}", seed);
    }
    info!("Batch size: {}", config.batch_size);
    info!("======================================");

    let store = match MongoStore::connect(&args.store.mongodb_uri, &args.store.mongodb_db).await {
        Ok(store) => {
            info!("MongoDB connected successfully");
            store
        }
        Err(e) => {
            error!("MongoDB connection failed: {}", e);
            std::process::exit(1);
        }
    };

    let outcome = with_deadline(args.store.timeout(), async {
        if args.clean {
            let removed = clean_existing(&store).await;
            info!(removed, "Existing generated data removed");
        }
        Scheduler::new(&store, config).run().await
    })
    .await;

    let report = match outcome {
        Ok(report) => report,
        Err(e) => {
            error!("Generation failed: {}", e);
            error!("The database may hold a partial graph; rerun with --clean");
            std::process::exit(1);
        }
    };

    println!("{}", report);

    if let Some(path) = &args.summary_file {
        if let Err(e) = SummaryWriter::new(path).append("graphseed", &report.run_id, &report) {
            warn!("Failed to write run summary: {}", e);
        }
    }

    info!("Generation complete");
    Ok(())
}
