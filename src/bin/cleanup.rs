//! graphseed-cleanup - maintenance for a generated or live database

use clap::Parser;
use tracing::{error, info, warn};

use graphseed::{
    cleanup::{Cleaner, CleanupOp},
    config::CleanupArgs,
    logging, with_deadline, MongoStore, SeedError,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let args = CleanupArgs::parse();

    logging::init(&args.store.log_level, args.store.verbose, args.store.log_json);

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    let dry_run = args.effective_dry_run();

    info!("======================================");
    info!("  graphseed-cleanup");
    info!("======================================");
    info!("MongoDB: {} / {}", args.store.mongodb_uri, args.store.mongodb_db);
    info!("Operation: {}", args.operation);
    info!("Mode: {}", if dry_run { "DRY RUN" } else { "APPLY" });
    info!("======================================");

    if args.operation.is_destructive() && dry_run && !args.dry_run {
        warn!("Destructive operation without --force; running as a dry run");
    }

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

    let mut cleaner = Cleaner::new(&store, args.ages(), dry_run);
    let outcome = with_deadline(args.store.timeout(), async {
        cleaner.run(args.operation).await?;
        if args.operation == CleanupOp::All {
            cleaner.run(CleanupOp::Stats).await?;
        }
        Ok::<_, SeedError>(())
    })
    .await;

    if let Err(e) = outcome {
        error!("Cleanup failed: {}", e);
        std::process::exit(1);
    }

    println!("{}", cleaner.into_stats());
    Ok(())
}
