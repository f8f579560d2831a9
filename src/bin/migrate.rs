//! graphseed-migrate - versioned schema migrations

use clap::Parser;
use tracing::{error, info};

use graphseed::{
    config::{MigrateArgs, MigrateCommand},
    logging,
    migrations::{builtin_migrations, create_scaffold, validate, MigrationLedger},
    with_deadline, MongoStore, Result, SeedError,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let args = MigrateArgs::parse();

    logging::init(&args.store.log_level, args.store.verbose, args.store.log_json);

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  graphseed-migrate");
    info!("======================================");
    info!("Command: {:?}", args.command);
    if args.dry_run {
        info!("Mode: DRY RUN");
    }
    if !args.is_offline() {
        info!("MongoDB: {} / {}", args.store.mongodb_uri, args.store.mongodb_db);
    }
    info!("======================================");

    let outcome = if args.is_offline() {
        run_offline(&args).await
    } else {
        run_online(&args).await
    };

    if let Err(e) = outcome {
        error!("Migration command failed: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

async fn run_offline(args: &MigrateArgs) -> Result<()> {
    match args.command {
        MigrateCommand::Create => {
            let name = args.name.as_deref().unwrap_or_default();
            let path = create_scaffold(&args.dir, name, chrono::Utc::now()).await?;
            println!("Created migration: {}", path.display());
            println!("Register it in the migration list to apply it.");
        }
        _ => {
            let report = validate(&builtin_migrations(args.hash_cost()))?;
            println!("{} migrations validated", report.total);
            for id in &report.irreversible {
                println!("  warning: {} has no rollback", id);
            }
        }
    }
    Ok(())
}

async fn run_online(args: &MigrateArgs) -> Result<()> {
    let store = MongoStore::connect(&args.store.mongodb_uri, &args.store.mongodb_db).await?;
    info!("MongoDB connected successfully");

    let ledger = MigrationLedger::new(&store, builtin_migrations(args.hash_cost()))?;

    with_deadline(args.store.timeout(), async {
        match args.command {
            MigrateCommand::Up if args.dry_run => {
                let pending = ledger.pending().await?;
                if pending.is_empty() {
                    println!("Database is up to date");
                }
                for status in pending {
                    println!("Would apply {} ({})", status.id, status.description);
                }
            }
            MigrateCommand::Down if args.dry_run => {
                let target = args.migration.as_deref().unwrap_or_default();
                let migration = ledger.rollback_target(target).await?;
                println!("Would roll back {} ({})", migration.id, migration.description);
            }
            MigrateCommand::Up => {
                let applied = ledger.up().await?;
                if applied.is_empty() {
                    println!("Database is up to date");
                }
                for id in applied {
                    println!("Applied {}", id);
                }
            }
            MigrateCommand::Down => {
                let target = args.migration.as_deref().unwrap_or_default();
                ledger.down(target).await?;
                println!("Rolled back {}", target);
            }
            MigrateCommand::Status => {
                println!("{:<30} {:<10} {}", "migration", "status", "applied at");
                for status in ledger.status().await? {
                    let applied_at = status
                        .applied_at
                        .map(|at| at.to_string())
                        .unwrap_or_else(|| "-".to_string());
                    println!(
                        "{:<30} {:<10} {}",
                        status.id,
                        if status.applied { "applied" } else { "pending" },
                        applied_at
                    );
                }
            }
            MigrateCommand::Reset => {
                let dropped = MigrationLedger::reset(&store).await?;
                println!("Dropped {} collections", dropped);
            }
            MigrateCommand::Create | MigrateCommand::Validate => {}
        }
        Ok::<_, SeedError>(())
    })
    .await
}
