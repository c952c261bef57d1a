use clap::Parser;
use roster_etl::app::run_enrichment;
use roster_etl::utils::logger;
use roster_etl::{EnrichArgs, EtlError};

async fn run(args: &EnrichArgs) -> Result<String, EtlError> {
    let settings = args.resolve()?;
    if args.verbose {
        tracing::debug!("Resolved settings: {:?}", settings);
    }
    let credentials = args.credentials()?;

    run_enrichment(&settings, &credentials, args.firestore_token(), args.monitor).await
}

#[tokio::main]
async fn main() {
    // .env must be loaded before clap reads env-backed flags
    dotenvy::dotenv().ok();
    let args = EnrichArgs::parse();

    logger::init_logger(env!("CARGO_CRATE_NAME"), args.verbose, args.log_json);
    tracing::info!("Starting roster-etl");

    if args.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    match run(&args).await {
        Ok(output_path) => {
            tracing::info!("✅ Enrichment completed successfully!");
            println!("✅ Enrichment completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ Enrichment failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

            let exit_code = e.exit_code();
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }
}
