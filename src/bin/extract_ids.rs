use clap::Parser;
use roster_etl::utils::{logger, validation::Validate};
use roster_etl::{EtlEngine, ExtractArgs, IdExtractor, LocalStorage};

#[tokio::main]
async fn main() {
    let args = ExtractArgs::parse();
    logger::init_logger(env!("CARGO_CRATE_NAME"), args.verbose, args.log_json);

    if let Err(e) = args.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(e.exit_code());
    }

    tracing::info!("📁 Extracting '{}' from {}", args.column, args.input);

    let extractor = IdExtractor::new(LocalStorage::current_dir(), &args.input, &args.output)
        .with_key_path(&args.key_path)
        .with_column(&args.column);

    if let Err(e) = EtlEngine::new(extractor).run().await {
        tracing::error!("❌ Extraction failed: {} (Category: {:?})", e, e.category());
        eprintln!("❌ Error: {}", e.user_friendly_message());
        eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
        std::process::exit(e.exit_code().max(1));
    }
}
