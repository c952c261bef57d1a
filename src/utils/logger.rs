use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LIB_TARGET: &str = "roster_etl";

/// Directives enabling the library and the calling binary's own target.
/// `bin_target` is the binary's crate name, e.g. `env!("CARGO_CRATE_NAME")`.
pub fn default_directives(bin_target: &str, verbose: bool) -> String {
    let level = if verbose { "debug" } else { "info" };
    let mut directives = format!("{}={}", LIB_TARGET, level);
    if bin_target != LIB_TARGET {
        directives.push_str(&format!(",{}={}", bin_target, level));
    }
    if verbose {
        directives.push_str(",info");
    }
    directives
}

fn default_filter(bin_target: &str, verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(bin_target, verbose)))
}

/// Diagnostics go to stderr so stdout stays free for the run summary.
pub fn init_cli_logger(bin_target: &str, verbose: bool) {
    tracing_subscriber::registry()
        .with(default_filter(bin_target, verbose))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

pub fn init_json_logger(bin_target: &str, verbose: bool) {
    tracing_subscriber::registry()
        .with(default_filter(bin_target, verbose))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .json(), // one JSON object per line for scheduled batch runs
        )
        .init();
}

pub fn init_logger(bin_target: &str, verbose: bool, json: bool) {
    if json {
        init_json_logger(bin_target, verbose);
    } else {
        init_cli_logger(bin_target, verbose);
    }
}
