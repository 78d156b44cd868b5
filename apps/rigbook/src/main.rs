//! # rigbook - Hardware Catalog CLI
//!
//! The main binary for the rigbook catalog engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────┐
//! │          apps/rigbook (THE BINARY)         │
//! │                                            │
//! │  ┌───────────┐  ┌──────────┐  ┌─────────┐  │
//! │  │   CLI     │  │  config  │  │  JSON   │  │
//! │  │  (clap)   │  │  (toml)  │  │ (serde) │  │
//! │  └─────┬─────┘  └────┬─────┘  └────┬────┘  │
//! │        └─────────────┼─────────────┘       │
//! │                      ▼                     │
//! │              ┌──────────────┐              │
//! │              │ rigbook-core │              │
//! │              │ (THE LOGIC)  │              │
//! │              └──────────────┘              │
//! └────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! rigbook init
//! rigbook create -k CPU -a '{"Name": "Ryzen 7 7700X", "Manufacturer": "AMD", ...}'
//! rigbook query -s '{"target": "Component", "filters": {"CoreTotal": {"start": 8}}}'
//! rigbook part expand -p component#1
//! ```

use clap::Parser;
use rigbook::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    // RIGBOOK_LOG_FORMAT=json switches to machine-parseable logs on stderr.
    let log_format = std::env::var("RIGBOOK_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "rigbook=info,rigbook_core=info".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let cli = cli::Cli::parse();

    // Banners would corrupt JSON output
    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

fn print_banner() {
    println!(
        r#"
  ┬─┐┬┌─┐┌┐ ┌─┐┌─┐┬┌─
  ├┬┘││ ┬├┴┐│ ││ │├┴┐
  ┴└─┴└─┘└─┘└─┘└─┘┴ ┴

  Hardware Catalog v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
