//! tickergate server binary
//!
//! Run with: cargo run --bin tickergate -- serve

#[tokio::main]
async fn main() {
    // Load .env as early as possible for signing secrets and AK/SK pairs
    let _ = dotenvy::dotenv();

    tickergate::init_logging();

    if let Err(e) = tickergate::cli::run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
