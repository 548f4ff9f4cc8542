//! Abacus CLI binary entry point.

use clap::Parser;

use abacus::cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Chat(args) => {
            abacus::cli::init_logging(args.verbose);
            abacus::cli::run_chat(args).await
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e.user_message());
        std::process::exit(1);
    }
}
