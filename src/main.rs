use anyhow::Result;
use clap::Parser;
use tailor_pack_cli::cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before parsing so env-backed arguments see it.
    dotenvy::dotenv().ok();
    let args = cli::Cli::parse();
    let is_silent = args.silent;
    let is_non_tui = args.silent || args.json || args.text || args.health;

    match cli::run(args).await {
        Ok(()) => {
            // Explicitly exit with code 0 on success, especially for non-TUI modes
            if is_non_tui {
                std::process::exit(0);
            }
            Ok(())
        }
        Err(e) => {
            if is_silent {
                println!("{}", e);
                std::process::exit(1);
            } else {
                Err(e)
            }
        }
    }
}
