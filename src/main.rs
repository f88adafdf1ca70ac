mod cli;
mod config;
mod error;
mod journal;
mod mapping;
mod migrate;
mod model;
mod providers;

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    match args.first().map(String::as_str) {
        Some("migrate") => cli::handle_migrate(&args[1..]).await,
        Some("log") => cli::handle_log(&args[1..]),
        Some("help") | Some("--help") | Some("-h") | None => {
            cli::print_help();
            Ok(())
        }
        Some(other) => {
            cli::print_help();
            anyhow::bail!("Unknown command: {other}");
        }
    }
}
