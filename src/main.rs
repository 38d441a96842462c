use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = webconsole::cli::Cli::parse();
    if let Err(e) = webconsole::cmd::dispatch(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
