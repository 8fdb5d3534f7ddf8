use clap::Parser;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let cli = strata_cli::Cli::parse();
    strata_cli::logging::init(cli.log_format);

    if let Err(err) = strata_cli::run(cli).await {
        strata_cli::error_view::print(&err);
        std::process::exit(err.exit_code());
    }
}
