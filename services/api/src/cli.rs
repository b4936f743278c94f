use crate::demo::{run_classify, run_demo, run_search, ClassifyArgs, DemoArgs, SearchArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use listing_assistant::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Listing Assistant",
    about = "Run the listings chat assistant or try its request shaping from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Print the category, token cost and matched rule for a question
    Classify(ClassifyArgs),
    /// Filter the catalog with a free-text question
    Search(SearchArgs),
    /// Play a scripted conversation against a fresh token account
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Classify(args) => run_classify(args),
        Command::Search(args) => run_search(args),
        Command::Demo(args) => run_demo(args).await,
    }
}
