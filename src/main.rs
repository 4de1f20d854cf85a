use clap::{
    CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};

use flavormatch::{cli, config, error};

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  author=env!("CARGO_PKG_AUTHORS"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP backend
    Serve(ServeOptions),

    /// Search recipes
    Search(SearchOptions),

    /// Show the music genre for a cuisine
    Genre(GenreOptions),

    /// Find a recipe and matching tracks
    Pair(PairOptions),

    /// Log in with Spotify through the running server
    Login,

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct ServeOptions {
    /// Address to bind, overrides SERVER_ADDRESS
    #[clap(long)]
    pub addr: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct SearchOptions {
    /// Recipe title to search for; empty lists popular recipes
    #[clap(default_value = "")]
    pub query: String,

    /// Only recipes of this cuisine
    #[clap(long)]
    pub cuisine: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct GenreOptions {
    pub cuisine: String,
}

#[derive(Parser, Debug, Clone)]
pub struct PairOptions {
    pub query: String,

    /// Number of tracks to show
    #[clap(long, default_value_t = 10)]
    pub limit: usize,
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

#[tokio::main]
async fn main() {
    if let Err(e) = config::load_env().await {
        error!("Cannot load environment. Err: {}", e);
    }

    let cli = Cli::parse();

    match cli.command {
        Command::Serve(opt) => cli::serve(opt.addr).await,
        Command::Search(opt) => cli::search(opt.query, opt.cuisine).await,
        Command::Genre(opt) => cli::genre(opt.cuisine),
        Command::Pair(opt) => cli::pair(opt.query, opt.limit).await,
        Command::Login => cli::login(),
        Command::Completions(opt) => {
            let mut cmd = Cli::command_for_update();
            let name = cmd.get_name().to_string();
            generate(opt.shell, &mut cmd, name, &mut std::io::stdout())
        }
    }
}
