use clap::{Parser, Subcommand};
use colored::Colorize;
use mailout::cmd::{self, GlobalArgs};
use mailout::error;

#[derive(Parser, Debug)]
#[command(
    name = "mailout",
    about = "Send a newsletter through Microsoft Graph",
    version,
    long_about = "Send an HTML newsletter from a Microsoft 365 mailbox\n\n\
                  Recipients come from a local file, a OneDrive file or a Firestore document.\n\
                  Also generates sitemap.xml for a static site."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    global: GlobalArgs,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Acquire and cache an app-only access token
    Login(cmd::login::LoginArgs),

    /// Remove the cached token
    Logout(cmd::login::LogoutArgs),

    /// Render the template and send the newsletter
    Send(cmd::send::SendArgs),

    /// Fetch and print the mailing list
    Recipients(cmd::recipients::RecipientsArgs),

    /// Render the newsletter template without sending
    Render(cmd::render::RenderArgs),

    /// Check app permissions, the sender mailbox and licences
    #[command(subcommand)]
    Diagnose(DiagnoseCommands),

    /// Manage config.toml
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate sitemap.xml for a static site
    Sitemap(cmd::sitemap::SitemapArgs),
}

#[derive(Subcommand, Debug)]
enum DiagnoseCommands {
    /// Request a fresh token and show its details
    Token,

    /// Look up the sender (or another) mailbox
    User(cmd::diagnose::UserArgs),

    /// List tenant users and candidate senders
    Users(cmd::diagnose::UsersArgs),

    /// Show subscribed licences and Exchange availability
    Licenses,

    /// Print the troubleshooting checklist
    Guide,

    /// Run token, user and guide in order
    All,
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Write a starter config.toml
    Init(cmd::config::InitArgs),

    /// Print the effective settings with secrets masked
    Show,

    /// Store the sender mailbox in config.toml
    SetSender(cmd::config::SetSenderArgs),

    /// Print config file locations
    Path,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run() -> error::Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("mailout=debug")
            .init();
    }

    let global = &cli.global;

    match cli.command {
        Commands::Login(args) => cmd::login::login(args, global).await?,
        Commands::Logout(args) => cmd::login::logout(args, global).await?,
        Commands::Send(args) => cmd::send::send(args, global).await?,
        Commands::Recipients(args) => cmd::recipients::list(args, global).await?,
        Commands::Render(args) => cmd::render::render(args, global).await?,
        Commands::Diagnose(diagnose_cmd) => match diagnose_cmd {
            DiagnoseCommands::Token => cmd::diagnose::token(global).await?,
            DiagnoseCommands::User(args) => cmd::diagnose::user(args, global).await?,
            DiagnoseCommands::Users(args) => cmd::diagnose::users(args, global).await?,
            DiagnoseCommands::Licenses => cmd::diagnose::licenses(global).await?,
            DiagnoseCommands::Guide => cmd::diagnose::guide(),
            DiagnoseCommands::All => cmd::diagnose::all(global).await?,
        },
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::Init(args) => cmd::config::init(args, global).await?,
            ConfigCommands::Show => cmd::config::show(global).await?,
            ConfigCommands::SetSender(args) => cmd::config::set_sender(args, global).await?,
            ConfigCommands::Path => cmd::config::path(global).await?,
        },
        Commands::Sitemap(args) => cmd::sitemap::generate(args, global).await?,
    }

    Ok(())
}
