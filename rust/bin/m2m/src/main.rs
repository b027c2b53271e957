//! `m2m`: terminal client for the MemeToMoney feed.
//!
//! Signs in against the user service, pages through feeds, and likes or
//! shares content with the same optimistic engine a UI would use.

mod commands;
mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use m2m_client::{ContentType, FeedMode, RegisterRequest, SearchQuery};

#[derive(Parser, Debug)]
#[command(name = "m2m", about = "MemeToMoney CLI client")]
struct Cli {
    /// Path to client config file (default: ~/.m2m/config.toml).
    #[arg(long = "config", global = true)]
    config: Option<PathBuf>,

    #[arg(long = "output", short = 'o', global = true, value_enum, default_value = "table")]
    output: Output,

    #[command(flatten)]
    service: config::ServiceArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Output {
    Table,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sign in and store the session token.
    Login {
        /// Email or mobile number.
        #[arg(long)]
        user: Option<String>,
        /// Password (prompted when omitted).
        #[arg(long)]
        password: Option<String>,
    },

    /// Forget the stored session token.
    Logout,

    /// Create an account.
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        mobile: u64,
        /// Password (prompted when omitted).
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        address: Option<String>,
    },

    /// Show a user's profile.
    Profile { user_id: String },

    Follow { user_id: String },

    Unfollow { user_id: String },

    /// Show the signed-in user.
    Whoami,

    /// Print feed pages.
    Feed {
        /// for-you, trending or fresh.
        #[arg(long, default_value = "for-you")]
        mode: FeedMode,
        /// Pages to load.
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },

    /// Like or unlike a content item.
    Like {
        id: String,
        #[arg(long, default_value = "for-you")]
        mode: FeedMode,
        /// Pages to search for the item.
        #[arg(long, default_value_t = 5)]
        pages: u32,
    },

    /// Share a content item.
    Share {
        id: String,
        #[arg(long, default_value = "for-you")]
        mode: FeedMode,
        #[arg(long, default_value_t = 5)]
        pages: u32,
    },

    /// Short videos trending right now.
    Shorts,

    /// Search content by text, category or hashtag.
    Search {
        query: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        hashtag: Option<String>,
        /// Only short videos.
        #[arg(long)]
        shorts: bool,
        #[arg(long, default_value_t = 0)]
        page: u32,
    },

    /// A user's posts.
    Posts {
        user_id: String,
        /// Posts the user liked instead.
        #[arg(long)]
        liked: bool,
        #[arg(long, default_value_t = 0)]
        page: u32,
    },

    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(config::default_path);
    let ctx = commands::Context::load(&config_path, &cli.service, cli.output)?;

    match cli.command {
        Commands::Login { user, password } => {
            let user = match user {
                Some(u) => u,
                None => commands::auth::prompt("Email or mobile: ")?,
            };
            let password = match password {
                Some(p) => p,
                None => rpassword::prompt_password("Password: ")?,
            };
            if user.is_empty() || password.is_empty() {
                anyhow::bail!("Email/mobile and password are required.");
            }
            commands::auth::login(&ctx, &user, &password).await?;
        }
        Commands::Logout => commands::auth::logout(&ctx)?,
        Commands::Register { name, email, mobile, password, address } => {
            let password = match password {
                Some(p) => p,
                None => rpassword::prompt_password("Password: ")?,
            };
            if password.is_empty() {
                anyhow::bail!("Password is required.");
            }
            let form = RegisterRequest { name, email, mobile_number: mobile, password, address };
            commands::users::register(&ctx, &form).await?;
        }
        Commands::Profile { user_id } => commands::users::profile(&ctx, &user_id).await?,
        Commands::Follow { user_id } => commands::users::follow(&ctx, &user_id, true).await?,
        Commands::Unfollow { user_id } => commands::users::follow(&ctx, &user_id, false).await?,
        Commands::Whoami => commands::auth::whoami(&ctx).await?,
        Commands::Feed { mode, pages } => commands::feed::list(&ctx, mode, pages).await?,
        Commands::Like { id, mode, pages } => commands::feed::like(&ctx, &id, mode, pages).await?,
        Commands::Share { id, mode, pages } => commands::feed::share(&ctx, &id, mode, pages).await?,
        Commands::Shorts => commands::feed::shorts(&ctx).await?,
        Commands::Search { query, category, hashtag, shorts, page } => {
            let query = SearchQuery {
                q: query,
                category,
                kind: shorts.then_some(ContentType::ShortVideo),
                hashtag,
            };
            commands::feed::search(&ctx, &query, page).await?;
        }
        Commands::Posts { user_id, liked, page } => {
            commands::feed::posts(&ctx, &user_id, liked, page).await?
        }
        Commands::Version => println!("m2m cli v{}", env!("CARGO_PKG_VERSION")),
    }

    Ok(())
}
