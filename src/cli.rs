use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::auth::account::{self, NewAccount};
use crate::config::Config;
use crate::db::{self, users, DbPool};
use crate::error::{AppError, AppResult};
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage;

#[derive(Parser, Debug)]
#[command(
    name = "confdesk",
    about = "Conference management backend: submissions, reviews and payments",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP server (default command)
    Serve(ServeArgs),
    /// Create a verified account, e.g. the first admin
    CreateUser(CreateUserArgs),
    /// Change the role of an existing account
    SetRole(SetRoleArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Args, Debug)]
struct CreateUserArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    password: String,
    /// admin, reviewer or participant
    #[arg(long, default_value = "admin")]
    role: String,
}

#[derive(Args, Debug)]
struct SetRoleArgs {
    #[arg(long)]
    email: String,
    #[arg(long)]
    role: String,
}

pub async fn run() -> AppResult<()> {
    let cli = Cli::parse();
    let config = Arc::new(Config::from_env()?);

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;

    match cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()))
    {
        Command::Serve(args) => serve(pool, config, args).await,
        Command::CreateUser(args) => create_user(&pool, args).await,
        Command::SetRole(args) => set_role(&pool, args).await,
    }
}

async fn serve(pool: DbPool, config: Arc<Config>, args: ServeArgs) -> AppResult<()> {
    storage::ensure_dirs(&config.storage_folder)?;

    let host = args.host.unwrap_or_else(|| config.host.clone());
    let port = args.port.unwrap_or(config.port);

    let state = Arc::new(AppState::connect(pool, config.clone()).await?);
    let app = build_router(state);

    let addr = format!("{}:{}", host, port);
    tracing::info!("{} listening on http://{}", config.conference_name, addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

async fn create_user(pool: &DbPool, args: CreateUserArgs) -> AppResult<()> {
    let user = account::create_account(
        pool,
        NewAccount {
            name: args.name,
            email: args.email,
            password: args.password,
            role: args.role,
        },
    )
    .await
    .map_err(report)?;
    println!("created {} ({}) with role {}", user.email, user.id, user.role);
    Ok(())
}

async fn set_role(pool: &DbPool, args: SetRoleArgs) -> AppResult<()> {
    let email = args.email.trim().to_lowercase();
    let user = users::find_by_email(pool, &email)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {}", email)))?;
    let user = account::change_role(pool, user.id, &args.role)
        .await
        .map_err(report)?;
    println!("{} is now {}", user.email, user.role);
    Ok(())
}

/// Prints field messages before handing validation failures back.
fn report(err: AppError) -> AppError {
    if let AppError::Validation(errors) = &err {
        for (field, messages) in errors.fields() {
            for message in messages {
                eprintln!("{}: {}", field, message);
            }
        }
    }
    err
}
