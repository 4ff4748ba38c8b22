use anyhow::Context;
use campus_cli::{NewAdmin, create_admin};
use campus_config::{DatabaseConfig, EncryptionConfig, PasswordPolicyConfig};
use campus_core::PiiCipher;
use campus_db::{PgPool, init_db_pool, run_migrations};
use clap::{Parser, Subcommand};
use dialoguer::{Input, Password};
use dotenvy::dotenv;

#[derive(Parser)]
#[command(name = "campus-cli")]
#[command(about = "Campus CLI - Administrative tools for the Campus records API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an administrator account
    CreateAdmin {
        /// Full name of the administrator
        #[arg(short = 'n', long)]
        name: Option<String>,

        /// Email address
        #[arg(short = 'e', long)]
        email: Option<String>,

        /// Password (will be prompted securely if not provided)
        #[arg(short = 'p', long)]
        password: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::CreateAdmin {
            name,
            email,
            password,
        } => handle_create_admin(name, email, password).await,
    };

    if let Err(e) = result {
        eprintln!("\n❌ {e:#}");
        std::process::exit(1);
    }
}

async fn connect() -> anyhow::Result<PgPool> {
    let config = DatabaseConfig::from_env().context("DATABASE_URL must be set")?;
    let pool = init_db_pool(&config)
        .await
        .context("Failed to connect to database")?;
    run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    Ok(pool)
}

async fn handle_create_admin(
    name: Option<String>,
    email: Option<String>,
    password: Option<String>,
) -> anyhow::Result<()> {
    let name = match name {
        Some(name) => name,
        None => Input::new()
            .with_prompt("Full name")
            .interact_text()
            .context("Failed to read name")?,
    };

    let email = match email {
        Some(email) => email,
        None => Input::new()
            .with_prompt("Email address")
            .interact_text()
            .context("Failed to read email")?,
    };

    let password = match password {
        Some(password) => password,
        None => Password::new()
            .with_prompt("Password")
            .with_confirmation("Confirm password", "Passwords don't match")
            .interact()
            .context("Failed to read password")?,
    };

    let pool = connect().await?;
    let cipher = PiiCipher::from_secret(&EncryptionConfig::from_env().secret);
    let policy = PasswordPolicyConfig::from_env();

    let user_id = create_admin(
        &pool,
        &cipher,
        &policy,
        NewAdmin {
            name: &name,
            email: &email,
            password: &password,
        },
    )
    .await
    .context("Error creating administrator")?;

    println!("\n✅ Administrator created successfully!");
    println!("   ID: {user_id}");
    println!("   Email: {}", email.trim());
    println!("   Name: {}", name.trim());

    Ok(())
}
