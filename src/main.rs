use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
mod auth;
use credcrypt::{
    CryptoManager, IvEncoding, KeyfileConfig, PasswordVerificationStore, default_verification_path,
};
use std::path::PathBuf;

#[derive(Debug, clap::Args)]
struct EnvelopeArgs {
    /// PBKDF2 iteration count for new tokens (default: 1000000)
    #[arg(long = "work-factor", global = true, env = "CREDCRYPT_WORK_FACTOR")]
    work_factor: Option<u32>,

    /// Always write the IV as 16 bytes instead of its minimal big-endian form
    #[arg(long = "fixed-iv", global = true, env = "CREDCRYPT_FIXED_IV")]
    fixed_iv: bool,
}

impl EnvelopeArgs {
    fn to_config(&self) -> Result<KeyfileConfig> {
        let config = match self.work_factor {
            Some(iterations) => KeyfileConfig::with_work_factor(iterations)
                .context("invalid --work-factor")?,
            None => KeyfileConfig::default(),
        };

        let encoding = if self.fixed_iv {
            IvEncoding::FixedWidth
        } else {
            IvEncoding::Minimal
        };

        Ok(config.with_iv_encoding(encoding))
    }
}

fn resolve_verification(path: Option<PathBuf>) -> Result<PasswordVerificationStore> {
    match path {
        Some(p) => Ok(PasswordVerificationStore::new(p)),
        None => Ok(PasswordVerificationStore::new(default_verification_path()?)),
    }
}

#[derive(Debug, Parser)]
#[command(name = "credcrypt")]
#[command(
    version,
    about = "Encrypt credentials into keyfile v3 tokens and check passwords against a verification file."
)]
struct Cli {
    /// Path to the password verification file
    #[arg(long, global = true, value_name = "PATH", env = "CREDCRYPT_VERIFICATION_FILE")]
    file: Option<PathBuf>,

    #[command(flatten)]
    envelope: EnvelopeArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Encrypts a secret and prints the hex token
    #[command(arg_required_else_help = true)]
    Encrypt { value: String },

    /// Decrypts a hex token and prints the secret
    #[command(arg_required_else_help = true)]
    Decrypt { token: String },

    /// Shows the public parameters of a token (no password needed)
    #[command(arg_required_else_help = true)]
    Inspect { token: String },

    /// Writes a password verification file
    InitVerification,

    /// Checks the password against the verification file
    CheckPassword,
}

fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: Cli) -> Result<()> {
    let config = args.envelope.to_config()?;

    match args.command {
        Commands::Encrypt { value } => {
            let password = auth::read_password()?;
            let manager = CryptoManager::with_config(password.as_str(), config);
            println!("{}", manager.encrypt(&value)?);
        }
        Commands::Decrypt { token } => {
            let password = auth::read_password()?;
            let manager = CryptoManager::with_config(password.as_str(), config);
            println!("{}", manager.decrypt(token.trim())?);
        }
        Commands::Inspect { token } => {
            let keyfile = credcrypt::inspect(token.trim())?;
            println!("{keyfile}");
        }
        Commands::InitVerification => {
            let verification = resolve_verification(args.file)?;
            let password = auth::read_new_password_with_confirmation()?;
            let manager = CryptoManager::with_config(password.as_str(), config);
            verification.store(&manager)?;
            println!(
                "password verification stored at {}",
                verification.path().display()
            );
        }
        Commands::CheckPassword => {
            let verification = resolve_verification(args.file)?;
            let password = auth::read_password()?;
            let manager = CryptoManager::with_config(password.as_str(), config);
            if !verification.validate(&manager) {
                bail!("password verification failed");
            }
            println!("password ok");
        }
    }

    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    init_logging();

    let args = Cli::parse();
    run(args)?;

    Ok(())
}
