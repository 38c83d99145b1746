//! Vault CLI - password-protected encrypted storage for personal notes
//!
//! This is the command-line interface for Vault. It drives the core
//! key-management library: initialize a vault, check its status, encrypt
//! and decrypt payloads, and rotate keys.

use std::io::{self, IsTerminal, Read};

use clap::{Parser, Subcommand};
use dialoguer::Password;
use tracing_subscriber::EnvFilter;
use vault_core::{KeyManager, VERSION};

/// Vault - password-protected encrypted storage for personal notes
#[derive(Parser)]
#[command(name = "vault")]
#[command(author, version = VERSION, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Data directory holding the keys/ subdirectory
    #[arg(short, long, global = true, env = "VAULT_DIR", default_value = "./data")]
    data_dir: String,

    #[command(subcommand)]
    command: Option<Commands>,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new vault with a master password
    Init,

    /// Show the vault's security status
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Encrypt a JSON value and print the envelope
    Encrypt {
        /// JSON payload (overrides stdin)
        #[arg(long)]
        data: Option<String>,
    },

    /// Decrypt an envelope and print the JSON value
    Decrypt {
        /// Envelope text (overrides stdin)
        #[arg(value_name = "ENVELOPE")]
        envelope: Option<String>,
    },

    /// Rotate the vault's key material, backing up the current keystore
    Rotate {
        /// Prompt for a new master password instead of keeping the current one
        #[arg(long)]
        new_password: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let manager = KeyManager::new(&cli.data_dir);

    match cli.command {
        Some(Commands::Init) => {
            if manager.master_key_path().exists() {
                return Err(anyhow::anyhow!(
                    "Vault already initialized at {}",
                    manager.master_key_path().display()
                ));
            }

            let password = prompt_new_password("Enter master password")?;
            if !manager.setup_first_time(&password) {
                return Err(anyhow::anyhow!("Setup failed"));
            }

            if !cli.quiet {
                println!("Initialized new vault in {}", cli.data_dir);
                println!("Key rotation recommended in 30 days");
            }
        }
        Some(Commands::Status { json }) => {
            let status = manager.get_security_status();
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                println!("Setup complete: {}", status.setup_complete);
                println!("Authenticated: {}", status.authenticated);
                println!("Auth count: {}", status.auth_count);
                match status.last_auth {
                    Some(at) => println!("Last auth: {}", at),
                    None => println!("Last auth: never"),
                }
                if let Some(due) = status.key_rotation_due {
                    println!("Rotation due: {}", due);
                }
                match status.days_until_rotation {
                    Some(days) if days < 0 => {
                        println!("Rotation overdue by {} day(s)", -days);
                    }
                    Some(days) => println!("Days until rotation: {}", days),
                    None => {}
                }
            }
        }
        Some(Commands::Encrypt { data }) => {
            authenticate_or_bail(&manager)?;

            let payload = read_payload(data)?;
            let value: serde_json::Value = serde_json::from_str(&payload)
                .map_err(|e| anyhow::anyhow!("Payload is not valid JSON: {}", e))?;

            let envelope = manager.encrypt_data(&value)?;
            println!("{}", envelope);
        }
        Some(Commands::Decrypt { envelope }) => {
            authenticate_or_bail(&manager)?;

            let envelope = read_payload(envelope)?;
            let value = manager.decrypt_data(&envelope)?;
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        Some(Commands::Rotate { new_password }) => {
            let current = prompt_password("Current master password")?;
            let next = if new_password {
                Some(prompt_new_password("New master password")?)
            } else {
                None
            };

            if !manager.rotate_keys(&current, next.as_deref()) {
                return Err(anyhow::anyhow!("Key rotation failed"));
            }
            if !cli.quiet {
                println!("Key rotation complete; previous keystore backed up");
            }
        }
        None => {
            println!("Vault v{}", VERSION);
            println!("\nRun `vault --help` for usage information.");
        }
    }

    Ok(())
}

fn authenticate_or_bail(manager: &KeyManager) -> anyhow::Result<()> {
    let password = prompt_password("Master password")?;
    if !manager.authenticate(&password) {
        return Err(anyhow::anyhow!("Incorrect password"));
    }
    Ok(())
}

fn prompt_password(prompt: &str) -> anyhow::Result<String> {
    if let Ok(value) = std::env::var("VAULT_PASSWORD") {
        if !value.trim().is_empty() {
            return Ok(value);
        }
    }
    Password::new()
        .with_prompt(prompt)
        .interact()
        .map_err(|e| anyhow::anyhow!("Failed to read password: {}", e))
}

fn prompt_new_password(prompt: &str) -> anyhow::Result<String> {
    if let Ok(value) = std::env::var("VAULT_PASSWORD") {
        if !value.trim().is_empty() {
            return Ok(value);
        }
    }
    Password::new()
        .with_prompt(prompt)
        .with_confirmation("Confirm password", "Passwords do not match")
        .interact()
        .map_err(|e| anyhow::anyhow!("Failed to read password: {}", e))
}

fn read_payload(arg: Option<String>) -> anyhow::Result<String> {
    if let Some(value) = arg {
        if value.trim().is_empty() {
            return Err(anyhow::anyhow!("Payload cannot be empty"));
        }
        return Ok(value);
    }

    if !io::stdin().is_terminal() {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|e| anyhow::anyhow!("Failed to read stdin: {}", e))?;
        let trimmed = buffer.trim().to_string();
        if trimmed.is_empty() {
            return Err(anyhow::anyhow!("No input provided on stdin"));
        }
        return Ok(trimmed);
    }

    Err(anyhow::anyhow!(
        "No payload provided. Pass it as an argument or pipe it via stdin."
    ))
}
