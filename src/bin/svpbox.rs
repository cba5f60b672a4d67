//! svpbox CLI - Password-based encryption and credential risk scanning
//!
//! Command-line interface for encrypting text and files with AES-256-GCM
//! under a PBKDF2-derived key, and for scoring how exposed a set of
//! credentials is.

use clap::{Parser, Subcommand};
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;

use svpbox::breach::BreachChecker;
use svpbox::config::Settings;
use svpbox::file_ops;
use svpbox::ops;
use svpbox::passphrase::{
    self, PassphraseReader, ReaderPassphraseReader, TerminalPassphraseReader,
};
use svpbox::risk::{RiskInput, RiskScorer};
use svpbox::strength;
use svpbox::{ErrorCategory, ErrorKind, Result, SvpError};

#[derive(Parser)]
#[command(name = "svpbox")]
#[command(version)]
#[command(about = "Password-based text and file encryption.", long_about = None)]
struct Cli {
    /// Read password from stdin instead of from terminal
    #[arg(long, global = true)]
    passphrase_stdin: bool,

    /// TOML settings file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// PBKDF2 iterations (must match between encryption and decryption)
    #[arg(long, global = true, value_name = "N")]
    iterations: Option<u32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt text into a base64 envelope
    EncryptText {
        /// File holding the text to encrypt (stdin when neither this nor --text is given)
        #[arg(short, long, value_name = "FILE", conflicts_with = "text")]
        input: Option<PathBuf>,

        /// Text to encrypt
        #[arg(long)]
        text: Option<String>,

        /// Write the envelope here instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Decrypt a base64 envelope back into text
    DecryptText {
        /// File holding the envelope (stdin when neither this nor --text is given)
        #[arg(short, long, value_name = "FILE", conflicts_with = "text")]
        input: Option<PathBuf>,

        /// Envelope to decrypt
        #[arg(long)]
        text: Option<String>,

        /// Write the text here instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Encrypt a file
    #[command(alias = "e")]
    Encrypt {
        /// Path to the file whose contents is to be encrypted
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to write the envelope to (default: <input>.enc)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Decrypt a file
    #[command(alias = "d")]
    Decrypt {
        /// Path to the envelope file
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to write the plaintext to (default: the embedded file name)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Score how exposed a set of credentials is
    Scan {
        #[arg(long)]
        email: String,

        #[arg(long)]
        username: String,

        /// Number of contacts reachable through the account
        #[arg(long, default_value_t = 0)]
        contacts: u64,

        /// Skip the online breach lookup
        #[arg(long)]
        no_breach_check: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e.chain());
        process::exit(1);
    }
}


async fn run(cli: Cli) -> Result<()> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(iterations) = cli.iterations {
        if iterations == 0 {
            return Err(SvpError::with_kind(
                ErrorCategory::User,
                ErrorKind::KeyDerivation,
                "iterations must be greater than zero",
            ));
        }
        settings.kdf.iterations = iterations;
    }
    let iterations = settings.kdf.iterations;
    let min_len = settings.policy.min_password_length;

    match cli.command {
        Commands::EncryptText {
            input,
            text,
            output,
        } => {
            let text = read_text(input.as_deref(), text, cli.passphrase_stdin)?;
            let mut reader = get_passphrase_reader(cli.passphrase_stdin);
            let password = passphrase::read_new_password(&mut *reader, min_len)?;
            let armored = ops::encrypt_text(&text, &password, iterations).await?;
            emit(output.as_deref(), &armored)
        }
        Commands::DecryptText {
            input,
            text,
            output,
        } => {
            let armored = read_text(input.as_deref(), text, cli.passphrase_stdin)?;
            let mut reader = get_passphrase_reader(cli.passphrase_stdin);
            let password = reader.read_passphrase("Password (svpbox): ")?;
            let plain = Zeroizing::new(ops::decrypt_text(&armored, &password, iterations).await?);
            emit(output.as_deref(), &plain)
        }
        Commands::Encrypt { input, output } => {
            let mut reader = get_passphrase_reader(cli.passphrase_stdin);
            let password = passphrase::read_new_password(&mut *reader, min_len)?;
            let written =
                ops::encrypt_file(&input, output.as_deref(), &password, iterations).await?;
            eprintln!("Encrypted to {}", written.display());
            Ok(())
        }
        Commands::Decrypt { input, output } => {
            let mut reader = get_passphrase_reader(cli.passphrase_stdin);
            let password = reader.read_passphrase("Password (svpbox): ")?;
            let written =
                ops::decrypt_file(&input, output.as_deref(), &password, iterations).await?;
            eprintln!("Decrypted to {}", written.display());
            Ok(())
        }
        Commands::Scan {
            email,
            username,
            contacts,
            no_breach_check,
        } => {
            let mut reader = get_passphrase_reader(cli.passphrase_stdin);
            let password = reader.read_passphrase("Password to assess: ")?;

            let scorer = if no_breach_check || !settings.breach.enabled {
                RiskScorer::offline()
            } else {
                RiskScorer::new(BreachChecker::from_settings(&settings.breach)?)
            };
            let input = RiskInput {
                password: &password,
                email: &email,
                username: &username,
                contacts,
            };
            let assessment = ops::assess_risk(&scorer, &input).await;
            let (bits, label) = strength::assess(&password);

            println!("Score: {}/100 ({})", assessment.score(), assessment.category());
            println!("Password strength: {} ({} bits)", label, bits);
            for finding in assessment.findings() {
                println!("- {}", finding);
            }
            for warning in assessment.warnings() {
                println!("Warning: {}", warning);
            }
            Ok(())
        }
    }
}

fn get_passphrase_reader(use_stdin: bool) -> Box<dyn PassphraseReader> {
    if use_stdin {
        Box::new(ReaderPassphraseReader::new(Box::new(io::stdin())))
    } else {
        Box::new(TerminalPassphraseReader)
    }
}

/// Resolve the text argument: `--text`, then `-i FILE`, then stdin.
fn read_text(
    input: Option<&Path>,
    text: Option<String>,
    passphrase_stdin: bool,
) -> Result<Zeroizing<String>> {
    if let Some(text) = text {
        return Ok(Zeroizing::new(text));
    }
    if let Some(path) = input {
        return std::fs::read_to_string(path)
            .map(Zeroizing::new)
            .map_err(|e| {
                SvpError::with_kind_and_source(
                    ErrorCategory::User,
                    ErrorKind::Io,
                    format!("failed to read {}", path.display()),
                    e,
                )
            });
    }
    if passphrase_stdin {
        return Err(SvpError::with_kind(
            ErrorCategory::User,
            ErrorKind::Validation,
            "stdin carries the password; pass the text with -i or --text",
        ));
    }
    if io::stdin().is_terminal() {
        eprintln!("Enter text, then end input with Ctrl-D:");
    }
    let mut buf = Zeroizing::new(String::new());
    io::stdin().read_to_string(&mut buf).map_err(|e| {
        SvpError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::Io,
            "failed to read stdin",
            e,
        )
    })?;
    Ok(buf)
}

fn emit(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) => file_ops::write_file_secure(path, content.as_bytes(), true)
            .map_err(|e| e.with_context(format!("failed to write {}", path.display()))),
        None => {
            println!("{}", content);
            Ok(())
        }
    }
}
