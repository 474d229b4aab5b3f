//! certvet: Command-line X.509 certificate validation.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use certvet_lib::{
    CrlRevocationChecker, FormatHint, NoRevocationCheck, RevocationCheck, TrustStore,
};

#[derive(Parser)]
#[command(
    name = "certvet",
    about = "Validate X.509 certificates against a trust store",
    long_about = "certvet decodes a certificate, builds a chain to a trusted root,\n\
                  and runs a fixed set of checks (time validity, signature chain,\n\
                  trust anchoring, key strength, hostname, key usage, revocation),\n\
                  reporting every finding rather than stopping at the first.\n\n\
                  Input format (PEM vs DER) is auto-detected unless --pem or --der\n\
                  is specified. Reads from stdin when no file is given.",
    after_help = "EXAMPLES:\n\
                  \n  certvet validate cert.pem\
                  \n  certvet validate --hostname www.example.com cert.pem\
                  \n  certvet validate --ca-file root.pem --untrusted int.pem cert.pem\
                  \n  certvet validate --crl-file revoked.crl.pem --json cert.pem\
                  \n  certvet validate --attime 1741996800 cert.pem\
                  \n  cat cert.pem | certvet validate"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a certificate (exit code 0 = valid, 1 = invalid)
    Validate {
        /// Certificate file (PEM or DER). Reads from stdin if omitted.
        file: Option<PathBuf>,
        /// Force DER input parsing (default: auto-detect)
        #[arg(long)]
        der: bool,
        /// Force PEM input parsing (default: auto-detect)
        #[arg(long)]
        pem: bool,
        /// Hostname to match against the leaf certificate's SAN/CN
        #[arg(long, value_name = "HOSTNAME")]
        hostname: Option<String>,
        /// PEM file with trusted root certificates (default: system store)
        #[arg(long = "ca-file", visible_alias = "CAfile", value_name = "FILE")]
        ca_file: Option<PathBuf>,
        /// PEM file with untrusted intermediate certificates
        #[arg(long, value_name = "FILE")]
        untrusted: Option<PathBuf>,
        /// PEM file containing CRL(s) for revocation checking
        #[arg(long = "crl-file", visible_alias = "CRLfile", value_name = "FILE")]
        crl_file: Option<PathBuf>,
        /// Validate at a specific Unix timestamp instead of current time
        #[arg(long, value_name = "EPOCH")]
        attime: Option<i64>,
        /// Output the report in JSON format
        #[arg(long)]
        json: bool,
    },
}

/// Maximum file size for certificate inputs (10 MiB).
const MAX_INPUT_BYTES: u64 = 10 * 1024 * 1024;

fn read_input(file: Option<&PathBuf>) -> Result<Vec<u8>> {
    match file {
        Some(path) => {
            let meta = std::fs::metadata(path)
                .with_context(|| format!("Failed to stat file: {}", path.display()))?;
            if meta.len() > MAX_INPUT_BYTES {
                anyhow::bail!(
                    "File too large ({} bytes, max {} bytes): {}",
                    meta.len(),
                    MAX_INPUT_BYTES,
                    path.display()
                );
            }
            std::fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))
        }
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .take(MAX_INPUT_BYTES)
                .read_to_end(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn run_validate(
    file: Option<&PathBuf>,
    der: bool,
    pem: bool,
    hostname: Option<&str>,
    ca_file: Option<&PathBuf>,
    untrusted: Option<&PathBuf>,
    crl_file: Option<&PathBuf>,
    attime: Option<i64>,
    json: bool,
) -> Result<bool> {
    let input = read_input(file)?;

    let hint = if der {
        FormatHint::Der
    } else if pem {
        FormatHint::Pem
    } else {
        FormatHint::Auto
    };

    let trust_store = match ca_file {
        Some(path) => TrustStore::from_pem_file(path)
            .with_context(|| format!("Failed to load CA file: {}", path.display()))?,
        None => TrustStore::system().context("Failed to load system trust store")?,
    };

    let intermediates = match untrusted {
        Some(path) => {
            let data = std::fs::read(path)
                .with_context(|| format!("Failed to read file: {}", path.display()))?;
            certvet_lib::decode_pem_bundle(&data)
                .with_context(|| format!("Failed to parse intermediates: {}", path.display()))?
        }
        None => Vec::new(),
    };

    let crl_checker;
    let revocation: &dyn RevocationCheck = match crl_file {
        Some(path) => {
            crl_checker = CrlRevocationChecker::from_pem_file(path)
                .with_context(|| format!("Failed to load CRL file: {}", path.display()))?;
            &crl_checker
        }
        None => &NoRevocationCheck,
    };

    let now = match attime {
        Some(ts) => ts,
        None => std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .context("System clock is before the Unix epoch")?
            .as_secs() as i64,
    };

    let report = certvet_lib::validate(
        &input,
        hint,
        &intermediates,
        &trust_store,
        now,
        hostname,
        revocation,
    )
    .context("Failed to decode certificate")?;

    if json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report);
    }
    Ok(report.valid)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Validate {
            file,
            der,
            pem,
            hostname,
            ca_file,
            untrusted,
            crl_file,
            attime,
            json,
        } => run_validate(
            file.as_ref(),
            *der,
            *pem,
            hostname.as_deref(),
            ca_file.as_ref(),
            untrusted.as_ref(),
            crl_file.as_ref(),
            *attime,
            *json,
        ),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}
