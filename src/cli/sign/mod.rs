//! Sign command - signs a request body and prints the authentication headers

use std::io::Read;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, ValueEnum};
use serde_json::Value;

use crate::cli::nonce::parse_nonce_bytes;
use crate::domain::{OsRandom, SignedRequestEnvelope};
use crate::infrastructure::auth::{NonceGenerator, RequestSigner, MIN_NONCE_BYTES};

/// Arguments for the sign command
#[derive(Args, Clone)]
pub struct SignArgs {
    #[arg(long)]
    pub merchant_id: String,

    #[arg(long)]
    pub key_id: String,

    /// Signing secret, exactly as issued
    #[arg(long)]
    pub secret: String,

    /// Body to sign; read from stdin when absent
    #[arg(long)]
    pub body: Option<String>,

    /// Parse the body as JSON and sign its canonical form
    #[arg(long)]
    pub json: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Headers)]
    pub output: OutputFormat,

    /// Random bytes in the generated nonce
    #[arg(long, default_value_t = MIN_NONCE_BYTES, value_parser = parse_nonce_bytes)]
    pub nonce_bytes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// `Name: value` lines followed by the signed body
    Headers,
    /// The full envelope as JSON
    Json,
}

/// Run the sign command
pub fn run(args: SignArgs) -> anyhow::Result<()> {
    let body = match args.body.clone() {
        Some(body) => body,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read body from stdin")?;
            buf
        }
    };

    let envelope = sign(&args, &body)?;
    println!("{}", render(&envelope, args.output)?);

    Ok(())
}

fn sign(args: &SignArgs, body: &str) -> anyhow::Result<SignedRequestEnvelope> {
    let signer = RequestSigner::new(
        args.merchant_id.clone(),
        args.key_id.clone(),
        args.secret.clone(),
    )
    .with_nonce_generator(NonceGenerator::new(Arc::new(OsRandom), args.nonce_bytes));

    if args.json {
        let value: Value = serde_json::from_str(body).context("Body is not valid JSON")?;
        Ok(signer.sign_json(&value))
    } else {
        Ok(signer.sign_body(body))
    }
}

fn render(envelope: &SignedRequestEnvelope, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Headers => {
            let mut lines: Vec<String> = envelope
                .headers()
                .into_iter()
                .map(|(name, value)| format!("{}: {}", name, value))
                .collect();
            lines.push(String::new());
            lines.push(envelope.canonical_body.clone());
            Ok(lines.join("\n"))
        }
        OutputFormat::Json => Ok(serde_json::to_string_pretty(envelope)?),
    }
}
