//! Borehole CLI - score SMS exports, issue and verify certificates

use std::io::Read;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use serde::Serialize;

use borehole_core::api::{self, CertificateResponse, ErrorCode, ErrorResponse, ScoreResponse};
use borehole_core::constants::{APP_NAME, APP_VERSION};
use borehole_core::logic::parser::NeverCancel;
use borehole_core::{EngineConfig, ScoringPipeline};

#[derive(Parser)]
#[command(name = "borehole")]
#[command(version, about = "On-device credit scoring from mobile money SMS", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a JSON batch of SMS lines (array or {"logs": [...]})
    Score {
        /// Request file; reads stdin when omitted
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Also issue a signed certificate for the score
        #[arg(long, requires = "subject")]
        certify: bool,

        /// Subject identifier (anonymised before signing)
        #[arg(long)]
        subject: Option<String>,
    },

    /// Verify a certificate payload and signature
    Verify {
        /// Exact payload string as issued
        #[arg(long)]
        payload: String,

        /// Base64 signature
        #[arg(long)]
        signature: String,

        /// Base64 public key; defaults to this installation's key
        #[arg(long)]
        public_key: Option<String>,
    },

    /// Print engine, model and signing key status
    Status,
}

#[derive(Serialize)]
struct CertifiedScore {
    result: ScoreResponse,
    certificate: CertificateResponse,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .init();

    let cli = Cli::parse();
    log::debug!("{} v{}", APP_NAME, APP_VERSION);

    let config = EngineConfig::from_env();

    let outcome = match cli.command {
        Commands::Verify {
            payload,
            signature,
            public_key: Some(public_key),
        } => api::verify_certificate_with_key(&public_key, &payload, &signature).map(to_json),
        command => match ScoringPipeline::from_config(&config) {
            Ok(pipeline) => run(&pipeline, command),
            Err(e) => {
                log::error!("Failed to initialise pipeline: {}", e);
                Err(ErrorResponse::from(e))
            }
        },
    };

    match outcome {
        Ok(json) => println!("{}", json),
        Err(error) => {
            println!("{}", to_json(&error));
            process::exit(1);
        }
    }
}

fn run(pipeline: &ScoringPipeline, command: Commands) -> Result<String, ErrorResponse> {
    match command {
        Commands::Score {
            input,
            certify,
            subject,
        } => {
            let body = read_input(input.as_ref())?;
            let response = api::score(pipeline, &body, &NeverCancel)?;

            if !certify {
                return Ok(to_json(&response));
            }

            let subject = subject.unwrap_or_default();
            let certificate = api::issue_certificate(pipeline, response.score, &subject)?;
            Ok(to_json(CertifiedScore {
                result: response,
                certificate,
            }))
        }
        Commands::Verify {
            payload, signature, ..
        } => api::verify_certificate(pipeline, &payload, &signature).map(to_json),
        Commands::Status => Ok(to_json(&api::engine_status(pipeline))),
    }
}

fn read_input(path: Option<&PathBuf>) -> Result<String, ErrorResponse> {
    let read = match path {
        Some(path) => std::fs::read_to_string(path),
        None => {
            let mut body = String::new();
            std::io::stdin().read_to_string(&mut body).map(|_| body)
        }
    };

    read.map_err(|e| ErrorResponse::new(ErrorCode::InvalidJsonInput, format!("cannot read input: {e}")))
}

fn to_json<T: Serialize>(value: T) -> String {
    serde_json::to_string_pretty(&value).unwrap_or_else(|e| {
        log::error!("Failed to serialize response: {}", e);
        String::from("{}")
    })
}
