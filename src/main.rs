use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use xsdcheck::cli::{Cli, Command};
use xsdcheck::client::{ClientConfig, ValidatorClient};
use xsdcheck::engine::ValidationEngine;
use xsdcheck::markers::markers_for;
use xsdcheck::output::Output;
use xsdcheck::protocol::{REPORT_FILENAME, ValidationStatus};
use xsdcheck::server::{AppState, app};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse_args();

    match cli.command {
        Command::Serve { bind } => {
            let engine = Arc::new(ValidationEngine::new());
            let state = AppState::new(engine);

            let listener = tokio::net::TcpListener::bind(bind)
                .await
                .with_context(|| format!("failed to bind {}", bind))?;
            tracing::info!("validation service listening on {}", bind);

            axum::serve(listener, app(state))
                .await
                .context("server error")?;

            Ok(ExitCode::SUCCESS)
        }

        Command::Validate {
            xml,
            xsd,
            endpoint,
            json,
        } => {
            let xml_text = tokio::fs::read_to_string(&xml)
                .await
                .with_context(|| format!("failed to read {}", xml.display()))?;
            let xsd_text = tokio::fs::read_to_string(&xsd)
                .await
                .with_context(|| format!("failed to read {}", xsd.display()))?;

            let client = ValidatorClient::new(ClientConfig::new(endpoint))?;
            let report = client.validate(&xml_text, &xsd_text).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                let markers = markers_for(&report);
                print!("{}", Output::new().format_report(&report, &markers));
            }

            Ok(match report.status {
                ValidationStatus::Pass => ExitCode::SUCCESS,
                ValidationStatus::Fail => ExitCode::FAILURE,
            })
        }

        Command::Report {
            xml,
            xsd,
            endpoint,
            output,
        } => {
            let xml_text = tokio::fs::read_to_string(&xml)
                .await
                .with_context(|| format!("failed to read {}", xml.display()))?;
            let xsd_text = tokio::fs::read_to_string(&xsd)
                .await
                .with_context(|| format!("failed to read {}", xsd.display()))?;

            let client = ValidatorClient::new(ClientConfig::new(endpoint))?;
            let download = client.export_csv(&xml_text, &xsd_text).await?;

            let path = output.unwrap_or_else(|| REPORT_FILENAME.into());
            tokio::fs::write(&path, &download.bytes)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!("report written to {}", path.display());

            Ok(ExitCode::SUCCESS)
        }
    }
}
