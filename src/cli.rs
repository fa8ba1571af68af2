use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// XML/XSD validation service and client
#[derive(Parser, Debug, Clone)]
#[command(name = "xsdcheck")]
#[command(about = "Validate XML documents against XSD schemas over the validation protocol")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the validation service
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1:8000")]
        bind: SocketAddr,
    },

    /// Validate an XML file against an XSD file via a running service
    Validate {
        /// XML document to validate
        xml: PathBuf,

        /// XSD schema to validate against
        xsd: PathBuf,

        /// Base URL of the validation service
        #[arg(long, default_value = "http://localhost:8000")]
        endpoint: String,

        /// Emit the scored report as JSON instead of human-readable text
        #[arg(long)]
        json: bool,
    },

    /// Download the CSV validation report for an XML/XSD pair
    Report {
        /// XML document to report on
        xml: PathBuf,

        /// XSD schema to validate against
        xsd: PathBuf,

        /// Base URL of the validation service
        #[arg(long, default_value = "http://localhost:8000")]
        endpoint: String,

        /// Output path; defaults to the protocol's download name in the
        /// current directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
