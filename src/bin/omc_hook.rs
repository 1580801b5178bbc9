//! OMC Hook Binary
//!
//! Hook entry point for the mode-orchestration engine. Reads one JSON
//! document from stdin, writes one JSON document to stdout. Failures never
//! break the surrounding session: any error degrades to the allow document.

use clap::Parser;
use omc::protocol::HookOutput;
use omc::tooling::cli::{Cli, CliContext};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let context = match CliContext::new(&cli) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("omc-hook: {}", e);
            println!("{}", HookOutput::allow().to_json());
            return;
        }
    };

    match context.execute(&cli.command).await {
        Ok(output) => {
            println!("{}", output);
        }
        Err(e) => {
            tracing::warn!("hook execution failed, allowing by default: {}", e);
            println!("{}", HookOutput::allow().to_json());
        }
    }
}
