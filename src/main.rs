use std::process::ExitCode;

use clap::Parser;
use image_bridge::cli::{CliOptions, USAGE};
use image_bridge::config::{BridgeConfig, setup_logging};
use image_bridge::workflow::{Workflow, WorkflowRequest, WorkflowResult};
use tracing::error;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = CliOptions::parse();

    let Some(text) = cli.description() else {
        println!("{USAGE}");
        return Ok(ExitCode::SUCCESS);
    };

    setup_logging(cli.debug).map_err(|err| anyhow::anyhow!("logger setup failed: {err}"))?;

    let result = match BridgeConfig::try_from(&cli).and_then(|config| Workflow::new(&config)) {
        Ok(workflow) => workflow.run(&WorkflowRequest::new(text)).await,
        Err(err) => {
            error!("Could not start workflow: {}", err);
            WorkflowResult::failed(&err)
        }
    };

    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(if result.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
