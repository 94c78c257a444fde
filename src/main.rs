//! qrtrace command-line entrypoint

use clap::Parser;
use qrtrace::output::render_summary;
use qrtrace::{
    AssumeYes, Confirm, Error, Pipeline, QrTraceConfig, Result, RunSummary, TerminalPrompt,
    WebDriverLauncher, logging,
};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(
    name = "qrtrace",
    version,
    about = "Check the URLs behind QR codes against VirusTotal and build an evidence report"
)]
struct Cli {
    /// Image files containing QR codes (png, jpg, jpeg, bmp, gif)
    #[arg(value_name = "IMAGE")]
    files: Vec<PathBuf>,

    /// Optional configuration file (toml/yaml). Defaults to qrtrace.{toml,yaml} in cwd/XDG config.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Answer yes to both confirmation prompts
    #[arg(short, long)]
    yes: bool,

    /// Run the browser without a visible window
    #[arg(long)]
    headless: bool,

    /// Print the run summary as formatted JSON instead of human-readable text
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err}");
            if !tracing::dispatcher::has_been_set() {
                eprintln!("[ERROR]::{err}");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = QrTraceConfig::load(cli.config.as_deref())?;
    if cli.headless {
        config.browser.headless = true;
    }

    logging::init(&config.logging)?;

    if cli.files.is_empty() {
        return Err(Error::Other(
            "Provide the file path(s) that contains QR codes.".to_string(),
        ));
    }

    let summary = if cli.yes {
        execute(config, AssumeYes, &cli.files).await?
    } else {
        execute(config, TerminalPrompt::stdin(), &cli.files).await?
    };

    let rendered = render_summary(&summary);
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&rendered.json)?);
    } else {
        for line in &rendered.human {
            println!("{line}");
        }
    }

    Ok(())
}

async fn execute<C: Confirm>(
    config: QrTraceConfig,
    confirm: C,
    files: &[PathBuf],
) -> Result<RunSummary> {
    let mut pipeline = Pipeline::new(config, confirm, WebDriverLauncher);
    pipeline.run(files).await
}
