use anyhow::Context;
use clap::{Arg, Command};
use common::config::Settings;
use common::models::ExecutionInput;
use common::telemetry::init_tracing;
use processing::processor::{MergeProcessor, ProcessorOptions};
use processing::storage::{ObjectStoreProvider, S3Config, S3Manager, StorageProvider};
use processing::utils::uri::parse_s3_uri;
use std::process;
use std::sync::Arc;

fn cli() -> Command {
    Command::new("Sales Pipeline Manager")
        .version("1.0")
        .about("Runs the merge-and-dedup step of the sales pipeline outside Lambda")
        .subcommand(
            Command::new("process")
                .about("Merge one uploaded file into the accumulated output")
                .arg(
                    Arg::new("input")
                        .short('i')
                        .long("input")
                        .value_name("S3_URI")
                        .required(true)
                        .help("Uploaded file, e.g. s3://sales-input/2019/03/sales.csv"),
                )
                .arg(
                    Arg::new("output-bucket")
                        .short('o')
                        .long("output-bucket")
                        .value_name("BUCKET")
                        .help("Overrides output_bucket_name"),
                )
                .arg(
                    Arg::new("local-root")
                        .long("local-root")
                        .value_name("DIR")
                        .help("Treat buckets as directories under DIR instead of S3"),
                )
                .arg(
                    Arg::new("config")
                        .short('c')
                        .long("config")
                        .value_name("FILE")
                        .help("Sets a custom config file"),
                ),
        )
}

async fn run_process(matches: &clap::ArgMatches) -> anyhow::Result<()> {
    let config_path = matches.get_one::<String>("config").map(|s| s.as_str());
    let mut settings = Settings::new(config_path).context("failed to load settings")?;
    init_tracing(settings.log_format);
    if let Some(bucket) = matches.get_one::<String>("output-bucket") {
        settings.output_bucket_name = Some(bucket.clone());
    }

    let input = matches
        .get_one::<String>("input")
        .context("--input is required")?;
    let location = parse_s3_uri(input)?;

    let storage: Arc<dyn StorageProvider> = match matches.get_one::<String>("local-root") {
        Some(root) => Arc::new(ObjectStoreProvider::local(root)),
        None => Arc::new(S3Manager::new(S3Config::from_settings(&settings)).await),
    };

    let processor = MergeProcessor::new(storage, ProcessorOptions::from_settings(&settings)?);
    let outcome = processor
        .process(&ExecutionInput::new(&location.bucket, &location.key))
        .await?;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

#[tokio::main]
async fn main() {
    let matches = cli().get_matches();

    match matches.subcommand() {
        Some(("process", process_matches)) => {
            if let Err(e) = run_process(process_matches).await {
                eprintln!("Processing error: {:#}", e);
                process::exit(1);
            }
        }
        _ => {
            println!("No subcommand specified. Use --help for usage information.");
            process::exit(1);
        }
    }
}
