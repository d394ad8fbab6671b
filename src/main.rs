use log::{error, info};
use mealie_import::{server, ImporterConfig, Importer, ProgressSink};
use std::env;
use std::process::ExitCode;

const USAGE: &str = "Usage:
  mealie-import [serve]
  mealie-import import <ica|mathem> <recipe url or id>...";

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().skip(1).collect();
    let config = match ImporterConfig::load() {
        Ok(config) => config,
        Err(err) => {
            error!("Configuration error: {}", err);
            return ExitCode::FAILURE;
        }
    };

    match args.first().map(String::as_str) {
        None | Some("serve") => match server::serve(config).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                error!("{}", err);
                ExitCode::FAILURE
            }
        },
        Some("import") if args.len() >= 3 => import(config, &args[1], &args[2..]).await,
        _ => {
            eprintln!("{}", USAGE);
            ExitCode::FAILURE
        }
    }
}

/// Imports each reference in turn, logging progress to stderr.
async fn import(config: ImporterConfig, source: &str, references: &[String]) -> ExitCode {
    let importer = match Importer::new(config) {
        Ok(importer) => importer,
        Err(err) => {
            error!("{}", err);
            return ExitCode::FAILURE;
        }
    };

    let sink = ProgressSink::detached();
    let mut failed = 0;
    for reference in references {
        info!("Importing {}", reference);
        if importer.run(source, reference, &sink).await.is_err() {
            failed += 1;
        }
    }

    if failed > 0 {
        error!("{} of {} imports failed", failed, references.len());
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
