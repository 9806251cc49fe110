use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};
use log::LevelFilter;
use std::path::PathBuf;

use phishguard_classifiers::config::load_config;
use phishguard_classifiers::{
    PipelineConfig, PipelineVariant, PredictionService, RunContext, TrainingOutcome,
    TrainingPipeline,
};

const DEFAULT_ARTIFACT_ROOT: &str = "artifacts";

fn variant_arg() -> Arg {
    Arg::new("variant")
        .short('p')
        .long("variant")
        .help("Pipeline to use: tabular (phishing indicators) or text (spam messages)")
        .required(true)
        .value_parser(clap::value_parser!(PipelineVariant))
}

fn artifacts_arg() -> Arg {
    Arg::new("artifacts")
        .short('a')
        .long("artifacts")
        .help("Root directory holding the per-variant artifact folders")
        .default_value(DEFAULT_ARTIFACT_ROOT)
        .value_parser(clap::value_parser!(PathBuf))
        .value_hint(ValueHint::DirPath)
}

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("PHISHGUARD_LOG", "error,phishguard=info"))
        .init();

    let matches = Command::new("phishguard")
        .version(clap::crate_version!())
        .about("Train and serve phishing and spam classifiers")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("train")
                .about("Train, select and persist a classifier for one pipeline variant")
                .arg(variant_arg())
                .arg(
                    Arg::new("data")
                        .short('d')
                        .long("data")
                        .help("Path to the labeled training CSV")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("config")
                        .short('c')
                        .long("config")
                        .help("Path to a pipeline JSON configuration file")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(artifacts_arg())
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .help("Random seed. Overrides the configuration file.")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    Arg::new("expected_accuracy")
                        .long("expected_accuracy")
                        .help("Minimum held-out accuracy. Overrides the configuration file.")
                        .value_parser(clap::value_parser!(f64)),
                )
                .arg(
                    Arg::new("no_tune")
                        .long("no_tune")
                        .help("Skip the cross-validated grid search.")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("predict")
                .about("Label new inputs with previously trained artifacts")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .subcommand(
                    Command::new("batch")
                        .about("Label every row of a CSV file")
                        .arg(variant_arg())
                        .arg(
                            Arg::new("input")
                                .short('i')
                                .long("input")
                                .help("CSV file to label")
                                .required(true)
                                .value_parser(clap::value_parser!(PathBuf))
                                .value_hint(ValueHint::FilePath),
                        )
                        .arg(
                            Arg::new("output")
                                .short('o')
                                .long("output")
                                .help("Where to write the labeled CSV")
                                .required(true)
                                .value_parser(clap::value_parser!(PathBuf))
                                .value_hint(ValueHint::FilePath),
                        )
                        .arg(artifacts_arg()),
                )
                .subcommand(
                    Command::new("url")
                        .about("Fetch a URL, extract its indicators and label it")
                        .arg(
                            Arg::new("url")
                                .help("URL to classify")
                                .required(true)
                                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                                .value_hint(ValueHint::Url),
                        )
                        .arg(artifacts_arg()),
                )
                .subcommand(
                    Command::new("message")
                        .about("Label one free-text message")
                        .arg(
                            Arg::new("text")
                                .help("Message to classify")
                                .required(true),
                        )
                        .arg(artifacts_arg()),
                ),
        )
        .help_template(
            "{usage-heading} {usage}\n\n\
             {about-with-newline}\n\
             Version {version}\n\n\
             {all-args}{after-help}",
        )
        .get_matches();

    match matches.subcommand() {
        Some(("train", sub_m)) => handle_train(sub_m),
        Some(("predict", sub_m)) => handle_predict(sub_m),
        _ => unreachable!("Subcommand is required by CLI configuration"),
    }
}

fn artifact_root(matches: &ArgMatches) -> PathBuf {
    matches
        .get_one::<PathBuf>("artifacts")
        .cloned()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_ARTIFACT_ROOT))
}

fn handle_train(matches: &ArgMatches) -> Result<()> {
    let variant = *matches
        .get_one::<PipelineVariant>("variant")
        .context("missing --variant")?;
    let data_path = matches
        .get_one::<PathBuf>("data")
        .context("missing --data")?;

    let mut config = if let Some(config_path) = matches.get_one::<PathBuf>("config") {
        log::info!("[PhishGuard::Train] Using config: {:?}", config_path);
        load_config(config_path)
            .with_context(|| format!("loading configuration from {}", config_path.display()))?
    } else {
        log::info!("[PhishGuard::Train] No config provided; using defaults.");
        PipelineConfig::default()
    };

    if let Some(seed) = matches.get_one::<u64>("seed") {
        config.seed = *seed;
    }
    if let Some(threshold) = matches.get_one::<f64>("expected_accuracy") {
        config.expected_accuracy = *threshold;
    }
    if matches.get_flag("no_tune") {
        config.tune = false;
    }

    if matches.get_one::<PathBuf>("config").is_none() {
        let default_json = serde_json::to_string_pretty(&config).unwrap_or_default();
        log::debug!("[PhishGuard::Train] Effective config:\n{}", default_json);
    }

    let ctx = RunContext::new(config.seed, artifact_root(matches));
    let pipeline = TrainingPipeline::new(variant, config, ctx)?;
    match pipeline.run_from_csv(data_path) {
        Ok(outcome) => {
            print_outcome(&outcome);
            Ok(())
        }
        Err(e) => {
            log::error!("Training failed: {:#}", e);
            std::process::exit(1)
        }
    }
}

fn print_outcome(outcome: &TrainingOutcome) {
    println!("Pipeline:           {}", outcome.variant);
    println!("Selected model:     {}", outcome.winner);
    println!("Selected by:        {:?}", outcome.metric);
    for (name, value) in &outcome.params {
        println!("  {:<17} {}", name, value);
    }
    println!("Held-out accuracy:  {:.4}", outcome.held_out.accuracy);
    println!("Held-out precision: {:.4}", outcome.held_out.precision);
    println!("Artifacts:          {}", outcome.artifacts.dir.display());
}

fn handle_predict(matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("batch", batch_matches)) => {
            let variant = *batch_matches
                .get_one::<PipelineVariant>("variant")
                .context("missing --variant")?;
            let input = batch_matches
                .get_one::<PathBuf>("input")
                .context("missing --input")?;
            let output = batch_matches
                .get_one::<PathBuf>("output")
                .context("missing --output")?;
            let service = PredictionService::new(&RunContext::new(0, artifact_root(batch_matches)));
            let labeled = service
                .predict_batch(variant, input, output)
                .with_context(|| format!("labeling {}", input.display()))?;
            eprintln!(
                "[PhishGuard::Predict] Labeled {} rows into {}",
                labeled.nrows(),
                output.display()
            );
            Ok(())
        }
        Some(("url", url_matches)) => {
            let url = url_matches
                .get_one::<String>("url")
                .context("missing URL")?;
            let service = PredictionService::new(&RunContext::new(0, artifact_root(url_matches)));
            let prediction = service
                .predict_url(url)
                .with_context(|| format!("classifying {}", url))?;
            if prediction.degraded {
                eprintln!("[PhishGuard::Predict] Page could not be fetched; HTML indicators defaulted.");
            }
            println!("{}", prediction.label);
            Ok(())
        }
        Some(("message", message_matches)) => {
            let text = message_matches
                .get_one::<String>("text")
                .context("missing message text")?;
            let service =
                PredictionService::new(&RunContext::new(0, artifact_root(message_matches)));
            let label = service
                .predict_message(text)
                .context("classifying message")?;
            println!("{}", label);
            Ok(())
        }
        _ => unreachable!(),
    }
}
