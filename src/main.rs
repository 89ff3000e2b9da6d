//! cellcmd - classify, bind and run script commands.

mod cli;

use std::io::Read;

use anyhow::{Context as _, Result};
use cellcmd::command::bind;
use cellcmd::config::Config;
use cellcmd::db::SqliteExecutor;
use cellcmd::error::CellCmdError;
use cellcmd::exec::{ArithmeticEvaluator, Context, Dispatcher, SimpleGridRunner};
use cellcmd::grid::{to_command, GridParser, TextGridParser};
use cellcmd::logging;
use cellcmd::value::Value;
use cli::{parse_values, Cli, CliCommand, OutputFormat};
use tracing::{error, info};

fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse_args();

    if cli.log_file {
        logging::init_file_logging();
    } else {
        logging::init_stderr_logging();
    }

    if let Err(e) = run(cli) {
        match e.downcast_ref::<CellCmdError>() {
            Some(err) => error!("{}: {}", err.category(), err),
            None => error!("{e:#}"),
        }
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let mut config = Config::load_from_file(&config_path)?;
    config.apply_env_defaults()?;

    match cli.command {
        CliCommand::Classify {
            text,
            no_escape,
            format,
        } => {
            let classifier = if no_escape {
                cellcmd::command::CommandClassifier::without_escape()
            } else {
                config.dispatch.classifier()
            };
            match (classifier.classify(&text), format) {
                (None, OutputFormat::Text) => println!("(blank)"),
                (None, OutputFormat::Json) => println!("null"),
                (Some(command), OutputFormat::Text) => {
                    println!("{}\t{}", command.shape, command.text)
                }
                (Some(command), OutputFormat::Json) => {
                    println!("{}", serde_json::to_string(&command)?)
                }
            }
        }
        CliCommand::Bind { sql, args } => {
            println!("{}", bind(&sql, &parse_values(&args)));
        }
        CliCommand::Run {
            text,
            args,
            data_source,
            no_escape,
            format,
        } => {
            if let Some(name) = &data_source {
                if config.get_data_source(Some(name)).is_none() {
                    anyhow::bail!("Data source '{name}' is not configured");
                }
            }

            let sql = SqliteExecutor::connect(&config).context("Failed to open data sources")?;
            let evaluator = ArithmeticEvaluator;
            let runner = SimpleGridRunner::new(&evaluator).with_sql(&sql);
            let classifier = if no_escape {
                cellcmd::command::CommandClassifier::without_escape()
            } else {
                config.dispatch.classifier()
            };
            let dispatcher = Dispatcher::new(&sql, &evaluator, &runner).with_classifier(classifier);

            let mut ctx = match data_source {
                Some(name) => Context::with_data_source(name),
                None => Context::new(),
            };
            let value = dispatcher.execute(&text, &parse_values(&args), &mut ctx)?;
            print_value(value, format)?;
        }
        CliCommand::Serialize { file } => {
            let text = if file.as_os_str() == "-" {
                let mut buf = String::new();
                std::io::stdin()
                    .read_to_string(&mut buf)
                    .context("Failed to read stdin")?;
                buf
            } else {
                std::fs::read_to_string(&file)
                    .with_context(|| format!("Failed to read {}", file.display()))?
            };
            let program = TextGridParser.parse(text.trim_end_matches(['\r', '\n']))?;
            if let Some(command) = to_command(&program) {
                println!("{command}");
            }
        }
        CliCommand::Call { params } => {
            let sql = SqliteExecutor::connect(&config).context("Failed to open data sources")?;
            let evaluator = ArithmeticEvaluator;
            let runner = SimpleGridRunner::new(&evaluator).with_sql(&sql);
            let dispatcher = Dispatcher::new(&sql, &evaluator, &runner);

            let value = dispatcher.execute_host_call(&parse_values(&params), &mut Context::new())?;
            print_value(value, OutputFormat::Text)?;
        }
    }

    Ok(())
}

fn print_value(value: Option<Value>, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            if let Some(value) = value {
                println!("{value}");
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string(&value)?),
    }
    Ok(())
}
