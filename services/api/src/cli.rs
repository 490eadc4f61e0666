use crate::demo::{run_demo, DemoArgs};
use crate::infra::{load_product, load_tree};
use crate::server;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use configurator::config::AppConfig;
use configurator::error::AppError;
use configurator::telemetry;
use configurator::engine::ConfigurationTreeNode;
use configurator::{EvaluationEngine, ProductDefinition};

#[derive(Parser, Debug)]
#[command(
    name = "Configuration Evaluator",
    about = "Evaluate hierarchical product configurations from the command line or over HTTP",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Evaluate a configuration and print the result as JSON
    Evaluate(ProductArgs),
    /// Print the rendered rules and diagnostic program as JSON
    Expressions(ProductArgs),
    /// Walk through the built-in elevator product
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Product definition (JSON) to serve instead of the built-in elevator
    #[arg(long)]
    pub(crate) catalog: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct ProductArgs {
    /// Product definition (JSON)
    #[arg(long)]
    pub(crate) catalog: PathBuf,
    /// Configuration tree (JSON); defaults to the product's initial tree
    #[arg(long)]
    pub(crate) tree: Option<PathBuf>,
}

fn prepare(
    args: &ProductArgs,
) -> Result<(EvaluationEngine, ProductDefinition, ConfigurationTreeNode), AppError> {
    let config = AppConfig::load()?;
    telemetry::init_stderr(&config.telemetry)?;
    let product = load_product(&args.catalog)?;
    let tree = match &args.tree {
        Some(path) => load_tree(path)?,
        None => product.initial_tree.clone(),
    };
    Ok((EvaluationEngine::new(config.engine), product, tree))
}

async fn run_evaluate(args: ProductArgs) -> Result<(), AppError> {
    let (engine, product, tree) = prepare(&args)?;
    let result = engine.evaluate(&product.input(&tree)).await;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn run_expressions(args: ProductArgs) -> Result<(), AppError> {
    let (engine, product, tree) = prepare(&args)?;
    let bundle = engine.render(&product.input(&tree));
    println!("{}", serde_json::to_string_pretty(&bundle)?);
    Ok(())
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Evaluate(args) => run_evaluate(args).await,
        Command::Expressions(args) => run_expressions(args),
        Command::Demo(args) => run_demo(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vehicle_fixture() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("../../crates/configurator/tests/fixtures/vehicle.json")
    }

    #[test]
    fn product_commands_install_logging() {
        let args = ProductArgs {
            catalog: vehicle_fixture(),
            tree: None,
        };

        let (_, product, tree) = prepare(&args).expect("fixture loads");

        assert_eq!(tree, product.initial_tree);
        assert!(tracing::dispatcher::has_been_set());
    }
}
