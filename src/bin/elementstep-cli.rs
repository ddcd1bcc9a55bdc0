//! Elementstep CLI - run and inspect lookup-step process models
//!
//! Provides subcommands for initializing a model directory, printing the
//! registered definitions, and executing token visits.

use clap::{Parser, Subcommand};
use elementstep::runtime::model::Model;
use elementstep::runtime::registry::DefinitionCatalog;
use elementstep::runtime::schema::PropertyKind;
use elementstep::{Runtime, RuntimeConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "elementstep")]
#[command(about = "Element lookup step runtime for process models", long_about = None)]
struct Cli {
    /// Directory holding config.json and model.json
    #[arg(short, long, default_value = ".elementstep")]
    root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config and a sample model
    Init {
        /// Maximum number of trace records retained
        #[arg(long, default_value = "1024")]
        trace_capacity: usize,
    },

    /// Print registered definitions and their schema fingerprints
    Schema,

    /// Execute token visits of a placed step
    Run {
        /// Placed step name
        #[arg(short, long, default_value = "Lookup1")]
        step: String,

        /// Number of visits
        #[arg(short, long, default_value = "1")]
        visits: usize,
    },
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { trace_capacity } => {
            let config = RuntimeConfig {
                root: cli.root.clone(),
                trace_capacity,
                ..Default::default()
            };
            Runtime::init(&config, &Model::sample())?;
            println!("Initialized model at {:?}", cli.root);
        }

        Commands::Schema => {
            let registry = DefinitionCatalog::global().snapshot();
            for name in registry.step_names() {
                let step = registry.step(name)?;
                println!("step {} {} (exits: {})", name, step.unique_id(), step.number_of_exits());
                println!("  {}", step.description());
                println!("  fingerprint {}", registry.fingerprint(name)?);
                print_schema(&registry.schema(name)?, 2);
            }
            for name in registry.element_names() {
                let element = registry.element(name)?;
                println!("element {} {}", name, element.unique_id());
                println!("  {}", element.description());
                println!("  fingerprint {}", registry.fingerprint(name)?);
                print_schema(&registry.schema(name)?, 2);
            }
        }

        Commands::Run { step, visits } => {
            let mut runtime = Runtime::load(cli.root)?;
            let outcomes = runtime.run(&step, visits)?;
            println!("Executed {} visits of {}", outcomes.len(), step);

            for outcome in &outcomes {
                for record in &outcome.records {
                    println!("  [{}] {}", outcome.visit, record.message);
                }
            }

            println!("States:");
            for (name, value) in runtime.model().states.iter() {
                println!("  {} = {}", name, value);
            }
        }
    }

    Ok(())
}

fn print_schema(schema: &elementstep::runtime::schema::PropertySchema, indent: usize) {
    let pad = " ".repeat(indent);
    for prop in schema.iter() {
        let required = if prop.required { " required" } else { "" };
        let default = prop
            .default
            .as_deref()
            .map(|d| format!(" default {}", d))
            .unwrap_or_default();
        match &prop.kind {
            PropertyKind::RepeatGroup { properties } => {
                println!("{}{}: repeat group{}", pad, prop.name, required);
                print_schema(properties, indent + 2);
            }
            PropertyKind::Element { definition } => {
                println!("{}{}: element {}{}", pad, prop.name, definition, required);
            }
            kind => println!("{}{}: {:?}{}{}", pad, prop.name, kind, required, default),
        }
    }
}
