//! Stagehand scenario runner

mod report;
mod runner;
mod scenario;

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use runner::RunOptions;
use scenario::Scenario;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    let scenario_arg = Arg::new("scenario")
        .long("scenario")
        .short('s')
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Scenario TOML file");

    Command::new("stagehand")
        .version(stagehand_core::VERSION)
        .about("Run resource-set transitions against a simulated host")
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand_required(true)
        .subcommand(
            Command::new("run")
                .about("Run every step of a scenario and print the timeline")
                .arg(scenario_arg.clone())
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                )
                .arg(
                    Arg::new("max-ticks")
                        .long("max-ticks")
                        .default_value("1000")
                        .value_parser(value_parser!(u64))
                        .help("Ticks a step may take before the run fails"),
                )
                .arg(
                    Arg::new("tick-ms")
                        .long("tick-ms")
                        .default_value("0")
                        .value_parser(value_parser!(u64))
                        .help("Milliseconds between ticks"),
                ),
        )
        .subcommand(
            Command::new("catalog")
                .about("List the resources and scenes a scenario defines")
                .arg(scenario_arg),
        )
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn scenario_path(args: &ArgMatches) -> anyhow::Result<&PathBuf> {
    args.get_one::<PathBuf>("scenario").context("missing --scenario")
}

async fn run(args: &ArgMatches) -> anyhow::Result<()> {
    let scenario = Scenario::load(scenario_path(args)?)?;
    let options = RunOptions {
        max_ticks: args.get_one::<u64>("max-ticks").copied().unwrap_or(1_000),
        tick: Duration::from_millis(args.get_one::<u64>("tick-ms").copied().unwrap_or(0)),
    };

    let records = runner::run(&scenario, options).await?;

    if args.get_flag("json") {
        println!("{}", report::render_json(&records)?);
    } else {
        print!("{}", report::render_text(&records)?);
    }
    Ok(())
}

fn catalog(args: &ArgMatches) -> anyhow::Result<()> {
    let scenario = Scenario::load(scenario_path(args)?)?;
    let world = scenario.build()?;

    println!("Resources:");
    for entry in world.orchestrator.catalog().entries() {
        println!("  [{}] {:<24} {}", entry.index(), entry.name(), entry.path());
    }

    println!();
    println!("Scenes:");
    for id in world.registry.ids() {
        let descriptor = world.registry.create(id)?;
        println!("  {:<16} {}", id, descriptor.resource_names().join(", "));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    match matches.subcommand() {
        Some(("run", args)) => run(args).await,
        Some(("catalog", args)) => catalog(args),
        _ => Ok(()),
    }
}
