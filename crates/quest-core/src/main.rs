//! `quest` command line: local records plus a persisted simulated ledger

use anyhow::{anyhow, Context, Result};
use chrono::{Datelike, NaiveDate, Utc};
use clap::{Arg, ArgAction, ArgMatches, Command};
use quest_core::{init_tracing, QuestConfig, RewardOrchestrator, StaticSession, TracingNotifier};
use quest_ledger::SimulatedLedger;
use quest_store::FileBackend;
use quest_types::{Address, NewGoal, NewTask, Priority, RecordId};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

fn cli() -> Command {
    Command::new("quest")
        .version(quest_core::VERSION)
        .about("Tasks, weekly goals and on-chain rewards")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .value_parser(clap::value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("identity")
                .long("identity")
                .short('i')
                .global(true)
                .help("Wallet address acting in this session"),
        )
        .subcommand(
            Command::new("add-task")
                .about("Create a task")
                .arg(Arg::new("title").required(true))
                .arg(
                    Arg::new("priority")
                        .long("priority")
                        .short('p')
                        .default_value("medium")
                        .help("low, medium or high"),
                )
                .arg(Arg::new("description").long("description").short('d'))
                .arg(Arg::new("due").long("due").help("Due date, YYYY-MM-DD")),
        )
        .subcommand(
            Command::new("add-goal")
                .about("Create a weekly goal")
                .arg(Arg::new("title").required(true))
                .arg(Arg::new("description").long("description").short('d'))
                .arg(
                    Arg::new("week-start")
                        .long("week-start")
                        .help("Monday of the goal's week, YYYY-MM-DD (default: this week)"),
                ),
        )
        .subcommand(
            Command::new("list")
                .about("List tasks and goals")
                .arg(
                    Arg::new("open")
                        .long("open")
                        .action(ArgAction::SetTrue)
                        .help("Only records that can still be completed"),
                ),
        )
        .subcommand(
            Command::new("complete-task")
                .about("Complete a task on the ledger")
                .arg(Arg::new("id").required(true)),
        )
        .subcommand(
            Command::new("complete-goal")
                .about("Complete a weekly goal on the ledger")
                .arg(Arg::new("id").required(true)),
        )
        .subcommand(Command::new("share").about("Claim the social share reward"))
        .subcommand(Command::new("stats").about("Show reconciled progress"))
        .subcommand(Command::new("missions").about("Show mission progress"))
        .subcommand(
            Command::new("transfer")
                .about("Transfer tokens")
                .arg(Arg::new("to").required(true))
                .arg(Arg::new("amount").required(true)),
        )
}

fn required<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a String> {
    args.get_one::<String>(name)
        .ok_or_else(|| anyhow!("missing argument <{name}>"))
}

fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").with_context(|| format!("invalid date '{text}'"))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();

    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => QuestConfig::load(path)?,
        None => QuestConfig::default(),
    };
    init_tracing(&config.logging)?;

    let identity: Address = required(&matches, "identity")?
        .parse()
        .context("invalid --identity")?;

    let chain = Arc::new(SimulatedLedger::load(&config.ledger.state_path)?);
    for mission in &config.missions {
        chain.register_mission(mission.clone());
    }
    let backend = Arc::new(FileBackend::open(&config.store.path)?);
    let orchestrator = RewardOrchestrator::from_config(
        &config,
        chain.clone(),
        backend,
        Arc::new(StaticSession::connected(identity)),
    )
    .with_notifier(Arc::new(TracingNotifier));

    orchestrator.store().clear_stale_pending(&identity)?;
    let outcome = run(&orchestrator, &identity, &matches).await;

    chain
        .save(&config.ledger.state_path)
        .context("saving ledger state")?;
    outcome
}

async fn run(orchestrator: &RewardOrchestrator, identity: &Address, matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("add-task", args)) => {
            let priority: Priority = required(args, "priority")?.parse()?;
            let mut new = NewTask::new(required(args, "title")?.as_str()).with_priority(priority);
            if let Some(description) = args.get_one::<String>("description") {
                new = new.with_description(description.as_str());
            }
            if let Some(due) = args.get_one::<String>("due") {
                new = new.with_due_date(parse_date(due)?);
            }
            print_json(&orchestrator.store().add_task(identity, new)?)
        }
        Some(("add-goal", args)) => {
            let week_start = match args.get_one::<String>("week-start") {
                Some(text) => parse_date(text)?,
                None => {
                    let today = Utc::now().date_naive();
                    today - chrono::Duration::days(i64::from(today.weekday().num_days_from_monday()))
                }
            };
            let mut new = NewGoal::new(required(args, "title")?.as_str(), week_start);
            if let Some(description) = args.get_one::<String>("description") {
                new = new.with_description(description.as_str());
            }
            print_json(&orchestrator.store().add_goal(identity, new)?)
        }
        Some(("list", args)) => {
            let open_only = args.get_flag("open");
            let tasks: Vec<_> = orchestrator
                .store()
                .tasks(identity)?
                .into_iter()
                .filter(|t| !open_only || t.is_open())
                .collect();
            let goals: Vec<_> = orchestrator
                .store()
                .goals(identity)?
                .into_iter()
                .filter(|g| !open_only || g.is_open())
                .collect();
            print_json(&serde_json::json!({ "tasks": tasks, "goals": goals }))
        }
        Some(("complete-task", args)) => {
            let id: RecordId = required(args, "id")?.parse().context("invalid task id")?;
            print_json(&orchestrator.complete_task(identity, id).await)
        }
        Some(("complete-goal", args)) => {
            let id: RecordId = required(args, "id")?.parse().context("invalid goal id")?;
            print_json(&orchestrator.complete_goal(identity, id).await)
        }
        Some(("share", _)) => print_json(&orchestrator.share(identity).await),
        Some(("stats", _)) => print_json(&orchestrator.refresh(identity).await),
        Some(("missions", _)) => print_json(&orchestrator.missions(identity).await),
        Some(("transfer", args)) => {
            let to: Address = required(args, "to")?.parse().context("invalid recipient")?;
            let amount: u128 = required(args, "amount")?.parse().context("invalid amount")?;
            let success = orchestrator.transfer(identity, &to, amount).await;
            print_json(&serde_json::json!({ "success": success }))
        }
        Some((other, _)) => Err(anyhow!("unknown command '{other}'")),
        None => Err(anyhow!("no command given")),
    }
}
