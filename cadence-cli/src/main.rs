use anyhow::{Context, Result, bail};
use cadence_core::{
    CycleOutcome, Engine, NewTask, Signal, SignalKind, Task, TaskFilter, TaskStatus,
};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

mod config;
mod localtime;
mod state;

use config::Config;

#[derive(Parser, Debug)]
#[command(name = "cadence", version, about = "Deterministic day-scheduling CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a default ~/.cadence/config.toml
    Init,

    /// Add a task for a day
    Add {
        #[arg(long)]
        title: String,

        /// Estimated minutes of work
        #[arg(long)]
        minutes: i64,

        /// Owner the task belongs to (default: config.default_owner)
        #[arg(long)]
        owner: Option<String>,

        /// Day to plan for, YYYY-MM-DD (default: today in config.timezone)
        #[arg(long)]
        day: Option<String>,

        /// Weight, higher schedules first (default: 3)
        #[arg(long)]
        priority: Option<i32>,

        /// Hard deadline as local "YYYY-MM-DD HH:MM"
        #[arg(long)]
        deadline: Option<String>,

        /// Preferred local start time "HH:MM"
        #[arg(long)]
        prefer: Option<String>,
    },

    /// Run one pipeline cycle: schedule, optimize, apply signals, remind, report
    Cycle {
        #[arg(long)]
        owner: Option<String>,

        /// Day to cycle, YYYY-MM-DD (default: today in config.timezone)
        #[arg(long)]
        day: Option<String>,

        /// Pretend the cycle runs at this local "YYYY-MM-DD HH:MM" (default: now)
        #[arg(long)]
        at: Option<String>,
    },

    /// Queue a signal for a task's next cycle
    Signal {
        #[command(subcommand)]
        command: SignalCommand,
    },

    /// List stored tasks
    Tasks {
        #[arg(long)]
        owner: Option<String>,

        /// Restrict to one day, YYYY-MM-DD
        #[arg(long)]
        day: Option<String>,

        /// Restrict to one status (unscheduled, scheduled, in_progress, done, missed)
        #[arg(long)]
        status: Option<String>,
    },

    /// Aggregate a report over whole days
    Report {
        #[arg(long)]
        owner: Option<String>,

        /// First day of the window, YYYY-MM-DD
        #[arg(long)]
        from: String,

        /// Last day of the window, inclusive, YYYY-MM-DD
        #[arg(long)]
        to: String,
    },

    /// Create a demo task set for trying the pipeline
    Seed {
        #[arg(long)]
        owner: Option<String>,

        #[arg(long)]
        day: Option<String>,
    },

    /// Run cycles continuously for today
    Watch {
        #[arg(long)]
        owner: Option<String>,

        /// Seconds between cycles
        #[arg(long, default_value_t = 60)]
        interval: u64,
    },
}

#[derive(Subcommand, Debug)]
enum SignalCommand {
    /// Report minutes worked on a task
    Progress {
        #[arg(long)]
        task: String,

        #[arg(long)]
        minutes: i64,
    },

    /// Report focus quality between 0 and 1
    Rating {
        #[arg(long)]
        task: String,

        #[arg(long)]
        value: f64,
    },

    /// Mark a task completed
    Done {
        #[arg(long)]
        task: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Init => {
            config::init_config()?;
        }

        Command::Add { title, minutes, owner, day, priority, deadline, prefer } => {
            add(title, minutes, owner, day, priority, deadline, prefer)?;
        }

        Command::Cycle { owner, day, at } => {
            cycle(owner, day, at)?;
        }

        Command::Signal { command } => match command {
            SignalCommand::Progress { task, minutes } => {
                signal(&task, SignalKind::Progress { minutes })?;
            }
            SignalCommand::Rating { task, value } => {
                signal(&task, SignalKind::FocusRating { value })?;
            }
            SignalCommand::Done { task } => {
                signal(&task, SignalKind::Completed)?;
            }
        },

        Command::Tasks { owner, day, status } => {
            tasks(owner, day, status)?;
        }

        Command::Report { owner, from, to } => {
            report(owner, &from, &to)?;
        }

        Command::Seed { owner, day } => {
            seed(owner, day)?;
        }

        Command::Watch { owner, interval } => {
            watch(owner, interval).await?;
        }
    }

    Ok(())
}

/// Rebuild the engine from config and the local task file.
fn build_engine(cfg: &Config) -> Result<Engine> {
    let engine = Engine::new(cfg.engine.clone())?;
    for task in state::load_tasks()? {
        engine.upsert_task(task)?;
    }
    Ok(engine)
}

/// Write every owner's tasks back to disk, stable order.
fn persist_tasks(engine: &Engine) -> Result<()> {
    let mut all: Vec<Task> = Vec::new();
    for owner in engine.owners() {
        all.extend(engine.list_tasks(&owner, TaskFilter::default())?);
    }
    all.sort_by(|a, b| a.owner.cmp(&b.owner).then_with(|| a.seq.cmp(&b.seq)));
    state::save_tasks(&all)
}

fn resolve_owner(cfg: &Config, owner: Option<String>) -> String {
    owner.unwrap_or_else(|| cfg.default_owner.clone())
}

fn resolve_day(tz: Tz, day: Option<String>, now: DateTime<Utc>) -> Result<NaiveDate> {
    match day {
        Some(d) => localtime::parse_day(&d),
        None => Ok(localtime::local_today(tz, now)),
    }
}

fn add(
    title: String,
    minutes: i64,
    owner: Option<String>,
    day: Option<String>,
    priority: Option<i32>,
    deadline: Option<String>,
    prefer: Option<String>,
) -> Result<()> {
    let cfg = config::load_config()?;
    let tz = localtime::parse_tz(&cfg.timezone)?;
    let now = Utc::now();
    let owner = resolve_owner(&cfg, owner);
    let day = resolve_day(tz, day, now)?;

    let mut draft = NewTask::new(owner, day, title, minutes);
    if let Some(p) = priority {
        draft = draft.with_priority(p);
    }
    if let Some(d) = deadline {
        draft = draft.with_deadline(localtime::parse_local_datetime_to_utc(&d, tz)?);
    }
    if let Some(p) = prefer {
        // Anchor the preference on the task's day to convert it to UTC.
        let clock = localtime::parse_clock_time(&p)?;
        let local = format!("{} {}", day.format("%Y-%m-%d"), clock.format("%H:%M"));
        draft = draft.with_preferred_start(
            localtime::parse_local_datetime_to_utc(&local, tz)?.time(),
        );
    }

    let engine = build_engine(&cfg)?;
    let task = engine.add_task(draft, now)?;
    persist_tasks(&engine)?;

    println!("Added {} ({}m) for {} on {}", task.title, task.estimated_minutes, task.owner, task.day);
    println!("id: {}", task.id);
    Ok(())
}

fn signal(task_id: &str, kind: SignalKind) -> Result<()> {
    let cfg = config::load_config()?;
    let engine = build_engine(&cfg)?;
    let now = Utc::now();

    // Validate against live state before the signal hits the durable queue.
    engine.submit_signal(task_id, kind.clone(), now)?;
    state::append_signal(&Signal { task_id: task_id.to_string(), kind, received_at: now })?;

    println!("Queued signal for {task_id}; it applies on the next cycle.");
    Ok(())
}

/// Feed queued signals for `owner` into the engine, keeping other owners'
/// signals on disk for their own cycles.
fn submit_owner_signals(engine: &Engine, owner: &str) -> Result<Vec<Signal>> {
    let mut remaining = Vec::new();
    for s in state::load_signals()? {
        match engine.get_task(&s.task_id) {
            Ok(task) if task.owner == owner => {
                if let Err(e) = engine.submit_signal(&s.task_id, s.kind.clone(), s.received_at) {
                    warn!(task = %s.task_id, error = %e, "dropping queued signal");
                }
            }
            Ok(_) => remaining.push(s),
            Err(_) => warn!(task = %s.task_id, "dropping signal for unknown task"),
        }
    }
    Ok(remaining)
}

fn cycle(owner: Option<String>, day: Option<String>, at: Option<String>) -> Result<()> {
    let cfg = config::load_config()?;
    let tz = localtime::parse_tz(&cfg.timezone)?;
    let now = match at {
        Some(s) => localtime::parse_local_datetime_to_utc(&s, tz)?,
        None => Utc::now(),
    };
    let owner = resolve_owner(&cfg, owner);
    let day = resolve_day(tz, day, now)?;

    let engine = build_engine(&cfg)?;
    if !engine.owners().contains(&owner) {
        bail!("no tasks for owner '{owner}'; add some first: cadence add --help");
    }

    let remaining = submit_owner_signals(&engine, &owner)?;
    let outcome = engine.run_cycle(&owner, day, now)?;
    state::save_signals(&remaining)?;
    persist_tasks(&engine)?;

    print_outcome(&owner, &outcome, tz);
    Ok(())
}

fn print_outcome(owner: &str, outcome: &CycleOutcome, tz: Tz) {
    println!("Cycle for {} on {}\n", owner, outcome.day);

    if outcome.scheduled.is_empty() {
        println!("Schedule: (nothing live holds a slot)");
    } else {
        println!("Schedule:");
        for task in &outcome.scheduled {
            let Some(slot) = task.slot else { continue };
            println!(
                "  {}-{}  {:<28} [{:?}] focus {:.2}",
                localtime::format_local(slot.start, tz),
                localtime::format_local(slot.end, tz),
                task.title,
                task.status,
                task.focus_score
            );
        }
    }

    if !outcome.swaps.is_empty() {
        println!("\nSwaps:");
        for (a, b) in &outcome.swaps {
            println!("  {a} <-> {b}");
        }
    }

    if !outcome.unschedulable.is_empty() {
        println!("\nUnschedulable:");
        for u in &outcome.unschedulable {
            println!("  - {}: {}", u.title, u.reason);
        }
    }

    if !outcome.reminders.is_empty() {
        println!("\nReminders:");
        for r in &outcome.reminders {
            println!(
                "  - {} {} ({:?})",
                localtime::format_local(r.trigger_at, tz),
                r.title,
                r.urgency
            );
        }
    }

    let report = &outcome.report;
    println!(
        "\nReport {}-{}: done {}, missed {}, in progress {}, scheduled {}",
        localtime::format_local(report.window_start, tz),
        localtime::format_local(report.window_end, tz),
        report.done,
        report.missed,
        report.in_progress,
        report.scheduled
    );
    match report.avg_focus {
        Some(f) => println!(
            "Completion {:.0}% of {} scheduled minutes; avg focus {:.2}",
            report.completion_ratio * 100.0,
            report.scheduled_minutes,
            f
        ),
        None => println!("No slotted tasks in the window."),
    }
    println!("\n{}", outcome.summary);
}

fn parse_status(status: &str) -> Result<TaskStatus> {
    match status {
        "unscheduled" => Ok(TaskStatus::Unscheduled),
        "scheduled" => Ok(TaskStatus::Scheduled),
        "in_progress" => Ok(TaskStatus::InProgress),
        "done" => Ok(TaskStatus::Done),
        "missed" => Ok(TaskStatus::Missed),
        other => bail!(
            "unknown status '{other}' (expected unscheduled, scheduled, in_progress, done, missed)"
        ),
    }
}

fn tasks(owner: Option<String>, day: Option<String>, status: Option<String>) -> Result<()> {
    let cfg = config::load_config()?;
    let tz = localtime::parse_tz(&cfg.timezone)?;
    let owner = resolve_owner(&cfg, owner);

    let mut filter = TaskFilter::default();
    if let Some(d) = day {
        filter.day = Some(localtime::parse_day(&d)?);
    }
    if let Some(s) = status {
        filter = filter.with_status(parse_status(&s)?);
    }

    let engine = build_engine(&cfg)?;
    if !engine.owners().contains(&owner) {
        println!("No tasks stored for owner '{owner}'.");
        return Ok(());
    }

    let tasks = engine.list_tasks(&owner, filter)?;
    if tasks.is_empty() {
        println!("No matching tasks.");
        return Ok(());
    }
    for t in &tasks {
        let slot = match t.slot {
            Some(s) => format!(
                "{}-{}",
                localtime::format_local(s.start, tz),
                localtime::format_local(s.end, tz)
            ),
            None => "--:-- --:--".to_string(),
        };
        println!(
            "{}  {}  {:<28} [{:?}] p{} {}m focus {:.2}",
            t.day, slot, t.title, t.status, t.priority, t.estimated_minutes, t.focus_score
        );
        println!("    id: {}", t.id);
    }
    Ok(())
}

fn report(owner: Option<String>, from: &str, to: &str) -> Result<()> {
    let cfg = config::load_config()?;
    let tz = localtime::parse_tz(&cfg.timezone)?;
    let owner = resolve_owner(&cfg, owner);

    let from_day = localtime::parse_day(from)?;
    let to_day = localtime::parse_day(to)?;
    if to_day < from_day {
        bail!("--to must not precede --from");
    }
    let end_day = to_day.succ_opt().context("day out of range")?;

    let window_start = localtime::parse_local_datetime_to_utc(
        &format!("{} 00:00", from_day.format("%Y-%m-%d")),
        tz,
    )?;
    let window_end = localtime::parse_local_datetime_to_utc(
        &format!("{} 00:00", end_day.format("%Y-%m-%d")),
        tz,
    )?;

    let engine = build_engine(&cfg)?;
    if !engine.owners().contains(&owner) {
        println!("No tasks stored for owner '{owner}'.");
        return Ok(());
    }
    let report = engine.report(&owner, window_start, window_end)?;

    println!("Report for {owner}, {from_day} to {to_day}\n");
    println!("  done:        {}", report.done);
    println!("  missed:      {}", report.missed);
    println!("  in progress: {}", report.in_progress);
    println!("  scheduled:   {}", report.scheduled);
    println!("  minutes:     {} scheduled, {} completed", report.scheduled_minutes, report.completed_minutes);
    match report.avg_focus {
        Some(f) => {
            println!("  completion:  {:.0}%", report.completion_ratio * 100.0);
            println!("  avg focus:   {f:.2}");
        }
        None => println!("  (no slotted tasks in this window)"),
    }
    Ok(())
}

fn seed(owner: Option<String>, day: Option<String>) -> Result<()> {
    let cfg = config::load_config()?;
    let tz = localtime::parse_tz(&cfg.timezone)?;
    let now = Utc::now();
    let owner = resolve_owner(&cfg, owner);
    let day = resolve_day(tz, day, now)?;

    let drafts = [
        ("Email triage", 20, 4),
        ("Write report section", 90, 3),
        ("Code review", 45, 4),
        ("Deep work: model training", 120, 5),
        ("Plan next day", 30, 2),
    ];

    let engine = build_engine(&cfg)?;
    println!("Seeding {} tasks for {} on {}\n", drafts.len(), owner, day);
    for (title, minutes, priority) in drafts {
        let task = engine.add_task(
            NewTask::new(owner.clone(), day, title, minutes).with_priority(priority),
            now,
        )?;
        println!("  {} ({}m, p{})  id: {}", task.title, minutes, priority, task.id);
    }
    persist_tasks(&engine)?;

    println!("\nNext: cadence cycle --owner {owner}");
    Ok(())
}

async fn watch(owner: Option<String>, interval: u64) -> Result<()> {
    let cfg = config::load_config()?;
    let tz = localtime::parse_tz(&cfg.timezone)?;
    let owner = resolve_owner(&cfg, owner);
    if interval == 0 {
        bail!("--interval must be at least 1 second");
    }

    println!("Watching {owner}; cycling every {interval}s (Ctrl-C to stop)\n");
    loop {
        let now = Utc::now();
        let day = localtime::local_today(tz, now);

        // Rebuild from disk each tick so signals queued by other invocations
        // are picked up.
        let engine = build_engine(&cfg)?;
        if engine.owners().contains(&owner) {
            let remaining = submit_owner_signals(&engine, &owner)?;
            let outcome = engine.run_cycle(&owner, day, now)?;
            state::save_signals(&remaining)?;
            persist_tasks(&engine)?;

            println!(
                "[{}] placed {} | swaps {} | unschedulable {} | reminders {}",
                localtime::format_local(now, tz),
                outcome.scheduled.len(),
                outcome.swaps.len(),
                outcome.unschedulable.len(),
                outcome.reminders.len()
            );
            for r in &outcome.reminders {
                println!(
                    "  reminder {} {} ({:?})",
                    localtime::format_local(r.trigger_at, tz),
                    r.title,
                    r.urgency
                );
            }
        } else {
            println!(
                "[{}] no tasks for '{owner}' yet",
                localtime::format_local(now, tz)
            );
        }

        tokio::time::sleep(std::time::Duration::from_secs(interval)).await;
    }
}
