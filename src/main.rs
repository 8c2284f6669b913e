use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use daybucket::config::{AppConfig, REMOTE_PASSWORD_ENV};
use daybucket::core::clock::{Clock, SystemClock, format_date};
use daybucket::core::due_input::parse_due_input;
use daybucket::core::recurrence::{Recurrence, RecurrenceUnit};
use daybucket::core::{Bucket, Task, TaskDraft, TaskError, TaskPatch, TaskStore};
use daybucket::document::local::LocalFile;
use daybucket::session::Session;
use daybucket::sync::SyncEngine;
use daybucket::sync::pusher::DebouncedPusher;
use daybucket::sync::webdav::WebDavStore;

/// Bucket-scheduled personal task manager.
#[derive(Parser)]
#[command(name = "daybucket", version, about = "Plan the week in day buckets")]
struct Cli {
    /// Path to the task document (defaults to the configured data directory).
    #[arg(long, global = true)]
    file: Option<PathBuf>,

    /// Log at debug level.
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Add a new task.
    Add {
        title: String,
        #[arg(long)]
        desc: Option<String>,
        /// Due date: YYYY-MM-DD, MM/DD, "tomorrow", "fri", "in 3 days", ...
        #[arg(long)]
        due: Option<String>,
        /// Target bucket; derived from the due date when omitted.
        #[arg(long)]
        bucket: Option<Bucket>,
        /// Comma-separated tags.
        #[arg(long)]
        tags: Option<String>,
        /// Repeat type: daily | weekly | monthly | yearly.
        #[arg(long)]
        repeat: Option<RecurrenceUnit>,
        /// Repeat every N units.
        #[arg(long, default_value_t = 1)]
        every: u32,
        #[arg(long)]
        flag: bool,
    },

    /// Change fields of a task.
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        desc: Option<String>,
        /// Due date in any form `add` accepts, or "none" to clear it.
        #[arg(long)]
        due: Option<String>,
        #[arg(long)]
        bucket: Option<Bucket>,
        #[arg(long)]
        tags: Option<String>,
        /// Repeat type, or "off" to stop repeating.
        #[arg(long)]
        repeat: Option<String>,
        #[arg(long)]
        every: Option<u32>,
    },

    /// Move a task to another bucket.
    Move { id: String, bucket: Bucket },

    /// Place a task before another one, or last.
    Reorder {
        id: String,
        #[arg(long)]
        before: Option<String>,
        /// Reorder within the flagged list instead of the task's bucket.
        #[arg(long)]
        flagged: bool,
    },

    /// Flag or unflag a task.
    Flag { id: String },

    /// Complete or reopen a task.
    Done { id: String },

    /// Delete a task.
    Rm { id: String },

    /// List tasks.
    List {
        #[arg(long)]
        bucket: Option<Bucket>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        flagged: bool,
        #[arg(long)]
        completed: bool,
    },

    /// Show task counts per bucket.
    Counts,

    /// Merge with the remote copy.
    Sync,
}

/// Journal logger that lets this crate through at info (or debug) and
/// everything else at warn.
struct FilteredJournal {
    inner: systemd_journal_logger::JournalLog,
}

impl log::Log for FilteredJournal {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        if metadata.target().starts_with("daybucket") {
            let max = if daybucket::debug_logging() {
                log::LevelFilter::Debug
            } else {
                log::LevelFilter::Info
            };
            metadata.level() <= max
        } else {
            metadata.level() <= log::LevelFilter::Warn
        }
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            self.inner.log(record);
        }
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

fn init_logging(debug: bool) {
    daybucket::set_debug_logging(debug);

    // `journalctl --user -t daybucket -f`
    let journal = match systemd_journal_logger::JournalLog::new() {
        Ok(journal) => journal.with_syslog_identifier("daybucket".to_string()),
        Err(e) => {
            eprintln!("warning: journal unavailable, logging disabled: {}", e);
            return;
        }
    };
    if let Err(e) = log::set_boxed_logger(Box::new(FilteredJournal { inner: journal })) {
        eprintln!("warning: failed to install logger: {}", e);
        return;
    }
    // Global max must be Debug so debug logs can pass when toggled.
    log::set_max_level(log::LevelFilter::Debug);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = AppConfig::load(&AppConfig::default_path());
    init_logging(cli.debug || config.debug_logging);

    let path = match cli.file {
        Some(path) => path,
        None => {
            config.ensure_dirs()?;
            config.tasks_path()
        }
    };
    let local = LocalFile::new(path);

    let mut session = Session::open(local, SystemClock)?;
    if !matches!(cli.command, Command::Sync) {
        if let Some(remote) = remote_store(&config) {
            let delay = Duration::from_millis(config.push_debounce_ms);
            session = session.with_pusher(DebouncedPusher::spawn(Arc::new(remote), delay));
        }
    }

    let result = run(&mut session, cli.command, &config).await;
    session.close().await;
    result
}

fn remote_store(config: &AppConfig) -> Option<WebDavStore> {
    let remote = config.remote.as_ref()?;
    let password = AppConfig::remote_password().unwrap_or_default();
    match WebDavStore::from_config(remote, &password) {
        Ok(store) => Some(store),
        Err(e) => {
            log::error!("Remote store unavailable: {}", e);
            None
        }
    }
}

async fn run_sync(session: &mut Session, config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let Some(remote_config) = &config.remote else {
        return Err("no remote configured; add a \"remote\" section to the config file".into());
    };
    let Some(password) = AppConfig::remote_password() else {
        return Err(format!("set {} to sync", REMOTE_PASSWORD_ENV).into());
    };

    let remote = WebDavStore::from_config(remote_config, &password)?;
    remote.ensure_collection().await?;

    let mut engine = SyncEngine::new(remote, session.local().clone());
    let document = engine.sync(&session.store().to_document(), SystemClock.now()).await?;
    let count = document.tasks.len();
    session.replace(document)?;
    println!("Synced {} task(s)", count);
    Ok(())
}

async fn run(
    session: &mut Session,
    command: Command,
    config: &AppConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Add {
            title,
            desc,
            due,
            bucket,
            tags,
            repeat,
            every,
            flag,
        } => {
            let due_date = due.as_deref().map(parse_due).transpose()?;
            let draft = TaskDraft {
                title,
                description: desc,
                due_date,
                bucket,
                tags: tags.as_deref().map(daybucket::core::task::parse_tags).unwrap_or_default(),
                recurring: repeat.map_or(Recurrence::Off, |unit| Recurrence::every(every, unit)),
                flagged: flag,
                ..TaskDraft::default()
            };
            let task = session.store_mut().add(draft)?;
            session.commit()?;
            println!("Added {}", describe(&task));
        }

        Command::Edit {
            id,
            title,
            desc,
            due,
            bucket,
            tags,
            repeat,
            every,
        } => {
            let id = resolve_id(session.store(), &id)?;
            let due_date = match due.as_deref() {
                None => None,
                Some("none") | Some("") => Some(None),
                Some(text) => Some(Some(parse_due(text)?)),
            };
            let current = session.store().get(&id).map(|t| t.recurring).unwrap_or_default();
            let recurring = parse_repeat(repeat.as_deref(), every, current)?;
            let patch = TaskPatch {
                title,
                description: desc,
                due_date,
                bucket: bucket.map(Some),
                tags: tags.as_deref().map(daybucket::core::task::parse_tags),
                recurring,
                ..TaskPatch::default()
            };
            if patch.is_empty() {
                return Err("nothing to change".into());
            }
            let task = session.store_mut().update(&id, patch)?;
            session.commit()?;
            println!("Updated {}", describe(&task));
        }

        Command::Move { id, bucket } => {
            let id = resolve_id(session.store(), &id)?;
            let task = session.store_mut().move_to_bucket(&id, bucket)?;
            session.commit()?;
            println!("Moved {}", describe(&task));
        }

        Command::Reorder { id, before, flagged } => {
            let id = resolve_id(session.store(), &id)?;
            let before = before.map(|b| resolve_id(session.store(), &b)).transpose()?;
            let store = session.store_mut();
            let task = if flagged {
                store.reorder_flagged(&id, before.as_deref())?
            } else {
                let bucket = store.get(&id).map(|t| t.bucket).ok_or_else(|| TaskError::NotFound(id.clone()))?;
                store.reorder_within_bucket(&id, before.as_deref(), bucket)?
            };
            session.commit()?;
            println!("Reordered {}", describe(&task));
        }

        Command::Flag { id } => {
            let id = resolve_id(session.store(), &id)?;
            let task = session.store_mut().toggle_flag(&id)?;
            session.commit()?;
            let verb = if task.flagged { "Flagged" } else { "Unflagged" };
            println!("{} {}", verb, describe(&task));
        }

        Command::Done { id } => {
            let id = resolve_id(session.store(), &id)?;
            let outcome = session.store_mut().toggle_completion(&id)?;
            session.commit()?;
            let verb = if outcome.task.completed { "Completed" } else { "Reopened" };
            println!("{} {}", verb, describe(&outcome.task));
            if let Some(next) = outcome.successor {
                println!("Next: {}", describe(&next));
            }
        }

        Command::Rm { id } => {
            let id = resolve_id(session.store(), &id)?;
            let task = session.store_mut().delete(&id)?;
            session.commit()?;
            println!("Deleted {}", describe(&task));
        }

        Command::List {
            bucket,
            search,
            flagged,
            completed,
        } => list(session.store(), bucket, search.as_deref(), flagged, completed),

        Command::Counts => {
            for (bucket, count) in session.store().counts_by_bucket() {
                println!("{:<12} {}", bucket.as_str(), count);
            }
        }

        Command::Sync => run_sync(session, config).await?,
    }
    Ok(())
}

fn parse_due(text: &str) -> Result<NaiveDate, String> {
    parse_due_input(text, SystemClock.now().date_naive())
        .ok_or_else(|| format!("unrecognized due date: {text}"))
}

fn parse_repeat(
    repeat: Option<&str>,
    every: Option<u32>,
    current: Recurrence,
) -> Result<Option<Recurrence>, String> {
    match (repeat, every) {
        (None, None) => Ok(None),
        (Some("off"), _) => Ok(Some(Recurrence::Off)),
        (Some(unit), every) => {
            let unit: RecurrenceUnit = unit.parse()?;
            let count = every.or(current.interval().map(|i| i.count)).unwrap_or(1);
            Ok(Some(Recurrence::every(count, unit)))
        }
        (None, Some(count)) => match current.interval() {
            Some(interval) => Ok(Some(Recurrence::every(count, interval.unit))),
            None => Err("--every needs --repeat on a task that does not repeat".to_string()),
        },
    }
}

/// Accept a full id or a unique prefix of one.
fn resolve_id<C: Clock>(store: &TaskStore<C>, input: &str) -> Result<String, TaskError> {
    if store.get(input).is_some() {
        return Ok(input.to_string());
    }
    let matches: Vec<&Task> = store.all().iter().filter(|t| t.id.starts_with(input)).collect();
    match matches.as_slice() {
        [task] => Ok(task.id.clone()),
        [] => Err(TaskError::NotFound(input.to_string())),
        _ => Err(TaskError::Validation(format!("id prefix {} is ambiguous", input))),
    }
}

fn describe(task: &Task) -> String {
    let short_id: String = task.id.chars().take(8).collect();
    let mut line = format!("{}  {}", short_id, task.title);
    if let Some(due) = task.due_date {
        line.push_str(&format!("  ({})", format_date(due)));
    }
    if task.flagged {
        line.push_str("  [flagged]");
    }
    if task.recurring.is_enabled() {
        line.push_str(&format!("  [{}]", task.recurring));
    }
    for tag in &task.tags {
        line.push_str(&format!("  #{}", tag));
    }
    line
}

fn print_section(name: &str, tasks: &[&Task]) {
    if tasks.is_empty() {
        return;
    }
    println!("{}", name);
    for task in tasks {
        println!("  {}", describe(task));
    }
}

fn list<C: Clock>(
    store: &TaskStore<C>,
    bucket: Option<Bucket>,
    search: Option<&str>,
    flagged: bool,
    completed: bool,
) {
    if let Some(term) = search {
        let found = store.search(term);
        print_section(&format!("Matching {:?}", term), &found);
        return;
    }
    if flagged {
        print_section("flagged", &store.flagged_tasks());
        return;
    }
    if completed || bucket == Some(Bucket::Completed) {
        print_section("completed", &store.completed_tasks());
        return;
    }
    if let Some(bucket) = bucket {
        print_section(bucket.as_str(), &store.tasks_in_bucket(bucket));
        return;
    }

    print_section("flagged", &store.flagged_tasks());
    for bucket in Bucket::ALL.into_iter().filter(|b| *b != Bucket::Completed) {
        print_section(bucket.as_str(), &store.tasks_in_bucket(bucket));
    }
}
