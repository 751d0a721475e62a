use anyhow::{Context, Result};
use cadence_core::{Signal, Task};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

pub fn cadence_home() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".cadence"))
}

pub fn ensure_cadence_home() -> Result<PathBuf> {
    let dir = cadence_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

pub fn tasks_path() -> Result<PathBuf> {
    Ok(ensure_cadence_home()?.join("tasks.json"))
}

pub fn signals_path() -> Result<PathBuf> {
    Ok(ensure_cadence_home()?.join("signals.jsonl"))
}

pub fn load_tasks() -> Result<Vec<Task>> {
    let p = tasks_path()?;
    if !p.exists() {
        return Ok(Vec::new());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    Ok(serde_json::from_str(&s).with_context(|| format!("parse {}", p.display()))?)
}

pub fn save_tasks(tasks: &[Task]) -> Result<()> {
    let p = tasks_path()?;
    let json = serde_json::to_string_pretty(tasks)?;
    fs::write(&p, json).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

/// Append one accepted signal to the local queue. The queue is the durable
/// copy; the in-process engine is rebuilt from files on every run.
pub fn append_signal(signal: &Signal) -> Result<()> {
    let p = signals_path()?;
    let mut f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&p)
        .with_context(|| format!("open {}", p.display()))?;
    let line = serde_json::to_string(signal)?;
    writeln!(f, "{line}")?;
    Ok(())
}

pub fn load_signals() -> Result<Vec<Signal>> {
    let p = signals_path()?;
    if !p.exists() {
        return Ok(Vec::new());
    }
    let f = fs::File::open(&p).with_context(|| format!("open {}", p.display()))?;
    let reader = BufReader::new(f);

    let mut out = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        // Tolerate stray lines rather than wedging the whole queue.
        if let Ok(signal) = serde_json::from_str::<Signal>(&line) {
            out.push(signal);
        }
    }
    Ok(out)
}

/// Rewrite the queue with the signals that are still waiting.
pub fn save_signals(signals: &[Signal]) -> Result<()> {
    let p = signals_path()?;
    let mut body = String::new();
    for signal in signals {
        body.push_str(&serde_json::to_string(signal)?);
        body.push('\n');
    }
    fs::write(&p, body).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}
