mod consumer_csv;
mod consumer_json;
mod consumer_svg;
mod opt;
mod types;

use amdtemp_core::{adl, Error, System};
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::style::{Print, ResetColor, SetForegroundColor};
use crossterm::{execute, terminal};
use opt::{Category, Opts};
use std::io::{self, Stdout};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;
use types::Series;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let opts = Opts::parse();
    if let Err(err) = run(&opts) {
        tracing::error!(%err, "recording failed");
        std::process::exit(1);
    }
}

fn run(opts: &Opts) -> Result<(), Box<dyn std::error::Error>> {
    let mut system = System::new(opts.features(), &opts.config());

    let mut categories: Vec<Category> = vec![];
    for &c in &opts.category {
        if !categories.contains(&c) {
            categories.push(c);
        }
    }

    let mut series = vec![];
    for &c in &categories {
        match c {
            Category::Gpu => match system.gpu_adapters() {
                Ok(adapters) => {
                    for idx in adl::physical_adapters(adapters) {
                        let adapter = &adapters[idx];
                        let name = adapter.name();
                        tracing::info!(idx, %name, generation = ?adapter.generation(), "GPU");
                        series.push(Series::new(c, idx, format!("GPU{} {}", idx, name)));
                    }
                }
                Err(err) => tracing::warn!(%err, "skipping GPU"),
            },
            Category::Cpu => match system.cpu_temperature() {
                Err(
                    err @ (Error::Cpu(_)
                    | Error::UnsupportedFeatures(_)
                    | Error::FeatureMissing(_)),
                ) => tracing::warn!(%err, "skipping CPU"),
                _ => series.push(Series::new(c, 0, "CPU".to_string())),
            },
        }
    }
    if series.is_empty() {
        return Err("no temperature source available".into());
    }
    categories.retain(|c| series.iter().any(|s| s.category == *c));

    let raw = terminal::enable_raw_mode().is_ok();
    let recorded = record(opts, &mut system, &mut series, raw);
    if raw {
        terminal::disable_raw_mode()?;
    }
    let timestamps = recorded?;

    for output in &opts.output {
        let result = match output.extension().and_then(|e| e.to_str()) {
            Some("json") => consumer_json::consume(output, &timestamps, &series),
            Some("csv") => consumer_csv::consume(output, &timestamps, &series),
            Some("svg") => consumer_svg::consume(output, &categories, &series, timestamps.len()),
            _ => {
                tracing::warn!(path = %output.display(), "unsupported output format");
                continue;
            }
        };
        match result {
            Ok(()) => tracing::info!(path = %output.display(), "report written"),
            Err(err) => tracing::error!(path = %output.display(), %err, "failed to write report"),
        }
    }

    Ok(())
}

fn record(
    opts: &Opts,
    system: &mut System,
    series: &mut [Series],
    raw: bool,
) -> io::Result<Vec<chrono::DateTime<chrono::Local>>> {
    let interval = Duration::from_secs(opts.interval);
    let deadline = opts.time.map(|t| Instant::now() + *t);
    let mut timestamps = vec![];
    let mut stdout = io::stdout();

    loop {
        if opts.count.map_or(false, |count| timestamps.len() >= count) {
            break;
        }
        if deadline.map_or(false, |deadline| Instant::now() >= deadline) {
            break;
        }
        if !wait(interval, raw)? {
            break;
        }

        let now = chrono::Local::now();
        timestamps.push(now);
        execute!(stdout, Print(now.format("[%H:%M:%S]")))?;

        for s in series.iter_mut() {
            let sample = match s.category {
                Category::Gpu => system.gpu_temperature(s.index),
                Category::Cpu => system.cpu_temperature().map(|t| t as f32),
            };
            print_sample(&mut stdout, s, &sample)?;
            s.values.push(sample.ok());
        }

        execute!(stdout, Print("\r\n"))?;
    }

    Ok(timestamps)
}

fn print_sample(stdout: &mut Stdout, s: &Series, sample: &Result<f32, Error>) -> io::Result<()> {
    let text = match sample {
        Ok(t) => format!("{:.2}°C", t),
        Err(err) => err.to_string(),
    };
    execute!(
        stdout,
        Print(format!(" / {} ", &s.label)),
        SetForegroundColor(s.category.color()),
        Print(text),
        ResetColor
    )
}

/// Sleeps for `timeout`, returning `false` when the user asked to stop.
///
/// Keys are only watched while the terminal is in raw mode.
fn wait(timeout: Duration, raw: bool) -> io::Result<bool> {
    if !raw {
        std::thread::sleep(timeout);
        return Ok(true);
    }
    let until = Instant::now() + timeout;
    loop {
        let now = Instant::now();
        if now >= until {
            return Ok(true);
        }
        if event::poll(until - now)? {
            if let Event::Key(KeyEvent {
                code, modifiers, ..
            }) = event::read()?
            {
                match code {
                    KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                        return Ok(false)
                    }
                    KeyCode::Char('q') | KeyCode::Esc => return Ok(false),
                    _ => {}
                }
            }
        }
    }
}
