//! Pretty-mode display logic for the title-harvest CLI.
//!
//! Spinner, header, result table and summary for `--pretty`. Uses only the
//! `console` crate. Everything transient goes to stderr so stdout stays clean.

use console::{pad_str, style, Alignment, Term};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use title_harvest_lib::{HarvestConfig, HarvestStats, ResultSet};

// ── Spinner ──────────────────────────────────────────────────────────────────

const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// An async braille-dot spinner that writes to stderr.
pub struct Spinner {
    running: Arc<AtomicBool>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl Spinner {
    /// Start a new spinner, or a no-op one when stderr is not a terminal.
    pub fn start(message: String) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        if !Term::stderr().is_term() {
            return Self {
                running,
                handle: None,
            };
        }

        let running_clone = running.clone();
        let handle = tokio::spawn(async move {
            let term = Term::stderr();
            let mut idx = 0usize;
            while running_clone.load(Ordering::Relaxed) {
                let frame = SPINNER_FRAMES[idx % SPINNER_FRAMES.len()];
                let _ = term.clear_line();
                let _ = term.write_str(&format!("{} {}", style(frame).cyan(), message));
                idx += 1;
                tokio::time::sleep(Duration::from_millis(80)).await;
            }
            let _ = term.clear_line();
        });

        Self {
            running,
            handle: Some(handle),
        }
    }

    /// Stop the spinner and clear the line.
    pub async fn stop(mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(h) = self.handle.take() {
            let _ = h.await;
        }
    }
}

// ── Header ───────────────────────────────────────────────────────────────────

pub fn print_header(task_count: usize, config: &HarvestConfig) {
    println!(
        "{} {} {}",
        style("title-harvest").bold(),
        style(format!("v{}", env!("CARGO_PKG_VERSION"))).dim(),
        style(format!(
            "· fetching {} URL{}",
            task_count,
            if task_count == 1 { "" } else { "s" }
        ))
        .dim(),
    );

    let mut meta_parts = vec![format!("Strategy: {}", config.strategy)];
    match config.concurrency {
        Some(limit) => meta_parts.push(format!("Concurrency: {}", limit)),
        None => meta_parts.push("Concurrency: unbounded".to_string()),
    }
    if let Some(timeout) = config.timeout {
        meta_parts.push(format!("Timeout: {:?}", timeout));
    }

    println!("{}", style(meta_parts.join(" | ")).dim());
    println!();
}

// ── Results ──────────────────────────────────────────────────────────────────

/// One aligned line per entry, sorted by URL.
pub fn print_results(results: &ResultSet) {
    let url_width = results
        .iter_sorted()
        .map(|(url, _)| url.chars().count())
        .max()
        .unwrap_or(0)
        .min(50);

    for (url, title) in results.iter_sorted() {
        let padded_url = pad_str(url, url_width, Alignment::Left, Some(".."));
        if title.is_empty() {
            println!("  {}  {}", style(&padded_url).white(), style("(no title)").dim());
        } else {
            println!("  {}  {}", style(&padded_url).white(), style(title).green());
        }
    }
}

// ── Summary ──────────────────────────────────────────────────────────────────

pub fn print_summary(results: &ResultSet, stats: &HarvestStats) {
    println!();
    let mut parts = vec![
        format!("{} entries", style(results.len()).bold()),
        format!("{} fetched", style(stats.fetched).green()),
    ];
    if stats.fetch_failures > 0 {
        parts.push(format!("{} failed", style(stats.fetch_failures).red()));
    }
    if stats.untitled > 0 {
        parts.push(format!("{} untitled", style(stats.untitled).yellow()));
    }

    println!(
        "{} {}  {}",
        style("Summary:").bold(),
        parts.join(", "),
        style(format!("in {:.1}s", stats.elapsed.as_secs_f64())).dim(),
    );
}
