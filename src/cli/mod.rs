//! Command-line interface
//!
//! Runs the scoring server or scores a batch of deltas locally.

use clap::{Parser, Subcommand};
use colored::*;
use std::time::Instant;

use crate::anomaly::scorer::{self, ANOMALY_THRESHOLD, CONTAMINATION, N_ESTIMATORS};
use crate::server::IsolationResponse;

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn muted(s: &str) -> ColoredString { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString    { s.truecolor(100, 210, 120) }
fn alert(s: &str) -> ColoredString { s.truecolor(235, 110, 100) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }
fn line_box_sep()    { println!("  {}", dim("├─────────────────────────────────────────────────────────┤")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn line_box_center(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let total_pad = W.saturating_sub(visible_len);
    let left = total_pad / 2;
    let right = total_pad - left;
    println!("  {}  {}{}{} {}", dim("│"), " ".repeat(left), content, " ".repeat(right), dim("│"));
}

fn line_box_empty() { line_box(""); }

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "delta-anomaly")]
#[command(author = "KolosalAI")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Isolation Forest anomaly scoring for elapsed-time deltas")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP scoring server
    Serve {
        /// Port to listen on (defaults to API_PORT or 8001)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind (defaults to API_HOST or 0.0.0.0)
        #[arg(long)]
        host: Option<String>,
    },

    /// Score a batch of deltas without starting the server
    Score {
        /// Delta times to score
        #[arg(required = true, num_args = 1.., allow_negative_numbers = true)]
        values: Vec<f64>,

        /// Print the same JSON the HTTP endpoint returns
        #[arg(long)]
        json: bool,
    },
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub async fn cmd_serve(host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    use crate::server::{run_server, ServerConfig};

    let defaults = ServerConfig::default();
    let config = ServerConfig {
        host: host.unwrap_or(defaults.host),
        port: port.unwrap_or(defaults.port),
        ..defaults
    };

    println!();
    line_box_top();
    line_box_empty();
    line_box_center(&format!("{}", "Delta Anomaly".white().bold()));
    line_box_center(&format!("{}", dim(&format!("v{}", env!("CARGO_PKG_VERSION")))));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box(&kv("Score  ", &format!("POST http://{}:{}/ai/isolation-forest", config.host, config.port)));
    line_box(&kv("Health ", &format!("GET  http://{}:{}/health", config.host, config.port)));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box_center(&format!("{}", dim("ctrl+c to stop")));
    line_box_empty();
    line_box_bottom();
    println!();

    run_server(config).await
}

pub fn cmd_score(values: &[f64], json: bool) -> anyhow::Result<()> {
    let start = Instant::now();
    let report = scorer::detect(values)?;
    let elapsed = start.elapsed();

    if json {
        println!("{}", serde_json::to_string(&IsolationResponse::from(report))?);
        return Ok(());
    }

    let verdict = if report.is_anomaly {
        alert("anomaly").bold()
    } else {
        ok("normal").bold()
    };

    println!();
    line_box_top();
    line_box_empty();
    line_box(&kv("Samples       ", &values.len().to_string()));
    line_box(&kv("Trees         ", &N_ESTIMATORS.to_string()));
    line_box(&kv("Contamination ", &format!("{:.2}", CONTAMINATION)));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box(&kv("Anomaly score ", &format!("{:.6}", report.anomaly_score)));
    line_box(&kv("Threshold     ", &format!("{:.2}", ANOMALY_THRESHOLD)));
    line_box(&format!("{} {}", muted("Verdict       "), verdict));
    line_box_empty();
    line_box_bottom();
    println!("  {}", dim(&format!("scored in {:.1?}", elapsed)));
    println!();

    Ok(())
}
