//! GradeCtl - Command line client for the GradeSim API
//!
//! Usage:
//!   gradectl attend MHS001          - Record attendance (strong)
//!   gradectl score MHS001 90        - Submit a task score (weak)
//!   gradectl show MHS001            - Read a student across all models
//!   gradectl log                    - Show the event log
//!   gradectl watch MHS001           - Watch a student's view change over time

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::Deserialize;
use serde_json::{json, Value};

/// GradeSim Control Tool
#[derive(Parser)]
#[command(name = "gradectl")]
#[command(about = "Drive and observe a GradeSim server", long_about = None)]
struct Cli {
    /// API endpoint to connect to
    #[arg(short, long, default_value = "http://127.0.0.1:3000")]
    endpoint: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record attendance (strong consistency)
    Attend {
        student_id: String,
        /// Record the student as absent
        #[arg(long)]
        absent: bool,
    },
    /// Submit a task score (weak consistency)
    Score {
        student_id: String,
        score: f64,
    },
    /// Show a student's view across all three models
    Show {
        student_id: String,
    },
    /// Show the event log, newest first
    Log {
        /// Maximum entries to print
        #[arg(short, long, default_value_t = 50)]
        limit: usize,
    },
    /// Poll a student's view and print every change (Ctrl+C to exit)
    Watch {
        student_id: String,
        /// Poll interval in milliseconds
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
    },
}

// ============ API Response Types ============

#[derive(Debug, Deserialize)]
struct AttendanceReceipt {
    message: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct ScoreReceipt {
    message: String,
    #[serde(default)]
    score_received: Value,
}

#[derive(Debug, Deserialize, PartialEq)]
struct StudentView {
    #[serde(rename = "studentId")]
    student_id: String,
    kehadiran: String,
    nilai_tugas: Value,
    nilai_akhir: String,
}

#[derive(Debug, Deserialize)]
struct EventEntry {
    timestamp: String,
    #[serde(rename = "type")]
    kind: String,
    message: String,
    #[serde(default)]
    details: HashMap<String, Value>,
}

// ============ Main ============

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let endpoint = cli.endpoint.trim_end_matches('/').to_string();

    let result = match &cli.command {
        Commands::Attend { student_id, absent } => attend(&endpoint, student_id, !*absent).await,
        Commands::Score { student_id, score } => submit_score(&endpoint, student_id, *score).await,
        Commands::Show { student_id } => show(&endpoint, student_id).await,
        Commands::Log { limit } => show_log(&endpoint, *limit).await,
        Commands::Watch { student_id, interval_ms } => {
            watch(&endpoint, student_id, Duration::from_millis(*interval_ms)).await
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

// ============ Commands ============

async fn attend(endpoint: &str, student_id: &str, is_present: bool) -> Result<(), Box<dyn std::error::Error>> {
    let url = format!("{}/api/strong/kehadiran", endpoint);
    let client = reqwest::Client::new();

    let response = client
        .post(&url)
        .json(&json!({ "studentId": student_id, "isPresent": is_present }))
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(format!("API error: {}", response.status()).into());
    }

    let receipt: AttendanceReceipt = response.json().await?;
    println!("{}", receipt.message);
    println!("{}: {}", student_id, receipt.status);

    Ok(())
}

async fn submit_score(endpoint: &str, student_id: &str, score: f64) -> Result<(), Box<dyn std::error::Error>> {
    let url = format!("{}/api/weak/nilai_tugas", endpoint);
    let client = reqwest::Client::new();

    let response = client
        .post(&url)
        .json(&json!({ "studentId": student_id, "score": score }))
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(format!("API error: {}", response.status()).into());
    }

    let receipt: ScoreReceipt = response.json().await?;
    println!("{}", receipt.message);
    println!("Score received: {}", receipt.score_received);

    Ok(())
}

/// `{endpoint}/api/data/{student_id}` with the id percent-encoded as one path segment
fn student_url(endpoint: &str, student_id: &str) -> Result<reqwest::Url, Box<dyn std::error::Error>> {
    let mut url = reqwest::Url::parse(endpoint)?;
    url.path_segments_mut()
        .map_err(|_| format!("endpoint {} cannot carry a path", endpoint))?
        .pop_if_empty()
        .extend(["api", "data"])
        .push(student_id);
    Ok(url)
}

async fn fetch_view(client: &reqwest::Client, endpoint: &str, student_id: &str) -> Result<StudentView, Box<dyn std::error::Error>> {
    let url = student_url(endpoint, student_id)?;
    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        return Err(format!("API error: {}", response.status()).into());
    }

    Ok(response.json().await?)
}

fn print_view(view: &StudentView) {
    println!("Student:      {}", view.student_id);
    println!("Kehadiran:    {}", view.kehadiran);
    println!("Nilai Tugas:  {}", display_value(&view.nilai_tugas));
    println!("Nilai Akhir:  {}", view.nilai_akhir);
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

async fn show(endpoint: &str, student_id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let client = reqwest::Client::new();
    let view = fetch_view(&client, endpoint, student_id).await?;

    println!();
    print_view(&view);
    println!();

    Ok(())
}

async fn show_log(endpoint: &str, limit: usize) -> Result<(), Box<dyn std::error::Error>> {
    let url = format!("{}/api/log", endpoint);
    let client = reqwest::Client::new();

    let response = client.get(&url).send().await?;

    if !response.status().is_success() {
        return Err(format!("API error: {}", response.status()).into());
    }

    let entries: Vec<EventEntry> = response.json().await?;

    println!();
    println!("{:<10} {:<22} {}", "TIME", "TYPE", "MESSAGE");
    println!("{}", "-".repeat(72));

    for entry in entries.iter().take(limit) {
        // Pad type to fixed width BEFORE adding color codes
        let kind_padded = format!("{:<22}", entry.kind);
        let kind_colored = match entry.kind.as_str() {
            "STRONG_WRITE" => format!("\x1b[32m{}\x1b[0m", kind_padded),
            k if k.starts_with("WEAK") => format!("\x1b[33m{}\x1b[0m", kind_padded),
            k if k.starts_with("EVENTUAL") => format!("\x1b[36m{}\x1b[0m", kind_padded),
            _ => kind_padded,
        };

        let student = entry
            .details
            .get("studentId")
            .map(|id| format!(" [{}]", display_value(id)))
            .unwrap_or_default();

        println!("{:<10} {} {}{}", entry.timestamp, kind_colored, entry.message, student);
    }
    println!();

    Ok(())
}

async fn watch(endpoint: &str, student_id: &str, interval: Duration) -> Result<(), Box<dyn std::error::Error>> {
    let client = reqwest::Client::new();

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    let started = std::time::Instant::now();
    let mut last: Option<StudentView> = None;

    println!("Watching {} every {:?} (Ctrl+C to exit)", student_id, interval);

    while running.load(Ordering::SeqCst) {
        match fetch_view(&client, endpoint, student_id).await {
            Ok(view) => {
                if last.as_ref() != Some(&view) {
                    println!();
                    println!("\x1b[1m+{:.1}s\x1b[0m", started.elapsed().as_secs_f64());
                    print_view(&view);
                    last = Some(view);
                }
            }
            Err(e) => eprintln!("Poll failed: {}", e),
        }

        tokio::time::sleep(interval).await;
    }

    println!();
    Ok(())
}
