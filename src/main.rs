use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use console::Emoji;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use anchorpub::{
    AnchorSession, Config, NoopReporter, Profile, ProfileError, ProgressEvent, ProgressReporter,
    ReqwestClient, SharedProgressReporter, run_batch,
};

// Emoji with fallback for terminals without Unicode support
static MICROPHONE: Emoji<'_, '_> = Emoji("🎙️  ", "");
static KEY: Emoji<'_, '_> = Emoji("🔑 ", "[~] ");
static HEADPHONES: Emoji<'_, '_> = Emoji("🎧 ", "[i] ");
static UPLOAD: Emoji<'_, '_> = Emoji("📤 ", "[^] ");
static HOURGLASS: Emoji<'_, '_> = Emoji("⏳ ", "[.] ");
static SUCCESS: Emoji<'_, '_> = Emoji("✅ ", "[+] ");
static SKIP: Emoji<'_, '_> = Emoji("⏭️  ", "[-] ");
static FAILURE: Emoji<'_, '_> = Emoji("❌ ", "[!] ");
static PARTY: Emoji<'_, '_> = Emoji("🎉 ", "[*] ");
static CROSS: Emoji<'_, '_> = Emoji("✗ ", "x ");

/// Upload local audio files to anchor.fm as draft episodes
#[derive(Parser, Debug)]
#[command(name = "anchorpub")]
#[command(about = "Upload local audio files to anchor.fm as draft episodes")]
#[command(version)]
struct Args {
    /// Path to the JSON configuration file
    #[arg(short, long)]
    config: PathBuf,

    /// Quiet mode - suppress progress output
    #[arg(short, long)]
    quiet: bool,
}

/// Log writer that hides progress bars while a line is printed
#[derive(Clone)]
struct LogWriter {
    multi: Option<MultiProgress>,
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &self.multi {
            Some(multi) => multi.suspend(|| std::io::stderr().write(buf)),
            None => std::io::stderr().write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        std::io::stderr().flush()
    }
}

/// Progress reporter using indicatif for terminal output
struct IndicatifReporter {
    multi: MultiProgress,
    main_bar: ProgressBar,
    upload_bar: Mutex<Option<ProgressBar>>,
}

impl IndicatifReporter {
    fn new(multi: MultiProgress) -> Self {
        let main_style = ProgressStyle::default_bar()
            .template("{spinner:.green} {wide_msg}")
            .unwrap();

        let main_bar = multi.add(ProgressBar::new_spinner());
        main_bar.set_style(main_style);
        main_bar.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            multi,
            main_bar,
            upload_bar: Mutex::new(None),
        }
    }

    fn start_upload_bar(&self) -> ProgressBar {
        let style = ProgressStyle::default_bar()
            .template(&format!(
                "  {UPLOAD}[{{bar:30.cyan/blue}}] {{bytes}}/{{total_bytes}} {{wide_msg}}"
            ))
            .unwrap()
            .progress_chars("█▓░");

        let bar = self.multi.add(ProgressBar::new(0));
        bar.set_style(style);
        if let Some(previous) = self.upload_bar.lock().unwrap().replace(bar.clone()) {
            previous.finish_and_clear();
        }
        bar
    }

    fn finish_upload_bar(&self) {
        if let Some(bar) = self.upload_bar.lock().unwrap().take() {
            bar.finish_and_clear();
        }
    }

    fn println(&self, line: String) {
        let _ = self.multi.println(line);
    }
}

impl ProgressReporter for IndicatifReporter {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::ProfileStarting {
                username,
                profile_index,
                total_profiles,
            } => {
                self.main_bar.set_message(format!(
                    "{KEY}[{}/{}] Logging in as {}",
                    (profile_index + 1).to_string().cyan(),
                    total_profiles.to_string().cyan(),
                    username.bold()
                ));
            }

            ProgressEvent::PlanReady {
                username,
                local_files,
                already_uploaded,
                to_upload,
            } => {
                self.main_bar.set_message(format!(
                    "{HEADPHONES}{} • {} local files, {} already uploaded, {} new",
                    username.bold().green(),
                    local_files.to_string().cyan(),
                    already_uploaded.to_string().yellow(),
                    to_upload.to_string().green()
                ));
            }

            ProgressEvent::FileSkipped { file_name, caption } => {
                self.println(format!(
                    "{SKIP}{} {}",
                    file_name.dimmed(),
                    format!("(matches \"{caption}\")").dimmed()
                ));
            }

            ProgressEvent::UploadStarting {
                title,
                file_index,
                total_to_upload,
            } => {
                let bar = self.start_upload_bar();
                bar.set_message(format!(
                    "[{}/{}] {}",
                    (file_index + 1).to_string().cyan(),
                    total_to_upload.to_string().cyan(),
                    truncate_title(&title, 40)
                ));
            }

            ProgressEvent::UploadProgress {
                bytes_sent,
                total_bytes,
                ..
            } => {
                if let Some(bar) = self.upload_bar.lock().unwrap().as_ref() {
                    if let Some(total) = total_bytes {
                        bar.set_length(total);
                    }
                    bar.set_position(bytes_sent);
                }
            }

            ProgressEvent::UploadCompleted { title, .. } => {
                self.finish_upload_bar();
                self.main_bar.set_message(format!(
                    "{HOURGLASS}Processing {}",
                    truncate_title(&title, 40).cyan()
                ));
            }

            ProgressEvent::WaitingForProcessing {
                title,
                state,
                attempt,
            } => {
                self.main_bar.set_message(format!(
                    "{HOURGLASS}{} • processing state {} (poll #{})",
                    truncate_title(&title, 40).cyan(),
                    state.yellow(),
                    attempt
                ));
            }

            ProgressEvent::WaitingForTransformation {
                title,
                status,
                attempt,
            } => {
                self.main_bar.set_message(format!(
                    "{HOURGLASS}{} • transformation {} (poll #{})",
                    truncate_title(&title, 40).cyan(),
                    status.yellow(),
                    attempt
                ));
            }

            ProgressEvent::DraftCreated { title } => {
                self.println(format!("{SUCCESS}{}", title.green()));
            }

            ProgressEvent::FileFailed { title, error } => {
                self.finish_upload_bar();
                self.println(format!(
                    "{FAILURE}{} - {}",
                    truncate_title(&title, 30).red(),
                    error.red()
                ));
            }

            ProgressEvent::ProfileFailed { username, error } => {
                self.println(format!("{FAILURE}{} - {}", username.red().bold(), error.red()));
            }

            ProgressEvent::BatchCompleted {
                published_count,
                skipped_count,
                failed_count,
                failed_profiles,
            } => {
                self.main_bar.finish_and_clear();
                println!(
                    "\n{PARTY}{} {} drafts created, {} skipped, {} failed, {} profiles failed",
                    "Run complete:".bold().green(),
                    published_count.to_string().green().bold(),
                    skipped_count.to_string().yellow(),
                    colorize_count(failed_count),
                    colorize_count(failed_profiles)
                );
            }
        }
    }
}

fn colorize_count(count: usize) -> colored::ColoredString {
    if count > 0 {
        count.to_string().red().bold()
    } else {
        count.to_string().green()
    }
}

fn truncate_title(title: &str, max_len: usize) -> String {
    if title.chars().count() <= max_len {
        title.to_string()
    } else {
        let truncated: String = title.chars().take(max_len.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}

fn init_logging(multi: Option<MultiProgress>) {
    let writer = LogWriter { multi };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "anchorpub=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(move || writer.clone()))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let multi = (!args.quiet).then(MultiProgress::new);
    init_logging(multi.clone());

    let config = Config::load(&args.config)
        .with_context(|| format!("Cannot use configuration file {}", args.config.display()))?;

    if !args.quiet {
        println!(
            "\n{}{} {}\n",
            MICROPHONE,
            "anchorpub".bold().magenta(),
            "- Draft Episode Uploader".dimmed()
        );
    }

    let reporter: SharedProgressReporter = match multi {
        Some(multi) => Arc::new(IndicatifReporter::new(multi)),
        None => NoopReporter::shared(),
    };

    let result = run_batch(
        &config,
        |_profile: &Profile| -> Result<AnchorSession<ReqwestClient>, ProfileError> {
            let client =
                ReqwestClient::with_timeouts(config.connect_timeout(), config.request_timeout())?;
            Ok(AnchorSession::new(client, config.base_url.as_str()))
        },
        reporter,
    )
    .await;

    if !args.quiet && !result.failed_profiles.is_empty() {
        println!("\n{}", "Failed profiles:".red().bold());
        for (username, error) in &result.failed_profiles {
            println!("  {}{} - {}", CROSS, username.yellow(), error.dimmed());
        }
    }

    if !args.quiet {
        let failed_files: Vec<_> = result
            .profiles
            .iter()
            .flat_map(|p| p.failed_files.iter())
            .collect();

        if !failed_files.is_empty() {
            println!("\n{}", "Failed files:".red().bold());
            for (path, error) in failed_files {
                println!("  {}{} - {}", CROSS, path.yellow(), error.dimmed());
            }
        }
        println!();
    }

    Ok(())
}
