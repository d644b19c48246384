//! Shopfront CLI - drives the identity verification flows from a terminal.
//!
//! # Event Loop
//!
//! Interactive commands run a fixed 100ms tick on a single-threaded runtime:
//!
//! 1. Wait for frame tick
//! 2. Drain typed lines (non-blocking via [`input::LinePump`])
//! 3. Advance the storefront (`storefront.tick(now)`)
//! 4. Print queued toasts
//! 5. Stop once the flow has navigated away from its screen

mod input;

use std::{
    fs::{self, OpenOptions},
    path::PathBuf,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use shopfront_api::HttpVerificationApi;
use shopfront_config::{ShopfrontConfig, config_dir};
use shopfront_engine::{
    ChannelKind, ChannelState, EmailVerifyState, FileSessionStore, MemorySessionStore, OtpContext,
    OtpPurpose, ResendStart, ResendState, Route, Services, SessionStore, Storefront,
    VerificationStatus,
};

use input::{Command as Input, LinePump};

const TICK: Duration = Duration::from_millis(100);

/// Placeholder value for channels described only by state on the command line.
const ON_FILE: &str = "on file";

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (log_file, init_warnings) = open_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // No log file: stay silent rather than interleave with the prompt.
    tracing_subscriber::registry().with(env_filter).init();
}

fn open_log_file() -> (Option<(PathBuf, fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&candidate)
        {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    // Primary: ~/.shopfront/logs/shopfront.log
    if let Some(dir) = config_dir() {
        candidates.push(dir.join("logs").join("shopfront.log"));
    }

    // Fallback: ./.shopfront/logs/shopfront.log
    candidates.push(PathBuf::from(".shopfront").join("logs").join("shopfront.log"));

    candidates
}

#[derive(Debug, Parser)]
#[command(name = "shopfront", version, about = "Verify your identity and check out")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Enter the one-time code sent to a mobile number.
    VerifyMobile {
        #[arg(long)]
        mobile: String,
        /// registration or login
        #[arg(long, default_value_t = OtpPurpose::Registration)]
        purpose: OtpPurpose,
    },
    /// Confirm an email address from the link in the confirmation email.
    VerifyEmail {
        #[arg(long)]
        link: String,
    },
    /// Try to place an order with the given profile channel states.
    Checkout {
        #[arg(long, default_value = "absent", value_parser = parse_state)]
        mobile: ChannelState,
        #[arg(long, default_value = "absent", value_parser = parse_state)]
        email: ChannelState,
    },
    /// Forget stored credentials.
    Logout,
}

fn parse_state(raw: &str) -> Result<ChannelState, String> {
    ChannelState::parse(raw)
        .ok_or_else(|| format!("unknown state '{raw}' (expected absent, unverified or verified)"))
}

fn profile_status(mobile: ChannelState, email: ChannelState) -> Result<VerificationStatus> {
    let mut status = VerificationStatus::new();
    for (kind, state) in [(ChannelKind::Mobile, mobile), (ChannelKind::Email, email)] {
        let channel = status.channel_mut(kind);
        if state != ChannelState::Absent {
            channel.register(ON_FILE)?;
        }
        if state.is_verified() {
            channel.mark_verified()?;
        }
    }
    Ok(status)
}

fn build_storefront(config: &ShopfrontConfig) -> Result<Storefront> {
    let settings = config.api_settings();
    let api = HttpVerificationApi::new(&settings)
        .with_context(|| format!("invalid backend URL {}", settings.base_url))?;
    let sessions: Arc<dyn SessionStore> = match config.session_path() {
        Some(path) => Arc::new(FileSessionStore::new(path)),
        None => {
            tracing::warn!("No home directory; session will not persist");
            Arc::new(MemorySessionStore::new())
        }
    };
    Ok(Storefront::new(
        Services::new(Arc::new(api), sessions),
        config.verification_settings(),
    ))
}

fn print_toasts(storefront: &mut Storefront) {
    for toast in storefront.take_toasts() {
        println!("[{}] {}", toast.level().as_str(), toast.message());
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = match ShopfrontConfig::load() {
        Ok(config) => config.unwrap_or_default(),
        Err(err) => {
            eprintln!("Warning: {err}; using defaults");
            ShopfrontConfig::default()
        }
    };
    let mut storefront = build_storefront(&config)?;

    match cli.command {
        Command::VerifyMobile { mobile, purpose } => {
            run_otp(&mut storefront, OtpContext::new(mobile, purpose)).await
        }
        Command::VerifyEmail { link } => run_email(&mut storefront, &link).await,
        Command::Checkout { mobile, email } => {
            let status = profile_status(mobile, email)?;
            run_checkout(storefront.with_status(status)).await
        }
        Command::Logout => {
            storefront.logout()?;
            print_toasts(&mut storefront);
            Ok(())
        }
    }
}

async fn run_otp(storefront: &mut Storefront, context: OtpContext) -> Result<()> {
    if let Err(err) = storefront.open_otp(context, Instant::now()) {
        print_toasts(storefront);
        bail!(err);
    }
    if let Some(otp) = storefront.otp() {
        println!(
            "Enter the 6-digit code sent to {} ('r' to resend, 'q' to quit).",
            otp.target().masked()
        );
    }

    let mut input = LinePump::new();
    let mut frames = tokio::time::interval(TICK);
    frames.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut last_resend = None;

    loop {
        frames.tick().await;

        for command in input.drain() {
            match command {
                Input::Quit => return Ok(()),
                Input::Resend => match storefront.resend_otp() {
                    Some(ResendStart::CoolingDown { remaining }) => {
                        println!("You can request a new code in {remaining}s.");
                    }
                    Some(ResendStart::AlreadySending) => println!("Already sending a new code."),
                    Some(ResendStart::Started | ResendStart::Closed) | None => {}
                },
                Input::Code(code) => {
                    storefront.input_otp(&code);
                    // Failures arrive as toasts
                    let _ = storefront.submit_otp();
                }
            }
        }

        storefront.tick(Instant::now());
        print_toasts(storefront);

        if storefront.route() != Route::VerifyOtp {
            println!("Continue at {}", storefront.route());
            return Ok(());
        }
        if input.is_closed() && storefront.otp().is_some_and(|otp| !otp.is_verify_in_flight()) {
            return Ok(());
        }

        let resend = storefront.otp().map(|otp| otp.resend_state());
        if resend != last_resend && resend == Some(ResendState::Ready) {
            println!("Didn't get a code? Type 'r' to resend.");
        }
        last_resend = resend;
    }
}

async fn run_email(storefront: &mut Storefront, link: &str) -> Result<()> {
    storefront.open_email_link(link);

    let mut frames = tokio::time::interval(TICK);
    frames.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut reported = false;

    loop {
        frames.tick().await;
        storefront.tick(Instant::now());
        print_toasts(storefront);

        let Some(verifier) = storefront.email() else {
            println!("Continue at {}", storefront.route());
            return Ok(());
        };
        match verifier.state() {
            EmailVerifyState::Loading => {}
            EmailVerifyState::Success { message } if !reported => {
                println!("{message}. Redirecting to login...");
                reported = true;
            }
            EmailVerifyState::Success { .. } => {}
            EmailVerifyState::Error { message } => bail!("{message}"),
        }
    }
}

async fn run_checkout(mut storefront: Storefront) -> Result<()> {
    if let Some(receipt) = storefront.checkout(|| "Order placed") {
        println!("{receipt}");
        return Ok(());
    }

    if let Some(prompt) = storefront.gate_prompt() {
        println!("Verify your mobile number or email address to place an order:");
        for line in prompt.describe() {
            println!("  - {line}");
        }
    }
    println!("Go to your profile to verify now? [y/N]");

    let mut input = LinePump::new();
    let answer = input.next_line().await.unwrap_or_default();
    if answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes") {
        storefront.confirm_gate();
        println!("Continue at {}", storefront.route());
    } else {
        storefront.dismiss_gate();
    }
    Ok(())
}
