use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use voiced::intent::builtin;
use voiced::voice::{AudioPlayback, Feedback, Listener, SpeechPipeline};
use voiced::{Config, Daemon, IntentRegistry, Sound};

/// voiced - Voice-activated command dispatcher
#[derive(Parser)]
#[command(name = "voiced", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Listen once and print what was recognized
    Listen {
        /// Transcribe freely instead of recognizing an intent
        #[arg(long)]
        open: bool,
        /// Seconds to wait for speech (defaults to the configured timeout)
        #[arg(short, long)]
        timeout: Option<u64>,
    },
    /// Play a cue sound (ack, question, error)
    TestSound {
        /// Sound to play
        #[arg(default_value = "ack")]
        sound: Sound,
    },
    /// Say text out loud
    Say {
        /// Text to speak
        text: String,
    },
    /// List registered intents in match order
    Intents,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,voiced=info",
        1 => "info,voiced=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load()?;
    tracing::debug!(?config, "loaded configuration");

    let mut intents = IntentRegistry::new();
    builtin::register_all(&mut intents, &config);

    if let Some(cmd) = cli.command {
        return match cmd {
            Command::Listen { open, timeout } => listen(&config, open, timeout).await,
            Command::TestSound { sound } => test_sound(&config, sound).await,
            Command::Say { text } => say(&config, &text).await,
            Command::Intents => {
                list_intents(&intents);
                Ok(())
            }
        };
    }

    preflight(&config);

    let daemon = Daemon::new(&config, intents);
    daemon.run().await?;

    Ok(())
}

/// Warn about external programs that aren't installed
fn preflight(config: &Config) {
    for program in config.programs() {
        match which::which(program) {
            Ok(path) => tracing::debug!(program, path = %path.display(), "found program"),
            Err(e) => tracing::warn!(program, error = %e, "program not found, interactions will fail"),
        }
    }
}

/// Listen once and print the recognition
async fn listen(config: &Config, open: bool, timeout: Option<u64>) -> anyhow::Result<()> {
    let timeout = timeout.map_or(config.listen.timeout, Duration::from_secs);
    let pipeline = SpeechPipeline::new(config.listen.clone());

    let mut handle = pipeline.start_listening(open, timeout).await?;
    println!("Listening for {}s...", timeout.as_secs());

    let outcome = handle.result().await;
    handle.cancel().await;

    match outcome? {
        Some(response) => println!("{}", serde_json::to_string_pretty(&response)?),
        None => println!("no speech"),
    }

    Ok(())
}

/// Play a cue sound
async fn test_sound(config: &Config, sound: Sound) -> anyhow::Result<()> {
    println!("Playing {sound} ({})", config.sounds.path(sound).display());
    AudioPlayback::new(config.sounds.clone()).play(sound).await?;
    Ok(())
}

/// Speak text
async fn say(config: &Config, text: &str) -> anyhow::Result<()> {
    AudioPlayback::new(config.sounds.clone()).speak(text).await?;
    Ok(())
}

/// Print the dispatch table
fn list_intents(intents: &IntentRegistry) {
    for (position, entry) in intents.iter().enumerate() {
        println!("{:2}. {entry}", position + 1);
    }
}
