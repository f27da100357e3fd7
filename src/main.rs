use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use causerie::audio::FrameCapture;
use causerie::{Assistant, Config};

/// Causerie - voice-driven conversational assistant
#[derive(Parser)]
#[command(name = "causerie", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Create the documents folder with starter instructions
    InitDocs,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,causerie=info",
        1 => "info,causerie=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load()?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(cmd) = cli.command {
        return match cmd {
            Command::TestMic { duration } => test_mic(&config, duration).await,
            Command::InitDocs => init_docs(&config),
        };
    }

    tracing::info!(
        sample_rate = config.audio.sample_rate,
        frame_duration_ms = config.audio.frame_duration_ms,
        max_silence_ms = config.audio.max_silence_ms,
        "starting causerie"
    );

    let assistant = Assistant::new(config).await?;
    assistant.run().await?;

    Ok(())
}

/// Test microphone input
#[allow(clippy::future_not_send)]
async fn test_mic(config: &Config, duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut capture = FrameCapture::new(config.audio.sample_rate, config.audio.frame_duration_ms)?;
    let frames = capture.start()?;

    println!("Sample rate: {} Hz", config.audio.sample_rate);
    println!("---");

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let mut samples: Vec<f32> = Vec::new();
        while let Ok(frame) = frames.try_recv() {
            samples.extend(frame.samples().iter().map(|&s| f32::from(s) / 32768.0));
        }

        let energy = calculate_rms(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        // Visual meter
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "█".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!(
            "[{:2}s] RMS: {:.4} | Peak: {:.4} | [{}]",
            i + 1,
            energy,
            peak,
            meter
        );
    }

    capture.stop();

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    println!("If RMS stayed near 0, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: pactl info | grep 'Default Source'");
    println!("  3. Run: arecord -l (to list devices)");
    println!("  4. Try: pavucontrol (to check levels)");

    Ok(())
}

/// Calculate RMS energy
#[allow(clippy::cast_precision_loss)]
fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Create the documents folder with a starter README
fn init_docs(config: &Config) -> anyhow::Result<()> {
    let dir = &config.knowledge.documents_dir;

    if dir.exists() {
        println!("Documents folder already exists: {}", dir.display());
    } else {
        std::fs::create_dir_all(dir)?;
        println!("Created documents folder: {}", dir.display());
    }

    let readme = dir.join("README.txt");
    if !readme.exists() {
        std::fs::write(
            &readme,
            "Drop plain-text (.txt) documents in this folder.\n\
             \n\
             On startup the assistant chunks and embeds them, then pulls the\n\
             most relevant passages into its replies. Embeddings are cached,\n\
             so re-runs only pay for new or changed content after you delete\n\
             the cache file.\n\
             \n\
             Tips:\n\
             - One topic per file works best.\n\
             - Keep files reasonably small; they are split into ~300-word chunks.\n\
             - Remove this file if you don't want it searched.\n",
        )?;
        println!("Wrote starter instructions: {}", readme.display());
    }

    println!("\nSet OPENAI_API_KEY and run `causerie` to start a session.");
    Ok(())
}
