use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use parking_lot::Mutex;
use tracing::info;

use cloud_speech::{
    RecognitionEvent, RecognitionRequest, RecognitionSession, STTError, SpeechConfig,
    TencentAsrTransport, TencentTTS, VoiceFormat, stream_audio,
};

/// Tencent Cloud speech client: signed TTS calls and streaming ASR sessions
#[derive(Parser, Debug)]
#[command(name = "cloud-speech")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Env file with TENCENT_SPEECH_APPID, TENCENT_SECRET_ID and TENCENT_SECRET_KEY
    #[arg(short = 'e', long = "env-file", value_name = "FILE")]
    env_file: Option<PathBuf>,

    /// Path to configuration file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE", conflicts_with = "env_file")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Synthesize text and save it as a WAV file
    Tts {
        #[arg(short = 't', long = "text")]
        text: String,

        #[arg(short = 'o', long = "output", default_value = "tencent_tts.wav")]
        output: PathBuf,

        #[arg(long = "voice-type")]
        voice_type: Option<i64>,
    },

    /// Stream an audio file to the recognizer and print sentence results
    Asr {
        #[arg(short = 'i', long = "input")]
        input: PathBuf,

        /// Engine model, e.g. 16k_zh or 16k_en
        #[arg(long = "engine", default_value = "16k_zh")]
        engine: String,

        /// Audio format of the input file
        #[arg(long = "format", default_value = "wav")]
        format: VoiceFormat,

        /// Split the file into chunks of this many bytes (whole file if unset)
        #[arg(long = "chunk-bytes")]
        chunk_bytes: Option<usize>,

        /// Delay between chunks in milliseconds
        #[arg(long = "pace-ms")]
        pace_ms: Option<u64>,
    },
}

fn load_config(cli: &Cli) -> anyhow::Result<SpeechConfig> {
    let config = match (&cli.config, &cli.env_file) {
        (Some(path), _) => SpeechConfig::from_file(path),
        (None, Some(path)) => SpeechConfig::from_env_file(path),
        (None, None) => SpeechConfig::from_env(),
    };
    config.context("Failed to load configuration")
}

async fn run_tts(
    config: &SpeechConfig,
    text: &str,
    output: &Path,
    voice_type: Option<i64>,
) -> anyhow::Result<()> {
    let mut tts_config = config.tts_config();
    if let Some(voice_type) = voice_type {
        tts_config = tts_config.with_voice_type(voice_type);
    }

    let tts = TencentTTS::new(config.credential(), tts_config)?;
    let frames = tts.synthesize_to_file(text, output).await?;
    println!("Saved {} frames to {}", frames, output.display());
    Ok(())
}

async fn run_asr(
    config: &SpeechConfig,
    input: &Path,
    request: RecognitionRequest,
    chunk_bytes: Option<usize>,
    pace: Option<Duration>,
) -> anyhow::Result<()> {
    let audio = tokio::fs::read(input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;

    let failure: Arc<Mutex<Option<STTError>>> = Arc::new(Mutex::new(None));
    let failure_slot = failure.clone();
    let listener = Arc::new(move |event: RecognitionEvent| match event {
        RecognitionEvent::SentenceEnd(result) => println!("ASR result: {}", result.text),
        RecognitionEvent::RecognitionComplete => info!("Recognition complete"),
        RecognitionEvent::Failed(error) => *failure_slot.lock() = Some(error),
        _ => {}
    });

    let mut session = RecognitionSession::new(
        Arc::new(TencentAsrTransport::new(config.asr_config())),
        config.credential(),
        request,
        listener,
    );

    session.start().await?;
    let written = match chunk_bytes {
        Some(size) => stream_audio(&mut session, &audio, size, pace).await,
        None => session.write(audio).await.map(|_| 1),
    };
    // Release the connection even when a write failed.
    session.stop().await?;
    let written = written?;
    info!("Sent {} chunk(s) from {}", written, input.display());

    match failure.lock().take() {
        Some(error) => Err(anyhow!("Recognition failed: {error}")),
        None => Ok(()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Initialize crypto provider for TLS connections
    // This must be done before any TLS connections are attempted
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install default crypto provider"))?;

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match &cli.command {
        Commands::Tts {
            text,
            output,
            voice_type,
        } => run_tts(&config, text, output, *voice_type).await,
        Commands::Asr {
            input,
            engine,
            format,
            chunk_bytes,
            pace_ms,
        } => {
            let request = RecognitionRequest::new(engine.as_str(), *format);
            let pace = pace_ms.map(Duration::from_millis);
            run_asr(&config, input, request, *chunk_bytes, pace).await
        }
    }
}
