use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use hr_voice_assistant::audio::{CaptureBackendFactory, CaptureSource};
use hr_voice_assistant::audio::segmenter::{
    SegmenterConfig, SegmenterControl, SegmenterMode, VoiceActivitySegmenter,
};
use hr_voice_assistant::config::{Config, Secrets, SttProvider, TtsProvider};
use hr_voice_assistant::conversation::ConversationLoop;
use hr_voice_assistant::corpus::{FaqCorpus, KnowledgeCorpus, KnowledgeRetriever};
use hr_voice_assistant::gateway::{
    http_client, CompletionGateway, ElevenLabsStt, ElevenLabsTts, GeminiCompletion, GeminiStt,
    LanguageGate, RetryPolicy, SynthesisGateway, TranscriptionGateway, VoiceCache,
};
use hr_voice_assistant::matcher::FaqMatcher;
use hr_voice_assistant::resolver::AnswerResolver;
use hr_voice_assistant::session::{RollingHistory, SessionRecorder};

#[derive(Parser, Debug)]
#[command(name = "hr-voice-assistant", about = "Voice-driven HR assistant")]
struct Args {
    /// Config file path (without extension, e.g. config/assistant)
    #[arg(long, default_value = "config/assistant")]
    config: String,

    /// Replay a WAV file instead of capturing from a microphone
    #[arg(long)]
    input_wav: Option<String>,

    /// Manual turn taking: press Enter to end a turn, type "stop" to quit
    #[arg(long)]
    manual: bool,

    /// Keep the per-turn scratch log after the manifest is written
    #[arg(long)]
    keep_scratch: bool,

    /// Skip audio playback of answers
    #[arg(long)]
    no_playback: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let config = Config::load(&args.config).context("loading configuration")?;
    let secrets = Secrets::from_env();
    info!(service = %config.service.name, "starting");

    let faq = FaqCorpus::load(&config.storage.faq_json).context("loading FAQ corpus")?;
    let knowledge =
        KnowledgeCorpus::load(&config.storage.knowledge_json).context("loading knowledge corpus")?;
    let voice_cache = VoiceCache::load(&config.storage.voice_answers_dir);
    info!(
        faq_entries = faq.len(),
        knowledge_chunks = knowledge.len(),
        prebuilt_voices = voice_cache.len(),
        "corpora loaded"
    );

    let client = http_client(config.providers.request_timeout_secs)?;
    let gate = LanguageGate::from_config(&config.language);

    let transcription: Arc<dyn TranscriptionGateway> = match config.providers.stt {
        SttProvider::ElevenLabs => Arc::new(ElevenLabsStt::new(
            client.clone(),
            secrets.require_elevenlabs()?,
            config.providers.stt_model.clone(),
            gate.clone(),
        )),
        SttProvider::Gemini => Arc::new(GeminiStt::new(
            client.clone(),
            secrets.require_gemini()?,
            config.providers.stt_model.clone(),
            gate.clone(),
        )),
    };
    let completion: Arc<dyn CompletionGateway> = Arc::new(GeminiCompletion::new(
        client.clone(),
        secrets.require_gemini()?,
        config.providers.completion_model.clone(),
    ));
    let synthesis: Arc<dyn SynthesisGateway> = match config.providers.tts {
        TtsProvider::ElevenLabs => Arc::new(ElevenLabsTts::new(
            client,
            secrets.require_elevenlabs()?,
            config.providers.tts_model.clone(),
            config.providers.tts_voice_id.clone(),
            config.language.code.clone(),
        )),
    };

    let retry = RetryPolicy::from_settings(&config.retry);
    let resolver = AnswerResolver::new(
        FaqMatcher::new(config.matching.faq_confidence_threshold),
        KnowledgeRetriever::new(),
        completion,
        retry.clone(),
        RollingHistory::new(config.storage.history_turns),
        config.retrieval.top_k,
    );
    let recorder = SessionRecorder::new(
        &config.storage.conversations_dir,
        args.keep_scratch || config.storage.keep_scratch,
    );

    let source = match &args.input_wav {
        Some(path) => CaptureSource::File(path.clone()),
        None => CaptureSource::Microphone,
    };
    let mut backend = CaptureBackendFactory::create(source, config.audio.frame_duration_ms)?;
    let frames = backend.start().await.context("starting audio capture")?;

    let mode = if args.manual {
        SegmenterMode::Manual
    } else {
        SegmenterMode::Auto
    };
    let control = SegmenterControl::new();
    let segmenter = VoiceActivitySegmenter::new(
        SegmenterConfig::from_settings(&config.segmenter, config.audio.frame_duration_ms, mode),
        control.clone(),
        frames,
    );

    spawn_ctrl_c_handler(control.clone());
    if args.manual {
        spawn_stdin_handler(control.clone());
    }

    let session = ConversationLoop::new(
        segmenter,
        transcription,
        resolver,
        synthesis,
        voice_cache,
        recorder,
        retry,
        faq,
        knowledge,
        !args.no_playback,
    )
    .run()
    .await?;

    backend.stop().await?;
    info!(
        session = %session.id,
        turns = session.turns.len(),
        dir = %session.root.display(),
        "session complete"
    );
    Ok(())
}

fn spawn_ctrl_c_handler(control: SegmenterControl) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, stopping after current frame");
            control.request_stop();
        }
    });
}

/// Manual mode: an empty line closes the current turn, "stop" ends the
/// session.
fn spawn_stdin_handler(control: SegmenterControl) {
    use tokio::io::AsyncBufReadExt;
    tokio::spawn(async move {
        let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().eq_ignore_ascii_case("stop") => {
                    control.request_stop();
                    break;
                }
                Ok(Some(_)) => control.signal_end_turn(),
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "stdin read failed, leaving manual control");
                    break;
                }
            }
        }
    });
}
