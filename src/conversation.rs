//! The conversation loop: capture, transcribe, resolve, speak, persist.
//!
//! One loop instance drives one session. Capture and storage faults end the
//! session; service faults degrade the affected turn and the loop moves on.
//! Finalize runs on every exit path so the manifest is always written.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::audio::file::write_wav;
use crate::audio::segmenter::{Utterance, VoiceActivitySegmenter};
use crate::corpus::{FaqCorpus, KnowledgeCorpus};
use crate::error::{Result, ServiceKind};
use crate::gateway::{
    play_best_effort, with_retries, RetryPolicy, SynthesisGateway, Transcript,
    TranscriptionGateway, VoiceCache,
};
use crate::resolver::{AnswerResolver, Resolution};
use crate::session::{AnswerSource, Session, SessionRecorder, Turn, VoiceSource};

pub struct ConversationLoop {
    segmenter: VoiceActivitySegmenter,
    transcription: Arc<dyn TranscriptionGateway>,
    resolver: AnswerResolver,
    synthesis: Arc<dyn SynthesisGateway>,
    voice_cache: VoiceCache,
    recorder: SessionRecorder,
    retry: RetryPolicy,
    faq: FaqCorpus,
    knowledge: KnowledgeCorpus,
    playback: bool,
}

/// How a turn's audio was produced, plus the artifact path if one exists.
struct SpokenAnswer {
    voice_source: VoiceSource,
    output_audio_path: Option<String>,
}

impl ConversationLoop {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        segmenter: VoiceActivitySegmenter,
        transcription: Arc<dyn TranscriptionGateway>,
        resolver: AnswerResolver,
        synthesis: Arc<dyn SynthesisGateway>,
        voice_cache: VoiceCache,
        recorder: SessionRecorder,
        retry: RetryPolicy,
        faq: FaqCorpus,
        knowledge: KnowledgeCorpus,
        playback: bool,
    ) -> Self {
        Self {
            segmenter,
            transcription,
            resolver,
            synthesis,
            voice_cache,
            recorder,
            retry,
            faq,
            knowledge,
            playback,
        }
    }

    /// Run the session to completion. The manifest is finalized on every
    /// exit path; when both the loop and finalize fail, the loop error wins.
    pub async fn run(mut self) -> Result<Session> {
        let mut session = self.recorder.begin()?;
        let outcome = self.drive(&mut session).await;

        let finalized = self.recorder.finalize(&mut session);
        match (outcome, finalized) {
            (Ok(()), Ok(())) => Ok(session),
            (Err(e), _) => {
                error!(error = %e, "session ended on fault");
                Err(e)
            }
            (Ok(()), Err(e)) => Err(e),
        }
    }

    async fn drive(&mut self, session: &mut Session) -> Result<()> {
        loop {
            let utterance = match self.segmenter.next_utterance().await? {
                Some(utterance) => utterance,
                None => {
                    info!(session = %session.id, "capture ended, closing session");
                    return Ok(());
                }
            };
            info!(
                duration_ms = utterance.duration_ms(),
                likely_noise = utterance.likely_noise,
                "utterance captured"
            );

            let transcript = self.transcribe(&utterance).await;
            if transcript.empty {
                info!("empty or non-Armenian transcript, no turn recorded");
                continue;
            }
            info!(text = %transcript.text, "user said");

            let turn_index = session.next_turn_index();
            let input_path = self.recorder.input_audio_slot(session, turn_index);
            write_wav(&input_path, &utterance.samples, utterance.sample_rate)?;

            let resolution = self
                .resolver
                .resolve(&transcript.text, &self.faq, &self.knowledge, &session.turns)
                .await?;
            info!(
                source = ?resolution.source,
                fallback = resolution.fallback,
                "answer resolved"
            );

            let spoken = self.speak(session, turn_index, &resolution).await?;

            let turn = Turn {
                index: turn_index,
                user_text: transcript.text,
                assistant_text: resolution.answer_text,
                answer_source: resolution.source,
                voice_source: spoken.voice_source,
                faq_id: resolution.faq_id,
                match_score: resolution.match_score,
                fallback: resolution.fallback,
                input_audio_path: relative_to_session(session, &input_path),
                output_audio_path: spoken.output_audio_path,
                timestamp: chrono::Utc::now(),
            };
            self.recorder.append_turn(session, turn)?;
        }
    }

    /// Transcribe with retries. An exhausted retry budget degrades to an
    /// empty transcript so the session survives a flaky transcription
    /// service.
    async fn transcribe(&self, utterance: &Utterance) -> Transcript {
        let result = with_retries(&self.retry, "transcription", || {
            let transcription = Arc::clone(&self.transcription);
            async move { transcription.transcribe(utterance).await }
        })
        .await;

        match result {
            Ok(transcript) => transcript,
            Err(err) => {
                warn!(error = %err, "transcription failed past retries, treating as silence");
                Transcript {
                    text: String::new(),
                    language: String::new(),
                    empty: true,
                }
            }
        }
    }

    /// Voice the answer: prebuilt cache for FAQ answers, fresh synthesis
    /// otherwise. Synthesis faults degrade the turn to text-only; storage
    /// faults are fatal. Playback is best effort and never fails the turn.
    async fn speak(
        &self,
        session: &Session,
        turn_index: u32,
        resolution: &Resolution,
    ) -> Result<SpokenAnswer> {
        let output_path = self.recorder.output_audio_slot(session, turn_index);

        if resolution.source == AnswerSource::Faq {
            if let Some(faq_id) = resolution.faq_id {
                if let Some(cached) = self.voice_cache.lookup(faq_id, &resolution.answer_text) {
                    std::fs::copy(&cached, &output_path)
                        .map_err(|e| crate::error::AssistantError::storage(&output_path, e))?;
                    info!(faq_id, "served prebuilt voice answer");
                    if self.playback {
                        play_best_effort(&output_path).await;
                    }
                    return Ok(SpokenAnswer {
                        voice_source: VoiceSource::FaqPrebuilt,
                        output_audio_path: Some(relative_to_session(session, &output_path)),
                    });
                }
            }
        }

        let synthesized = with_retries(&self.retry, "synthesis", || {
            let synthesis = Arc::clone(&self.synthesis);
            let text = resolution.answer_text.clone();
            async move { synthesis.synthesize(&text).await }
        })
        .await;

        let audio = match synthesized {
            Ok(audio) => audio,
            Err(err) if err.service_kind() == Some(ServiceKind::Synthesis) => {
                warn!(error = %err, "synthesis failed past retries, turn is text-only");
                return Ok(SpokenAnswer {
                    voice_source: VoiceSource::TextOnly,
                    output_audio_path: None,
                });
            }
            Err(err) => return Err(err),
        };

        std::fs::write(&output_path, &audio)
            .map_err(|e| crate::error::AssistantError::storage(&output_path, e))?;
        if self.playback {
            play_best_effort(&output_path).await;
        }

        let voice_source = match resolution.source {
            AnswerSource::Faq => VoiceSource::TtsGeneratedFromFaq,
            AnswerSource::Generated => VoiceSource::TtsGenerated,
        };
        Ok(SpokenAnswer {
            voice_source,
            output_audio_path: Some(relative_to_session(session, &output_path)),
        })
    }
}

/// Manifest paths are relative to the session directory so the directory
/// stays relocatable.
fn relative_to_session(session: &Session, path: &std::path::Path) -> String {
    path.strip_prefix(&session.root)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}
