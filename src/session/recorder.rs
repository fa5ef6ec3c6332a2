//! Session persistence: numbered conversation directories, per-turn
//! artifacts, a crash-tolerant scratch log, and the final manifest.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{info, warn};

use crate::error::{AssistantError, Result};
use crate::session::types::{Session, SessionManifest, Turn};

const SESSION_PREFIX: &str = "conversation-";
const INPUT_DIR: &str = "voice_input";
const OUTPUT_DIR: &str = "tts_output";
const MANIFEST_FILE: &str = "conversation.json";
const SCRATCH_FILE: &str = "session-scratch.jsonl";

/// Writes session artifacts under `<conversations_dir>/conversation-NNN/`.
pub struct SessionRecorder {
    conversations_dir: PathBuf,
    keep_scratch: bool,
}

impl SessionRecorder {
    pub fn new(conversations_dir: impl Into<PathBuf>, keep_scratch: bool) -> Self {
        Self {
            conversations_dir: conversations_dir.into(),
            keep_scratch,
        }
    }

    /// Create the next numbered session directory and its artifact
    /// subdirectories. Numbering scans existing directories for the highest
    /// suffix; creation fails-if-exists and retries, so two concurrent
    /// sessions never share a directory.
    pub fn begin(&self) -> Result<Session> {
        fs::create_dir_all(&self.conversations_dir)
            .map_err(|e| AssistantError::storage(&self.conversations_dir, e))?;

        let mut next = highest_session_number(&self.conversations_dir)? + 1;
        let root = loop {
            let candidate = self
                .conversations_dir
                .join(format!("{SESSION_PREFIX}{next:03}"));
            match fs::create_dir(&candidate) {
                Ok(()) => break candidate,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    next += 1;
                }
                Err(e) => return Err(AssistantError::storage(candidate, e)),
            }
        };

        for sub in [INPUT_DIR, OUTPUT_DIR] {
            let dir = root.join(sub);
            fs::create_dir(&dir).map_err(|e| AssistantError::storage(dir.clone(), e))?;
        }

        let id = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("{SESSION_PREFIX}{next:03}"));
        info!(session = %id, dir = %root.display(), "session started");

        Ok(Session {
            id,
            started_at: Utc::now(),
            ended_at: None,
            turns: Vec::new(),
            root,
        })
    }

    /// Absolute path for the next input recording (`voice_input/NNNN.wav`).
    pub fn input_audio_slot(&self, session: &Session, turn_index: u32) -> PathBuf {
        session.root.join(INPUT_DIR).join(format!("{turn_index:04}.wav"))
    }

    /// Absolute path for the next synthesized answer (`tts_output/NNNN.mp3`).
    pub fn output_audio_slot(&self, session: &Session, turn_index: u32) -> PathBuf {
        session.root.join(OUTPUT_DIR).join(format!("{turn_index:04}.mp3"))
    }

    /// Record a completed turn: append it to the scratch log, then to the
    /// in-memory session. The scratch log survives a crash before finalize.
    pub fn append_turn(&self, session: &mut Session, turn: Turn) -> Result<()> {
        let scratch = session.root.join(SCRATCH_FILE);
        let line = serde_json::to_string(&turn).map_err(|e| {
            AssistantError::storage(
                scratch.clone(),
                std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            )
        })?;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&scratch)
            .map_err(|e| AssistantError::storage(scratch.clone(), e))?;
        writeln!(file, "{line}").map_err(|e| AssistantError::storage(scratch, e))?;

        info!(
            session = %session.id,
            turn = turn.index,
            answer_source = ?turn.answer_source,
            voice_source = ?turn.voice_source,
            "turn recorded"
        );
        session.turns.push(turn);
        Ok(())
    }

    /// Write the manifest and close the session. Safe to call on every exit
    /// path; a session with zero turns still gets a manifest.
    pub fn finalize(&self, session: &mut Session) -> Result<()> {
        let ended_at = Utc::now();
        session.ended_at = Some(ended_at);

        let manifest = SessionManifest {
            conversation_id: session.id.clone(),
            started_at: session.started_at,
            ended_at,
            turn_count: session.turns.len(),
            turns: session.turns.clone(),
        };
        let path = session.root.join(MANIFEST_FILE);
        let json = serde_json::to_string_pretty(&manifest).map_err(|e| {
            AssistantError::storage(
                path.clone(),
                std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            )
        })?;
        fs::write(&path, json).map_err(|e| AssistantError::storage(path.clone(), e))?;

        if !self.keep_scratch {
            let scratch = session.root.join(SCRATCH_FILE);
            if scratch.exists() {
                if let Err(e) = fs::remove_file(&scratch) {
                    warn!(path = %scratch.display(), error = %e, "could not remove scratch log");
                }
            }
        }

        info!(
            session = %session.id,
            turns = session.turns.len(),
            manifest = %path.display(),
            "session finalized"
        );
        Ok(())
    }
}

fn highest_session_number(dir: &Path) -> Result<u32> {
    let entries = fs::read_dir(dir).map_err(|e| AssistantError::storage(dir, e))?;
    let mut highest = 0u32;
    for entry in entries {
        let entry = entry.map_err(|e| AssistantError::storage(dir, e))?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if let Some(suffix) = name.strip_prefix(SESSION_PREFIX) {
            if let Ok(number) = suffix.parse::<u32>() {
                highest = highest.max(number);
            }
        }
    }
    Ok(highest)
}
