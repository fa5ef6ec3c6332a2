//! Session directory numbering, turn persistence, and finalize.

use std::fs;

use chrono::Utc;
use tempfile::TempDir;

use hr_voice_assistant::session::{
    AnswerSource, SessionManifest, SessionRecorder, Turn, VoiceSource,
};

fn turn(index: u32) -> Turn {
    Turn {
        index,
        user_text: format!("հարց {index}"),
        assistant_text: format!("պատասխան {index}"),
        answer_source: AnswerSource::Generated,
        voice_source: VoiceSource::TtsGenerated,
        faq_id: None,
        match_score: None,
        fallback: false,
        input_audio_path: format!("voice_input/{index:04}.wav"),
        output_audio_path: Some(format!("tts_output/{index:04}.mp3")),
        timestamp: Utc::now(),
    }
}

#[test]
fn sessions_get_increasing_numbers() {
    let dir = TempDir::new().unwrap();
    let recorder = SessionRecorder::new(dir.path(), false);

    let first = recorder.begin().unwrap();
    let second = recorder.begin().unwrap();

    assert_eq!(first.id, "conversation-001");
    assert_eq!(second.id, "conversation-002");
    assert!(first.root.join("voice_input").is_dir());
    assert!(first.root.join("tts_output").is_dir());
}

#[test]
fn numbering_skips_preexisting_directories() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("conversation-041")).unwrap();
    // stray files and unrelated names are ignored by the scan
    fs::write(dir.path().join("notes.txt"), "x").unwrap();
    fs::create_dir_all(dir.path().join("archive")).unwrap();

    let recorder = SessionRecorder::new(dir.path(), false);
    let session = recorder.begin().unwrap();
    assert_eq!(session.id, "conversation-042");
}

#[test]
fn collision_on_create_retries_with_next_number() {
    let dir = TempDir::new().unwrap();
    let recorder = SessionRecorder::new(dir.path(), false);
    let first = recorder.begin().unwrap();
    assert_eq!(first.id, "conversation-001");

    // another process grabbed 002 between scan and create
    fs::create_dir(dir.path().join("conversation-002")).unwrap();
    let second = recorder.begin().unwrap();
    assert_eq!(second.id, "conversation-003");
}

#[test]
fn finalize_writes_complete_manifest() {
    let dir = TempDir::new().unwrap();
    let recorder = SessionRecorder::new(dir.path(), false);
    let mut session = recorder.begin().unwrap();

    recorder.append_turn(&mut session, turn(1)).unwrap();
    recorder.append_turn(&mut session, turn(2)).unwrap();
    recorder.finalize(&mut session).unwrap();

    let raw = fs::read_to_string(session.root.join("conversation.json")).unwrap();
    let manifest: SessionManifest = serde_json::from_str(&raw).unwrap();
    assert_eq!(manifest.conversation_id, session.id);
    assert_eq!(manifest.turn_count, 2);
    assert_eq!(manifest.turns.len(), 2);
    assert_eq!(manifest.turns[0].index, 1);
    assert_eq!(manifest.turns[1].user_text, "հարց 2");
    assert!(manifest.ended_at >= manifest.started_at);
    assert!(session.ended_at.is_some());
}

#[test]
fn zero_turn_session_still_gets_a_manifest() {
    let dir = TempDir::new().unwrap();
    let recorder = SessionRecorder::new(dir.path(), false);
    let mut session = recorder.begin().unwrap();
    recorder.finalize(&mut session).unwrap();

    let raw = fs::read_to_string(session.root.join("conversation.json")).unwrap();
    let manifest: SessionManifest = serde_json::from_str(&raw).unwrap();
    assert_eq!(manifest.turn_count, 0);
    assert!(manifest.turns.is_empty());
}

#[test]
fn scratch_log_is_removed_by_default() {
    let dir = TempDir::new().unwrap();
    let recorder = SessionRecorder::new(dir.path(), false);
    let mut session = recorder.begin().unwrap();

    recorder.append_turn(&mut session, turn(1)).unwrap();
    let scratch = session.root.join("session-scratch.jsonl");
    assert!(scratch.is_file());

    recorder.finalize(&mut session).unwrap();
    assert!(!scratch.exists());
}

#[test]
fn scratch_log_is_kept_when_requested() {
    let dir = TempDir::new().unwrap();
    let recorder = SessionRecorder::new(dir.path(), true);
    let mut session = recorder.begin().unwrap();

    recorder.append_turn(&mut session, turn(1)).unwrap();
    recorder.finalize(&mut session).unwrap();

    let scratch = session.root.join("session-scratch.jsonl");
    assert!(scratch.is_file());
    // one JSON line per turn
    let lines: Vec<_> = fs::read_to_string(&scratch)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect();
    assert_eq!(lines.len(), 1);
    let recorded: Turn = serde_json::from_str(&lines[0]).unwrap();
    assert_eq!(recorded.index, 1);
}

#[test]
fn audio_slots_follow_turn_numbering() {
    let dir = TempDir::new().unwrap();
    let recorder = SessionRecorder::new(dir.path(), false);
    let session = recorder.begin().unwrap();

    let input = recorder.input_audio_slot(&session, 7);
    let output = recorder.output_audio_slot(&session, 7);
    assert!(input.ends_with("voice_input/0007.wav"));
    assert!(output.ends_with("tts_output/0007.mp3"));
}

#[test]
fn optional_turn_fields_are_omitted_from_json() {
    let mut t = turn(1);
    t.faq_id = None;
    t.match_score = None;
    t.output_audio_path = None;
    let json = serde_json::to_string(&t).unwrap();
    assert!(!json.contains("faq_id"));
    assert!(!json.contains("match_score"));
    assert!(!json.contains("output_audio_path"));

    t.faq_id = Some(3);
    t.match_score = Some(0.8);
    let json = serde_json::to_string(&t).unwrap();
    assert!(json.contains("\"faq_id\":3"));
}
