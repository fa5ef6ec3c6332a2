pub mod backend;
pub mod file;
pub mod segmenter;

pub use backend::{AudioFrame, CaptureBackend, CaptureBackendFactory, CaptureSource, FileCapture};
pub use file::{wav_bytes, write_wav, AudioFile};
pub use segmenter::{
    SegmenterConfig, SegmenterControl, SegmenterMode, Utterance, VoiceActivitySegmenter,
};
