use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use wallconfig::AudioSource;

/// Synchronous "is audio currently audible" query, polled once per frame.
pub trait AudioActivity {
    fn is_audio_active(&self) -> bool;
}

impl<F> AudioActivity for F
where
    F: Fn() -> bool,
{
    fn is_audio_active(&self) -> bool {
        self()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedAudio(pub bool);

impl AudioActivity for FixedAudio {
    fn is_audio_active(&self) -> bool {
        self.0
    }
}

/// Flag that can be flipped from any thread while the engine polls it.
#[derive(Debug, Clone, Default)]
pub struct SharedAudioFlag(Arc<AtomicBool>);

impl SharedAudioFlag {
    pub fn new(active: bool) -> Self {
        Self(Arc::new(AtomicBool::new(active)))
    }

    pub fn set(&self, active: bool) {
        self.0.store(active, Ordering::Relaxed);
    }

    pub fn get(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

impl AudioActivity for SharedAudioFlag {
    fn is_audio_active(&self) -> bool {
        self.get()
    }
}

/// Reads a flag file on every poll. A missing file, an empty file, `0`, or
/// `false` mean silence; anything else means audio is playing.
#[derive(Debug, Clone)]
pub struct FlagFileAudio {
    path: PathBuf,
}

impl FlagFileAudio {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl AudioActivity for FlagFileAudio {
    fn is_audio_active(&self) -> bool {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let value = contents.trim();
                !(value.is_empty() || value == "0" || value.eq_ignore_ascii_case("false"))
            }
            Err(_) => false,
        }
    }
}

pub fn audio_from_source(source: &AudioSource) -> Box<dyn AudioActivity> {
    match source {
        AudioSource::Active => Box::new(FixedAudio(true)),
        AudioSource::Inactive => Box::new(FixedAudio(false)),
        AudioSource::FlagFile(path) => Box::new(FlagFileAudio::new(path.clone())),
    }
}
