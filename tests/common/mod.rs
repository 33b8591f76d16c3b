//! Shared test utilities
#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use voiced::config::ListenConfig;
use voiced::voice::{Feedback, ListenHandle, Listener, WakeDetector};
use voiced::{Error, RecognitionResult, Result, Slots, Sound};

/// Wake detector that wakes immediately
pub struct InstantWake;

#[async_trait]
impl WakeDetector for InstantWake {
    async fn wait_for_wake(&self) -> Result<()> {
        Ok(())
    }
}

/// Wake detector whose tool always fails
pub struct BrokenWake;

#[async_trait]
impl WakeDetector for BrokenWake {
    async fn wait_for_wake(&self) -> Result<()> {
        Err(Error::WakeWord("microphone unplugged".to_string()))
    }
}

/// What a scripted listening attempt produces
pub enum Attempt {
    /// Speech with this recognition
    Speech(RecognitionResult),
    /// Nothing before the timeout
    Silence,
    /// The pipeline failed
    Failure(String),
    /// Still listening until cancelled; the flag is set once the worker
    /// has seen the cancellation
    Stuck(Arc<AtomicBool>),
}

/// Listener replaying a fixed sequence of attempts
#[derive(Default)]
pub struct ScriptedListener {
    script: Mutex<VecDeque<Attempt>>,
    starts: Mutex<usize>,
}

impl ScriptedListener {
    pub fn new(script: impl IntoIterator<Item = Attempt>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            starts: Mutex::new(0),
        }
    }

    /// Number of times listening was started
    pub fn starts(&self) -> usize {
        *self.starts.lock().unwrap()
    }
}

#[async_trait]
impl Listener for ScriptedListener {
    async fn start_listening(&self, _open: bool, _timeout: Duration) -> Result<ListenHandle> {
        *self.starts.lock().unwrap() += 1;

        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .expect("listener started more times than scripted");

        Ok(match next {
            Attempt::Speech(response) => ListenHandle::completed(Some(response)),
            Attempt::Silence => ListenHandle::completed(None),
            Attempt::Failure(message) => {
                ListenHandle::spawn(move |_| async move { Err(Error::Listen(message)) })
            }
            Attempt::Stuck(cancelled) => ListenHandle::spawn(move |token| async move {
                token.cancelled().await;
                cancelled.store(true, Ordering::SeqCst);
                Ok(None)
            }),
        })
    }
}

/// Something the user would have heard
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cue {
    Played(Sound),
    Spoke(String),
}

/// Feedback sink that records instead of making noise
#[derive(Default)]
pub struct RecordingFeedback {
    events: Mutex<Vec<Cue>>,
    broken: bool,
}

impl RecordingFeedback {
    /// A sink whose every call fails (after recording it)
    pub fn broken() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            broken: true,
        }
    }

    pub fn events(&self) -> Vec<Cue> {
        self.events.lock().unwrap().clone()
    }

    /// Only the cue sounds, in order
    pub fn sounds(&self) -> Vec<Sound> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Cue::Played(sound) => Some(sound),
                Cue::Spoke(_) => None,
            })
            .collect()
    }

    fn record(&self, event: Cue) -> Result<()> {
        self.events.lock().unwrap().push(event);
        if self.broken {
            return Err(Error::Audio("no output device".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Feedback for RecordingFeedback {
    async fn play(&self, sound: Sound) -> Result<()> {
        self.record(Cue::Played(sound))
    }

    async fn speak(&self, text: &str) -> Result<()> {
        self.record(Cue::Spoke(text.to_string()))
    }
}

/// Recognition with a confident intent
pub fn recognized(text: &str, intent: &str, slots: &[(&str, &str)]) -> RecognitionResult {
    let slots: Slots = slots
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    RecognitionResult::recognized(text, intent, slots)
}

/// Listen settings for tests
pub fn listen_config(command: impl Into<String>, timeout: Duration) -> ListenConfig {
    ListenConfig {
        command: command.into(),
        ready_line: "Ready".to_string(),
        timeout,
        max_attempts: 3,
        min_confidence: 0.5,
    }
}

/// Write a fake speech tool
///
/// `capture` runs for `transcribe-stream` and `interpret` for
/// `recognize-intent`. Both are shell snippets.
#[cfg(unix)]
pub fn speech_tool(dir: &Path, capture: &str, interpret: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("speech-tool");
    let script = format!(
        "#!/bin/sh\n\
         case \"$1\" in\n\
         transcribe-stream)\n{capture}\n;;\n\
         recognize-intent)\n{interpret}\n;;\n\
         *) exit 64 ;;\n\
         esac\n"
    );
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Whether a process is still alive (zombies count as gone)
#[cfg(target_os = "linux")]
pub fn process_alive(pid: u32) -> bool {
    std::fs::read_to_string(format!("/proc/{pid}/stat"))
        .is_ok_and(|stat| !stat.rsplit(')').next().unwrap_or("").trim_start().starts_with('Z'))
}

/// Wait for a fake tool to create `file`
pub async fn wait_for_file(file: &Path) {
    for _ in 0..250 {
        if std::fs::metadata(file).is_ok_and(|m| m.len() > 0) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("{} was never written", file.display());
}

/// Read a pid a fake tool wrote to `file`
pub fn read_pid(file: &Path) -> u32 {
    std::fs::read_to_string(file).unwrap().trim().parse().unwrap()
}
