use log::warn;
use regex::Regex;
use std::time::{Duration, Instant};

const SETTLE_DELAY: Duration = Duration::from_millis(200);
const ERROR_REVERT: Duration = Duration::from_secs(3);
const COPY_REVERT: Duration = Duration::from_secs(2);

/// Speed presets offered to the user, label plus rate multiplier.
pub const SPEED_OPTIONS: [(&str, f32); 4] = [
    ("🐌 Langzaam", 0.75),
    ("📚 Normaal", 1.0),
    ("⚡ Snel", 1.5),
    ("🚀 Allersnelst", 2.0),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    pub name: String,
    pub lang: String,
}

impl Voice {
    pub fn new(name: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lang: lang.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub voice: Option<Voice>,
    pub lang: String,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

#[derive(Debug, thiserror::Error)]
#[error("speech engine error: {0}")]
pub struct SpeechError(pub String);

#[derive(Debug, thiserror::Error)]
#[error("clipboard error: {0}")]
pub struct ClipboardError(pub String);

/// The platform speech engine, treated as a single-slot resource: `speak`
/// replaces whatever was queued, it never appends.
pub trait SpeechService: Send {
    fn voices(&self) -> Vec<Voice>;
    fn speak(&mut self, utterance: Utterance) -> Result<(), SpeechError>;
    fn pause(&mut self);
    fn resume(&mut self);
    fn cancel(&mut self);
}

pub trait ClipboardService: Send {
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

/// Native clipboard behind the [`ClipboardService`] seam.
pub struct SystemClipboard {
    inner: arboard::Clipboard,
}

impl SystemClipboard {
    pub fn new() -> Result<Self, ClipboardError> {
        let inner = arboard::Clipboard::new().map_err(|e| ClipboardError(e.to_string()))?;
        Ok(Self { inner })
    }
}

impl ClipboardService for SystemClipboard {
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        self.inner
            .set_text(text.to_string())
            .map_err(|e| ClipboardError(e.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtsStatus {
    Idle,
    Waiting,
    Playing,
    Paused,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyStatus {
    Idle,
    Copying,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEvent {
    Started,
    Ended,
    Paused,
    Resumed,
    Failed(SpeechFailure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechFailure {
    /// Cancelled to make room for a new utterance; a normal transition.
    Interrupted,
    Canceled,
    Other(String),
}

/// Picks the voice to read responses with: language-matched premium voices
/// first (Dutch before English), then any language-matched voice, then
/// whatever the engine has.
pub fn find_best_voice(voices: &[Voice]) -> Option<Voice> {
    const LANG_PRIORITIES: [&str; 6] = ["nl-nl", "nl-be", "nl", "en-us", "en-gb", "en"];
    const QUALITY_KEYWORDS: [&str; 6] =
        ["neural", "premium", "enhanced", "natural", "wavenet", "studio"];

    for lang in LANG_PRIORITIES {
        let matching: Vec<&Voice> = voices
            .iter()
            .filter(|v| v.lang.to_lowercase().starts_with(lang))
            .collect();
        if let Some(premium) = matching.iter().find(|v| {
            let name = v.name.to_lowercase();
            QUALITY_KEYWORDS.iter().any(|k| name.contains(k))
        }) {
            return Some((*premium).clone());
        }
        if let Some(first) = matching.first() {
            return Some((*first).clone());
        }
    }
    voices.first().cloned()
}

/// Strips markdown syntax for copying and speaking. Idempotent on text that
/// carries no markdown.
pub fn markdown_to_plain_text(markdown: &str) -> String {
    let rules: [(&str, &str); 11] = [
        (r"(?s)```.*?```", ""),
        ("`([^`]+)`", "$1"),
        (r"(?m)^#{1,6}\s+", ""),
        (r"\*\*([^*]+)\*\*", "$1"),
        (r"\*([^*]+)\*", "$1"),
        ("__([^_]+)__", "$1"),
        ("_([^_]+)_", "$1"),
        (r"\[([^\]]+)\]\([^)]+\)", "$1"),
        (r"(?m)^---+$", ""),
        (r"(?m)^[ \t]*[-*+]\s+", ""),
        (r"(?m)^[ \t]*\d+\.\s+", ""),
    ];

    let mut text = markdown.to_string();
    for (pattern, replacement) in rules {
        let re = Regex::new(pattern).expect("static pattern");
        text = re.replace_all(&text, replacement).into_owned();
    }
    let blank_runs = Regex::new(r"\n(\s*\n){2,}").expect("static pattern");
    blank_runs.replace_all(&text, "\n\n").trim().to_string()
}

/// Text-to-speech state machine over a [`SpeechService`].
///
/// Status walk: Idle → Waiting → Playing ⇄ Paused → Idle, with Error
/// reachable from Waiting/Playing and auto-reverting to Idle after a fixed
/// delay. A new utterance always cancels the previous one first so two
/// utterances can never sound at the same time.
pub struct SpeechController<S: SpeechService> {
    service: S,
    status: TtsStatus,
    rate: f32,
    best_voice: Option<Voice>,
    current_text: Option<String>,
    error_since: Option<Instant>,
    settle_delay: Duration,
}

impl<S: SpeechService> SpeechController<S> {
    pub fn new(service: S) -> Self {
        let best_voice = find_best_voice(&service.voices());
        Self {
            service,
            status: TtsStatus::Idle,
            rate: 1.0,
            best_voice,
            current_text: None,
            error_since: None,
            settle_delay: SETTLE_DELAY,
        }
    }

    /// Re-runs voice selection; engines may report voices late.
    pub fn refresh_voices(&mut self) {
        self.best_voice = find_best_voice(&self.service.voices());
    }

    pub fn best_voice(&self) -> Option<&Voice> {
        self.best_voice.as_ref()
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub fn status(&mut self) -> TtsStatus {
        if self.status == TtsStatus::Error {
            if let Some(since) = self.error_since {
                if since.elapsed() >= ERROR_REVERT {
                    self.status = TtsStatus::Idle;
                    self.error_since = None;
                }
            }
        }
        self.status
    }

    /// The single user-facing button: pause while playing, resume while
    /// paused, otherwise start fresh.
    pub async fn toggle(&mut self, content: &str, markdown: bool) {
        match self.status() {
            TtsStatus::Playing => {
                self.service.pause();
                self.status = TtsStatus::Paused;
            }
            TtsStatus::Paused => {
                self.service.resume();
                self.status = TtsStatus::Playing;
            }
            _ => self.start(content, markdown).await,
        }
    }

    pub async fn start(&mut self, content: &str, markdown: bool) {
        let text = if markdown {
            markdown_to_plain_text(content)
        } else {
            content.trim().to_string()
        };
        if text.is_empty() {
            warn!("No text to speak");
            return;
        }
        self.speak_text(text).await;
    }

    async fn speak_text(&mut self, text: String) {
        // Always clear the engine first; the queue is a single slot.
        self.service.cancel();
        tokio::time::sleep(self.settle_delay).await;

        self.status = TtsStatus::Waiting;
        self.current_text = Some(text.clone());

        let utterance = Utterance {
            text,
            lang: self
                .best_voice
                .as_ref()
                .map(|v| v.lang.clone())
                .unwrap_or_else(|| "nl-NL".to_string()),
            voice: self.best_voice.clone(),
            rate: self.rate,
            pitch: 1.1,
            volume: 0.9,
        };

        if let Err(e) = self.service.speak(utterance) {
            warn!("Speech error: {}", e);
            self.status = TtsStatus::Error;
            self.error_since = Some(Instant::now());
        }
    }

    pub fn stop(&mut self) {
        self.service.cancel();
        self.status = TtsStatus::Idle;
        self.current_text = None;
    }

    /// Changing speed mid-playback restarts the current utterance at the new
    /// rate.
    pub async fn set_rate(&mut self, rate: f32) {
        self.rate = rate;
        if self.status() == TtsStatus::Playing {
            if let Some(text) = self.current_text.clone() {
                self.speak_text(text).await;
            }
        }
    }

    /// Feeds engine callbacks back into the state machine.
    pub fn handle_event(&mut self, event: SpeechEvent) {
        match event {
            SpeechEvent::Started => self.status = TtsStatus::Playing,
            SpeechEvent::Ended => {
                self.status = TtsStatus::Idle;
                self.current_text = None;
            }
            SpeechEvent::Paused => self.status = TtsStatus::Paused,
            SpeechEvent::Resumed => self.status = TtsStatus::Playing,
            SpeechEvent::Failed(SpeechFailure::Interrupted)
            | SpeechEvent::Failed(SpeechFailure::Canceled) => {
                // Expected when a new utterance preempts the old one.
                self.status = TtsStatus::Idle;
                self.current_text = None;
            }
            SpeechEvent::Failed(SpeechFailure::Other(message)) => {
                warn!("Speech error: {}", message);
                self.status = TtsStatus::Error;
                self.error_since = Some(Instant::now());
                self.current_text = None;
            }
        }
    }
}

/// Copy-to-clipboard state machine: Idle → Copying → Success|Error → Idle
/// with a timed revert.
pub struct CopyController<C: ClipboardService> {
    clipboard: C,
    status: CopyStatus,
    changed_at: Option<Instant>,
}

impl<C: ClipboardService> CopyController<C> {
    pub fn new(clipboard: C) -> Self {
        Self {
            clipboard,
            status: CopyStatus::Idle,
            changed_at: None,
        }
    }

    pub fn status(&mut self) -> CopyStatus {
        if matches!(self.status, CopyStatus::Success | CopyStatus::Error) {
            if let Some(at) = self.changed_at {
                if at.elapsed() >= COPY_REVERT {
                    self.status = CopyStatus::Idle;
                    self.changed_at = None;
                }
            }
        }
        self.status
    }

    pub fn copy(&mut self, content: &str, markdown: bool) -> CopyStatus {
        if content.trim().is_empty() {
            return self.status();
        }
        self.status = CopyStatus::Copying;
        let text = if markdown {
            markdown_to_plain_text(content)
        } else {
            content.to_string()
        };
        self.status = match self.clipboard.set_text(&text) {
            Ok(()) => CopyStatus::Success,
            Err(e) => {
                warn!("Copy failed: {}", e);
                CopyStatus::Error
            }
        };
        self.changed_at = Some(Instant::now());
        self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq)]
    enum Op {
        Speak(String),
        Pause,
        Resume,
        Cancel,
    }

    #[derive(Clone, Default)]
    struct FakeSpeech {
        ops: Arc<Mutex<Vec<Op>>>,
        voices: Vec<Voice>,
        fail_speak: bool,
    }

    impl FakeSpeech {
        fn ops(&self) -> Vec<Op> {
            self.ops.lock().unwrap().clone()
        }
    }

    impl SpeechService for FakeSpeech {
        fn voices(&self) -> Vec<Voice> {
            self.voices.clone()
        }

        fn speak(&mut self, utterance: Utterance) -> Result<(), SpeechError> {
            self.ops.lock().unwrap().push(Op::Speak(utterance.text));
            if self.fail_speak {
                Err(SpeechError("synthesis unavailable".into()))
            } else {
                Ok(())
            }
        }

        fn pause(&mut self) {
            self.ops.lock().unwrap().push(Op::Pause);
        }

        fn resume(&mut self) {
            self.ops.lock().unwrap().push(Op::Resume);
        }

        fn cancel(&mut self) {
            self.ops.lock().unwrap().push(Op::Cancel);
        }
    }

    fn controller(service: FakeSpeech) -> SpeechController<FakeSpeech> {
        let mut c = SpeechController::new(service);
        c.settle_delay = Duration::ZERO;
        c
    }

    #[tokio::test]
    async fn second_start_always_cancels_first() {
        let fake = FakeSpeech::default();
        let mut c = controller(fake.clone());

        c.start("eerste", false).await;
        c.handle_event(SpeechEvent::Started);
        c.start("tweede", false).await;

        let ops = fake.ops();
        // Every speak is preceded by a cancel since the previous speak.
        let mut cancelled = false;
        for op in &ops {
            match op {
                Op::Cancel => cancelled = true,
                Op::Speak(_) => {
                    assert!(cancelled, "speak without preceding cancel: {:?}", ops);
                    cancelled = false;
                }
                _ => {}
            }
        }
        assert_eq!(
            ops.iter().filter(|o| matches!(o, Op::Speak(_))).count(),
            2
        );
    }

    #[tokio::test]
    async fn toggle_walks_play_pause_resume() {
        let fake = FakeSpeech::default();
        let mut c = controller(fake.clone());

        c.toggle("Hallo wereld", false).await;
        assert_eq!(c.status(), TtsStatus::Waiting);
        c.handle_event(SpeechEvent::Started);
        assert_eq!(c.status(), TtsStatus::Playing);

        c.toggle("Hallo wereld", false).await;
        assert_eq!(c.status(), TtsStatus::Paused);
        c.toggle("Hallo wereld", false).await;
        assert_eq!(c.status(), TtsStatus::Playing);

        c.handle_event(SpeechEvent::Ended);
        assert_eq!(c.status(), TtsStatus::Idle);
        assert_eq!(fake.ops().last(), Some(&Op::Resume));
    }

    #[tokio::test]
    async fn interruption_is_not_an_error() {
        let mut c = controller(FakeSpeech::default());
        c.start("tekst", false).await;
        c.handle_event(SpeechEvent::Started);
        c.handle_event(SpeechEvent::Failed(SpeechFailure::Interrupted));
        assert_eq!(c.status(), TtsStatus::Idle);
    }

    #[tokio::test]
    async fn engine_error_reverts_to_idle_after_delay() {
        let mut c = controller(FakeSpeech::default());
        c.start("tekst", false).await;
        c.handle_event(SpeechEvent::Failed(SpeechFailure::Other("boom".into())));
        assert_eq!(c.status(), TtsStatus::Error);

        // Backdate the failure past the revert window.
        c.error_since = Some(Instant::now() - ERROR_REVERT - Duration::from_millis(10));
        assert_eq!(c.status(), TtsStatus::Idle);
    }

    #[tokio::test]
    async fn failed_speak_call_enters_error_state() {
        let fake = FakeSpeech {
            fail_speak: true,
            ..FakeSpeech::default()
        };
        let mut c = controller(fake);
        c.start("tekst", false).await;
        assert_eq!(c.status(), TtsStatus::Error);
    }

    #[tokio::test]
    async fn rate_change_restarts_only_while_playing() {
        let fake = FakeSpeech::default();
        let mut c = controller(fake.clone());

        c.set_rate(1.5).await;
        assert!(fake.ops().is_empty());

        c.start("tekst", false).await;
        c.handle_event(SpeechEvent::Started);
        c.set_rate(2.0).await;

        let speaks = fake
            .ops()
            .iter()
            .filter(|o| matches!(o, Op::Speak(_)))
            .count();
        assert_eq!(speaks, 2);
        assert_eq!(c.rate(), 2.0);
    }

    #[tokio::test]
    async fn markdown_is_stripped_before_speaking() {
        let fake = FakeSpeech::default();
        let mut c = controller(fake.clone());
        c.start("**Hallo** [wereld](https://example.com)", true).await;
        assert_eq!(
            fake.ops().last(),
            Some(&Op::Speak("Hallo wereld".to_string()))
        );
    }

    #[test]
    fn voice_picker_prefers_dutch_premium() {
        let voices = vec![
            Voice::new("Basic English", "en-US"),
            Voice::new("Lotte", "nl-NL"),
            Voice::new("Google Nederlands WaveNet", "nl-NL"),
        ];
        assert_eq!(
            find_best_voice(&voices).unwrap().name,
            "Google Nederlands WaveNet"
        );
    }

    #[test]
    fn voice_picker_falls_back_to_any_language_match() {
        let voices = vec![
            Voice::new("Basic English", "en-US"),
            Voice::new("Flemish Voice", "nl-BE"),
        ];
        assert_eq!(find_best_voice(&voices).unwrap().name, "Flemish Voice");
    }

    #[test]
    fn voice_picker_falls_back_to_first_voice() {
        let voices = vec![Voice::new("日本語", "ja-JP"), Voice::new("Deutsch", "de-DE")];
        assert_eq!(find_best_voice(&voices).unwrap().name, "日本語");
        assert_eq!(find_best_voice(&[]), None);
    }

    #[test]
    fn markdown_conversion_strips_syntax() {
        let input = "# Titel\n\n**Vet** en *schuin* met [een link](https://x.nl).\n\n\
                     - punt één\n1. punt twee\n\n```rust\ncode\n```\n\n`inline`\n\n---\nKlaar.";
        let plain = markdown_to_plain_text(input);
        assert!(!plain.contains('#'));
        assert!(!plain.contains("**"));
        assert!(!plain.contains('['));
        assert!(!plain.contains("```"));
        assert!(plain.contains("Vet en schuin met een link."));
        assert!(plain.contains("punt één"));
        assert!(plain.ends_with("Klaar."));
    }

    #[test]
    fn markdown_conversion_is_idempotent() {
        let inputs = [
            "Gewone tekst zonder opmaak.",
            "# Kop\n\n**dik** en _dun_\n\n\n\n- lijst",
            "Regels\n\n\n\n\nmet witruimte",
        ];
        for input in inputs {
            let once = markdown_to_plain_text(input);
            let twice = markdown_to_plain_text(&once);
            assert_eq!(once, twice, "not idempotent for {:?}", input);
        }
    }

    #[derive(Clone, Default)]
    struct FakeClipboard {
        contents: Arc<Mutex<Option<String>>>,
        fail: bool,
    }

    impl ClipboardService for FakeClipboard {
        fn set_text(&mut self, text: &str) -> Result<(), ClipboardError> {
            if self.fail {
                return Err(ClipboardError("denied".into()));
            }
            *self.contents.lock().unwrap() = Some(text.to_string());
            Ok(())
        }
    }

    #[test]
    fn copy_converts_markdown_and_reports_success() {
        let clipboard = FakeClipboard::default();
        let mut c = CopyController::new(clipboard.clone());
        assert_eq!(c.copy("**Hallo** wereld", true), CopyStatus::Success);
        assert_eq!(
            clipboard.contents.lock().unwrap().as_deref(),
            Some("Hallo wereld")
        );
    }

    #[test]
    fn copy_failure_then_timed_revert_to_idle() {
        let mut c = CopyController::new(FakeClipboard {
            fail: true,
            ..FakeClipboard::default()
        });
        assert_eq!(c.copy("tekst", false), CopyStatus::Error);

        c.changed_at = Some(Instant::now() - COPY_REVERT - Duration::from_millis(10));
        assert_eq!(c.status(), CopyStatus::Idle);
    }

    #[test]
    fn empty_content_is_not_copied() {
        let clipboard = FakeClipboard::default();
        let mut c = CopyController::new(clipboard.clone());
        assert_eq!(c.copy("   ", true), CopyStatus::Idle);
        assert!(clipboard.contents.lock().unwrap().is_none());
    }
}
