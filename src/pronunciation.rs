use anyhow::Result;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::config::{PronunciationConfig, TtsConfig};
use crate::models::WordEntry;
use crate::tts::{AzureTts, save_audio_file};

/// 朗读流程的状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PronunciationState {
    Idle,
    PlayingAudio { url: String, loaded: bool },
    PlayingSpeechFallback,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PronunciationEvent {
    AudioLoaded,
    AudioError,
    LoadTimeout,
    PlaybackEnded,
    SpeechFinished,
}

impl PronunciationState {
    /// 有录音地址时先播放录音，否则直接使用语音合成
    pub fn start(entry: &WordEntry) -> Self {
        match entry.audio_url() {
            Some(url) => PronunciationState::PlayingAudio {
                url: url.to_string(),
                loaded: false,
            },
            None => PronunciationState::PlayingSpeechFallback,
        }
    }

    pub fn on(self, event: PronunciationEvent) -> Self {
        use PronunciationEvent::*;
        use PronunciationState::*;

        match (self, event) {
            (PlayingAudio { url, .. }, AudioLoaded) => PlayingAudio { url, loaded: true },
            (PlayingAudio { .. }, AudioError) => PlayingSpeechFallback,
            // 已经加载完成的录音不受加载超时影响
            (PlayingAudio { loaded: false, .. }, LoadTimeout) => PlayingSpeechFallback,
            (PlayingAudio { .. }, PlaybackEnded) => Done,
            (PlayingSpeechFallback, SpeechFinished) => Done,
            (state, _) => state,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, PronunciationState::Done)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PronunciationSource {
    Recording(PathBuf),
    Speech(PathBuf),
    Unavailable,
}

/// 把状态机落到命令行环境：录音下载到本地文件，失败时用 Azure 合成语音
pub struct Pronouncer {
    client: Client,
    config: PronunciationConfig,
    tts: Option<AzureTts>,
}

impl Pronouncer {
    pub fn new(config: PronunciationConfig, tts: Option<TtsConfig>) -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(Pronouncer {
            client,
            config,
            tts: tts.map(AzureTts::new),
        })
    }

    fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.config.audio_load_timeout_ms)
    }

    fn output_path(&self, word: &str, extension: &str) -> PathBuf {
        let stem: String = word
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        Path::new(&self.config.output_dir).join(format!("{stem}.{extension}"))
    }

    pub async fn pronounce(&self, entry: &WordEntry) -> PronunciationSource {
        let mut state = PronunciationState::start(entry);
        let mut source = PronunciationSource::Unavailable;
        let mut recording: Option<Vec<u8>> = None;

        while !state.is_done() {
            let event = match &state {
                PronunciationState::Idle | PronunciationState::Done => break,
                PronunciationState::PlayingAudio { url, loaded: false } => {
                    let (event, data) = self.load_recording(url).await;
                    recording = data;
                    event
                }
                PronunciationState::PlayingAudio { url, loaded: true } => {
                    let path = self.output_path(&entry.word, extension_of(url));
                    let data = recording.take().unwrap_or_default();
                    self.save_recording(&data, &path, &mut source)
                }
                PronunciationState::PlayingSpeechFallback => {
                    self.speak(&entry.word, &mut source).await;
                    PronunciationEvent::SpeechFinished
                }
            };
            state = state.on(event);
        }

        source
    }

    // 录音必须在超时前下载完成
    async fn load_recording(&self, url: &str) -> (PronunciationEvent, Option<Vec<u8>>) {
        let download = async {
            let response = self.client.get(url).send().await?.error_for_status()?;
            response.bytes().await
        };

        match tokio::time::timeout(self.load_timeout(), download).await {
            Ok(Ok(bytes)) if !bytes.is_empty() => (PronunciationEvent::AudioLoaded, Some(bytes.to_vec())),
            Ok(Ok(_)) => {
                warn!(url, "audio response was empty");
                (PronunciationEvent::AudioError, None)
            }
            Ok(Err(e)) => {
                warn!(url, error = %e, "audio failed to load");
                (PronunciationEvent::AudioError, None)
            }
            Err(_) => {
                warn!(url, timeout = ?self.load_timeout(), "audio load timed out");
                (PronunciationEvent::LoadTimeout, None)
            }
        }
    }

    fn save_recording(
        &self,
        data: &[u8],
        path: &Path,
        source: &mut PronunciationSource,
    ) -> PronunciationEvent {
        match save_audio_file(data, path) {
            Ok(()) => {
                info!(path = %path.display(), "saved pronunciation recording");
                *source = PronunciationSource::Recording(path.to_path_buf());
                PronunciationEvent::PlaybackEnded
            }
            Err(e) => {
                warn!(error = %e, "failed to save recording");
                PronunciationEvent::AudioError
            }
        }
    }

    // 语音合成失败只记录日志
    async fn speak(&self, word: &str, source: &mut PronunciationSource) {
        let Some(tts) = &self.tts else {
            warn!(word, "no recording and no speech synthesis configured");
            return;
        };

        let path = self.output_path(word, "wav");
        match tts.synthesize_text_to_file(word, &path).await {
            Ok(()) => {
                info!(path = %path.display(), "synthesized pronunciation");
                *source = PronunciationSource::Speech(path);
            }
            Err(e) => warn!(word, error = %e, "speech synthesis failed"),
        }
    }
}

fn extension_of(url: &str) -> &str {
    url.rsplit('/')
        .next()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && ext.len() <= 4 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or("mp3")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Phonetic;
    use PronunciationEvent::*;

    fn entry_with_audio(audio: Option<&str>) -> WordEntry {
        WordEntry {
            word: "Hello".to_string(),
            phonetic: None,
            phonetics: vec![Phonetic {
                text: Some("/həˈləʊ/".to_string()),
                audio: audio.map(str::to_string),
                ..Default::default()
            }],
            meanings: Vec::new(),
            ..Default::default()
        }
    }

    fn playing() -> PronunciationState {
        PronunciationState::start(&entry_with_audio(Some("https://example.com/hello.mp3")))
    }

    #[test]
    fn start_picks_audio_when_available() {
        assert_eq!(
            playing(),
            PronunciationState::PlayingAudio {
                url: "https://example.com/hello.mp3".into(),
                loaded: false
            }
        );
        assert_eq!(
            PronunciationState::start(&entry_with_audio(Some("  "))),
            PronunciationState::PlayingSpeechFallback
        );
        assert_eq!(
            PronunciationState::start(&entry_with_audio(None)),
            PronunciationState::PlayingSpeechFallback
        );
    }

    #[test]
    fn audio_path_ends_when_playback_ends() {
        let state = playing().on(AudioLoaded).on(PlaybackEnded);
        assert_eq!(state, PronunciationState::Done);
    }

    #[test]
    fn audio_error_falls_back_to_speech() {
        let state = playing().on(AudioError);
        assert_eq!(state, PronunciationState::PlayingSpeechFallback);
        assert_eq!(state.on(SpeechFinished), PronunciationState::Done);
    }

    #[test]
    fn load_timeout_only_applies_before_load() {
        assert_eq!(playing().on(LoadTimeout), PronunciationState::PlayingSpeechFallback);

        let loaded = playing().on(AudioLoaded);
        assert_eq!(loaded.clone().on(LoadTimeout), loaded);
    }

    #[test]
    fn unrelated_events_are_ignored() {
        assert_eq!(PronunciationState::Idle.on(AudioLoaded), PronunciationState::Idle);
        assert_eq!(PronunciationState::Done.on(AudioError), PronunciationState::Done);
        assert_eq!(
            PronunciationState::PlayingSpeechFallback.on(PlaybackEnded),
            PronunciationState::PlayingSpeechFallback
        );
    }

    #[test]
    fn extension_comes_from_url() {
        assert_eq!(extension_of("https://example.com/a/hello-uk.ogg"), "ogg");
        assert_eq!(extension_of("https://example.com/a/hello"), "mp3");
    }

    #[tokio::test]
    async fn no_audio_and_no_tts_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let config = PronunciationConfig {
            audio_load_timeout_ms: 3000,
            output_dir: dir.path().display().to_string(),
        };
        let pronouncer = Pronouncer::new(config, None).unwrap();

        let source = pronouncer.pronounce(&entry_with_audio(None)).await;
        assert_eq!(source, PronunciationSource::Unavailable);
    }

    #[tokio::test]
    async fn unreachable_recording_falls_back() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let dir = tempfile::tempdir().unwrap();
        let config = PronunciationConfig {
            audio_load_timeout_ms: 3000,
            output_dir: dir.path().display().to_string(),
        };
        let pronouncer = Pronouncer::new(config, None).unwrap();
        let url = format!("http://127.0.0.1:{port}/hello.mp3");

        let source = pronouncer.pronounce(&entry_with_audio(Some(&url))).await;
        assert_eq!(source, PronunciationSource::Unavailable);
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }
}
