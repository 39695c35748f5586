use anyhow::Result;
use azure_speech::{synthesizer, Auth, stream::StreamExt};
use std::path::Path;
use tracing::debug;

use crate::config::TtsConfig;

/// Azure 语音合成，作为没有录音时的朗读方式
pub struct AzureTts {
    config: TtsConfig,
}

impl AzureTts {
    pub fn new(config: TtsConfig) -> Self {
        Self { config }
    }

    /// 合成文本并写入指定文件
    pub async fn synthesize_text_to_file(&self, text: &str, output_file: &Path) -> Result<()> {
        if text.trim().is_empty() {
            return Err(anyhow::anyhow!("nothing to synthesize"));
        }

        // 创建认证
        let auth = Auth::from_subscription(
            self.config.azure_speech_region.clone(),
            self.config.azure_speech_key.clone(),
        );

        let config = synthesizer::Config::new()
            .with_language(synthesizer::Language::EnUs)
            .with_voice(synthesizer::Voice::EnUsJennyNeural);

        let client = synthesizer::Client::connect(auth, config).await?;
        let mut stream = client.synthesize(text).await?;

        // 收集音频数据
        let mut audio_data = Vec::new();

        while let Some(event_result) = stream.next().await {
            match event_result {
                Ok(synthesizer::Event::Synthesising(_, audio_chunk)) => {
                    audio_data.extend_from_slice(&audio_chunk);
                }
                Ok(synthesizer::Event::Synthesised(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(anyhow::anyhow!("speech synthesis failed: {}", e));
                }
            }
        }

        if audio_data.is_empty() {
            return Err(anyhow::anyhow!("no audio data received"));
        }

        debug!(bytes = audio_data.len(), path = %output_file.display(), "synthesized speech");
        save_audio_file(&audio_data, output_file)
    }
}

/// 写入音频文件，必要时创建目录
pub fn save_audio_file(audio_data: &[u8], output_file: &Path) -> Result<()> {
    if let Some(parent) = output_file.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| anyhow::anyhow!("failed to create directory {}: {}", parent.display(), e))?;
    }

    std::fs::write(output_file, audio_data)
        .map_err(|e| anyhow::anyhow!("failed to write audio file {}: {}", output_file.display(), e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_audio_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/audio/word.mp3");
        save_audio_file(b"ID3", &path).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"ID3");
    }

    #[tokio::test]
    async fn blank_text_is_rejected_before_connecting() {
        let tts = AzureTts::new(TtsConfig {
            azure_speech_key: "key".into(),
            azure_speech_region: "westeurope".into(),
        });
        let dir = tempfile::tempdir().unwrap();
        assert!(tts.synthesize_text_to_file("  ", &dir.path().join("x.wav")).await.is_err());
    }
}
