use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 同义词/反义词最多展示的数量
pub const MAX_RELATED_WORDS: usize = 8;

// 词典 API 返回的数据结构；未建模的字段（sourceUrls、license 等）原样保留在 extra 中
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct WordEntry {
    pub word: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phonetic: Option<String>,
    #[serde(default)]
    pub phonetics: Vec<Phonetic>,
    pub meanings: Vec<Meaning>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Phonetic {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Meaning {
    pub part_of_speech: String,
    pub definitions: Vec<Definition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phonetic: Option<String>,
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub antonyms: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Definition {
    pub definition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub antonyms: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    Synonyms,
    Antonyms,
}

impl WordEntry {
    /// 依次尝试：词条音标、释义中的音标、phonetics 列表中的第一个非空音标
    pub fn display_phonetic(&self) -> String {
        non_blank(self.phonetic.as_deref())
            .or_else(|| {
                self.meanings
                    .iter()
                    .find_map(|meaning| non_blank(meaning.phonetic.as_deref()))
            })
            .or_else(|| {
                self.phonetics
                    .iter()
                    .find_map(|phonetic| non_blank(phonetic.text.as_deref()))
            })
            .unwrap_or_default()
            .to_string()
    }

    pub fn first_definition(&self) -> String {
        self.meanings
            .first()
            .and_then(|meaning| meaning.definitions.first())
            .map(|definition| definition.definition.clone())
            .unwrap_or_default()
    }

    /// 第一个非空的录音地址
    pub fn audio_url(&self) -> Option<&str> {
        self.phonetics
            .iter()
            .find_map(|phonetic| non_blank(phonetic.audio.as_deref()))
    }

    /// 先收集每个释义下的词，再收集词性层级的词；去重后保留首次出现的顺序
    pub fn related_words(&self, kind: RelationKind) -> Vec<String> {
        let pick = |synonyms: &Vec<String>, antonyms: &Vec<String>| -> Vec<String> {
            match kind {
                RelationKind::Synonyms => synonyms.clone(),
                RelationKind::Antonyms => antonyms.clone(),
            }
        };

        let mut words: Vec<String> = Vec::new();
        for meaning in &self.meanings {
            let from_definitions = meaning
                .definitions
                .iter()
                .flat_map(|definition| pick(&definition.synonyms, &definition.antonyms));
            let from_meaning = pick(&meaning.synonyms, &meaning.antonyms);
            for word in from_definitions.chain(from_meaning) {
                if !words.contains(&word) {
                    words.push(word);
                }
            }
        }
        words.truncate(MAX_RELATED_WORDS);
        words
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|text| !text.trim().is_empty())
}

// 本地持久化的数据结构
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct HistoryItem {
    pub word: String,
    pub timestamp: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct FavoriteItem {
    pub word: String,
    pub timestamp: i64,
    #[serde(default)]
    pub phonetic: String,
    #[serde(default)]
    pub definition: String,
}

impl FavoriteItem {
    /// 收藏时对当前词条做一次快照，之后不会随查询结果更新
    pub fn snapshot(entry: &WordEntry, timestamp: i64) -> Self {
        Self {
            word: entry.word.to_lowercase(),
            timestamp,
            phonetic: entry.display_phonetic(),
            definition: entry.first_definition(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WordOfDayCacheEntry {
    pub date: String,
    pub data: Vec<WordEntry>,
}

/// 相对时间显示：刚刚 / 分钟 / 小时 / 天，超过一周显示日期
pub fn format_timestamp(timestamp: i64, now: DateTime<Local>) -> String {
    // 存储中的时间戳可能是任意值
    let diff_in_seconds = now.timestamp_millis().saturating_sub(timestamp).div_euclid(1000);

    if diff_in_seconds < 60 {
        return "Just now".to_string();
    }
    if diff_in_seconds < 3600 {
        return format!("{}m ago", diff_in_seconds / 60);
    }
    if diff_in_seconds < 86400 {
        return format!("{}h ago", diff_in_seconds / 3600);
    }
    if diff_in_seconds < 604800 {
        return format!("{}d ago", diff_in_seconds / 86400);
    }

    match Local.timestamp_millis_opt(timestamp).single() {
        Some(date) => date.format("%-m/%-d/%Y").to_string(),
        None => timestamp.to_string(),
    }
}
