use rand::seq::SliceRandom;
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::ApiClient;
use crate::clock::Clock;
use crate::database::{DatabaseManager, WORD_OF_DAY_KEY};
use crate::models::{Definition, Meaning, Phonetic, WordEntry, WordOfDayCacheEntry};

pub const SAMPLE_WORDS: [&str; 30] = [
    "serendipity", "eloquence", "ephemeral", "luminous", "mellifluous",
    "petrichor", "wanderlust", "solitude", "ethereal", "nostalgia",
    "ubiquitous", "serenity", "effervescent", "languid", "pristine",
    "quintessential", "resplendent", "tranquil", "vivacious", "whimsical",
    "aesthetic", "benevolent", "cacophony", "diligent", "empathy",
    "fortitude", "gregarious", "halcyon", "ineffable", "jubilant",
];

/// 请求失败时展示的固定词条
pub fn fallback_entry() -> Vec<WordEntry> {
    vec![WordEntry {
        word: "serendipity".to_string(),
        phonetic: Some("/ˌsɛrənˈdɪpɪti/".to_string()),
        phonetics: vec![Phonetic {
            text: Some("/ˌsɛrənˈdɪpɪti/".to_string()),
            audio: None,
            ..Default::default()
        }],
        meanings: vec![Meaning {
            part_of_speech: "noun".to_string(),
            definitions: vec![Definition {
                definition: "The occurrence and development of events by chance in a happy or beneficial way.".to_string(),
                example: Some("A fortunate stroke of serendipity brought the two old friends together.".to_string()),
                synonyms: Vec::new(),
                antonyms: Vec::new(),
            }],
            phonetic: None,
            synonyms: Vec::new(),
            antonyms: Vec::new(),
        }],
        ..Default::default()
    }]
}

pub fn pick_sample_word() -> &'static str {
    SAMPLE_WORDS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(SAMPLE_WORDS[0])
}

/// 每日一词：同一天只请求一次，结果按本地日期缓存在单一键下
pub struct WordOfDayCache {
    store: DatabaseManager,
    clock: Arc<dyn Clock>,
}

impl WordOfDayCache {
    pub fn new(store: DatabaseManager, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// 当天的缓存直接返回，否则随机选词请求；请求失败返回固定词条且不写缓存
    pub async fn get(&self, api: &ApiClient) -> Vec<WordEntry> {
        let today = self.clock.today();

        if let Some(cached) = self.store.get::<WordOfDayCacheEntry>(WORD_OF_DAY_KEY).await {
            if cached.date == today && !cached.data.is_empty() {
                info!(date = %today, word = %cached.data[0].word, "word of the day from cache");
                return cached.data;
            }
        }

        let word = pick_sample_word();
        match api.fetch_definition(word).await {
            Ok(data) => {
                let entry = WordOfDayCacheEntry {
                    date: today,
                    data,
                };
                self.store.set(WORD_OF_DAY_KEY, &entry).await;
                info!(date = %entry.date, word, "fetched word of the day");
                entry.data
            }
            Err(e) => {
                warn!(word, error = %e, "error loading word of the day, using fallback");
                fallback_entry()
            }
        }
    }
}
