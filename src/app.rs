use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use crate::api::ApiClient;
use crate::clock::{Clock, SystemClock};
use crate::collections::{Favorites, History};
use crate::config::Config;
use crate::database::DatabaseManager;
use crate::error::LookupError;
use crate::models::{FavoriteItem, HistoryItem, WordEntry};
use crate::word_of_day::WordOfDayCache;

/// 应用核心：查词、历史记录、收藏与每日一词。
///
/// 由调用方显式创建并持有，界面层只通过这里的方法读写数据。
pub struct LexiCruxx {
    api_client: ApiClient,
    history: History,
    favorites: Favorites,
    word_of_day: WordOfDayCache,
    clock: Arc<dyn Clock>,
    current_word: Option<WordEntry>,
    pub config: Config,
}

impl LexiCruxx {
    pub async fn new(config: Config) -> Result<Self> {
        let api_client = ApiClient::new(&config)?;
        let db_manager = DatabaseManager::new(&config).await?;

        Ok(Self::with_parts(config, api_client, db_manager, Arc::new(SystemClock)).await)
    }

    pub async fn with_parts(
        config: Config,
        api_client: ApiClient,
        db_manager: DatabaseManager,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let history = History::load_history(db_manager.clone(), config.history.capacity).await;
        let favorites = Favorites::load_favorites(db_manager.clone()).await;
        let word_of_day = WordOfDayCache::new(db_manager, clock.clone());

        LexiCruxx {
            api_client,
            history,
            favorites,
            word_of_day,
            clock,
            current_word: None,
            config,
        }
    }

    pub async fn fetch_definition(&self, word: &str) -> Result<Vec<WordEntry>, LookupError> {
        self.api_client.fetch_definition(word).await
    }

    /// 处理一次搜索：成功时记入历史并设为当前单词
    pub async fn search(&mut self, query: &str) -> Result<WordEntry, LookupError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(LookupError::EmptyQuery);
        }

        let entry = self
            .fetch_definition(query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| LookupError::MalformedResponse {
                word: query.to_lowercase(),
                reason: "empty entry list".to_string(),
            })?;

        self.upsert_history(query).await;
        info!(query, word = %entry.word, "lookup succeeded");
        self.current_word = Some(entry.clone());
        Ok(entry)
    }

    pub async fn get_word_of_day(&self) -> Vec<WordEntry> {
        self.word_of_day.get(&self.api_client).await
    }

    pub async fn upsert_history(&mut self, word: &str) -> &[HistoryItem] {
        let timestamp = self.clock.now_millis();
        self.history.record(word, timestamp).await
    }

    /// 返回切换后是否处于收藏状态
    pub async fn toggle_favorite(&mut self, entry: &WordEntry) -> bool {
        let timestamp = self.clock.now_millis();
        self.favorites.toggle(entry, timestamp).await
    }

    /// 没有当前单词时不做任何事
    pub async fn toggle_current_favorite(&mut self) -> Option<bool> {
        let entry = self.current_word.clone()?;
        Some(self.toggle_favorite(&entry).await)
    }

    pub async fn remove_from_history(&mut self, word: &str) -> usize {
        self.history.remove_by_key(&word.to_lowercase()).await
    }

    pub async fn remove_from_favorites(&mut self, word: &str) -> usize {
        self.favorites.remove_by_key(&word.to_lowercase()).await
    }

    /// 调用前由界面层确认
    pub async fn clear_history(&mut self) {
        self.history.clear().await;
    }

    /// 调用前由界面层确认
    pub async fn clear_favorites(&mut self) {
        self.favorites.clear().await;
    }

    pub fn history(&self) -> &[HistoryItem] {
        self.history.items()
    }

    pub fn favorites(&self) -> &[FavoriteItem] {
        self.favorites.items()
    }

    pub fn is_favorite(&self, word: &str) -> bool {
        self.favorites.is_favorite(word)
    }

    pub fn current_word(&self) -> Option<&WordEntry> {
        self.current_word.as_ref()
    }

    pub fn now(&self) -> chrono::DateTime<chrono::Local> {
        self.clock.now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{SAMPLE_BODY, ScriptedTransport, ok, status};
    use crate::clock::testing::ManualClock;
    use crate::database::HISTORY_KEY;

    struct Harness {
        app: LexiCruxx,
        transport: Arc<ScriptedTransport>,
        clock: Arc<ManualClock>,
        store: DatabaseManager,
    }

    async fn harness(transport: Arc<ScriptedTransport>) -> Harness {
        let mut config = Config::default();
        config.network.retry_delay_ms = 1;

        let store = DatabaseManager::in_memory().await.unwrap();
        let clock = Arc::new(ManualClock::at_millis(1_000));
        let api = ApiClient::with_transport(&config, transport.clone());
        let app = LexiCruxx::with_parts(config, api, store.clone(), clock.clone()).await;

        Harness {
            app,
            transport,
            clock,
            store,
        }
    }

    #[tokio::test]
    async fn successful_search_records_history_and_current_word() {
        let mut h = harness(ScriptedTransport::always(ok(SAMPLE_BODY))).await;

        let entry = h.app.search("  Serendipity ").await.unwrap();
        assert_eq!(entry.word, "serendipity");
        assert_eq!(h.app.current_word(), Some(&entry));
        assert_eq!(
            h.app.history(),
            &[HistoryItem { word: "serendipity".into(), timestamp: 1_000 }]
        );
    }

    #[tokio::test]
    async fn unknown_word_is_not_found_without_retry() {
        let mut h = harness(ScriptedTransport::always(status(404))).await;

        let error = h.app.search("asdfqwer").await.unwrap_err();
        assert_eq!(error, LookupError::NotFound { word: "asdfqwer".into() });
        assert_eq!(h.transport.call_count(), 1);
        assert!(h.app.history().is_empty());
        assert!(h.app.current_word().is_none());
    }

    #[tokio::test]
    async fn empty_query_makes_no_request() {
        let mut h = harness(ScriptedTransport::always(ok(SAMPLE_BODY))).await;

        assert_eq!(h.app.search("   ").await, Err(LookupError::EmptyQuery));
        assert_eq!(h.transport.call_count(), 0);
    }

    #[tokio::test]
    async fn upsert_history_refreshes_existing_entry() {
        let h = harness(ScriptedTransport::always(status(404))).await;
        h.store
            .set(HISTORY_KEY, &vec![HistoryItem { word: "cat".into(), timestamp: 100 }])
            .await;
        let mut h = harness_with_store(h).await;

        h.clock.set_millis(200);
        let items = h.app.upsert_history("cat").await.to_vec();
        assert_eq!(items, vec![HistoryItem { word: "cat".into(), timestamp: 200 }]);

        let persisted: Vec<HistoryItem> = h.store.get(HISTORY_KEY).await.unwrap();
        assert_eq!(persisted, items);
    }

    // 在已有数据的存储上重新创建核心对象
    async fn harness_with_store(h: Harness) -> Harness {
        let mut config = Config::default();
        config.network.retry_delay_ms = 1;
        let api = ApiClient::with_transport(&config, h.transport.clone());
        let app = LexiCruxx::with_parts(config, api, h.store.clone(), h.clock.clone()).await;
        Harness { app, ..h }
    }

    #[tokio::test]
    async fn toggling_current_word_twice_is_a_no_op() {
        let mut h = harness(ScriptedTransport::always(ok(SAMPLE_BODY))).await;
        assert_eq!(h.app.toggle_current_favorite().await, None);

        h.app.search("serendipity").await.unwrap();
        let before = h.app.favorites().to_vec();

        assert_eq!(h.app.toggle_current_favorite().await, Some(true));
        assert!(h.app.is_favorite("Serendipity"));
        assert_eq!(h.app.favorites()[0].phonetic, "/ˌsɛɹənˈdɪpɪti/");

        assert_eq!(h.app.toggle_current_favorite().await, Some(false));
        assert_eq!(h.app.favorites(), before.as_slice());
    }

    #[tokio::test]
    async fn state_survives_restart() {
        let mut h = harness(ScriptedTransport::always(ok(SAMPLE_BODY))).await;
        h.app.search("serendipity").await.unwrap();
        h.app.toggle_current_favorite().await;

        let h = harness_with_store(h).await;
        assert_eq!(h.app.history().len(), 1);
        assert!(h.app.is_favorite("serendipity"));
    }

    #[tokio::test]
    async fn removals_and_clears() {
        let mut h = harness(ScriptedTransport::always(ok(SAMPLE_BODY))).await;
        h.app.search("serendipity").await.unwrap();
        h.app.upsert_history("other").await;
        h.app.toggle_current_favorite().await;

        assert_eq!(h.app.remove_from_history("OTHER").await, 1);
        assert_eq!(h.app.history().len(), 1);
        assert_eq!(h.app.remove_from_favorites("serendipity").await, 1);
        assert!(h.app.favorites().is_empty());

        h.app.clear_history().await;
        h.app.clear_favorites().await;
        assert!(h.app.history().is_empty());
    }

    #[tokio::test]
    async fn word_of_day_is_cached_per_day() {
        let h = harness(ScriptedTransport::always(ok(SAMPLE_BODY))).await;
        h.app.get_word_of_day().await;
        h.app.get_word_of_day().await;
        assert_eq!(h.transport.call_count(), 1);

        h.clock.advance(chrono::Duration::days(2));
        h.app.get_word_of_day().await;
        assert_eq!(h.transport.call_count(), 2);
    }
}
