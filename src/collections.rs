use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::database::{DatabaseManager, FAVORITES_KEY, HISTORY_KEY};
use crate::models::{FavoriteItem, HistoryItem, WordEntry};

pub const HISTORY_CAPACITY: usize = 50;

/// 有序集合：按键去重，新元素插入到最前面，可选容量上限。
///
/// 每次修改后立即写回存储。
pub struct BoundedCollection<T> {
    storage_key: &'static str,
    capacity: Option<usize>,
    key_of: fn(&T) -> &str,
    items: Vec<T>,
    store: DatabaseManager,
}

pub type History = BoundedCollection<HistoryItem>;
pub type Favorites = BoundedCollection<FavoriteItem>;

impl<T> BoundedCollection<T>
where
    T: Serialize + DeserializeOwned,
{
    /// 从存储中读取已有数据；读不到时从空集合开始
    pub async fn load(
        store: DatabaseManager,
        storage_key: &'static str,
        capacity: Option<usize>,
        key_of: fn(&T) -> &str,
    ) -> Self {
        let mut items: Vec<T> = store.get(storage_key).await.unwrap_or_default();
        if let Some(capacity) = capacity {
            items.truncate(capacity);
        }
        debug!(storage_key, count = items.len(), "loaded collection");

        Self {
            storage_key,
            capacity,
            key_of,
            items,
            store,
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.items.iter().any(|item| (self.key_of)(item) == key)
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.items.iter().find(|item| (self.key_of)(item) == key)
    }

    /// 删除同键的旧元素后插入到最前面，超出容量的部分从尾部截断
    pub async fn upsert_front(&mut self, item: T) -> &[T] {
        let key_of = self.key_of;
        let key = key_of(&item).to_string();
        self.items.retain(|existing| key_of(existing) != key);
        self.items.insert(0, item);
        if let Some(capacity) = self.capacity {
            self.items.truncate(capacity);
        }

        self.persist().await;
        &self.items
    }

    /// 返回被删除的元素数量
    pub async fn remove_by_key(&mut self, key: &str) -> usize {
        let key_of = self.key_of;
        let before = self.items.len();
        self.items.retain(|existing| key_of(existing) != key);

        self.persist().await;
        before - self.items.len()
    }

    pub async fn clear(&mut self) {
        self.items.clear();
        self.persist().await;
    }

    async fn persist(&self) {
        self.store.set(self.storage_key, &self.items).await;
    }
}

fn history_word(item: &HistoryItem) -> &str {
    &item.word
}

fn favorite_word(item: &FavoriteItem) -> &str {
    &item.word
}

impl History {
    pub async fn load_history(store: DatabaseManager, capacity: usize) -> Self {
        Self::load(store, HISTORY_KEY, Some(capacity), history_word).await
    }

    pub async fn record(&mut self, word: &str, timestamp: i64) -> &[HistoryItem] {
        self.upsert_front(HistoryItem {
            word: word.to_lowercase(),
            timestamp,
        })
        .await
    }
}

impl Favorites {
    pub async fn load_favorites(store: DatabaseManager) -> Self {
        Self::load(store, FAVORITES_KEY, None, favorite_word).await
    }

    pub fn is_favorite(&self, word: &str) -> bool {
        self.contains(&word.to_lowercase())
    }

    /// 已收藏则取消，未收藏则以当前词条的快照加入；返回切换后是否处于收藏状态
    pub async fn toggle(&mut self, entry: &WordEntry, timestamp: i64) -> bool {
        let word = entry.word.to_lowercase();
        if self.contains(&word) {
            self.remove_by_key(&word).await;
            false
        } else {
            self.upsert_front(FavoriteItem::snapshot(entry, timestamp)).await;
            true
        }
    }
}
