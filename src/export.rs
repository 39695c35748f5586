use anyhow::Result;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tracing::info;

use crate::models::{FavoriteItem, HistoryItem};

pub const CARD_TAG: &str = "lexicruxx";

// Anki 导入格式：正面、背面、标签
#[derive(Debug, Serialize)]
struct FavoriteCard<'a> {
    front: String,
    back: &'a str,
    tags: &'a str,
}

/// 收藏导出为 Anki 卡片，正面是单词和音标，背面是收藏时的释义
pub fn write_favorite_cards<W: Write>(favorites: &[FavoriteItem], writer: W) -> Result<()> {
    let mut csv = csv::WriterBuilder::new().has_headers(false).from_writer(writer);

    for item in favorites {
        let front = if item.phonetic.is_empty() {
            item.word.clone()
        } else {
            format!("{} {}", item.word, item.phonetic)
        };
        csv.serialize(FavoriteCard {
            front,
            back: &item.definition,
            tags: CARD_TAG,
        })?;
    }

    csv.flush()?;
    Ok(())
}

pub fn write_history<W: Write>(history: &[HistoryItem], writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for item in history {
        csv.serialize(item)?;
    }
    csv.flush()?;
    Ok(())
}

pub fn export_favorites(favorites: &[FavoriteItem], output_file: &Path) -> Result<()> {
    let file = std::fs::File::create(output_file)
        .map_err(|e| anyhow::anyhow!("failed to create {}: {}", output_file.display(), e))?;
    write_favorite_cards(favorites, file)?;
    info!(path = %output_file.display(), count = favorites.len(), "exported favorite cards");
    Ok(())
}

pub fn export_history(history: &[HistoryItem], output_file: &Path) -> Result<()> {
    let file = std::fs::File::create(output_file)
        .map_err(|e| anyhow::anyhow!("failed to create {}: {}", output_file.display(), e))?;
    write_history(history, file)?;
    info!(path = %output_file.display(), count = history.len(), "exported history");
    Ok(())
}
