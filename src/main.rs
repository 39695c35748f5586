use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use lexicruxx::export::{export_favorites, export_history};
use lexicruxx::pronunciation::{PronunciationSource, Pronouncer};
use lexicruxx::{Config, LexiCruxx, RelationKind, WordEntry, format_timestamp};

const FAVORITE_PREVIEW_CHARS: usize = 60;

#[derive(Parser, Debug)]
#[command(name = "lexicruxx", about = "Look up English words from the terminal", version)]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, global = true, default_value = lexicruxx::config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Look up a word and record it in the search history.
    Lookup {
        word: String,
    },
    /// Show today's word.
    Today,
    /// Inspect or edit the search history.
    History {
        #[command(subcommand)]
        action: Option<ListAction>,
    },
    /// Inspect or edit favorite words.
    Favorites {
        #[command(subcommand)]
        action: Option<FavoriteAction>,
    },
    /// Save a pronunciation of the word as an audio file.
    Pronounce {
        word: String,
    },
    /// Write favorites or history to a CSV file.
    Export {
        #[arg(value_enum)]
        collection: CollectionKind,
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum ListAction {
    List,
    Remove { word: String },
    Clear {
        /// Confirm clearing every entry.
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
enum FavoriteAction {
    List,
    /// Look up the word, then add or remove it.
    Toggle { word: String },
    Remove { word: String },
    Clear {
        /// Confirm clearing every entry.
        #[arg(long)]
        yes: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CollectionKind {
    Favorites,
    History,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lexicruxx=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load_from(&cli.config)?;
    let mut app = LexiCruxx::new(config).await?;

    match cli.command {
        Command::Lookup { word } => handle_lookup(&mut app, &word).await,
        Command::Today => {
            let data = app.get_word_of_day().await;
            if let Some(entry) = data.first() {
                println!("📅 Word of the day");
                print_entry(entry, app.is_favorite(&entry.word));
            }
        }
        Command::History { action } => handle_history(&mut app, action.unwrap_or(ListAction::List)).await,
        Command::Favorites { action } => {
            handle_favorites(&mut app, action.unwrap_or(FavoriteAction::List)).await
        }
        Command::Pronounce { word } => handle_pronounce(&mut app, &word).await?,
        Command::Export { collection, output } => match collection {
            CollectionKind::Favorites => export_favorites(app.favorites(), &output)?,
            CollectionKind::History => export_history(app.history(), &output)?,
        },
    }

    Ok(())
}

async fn handle_lookup(app: &mut LexiCruxx, word: &str) {
    match app.search(word).await {
        Ok(entry) => print_entry(&entry, app.is_favorite(&entry.word)),
        Err(e) => println!("⚠️  {}", e.user_message(word.trim())),
    }
}

async fn handle_history(app: &mut LexiCruxx, action: ListAction) {
    match action {
        ListAction::List => {
            if app.history().is_empty() {
                println!("No search history yet. Start exploring words!");
                return;
            }
            let now = app.now();
            for item in app.history() {
                println!("{:<24} {}", item.word, format_timestamp(item.timestamp, now));
            }
        }
        ListAction::Remove { word } => {
            let removed = app.remove_from_history(&word).await;
            println!("Removed {} entr{} from history.", removed, if removed == 1 { "y" } else { "ies" });
        }
        ListAction::Clear { yes } => {
            if !yes {
                println!("Refusing to clear history without --yes.");
                return;
            }
            app.clear_history().await;
            println!("🗑️  Search history cleared.");
        }
    }
}

async fn handle_favorites(app: &mut LexiCruxx, action: FavoriteAction) {
    match action {
        FavoriteAction::List => {
            if app.favorites().is_empty() {
                println!("No favorite words yet. Add some with `favorites toggle <word>`.");
                return;
            }
            let now = app.now();
            for item in app.favorites() {
                println!("❤️  {:<22} {}", item.word, format_timestamp(item.timestamp, now));
                if !item.definition.is_empty() {
                    println!("    {}", preview(&item.definition, FAVORITE_PREVIEW_CHARS));
                }
            }
        }
        FavoriteAction::Toggle { word } => match app.search(&word).await {
            Ok(entry) => {
                if app.toggle_favorite(&entry).await {
                    println!("❤️  Added \"{}\" to favorites.", entry.word);
                } else {
                    println!("💔 Removed \"{}\" from favorites.", entry.word);
                }
            }
            Err(e) => println!("⚠️  {}", e.user_message(word.trim())),
        },
        FavoriteAction::Remove { word } => {
            let removed = app.remove_from_favorites(&word).await;
            println!("Removed {} favorite{}.", removed, if removed == 1 { "" } else { "s" });
        }
        FavoriteAction::Clear { yes } => {
            if !yes {
                println!("Refusing to clear favorites without --yes.");
                return;
            }
            app.clear_favorites().await;
            println!("🗑️  Favorite words cleared.");
        }
    }
}

async fn handle_pronounce(app: &mut LexiCruxx, word: &str) -> Result<()> {
    let entry = match app.search(word).await {
        Ok(entry) => entry,
        Err(e) => {
            println!("⚠️  {}", e.user_message(word.trim()));
            return Ok(());
        }
    };

    let pronouncer = Pronouncer::new(app.config.pronunciation.clone(), app.config.tts.clone())?;
    match pronouncer.pronounce(&entry).await {
        PronunciationSource::Recording(path) => println!("🔊 Recording saved to {}", path.display()),
        PronunciationSource::Speech(path) => println!("🗣️  Synthesized speech saved to {}", path.display()),
        PronunciationSource::Unavailable => println!("🔇 No pronunciation available for \"{}\".", entry.word),
    }
    Ok(())
}

fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}

fn print_entry(entry: &WordEntry, favorited: bool) {
    let heart = if favorited { "❤️" } else { "🤍" };
    println!("\n{} {}", entry.word, heart);

    let phonetic = entry.display_phonetic();
    if !phonetic.is_empty() {
        println!("{}", phonetic);
    }

    for meaning in &entry.meanings {
        println!("\n[{}]", meaning.part_of_speech);
        for (i, definition) in meaning.definitions.iter().enumerate() {
            println!("  {}. {}", i + 1, definition.definition);
            if let Some(example) = &definition.example {
                println!("     \"{}\"", example);
            }
        }
    }

    let synonyms = entry.related_words(RelationKind::Synonyms);
    if !synonyms.is_empty() {
        println!("\n📝 Synonyms: {}", synonyms.join(", "));
    }
    let antonyms = entry.related_words(RelationKind::Antonyms);
    if !antonyms.is_empty() {
        println!("🔄 Antonyms: {}", antonyms.join(", "));
    }
}
