//! Word pool and word sources.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::path::Path;

use rand::Rng;
use rand::seq::SliceRandom;
use sketchroom_protocol::Difficulty;

// ---------------------------------------------------------------------------
// WordPool
// ---------------------------------------------------------------------------

/// The undrawn candidate words of the current game.
///
/// Draws sample uniformly without replacement. The pool is only ever
/// replaced wholesale, at game start.
#[derive(Debug, Clone, Default)]
pub struct WordPool {
    words: Vec<String>,
}

impl WordPool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a pool holding `words` (normalized, see [`refill`](Self::refill)).
    pub fn from_words<I>(words: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut pool = Self::new();
        pool.refill(words);
        pool
    }

    /// Replaces the whole pool with `words`.
    ///
    /// Entries are trimmed; blanks and case-insensitive duplicates are
    /// dropped. Leftovers from the previous game never survive.
    pub fn refill<I>(&mut self, words: I)
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut seen = HashSet::new();
        self.words = words
            .into_iter()
            .map(Into::into)
            .map(|w| w.trim().to_string())
            .filter(|w| !w.is_empty() && seen.insert(w.to_lowercase()))
            .collect();
    }

    /// Removes and returns a uniformly random word, or `None` once the
    /// pool is exhausted.
    pub fn draw(&mut self) -> Option<String> {
        self.draw_with(&mut rand::rng())
    }

    /// [`draw`](Self::draw) with a caller-supplied RNG.
    pub fn draw_with<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<String> {
        if self.words.is_empty() {
            return None;
        }
        let idx = rng.random_range(0..self.words.len());
        Some(self.words.swap_remove(idx))
    }

    /// Words left.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Whether every word has been drawn.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// The remaining words, in no particular order.
    pub fn remaining(&self) -> &[String] {
        &self.words
    }
}

// ---------------------------------------------------------------------------
// WordSource
// ---------------------------------------------------------------------------

/// Supplies candidate words at game start.
///
/// Implementations may return fewer than `count` words, or none at all.
/// Callers bound the wait with a timeout, so a slow source degrades to
/// "no words" rather than a stuck room.
pub trait WordSource: Send + Sync + 'static {
    /// Produces up to `count` words for the given difficulty and category.
    fn generate(
        &self,
        difficulty: Difficulty,
        category: &str,
        count: usize,
    ) -> impl Future<Output = Vec<String>> + Send;
}

/// Category that unknown categories fall back to.
pub const FALLBACK_CATEGORY: &str = "general";

/// An in-memory, categorised word list.
#[derive(Debug, Clone, Default)]
pub struct StaticWordSource {
    categories: HashMap<String, Vec<String>>,
}

impl StaticWordSource {
    /// Creates an empty source. Add lists with [`with_category`](Self::with_category).
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a category.
    pub fn with_category<I, S>(mut self, category: &str, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories.insert(
            category.trim().to_lowercase(),
            words.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// A small built-in list, enough to play without any setup.
    pub fn builtin() -> Self {
        Self::new()
            .with_category(
                "general",
                [
                    "house", "tree", "sun", "car", "boat", "clock", "bridge", "guitar",
                    "ladder", "umbrella", "candle", "rocket", "castle", "pencil", "mirror",
                    "balloon", "anchor", "bicycle", "lighthouse", "telescope", "volcano",
                    "rainbow", "snowman", "envelope", "scissors", "backpack", "windmill",
                    "hammer", "kite", "crown",
                ],
            )
            .with_category(
                "animals",
                [
                    "cat", "dog", "fish", "horse", "rabbit", "turtle", "penguin", "giraffe",
                    "elephant", "octopus", "kangaroo", "dolphin", "squirrel", "butterfly",
                    "crocodile", "owl", "frog", "snail", "zebra", "lobster", "camel",
                    "peacock", "hedgehog", "flamingo",
                ],
            )
            .with_category(
                "food",
                [
                    "pizza", "apple", "bread", "cheese", "banana", "burger", "pancake",
                    "sandwich", "popcorn", "noodles", "pretzel", "cupcake", "watermelon",
                    "ice cream", "hot dog", "carrot", "cookie", "grapes", "taco", "donut",
                    "pineapple", "broccoli",
                ],
            )
    }

    /// Loads one category per `<category>.txt` file in `dir`.
    ///
    /// One word per line; blank lines and lines starting with `#` are
    /// skipped. Files with no words are ignored.
    pub fn from_dir(dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let mut source = Self::new();
        for entry in std::fs::read_dir(dir.as_ref())? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("txt") {
                continue;
            }
            let Some(category) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let words: Vec<String> = std::fs::read_to_string(&path)?
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#'))
                .map(str::to_string)
                .collect();
            if words.is_empty() {
                tracing::warn!(path = %path.display(), "word list is empty, skipping");
                continue;
            }
            tracing::debug!(category, words = words.len(), "loaded word list");
            source = source.with_category(category, words);
        }
        Ok(source)
    }

    /// Category names, sorted.
    pub fn categories(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.categories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Picks words for a request. Synchronous core of [`WordSource::generate`].
    pub fn pick(&self, difficulty: Difficulty, category: &str, count: usize) -> Vec<String> {
        let list = self
            .categories
            .get(&category.trim().to_lowercase())
            .or_else(|| self.categories.get(FALLBACK_CATEGORY))
            .or_else(|| self.categories.values().next());
        let Some(list) = list else {
            return Vec::new();
        };

        let mut banded: Vec<&String> = list.iter().filter(|w| fits(difficulty, w)).collect();
        if banded.len() < count {
            banded = list.iter().collect();
        }
        banded.shuffle(&mut rand::rng());
        banded.into_iter().take(count).cloned().collect()
    }
}

/// Length bands per difficulty; they overlap on purpose so small lists
/// still have something for every level.
fn fits(difficulty: Difficulty, word: &str) -> bool {
    let len = word.chars().filter(|c| !c.is_whitespace()).count();
    match difficulty {
        Difficulty::Easy => len <= 5,
        Difficulty::Medium => (4..=8).contains(&len),
        Difficulty::Hard => len >= 7,
    }
}

impl WordSource for StaticWordSource {
    async fn generate(&self, difficulty: Difficulty, category: &str, count: usize) -> Vec<String> {
        self.pick(difficulty, category, count)
    }
}
