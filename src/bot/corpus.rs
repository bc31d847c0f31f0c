//! Rolling text corpus and media lists.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// What an attachment or a reply is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    StaticImage,
    Gif,
}

/// The `bot_data` document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorpusState {
    #[serde(rename = "text_corpus", default)]
    pub text: String,
    #[serde(default)]
    pub static_images: VecDeque<String>,
    #[serde(default)]
    pub gifs: VecDeque<String>,
}

impl CorpusState {
    /// Append cleaned text and keep only the last `max_words` tokens.
    pub fn append_text(&mut self, normalized: &str, max_words: usize) {
        self.text.push_str(normalized);
        self.text.push(' ');
        self.truncate(max_words);
    }

    /// Drop the oldest tokens until at most `max_words` remain.
    pub fn truncate(&mut self, max_words: usize) {
        let words: Vec<&str> = self.text.split_whitespace().collect();
        if words.len() <= max_words {
            return;
        }
        let mut kept = words[words.len() - max_words..].join(" ");
        // Keep the separator so the next append starts a fresh token.
        kept.push(' ');
        self.text = kept;
    }

    /// Append a media URL, evicting the oldest entries past `cap`.
    pub fn append_media(&mut self, kind: MediaKind, url: String, cap: usize) {
        let list = self.media_mut(kind);
        list.push_back(url);
        while list.len() > cap {
            list.pop_front();
        }
    }

    /// Evict the oldest entries of both lists past `cap`.
    pub fn cap_media(&mut self, cap: usize) {
        for list in [&mut self.static_images, &mut self.gifs] {
            while list.len() > cap {
                list.pop_front();
            }
        }
    }

    pub fn media(&self, kind: MediaKind) -> &VecDeque<String> {
        match kind {
            MediaKind::StaticImage => &self.static_images,
            MediaKind::Gif => &self.gifs,
        }
    }

    fn media_mut(&mut self, kind: MediaKind) -> &mut VecDeque<String> {
        match kind {
            MediaKind::StaticImage => &mut self.static_images,
            MediaKind::Gif => &mut self.gifs,
        }
    }

    pub fn words(&self) -> Vec<&str> {
        self.text.split_whitespace().collect()
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }

    pub fn has_media(&self) -> bool {
        !self.static_images.is_empty() || !self.gifs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_text_adds_separator() {
        let mut corpus = CorpusState::default();
        corpus.append_text("one two", 1000);
        corpus.append_text("three", 1000);
        assert_eq!(corpus.text, "one two three ");
        assert_eq!(corpus.word_count(), 3);
    }

    #[test]
    fn test_window_keeps_most_recent_tokens() {
        let mut corpus = CorpusState::default();
        let mut all = Vec::new();
        for i in 0..40 {
            let chunk: Vec<String> = (0..7).map(|j| format!("w{}_{}", i, j)).collect();
            all.extend(chunk.clone());
            corpus.append_text(&chunk.join(" "), 100);

            let words = corpus.words();
            assert!(words.len() <= 100);
            let expected: Vec<&str> = all[all.len().saturating_sub(100)..]
                .iter()
                .map(String::as_str)
                .collect();
            assert_eq!(words, expected);
        }
    }

    #[test]
    fn test_append_after_truncate_does_not_glue_tokens() {
        let mut corpus = CorpusState::default();
        corpus.append_text("a b c", 2);
        assert_eq!(corpus.words(), vec!["b", "c"]);
        corpus.append_text("d", 2);
        assert_eq!(corpus.words(), vec!["c", "d"]);
    }

    #[test]
    fn test_media_fifo_eviction() {
        let mut corpus = CorpusState::default();
        for i in 0..50 {
            corpus.append_media(MediaKind::Gif, format!("https://cdn/{i}.gif"), 50);
        }
        assert_eq!(corpus.gifs.len(), 50);
        corpus.append_media(MediaKind::Gif, "https://cdn/50.gif".into(), 50);
        assert_eq!(corpus.gifs.len(), 50);
        assert_eq!(corpus.gifs.front().map(String::as_str), Some("https://cdn/1.gif"));
        assert_eq!(corpus.gifs.back().map(String::as_str), Some("https://cdn/50.gif"));
        assert!(corpus.static_images.is_empty());
    }

    #[test]
    fn test_serde_field_names() {
        let mut corpus = CorpusState::default();
        corpus.append_media(MediaKind::StaticImage, "u".into(), 50);
        let value = serde_json::to_value(&corpus).unwrap();
        assert_eq!(value["text_corpus"], "");
        assert_eq!(value["static_images"][0], "u");
        assert!(value["gifs"].as_array().unwrap().is_empty());
    }
}
