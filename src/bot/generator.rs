//! Reply generation from the corpus and the stored media.
//!
//! Text replies come from the Markov model when the coin flip allows it and
//! the model produces something usable; otherwise a handful of corpus words
//! are drawn at random. Media replies pick one stored URL.

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, warn};

use crate::bot::corpus::{CorpusState, MediaKind};
use crate::bot::markov::MarkovModel;

/// Sent when the corpus is too small to say anything.
pub const INSUFFICIENT_DATA: &str = "Недостаточно данных для генерации ответа.";

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    /// Probability of attempting the Markov model at all.
    pub markov_ratio: f64,
    pub markov_attempts: usize,
    pub markov_tries: usize,
    pub max_chars: usize,
    pub max_words: usize,
    pub min_words: usize,
    pub random_min_words: usize,
    pub random_max_words: usize,
    /// Below this many corpus words no text is generated.
    pub min_corpus_words: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            markov_ratio: 0.5,
            markov_attempts: 15,
            markov_tries: 100,
            max_chars: 100,
            max_words: 10,
            min_words: 2,
            random_min_words: 3,
            random_max_words: 8,
            min_corpus_words: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseKind {
    Text,
    Media(MediaKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Text(String),
    StaticImage(String),
    Gif(String),
    InsufficientData,
}

impl Response {
    /// What gets posted to the chat.
    pub fn content(&self) -> &str {
        match self {
            Response::Text(s) | Response::StaticImage(s) | Response::Gif(s) => s,
            Response::InsufficientData => INSUFFICIENT_DATA,
        }
    }
}

/// Uniform choice among text and the non-empty media kinds.
pub fn choose_kind<R: Rng + ?Sized>(rng: &mut R, corpus: &CorpusState) -> ResponseKind {
    let mut kinds = vec![ResponseKind::Text];
    if !corpus.static_images.is_empty() {
        kinds.push(ResponseKind::Media(MediaKind::StaticImage));
    }
    if !corpus.gifs.is_empty() {
        kinds.push(ResponseKind::Media(MediaKind::Gif));
    }
    kinds.choose(rng).copied().unwrap_or(ResponseKind::Text)
}

/// Draw `min..=min(max, words.len())` words with replacement.
/// `None` when there are fewer than `min` words.
pub fn generate_random_words<R: Rng + ?Sized>(
    rng: &mut R,
    words: &[&str],
    min: usize,
    max: usize,
) -> Option<String> {
    if words.len() < min || min == 0 {
        return None;
    }
    let count = rng.gen_range(min..=max.min(words.len()).max(min));
    let picked: Vec<&str> = (0..count)
        .filter_map(|_| words.choose(rng).copied())
        .collect();
    Some(picked.join(" "))
}

/// Try the Markov model. Errors are logged and turn into `None`.
fn markov_sentence<R: Rng + ?Sized>(
    rng: &mut R,
    corpus_text: &str,
    config: &GeneratorConfig,
) -> Option<String> {
    let model = match MarkovModel::new(corpus_text) {
        Ok(m) => m,
        Err(e) => {
            warn!("Markov model unavailable: {e}");
            return None;
        }
    };
    for attempt in 0..config.markov_attempts {
        if let Some(sentence) = model.make_short_sentence(
            rng,
            config.max_chars,
            config.min_words,
            config.max_words,
            config.markov_tries,
        ) && sentence.split_whitespace().count() >= config.min_words
        {
            debug!("Markov sentence on attempt {}", attempt + 1);
            return Some(sentence);
        }
    }
    debug!("Markov model gave up after {} attempts", config.markov_attempts);
    None
}

/// Text reply. `use_markov` is the outcome of the caller's coin flip.
pub fn generate_text<R: Rng + ?Sized>(
    rng: &mut R,
    corpus_text: &str,
    words: &[&str],
    use_markov: bool,
    config: &GeneratorConfig,
) -> Response {
    if words.len() < config.min_corpus_words {
        return Response::InsufficientData;
    }
    if use_markov && let Some(sentence) = markov_sentence(rng, corpus_text, config) {
        return Response::Text(sentence);
    }
    match generate_random_words(rng, words, config.random_min_words, config.random_max_words) {
        Some(text) => Response::Text(text),
        None => Response::InsufficientData,
    }
}

/// Full decision: guard, kind selection and content.
pub fn respond<R: Rng + ?Sized>(rng: &mut R, corpus: &CorpusState, config: &GeneratorConfig) -> Response {
    let words = corpus.words();
    if words.len() < config.min_corpus_words && !corpus.has_media() {
        return Response::InsufficientData;
    }

    match choose_kind(rng, corpus) {
        ResponseKind::Text => {
            let use_markov = rng.gen_bool(config.markov_ratio);
            generate_text(rng, &corpus.text, &words, use_markov, config)
        }
        ResponseKind::Media(kind) => {
            let list = corpus.media(kind);
            let Some(url) = list.get(rng.gen_range(0..list.len())).cloned() else {
                return Response::InsufficientData;
            };
            match kind {
                MediaKind::StaticImage => Response::StaticImage(url),
                MediaKind::Gif => Response::Gif(url),
            }
        }
    }
}
