//! Order-2 word Markov chain.
//!
//! The corpus is cut into sentences at tokens ending in `.`, `!` or `?`.
//! Each sentence contributes transitions from the pair of preceding words
//! (padded with begin markers) to the next word, or to the end marker.

use rand::Rng;
use std::collections::HashMap;
use std::fmt;

const STATE_SIZE: usize = 2;
const MAX_OVERLAP_RATIO: f64 = 0.7;
const MAX_OVERLAP_TOTAL: usize = 15;
const UNUSABLE: [char; 5] = ['"', '(', ')', '[', ']'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkovError {
    /// No usable sentence in the corpus.
    NotEnoughData,
}

impl fmt::Display for MarkovError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkovError::NotEnoughData => write!(f, "not enough data to build a Markov chain"),
        }
    }
}

impl std::error::Error for MarkovError {}

/// A chain position: `None` stands for the begin marker.
type State = [Option<usize>; STATE_SIZE];

/// Next-word counts. `None` is the end marker.
#[derive(Default)]
struct Transitions {
    choices: Vec<Option<usize>>,
    weights: Vec<u32>,
    total: u32,
}

impl Transitions {
    fn add(&mut self, next: Option<usize>) {
        self.total += 1;
        match self.choices.iter().position(|c| *c == next) {
            Some(i) => self.weights[i] += 1,
            None => {
                self.choices.push(next);
                self.weights.push(1);
            }
        }
    }

    fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<usize> {
        let mut roll = rng.gen_range(0..self.total);
        for (choice, &weight) in self.choices.iter().zip(&self.weights) {
            if roll < weight {
                return *choice;
            }
            roll -= weight;
        }
        None
    }
}

pub struct MarkovModel {
    vocab: Vec<String>,
    chain: HashMap<State, Transitions>,
    /// Usable input sentences re-joined into one text, for the verbatim check.
    rejoined: String,
}

impl MarkovModel {
    /// Build a chain from raw corpus text.
    pub fn new(corpus: &str) -> Result<Self, MarkovError> {
        let mut vocab: Vec<String> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut chain: HashMap<State, Transitions> = HashMap::new();
        let mut sentences = Vec::new();

        for sentence in split_sentences(corpus) {
            if !is_usable_input(&sentence) {
                continue;
            }
            let mut state: State = [None; STATE_SIZE];
            for word in &sentence {
                let id = *index.entry((*word).to_string()).or_insert_with(|| {
                    vocab.push((*word).to_string());
                    vocab.len() - 1
                });
                chain.entry(state).or_default().add(Some(id));
                state = [state[1], Some(id)];
            }
            chain.entry(state).or_default().add(None);
            sentences.push(sentence.join(" "));
        }

        if sentences.is_empty() {
            return Err(MarkovError::NotEnoughData);
        }
        Ok(Self {
            vocab,
            chain,
            rejoined: sentences.join(" "),
        })
    }

    /// One random walk from the begin state. Gives up past `max_words`.
    fn walk<R: Rng + ?Sized>(&self, rng: &mut R, max_words: usize) -> Option<Vec<usize>> {
        let mut state: State = [None; STATE_SIZE];
        let mut words = Vec::new();
        loop {
            let next = self.chain.get(&state)?.pick(rng);
            match next {
                Some(id) => {
                    words.push(id);
                    if words.len() > max_words {
                        return None;
                    }
                    state = [state[1], Some(id)];
                }
                None => return Some(words),
            }
        }
    }

    /// True when the candidate copies too long a run of the input text.
    /// Runs across a sentence boundary count too.
    fn copies_input(&self, words: &[&str]) -> bool {
        let overlap = ((MAX_OVERLAP_RATIO * words.len() as f64).round() as usize)
            .min(MAX_OVERLAP_TOTAL)
            .max(1);
        if words.len() < overlap {
            return false;
        }
        words
            .windows(overlap)
            .any(|gram| contains_words(&self.rejoined, &gram.join(" ")))
    }

    /// Try up to `tries` walks for a novel sentence of `min_words..=max_words` words.
    pub fn make_sentence<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        tries: usize,
        min_words: usize,
        max_words: usize,
    ) -> Option<String> {
        for _ in 0..tries {
            let Some(ids) = self.walk(rng, max_words) else {
                continue;
            };
            if ids.len() < min_words {
                continue;
            }
            let words: Vec<&str> = ids.iter().map(|&id| self.vocab[id].as_str()).collect();
            if self.copies_input(&words) {
                continue;
            }
            return Some(words.join(" "));
        }
        None
    }

    /// Like `make_sentence`, but the result must fit in `max_chars` characters.
    /// `tries` bounds the total number of walks.
    pub fn make_short_sentence<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        max_chars: usize,
        min_words: usize,
        max_words: usize,
        tries: usize,
    ) -> Option<String> {
        for _ in 0..tries {
            if let Some(sentence) = self.make_sentence(rng, 1, min_words, max_words)
                && sentence.chars().count() <= max_chars
            {
                return Some(sentence);
            }
        }
        None
    }
}

/// Whole-word containment: `needle` must start and end on word boundaries of `haystack`.
fn contains_words(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(start, _)| {
        let end = start + needle.len();
        let before_ok = start == 0 || haystack[..start].ends_with(' ');
        let after_ok = end == haystack.len() || haystack[end..].starts_with(' ');
        before_ok && after_ok
    })
}

fn split_sentences(corpus: &str) -> Vec<Vec<&str>> {
    let mut sentences = Vec::new();
    let mut current = Vec::new();
    for word in corpus.split_whitespace() {
        current.push(word);
        if word.ends_with(['.', '!', '?']) {
            sentences.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        sentences.push(current);
    }
    sentences
}

/// Reject sentences with quoting or bracketing that a walk would mangle.
fn is_usable_input(words: &[&str]) -> bool {
    if words.is_empty() {
        return false;
    }
    words
        .iter()
        .all(|w| !w.contains(UNUSABLE) && !w.starts_with('\'') && !w.ends_with('\''))
}
