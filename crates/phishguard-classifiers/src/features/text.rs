//! Message normalization for the text pipeline.
use std::collections::HashSet;
use std::sync::OnceLock;

use unicode_segmentation::UnicodeSegmentation;

use crate::data_handling::{LabelMapping, LabeledDataset, RecordFrame};
use crate::error::{PipelineError, Result, Stage};
use crate::features::stemmer::PorterStemmer;

/// English stop words (the NLTK corpus list).
const ENGLISH_STOP_WORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're", "you've",
    "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he", "him", "his", "himself",
    "she", "she's", "her", "hers", "herself", "it", "it's", "its", "itself", "they", "them",
    "their", "theirs", "themselves", "what", "which", "who", "whom", "this", "that", "that'll",
    "these", "those", "am", "is", "are", "was", "were", "be", "been", "being", "have", "has",
    "had", "having", "do", "does", "did", "doing", "a", "an", "the", "and", "but", "if", "or",
    "because", "as", "until", "while", "of", "at", "by", "for", "with", "about", "against",
    "between", "into", "through", "during", "before", "after", "above", "below", "to", "from",
    "up", "down", "in", "out", "on", "off", "over", "under", "again", "further", "then", "once",
    "here", "there", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more",
    "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "s", "t", "can", "will", "just", "don", "don't", "should", "should've", "now",
    "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "aren't", "couldn", "couldn't", "didn",
    "didn't", "doesn", "doesn't", "hadn", "hadn't", "hasn", "hasn't", "haven", "haven't", "isn",
    "isn't", "ma", "mightn", "mightn't", "mustn", "mustn't", "needn", "needn't", "shan", "shan't",
    "shouldn", "shouldn't", "wasn", "wasn't", "weren", "weren't", "won", "won't", "wouldn",
    "wouldn't",
];

fn stop_words() -> &'static HashSet<&'static str> {
    static STOP_WORDS: OnceLock<HashSet<&'static str>> = OnceLock::new();
    STOP_WORDS.get_or_init(|| ENGLISH_STOP_WORDS.iter().copied().collect())
}

/// A normalized message plus the counts used for exploratory logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedText {
    pub text: String,
    pub num_characters: usize,
    pub num_tokens: usize,
}

/// Lowercase, tokenize on word boundaries, keep alphanumeric non-stopwords,
/// stem, rejoin with single spaces.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextNormalizer {
    stemmer: PorterStemmer,
}

impl TextNormalizer {
    pub fn new() -> Self {
        Self {
            stemmer: PorterStemmer::new(),
        }
    }

    pub fn normalize(&self, message: &str) -> String {
        self.analyze(message).text
    }

    pub fn analyze(&self, message: &str) -> NormalizedText {
        let lowered = message.to_lowercase();
        let mut num_tokens = 0;
        let mut kept = Vec::new();
        for token in lowered.split_word_bounds() {
            if token.trim().is_empty() {
                continue;
            }
            num_tokens += 1;
            if !token.chars().all(char::is_alphanumeric) || stop_words().contains(token) {
                continue;
            }
            kept.push(self.stemmer.stem(token));
        }

        NormalizedText {
            text: kept.join(" "),
            num_characters: message.chars().count(),
            num_tokens,
        }
    }
}

/// Build the labeled text dataset: one feature column (the message) and the
/// encoded label column.
pub fn prepare_text(
    frame: &RecordFrame,
    text_column: &str,
    label_column: &str,
) -> Result<LabeledDataset> {
    let raw_labels = frame.column_values(label_column).ok_or_else(|| {
        PipelineError::ingestion(
            "text dataset",
            format!("label column '{}' not found", label_column),
        )
    })?;
    let (mapping, labels) = LabelMapping::fit_encoder(&raw_labels)?;
    let features = frame
        .select_columns(&[text_column.to_string()], Stage::Ingestion)
        .map_err(|e| PipelineError::ingestion("text dataset", e))?;
    LabeledDataset::new(features, labels, mapping)
}

/// Mean character and token counts per class, logged before training.
pub fn log_text_statistics(dataset: &LabeledDataset, target: &str) {
    let normalizer = TextNormalizer::new();
    let mut totals: std::collections::BTreeMap<usize, (usize, usize, usize)> = Default::default();
    for (row, &label) in dataset.features.rows().iter().zip(&dataset.labels) {
        let stats = normalizer.analyze(row.first().map(String::as_str).unwrap_or(""));
        let entry = totals.entry(label).or_default();
        entry.0 += 1;
        entry.1 += stats.num_characters;
        entry.2 += stats.num_tokens;
    }
    for (label, (count, chars, tokens)) in totals {
        log::info!(
            target: target,
            "class {} ({}): {} messages, {:.1} chars and {:.1} tokens on average",
            label,
            dataset.label_mapping.name(label).unwrap_or("?"),
            count,
            chars as f64 / count as f64,
            tokens as f64 / count as f64
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_spam_message() {
        let normalizer = TextNormalizer::new();
        assert_eq!(normalizer.normalize("WIN FREE CASH NOW!!!"), "win free cash");
        assert_eq!(normalizer.normalize("see you at 5pm"), "see 5pm");
        assert_eq!(
            normalizer.normalize("Claim your free prize now"),
            "claim free prize"
        );
    }

    #[test]
    fn counts_raw_tokens_and_characters() {
        let stats = TextNormalizer::new().analyze("Hi, you!");
        assert_eq!(stats.num_characters, 8);
        // "hi" "," "you" "!"
        assert_eq!(stats.num_tokens, 4);
        assert_eq!(stats.text, "hi");
    }

    #[test]
    fn empty_message_normalizes_to_empty() {
        assert_eq!(TextNormalizer::new().normalize("   "), "");
        assert_eq!(TextNormalizer::new().normalize("the a an"), "");
    }

    #[test]
    fn prepare_text_encodes_labels_sorted() {
        let frame = RecordFrame::new(
            vec!["v1".to_string(), "v2".to_string(), "extra".to_string()],
            vec![
                vec!["spam".to_string(), "win".to_string(), String::new()],
                vec!["ham".to_string(), "hello".to_string(), String::new()],
            ],
        )
        .unwrap();
        let data = prepare_text(&frame, "v2", "v1").unwrap();
        assert_eq!(data.features.columns(), &["v2".to_string()]);
        assert_eq!(data.labels, vec![1, 0]);
        assert_eq!(data.label_mapping.name(1), Some("spam"));
    }
}
