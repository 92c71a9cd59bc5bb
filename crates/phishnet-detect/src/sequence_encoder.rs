//! Character-level tokenisation for the sequence classifier.
//!
//! A [`Vocabulary`] is fit once over a training corpus and then threaded
//! explicitly into every encode call. Ids are assigned from 1 in order of
//! first occurrence of each lower-cased character; 0 is padding and
//! `len + 1` is the out-of-vocabulary id.
//!
//! Encoding uses "post" padding and "post" truncation: short URLs are
//! right-padded with 0, long URLs keep their first `max_len` characters.
//!
//! Lower-casing is Unicode-aware and may expand one character into several
//! (`'İ'` becomes `i` followed by U+0307), so a URL containing such
//! characters encodes to more ids than it has characters and its padded
//! tail is correspondingly shorter.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Default encoded sequence length.
pub const DEFAULT_MAX_LEN: usize = 75;

/// Padding id.
pub const PAD_ID: u32 = 0;

/// Fixed-length sequence of token ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedSequence(Vec<u32>);

impl EncodedSequence {
    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of trailing padding ids.
    pub fn padding_len(&self) -> usize {
        self.0.iter().rev().take_while(|&&id| id == PAD_ID).count()
    }

    pub fn into_inner(self) -> Vec<u32> {
        self.0
    }
}

/// Immutable character-to-id mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "VocabularyFile", into = "VocabularyFile")]
pub struct Vocabulary {
    chars: Vec<char>,
    index: HashMap<char, u32>,
}

/// On-disk form of a [`Vocabulary`]; the fingerprint is verified on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct VocabularyFile {
    characters: Vec<char>,
    fingerprint: String,
}

impl TryFrom<VocabularyFile> for Vocabulary {
    type Error = String;

    fn try_from(file: VocabularyFile) -> Result<Self, Self::Error> {
        let vocab = Vocabulary::from_chars(file.characters);
        let actual = vocab.fingerprint();
        if actual != file.fingerprint {
            return Err(format!(
                "vocabulary fingerprint mismatch: file says {}, content hashes to {}",
                file.fingerprint, actual
            ));
        }
        Ok(vocab)
    }
}

impl From<Vocabulary> for VocabularyFile {
    fn from(vocab: Vocabulary) -> Self {
        let fingerprint = vocab.fingerprint();
        Self {
            characters: vocab.chars,
            fingerprint,
        }
    }
}

impl Vocabulary {
    /// Fit a vocabulary over a corpus of URLs.
    ///
    /// # Examples
    ///
    /// ```
    /// use phishnet_detect::sequence_encoder::Vocabulary;
    ///
    /// let vocab = Vocabulary::fit(["ab", "Bc"]);
    /// assert_eq!(vocab.id_of('a'), Some(1));
    /// assert_eq!(vocab.id_of('c'), Some(3));
    /// ```
    pub fn fit<I, S>(corpus: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut chars = Vec::new();
        let mut index = HashMap::new();
        for url in corpus {
            for c in url.as_ref().chars().flat_map(char::to_lowercase) {
                if !index.contains_key(&c) {
                    chars.push(c);
                    index.insert(c, chars.len() as u32);
                }
            }
        }
        Self { chars, index }
    }

    fn from_chars(chars: Vec<char>) -> Self {
        let index = chars
            .iter()
            .enumerate()
            .map(|(i, &c)| (c, i as u32 + 1))
            .collect();
        Self { chars, index }
    }

    /// Number of distinct characters learned.
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Id reserved for characters not seen during fitting.
    pub fn oov_id(&self) -> u32 {
        self.chars.len() as u32 + 1
    }

    /// Rows needed in an embedding table: padding + characters + OOV.
    pub fn embedding_size(&self) -> usize {
        self.chars.len() + 2
    }

    /// Id of a (lower-cased) character, if it was seen during fitting.
    pub fn id_of(&self, c: char) -> Option<u32> {
        self.index.get(&c).copied()
    }

    /// SHA-256 over the ordered characters, hex encoded.
    pub fn fingerprint(&self) -> String {
        let joined: String = self.chars.iter().collect();
        let mut hasher = Sha256::new();
        hasher.update((self.chars.len() as u64).to_le_bytes());
        hasher.update(joined.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Encode a URL into exactly `max_len` ids.
    pub fn encode(&self, url: &str, max_len: usize) -> EncodedSequence {
        let oov = self.oov_id();
        let mut ids: Vec<u32> = url
            .chars()
            .flat_map(char::to_lowercase)
            .take(max_len)
            .map(|c| self.index.get(&c).copied().unwrap_or(oov))
            .collect();
        ids.resize(max_len, PAD_ID);
        EncodedSequence(ids)
    }

    /// Encode many URLs into a flat row-major id buffer of `urls.len() * max_len`.
    pub fn encode_batch<S: AsRef<str>>(&self, urls: &[S], max_len: usize) -> Vec<u32> {
        let mut flat = Vec::with_capacity(urls.len() * max_len);
        for url in urls {
            flat.extend(self.encode(url.as_ref(), max_len).into_inner());
        }
        flat
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab() -> Vocabulary {
        Vocabulary::fit(["http://example.com", "HTTPS://paypal-login.xyz/123"])
    }

    #[test]
    fn test_ids_follow_first_occurrence() {
        let v = Vocabulary::fit(["hello", "world"]);
        assert_eq!(v.id_of('h'), Some(1));
        assert_eq!(v.id_of('e'), Some(2));
        assert_eq!(v.id_of('l'), Some(3));
        assert_eq!(v.id_of('o'), Some(4));
        assert_eq!(v.id_of('w'), Some(5));
        assert_eq!(v.id_of('r'), Some(6));
        assert_eq!(v.id_of('d'), Some(7));
        assert_eq!(v.len(), 7);
        assert_eq!(v.oov_id(), 8);
        assert_eq!(v.embedding_size(), 9);
    }

    #[test]
    fn test_fit_lowercases() {
        let v = Vocabulary::fit(["ABC", "abc"]);
        assert_eq!(v.len(), 3);
        assert_eq!(v.id_of('A'), None);
        assert_eq!(v.id_of('a'), Some(1));
    }

    #[test]
    fn test_encode_pads_to_max_len() {
        let v = vocab();
        for url in ["", "a", "example.com", "http://example.com/path"] {
            let seq = v.encode(url, DEFAULT_MAX_LEN);
            assert_eq!(seq.len(), DEFAULT_MAX_LEN);
            let n = url.chars().count().min(DEFAULT_MAX_LEN);
            assert_eq!(seq.padding_len(), DEFAULT_MAX_LEN - n, "url {url:?}");
        }
    }

    #[test]
    fn test_lowercase_expansion_shortens_padding() {
        let v = Vocabulary::fit(["İ"]);
        assert_eq!(v.len(), 2);
        let seq = v.encode("İ", DEFAULT_MAX_LEN);
        assert_eq!(&seq.as_slice()[..2], &[1, 2]);
        assert_eq!(seq.padding_len(), DEFAULT_MAX_LEN - 2);
    }

    #[test]
    fn test_encode_truncates_tail() {
        let v = Vocabulary::fit(["ab"]);
        let url = format!("{}{}", "a".repeat(75), "b".repeat(10));
        let seq = v.encode(&url, DEFAULT_MAX_LEN);
        assert_eq!(seq.len(), 75);
        assert!(seq.as_slice().iter().all(|&id| id == 1));
    }

    #[test]
    fn test_encode_unknown_chars_use_oov() {
        let v = Vocabulary::fit(["abc"]);
        let seq = v.encode("az", 4);
        assert_eq!(seq.as_slice(), &[1, v.oov_id(), 0, 0]);
    }

    #[test]
    fn test_encode_is_case_insensitive() {
        let v = vocab();
        assert_eq!(v.encode("PAYPAL", 10), v.encode("paypal", 10));
    }

    #[test]
    fn test_encode_batch_is_row_major() {
        let v = Vocabulary::fit(["ab"]);
        let flat = v.encode_batch(&["a", "b"], 3);
        assert_eq!(flat, vec![1, 0, 0, 2, 0, 0]);
    }

    #[test]
    fn test_fingerprint_depends_on_order() {
        let a = Vocabulary::fit(["ab"]);
        let b = Vocabulary::fit(["ba"]);
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint(), Vocabulary::fit(["abab"]).fingerprint());
    }

    #[test]
    fn test_serde_round_trip_verifies_fingerprint() {
        let v = vocab();
        let json = serde_json::to_string(&v).unwrap();
        let back: Vocabulary = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);

        let tampered = json.replace("\"h\"", "\"q\"");
        assert!(serde_json::from_str::<Vocabulary>(&tampered).is_err());
    }
}
