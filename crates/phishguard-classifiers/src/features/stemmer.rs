//! Porter stemmer for lowercase English tokens.

/// Classic five-step Porter suffix stripper.
///
/// Only lowercase ASCII words are stemmed; anything else (digits mixed in are
/// fine, accented letters are not) is returned unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PorterStemmer;

impl PorterStemmer {
    pub fn new() -> Self {
        PorterStemmer
    }

    pub fn stem(&self, word: &str) -> String {
        if word.len() <= 2 || !word.is_ascii() {
            return word.to_string();
        }

        let mut w = Word {
            b: word.to_ascii_lowercase().into_bytes(),
        };
        w.step1a();
        w.step1b();
        w.step1c();
        w.step2();
        w.step3();
        w.step4();
        w.step5a();
        w.step5b();
        String::from_utf8_lossy(&w.b).into_owned()
    }
}

struct Word {
    b: Vec<u8>,
}

impl Word {
    fn is_consonant(&self, i: usize) -> bool {
        match self.b[i] {
            b'a' | b'e' | b'i' | b'o' | b'u' => false,
            b'y' => i == 0 || !self.is_consonant(i - 1),
            _ => true,
        }
    }

    /// Number of vowel-consonant sequences in `b[..len]`.
    fn measure(&self, len: usize) -> usize {
        let mut m = 0;
        let mut i = 0;
        while i < len && self.is_consonant(i) {
            i += 1;
        }
        loop {
            while i < len && !self.is_consonant(i) {
                i += 1;
            }
            if i >= len {
                break;
            }
            while i < len && self.is_consonant(i) {
                i += 1;
            }
            m += 1;
        }
        m
    }

    fn has_vowel(&self, len: usize) -> bool {
        (0..len).any(|i| !self.is_consonant(i))
    }

    fn double_consonant(&self, len: usize) -> bool {
        len >= 2 && self.b[len - 1] == self.b[len - 2] && self.is_consonant(len - 1)
    }

    fn cvc(&self, len: usize) -> bool {
        len >= 3
            && self.is_consonant(len - 3)
            && !self.is_consonant(len - 2)
            && self.is_consonant(len - 1)
            && !matches!(self.b[len - 1], b'w' | b'x' | b'y')
    }

    fn ends(&self, suffix: &str) -> bool {
        self.b.ends_with(suffix.as_bytes())
    }

    fn stem_len(&self, suffix: &str) -> usize {
        self.b.len() - suffix.len()
    }

    fn replace(&mut self, suffix: &str, replacement: &str) {
        let keep = self.stem_len(suffix);
        self.b.truncate(keep);
        self.b.extend_from_slice(replacement.as_bytes());
    }

    /// First suffix in `rules` that matches decides; it is replaced only when
    /// the remaining stem has a positive measure.
    fn apply_rules(&mut self, rules: &[(&str, &str)]) {
        if let Some((suffix, replacement)) = rules.iter().find(|(s, _)| self.ends(s)) {
            if self.measure(self.stem_len(suffix)) > 0 {
                self.replace(suffix, replacement);
            }
        }
    }

    fn step1a(&mut self) {
        if self.ends("sses") {
            self.replace("sses", "ss");
        } else if self.ends("ies") {
            self.replace("ies", "i");
        } else if self.ends("s") && !self.ends("ss") {
            self.replace("s", "");
        }
    }

    fn step1b(&mut self) {
        if self.ends("eed") {
            if self.measure(self.stem_len("eed")) > 0 {
                self.replace("eed", "ee");
            }
            return;
        }

        let suffix = ["ed", "ing"]
            .into_iter()
            .find(|s| self.ends(s) && self.has_vowel(self.stem_len(s)));
        match suffix {
            Some(s) => self.replace(s, ""),
            None => return,
        }

        let len = self.b.len();
        if self.ends("at") || self.ends("bl") || self.ends("iz") {
            self.b.push(b'e');
        } else if self.double_consonant(len) && !matches!(self.b[len - 1], b'l' | b's' | b'z') {
            self.b.pop();
        } else if self.measure(len) == 1 && self.cvc(len) {
            self.b.push(b'e');
        }
    }

    fn step1c(&mut self) {
        if self.ends("y") && self.has_vowel(self.stem_len("y")) {
            self.replace("y", "i");
        }
    }

    fn step2(&mut self) {
        self.apply_rules(&[
            ("ational", "ate"),
            ("tional", "tion"),
            ("enci", "ence"),
            ("anci", "ance"),
            ("izer", "ize"),
            ("bli", "ble"),
            ("alli", "al"),
            ("entli", "ent"),
            ("eli", "e"),
            ("ousli", "ous"),
            ("ization", "ize"),
            ("ation", "ate"),
            ("ator", "ate"),
            ("alism", "al"),
            ("iveness", "ive"),
            ("fulness", "ful"),
            ("ousness", "ous"),
            ("aliti", "al"),
            ("iviti", "ive"),
            ("biliti", "ble"),
            ("logi", "log"),
        ]);
    }

    fn step3(&mut self) {
        self.apply_rules(&[
            ("icate", "ic"),
            ("ative", ""),
            ("alize", "al"),
            ("iciti", "ic"),
            ("ical", "ic"),
            ("ful", ""),
            ("ness", ""),
        ]);
    }

    fn step4(&mut self) {
        const SUFFIXES: &[&str] = &[
            "al", "ance", "ence", "er", "ic", "able", "ible", "ant", "ement", "ment", "ent", "ion",
            "ou", "ism", "ate", "iti", "ous", "ive", "ize",
        ];
        let matched = SUFFIXES.iter().find(|s| {
            if !self.ends(s) {
                return false;
            }
            if **s == "ion" {
                let stem = self.stem_len(s);
                return stem > 0 && matches!(self.b[stem - 1], b's' | b't');
            }
            true
        });
        if let Some(suffix) = matched {
            if self.measure(self.stem_len(suffix)) > 1 {
                self.replace(suffix, "");
            }
        }
    }

    fn step5a(&mut self) {
        if self.ends("e") {
            let stem = self.stem_len("e");
            let m = self.measure(stem);
            if m > 1 || (m == 1 && !self.cvc(stem)) {
                self.b.truncate(stem);
            }
        }
    }

    fn step5b(&mut self) {
        let len = self.b.len();
        if self.ends("l") && self.double_consonant(len) && self.measure(len) > 1 {
            self.b.pop();
        }
    }
}
