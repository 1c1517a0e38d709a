//! Reading-time estimate from a post body.
//!
//! Words are whitespace-separated runs containing at least one letter or
//! digit (a lone `-` or `|` does not count). CJK ideographs and kana count as
//! one word each, since those scripts do not separate words with spaces.
//!
//! The displayed value is `ceil(minutes)` after rounding minutes to two
//! decimals: at 200 wpm, 202 words (1.01 min) reads "2 min read" while
//! 1001 words at 1000 wpm (1.001 min → 1.00) still reads "1 min read".

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingTime {
    pub words: usize,
    pub minutes: f64,
    pub text: String,
}

pub fn reading_time(body: &str, words_per_minute: u32) -> ReadingTime {
    let words = count_words(body);
    let minutes = words as f64 / f64::from(words_per_minute.max(1));
    let displayed = ((minutes * 100.0).round() / 100.0).ceil() as u64;
    ReadingTime {
        words,
        minutes,
        text: format!("{displayed} min read"),
    }
}

pub fn count_words(text: &str) -> usize {
    let mut count = 0;
    let mut in_word = false;
    let mut word_has_alnum = false;
    for c in text.chars() {
        if is_cjk(c) {
            if in_word && word_has_alnum {
                count += 1;
            }
            in_word = false;
            word_has_alnum = false;
            count += 1;
        } else if c.is_whitespace() {
            if in_word && word_has_alnum {
                count += 1;
            }
            in_word = false;
            word_has_alnum = false;
        } else {
            in_word = true;
            word_has_alnum |= c.is_alphanumeric();
        }
    }
    if in_word && word_has_alnum {
        count += 1;
    }
    count
}

fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{3040}'..='\u{30ff}'     // Hiragana, Katakana
        | '\u{3400}'..='\u{4dbf}'   // CJK Extension A
        | '\u{4e00}'..='\u{9fff}'   // CJK Unified Ideographs
        | '\u{ac00}'..='\u{d7af}'   // Hangul syllables
        | '\u{f900}'..='\u{faff}'   // CJK Compatibility Ideographs
    )
}
