//! Phonetic encodings for name comparison
//!
//! Soundex (letter + 3 digits) and a simplified Metaphone. Both ignore
//! anything that is not an ASCII letter.

fn ascii_letters(s: &str) -> Vec<char> {
    s.chars()
        .filter(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn soundex_digit(c: char) -> Option<char> {
    match c {
        'b' | 'f' | 'p' | 'v' => Some('1'),
        'c' | 'g' | 'j' | 'k' | 'q' | 's' | 'x' | 'z' => Some('2'),
        'd' | 't' => Some('3'),
        'l' => Some('4'),
        'm' | 'n' => Some('5'),
        'r' => Some('6'),
        _ => None,
    }
}

/// Soundex code, e.g. "Robert" → "R163". Empty for input without letters.
pub fn soundex(s: &str) -> String {
    let chars = ascii_letters(s);
    let Some(&first) = chars.first() else {
        return String::new();
    };

    let mut result = String::with_capacity(4);
    result.push(first.to_ascii_uppercase());
    let mut prev = soundex_digit(first);

    for &c in &chars[1..] {
        if result.len() >= 4 {
            break;
        }
        let code = soundex_digit(c);
        if let Some(digit) = code {
            if code != prev {
                result.push(digit);
            }
        }
        // h and w do not separate letters with the same code
        if c != 'h' && c != 'w' {
            prev = code;
        }
    }

    while result.len() < 4 {
        result.push('0');
    }
    result
}

fn is_vowel(c: Option<char>) -> bool {
    matches!(c, Some('a' | 'e' | 'i' | 'o' | 'u'))
}

/// Simplified Metaphone code for a single word or phrase.
///
/// Covers the common English rules (silent initial letters, soft c/g,
/// ph/th/sh digraphs, silent gh) without the full exception table.
pub fn metaphone(s: &str) -> String {
    let mut w = ascii_letters(s);
    if w.is_empty() {
        return String::new();
    }

    // Initial letter exceptions
    match (w[0], w.get(1).copied()) {
        ('k' | 'g' | 'p', Some('n')) | ('w', Some('r')) | ('a', Some('e')) => {
            w.remove(0);
        }
        ('x', _) => w[0] = 's',
        ('w', Some('h')) => {
            w.remove(1);
        }
        _ => {}
    }

    let at = |i: usize| w.get(i).copied();
    let mut out = String::new();

    for i in 0..w.len() {
        let c = w[i];
        let prev = if i > 0 { at(i - 1) } else { None };
        let next = at(i + 1);
        let next2 = at(i + 2);

        // Skip doubled letters except c
        if prev == Some(c) && c != 'c' {
            continue;
        }

        match c {
            'a' | 'e' | 'i' | 'o' | 'u' => {
                if i == 0 {
                    out.push(c.to_ascii_uppercase());
                }
            }
            'b' => {
                if !(prev == Some('m') && next.is_none()) {
                    out.push('B');
                }
            }
            'c' => {
                if next == Some('i') && next2 == Some('a') {
                    out.push('X');
                } else if next == Some('h') {
                    if prev == Some('s') {
                        out.push('K');
                    } else {
                        out.push('X');
                    }
                } else if matches!(next, Some('i' | 'e' | 'y')) {
                    if prev != Some('s') {
                        out.push('S');
                    }
                } else {
                    out.push('K');
                }
            }
            'd' => {
                if next == Some('g') && matches!(next2, Some('e' | 'y' | 'i')) {
                    out.push('J');
                } else {
                    out.push('T');
                }
            }
            'g' => {
                if next == Some('h') && !(next2.is_none() || is_vowel(next2)) {
                    continue;
                }
                let silent_gn = next2.is_none() || (next2 == Some('e') && at(i + 3) == Some('d'));
                if next == Some('n') && silent_gn {
                    continue;
                }
                if prev == Some('d') && matches!(next, Some('e' | 'y' | 'i')) {
                    continue;
                }
                if matches!(next, Some('i' | 'e' | 'y')) {
                    out.push('J');
                } else {
                    out.push('K');
                }
            }
            'h' => {
                if is_vowel(next) && !matches!(prev, Some('c' | 's' | 'p' | 't' | 'g')) {
                    out.push('H');
                }
            }
            'k' => {
                if prev != Some('c') {
                    out.push('K');
                }
            }
            'p' => {
                if next == Some('h') {
                    out.push('F');
                } else {
                    out.push('P');
                }
            }
            'q' => out.push('K'),
            's' => {
                if next == Some('h') {
                    out.push('X');
                } else if next == Some('i') && matches!(next2, Some('o' | 'a')) {
                    out.push('X');
                } else {
                    out.push('S');
                }
            }
            't' => {
                if next == Some('i') && matches!(next2, Some('o' | 'a')) {
                    out.push('X');
                } else if next == Some('h') {
                    out.push('0');
                } else if !(next == Some('c') && next2 == Some('h')) {
                    out.push('T');
                }
            }
            'v' => out.push('F'),
            'w' | 'y' => {
                if is_vowel(next) {
                    out.push(c.to_ascii_uppercase());
                }
            }
            'x' => out.push_str("KS"),
            'z' => out.push('S'),
            other => out.push(other.to_ascii_uppercase()),
        }
    }
    out
}

/// Whether two names share a non-empty Soundex code
pub fn soundex_match(a: &str, b: &str) -> bool {
    let sa = soundex(a);
    !sa.is_empty() && sa == soundex(b)
}

/// Whether two names share a non-empty Metaphone code
pub fn metaphone_match(a: &str, b: &str) -> bool {
    let ma = metaphone(a);
    !ma.is_empty() && ma == metaphone(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soundex() {
        assert_eq!(soundex("Robert"), "R163");
        assert_eq!(soundex("Rupert"), "R163");
        assert_eq!(soundex("Ashcraft"), "A261");
        assert_eq!(soundex("Tymczak"), "T522");
        assert_eq!(soundex("Lee"), "L000");
        assert_eq!(soundex("123"), "");
    }

    #[test]
    fn test_metaphone() {
        assert_eq!(metaphone("Thompson"), "0MPSN");
        assert_eq!(metaphone("knight"), "NT");
        assert_eq!(metaphone("Philips"), "FLPS");
        assert_eq!(metaphone("Phillips"), "FLPS");
        assert_eq!(metaphone("Smith"), "SM0");
        assert_eq!(metaphone(""), "");
    }

    #[test]
    fn test_matches() {
        assert!(soundex_match("Smith", "Smyth"));
        assert!(metaphone_match("Philips", "Phillips"));
        assert!(!soundex_match("", ""));
        assert!(!metaphone_match("Acme", "Globex"));
    }
}
