//! Porter stemmer
//!
//! Strips English inflectional and derivational suffixes so that
//! "connection", "connected" and "connecting" all reduce to "connect".
//! Words shorter than three letters or containing anything other than
//! ASCII lowercase letters are returned unchanged.

/// Stem a single lowercase token
pub fn stem(word: &str) -> String {
    if word.len() < 3 || !word.bytes().all(|b| b.is_ascii_lowercase()) {
        return word.to_string();
    }

    let mut w = word.as_bytes().to_vec();
    step1a(&mut w);
    step1b(&mut w);
    step1c(&mut w);
    step2(&mut w);
    step3(&mut w);
    step4(&mut w);
    step5(&mut w);

    // Only ASCII bytes were ever written
    String::from_utf8(w).unwrap_or_else(|_| word.to_string())
}

fn is_consonant(w: &[u8], i: usize) -> bool {
    match w[i] {
        b'a' | b'e' | b'i' | b'o' | b'u' => false,
        b'y' => i == 0 || !is_consonant(w, i - 1),
        _ => true,
    }
}

/// Number of vowel-consonant sequences in `w[..len]`
fn measure(w: &[u8], len: usize) -> usize {
    let mut m = 0;
    let mut i = 0;
    while i < len && is_consonant(w, i) {
        i += 1;
    }
    loop {
        while i < len && !is_consonant(w, i) {
            i += 1;
        }
        if i >= len {
            return m;
        }
        while i < len && is_consonant(w, i) {
            i += 1;
        }
        m += 1;
    }
}

fn has_vowel(w: &[u8], len: usize) -> bool {
    (0..len).any(|i| !is_consonant(w, i))
}

fn ends_double_consonant(w: &[u8], len: usize) -> bool {
    len >= 2 && w[len - 1] == w[len - 2] && is_consonant(w, len - 1)
}

/// consonant-vowel-consonant ending, where the last consonant is not w, x or y
fn ends_cvc(w: &[u8], len: usize) -> bool {
    len >= 3
        && is_consonant(w, len - 1)
        && !is_consonant(w, len - 2)
        && is_consonant(w, len - 3)
        && !matches!(w[len - 1], b'w' | b'x' | b'y')
}

/// Stem length if `w` ends with `suffix`
fn stem_len(w: &[u8], suffix: &str) -> Option<usize> {
    let suffix = suffix.as_bytes();
    if w.len() > suffix.len() && w.ends_with(suffix) {
        Some(w.len() - suffix.len())
    } else {
        None
    }
}

fn replace_suffix(w: &mut Vec<u8>, stem: usize, replacement: &str) {
    w.truncate(stem);
    w.extend_from_slice(replacement.as_bytes());
}

/// First matching rule wins; it is applied only when the stem measure exceeds `min_measure`
fn apply_rules(w: &mut Vec<u8>, rules: &[(&str, &str)], min_measure: usize) {
    for (suffix, replacement) in rules {
        if let Some(stem) = stem_len(w, suffix) {
            if measure(w, stem) > min_measure {
                replace_suffix(w, stem, replacement);
            }
            return;
        }
    }
}

fn step1a(w: &mut Vec<u8>) {
    if let Some(stem) = stem_len(w, "sses") {
        replace_suffix(w, stem, "ss");
    } else if let Some(stem) = stem_len(w, "ies") {
        replace_suffix(w, stem, "i");
    } else if w.ends_with(b"ss") {
    } else if let Some(stem) = stem_len(w, "s") {
        w.truncate(stem);
    }
}

fn step1b(w: &mut Vec<u8>) {
    if let Some(stem) = stem_len(w, "eed") {
        if measure(w, stem) > 0 {
            replace_suffix(w, stem, "ee");
        }
        return;
    }

    let stem = match stem_len(w, "ed").or_else(|| stem_len(w, "ing")) {
        Some(stem) if has_vowel(w, stem) => stem,
        _ => return,
    };
    w.truncate(stem);

    if w.ends_with(b"at") || w.ends_with(b"bl") || w.ends_with(b"iz") {
        w.push(b'e');
    } else if ends_double_consonant(w, w.len()) && !matches!(w[w.len() - 1], b'l' | b's' | b'z') {
        w.pop();
    } else if measure(w, w.len()) == 1 && ends_cvc(w, w.len()) {
        w.push(b'e');
    }
}

fn step1c(w: &mut Vec<u8>) {
    if let Some(stem) = stem_len(w, "y") {
        if has_vowel(w, stem) {
            replace_suffix(w, stem, "i");
        }
    }
}

fn step2(w: &mut Vec<u8>) {
    const RULES: &[(&str, &str)] = &[
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
    ];
    apply_rules(w, RULES, 0);
}

fn step3(w: &mut Vec<u8>) {
    const RULES: &[(&str, &str)] = &[
        ("icate", "ic"),
        ("ative", ""),
        ("alize", "al"),
        ("iciti", "ic"),
        ("ical", "ic"),
        ("ful", ""),
        ("ness", ""),
    ];
    apply_rules(w, RULES, 0);
}

fn step4(w: &mut Vec<u8>) {
    const SUFFIXES: &[&str] = &[
        "al", "ance", "ence", "er", "ic", "able", "ible", "ant", "ement", "ment", "ent", "ion",
        "ou", "ism", "ate", "iti", "ous", "ive", "ize",
    ];
    for suffix in SUFFIXES {
        let Some(stem) = stem_len(w, suffix) else {
            continue;
        };
        // -ion only comes off after s or t
        if *suffix == "ion" && !matches!(w[stem - 1], b's' | b't') {
            continue;
        }
        if measure(w, stem) > 1 {
            w.truncate(stem);
        }
        return;
    }
}

fn step5(w: &mut Vec<u8>) {
    if let Some(stem) = stem_len(w, "e") {
        let m = measure(w, stem);
        if m > 1 || (m == 1 && !ends_cvc(w, stem)) {
            w.truncate(stem);
        }
    }
    if w.ends_with(b"ll") && measure(w, w.len()) > 1 {
        w.pop();
    }
}
