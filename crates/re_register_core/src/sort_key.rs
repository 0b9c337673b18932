use std::sync::OnceLock;

use regex::{Captures, Regex};
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Rough breathing changes the pronunciation, so it has to be folded into an
/// `h` while the breathing mark is still attached to the vowel.
const ROUGH_BREATHING_RULES: &[(&str, &str)] = &[
    (r"(^| )[ἁἃἅἇᾁᾃᾅᾇ]", "${1}ha"),
    (r"(^| )[ἑἓἕ]", "${1}he"),
    (r"(^| )[ἡἣἥἧᾑᾓᾕᾗ]", "${1}he"),
    (r"(^| )[ἱἳἵἷ]", "${1}hi"),
    (r"(^| )[ὁὃὅ]", "${1}ho"),
    (r"(^| )[ὑὓὕὗ]", "${1}hy"),
    (r"(^| )[ὡὣὥὧᾡᾣᾥᾧ]", "${1}ho"),
    (r"(^| )ῥ", "${1}rh"),
];

const DIPHTHONG_RULES: &[(&str, &str)] = &[
    ("αυ", "au"),
    ("ευ", "eu"),
    ("ηυ", "eu"),
    ("ου", "u"),
    ("γγ", "ng"),
    ("γκ", "nk"),
    ("γξ", "nx"),
    ("γχ", "nch"),
];

const CLEANUP_RULES: &[(&str, &str)] = &[
    // Latin case prefixes: "ad Flexum", "ab Urbe"
    (r"^(?:a|ab|ad) ", ""),
    // abbreviated praenomen: "M. Tullius"
    (r"^[a-z]\. ", ""),
];

struct Rules {
    rough_breathing: Vec<(Regex, &'static str)>,
    diphthongs: Vec<(Regex, &'static str)>,
    cleanup: Vec<(Regex, &'static str)>,
    numbers: Regex,
}

fn rules() -> &'static Rules {
    static RULES: OnceLock<Rules> = OnceLock::new();
    RULES.get_or_init(|| Rules {
        rough_breathing: compile(ROUGH_BREATHING_RULES),
        diphthongs: compile(DIPHTHONG_RULES),
        cleanup: compile(CLEANUP_RULES),
        numbers: Regex::new(r"[0-9]+").expect("number pattern is valid"),
    })
}

fn compile(raw: &[(&str, &'static str)]) -> Vec<(Regex, &'static str)> {
    raw.iter()
        .map(|(pattern, replacement)| {
            (
                Regex::new(pattern).expect("sort key patterns are valid"),
                *replacement,
            )
        })
        .collect()
}

/// Canonical comparison key of a lemma name.
///
/// Case, diacritics, Greek script and punctuation are folded away so that
/// plain string ordering of the keys gives the alphabetic order of the
/// printed register. Never fails; an empty input yields an empty key.
pub fn make_sort_key(raw: &str) -> String {
    let rules = rules();

    let mut key = raw.to_lowercase();
    for (regex, replacement) in &rules.rough_breathing {
        key = regex.replace_all(&key, *replacement).into_owned();
    }

    key = key.nfd().filter(|ch| !is_combining_mark(*ch)).collect();

    for (regex, replacement) in &rules.diphthongs {
        key = regex.replace_all(&key, *replacement).into_owned();
    }

    let mut translated = String::with_capacity(key.len());
    for ch in key.chars() {
        match translate_char(ch) {
            Some(replacement) => translated.push_str(replacement),
            None => translated.push(ch),
        }
    }
    key = translated;

    for (regex, replacement) in &rules.cleanup {
        key = regex.replace(&key, *replacement).into_owned();
    }
    key = rules
        .numbers
        .replace_all(&key, |caps: &Captures<'_>| format!("{:0>3}", &caps[0]))
        .into_owned();

    key.replace('.', " ").trim().to_string()
}

fn translate_char(ch: char) -> Option<&'static str> {
    let replacement = match ch {
        'v' | 'w' => "u",
        'j' => "i",
        'ß' => "ss",
        'æ' => "ae",
        'œ' => "oe",
        '(' | ')' | '?' | '\'' | '’' | 'ʾ' | 'ʿ' | '-' | '‐' | '–' | '—' => "",
        'α' => "a",
        'β' | 'ϐ' => "b",
        'γ' => "g",
        'δ' => "d",
        'ε' | 'η' => "e",
        'ζ' => "z",
        'θ' | 'ϑ' => "th",
        'ι' => "i",
        'κ' => "k",
        'λ' => "l",
        'μ' => "m",
        'ν' => "n",
        'ξ' => "x",
        'ο' | 'ω' => "o",
        'π' => "p",
        'ρ' => "r",
        'σ' | 'ς' | 'ϲ' => "s",
        'τ' => "t",
        'υ' => "y",
        'φ' => "ph",
        'χ' => "ch",
        'ψ' => "ps",
        _ => return None,
    };
    Some(replacement)
}

#[cfg(test)]
mod tests {
    use super::make_sort_key;

    #[test]
    fn folds_latin_diacritics_and_punctuation() {
        assert_eq!(
            make_sort_key("Uv(Wij)'ï?ßçëäöüêśôʾʿâçèéêëîïôöûüśū"),
            "uuuiiissceaouesoaceeeeiioouusu"
        );
    }

    #[test]
    fn drops_latin_case_prefixes() {
        assert_eq!(make_sort_key("ad Flexum"), "flexum");
        assert_eq!(make_sort_key("ab Urbe condita"), "urbe condita");
        assert_eq!(make_sort_key("a Rationibus"), "rationibus");
        assert_eq!(make_sort_key("Aal"), "aal");
    }

    #[test]
    fn drops_abbreviated_first_name() {
        assert_eq!(make_sort_key("M. Tullius"), "tullius");
    }

    #[test]
    fn pads_numbers_to_three_digits() {
        assert_eq!(make_sort_key("Abd 1 11 230"), "abd 001 011 230");
        assert_eq!(make_sort_key("Iulius 12a"), "iulius 012a");
    }

    #[test]
    fn dots_become_spaces() {
        assert_eq!(make_sort_key("Aba.Abae"), "aba abae");
        assert_eq!(make_sort_key("Abae."), "abae");
    }

    #[test]
    fn transliterates_greek() {
        assert_eq!(make_sort_key("Ἡρακλῆς"), "herakles");
        assert_eq!(make_sort_key("Ἄγγελος"), "angelos");
        assert_eq!(make_sort_key("αὐλή"), "aule");
        assert_eq!(make_sort_key("Οὐρανός"), "uranos");
        assert_eq!(make_sort_key("ὁ θεός"), "ho theos");
        assert_eq!(make_sort_key("Ῥόδος"), "rhodos");
    }

    #[test]
    fn greek_vowel_classes_collapse() {
        assert_eq!(make_sort_key("ε"), make_sort_key("η"));
        assert_eq!(make_sort_key("ο"), make_sort_key("ω"));
    }

    #[test]
    fn degenerate_inputs_do_not_fail() {
        assert_eq!(make_sort_key(""), "");
        assert_eq!(make_sort_key("?()'-–"), "");
        assert_eq!(make_sort_key("   "), "");
        assert_eq!(make_sort_key("..."), "");
    }

    #[test]
    fn is_deterministic() {
        for raw in ["", "Ἡρακλῆς", "ad Flexum", "Abd 1 11 230", "?", "Aachen"] {
            assert_eq!(make_sort_key(raw), make_sort_key(raw));
        }
    }

    #[test]
    fn case_and_diacritics_do_not_matter() {
        assert_eq!(make_sort_key("ÄBÄ"), make_sort_key("aba"));
        assert_eq!(make_sort_key("Wolf"), make_sort_key("uolf"));
    }
}
