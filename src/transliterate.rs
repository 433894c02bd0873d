/*
IAST <-> Devanagari transliteration

IAST to Devanagari runs in two stages:
1. IAST -> SLP1: lowercase, then longest-match substitution (digraphs like "kh" or "ai" are tried
   before single characters), producing one ASCII character per phoneme.
2. SLP1 -> Devanagari: a left-to-right walk that only needs to classify each character as
   consonant, vowel, marker (anusvara, visarga, candrabindu, avagraha) or other.
   * consonant: base glyph, followed by a virama unless the next character is a vowel
   * vowel after a consonant: dependent vowel sign (empty for the inherent a)
   * vowel otherwise: independent vowel glyph
   * anything unmapped (spaces, digits, punctuation) passes through

Devanagari to IAST walks the Devanagari text directly: a consonant takes the vowel of the following
vowel sign, no vowel if followed by a virama, and the inherent a otherwise.
*/

use itertools::Itertools;

const VIRAMA: char = '\u{094D}';
/// Dot below a consonant letter, as in क़. Not part of the mapped set.
const NUKTA: char = '\u{093C}';

/// IAST digraph -> SLP1, tried before single characters
const fn iast_digraph_to_slp1(first: char, second: char) -> Option<char> {
    Some(match (first, second) {
        ('a', 'i') => 'E',
        ('a', 'u') => 'O',
        ('k', 'h') => 'K',
        ('g', 'h') => 'G',
        ('c', 'h') => 'C',
        ('j', 'h') => 'J',
        ('ṭ', 'h') => 'W',
        ('ḍ', 'h') => 'Q',
        ('t', 'h') => 'T',
        ('d', 'h') => 'D',
        ('p', 'h') => 'P',
        ('b', 'h') => 'B',
        _ => return None,
    })
}

const fn iast_char_to_slp1(c: char) -> Option<char> {
    Some(match c {
        // vowels
        'a' => 'a',
        'ā' => 'A',
        'i' => 'i',
        'ī' => 'I',
        'u' => 'u',
        'ū' => 'U',
        'ṛ' => 'f',
        'ṝ' => 'F',
        'ḷ' => 'x',
        'ḹ' => 'X',
        'e' => 'e',
        'o' => 'o',
        // anusvara, visarga, candrabindu
        'ṃ' => 'M',
        'ḥ' => 'H',
        '~' => '~',
        // velars
        'k' => 'k',
        'g' => 'g',
        'ṅ' => 'N',
        // palatals
        'c' => 'c',
        'j' => 'j',
        'ñ' => 'Y',
        // retroflexes
        'ṭ' => 'w',
        'ḍ' => 'q',
        'ṇ' => 'R',
        // dentals
        't' => 't',
        'd' => 'd',
        'n' => 'n',
        // labials
        'p' => 'p',
        'b' => 'b',
        'm' => 'm',
        // semivowels
        'y' => 'y',
        'r' => 'r',
        'l' => 'l',
        'v' => 'v',
        // sibilants
        'ś' => 'S',
        'ṣ' => 'z',
        's' => 's',
        'h' => 'h',
        // avagraha
        '\'' => '\'',
        _ => return None,
    })
}

const fn slp1_consonant(c: char) -> Option<char> {
    Some(match c {
        'k' => 'क',
        'K' => 'ख',
        'g' => 'ग',
        'G' => 'घ',
        'N' => 'ङ',
        'c' => 'च',
        'C' => 'छ',
        'j' => 'ज',
        'J' => 'झ',
        'Y' => 'ञ',
        'w' => 'ट',
        'W' => 'ठ',
        'q' => 'ड',
        'Q' => 'ढ',
        'R' => 'ण',
        't' => 'त',
        'T' => 'थ',
        'd' => 'द',
        'D' => 'ध',
        'n' => 'न',
        'p' => 'प',
        'P' => 'फ',
        'b' => 'ब',
        'B' => 'भ',
        'm' => 'म',
        'y' => 'य',
        'r' => 'र',
        'l' => 'ल',
        'v' => 'व',
        'S' => 'श',
        'z' => 'ष',
        's' => 'स',
        'h' => 'ह',
        _ => return None,
    })
}

/// SLP1 vowel -> (independent vowel, dependent vowel sign), the inherent a has no sign
const fn slp1_vowel(c: char) -> Option<(char, Option<char>)> {
    Some(match c {
        'a' => ('अ', None),
        'A' => ('आ', Some('ा')),
        'i' => ('इ', Some('ि')),
        'I' => ('ई', Some('ी')),
        'u' => ('उ', Some('ु')),
        'U' => ('ऊ', Some('ू')),
        'f' => ('ऋ', Some('ृ')),
        'F' => ('ॠ', Some('ॄ')),
        'x' => ('ऌ', Some('ॢ')),
        'X' => ('ॡ', Some('ॣ')),
        'e' => ('ए', Some('े')),
        'E' => ('ऐ', Some('ै')),
        'o' => ('ओ', Some('ो')),
        'O' => ('औ', Some('ौ')),
        _ => return None,
    })
}

const fn slp1_marker(c: char) -> Option<char> {
    Some(match c {
        'M' => 'ं',
        'H' => 'ः',
        '~' => 'ँ',
        '\'' => 'ऽ',
        _ => return None,
    })
}

const fn devanagari_consonant_to_iast(c: char) -> Option<&'static str> {
    Some(match c {
        'क' => "k",
        'ख' => "kh",
        'ग' => "g",
        'घ' => "gh",
        'ङ' => "ṅ",
        'च' => "c",
        'छ' => "ch",
        'ज' => "j",
        'झ' => "jh",
        'ञ' => "ñ",
        'ट' => "ṭ",
        'ठ' => "ṭh",
        'ड' => "ḍ",
        'ढ' => "ḍh",
        'ण' => "ṇ",
        'त' => "t",
        'थ' => "th",
        'द' => "d",
        'ध' => "dh",
        'न' => "n",
        'प' => "p",
        'फ' => "ph",
        'ब' => "b",
        'भ' => "bh",
        'म' => "m",
        'य' => "y",
        'र' => "r",
        'ल' => "l",
        'व' => "v",
        'श' => "ś",
        'ष' => "ṣ",
        'स' => "s",
        'ह' => "h",
        _ => return None,
    })
}

const fn devanagari_vowel_to_iast(c: char) -> Option<&'static str> {
    Some(match c {
        'अ' => "a",
        'आ' => "ā",
        'इ' => "i",
        'ई' => "ī",
        'उ' => "u",
        'ऊ' => "ū",
        'ऋ' => "ṛ",
        'ॠ' => "ṝ",
        'ऌ' => "ḷ",
        'ॡ' => "ḹ",
        'ए' => "e",
        'ऐ' => "ai",
        'ओ' => "o",
        'औ' => "au",
        _ => return None,
    })
}

const fn devanagari_vowel_sign_to_iast(c: char) -> Option<&'static str> {
    Some(match c {
        'ा' => "ā",
        'ि' => "i",
        'ी' => "ī",
        'ु' => "u",
        'ू' => "ū",
        'ृ' => "ṛ",
        'ॄ' => "ṝ",
        'ॢ' => "ḷ",
        'ॣ' => "ḹ",
        'े' => "e",
        'ै' => "ai",
        'ो' => "o",
        'ौ' => "au",
        _ => return None,
    })
}

const fn devanagari_marker_to_iast(c: char) -> Option<&'static str> {
    Some(match c {
        'ं' => "ṃ",
        'ः' => "ḥ",
        'ँ' => "~",
        'ऽ' => "'",
        _ => return None,
    })
}

/// Convert IAST to SLP1. Characters without a mapping are kept as they are.
pub fn iast_to_slp1(iast: &str) -> String {
    let chars: Vec<char> = iast.to_lowercase().chars().collect();
    let mut slp1 = String::with_capacity(chars.len());
    let mut i = 0;
    while i < chars.len() {
        if let Some(&next) = chars.get(i + 1)
            && let Some(c) = iast_digraph_to_slp1(chars[i], next)
        {
            slp1.push(c);
            i += 2;
            continue;
        }
        slp1.push(iast_char_to_slp1(chars[i]).unwrap_or(chars[i]));
        i += 1;
    }
    slp1
}

/// Convert SLP1 to Devanagari. The input is expected to be well-formed SLP1, e.g. the output of
/// [`iast_to_slp1`].
pub fn slp1_to_devanagari(slp1: &str) -> String {
    let chars: Vec<char> = slp1.chars().collect();
    let mut deva = String::with_capacity(slp1.len() * 3);
    let mut after_consonant = false;
    for (i, &c) in chars.iter().enumerate() {
        if let Some(glyph) = slp1_consonant(c) {
            deva.push(glyph);
            // also at the end of the string: no trailing inherent vowel is assumed
            let vowel_follows = chars.get(i + 1).is_some_and(|&n| slp1_vowel(n).is_some());
            if !vowel_follows {
                deva.push(VIRAMA);
            }
            after_consonant = vowel_follows;
        } else if let Some((independent, sign)) = slp1_vowel(c) {
            if after_consonant {
                if let Some(sign) = sign {
                    deva.push(sign);
                }
            } else {
                deva.push(independent);
            }
            after_consonant = false;
        } else {
            deva.push(slp1_marker(c).unwrap_or(c));
            after_consonant = false;
        }
    }
    deva
}

pub fn iast_to_devanagari(iast: &str) -> String {
    slp1_to_devanagari(&iast_to_slp1(iast))
}

/// Convert Devanagari to IAST. Characters outside the mapped set are kept as they are.
pub fn devanagari_to_iast(deva: &str) -> String {
    let mut iast = String::with_capacity(deva.len());
    let mut chars = deva.chars().peekable();
    while let Some(c) = chars.next() {
        if let Some(consonant) = devanagari_consonant_to_iast(c) {
            iast.push_str(consonant);
            // the nukta belongs to the consonant, the vowel comes after it
            if let Some(nukta) = chars.next_if_eq(&NUKTA) {
                iast.push(nukta);
            }
            match chars.peek().copied() {
                Some(VIRAMA) => {
                    chars.next();
                }
                Some(next) => {
                    if let Some(vowel) = devanagari_vowel_sign_to_iast(next) {
                        iast.push_str(vowel);
                        chars.next();
                    } else {
                        iast.push('a');
                    }
                }
                None => iast.push('a'),
            }
        } else if let Some(vowel) = devanagari_vowel_to_iast(c) {
            iast.push_str(vowel);
        } else if let Some(marker) = devanagari_marker_to_iast(c) {
            iast.push_str(marker);
        } else {
            iast.push(c);
        }
    }
    iast
}

/// True if any character lies in the Devanagari block (U+0900..U+097F).
pub fn is_devanagari(s: &str) -> bool {
    s.chars().any(|c| ('\u{0900}'..='\u{097F}').contains(&c))
}

/// The strings to search with for a raw user query, in order and without duplicates:
/// the query itself, its Devanagari form, the lowercased query and the Devanagari form of that.
/// A query that is already Devanagari is returned as the only term.
pub fn to_search_terms(query: &str) -> Vec<String> {
    let query = query.trim();
    if query.is_empty() {
        return vec![];
    }
    if is_devanagari(query) {
        return vec![query.to_owned()];
    }
    let mut terms = vec![query.to_owned(), iast_to_devanagari(query)];
    let lower = query.to_lowercase();
    if lower != query {
        let lower_deva = iast_to_devanagari(&lower);
        terms.extend([lower, lower_deva]);
    }
    terms.into_iter().filter(|t| !t.is_empty()).unique().collect()
}
