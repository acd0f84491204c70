//! Constrained random password synthesis.
//!
//! Builds XKCD-style candidates (several capitalized dictionary words)
//! and substitutes look-alike digits and special characters into them,
//! retrying whole candidates until length and substitution minimums are
//! met. The guarantee is soft: when the retry budget runs out the last
//! candidate is returned as-is.

use crate::constants::{MAX_CHAR_SWAPS, MAX_GENERATE_ATTEMPTS, MAX_SUB_ATTEMPTS, NUM_WORDS_IN_PASS};
use crate::util::wordlist::WORDS;
use rand::rngs::OsRng;
use rand::Rng;

/// Look-alike digit substitutions.
const DIGIT_SUBS: &[(char, char)] = &[('b', '6'), ('e', '3'), ('i', '1'), ('o', '0'), ('t', '7')];

/// Look-alike special-character substitutions.
const SPECIAL_SUBS: &[(char, char)] = &[('a', '@'), ('i', '!'), ('s', '$')];

struct SubResult {
    password: Vec<char>,
    subs_made: usize,
}

/// Generate a password of length within `[min_len, max_len]` containing
/// at least `min_digit_subs` digit look-alikes and `min_special_subs`
/// special-character look-alikes, retrying up to a bounded attempt
/// budget. Best-effort: the final attempt is returned even if it misses
/// a constraint.
pub fn generate_password(
    min_digit_subs: usize,
    min_special_subs: usize,
    min_len: usize,
    max_len: usize,
) -> String {
    let mut candidate = String::new();
    for _ in 0..MAX_GENERATE_ATTEMPTS {
        let (password, digit_subs, special_subs) = build_candidate(min_digit_subs, min_special_subs);
        let len = password.chars().count();
        candidate = password;
        if (min_len..=max_len).contains(&len)
            && digit_subs >= min_digit_subs
            && special_subs >= min_special_subs
        {
            break;
        }
    }
    candidate
}

/// One candidate: random words, capitalized and concatenated, then a
/// randomly sized round of digit swaps followed by special swaps. A
/// digit-swap shortfall rolls over into extra special swaps.
fn build_candidate(min_digit_subs: usize, min_special_subs: usize) -> (String, usize, usize) {
    let mut rng = OsRng;

    let mut password: Vec<char> = Vec::new();
    for _ in 0..NUM_WORDS_IN_PASS {
        let word = WORDS[rng.gen_range(0..WORDS.len())];
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            password.extend(first.to_uppercase());
            password.extend(chars);
        }
    }

    let min_swaps = min_digit_subs + min_special_subs;
    let num_swaps = rng.gen_range(0..=MAX_CHAR_SWAPS).max(min_swaps);
    let digit_goal = rng
        .gen_range(0..=num_swaps)
        .clamp(min_digit_subs, num_swaps - min_special_subs);
    let mut special_goal = num_swaps - digit_goal;

    let digits = sub_chars(password, DIGIT_SUBS, digit_goal);
    // not enough substitutable letters for digits: try more specials
    if digits.subs_made < digit_goal {
        special_goal += digit_goal - digits.subs_made;
    }
    let specials = sub_chars(digits.password, SPECIAL_SUBS, special_goal);

    (
        specials.password.into_iter().collect(),
        digits.subs_made,
        specials.subs_made,
    )
}

/// Substitute up to `num_subs` randomly chosen eligible characters,
/// giving up after a bounded number of random probes.
fn sub_chars(mut password: Vec<char>, char_map: &[(char, char)], num_subs: usize) -> SubResult {
    let len = password.len();
    let mut rng = OsRng;
    let mut subs_made = 0;
    let mut attempts = 0;

    while subs_made < num_subs && attempts < MAX_SUB_ATTEMPTS && len > 0 {
        let index = rng.gen_range(0..len);
        let current = password[index];
        if let Some(&(_, replacement)) = char_map.iter().find(|&&(from, _)| from == current) {
            password[index] = replacement;
            subs_made += 1;
        }
        attempts += 1;
    }

    SubResult {
        password,
        subs_made,
    }
}
