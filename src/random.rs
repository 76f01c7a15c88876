use tracing::{debug, trace};

use crate::{batch::InputVerdict, Dfa, Set};

/// Generate a random word over `alphabet`, as a sequence of symbols. The length of the word is
/// drawn uniformly from the range `min_len..=max_len`. An empty alphabet only has the empty word.
pub fn generate_random_word<S: AsRef<str>>(
    alphabet: &[S],
    min_len: usize,
    max_len: usize,
) -> Vec<&str> {
    if alphabet.is_empty() {
        return vec![];
    }
    let length = fastrand::usize(min_len..=max_len.max(min_len));
    (0..length)
        .map(|_| alphabet[fastrand::usize(..alphabet.len())].as_ref())
        .collect()
}

/// Generate up to `number` distinct random words over `alphabet`, each one concatenated into a
/// `String`. The length of each word is drawn uniformly from `min_len..=max_len`.
///
/// If the alphabet does not admit `number` distinct words of the requested lengths, fewer are
/// returned once sampling stops producing new words.
pub fn generate_random_words<S: AsRef<str>>(
    alphabet: &[S],
    min_len: usize,
    max_len: usize,
    number: usize,
) -> Set<String> {
    let mut word_set = Set::with_capacity_and_hasher(number, Default::default());
    let mut misses = 0;

    while word_set.len() < number && misses < 64 * number.max(1) {
        let word = generate_random_word(alphabet, min_len, max_len).concat();
        if !word_set.insert(word) {
            misses += 1;
        }
    }

    debug!("sampled {} of {number} requested words", word_set.len());
    word_set
}

/// Runs `count` random words of length at most `max_len` through `dfa`.
///
/// Each word is concatenated into a string and evaluated like any test string, so the verdict
/// next to an input is the one [`Dfa::accepts_str`] gives for it.
pub fn sample_verdicts(dfa: &Dfa, count: usize, max_len: usize) -> Vec<InputVerdict> {
    let alphabet = dfa.config().alphabet();
    (0..count)
        .map(|_| {
            let input = generate_random_word(alphabet, 0, max_len).concat();
            let accepted = dfa.accepts_str(&input);
            trace!("{input:?} accepted: {accepted}");
            InputVerdict { input, accepted }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        tests::{ends_in_ab, even_binary},
        Validator,
    };

    fn dfa(value: serde_json::Value) -> Dfa {
        Dfa::new(Validator.validate_value(&value).unwrap())
    }

    #[test]
    fn random_word_lengths() {
        let alphabet = ["a", "bc"];
        for _ in 0..100 {
            let word = generate_random_word(&alphabet, 2, 5);
            assert!((2..=5).contains(&word.len()));
            assert!(word.iter().all(|sym| alphabet.contains(sym)));
        }
        assert!(generate_random_word(&alphabet, 0, 0).is_empty());
        assert!(generate_random_word::<&str>(&[], 3, 4).is_empty());
    }

    #[test]
    fn random_words() {
        let word_set = generate_random_words(&["0", "1"], 1, 10, 20);
        assert_eq!(word_set.len(), 20);
        assert!(word_set
            .iter()
            .all(|w| !w.is_empty() && w.chars().all(|c| c == '0' || c == '1')));

        // there are only two words of length one
        assert_eq!(generate_random_words(&["0", "1"], 1, 1, 10).len(), 2);
    }

    #[test_log::test]
    fn sampled_verdicts_agree_with_the_automaton() {
        fastrand::seed(7);
        let dfa = dfa(even_binary());
        let verdicts = sample_verdicts(&dfa, 200, 12);
        assert_eq!(verdicts.len(), 200);
        for verdict in verdicts {
            assert_eq!(dfa.accepts_str(&verdict.input), verdict.accepted);
        }
    }

    #[test]
    fn sampled_verdicts_agree_on_multi_character_symbols() {
        fastrand::seed(11);
        // `ab` leads somewhere else than `a` followed by `b`
        let dfa = dfa(serde_json::json!({
            "id": "overlap",
            "name": "",
            "initial_state": "p",
            "acceptance_states": ["r"],
            "alphabet": ["a", "b", "ab"],
            "states": ["p", "r"],
            "transitions": [
                {"from_state": "p", "symbol": "a", "to_state": "p"},
                {"from_state": "p", "symbol": "b", "to_state": "p"},
                {"from_state": "p", "symbol": "ab", "to_state": "r"},
                {"from_state": "r", "symbol": "a", "to_state": "p"},
                {"from_state": "r", "symbol": "b", "to_state": "p"},
                {"from_state": "r", "symbol": "ab", "to_state": "r"}
            ],
            "test_strings": []
        }));
        let verdicts = sample_verdicts(&dfa, 300, 6);
        for verdict in &verdicts {
            assert_eq!(dfa.accepts_str(&verdict.input), verdict.accepted);
        }
        assert!(verdicts
            .iter()
            .any(|v| v.input.ends_with("ab") && v.accepted));
    }

    #[test]
    fn empty_words_follow_the_initial_state() {
        let dfa = dfa(ends_in_ab());
        for verdict in sample_verdicts(&dfa, 10, 0) {
            assert_eq!(verdict.input, "");
            assert_eq!(verdict.accepted, dfa.is_accepting(dfa.initial()));
        }
    }
}
