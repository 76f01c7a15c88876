use thiserror::Error;

/// Returned by [`tokenize`] if the input cannot be split into symbols of the alphabet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("the input cannot be split into symbols of the alphabet beyond byte {position}")]
pub struct UnknownSymbol {
    /// Furthest byte offset up to which some prefix of the input splits into symbols.
    pub position: usize,
}

/// Splits `input` into a sequence of symbols of `alphabet`. Symbols may consist of more than one
/// character. At every position the longest symbol is taken after which the rest of the input
/// can still be split, so an input is only rejected if no split exists at all. For an alphabet
/// that only consists of single characters this amounts to splitting the input into its
/// characters.
///
/// # Example
/// ```
/// use dfa_workbench::word::tokenize;
///
/// assert_eq!(tokenize(&["0", "1"], "0110").unwrap(), ["0", "1", "1", "0"]);
/// assert_eq!(tokenize(&["a", "ab", "b"], "abab").unwrap(), ["ab", "ab"]);
/// assert_eq!(tokenize(&["a", "ab", "bc"], "abc").unwrap(), ["a", "bc"]);
/// assert_eq!(tokenize(&["a", "b"], "abc").unwrap_err().position, 2);
/// ```
pub fn tokenize<'a, S: AsRef<str>>(
    alphabet: &[S],
    input: &'a str,
) -> Result<Vec<&'a str>, UnknownSymbol> {
    let n = input.len();
    let matches_at = move |i: usize| {
        alphabet
            .iter()
            .map(AsRef::<str>::as_ref)
            .filter(move |sym| !sym.is_empty() && input[i..].starts_with(*sym))
            .map(str::len)
    };

    // longest[i] is the length of the longest symbol at byte i after which the rest splits
    let mut longest: Vec<Option<usize>> = vec![None; n + 1];
    let splits = move |longest: &[Option<usize>], i: usize| i == n || longest[i].is_some();
    for i in (0..n).rev().filter(|&i| input.is_char_boundary(i)) {
        let len = matches_at(i)
            .filter(|&len| splits(&longest, i + len))
            .max();
        longest[i] = len;
    }

    if !splits(&longest, 0) {
        let mut reachable = vec![false; n + 1];
        reachable[0] = true;
        for i in 0..n {
            if reachable[i] {
                for len in matches_at(i) {
                    reachable[i + len] = true;
                }
            }
        }
        let position = reachable.iter().rposition(|&r| r).unwrap_or(0);
        return Err(UnknownSymbol { position });
    }

    let mut symbols = Vec::new();
    let mut position = 0;
    while let Some(len) = longest.get(position).copied().flatten() {
        symbols.push(&input[position..position + len]);
        position += len;
    }
    Ok(symbols)
}
