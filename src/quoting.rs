//! Legacy `han hook run --dirs-with <file> -- <command...>` command
//! reassembly: clap hands us the tokens after `--` as a `Vec<String>`; this
//! rejoins them into a single shell command line, re-quoting any token that
//! would otherwise be split or reinterpreted by the shell.

use crate::error::HanError;

/// Only whitespace and the shell control operators `&`, `|`, `;` force a
/// token to be single-quoted; every other token passes through unchanged so
/// redirection, expansion, and substitution syntax the caller wrote survive.
const SPECIAL_CHARS: &[char] = &[' ', '\t', '&', '|', ';'];

/// Rejoin legacy CLI command tokens into a single shell command line.
///
/// Returns [`HanError::EmptyLegacyCommand`] if `tokens` is empty, matching
/// the host CLI's own `run --dirs-with ... --` behavior.
pub fn rejoin(tokens: &[String]) -> Result<String, HanError> {
    if tokens.is_empty() {
        return Err(HanError::EmptyLegacyCommand);
    }
    Ok(tokens
        .iter()
        .map(|token| quote_if_needed(token))
        .collect::<Vec<_>>()
        .join(" "))
}

fn quote_if_needed(token: &str) -> String {
    if token.is_empty() || token.contains(SPECIAL_CHARS) {
        let escaped = token.replace('\'', r"'\''");
        format!("'{escaped}'")
    } else {
        token.to_string()
    }
}
