//! Lexical screening of caller-supplied Cypher.
//!
//! The query route only serves reads. A statement is refused when any
//! keyword below appears as a clause; occurrences inside string literals,
//! quoted identifiers, comments, property keys, labels and parameters are
//! ignored. Procedure calls are refused outright.

/// Keywords that start a writing, procedural or administrative clause.
pub const WRITE_CLAUSES: &[&str] = &[
    "CREATE", "MERGE", "DELETE", "DETACH", "SET", "REMOVE", "DROP", "FOREACH", "LOAD", "CALL",
    "ALTER", "RENAME", "GRANT", "DENY", "REVOKE", "START", "STOP",
];

/// The first write clause in `query`, if any.
pub fn write_clause(query: &str) -> Option<&'static str> {
    let chars: Vec<char> = query.chars().collect();
    let mut i = 0;
    // Last significant character before the current position.
    let mut prev = ' ';

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\'' | '"' | '`' => {
                i = skip_quoted(&chars, i);
                prev = c;
            }
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    i += 1;
                }
                i += 2;
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let next = chars[i..].iter().find(|c| !c.is_whitespace());
                let is_name = matches!(prev, '.' | ':' | '$') || next == Some(&':');
                if !is_name {
                    let word: String = chars[start..i].iter().collect();
                    if let Some(clause) = WRITE_CLAUSES
                        .iter()
                        .copied()
                        .find(|clause| clause.eq_ignore_ascii_case(&word))
                    {
                        return Some(clause);
                    }
                }
                prev = 'a';
            }
            c if c.is_whitespace() => i += 1,
            _ => {
                prev = c;
                i += 1;
            }
        }
    }
    None
}

/// Index just past the literal opened at `start`.
fn skip_quoted(chars: &[char], start: usize) -> usize {
    let quote = chars[start];
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' if quote != '`' => i += 2,
            c if c == quote => return i + 1,
            _ => i += 1,
        }
    }
    chars.len()
}
