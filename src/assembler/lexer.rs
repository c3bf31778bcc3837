//! Converts source text into a list of non-empty lexed lines.
//!
//! The grammar is line-oriented (spec §4.1), so the lexer works one line at
//! a time: strip the `;`-comment, scan tokens left to right, and let blank
//! or comment-only lines simply vanish from the stream.

use crate::assembler::token::{LexedLine, Token};
use crate::error::AssembleError;

pub fn lex(source: &str) -> Result<Vec<LexedLine>, AssembleError> {
    let mut out = Vec::new();
    for (idx, raw_line) in source.lines().enumerate() {
        let line_no = idx + 1;
        let stripped = strip_comment(raw_line);
        let tokens = lex_line(line_no, stripped)?;
        if !tokens.is_empty() {
            out.push(LexedLine {
                line: line_no,
                tokens,
            });
        }
    }
    Ok(out)
}

/// Drop a `;`-to-end-of-line comment, respecting quoted strings so a `;`
/// inside a string literal isn't mistaken for one.
fn strip_comment(line: &str) -> &str {
    let mut in_string = false;
    for (i, c) in line.char_indices() {
        match c {
            '"' => in_string = !in_string,
            ';' if !in_string => return &line[..i],
            _ => {}
        }
    }
    line
}

fn lex_line(line_no: usize, text: &str) -> Result<Vec<Token>, AssembleError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    let mut at_line_start = true;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        match c {
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
                at_line_start = false;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
                at_line_start = false;
            }
            '"' => {
                let start = i + 1;
                let mut j = start;
                let mut s = String::new();
                let mut closed = false;
                while j < chars.len() {
                    if chars[j] == '"' {
                        closed = true;
                        break;
                    }
                    s.push(chars[j]);
                    j += 1;
                }
                if !closed {
                    return Err(AssembleError::UnterminatedString { line: line_no });
                }
                tokens.push(Token::Str(s));
                i = j + 1;
                at_line_start = false;
            }
            _ => {
                let start = i;
                while i < chars.len() && !chars[i].is_whitespace() && !matches!(chars[i], ',' | ';' | '"')
                {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                tokens.push(word_token(line_no, &word, at_line_start)?);
                at_line_start = false;
            }
        }
    }
    Ok(tokens)
}

fn word_token(line_no: usize, word: &str, at_line_start: bool) -> Result<Token, AssembleError> {
    if at_line_start {
        if let Some(name) = word.strip_suffix(':') {
            return Ok(Token::Label(name.to_string()));
        }
    }
    if let Some(n) = parse_int(word) {
        return Ok(Token::Int(n));
    }
    if word.is_empty() {
        return Err(AssembleError::BadOperand {
            line: line_no,
            text: word.to_string(),
        });
    }
    Ok(Token::Ident(word.to_string()))
}

fn parse_int(word: &str) -> Option<i64> {
    let (neg, rest) = match word.strip_prefix('-') {
        Some(r) => (true, r),
        None => (false, word),
    };
    if rest.is_empty() {
        return None;
    }
    let value = if let Some(hex) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()?
    } else {
        if !rest.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        rest.parse::<i64>().ok()?
    };
    Some(if neg { -value } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_trailing_comment() {
        let lines = lex("ld 1 ; load one\n").unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].tokens, vec![Token::Ident("ld".into()), Token::Int(1)]);
    }

    #[test]
    fn comment_inside_string_is_kept() {
        let lines = lex("_start: ld \"a;b\"\n").unwrap();
        assert_eq!(
            lines[0].tokens,
            vec![
                Token::Label("_start".into()),
                Token::Ident("ld".into()),
                Token::Str("a;b".into()),
            ]
        );
    }

    #[test]
    fn blank_and_comment_only_lines_vanish() {
        let lines = lex("\n   \n; just a comment\n").unwrap();
        assert!(lines.is_empty());
    }

    #[test]
    fn double_star_is_two_tokens() {
        let lines = lex("ld **ptr\n").unwrap();
        assert_eq!(
            lines[0].tokens,
            vec![
                Token::Ident("ld".into()),
                Token::Star,
                Token::Star,
                Token::Ident("ptr".into()),
            ]
        );
    }

    #[test]
    fn negative_and_hex_literals() {
        let lines = lex("ld -5\nld 0x1F\n").unwrap();
        assert_eq!(lines[0].tokens[1], Token::Int(-5));
        assert_eq!(lines[1].tokens[1], Token::Int(0x1F));
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let err = lex("ld \"oops\n").unwrap_err();
        assert!(matches!(err, AssembleError::UnterminatedString { line: 1 }));
    }
}
