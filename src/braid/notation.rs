//! Text notation for braid words.
//!
//! Two notations are accepted:
//!
//! - signed integers separated by whitespace or commas, optionally wrapped
//!   in brackets: `1 -2 1 -2`, `[1, -2, 1, -2]`
//! - letters, lowercase for σᵢ and uppercase for σᵢ⁻¹: `aBaB`
//!
//! An optional `n:` prefix fixes the strand count (`4: 1 2 3`); otherwise
//! it is one more than the largest generator index.

use super::{Braid, Generator};
use crate::diagnostic::Diagnostic;
use crate::span::Span;

/// Parse a braid word, reporting the span of the first bad token.
pub fn parse_braid(text: &str) -> Result<Braid, Diagnostic> {
    let (strands, body, body_offset) = split_strand_prefix(text)?;

    let trimmed = body.trim();
    let lead = body.len() - body.trim_start().len();
    let mut offset = body_offset + lead;
    let mut inner = trimmed;
    if let Some(rest) = inner.strip_prefix('[') {
        let Some(rest) = rest.strip_suffix(']') else {
            return Err(Diagnostic::error(
                "unclosed '['".to_string(),
                Span::new(offset, offset + 1),
            ));
        };
        inner = rest;
        offset += 1;
    }

    let word = if inner.chars().any(|c| c.is_ascii_alphabetic()) {
        parse_letters(inner, offset)?
    } else {
        parse_integers(inner, offset)?
    };

    let needed = word.iter().map(|g| g.index() + 1).max().unwrap_or(1);
    let strands = match strands {
        Some((n, span)) if n < needed => {
            return Err(Diagnostic::error(
                format!("{} strands cannot carry generator σ{}", n, needed - 1),
                span,
            )
            .with_help(format!("use at least {} strands", needed)));
        }
        Some((n, _)) => n,
        None => needed,
    };

    Braid::new(strands, word).map_err(|e| Diagnostic::error(e.to_string(), Span::new(0, text.len())))
}

fn split_strand_prefix(text: &str) -> Result<(Option<(usize, Span)>, &str, usize), Diagnostic> {
    let Some((head, body)) = text.split_once(':') else {
        return Ok((None, text, 0));
    };
    let lead = head.len() - head.trim_start().len();
    let span = Span::new(lead, lead + head.trim().len());
    let n: usize = head.trim().parse().map_err(|_| {
        Diagnostic::error(format!("invalid strand count '{}'", head.trim()), span)
            .with_help("write the strand count as a positive integer, e.g. '3: 1 -2'".to_string())
    })?;
    if n == 0 {
        return Err(Diagnostic::error(
            "a braid needs at least one strand".to_string(),
            span,
        ));
    }
    Ok((Some((n, span)), body, head.len() + 1))
}

fn parse_integers(body: &str, offset: usize) -> Result<Vec<Generator>, Diagnostic> {
    let mut word = Vec::new();
    let mut start = None;
    // a trailing separator flushes the last token
    for (i, c) in body.char_indices().chain(std::iter::once((body.len(), ' '))) {
        let separator = c.is_whitespace() || c == ',';
        match (separator, start) {
            (false, None) => start = Some(i),
            (true, Some(s)) => {
                word.push(parse_integer_token(&body[s..i], offset + s)?);
                start = None;
            }
            _ => {}
        }
    }
    Ok(word)
}

fn parse_integer_token(token: &str, at: usize) -> Result<Generator, Diagnostic> {
    let span = Span::new(at, at + token.len());
    let value: i32 = token.parse().map_err(|_| {
        Diagnostic::error(format!("'{}' is not a generator", token), span)
            .with_help("generators are non-zero integers like 1 or -2".to_string())
    })?;
    Generator::from_signed(value).ok_or_else(|| {
        Diagnostic::error("0 is not a generator".to_string(), span)
            .with_note("σᵢ is written i and σᵢ⁻¹ is written -i, for i >= 1".to_string())
    })
}

fn parse_letters(body: &str, offset: usize) -> Result<Vec<Generator>, Diagnostic> {
    let mut word = Vec::new();
    for (i, c) in body.char_indices() {
        if c.is_whitespace() || c == ',' {
            continue;
        }
        if !c.is_ascii_alphabetic() {
            return Err(Diagnostic::error(
                format!("unexpected '{}' in letter notation", c),
                Span::new(offset + i, offset + i + c.len_utf8()),
            )
            .with_help("do not mix letters and integers in one word".to_string()));
        }
        let index = (c.to_ascii_lowercase() as u8 - b'a') as usize + 1;
        word.push(Generator::new(index, c.is_ascii_lowercase()));
    }
    Ok(word)
}

/// Integer notation that parses back to the same braid: `n:` is written
/// whenever the generators alone imply fewer strands than the braid has.
pub fn format_word(braid: &Braid) -> String {
    with_strand_prefix(braid, format_generators(braid))
}

/// The generators alone, `[]` for the empty word.
pub fn format_generators(braid: &Braid) -> String {
    if braid.is_empty() {
        return "[]".to_string();
    }
    braid
        .word()
        .iter()
        .map(|g| g.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Letter notation; only defined up to 26 generators, falls back to
/// integers beyond that.
pub fn format_letters(braid: &Braid) -> String {
    if braid.strands() > 27 {
        return format_word(braid);
    }
    if braid.is_empty() {
        return format_word(braid);
    }
    let letters = braid
        .word()
        .iter()
        .map(|g| {
            let c = (b'a' + g.column() as u8) as char;
            if g.is_positive() {
                c
            } else {
                c.to_ascii_uppercase()
            }
        })
        .collect();
    with_strand_prefix(braid, letters)
}

/// Strand count the parser infers from the generators.
fn implied_strands(braid: &Braid) -> usize {
    braid.word().iter().map(|g| g.index() + 1).max().unwrap_or(1)
}

fn with_strand_prefix(braid: &Braid, body: String) -> String {
    if braid.strands() == implied_strands(braid) {
        body
    } else {
        format!("{}: {}", braid.strands(), body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_integer_forms() {
        let b = parse_braid("1 -2 1 -2").unwrap();
        assert_eq!(b.strands(), 3);
        assert_eq!(b.signed_word(), vec![1, -2, 1, -2]);
        let c = parse_braid("[1, -2,1 ,-2]").unwrap();
        assert_eq!(b, c);
    }

    #[test]
    fn parses_letter_form() {
        let b = parse_braid("aBaB").unwrap();
        assert_eq!(b.signed_word(), vec![1, -2, 1, -2]);
        assert_eq!(format_letters(&b), "aBaB");
    }

    #[test]
    fn strand_prefix_widens_braid() {
        let b = parse_braid("5: 1 2").unwrap();
        assert_eq!(b.strands(), 5);
        assert_eq!(b.component_count(), 3);
    }

    #[test]
    fn strand_prefix_too_small_is_error() {
        let d = parse_braid("2: 1 2").unwrap_err();
        assert!(d.message.contains("2 strands"));
        assert_eq!(d.span, Span::new(0, 1));
    }

    #[test]
    fn empty_word_is_unknot() {
        let b = parse_braid("[]").unwrap();
        assert!(b.is_empty());
        assert_eq!(b.strands(), 1);
        assert_eq!(format_word(&b), "[]");
    }

    #[test]
    fn zero_reports_its_span() {
        let d = parse_braid("1 0 2").unwrap_err();
        assert_eq!(d.span, Span::new(2, 3));
        assert!(d.message.contains("0 is not a generator"));
    }

    #[test]
    fn garbage_token_reports_its_span() {
        let d = parse_braid("[1, x2]").unwrap_err();
        assert!(d.message.contains("unexpected"));
        let d = parse_braid("1 2-").unwrap_err();
        assert_eq!(d.span, Span::new(2, 4));
    }

    #[test]
    fn unclosed_bracket() {
        let d = parse_braid("  [1 2").unwrap_err();
        assert_eq!(d.span, Span::new(2, 3));
    }

    #[test]
    fn format_round_trips() {
        let b = parse_braid("3: 1 1 -2").unwrap();
        assert_eq!(format_word(&b), "1 1 -2");
        assert_eq!(parse_braid(&format_word(&b)).unwrap(), b);
    }

    #[test]
    fn unused_top_strands_are_written_out() {
        // Hopf link plus a separate unknot
        let b = Braid::from_signed(3, &[1, 1]).unwrap();
        assert_eq!(b.to_string(), "3: 1 1");
        assert_eq!(format_generators(&b), "1 1");
        let back = parse_braid(&b.to_string()).unwrap();
        assert_eq!(back, b);
        assert_eq!(back.component_count(), 3);

        let unlink = Braid::from_signed(2, &[]).unwrap();
        assert_eq!(unlink.to_string(), "2: []");
        assert_eq!(parse_braid(&unlink.to_string()).unwrap(), unlink);

        assert_eq!(format_letters(&b), "3: aa");
        assert_eq!(parse_braid(&format_letters(&b)).unwrap(), b);
    }
}
