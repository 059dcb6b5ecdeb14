//! Low-level scanning over DDL text.
//!
//! Everything here is quote-aware: single- and double-quoted strings with
//! backslash escaping (and MySQL's doubled-quote form), plus backtick-quoted
//! identifiers. Parenthesis depth is never counted inside a quoted span.

use crate::error::{Error, Result};

/// Returns true for characters that may appear in a bare identifier or
/// keyword.
pub(crate) fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Finds the byte index of the `)` matching the `(` at `open`.
///
/// `base` is the global offset of `s` within the original document and is
/// only used for error reporting.
pub(crate) fn find_matching_paren(s: &str, open: usize, base: usize) -> Result<usize> {
    debug_assert_eq!(&s[open..=open], "(");
    let mut depth = 0usize;
    let mut iter = s[open..].char_indices();

    while let Some((i, c)) = iter.next() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(open + i);
                }
            }
            '\'' | '"' | '`' => {
                let quote_at = open + i;
                if !skip_quoted(&mut iter, c) {
                    return Err(Error::parse("unterminated quoted string", base + quote_at));
                }
            }
            _ => {}
        }
    }

    Err(Error::parse("unbalanced parentheses", base + open))
}

/// Consumes a quoted span from `iter`, whose opening quote has already been
/// consumed. Returns false if the input ends before the closing quote.
fn skip_quoted(iter: &mut std::str::CharIndices<'_>, quote: char) -> bool {
    while let Some((_, c)) = iter.next() {
        if c == '\\' && quote != '`' {
            if iter.next().is_none() {
                return false;
            }
        } else if c == quote {
            // A doubled quote is an escaped quote, not the end of the span.
            let mut lookahead = iter.clone();
            if lookahead.next().is_some_and(|(_, n)| n == quote) {
                iter.next();
            } else {
                return true;
            }
        }
    }
    false
}

/// Splits `s` at top-level occurrences of `sep`, respecting parentheses and
/// quoted spans. Returns `(byte_offset, segment)` pairs; separators are not
/// included. Best-effort: an unterminated quote ends the final segment.
pub(crate) fn split_top_level(s: &str, sep: char) -> Vec<(usize, &str)> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut iter = s.char_indices();

    while let Some((i, c)) = iter.next() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            '\'' | '"' | '`' => {
                skip_quoted(&mut iter, c);
            }
            c if c == sep && depth == 0 => {
                parts.push((start, &s[start..i]));
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push((start, &s[start..]));
    parts
}

/// A cursor over a fragment of the DDL document.
///
/// `base` is the fragment's offset within the original document, so every
/// error carries a byte offset the user can map back to their file.
pub(crate) struct DefScanner<'a> {
    input: &'a str,
    pos: usize,
    base: usize,
}

impl<'a> DefScanner<'a> {
    pub(crate) fn new(input: &'a str, base: usize) -> Self {
        Self { input, pos: 0, base }
    }

    /// Global byte offset of the cursor.
    pub(crate) fn offset(&self) -> usize {
        self.base + self.pos
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    pub(crate) fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    pub(crate) fn is_done(&mut self) -> bool {
        self.skip_whitespace();
        self.pos >= self.input.len()
    }

    /// Returns true if the next token is the given keyword
    /// (case-insensitive, on a word boundary).
    pub(crate) fn peek_keyword(&mut self, keyword: &str) -> bool {
        self.skip_whitespace();
        let rest = &self.input[self.pos..];
        if rest.len() < keyword.len() || !rest.is_char_boundary(keyword.len()) {
            return false;
        }
        rest[..keyword.len()].eq_ignore_ascii_case(keyword)
            && !rest[keyword.len()..].chars().next().is_some_and(is_word_char)
    }

    /// Consumes the given keyword if it is next; returns whether it was.
    pub(crate) fn accept_keyword(&mut self, keyword: &str) -> bool {
        if self.peek_keyword(keyword) {
            self.pos += keyword.len();
            true
        } else {
            false
        }
    }

    /// Consumes the given keyword or fails with a parse error.
    pub(crate) fn expect_keyword(&mut self, keyword: &str) -> Result<()> {
        if self.accept_keyword(keyword) {
            Ok(())
        } else {
            Err(Error::parse(
                format!("expected `{keyword}`"),
                self.offset(),
            ))
        }
    }

    /// Consumes a single punctuation character if it is next.
    pub(crate) fn accept_char(&mut self, expected: char) -> bool {
        self.skip_whitespace();
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Returns the next non-whitespace character without consuming it.
    pub(crate) fn peek_char(&mut self) -> Option<char> {
        self.skip_whitespace();
        self.peek()
    }

    /// Reads a bare word (identifier or keyword). Empty result means the
    /// cursor is not on a word.
    pub(crate) fn read_word(&mut self) -> &'a str {
        self.skip_whitespace();
        let start = self.pos;
        while self.peek().is_some_and(is_word_char) {
            self.advance();
        }
        &self.input[start..self.pos]
    }

    /// Reads a raw token: everything up to the next whitespace character.
    /// Used for literal values (`0.00`, `-1`, `b'0'`, `CURRENT_TIMESTAMP(6)`)
    /// where word boundaries are too strict.
    pub(crate) fn read_raw_token(&mut self) -> &'a str {
        self.skip_whitespace();
        let start = self.pos;
        while self.peek().is_some_and(|c| !c.is_whitespace()) {
            self.advance();
        }
        &self.input[start..self.pos]
    }

    /// Reads an identifier, backtick-quoted or bare.
    pub(crate) fn read_identifier(&mut self) -> Result<String> {
        self.skip_whitespace();
        if self.peek() == Some('`') {
            let open = self.offset();
            self.advance();
            let mut name = String::new();
            loop {
                match self.advance() {
                    Some('`') => {
                        if self.peek() == Some('`') {
                            self.advance();
                            name.push('`');
                        } else {
                            return Ok(name);
                        }
                    }
                    Some(c) => name.push(c),
                    None => {
                        return Err(Error::parse("unterminated quoted identifier", open));
                    }
                }
            }
        }

        let word = self.read_word();
        if word.is_empty() {
            Err(Error::parse("expected identifier", self.offset()))
        } else {
            Ok(word.to_string())
        }
    }

    /// Reads a single- or double-quoted string, resolving backslash and
    /// doubled-quote escapes.
    pub(crate) fn read_quoted_string(&mut self) -> Result<String> {
        self.skip_whitespace();
        let open = self.offset();
        let quote = match self.peek() {
            Some(q @ ('\'' | '"')) => q,
            _ => return Err(Error::parse("expected quoted string", open)),
        };
        self.advance();

        let mut value = String::new();
        loop {
            match self.advance() {
                Some('\\') => match self.advance() {
                    Some(next) if next == quote || next == '\\' => value.push(next),
                    Some(next) => {
                        value.push('\\');
                        value.push(next);
                    }
                    None => return Err(Error::parse("unterminated quoted string", open)),
                },
                Some(c) if c == quote => {
                    if self.peek() == Some(quote) {
                        self.advance();
                        value.push(quote);
                    } else {
                        return Ok(value);
                    }
                }
                Some(c) => value.push(c),
                None => return Err(Error::parse("unterminated quoted string", open)),
            }
        }
    }

    /// Reads a parenthesized group, returning the content between the parens
    /// verbatim, and the group's global start offset.
    pub(crate) fn read_paren_group(&mut self) -> Result<(usize, &'a str)> {
        self.skip_whitespace();
        if self.peek() != Some('(') {
            return Err(Error::parse("expected `(`", self.offset()));
        }
        let open = self.pos;
        let close = find_matching_paren(self.input, open, self.base)?;
        let inner = &self.input[open + 1..close];
        self.pos = close + 1;
        Ok((self.base + open + 1, inner))
    }

    /// Remaining unconsumed input.
    pub(crate) fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_matching_paren_simple() {
        let s = "(a, b(c), d)";
        assert_eq!(find_matching_paren(s, 0, 0).unwrap(), s.len() - 1);
    }

    #[test]
    fn test_find_matching_paren_ignores_quoted() {
        let s = "(comment 'hello ) world')";
        assert_eq!(find_matching_paren(s, 0, 0).unwrap(), s.len() - 1);

        let s = "(x default '(foo')";
        assert_eq!(find_matching_paren(s, 0, 0).unwrap(), s.len() - 1);
    }

    #[test]
    fn test_find_matching_paren_backslash_escape() {
        let s = r"(a default 'it\') )', b)";
        assert_eq!(find_matching_paren(s, 0, 0).unwrap(), s.len() - 1);
    }

    #[test]
    fn test_find_matching_paren_unbalanced() {
        let err = find_matching_paren("(a, (b", 0, 10).unwrap_err();
        assert!(err.to_string().contains("offset 10"));
    }

    #[test]
    fn test_find_matching_paren_unterminated_string() {
        let err = find_matching_paren("(a 'oops)", 0, 0).unwrap_err();
        assert!(err.to_string().contains("unterminated"));
    }

    #[test]
    fn test_split_top_level_commas() {
        let body = "id int, amount decimal(20,8), comment varchar(8) default 'a,b'";
        let parts: Vec<&str> = split_top_level(body, ',')
            .into_iter()
            .map(|(_, p)| p.trim())
            .collect();
        assert_eq!(
            parts,
            vec![
                "id int",
                "amount decimal(20,8)",
                "comment varchar(8) default 'a,b'"
            ]
        );
    }

    #[test]
    fn test_split_statements_quoted_semicolon() {
        let doc = "create table a (x varchar(4) default ';');create table b (y int)";
        let parts = split_top_level(doc, ';');
        assert_eq!(parts.len(), 2);
        assert!(parts[1].1.contains("create table b"));
    }

    #[test]
    fn test_scanner_keywords_and_identifiers() {
        let mut s = DefScanner::new("NOT NULL `weird``name` plain", 0);
        assert!(s.accept_keyword("not"));
        assert!(s.accept_keyword("NULL"));
        assert_eq!(s.read_identifier().unwrap(), "weird`name");
        assert_eq!(s.read_identifier().unwrap(), "plain");
        assert!(s.is_done());
    }

    #[test]
    fn test_scanner_keyword_word_boundary() {
        let mut s = DefScanner::new("KEYED", 0);
        assert!(!s.peek_keyword("KEY"));
    }

    #[test]
    fn test_scanner_quoted_string_escapes() {
        let mut s = DefScanner::new(r"'it\'s ''fine'''", 0);
        assert_eq!(s.read_quoted_string().unwrap(), "it's 'fine'");
    }

    #[test]
    fn test_scanner_paren_group_verbatim() {
        let mut s = DefScanner::new("decimal(20, 8) not null", 0);
        assert_eq!(s.read_word(), "decimal");
        let (_, group) = s.read_paren_group().unwrap();
        assert_eq!(group, "20, 8");
        assert!(s.accept_keyword("NOT"));
    }
}
