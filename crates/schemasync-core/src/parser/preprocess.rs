//! Preprocessing of raw DDL documents.
//!
//! Dump-style input carries comments, `SET` directives, and `DROP TABLE IF
//! EXISTS` boilerplate that the structural parser must not see. All stripping
//! here blanks characters to spaces instead of deleting them, so byte offsets
//! reported by later stages still point into the user's original file.

/// Blanks line comments (`--` to end of line) and block comments, including
/// MySQL's conditional-execution form `/*! ... */`. Comment markers inside
/// quoted strings or backtick identifiers are content and stay untouched.
#[must_use]
pub fn strip_comments(input: &str) -> String {
    #[derive(PartialEq)]
    enum State {
        Code,
        LineComment,
        BlockComment,
        Quoted(char),
    }

    let mut out = String::with_capacity(input.len());
    let mut state = State::Code;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            State::Code => match c {
                '-' if chars.peek() == Some(&'-') => {
                    chars.next();
                    out.push_str("  ");
                    state = State::LineComment;
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    out.push_str("  ");
                    state = State::BlockComment;
                }
                '\'' | '"' | '`' => {
                    out.push(c);
                    state = State::Quoted(c);
                }
                _ => out.push(c),
            },
            State::LineComment => {
                if c == '\n' {
                    out.push('\n');
                    state = State::Code;
                } else {
                    out.push(' ');
                }
            }
            State::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    out.push_str("  ");
                    state = State::Code;
                } else if c == '\n' {
                    out.push('\n');
                } else {
                    out.push(' ');
                }
            }
            State::Quoted(quote) => {
                out.push(c);
                if c == '\\' && quote != '`' {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                } else if c == quote {
                    state = State::Code;
                }
            }
        }
    }

    out
}

/// Blanks top-level `SET ...;` and `DROP TABLE ...;` statements.
///
/// A directive is only recognized at the start of a statement (beginning of
/// input or immediately after a `;`), so the `SET` data type, a `SET` column
/// default, and `CHARACTER SET` clauses inside a `CREATE TABLE` are never
/// touched. Expects comment-stripped input.
#[must_use]
pub fn strip_directives(input: &str) -> String {
    let mut out: Vec<u8> = input.as_bytes().to_vec();

    for (start, stmt) in super::scan::split_top_level(input, ';') {
        let head = stmt.trim_start();
        let mut words = head.split_whitespace();
        let first = words.next().unwrap_or("");
        let strip = first.eq_ignore_ascii_case("SET")
            || (first.eq_ignore_ascii_case("DROP")
                && words.next().is_some_and(|w| w.eq_ignore_ascii_case("TABLE")));

        if strip {
            // Blank the statement and its terminating semicolon.
            let end = (start + stmt.len() + 1).min(out.len());
            for byte in &mut out[start..end] {
                if *byte != b'\n' {
                    *byte = b' ';
                }
            }
        }
    }

    // The blanking above only ever rewrites ASCII statement bytes.
    String::from_utf8(out).expect("blanking preserves utf-8")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_line_comments() {
        let out = strip_comments("create table t ( -- trailing\n  id int\n)");
        assert!(!out.contains("trailing"));
        assert!(out.contains("id int"));
        assert_eq!(out.len(), "create table t ( -- trailing\n  id int\n)".len());
    }

    #[test]
    fn test_strip_block_and_conditional_comments() {
        let input = "/*!40101 SET NAMES utf8 */ create /* x */ table t (id int)";
        let out = strip_comments(input);
        assert!(!out.contains("40101"));
        assert!(!out.contains("NAMES"));
        assert!(out.contains("create"));
        assert!(out.contains("table t (id int)"));
    }

    #[test]
    fn test_comment_markers_inside_strings_survive() {
        let input = "create table t (a varchar(9) default '--x', b varchar(9) comment 'a /* b */')";
        let out = strip_comments(input);
        assert_eq!(out, input);
    }

    #[test]
    fn test_strip_set_directive_only_at_statement_start() {
        let input = "SET NAMES utf8;\ncreate table t (tags set('a','b'), name varchar(8) character set utf8mb4);";
        let out = strip_directives(strip_comments(input).as_str());
        assert!(!out.contains("NAMES"));
        assert!(out.contains("set('a','b')"));
        assert!(out.contains("character set utf8mb4"));
    }

    #[test]
    fn test_strip_drop_table_statements() {
        let input = "DROP TABLE IF EXISTS `users`;\nCREATE TABLE `users` (id int);";
        let out = strip_directives(strip_comments(input).as_str());
        assert!(!out.contains("DROP"));
        assert!(out.contains("CREATE TABLE `users`"));
    }

    #[test]
    fn test_offsets_preserved() {
        let input = "-- header\nSET NAMES utf8;\nCREATE TABLE t (id int);";
        let out = strip_directives(strip_comments(input).as_str());
        assert_eq!(out.len(), input.len());
        assert_eq!(out.find("CREATE"), input.find("CREATE"));
    }
}
