//! Character cursor shared by the notation parser and the modulation lexer.
//!
//! Tracks 1-based line/column positions and skips whitespace and the three
//! comment forms: `// line`, `# line` (only at the start of a token) and
//! `/* block */`.

use std::fmt;

/// A 1-based position in source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    pub col: usize,
}

impl Location {
    pub fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// What the parser ran into where it expected something else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Found {
    Char(char),
    Token(String),
    EndOfInput,
}

impl fmt::Display for Found {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Found::Char(c) => write!(f, "'{}'", c.escape_debug()),
            Found::Token(t) => write!(f, "'{t}'"),
            Found::EndOfInput => write!(f, "end of input"),
        }
    }
}

/// Render an expected-token set as `a, b or c`.
pub fn describe_expected(expected: &[&'static str]) -> String {
    match expected {
        [] => "nothing".to_string(),
        [only] => (*only).to_string(),
        [init @ .., last] => format!("{} or {last}", init.join(", ")),
    }
}

/// Saved cursor state for backtracking.
#[derive(Debug, Clone, Copy)]
pub struct Mark {
    pos: usize,
    line: usize,
    col: usize,
}

pub struct Scanner {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
}

/// An unterminated `/* ...` comment, reported at the comment start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnclosedComment(pub Location);

impl Scanner {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    pub fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    pub fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    pub fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    /// Consume `expected` if it is next.
    pub fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume `word` if the upcoming characters spell it.
    pub fn eat_str(&mut self, word: &str) -> bool {
        let matches = word
            .chars()
            .enumerate()
            .all(|(i, c)| self.peek_at(i) == Some(c));
        if matches {
            for _ in word.chars() {
                self.advance();
            }
        }
        matches
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    pub fn location(&self) -> Location {
        Location::new(self.line, self.col)
    }

    /// The character under the cursor, for error reports.
    pub fn found(&self) -> Found {
        match self.peek() {
            Some(c) => Found::Char(c),
            None => Found::EndOfInput,
        }
    }

    pub fn mark(&self) -> Mark {
        Mark {
            pos: self.pos,
            line: self.line,
            col: self.col,
        }
    }

    pub fn reset(&mut self, mark: Mark) {
        self.pos = mark.pos;
        self.line = mark.line;
        self.col = mark.col;
    }

    /// Consume a run of ASCII digits.
    pub fn digits(&mut self) -> String {
        let mut s = String::new();
        while let Some(c) = self.peek().filter(|c| c.is_ascii_digit()) {
            s.push(c);
            self.advance();
        }
        s
    }

    /// True at end of input, whitespace, or the start of a `//` or `/*` comment.
    pub fn at_separator(&self) -> bool {
        match self.peek() {
            None => true,
            Some(c) if c.is_whitespace() => true,
            Some('/') => matches!(self.peek_at(1), Some('/') | Some('*')),
            _ => false,
        }
    }

    /// Skip whitespace and comments.
    pub fn skip_trivia(&mut self) -> Result<(), UnclosedComment> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('#') => self.skip_line(),
                Some('/') if self.peek_at(1) == Some('/') => self.skip_line(),
                Some('/') if self.peek_at(1) == Some('*') => {
                    let start = self.location();
                    self.advance();
                    self.advance();
                    loop {
                        if self.is_at_end() {
                            return Err(UnclosedComment(start));
                        }
                        if self.eat_str("*/") {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn skip_line(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_lines_and_columns() {
        let mut s = Scanner::new("ab\ncd");
        s.advance();
        s.advance();
        assert_eq!(s.location(), Location::new(1, 3));
        s.advance();
        assert_eq!(s.location(), Location::new(2, 1));
    }

    #[test]
    fn skips_all_comment_forms() {
        let mut s = Scanner::new("  // one\n# two\n/* three\n */ x");
        s.skip_trivia().unwrap();
        assert_eq!(s.peek(), Some('x'));
        assert_eq!(s.location(), Location::new(4, 5));
    }

    #[test]
    fn unclosed_block_comment() {
        let mut s = Scanner::new("  /* never ends");
        assert_eq!(s.skip_trivia(), Err(UnclosedComment(Location::new(1, 3))));
    }

    #[test]
    fn separator_detection() {
        assert!(Scanner::new("").at_separator());
        assert!(Scanner::new(" x").at_separator());
        assert!(Scanner::new("// c").at_separator());
        assert!(!Scanner::new("/2").at_separator());
        assert!(!Scanner::new("#").at_separator());
    }

    #[test]
    fn mark_and_reset() {
        let mut s = Scanner::new("123x");
        let m = s.mark();
        assert_eq!(s.digits(), "123");
        s.reset(m);
        assert_eq!(s.peek(), Some('1'));
    }

    #[test]
    fn expected_list_wording() {
        assert_eq!(describe_expected(&["a"]), "a");
        assert_eq!(describe_expected(&["a", "b", "c"]), "a, b or c");
    }

    #[test]
    fn found_display() {
        assert_eq!(Found::Char('\n').to_string(), "'\\n'");
        assert_eq!(Found::EndOfInput.to_string(), "end of input");
    }
}
