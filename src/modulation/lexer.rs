//! Lexer for the modulation language.
//!
//! Converts source text into a stream of [`Token`]s.

use super::error::ModulationError;
use super::token::{Token, TokenKind};
use crate::note::{midi_from_parts, pitch_class_value};
use crate::scanner::Scanner;

pub struct Lexer {
    scanner: Scanner,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            scanner: Scanner::new(source),
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>, ModulationError> {
        let mut tokens = Vec::new();

        loop {
            self.scanner.skip_trivia()?;
            let location = self.scanner.location();

            let Some(ch) = self.scanner.peek() else {
                tokens.push(Token {
                    kind: TokenKind::Eof,
                    location,
                });
                break;
            };

            let kind = match ch {
                '+' => {
                    self.scanner.advance();
                    if self.scanner.eat('=') {
                        TokenKind::PlusEq
                    } else {
                        TokenKind::Plus
                    }
                }
                '-' => self.single(TokenKind::Minus),
                '*' => self.single(TokenKind::Star),
                '/' => self.single(TokenKind::Slash),
                '=' => self.single(TokenKind::Eq),
                '|' => self.single(TokenKind::Pipe),
                ':' => self.single(TokenKind::Colon),
                ',' => self.single(TokenKind::Comma),
                '(' => self.single(TokenKind::LParen),
                ')' => self.single(TokenKind::RParen),
                '.' if self.scanner.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => {
                    self.lex_number()
                }
                '.' => self.single(TokenKind::Dot),
                '0'..='9' => self.lex_number(),
                'A'..='G' => self.lex_pitch(ch)?,
                'a'..='z' | '_' => self.lex_ident(),
                _ => {
                    return Err(ModulationError::grammar(
                        &["number", "identifier", "pitch", "operator"],
                        self.scanner.found(),
                        location,
                    ));
                }
            };

            tokens.push(Token { kind, location });
        }

        Ok(tokens)
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.scanner.advance();
        kind
    }

    /// Integer or decimal; a directly attached `t` makes it a period.
    fn lex_number(&mut self) -> TokenKind {
        let mut text = self.scanner.digits();
        if self.scanner.peek() == Some('.')
            && self.scanner.peek_at(1).is_some_and(|c| c.is_ascii_digit())
        {
            self.scanner.advance();
            text.push('.');
            text.push_str(&self.scanner.digits());
        }
        // Only digits and at most one dot were collected, so this always parses.
        let value: f64 = text.parse().unwrap_or(0.0);

        let is_period = self.scanner.peek() == Some('t')
            && !self
                .scanner
                .peek_at(1)
                .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_');
        if is_period {
            self.scanner.advance();
            TokenKind::Period(value)
        } else {
            TokenKind::Number(value)
        }
    }

    fn lex_pitch(&mut self, letter: char) -> Result<TokenKind, ModulationError> {
        self.scanner.advance();
        let mut name = String::from(letter);

        let accidental = match self.scanner.peek() {
            Some(c @ ('#' | 'b')) => {
                self.scanner.advance();
                name.push(c);
                Some(c)
            }
            _ => None,
        };

        let negative = self.scanner.peek() == Some('-')
            && self.scanner.peek_at(1).is_some_and(|c| c.is_ascii_digit());
        if negative {
            self.scanner.advance();
            name.push('-');
        }

        let digits = self.scanner.digits();
        if digits.is_empty() {
            return Err(ModulationError::grammar(
                &["octave"],
                self.scanner.found(),
                self.scanner.location(),
            ));
        }
        name.push_str(&digits);

        let octave = digits.parse::<i32>().unwrap_or(i32::MAX / 24);
        let octave = if negative { -octave } else { octave };
        let class = pitch_class_value(letter, accidental).unwrap_or(0);

        Ok(TokenKind::Pitch {
            name,
            midi: midi_from_parts(class, octave),
        })
    }

    fn lex_ident(&mut self) -> TokenKind {
        let mut s = String::new();
        while let Some(c) = self
            .scanner
            .peek()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        {
            s.push(c);
            self.scanner.advance();
        }
        TokenKind::Ident(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::Location;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn lex_assignment() {
        assert_eq!(
            kinds("velocity += 10"),
            vec![
                TokenKind::Ident("velocity".into()),
                TokenKind::PlusEq,
                TokenKind::Number(10.0),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lex_pitch_letters_and_accidentals() {
        assert_eq!(
            kinds("G#2 Bb-1"),
            vec![
                TokenKind::Pitch {
                    name: "G#2".into(),
                    midi: 56
                },
                TokenKind::Pitch {
                    name: "Bb-1".into(),
                    midi: 22
                },
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lex_pitch_range() {
        assert_eq!(
            kinds("C3-C4"),
            vec![
                TokenKind::Pitch {
                    name: "C3".into(),
                    midi: 60
                },
                TokenKind::Minus,
                TokenKind::Pitch {
                    name: "C4".into(),
                    midi: 72
                },
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lex_negative_octave() {
        assert_eq!(
            kinds("C-1-F#-1")[..3].to_vec(),
            vec![
                TokenKind::Pitch {
                    name: "C-1".into(),
                    midi: 12
                },
                TokenKind::Minus,
                TokenKind::Pitch {
                    name: "F#-1".into(),
                    midi: 18
                },
            ]
        );
    }

    #[test]
    fn lex_periods() {
        assert_eq!(
            kinds("4t 1:0.5t"),
            vec![
                TokenKind::Period(4.0),
                TokenKind::Number(1.0),
                TokenKind::Colon,
                TokenKind::Period(0.5),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn number_followed_by_word_is_not_period() {
        assert_eq!(
            kinds("2tri")[..2].to_vec(),
            vec![TokenKind::Number(2.0), TokenKind::Ident("tri".into())]
        );
    }

    #[test]
    fn lex_note_variable() {
        assert_eq!(
            kinds("note.velocityDeviation"),
            vec![
                TokenKind::Ident("note".into()),
                TokenKind::Dot,
                TokenKind::Ident("velocityDeviation".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lex_time_range() {
        assert_eq!(
            kinds("1|1-2|3.5")[..7].to_vec(),
            vec![
                TokenKind::Number(1.0),
                TokenKind::Pipe,
                TokenKind::Number(1.0),
                TokenKind::Minus,
                TokenKind::Number(2.0),
                TokenKind::Pipe,
                TokenKind::Number(3.5),
            ]
        );
    }

    #[test]
    fn comments_skipped() {
        assert_eq!(
            kinds("# heading\nvelocity // tail\n/* block */ = 1").len(),
            4
        );
    }

    #[test]
    fn token_locations() {
        let tokens = Lexer::new("velocity\n  = 1").tokenize().unwrap();
        assert_eq!(tokens[1].location, Location::new(2, 3));
    }

    #[test]
    fn unexpected_character() {
        let err = Lexer::new("velocity = 1 $").tokenize().unwrap_err();
        assert!(err.to_string().contains("'$'"));
    }

    #[test]
    fn pitch_without_octave() {
        assert!(Lexer::new("C velocity = 1").tokenize().is_err());
    }
}
