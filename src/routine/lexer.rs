//! Lexer (tokenizer) for logic routine scripts.

use crate::error::{CosimError, Result};

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The kind of token
    pub kind: TokenKind,
    /// The token's text (string tokens hold the unquoted content)
    pub text: String,
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed)
    pub column: usize,
}

/// Token types in the routine language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// An identifier (`in`, `out`, `log`, `true`, `false`)
    Identifier,
    /// An unsigned integer
    Number,
    /// A double-quoted string literal
    String,
    /// Open bracket '['
    OpenBracket,
    /// Close bracket ']'
    CloseBracket,
    /// Open parenthesis '('
    OpenParen,
    /// Close parenthesis ')'
    CloseParen,
    /// Equals sign '='
    Equals,
    /// Logical not '!'
    Bang,
    /// Logical and '&'
    Amp,
    /// Logical or '|'
    Pipe,
    /// Logical xor '^'
    Caret,
    /// Newline (statement separator)
    Newline,
    /// End of file
    Eof,
}

/// Lexer for tokenizing routine source text.
pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given input.
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    /// Get the next token.
    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace_and_comments();

        let start_line = self.line;
        let start_column = self.column;

        let ch = match self.chars.peek().copied() {
            Some(ch) => ch,
            None => return Ok(self.token(TokenKind::Eof, String::new(), start_line, start_column)),
        };

        let token = match ch {
            '\n' => {
                self.advance();
                self.token(TokenKind::Newline, "\n".to_string(), start_line, start_column)
            }
            '[' => self.single(TokenKind::OpenBracket, ch, start_line, start_column),
            ']' => self.single(TokenKind::CloseBracket, ch, start_line, start_column),
            '(' => self.single(TokenKind::OpenParen, ch, start_line, start_column),
            ')' => self.single(TokenKind::CloseParen, ch, start_line, start_column),
            '=' => self.single(TokenKind::Equals, ch, start_line, start_column),
            '!' => self.single(TokenKind::Bang, ch, start_line, start_column),
            '&' => self.single(TokenKind::Amp, ch, start_line, start_column),
            '|' => self.single(TokenKind::Pipe, ch, start_line, start_column),
            '^' => self.single(TokenKind::Caret, ch, start_line, start_column),
            '"' => {
                let text = self.read_string(start_line, start_column)?;
                self.token(TokenKind::String, text, start_line, start_column)
            }
            '0'..='9' => {
                let text = self.read_number();
                self.token(TokenKind::Number, text, start_line, start_column)
            }
            _ if ch.is_alphabetic() || ch == '_' => {
                let text = self.read_identifier();
                self.token(TokenKind::Identifier, text, start_line, start_column)
            }
            _ => {
                return Err(CosimError::lexer(
                    start_line,
                    start_column,
                    format!("unexpected character '{}'", ch),
                ));
            }
        };

        Ok(token)
    }

    fn token(&self, kind: TokenKind, text: String, line: usize, column: usize) -> Token {
        Token {
            kind,
            text,
            line,
            column,
        }
    }

    fn single(&mut self, kind: TokenKind, ch: char, line: usize, column: usize) -> Token {
        self.advance();
        self.token(kind, ch.to_string(), line, column)
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.chars.next();
        if let Some(ch) = ch {
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        ch
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(&ch) = self.chars.peek() {
            if ch == ' ' || ch == '\t' || ch == '\r' {
                self.advance();
            } else if ch == '#' {
                // Skip comment until end of line
                while let Some(&c) = self.chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut text = String::new();
        while let Some(&ch) = self.chars.peek() {
            if ch.is_alphanumeric() || ch == '_' {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        text
    }

    fn read_number(&mut self) -> String {
        let mut text = String::new();
        while let Some(&ch) = self.chars.peek() {
            if ch.is_ascii_digit() {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        text
    }

    fn read_string(&mut self, line: usize, column: usize) -> Result<String> {
        self.advance(); // opening quote
        let mut text = String::new();
        loop {
            match self.advance() {
                Some('"') => return Ok(text),
                Some('\n') | None => {
                    return Err(CosimError::lexer(line, column, "unterminated string literal"));
                }
                Some(ch) => text.push(ch),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(input);
        let mut kinds = Vec::new();
        loop {
            let tok = lexer.next_token().unwrap();
            let done = tok.kind == TokenKind::Eof;
            kinds.push(tok.kind);
            if done {
                break;
            }
        }
        kinds
    }

    #[test]
    fn test_lexer_assignment() {
        assert_eq!(
            kinds("out[0] = !in[1]"),
            vec![
                TokenKind::Identifier,
                TokenKind::OpenBracket,
                TokenKind::Number,
                TokenKind::CloseBracket,
                TokenKind::Equals,
                TokenKind::Bang,
                TokenKind::Identifier,
                TokenKind::OpenBracket,
                TokenKind::Number,
                TokenKind::CloseBracket,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_lexer_comments_and_strings() {
        let mut lexer = Lexer::new("log \"q0\" # trailing comment");
        assert_eq!(lexer.next_token().unwrap().text, "log");
        let tok = lexer.next_token().unwrap();
        assert_eq!(tok.kind, TokenKind::String);
        assert_eq!(tok.text, "q0");
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Eof);
    }

    #[test]
    fn test_lexer_rejects_unknown_character() {
        let mut lexer = Lexer::new("out[0] = in[0] ~ 1");
        loop {
            match lexer.next_token() {
                Ok(tok) if tok.kind == TokenKind::Eof => panic!("expected lexer error"),
                Ok(_) => continue,
                Err(CosimError::LexerError { column, .. }) => {
                    assert_eq!(column, 16);
                    break;
                }
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
    }
}
