//! Lexer for Decaf
//!
//! Converts source code into a stream of tokens. Lexical problems never
//! abort scanning: they come out as `TokenKind::Error` tokens carrying the
//! diagnostic, and the stream always ends with `Eof`.

use crate::frontend::token::{Token, TokenKind};
use crate::utils::Span;

/// Longest identifier the language accepts
pub const MAX_IDENTIFIER_LENGTH: usize = 31;

/// The lexer state
pub struct Lexer {
    /// Source code as chars
    source: Vec<char>,
    /// Current position in source
    pos: usize,
    /// Line of the current position (1-based)
    line: usize,
    /// Column of the current position (1-based)
    col: usize,
    /// Start position of current token
    start: usize,
    start_line: usize,
    start_col: usize,
    /// Position where the current line begins
    line_start: usize,
}

impl Lexer {
    /// Create a new lexer for the given source code
    pub fn new(source: &str) -> Self {
        Self {
            source: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
            start: 0,
            start_line: 1,
            start_col: 1,
            line_start: 0,
        }
    }

    /// Get the current character without advancing
    fn peek(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    /// Get the character `n` places ahead without advancing
    fn peek_at(&self, n: usize) -> Option<char> {
        self.source.get(self.pos + n).copied()
    }

    /// Advance to the next character
    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
            self.line_start = self.pos;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    /// Check if we've reached the end of input
    fn is_at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    /// Text of the current token so far
    fn lexeme(&self) -> String {
        self.source[self.start..self.pos].iter().collect()
    }

    /// Create a span from start to current position
    fn make_span(&self) -> Span {
        Span::new(self.start_line, self.start_col, self.col.saturating_sub(1).max(self.start_col))
    }

    /// Create a token with the current span
    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(kind, self.lexeme(), self.make_span())
    }

    fn error_token(&self, message: String) -> Token {
        self.make_token(TokenKind::Error(message))
    }

    fn int_out_of_range(&self) -> Token {
        self.error_token(format!("Integer constant out of range: {}", self.lexeme()))
    }

    /// Skip whitespace and comments
    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            match c {
                ' ' | '\t' | '\r' | '\n' => {
                    self.advance();
                }
                // Line comment
                '/' if self.peek_at(1) == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                // Block comment; an unterminated one swallows the rest of the input
                '/' if self.peek_at(1) == Some('*') => {
                    self.advance();
                    self.advance();
                    while !self.is_at_end() {
                        if self.peek() == Some('*') && self.peek_at(1) == Some('/') {
                            self.advance();
                            self.advance();
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    /// Whether only blanks precede the current token on its line
    fn at_line_start(&self) -> bool {
        self.source[self.line_start..self.start]
            .iter()
            .all(|c| c.is_whitespace())
    }

    /// Consume a `#` line as a single error token
    fn read_directive(&mut self) -> Token {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
        let text = self.lexeme();
        let trimmed = text.trim_end();
        let span = Span::new(
            self.start_line,
            self.start_col,
            self.start_col + trimmed.chars().count() - 1,
        );
        Token::new(
            TokenKind::Error("Invalid # directive".to_string()),
            trimmed,
            span,
        )
    }

    /// Read an identifier or keyword
    fn read_identifier(&mut self) -> Token {
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }

        let text = self.lexeme();

        if text.chars().count() > MAX_IDENTIFIER_LENGTH {
            return self.error_token(format!("Identifier too long: \"{}\"", text));
        }

        let kind = TokenKind::keyword_from_str(&text).unwrap_or(TokenKind::Ident(text));

        self.make_token(kind)
    }

    fn consume_digits(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Read a number literal (hex, double or int)
    fn read_number(&mut self) -> Token {
        // Hex needs at least one digit after the prefix
        if self.peek() == Some('0')
            && matches!(self.peek_at(1), Some('x') | Some('X'))
            && self.peek_at(2).map_or(false, |c| c.is_ascii_hexdigit())
        {
            self.advance(); // 0
            self.advance(); // x

            while let Some(c) = self.peek() {
                if c.is_ascii_hexdigit() {
                    self.advance();
                } else {
                    break;
                }
            }

            // Any 32-bit pattern is accepted, so 0xFFFFFFFF is -1
            let text = self.lexeme();
            return match u32::from_str_radix(&text[2..], 16) {
                Ok(bits) => self.make_token(TokenKind::IntLit(bits as i32)),
                Err(_) => self.int_out_of_range(),
            };
        }

        self.consume_digits();

        if self.peek() != Some('.') {
            return match self.lexeme().parse::<i32>() {
                Ok(value) => self.make_token(TokenKind::IntLit(value)),
                Err(_) => self.int_out_of_range(),
            };
        }

        self.advance(); // consume '.'
        self.consume_digits();

        // Exponent only counts when at least one digit follows
        if matches!(self.peek(), Some('e') | Some('E')) {
            let sign = usize::from(matches!(self.peek_at(1), Some('+') | Some('-')));
            if self.peek_at(1 + sign).map_or(false, |c| c.is_ascii_digit()) {
                self.advance();
                if sign == 1 {
                    self.advance();
                }
                self.consume_digits();
            }
        }

        let value = self.lexeme().parse().unwrap_or(0.0);
        self.make_token(TokenKind::DoubleLit(value))
    }

    /// Read a string literal. Strings may not cross a line break.
    fn read_string(&mut self) -> Token {
        self.advance(); // consume opening quote

        while let Some(c) = self.peek() {
            match c {
                '"' => {
                    self.advance();
                    let text = self.lexeme();
                    let value = text[1..text.len() - 1].to_string();
                    return self.make_token(TokenKind::StringLit(value));
                }
                '\n' => break,
                '\\' => {
                    self.advance();
                    if matches!(self.peek(), Some(c) if c != '\n') {
                        self.advance();
                    }
                }
                _ => {
                    self.advance();
                }
            }
        }

        let text = self.lexeme();
        self.error_token(format!("Unterminated string constant: {}", text))
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();
        self.start = self.pos;
        self.start_line = self.line;
        self.start_col = self.col;

        let c = match self.peek() {
            Some(c) => c,
            None => return Token::eof(Span::new(self.line, self.col, self.col)),
        };

        if c == '#' && self.at_line_start() {
            return self.read_directive();
        }

        // Identifiers and keywords
        if c.is_ascii_alphabetic() {
            return self.read_identifier();
        }

        // Numbers
        if c.is_ascii_digit() {
            return self.read_number();
        }

        // String literals
        if c == '"' {
            return self.read_string();
        }

        self.advance();

        // Operators and punctuation
        let kind = match c {
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '=' => {
                if self.peek() == Some('=') {
                    self.advance();
                    TokenKind::EqEq
                } else {
                    TokenKind::Eq
                }
            }
            '!' => {
                if self.peek() == Some('=') {
                    self.advance();
                    TokenKind::Ne
                } else {
                    TokenKind::Not
                }
            }
            '<' => {
                if self.peek() == Some('=') {
                    self.advance();
                    TokenKind::Le
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                if self.peek() == Some('=') {
                    self.advance();
                    TokenKind::Ge
                } else {
                    TokenKind::Gt
                }
            }
            '&' if self.peek() == Some('&') => {
                self.advance();
                TokenKind::AndAnd
            }
            '|' if self.peek() == Some('|') => {
                self.advance();
                TokenKind::OrOr
            }
            '.' => TokenKind::Dot,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            _ => TokenKind::Error(format!("Unrecognized char: '{}'", c)),
        };

        self.make_token(kind)
    }

    /// Tokenize the entire source and return all tokens
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }
}

/// Render the classic one-line-per-token listing
pub fn dump_tokens(tokens: &[Token]) -> String {
    let mut out = String::new();
    for token in tokens {
        let span = token.span;
        let value = match &token.kind {
            TokenKind::Eof => continue,
            TokenKind::Error(message) => {
                out.push_str(&format!("\n*** Error line {}.\n*** {}\n\n", span.line, message));
                continue;
            }
            TokenKind::IntLit(v) => Some(v.to_string()),
            TokenKind::DoubleLit(v) => Some(v.to_string()),
            TokenKind::BoolLit(v) => Some(v.to_string()),
            TokenKind::StringLit(_) => Some(token.lexeme.clone()),
            _ => None,
        };
        out.push_str(&format!(
            "{:<12} line {} cols {}-{} is {}",
            token.lexeme,
            span.line,
            span.start_col,
            span.end_col,
            token.kind.name()
        ));
        if let Some(value) = value {
            out.push_str(&format!(" (value = {})", value));
        }
        out.push('\n');
    }
    out
}
