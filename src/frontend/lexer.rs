// src/frontend/lexer.rs

use crate::errors::LexerError;
use crate::frontend::{Span, Token, TokenType};

pub struct Lexer<'src> {
    source: &'src str,
    chars: std::iter::Peekable<std::str::CharIndices<'src>>,
    start: usize,
    current: usize,
    line: u32,
    column: u32,
    start_column: u32,
    start_line: u32,
    // Error collection
    errors: Vec<LexerError>,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            start: 0,
            current: 0,
            line: 1,
            column: 1,
            start_column: 1,
            start_line: 1,
            errors: Vec::new(),
        }
    }

    /// Take all collected errors, leaving the internal list empty.
    pub fn take_errors(&mut self) -> Vec<LexerError> {
        std::mem::take(&mut self.errors)
    }

    /// Check if any errors have been collected.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Get the source string being lexed.
    pub fn source(&self) -> &'src str {
        self.source
    }

    /// Get the next token from the source
    pub fn next_token(&mut self) -> Token {
        loop {
            self.skip_whitespace();

            self.start = self.current;
            self.start_column = self.column;
            self.start_line = self.line;

            let Some(c) = self.advance() else {
                return self.make_token(TokenType::Eof);
            };

            return match c {
                '(' => self.make_token(TokenType::LParen),
                ')' => self.make_token(TokenType::RParen),
                '{' => self.make_token(TokenType::LBrace),
                '}' => self.make_token(TokenType::RBrace),
                ']' => self.make_token(TokenType::RBracket),
                ';' => self.make_token(TokenType::Semicolon),
                ':' => self.make_token(TokenType::Colon),
                ',' => self.make_token(TokenType::Comma),
                '+' => self.make_token(TokenType::Plus),
                '*' => self.make_token(TokenType::Star),
                '%' => self.make_token(TokenType::Percent),
                '^' => self.make_token(TokenType::Caret),
                '#' => self.make_token(TokenType::Hash),
                '&' => self.make_token(TokenType::Ampersand),
                '|' => self.make_token(TokenType::Pipe),

                '[' => {
                    // Long string [[...]] or [=[...]=]
                    if self.long_bracket_level().is_some() {
                        self.long_string()
                    } else {
                        self.make_token(TokenType::LBracket)
                    }
                }

                '/' => {
                    if self.match_char('/') {
                        self.make_token(TokenType::SlashSlash)
                    } else {
                        self.make_token(TokenType::Slash)
                    }
                }
                '~' => {
                    if self.match_char('=') {
                        self.make_token(TokenType::TildeEq)
                    } else {
                        self.make_token(TokenType::Tilde)
                    }
                }
                '=' => {
                    if self.match_char('=') {
                        self.make_token(TokenType::EqEq)
                    } else {
                        self.make_token(TokenType::Eq)
                    }
                }
                '<' => {
                    if self.match_char('<') {
                        self.make_token(TokenType::LessLess)
                    } else if self.match_char('=') {
                        self.make_token(TokenType::LtEq)
                    } else {
                        self.make_token(TokenType::Lt)
                    }
                }
                '>' => {
                    if self.match_char('>') {
                        self.make_token(TokenType::GreaterGreater)
                    } else if self.match_char('=') {
                        self.make_token(TokenType::GtEq)
                    } else {
                        self.make_token(TokenType::Gt)
                    }
                }

                // Minus or comment
                '-' => {
                    if self.match_char('-') {
                        self.skip_comment();
                        continue;
                    }
                    self.make_token(TokenType::Minus)
                }

                '.' => {
                    if self.match_char('.') {
                        if self.match_char('.') {
                            self.make_token(TokenType::Ellipsis)
                        } else {
                            self.make_token(TokenType::DotDot)
                        }
                    } else if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                        self.number()
                    } else {
                        self.make_token(TokenType::Dot)
                    }
                }

                '"' | '\'' => self.string(c),

                c if c.is_ascii_digit() => self.number(),
                c if c.is_alphabetic() || c == '_' => self.identifier(),

                other => {
                    self.errors.push(LexerError::UnexpectedCharacter {
                        ch: other,
                        span: self.current_span().into(),
                    });
                    self.make_token(TokenType::Error)
                }
            };
        }
    }

    /// Tokenize the whole source (convenience for tests)
    pub fn tokenize(mut self) -> (Vec<Token>, Vec<LexerError>) {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token.ty == TokenType::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        let errors = self.take_errors();
        (tokens, errors)
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            match c {
                ' ' | '\r' | '\t' | '\n' => {
                    self.advance();
                }
                _ => break,
            }
        }
    }

    /// Skip a comment after `--` has been consumed. Handles both line
    /// comments and long comments (`--[[ ... ]]`, with level padding).
    fn skip_comment(&mut self) {
        if self.peek() == Some('[') {
            let saved = self.clone_position();
            self.advance(); // consume '['
            if let Some(level) = self.long_bracket_level() {
                self.consume_long_bracket_body(level);
                return;
            }
            self.restore_position(saved);
        }
        while self.peek().is_some_and(|c| c != '\n') {
            self.advance();
        }
    }

    /// After an initial `[`, check for `=*[` and consume it, returning the
    /// level. Leaves the lexer untouched when this is not a long bracket.
    fn long_bracket_level(&mut self) -> Option<usize> {
        let saved = self.clone_position();
        let mut level = 0;
        while self.peek() == Some('=') {
            self.advance();
            level += 1;
        }
        if self.peek() == Some('[') {
            self.advance();
            Some(level)
        } else {
            self.restore_position(saved);
            None
        }
    }

    /// Consume characters until the matching `]=*]` closer.
    /// Returns false when the source ends first.
    fn consume_long_bracket_body(&mut self, level: usize) -> bool {
        while let Some(c) = self.advance() {
            if c == ']' {
                let saved = self.clone_position();
                let mut eqs = 0;
                while self.peek() == Some('=') {
                    self.advance();
                    eqs += 1;
                }
                if eqs == level && self.peek() == Some(']') {
                    self.advance();
                    return true;
                }
                self.restore_position(saved);
            }
        }
        false
    }

    fn long_string(&mut self) -> Token {
        // The opening '[' is already consumed and long_bracket_level() has
        // consumed '=*['; recover the level from the lexeme so far.
        let opened = &self.source[self.start..self.current];
        let level = opened.chars().filter(|&c| c == '=').count();
        if !self.consume_long_bracket_body(level) {
            self.errors.push(LexerError::UnterminatedLongBracket {
                span: self.current_span().into(),
            });
            return self.make_token(TokenType::Error);
        }
        self.make_token(TokenType::StringLiteral)
    }

    fn string(&mut self, quote: char) -> Token {
        while let Some(c) = self.peek() {
            match c {
                '\\' => {
                    self.advance();
                    self.advance(); // escaped char, whatever it is
                }
                '\n' => break,
                c if c == quote => {
                    self.advance();
                    return self.make_token(TokenType::StringLiteral);
                }
                _ => {
                    self.advance();
                }
            }
        }
        self.errors.push(LexerError::UnterminatedString {
            span: self.current_span().into(),
        });
        self.make_token(TokenType::Error)
    }

    fn number(&mut self) -> Token {
        // Hex: 0x... (with optional hex fraction/exponent)
        let text_so_far = &self.source[self.start..self.current];
        if text_so_far == "0" && matches!(self.peek(), Some('x') | Some('X')) {
            self.advance();
            while self
                .peek()
                .is_some_and(|c| c.is_ascii_hexdigit() || c == '.')
            {
                self.advance();
            }
        } else {
            while self.peek().is_some_and(|c| c.is_ascii_digit() || c == '.') {
                self.advance();
            }
            if matches!(self.peek(), Some('e') | Some('E')) {
                self.advance();
                if matches!(self.peek(), Some('+') | Some('-')) {
                    self.advance();
                }
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.advance();
                }
            }
        }
        // Permissive integer suffix used by the target sources (1234L, 0.5f)
        if matches!(self.peek(), Some('L') | Some('l') | Some('F') | Some('f')) {
            self.advance();
        }

        let text = &self.source[self.start..self.current];
        if text.ends_with('.') && text.matches('.').count() > 1 {
            self.errors.push(LexerError::InvalidNumber {
                text: text.to_string(),
                span: self.current_span().into(),
            });
            return self.make_token(TokenType::Error);
        }
        self.make_token(TokenType::NumberLiteral)
    }

    fn identifier(&mut self) -> Token {
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
        {
            self.advance();
        }

        let text = &self.source[self.start..self.current];
        let ty = match text {
            "and" => TokenType::KwAnd,
            "break" => TokenType::KwBreak,
            "do" => TokenType::KwDo,
            "else" => TokenType::KwElse,
            "elseif" => TokenType::KwElseif,
            "end" => TokenType::KwEnd,
            "false" => TokenType::KwFalse,
            "for" => TokenType::KwFor,
            "function" => TokenType::KwFunction,
            "if" => TokenType::KwIf,
            "in" => TokenType::KwIn,
            "local" => TokenType::KwLocal,
            "nil" => TokenType::KwNil,
            "not" => TokenType::KwNot,
            "or" => TokenType::KwOr,
            "repeat" => TokenType::KwRepeat,
            "return" => TokenType::KwReturn,
            "then" => TokenType::KwThen,
            "true" => TokenType::KwTrue,
            "until" => TokenType::KwUntil,
            "while" => TokenType::KwWhile,
            _ => TokenType::Identifier,
        };
        self.make_token(ty)
    }

    fn advance(&mut self) -> Option<char> {
        let (_, c) = self.chars.next()?;
        self.current += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn make_token(&self, ty: TokenType) -> Token {
        let lexeme = &self.source[self.start..self.current];
        Token::new(ty, lexeme, self.current_span())
    }

    fn current_span(&self) -> Span {
        Span::new(self.start, self.current, self.start_line, self.start_column)
    }

    // Position save/restore for lookahead that may not pan out.
    // CharIndices is cheap to rebuild from a byte offset.
    fn clone_position(&self) -> (usize, u32, u32) {
        (self.current, self.line, self.column)
    }

    fn restore_position(&mut self, saved: (usize, u32, u32)) {
        let (offset, line, column) = saved;
        self.current = offset;
        self.line = line;
        self.column = column;
        self.chars = self.source[offset..].char_indices().peekable();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenType> {
        let (tokens, errors) = Lexer::new(source).tokenize();
        assert!(errors.is_empty(), "unexpected lex errors: {:?}", errors);
        tokens.into_iter().map(|t| t.ty).collect()
    }

    #[test]
    fn lex_assignment() {
        assert_eq!(
            kinds("x = 1"),
            vec![
                TokenType::Identifier,
                TokenType::Eq,
                TokenType::NumberLiteral,
                TokenType::Eof
            ]
        );
    }

    #[test]
    fn lex_method_call() {
        assert_eq!(
            kinds("Base:derive(\"Foo\")"),
            vec![
                TokenType::Identifier,
                TokenType::Colon,
                TokenType::Identifier,
                TokenType::LParen,
                TokenType::StringLiteral,
                TokenType::RParen,
                TokenType::Eof
            ]
        );
    }

    #[test]
    fn lex_line_comment() {
        assert_eq!(
            kinds("a -- comment\nb"),
            vec![TokenType::Identifier, TokenType::Identifier, TokenType::Eof]
        );
    }

    #[test]
    fn lex_long_comment() {
        assert_eq!(
            kinds("a --[[ multi\nline ]] b"),
            vec![TokenType::Identifier, TokenType::Identifier, TokenType::Eof]
        );
    }

    #[test]
    fn lex_long_string() {
        let (tokens, errors) = Lexer::new("x = [[hello\nworld]]").tokenize();
        assert!(errors.is_empty());
        assert_eq!(tokens[2].ty, TokenType::StringLiteral);
        assert_eq!(tokens[2].lexeme, "[[hello\nworld]]");
    }

    #[test]
    fn lex_leveled_long_string() {
        let (tokens, errors) = Lexer::new("x = [==[a ]] b]==]").tokenize();
        assert!(errors.is_empty());
        assert_eq!(tokens[2].ty, TokenType::StringLiteral);
    }

    #[test]
    fn lex_number_suffix() {
        assert_eq!(
            kinds("t = 1234L"),
            vec![
                TokenType::Identifier,
                TokenType::Eq,
                TokenType::NumberLiteral,
                TokenType::Eof
            ]
        );
    }

    #[test]
    fn lex_hex_number() {
        let (tokens, errors) = Lexer::new("m = 0xFF").tokenize();
        assert!(errors.is_empty());
        assert_eq!(tokens[2].lexeme, "0xFF");
    }

    #[test]
    fn lex_concat_vs_ellipsis() {
        assert_eq!(
            kinds("a .. ..."),
            vec![
                TokenType::Identifier,
                TokenType::DotDot,
                TokenType::Ellipsis,
                TokenType::Eof
            ]
        );
    }

    #[test]
    fn lex_not_equals() {
        assert_eq!(
            kinds("a ~= b"),
            vec![
                TokenType::Identifier,
                TokenType::TildeEq,
                TokenType::Identifier,
                TokenType::Eof
            ]
        );
    }

    #[test]
    fn unterminated_string_reports_error() {
        let (_, errors) = Lexer::new("x = \"abc").tokenize();
        assert!(matches!(
            errors.as_slice(),
            [LexerError::UnterminatedString { .. }]
        ));
    }

    #[test]
    fn string_escapes_do_not_terminate() {
        let (tokens, errors) = Lexer::new(r#"s = "a\"b""#).tokenize();
        assert!(errors.is_empty());
        assert_eq!(tokens[2].lexeme, r#""a\"b""#);
    }
}
