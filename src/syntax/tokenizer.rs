//! The tokenizer never fails. Characters that cannot start a token are
//! preserved as `Error` tokens and the stream is always terminated by
//! exactly one `Eof`, so downstream consumers decide how to report
//! problems with full position information.

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    // Keywords
    Func,
    Var,
    If,
    Else,
    While,
    Return,
    True,
    False,
    // Type keywords
    IntKw,
    BoolKw,

    Identifier(String),
    IntLiteral(i32),

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Eq, // "=="
    Ne, // "!="
    Lt,
    Le, // "<="
    Gt,
    Ge, // ">="
    And, // "&&"
    Or,  // "||"
    Not,

    // Punctuation
    Assign,
    Semicolon,
    Colon,
    Comma,
    LParen,
    RParen,
    LBrace,
    RBrace,

    Eof,
    Error(char),
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            TokenKind::Func => "func",
            TokenKind::Var => "var",
            TokenKind::If => "if",
            TokenKind::Else => "else",
            TokenKind::While => "while",
            TokenKind::Return => "return",
            TokenKind::True => "true",
            TokenKind::False => "false",
            TokenKind::IntKw => "int",
            TokenKind::BoolKw => "bool",
            TokenKind::Identifier(name) => return write!(f, "{}", name),
            TokenKind::IntLiteral(value) => return write!(f, "{}", value),
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::Eq => "==",
            TokenKind::Ne => "!=",
            TokenKind::Lt => "<",
            TokenKind::Le => "<=",
            TokenKind::Gt => ">",
            TokenKind::Ge => ">=",
            TokenKind::And => "&&",
            TokenKind::Or => "||",
            TokenKind::Not => "!",
            TokenKind::Assign => "=",
            TokenKind::Semicolon => ";",
            TokenKind::Colon => ":",
            TokenKind::Comma => ",",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::Eof => "EOF",
            TokenKind::Error(c) => return write!(f, "{}", c),
        };
        f.write_str(symbol)
    }
}

/// A token with the 1-based line and column of its first character. The
/// `Eof` token carries the position of the input tail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: u32,
    pub column: u32,
}

/// An ordered token sequence terminated by exactly one `Eof`. Consumed
/// once by the parser; there is no rewind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenStream {
    tokens: Vec<Token>,
}

impl TokenStream {
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Token count including the terminating `Eof`.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn first_error(&self) -> Option<&Token> {
        self.tokens
            .iter()
            .find(|token| matches!(token.kind, TokenKind::Error(_)))
    }
}

pub struct Tokenizer<'a> {
    chars: Peekable<Chars<'a>>,
    line: u32,
    column: u32,
}

impl<'a> Tokenizer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    pub fn tokenize(source: &'a str) -> TokenStream {
        let mut tokenizer = Tokenizer::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = tokenizer.next_token();
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        TokenStream { tokens }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            return true;
        }
        false
    }

    fn next_token(&mut self) -> Token {
        loop {
            self.skip_whitespace();

            let line = self.line;
            let column = self.column;
            let c = match self.advance() {
                Some(c) => c,
                None => {
                    return Token {
                        kind: TokenKind::Eof,
                        line,
                        column,
                    }
                }
            };

            let kind = match c {
                '/' if self.eat('/') => {
                    self.skip_line_comment();
                    continue;
                }
                '/' if self.eat('*') => {
                    self.skip_block_comment();
                    continue;
                }
                '/' => TokenKind::Slash,
                '+' => TokenKind::Plus,
                '-' => TokenKind::Minus,
                '*' => TokenKind::Star,
                '%' => TokenKind::Percent,
                '(' => TokenKind::LParen,
                ')' => TokenKind::RParen,
                '{' => TokenKind::LBrace,
                '}' => TokenKind::RBrace,
                ';' => TokenKind::Semicolon,
                ':' => TokenKind::Colon,
                ',' => TokenKind::Comma,
                '=' => {
                    if self.eat('=') {
                        TokenKind::Eq
                    } else {
                        TokenKind::Assign
                    }
                }
                '!' => {
                    if self.eat('=') {
                        TokenKind::Ne
                    } else {
                        TokenKind::Not
                    }
                }
                '<' => {
                    if self.eat('=') {
                        TokenKind::Le
                    } else {
                        TokenKind::Lt
                    }
                }
                '>' => {
                    if self.eat('=') {
                        TokenKind::Ge
                    } else {
                        TokenKind::Gt
                    }
                }
                '&' => {
                    if self.eat('&') {
                        TokenKind::And
                    } else {
                        TokenKind::Error('&')
                    }
                }
                '|' => {
                    if self.eat('|') {
                        TokenKind::Or
                    } else {
                        TokenKind::Error('|')
                    }
                }
                c if is_identifier_start(c) => self.scan_identifier(c),
                c if c.is_ascii_digit() => self.scan_number(c),
                other => TokenKind::Error(other),
            };

            return Token { kind, line, column };
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_ascii_whitespace() {
                break;
            }
            self.advance();
        }
    }

    fn skip_line_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
    }

    // Block comments do not nest; an unterminated one runs to the end of
    // the input.
    fn skip_block_comment(&mut self) {
        while let Some(c) = self.advance() {
            if c == '*' && self.eat('/') {
                break;
            }
        }
    }

    fn scan_identifier(&mut self, first: char) -> TokenKind {
        let mut lexeme = String::new();
        lexeme.push(first);
        while let Some(c) = self.peek() {
            if !is_identifier_continue(c) {
                break;
            }
            lexeme.push(c);
            self.advance();
        }
        match keyword(&lexeme) {
            Some(kind) => kind,
            None => TokenKind::Identifier(lexeme),
        }
    }

    // Values beyond i32::MAX saturate; the language has no unary minus,
    // so literals are always non-negative.
    fn scan_number(&mut self, first: char) -> TokenKind {
        let mut value = i64::from(first as u8 - b'0');
        while let Some(c) = self.peek() {
            if !c.is_ascii_digit() {
                break;
            }
            self.advance();
            if value <= i64::from(i32::MAX) {
                value = value * 10 + i64::from(c as u8 - b'0');
            }
        }
        TokenKind::IntLiteral(value.min(i64::from(i32::MAX)) as i32)
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_identifier_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn keyword(lexeme: &str) -> Option<TokenKind> {
    let kind = match lexeme {
        "func" => TokenKind::Func,
        "var" => TokenKind::Var,
        "if" => TokenKind::If,
        "else" => TokenKind::Else,
        "while" => TokenKind::While,
        "return" => TokenKind::Return,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        "int" => TokenKind::IntKw,
        "bool" => TokenKind::BoolKw,
        _ => return None,
    };
    Some(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Tokenizer::tokenize(source)
            .tokens()
            .iter()
            .map(|token| token.kind.clone())
            .collect()
    }

    #[test]
    fn empty_input_is_just_eof() {
        let stream = Tokenizer::tokenize("");
        assert_eq!(stream.len(), 1);
        assert_eq!(stream.tokens()[0].kind, TokenKind::Eof);
        assert_eq!(stream.tokens()[0].line, 1);
        assert_eq!(stream.tokens()[0].column, 1);
    }

    #[test]
    fn whitespace_only_input_is_just_eof() {
        let stream = Tokenizer::tokenize("   \n\n");
        assert_eq!(stream.len(), 1);
        assert_eq!(stream.tokens()[0].kind, TokenKind::Eof);
    }

    #[test]
    fn classifies_all_ten_keywords() {
        assert_eq!(
            kinds("func var if else while return true false int bool"),
            vec![
                TokenKind::Func,
                TokenKind::Var,
                TokenKind::If,
                TokenKind::Else,
                TokenKind::While,
                TokenKind::Return,
                TokenKind::True,
                TokenKind::False,
                TokenKind::IntKw,
                TokenKind::BoolKw,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn keyword_prefixes_are_identifiers() {
        assert_eq!(
            kinds("funcs iff int_ _if"),
            vec![
                TokenKind::Identifier("funcs".to_string()),
                TokenKind::Identifier("iff".to_string()),
                TokenKind::Identifier("int_".to_string()),
                TokenKind::Identifier("_if".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn longest_match_for_operators() {
        assert_eq!(
            kinds("== = != ! <= < >= > && ||"),
            vec![
                TokenKind::Eq,
                TokenKind::Assign,
                TokenKind::Ne,
                TokenKind::Not,
                TokenKind::Le,
                TokenKind::Lt,
                TokenKind::Ge,
                TokenKind::Gt,
                TokenKind::And,
                TokenKind::Or,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn scans_integer_literals() {
        assert_eq!(
            kinds("0 42 1000000"),
            vec![
                TokenKind::IntLiteral(0),
                TokenKind::IntLiteral(42),
                TokenKind::IntLiteral(1000000),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn oversized_literal_saturates() {
        assert_eq!(
            kinds("99999999999999999999"),
            vec![TokenKind::IntLiteral(i32::MAX), TokenKind::Eof]
        );
    }

    #[test]
    fn positions_are_one_based() {
        let stream = Tokenizer::tokenize("var x\n  = 1;");
        let tokens = stream.tokens();

        assert_eq!((tokens[0].line, tokens[0].column), (1, 1)); // var
        assert_eq!((tokens[1].line, tokens[1].column), (1, 5)); // x
        assert_eq!((tokens[2].line, tokens[2].column), (2, 3)); // =
        assert_eq!((tokens[3].line, tokens[3].column), (2, 5)); // 1
        assert_eq!((tokens[4].line, tokens[4].column), (2, 6)); // ;
    }

    #[test]
    fn comments_only_affect_positions() {
        let with_comments = kinds("a  b /*c*/  d");
        let without = kinds("a b d");
        assert_eq!(with_comments, without);

        let line_comment = kinds("a // b c d\ne");
        assert_eq!(
            line_comment,
            vec![
                TokenKind::Identifier("a".to_string()),
                TokenKind::Identifier("e".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn block_comments_do_not_nest() {
        // The first "*/" closes the comment, so "d */" is real input.
        assert_eq!(
            kinds("a /* b /* c */ d"),
            vec![
                TokenKind::Identifier("a".to_string()),
                TokenKind::Identifier("d".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn stray_characters_become_error_tokens() {
        let stream = Tokenizer::tokenize("var x = 1 $ 2;");
        let error = stream.first_error().unwrap();
        assert_eq!(error.kind, TokenKind::Error('$'));
        assert_eq!((error.line, error.column), (1, 11));

        // Lone '&' and '|' are not tokens of the language.
        assert!(Tokenizer::tokenize("a & b").first_error().is_some());
        assert!(Tokenizer::tokenize("a | b").first_error().is_some());
    }

    #[test]
    fn stream_ends_with_exactly_one_eof() {
        let stream = Tokenizer::tokenize("func main() : int { return 0; }");
        let eof_count = stream
            .tokens()
            .iter()
            .filter(|token| token.kind == TokenKind::Eof)
            .count();
        assert_eq!(eof_count, 1);
        assert_eq!(stream.tokens().last().map(|t| &t.kind), Some(&TokenKind::Eof));
    }
}
