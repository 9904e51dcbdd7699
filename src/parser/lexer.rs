use logos::Logos;
use crate::ast::Location;

/// Token types for the lock-annotation language
#[derive(Logos, Debug, PartialEq, Clone)]
pub enum Token {
    // Keywords
    #[token("lock")]
    Lock,
    #[token("locktype")]
    LockType,
    #[token("locks")]
    Locks,
    #[token("level")]
    Level,
    #[token("var")]
    Var,
    #[token("guarded")]
    Guarded,
    #[token("by")]
    By,
    #[token("barrier")]
    Barrier,
    #[token("slot")]
    Slot,
    #[token("effect")]
    Effect,
    #[token("proc")]
    Proc,
    #[token("enter")]
    Enter,
    #[token("exit")]
    Exit,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("return")]
    Return,
    #[token("bind")]
    Bind,

    // Operators
    #[token("=")]
    Assign,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("!")]
    Bang,
    #[token("^")]
    Caret,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    PipePipe,
    #[token("==")]
    Eq,
    #[token("!=")]
    Ne,
    #[token("<")]
    Lt,
    #[token("<=")]
    Le,
    #[token(">")]
    Gt,
    #[token(">=")]
    Ge,
    #[token(":")]
    Colon,

    // Separators
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,

    // Literals
    #[regex(r"[0-9][0-9_]*")]
    Integer,

    // Identifiers
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Identifier,

    // Comments and whitespace
    #[regex(r"//[^\n]*")]
    LineComment,
    #[regex(r"/\*[^*]*\*+([^/*][^*]*\*+)*/", priority = 2)]
    BlockComment,
    #[regex(r"[ \t\n\r]+", priority = 2)]
    Whitespace,

    #[token("\u{FEFF}")]
    Bom,
}

impl Token {
    /// Check if this token is a keyword
    pub fn is_keyword(&self) -> bool {
        matches!(self,
            Token::Lock | Token::LockType | Token::Locks | Token::Level |
            Token::Var | Token::Guarded | Token::By | Token::Barrier |
            Token::Slot | Token::Effect | Token::Proc | Token::Enter |
            Token::Exit | Token::If | Token::Else | Token::While |
            Token::Return | Token::Bind
        )
    }

    fn is_trivia(&self) -> bool {
        matches!(self, Token::Whitespace | Token::Bom | Token::LineComment | Token::BlockComment)
    }
}

/// Lexical token with location information
#[derive(Debug, Clone)]
pub struct LexicalToken {
    pub token: Token,
    pub lexeme: String,
    pub location: Location,
}

impl LexicalToken {
    pub fn new(token: Token, lexeme: String, location: Location) -> Self {
        Self { token, lexeme, location }
    }

    /// Get the token type
    pub fn token_type(&self) -> &Token {
        &self.token
    }

    /// Get the lexeme (actual text)
    pub fn lexeme(&self) -> &str {
        &self.lexeme
    }

    /// Get the location
    pub fn location(&self) -> Location {
        self.location
    }

    /// Location just past the end of this token (single-line tokens only)
    pub fn end_location(&self) -> Location {
        let chars = self.lexeme.chars().count();
        Location::new(
            self.location.line,
            self.location.column + chars,
            self.location.offset + self.lexeme.len(),
        )
    }

    /// Check if this token matches the given token type
    pub fn is(&self, token_type: &Token) -> bool {
        std::mem::discriminant(&self.token) == std::mem::discriminant(token_type)
    }
}

/// Lexer for `.lkl` sources
pub struct Lexer<'a> {
    lexer: logos::Lexer<'a, Token>,
    current_line: usize,
    current_column: usize,
    current_offset: usize,
}

/// A character the lexer could not match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub text: String,
    pub location: Location,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            lexer: Token::lexer(source),
            current_line: 1,
            current_column: 1,
            current_offset: 0,
        }
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Option<Result<LexicalToken, LexError>> {
        let token = self.lexer.next()?;
        let lexeme = self.lexer.slice().to_string();
        let location = Location::new(self.current_line, self.current_column, self.current_offset);
        self.update_position(&lexeme);

        match token {
            Ok(token) => Some(Ok(LexicalToken::new(token, lexeme, location))),
            Err(()) => Some(Err(LexError { text: lexeme, location })),
        }
    }

    /// Update the current position based on the lexeme
    fn update_position(&mut self, lexeme: &str) {
        for ch in lexeme.chars() {
            match ch {
                '\n' => {
                    self.current_line += 1;
                    self.current_column = 1;
                }
                '\r' => {}
                _ => {
                    self.current_column += 1;
                }
            }
            self.current_offset += ch.len_utf8();
        }
    }

    /// Get all significant tokens from the source
    pub fn tokenize(mut self) -> Result<Vec<LexicalToken>, LexError> {
        let mut tokens = Vec::new();

        while let Some(result) = self.next_token() {
            let token = result?;
            if !token.token.is_trivia() {
                tokens.push(token);
            }
        }

        Ok(tokens)
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<LexicalToken, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}
