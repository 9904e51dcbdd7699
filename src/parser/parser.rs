//! Parser implementation for the lock-annotation language
//!
//! Recursive descent over the token stream produced by [`Lexer`]. The parser
//! stops at the first syntax error; the analyzer only ever sees complete
//! programs.

use super::{error::{ParseError, ParseResult}, lexer::{Lexer, LexicalToken, Token}};
use crate::ast::*;
use crate::error::Result;

/// Deepest nesting of sub-expressions, operator chains and blocks the parser
/// accepts. Every later pass recurses over the tree, so this bounds them too.
pub const MAX_NESTING: usize = 40;

/// Parser for `.lkl` sources
pub struct Parser {
    tokens: Vec<LexicalToken>,
    current: usize,
    eof: Location,
    depth: usize,
}

impl Parser {
    /// Create a new parser from source code
    pub fn new(source: &str) -> Result<Self> {
        let tokens = Lexer::new(source).tokenize().map_err(ParseError::from)?;
        let eof = tokens.last().map(|t| t.end_location()).unwrap_or_else(Location::start);

        Ok(Self {
            tokens,
            current: 0,
            eof,
            depth: 0,
        })
    }

    /// Parse the source code into a program
    pub fn parse(mut self) -> ParseResult<Program> {
        let start = self.current_location();
        let mut items = Vec::new();
        while !self.is_at_end() {
            items.push(self.parse_item()?);
        }
        let span = Span::new(start, self.previous_end());
        log::debug!("parsed {} item(s)", items.len());
        Ok(Program { items, span })
    }

    // Helper methods
    fn is_at_end(&self) -> bool {
        self.current >= self.tokens.len()
    }

    fn check(&self, token_type: &Token) -> bool {
        self.peek().map_or(false, |t| t.is(token_type))
    }

    fn peek(&self) -> Option<&LexicalToken> {
        self.tokens.get(self.current)
    }

    fn advance(&mut self) -> Option<&LexicalToken> {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.current.checked_sub(1).and_then(|i| self.tokens.get(i))
    }

    fn match_token(&mut self, token_type: &Token) -> bool {
        if self.check(token_type) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn current_location(&self) -> Location {
        self.peek().map(|t| t.location).unwrap_or(self.eof)
    }

    fn previous_end(&self) -> Location {
        if self.current == 0 {
            return Location::start();
        }
        self.tokens
            .get(self.current - 1)
            .map(|t| t.end_location())
            .unwrap_or(self.eof)
    }

    fn span_from(&self, start: Location) -> Span {
        Span::new(start, self.previous_end())
    }

    fn error_here(&self, expected: &str) -> ParseError {
        match self.peek() {
            Some(token) => ParseError::unexpected_token(expected, token.lexeme(), token.location),
            None => ParseError::unexpected_end_of_input(expected, self.eof),
        }
    }

    fn consume(&mut self, token_type: &Token, expected: &str) -> ParseResult<()> {
        if self.match_token(token_type) {
            Ok(())
        } else {
            Err(self.error_here(expected))
        }
    }

    fn consume_identifier(&mut self, expected: &str) -> ParseResult<String> {
        if self.check(&Token::Identifier) {
            let lexeme = self.advance().map(|t| t.lexeme.clone()).unwrap_or_default();
            Ok(lexeme)
        } else {
            Err(self.error_here(expected))
        }
    }

    /// Open one nesting level; undone with [`Parser::leave`]. An error ends
    /// the parse, so the counter is not restored on that path.
    fn nest(&mut self) -> ParseResult<()> {
        if self.depth >= MAX_NESTING {
            return Err(ParseError::NestedTooDeeply {
                limit: MAX_NESTING,
                location: self.current_location(),
            });
        }
        self.depth += 1;
        Ok(())
    }

    fn leave(&mut self, levels: usize) {
        self.depth = self.depth.saturating_sub(levels);
    }

    fn parse_signed_integer(&mut self, expected: &str) -> ParseResult<i64> {
        let location = self.current_location();
        let negative = self.match_token(&Token::Minus);
        if !self.check(&Token::Integer) {
            return Err(self.error_here(expected));
        }
        let lexeme = self.advance().map(|t| t.lexeme.replace('_', "")).unwrap_or_default();
        let value: i64 = lexeme
            .parse()
            .map_err(|_| ParseError::IntegerOutOfRange { literal: lexeme.clone(), location })?;
        Ok(if negative { -value } else { value })
    }

    // Items
    fn parse_item(&mut self) -> ParseResult<Item> {
        let Some(kind) = self.peek().map(|t| t.token.clone()) else {
            return Err(self.error_here("item"));
        };
        match kind {
            Token::LockType => self.parse_lock_type().map(Item::LockType),
            Token::Lock => self.parse_lock_decl().map(Item::Lock),
            Token::Var => self.parse_var_decl().map(Item::Var),
            Token::Slot => self.parse_slot_decl().map(Item::Slot),
            Token::Proc => self.parse_routine().map(Item::Routine),
            _ => self.parse_stmt().map(Item::Stmt),
        }
    }

    fn parse_lock_type(&mut self) -> ParseResult<LockTypeDecl> {
        let start = self.current_location();
        self.consume(&Token::LockType, "'locktype'")?;
        let name = self.consume_identifier("lock type name")?;
        self.consume(&Token::Level, "'level'")?;
        let level = self.parse_signed_integer("lock level")?;
        self.consume(&Token::Semicolon, "';'")?;
        Ok(LockTypeDecl { name, level, span: self.span_from(start) })
    }

    fn parse_lock_decl(&mut self) -> ParseResult<LockDecl> {
        let start = self.current_location();
        self.consume(&Token::Lock, "'lock'")?;
        let target = self.parse_postfix()?;
        let lock_type = if self.match_token(&Token::Colon) {
            Some(self.consume_identifier("lock type name")?)
        } else {
            None
        };
        let level = if self.match_token(&Token::Level) {
            Some(self.parse_signed_integer("lock level")?)
        } else {
            None
        };
        self.consume(&Token::Semicolon, "';'")?;
        Ok(LockDecl { target, lock_type, level, span: self.span_from(start) })
    }

    fn parse_var_decl(&mut self) -> ParseResult<VarDecl> {
        let start = self.current_location();
        self.consume(&Token::Var, "'var'")?;
        let target = self.parse_postfix()?;
        let guard = if self.match_token(&Token::Guarded) {
            self.consume(&Token::By, "'by'")?;
            if self.match_token(&Token::Barrier) {
                Some(GuardSpec::Barrier)
            } else {
                Some(GuardSpec::Lock(self.parse_postfix()?))
            }
        } else {
            None
        };
        self.consume(&Token::Semicolon, "';'")?;
        Ok(VarDecl { target, guard, span: self.span_from(start) })
    }

    fn parse_slot_decl(&mut self) -> ParseResult<SlotDecl> {
        let start = self.current_location();
        self.consume(&Token::Slot, "'slot'")?;
        let name = self.consume_identifier("slot name")?;
        self.consume(&Token::Effect, "'effect'")?;
        let effect = self.parse_signed_integer("effect level")?;
        self.consume(&Token::Semicolon, "';'")?;
        Ok(SlotDecl { name, effect, span: self.span_from(start) })
    }

    fn parse_routine(&mut self) -> ParseResult<RoutineDecl> {
        let start = self.current_location();
        self.consume(&Token::Proc, "'proc'")?;
        let name = self.consume_identifier("routine name")?;
        self.consume(&Token::LParen, "'('")?;
        let mut params = Vec::new();
        if !self.check(&Token::RParen) {
            loop {
                params.push(self.consume_identifier("parameter name")?);
                if !self.match_token(&Token::Comma) {
                    break;
                }
            }
        }
        self.consume(&Token::RParen, "')'")?;
        let effect = if self.match_token(&Token::Effect) {
            Some(self.parse_signed_integer("effect level")?)
        } else {
            None
        };
        let body = self.parse_block()?;
        Ok(RoutineDecl { name, params, effect, body, span: self.span_from(start) })
    }

    // Statements
    fn parse_block(&mut self) -> ParseResult<Vec<Stmt>> {
        self.consume(&Token::LBrace, "'{'")?;
        self.nest()?;
        let mut stmts = Vec::new();
        while !self.check(&Token::RBrace) && !self.is_at_end() {
            stmts.push(self.parse_stmt()?);
        }
        self.consume(&Token::RBrace, "'}'")?;
        self.leave(1);
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> ParseResult<Stmt> {
        let start = self.current_location();
        let Some(kind) = self.peek().map(|t| t.token.clone()) else {
            return Err(self.error_here("statement"));
        };
        match kind {
            Token::Locks => {
                self.advance();
                self.consume(&Token::LParen, "'('")?;
                let locks = self.parse_lock_list(&Token::RParen)?;
                self.consume(&Token::RParen, "')'")?;
                let body = self.parse_block()?;
                Ok(Stmt::Locks(LocksStmt { locks, body, span: self.span_from(start) }))
            }
            Token::Enter => {
                self.advance();
                let locks = self.parse_lock_list(&Token::Semicolon)?;
                self.consume(&Token::Semicolon, "';'")?;
                Ok(Stmt::Enter(EnterStmt { locks, span: self.span_from(start) }))
            }
            Token::Exit => {
                self.advance();
                self.consume(&Token::Semicolon, "';'")?;
                Ok(Stmt::Exit(ExitStmt { span: self.span_from(start) }))
            }
            Token::If => {
                self.advance();
                let condition = self.parse_expr()?;
                let then_branch = self.parse_block()?;
                let else_branch = if self.match_token(&Token::Else) {
                    if self.check(&Token::If) {
                        self.nest()?;
                        let chained = self.parse_stmt()?;
                        self.leave(1);
                        Some(vec![chained])
                    } else {
                        Some(self.parse_block()?)
                    }
                } else {
                    None
                };
                Ok(Stmt::If(IfStmt { condition, then_branch, else_branch, span: self.span_from(start) }))
            }
            Token::While => {
                self.advance();
                let condition = self.parse_expr()?;
                let body = self.parse_block()?;
                Ok(Stmt::While(WhileStmt { condition, body, span: self.span_from(start) }))
            }
            Token::Return => {
                self.advance();
                let value = if self.check(&Token::Semicolon) { None } else { Some(self.parse_expr()?) };
                self.consume(&Token::Semicolon, "';'")?;
                Ok(Stmt::Return(ReturnStmt { value, span: self.span_from(start) }))
            }
            Token::Bind => {
                self.advance();
                let slot = self.consume_identifier("slot name")?;
                self.consume(&Token::Assign, "'='")?;
                let routine = self.consume_identifier("routine name")?;
                self.consume(&Token::Semicolon, "';'")?;
                Ok(Stmt::Bind(BindStmt { slot, routine, span: self.span_from(start) }))
            }
            _ => {
                let expr = self.parse_expr()?;
                let stmt = if self.match_token(&Token::Assign) {
                    let value = self.parse_expr()?;
                    self.consume(&Token::Semicolon, "';'")?;
                    Stmt::Assign(AssignStmt { target: expr, value, span: self.span_from(start) })
                } else {
                    self.consume(&Token::Semicolon, "';'")?;
                    Stmt::Expr(ExprStmt { expr, span: self.span_from(start) })
                };
                Ok(stmt)
            }
        }
    }

    fn parse_lock_list(&mut self, terminator: &Token) -> ParseResult<Vec<Expr>> {
        if self.check(terminator) {
            return Err(ParseError::EmptyLockList { location: self.current_location() });
        }
        let mut locks = vec![self.parse_expr()?];
        while self.match_token(&Token::Comma) {
            locks.push(self.parse_expr()?);
        }
        Ok(locks)
    }

    // Expressions
    fn parse_expr(&mut self) -> ParseResult<Expr> {
        self.nest()?;
        let expr = self.parse_binary_level(0)?;
        self.leave(1);
        Ok(expr)
    }

    fn binary_op_at(&self, level: usize) -> Option<BinaryOp> {
        let token = &self.peek()?.token;
        let op = match (level, token) {
            (0, Token::PipePipe) => BinaryOp::Or,
            (1, Token::AndAnd) => BinaryOp::And,
            (2, Token::Eq) => BinaryOp::Eq,
            (2, Token::Ne) => BinaryOp::Ne,
            (3, Token::Lt) => BinaryOp::Lt,
            (3, Token::Le) => BinaryOp::Le,
            (3, Token::Gt) => BinaryOp::Gt,
            (3, Token::Ge) => BinaryOp::Ge,
            (4, Token::Plus) => BinaryOp::Add,
            (4, Token::Minus) => BinaryOp::Sub,
            (5, Token::Star) => BinaryOp::Mul,
            (5, Token::Slash) => BinaryOp::Div,
            (5, Token::Percent) => BinaryOp::Rem,
            _ => return None,
        };
        Some(op)
    }

    /// Precedence climbing: level 0 is `||`, level 5 is multiplicative.
    fn parse_binary_level(&mut self, level: usize) -> ParseResult<Expr> {
        if level > 5 {
            return self.parse_unary();
        }
        let start = self.current_location();
        let mut left = self.parse_binary_level(level + 1)?;
        // operators associate left, so each one deepens the tree
        let mut chained = 0;
        while let Some(op) = self.binary_op_at(level) {
            self.nest()?;
            chained += 1;
            self.advance();
            let right = self.parse_binary_level(level + 1)?;
            left = Expr::Binary(BinaryExpr {
                left: Box::new(left),
                op,
                right: Box::new(right),
                span: self.span_from(start),
            });
        }
        self.leave(chained);
        Ok(left)
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        let start = self.current_location();
        let op = if self.match_token(&Token::Bang) {
            UnaryOp::Not
        } else if self.match_token(&Token::Minus) {
            UnaryOp::Neg
        } else {
            return self.parse_postfix();
        };
        self.nest()?;
        let operand = self.parse_unary()?;
        self.leave(1);
        Ok(Expr::Unary(UnaryExpr { op, operand: Box::new(operand), span: self.span_from(start) }))
    }

    fn parse_postfix(&mut self) -> ParseResult<Expr> {
        let start = self.current_location();
        let mut expr = self.parse_primary()?;
        let depth = self.depth;
        loop {
            if matches!(self.peek().map(|t| &t.token), Some(Token::Dot | Token::LBracket | Token::Caret)) {
                self.nest()?;
            }
            if self.match_token(&Token::Dot) {
                let name = self.consume_identifier("field name")?;
                expr = Expr::Field(FieldExpr { target: Box::new(expr), name, span: self.span_from(start) });
            } else if self.match_token(&Token::LBracket) {
                let index = self.parse_expr()?;
                self.consume(&Token::RBracket, "']'")?;
                expr = Expr::Index(IndexExpr {
                    target: Box::new(expr),
                    index: Box::new(index),
                    span: self.span_from(start),
                });
            } else if self.match_token(&Token::Caret) {
                expr = Expr::Deref(DerefExpr { target: Box::new(expr), span: self.span_from(start) });
            } else if self.check(&Token::LParen) {
                return Err(ParseError::CallThroughPath { location: self.current_location() });
            } else {
                break;
            }
        }
        self.depth = depth;
        Ok(expr)
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let start = self.current_location();
        let Some(token) = self.peek().cloned() else {
            return Err(self.error_here("expression"));
        };
        match token.token {
            Token::Identifier => {
                let name = self.consume_identifier("identifier")?;
                if self.check(&Token::LParen) {
                    self.advance();
                    let mut args = Vec::new();
                    if !self.check(&Token::RParen) {
                        args.push(self.parse_expr()?);
                        while self.match_token(&Token::Comma) {
                            args.push(self.parse_expr()?);
                        }
                    }
                    self.consume(&Token::RParen, "')'")?;
                    return Ok(Expr::Call(CallExpr { callee: name, args, span: self.span_from(start) }));
                }
                Ok(Expr::Ident(IdentExpr { name, span: self.span_from(start) }))
            }
            Token::Integer => {
                let value = self.parse_signed_integer("integer")?;
                Ok(Expr::Literal(LiteralExpr { value, span: self.span_from(start) }))
            }
            Token::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.consume(&Token::RParen, "')'")?;
                Ok(expr)
            }
            _ if token.token.is_keyword() => Err(ParseError::unexpected_token(
                "expression",
                &format!("keyword `{}`", token.lexeme()),
                token.location,
            )),
            _ => Err(self.error_here("expression")),
        }
    }
}

/// Parse a complete source text
pub fn parse(source: &str) -> Result<Program> {
    let parser = Parser::new(source)?;
    Ok(parser.parse()?)
}
