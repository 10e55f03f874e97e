// earle-vm - Bytecode compiler and virtual machine for the Earle scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Expression compilation by precedence climbing.
//!
//! The lexer only produces single-character symbols, so operators such as
//! `<=` and `&&` are assembled here. Tokens read ahead and not used are
//! pushed back onto the stream.

use earle_parser::{ParseError, Token, TokenKind};

use crate::chunk::Chunk;
use crate::host::normalize_path;
use crate::opcode::OpCode;

use super::codegen::{FunctionCompiler, parse_path};
use super::emit::BytecodeEmitter;
use super::types::{BinaryOperator, Result};

/// How a call names its function.
enum Callee {
    /// `f`, `::f` or `path\file::f`.
    Named(String),
    /// `[[ expression ]]`, compiled ahead of time.
    Dynamic(Chunk),
}

impl FunctionCompiler<'_, '_> {
    pub(super) fn compile_expression(&mut self) -> Result<()> {
        self.compile_binary(1)
    }

    fn compile_binary(&mut self, min_precedence: u8) -> Result<()> {
        self.compile_unary()?;
        while let Some((operator, consumed)) = self.read_binary_operator() {
            if operator.precedence() < min_precedence {
                self.unread(consumed);
                break;
            }
            let next = operator.precedence() + 1;
            match operator.opcode() {
                Some(op) => {
                    self.compile_binary(next)?;
                    self.emit(op);
                }
                None => {
                    // a && b: if a is false it is the result; otherwise b is.
                    let test = if operator == BinaryOperator::And {
                        OpCode::JumpIfFalse
                    } else {
                        OpCode::JumpIfTrue
                    };
                    self.emit(OpCode::Duplicate);
                    let skip = self.emit_jump(test);
                    self.emit(OpCode::Pop);
                    self.compile_binary(next)?;
                    self.patch_jump(skip);
                }
            }
        }
        Ok(())
    }

    /// Consume a binary operator if one is next.
    ///
    /// A single-character operator followed by `=` is an assignment operator
    /// and is left alone.
    fn read_binary_operator(&mut self) -> Option<(BinaryOperator, Vec<Token>)> {
        if !self.tokens.is_kind(TokenKind::Token) {
            return None;
        }
        let first = self.tokens.advance()?;
        if let Some(second) = self.tokens.current().filter(|t| t.kind == TokenKind::Token) {
            if let Some(operator) = BinaryOperator::from_pair(&first.value, &second.value) {
                self.tokens.advance();
                return Some((operator, vec![first, second]));
            }
            if second.value == "=" {
                self.tokens.push_back(first);
                return None;
            }
        }
        match BinaryOperator::from_symbol(&first.value) {
            Some(operator) => Some((operator, vec![first])),
            None => {
                self.tokens.push_back(first);
                None
            }
        }
    }

    fn unread(&mut self, consumed: Vec<Token>) {
        for token in consumed.into_iter().rev() {
            self.tokens.push_back(token);
        }
    }

    fn compile_unary(&mut self) -> Result<()> {
        if self.tokens.eat_symbol("!") {
            self.compile_unary()?;
            self.emit(OpCode::Not);
        } else if self.tokens.eat_symbol("~") {
            self.compile_unary()?;
            self.emit(OpCode::BitwiseNot);
        } else if self.tokens.eat_symbol("-") {
            if self.tokens.is_kind(TokenKind::NumberLiteral) {
                self.compile_number(true)?;
                self.compile_accessors()?;
            } else {
                self.compile_unary()?;
                self.emit(OpCode::Negate);
            }
        } else {
            self.compile_operand()?;
        }
        Ok(())
    }

    fn compile_operand(&mut self) -> Result<()> {
        let Some(token) = self.tokens.current() else {
            return Err(self.tokens.expected("expression").into());
        };
        match token.kind {
            TokenKind::NumberLiteral => self.compile_number(false)?,
            TokenKind::StringLiteral => {
                self.tokens.advance();
                self.emit_string(OpCode::PushString, string_contents(&token)?);
            }
            TokenKind::Identifier => self.compile_identifier_operand()?,
            TokenKind::Token => match token.value.as_str() {
                "&" => {
                    self.tokens.advance();
                    let key = self.tokens.expect_kind(TokenKind::StringLiteral, "string literal")?;
                    self.emit_string(OpCode::PushString, string_contents(&key)?);
                    self.emit_string(OpCode::PushReference, "localize");
                    self.emit_int(OpCode::Call, 1);
                }
                "(" => self.compile_parenthesised()?,
                "[" if self.tokens.matches("FUNCTION_CALL") => self.compile_function_call()?,
                "[" => {
                    self.tokens.advance();
                    self.tokens.expect_symbol("]")?;
                    self.emit(OpCode::PushArray);
                }
                ":" if self.tokens.matches("FUNCTION_CALL") => self.compile_function_call()?,
                ":" => {
                    let name = self.parse_function_reference()?;
                    self.emit_string(OpCode::PushFunction, &name);
                }
                _ => return Err(self.tokens.expected("expression").into()),
            },
        }
        self.compile_accessors()
    }

    fn compile_identifier_operand(&mut self) -> Result<()> {
        if self.tokens.matches("FUNCTION_CALL") {
            return self.compile_function_call();
        }
        if self.tokens.matches("FUNCTION_REFERENCE") {
            let name = self.parse_function_reference()?;
            self.emit_string(OpCode::PushFunction, &name);
            return Ok(());
        }
        let name = self.tokens.expect_identifier()?;
        match name.as_str() {
            "true" => self.emit_int(OpCode::PushInteger, 1),
            "false" => self.emit_int(OpCode::PushInteger, 0),
            "undefined" => self.emit(OpCode::PushNull),
            _ => {
                self.emit_string(OpCode::PushReference, &name);
                self.emit(OpCode::Read);
            }
        }
        Ok(())
    }

    fn compile_number(&mut self, negative: bool) -> Result<()> {
        let token = self
            .tokens
            .expect_kind(TokenKind::NumberLiteral, "number literal")?;
        let text = if negative {
            format!("-{}", token.value)
        } else {
            token.value.clone()
        };
        if text.contains('.') {
            let value: f32 = text.parse().map_err(|_| {
                ParseError::new(format!("invalid number '{}'", text), token.position.clone())
            })?;
            self.emit_float(OpCode::PushFloat, value);
        } else {
            let value = text
                .parse::<i64>()
                .ok()
                .and_then(|value| i32::try_from(value).ok())
                .ok_or_else(|| {
                    ParseError::new(
                        format!("integer literal '{}' is out of range", text),
                        token.position.clone(),
                    )
                })?;
            self.emit_int(OpCode::PushInteger, value);
        }
        Ok(())
    }

    /// `(x, y, z)`, `(x, y)` or `(expression)`. The first component is
    /// compiled before the shape is known.
    fn compile_parenthesised(&mut self) -> Result<()> {
        self.tokens.expect_symbol("(")?;
        self.compile_expression()?;
        let mut components = 1;
        while components < 3 && self.tokens.eat_symbol(",") {
            self.compile_expression()?;
            components += 1;
        }
        self.tokens.expect_symbol(")")?;
        match components {
            2 => self.emit(OpCode::PushVector2),
            3 => self.emit(OpCode::PushVector3),
            _ => {}
        }
        Ok(())
    }

    /// Trailing `.field` and `[index]` steps.
    fn compile_accessors(&mut self) -> Result<()> {
        loop {
            if self.tokens.eat_symbol(".") {
                let field = self.tokens.expect_identifier()?;
                self.emit_string(OpCode::DereferenceField, &field);
            } else if self.tokens.is_symbol("[") && !self.at_dynamic_callee() {
                self.tokens.advance();
                self.compile_expression()?;
                self.tokens.expect_symbol("]")?;
                self.emit(OpCode::DereferenceIndex);
            } else {
                return Ok(());
            }
        }
    }

    fn at_dynamic_callee(&self) -> bool {
        self.tokens.is_symbol("[") && self.tokens.peek_next().is_some_and(|t| t.is_symbol("["))
    }

    /// A variable read as a value: `name(.field | [index])*`.
    pub(super) fn compile_variable(&mut self) -> Result<()> {
        let name = self.tokens.expect_identifier()?;
        self.emit_string(OpCode::PushReference, &name);
        self.emit(OpCode::Read);
        self.compile_accessors()
    }

    // ========================================================================
    // Calls
    // ========================================================================

    /// `[thread] name(args)`, optionally preceded by a target variable.
    pub(super) fn compile_function_call(&mut self) -> Result<()> {
        let on_target = !self.tokens.matches("PLAIN_CALL");
        if on_target {
            self.compile_variable()?;
        }
        self.compile_plain_call(on_target)
    }

    fn compile_plain_call(&mut self, on_target: bool) -> Result<()> {
        let threaded = self.tokens.eat_keyword("thread");
        let callee = self.parse_callee()?;

        self.tokens.expect_symbol("(")?;
        let mut argc = 0;
        if !self.tokens.is_symbol(")") {
            loop {
                self.compile_expression()?;
                argc += 1;
                if !self.tokens.eat_symbol(",") {
                    break;
                }
            }
        }
        self.tokens.expect_symbol(")")?;

        match callee {
            Callee::Named(name) => self.emit_string(OpCode::PushReference, &name),
            Callee::Dynamic(chunk) => self.append_chunk(&chunk),
        }
        let op = match (threaded, on_target) {
            (false, false) => OpCode::Call,
            (false, true) => OpCode::CallOnTarget,
            (true, false) => OpCode::Thread,
            (true, true) => OpCode::ThreadOnTarget,
        };
        self.emit_int(op, argc);
        Ok(())
    }

    fn parse_callee(&mut self) -> Result<Callee> {
        if self.tokens.eat_symbols(&["[", "["]) {
            let chunk = self.compile_detached(|compiler| compiler.compile_expression())?;
            self.tokens.expect_symbol("]")?;
            self.tokens.expect_symbol("]")?;
            return Ok(Callee::Dynamic(chunk));
        }
        if self.tokens.matches("FUNCTION_REFERENCE") {
            return self.parse_function_reference().map(Callee::Named);
        }
        self.tokens.expect_identifier().map(Callee::Named).map_err(Into::into)
    }

    /// `::name` (this file) or `path::name`, as `file::name`.
    fn parse_function_reference(&mut self) -> Result<String> {
        let file = if self.tokens.is_symbol(":") {
            self.file.to_string()
        } else {
            normalize_path(&parse_path(self.tokens)?)
        };
        if !self.tokens.eat_symbols(&[":", ":"]) {
            return Err(self.tokens.expected("'::'").into());
        }
        let name = self.tokens.expect_identifier()?;
        Ok(format!("{}::{}", file, name))
    }
}

/// String operands are NUL-terminated, so literals may not contain NUL.
fn string_contents(token: &Token) -> Result<&str> {
    if token.value.contains('\0') {
        return Err(ParseError::new("string literal cannot contain NUL", token.position.clone()).into());
    }
    Ok(&token.value)
}
