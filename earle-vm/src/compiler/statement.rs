// earle-vm - Bytecode compiler and virtual machine for the Earle scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Statement compilation.

use earle_parser::TokenKind;

use crate::chunk::Chunk;
use crate::opcode::OpCode;

use super::codegen::FunctionCompiler;
use super::emit::BytecodeEmitter;
use super::types::{AssignmentOperator, LoopContext, Result};

/// Where an assignment stores its value.
///
/// Field and index places have their container (and index) on the stack by
/// the time the value is compiled.
enum Place {
    Variable(String),
    Field(String),
    Index,
}

impl FunctionCompiler<'_, '_> {
    pub(super) fn compile_statement(&mut self) -> Result<()> {
        let Some(kind) = self.tokens.statement_kind() else {
            return Err(self.tokens.expected("statement").into());
        };
        match kind {
            "STATEMENT_BLOCK" => self.compile_block(),
            "STATEMENT_IF" => self.compile_if(),
            "STATEMENT_WHILE" => self.compile_while(),
            "STATEMENT_DO" => self.compile_do_while(),
            "STATEMENT_FOR" => self.compile_for(),
            "STATEMENT_RETURN" => self.compile_return(),
            "STATEMENT_BREAK" => self.compile_break(),
            "STATEMENT_CONTINUE" => self.compile_continue(),
            "STATEMENT_WAIT" => self.compile_wait(),
            "STATEMENT_EMPTY" => {
                self.tokens.expect_symbol(";")?;
                Ok(())
            }
            "STATEMENT_ASSIGNMENT" => {
                self.compile_assignment()?;
                self.tokens.expect_symbol(";")?;
                Ok(())
            }
            "STATEMENT_CALL" => {
                self.compile_function_call()?;
                self.emit(OpCode::Pop);
                self.tokens.expect_symbol(";")?;
                Ok(())
            }
            _ => {
                self.compile_expression()?;
                self.emit(OpCode::Pop);
                self.tokens.expect_symbol(";")?;
                Ok(())
            }
        }
    }

    fn compile_block(&mut self) -> Result<()> {
        self.tokens.expect_symbol("{")?;
        self.emit(OpCode::PushScope);
        self.scope_depth += 1;
        self.compile_statements_until_brace()?;
        self.scope_depth -= 1;
        self.emit(OpCode::PopScope);
        Ok(())
    }

    /// `( expression )`
    fn compile_condition(&mut self) -> Result<()> {
        self.tokens.expect_symbol("(")?;
        self.compile_expression()?;
        self.tokens.expect_symbol(")")?;
        Ok(())
    }

    fn compile_if(&mut self) -> Result<()> {
        self.tokens.expect_keyword("if")?;
        self.compile_condition()?;
        let else_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.compile_statement()?;
        if self.tokens.eat_keyword("else") {
            let end_jump = self.emit_jump(OpCode::Jump);
            self.patch_jump(else_jump);
            self.compile_statement()?;
            self.patch_jump(end_jump);
        } else {
            self.patch_jump(else_jump);
        }
        Ok(())
    }

    fn compile_while(&mut self) -> Result<()> {
        self.tokens.expect_keyword("while")?;
        let start = self.current_offset();
        self.compile_condition()?;
        let exit = self.emit_jump(OpCode::JumpIfFalse);
        let context = self.compile_loop_body()?;
        self.emit_loop(start);
        self.patch_jump(exit);
        self.close_loop(context, start);
        Ok(())
    }

    fn compile_do_while(&mut self) -> Result<()> {
        self.tokens.expect_keyword("do")?;
        let start = self.current_offset();
        let context = self.compile_loop_body()?;
        let condition = self.current_offset();
        self.tokens.expect_keyword("while")?;
        self.compile_condition()?;
        self.tokens.expect_symbol(";")?;
        let repeat = self.emit_jump(OpCode::JumpIfTrue);
        self.patch_jump_to(repeat, start);
        self.close_loop(context, condition);
        Ok(())
    }

    /// `for (init; condition; step) body`, each header part optional.
    ///
    /// The step is parsed before the body but runs after it, so it is
    /// compiled detached and appended.
    fn compile_for(&mut self) -> Result<()> {
        self.tokens.expect_keyword("for")?;
        self.tokens.expect_symbol("(")?;
        if !self.tokens.is_symbol(";") {
            self.compile_simple_statement()?;
        }
        self.tokens.expect_symbol(";")?;

        let condition = self.current_offset();
        let exit = if self.tokens.is_symbol(";") {
            None
        } else {
            self.compile_expression()?;
            Some(self.emit_jump(OpCode::JumpIfFalse))
        };
        self.tokens.expect_symbol(";")?;

        let step = if self.tokens.is_symbol(")") {
            Chunk::new()
        } else {
            self.compile_detached(|compiler| compiler.compile_simple_statement())?
        };
        self.tokens.expect_symbol(")")?;

        let context = self.compile_loop_body()?;
        let continue_target = self.current_offset();
        self.append_chunk(&step);
        self.emit_loop(condition);
        if let Some(exit) = exit {
            self.patch_jump(exit);
        }
        self.close_loop(context, continue_target);
        Ok(())
    }

    fn compile_loop_body(&mut self) -> Result<LoopContext> {
        self.loops.push(LoopContext::new(self.scope_depth));
        let result = self.compile_statement();
        let context = self.loops.pop().unwrap_or_default();
        result.map(|()| context)
    }

    /// Point pending `break`s here and `continue`s at `continue_target`.
    fn close_loop(&mut self, context: LoopContext, continue_target: usize) {
        for at in context.breaks {
            self.patch_jump(at);
        }
        for at in context.continues {
            self.patch_jump_to(at, continue_target);
        }
    }

    fn compile_return(&mut self) -> Result<()> {
        self.tokens.expect_keyword("return")?;
        if self.tokens.eat_symbol(";") {
            self.emit(OpCode::PushNull);
        } else {
            self.compile_expression()?;
            self.tokens.expect_symbol(";")?;
        }
        self.emit_scope_exit(self.scope_depth);
        self.emit(OpCode::Return);
        Ok(())
    }

    fn compile_break(&mut self) -> Result<()> {
        let at = self.compile_loop_exit("break")?;
        if let Some(context) = self.loops.last_mut() {
            context.breaks.push(at);
        }
        Ok(())
    }

    fn compile_continue(&mut self) -> Result<()> {
        let at = self.compile_loop_exit("continue")?;
        if let Some(context) = self.loops.last_mut() {
            context.continues.push(at);
        }
        Ok(())
    }

    /// `break;` or `continue;`: close the scopes opened inside the loop and
    /// jump. Returns the jump operand for patching.
    fn compile_loop_exit(&mut self, keyword: &str) -> Result<usize> {
        let Some(loop_depth) = self.loops.last().map(|context| context.scope_depth) else {
            return Err(self
                .tokens
                .error(format!("'{}' outside of a loop", keyword))
                .into());
        };
        self.tokens.expect_keyword(keyword)?;
        self.tokens.expect_symbol(";")?;
        self.emit_scope_exit(self.scope_depth - loop_depth);
        Ok(self.emit_jump(OpCode::Jump))
    }

    /// `wait <seconds>;` is a call to the `wait` native.
    fn compile_wait(&mut self) -> Result<()> {
        self.tokens.expect_keyword("wait")?;
        self.compile_expression()?;
        self.tokens.expect_symbol(";")?;
        self.emit_string(OpCode::PushReference, "wait");
        self.emit_int(OpCode::Call, 1);
        self.emit(OpCode::Pop);
        Ok(())
    }

    /// Assignment, or an expression whose value is discarded.
    ///
    /// `for` headers use this; a trailing `;` is left to the caller.
    fn compile_simple_statement(&mut self) -> Result<()> {
        if self.tokens.matches("ASSIGNMENT") {
            self.compile_assignment()
        } else {
            self.compile_expression()?;
            self.emit(OpCode::Pop);
            Ok(())
        }
    }

    // ========================================================================
    // Assignment
    // ========================================================================

    /// Compound assignments and `++`/`--` copy the target's operands and
    /// read the current value through them, so the target is evaluated once.
    fn compile_assignment(&mut self) -> Result<()> {
        let place = self.compile_place()?;
        let operator = self.read_assignment_operator()?;
        if let Place::Variable(name) = &place {
            self.emit_string(OpCode::PushReference, name);
        }
        if operator != AssignmentOperator::Assign {
            self.load_current_value(&place);
        }

        match operator {
            AssignmentOperator::Assign => self.compile_expression()?,
            AssignmentOperator::Compound(op) => {
                self.compile_expression()?;
                self.emit(op);
            }
            AssignmentOperator::Increment | AssignmentOperator::Decrement => {
                self.emit_int(OpCode::PushInteger, 1);
                self.emit(if operator == AssignmentOperator::Increment {
                    OpCode::Add
                } else {
                    OpCode::Subtract
                });
            }
        }

        match place {
            Place::Variable(_) => self.emit(OpCode::Write),
            Place::Field(field) => self.emit_string(OpCode::WriteField, &field),
            Place::Index => self.emit(OpCode::WriteIndex),
        }
        Ok(())
    }

    /// Push the target's value, keeping its reference or container (and
    /// index) below it for the write.
    fn load_current_value(&mut self, place: &Place) {
        match place {
            Place::Variable(_) => {
                self.emit(OpCode::Duplicate);
                self.emit(OpCode::Read);
            }
            Place::Field(field) => {
                self.emit(OpCode::Duplicate);
                self.emit_string(OpCode::DereferenceField, field);
            }
            Place::Index => {
                self.emit(OpCode::Duplicate2);
                self.emit(OpCode::DereferenceIndex);
            }
        }
    }

    /// Parse `name(.field | [index])*`, leaving everything but the final
    /// step evaluated on the stack.
    fn compile_place(&mut self) -> Result<Place> {
        let mut place = Place::Variable(self.tokens.expect_identifier()?);
        loop {
            if self.tokens.eat_symbol(".") {
                let field = self.tokens.expect_identifier()?;
                self.load_place(place);
                place = Place::Field(field);
            } else if self.tokens.eat_symbol("[") {
                self.load_place(place);
                self.compile_expression()?;
                self.tokens.expect_symbol("]")?;
                place = Place::Index;
            } else {
                return Ok(place);
            }
        }
    }

    fn load_place(&mut self, place: Place) {
        match place {
            Place::Variable(name) => {
                self.emit_string(OpCode::PushReference, &name);
                self.emit(OpCode::Read);
            }
            Place::Field(field) => self.emit_string(OpCode::DereferenceField, &field),
            Place::Index => self.emit(OpCode::DereferenceIndex),
        }
    }

    fn read_assignment_operator(&mut self) -> Result<AssignmentOperator> {
        if self.tokens.eat_symbols(&["+", "+"]) {
            return Ok(AssignmentOperator::Increment);
        }
        if self.tokens.eat_symbols(&["-", "-"]) {
            return Ok(AssignmentOperator::Decrement);
        }
        if self.tokens.eat_symbol("=") {
            return Ok(AssignmentOperator::Assign);
        }
        let compound = self
            .tokens
            .current()
            .filter(|token| token.kind == TokenKind::Token)
            .and_then(|token| AssignmentOperator::compound(&token.value));
        if let Some(operator) = compound {
            if self.tokens.peek_next().is_some_and(|next| next.is_symbol("=")) {
                self.tokens.advance();
                self.tokens.advance();
                return Ok(operator);
            }
        }
        Err(self.tokens.expected("assignment operator").into())
    }
}

#[cfg(test)]
mod tests {
    use earle_parser::earle_grammar;

    use crate::compiler::Compiler;
    use crate::opcode::OpCode;

    fn opcodes(body: &str) -> Vec<OpCode> {
        let grammar = earle_grammar().unwrap();
        let source = format!("f() {{ {} }}", body);
        let file = Compiler::new(&grammar, "test", &source).compile().unwrap();
        let function = file.function("f", 0).unwrap();
        function
            .chunk
            .instructions()
            .unwrap()
            .into_iter()
            .map(|instruction| instruction.op)
            .collect()
    }

    #[test]
    fn test_field_assignment() {
        use OpCode::*;
        assert_eq!(
            opcodes("a.b = 1;"),
            [PushReference, Read, PushInteger, WriteField, PushNull, Return]
        );
    }

    #[test]
    fn test_compound_index_assignment_evaluates_target_once() {
        use OpCode::*;
        assert_eq!(
            opcodes("a[g()] += 2;"),
            [
                PushReference, Read, PushReference, Call, // container, index
                Duplicate2, DereferenceIndex, // old value
                PushInteger, Add, WriteIndex, PushNull, Return
            ]
        );
    }

    #[test]
    fn test_compound_field_assignment_evaluates_target_once() {
        use OpCode::*;
        assert_eq!(
            opcodes("s.n -= 1;"),
            [
                PushReference, Read, Duplicate, DereferenceField, PushInteger, Subtract,
                WriteField, PushNull, Return
            ]
        );
    }

    #[test]
    fn test_increment() {
        use OpCode::*;
        assert_eq!(
            opcodes("i++;"),
            [PushReference, Duplicate, Read, PushInteger, Add, Write, PushNull, Return]
        );
    }

    #[test]
    fn test_break_closes_block_scopes() {
        use OpCode::*;
        assert_eq!(
            opcodes("while (1) { break; }"),
            [PushInteger, JumpIfFalse, PushScope, PopScope, Jump, PopScope, Jump, PushNull, Return]
        );
    }

    #[test]
    fn test_return_closes_block_scopes() {
        use OpCode::*;
        assert_eq!(
            opcodes("{ { return 1; } }"),
            [
                PushScope, PushScope, PushInteger, PopScope, PopScope, Return, PopScope, PopScope,
                PushNull, Return
            ]
        );
    }

    #[test]
    fn test_if_else() {
        use OpCode::*;
        assert_eq!(
            opcodes("if (x) return 1; else return 2;"),
            [
                PushReference, Read, JumpIfFalse, PushInteger, Return, Jump, PushInteger, Return,
                PushNull, Return
            ]
        );
    }

    #[test]
    fn test_wait_statement() {
        use OpCode::*;
        assert_eq!(
            opcodes("wait 1;"),
            [PushInteger, PushReference, Call, Pop, PushNull, Return]
        );
    }
}
