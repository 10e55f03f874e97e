// earle-vm - Bytecode compiler and virtual machine for the Earle scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Code generation: compiles a source file straight to bytecode.
//!
//! There is no syntax tree. Each construct is recognised with a grammar
//! lookahead at the cursor and then consumed token by token while its
//! instructions are emitted.

use std::rc::Rc;

use earle_parser::{GrammarRuleTable, Lexer};
use tracing::{debug, info};

use crate::chunk::{Chunk, EarleFunction};
use crate::host::normalize_path;
use crate::opcode::OpCode;
use crate::program::EarleFile;

use super::emit::BytecodeEmitter;
use super::tokens::TokenStream;
use super::types::{CompileError, LoopContext, Result};

/// Compiler for one source file.
pub struct Compiler<'g> {
    tokens: TokenStream<'g>,
    file: Rc<str>,
}

impl<'g> Compiler<'g> {
    /// `file` is the logical path the functions are declared under.
    pub fn new(grammar: &'g GrammarRuleTable, file: &str, source: &str) -> Self {
        let file = normalize_path(file);
        let lexer = Lexer::with_file(&file, source);
        Compiler {
            tokens: TokenStream::new(grammar, lexer),
            file: Rc::from(file),
        }
    }

    /// Compile every `#include` and function declaration in the file.
    pub fn compile(mut self) -> Result<EarleFile> {
        let mut output = EarleFile::new(&self.file);
        while !self.tokens.is_at_end() {
            if self.tokens.matches("INCLUDE") {
                let path = self.compile_include()?;
                output.includes.push(path);
            } else if self.tokens.matches("FUNCTION_DECLARATION") {
                let function = self.compile_function()?;
                output.add_function(function)?;
            } else {
                return Err(self.tokens.expected("function declaration or #include").into());
            }
        }
        info!(
            file = %self.file,
            functions = output.function_count(),
            includes = output.includes.len(),
            "compiled file"
        );
        Ok(output)
    }

    fn compile_include(&mut self) -> Result<String> {
        self.tokens.expect_symbol("#")?;
        self.tokens.expect_keyword("include")?;
        let path = parse_path(&mut self.tokens)?;
        self.tokens.expect_symbol(";")?;
        Ok(normalize_path(&path))
    }

    fn compile_function(&mut self) -> Result<EarleFunction> {
        let name = self.tokens.expect_identifier()?;
        self.tokens.expect_symbol("(")?;
        let mut parameters = Vec::new();
        if !self.tokens.is_symbol(")") {
            loop {
                parameters.push(self.tokens.expect_identifier()?);
                if !self.tokens.eat_symbol(",") {
                    break;
                }
            }
        }
        self.tokens.expect_symbol(")")?;
        self.tokens.expect_symbol("{")?;

        let chunk = FunctionCompiler::new(&mut self.tokens, Rc::clone(&self.file)).compile_body()?;
        chunk
            .verify()
            .map_err(|message| CompileError::InvalidBytecode {
                function: format!("{}::{}", self.file, name),
                message,
            })?;
        debug!(
            file = %self.file,
            function = %name,
            arity = parameters.len(),
            bytes = chunk.len(),
            "compiled function"
        );
        Ok(EarleFunction {
            name,
            file: Rc::clone(&self.file),
            parameters,
            chunk: Rc::new(chunk),
        })
    }
}

/// `a\b\c`, lowercased.
pub(super) fn parse_path(tokens: &mut TokenStream<'_>) -> Result<String> {
    let mut path = tokens.expect_identifier()?;
    while tokens.is_symbol("\\") {
        tokens.advance();
        path.push('\\');
        path.push_str(&tokens.expect_identifier()?);
    }
    Ok(path)
}

// ============================================================================
// Function bodies
// ============================================================================

/// Compiles the statements of one function body into a chunk.
pub(crate) struct FunctionCompiler<'t, 'g> {
    pub(super) tokens: &'t mut TokenStream<'g>,
    /// File the function belongs to, for qualifying `::name` references.
    pub(super) file: Rc<str>,
    pub(super) chunk: Chunk,
    /// Block scopes opened inside the body.
    pub(super) scope_depth: usize,
    pub(super) loops: Vec<LoopContext>,
}

impl<'t, 'g> FunctionCompiler<'t, 'g> {
    pub fn new(tokens: &'t mut TokenStream<'g>, file: Rc<str>) -> Self {
        FunctionCompiler {
            tokens,
            file,
            chunk: Chunk::new(),
            scope_depth: 0,
            loops: Vec::new(),
        }
    }

    /// Compile statements up to and including the closing `}`.
    ///
    /// Falling off the end returns undefined.
    pub fn compile_body(mut self) -> Result<Chunk> {
        self.compile_statements_until_brace()?;
        self.emit(OpCode::PushNull);
        self.emit(OpCode::Return);
        debug_assert_eq!(self.tokens.session_depth(), 0);
        Ok(self.chunk)
    }

    pub(super) fn compile_statements_until_brace(&mut self) -> Result<()> {
        while !self.tokens.is_symbol("}") {
            if self.tokens.is_at_end() {
                return Err(self.tokens.expected("'}'").into());
            }
            self.compile_statement()?;
        }
        self.tokens.advance();
        Ok(())
    }

    /// Compile into a fresh chunk, leaving the function's chunk untouched.
    ///
    /// Used for code that is parsed before the point where it must run.
    pub(super) fn compile_detached(
        &mut self,
        compile: impl FnOnce(&mut Self) -> Result<()>,
    ) -> Result<Chunk> {
        let saved = std::mem::take(&mut self.chunk);
        let result = compile(self);
        let detached = std::mem::replace(&mut self.chunk, saved);
        result.map(|()| detached)
    }

    pub(super) fn append_chunk(&mut self, chunk: &Chunk) {
        self.chunk.append(chunk);
    }
}

impl BytecodeEmitter for FunctionCompiler<'_, '_> {
    fn emit(&mut self, op: OpCode) {
        let line = self.tokens.line_info();
        self.chunk.emit_op(op, line);
    }

    fn emit_int(&mut self, op: OpCode, value: i32) {
        self.emit(op);
        self.chunk.emit_i32(value);
    }

    fn emit_float(&mut self, op: OpCode, value: f32) {
        self.emit(op);
        self.chunk.emit_f32(value);
    }

    fn emit_string(&mut self, op: OpCode, value: &str) {
        self.emit(op);
        self.chunk.emit_str(value);
    }

    fn current_offset(&self) -> usize {
        self.chunk.current_offset()
    }

    fn patch_operand(&mut self, at: usize, value: i32) {
        self.chunk.patch_i32(at, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use earle_parser::earle_grammar;

    fn compile(source: &str) -> Result<EarleFile> {
        let grammar = earle_grammar().unwrap();
        Compiler::new(&grammar, "test", source).compile()
    }

    fn disassemble(source: &str) -> String {
        let file = compile(source).unwrap();
        let function = file.functions().into_iter().next().unwrap();
        function.chunk.disassemble()
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            disassemble("f() { return 1 + 2 * 3; }"),
            "0000 PUSH_INT 1\n\
             0005 PUSH_INT 2\n\
             0010 PUSH_INT 3\n\
             0015 MUL\n\
             0016 ADD\n\
             0017 RET\n\
             0018 PUSH_NULL\n\
             0019 RET\n"
        );
    }

    #[test]
    fn test_while_loop_layout() {
        assert_eq!(
            disassemble("f() { while (i < 3) i = i + 1; }"),
            "0000 PUSH_REF \"i\"\n\
             0003 READ\n\
             0004 PUSH_INT 3\n\
             0009 LT\n\
             0010 JUMP_IF_FALSE 19\n\
             0015 PUSH_REF \"i\"\n\
             0018 PUSH_REF \"i\"\n\
             0021 READ\n\
             0022 PUSH_INT 1\n\
             0027 ADD\n\
             0028 WRITE\n\
             0029 JUMP -34\n\
             0034 PUSH_NULL\n\
             0035 RET\n"
        );
    }

    #[test]
    fn test_call_pushes_arguments_then_callee() {
        assert_eq!(
            disassemble("f() { g(1, \"a\"); }"),
            "0000 PUSH_INT 1\n\
             0005 PUSH_STR \"a\"\n\
             0008 PUSH_REF \"g\"\n\
             0011 CALL 2\n\
             0016 POP\n\
             0017 PUSH_NULL\n\
             0018 RET\n"
        );
    }

    #[test]
    fn test_target_and_thread_calls() {
        let text = disassemble("f() { self thread g(); level h(2); }");
        let ops: Vec<&str> = text
            .lines()
            .map(|line| line.split_whitespace().nth(1).unwrap())
            .collect();
        assert_eq!(
            ops,
            [
                "PUSH_REF", "READ", "PUSH_REF", "THREAD_T", "POP", "PUSH_REF", "READ", "PUSH_INT",
                "PUSH_REF", "CALL_T", "POP", "PUSH_NULL", "RET"
            ]
        );
    }

    #[test]
    fn test_function_references_are_qualified() {
        let text = disassemble("f() { a = ::g; b = maps\\util::h; }");
        assert!(text.contains("PUSH_FUNC \"test::g\""));
        assert!(text.contains("PUSH_FUNC \"maps\\\\util::h\""));
    }

    #[test]
    fn test_negative_literal_is_folded() {
        assert_eq!(
            disassemble("f() { return -2147483648; }"),
            "0000 PUSH_INT -2147483648\n0005 RET\n0006 PUSH_NULL\n0007 RET\n"
        );
    }

    #[test]
    fn test_integer_literal_out_of_range() {
        let err = compile("f() { return 2147483648; }").unwrap_err();
        assert!(matches!(err, CompileError::Parse(_)));
    }

    #[test]
    fn test_includes_and_overloads() {
        let file = compile("#include maps\\Util; f() {} f(a, b) {} g() {}").unwrap();
        assert_eq!(file.includes, vec!["maps\\util".to_string()]);
        assert_eq!(file.overloads("f").len(), 2);
        assert!(file.function("f", 2).is_some());
        assert!(file.function("g", 1).is_none());
    }

    #[test]
    fn test_parse_error_position() {
        let err = compile("f() {\n  x = ;\n}").unwrap_err();
        let CompileError::Parse(err) = err else {
            panic!("expected a parse error, got {:?}", err);
        };
        assert_eq!(err.position.line, 2);
    }

    #[test]
    fn test_break_outside_loop_is_rejected() {
        assert!(compile("f() { break; }").is_err());
    }

    #[test]
    fn test_every_chunk_verifies() {
        let file = compile(
            "f(n) {
                for (i = 0; i < n; i++) {
                    if (i % 2 == 0) continue;
                    do { n -= 1; if (n < 0) break; } while (n > 10 && i != 3 || !n);
                }
                return (1, 2, 3)[0] + [[ ::g ]](n);
            }
            g(x) { wait 0.5; return &\"KEY\"; }",
        )
        .unwrap();
        for function in file.functions() {
            assert_eq!(function.chunk.verify(), Ok(()), "{}", function.name);
        }
    }
}
