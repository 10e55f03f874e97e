// earle-parser - Grammar rules and matching
// Copyright (c) 2025 Tom Waddington. MIT licensed.

mod compile;
pub mod earle;
pub mod element;
pub mod matcher;
pub mod table;

pub use compile::compile_rule;
pub use earle::earle_grammar;
pub use element::{GrammarRule, LiteralElement, RuleElement};
pub use matcher::GrammarMatcher;
pub use table::GrammarRuleTable;
