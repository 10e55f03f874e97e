// earle-parser - Backtracking grammar matcher
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Backtracking matcher over a [`GrammarRuleTable`].
//!
//! Matching is written in continuation-passing style: each element receives
//! the continuation that matches everything after it, and a continuation
//! returning [`ControlFlow::Break`] stops the whole search. A search that
//! only needs one result breaks on the first; enumeration always continues.
//!
//! Left recursion is handled by matching the non-recursive alternatives
//! first and then extending each result with the tails of the recursive
//! alternatives. An extension only starts once the base consumed a token
//! and each step must consume more, so it always terminates.
//!
//! Within one search the end positions of a rule at a cursor position are
//! computed once and replayed afterwards, so nested shapes such as
//! `((((1))))` cost time linear in their depth.

use std::cell::RefCell;
use std::collections::HashMap;
use std::ops::ControlFlow;
use std::rc::Rc;

use crate::grammar::element::{GrammarRule, RuleElement};
use crate::grammar::table::GrammarRuleTable;
use crate::lexer::Lexer;
use crate::walker::TokenWalker;

type Continuation<'a> = dyn FnMut(&mut TokenWalker) -> ControlFlow<()> + 'a;

/// Rule name plus lexer cursor.
type MemoKey = (String, usize, usize);

#[derive(Debug, Clone, Copy)]
pub struct GrammarMatcher<'g> {
    table: &'g GrammarRuleTable,
}

impl<'g> GrammarMatcher<'g> {
    pub fn new(table: &'g GrammarRuleTable) -> Self {
        GrammarMatcher { table }
    }

    pub fn table(&self) -> &'g GrammarRuleTable {
        self.table
    }

    /// Does `rule` match at the lexer's cursor? The lexer is not moved.
    pub fn matches(&self, rule: &str, lexer: &Lexer) -> bool {
        let search = Search::new(self.table);
        let mut walker = TokenWalker::new(lexer.clone());
        let found = search
            .match_rule(rule, &mut walker, &mut |_: &mut TokenWalker| ControlFlow::Break(()))
            .is_break();
        debug_assert_eq!(walker.depth(), 0, "unbalanced walker sessions");
        found
    }

    /// Every way `rule` can match, as lexers positioned after each match,
    /// in exploration order.
    pub fn enumerate_matches(&self, rule: &str, lexer: &Lexer) -> Vec<Lexer> {
        let search = Search::new(self.table);
        let mut walker = TokenWalker::new(lexer.clone());
        let ends = search.rule_ends(rule, &mut walker);
        debug_assert_eq!(walker.depth(), 0, "unbalanced walker sessions");
        ends.to_vec()
    }

    /// The match that consumes the most tokens (the earliest such on ties).
    pub fn longest_match(&self, rule: &str, lexer: &Lexer) -> Option<Lexer> {
        self.enumerate_matches(rule, lexer)
            .into_iter()
            .fold(None, |best: Option<Lexer>, candidate| match best {
                Some(best) if best.progress() >= candidate.progress() => Some(best),
                _ => Some(candidate),
            })
    }

    /// Number of tokens consumed by the longest match.
    pub fn match_length(&self, rule: &str, lexer: &Lexer) -> Option<usize> {
        let start = lexer.progress();
        self.longest_match(rule, lexer)
            .map(|end| end.progress().saturating_sub(start))
    }
}

/// State of one top-level match.
struct Search<'g> {
    table: &'g GrammarRuleTable,
    /// `None` while the entry is being computed.
    memo: RefCell<HashMap<MemoKey, Option<Rc<Vec<Lexer>>>>>,
}

impl<'g> Search<'g> {
    fn new(table: &'g GrammarRuleTable) -> Self {
        Search {
            table,
            memo: RefCell::new(HashMap::new()),
        }
    }

    /// Replay the end positions of `name` at the walker's cursor.
    fn match_rule(&self, name: &str, walker: &mut TokenWalker, k: &mut Continuation<'_>) -> ControlFlow<()> {
        let ends = self.rule_ends(name, walker);
        for end in ends.iter() {
            walker.begin();
            walker.restore(end.checkpoint());
            let flow = k(walker);
            walker.drop_session();
            flow?;
        }
        ControlFlow::Continue(())
    }

    /// Every end position of `name` at the walker's cursor, computed once.
    /// A rule re-entered at the same position before it finished yields
    /// nothing there.
    fn rule_ends(&self, name: &str, walker: &mut TokenWalker) -> Rc<Vec<Lexer>> {
        let (index, pushed) = walker.lexer().cursor();
        let key = (name.to_string(), index, pushed);
        if let Some(entry) = self.memo.borrow().get(&key) {
            return entry.clone().unwrap_or_default();
        }
        self.memo.borrow_mut().insert(key.clone(), None);

        let mut ends = Vec::new();
        let mut inner = TokenWalker::new(walker.lexer().clone());
        let _ = self.expand_rule(name, &mut inner, &mut |w: &mut TokenWalker| {
            ends.push(w.lexer().clone());
            ControlFlow::Continue(())
        });
        debug_assert_eq!(inner.depth(), 0, "unbalanced walker sessions");

        let ends = Rc::new(ends);
        self.memo.borrow_mut().insert(key, Some(ends.clone()));
        ends
    }

    fn expand_rule(&self, name: &str, walker: &mut TokenWalker, k: &mut Continuation<'_>) -> ControlFlow<()> {
        let rules = self.table.rules(name);
        if rules.is_empty() {
            return ControlFlow::Continue(());
        }
        let (recursive, base): (Vec<&GrammarRule>, Vec<&GrammarRule>) =
            rules.iter().partition(|rule| rule.is_left_recursive());
        let start = walker.progress();

        for rule in base {
            self.match_sequence(&rule.elements, walker, &mut |w: &mut TokenWalker| {
                self.extend(&recursive, start, w, &mut *k)
            })?;
        }
        ControlFlow::Continue(())
    }

    /// Grow a match of a left-recursive rule, trying longer chains before
    /// yielding the current one.
    fn extend(
        &self,
        recursive: &[&GrammarRule],
        start: usize,
        walker: &mut TokenWalker,
        k: &mut Continuation<'_>,
    ) -> ControlFlow<()> {
        let here = walker.progress();
        if here > start {
            for rule in recursive {
                self.match_sequence(&rule.elements[1..], walker, &mut |w: &mut TokenWalker| {
                    if w.progress() > here {
                        self.extend(recursive, start, w, &mut *k)
                    } else {
                        ControlFlow::Continue(())
                    }
                })?;
            }
        }
        k(walker)
    }

    fn match_sequence(
        &self,
        elements: &[RuleElement],
        walker: &mut TokenWalker,
        k: &mut Continuation<'_>,
    ) -> ControlFlow<()> {
        match elements.split_first() {
            None => k(walker),
            Some((first, rest)) => self.match_element(first, walker, &mut |w: &mut TokenWalker| {
                self.match_sequence(rest, w, &mut *k)
            }),
        }
    }

    fn match_element(
        &self,
        element: &RuleElement,
        walker: &mut TokenWalker,
        k: &mut Continuation<'_>,
    ) -> ControlFlow<()> {
        match element {
            RuleElement::Literal(literal) => {
                if !walker.with_current(|token| token.is_some_and(|t| literal.accepts(t))) {
                    return ControlFlow::Continue(());
                }
                walker.begin();
                walker.advance();
                let flow = k(walker);
                walker.drop_session();
                flow
            }
            RuleElement::Embed(name) => self.match_rule(name, walker, k),
            RuleElement::Optional(inner) => {
                self.match_element(inner, walker, &mut *k)?;
                k(walker)
            }
            RuleElement::And(elements) => self.match_sequence(elements, walker, k),
        }
    }
}
