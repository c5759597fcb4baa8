use crate::token::Token;
use arbor_core::Issue;
use std::time::Instant;

/// Outcome of running the tokenizer alone.
#[derive(Debug, Clone)]
pub struct LexingResult {
    pub issues: Vec<Issue>,
    pub tokens: Vec<Token>,
    pub elapsed_ms: u64,
}

/// First-stage tokenizer collaborator: turns source text into terminals,
/// reporting lexical issues through the injected list.
pub trait Lexer {
    fn tokenize(&self, code: &str, issues: &mut Vec<Issue>) -> Vec<Token>;

    /// Runs the tokenizer and packages the outcome with timing.
    fn lex(&self, code: &str) -> LexingResult {
        let started = Instant::now();
        let mut issues = Vec::new();
        let tokens = self.tokenize(code, &mut issues);
        LexingResult {
            issues,
            tokens,
            elapsed_ms: started.elapsed().as_millis() as u64,
        }
    }
}
