//! Two-stage parsing pipeline: an external tokenizer+parser produces a
//! source tree (stage 1), the transformation engine turns it into a typed
//! target AST (stage 2), and diagnostics from both stages merge into one
//! ordered result.

pub mod driver;
pub mod error;
pub mod lexer;
pub mod mapping;
pub mod parse_tree;
pub mod result;
pub mod token;

pub use driver::AstParser;
pub use error::{PipelineError, Result};
pub use lexer::{Lexer, LexingResult};
pub use mapping::ParseNodeRules;
pub use parse_tree::{ParseNode, ParseTreeNode};
pub use result::{FirstStageOutput, FirstStageResult, ParsingResult};
pub use token::{Token, TokenCategory};
