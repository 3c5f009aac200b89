//! Text diagnostics in the classic Decaf layout
//!
//! ```text
//! *** Error line 4.
//!     x = "hello";
//!       ^
//! *** Incompatible operands: int = string
//! ```

use crate::frontend::token::{Token, TokenKind};
use crate::utils::{Error, Span};

/// Render one error as a diagnostic block.
///
/// The offending line is rebuilt from the tokens, so comments on it are
/// not shown.
pub fn render(error: &Error, tokens: &[Token]) -> String {
    match (error, error.span()) {
        (Error::UnexpectedEof { message }, _) => format!("*** Error at EOF\n*** {}", message),
        (_, Some(span)) => format!(
            "*** Error line {}.\n{}\n{}\n*** {}",
            span.line,
            source_line(tokens, span.line),
            pointer_line(span, error.underlines()),
            error
        ),
        (_, None) => format!("*** Error.\n*** {}", error),
    }
}

/// Render every error, one block each
pub fn render_all(errors: &[Error], tokens: &[Token]) -> String {
    errors
        .iter()
        .map(|error| render(error, tokens))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Rebuild a source line by placing each token at its own column
fn source_line(tokens: &[Token], line: usize) -> String {
    let mut text = String::new();
    let mut column = 1;

    for token in tokens
        .iter()
        .filter(|token| token.span.line == line && token.kind != TokenKind::Eof)
    {
        if token.span.start_col > column {
            text.push_str(&" ".repeat(token.span.start_col - column));
            column = token.span.start_col;
        }
        text.push_str(&token.lexeme);
        column += token.lexeme.chars().count();
    }

    text
}

fn pointer_line(span: Span, underline: bool) -> String {
    let carets = if underline { span.width() } else { 1 };
    format!(
        "{}{}",
        " ".repeat(span.start_col.saturating_sub(1)),
        "^".repeat(carets)
    )
}
