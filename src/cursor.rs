use miette::SourceSpan;

use crate::tokens::{Token, Type as TT};

/// Index-based view over a lexed token stream. Positions are plain indices so callers can
/// save one with [`Cursor::position`] and rewind to it after a failed speculative parse.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
	index: usize,
	tokens: &'a [Token],
}

impl<'a> Cursor<'a> {
	pub fn new(tokens: &'a [Token]) -> Self {
		Self {
			index: 0,
			tokens,
		}
	}

	pub fn position(&self) -> usize {
		self.index
	}

	pub fn rewind(&mut self, index: usize) {
		self.index = index;
	}

	pub fn is_empty(&self) -> bool {
		self.index >= self.tokens.len()
	}

	pub fn peek(&self) -> Option<&'a Token> {
		self.tokens.get(self.index)
	}

	/// Looks `n` tokens past the current one; `peek_nth(0)` is `peek()`.
	pub fn peek_nth(&self, n: usize) -> Option<&'a Token> {
		self.tokens.get(self.index + n)
	}

	pub fn next(&mut self) -> Option<&'a Token> {
		let token = self.tokens.get(self.index)?;
		self.index += 1;
		Some(token)
	}

	/// Consumes the next token if it has type `tt`.
	pub fn token(&mut self, tt: TT) -> Option<&'a Token> {
		if self.peek()
			.filter(|token| token.tt == tt)
			.is_some()
		{
			self.next()
		} else {
			None
		}
	}

	pub fn at_end_of_statement(&self) -> bool {
		self.peek()
			.map_or(true, |token| token.tt == TT::EndOfStatement)
	}

	/// Skips past the next end-of-statement token.
	pub fn skip_statement(&mut self) {
		while let Some(token) = self.next() {
			if token.tt == TT::EndOfStatement {
				break;
			}
		}
	}

	/// Span of the current token, or an empty span at the end of input.
	pub fn span(&self) -> SourceSpan {
		match self.peek() {
			Some(token) => token.span,
			None => (self.end_offset(), 0).into(),
		}
	}

	/// Span covering every token consumed since `start`.
	pub fn span_since(&self, start: usize) -> SourceSpan {
		let Some(first) = self.tokens.get(start) else {
			return self.span();
		};
		if self.index <= start {
			return (first.span.offset(), 0).into();
		}
		let last = &self.tokens[self.index - 1];
		let end = last.span.offset() + last.span.len();
		(first.span.offset(), end - first.span.offset()).into()
	}

	fn end_offset(&self) -> usize {
		self.tokens.last()
			.map_or(0, |token| token.span.offset() + token.span.len())
	}
}
