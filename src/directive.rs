use std::ops::RangeInclusive;

use miette::SourceSpan;
use tracing::debug;

use crate::cursor::Cursor;
use crate::error::{Error, Expected};
use crate::expr;
use crate::modifier::{Expression, ModifierKind};
use crate::tokens::Type as TT;

pub const ADDR_ASCIZ: &str = ".mos_addr_asciz";

const CHAR_COUNT: RangeInclusive<i64> = 1..=8;

/// Output of `.mos_addr_asciz`: an address written as NUL terminated decimal text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddrAsciz {
	/// Address was constant, the text is already rendered and padded.
	Bytes {
		bytes: Vec<u8>,
		span: SourceSpan,
	},
	/// Address is only known at link time. `chars` digits plus the terminator get filled in
	/// by a relocation.
	Deferred {
		expr: Expression,
		chars: usize,
		span: SourceSpan,
	},
}

impl AddrAsciz {
	/// Number of bytes emitted, including the terminating NUL.
	pub fn size(&self) -> usize {
		match self {
			Self::Bytes { bytes, .. } => bytes.len(),
			Self::Deferred { chars, .. } => chars + 1,
		}
	}
}

/// Parses `<expr>, <char-count>` after the directive name, up to the end of the statement.
pub fn parse_addr_asciz(cursor: &mut Cursor) -> Result<AddrAsciz, Error> {
	let start = cursor.position();
	let addr = expr::parse(cursor)?;
	let addr_span = cursor.span_since(start);

	if cursor.token(TT::Comma).is_none() {
		return Err(Error::syntax(Expected::CharCount, cursor.span()));
	}

	let count_start = cursor.position();
	let count = expr::parse(cursor)?;
	let count_span = cursor.span_since(count_start);
	let count = count.evaluate()
		.ok_or_else(|| Error::syntax(Expected::AbsoluteExpression, count_span))?;
	if !CHAR_COUNT.contains(&count) {
		return Err(Error::CharCountRange { count, span: count_span });
	}
	// in 1..=8 from here on
	let chars = count as usize;

	if !cursor.at_end_of_statement() {
		return Err(Error::syntax(Expected::EndOfStatement, cursor.span()));
	}
	let span = cursor.span_since(start);

	let out = match addr.evaluate() {
		Some(value) => {
			let text = value.to_string();
			if text.len() > chars {
				return Err(Error::LiteralWidth { span: addr_span });
			}
			let mut bytes = text.into_bytes();
			bytes.resize(chars + 1, 0);
			AddrAsciz::Bytes { bytes, span }
		}
		None => AddrAsciz::Deferred {
			expr: Expression::modified(ModifierKind::AddrAsciz, addr, false),
			chars,
			span,
		},
	};
	debug!("{ADDR_ASCIZ}: {} bytes", out.size());
	Ok(out)
}
