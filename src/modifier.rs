use std::fmt;

use tracing::trace;

use crate::cursor::Cursor;
use crate::error::{Error, Expected};
use crate::expr::{self, Expr};
use crate::tokens::Type as TT;

/// Relocation modifiers that select part of an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModifierKind {
	Low8,
	High8,
	Addr8,
	Addr13,
	Addr16,
	Addr16Low,
	Addr16High,
	Addr24,
	Addr24Bank,
	Addr24Segment,
	Addr24SegmentLow,
	Addr24SegmentHigh,
	Low8Stub,
	High8Stub,
	Addr16LowStub,
	Addr16HighStub,
	/// Only produced by the `.mos_addr_asciz` directive.
	AddrAsciz,
}

const MODIFIER_NAMES: &[(&str, ModifierKind)] = &[
	("lo", ModifierKind::Low8),
	("lo8", ModifierKind::Low8),
	("hi", ModifierKind::High8),
	("hi8", ModifierKind::High8),
	("mos8", ModifierKind::Addr8),
	("mos13", ModifierKind::Addr13),
	("mos16", ModifierKind::Addr16),
	("mos16lo", ModifierKind::Addr16Low),
	("mos16hi", ModifierKind::Addr16High),
	("mos24", ModifierKind::Addr24),
	("mos24bank", ModifierKind::Addr24Bank),
	("mos24segment", ModifierKind::Addr24Segment),
	("mos24segmentlo", ModifierKind::Addr24SegmentLow),
	("mos24segmenthi", ModifierKind::Addr24SegmentHigh),
	("lo_gs", ModifierKind::Low8Stub),
	("lo8_gs", ModifierKind::Low8Stub),
	("hi_gs", ModifierKind::High8Stub),
	("hi8_gs", ModifierKind::High8Stub),
	("mos16lo_gs", ModifierKind::Addr16LowStub),
	("mos16hi_gs", ModifierKind::Addr16HighStub),
];

const GENERATE_STUBS: &str = "gs";

impl ModifierKind {
	/// Case-insensitive lookup in the modifier name table.
	pub fn from_name(name: &str) -> Option<Self> {
		MODIFIER_NAMES.iter()
			.find(|(n, _)| n.eq_ignore_ascii_case(name))
			.map(|(_, kind)| *kind)
	}

	/// Size in bits of the value this modifier produces.
	pub fn width(self) -> u32 {
		match self {
			Self::Addr13 => 13,
			Self::Addr16 | Self::Addr24Segment => 16,
			Self::Addr24 => 24,
			_ => 8,
		}
	}

	/// Largest value the modifier can produce.
	pub fn max_value(self) -> i64 {
		(1i64 << self.width()) - 1
	}

	/// Selects the modifier's bits out of an already folded value.
	pub fn apply(self, value: i64) -> i64 {
		match self {
			Self::Low8
			| Self::Low8Stub
			| Self::Addr8
			| Self::Addr16Low
			| Self::Addr16LowStub
			| Self::Addr24SegmentLow => value & 0xFF,
			Self::High8
			| Self::High8Stub
			| Self::Addr16High
			| Self::Addr16HighStub
			| Self::Addr24SegmentHigh => (value >> 8) & 0xFF,
			Self::Addr13 => value & 0x1FFF,
			Self::Addr16 | Self::Addr24Segment => value & 0xFFFF,
			Self::Addr24 => value & 0xFF_FFFF,
			Self::Addr24Bank => (value >> 16) & 0xFF,
			Self::AddrAsciz => value,
		}
	}

	fn name(self) -> &'static str {
		match self {
			Self::AddrAsciz => "mos_addr_asciz",
			kind => MODIFIER_NAMES.iter()
				.find(|(_, k)| *k == kind)
				.map_or("?", |(n, _)| *n),
		}
	}
}

impl fmt::Display for ModifierKind {
	fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
		write!(fmt, "{}", self.name())
	}
}

/// An operand expression, optionally wrapped in a relocation modifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
	Plain(Expr),
	Modified {
		kind: ModifierKind,
		inner: Box<Expr>,
		negated: bool,
	},
}

impl Expression {
	pub fn modified(kind: ModifierKind, inner: Expr, negated: bool) -> Self {
		Self::Modified {
			kind,
			inner: Box::new(inner),
			negated,
		}
	}

	/// Folds to a constant. A negated modifier negates the inner value before selecting bits.
	pub fn evaluate(&self) -> Option<i64> {
		match self {
			Self::Plain(expr) => expr.evaluate(),
			Self::Modified { kind, inner, negated } => {
				let value = inner.evaluate()?;
				let value = if *negated { value.wrapping_neg() } else { value };
				Some(kind.apply(value))
			}
		}
	}

	pub fn modifier(&self) -> Option<ModifierKind> {
		match self {
			Self::Plain(_) => None,
			Self::Modified { kind, .. } => Some(*kind),
		}
	}
}

impl fmt::Display for Expression {
	fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::Plain(expr) => write!(fmt, "{expr}"),
			Self::Modified { kind, inner, negated } => {
				let sign = if *negated { "-" } else { "" };
				write!(fmt, "{sign}{kind}({inner})")
			}
		}
	}
}

/// Parses an expression that may carry a relocation modifier: `<expr`, `>expr`,
/// `name(expr)`, `name(gs expr)`, `-name(expr)` or `name(-(expr))`. Anything else is a plain
/// arithmetic expression.
pub fn parse_expression(cursor: &mut Cursor) -> Result<Expression, Error> {
	let tt = |n: usize| cursor.peek_nth(n).map(|token| &token.tt);

	let signed = matches!(tt(0), Some(TT::Plus | TT::Dash));
	let modifier_follows = matches!(tt(1), Some(TT::Ident(_))) && matches!(tt(2), Some(TT::OParen));
	let negated = if signed && modifier_follows {
		let negated = matches!(tt(0), Some(TT::Dash));
		cursor.next();
		negated
	} else {
		false
	};

	let Some(token) = cursor.peek() else {
		return Err(Error::syntax(Expected::Expression, cursor.span()));
	};

	let kind = match &token.tt {
		TT::Less => Some(ModifierKind::Addr16Low),
		TT::Greater => Some(ModifierKind::Addr16High),
		_ => None,
	};
	if let Some(kind) = kind {
		cursor.next();
		let inner = expr::parse(cursor)?;
		trace!("parsed {kind} modifier");
		return Ok(Expression::modified(kind, inner, negated));
	}

	let named = token.ident()
		.filter(|_| matches!(cursor.peek_nth(1).map(|t| &t.tt), Some(TT::OParen)));
	let Some(name) = named else {
		return expr::parse(cursor).map(Expression::Plain);
	};

	let Some(mut kind) = ModifierKind::from_name(name) else {
		return Err(Error::UnknownModifier {
			name: name.into(),
			span: token.span,
		});
	};
	cursor.next();
	cursor.next();

	if cursor.peek().is_some_and(|t| t.is_ident(GENERATE_STUBS)) {
		if let Some(stub) = ModifierKind::from_name(&format!("{name}_{GENERATE_STUBS}")) {
			cursor.next();
			kind = stub;
		}
	}

	let inner_signed = matches!(cursor.peek().map(|t| &t.tt), Some(TT::Plus | TT::Dash))
		&& matches!(cursor.peek_nth(1).map(|t| &t.tt), Some(TT::OParen));
	let inner = if inner_signed {
		let inner_negated = cursor.peek().is_some_and(|t| t.tt == TT::Dash);
		cursor.next();
		cursor.next();
		let inner = expr::parse(cursor)?;
		close_paren(cursor)?;
		if inner_negated { Expr::neg(inner) } else { inner }
	} else {
		expr::parse(cursor)?
	};
	close_paren(cursor)?;

	trace!("parsed {kind} modifier");
	Ok(Expression::modified(kind, inner, negated))
}

fn close_paren(cursor: &mut Cursor) -> Result<(), Error> {
	cursor.token(TT::CParen)
		.map(|_| ())
		.ok_or_else(|| Error::syntax(Expected::CloseParen, cursor.span()))
}
