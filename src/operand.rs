use std::fmt;

use miette::SourceSpan;

use crate::expr::Expr;
use crate::modifier::{Expression, ModifierKind};
use crate::register::Register;

const IMM8_MAX: i64 = 0xFF;
const IMM16_MAX: i64 = 0xFFFF;
const IMM24_MAX: i64 = 0xFF_FFFF;

/// Width an immediate operand is known to fit in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RangeClass {
	Bits8,
	Bits16,
	Bits24,
	/// A symbol resolved later, fits any width.
	Symbolic,
}

/// One element of a parsed operand list. The mnemonic is stored as the first `Token`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
	Token {
		text: Box<str>,
		span: SourceSpan,
	},
	Register {
		reg: Register,
		span: SourceSpan,
	},
	Immediate {
		expr: Expression,
		span: SourceSpan,
	},
}

impl Operand {
	pub fn token(text: impl Into<Box<str>>, span: SourceSpan) -> Self {
		Self::Token {
			text: text.into(),
			span,
		}
	}

	pub fn span(&self) -> SourceSpan {
		match self {
			Self::Token { span, .. }
			| Self::Register { span, .. }
			| Self::Immediate { span, .. } => *span,
		}
	}

	pub fn is_token(&self, text: &str) -> bool {
		matches!(self, Self::Token { text: t, .. } if t.eq_ignore_ascii_case(text))
	}

	/// Whether an immediate could hold a value in `lo..=hi`.
	///
	/// A modifier is judged by the value it folds to when that is a positive constant, and
	/// otherwise by the largest value it can produce. Symbols and other unresolved expressions
	/// fit anywhere since they are fixed up later.
	pub fn fits(&self, lo: i64, hi: i64) -> bool {
		let Self::Immediate { expr, .. } = self else {
			return false;
		};
		match expr {
			Expression::Modified { kind, .. } => {
				// 16-bit addresses never shrink into a smaller operand
				if *kind == ModifierKind::Addr16 && hi < IMM16_MAX {
					return false;
				}
				match expr.evaluate() {
					Some(value) if value > 0 => (lo..=hi).contains(&value),
					_ => kind.max_value() <= hi,
				}
			}
			Expression::Plain(Expr::Symbol(_)) => true,
			Expression::Plain(e) => e.evaluate()
				.map_or(true, |value| (lo..=hi).contains(&value)),
		}
	}

	pub fn is_imm8(&self) -> bool {
		self.fits(0, IMM8_MAX)
	}

	pub fn is_imm16(&self) -> bool {
		self.fits(0, IMM16_MAX)
	}

	pub fn is_imm24(&self) -> bool {
		self.fits(0, IMM24_MAX)
	}

	pub fn is_imm8_to_16(&self) -> bool {
		!self.is_imm8() && self.is_imm16()
	}

	pub fn is_imm16_to_24(&self) -> bool {
		!self.is_imm16() && self.is_imm24()
	}

	pub fn is_pcrel8(&self) -> bool {
		self.is_imm8()
	}

	pub fn is_pcrel16(&self) -> bool {
		self.is_imm16()
	}

	pub fn is_addr8(&self) -> bool {
		self.is_imm8()
	}

	pub fn is_addr16(&self) -> bool {
		self.is_imm16()
	}

	pub fn is_addr24(&self) -> bool {
		self.is_imm24()
	}

	/// Smallest width the operand fits, `None` for non-immediates and values that fit none.
	pub fn range_class(&self) -> Option<RangeClass> {
		let Self::Immediate { expr, .. } = self else {
			return None;
		};
		if let Expression::Plain(e) = expr {
			if e.evaluate().is_none() {
				return Some(RangeClass::Symbolic);
			}
		}
		[
			(RangeClass::Bits8, IMM8_MAX),
			(RangeClass::Bits16, IMM16_MAX),
			(RangeClass::Bits24, IMM24_MAX),
		]
			.into_iter()
			.find(|(_, hi)| self.fits(0, *hi))
			.map(|(class, _)| class)
	}
}

impl fmt::Display for Operand {
	fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::Token { text, .. } => write!(fmt, "{text}"),
			Self::Register { reg, .. } => write!(fmt, "{reg}"),
			Self::Immediate { expr, .. } => write!(fmt, "{expr}"),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn imm(expr: Expression) -> Operand {
		Operand::Immediate {
			expr,
			span: (0, 0).into(),
		}
	}

	fn constant(n: i64) -> Operand {
		imm(Expression::Plain(Expr::Constant(n)))
	}

	fn modified(kind: ModifierKind, inner: Expr) -> Operand {
		imm(Expression::modified(kind, inner, false))
	}

	#[test]
	fn constant_bounds() {
		assert!(constant(0).is_imm8());
		assert!(constant(255).is_imm8());
		assert!(!constant(256).is_imm8());
		assert!(!constant(-1).is_imm8());
		assert!(constant(0xFFFF).is_imm16());
		assert!(!constant(0x10000).is_imm16());
		assert!(constant(0x10000).is_imm16_to_24());
		assert!(constant(256).is_imm8_to_16());
		assert!(!constant(255).is_imm8_to_16());
	}

	#[test]
	fn symbols_fit_anywhere() {
		let sym = imm(Expression::Plain(Expr::Symbol("label".into())));
		assert!(sym.is_imm8());
		assert!(sym.is_imm24());
		assert!(!sym.is_imm8_to_16());
		assert_eq!(sym.range_class(), Some(RangeClass::Symbolic));

		let sum = imm(Expression::Plain(Expr::Binary {
			op: crate::expr::BinaryOp::Add,
			lhs: Box::new(Expr::Symbol("label".into())),
			rhs: Box::new(Expr::Constant(1)),
		}));
		assert!(sum.is_imm8());
	}

	#[test]
	fn modifier_widths() {
		let low = modified(ModifierKind::Low8, Expr::Constant(0x1234));
		assert!(low.is_imm8());
		assert_eq!(low.range_class(), Some(RangeClass::Bits8));

		let label_low = modified(ModifierKind::Addr16Low, Expr::Symbol("label".into()));
		assert!(label_low.is_imm8());
		assert!(!label_low.is_imm8_to_16());

		let addr13 = modified(ModifierKind::Addr13, Expr::Symbol("label".into()));
		assert!(!addr13.is_imm8());
		assert!(addr13.is_imm16());

		let addr24 = modified(ModifierKind::Addr24, Expr::Symbol("label".into()));
		assert_eq!(addr24.range_class(), Some(RangeClass::Bits24));
	}

	#[test]
	fn addr16_never_matches_narrow_classes() {
		let small = modified(ModifierKind::Addr16, Expr::Constant(5));
		assert!(!small.is_imm8());
		assert!(small.is_imm16());
		assert_eq!(small.range_class(), Some(RangeClass::Bits16));
	}

	#[test]
	fn zero_folds_to_modifier_width() {
		let zero = modified(ModifierKind::Addr24, Expr::Constant(0));
		assert!(!zero.is_imm16());
		assert!(zero.is_imm24());
	}

	#[test]
	fn non_immediates() {
		let tok = Operand::token("#", (0, 1).into());
		assert!(!tok.is_imm8());
		assert_eq!(tok.range_class(), None);
		assert!(tok.is_token("#"));
		assert_eq!(constant(-5).range_class(), None);
	}
}
