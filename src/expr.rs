use std::fmt;

use crate::cursor::Cursor;
use crate::error::{Error, Expected};
use crate::tokens::Type as TT;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
	Neg,
	Plus,
	Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
	Or,
	Xor,
	And,
	Shl,
	Shr,
	Add,
	Sub,
	Mul,
	Div,
	Mod,
}

impl BinaryOp {
	fn from_token(tt: &TT) -> Option<Self> {
		let op = match tt {
			TT::Pipe => Self::Or,
			TT::Caret => Self::Xor,
			TT::Amp => Self::And,
			TT::Shl => Self::Shl,
			TT::Shr => Self::Shr,
			TT::Plus => Self::Add,
			TT::Dash => Self::Sub,
			TT::Star => Self::Mul,
			TT::Slash => Self::Div,
			TT::Percent => Self::Mod,
			_ => return None,
		};
		Some(op)
	}

	/// Binding strength, higher binds tighter.
	fn precedence(self) -> u8 {
		match self {
			Self::Or => 1,
			Self::Xor => 2,
			Self::And => 3,
			Self::Shl | Self::Shr => 4,
			Self::Add | Self::Sub => 5,
			Self::Mul | Self::Div | Self::Mod => 6,
		}
	}

	fn symbol(self) -> &'static str {
		match self {
			Self::Or => "|",
			Self::Xor => "^",
			Self::And => "&",
			Self::Shl => "<<",
			Self::Shr => ">>",
			Self::Add => "+",
			Self::Sub => "-",
			Self::Mul => "*",
			Self::Div => "/",
			Self::Mod => "%",
		}
	}

	fn apply(self, lhs: i64, rhs: i64) -> Option<i64> {
		let value = match self {
			Self::Or => lhs | rhs,
			Self::Xor => lhs ^ rhs,
			Self::And => lhs & rhs,
			Self::Shl => lhs.checked_shl(u32::try_from(rhs).ok()?)?,
			Self::Shr => lhs.checked_shr(u32::try_from(rhs).ok()?)?,
			Self::Add => lhs.wrapping_add(rhs),
			Self::Sub => lhs.wrapping_sub(rhs),
			Self::Mul => lhs.wrapping_mul(rhs),
			Self::Div => lhs.checked_div(rhs)?,
			Self::Mod => lhs.checked_rem(rhs)?,
		};
		Some(value)
	}
}

/// An arithmetic expression over literals and symbols.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
	Constant(i64),
	Symbol(Box<str>),
	Unary {
		op: UnaryOp,
		expr: Box<Expr>,
	},
	Binary {
		op: BinaryOp,
		lhs: Box<Expr>,
		rhs: Box<Expr>,
	},
}

impl Expr {
	pub fn neg(expr: Expr) -> Self {
		Self::Unary {
			op: UnaryOp::Neg,
			expr: Box::new(expr),
		}
	}

	/// Folds the expression to a constant. Symbols, division by zero and out of range shifts
	/// leave it unresolved.
	pub fn evaluate(&self) -> Option<i64> {
		match self {
			Self::Constant(n) => Some(*n),
			Self::Symbol(_) => None,
			Self::Unary { op, expr } => {
				let value = expr.evaluate()?;
				Some(match op {
					UnaryOp::Neg => value.wrapping_neg(),
					UnaryOp::Plus => value,
					UnaryOp::Not => !value,
				})
			}
			Self::Binary { op, lhs, rhs } => op.apply(lhs.evaluate()?, rhs.evaluate()?),
		}
	}

	pub fn is_symbol(&self) -> bool {
		matches!(self, Self::Symbol(_))
	}
}

impl fmt::Display for Expr {
	fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::Constant(n) => write!(fmt, "{n}"),
			Self::Symbol(name) => write!(fmt, "{name}"),
			Self::Unary { op, expr } => {
				let op = match op {
					UnaryOp::Neg => "-",
					UnaryOp::Plus => "+",
					UnaryOp::Not => "~",
				};
				write!(fmt, "{op}{expr}")
			}
			Self::Binary { op, lhs, rhs } => write!(fmt, "({lhs} {} {rhs})", op.symbol()),
		}
	}
}

/// Parses an arithmetic expression starting at the cursor. The cursor is left on the first
/// token that cannot continue the expression.
pub fn parse(cursor: &mut Cursor) -> Result<Expr, Error> {
	parse_binary(cursor, 1)
}

fn parse_binary(cursor: &mut Cursor, min_prec: u8) -> Result<Expr, Error> {
	let mut lhs = parse_unary(cursor)?;
	while let Some(op) = cursor.peek().and_then(|token| BinaryOp::from_token(&token.tt)) {
		let prec = op.precedence();
		if prec < min_prec {
			break;
		}
		cursor.next();
		let rhs = parse_binary(cursor, prec + 1)?;
		lhs = Expr::Binary {
			op,
			lhs: Box::new(lhs),
			rhs: Box::new(rhs),
		};
	}
	Ok(lhs)
}

fn parse_unary(cursor: &mut Cursor) -> Result<Expr, Error> {
	let op = match cursor.peek().map(|token| &token.tt) {
		Some(TT::Dash) => UnaryOp::Neg,
		Some(TT::Plus) => UnaryOp::Plus,
		Some(TT::Tilde) => UnaryOp::Not,
		_ => return parse_primary(cursor),
	};
	cursor.next();
	let expr = parse_unary(cursor)?;
	Ok(Expr::Unary {
		op,
		expr: Box::new(expr),
	})
}

fn parse_primary(cursor: &mut Cursor) -> Result<Expr, Error> {
	let span = cursor.span();
	let Some(token) = cursor.peek() else {
		return Err(Error::syntax(Expected::Expression, span));
	};
	match &token.tt {
		TT::Bin(_) | TT::Dec(_) | TT::Hex(_) | TT::Char(_) => {
			cursor.next();
			token.tt.value()
				.map(Expr::Constant)
				.ok_or(Error::LiteralRange { span })
		}
		TT::Ident(name) => {
			cursor.next();
			Ok(Expr::Symbol(name.clone()))
		}
		TT::OParen => {
			cursor.next();
			let inner = parse(cursor)?;
			if cursor.token(TT::CParen).is_none() {
				return Err(Error::syntax(Expected::CloseParen, cursor.span()));
			}
			Ok(inner)
		}
		_ => Err(Error::syntax(Expected::Expression, span)),
	}
}
