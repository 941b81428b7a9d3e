use std::fmt;

use miette::SourceSpan;

use crate::cursor::Cursor;
use crate::features::Features;

/// Number of 8-bit imaginary registers `__rc0`..`__rc255`.
pub const RC_COUNT: u16 = 256;
/// Number of 16-bit imaginary register pairs `__rs0`..`__rs127`.
pub const RS_COUNT: u16 = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
	A,
	X,
	Y,
	S,
	P,
	/// Imaginary 8-bit register in zero page.
	Rc(u8),
	/// Imaginary 16-bit register, a pair of `Rc`s.
	Rs(u8),
}

impl Register {
	/// Index and stack registers, the only ones that appear as instruction operands.
	pub fn is_operand_class(self) -> bool {
		matches!(self, Self::X | Self::Y | Self::S)
	}
}

impl fmt::Display for Register {
	fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::A => write!(fmt, "a"),
			Self::X => write!(fmt, "x"),
			Self::Y => write!(fmt, "y"),
			Self::S => write!(fmt, "s"),
			Self::P => write!(fmt, "p"),
			Self::Rc(n) => write!(fmt, "__rc{n}"),
			Self::Rs(n) => write!(fmt, "__rs{n}"),
		}
	}
}

/// Decimal register number without leading zeros, below `limit`.
fn register_number(digits: &str, limit: u16) -> Option<u8> {
	if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
		return None;
	}
	if digits.len() > 1 && digits.starts_with('0') {
		return None;
	}
	digits.parse::<u16>()
		.ok()
		.filter(|n| *n < limit)
		.and_then(|n| u8::try_from(n).ok())
}

fn imaginary(name: &str) -> Option<Register> {
	if let Some(n) = name.strip_prefix("rc") {
		register_number(n, RC_COUNT).map(Register::Rc)
	} else if let Some(n) = name.strip_prefix("rs") {
		register_number(n, RS_COUNT).map(Register::Rs)
	} else {
		None
	}
}

fn canonical(name: &str) -> Option<Register> {
	let reg = match name {
		"a" => Register::A,
		"x" => Register::X,
		"y" => Register::Y,
		"s" => Register::S,
		"p" => Register::P,
		_ => return imaginary(name.strip_prefix("__")?),
	};
	Some(reg)
}

/// Resolves a register name in any case. Short aliases (`rc4`, `rs1`) are only tried when
/// canonical names are not required. No match is not an error.
pub fn resolve(text: &str, features: Features) -> Option<Register> {
	let name = text.to_ascii_lowercase();
	canonical(&name).or_else(|| {
		if features.contains(Features::CANONICAL_REGISTER_NAMES_ONLY) {
			None
		} else {
			imaginary(&name)
		}
	})
}

/// Consumes the current token if it names a register.
pub fn parse_register(cursor: &mut Cursor, features: Features) -> Option<(Register, SourceSpan)> {
	let token = cursor.peek()?;
	let reg = resolve(token.ident()?, features)?;
	cursor.next();
	Some((reg, token.span))
}
