use std::fmt;

use miette::SourceSpan;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
	/// Token type
	pub tt: Type,

	/// Location in the source
	pub span: SourceSpan,
}

impl Token {
	pub fn new(tt: Type, idx: usize, len: usize) -> Self {
		Self {
			tt,
			span: (idx, len).into(),
		}
	}

	/// The identifier text, if this is an identifier.
	pub fn ident(&self) -> Option<&str> {
		match &self.tt {
			Type::Ident(name) => Some(name),
			_ => None,
		}
	}

	pub fn is_ident(&self, text: &str) -> bool {
		self.ident()
			.is_some_and(|name| name.eq_ignore_ascii_case(text))
	}
}

impl fmt::Display for Token {
	fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
		write!(fmt, "{}", self.tt)
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
	EndOfStatement,

	/* Literals */
	Ident(Box<str>),
	Bin(Box<str>),
	Dec(Box<str>),
	Hex(Box<str>),
	Char(char),
	Unknown(Box<str>),

	/* Operators */
	Plus,    // '+'
	Dash,    // '-'
	Star,    // '*'
	Slash,   // '/'
	Percent, // '%'
	Amp,     // '&'
	Pipe,    // '|'
	Caret,   // '^'
	Tilde,   // '~'
	Shl,     // '<<'
	Shr,     // '>>'
	Less,    // '<'
	Greater, // '>'
	Hash,    // '#'
	OParen,  // '('
	CParen,  // ')'
	OBrack,  // '['
	CBrack,  // ']'
	Comma,   // ','
	Colon,   // ':'
	Eq,      // '='
}

impl Type {
	/// Numeric value of a literal token, `None` for anything else or on overflow.
	pub fn value(&self) -> Option<i64> {
		let (txt, radix) = match self {
			Self::Bin(n) => (n, 2),
			Self::Dec(n) => (n, 10),
			Self::Hex(n) => (n, 16),
			Self::Char(c) => return Some(*c as i64),
			_ => return None,
		};
		let txt = txt.replace('_', "");
		u32::from_str_radix(&txt, radix)
			.ok()
			.map(i64::from)
	}
}

impl fmt::Display for Type {
	fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::EndOfStatement => write!(fmt, "end of statement"),
			Self::Ident(s) | Self::Dec(s) | Self::Unknown(s) => write!(fmt, "{s}"),
			Self::Bin(n) => write!(fmt, "%{n}"),
			Self::Hex(n) => write!(fmt, "${n}"),
			Self::Char(c) => write!(fmt, "'{c}'"),
			Self::Plus => write!(fmt, "+"),
			Self::Dash => write!(fmt, "-"),
			Self::Star => write!(fmt, "*"),
			Self::Slash => write!(fmt, "/"),
			Self::Percent => write!(fmt, "%"),
			Self::Amp => write!(fmt, "&"),
			Self::Pipe => write!(fmt, "|"),
			Self::Caret => write!(fmt, "^"),
			Self::Tilde => write!(fmt, "~"),
			Self::Shl => write!(fmt, "<<"),
			Self::Shr => write!(fmt, ">>"),
			Self::Less => write!(fmt, "<"),
			Self::Greater => write!(fmt, ">"),
			Self::Hash => write!(fmt, "#"),
			Self::OParen => write!(fmt, "("),
			Self::CParen => write!(fmt, ")"),
			Self::OBrack => write!(fmt, "["),
			Self::CBrack => write!(fmt, "]"),
			Self::Comma => write!(fmt, ","),
			Self::Colon => write!(fmt, ":"),
			Self::Eq => write!(fmt, "="),
		}
	}
}
