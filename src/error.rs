use std::fmt;

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

use crate::features::Features;

/// What the parser was looking for when it gave up on a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
	Immediate,
	AfterParen,
	AfterBracket,
	Expression,
	CloseParen,
	CharCount,
	AbsoluteExpression,
	EndOfStatement,
	Statement,
}

impl fmt::Display for Expected {
	fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
		let s = match self {
			Self::Immediate => "immediate operand must be an expression evaluating to a value between 0 and 255 inclusive",
			Self::AfterParen => "expression expected after left parenthesis",
			Self::AfterBracket => "expression expected after left bracket",
			Self::Expression => "expression expected",
			Self::CloseParen => "expected ')'",
			Self::CharCount => "expected `, <char-count>`",
			Self::AbsoluteExpression => "expected absolute expression",
			Self::EndOfStatement => "expected end of statement",
			Self::Statement => "expected instruction, label or directive",
		};
		write!(fmt, "{s}")
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum Error {
	#[error("malformed numeric literal")]
	#[diagnostic(code(mos_asm::lex::number))]
	MalformedNumber {
		#[label("here")]
		span: SourceSpan,
	},

	#[error("numeric literal out of range")]
	#[diagnostic(code(mos_asm::lex::range))]
	LiteralRange {
		#[label("here")]
		span: SourceSpan,
	},

	#[error("{expected}")]
	#[diagnostic(code(mos_asm::syntax))]
	Syntax {
		expected: Expected,
		#[label("here")]
		span: SourceSpan,
	},

	#[error("unknown modifier")]
	#[diagnostic(code(mos_asm::modifier), help("known modifiers: lo, hi, mos8, mos13, mos16, mos16lo, mos16hi, mos24, mos24bank, mos24segment, mos24segmentlo, mos24segmenthi"))]
	UnknownModifier {
		name: Box<str>,
		#[label("not a relocation modifier")]
		span: SourceSpan,
	},

	#[error("char count out of range [1,8]")]
	#[diagnostic(code(mos_asm::range::char_count))]
	CharCountRange {
		count: i64,
		#[label("here")]
		span: SourceSpan,
	},

	#[error("out of range literal value")]
	#[diagnostic(code(mos_asm::range::literal))]
	LiteralWidth {
		#[label("does not fit the requested width")]
		span: SourceSpan,
	},

	#[error("unsupported directive")]
	#[diagnostic(code(mos_asm::directive))]
	UnsupportedDirective {
		name: Box<str>,
		#[label("here")]
		span: SourceSpan,
	},

	#[error("invalid instruction")]
	#[diagnostic(code(mos_asm::matcher::mnemonic))]
	UnknownMnemonic {
		#[label("unknown mnemonic")]
		span: SourceSpan,
	},

	#[error("instruction requires a CPU feature not currently enabled")]
	#[diagnostic(code(mos_asm::matcher::feature))]
	MissingFeature {
		missing: Features,
		#[label("here")]
		span: SourceSpan,
	},

	#[error("invalid operand for instruction")]
	#[diagnostic(code(mos_asm::matcher::operand))]
	InvalidOperand {
		#[label("here")]
		span: SourceSpan,
	},

	#[error("too few operands for instruction")]
	#[diagnostic(code(mos_asm::matcher::operand))]
	TooFewOperands {
		#[label("here")]
		span: SourceSpan,
	},

	#[error("operand must be an 8-bit address")]
	#[diagnostic(code(mos_asm::matcher::addr8))]
	InvalidAddr8 {
		#[label("here")]
		span: SourceSpan,
	},

	#[error("operand must be a 16-bit address")]
	#[diagnostic(code(mos_asm::matcher::addr16))]
	InvalidAddr16 {
		#[label("here")]
		span: SourceSpan,
	},

	#[error("operand must be an 8-bit PC relative address")]
	#[diagnostic(code(mos_asm::matcher::pcrel8))]
	InvalidPcRel8 {
		#[label("here")]
		span: SourceSpan,
	},

	#[error("operand must be an 8 to 16 bit value (between 256 and 65535 inclusive)")]
	#[diagnostic(code(mos_asm::matcher::imm8to16))]
	InvalidImm8To16 {
		#[label("here")]
		span: SourceSpan,
	},

	#[error("found some near misses")]
	#[diagnostic(code(mos_asm::matcher::near_miss))]
	NearMisses {
		#[label("no template matches this instruction exactly")]
		span: SourceSpan,
	},
}

impl Error {
	pub(crate) fn syntax(expected: Expected, span: SourceSpan) -> Self {
		Self::Syntax { expected, span }
	}

	/// Location the diagnostic is anchored at.
	pub fn span(&self) -> SourceSpan {
		match self {
			Self::MalformedNumber { span }
			| Self::LiteralRange { span }
			| Self::Syntax { span, .. }
			| Self::UnknownModifier { span, .. }
			| Self::CharCountRange { span, .. }
			| Self::LiteralWidth { span }
			| Self::UnsupportedDirective { span, .. }
			| Self::UnknownMnemonic { span }
			| Self::MissingFeature { span, .. }
			| Self::InvalidOperand { span }
			| Self::TooFewOperands { span }
			| Self::InvalidAddr8 { span }
			| Self::InvalidAddr16 { span }
			| Self::InvalidPcRel8 { span }
			| Self::InvalidImm8To16 { span }
			| Self::NearMisses { span } => *span,
		}
	}
}
