use tracing::trace;

use crate::cursor::Cursor;
use crate::error::{Error, Expected};
use crate::features::{Config, DelimiterPolicy, Features};
use crate::modifier;
use crate::operand::Operand;
use crate::register;
use crate::tokens::{Token, Type as TT};

/// Mnemonic followed by the operands of one instruction line.
pub type OperandList = Vec<Operand>;

/// Parses the operands following `mnemonic` up to the end of the statement. The end of
/// statement token itself is left for the caller.
///
/// 65xx addressing modes are written `mne #expr`, `mne (expr),y`, `mne expr,x`, `mne a` and, on
/// the 65816, `mne [expr]`. The shapes are only loosely checked here, the matcher decides which
/// addressing mode a list of operands actually is.
pub fn parse_instruction_line(mnemonic: &Token, cursor: &mut Cursor, config: &Config) -> Result<OperandList, Error> {
	let name = mnemonic.ident()
		.ok_or_else(|| Error::syntax(Expected::Statement, mnemonic.span))?;
	let mut line = LineParser {
		cursor,
		config,
		operands: vec![Operand::token(name, mnemonic.span)],
		first: true,
	};
	line.run()?;
	trace!("operands: {:?}", line.operands);
	Ok(line.operands)
}

struct LineParser<'c, 'a> {
	cursor: &'c mut Cursor<'a>,
	config: &'c Config,
	operands: OperandList,
	/// Still looking at the first operand, where `a` and bare expressions are allowed.
	first: bool,
}

impl LineParser<'_, '_> {
	fn run(&mut self) -> Result<(), Error> {
		while let Some(token) = self.cursor.peek() {
			if token.tt == TT::EndOfStatement {
				break;
			}

			if token.tt == TT::Hash {
				self.push_token(token);
				self.immediate()?;
				self.first = false;
				continue;
			}

			let delimiter = match token.tt {
				TT::OParen => Some(Expected::AfterParen),
				TT::OBrack if self.config.features.contains(Features::W65816) => Some(Expected::AfterBracket),
				_ => None,
			};
			if let Some(expected) = delimiter {
				self.push_token(token);
				if self.delimited(expected)? {
					self.first = false;
					continue;
				}
				// fell through, the rest of the rules see what follows the delimiter
				if self.cursor.at_end_of_statement() {
					break;
				}
			}

			self.operand()?;
		}
		Ok(())
	}

	fn operand(&mut self) -> Result<(), Error> {
		let Some(token) = self.cursor.peek() else {
			return Ok(());
		};

		if token.tt == TT::Comma {
			self.cursor.next();
			return Ok(());
		}

		if self.first && token.is_ident("a") {
			self.cursor.next();
			self.operands.push(Operand::token("a", token.span));
			self.first = false;
			return Ok(());
		}

		let reg = token.ident()
			.and_then(|name| register::resolve(name, self.config.features))
			.filter(|reg| reg.is_operand_class());
		if let Some(reg) = reg {
			self.cursor.next();
			self.operands.push(Operand::Register { reg, span: token.span });
			return Ok(());
		}

		if self.first {
			let start = self.cursor.position();
			match self.expression() {
				Ok(()) => {
					self.first = false;
					return Ok(());
				}
				Err(Error::Syntax { .. }) => self.cursor.rewind(start),
				Err(e) => return Err(e),
			}
		}
		self.first = false;

		self.push_token(token);
		Ok(())
	}

	/// Operand after `#`, which has to be an expression.
	fn immediate(&mut self) -> Result<(), Error> {
		self.expression()
			.map_err(|e| match e {
				Error::Syntax { span, .. } => Error::syntax(Expected::Immediate, span),
				e => e,
			})
	}

	/// Operand after `(` or `[`. Returns `false` when the expression failed and the delimiter
	/// policy lets the line continue from just after the delimiter.
	fn delimited(&mut self, expected: Expected) -> Result<bool, Error> {
		let start = self.cursor.position();
		match self.expression() {
			Ok(()) => Ok(true),
			Err(Error::Syntax { span, .. }) => match self.config.delimiter_policy {
				DelimiterPolicy::Fatal => Err(Error::syntax(expected, span)),
				DelimiterPolicy::FallThrough => {
					trace!("{expected}, continuing after delimiter");
					self.cursor.rewind(start);
					Ok(false)
				}
			},
			Err(e) => Err(e),
		}
	}

	fn expression(&mut self) -> Result<(), Error> {
		let start = self.cursor.position();
		let expr = modifier::parse_expression(self.cursor)?;
		let span = self.cursor.span_since(start);
		self.operands.push(Operand::Immediate { expr, span });
		Ok(())
	}

	fn push_token(&mut self, token: &Token) {
		self.cursor.next();
		self.operands.push(Operand::token(token.tt.to_string(), token.span));
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::expr::Expr;
	use crate::lexer;
	use crate::modifier::{Expression, ModifierKind};
	use crate::register::Register;

	fn parse_with(input: &str, config: Config) -> Result<OperandList, Error> {
		let tokens = lexer::eval(input)?;
		let mut cursor = Cursor::new(&tokens);
		let mnemonic = cursor.next().unwrap();
		let operands = parse_instruction_line(mnemonic, &mut cursor, &config)?;
		assert!(cursor.at_end_of_statement());
		Ok(operands)
	}

	fn parse(input: &str) -> Result<OperandList, Error> {
		parse_with(input, Config::default())
	}

	fn shape(operands: &[Operand]) -> Vec<String> {
		operands.iter()
			.map(|op| match op {
				Operand::Token { text, .. } => format!("T:{text}"),
				Operand::Register { reg, .. } => format!("R:{reg}"),
				Operand::Immediate { expr, .. } => format!("I:{expr}"),
			})
			.collect()
	}

	#[test]
	fn implied() -> Result<(), Error> {
		assert_eq!(shape(&parse("rts")?), ["T:rts"]);
		Ok(())
	}

	#[test]
	fn immediate_indexed() -> Result<(), Error> {
		let ops = parse("LDA #$10,X")?;
		assert_eq!(shape(&ops), ["T:LDA", "T:#", "I:16", "R:x"]);
		assert_eq!(ops[2].span(), (5, 3).into());
		Ok(())
	}

	#[test]
	fn indirect_indexed() -> Result<(), Error> {
		let ops = parse("STA (<label),y")?;
		assert_eq!(shape(&ops), ["T:STA", "T:(", "I:mos16lo(label)", "T:)", "R:y"]);
		assert_eq!(
			ops[2],
			Operand::Immediate {
				expr: Expression::modified(ModifierKind::Addr16Low, Expr::Symbol("label".into()), false),
				span: (5, 6).into(),
			},
		);
		Ok(())
	}

	#[test]
	fn indexed_indirect() -> Result<(), Error> {
		assert_eq!(shape(&parse("lda ($10,x)")?), ["T:lda", "T:(", "I:16", "R:x", "T:)"]);
		Ok(())
	}

	#[test]
	fn accumulator() -> Result<(), Error> {
		assert_eq!(shape(&parse("ROL A")?), ["T:ROL", "T:a"]);
		Ok(())
	}

	#[test]
	fn absolute_indexed() -> Result<(), Error> {
		assert_eq!(shape(&parse("lda table+2,y")?), ["T:lda", "I:(table + 2)", "R:y"]);
		Ok(())
	}

	#[test]
	fn registers_outside_operand_class_are_expressions() -> Result<(), Error> {
		assert_eq!(shape(&parse("jmp __rc4")?), ["T:jmp", "I:__rc4"]);
		Ok(())
	}

	#[test]
	fn bracket_needs_65816() -> Result<(), Error> {
		let w65816 = Config::new(Features::for_cpu("mosw65816").unwrap());
		assert_eq!(shape(&parse_with("lda [$10],y", w65816)?), ["T:lda", "T:[", "I:16", "T:]", "R:y"]);
		assert_eq!(shape(&parse("lda [$10]")?), ["T:lda", "T:[", "T:$10", "T:]"]);
		Ok(())
	}

	#[test]
	fn immediate_requires_expression() {
		let err = parse("lda #,x").unwrap_err();
		assert_eq!(err, Error::syntax(Expected::Immediate, (5, 1).into()));
	}

	#[test]
	fn unknown_modifier_is_fatal() {
		let err = parse("lda bogus(1)").unwrap_err();
		assert_eq!(err, Error::UnknownModifier { name: "bogus".into(), span: (4, 5).into() });
		let err = parse("lda (bogus(1)),y").unwrap_err();
		assert!(matches!(err, Error::UnknownModifier { .. }));
	}

	#[test]
	fn delimiter_policy() -> Result<(), Error> {
		let err = parse("jmp (,x)").unwrap_err();
		assert_eq!(err, Error::syntax(Expected::AfterParen, (5, 1).into()));

		let fall_through = Config::default().with_policy(DelimiterPolicy::FallThrough);
		let ops = parse_with("jmp (,x)", fall_through)?;
		assert_eq!(shape(&ops), ["T:jmp", "T:(", "R:x", "T:)"]);
		assert_eq!(shape(&parse_with("jmp (", fall_through)?), ["T:jmp", "T:("]);
		Ok(())
	}

	#[test]
	fn bracket_delimiter_policy() -> Result<(), Error> {
		let w65816 = Config::new(Features::for_cpu("mosw65816").unwrap());
		let err = parse_with("lda [,x]", w65816).unwrap_err();
		assert_eq!(err, Error::syntax(Expected::AfterBracket, (5, 1).into()));

		let fall_through = w65816.with_policy(DelimiterPolicy::FallThrough);
		assert_eq!(shape(&parse_with("lda [,x]", fall_through)?), ["T:lda", "T:[", "R:x", "T:]"]);
		Ok(())
	}

	#[test]
	fn first_position_fallback_keeps_tokens() -> Result<(), Error> {
		assert_eq!(shape(&parse("brk )")?), ["T:brk", "T:)"]);
		Ok(())
	}

	#[test]
	fn register_only_after_first() -> Result<(), Error> {
		let ops = parse("lda $1234,x")?;
		assert_eq!(ops[2], Operand::Register { reg: Register::X, span: (10, 1).into() });
		Ok(())
	}
}
