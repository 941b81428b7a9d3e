use std::iter::Peekable;
use std::str::CharIndices;

use tracing::trace;

use crate::error::Error;
use crate::tokens::{Token, Type};

type Chars<'a> = Peekable<CharIndices<'a>>;

fn skip_while(input: &str, chars: &mut Chars, pred: fn(char) -> bool) -> usize {
	loop {
		match chars.peek() {
			Some(&(idx, ch)) => {
				if !pred(ch) {
					return idx;
				}
				chars.next();
			}
			None => return input.len(),
		}
	}
}

fn tokenize<'a>(input: &'a str, start: usize, chars: &mut Chars, pred: fn(char) -> bool) -> &'a str {
	let end = skip_while(input, chars, pred);
	&input[start..end]
}

fn is_ident_char(ch: char) -> bool {
	ch.is_ascii_alphanumeric() || ['_', '.', '@'].contains(&ch)
}

fn is_hex_digit(ch: char) -> bool {
	ch.is_ascii_hexdigit() || '_' == ch
}

fn is_bin_digit(ch: char) -> bool {
	['0', '1', '_'].contains(&ch)
}

fn is_dec_digit(ch: char) -> bool {
	ch.is_ascii_digit() || '_' == ch
}

/// Whether the last token closes an operand, making a following `%` the modulo operator. The
/// name that starts a statement is not an operand.
fn ends_operand(results: &[Token]) -> bool {
	let Some((last, before)) = results.split_last() else {
		return false;
	};
	match last.tt {
		Type::Bin(_) | Type::Dec(_) | Type::Hex(_) | Type::Char(_) | Type::CParen | Type::CBrack => true,
		Type::Ident(_) => !matches!(
			before.last().map(|tok| &tok.tt),
			None | Some(Type::EndOfStatement | Type::Colon)
		),
		_ => false,
	}
}

/// Scans digits after a radix prefix of `prefix_len` bytes starting at `start`.
fn radix_literal(
	input: &str,
	start: usize,
	prefix_len: usize,
	chars: &mut Chars,
	pred: fn(char) -> bool,
	tt: fn(Box<str>) -> Type,
) -> Result<Token, Error> {
	let digits = tokenize(input, start + prefix_len, chars, pred);
	// trailing letters glued onto the digits (e.g. `$12g4`) make the whole literal bad
	let tail = tokenize(input, start + prefix_len + digits.len(), chars, is_ident_char);
	let len = prefix_len + digits.len() + tail.len();
	if digits.is_empty() || !tail.is_empty() {
		return Err(Error::MalformedNumber { span: (start, len).into() });
	}
	Ok(Token::new(tt(digits.into()), start, len))
}

/// Splits assembly source into tokens. Every line ends with an end-of-statement token, and so
/// does the input as a whole.
pub fn eval(input: &str) -> Result<Vec<Token>, Error> {
	let mut results = Vec::new();
	let mut chars = input.char_indices().peekable();

	while let Some(&(idx, ch)) = chars.peek() {
		let single = |tt| Token::new(tt, idx, 1);
		match ch {
			' ' | '\t' | '\r' => {
				chars.next();
			}
			'\n' => {
				chars.next();
				results.push(single(Type::EndOfStatement));
			}
			';' => {
				skip_while(input, &mut chars, |ch| ch != '\n');
			}
			'$' => {
				chars.next();
				results.push(radix_literal(input, idx, 1, &mut chars, is_hex_digit, Type::Hex)?);
			}
			'%' => {
				chars.next();
				match chars.peek() {
					Some((_, '0' | '1')) if !ends_operand(&results) => {
						results.push(radix_literal(input, idx, 1, &mut chars, is_bin_digit, Type::Bin)?);
					}
					_ => results.push(single(Type::Percent)),
				}
			}
			'0'..='9' => {
				let rest = &input[idx..];
				let token = if rest.starts_with("0x") || rest.starts_with("0X") {
					chars.next();
					chars.next();
					radix_literal(input, idx, 2, &mut chars, is_hex_digit, Type::Hex)?
				} else if (rest.starts_with("0b") || rest.starts_with("0B"))
					&& rest[2..].starts_with(['0', '1'])
				{
					chars.next();
					chars.next();
					radix_literal(input, idx, 2, &mut chars, is_bin_digit, Type::Bin)?
				} else {
					radix_literal(input, idx, 0, &mut chars, is_dec_digit, Type::Dec)?
				};
				results.push(token);
			}
			'\'' => {
				chars.next();
				let c = chars.next().map(|(_, c)| c);
				let closed = matches!(chars.peek(), Some(&(_, '\'')));
				let token = match c {
					Some(c) if closed && c != '\'' && c != '\n' => {
						chars.next();
						Token::new(Type::Char(c), idx, 2 + c.len_utf8())
					}
					_ => {
						let end = skip_while(input, &mut chars, |ch| !ch.is_whitespace());
						return Err(Error::MalformedNumber { span: (idx, end - idx).into() });
					}
				};
				results.push(token);
			}
			'<' | '>' => {
				chars.next();
				let doubled = matches!(chars.peek(), Some(&(_, next)) if next == ch);
				if doubled {
					chars.next();
					let tt = if ch == '<' { Type::Shl } else { Type::Shr };
					results.push(Token::new(tt, idx, 2));
				} else {
					let tt = if ch == '<' { Type::Less } else { Type::Greater };
					results.push(single(tt));
				}
			}
			c if c.is_ascii_alphabetic() || c == '_' || c == '.' => {
				let token = tokenize(input, idx, &mut chars, is_ident_char);
				results.push(Token::new(Type::Ident(token.into()), idx, token.len()));
			}
			_ => {
				chars.next();
				let tt = match ch {
					'+' => Type::Plus,
					'-' => Type::Dash,
					'*' => Type::Star,
					'/' => Type::Slash,
					'&' => Type::Amp,
					'|' => Type::Pipe,
					'^' => Type::Caret,
					'~' => Type::Tilde,
					'#' => Type::Hash,
					'(' => Type::OParen,
					')' => Type::CParen,
					'[' => Type::OBrack,
					']' => Type::CBrack,
					',' => Type::Comma,
					':' => Type::Colon,
					'=' => Type::Eq,
					other => Type::Unknown(other.to_string().into()),
				};
				results.push(Token::new(tt, idx, ch.len_utf8()));
			}
		}
	}

	if results.last().map_or(true, |tok| tok.tt != Type::EndOfStatement) {
		results.push(Token::new(Type::EndOfStatement, input.len(), 0));
	}

	trace!("lexed {} tokens", results.len());
	Ok(results)
}

#[cfg(test)]
mod can_lex {
	use super::*;

	type TestResult = Result<(), Error>;

	fn types(input: &str) -> Result<Vec<Type>, Error> {
		Ok(eval(input)?
			.into_iter()
			.map(|tok| tok.tt)
			.collect())
	}

	fn match_token(input: &str, tt: Type) -> TestResult {
		let out = types(input)?;
		assert_eq!(out, vec![tt, Type::EndOfStatement], "{input}");
		Ok(())
	}

	#[test]
	fn ident() -> TestResult {
		match_token("StUfF", Type::Ident("StUfF".into()))?;
		match_token(".mos_addr_asciz", Type::Ident(".mos_addr_asciz".into()))?;
		match_token("__rc4", Type::Ident("__rc4".into()))
	}

	#[test]
	fn number_dec() -> TestResult {
		match_token("34", Type::Dec("34".into()))
	}

	#[test]
	fn number_hex() -> TestResult {
		match_token("$2e", Type::Hex("2e".into()))?;
		match_token("0x2E", Type::Hex("2E".into()))
	}

	#[test]
	fn number_bin() -> TestResult {
		match_token("%101", Type::Bin("101".into()))?;
		match_token("0b101", Type::Bin("101".into()))
	}

	#[test]
	fn char_literal() -> TestResult {
		match_token("'A'", Type::Char('A'))
	}

	#[test]
	fn percent_is_modulo_without_digits() -> TestResult {
		let out = types("7 % x")?;
		assert_eq!(out[1], Type::Percent);
		Ok(())
	}

	#[test]
	fn percent_after_operand_is_modulo() -> TestResult {
		assert_eq!(types("7 %10")?, vec![Type::Dec("7".into()), Type::Percent, Type::Dec("10".into()), Type::EndOfStatement]);
		assert_eq!(types("(x)%1")?[3], Type::Percent);
		assert_eq!(types("lda size%10")?[2], Type::Percent);
		Ok(())
	}

	#[test]
	fn percent_starting_operand_is_binary() -> TestResult {
		assert_eq!(types("and %101")?[1], Type::Bin("101".into()));
		assert_eq!(types("loop: ora %11")?[3], Type::Bin("11".into()));
		assert_eq!(types("lda #%1\neor %10")?[5], Type::Bin("10".into()));
		Ok(())
	}

	#[test]
	fn number_neg() -> TestResult {
		let out = types("-52")?;
		assert_eq!(out, vec![Type::Dash, Type::Dec("52".into()), Type::EndOfStatement]);
		Ok(())
	}

	#[test]
	fn malformed_hex() {
		let err = eval("lda $").unwrap_err();
		assert_eq!(err, Error::MalformedNumber { span: (4, 1).into() });
		let err = eval("lda $12g4").unwrap_err();
		assert_eq!(err, Error::MalformedNumber { span: (4, 5).into() });
	}

	#[test]
	fn shifts_and_modifiers() -> TestResult {
		let out = types("<a >b c<<2 d>>1")?;
		assert_eq!(out[0], Type::Less);
		assert_eq!(out[2], Type::Greater);
		assert_eq!(out[5], Type::Shl);
		assert_eq!(out[8], Type::Shr);
		Ok(())
	}

	#[test]
	fn comments_and_lines() -> TestResult {
		let out = types("lda #1 ; load\nrts")?;
		assert_eq!(out, vec![
			Type::Ident("lda".into()),
			Type::Hash,
			Type::Dec("1".into()),
			Type::EndOfStatement,
			Type::Ident("rts".into()),
			Type::EndOfStatement,
		]);
		Ok(())
	}

	#[test]
	fn spans() -> TestResult {
		let out = eval("  sta ($10),y")?;
		assert_eq!(out[0].span, (2, 3).into());
		assert_eq!(out[2].span, (7, 3).into());
		assert_eq!(out[5].span, (12, 1).into());
		Ok(())
	}

	#[test]
	fn unknown() -> TestResult {
		match_token("?", Type::Unknown("?".into()))
	}
}
