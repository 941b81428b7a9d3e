use std::fmt;
use std::sync::Arc;

use miette::SourceSpan;
use tracing::{debug, instrument, trace, warn};

pub mod cursor;
pub mod directive;
pub mod error;
pub mod expr;
pub mod features;
pub mod lexer;
pub mod matcher;
pub mod modifier;
pub mod operand;
pub mod parser;
pub mod register;
pub mod table;
pub mod tokens;

pub use cursor::Cursor;
pub use directive::{parse_addr_asciz, AddrAsciz};
pub use error::{Error, Expected};
pub use features::{Config, DelimiterPolicy, Features};
pub use matcher::{match_instruction, Instruction, MatchOutcome};
pub use modifier::{Expression, ModifierKind};
pub use operand::{Operand, RangeClass};
pub use parser::{parse_instruction_line, OperandList};
pub use register::Register;
pub use table::{Shape, TableError, Template, TemplateDb};

use tokens::Type as TT;

/// One successfully parsed source statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
	Label {
		name: Box<str>,
		span: SourceSpan,
	},
	Instruction(Instruction),
	AddrAsciz(AddrAsciz),
}

impl fmt::Display for Statement {
	fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::Label { name, .. } => write!(fmt, "{name}:"),
			Self::Instruction(ins) => {
				write!(fmt, "\t${:02x}\t{}", ins.template.opcode, ins.template.mnemonic)?;
				let mut prev = None;
				for operand in ins.operands.iter().skip(1) {
					write!(fmt, "{}{operand}", separator(prev, operand))?;
					prev = Some(operand);
				}
				Ok(())
			}
			Self::AddrAsciz(AddrAsciz::Bytes { bytes, .. }) => {
				write!(fmt, "\t{}\t{:02x?}", directive::ADDR_ASCIZ, bytes)
			}
			Self::AddrAsciz(AddrAsciz::Deferred { expr, chars, .. }) => {
				write!(fmt, "\t{}\t{expr}, {chars}", directive::ADDR_ASCIZ)
			}
		}
	}
}

/// What goes between two operands when printing. Delimiters hug their neighbours, and a comma
/// comes back wherever the parser dropped one.
fn separator(prev: Option<&Operand>, next: &Operand) -> &'static str {
	let Some(prev) = prev else {
		return " ";
	};
	let opens = ["#", "(", "["].iter().any(|t| prev.is_token(t));
	let closes = [")", "]"].iter().any(|t| next.is_token(t));
	if opens || closes { "" } else { ", " }
}

/// Everything that came out of one source file. Parsing continues past a bad statement, so
/// both lists can be non-empty.
#[derive(Debug, Default)]
pub struct Assembly {
	pub statements: Vec<Statement>,
	pub errors: Vec<Error>,
}

/// Turns source text into matched instructions, directive output and diagnostics.
///
/// The template table is shared, so several assemblers with different CPU configurations can
/// be built from one loaded table.
#[derive(Debug, Clone)]
pub struct Assembler {
	db: Arc<TemplateDb>,
	config: Config,
}

impl Assembler {
	pub fn new(db: Arc<TemplateDb>, config: Config) -> Self {
		Self {
			db,
			config,
		}
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn templates(&self) -> &TemplateDb {
		&self.db
	}

	#[instrument(skip_all)]
	pub fn assemble(&self, source: &str) -> Assembly {
		let mut out = Assembly::default();
		let tokens = match lexer::eval(source) {
			Ok(tokens) => tokens,
			Err(e) => {
				warn!("unable to lex source: {e}");
				out.errors.push(e);
				return out;
			}
		};
		trace!("tokens: {:?}", tokens.iter().map(|t| &t.tt).collect::<Vec<_>>());

		let mut cursor = Cursor::new(&tokens);
		while let Some(token) = cursor.peek() {
			if token.tt == TT::EndOfStatement {
				cursor.next();
				continue;
			}

			if let Some(label) = self.label(&mut cursor) {
				out.statements.push(label);
				continue;
			}

			match self.statement(&mut cursor) {
				Ok(statement) => {
					debug!("{statement}");
					out.statements.push(statement);
					cursor.next();
				}
				Err(e) => {
					warn!("{e}, skipping to next statement");
					out.errors.push(e);
					cursor.skip_statement();
				}
			}
		}

		debug!("{} statements, {} errors", out.statements.len(), out.errors.len());
		out
	}

	/// `name:`, which may be followed by another statement on the same line.
	fn label(&self, cursor: &mut Cursor) -> Option<Statement> {
		let token = cursor.peek()?;
		let name = token.ident()?;
		if cursor.peek_nth(1)?.tt != TT::Colon {
			return None;
		}
		cursor.next();
		cursor.next();
		trace!("found label: '{name}'");
		Some(Statement::Label {
			name: name.into(),
			span: token.span,
		})
	}

	/// Parses one directive or instruction, leaving the cursor on its end of statement.
	pub fn statement(&self, cursor: &mut Cursor) -> Result<Statement, Error> {
		let span = cursor.span();
		let Some(token) = cursor.next() else {
			return Err(Error::syntax(Expected::Statement, span));
		};
		let Some(name) = token.ident() else {
			return Err(Error::syntax(Expected::Statement, span));
		};

		if name.starts_with('.') {
			if !name.eq_ignore_ascii_case(directive::ADDR_ASCIZ) {
				return Err(Error::UnsupportedDirective { name: name.into(), span });
			}
			return parse_addr_asciz(cursor).map(Statement::AddrAsciz);
		}

		let operands = parse_instruction_line(token, cursor, &self.config)?;
		match_instruction(&operands, &self.db, self.config.features)
			.into_result(&operands)
			.map(Statement::Instruction)
	}
}
