use std::collections::HashMap;
use std::fmt;

use miette::Diagnostic;
use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;
use thiserror::Error;
use tracing::{debug, instrument, trace};

use crate::features::Features;
use crate::operand::Operand;
use crate::register::{self, Register};

#[derive(Parser)]
#[grammar = "table.pest"]
struct TableParser;

const BUILTIN: &str = include_str!("mos6502.tbl");

#[derive(Debug, Error, Diagnostic)]
pub enum TableError {
	#[error("malformed template table")]
	#[diagnostic(code(mos_asm::table::syntax))]
	Syntax(#[from] Box<pest::error::Error<Rule>>),

	#[error("line {line}: unknown operand class '{name}'")]
	#[diagnostic(code(mos_asm::table::class), help("classes: imm8 imm16 imm24 imm8to16 imm16to24 pcrel8 pcrel16 addr8 addr16 addr24"))]
	UnknownClass {
		name: Box<str>,
		line: usize,
	},

	#[error("line {line}: unknown register '%{name}'")]
	#[diagnostic(code(mos_asm::table::register))]
	UnknownRegister {
		name: Box<str>,
		line: usize,
	},

	#[error("line {line}: unknown CPU feature '{name}'")]
	#[diagnostic(code(mos_asm::table::feature))]
	UnknownFeature {
		name: Box<str>,
		line: usize,
	},

	#[error("line {line}: opcode '${text}' is not a byte")]
	#[diagnostic(code(mos_asm::table::opcode))]
	Opcode {
		text: Box<str>,
		line: usize,
	},
}

/// What a template expects at one operand position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
	/// Token with this text, compared without case.
	Literal(Box<str>),
	Register(Register),
	Imm8,
	Imm16,
	Imm24,
	Imm8To16,
	Imm16To24,
	PcRel8,
	PcRel16,
	Addr8,
	Addr16,
	Addr24,
}

impl Shape {
	fn from_class(name: &str) -> Option<Self> {
		let shape = match name.to_ascii_lowercase().as_str() {
			"imm8" => Self::Imm8,
			"imm16" => Self::Imm16,
			"imm24" => Self::Imm24,
			"imm8to16" => Self::Imm8To16,
			"imm16to24" => Self::Imm16To24,
			"pcrel8" => Self::PcRel8,
			"pcrel16" => Self::PcRel16,
			"addr8" => Self::Addr8,
			"addr16" => Self::Addr16,
			"addr24" => Self::Addr24,
			_ => return None,
		};
		Some(shape)
	}

	pub fn matches(&self, operand: &Operand) -> bool {
		match self {
			Self::Literal(text) => operand.is_token(text),
			Self::Register(reg) => matches!(operand, Operand::Register { reg: r, .. } if r == reg),
			Self::Imm8 => operand.is_imm8(),
			Self::Imm16 => operand.is_imm16(),
			Self::Imm24 => operand.is_imm24(),
			Self::Imm8To16 => operand.is_imm8_to_16(),
			Self::Imm16To24 => operand.is_imm16_to_24(),
			Self::PcRel8 => operand.is_pcrel8(),
			Self::PcRel16 => operand.is_pcrel16(),
			Self::Addr8 => operand.is_addr8(),
			Self::Addr16 => operand.is_addr16(),
			Self::Addr24 => operand.is_addr24(),
		}
	}
}

impl fmt::Display for Shape {
	fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::Literal(text) => write!(fmt, "'{text}'"),
			Self::Register(reg) => write!(fmt, "%{reg}"),
			Self::Imm8 => write!(fmt, "imm8"),
			Self::Imm16 => write!(fmt, "imm16"),
			Self::Imm24 => write!(fmt, "imm24"),
			Self::Imm8To16 => write!(fmt, "imm8to16"),
			Self::Imm16To24 => write!(fmt, "imm16to24"),
			Self::PcRel8 => write!(fmt, "pcrel8"),
			Self::PcRel16 => write!(fmt, "pcrel16"),
			Self::Addr8 => write!(fmt, "addr8"),
			Self::Addr16 => write!(fmt, "addr16"),
			Self::Addr24 => write!(fmt, "addr24"),
		}
	}
}

/// One addressing mode of one instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
	/// Lower case.
	pub mnemonic: Box<str>,
	/// Operand shapes following the mnemonic.
	pub shapes: Vec<Shape>,
	pub opcode: u8,
	/// Features that all have to be enabled for the template to be used.
	pub requires: Features,
}

impl Template {
	pub fn new(mnemonic: &str, shapes: Vec<Shape>, opcode: u8, requires: Features) -> Self {
		Self {
			mnemonic: mnemonic.to_ascii_lowercase().into(),
			shapes,
			opcode,
			requires,
		}
	}

	pub fn is_enabled(&self, features: Features) -> bool {
		features.contains(self.requires)
	}
}

impl fmt::Display for Template {
	fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
		write!(fmt, "{}", self.mnemonic)?;
		for shape in &self.shapes {
			write!(fmt, " {shape}")?;
		}
		write!(fmt, " => ${:02x}", self.opcode)?;
		if !self.requires.is_empty() {
			write!(fmt, " : {}", self.requires.to_string().replace('+', " "))?;
		}
		Ok(())
	}
}

/// Read-only set of instruction templates, indexed by mnemonic.
#[derive(Debug, Clone, Default)]
pub struct TemplateDb {
	templates: Vec<Template>,
	by_mnemonic: HashMap<Box<str>, Vec<usize>>,
}

impl TemplateDb {
	pub fn new(templates: Vec<Template>) -> Self {
		let mut by_mnemonic: HashMap<Box<str>, Vec<usize>> = HashMap::new();
		for (idx, template) in templates.iter().enumerate() {
			by_mnemonic.entry(template.mnemonic.clone())
				.or_default()
				.push(idx);
		}
		Self {
			templates,
			by_mnemonic,
		}
	}

	/// The 6502 family table shipped with the assembler.
	pub fn builtin() -> Result<Self, TableError> {
		Self::parse(BUILTIN)
	}

	#[instrument(skip_all)]
	pub fn parse(input: &str) -> Result<Self, TableError> {
		let table = TableParser::parse(Rule::table, input)
			.map_err(|e| Box::new(e.renamed_rules(rename_rules)))?;
		let mut templates = Vec::new();
		for pair in table.flatten().filter(|pair| pair.as_rule() == Rule::entry) {
			let template = parse_entry(pair)?;
			trace!("{template}");
			templates.push(template);
		}
		debug!("loaded {} templates", templates.len());
		Ok(Self::new(templates))
	}

	/// Templates for a mnemonic in table order.
	pub fn lookup<'a>(&'a self, mnemonic: &str) -> impl Iterator<Item = &'a Template> + 'a {
		self.by_mnemonic.get(mnemonic.to_ascii_lowercase().as_str())
			.into_iter()
			.flatten()
			.map(|idx| &self.templates[*idx])
	}

	pub fn contains(&self, mnemonic: &str) -> bool {
		self.by_mnemonic.contains_key(mnemonic.to_ascii_lowercase().as_str())
	}

	pub fn len(&self) -> usize {
		self.templates.len()
	}

	pub fn is_empty(&self) -> bool {
		self.templates.is_empty()
	}
}

fn rename_rules(rule: &Rule) -> String {
	match rule {
		Rule::EOI => "end of table",
		Rule::entry | Rule::mnemonic => "template",
		Rule::literal | Rule::literal_text => "quoted literal",
		Rule::register | Rule::register_name => "register",
		Rule::class => "operand class",
		Rule::opcode | Rule::opcode_hex => "opcode",
		Rule::requires | Rule::feature => "feature list",
		_ => "table",
	}.to_owned()
}

fn parse_entry(entry: Pair<Rule>) -> Result<Template, TableError> {
	let line = entry.line_col().0;
	let mut mnemonic = "";
	let mut shapes = Vec::new();
	let mut opcode = 0;
	let mut requires = Features::empty();

	for pair in entry.into_inner() {
		match pair.as_rule() {
			Rule::mnemonic => mnemonic = pair.as_str(),
			Rule::literal => shapes.push(Shape::Literal(pair.into_inner().as_str().into())),
			Rule::register => {
				let name = pair.into_inner().as_str();
				let reg = register::resolve(name, Features::CANONICAL_REGISTER_NAMES_ONLY)
					.ok_or_else(|| TableError::UnknownRegister { name: name.into(), line })?;
				shapes.push(Shape::Register(reg));
			}
			Rule::class => {
				let name = pair.as_str();
				let shape = Shape::from_class(name)
					.ok_or_else(|| TableError::UnknownClass { name: name.into(), line })?;
				shapes.push(shape);
			}
			Rule::opcode => {
				let text = pair.into_inner().as_str();
				opcode = u8::from_str_radix(text, 16)
					.map_err(|_| TableError::Opcode { text: text.into(), line })?;
			}
			Rule::requires => {
				for feature in pair.into_inner() {
					let name = feature.as_str();
					requires |= Features::from_feature_name(name)
						.ok_or_else(|| TableError::UnknownFeature { name: name.into(), line })?;
				}
			}
			_ => unreachable!("{:?} inside a template", pair.as_rule()),
		}
	}

	Ok(Template::new(mnemonic, shapes, opcode, requires))
}
