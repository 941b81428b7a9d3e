use miette::SourceSpan;
use tracing::{debug, trace};

use crate::error::Error;
use crate::features::Features;
use crate::operand::Operand;
use crate::parser::OperandList;
use crate::table::{Shape, Template, TemplateDb};

/// An instruction whose operands fit one template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
	pub template: Template,
	pub operands: OperandList,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
	Matched(Instruction),
	/// A template fits but needs features that are off.
	MissingFeature {
		index: usize,
		missing: Features,
	},
	/// No template fits, `index` is the operand position to blame.
	InvalidOperand {
		index: usize,
		expected: Option<Shape>,
	},
	UnknownMnemonic,
	/// Several templates are one operand away from fitting, at different positions.
	AmbiguousNearMiss,
}

/// How one template compares against an operand list.
struct Comparison {
	/// Operand positions (mnemonic is 0) that don't fit.
	mismatches: Vec<usize>,
}

impl Comparison {
	fn new(template: &Template, operands: &[Operand]) -> Self {
		let positions = operands.len().max(template.shapes.len() + 1);
		let mismatches = (1..positions)
			.filter(|&idx| {
				match (template.shapes.get(idx - 1), operands.get(idx)) {
					(Some(shape), Some(operand)) => !shape.matches(operand),
					_ => true,
				}
			})
			.collect();
		Self { mismatches }
	}

	fn is_match(&self) -> bool {
		self.mismatches.is_empty()
	}

	fn first_mismatch(&self) -> Option<usize> {
		self.mismatches.first().copied()
	}
}

/// Picks the template an operand list belongs to.
///
/// Enabled templates are tried in table order and the first one that fits wins. When none fits,
/// the outcome explains why, preferring a feature problem over an operand problem, and a single
/// near miss over the operand that got furthest.
pub fn match_instruction(operands: &OperandList, db: &TemplateDb, features: Features) -> MatchOutcome {
	let Some(Operand::Token { text: mnemonic, .. }) = operands.first() else {
		return MatchOutcome::UnknownMnemonic;
	};
	if !db.contains(mnemonic) {
		debug!("unknown mnemonic '{mnemonic}'");
		return MatchOutcome::UnknownMnemonic;
	}

	let compared: Vec<_> = db.lookup(mnemonic)
		.map(|template| (template, Comparison::new(template, operands)))
		.collect();

	if let Some((template, _)) = compared.iter()
		.find(|(t, c)| c.is_match() && t.is_enabled(features))
	{
		debug!("matched '{template}'");
		return MatchOutcome::Matched(Instruction {
			template: (*template).clone(),
			operands: operands.clone(),
		});
	}

	if let Some((template, _)) = compared.iter().find(|(_, c)| c.is_match()) {
		let missing = template.requires.difference(features);
		debug!("'{template}' needs {missing}");
		return MatchOutcome::MissingFeature { index: 0, missing };
	}

	let near_misses: Vec<_> = compared.iter()
		.filter(|(t, c)| t.is_enabled(features) && c.mismatches.len() == 1)
		.map(|(t, c)| (*t, c.mismatches[0]))
		.collect();
	if let Some(&(template, index)) = near_misses.first() {
		if near_misses.iter().any(|(_, idx)| *idx != index) {
			debug!("{} near misses at different operands", near_misses.len());
			return MatchOutcome::AmbiguousNearMiss;
		}
		trace!("near miss '{template}' at operand {index}");
		return MatchOutcome::InvalidOperand {
			index,
			expected: template.shapes.get(index - 1).cloned(),
		};
	}

	let mut furthest: Option<(&Template, usize)> = None;
	for (template, comparison) in &compared {
		if let Some(index) = comparison.first_mismatch() {
			if furthest.map_or(true, |(_, best)| index > best) {
				furthest = Some((*template, index));
			}
		}
	}
	let (index, expected) = furthest
		.map_or((1, None), |(t, idx)| (idx, t.shapes.get(idx - 1).cloned()));
	trace!("furthest operand reached: {index}");
	MatchOutcome::InvalidOperand { index, expected }
}

impl MatchOutcome {
	/// Turns a failed match into a diagnostic for `operands`.
	pub fn into_result(self, operands: &[Operand]) -> Result<Instruction, Error> {
		let mnemonic_span = operands.first()
			.map_or_else(|| SourceSpan::from((0, 0)), Operand::span);
		match self {
			Self::Matched(ins) => Ok(ins),
			Self::UnknownMnemonic => Err(Error::UnknownMnemonic { span: mnemonic_span }),
			Self::AmbiguousNearMiss => Err(Error::NearMisses { span: mnemonic_span }),
			Self::MissingFeature { index, missing } => {
				let span = operands.get(index).map_or(mnemonic_span, Operand::span);
				Err(Error::MissingFeature { missing, span })
			}
			Self::InvalidOperand { index, expected } => {
				let Some(operand) = operands.get(index) else {
					let end = operands.last()
						.map_or(0, |op| op.span().offset() + op.span().len());
					return Err(Error::TooFewOperands { span: (end, 0).into() });
				};
				let span = operand.span();
				Err(match expected {
					Some(Shape::Addr8) => Error::InvalidAddr8 { span },
					Some(Shape::Addr16) => Error::InvalidAddr16 { span },
					Some(Shape::PcRel8) => Error::InvalidPcRel8 { span },
					Some(Shape::Imm8To16) => Error::InvalidImm8To16 { span },
					_ => Error::InvalidOperand { span },
				})
			}
		}
	}
}
