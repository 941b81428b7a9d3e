use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;

bitflags! {
	/// CPU features and assembler switches that gate templates and register names.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
	pub struct Features: u32 {
		const MOS6502 = 1 << 0;
		/// Undocumented NMOS opcodes.
		const MOS6502X = 1 << 1;
		const MOS65C02 = 1 << 2;
		/// Rockwell bit instructions (BBR/BBS/RMB/SMB).
		const R65C02 = 1 << 3;
		/// WDC additions (WAI/STP).
		const W65C02 = 1 << 4;
		/// 16-bit extended addressing, `[dp]` indirect long.
		const W65816 = 1 << 5;
		/// Only accept canonical register names, never the short aliases.
		const CANONICAL_REGISTER_NAMES_ONLY = 1 << 16;
	}
}

const FEATURE_NAMES: &[(&str, Features)] = &[
	("mos6502", Features::MOS6502),
	("mos6502x", Features::MOS6502X),
	("mos65c02", Features::MOS65C02),
	("mosr65c02", Features::R65C02),
	("mosw65c02", Features::W65C02),
	("mosw65816", Features::W65816),
	("canonical-register-names-only", Features::CANONICAL_REGISTER_NAMES_ONLY),
	("alt-register-names-only", Features::CANONICAL_REGISTER_NAMES_ONLY),
];

impl Features {
	/// Looks up a single feature by name, e.g. `mosw65816`.
	pub fn from_feature_name(name: &str) -> Option<Self> {
		FEATURE_NAMES.iter()
			.find(|(n, _)| n.eq_ignore_ascii_case(name))
			.map(|(_, f)| *f)
	}

	/// The feature set implied by a CPU name.
	pub fn for_cpu(cpu: &str) -> Option<Self> {
		let base = Self::MOS6502;
		let cmos = base | Self::MOS65C02;
		let cpu = match cpu.to_ascii_lowercase().as_str() {
			"mos6502" => base,
			"mos6502x" => base | Self::MOS6502X,
			"mos65c02" => cmos,
			"mosr65c02" => cmos | Self::R65C02,
			"mosw65c02" => cmos | Self::R65C02 | Self::W65C02,
			"mosw65816" => cmos | Self::W65C02 | Self::W65816,
			_ => return None,
		};
		Some(cpu)
	}

	fn feature_name(self) -> Option<&'static str> {
		FEATURE_NAMES.iter()
			.find(|(_, f)| *f == self)
			.map(|(n, _)| *n)
	}
}

impl Default for Features {
	fn default() -> Self {
		Self::MOS6502
	}
}

impl FromStr for Features {
	type Err = String;

	/// Accepts a CPU name or a `+`-separated list of feature names.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if let Some(cpu) = Self::for_cpu(s) {
			return Ok(cpu);
		}
		s.split('+')
			.filter(|part| !part.is_empty())
			.try_fold(Self::empty(), |acc, part| {
				Self::from_feature_name(part.trim())
					.map(|f| acc | f)
					.ok_or_else(|| format!("unknown CPU feature '{part}'"))
			})
	}
}

impl fmt::Display for Features {
	fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
		let mut first = true;
		for flag in self.iter() {
			if !first {
				write!(fmt, "+")?;
			}
			first = false;
			match flag.feature_name() {
				Some(name) => write!(fmt, "{name}")?,
				None => write!(fmt, "{:#x}", flag.bits())?,
			}
		}
		Ok(())
	}
}

/// What happens when the expression after `(` or `[` fails to parse.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum DelimiterPolicy {
	/// The statement is rejected.
	#[default]
	Fatal,
	/// The cursor returns to just after the delimiter and the remaining operand rules run.
	FallThrough,
}

impl FromStr for DelimiterPolicy {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"fatal" => Ok(Self::Fatal),
			"fall-through" | "fallthrough" => Ok(Self::FallThrough),
			_ => Err(format!("unknown delimiter policy '{s}', expected 'fatal' or 'fall-through'")),
		}
	}
}

/// Everything that changes how a line is parsed and matched.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Config {
	pub features: Features,
	pub delimiter_policy: DelimiterPolicy,
}

impl Config {
	pub fn new(features: Features) -> Self {
		Self {
			features,
			..Self::default()
		}
	}

	pub fn with_policy(mut self, delimiter_policy: DelimiterPolicy) -> Self {
		self.delimiter_policy = delimiter_policy;
		self
	}
}
