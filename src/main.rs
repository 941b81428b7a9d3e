use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{ArgAction, Parser};
use miette::{miette, IntoDiagnostic, NamedSource, Report, WrapErr};
use tracing::info;
use tracing_subscriber::EnvFilter;

use mos_asm::{Assembler, Config, DelimiterPolicy, Features, TemplateDb};

/// Parse 65xx assembly and match every instruction against the template table.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
	/// Assembly source file
	input: PathBuf,

	/// CPU to assemble for (mos6502, mos6502x, mos65c02, mosr65c02, mosw65c02, mosw65816)
	#[arg(long, default_value = "mos6502")]
	cpu: Features,

	/// Additional CPU feature, may be repeated
	#[arg(long = "feature", value_name = "NAME")]
	features: Vec<Features>,

	/// Template table to use instead of the built-in one
	#[arg(long, value_name = "FILE")]
	table: Option<PathBuf>,

	/// What happens when no expression follows '(' or '[': fatal or fall-through
	#[arg(long, default_value = "fatal")]
	delimiter_policy: DelimiterPolicy,

	/// More logging, repeat for more detail
	#[arg(short, long, action = ArgAction::Count)]
	verbose: u8,
}

fn main() -> miette::Result<()> {
	let args = Args::parse();

	let level = match args.verbose {
		0 => "warn",
		1 => "info",
		2 => "debug",
		_ => "trace",
	};
	tracing_subscriber::fmt()
		.compact()
		.without_time()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
		.init();

	let db = match &args.table {
		Some(path) => {
			let text = fs::read_to_string(path)
				.into_diagnostic()
				.wrap_err_with(|| format!("unable to read template table '{}'", path.display()))?;
			TemplateDb::parse(&text)?
		}
		None => TemplateDb::builtin()?,
	};
	info!("{} templates", db.len());

	let features = args.features.iter()
		.fold(args.cpu, |acc, f| acc | *f);
	let config = Config::new(features).with_policy(args.delimiter_policy);
	info!("assembling for {features}");

	let source = fs::read_to_string(&args.input)
		.into_diagnostic()
		.wrap_err_with(|| format!("unable to read source file '{}'", args.input.display()))?;

	let assembler = Assembler::new(Arc::new(db), config);
	let out = assembler.assemble(&source);
	for statement in &out.statements {
		println!("{statement}");
	}

	if out.errors.is_empty() {
		return Ok(());
	}
	let name = args.input.display().to_string();
	let count = out.errors.len();
	for error in out.errors {
		let report = Report::new(error)
			.with_source_code(NamedSource::new(&name, source.clone()));
		eprintln!("{report:?}");
	}
	Err(miette!("{count} statement(s) failed"))
}
