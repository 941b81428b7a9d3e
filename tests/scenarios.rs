use std::error::Error as StdError;
use std::sync::Arc;

use mos_asm::lexer;
use mos_asm::{
	match_instruction, parse_addr_asciz, parse_instruction_line, Assembler, Config, Cursor, Error,
	Expected, Expression, Features, MatchOutcome, ModifierKind, Operand, OperandList, Register,
	Shape, Statement, TemplateDb,
};

type TestResult = Result<(), Box<dyn StdError>>;

fn line(input: &str, config: &Config) -> Result<OperandList, Error> {
	let tokens = lexer::eval(input)?;
	let mut cursor = Cursor::new(&tokens);
	let mnemonic = cursor.next().unwrap();
	parse_instruction_line(mnemonic, &mut cursor, config)
}

fn matched_opcode(outcome: MatchOutcome) -> Option<u8> {
	match outcome {
		MatchOutcome::Matched(ins) => Some(ins.template.opcode),
		_ => None,
	}
}

#[test]
fn immediate_indexed_beats_plain_immediate() -> TestResult {
	let db = TemplateDb::parse("\
lda '#' imm8 => $a9
lda '#' imm8 %x => $01
")?;
	let ops = line("LDA #$10,X", &Config::default())?;
	let outcome = match_instruction(&ops, &db, Features::MOS6502);
	assert_eq!(matched_opcode(outcome), Some(0x01));
	Ok(())
}

#[test]
fn low_byte_of_label_is_not_a_16_bit_address() -> TestResult {
	let ops = line("STA (<label),y", &Config::default())?;
	assert!(ops[0].is_token("sta"));
	assert!(ops[1].is_token("("));
	assert!(matches!(
		&ops[2],
		Operand::Immediate { expr: Expression::Modified { kind: ModifierKind::Addr16Low, .. }, .. }
	));
	assert!(ops[3].is_token(")"));
	assert!(matches!(ops[4], Operand::Register { reg: Register::Y, .. }));

	let db = TemplateDb::parse("sta '(' imm8to16 ')' %y => $91")?;
	let outcome = match_instruction(&ops, &db, Features::MOS6502);
	assert_eq!(outcome, MatchOutcome::InvalidOperand { index: 2, expected: Some(Shape::Imm8To16) });
	assert_eq!(outcome.into_result(&ops), Err(Error::InvalidImm8To16 { span: (5, 6).into() }));
	Ok(())
}

#[test]
fn low_byte_modifier_fits_8_bit_template() -> TestResult {
	let db = TemplateDb::parse("lda '#' imm8 => $a9")?;
	let ops = line("lda #lo($1234)", &Config::default())?;
	assert_eq!(matched_opcode(match_instruction(&ops, &db, Features::MOS6502)), Some(0xA9));
	Ok(())
}

#[test]
fn immediate_boundaries() -> TestResult {
	let db = TemplateDb::parse("\
lda '#' imm8 => $a9
ldx imm16 => $ae
")?;
	let config = Config::default();
	let opcode = |input: &str| -> Result<Option<u8>, Error> {
		let ops = line(input, &config)?;
		Ok(matched_opcode(match_instruction(&ops, &db, Features::MOS6502)))
	};
	assert_eq!(opcode("lda #0")?, Some(0xA9));
	assert_eq!(opcode("lda #255")?, Some(0xA9));
	assert_eq!(opcode("lda #256")?, None);
	assert_eq!(opcode("lda #-1")?, None);
	assert_eq!(opcode("ldx 65535")?, Some(0xAE));
	assert_eq!(opcode("ldx 65536")?, None);
	Ok(())
}

#[test]
fn register_aliases() -> Result<(), Error> {
	let loose = Config::default();
	let strict = Config::new(Features::MOS6502 | Features::CANONICAL_REGISTER_NAMES_ONLY);
	assert_eq!(mos_asm::register::resolve("rc7", loose.features), Some(Register::Rc(7)));
	assert_eq!(mos_asm::register::resolve("rc7", strict.features), None);
	assert_eq!(mos_asm::register::resolve("__RC7", strict.features), Some(Register::Rc(7)));

	let ops = line("lda $10,Y", &strict)?;
	assert!(matches!(ops[2], Operand::Register { reg: Register::Y, .. }));
	Ok(())
}

#[test]
fn addr_asciz_char_count() -> Result<(), Error> {
	let parse = |input: &str| -> Result<_, Error> {
		let tokens = lexer::eval(input)?;
		parse_addr_asciz(&mut Cursor::new(&tokens))
	};
	assert!(matches!(parse("$1234, 0"), Err(Error::CharCountRange { count: 0, .. })));
	assert!(matches!(parse("$1234, 9"), Err(Error::CharCountRange { count: 9, .. })));
	assert_eq!(parse("4660, 4")?.size(), 5);
	Ok(())
}

#[test]
fn builtin_table_program() -> Result<(), mos_asm::TableError> {
	let db = Arc::new(TemplateDb::builtin()?);
	let src = "\
; copy a page
start:
	ldx #0
loop:	lda (<src),y
	sta $0400,x
	inx
	bne loop
	rol a
	.mos_addr_asciz start, 5
	jmp start
";
	let out = Assembler::new(db.clone(), Config::default()).assemble(src);
	assert!(out.errors.is_empty(), "{:?}", out.errors);
	let opcodes: Vec<u8> = out.statements.iter()
		.filter_map(|s| match s {
			Statement::Instruction(ins) => Some(ins.template.opcode),
			_ => None,
		})
		.collect();
	assert_eq!(opcodes, [0xA2, 0xB1, 0x9D, 0xE8, 0xD0, 0x2A, 0x4C]);

	let out = Assembler::new(db, Config::default()).assemble("stz $10\nwai\nlda [$10]\n");
	assert!(matches!(out.errors[0], Error::MissingFeature { missing: Features::MOS65C02, .. }));
	assert!(matches!(out.errors[1], Error::MissingFeature { .. }));
	// without the 65816 `[` is a plain token, so the indirect long template is the furthest fit
	assert_eq!(out.errors[2], Error::InvalidAddr8 { span: (17, 3).into() });
	Ok(())
}

#[test]
fn unknown_modifier_in_immediate() {
	let err = line("lda #bogus(1)", &Config::default()).unwrap_err();
	assert_eq!(err, Error::UnknownModifier { name: "bogus".into(), span: (5, 5).into() });
	let err = line("lda #", &Config::default()).unwrap_err();
	assert_eq!(err, Error::Syntax { expected: Expected::Immediate, span: (5, 0).into() });
}
