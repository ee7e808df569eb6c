//! Lexer and recursive-descent parser for the condition language.
//!
//! ```text
//! expression := term ( 'or' term )*
//! term       := factor ( 'and' factor )*
//! factor     := 'not' factor | '(' expression ')' | atom
//! atom       := file("path") | active("path") | regex("regex")
//!             | many("regex") | many_active("regex")
//!             | checksum("path", hex) | version("path", "version", cmp)
//! ```
//!
//! Paths and regexes are validated while parsing, so an [`Expr`] can be
//! evaluated without re-checking them.

use std::path::PathBuf;

use regex::{Regex, RegexBuilder};

use crate::error::Error;
use crate::version::Comparator;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
	Or(Box<Expr>, Box<Expr>),
	And(Box<Expr>, Box<Expr>),
	Not(Box<Expr>),
	Atom(Atom),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Atom {
	File(String),
	Active(String),
	Regex(String),
	Many(String),
	ManyActive(String),
	Checksum(String, u32),
	Version(String, String, Comparator),
}

/// Rejects paths that could traverse out of the data directory: after
/// dropping `.` components, no `..` may directly follow another `..`.
pub(crate) fn validate_path(path: &str) -> crate::Result<()> {
	let mut previous = None;

	for component in path.split(|c| c == '/' || c == '\\') {
		if component.is_empty() || component == "." {
			continue;
		}

		if component == ".." && previous == Some("..") {
			return Err(Error::ConditionSyntax(format!(
				"invalid file path \"{path}\""
			)));
		}

		previous = Some(component);
	}

	Ok(())
}

/// Splits a regex string into a literal parent path and a compiled
/// filename regex.
///
/// Only the filename component may be a regex; a regex directory
/// component could force a scan of arbitrarily much of the data
/// directory, so the parent path must be literal.
pub(crate) fn split_regex(regex_string: &str) -> crate::Result<(PathBuf, Regex)> {
	let (parent, filename) = match regex_string.rfind('/') {
		Some(position) => (&regex_string[..position], &regex_string[position + 1..]),
		None => ("", regex_string),
	};

	validate_path(parent)?;

	/* Anchored so the regex must match the whole filename, not a
	substring of it. */
	let regex = RegexBuilder::new(&format!("^(?:{filename})$"))
		.case_insensitive(true)
		.build()
		.map_err(|error| {
			Error::ConditionSyntax(format!("invalid regex \"{filename}\": {error}"))
		})?;

	Ok((PathBuf::from(parent), regex))
}

pub(crate) fn parse_condition(source: &str) -> crate::Result<Expr> {
	let tokens = tokenise(source)?;
	let mut parser = Parser {
		source,
		tokens,
		position: 0,
	};

	let expression = parser.expression()?;

	if parser.position != parser.tokens.len() {
		return Err(parser.error("unexpected trailing input"));
	}

	Ok(expression)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
	Word(String),
	Str(String),
	Comparison(Comparator),
	OpenParen,
	CloseParen,
	Comma,
}

fn tokenise(source: &str) -> crate::Result<Vec<Token>> {
	let syntax_error = |reason: String| {
		Error::ConditionSyntax(format!(
			"failed to parse condition \"{source}\": {reason}"
		))
	};

	let mut tokens = Vec::new();
	let mut chars = source.chars().peekable();

	while let Some(&c) = chars.peek() {
		match c {
			c if c.is_whitespace() => {
				chars.next();
			}
			'(' => {
				chars.next();
				tokens.push(Token::OpenParen);
			}
			')' => {
				chars.next();
				tokens.push(Token::CloseParen);
			}
			',' => {
				chars.next();
				tokens.push(Token::Comma);
			}
			'"' => {
				chars.next();
				let mut value = String::new();
				loop {
					match chars.next() {
						Some('"') => break,
						Some(c) => value.push(c),
						None => return Err(syntax_error("unterminated string".into())),
					}
				}
				tokens.push(Token::Str(value));
			}
			'=' | '!' | '<' | '>' => {
				chars.next();
				let followed_by_equals = chars.peek() == Some(&'=');
				if followed_by_equals {
					chars.next();
				}
				let comparator = match (c, followed_by_equals) {
					('=', true) => Comparator::Equal,
					('!', true) => Comparator::NotEqual,
					('<', true) => Comparator::LessThanEqual,
					('>', true) => Comparator::GreaterThanEqual,
					('<', false) => Comparator::LessThan,
					('>', false) => Comparator::GreaterThan,
					_ => return Err(syntax_error(format!("unexpected character '{c}'"))),
				};
				tokens.push(Token::Comparison(comparator));
			}
			c if c.is_alphanumeric() || c == '_' => {
				let mut word = String::new();
				while let Some(&c) = chars.peek() {
					if c.is_alphanumeric() || c == '_' {
						word.push(c);
						chars.next();
					} else {
						break;
					}
				}
				tokens.push(Token::Word(word));
			}
			c => return Err(syntax_error(format!("unexpected character '{c}'"))),
		}
	}

	Ok(tokens)
}

struct Parser<'a> {
	source: &'a str,
	tokens: Vec<Token>,
	position: usize,
}

impl Parser<'_> {
	fn error(&self, reason: &str) -> Error {
		Error::ConditionSyntax(format!(
			"failed to parse condition \"{}\": {}",
			self.source, reason
		))
	}

	fn peek(&self) -> Option<&Token> {
		self.tokens.get(self.position)
	}

	fn advance(&mut self) -> Option<Token> {
		let token = self.tokens.get(self.position).cloned();
		if token.is_some() {
			self.position += 1;
		}
		token
	}

	fn consume_word(&mut self, word: &str) -> bool {
		if matches!(self.peek(), Some(Token::Word(w)) if w == word) {
			self.position += 1;
			true
		} else {
			false
		}
	}

	fn consume(&mut self, token: &Token) -> bool {
		if self.peek() == Some(token) {
			self.position += 1;
			true
		} else {
			false
		}
	}

	fn expect(&mut self, token: Token, description: &str) -> crate::Result<()> {
		if self.consume(&token) {
			Ok(())
		} else {
			Err(self.error(&format!("expected {description}")))
		}
	}

	fn expect_string(&mut self) -> crate::Result<String> {
		match self.advance() {
			Some(Token::Str(value)) => Ok(value),
			_ => Err(self.error("expected a quoted string")),
		}
	}

	fn expression(&mut self) -> crate::Result<Expr> {
		let mut expression = self.term()?;

		while self.consume_word("or") {
			let rhs = self.term()?;
			expression = Expr::Or(Box::new(expression), Box::new(rhs));
		}

		Ok(expression)
	}

	fn term(&mut self) -> crate::Result<Expr> {
		let mut term = self.factor()?;

		while self.consume_word("and") {
			let rhs = self.factor()?;
			term = Expr::And(Box::new(term), Box::new(rhs));
		}

		Ok(term)
	}

	fn factor(&mut self) -> crate::Result<Expr> {
		if self.consume_word("not") {
			return Ok(Expr::Not(Box::new(self.factor()?)));
		}

		if self.consume(&Token::OpenParen) {
			let expression = self.expression()?;
			self.expect(Token::CloseParen, "')'")?;
			return Ok(expression);
		}

		self.atom().map(Expr::Atom)
	}

	fn atom(&mut self) -> crate::Result<Atom> {
		let name = match self.advance() {
			Some(Token::Word(name)) => name,
			_ => return Err(self.error("expected a condition function")),
		};

		self.expect(Token::OpenParen, "'('")?;

		let atom = match name.as_str() {
			"file" => {
				let path = self.expect_string()?;
				validate_path(&path)?;
				Atom::File(path)
			}
			"active" => {
				let path = self.expect_string()?;
				validate_path(&path)?;
				Atom::Active(path)
			}
			"regex" => {
				let regex_string = self.expect_string()?;
				split_regex(&regex_string)?;
				Atom::Regex(regex_string)
			}
			"many" => {
				let regex_string = self.expect_string()?;
				split_regex(&regex_string)?;
				Atom::Many(regex_string)
			}
			"many_active" => {
				let regex_string = self.expect_string()?;
				split_regex(&regex_string)?;
				Atom::ManyActive(regex_string)
			}
			"checksum" => {
				let path = self.expect_string()?;
				validate_path(&path)?;
				self.expect(Token::Comma, "','")?;
				let crc = match self.advance() {
					Some(Token::Word(hex)) => u32::from_str_radix(&hex, 16)
						.map_err(|_| self.error(&format!("invalid checksum \"{hex}\"")))?,
					_ => return Err(self.error("expected a hexadecimal checksum")),
				};
				Atom::Checksum(path, crc)
			}
			"version" => {
				let path = self.expect_string()?;
				validate_path(&path)?;
				self.expect(Token::Comma, "','")?;
				let version = self.expect_string()?;
				self.expect(Token::Comma, "','")?;
				let comparator = match self.advance() {
					Some(Token::Comparison(comparator)) => comparator,
					_ => return Err(self.error("expected a comparison operator")),
				};
				Atom::Version(path, version, comparator)
			}
			_ => return Err(self.error(&format!("unknown condition function \"{name}\""))),
		};

		self.expect(Token::CloseParen, "')'")?;

		Ok(atom)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn file_atom(path: &str) -> Expr {
		Expr::Atom(Atom::File(path.to_string()))
	}

	#[test]
	fn parses_a_single_file_atom() {
		assert_eq!(
			file_atom("a.esp"),
			parse_condition("file(\"a.esp\")").unwrap()
		);
	}

	#[test]
	fn parses_checksum_and_version_atoms() {
		assert_eq!(
			Expr::Atom(Atom::Checksum("a.esp".into(), 0xDEADBEEF)),
			parse_condition("checksum(\"a.esp\", DEADBEEF)").unwrap()
		);
		assert_eq!(
			Expr::Atom(Atom::Version("a.esp".into(), "1.2".into(), Comparator::GreaterThanEqual)),
			parse_condition("version(\"a.esp\", \"1.2\", >=)").unwrap()
		);
	}

	#[test]
	fn and_binds_tighter_than_or() {
		let parsed =
			parse_condition("file(\"a.esp\") or file(\"b.esp\") and file(\"c.esp\")").unwrap();

		assert_eq!(
			Expr::Or(
				Box::new(file_atom("a.esp")),
				Box::new(Expr::And(
					Box::new(file_atom("b.esp")),
					Box::new(file_atom("c.esp"))
				))
			),
			parsed
		);
	}

	#[test]
	fn parentheses_override_precedence() {
		let parsed =
			parse_condition("( file(\"a.esp\") or file(\"b.esp\") ) and file(\"c.esp\")").unwrap();

		assert_eq!(
			Expr::And(
				Box::new(Expr::Or(
					Box::new(file_atom("a.esp")),
					Box::new(file_atom("b.esp"))
				)),
				Box::new(file_atom("c.esp"))
			),
			parsed
		);
	}

	#[test]
	fn not_applies_to_the_following_factor() {
		assert_eq!(
			Expr::Not(Box::new(file_atom("a.esp"))),
			parse_condition("not file(\"a.esp\")").unwrap()
		);
	}

	#[test]
	fn rejects_trailing_input() {
		assert!(parse_condition("file(\"a.esp\") file(\"b.esp\")").is_err());
	}

	#[test]
	fn rejects_unknown_functions() {
		assert!(parse_condition("exists(\"a.esp\")").is_err());
	}

	#[test]
	fn rejects_unterminated_strings() {
		assert!(parse_condition("file(\"a.esp)").is_err());
	}

	#[test]
	fn rejects_invalid_checksums() {
		assert!(parse_condition("checksum(\"a.esp\", XYZ)").is_err());
	}

	#[test]
	fn rejects_paths_with_consecutive_parent_references() {
		assert!(parse_condition("file(\"a/../../b.esp\")").is_err());
		assert!(parse_condition("file(\"../b.esp\")").is_ok());
	}

	#[test]
	fn rejects_invalid_regexes() {
		assert!(parse_condition("regex(\"(unclosed\")").is_err());
	}

	#[test]
	fn single_parent_reference_after_a_directory_is_fine() {
		assert!(validate_path("textures/../meshes/a.nif").is_ok());
		assert!(validate_path("textures/./../a.nif").is_ok());
		assert!(validate_path("a/../.././b").is_err());
	}

	#[test]
	fn split_regex_requires_a_literal_parent() {
		let (parent, regex) = split_regex(r"meshes/actor\d+\.nif").unwrap();

		assert_eq!(PathBuf::from("meshes"), parent);
		assert!(regex.is_match("Actor12.nif"));
		assert!(!regex.is_match("Actor12.nif.bak"));
	}

	#[test]
	fn split_regex_without_a_separator_scans_the_root() {
		let (parent, regex) = split_regex(r".*\.esp").unwrap();

		assert_eq!(PathBuf::new(), parent);
		assert!(regex.is_match("Anything.ESP"));
	}
}
