//! Lenient version parsing and comparison.
//!
//! Plugin versions in the wild are only loosely semver-shaped: they carry
//! `v` prefixes, date stamps, and trailing letters. Rather than reject
//! anything, versions are compared by walking alternating non-numeric and
//! numeric spans, so that `1.2.10` sorts above `1.2.4` and `1.2a` below
//! `1.2b`.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Version {
	text: String,
}

impl Version {
	pub fn new(text: impl Into<String>) -> Self {
		let text = text.into().trim().to_string();

		/* A "v1.2"-style prefix would otherwise compare lexically against
		unprefixed versions. */
		let stripped = match text.strip_prefix('v').or_else(|| text.strip_prefix('V')) {
			Some(rest) if rest.starts_with(|c: char| c.is_ascii_digit()) => Some(rest.to_string()),
			_ => None,
		};

		Version {
			text: stripped.unwrap_or(text),
		}
	}

	pub fn as_str(&self) -> &str {
		&self.text
	}

	pub fn is_empty(&self) -> bool {
		self.text.is_empty()
	}
}

impl From<&str> for Version {
	fn from(value: &str) -> Self {
		Version::new(value)
	}
}

fn split_leading(s: &str, numeric: bool) -> (&str, &str) {
	match s.find(|c: char| c.is_ascii_digit() != numeric) {
		Some(i) => s.split_at(i),
		None => (s, ""),
	}
}

/// Compares two digit spans as numbers of arbitrary length.
fn compare_digits(lhs: &str, rhs: &str) -> Ordering {
	let lhs = lhs.trim_start_matches('0');
	let rhs = rhs.trim_start_matches('0');

	lhs.len().cmp(&rhs.len()).then_with(|| lhs.cmp(rhs))
}

impl Ord for Version {
	fn cmp(&self, other: &Self) -> Ordering {
		let mut lhs = self.text.as_str();
		let mut rhs = other.text.as_str();

		while !lhs.is_empty() && !rhs.is_empty() {
			let (lhs_prefix, lhs_rest) = split_leading(lhs, false);
			let (rhs_prefix, rhs_rest) = split_leading(rhs, false);

			match lhs_prefix.cmp(rhs_prefix) {
				Ordering::Equal => {}
				ord => return ord,
			}

			let (lhs_digits, lhs_rest) = split_leading(lhs_rest, true);
			let (rhs_digits, rhs_rest) = split_leading(rhs_rest, true);

			match compare_digits(lhs_digits, rhs_digits) {
				Ordering::Equal => {}
				ord => return ord,
			}

			lhs = lhs_rest;
			rhs = rhs_rest;
		}

		/* A version that continues past a common prefix is the later one,
		e.g. 1.2 < 1.2.3. */
		lhs.len().cmp(&rhs.len())
	}
}

impl PartialOrd for Version {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl PartialEq for Version {
	fn eq(&self, other: &Self) -> bool {
		self.cmp(other) == Ordering::Equal
	}
}

impl Eq for Version {}

impl std::fmt::Display for Version {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.text)
	}
}

/// A comparison operator appearing in a `version(...)` condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
	Equal,
	NotEqual,
	LessThan,
	GreaterThan,
	LessThanEqual,
	GreaterThanEqual,
}

impl Comparator {
	pub fn compare(self, lhs: &Version, rhs: &Version) -> bool {
		match self {
			Comparator::Equal => lhs == rhs,
			Comparator::NotEqual => lhs != rhs,
			Comparator::LessThan => lhs < rhs,
			Comparator::GreaterThan => lhs > rhs,
			Comparator::LessThanEqual => lhs <= rhs,
			Comparator::GreaterThanEqual => lhs >= rhs,
		}
	}
}

impl std::fmt::Display for Comparator {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let symbol = match self {
			Comparator::Equal => "==",
			Comparator::NotEqual => "!=",
			Comparator::LessThan => "<",
			Comparator::GreaterThan => ">",
			Comparator::LessThanEqual => "<=",
			Comparator::GreaterThanEqual => ">=",
		};
		f.write_str(symbol)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test] fn versions_are_not_compared_lexically() { assert!(Version::new("1.2.4.0") < Version::new("1.2.10.0")) }
	#[test] fn short_version_is_lt() { assert!(Version::new("1.2") < Version::new("1.2.3")) }
	#[test] fn identical_versions_are_eq() { assert!(Version::new("1.2.3") == Version::new("1.2.3")) }
	#[test] fn higher_version_is_gt() { assert!(Version::new("1.2.4") > Version::new("1.2.3")) }
	#[test] fn v_prefix_is_stripped() { assert!(Version::new("v1.2.3") == Version::new("1.2.3")) }
	#[test] fn textual_prefix_is_compared_lexically() { assert!(Version::new("a1.2.3") < Version::new("b1.2.3")) }
	#[test] fn trailing_non_digit_is_compared() { assert!(Version::new("1.2a") < Version::new("1.2b")) }
	#[test] fn leading_zeroes_do_not_matter() { assert!(Version::new("1.02") == Version::new("1.2")) }
	#[test] fn empty_version_is_lowest() { assert!(Version::new("") < Version::new("0.1")) }
	#[test] fn very_long_numbers_compare_by_magnitude() { assert!(Version::new("20250101000000001") < Version::new("20250101000000002")) }

	#[test]
	fn comparators_apply_to_versions() {
		let old = Version::new("1.0");
		let new = Version::new("2.0");

		assert!(Comparator::LessThan.compare(&old, &new));
		assert!(Comparator::NotEqual.compare(&old, &new));
		assert!(Comparator::GreaterThanEqual.compare(&new, &old));
		assert!(!Comparator::Equal.compare(&old, &new));
	}
}
