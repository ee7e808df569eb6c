//! Small helpers shared across the crate.

use std::cmp::Ordering;
use std::path::Path;

use crate::error::Error;
use crate::game::GameType;

/// Lowercases a filename for use as a case-insensitive identity key.
///
/// Every plugin and CRC lookup keys through this. Output strings keep
/// their original case.
pub(crate) fn normalise_filename(name: &str) -> String {
	name.to_lowercase()
}

pub(crate) fn filenames_equal(lhs: &str, rhs: &str) -> bool {
	normalise_filename(lhs) == normalise_filename(rhs)
}

pub(crate) fn compare_filenames(lhs: &str, rhs: &str) -> Ordering {
	normalise_filename(lhs).cmp(&normalise_filename(rhs))
}

/// Whether the filename carries a plugin extension for the given game.
/// Light plugins only exist for the newer engines.
pub(crate) fn has_plugin_file_extension(name: &str, game_type: GameType) -> bool {
	let name = normalise_filename(name);

	name.ends_with(".esp")
		|| name.ends_with(".esm")
		|| (game_type.supports_light_plugins() && name.ends_with(".esl"))
}

/// The path a plugin file is found at when a mod manager has "ghosted"
/// it, i.e. the filename with `.ghost` appended.
pub(crate) fn ghosted(path: &Path) -> std::path::PathBuf {
	let mut ghosted = path.to_path_buf().into_os_string();
	ghosted.push(".ghost");
	ghosted.into()
}

const CRC32_POLYNOMIAL: u32 = 0xEDB8_8320;

pub(crate) fn crc32(data: &[u8]) -> u32 {
	let mut crc = u32::MAX;
	for &byte in data {
		crc ^= u32::from(byte);
		for _ in 0..8 {
			if crc & 1 != 0 {
				crc = (crc >> 1) ^ CRC32_POLYNOMIAL;
			} else {
				crc >>= 1;
			}
		}
	}
	!crc
}

pub(crate) fn file_crc32(path: &Path) -> crate::Result<u32> {
	let data = std::fs::read(path).map_err(|source| Error::FileAccess {
		path: path.to_path_buf(),
		source,
	})?;

	Ok(crc32(&data))
}

#[cfg(test)]
mod test {
	use super::*;

	#[test] fn normalise_filename_lowercases_unicode() { assert_eq!("aufräumen.esp", normalise_filename("AufRäumen.ESP")) }
	#[test] fn filenames_equal_ignores_case() { assert!(filenames_equal("Skyrim.esm", "skyrim.ESM")) }
	#[test] fn compare_filenames_ignores_case() { assert_eq!(Ordering::Less, compare_filenames("alpha.esp", "Beta.esp")) }

	#[test]
	fn plugin_extensions_depend_on_game() {
		assert!(has_plugin_file_extension("a.ESP", GameType::Tes4));
		assert!(has_plugin_file_extension("a.esm", GameType::Tes4));
		assert!(!has_plugin_file_extension("a.esl", GameType::Tes4));
		assert!(has_plugin_file_extension("a.esl", GameType::Fo4));
		assert!(!has_plugin_file_extension("a.bsa", GameType::Fo4));
	}

	#[test]
	fn crc32_matches_the_reference_check_value() {
		assert_eq!(0xCBF4_3926, crc32(b"123456789"));
	}

	#[test]
	fn crc32_of_empty_input_is_zero() {
		assert_eq!(0, crc32(b""));
	}
}
