//! The game handle shared by the database, condition evaluator and sorter.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::conditions::ConditionEvaluator;
use crate::database::Database;

pub mod cache;
pub mod load_order;

pub use cache::GameCache;
pub use load_order::LoadOrderHandler;

/// The supported game engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameType {
	Tes4,
	Tes5,
	Tes5se,
	Tes5vr,
	Fo3,
	Fonv,
	Fo4,
	Fo4vr,
}

impl GameType {
	pub(crate) fn supports_light_plugins(self) -> bool {
		matches!(
			self,
			GameType::Tes5se | GameType::Tes5vr | GameType::Fo4 | GameType::Fo4vr
		)
	}
}

/// One installed game: its type, data directory, shared caches, metadata
/// database and load order handler.
pub struct Game {
	game_type: GameType,
	data_path: PathBuf,
	cache: Arc<GameCache>,
	load_order_handler: Arc<dyn LoadOrderHandler>,
	database: Database,
}

impl Game {
	pub fn new(
		game_type: GameType,
		data_path: impl Into<PathBuf>,
		load_order_handler: Arc<dyn LoadOrderHandler>,
	) -> Game {
		let data_path = data_path.into();
		let cache = Arc::new(GameCache::new());
		let condition_evaluator = Arc::new(ConditionEvaluator::new(
			game_type,
			data_path.clone(),
			Arc::clone(&cache),
			Arc::clone(&load_order_handler),
		));

		log::debug!(
			"Created game handle for data path {}",
			data_path.display()
		);

		Game {
			game_type,
			data_path,
			cache,
			load_order_handler,
			database: Database::new(condition_evaluator),
		}
	}

	/* Fields */

	pub fn game_type(&self) -> GameType {
		self.game_type
	}

	pub fn data_path(&self) -> &Path {
		&self.data_path
	}

	pub fn cache(&self) -> &GameCache {
		&self.cache
	}

	pub fn load_order_handler(&self) -> &dyn LoadOrderHandler {
		self.load_order_handler.as_ref()
	}

	pub fn database(&self) -> &Database {
		&self.database
	}

	pub fn database_mut(&mut self) -> &mut Database {
		&mut self.database
	}

	/// The current on-disk load order, earliest-loading plugin first.
	pub fn load_order(&self) -> Vec<String> {
		self.load_order_handler.load_order()
	}
}
