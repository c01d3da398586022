use crate::Result;
use directories::ProjectDirs;
use solsgame_types::{RecentGame, RECENT_GAMES_KEY, RECENT_GAMES_LIMIT};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::warn;

/// Platform data directory for the client, if the home directory is known.
pub fn default_data_dir() -> Option<PathBuf> {
    ProjectDirs::from("dev", "solsgame", "solsgame").map(|d| d.data_dir().to_path_buf())
}

/// Bounded list of resolved games in a JSON file, newest first.
#[derive(Clone, Debug)]
pub struct RecentGames {
    path: PathBuf,
    limit: usize,
}

impl RecentGames {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(format!("{RECENT_GAMES_KEY}.json")),
            limit: RECENT_GAMES_LIMIT,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the stored games. A missing file is empty; an unreadable one is
    /// logged and treated as empty.
    pub fn load(&self) -> Result<Vec<RecentGame>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let data = fs::read(&self.path)?;
        match serde_json::from_slice::<Vec<RecentGame>>(&data) {
            Ok(mut games) => {
                games.truncate(self.limit);
                Ok(games)
            }
            Err(err) => {
                warn!(path = %self.path.display(), ?err, "discarding unreadable recent games");
                Ok(Vec::new())
            }
        }
    }

    /// Prepends `game`, drops entries past the limit, and returns the new list.
    pub fn append(&self, game: RecentGame) -> Result<Vec<RecentGame>> {
        let mut games = self.load()?;
        games.insert(0, game);
        games.truncate(self.limit);
        self.save(&games)?;
        Ok(games)
    }

    fn save(&self, games: &[RecentGame]) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let data = serde_json::to_vec_pretty(games)?;
        let mut tmp_path = self.path.clone().into_os_string();
        tmp_path.push(".tmp");
        fs::write(&tmp_path, data)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solsgame_types::Game;

    fn game(timestamp_ms: u64) -> RecentGame {
        RecentGame {
            game: Game::DiceRoll,
            amount: 10_000_000,
            won: timestamp_ms % 2 == 0,
            timestamp_ms,
        }
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecentGames::new(dir.path());
        assert!(store.load().unwrap().is_empty());
        assert!(store.path().ends_with("solsgame.recent-games.json"));
    }

    #[test]
    fn test_append_is_bounded_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecentGames::new(dir.path());
        for i in 0..60 {
            store.append(game(i)).unwrap();
        }

        let games = RecentGames::new(dir.path()).load().unwrap();
        assert_eq!(games.len(), RECENT_GAMES_LIMIT);
        assert_eq!(games[0].timestamp_ms, 59);
        assert_eq!(games[RECENT_GAMES_LIMIT - 1].timestamp_ms, 10);
    }

    #[test]
    fn test_corrupt_file_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecentGames::new(dir.path());
        fs::write(store.path(), b"{not json").unwrap();
        assert!(store.load().unwrap().is_empty());

        let games = store.append(game(1)).unwrap();
        assert_eq!(games.len(), 1);
    }

    #[test]
    fn test_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecentGames::new(dir.path().join("nested").join("data")).with_limit(2);
        store.append(game(1)).unwrap();
        store.append(game(2)).unwrap();
        store.append(game(3)).unwrap();
        let games = store.load().unwrap();
        assert_eq!(
            games.iter().map(|g| g.timestamp_ms).collect::<Vec<_>>(),
            vec![3, 2]
        );
    }
}
