// src/pipeline/lookup.rs

//! Storage-backed identifier lookups handed to the extractors.

use std::collections::HashMap;

use crate::error::{AppError, Result};
use crate::models::{FieldValue, Player, normalize_position};
use crate::services::{AthleteRef, CodeLookup, PlayerLookup};
use crate::storage::Storage;

/// Team code → stored team id.
#[derive(Debug, Clone, Default)]
pub struct TeamDirectory {
    ids: HashMap<String, i64>,
}

impl TeamDirectory {
    /// Load the team table. An empty table is a broken dependency.
    pub fn load(storage: &dyn Storage) -> Result<Self> {
        let rows = storage.query("SELECT team_id, team_code FROM teams", &[])?;
        let ids: HashMap<String, i64> = rows
            .iter()
            .filter_map(|r| Some((r.str("team_code")?.to_string(), r.i64("team_id")?)))
            .collect();
        if ids.is_empty() {
            return Err(AppError::dependency("teams", "team table is empty"));
        }
        Ok(Self { ids })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl CodeLookup for TeamDirectory {
    fn team_id(&self, code: &str) -> Option<i64> {
        self.ids.get(code).copied()
    }
}

/// Player resolution for one season's stat sources.
///
/// Matches on PFR id first, then (name, team), then name alone. Athletes
/// that match nobody are stored as minimal players so their stats are kept.
pub struct PlayerDirectory<'a> {
    storage: &'a mut dyn Storage,
    teams: &'a TeamDirectory,
    by_pfr: HashMap<String, i64>,
    by_name_team: HashMap<(String, Option<i64>), i64>,
    by_name: HashMap<String, i64>,
    created: usize,
}

impl<'a> PlayerDirectory<'a> {
    pub fn load(storage: &'a mut dyn Storage, teams: &'a TeamDirectory, season: i32) -> Result<Self> {
        let rows = storage.query(
            "SELECT player_id, name, team_id, pfr_player_id FROM players \
             WHERE season_extracted = ?1",
            &[FieldValue::from(season)],
        )?;
        let mut by_pfr = HashMap::new();
        let mut by_name_team = HashMap::new();
        let mut by_name = HashMap::new();
        for row in &rows {
            let (Some(id), Some(name)) = (row.i64("player_id"), row.str("name")) else {
                continue;
            };
            if let Some(pfr_id) = row.str("pfr_player_id") {
                by_pfr.insert(pfr_id.to_string(), id);
            }
            by_name_team.insert((name.to_string(), row.i64("team_id")), id);
            by_name.entry(name.to_string()).or_insert(id);
        }
        log::debug!("Loaded {} players for {}", by_name.len(), season);
        Ok(Self {
            storage,
            teams,
            by_pfr,
            by_name_team,
            by_name,
            created: 0,
        })
    }

    /// Players stored on the fly.
    pub fn created(&self) -> usize {
        self.created
    }

    fn create(&mut self, athlete: &AthleteRef, team_id: Option<i64>, season: i32) -> Option<i64> {
        let position = normalize_position(&athlete.position);
        if position.is_empty() {
            return None;
        }
        let mut player = Player::stub(&athlete.name, &position, team_id, season);
        player.pfr_player_id = athlete.pfr_id.clone();
        match self.storage.upsert(
            "players",
            &player.to_record(),
            &["name", "position", "season_extracted"],
        ) {
            Ok(id) => {
                log::debug!("Created player {} ({}) with id {}", athlete.name, position, id);
                self.created += 1;
                if let Some(pfr_id) = &athlete.pfr_id {
                    self.by_pfr.insert(pfr_id.clone(), id);
                }
                self.by_name_team.insert((athlete.name.clone(), team_id), id);
                self.by_name.entry(athlete.name.clone()).or_insert(id);
                Some(id)
            }
            Err(e) => {
                log::warn!("Could not create player {}: {}", athlete.name, e);
                None
            }
        }
    }
}

impl PlayerLookup for PlayerDirectory<'_> {
    fn player_id(&mut self, athlete: &AthleteRef, season: i32) -> Option<i64> {
        let team_id = athlete
            .team_code
            .as_deref()
            .and_then(|code| self.teams.team_id(code));
        let known = athlete
            .pfr_id
            .as_ref()
            .and_then(|pfr_id| self.by_pfr.get(pfr_id))
            .or_else(|| self.by_name_team.get(&(athlete.name.clone(), team_id)))
            .or_else(|| self.by_name.get(&athlete.name))
            .copied();
        match known {
            Some(id) => Some(id),
            None => self.create(athlete, team_id, season),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Record, Team};
    use crate::storage::SqliteStorage;

    fn storage() -> SqliteStorage {
        let mut storage = SqliteStorage::open_in_memory().unwrap();
        storage.initialize_schema().unwrap();
        let teams: Vec<Record> = Team::static_teams().iter().map(Team::to_record).collect();
        storage.bulk_insert("teams", &teams).unwrap();
        storage
    }

    #[test]
    fn empty_team_table_is_a_dependency_failure() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        storage.initialize_schema().unwrap();
        assert!(matches!(
            TeamDirectory::load(&storage),
            Err(AppError::Dependency { .. })
        ));
    }

    #[test]
    fn players_resolve_or_get_created() {
        let mut storage = storage();
        let teams = TeamDirectory::load(&storage).unwrap();
        assert_eq!(teams.team_id("KC"), Some(16));
        storage
            .insert("players", &Player::stub("Travis Kelce", "TE", Some(16), 2023).to_record())
            .unwrap();

        let mut directory = PlayerDirectory::load(&mut storage, &teams, 2023).unwrap();
        let kelce = AthleteRef {
            name: "Travis Kelce".into(),
            position: "TE".into(),
            team_code: Some("KC".into()),
            ..Default::default()
        };
        assert_eq!(directory.player_id(&kelce, 2023), Some(1));

        let rookie = AthleteRef {
            name: "New Guy".into(),
            position: "OLB".into(),
            team_code: Some("KC".into()),
            ..Default::default()
        };
        let id = directory.player_id(&rookie, 2023).unwrap();
        assert_eq!(directory.player_id(&rookie, 2023), Some(id));
        assert_eq!(directory.created(), 1);

        let nameless = AthleteRef {
            name: "Ghost".into(),
            ..Default::default()
        };
        assert_eq!(directory.player_id(&nameless, 2023), None);
        drop(directory);

        let rows = storage
            .query("SELECT position FROM players WHERE name = 'New Guy'", &[])
            .unwrap();
        assert_eq!(rows[0].str("position"), Some("LB"));
    }

    #[test]
    fn pfr_id_wins_over_name() {
        let mut storage = storage();
        let teams = TeamDirectory::load(&storage).unwrap();
        let mut mahomes = Player::stub("Patrick Mahomes", "QB", Some(16), 2023);
        mahomes.pfr_player_id = Some("MahoPa00".into());
        storage.insert("players", &mahomes.to_record()).unwrap();

        let mut directory = PlayerDirectory::load(&mut storage, &teams, 2023).unwrap();
        // leaderboards mark honors after the name
        let listed = AthleteRef {
            pfr_id: Some("MahoPa00".into()),
            name: "Patrick Mahomes*".into(),
            position: "QB".into(),
            ..Default::default()
        };
        assert_eq!(directory.player_id(&listed, 2023), Some(1));

        let newcomer = AthleteRef {
            pfr_id: Some("NewmGu00".into()),
            name: "Guy Newman".into(),
            position: "WR".into(),
            ..Default::default()
        };
        let id = directory.player_id(&newcomer, 2023).unwrap();
        let renamed = AthleteRef {
            name: "G. Newman".into(),
            ..newcomer.clone()
        };
        assert_eq!(directory.player_id(&renamed, 2023), Some(id));
        drop(directory);

        let rows = storage
            .query(
                "SELECT pfr_player_id FROM players WHERE player_id = ?1",
                &[FieldValue::from(id)],
            )
            .unwrap();
        assert_eq!(rows[0].str("pfr_player_id"), Some("NewmGu00"));
    }
}
