//! SQLite storage backend.

use std::path::Path;

use rusqlite::{Connection, params_from_iter};

use crate::error::{AppError, Result};
use crate::models::{FieldValue, Record};
use crate::storage::{Storage, schema};

/// Single-connection SQLite store.
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Open (or create) the database file, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        log::debug!("Opened database {:?}", path);
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply the schema. Idempotent.
    pub fn initialize_schema(&self) -> Result<()> {
        schema::create_tables(&self.conn)?;
        log::info!("Database schema initialized");
        Ok(())
    }

    /// Row count of a table.
    pub fn count(&self, table: &str) -> Result<i64> {
        check_identifier(table)?;
        let sql = format!("SELECT COUNT(*) FROM {table}");
        Ok(self.conn.query_row(&sql, [], |row| row.get(0))?)
    }

    /// Run a write statement, returning the number of changed rows.
    pub fn execute(&mut self, sql: &str, params: &[FieldValue]) -> Result<usize> {
        Ok(self.conn.execute(sql, params_from_iter(params.iter()))?)
    }
}

impl Storage for SqliteStorage {
    fn insert(&mut self, table: &str, record: &Record) -> Result<i64> {
        let sql = insert_sql("INSERT", table, record)?;
        self.conn
            .execute(&sql, params_from_iter(record.values()))?;
        Ok(self.conn.last_insert_rowid())
    }

    fn bulk_insert(&mut self, table: &str, records: &[Record]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        for record in records {
            let sql = insert_sql("INSERT OR IGNORE", table, record)?;
            let mut stmt = tx.prepare_cached(&sql)?;
            inserted += stmt.execute(params_from_iter(record.values()))?;
        }
        tx.commit()?;
        log::debug!(
            "{}: {} of {} rows inserted",
            table,
            inserted,
            records.len()
        );
        Ok(inserted)
    }

    fn upsert(&mut self, table: &str, record: &Record, conflict_keys: &[&str]) -> Result<i64> {
        if conflict_keys.is_empty() {
            return Err(AppError::storage(format!("upsert into {table} without conflict keys")));
        }
        for key in conflict_keys {
            check_identifier(key)?;
            if record.get(key).is_none() {
                return Err(AppError::storage(format!(
                    "conflict key '{key}' missing from {table} record"
                )));
            }
        }

        let updates: Vec<String> = record
            .columns()
            .filter(|c| !conflict_keys.contains(c))
            .map(|c| format!("{c} = excluded.{c}"))
            .collect();
        // A no-op update still lets RETURNING report the existing row
        let updates = if updates.is_empty() {
            format!("{0} = excluded.{0}", conflict_keys[0])
        } else {
            updates.join(", ")
        };
        let sql = format!(
            "{} ON CONFLICT ({}) DO UPDATE SET {} RETURNING rowid",
            insert_sql("INSERT", table, record)?,
            conflict_keys.join(", "),
            updates
        );
        Ok(self
            .conn
            .query_row(&sql, params_from_iter(record.values()), |row| row.get(0))?)
    }

    fn delete(&mut self, table: &str, key: &Record) -> Result<usize> {
        check_identifier(table)?;
        if key.is_empty() {
            return Err(AppError::storage(format!("delete from {table} without a key")));
        }
        let mut conditions = Vec::new();
        for (i, column) in key.columns().enumerate() {
            check_identifier(column)?;
            conditions.push(format!("{column} = ?{}", i + 1));
        }
        let sql = format!("DELETE FROM {table} WHERE {}", conditions.join(" AND "));
        Ok(self.conn.execute(&sql, params_from_iter(key.values()))?)
    }

    fn query(&self, sql: &str, params: &[FieldValue]) -> Result<Vec<Record>> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let rows = stmt.query_map(params_from_iter(params.iter()), |row| {
            let mut record = Record::new();
            for (i, column) in columns.iter().enumerate() {
                record.set(column.as_str(), FieldValue::from(row.get_ref(i)?));
            }
            Ok(record)
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

fn insert_sql(verb: &str, table: &str, record: &Record) -> Result<String> {
    check_identifier(table)?;
    if record.is_empty() {
        return Err(AppError::storage(format!("empty record for {table}")));
    }
    let columns: Vec<&str> = record.columns().collect();
    for column in &columns {
        check_identifier(column)?;
    }
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
    Ok(format!(
        "{verb} INTO {table} ({}) VALUES ({})",
        columns.join(", "),
        placeholders.join(", ")
    ))
}

/// Table and column names are interpolated into SQL, so only plain
/// identifiers are accepted.
fn check_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(AppError::storage(format!("invalid identifier '{name}'")))
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::models::{
        DefensiveStats, Game, GameType, Player, StatBody, StatKey, StatLine, Team,
    };

    fn storage() -> SqliteStorage {
        let storage = SqliteStorage::open_in_memory().unwrap();
        storage.initialize_schema().unwrap();
        storage
    }

    #[test]
    fn bulk_insert_ignores_duplicates() {
        let mut storage = storage();
        let teams: Vec<Record> = Team::static_teams().iter().map(Team::to_record).collect();
        assert_eq!(storage.bulk_insert("teams", &teams).unwrap(), 32);
        assert_eq!(storage.bulk_insert("teams", &teams).unwrap(), 0);
        assert_eq!(storage.count("teams").unwrap(), 32);
    }

    #[test]
    fn upsert_returns_same_id() {
        let mut storage = storage();
        let mut team = Team::static_teams().remove(0).to_record();
        let id = storage.upsert("teams", &team, &["team_code"]).unwrap();
        team.set("color", "97233f");
        let again = storage.upsert("teams", &team, &["team_code"]).unwrap();
        assert_eq!(id, again);

        let rows = storage
            .query(
                "SELECT team_id, color FROM teams WHERE team_code = ?1",
                &[FieldValue::from("ARI")],
            )
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].i64("team_id"), Some(id));
        assert_eq!(rows[0].str("color"), Some("97233f"));
    }

    #[test]
    fn insert_returns_generated_id() {
        let mut storage = storage();
        let record = Record::new()
            .with("stage", "teams")
            .with("inserted", 32i64);
        let first = storage.insert("data_quality_log", &record).unwrap();
        let second = storage.insert("data_quality_log", &record).unwrap();
        assert_eq!(second, first + 1);
    }

    #[test]
    fn delete_matches_every_key_column() {
        let mut storage = storage();
        let teams: Vec<Record> = Team::static_teams().iter().map(Team::to_record).collect();
        storage.bulk_insert("teams", &teams).unwrap();

        let miss = Record::new().with("team_code", "KC").with("conference", "NFC");
        assert_eq!(storage.delete("teams", &miss).unwrap(), 0);
        let hit = Record::new().with("team_code", "KC").with("conference", "AFC");
        assert_eq!(storage.delete("teams", &hit).unwrap(), 1);
        assert_eq!(storage.count("teams").unwrap(), 31);

        assert!(storage.delete("teams", &Record::new()).is_err());
    }

    #[test]
    fn stat_line_round_trips_through_query() {
        let mut storage = storage();
        let teams: Vec<Record> = Team::static_teams().iter().map(Team::to_record).collect();
        storage.bulk_insert("teams", &teams).unwrap();
        let player = Player::stub("Chris Jones", "DT", Some(16), 2023);
        let player_id = storage.insert("players", &player.to_record()).unwrap();
        let game = Game {
            nfl_game_id: "401547403".into(),
            season: 2023,
            week: Some(1),
            game_date: NaiveDate::from_ymd_opt(2023, 9, 7).unwrap(),
            home_team_id: 16,
            away_team_id: 11,
            home_score: Some(20),
            away_score: Some(21),
            game_type: GameType::Regular,
            completed: true,
            venue_name: None,
            venue_city: None,
            venue_state: None,
        };
        let game_id = storage.insert("games", &game.to_record()).unwrap();

        let line = StatLine::new(
            StatKey {
                player_id,
                game_id,
                season: 2023,
                week: Some(1),
            },
            StatBody::Defensive(DefensiveStats {
                tackles_solo: 4,
                tackles_assisted: 2,
                tackles_total: 6,
                sacks: 1.5,
                passes_defended: 1,
                fumbles_forced: 1,
                ..Default::default()
            }),
        );
        let written = line.to_record();
        storage.insert("defensive_stats", &written).unwrap();

        let rows = storage
            .query("SELECT * FROM defensive_stats WHERE player_id = ?1", &[player_id.into()])
            .unwrap();
        assert_eq!(rows.len(), 1);
        let mut read = Record::new();
        for (column, value) in rows[0].iter().filter(|(c, _)| *c != "stat_id") {
            read.set(column, value.clone());
        }
        assert_eq!(read, written);
        assert_eq!(read.f64("sacks"), Some(1.5));
    }

    #[test]
    fn identifiers_are_checked() {
        let mut storage = storage();
        let record = Record::new().with("x", 1i64);
        let err = storage.insert("teams; DROP TABLE teams", &record).unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
        assert!(storage.upsert("teams", &record, &[]).is_err());
        assert!(storage.insert("teams", &Record::new()).is_err());
    }

    #[test]
    fn file_database_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("nfl.db");
        {
            let mut storage = SqliteStorage::open(&path).unwrap();
            storage.initialize_schema().unwrap();
            let teams: Vec<Record> = Team::static_teams().iter().map(Team::to_record).collect();
            storage.bulk_insert("teams", &teams).unwrap();
        }
        let storage = SqliteStorage::open(&path).unwrap();
        let rows = storage
            .query("SELECT team_code, conference FROM teams ORDER BY team_code LIMIT 1", &[])
            .unwrap();
        assert_eq!(rows[0].str("team_code"), Some("ARI"));
        assert_eq!(rows[0].str("conference"), Some("NFC"));
    }
}
