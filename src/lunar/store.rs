//! SQLite persistence for canonical days, raw per-source records and run metadata.

use crate::lunar::model::{DayRecord, SourceKind};
use crate::lunar::score::DayQuality;
use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::{debug, info};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS days (
    solar_date TEXT PRIMARY KEY,
    lunar_day INTEGER NOT NULL,
    lunar_month INTEGER NOT NULL,
    lunar_year INTEGER NOT NULL,
    is_leap_month INTEGER NOT NULL DEFAULT 0,
    day_can TEXT NOT NULL,
    day_chi TEXT NOT NULL,
    month_can TEXT NOT NULL,
    month_chi TEXT NOT NULL,
    year_can TEXT NOT NULL,
    year_chi TEXT NOT NULL,
    ngu_hanh TEXT NOT NULL,
    tiet_khi TEXT,
    star28_name TEXT,
    star28_is_good INTEGER,
    truc12_name TEXT,
    truc12_is_good INTEGER,
    day_score INTEGER,
    source TEXT NOT NULL,
    data_json TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_lunar_date ON days(lunar_year, lunar_month, lunar_day);
CREATE INDEX IF NOT EXISTS idx_day_score ON days(day_score);
CREATE TABLE IF NOT EXISTS raw_records (
    source TEXT NOT NULL,
    solar_date TEXT NOT NULL,
    data_json TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (source, solar_date)
);
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScoreDistribution {
    pub excellent: usize,
    pub good: usize,
    pub normal: usize,
    pub bad: usize,
    pub very_bad: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub total_days: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub score_distribution: ScoreDistribution,
    pub raw_records: usize,
}

pub struct DayStore {
    conn: Connection,
}

fn day_from_row(row: &Row<'_>) -> rusqlite::Result<String> {
    row.get(0)
}

fn decode_days(rows: Vec<String>) -> Result<Vec<DayRecord>> {
    rows.iter()
        .map(|raw| serde_json::from_str(raw).context("stored day record is not valid JSON"))
        .collect()
}

fn upsert_day(conn: &Connection, day: &DayRecord) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    let data_json = serde_json::to_string(day)?;
    conn.execute(
        "INSERT INTO days (
            solar_date, lunar_day, lunar_month, lunar_year, is_leap_month,
            day_can, day_chi, month_can, month_chi, year_can, year_chi,
            ngu_hanh, tiet_khi, star28_name, star28_is_good,
            truc12_name, truc12_is_good, day_score, source,
            data_json, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?21)
        ON CONFLICT(solar_date) DO UPDATE SET
            lunar_day = ?2, lunar_month = ?3, lunar_year = ?4, is_leap_month = ?5,
            day_can = ?6, day_chi = ?7, month_can = ?8, month_chi = ?9,
            year_can = ?10, year_chi = ?11, ngu_hanh = ?12, tiet_khi = ?13,
            star28_name = ?14, star28_is_good = ?15, truc12_name = ?16,
            truc12_is_good = ?17, day_score = ?18, source = ?19,
            data_json = ?20, updated_at = ?21",
        params![
            day.solar_date.to_string(),
            day.lunar_date.day,
            day.lunar_date.month,
            day.lunar_date.year,
            day.lunar_date.is_leap_month,
            day.can_chi.day.can.name(),
            day.can_chi.day.chi.name(),
            day.can_chi.month.can.name(),
            day.can_chi.month.chi.name(),
            day.can_chi.year.can.name(),
            day.can_chi.year.chi.name(),
            day.can_chi.ngu_hanh.name(),
            day.tiet_khi,
            day.star28.as_ref().map(|star| star.name.as_str()),
            day.star28.as_ref().map(|star| star.is_good),
            day.truc12.as_ref().map(|truc| truc.name.as_str()),
            day.truc12.as_ref().map(|truc| truc.is_good),
            day.day_score,
            day.source,
            data_json,
            now,
        ],
    )
    .with_context(|| format!("failed to save day {}", day.solar_date))?;
    Ok(())
}

impl DayStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database {}", path.display()))?;
        let store = Self::init(conn)?;
        info!("Database initialized at {}", path.display());
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .context("failed to create database schema")?;
        Ok(Self { conn })
    }

    pub fn save_day(&self, day: &DayRecord) -> Result<()> {
        upsert_day(&self.conn, day)
    }

    pub fn save_days(&mut self, days: &[DayRecord]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        for day in days {
            upsert_day(&tx, day)?;
        }
        tx.commit()?;
        debug!("Saved {} days", days.len());
        Ok(days.len())
    }

    pub fn get_day(&self, solar_date: NaiveDate) -> Result<Option<DayRecord>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT data_json FROM days WHERE solar_date = ?1",
                [solar_date.to_string()],
                day_from_row,
            )
            .optional()?;
        raw.map(|raw| serde_json::from_str(&raw).context("stored day record is not valid JSON"))
            .transpose()
    }

    fn query_days(&self, sql: &str, args: impl rusqlite::Params) -> Result<Vec<DayRecord>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows = stmt
            .query_map(args, day_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        decode_days(rows)
    }

    pub fn get_days_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<DayRecord>> {
        self.query_days(
            "SELECT data_json FROM days WHERE solar_date >= ?1 AND solar_date <= ?2 ORDER BY solar_date",
            params![start.to_string(), end.to_string()],
        )
    }

    pub fn get_days_by_lunar_month(&self, lunar_year: i32, lunar_month: u8) -> Result<Vec<DayRecord>> {
        self.query_days(
            "SELECT data_json FROM days WHERE lunar_year = ?1 AND lunar_month = ?2 ORDER BY lunar_day",
            params![lunar_year, lunar_month],
        )
    }

    /// Days scoring at least `min_score`, best first.
    pub fn get_good_days(&self, start: NaiveDate, end: NaiveDate, min_score: u8) -> Result<Vec<DayRecord>> {
        self.query_days(
            "SELECT data_json FROM days
             WHERE solar_date >= ?1 AND solar_date <= ?2 AND day_score >= ?3
             ORDER BY day_score DESC, solar_date",
            params![start.to_string(), end.to_string(), min_score],
        )
    }

    pub fn search_by_can_chi(&self, can: &str, chi: &str) -> Result<Vec<DayRecord>> {
        self.query_days(
            "SELECT data_json FROM days WHERE day_can = ?1 AND day_chi = ?2 ORDER BY solar_date",
            params![can.trim(), crate::lunar::vocab::normalize_branch(chi)],
        )
    }

    pub fn count_days(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM days", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn date_range(&self) -> Result<Option<(NaiveDate, NaiveDate)>> {
        let (first, last): (Option<String>, Option<String>) = self.conn.query_row(
            "SELECT MIN(solar_date), MAX(solar_date) FROM days",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let (Some(first), Some(last)) = (first, last) else {
            return Ok(None);
        };
        Ok(Some((first.parse()?, last.parse()?)))
    }

    pub fn delete_day(&self, solar_date: NaiveDate) -> Result<bool> {
        let deleted = self.conn.execute(
            "DELETE FROM days WHERE solar_date = ?1",
            [solar_date.to_string()],
        )?;
        Ok(deleted > 0)
    }

    pub fn save_raw<T: Serialize>(&self, source: SourceKind, solar_date: NaiveDate, record: &T) -> Result<()> {
        self.conn.execute(
            "INSERT INTO raw_records (source, solar_date, data_json, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(source, solar_date) DO UPDATE SET data_json = ?3, updated_at = ?4",
            params![
                source.key(),
                solar_date.to_string(),
                serde_json::to_string(record)?,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    pub fn get_raw_range<T: DeserializeOwned>(
        &self,
        source: SourceKind,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<T>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT data_json FROM raw_records
             WHERE source = ?1 AND solar_date >= ?2 AND solar_date <= ?3
             ORDER BY solar_date",
        )?;
        let rows = stmt
            .query_map(
                params![source.key(), start.to_string(), end.to_string()],
                day_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.iter()
            .map(|raw| {
                serde_json::from_str(raw)
                    .with_context(|| format!("stored {} record is not valid JSON", source.key()))
            })
            .collect()
    }

    pub fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO metadata (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = ?3",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .conn
            .query_row("SELECT value FROM metadata WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?)
    }

    pub fn stats(&self) -> Result<StoreStats> {
        let mut stats = StoreStats {
            total_days: self.count_days()?,
            ..StoreStats::default()
        };
        if let Some((first, last)) = self.date_range()? {
            stats.first_date = Some(first);
            stats.last_date = Some(last);
        }

        let mut stmt = self
            .conn
            .prepare("SELECT day_score FROM days WHERE day_score IS NOT NULL")?;
        let scores = stmt
            .query_map([], |row| row.get::<_, u8>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        for score in scores {
            let bucket = &mut stats.score_distribution;
            match DayQuality::from_score(score) {
                DayQuality::Excellent => bucket.excellent += 1,
                DayQuality::Good => bucket.good += 1,
                DayQuality::Normal => bucket.normal += 1,
                DayQuality::Bad => bucket.bad += 1,
                DayQuality::VeryBad => bucket.very_bad += 1,
            }
        }

        let raw: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM raw_records", [], |row| row.get(0))?;
        stats.raw_records = raw as usize;
        Ok(stats)
    }
}
