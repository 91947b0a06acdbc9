//! Calculated ground truth from an external lunar calendar engine.
//!
//! The default engine shells out to Node.js with the `lunar-javascript` package
//! installed; anything else that can turn solar dates into [`ReferenceRecord`]s
//! can stand in through [`ReferenceEngine`].

use crate::error::ReferenceError;
use crate::lunar::config::ReferenceConfig;
use crate::lunar::model::{CanChi, LunarDate, ReferenceRecord};
use crate::lunar::util::{self, CommandOutcome};
use crate::lunar::vocab::{self, Branch, Stem};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use tracing::{debug, error, info};

/// Batch in, batch out. One record per input date in input order, or a failure for the whole batch.
pub trait ReferenceEngine {
    fn compute_batch(&self, dates: &[NaiveDate]) -> Result<Vec<ReferenceRecord>, ReferenceError>;
}

const LUNAR_SCRIPT: &str = r#"
const { Solar } = require('lunar-javascript');
let input = '';
process.stdin.setEncoding('utf8');
process.stdin.on('data', (chunk) => { input += chunk; });
process.stdin.on('end', () => {
  const dates = JSON.parse(input);
  const out = dates.map((d) => {
    const solar = Solar.fromYmd(d.year, d.month, d.day);
    const lunar = solar.getLunar();
    const month = lunar.getMonth();
    const jieQi = lunar.getJieQi();
    return {
      solar_date: solar.toYmd(),
      lunar_day: lunar.getDay(),
      lunar_month: Math.abs(month),
      lunar_year: lunar.getYear(),
      is_leap_month: month < 0,
      year_gan: lunar.getYearGan(),
      year_zhi: lunar.getYearZhi(),
      month_gan: lunar.getMonthGan(),
      month_zhi: lunar.getMonthZhi(),
      day_gan: lunar.getDayGan(),
      day_zhi: lunar.getDayZhi(),
      jie_qi: jieQi ? jieQi : null,
    };
  });
  process.stdout.write(JSON.stringify(out));
});
"#;

#[derive(Debug, Serialize)]
struct SolarInput {
    year: i32,
    month: u32,
    day: u32,
}

/// One element of the engine's output, still in sinograph form.
#[derive(Debug, Clone, Deserialize)]
pub struct RawLunarDay {
    pub solar_date: String,
    pub lunar_day: u32,
    pub lunar_month: i32,
    pub lunar_year: i32,
    #[serde(default)]
    pub is_leap_month: bool,
    pub year_gan: String,
    pub year_zhi: String,
    pub month_gan: String,
    pub month_zhi: String,
    pub day_gan: String,
    pub day_zhi: String,
    #[serde(default)]
    pub jie_qi: Option<String>,
    #[serde(default)]
    pub star_28: Option<String>,
    #[serde(default)]
    pub truc_12: Option<String>,
}

fn stem(field: &'static str, raw: &str) -> Result<Stem, ReferenceError> {
    Stem::from_sinograph(raw).ok_or_else(|| ReferenceError::UnknownSinograph {
        field,
        value: raw.to_string(),
    })
}

fn branch(field: &'static str, raw: &str) -> Result<Branch, ReferenceError> {
    Branch::from_sinograph(raw).ok_or_else(|| ReferenceError::UnknownSinograph {
        field,
        value: raw.to_string(),
    })
}

fn invalid(field: &'static str, value: impl ToString) -> ReferenceError {
    ReferenceError::InvalidValue {
        field,
        value: value.to_string(),
    }
}

/// Convert one raw engine element into the parsers' vocabulary. A negative
/// month is the engine's leap-month marker.
pub fn transliterate(raw: &RawLunarDay, requested: NaiveDate) -> Result<ReferenceRecord, ReferenceError> {
    let solar_date = NaiveDate::parse_from_str(raw.solar_date.trim(), "%Y-%m-%d")
        .map_err(|_| invalid("solar_date", &raw.solar_date))?;
    if solar_date != requested {
        return Err(invalid(
            "solar_date",
            format!("{} (expected {})", raw.solar_date, requested),
        ));
    }

    let month = raw.lunar_month.unsigned_abs();
    if !LunarDate::is_valid_month(month) {
        return Err(invalid("lunar_month", raw.lunar_month));
    }
    if !LunarDate::is_valid_day(raw.lunar_day) {
        return Err(invalid("lunar_day", raw.lunar_day));
    }

    let tiet_khi = match raw.jie_qi.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(term) => Some(
            vocab::solar_term_from_sinograph(term)
                .ok_or_else(|| ReferenceError::UnknownSinograph {
                    field: "jie_qi",
                    value: term.to_string(),
                })?
                .to_string(),
        ),
    };
    let star28 = match raw.star_28.as_deref() {
        None => None,
        Some(name) => Some(
            vocab::star28(name)
                .ok_or_else(|| invalid("star_28", name))?
                .0
                .to_string(),
        ),
    };
    let truc12 = match raw.truc_12.as_deref() {
        None => None,
        Some(name) => Some(
            vocab::truc12(name)
                .ok_or_else(|| invalid("truc_12", name))?
                .0
                .to_string(),
        ),
    };

    Ok(ReferenceRecord {
        solar_date,
        lunar_date: LunarDate {
            day: raw.lunar_day as u8,
            month: month as u8,
            year: raw.lunar_year,
            is_leap_month: raw.is_leap_month || raw.lunar_month < 0,
        },
        year: CanChi::new(stem("year_gan", &raw.year_gan)?, branch("year_zhi", &raw.year_zhi)?),
        month: CanChi::new(
            stem("month_gan", &raw.month_gan)?,
            branch("month_zhi", &raw.month_zhi)?,
        ),
        day: CanChi::new(stem("day_gan", &raw.day_gan)?, branch("day_zhi", &raw.day_zhi)?),
        tiet_khi,
        star28,
        truc12,
    })
}

/// Decode the engine's stdout for the given request.
pub fn decode_output(stdout: &[u8], dates: &[NaiveDate]) -> Result<Vec<ReferenceRecord>, ReferenceError> {
    let raw: Vec<RawLunarDay> = serde_json::from_slice(stdout)?;
    if raw.len() != dates.len() {
        return Err(ReferenceError::LengthMismatch {
            expected: dates.len(),
            got: raw.len(),
        });
    }
    raw.iter()
        .zip(dates)
        .map(|(raw, date)| transliterate(raw, *date))
        .collect()
}

#[derive(Debug, Clone)]
pub struct NodeLunarEngine {
    pub node_bin: PathBuf,
    pub timeout_secs: u64,
}

impl NodeLunarEngine {
    pub fn new(node_bin: impl Into<PathBuf>, timeout_secs: u64) -> Self {
        Self {
            node_bin: node_bin.into(),
            timeout_secs,
        }
    }

    pub fn from_config(cfg: &ReferenceConfig) -> Self {
        Self::new(&cfg.node_bin, cfg.timeout_secs)
    }

    pub fn resolved_bin(&self) -> Option<PathBuf> {
        resolve_node_bin(&self.node_bin).ok()
    }
}

fn resolve_node_bin(bin: &Path) -> Result<PathBuf, ReferenceError> {
    if bin.exists() {
        return Ok(bin.to_path_buf());
    }
    which::which(bin).map_err(|err| {
        ReferenceError::Unavailable(format!("{} not found in PATH: {err}", bin.display()))
    })
}

impl ReferenceEngine for NodeLunarEngine {
    fn compute_batch(&self, dates: &[NaiveDate]) -> Result<Vec<ReferenceRecord>, ReferenceError> {
        let bin = resolve_node_bin(&self.node_bin)?;
        let payload = serde_json::to_vec(
            &dates
                .iter()
                .map(|date| SolarInput {
                    year: date.year(),
                    month: date.month(),
                    day: date.day(),
                })
                .collect::<Vec<_>>(),
        )?;

        debug!(
            "Running reference engine {} for {} dates",
            bin.display(),
            dates.len()
        );
        let mut cmd = Command::new(&bin);
        cmd.arg("-e").arg(LUNAR_SCRIPT);
        let outcome =
            util::run_with_input(&mut cmd, &payload, Duration::from_secs(self.timeout_secs))?;
        let output = match outcome {
            CommandOutcome::Finished(output) => output,
            CommandOutcome::TimedOut => return Err(ReferenceError::Timeout(self.timeout_secs)),
        };
        if !output.status.success() {
            return Err(ReferenceError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        decode_output(&output.stdout, dates)
    }
}

/// Reference records for `dates`, or nothing at all if the engine fails.
pub fn compute(engine: &dyn ReferenceEngine, dates: &[NaiveDate]) -> Vec<ReferenceRecord> {
    if dates.is_empty() {
        return Vec::new();
    }
    match engine.compute_batch(dates) {
        Ok(records) => {
            info!("Calculated reference data for {} dates", records.len());
            records
        }
        Err(err) => {
            error!(
                "Reference calculation failed for {} dates: {}",
                dates.len(),
                err
            );
            Vec::new()
        }
    }
}

pub fn by_date(records: Vec<ReferenceRecord>) -> BTreeMap<NaiveDate, ReferenceRecord> {
    records
        .into_iter()
        .map(|record| (record.solar_date, record))
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::Cell;

    pub(crate) const JAN_FIRST_OUTPUT: &str = r#"[{
        "solar_date": "2025-01-01",
        "lunar_day": 2,
        "lunar_month": 12,
        "lunar_year": 2024,
        "is_leap_month": false,
        "year_gan": "甲", "year_zhi": "辰",
        "month_gan": "丙", "month_zhi": "子",
        "day_gan": "己", "day_zhi": "未",
        "jie_qi": null
    }]"#;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    /// Answers every date with a fixed record shape, counting calls.
    pub(crate) struct FixedEngine {
        pub(crate) fail: bool,
        pub(crate) calls: Cell<usize>,
    }

    impl ReferenceEngine for FixedEngine {
        fn compute_batch(
            &self,
            dates: &[NaiveDate],
        ) -> Result<Vec<ReferenceRecord>, ReferenceError> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                return Err(ReferenceError::Timeout(30));
            }
            Ok(dates
                .iter()
                .map(|solar_date| ReferenceRecord {
                    solar_date: *solar_date,
                    lunar_date: LunarDate {
                        day: 2,
                        month: 12,
                        year: 2024,
                        is_leap_month: false,
                    },
                    year: CanChi::new(Stem::Giap, Branch::Thin),
                    month: CanChi::new(Stem::Binh, Branch::Ty),
                    day: CanChi::new(Stem::Ky, Branch::Mui),
                    tiet_khi: None,
                    star28: None,
                    truc12: None,
                })
                .collect())
        }
    }

    #[test]
    fn engine_output_is_transliterated() {
        let records =
            decode_output(JAN_FIRST_OUTPUT.as_bytes(), &[date(2025, 1, 1)]).expect("decodes");
        let record = &records[0];
        assert_eq!(record.lunar_date.day, 2);
        assert_eq!(record.lunar_date.month, 12);
        assert_eq!(record.lunar_date.year, 2024);
        assert_eq!(record.year.to_string(), "Giáp Thìn");
        assert_eq!(record.month.to_string(), "Bính Tý");
        assert_eq!(record.day.to_string(), "Kỷ Mùi");
        assert!(record.tiet_khi.is_none());
    }

    #[test]
    fn negative_month_marks_leap_month_and_terms_are_translated() {
        let raw = RawLunarDay {
            solar_date: "2025-07-25".to_string(),
            lunar_day: 1,
            lunar_month: -6,
            lunar_year: 2025,
            is_leap_month: false,
            year_gan: "乙".to_string(),
            year_zhi: "巳".to_string(),
            month_gan: "癸".to_string(),
            month_zhi: "未".to_string(),
            day_gan: "丙".to_string(),
            day_zhi: "午".to_string(),
            jie_qi: Some("大暑".to_string()),
            star_28: None,
            truc_12: Some("Khai".to_string()),
        };
        let record = transliterate(&raw, date(2025, 7, 25)).expect("transliterates");
        assert_eq!(record.lunar_date.month, 6);
        assert!(record.lunar_date.is_leap_month);
        assert_eq!(record.year.chi, Branch::Ti);
        assert_eq!(record.tiet_khi.as_deref(), Some("Đại thử"));
        assert_eq!(record.truc12.as_deref(), Some("Khai"));
    }

    #[test]
    fn unknown_sinograph_fails_the_batch() {
        let bad = JAN_FIRST_OUTPUT.replace("\"未\"", "\"X\"");
        let err = decode_output(bad.as_bytes(), &[date(2025, 1, 1)]).expect_err("unknown");
        assert!(matches!(
            err,
            ReferenceError::UnknownSinograph {
                field: "day_zhi",
                ..
            }
        ));
    }

    #[test]
    fn length_and_order_are_checked() {
        let err = decode_output(
            JAN_FIRST_OUTPUT.as_bytes(),
            &[date(2025, 1, 1), date(2025, 1, 2)],
        )
        .expect_err("short output");
        assert!(matches!(
            err,
            ReferenceError::LengthMismatch {
                expected: 2,
                got: 1
            }
        ));

        let err = decode_output(JAN_FIRST_OUTPUT.as_bytes(), &[date(2025, 1, 2)])
            .expect_err("wrong date");
        assert!(matches!(err, ReferenceError::InvalidValue { field: "solar_date", .. }));

        let err = decode_output(b"not json", &[date(2025, 1, 1)]).expect_err("malformed");
        assert!(matches!(err, ReferenceError::Malformed(_)));
    }

    #[test]
    fn compute_returns_empty_on_engine_failure() {
        let failing = FixedEngine {
            fail: true,
            calls: Cell::new(0),
        };
        assert!(compute(&failing, &[date(2025, 1, 1)]).is_empty());
        assert_eq!(failing.calls.get(), 1);

        let working = FixedEngine {
            fail: false,
            calls: Cell::new(0),
        };
        assert!(compute(&working, &[]).is_empty());
        assert_eq!(working.calls.get(), 0);
        let records = compute(&working, &[date(2025, 1, 1), date(2025, 1, 2)]);
        assert_eq!(records.len(), 2);
        assert_eq!(by_date(records).len(), 2);
    }

    #[test]
    fn missing_node_binary_is_unavailable() {
        let engine = NodeLunarEngine::new("/nonexistent/fengshui-node-for-tests", 5);
        let err = engine
            .compute_batch(&[date(2025, 1, 1)])
            .expect_err("no binary");
        assert!(matches!(err, ReferenceError::Unavailable(_)));
    }

    #[cfg(unix)]
    #[test]
    fn fake_node_script_output_is_decoded() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().expect("tempdir");
        let fake = tmp.path().join("node");
        std::fs::write(
            &fake,
            format!("#!/usr/bin/env bash\ncat >/dev/null\ncat <<'EOF'\n{JAN_FIRST_OUTPUT}\nEOF\n"),
        )
        .expect("write fake node");
        std::fs::set_permissions(&fake, std::fs::Permissions::from_mode(0o755)).expect("chmod");

        let engine = NodeLunarEngine::new(&fake, 10);
        let records = engine.compute_batch(&[date(2025, 1, 1)]).expect("runs");
        assert_eq!(records[0].day.to_string(), "Kỷ Mùi");

        let failing = tmp.path().join("node-failing");
        std::fs::write(&failing, "#!/usr/bin/env bash\necho boom >&2\nexit 3\n")
            .expect("write failing node");
        std::fs::set_permissions(&failing, std::fs::Permissions::from_mode(0o755))
            .expect("chmod");
        let err = NodeLunarEngine::new(&failing, 10)
            .compute_batch(&[date(2025, 1, 1)])
            .expect_err("fails");
        match err {
            ReferenceError::Failed { stderr, .. } => assert_eq!(stderr, "boom"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
