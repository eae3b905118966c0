//! 타입 인지 값 비교
//!
//! 규칙은 순서대로 시도하고 처음 성공한 규칙을 채택한다:
//! 1. NULL 처리  2. 문자열 일치  3. 숫자 (상대 오차)  4. 날짜/타임스탬프  5. 줄바꿈 정규화

use crate::events::ScalarValue;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

pub const DEFAULT_RELATIVE_TOLERANCE: f64 = 1e-6;

/// DD-MON-RRRR HH.MI.SS[.FF] AM|PM (두 자리 연도는 미리 확장)
static ORACLE_TIMESTAMP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(\d{1,2})-([a-z]{3})-(\d{4})\s+(\d{1,2})\.(\d{2})\.(\d{2})(?:\.(\d+))?\s*(AM|PM)$",
    )
    .expect("timestamp pattern is valid")
});

/// DD-MON-RR 로 시작하는 값의 두 자리 연도
static TWO_DIGIT_YEAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{1,2}-[A-Za-z]{3}-(\d{2})(?:\s|$)").expect("year pattern is valid")
});

/// 날짜 전용으로 취급하는 형식들 (시간 부분이 있어도 날짜만 비교)
const ORACLE_DATE_FORMATS: &[&str] = &[
    "%d-%b-%Y",          // DD-MON-RR, DD-MON-RRRR
    "%Y-%m-%d %H:%M:%S", // YYYY-MM-DD HH24:MI:SS
    "%d-%b-%Y %H.%M.%S", // DD-MON-RR HH.MI.SS
];

/// 두 자리 연도 기준: 00-68 은 20xx, 69-99 는 19xx
const TWO_DIGIT_YEAR_PIVOT: u32 = 68;

/// 일치 판정에 사용된 규칙
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRule {
    BothNull,
    Exact,
    Numeric,
    Temporal,
    LineBreaks,
}

/// 파싱된 Oracle 날짜/타임스탬프
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OracleTime {
    /// UTC epoch 초 (타임스탬프는 소수 초 반올림 후)
    pub epoch: i64,
    pub date_only: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct ValueMatcher {
    relative_tolerance: f64,
}

impl Default for ValueMatcher {
    fn default() -> Self {
        ValueMatcher {
            relative_tolerance: DEFAULT_RELATIVE_TOLERANCE,
        }
    }
}

impl ValueMatcher {
    pub fn new(relative_tolerance: f64) -> Self {
        ValueMatcher { relative_tolerance }
    }

    pub fn matches(&self, a: &ScalarValue, b: &ScalarValue) -> bool {
        self.match_rule(a, b).is_some()
    }

    pub fn match_rule(&self, a: &ScalarValue, b: &ScalarValue) -> Option<MatchRule> {
        match (a, b) {
            (ScalarValue::Null, ScalarValue::Null) => Some(MatchRule::BothNull),
            (ScalarValue::Null, _) | (_, ScalarValue::Null) => None,
            (ScalarValue::Text(a), ScalarValue::Text(b)) => self.match_text(a, b),
        }
    }

    fn match_text(&self, a: &str, b: &str) -> Option<MatchRule> {
        if a == b {
            return Some(MatchRule::Exact);
        }
        if self.numeric_match(a, b) {
            return Some(MatchRule::Numeric);
        }
        if temporal_match(a, b) || temporal_match(b, a) {
            return Some(MatchRule::Temporal);
        }
        if normalize_line_breaks(a) == normalize_line_breaks(b) {
            return Some(MatchRule::LineBreaks);
        }
        None
    }

    fn numeric_match(&self, a: &str, b: &str) -> bool {
        let (Ok(x), Ok(y)) = (a.trim().parse::<f64>(), b.trim().parse::<f64>()) else {
            return false;
        };
        if x == y {
            return true;
        }
        let diff = (x - y).abs();
        diff < self.relative_tolerance * x.abs() || diff < self.relative_tolerance * y.abs()
    }
}

/// 기본 허용 오차로 비교
pub fn values_match(a: &ScalarValue, b: &ScalarValue) -> bool {
    ValueMatcher::default().matches(a, b)
}

/// `text` 를 Oracle 리터럴로, `other` 를 epoch 으로 해석해 비교
fn temporal_match(text: &str, other: &str) -> bool {
    let (Some(time), Some(other_epoch)) = (parse_oracle_datetime(text), epoch_of(other)) else {
        return false;
    };
    if time.date_only {
        match (utc_date(time.epoch), utc_date(other_epoch)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        }
    } else {
        time.epoch == other_epoch
    }
}

/// 정수 epoch, RFC 3339, Oracle 리터럴 순으로 해석
fn epoch_of(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Ok(epoch) = s.parse::<i64>() {
        return Some(epoch);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp());
    }
    parse_oracle_datetime(s).map(|t| t.epoch)
}

fn utc_date(epoch: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(epoch, 0).map(|dt| dt.date_naive())
}

/// Oracle 날짜/타임스탬프 리터럴 파싱
pub fn parse_oracle_datetime(s: &str) -> Option<OracleTime> {
    let expanded = expand_two_digit_year(s.trim());
    let s: &str = &expanded;

    if let Some(caps) = ORACLE_TIMESTAMP_RE.captures(s) {
        let date = NaiveDate::parse_from_str(&format!("{}-{}-{}", &caps[1], &caps[2], &caps[3]), "%d-%b-%Y");

        let hour12: u32 = caps[4].parse().ok()?;
        let minute: u32 = caps[5].parse().ok()?;
        let second: u32 = caps[6].parse().ok()?;
        let pm = caps[8].eq_ignore_ascii_case("PM");
        if !(1..=12).contains(&hour12) {
            return None;
        }
        let hour = match (hour12, pm) {
            (12, false) => 0,
            (12, true) => 12,
            (h, false) => h,
            (h, true) => h + 12,
        };

        if let (Ok(date), Some(time)) = (date, NaiveTime::from_hms_opt(hour, minute, second)) {
            let round_up = caps
                .get(7)
                .and_then(|f| f.as_str().chars().next())
                .map(|d| d >= '5')
                .unwrap_or(false);
            let epoch = date.and_time(time).and_utc().timestamp() + i64::from(round_up);
            return Some(OracleTime {
                epoch,
                date_only: false,
            });
        }
    }

    for fmt in ORACLE_DATE_FORMATS {
        let parsed = NaiveDateTime::parse_from_str(s, fmt).or_else(|_| {
            NaiveDate::parse_from_str(s, fmt).map(|d| d.and_time(NaiveTime::MIN))
        });
        if let Ok(dt) = parsed {
            return Some(OracleTime {
                epoch: dt.and_utc().timestamp(),
                date_only: true,
            });
        }
    }

    None
}

/// `15-JUN-25...` 의 연도를 네 자리로 확장한다
fn expand_two_digit_year(s: &str) -> Cow<'_, str> {
    let Some(year) = TWO_DIGIT_YEAR_RE.captures(s).and_then(|caps| caps.get(1)) else {
        return Cow::Borrowed(s);
    };
    let Ok(yy) = year.as_str().parse::<u32>() else {
        return Cow::Borrowed(s);
    };
    let century = if yy <= TWO_DIGIT_YEAR_PIVOT { 2000 } else { 1900 };
    Cow::Owned(format!(
        "{}{}{}",
        &s[..year.start()],
        century + yy,
        &s[year.end()..]
    ))
}

/// CRLF, CR, LF 를 공백 하나로
fn normalize_line_breaks(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push(' ');
            }
            '\n' => out.push(' '),
            c => out.push(c),
        }
    }
    out
}
