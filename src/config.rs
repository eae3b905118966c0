//! 검증 실행 설정

use crate::comparator::{ColumnPolicy, RecordComparator};
use crate::error::{Result, VerifyError};
use crate::matcher::{ValueMatcher, DEFAULT_RELATIVE_TOLERANCE};

#[derive(Debug, Clone)]
pub struct VerifyConfig {
    /// 정답에만 있는 컬럼 처리
    pub column_policy: ColumnPolicy,
    /// LOB 분할 레코드 병합 여부
    pub merge_lobs: bool,
    /// 숫자 비교 상대 오차
    pub relative_tolerance: f64,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        VerifyConfig {
            column_policy: ColumnPolicy::Relaxed,
            merge_lobs: true,
            relative_tolerance: DEFAULT_RELATIVE_TOLERANCE,
        }
    }
}

impl VerifyConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.relative_tolerance.is_finite() || self.relative_tolerance <= 0.0 {
            return Err(VerifyError::Config(format!(
                "relative tolerance must be a positive finite number, got {}",
                self.relative_tolerance
            )));
        }
        Ok(())
    }

    pub fn comparator(&self) -> RecordComparator {
        RecordComparator::new(ValueMatcher::new(self.relative_tolerance), self.column_policy)
    }
}
