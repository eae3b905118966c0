//! 검증 도구 에러 타입

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("I/O 에러 ({path}): {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("I/O 에러: {0}")]
    IoError(String),

    #[error("LogMiner 라인 {line} 형식 오류: {reason}")]
    MalformedRedoLine { line: usize, reason: String },

    #[error("JSON 라인 {line} 파싱 에러: {source}")]
    MalformedJson {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("설정 에러: {0}")]
    Config(String),

    #[error("직렬화 에러: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl VerifyError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        VerifyError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<io::Error> for VerifyError {
    fn from(err: io::Error) -> Self {
        VerifyError::IoError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, VerifyError>;

/// SQL_REDO 문장 파싱 실패 사유
///
/// 치명적 에러가 아니다. 변환 단계에서 진단 메시지로 바뀌고 해당 레코드는
/// 빈 before/after 맵을 가진다.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RedoParseError {
    #[error("위치 {pos}에서 {expected} 기대")]
    Expected { pos: usize, expected: &'static str },

    #[error("컬럼 수({columns})와 값 수({values})가 다름")]
    CountMismatch { columns: usize, values: usize },

    #[error("{0} 절이 없음")]
    MissingClause(&'static str),

    #[error("위치 {0} 이후 처리되지 않은 입력")]
    TrailingInput(usize),

    #[error("닫히지 않은 괄호 또는 따옴표")]
    Unterminated,
}
