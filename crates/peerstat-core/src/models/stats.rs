//! 피어 연결 stats 모델.
//!
//! 관찰자가 보고한 stats 레코드의 각 필드를 수집 시점에 한 번 분류하여,
//! 인코더가 런타임 타입 검사 없이 닫힌 variant 집합으로 분기하도록 한다.

use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::{Map, Value};

/// 숫자 코드로 변환되는 레이블 필드
pub const QUALITY_LIMITATION_FIELD: &str = "qualityLimitationReason";

/// 출력하지 않는 진단 필드
pub const IGNORED_DIAGNOSTIC_FIELD: &str = "googTimingFrameInfo";

/// 연결 상태(`state`) 레이블이 붙는 레코드 타입
pub const PEER_CONNECTION_TYPE: &str = "peer-connection";

/// 레코드 타입 필드
pub const TYPE_FIELD: &str = "type";

/// 품질 제한 사유: 고정 코드 테이블
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityLimitationReason {
    None,
    Bandwidth,
    Cpu,
    Other,
}

impl QualityLimitationReason {
    /// 문자열 → 사유 (알 수 없는 값은 None)
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "none" => Some(Self::None),
            "bandwidth" => Some(Self::Bandwidth),
            "cpu" => Some(Self::Cpu),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    /// 메트릭 값으로 쓰이는 숫자 코드
    pub fn code(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Bandwidth => 1,
            Self::Cpu => 2,
            Self::Other => 3,
        }
    }
}

/// 분류된 필드 값
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// 숫자 → 메트릭
    Number(f64),
    /// 중첩 맵의 숫자 자식들 → `field_child` 메트릭
    Nested(Vec<(String, f64)>),
    /// 코드 테이블에 있는 품질 제한 사유 → 숫자 코드 메트릭
    QualityLimitation(QualityLimitationReason),
    /// 그 외 스칼라 → 문자열 레이블
    Label(String),
    /// 출력 없음
    Ignored,
}

impl FieldValue {
    /// JSON 값을 필드 이름 기준으로 분류
    pub fn classify(key: &str, value: &Value) -> Self {
        match value {
            Value::Number(n) => n.as_f64().map(Self::Number).unwrap_or(Self::Ignored),
            Value::Object(children) => Self::Nested(
                children
                    .iter()
                    .filter_map(|(k, v)| v.as_f64().map(|n| (k.clone(), n)))
                    .collect(),
            ),
            Value::Array(items) => Self::Nested(
                items
                    .iter()
                    .enumerate()
                    .filter_map(|(i, v)| v.as_f64().map(|n| (i.to_string(), n)))
                    .collect(),
            ),
            Value::Null => Self::Ignored,
            _ if key == IGNORED_DIAGNOSTIC_FIELD => Self::Ignored,
            _ if key == QUALITY_LIMITATION_FIELD => value
                .as_str()
                .and_then(QualityLimitationReason::parse)
                .map(Self::QualityLimitation)
                .unwrap_or(Self::Ignored),
            Value::String(s) => Self::Label(s.clone()),
            Value::Bool(b) => Self::Label(b.to_string()),
        }
    }
}

/// 한 세션의 한 보고 주기에 속한 stats 레코드
///
/// `fields`는 입력 순서를 그대로 유지한다. `type` 필드 자체도 다른 문자열
/// 필드처럼 레이블로 남는다.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsRecord {
    /// 레코드 타입 (예: "inbound-rtp", "peer-connection")
    pub kind: String,
    /// 입력 순서대로 분류된 필드
    pub fields: Vec<(String, FieldValue)>,
}

impl StatsRecord {
    /// 빈 레코드 생성
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            fields: Vec::new(),
        }
    }

    /// 필드 추가 (빌더)
    pub fn with_field(mut self, key: impl Into<String>, value: FieldValue) -> Self {
        self.fields.push((key.into(), value));
        self
    }

    /// JSON 객체에서 레코드 생성
    pub fn from_map(map: &Map<String, Value>) -> Result<Self, String> {
        let kind = map
            .get(TYPE_FIELD)
            .and_then(Value::as_str)
            .ok_or_else(|| "stats 레코드에 문자열 type 필드가 없음".to_string())?
            .to_string();

        let fields = map
            .iter()
            .map(|(key, value)| (key.clone(), FieldValue::classify(key, value)))
            .collect();

        Ok(Self { kind, fields })
    }

    /// 연결 상태 레이블 대상 여부
    pub fn is_peer_connection(&self) -> bool {
        self.kind == PEER_CONNECTION_TYPE
    }
}

impl<'de> Deserialize<'de> for StatsRecord {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let map = Map::<String, Value>::deserialize(deserializer)?;
        Self::from_map(&map).map_err(de::Error::custom)
    }
}
