//! 메트릭 텍스트 인코더.
//!
//! stats 레코드를 줄 단위 gauge 텍스트로 변환한다. 순수 함수이며 상태가 없다.
//!
//! ```text
//! # TYPE inbound_rtp_bytesReceived gauge
//! inbound_rtp_bytesReceived{pageUrl="https://a.test/",type="inbound-rtp"} 1200
//! ```

use peerstat_core::models::stats::{FieldValue, StatsRecord};
use std::collections::HashSet;
use std::fmt::Write;

/// 메트릭 한 줄
#[derive(Debug, Clone, PartialEq)]
pub struct MetricLine {
    /// `{type}_{field}` (하이픈은 밑줄로)
    pub name: String,
    /// 순서가 유지되는 레이블
    pub labels: Vec<(String, String)>,
    /// 값
    pub value: f64,
}

/// 레코드들을 메트릭 줄로 펼친다
///
/// 레이블은 `pageUrl`로 시작하고, `peer-connection` 레코드는 `state`가 이어진다.
/// 문자열 필드는 레코드 안의 위치와 무관하게 그 레코드의 모든 메트릭에 붙는다.
pub fn metric_lines(url: &str, state: &str, records: &[StatsRecord]) -> Vec<MetricLine> {
    let mut lines = Vec::new();

    for record in records {
        let prefix = metric_name_part(&record.kind);
        let mut labels = vec![("pageUrl".to_string(), url.to_string())];
        if record.is_peer_connection() {
            labels.push(("state".to_string(), state.to_string()));
        }

        let mut metrics: Vec<(String, f64)> = Vec::new();
        for (key, value) in &record.fields {
            match value {
                FieldValue::Number(n) => metrics.push((key.clone(), *n)),
                FieldValue::Nested(children) => {
                    for (child, n) in children {
                        metrics.push((format!("{key}_{child}"), *n));
                    }
                }
                FieldValue::QualityLimitation(reason) => {
                    metrics.push((key.clone(), f64::from(reason.code())));
                }
                FieldValue::Label(text) => labels.push((key.clone(), text.clone())),
                FieldValue::Ignored => {}
            }
        }

        lines.extend(metrics.into_iter().map(|(key, value)| MetricLine {
            name: format!("{prefix}_{}", metric_name_part(&key)),
            labels: labels.clone(),
            value,
        }));
    }

    lines
}

/// 메트릭 줄을 텍스트로 렌더링
///
/// 같은 이름의 `# TYPE` 선언은 첫 등장 직전에 한 번만 쓴다.
pub fn render(lines: &[MetricLine]) -> String {
    let mut out = String::new();
    let mut declared: HashSet<&str> = HashSet::new();

    for line in lines {
        if declared.insert(line.name.as_str()) {
            let _ = writeln!(out, "# TYPE {} gauge", line.name);
        }
        let labels = line
            .labels
            .iter()
            .map(|(k, v)| format!("{k}=\"{}\"", escape_label_value(v)))
            .collect::<Vec<_>>()
            .join(",");
        let _ = writeln!(out, "{}{{{}}} {}", line.name, labels, line.value);
    }

    out
}

/// stats 레코드 → 메트릭 텍스트
///
/// 메트릭이 하나도 없으면 빈 문자열을 반환한다 (전송하지 않음).
pub fn encode(url: &str, state: &str, records: &[StatsRecord]) -> String {
    render(&metric_lines(url, state, records))
}

fn metric_name_part(raw: &str) -> String {
    raw.replace('-', "_")
}

fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use peerstat_core::models::stats::QualityLimitationReason;
    use serde_json::json;

    fn records(value: serde_json::Value) -> Vec<StatsRecord> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn peer_connection_record_carries_state() {
        let out = encode(
            "https://a.test",
            "connected",
            &[StatsRecord::new("peer-connection")
                .with_field("bytesSent", FieldValue::Number(100.0))],
        );
        assert_eq!(
            out,
            "# TYPE peer_connection_bytesSent gauge\n\
             peer_connection_bytesSent{pageUrl=\"https://a.test\",state=\"connected\"} 100\n"
        );
    }

    #[test]
    fn labels_and_metrics_follow_input_order() {
        let out = encode(
            "https://a.test/room",
            "connected",
            &records(json!([{
                "type": "inbound-rtp",
                "kind": "video",
                "packetsLost": 3,
                "jitter": 0.25,
                "mid": "1"
            }])),
        );
        let labels = r#"{pageUrl="https://a.test/room",type="inbound-rtp",kind="video",mid="1"}"#;
        assert_eq!(
            out,
            format!(
                "# TYPE inbound_rtp_packetsLost gauge\ninbound_rtp_packetsLost{labels} 3\n\
                 # TYPE inbound_rtp_jitter gauge\ninbound_rtp_jitter{labels} 0.25\n"
            )
        );
    }

    #[test]
    fn type_line_emitted_once_per_name() {
        let batch = records(json!([
            {"type": "outbound-rtp", "ssrc": "1", "bytesSent": 10},
            {"type": "outbound-rtp", "ssrc": "2", "bytesSent": 20},
            {"type": "outbound-rtp", "ssrc": "3", "bytesSent": 30}
        ]));
        let out = encode("https://a.test", "connected", &batch);

        assert_eq!(out.matches("# TYPE outbound_rtp_bytesSent gauge\n").count(), 1);
        assert!(out.starts_with("# TYPE outbound_rtp_bytesSent gauge\n"));
        assert_eq!(out.lines().count(), 4);
    }

    #[test]
    fn encoding_is_deterministic() {
        let batch = records(json!([
            {"type": "inbound-rtp", "b": 1, "a": 2, "nested": {"y": 1, "x": 2}},
            {"type": "candidate-pair", "state": "succeeded", "currentRoundTripTime": 0.01}
        ]));
        let first = encode("https://a.test", "connected", &batch);
        let second = encode("https://a.test", "connected", &batch);
        assert_eq!(first, second);
        assert!(first.find("inbound_rtp_b{").unwrap() < first.find("inbound_rtp_a{").unwrap());
        assert!(first.find("nested_y").unwrap() < first.find("nested_x").unwrap());
    }

    #[test]
    fn nested_numbers_expand_and_strings_are_dropped() {
        let lines = metric_lines(
            "https://a.test",
            "connected",
            &[StatsRecord::from_map(
                json!({"type": "bar", "foo": {"a": 1, "b": "x"}})
                    .as_object()
                    .unwrap(),
            )
            .unwrap()],
        );
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].name, "bar_foo_a");
        assert_eq!(lines[0].value, 1.0);
    }

    #[test]
    fn quality_limitation_reason_is_coded() {
        let batch = records(json!([
            {"type": "outbound-rtp", "qualityLimitationReason": "cpu"}
        ]));
        let lines = metric_lines("https://a.test", "connected", &batch);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].name, "outbound_rtp_qualityLimitationReason");
        assert_eq!(lines[0].value, 2.0);

        let reason = QualityLimitationReason::Bandwidth;
        let manual = [StatsRecord::new("outbound-rtp")
            .with_field("qualityLimitationReason", FieldValue::QualityLimitation(reason))];
        assert_eq!(metric_lines("u", "s", &manual)[0].value, 1.0);
    }

    #[test]
    fn unknown_quality_limitation_reason_produces_nothing() {
        let batch = records(json!([
            {"type": "outbound-rtp", "qualityLimitationReason": "thermal", "bytesSent": 5}
        ]));
        let out = encode("https://a.test", "connected", &batch);
        assert!(!out.contains("qualityLimitationReason"));
        assert!(!out.contains("thermal"));
        assert!(out.contains("outbound_rtp_bytesSent"));
    }

    #[test]
    fn diagnostic_field_is_ignored() {
        let batch = records(json!([
            {"type": "inbound-rtp", "googTimingFrameInfo": "1,2,3", "framesDecoded": 7}
        ]));
        let out = encode("https://a.test", "connected", &batch);
        assert!(!out.contains("googTimingFrameInfo"));
        assert!(out.contains("inbound_rtp_framesDecoded"));
    }

    #[test]
    fn hyphens_become_underscores_in_names() {
        let out = encode(
            "https://a.test",
            "connected",
            &[StatsRecord::new("remote-inbound-rtp")
                .with_field("round-trip", FieldValue::Nested(vec![("p-50".to_string(), 4.0)]))],
        );
        assert!(out.contains("remote_inbound_rtp_round_trip_p_50{"));
    }

    #[test]
    fn no_metrics_yields_empty_string() {
        let batch = records(json!([{"type": "codec", "mimeType": "video/VP8"}]));
        assert_eq!(encode("https://a.test", "connected", &batch), "");
        assert_eq!(encode("https://a.test", "connected", &[]), "");
    }

    #[test]
    fn label_values_are_escaped() {
        let out = encode(
            "https://a.test",
            "connected",
            &[StatsRecord::new("track")
                .with_field("label", FieldValue::Label("say \"hi\"".to_string()))
                .with_field("frames", FieldValue::Number(1.0))],
        );
        assert!(out.contains(r#"label="say \"hi\"""#));
    }
}
