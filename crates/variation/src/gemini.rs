use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use mathvar_core::{NumberVariation, VariationSettings};

use crate::service::{VariationError, VariationService};

fn re_json_object() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("invalid regex"))
}

const PROMPT_RULES: &str = "\
다음 수학 문제에서 숫자를 1-3개만 골라 합리적으로 바꿔주세요. 바뀐 숫자는 원래 문제의 난이도와 패턴을 유지해야 합니다.

규칙:
1. 바꾸는 숫자는 최소 1개, 최대 3개
2. 바뀐 숫자는 5자리를 넘지 않음
3. \"(단, ...)\" 조건 안의 숫자는 바꾸지 않음
4. 문제의 교육적 목적과 난이도를 유지
5. 어떤 숫자도 0이 되지 않도록 함";

const PROMPT_FORMAT: &str = r#"응답은 반드시 다음 JSON 형식으로만 답해주세요:
{
  "originalNumbers": ["원본숫자1", "원본숫자2"],
  "modifiedNumbers": ["변형숫자1", "변형숫자2"],
  "positions": [위치1, 위치2],
  "modifiedText": "숫자가 바뀐 전체 문제 텍스트"
}

예시:
입력: "철수는 사과 5개와 배 3개를 가지고 있다. 총 몇 개인가?"
출력:
{
  "originalNumbers": ["5", "3"],
  "modifiedNumbers": ["7", "4"],
  "positions": [7, 13],
  "modifiedText": "철수는 사과 7개와 배 4개를 가지고 있다. 총 몇 개인가?"
}"#;

/// Build the instruction prompt for one text. `context` is the paired
/// problem or solution, given to the model for consistency only.
pub fn build_prompt(text: &str, context: Option<&str>) -> String {
    let mut prompt = format!("{PROMPT_RULES}\n\n문제: {text}\n");
    if let Some(ctx) = context.filter(|c| !c.trim().is_empty()) {
        prompt.push_str(&format!("참고: {ctx}\n"));
    }
    prompt.push('\n');
    prompt.push_str(PROMPT_FORMAT);
    prompt
}

// ── Wire types ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

/// Fields the model is asked for. Everything is optional here so missing
/// ones are reported by name instead of as a serde error.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawVariation {
    original_numbers: Option<Vec<Value>>,
    modified_numbers: Option<Vec<Value>>,
    positions: Option<Vec<Value>>,
    modified_text: Option<String>,
}

fn number_string(v: Value) -> String {
    match v {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Pull the variation JSON out of a model answer. The answer may wrap the
/// object in prose or code fences.
pub fn parse_variation_response(answer: &str) -> Result<NumberVariation, VariationError> {
    let object = re_json_object()
        .find(answer)
        .ok_or(VariationError::NoJson)?
        .as_str();
    let raw: RawVariation = serde_json::from_str(object)?;

    let original = raw
        .original_numbers
        .ok_or(VariationError::Incomplete("originalNumbers"))?;
    let modified = raw
        .modified_numbers
        .ok_or(VariationError::Incomplete("modifiedNumbers"))?;
    let modified_text = raw
        .modified_text
        .filter(|t| !t.trim().is_empty())
        .ok_or(VariationError::Incomplete("modifiedText"))?;

    let mut variation = NumberVariation {
        original_numbers: original.into_iter().map(number_string).collect(),
        modified_numbers: modified.into_iter().map(number_string).collect(),
        positions: raw
            .positions
            .unwrap_or_default()
            .iter()
            .filter_map(|p| p.as_u64().map(|p| p as usize))
            .collect(),
        modified_text,
    };
    variation.truncate_changes();
    Ok(variation)
}

fn answer_text(response: GenerateContentResponse) -> Option<String> {
    let parts = response.candidates.into_iter().next()?.content?.parts;
    let text: String = parts.into_iter().filter_map(|p| p.text).collect();
    (!text.trim().is_empty()).then_some(text)
}

// ── Client ───────────────────────────────────────────────────────────────────

pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, VariationError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: api_key.into(),
        })
    }

    /// Build a client from config, reading the key from the configured
    /// environment variable.
    pub fn from_settings(settings: &VariationSettings) -> Result<Self, VariationError> {
        let api_key = settings
            .api_key()
            .ok_or_else(|| VariationError::MissingApiKey(settings.api_key_env.clone()))?;
        Self::new(
            settings.endpoint.clone(),
            settings.model.clone(),
            api_key,
            settings.timeout(),
        )
    }

    pub fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }

    async fn call(&self, prompt: String) -> Result<String, VariationError> {
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response = self
            .http
            .post(self.url())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VariationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = response.json().await?;
        answer_text(parsed).ok_or(VariationError::EmptyResponse)
    }
}

impl VariationService for GeminiClient {
    async fn generate(
        &self,
        text: &str,
        context: Option<&str>,
    ) -> Result<NumberVariation, VariationError> {
        debug!(model = %self.model, "requesting number variation");
        let answer = self.call(build_prompt(text, context)).await?;
        let variation = parse_variation_response(&answer)?;
        info!(
            changed = variation.original_numbers.len(),
            "number variation received"
        );
        Ok(variation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_json_embedded_in_prose() {
        let answer = "물론입니다!\n```json\n{\"originalNumbers\":[\"5\",\"3\"],\"modifiedNumbers\":[\"7\",\"4\"],\"positions\":[7,13],\"modifiedText\":\"사과 7개와 배 4개\"}\n```\n도움이 되었길 바랍니다.";
        let v = parse_variation_response(answer).unwrap();
        assert_eq!(v.original_numbers, vec!["5", "3"]);
        assert_eq!(v.modified_numbers, vec!["7", "4"]);
        assert_eq!(v.positions, vec![7, 13]);
        assert_eq!(v.modified_text, "사과 7개와 배 4개");
    }

    #[test]
    fn truncates_to_three_changes() {
        let answer = r#"{"originalNumbers":["1","2","3","4"],"modifiedNumbers":["5","6","7","8"],"positions":[0,2,4,6],"modifiedText":"5 6 7 4"}"#;
        let v = parse_variation_response(answer).unwrap();
        assert_eq!(v.original_numbers.len(), 3);
        assert_eq!(v.modified_numbers, vec!["5", "6", "7"]);
        assert_eq!(v.positions, vec![0, 2, 4]);
    }

    #[test]
    fn numeric_values_and_missing_positions_accepted() {
        let answer = r#"{"originalNumbers":[5, 2.5],"modifiedNumbers":[6, 3.1],"modifiedText":"6 and 3.1"}"#;
        let v = parse_variation_response(answer).unwrap();
        assert_eq!(v.original_numbers, vec!["5", "2.5"]);
        assert_eq!(v.modified_numbers, vec!["6", "3.1"]);
        assert!(v.positions.is_empty());
    }

    #[test]
    fn missing_fields_rejected() {
        let no_text = r#"{"originalNumbers":["5"],"modifiedNumbers":["7"]}"#;
        assert!(matches!(
            parse_variation_response(no_text),
            Err(VariationError::Incomplete("modifiedText"))
        ));
        let no_modified = r#"{"originalNumbers":["5"],"modifiedText":"7"}"#;
        assert!(matches!(
            parse_variation_response(no_modified),
            Err(VariationError::Incomplete("modifiedNumbers"))
        ));
    }

    #[test]
    fn no_json_or_bad_json_rejected() {
        assert!(matches!(
            parse_variation_response("죄송합니다, 답할 수 없습니다."),
            Err(VariationError::NoJson)
        ));
        assert!(matches!(
            parse_variation_response("{ not json }"),
            Err(VariationError::Json(_))
        ));
    }

    #[test]
    fn prompt_carries_text_and_context() {
        let p = build_prompt("사과 5개", Some("답: 5"));
        assert!(p.contains("문제: 사과 5개"));
        assert!(p.contains("참고: 답: 5"));
        assert!(p.contains("\"modifiedText\""));

        let bare = build_prompt("사과 5개", Some("  "));
        assert!(!bare.contains("참고:"));
    }

    #[test]
    fn answer_text_joins_parts_of_first_candidate() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":"{\"a\":"},{"text":"1}"}]}}]}"#;
        let resp: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(answer_text(resp).as_deref(), Some("{\"a\":1}"));

        let empty: GenerateContentResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(answer_text(empty).is_none());
    }

    #[test]
    fn client_url_and_missing_key() {
        let client = GeminiClient::new(
            "https://example.test/v1beta/",
            "gemini-1.5-flash",
            "k",
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            client.url(),
            "https://example.test/v1beta/models/gemini-1.5-flash:generateContent"
        );

        let settings = VariationSettings {
            api_key_env: "MATHVAR_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..VariationSettings::default()
        };
        assert!(matches!(
            GeminiClient::from_settings(&settings),
            Err(VariationError::MissingApiKey(_))
        ));
    }
}
