use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, SecondsFormat};
use mesa_core::dates::{DateOracle, OracleError};
use mesa_shared::Masked;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

const DEFAULT_TEMPERATURE: f32 = 0.0;

const SYSTEM_PROMPT: &str = r#"Eres un asistente que interpreta expresiones temporales en español y devuelve una fecha calendario concreta.

Debes seguir estas instrucciones obligatorias:

1. Resuelve una fecha calendario a partir de la expresión temporal del usuario.
2. Prioriza siempre la información explícita presente en la expresión del usuario.
3. Si faltan datos (mes, año), complétalos usando el contexto temporal actual proporcionado.
4. Si se menciona un número entre 1 y 31 sin aclaración adicional, interprétalo como día del mes, no como número de semana del año.
5. "La semana del X" se define como la semana que contiene el día X del mes asumido.
6. "El lunes de la semana del X" corresponde al lunes de esa semana.
7. La semana comienza en lunes.
8. No utilices semanas ISO del año.
9. No proyectes a meses futuros ni pasados si existe una interpretación válida en el mes actual.
10. No inventes ni completes información que no sea estrictamente necesaria.

Devuelve SIEMPRE y EXCLUSIVAMENTE un JSON con esta estructura exacta:
{
  "fecha": "YYYY-MM-DD"
}"#;

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DateAnswer {
    #[serde(default)]
    fecha: Option<String>,
}

/// Date oracle backed by an OpenAI chat completion in JSON mode.
pub struct OpenAiDateOracle {
    http: reqwest::Client,
    api_key: Masked<String>,
    api_url: String,
    model: String,
}

impl OpenAiDateOracle {
    pub fn new(
        api_key: Masked<String>,
        api_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_key,
            api_url: api_url.into(),
            model: model.into(),
        })
    }

    fn user_prompt(expression: &str, reference: &DateTime<FixedOffset>) -> String {
        format!(
            "Contexto temporal actual:\n{}\n\nExpresión temporal proporcionada por el usuario:\n{}",
            reference.to_rfc3339_opts(SecondsFormat::Secs, false),
            expression
        )
    }

    async fn handle_error_status(status: u16, response: reqwest::Response) -> OracleError {
        let message = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());

        match status {
            401 | 403 => OracleError::AuthFailed,
            429 => OracleError::RateLimited,
            _ => OracleError::RequestFailed(format!("status {}: {}", status, message)),
        }
    }
}

/// `Some(date)` only for a strict `YYYY-MM-DD` answer.
fn parse_answer(content: &str) -> Option<NaiveDate> {
    let answer: DateAnswer = serde_json::from_str(content).ok()?;
    let fecha = answer.fecha?;
    NaiveDate::parse_from_str(fecha.trim(), "%Y-%m-%d").ok()
}

#[async_trait]
impl DateOracle for OpenAiDateOracle {
    async fn resolve(
        &self,
        expression: &str,
        reference: DateTime<FixedOffset>,
    ) -> Result<Option<NaiveDate>, OracleError> {
        let prompt = Self::user_prompt(expression, &reference);

        let request = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: SYSTEM_PROMPT },
                ChatMessage { role: "user", content: &prompt },
            ],
            temperature: DEFAULT_TEMPERATURE,
            response_format: ResponseFormat { format_type: "json_object" },
        };

        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(self.api_key.expose())
            .json(&request)
            .send()
            .await
            .map_err(|e| OracleError::RequestFailed(e.to_string()))?;

        let status = response.status();
        debug!(status = status.as_u16(), "Received date oracle response");

        if !status.is_success() {
            return Err(Self::handle_error_status(status.as_u16(), response).await);
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| OracleError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| OracleError::InvalidResponse("Response contained no choices".to_string()))?;

        let date = parse_answer(&content);
        match date {
            Some(date) => info!(expression, %date, "Date expression resolved"),
            None => warn!(expression, content = %content, "Date oracle gave no usable date"),
        }

        Ok(date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn oracle(server: &MockServer) -> OpenAiDateOracle {
        OpenAiDateOracle::new(
            Masked("test-api-key".to_string()),
            format!("{}/v1/chat/completions", server.uri()),
            "gpt-4o-mini",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn reference() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(2026, 10, 18, 12, 0, 0)
            .unwrap()
    }

    fn completion(content: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": content } }]
        }))
    }

    #[tokio::test]
    async fn test_resolves_date_in_json_mode() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer test-api-key"))
            .and(body_partial_json(json!({
                "model": "gpt-4o-mini",
                "temperature": 0.0,
                "response_format": { "type": "json_object" }
            })))
            .and(body_string_contains("2026-10-18T12:00:00+01:00"))
            .and(body_string_contains("el viernes que viene"))
            .respond_with(completion(r#"{"fecha": "2026-10-23"}"#))
            .expect(1)
            .mount(&server)
            .await;

        let date = oracle(&server)
            .resolve("el viernes que viene", reference())
            .await
            .unwrap();

        assert_eq!(date, NaiveDate::from_ymd_opt(2026, 10, 23));
    }

    #[tokio::test]
    async fn test_blank_or_malformed_answer_is_unresolved() {
        for content in [r#"{"fecha": ""}"#, r#"{"fecha": "23/10/2026"}"#, "no sé", "{}"] {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(completion(content))
                .mount(&server)
                .await;

            let date = oracle(&server).resolve("algún día", reference()).await.unwrap();

            assert!(date.is_none(), "content {content:?} should not resolve");
        }
    }

    #[tokio::test]
    async fn test_authentication_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Invalid API key"))
            .mount(&server)
            .await;

        let result = oracle(&server).resolve("mañana", reference()).await;

        assert!(matches!(result, Err(OracleError::AuthFailed)));
    }

    #[tokio::test]
    async fn test_rate_limit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let result = oracle(&server).resolve("mañana", reference()).await;

        assert!(matches!(result, Err(OracleError::RateLimited)));
    }

    #[tokio::test]
    async fn test_empty_choices_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let result = oracle(&server).resolve("mañana", reference()).await;

        assert!(matches!(result, Err(OracleError::InvalidResponse(_))));
    }
}
