//! Client for the external text-generation API (OpenAI-compatible chat
//! completions). The client is constructed once at startup and handed
//! around through `AppState` — no process-wide singleton. Every caller
//! treats the output as untrusted and sanitizes or falls back.

use crate::config::Config;
use crate::models::checkin::Checkin;
use crate::models::profile::SleepProfile;
use crate::models::report::{PrevWeekStats, StructuredReport, WeeklyStats};
use crate::services::report::{build_report_prompt, fallback_report, sanitize_generated_report};

const CHAT_COMPLETIONS_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

const REPORT_SYSTEM_PROMPT: &str =
    "You are a sleep coaching AI. Return only valid JSON. No markdown. No explanation.";

#[derive(Debug, Clone)]
pub struct TextGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl TextGenerator {
    pub fn new(config: &Config) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.llm_timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            api_key: config.groq_api_key.clone(),
            model: config.groq_model.clone(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// One blocking, fallible completion call. No retries — a failure
    /// routes the caller into its local fallback.
    pub async fn generate(
        &self,
        system: Option<&str>,
        prompt: &str,
        max_tokens: u32,
        temperature: f64,
    ) -> Result<String, anyhow::Error> {
        if !self.is_configured() {
            anyhow::bail!("text generation is not configured (missing API key)");
        }

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system {
            messages.push(serde_json::json!({ "role": "system", "content": system }));
        }
        messages.push(serde_json::json!({ "role": "user", "content": prompt }));

        let response = self
            .client
            .post(CHAT_COMPLETIONS_URL)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "model": self.model,
                "messages": messages,
                "max_tokens": max_tokens,
                "temperature": temperature,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("text generation API error {}: {}", status, body);
        }

        let body: serde_json::Value = response.json().await?;
        let content = body["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.trim().to_string())
            .unwrap_or_default();

        if content.is_empty() {
            anyhow::bail!("empty response from text generation API");
        }
        Ok(content)
    }
}

// ── Daily feedback ───────────────────────────────────────────────────

pub(crate) fn build_daily_feedback_prompt(
    checkin: &Checkin,
    profile: Option<&SleepProfile>,
) -> String {
    let mut prompt = format!(
        r#"You are a friendly sleep coach for students. Write EXACTLY 2 short sentences.
Sentence 1: One observation about this night's sleep.
Sentence 2: One small, actionable tip for tonight.

Data:
- Slept {} hours
- Sleep quality: {}/5
- Mood: {}/5
- Used phone before bed: {}"#,
        checkin.sleep_hours,
        checkin.sleep_quality,
        checkin.mood,
        if checkin.phone_before_bed { "yes" } else { "no" },
    );

    if let Some(notes) = checkin.notes.as_deref().filter(|n| !n.is_empty()) {
        prompt.push_str(&format!("\n- Notes: \"{notes}\""));
    }
    if let Some(profile) = profile {
        prompt.push_str(&format!("\n- Bedtime goal: {}", profile.bedtime_goal));
        if !profile.sleep_challenges.is_empty() {
            let challenges: Vec<&str> =
                profile.sleep_challenges.iter().map(|c| c.as_str()).collect();
            prompt.push_str(&format!("\n- Challenges: {}", challenges.join(", ")));
        }
    }

    prompt.push_str(
        "\n\nRules:\n- Max 2 sentences total\n- Friendly, warm tone\n- No medical language\n- Be specific to the data above",
    );
    prompt
}

/// Two-sentence coaching note for a just-submitted check-in. Callers
/// treat a failure as "no feedback" — it never blocks the submission.
pub async fn generate_daily_feedback(
    generator: &TextGenerator,
    checkin: &Checkin,
    profile: Option<&SleepProfile>,
) -> Result<String, anyhow::Error> {
    let prompt = build_daily_feedback_prompt(checkin, profile);
    generator.generate(None, &prompt, 100, 0.7).await
}

// ── Weekly report ────────────────────────────────────────────────────

/// Produce the structured weekly report. Infallible by construction:
/// generator errors and unparseable replies both collapse into the
/// deterministic local report.
pub async fn generate_weekly_report(
    generator: &TextGenerator,
    user_name: &str,
    stats: &WeeklyStats,
    profile: &SleepProfile,
    prev: Option<&PrevWeekStats>,
    checkins: &[Checkin],
) -> StructuredReport {
    let prompt = build_report_prompt(user_name, stats, profile, prev, checkins);

    match generator
        .generate(Some(REPORT_SYSTEM_PROMPT), &prompt, 500, 0.6)
        .await
    {
        Ok(text) => sanitize_generated_report(&text).unwrap_or_else(|| {
            tracing::warn!("Generated report was not valid JSON, using deterministic fallback");
            fallback_report(stats, prev)
        }),
        Err(e) => {
            tracing::warn!(error = %e, "Text generation unavailable, using deterministic fallback");
            fallback_report(stats, prev)
        }
    }
}
