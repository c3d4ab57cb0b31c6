//! Weekly-report building blocks: stats aggregation fallback, keyword
//! extraction, trend comparison, prompt construction, generated-output
//! sanitization, and the deterministic local report used whenever the
//! text generator is unavailable or returns garbage.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::models::checkin::Checkin;
use crate::models::profile::SleepProfile;
use crate::models::report::{PrevWeekStats, StructuredReport, WeeklyStats};

const STOP_WORDS: &[&str] = &[
    "i", "a", "the", "was", "had", "my", "to", "and", "it", "but", "so", "in", "of", "for", "on",
    "is", "at", "this", "that", "with",
];

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

// ── Cache policy ─────────────────────────────────────────────────────

/// A saved report younger than the TTL is served as-is instead of
/// regenerating.
pub fn report_is_fresh(created_at: DateTime<Utc>, now: DateTime<Utc>, ttl_hours: i64) -> bool {
    now - created_at < Duration::hours(ttl_hours)
}

// ── Stats ────────────────────────────────────────────────────────────

/// Recompute a weekly-stats object directly from check-in rows. Used
/// when the calendar window is empty and the pipeline falls back to the
/// most recent check-ins regardless of date. Phone-split averages are
/// not derived on this path.
pub fn compute_stats_from_checkins(checkins: &[Checkin]) -> WeeklyStats {
    if checkins.is_empty() {
        return WeeklyStats {
            total_checkins: 0,
            avg_quality: None,
            avg_mood: None,
            avg_sleep_hours: None,
            earliest_bedtime: None,
            latest_bedtime: None,
            earliest_wakeup: None,
            latest_wakeup: None,
            phone_nights: 0,
            avg_quality_phone: None,
            avg_quality_no_phone: None,
        };
    }

    let n = checkins.len() as f64;
    let avg_quality = checkins.iter().map(|c| f64::from(c.sleep_quality)).sum::<f64>() / n;
    let avg_mood = checkins.iter().map(|c| f64::from(c.mood)).sum::<f64>() / n;
    let avg_hours = checkins.iter().map(|c| c.sleep_hours).sum::<f64>() / n;

    let mut bedtimes: Vec<&str> = checkins.iter().map(|c| c.bedtime.as_str()).collect();
    let mut wakeups: Vec<&str> = checkins.iter().map(|c| c.wakeup_time.as_str()).collect();
    bedtimes.sort_unstable();
    wakeups.sort_unstable();

    WeeklyStats {
        total_checkins: checkins.len() as i64,
        avg_quality: Some(round1(avg_quality)),
        avg_mood: Some(round1(avg_mood)),
        avg_sleep_hours: Some(round1(avg_hours)),
        earliest_bedtime: bedtimes.first().map(|s| s.to_string()),
        latest_bedtime: bedtimes.last().map(|s| s.to_string()),
        earliest_wakeup: wakeups.first().map(|s| s.to_string()),
        latest_wakeup: wakeups.last().map(|s| s.to_string()),
        phone_nights: checkins.iter().filter(|c| c.phone_before_bed).count() as i64,
        avg_quality_phone: None,
        avg_quality_no_phone: None,
    }
}

// ── Note keywords ────────────────────────────────────────────────────

/// Top 10 words across all non-empty notes, lowercased, letters only,
/// longer than 2 chars, stop words dropped. Frequency ties break
/// alphabetically so the output is deterministic.
pub fn extract_note_keywords(checkins: &[Checkin]) -> Vec<String> {
    let mut counts: HashMap<String, u32> = HashMap::new();

    for checkin in checkins {
        let Some(notes) = checkin.notes.as_deref() else {
            continue;
        };
        let cleaned: String = notes
            .to_lowercase()
            .chars()
            .map(|ch| if ch.is_ascii_lowercase() { ch } else { ' ' })
            .collect();
        for word in cleaned.split_whitespace() {
            if word.len() > 2 && !STOP_WORDS.contains(&word) {
                *counts.entry(word.to_string()).or_insert(0) += 1;
            }
        }
    }

    let mut entries: Vec<(String, u32)> = counts.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries.into_iter().take(10).map(|(word, _)| word).collect()
}

// ── Trend comparison ─────────────────────────────────────────────────

/// Compare a metric against last week: under 0.1 apart counts as
/// stable, otherwise the signed delta to one decimal is reported.
pub fn trend_label(current: Option<f64>, previous: Option<f64>) -> String {
    let (Some(current), Some(previous)) = (current, previous) else {
        return "no data".into();
    };
    let diff = current - previous;
    if diff.abs() < 0.1 {
        return "stable".into();
    }
    if diff > 0.0 {
        format!("improved (+{:.1})", diff)
    } else {
        format!("declined ({:.1})", diff)
    }
}

/// One-sentence phone-use correlation, with a 0.3-point dead zone.
pub fn phone_insight(stats: &WeeklyStats) -> String {
    if stats.phone_nights > 0 {
        if let Some(no_phone) = stats.avg_quality_no_phone {
            let diff = no_phone - stats.avg_quality_phone.unwrap_or(0.0);
            if diff > 0.3 {
                return format!(
                    "Sleep quality is {:.1} points higher on nights without phone use",
                    diff
                );
            }
            if diff < -0.3 {
                return "Phone use before bed did not seem to affect quality this week".into();
            }
            return "No significant difference between phone/no-phone nights".into();
        }
    }
    "No phone data available".into()
}

// ── Prompt ───────────────────────────────────────────────────────────

fn fmt_avg(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".into(), |v| v.to_string())
}

fn fmt_time(value: Option<&String>) -> &str {
    value.map_or("n/a", |s| s.as_str())
}

/// Compose the weekly-report prompt from pre-computed stats. Sending
/// aggregates instead of raw rows keeps the request small and the
/// generator grounded.
pub fn build_report_prompt(
    user_name: &str,
    stats: &WeeklyStats,
    profile: &SleepProfile,
    prev: Option<&PrevWeekStats>,
    checkins: &[Checkin],
) -> String {
    let note_keywords = extract_note_keywords(checkins);
    let quality_trend = trend_label(stats.avg_quality, prev.and_then(|p| p.avg_quality));
    let mood_trend = trend_label(stats.avg_mood, prev.and_then(|p| p.avg_mood));
    let hours_trend = trend_label(stats.avg_sleep_hours, prev.and_then(|p| p.avg_sleep_hours));

    let challenges = if profile.sleep_challenges.is_empty() {
        "none".to_string()
    } else {
        profile
            .sleep_challenges
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };

    let keywords = if note_keywords.is_empty() {
        "none".to_string()
    } else {
        note_keywords.join(", ")
    };

    format!(
        r#"You are a friendly, data-driven sleep coach for students and young professionals.
Analyze the following pre-computed sleep data and return a structured JSON report.

USER: {user_name}
GOALS: Bedtime {bedtime_goal}, Wake-up {wakeup_goal}
CHALLENGES: {challenges}

THIS WEEK ({total} check-ins):
- Avg sleep: {avg_sleep} hours
- Avg quality: {avg_quality}/5
- Avg mood: {avg_mood}/5
- Bedtime range: {earliest_bed} – {latest_bed}
- Wake range: {earliest_wake} – {latest_wake}
- Phone before bed: {phone_nights}/{total} nights

TRENDS vs last week:
- Quality: {quality_trend}
- Mood: {mood_trend}
- Sleep hours: {hours_trend}

PHONE CORRELATION: {phone}
NOTE KEYWORDS: {keywords}

Return ONLY valid JSON in this exact format (no markdown, no code blocks):
{{
  "sleep_score": <number 0-100>,
  "sleep_score_label": "<Excellent|Good|Fair|Poor>",
  "key_wins": ["<positive habit 1>", "<positive habit 2>"],
  "pattern_insights": ["<behavior correlation 1>", "<pattern 2>"],
  "focus_recommendation": "<one main actionable recommendation>",
  "coach_note": "<2-3 sentence motivational summary comparing to last week>"
}}

Rules:
- sleep_score: base on quality (40%), consistency (30%), sleep hours vs 8h goal (30%)
- key_wins: 1-3 positive observations. Be specific.
- pattern_insights: 1-3 data-backed correlations. Reference phone data if relevant.
- focus_recommendation: One clear, simple action for next week.
- coach_note: Warm, encouraging. Compare progress to last week. No medical claims.
- All text must be short and scannable (bullet-point friendly)."#,
        user_name = user_name,
        bedtime_goal = profile.bedtime_goal,
        wakeup_goal = profile.wakeup_goal,
        challenges = challenges,
        total = stats.total_checkins,
        avg_sleep = fmt_avg(stats.avg_sleep_hours),
        avg_quality = fmt_avg(stats.avg_quality),
        avg_mood = fmt_avg(stats.avg_mood),
        earliest_bed = fmt_time(stats.earliest_bedtime.as_ref()),
        latest_bed = fmt_time(stats.latest_bedtime.as_ref()),
        earliest_wake = fmt_time(stats.earliest_wakeup.as_ref()),
        latest_wake = fmt_time(stats.latest_wakeup.as_ref()),
        phone_nights = stats.phone_nights,
        phone = phone_insight(stats),
        quality_trend = quality_trend,
        mood_trend = mood_trend,
        hours_trend = hours_trend,
        keywords = keywords,
    )
}

// ── Generated-output sanitization ────────────────────────────────────

pub fn score_label(score: i32) -> &'static str {
    if score >= 80 {
        "Excellent"
    } else if score >= 60 {
        "Good"
    } else if score >= 40 {
        "Fair"
    } else {
        "Poor"
    }
}

fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").or_else(|| rest.strip_prefix("JSON")).unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

/// Loosely-shaped view of whatever the generator returned. Everything
/// is optional so one missing field does not discard the whole reply.
#[derive(Debug, Deserialize)]
struct RawGeneratedReport {
    sleep_score: Option<f64>,
    sleep_score_label: Option<String>,
    key_wins: Option<serde_json::Value>,
    pattern_insights: Option<serde_json::Value>,
    focus_recommendation: Option<String>,
    coach_note: Option<String>,
}

fn coerce_string_list(value: Option<serde_json::Value>) -> Vec<String> {
    value
        .and_then(|v| v.as_array().cloned())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Parse and sanitize generator output: fences stripped, score clamped
/// to 0–100 and rounded, label derived from the score when absent,
/// list fields coerced, text fields defaulted. `None` means the reply
/// was not JSON at all and the caller should fall back.
pub fn sanitize_generated_report(raw: &str) -> Option<StructuredReport> {
    let cleaned = strip_code_fences(raw);
    let parsed: RawGeneratedReport = serde_json::from_str(cleaned).ok()?;

    let sleep_score = parsed.sleep_score.unwrap_or(0.0).round().clamp(0.0, 100.0) as i32;
    let sleep_score_label = parsed
        .sleep_score_label
        .filter(|label| !label.is_empty())
        .unwrap_or_else(|| score_label(sleep_score).to_string());

    Some(StructuredReport {
        sleep_score,
        sleep_score_label,
        key_wins: coerce_string_list(parsed.key_wins),
        pattern_insights: coerce_string_list(parsed.pattern_insights),
        focus_recommendation: parsed
            .focus_recommendation
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "Keep logging your sleep daily to get better insights.".into()),
        coach_note: parsed.coach_note.filter(|s| !s.is_empty()).unwrap_or_else(|| {
            "Keep up the great work! Every night of tracking brings you closer to better sleep."
                .into()
        }),
    })
}

// ── Deterministic fallback ───────────────────────────────────────────

/// Fully local report used whenever the generator fails or returns
/// unparseable content. Score: quality term (40%), hours-vs-8h term
/// (30%, capped at full credit), completeness term (30%, scaled by
/// min(checkins/5, 1)).
pub fn fallback_report(stats: &WeeklyStats, prev: Option<&PrevWeekStats>) -> StructuredReport {
    let quality = stats.avg_quality.unwrap_or(3.0);
    let hours = stats.avg_sleep_hours.unwrap_or(7.0);
    let completeness = (stats.total_checkins as f64 / 5.0).min(1.0);

    let score =
        (quality / 5.0 * 40.0 + (hours / 8.0).min(1.0) * 30.0 + completeness * 30.0).round() as i32;

    let key_wins = vec![
        format!(
            "Logged {} check-in{} this week",
            stats.total_checkins,
            if stats.total_checkins > 1 { "s" } else { "" }
        ),
        if stats.avg_quality.is_some_and(|q| q >= 3.5) {
            "Maintained good sleep quality".into()
        } else {
            "Stayed consistent with tracking".into()
        },
    ];

    let pattern_insights = vec![
        format!(
            "Average sleep: {} hours per night",
            stats
                .avg_sleep_hours
                .map_or_else(|| "N/A".into(), |h| h.to_string())
        ),
        if stats.phone_nights > 0 {
            format!("Used phone before bed {} nights", stats.phone_nights)
        } else {
            "Avoided phone before bed most nights".into()
        },
    ];

    let coach_note = match prev.and_then(|p| p.avg_quality) {
        Some(prev_quality) => format!(
            "Your quality {} compared to last week. Keep tracking consistently — you're building great habits!",
            if stats.avg_quality.is_some_and(|q| q >= prev_quality) {
                "improved"
            } else {
                "dipped"
            }
        ),
        None => "Great job tracking your sleep! Keep it up and you'll start seeing patterns that can help you sleep better.".into(),
    };

    StructuredReport {
        sleep_score: score,
        sleep_score_label: score_label(score).to_string(),
        key_wins,
        pattern_insights,
        focus_recommendation:
            "Try to keep a consistent bedtime this week and see how it affects your energy.".into(),
        coach_note,
    }
}

// ── Stored-report decoding ───────────────────────────────────────────

/// Decode a persisted `report_text` payload. The canonical format is
/// `StructuredReport` JSON; anything else is wrapped as a degraded
/// report carrying the raw text in `coach_note` only.
pub fn decode_stored_report(text: &str) -> StructuredReport {
    match serde_json::from_str::<StructuredReport>(text) {
        Ok(report) => report,
        Err(_) => StructuredReport {
            sleep_score: 0,
            sleep_score_label: "N/A".into(),
            key_wins: Vec::new(),
            pattern_insights: Vec::new(),
            focus_recommendation: String::new(),
            coach_note: text.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn stats(
        total: i64,
        quality: Option<f64>,
        mood: Option<f64>,
        hours: Option<f64>,
        phone_nights: i64,
    ) -> WeeklyStats {
        WeeklyStats {
            total_checkins: total,
            avg_quality: quality,
            avg_mood: mood,
            avg_sleep_hours: hours,
            earliest_bedtime: Some("22:30".into()),
            latest_bedtime: Some("23:45".into()),
            earliest_wakeup: Some("06:30".into()),
            latest_wakeup: Some("08:00".into()),
            phone_nights,
            avg_quality_phone: None,
            avg_quality_no_phone: None,
        }
    }

    fn checkin_with_notes(notes: Option<&str>) -> Checkin {
        Checkin {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            checkin_date: NaiveDate::from_ymd_opt(2026, 2, 10).unwrap(),
            bedtime: "23:00".into(),
            wakeup_time: "07:00".into(),
            sleep_quality: 3,
            mood: 3,
            phone_before_bed: false,
            notes: notes.map(str::to_string),
            sleep_hours: 8.0,
            created_at: Utc::now(),
        }
    }

    // ── report_is_fresh ──────────────────────────────────────────────

    #[test]
    fn test_report_fresh_within_ttl() {
        let now = Utc::now();
        assert!(report_is_fresh(now - Duration::hours(23), now, 24));
        assert!(!report_is_fresh(now - Duration::hours(24), now, 24));
        assert!(!report_is_fresh(now - Duration::days(3), now, 24));
    }

    // ── compute_stats_from_checkins ──────────────────────────────────

    #[test]
    fn test_stats_from_checkins() {
        let mut a = checkin_with_notes(None);
        a.sleep_quality = 4;
        a.mood = 2;
        a.sleep_hours = 7.5;
        a.bedtime = "23:30".into();
        a.wakeup_time = "07:00".into();
        a.phone_before_bed = true;
        let mut b = checkin_with_notes(None);
        b.sleep_quality = 3;
        b.mood = 5;
        b.sleep_hours = 6.0;
        b.bedtime = "22:00".into();
        b.wakeup_time = "06:15".into();

        let stats = compute_stats_from_checkins(&[a, b]);
        assert_eq!(stats.total_checkins, 2);
        assert_eq!(stats.avg_quality, Some(3.5));
        assert_eq!(stats.avg_mood, Some(3.5));
        assert_eq!(stats.avg_sleep_hours, Some(6.8));
        assert_eq!(stats.earliest_bedtime.as_deref(), Some("22:00"));
        assert_eq!(stats.latest_bedtime.as_deref(), Some("23:30"));
        assert_eq!(stats.earliest_wakeup.as_deref(), Some("06:15"));
        assert_eq!(stats.latest_wakeup.as_deref(), Some("07:00"));
        assert_eq!(stats.phone_nights, 1);
        assert_eq!(stats.avg_quality_phone, None);
    }

    #[test]
    fn test_stats_from_no_checkins_is_zeroed() {
        let stats = compute_stats_from_checkins(&[]);
        assert_eq!(stats.total_checkins, 0);
        assert_eq!(stats.avg_quality, None);
        assert_eq!(stats.phone_nights, 0);
    }

    // ── extract_note_keywords ────────────────────────────────────────

    #[test]
    fn test_keywords_drop_stop_words_and_short_words() {
        let checkins = vec![
            checkin_with_notes(Some("I had coffee late and it was bad")),
            checkin_with_notes(Some("Coffee again, stressful day at work!")),
            checkin_with_notes(None),
        ];
        let keywords = extract_note_keywords(&checkins);
        assert_eq!(keywords[0], "coffee");
        assert!(keywords.contains(&"late".to_string()));
        assert!(keywords.contains(&"stressful".to_string()));
        assert!(!keywords.contains(&"had".to_string()));
        assert!(!keywords.contains(&"at".to_string()));
    }

    #[test]
    fn test_keywords_capped_at_ten() {
        let notes = "alpha bravo charlie delta echo foxtrot golf hotel india juliett kilo lima";
        let keywords = extract_note_keywords(&[checkin_with_notes(Some(notes))]);
        assert_eq!(keywords.len(), 10);
        // All tie at one occurrence, so alphabetical order decides.
        assert_eq!(keywords[0], "alpha");
    }

    #[test]
    fn test_keywords_strip_non_letters() {
        let keywords =
            extract_note_keywords(&[checkin_with_notes(Some("woke up at 3am, too much noise!!!"))]);
        assert!(keywords.contains(&"noise".to_string()));
        assert!(keywords.contains(&"woke".to_string()));
        assert!(!keywords.iter().any(|k| k.contains('3')));
    }

    // ── trend_label ──────────────────────────────────────────────────

    #[test]
    fn test_trend_label_variants() {
        assert_eq!(trend_label(None, Some(3.0)), "no data");
        assert_eq!(trend_label(Some(3.0), None), "no data");
        assert_eq!(trend_label(Some(3.05), Some(3.0)), "stable");
        assert_eq!(trend_label(Some(3.5), Some(3.0)), "improved (+0.5)");
        assert_eq!(trend_label(Some(2.8), Some(3.2)), "declined (-0.4)");
    }

    // ── phone_insight ────────────────────────────────────────────────

    #[test]
    fn test_phone_insight_higher_without_phone() {
        let mut s = stats(7, Some(3.5), Some(3.0), Some(7.0), 3);
        s.avg_quality_phone = Some(3.0);
        s.avg_quality_no_phone = Some(3.8);
        assert_eq!(
            phone_insight(&s),
            "Sleep quality is 0.8 points higher on nights without phone use"
        );
    }

    #[test]
    fn test_phone_insight_dead_zone() {
        let mut s = stats(7, Some(3.5), Some(3.0), Some(7.0), 3);
        s.avg_quality_phone = Some(3.6);
        s.avg_quality_no_phone = Some(3.8);
        assert_eq!(
            phone_insight(&s),
            "No significant difference between phone/no-phone nights"
        );
    }

    #[test]
    fn test_phone_insight_no_data() {
        let s = stats(7, Some(3.5), Some(3.0), Some(7.0), 0);
        assert_eq!(phone_insight(&s), "No phone data available");
    }

    // ── sanitize_generated_report ────────────────────────────────────

    #[test]
    fn test_sanitize_complete_response() {
        let raw = r#"{"sleep_score": 72.4, "sleep_score_label": "Good",
            "key_wins": ["Consistent bedtime"], "pattern_insights": ["Phone hurts quality"],
            "focus_recommendation": "Earlier nights", "coach_note": "Nice week!"}"#;
        let report = sanitize_generated_report(raw).unwrap();
        assert_eq!(report.sleep_score, 72);
        assert_eq!(report.sleep_score_label, "Good");
        assert_eq!(report.key_wins, vec!["Consistent bedtime"]);
    }

    #[test]
    fn test_sanitize_strips_code_fences() {
        let raw = "```json\n{\"sleep_score\": 55}\n```";
        let report = sanitize_generated_report(raw).unwrap();
        assert_eq!(report.sleep_score, 55);
    }

    #[test]
    fn test_sanitize_clamps_score() {
        let report = sanitize_generated_report(r#"{"sleep_score": 140}"#).unwrap();
        assert_eq!(report.sleep_score, 100);
        let report = sanitize_generated_report(r#"{"sleep_score": -5}"#).unwrap();
        assert_eq!(report.sleep_score, 0);
    }

    #[test]
    fn test_sanitize_derives_label_from_score() {
        let report = sanitize_generated_report(r#"{"sleep_score": 85}"#).unwrap();
        assert_eq!(report.sleep_score_label, "Excellent");
        let report = sanitize_generated_report(r#"{"sleep_score": 61}"#).unwrap();
        assert_eq!(report.sleep_score_label, "Good");
        let report = sanitize_generated_report(r#"{"sleep_score": 40}"#).unwrap();
        assert_eq!(report.sleep_score_label, "Fair");
        let report = sanitize_generated_report(r#"{"sleep_score": 12}"#).unwrap();
        assert_eq!(report.sleep_score_label, "Poor");
    }

    #[test]
    fn test_sanitize_coerces_non_list_fields() {
        let raw = r#"{"sleep_score": 50, "key_wins": "not a list", "pattern_insights": 7}"#;
        let report = sanitize_generated_report(raw).unwrap();
        assert!(report.key_wins.is_empty());
        assert!(report.pattern_insights.is_empty());
    }

    #[test]
    fn test_sanitize_fills_missing_text_fields() {
        let report = sanitize_generated_report(r#"{"sleep_score": 50}"#).unwrap();
        assert_eq!(
            report.focus_recommendation,
            "Keep logging your sleep daily to get better insights."
        );
        assert!(!report.coach_note.is_empty());
    }

    #[test]
    fn test_sanitize_rejects_non_json() {
        assert!(sanitize_generated_report("Sorry, I can't help with that.").is_none());
    }

    // ── fallback_report ──────────────────────────────────────────────

    #[test]
    fn test_fallback_score_and_label() {
        // quality 4/5 → 32, 8h/8h capped → 30, 5 check-ins → 30.
        let s = stats(5, Some(4.0), Some(3.0), Some(8.0), 0);
        let report = fallback_report(&s, None);
        assert_eq!(report.sleep_score, 92);
        assert_eq!(report.sleep_score_label, "Excellent");
    }

    #[test]
    fn test_fallback_without_prev_week_skips_comparison() {
        let s = stats(5, Some(4.0), Some(3.0), Some(8.0), 0);
        let report = fallback_report(&s, None);
        assert!(!report.coach_note.contains("last week"));
        assert!(report.coach_note.starts_with("Great job"));
    }

    #[test]
    fn test_fallback_compares_to_prev_week() {
        let s = stats(5, Some(4.0), Some(3.0), Some(8.0), 0);
        let prev = PrevWeekStats {
            total_checkins: 6,
            avg_quality: Some(3.5),
            avg_mood: Some(3.0),
            avg_sleep_hours: Some(7.0),
        };
        let report = fallback_report(&s, Some(&prev));
        assert!(report.coach_note.starts_with("Your quality improved"));

        let prev_better = PrevWeekStats {
            avg_quality: Some(4.5),
            ..prev
        };
        let report = fallback_report(&s, Some(&prev_better));
        assert!(report.coach_note.starts_with("Your quality dipped"));
    }

    #[test]
    fn test_fallback_references_actual_counts() {
        let s = stats(3, Some(2.0), Some(3.0), Some(6.5), 2);
        let report = fallback_report(&s, None);
        assert_eq!(report.key_wins[0], "Logged 3 check-ins this week");
        assert_eq!(report.key_wins[1], "Stayed consistent with tracking");
        assert_eq!(report.pattern_insights[0], "Average sleep: 6.5 hours per night");
        assert_eq!(report.pattern_insights[1], "Used phone before bed 2 nights");
    }

    #[test]
    fn test_fallback_caps_hours_term() {
        // 10h average must not overshoot the 30-point hours term.
        let s = stats(5, Some(5.0), Some(5.0), Some(10.0), 0);
        let report = fallback_report(&s, None);
        assert_eq!(report.sleep_score, 100);
    }

    #[test]
    fn test_fallback_scales_completeness() {
        // 2 of 5 check-ins → 12 completeness points.
        let s = stats(2, Some(4.0), Some(3.0), Some(8.0), 0);
        let report = fallback_report(&s, None);
        assert_eq!(report.sleep_score, 74);
    }

    // ── decode_stored_report ─────────────────────────────────────────

    #[test]
    fn test_decode_canonical_report_roundtrip() {
        let original = fallback_report(&stats(5, Some(4.0), Some(3.0), Some(8.0), 0), None);
        let text = serde_json::to_string(&original).unwrap();
        assert_eq!(decode_stored_report(&text), original);
    }

    #[test]
    fn test_decode_wraps_plain_text_as_degraded() {
        let report = decode_stored_report("You slept well this week, keep it up.");
        assert_eq!(report.sleep_score, 0);
        assert_eq!(report.sleep_score_label, "N/A");
        assert!(report.key_wins.is_empty());
        assert_eq!(report.coach_note, "You slept well this week, keep it up.");
    }

    // ── build_report_prompt ──────────────────────────────────────────

    #[test]
    fn test_prompt_carries_stats_and_trends() {
        let s = stats(6, Some(3.8), Some(3.2), Some(7.2), 2);
        let profile = SleepProfile {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            bedtime_goal: "23:00".into(),
            wakeup_goal: "07:00".into(),
            sleep_challenges: vec![
                crate::models::profile::SleepChallenge::Phone,
                crate::models::profile::SleepChallenge::Caffeine,
            ],
            created_at: Utc::now(),
        };
        let prev = PrevWeekStats {
            total_checkins: 5,
            avg_quality: Some(3.3),
            avg_mood: Some(3.2),
            avg_sleep_hours: Some(7.2),
        };
        let prompt = build_report_prompt("Alex", &s, &profile, Some(&prev), &[]);
        assert!(prompt.contains("USER: Alex"));
        assert!(prompt.contains("GOALS: Bedtime 23:00, Wake-up 07:00"));
        assert!(prompt.contains("CHALLENGES: phone, caffeine"));
        assert!(prompt.contains("THIS WEEK (6 check-ins):"));
        assert!(prompt.contains("- Quality: improved (+0.5)"));
        assert!(prompt.contains("- Mood: stable"));
        assert!(prompt.contains("- Sleep hours: stable"));
        assert!(prompt.contains("NOTE KEYWORDS: none"));
    }
}
