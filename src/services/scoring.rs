//! Pure scoring engine: sleep score, streak, sleep debt, missions, and
//! the 7-day trend series. Everything here is deterministic — functions
//! that depend on "today" take it as a parameter.

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::checkin::Checkin;
use crate::models::profile::{SleepChallenge, SleepProfile};

// ── Time & duration utilities ────────────────────────────────────────

/// Parse a 24-hour "HH:MM" wall-clock string into minutes since
/// midnight. Strict two-digit fields; no timezone concept.
pub fn time_to_minutes(time: &str) -> Option<u32> {
    let (h, m) = time.split_once(':')?;
    if h.len() != 2 || m.len() != 2 {
        return None;
    }
    let hours: u32 = h.parse().ok()?;
    let minutes: u32 = m.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    Some(hours * 60 + minutes)
}

/// Duration between bedtime and wakeup in hours. A wakeup at or before
/// the bedtime is treated as the next calendar day. This is the only
/// place midnight crossing is handled.
pub fn hours_of_sleep(bedtime: &str, wakeup: &str) -> Option<f64> {
    let bed = time_to_minutes(bedtime)?;
    let mut wake = time_to_minutes(wakeup)?;
    if wake <= bed {
        wake += 24 * 60;
    }
    Some(f64::from(wake - bed) / 60.0)
}

/// Absolute day distance between two calendar dates.
pub fn days_between(a: NaiveDate, b: NaiveDate) -> i64 {
    (b - a).num_days().abs()
}

// ── Sleep score (0–100) ──────────────────────────────────────────────

/// Composite score: quality maps 1–5 onto 0–40, mood onto 0–30, and
/// bedtime consistency contributes up to 30 (full credit at the goal,
/// zero at 60+ minutes off, 15 flat when there is no usable goal).
pub fn compute_sleep_score(checkin: &Checkin, profile: Option<&SleepProfile>) -> i32 {
    let quality_score = f64::from(checkin.sleep_quality - 1) / 4.0 * 40.0;
    let mood_score = f64::from(checkin.mood - 1) / 4.0 * 30.0;

    let consistency_score = match profile.and_then(|p| time_to_minutes(&p.bedtime_goal)) {
        Some(goal) => match time_to_minutes(&checkin.bedtime) {
            Some(actual) => {
                let diff = f64::from(actual.abs_diff(goal));
                (30.0 - diff / 2.0).max(0.0)
            }
            None => 15.0,
        },
        None => 15.0,
    };

    (quality_score + mood_score + consistency_score).round() as i32
}

/// Mean of per-checkin scores, rounded. Zero for an empty week.
pub fn compute_weekly_score(checkins: &[Checkin], profile: Option<&SleepProfile>) -> i32 {
    if checkins.is_empty() {
        return 0;
    }
    let total: i32 = checkins
        .iter()
        .map(|c| compute_sleep_score(c, profile))
        .sum();
    (f64::from(total) / checkins.len() as f64).round() as i32
}

// ── Check-in streak ──────────────────────────────────────────────────

/// Count consecutive daily check-ins ending at the most recent one.
/// Input must be sorted by date descending, one entry per day. A most
/// recent check-in older than yesterday breaks the streak entirely.
pub fn compute_streak(checkins: &[Checkin], today: NaiveDate) -> u32 {
    let Some(latest) = checkins.first() else {
        return 0;
    };
    if days_between(latest.checkin_date, today) > 1 {
        return 0;
    }

    let mut streak = 1;
    for pair in checkins.windows(2) {
        if days_between(pair[1].checkin_date, pair[0].checkin_date) == 1 {
            streak += 1;
        } else {
            break;
        }
    }
    streak
}

pub fn streak_message(streak: u32) -> String {
    match streak {
        0 => "Start your streak tonight!".into(),
        1 => "Day 1 — great start!".into(),
        2..=3 => format!("{streak}-day streak — keep going!"),
        4..=6 => format!("{streak}-day streak — almost a full week!"),
        7 => "7-day streak — perfect week!".into(),
        _ => format!("{streak}-day streak — incredible!"),
    }
}

// ── Sleep debt ───────────────────────────────────────────────────────

/// Cumulative shortfall of actual vs goal sleep over the supplied
/// check-ins, in hours to one decimal. Positive means under-sleeping;
/// negative is surplus. The caller controls the window.
pub fn compute_sleep_debt(checkins: &[Checkin], profile: Option<&SleepProfile>) -> f64 {
    let Some(profile) = profile else {
        return 0.0;
    };
    if checkins.is_empty() {
        return 0.0;
    }
    let Some(goal_hours) = hours_of_sleep(&profile.bedtime_goal, &profile.wakeup_goal) else {
        return 0.0;
    };

    let mut total_debt = 0.0;
    for c in checkins {
        if let Some(actual) = hours_of_sleep(&c.bedtime, &c.wakeup_time) {
            total_debt += goal_hours - actual;
        }
    }

    (total_debt * 10.0).round() / 10.0
}

// ── Nightly missions ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mission {
    pub id: &'static str,
    pub text: String,
    pub icon: &'static str,
}

fn challenge_mission(challenge: SleepChallenge) -> Mission {
    match challenge {
        SleepChallenge::Phone => Mission {
            id: "phone",
            text: "Put your phone away 30 min before bed".into(),
            icon: "phone",
        },
        SleepChallenge::Stress => Mission {
            id: "stress",
            text: "Do 5 minutes of deep breathing tonight".into(),
            icon: "wind",
        },
        SleepChallenge::Caffeine => Mission {
            id: "caffeine",
            text: "No caffeine after 3 PM today".into(),
            icon: "coffee",
        },
        SleepChallenge::Irregular => Mission {
            id: "irregular",
            text: "Stick to your sleep schedule tonight".into(),
            icon: "refresh",
        },
        SleepChallenge::Noise => Mission {
            id: "noise",
            text: "Prepare a quiet sleep environment".into(),
            icon: "volume",
        },
        SleepChallenge::Naps => Mission {
            id: "naps",
            text: "Skip any naps today (or keep under 20 min)".into(),
            icon: "moon",
        },
    }
}

fn general_missions() -> [Mission; 3] {
    [
        Mission {
            id: "water",
            text: "Drink a glass of water before bed".into(),
            icon: "droplet",
        },
        Mission {
            id: "screen",
            text: "Dim your screen 1 hour before sleep".into(),
            icon: "sun",
        },
        Mission {
            id: "journal",
            text: "Write down one thing you're grateful for".into(),
            icon: "edit",
        },
    ]
}

/// Up to 3 personalized nightly missions: bedtime goal first, then one
/// per profile challenge in order, then general fillers.
pub fn generate_missions(profile: Option<&SleepProfile>) -> Vec<Mission> {
    let mut missions = Vec::with_capacity(3);

    if let Some(profile) = profile {
        missions.push(Mission {
            id: "bedtime",
            text: format!("Get in bed by {} tonight", profile.bedtime_goal),
            icon: "clock",
        });

        for &challenge in &profile.sleep_challenges {
            if missions.len() >= 3 {
                break;
            }
            missions.push(challenge_mission(challenge));
        }
    }

    for mission in general_missions() {
        if missions.len() >= 3 {
            break;
        }
        if !missions.iter().any(|m| m.id == mission.id) {
            missions.push(mission);
        }
    }

    missions.truncate(3);
    missions
}

// ── 7-day trend ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub day: String,
    pub date: String,
    pub quality: i32,
    pub score: i32,
}

/// Chart series for the 7 most recent check-ins, oldest to newest.
/// Input is sorted by date descending, matching the list queries.
pub fn build_trend_data(checkins: &[Checkin], profile: Option<&SleepProfile>) -> Vec<TrendPoint> {
    let mut recent: Vec<&Checkin> = checkins.iter().take(7).collect();
    recent.reverse();

    recent
        .into_iter()
        .map(|c| TrendPoint {
            day: c.checkin_date.format("%a").to_string(),
            date: c.checkin_date.format("%b %-d").to_string(),
            quality: c.sleep_quality,
            score: compute_sleep_score(c, profile),
        })
        .collect()
}
