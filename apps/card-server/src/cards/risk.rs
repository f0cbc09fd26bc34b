// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Fraud risk heuristic.
//!
//! A deterministic score over a card's recent transactions. The constants
//! are untuned values carried over for compatibility with existing clients;
//! they are not calibrated thresholds.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::transaction::CardTransaction;

/// Maximum number of recent transactions considered.
pub const RISK_SAMPLE_SIZE: usize = 20;

const BASE_SCORE: f64 = 0.05;
const DECLINE_WEIGHT: f64 = 0.03;
const DECLINE_CAP: f64 = 0.5;
const HIGH_VALUE_WEIGHT: f64 = 0.02;
const HIGH_VALUE_CAP: f64 = 0.3;
const HIGH_VALUE_THRESHOLD: i64 = 500;
const RATIO_MIN_SAMPLE: usize = 15;
const RATIO_THRESHOLD: f64 = 0.25;
const RATIO_PENALTY: f64 = 0.15;
const MAX_SCORE: f64 = 0.99;

const MEDIUM_FROM: f64 = 0.3;
const HIGH_FROM: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Map a score to its band. Each band includes its lower bound.
pub fn get_risk_level(score: f64) -> RiskLevel {
    if score < MEDIUM_FROM {
        RiskLevel::Low
    } else if score < HIGH_FROM {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    }
}

/// Score the most recent transactions of a card, newest first.
///
/// Only the first [`RISK_SAMPLE_SIZE`] entries are considered. The result is
/// within `[0, 0.99]` and rounded to two decimals.
pub fn calculate_risk_score(recent: &[CardTransaction]) -> f64 {
    let sample = &recent[..recent.len().min(RISK_SAMPLE_SIZE)];
    let high_value = Decimal::from(HIGH_VALUE_THRESHOLD);

    let declines = sample.iter().filter(|tx| tx.is_declined()).count();
    let high_value_count = sample.iter().filter(|tx| tx.amount > high_value).count();

    let mut score = BASE_SCORE;
    score += (declines as f64 * DECLINE_WEIGHT).min(DECLINE_CAP);
    score += (high_value_count as f64 * HIGH_VALUE_WEIGHT).min(HIGH_VALUE_CAP);

    if sample.len() >= RATIO_MIN_SAMPLE && declines as f64 / sample.len() as f64 > RATIO_THRESHOLD {
        score += RATIO_PENALTY;
    }

    (score.min(MAX_SCORE) * 100.0).round() / 100.0
}

/// Derived risk view of a card; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub score: f64,
    pub level: RiskLevel,
    pub total_analyzed: usize,
}

pub fn assess_risk(recent: &[CardTransaction]) -> RiskAssessment {
    let score = calculate_risk_score(recent);
    RiskAssessment {
        score,
        level: get_risk_level(score),
        total_analyzed: recent.len().min(RISK_SAMPLE_SIZE),
    }
}
