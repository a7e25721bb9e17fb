//! Policy condition matching.
//!
//! A condition has up to three clauses (emotion, friction, time of day).
//! Every present clause must pass; an absent clause passes.

use attune_types::{
    EmotionVector, FrictionScore, FrictionWindow, PolicyCondition, TimeOfDay, TimeWindow,
};

/// Every threshold is a lower bound; a missing reading counts as 0.
#[must_use]
pub fn emotion_clause(thresholds: &EmotionVector, emotions: &EmotionVector) -> bool {
    thresholds.iter().all(|(emotion, threshold)| {
        let value = emotions.intensity(emotion);
        let passes = value >= threshold.value();
        if !passes {
            tracing::debug!(
                emotion = emotion.as_str(),
                value,
                threshold = threshold.value(),
                "Emotion clause failed"
            );
        }
        passes
    })
}

/// Both bounds are inclusive.
#[must_use]
pub fn friction_clause(window: &FrictionWindow, score: FrictionScore) -> bool {
    let above_min = window.min().is_none_or(|min| score >= min);
    let below_max = window.max().is_none_or(|max| score <= max);
    above_min && below_max
}

/// Compares `HH:MM` strings. Without `wraps_midnight`, a window with
/// `start > end` matches nothing.
#[must_use]
pub fn time_clause(window: &TimeWindow, now: &TimeOfDay) -> bool {
    if window.wraps_midnight && window.start > window.end {
        return *now >= window.start || *now <= window.end;
    }
    *now >= window.start && *now <= window.end
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyEvaluator;

impl PolicyEvaluator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    #[must_use]
    pub fn matches(
        &self,
        condition: &PolicyCondition,
        emotions: &EmotionVector,
        friction: FrictionScore,
        now: &TimeOfDay,
    ) -> bool {
        if let Some(thresholds) = &condition.emotion_vector
            && !emotion_clause(thresholds, emotions)
        {
            return false;
        }
        if let Some(window) = &condition.friction_score
            && !friction_clause(window, friction)
        {
            tracing::debug!(score = friction.value(), "Friction clause failed");
            return false;
        }
        if let Some(window) = &condition.time_of_day
            && !time_clause(window, now)
        {
            tracing::debug!(
                now = now.as_str(),
                start = window.start.as_str(),
                end = window.end.as_str(),
                "Time clause failed"
            );
            return false;
        }
        true
    }
}
