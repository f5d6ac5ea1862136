//! Permissive evaluator used when no targeting engine is attached.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Map;

use super::{Evaluation, Evaluator, LayoutEvaluation};
use crate::models::event::TrackEvent;
use crate::models::message::{InAppMessage, TriggerRule};
use crate::models::user::{User, DEVICE_ID};
use crate::models::workspace::Workspace;
use crate::storage::{HiddenStorage, ImpressionStorage};
use crate::{AppError, Result};

/// Every rule target matches; a message is eligible unless it is empty,
/// suppressed, or already shown `cap` times to the same device. The first
/// variant is rendered.
pub struct HiddenAwareEvaluator {
    hidden: Arc<dyn HiddenStorage>,
    frequency_cap: Option<FrequencyCap>,
}

struct FrequencyCap {
    impressions: Arc<dyn ImpressionStorage>,
    cap: usize,
}

impl HiddenAwareEvaluator {
    /// Evaluator consulting `hidden` for suppression windows.
    #[must_use]
    pub fn new(hidden: Arc<dyn HiddenStorage>) -> Self {
        Self {
            hidden,
            frequency_cap: None,
        }
    }

    /// Also reject a message once `impressions` holds `cap` records of it
    /// for the evaluated user's device.
    #[must_use]
    pub fn with_frequency_cap(
        mut self,
        impressions: Arc<dyn ImpressionStorage>,
        cap: usize,
    ) -> Self {
        self.frequency_cap = Some(FrequencyCap { impressions, cap });
        self
    }

    fn is_capped(&self, in_app_message: &InAppMessage, user: &User) -> bool {
        let Some(frequency_cap) = &self.frequency_cap else {
            return false;
        };
        let device_id = user.get_device_id();
        let seen = frequency_cap
            .impressions
            .get(in_app_message.key)
            .iter()
            .filter(|record| record.identifiers.get(DEVICE_ID).map(String::as_str) == device_id)
            .count();
        seen >= frequency_cap.cap
    }
}

impl Evaluator for HiddenAwareEvaluator {
    fn matches_trigger(
        &self,
        _workspace: &Workspace,
        _in_app_message: &InAppMessage,
        _rule: &TriggerRule,
        _event: &TrackEvent,
    ) -> Result<bool> {
        Ok(true)
    }

    fn evaluate(
        &self,
        _workspace: &Workspace,
        in_app_message: &InAppMessage,
        user: &User,
        timestamp: DateTime<Utc>,
    ) -> Result<Evaluation> {
        if in_app_message.messages.is_empty() {
            return Ok(Evaluation::ineligible("NO_MESSAGE"));
        }
        if self.hidden.is_hidden(in_app_message.key, timestamp) {
            return Ok(Evaluation::ineligible("IN_APP_HIDDEN"));
        }
        if self.is_capped(in_app_message, user) {
            return Ok(Evaluation::ineligible("IN_APP_FREQUENCY_CAPPED"));
        }
        Ok(Evaluation::eligible("IN_APP_TARGET"))
    }

    fn evaluate_layout(
        &self,
        _workspace: &Workspace,
        in_app_message: &InAppMessage,
        _user: &User,
    ) -> Result<LayoutEvaluation> {
        let message = in_app_message.messages.first().cloned().ok_or_else(|| {
            AppError::Evaluation(format!(
                "in-app message {} has no variants",
                in_app_message.key
            ))
        })?;
        Ok(LayoutEvaluation {
            message,
            reason: "DEFAULT".into(),
            properties: Map::new(),
        })
    }
}
