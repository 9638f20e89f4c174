//! The OAuth callback as an explicit state machine.
//!
//! Every callback walks `Received -> Validated -> Correlated -> Exchanged ->
//! Provisioned -> Notified -> Redirected`, or stops in `Failed`. The visited
//! stages are kept in the [`CallbackReport`] so the HTTP layer (and tests)
//! can see exactly where a request ended.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::error::ProvisionError;
use crate::notify::ResultNotifier;
use crate::oauth::TokenExchange;
use crate::registrar::SubscriptionRegistrar;
use crate::state::StateStore;
use crate::types::SubscriptionRecord;
use crate::webhook::WebhookProvisioner;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Validated,
    Correlated,
    Exchanged,
    Provisioned,
    Notified,
    Redirected,
    Failed,
}

impl Stage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Redirected | Stage::Failed)
    }

    pub fn can_advance_to(self, next: Stage) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == Stage::Failed {
            return true;
        }

        matches!(
            (self, next),
            (Stage::Received, Stage::Validated)
                | (Stage::Validated, Stage::Correlated)
                | (Stage::Correlated, Stage::Exchanged)
                | (Stage::Exchanged, Stage::Provisioned)
                | (Stage::Provisioned, Stage::Notified)
                | (Stage::Notified, Stage::Redirected)
        )
    }
}

/// Raw query parameters of the callback, before validation.
#[derive(Debug, Default, Clone, serde::Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub guild_id: Option<String>,
}

struct Validated {
    code: String,
    state: String,
}

impl CallbackParams {
    fn validate(self) -> Result<Validated, ProvisionError> {
        let code = required(self.code, "code")?;
        let state = required(self.state, "state")?;
        required(self.guild_id, "guild_id")?;
        Ok(Validated { code, state })
    }
}

fn required(value: Option<String>, name: &'static str) -> Result<String, ProvisionError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or(ProvisionError::Validation(name))
}

pub struct CallbackReport {
    pub stages: Vec<Stage>,
    pub verified: Option<bool>,
    pub error: Option<ProvisionError>,
    /// Present once the subscription was handed to the registrar.
    pub registration: Option<JoinHandle<()>>,
}

impl CallbackReport {
    fn new() -> Self {
        Self {
            stages: vec![Stage::Received],
            verified: None,
            error: None,
            registration: None,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stages.last().copied().unwrap_or(Stage::Received)
    }

    fn advance(&mut self, next: Stage) {
        debug_assert!(
            self.stage().can_advance_to(next),
            "illegal transition {:?} -> {:?}",
            self.stage(),
            next
        );
        self.stages.push(next);
    }

    fn fail(mut self, error: ProvisionError) -> Self {
        self.advance(Stage::Failed);
        self.error = Some(error);
        self
    }
}

pub struct WebhookFlow {
    states: StateStore,
    exchanger: Arc<dyn TokenExchange>,
    provisioner: WebhookProvisioner,
    registrar: SubscriptionRegistrar,
    notifier: ResultNotifier,
}

impl WebhookFlow {
    pub fn new(
        states: StateStore,
        exchanger: Arc<dyn TokenExchange>,
        provisioner: WebhookProvisioner,
        registrar: SubscriptionRegistrar,
        notifier: ResultNotifier,
    ) -> Self {
        Self {
            states,
            exchanger,
            provisioner,
            registrar,
            notifier,
        }
    }

    pub fn registrar(&self) -> &SubscriptionRegistrar {
        &self.registrar
    }

    pub async fn run(&self, params: CallbackParams) -> CallbackReport {
        let mut report = CallbackReport::new();

        let params = match params.validate() {
            Ok(params) => params,
            Err(err) => return report.fail(err),
        };
        report.advance(Stage::Validated);

        let pending = match self.states.take_and_invalidate(&params.state).await {
            Some(pending) => pending,
            None => return report.fail(ProvisionError::StateNotFound),
        };
        report.advance(Stage::Correlated);

        let credential = match self.exchanger.exchange(&params.code).await {
            Ok(credential) => credential,
            Err(err) => {
                log::error!("Error while exchanging code for {}: {}", pending.feed, err);
                return report.fail(err.into());
            }
        };
        report.advance(Stage::Exchanged);

        log::info!(
            "Webhook {} issued for {} in channel {} (guild {})",
            credential.webhook_id,
            pending.feed,
            credential.channel_id,
            credential.guild_id
        );

        report.registration = Some(
            self.registrar
                .dispatch(SubscriptionRecord::new(pending.feed.clone(), &credential)),
        );

        let provisioned = self.provisioner.provision(&credential, &pending.feed).await;
        report.verified = Some(provisioned.verified);
        report.advance(Stage::Provisioned);

        if let Err(err) = self
            .notifier
            .notify(&pending.requester, &pending.feed, provisioned.verified)
            .await
        {
            log::error!("Error while sending followup for {}: {}", pending.feed, err);
            return report.fail(err);
        }
        report.advance(Stage::Notified);

        report.advance(Stage::Redirected);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HAPPY_PATH: [Stage; 7] = [
        Stage::Received,
        Stage::Validated,
        Stage::Correlated,
        Stage::Exchanged,
        Stage::Provisioned,
        Stage::Notified,
        Stage::Redirected,
    ];

    #[test]
    fn happy_path_transitions_are_legal() {
        for pair in HAPPY_PATH.windows(2) {
            assert!(pair[0].can_advance_to(pair[1]), "{:?}", pair);
        }
    }

    #[test]
    fn every_non_terminal_stage_can_fail() {
        for stage in &HAPPY_PATH[..6] {
            assert!(stage.can_advance_to(Stage::Failed));
        }
    }

    #[test]
    fn terminal_stages_are_final() {
        for next in HAPPY_PATH {
            assert!(!Stage::Failed.can_advance_to(next));
            assert!(!Stage::Redirected.can_advance_to(next));
        }
        assert!(!Stage::Redirected.can_advance_to(Stage::Failed));
    }

    #[test]
    fn stages_cannot_be_skipped() {
        assert!(!Stage::Received.can_advance_to(Stage::Correlated));
        assert!(!Stage::Correlated.can_advance_to(Stage::Provisioned));
        assert!(!Stage::Exchanged.can_advance_to(Stage::Notified));
    }

    #[test]
    fn validation_names_first_missing_parameter() {
        let params = CallbackParams {
            code: Some("c".into()),
            state: Some(String::new()),
            guild_id: Some("g".into()),
        };
        assert!(matches!(
            params.validate(),
            Err(ProvisionError::Validation("state"))
        ));

        let params = CallbackParams {
            code: Some("c".into()),
            state: Some("s".into()),
            guild_id: None,
        };
        assert!(matches!(
            params.validate(),
            Err(ProvisionError::Validation("guild_id"))
        ));
    }
}
