//! Delivers one state-change event to the failure forwarder and the status relay

use crate::events::StateChangeEvent;
use crate::notify::{FailureForwarder, NotificationSink, NotifyError};
use crate::relay::{
    BuildStatusRelay, ExecutionDetailResolver, RelayError, RelayOutcome, RepositoryStatusClient,
    SecretStore,
};
use thiserror::Error;
use tracing::warn;

/// At least one handler failed
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Failure notification was not delivered: {0}")]
    Notify(#[source] NotifyError),

    #[error(transparent)]
    Relay(RelayError),

    #[error("{relay} (failure notification was not delivered either: {notify})")]
    Both { notify: NotifyError, relay: RelayError },
}

/// What each handler did with the event
#[derive(Debug)]
pub struct EventOutcome {
    /// `None` when no forwarder is configured
    pub forwarded: Option<Result<bool, NotifyError>>,
    pub relayed: Result<RelayOutcome, RelayError>,
}

impl EventOutcome {
    pub fn into_result(self) -> Result<RelayOutcome, DispatchError> {
        match (self.forwarded, self.relayed) {
            (Some(Err(notify)), Err(relay)) => Err(DispatchError::Both { notify, relay }),
            (Some(Err(notify)), Ok(_)) => Err(DispatchError::Notify(notify)),
            (_, Err(relay)) => Err(DispatchError::Relay(relay)),
            (_, Ok(outcome)) => Ok(outcome),
        }
    }
}

/// Run both handlers on the event. Neither handler's failure keeps the
/// other from running.
pub async fn dispatch<N, R, S, C>(
    event: &StateChangeEvent,
    forwarder: Option<&FailureForwarder<N>>,
    relay: &BuildStatusRelay<R, S, C>,
) -> EventOutcome
where
    N: NotificationSink,
    R: ExecutionDetailResolver,
    S: SecretStore,
    C: RepositoryStatusClient,
{
    let forward = async {
        match forwarder {
            Some(forwarder) => Some(forwarder.forward(event).await),
            None => None,
        }
    };
    let (forwarded, relayed) = tokio::join!(forward, relay.handle(event));

    if let Some(Err(e)) = &forwarded {
        warn!("Failure notification for {} not delivered: {}", event.execution_id, e);
    }

    EventOutcome { forwarded, relayed }
}
