use crate::prelude::{SpotError, SpotResult};
use serde::Serialize;

/// Lifecycle of the upstream feed connection. `source` indexes the
/// configured list of cluster nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionState {
    Disconnected { source: usize },
    Connecting { source: usize },
    Streaming { source: usize },
    Backoff { source: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    Dial,
    Established,
    Failed,
    Closed,
    BackoffElapsed,
}

impl ConnectionState {
    pub fn source(self) -> usize {
        match self {
            ConnectionState::Disconnected { source }
            | ConnectionState::Connecting { source }
            | ConnectionState::Streaming { source }
            | ConnectionState::Backoff { source } => source,
        }
    }
}

/// Round-robin reconnect state machine over a fixed list of sources.
#[derive(Debug, Clone)]
pub struct ConnectionMachine {
    state: ConnectionState,
    source_count: usize,
}

impl ConnectionMachine {
    pub fn new(source_count: usize) -> SpotResult<Self> {
        if source_count == 0 {
            return Err(SpotError::Transition("no upstream sources configured".into()));
        }
        Ok(Self {
            state: ConnectionState::Disconnected { source: 0 },
            source_count,
        })
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn apply(&mut self, event: ConnectionEvent) -> SpotResult<ConnectionState> {
        use ConnectionEvent::*;
        use ConnectionState::*;

        let next = match (self.state, event) {
            (Disconnected { source }, Dial) => Connecting { source },
            (Connecting { source }, Established) => Streaming { source },
            (Connecting { source }, Failed) => Backoff { source },
            (Streaming { source }, Failed | Closed) => Backoff { source },
            (Backoff { source }, BackoffElapsed) => Disconnected {
                source: (source + 1) % self.source_count,
            },
            (state, event) => {
                return Err(SpotError::Transition(format!("{event:?} while {state:?}")));
            }
        };
        self.state = next;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConnectionEvent::*;

    #[test]
    fn cycles_through_sources_after_each_failure() {
        let mut machine = ConnectionMachine::new(2).unwrap();
        machine.apply(Dial).unwrap();
        machine.apply(Failed).unwrap();
        assert_eq!(
            machine.apply(BackoffElapsed).unwrap(),
            ConnectionState::Disconnected { source: 1 }
        );

        machine.apply(Dial).unwrap();
        assert_eq!(
            machine.apply(Established).unwrap(),
            ConnectionState::Streaming { source: 1 }
        );
        machine.apply(Closed).unwrap();
        machine.apply(BackoffElapsed).unwrap();
        assert_eq!(machine.state().source(), 0);
    }

    #[test]
    fn rejects_events_outside_the_table() {
        let mut machine = ConnectionMachine::new(1).unwrap();
        assert!(matches!(
            machine.apply(Established),
            Err(SpotError::Transition(_))
        ));
        assert_eq!(machine.state(), ConnectionState::Disconnected { source: 0 });
    }

    #[test]
    fn requires_at_least_one_source() {
        assert!(ConnectionMachine::new(0).is_err());
    }
}
