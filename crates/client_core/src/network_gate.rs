use shared::{
    domain::{ChainId, NetworkStatus, Session},
    error::ErrorKind,
};

/// Pure network check. A disconnected session is never on the correct
/// network, whatever chain was last reported.
pub fn evaluate(
    session: &Session,
    current_chain_id: Option<ChainId>,
    required_chain_id: ChainId,
) -> NetworkStatus {
    let current_chain_id = if session.is_connected() {
        current_chain_id
    } else {
        None
    };
    NetworkStatus {
        current_chain_id,
        required_chain_id,
        is_correct: session.is_connected() && current_chain_id == Some(required_chain_id),
        switch_pending: false,
    }
}

pub struct NetworkGate {
    required_chain_id: ChainId,
    current_chain_id: Option<ChainId>,
    switches_in_flight: usize,
}

impl NetworkGate {
    pub fn new(required_chain_id: ChainId) -> Self {
        Self {
            required_chain_id,
            current_chain_id: None,
            switches_in_flight: 0,
        }
    }

    pub fn current_chain_id(&self) -> Option<ChainId> {
        self.current_chain_id
    }

    /// While a switch request is outstanding the wallet's chain is in flux,
    /// so the status reports incorrect until it resolves.
    pub fn status(&self, session: &Session) -> NetworkStatus {
        let mut status = evaluate(session, self.current_chain_id, self.required_chain_id);
        if self.switches_in_flight > 0 {
            status.switch_pending = true;
            status.is_correct = false;
        }
        status
    }

    pub fn set_current_chain(&mut self, chain_id: Option<ChainId>) {
        self.current_chain_id = chain_id;
    }

    pub fn begin_switch(&mut self, session: &Session) -> Result<(), ErrorKind> {
        if !session.is_connected() {
            return Err(ErrorKind::ConnectionRequired);
        }
        self.switches_in_flight += 1;
        Ok(())
    }

    pub fn finish_switch(&mut self) {
        self.switches_in_flight = self.switches_in_flight.saturating_sub(1);
    }

    /// Gate applied before any ledger mutation.
    pub fn ensure_ready(&self, session: &Session) -> Result<(), ErrorKind> {
        if !session.is_connected() {
            return Err(ErrorKind::ConnectionRequired);
        }
        if !self.status(session).is_correct {
            return Err(ErrorKind::NetworkMismatch);
        }
        Ok(())
    }
}
