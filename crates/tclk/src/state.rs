//! Trust-center link-key exchange state machine.

use crate::TcLinkKeyConfig;
use bdb_core::{Action, Event, KeyStore, StackRequest, TimerId};
use bdb_types::{
    CommissioningAttributes, ExtendedAddress, KeyExchangeMethod, LinkKey, NetworkAddress,
    StackStatus, TerminalStatus,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
enum Phase {
    Idle,
    /// Waiting out the start delay.
    Starting,
    AwaitingNodeDescriptor,
    AwaitingKey,
    Verifying {
        key: LinkKey,
    },
    /// All attempts failed; leaving the network.
    Leaving,
}

/// Trust-center link-key exchange sub-state machine.
///
/// `tcLinkKeyExchangeAttempts` counts attempts in the current exchange; it
/// starts at 1 with the first request and never exceeds
/// `tcLinkKeyExchangeAttemptsMax`.
pub struct TcLinkKeyExchange {
    config: TcLinkKeyConfig,

    /// Persistent storage for the verified key.
    key_store: Arc<dyn KeyStore>,

    phase: Phase,

    trust_center: Option<ExtendedAddress>,

    now: Duration,
}

impl TcLinkKeyExchange {
    pub fn new(config: TcLinkKeyConfig, key_store: Arc<dyn KeyStore>) -> Self {
        Self {
            config,
            key_store,
            phase: Phase::Idle,
            trust_center: None,
            now: Duration::ZERO,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Public API
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn set_time(&mut self, now: Duration) {
        self.now = now;
    }

    /// Check if an exchange is running.
    pub fn is_active(&self) -> bool {
        self.phase != Phase::Idle
    }

    /// Drop the exchange in progress. The provisional key stays in use.
    pub fn abort(&mut self, attrs: &mut CommissioningAttributes) -> Vec<Action> {
        if self.phase == Phase::Idle {
            return vec![];
        }
        debug!(phase = ?self.phase, "Aborting TC link key exchange");
        attrs.joining_node_new_tc_link_key = None;
        self.phase = Phase::Idle;
        vec![Action::CancelTimer {
            id: TimerId::TcLinkKey,
        }]
    }

    /// Begin an exchange with the trust center of the network just joined.
    pub fn start(
        &mut self,
        attrs: &mut CommissioningAttributes,
        trust_center: ExtendedAddress,
        local: ExtendedAddress,
    ) -> Vec<Action> {
        // Same floor as the attribute setter: at least one attempt.
        if attrs.tc_link_key_exchange_attempts_max == 0 {
            warn!("TC link key exchange attempts max is 0, using 1");
            attrs.tc_link_key_exchange_attempts_max = 1;
        }
        info!(
            %trust_center,
            method = ?attrs.tc_link_key_exchange_method,
            max_attempts = attrs.tc_link_key_exchange_attempts_max,
            "Starting TC link key exchange"
        );
        attrs.tc_link_key_exchange_attempts = 0;
        attrs.joining_node_eui64 = local;
        attrs.joining_node_new_tc_link_key = None;
        self.trust_center = Some(trust_center);
        self.phase = Phase::Starting;
        vec![Action::SetTimer {
            id: TimerId::TcLinkKey,
            duration: self.config.start_delay,
        }]
    }

    /// TC link key timer expired.
    pub fn on_timer(&mut self, attrs: &mut CommissioningAttributes) -> Vec<Action> {
        match self.phase {
            Phase::Idle => {
                debug!("Ignoring stale TC link key timer");
                vec![]
            }
            Phase::Starting => self.send_attempt(attrs),
            Phase::AwaitingNodeDescriptor | Phase::AwaitingKey | Phase::Verifying { .. } => {
                warn!(
                    attempt = attrs.tc_link_key_exchange_attempts,
                    phase = ?self.phase,
                    "TC link key exchange attempt timed out"
                );
                self.retry_or_leave(attrs)
            }
            Phase::Leaving => {
                warn!("Leave confirm not received, giving up");
                self.fail(attrs)
            }
        }
    }

    /// Node_Desc_rsp from the trust center.
    pub fn on_node_descriptor_response(
        &mut self,
        status: StackStatus,
        source: NetworkAddress,
        server_mask: u16,
    ) -> Vec<Action> {
        if self.phase != Phase::AwaitingNodeDescriptor || source != NetworkAddress::COORDINATOR {
            debug!(phase = ?self.phase, %source, "Ignoring node descriptor response");
            return vec![];
        }
        if !status.is_success() {
            // The attempt window covers the retry.
            debug!(%status, "Node descriptor request failed");
            return vec![];
        }

        let revision = stack_revision(server_mask);
        if revision < self.config.min_request_key_revision {
            info!(
                revision,
                "Trust center predates request-key, keeping provisional key"
            );
            return self.succeed();
        }

        debug!(revision, "Requesting TC link key");
        self.phase = Phase::AwaitingKey;
        vec![Action::Stack(StackRequest::RequestTcLinkKey {
            trust_center: NetworkAddress::COORDINATOR,
        })]
    }

    /// Transport-key indication carrying a new TC link key.
    pub fn on_key_received(
        &mut self,
        attrs: &mut CommissioningAttributes,
        trust_center: ExtendedAddress,
        key: LinkKey,
    ) -> Vec<Action> {
        if self.phase != Phase::AwaitingKey || self.trust_center != Some(trust_center) {
            debug!(phase = ?self.phase, %trust_center, "Ignoring TC link key");
            return vec![];
        }

        attrs.joining_node_new_tc_link_key = Some(key);
        self.phase = Phase::Verifying { key };
        vec![Action::Stack(StackRequest::VerifyKey { trust_center, key })]
    }

    /// Outcome of `VerifyKey`.
    pub fn on_verify_confirm(
        &mut self,
        attrs: &mut CommissioningAttributes,
        status: StackStatus,
    ) -> Vec<Action> {
        let (Phase::Verifying { key }, Some(trust_center)) = (&self.phase, self.trust_center)
        else {
            debug!(phase = ?self.phase, "Ignoring stale verify-key confirm");
            return vec![];
        };
        let key = *key;

        if !status.is_success() {
            warn!(%status, "TC link key verification failed");
            attrs.joining_node_new_tc_link_key = None;
            return self.retry_or_leave(attrs);
        }

        if let Err(e) = self.key_store.add_device_key(trust_center, key) {
            warn!(error = %e, "Failed to persist TC link key");
        }
        attrs.joining_node_new_tc_link_key = None;
        info!(
            %trust_center,
            attempt = attrs.tc_link_key_exchange_attempts,
            "TC link key verified"
        );

        let mut actions = vec![Action::Stack(StackRequest::InstallTcLinkKey {
            trust_center,
            key,
        })];
        actions.extend(self.succeed());
        actions
    }

    /// Outcome of the leave issued after exhausting attempts.
    pub fn on_leave_confirm(
        &mut self,
        attrs: &mut CommissioningAttributes,
        status: StackStatus,
    ) -> Vec<Action> {
        if self.phase != Phase::Leaving {
            debug!(phase = ?self.phase, "Ignoring leave confirm");
            return vec![];
        }
        debug!(%status, "Left network after TC link key exchange failure");
        self.fail(attrs)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Internals
    // ═══════════════════════════════════════════════════════════════════════════

    fn send_attempt(&mut self, attrs: &mut CommissioningAttributes) -> Vec<Action> {
        attrs.tc_link_key_exchange_attempts = attrs.tc_link_key_exchange_attempts.saturating_add(1);
        attrs.joining_node_new_tc_link_key = None;

        let request = match attrs.tc_link_key_exchange_method {
            KeyExchangeMethod::Apsrk => {
                self.phase = Phase::AwaitingNodeDescriptor;
                StackRequest::NodeDescriptorRequest {
                    destination: NetworkAddress::COORDINATOR,
                }
            }
            KeyExchangeMethod::Cbke => {
                self.phase = Phase::AwaitingKey;
                StackRequest::KeyEstablishment {
                    trust_center: NetworkAddress::COORDINATOR,
                }
            }
        };
        debug!(
            attempt = attrs.tc_link_key_exchange_attempts,
            request = request.type_name(),
            "TC link key exchange attempt"
        );

        vec![
            Action::Stack(request),
            Action::SetTimer {
                id: TimerId::TcLinkKey,
                duration: self.config.attempt_timeout,
            },
        ]
    }

    fn retry_or_leave(&mut self, attrs: &mut CommissioningAttributes) -> Vec<Action> {
        if attrs.tc_link_key_exchange_attempts < attrs.tc_link_key_exchange_attempts_max {
            return self.send_attempt(attrs);
        }

        warn!(
            attempts = attrs.tc_link_key_exchange_attempts,
            "TC link key exchange attempts exhausted, leaving network"
        );
        attrs.joining_node_new_tc_link_key = None;
        self.phase = Phase::Leaving;
        vec![
            Action::Stack(StackRequest::Leave { rejoin: false }),
            Action::SetTimer {
                id: TimerId::TcLinkKey,
                duration: self.config.leave_timeout,
            },
        ]
    }

    fn succeed(&mut self) -> Vec<Action> {
        self.phase = Phase::Idle;
        vec![
            Action::CancelTimer {
                id: TimerId::TcLinkKey,
            },
            Action::EnqueueInternal {
                event: Event::NetworkSteerPermitJoin,
            },
        ]
    }

    fn fail(&mut self, attrs: &mut CommissioningAttributes) -> Vec<Action> {
        attrs.node_is_on_a_network = false;
        self.phase = Phase::Idle;
        vec![
            Action::CancelTimer {
                id: TimerId::TcLinkKey,
            },
            Action::EnqueueInternal {
                event: Event::NetworkSteerFinished {
                    status: TerminalStatus::TclkExFailure,
                    detail: None,
                },
            },
        ]
    }
}

/// Stack compliance revision carried in bits 9..15 of the server mask.
fn stack_revision(server_mask: u16) -> u8 {
    ((server_mask >> 9) & 0x3f) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use bdb_core::KeyStoreError;
    use bdb_types::InstallCode;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use tracing_test::traced_test;

    const TC: ExtendedAddress = ExtendedAddress(0x00AA_BBCC_DDEE_FF00);
    const LOCAL: ExtendedAddress = ExtendedAddress(0x0011_2233_4455_6677);
    const NEW_KEY: LinkKey = LinkKey([0x42; 16]);

    #[derive(Default)]
    struct TestKeyStore {
        keys: Mutex<HashMap<ExtendedAddress, LinkKey>>,
    }

    impl KeyStore for TestKeyStore {
        fn load_install_code(&self) -> Result<InstallCode, KeyStoreError> {
            Err(KeyStoreError::NotFound)
        }

        fn find_device_key(&self, device: ExtendedAddress) -> Option<LinkKey> {
            self.keys.lock().get(&device).copied()
        }

        fn add_device_key(&self, device: ExtendedAddress, key: LinkKey) -> Result<(), KeyStoreError> {
            self.keys.lock().insert(device, key);
            Ok(())
        }
    }

    fn make_exchange() -> (TcLinkKeyExchange, Arc<TestKeyStore>, CommissioningAttributes) {
        let store = Arc::new(TestKeyStore::default());
        let exchange = TcLinkKeyExchange::new(TcLinkKeyConfig::default(), store.clone());
        let attrs = CommissioningAttributes {
            node_is_on_a_network: true,
            ..Default::default()
        };
        (exchange, store, attrs)
    }

    fn steer_finished(actions: &[Action]) -> Option<TerminalStatus> {
        actions.iter().find_map(|a| match a {
            Action::EnqueueInternal {
                event: Event::NetworkSteerFinished { status, .. },
            } => Some(*status),
            _ => None,
        })
    }

    fn permit_join(actions: &[Action]) -> bool {
        actions.contains(&Action::EnqueueInternal {
            event: Event::NetworkSteerPermitJoin,
        })
    }

    #[test]
    fn test_stack_revision_extraction() {
        assert_eq!(stack_revision(21 << 9), 21);
        assert_eq!(stack_revision((22 << 9) | 0x01ff), 22);
        assert_eq!(stack_revision(0xffff), 0x3f);
    }

    #[traced_test]
    #[test]
    fn test_apsrk_exchange_installs_verified_key() {
        let (mut exchange, store, mut attrs) = make_exchange();

        let actions = exchange.start(&mut attrs, TC, LOCAL);
        assert_eq!(
            actions,
            vec![Action::SetTimer {
                id: TimerId::TcLinkKey,
                duration: Duration::from_secs(1),
            }]
        );
        assert_eq!(attrs.joining_node_eui64, LOCAL);
        assert_eq!(attrs.tc_link_key_exchange_attempts, 0);

        let actions = exchange.on_timer(&mut attrs);
        assert_eq!(
            actions[0],
            Action::Stack(StackRequest::NodeDescriptorRequest {
                destination: NetworkAddress::COORDINATOR
            })
        );
        assert_eq!(attrs.tc_link_key_exchange_attempts, 1);

        let actions =
            exchange.on_node_descriptor_response(StackStatus::Success, NetworkAddress(0), 21 << 9);
        assert_eq!(
            actions,
            vec![Action::Stack(StackRequest::RequestTcLinkKey {
                trust_center: NetworkAddress::COORDINATOR
            })]
        );

        let actions = exchange.on_key_received(&mut attrs, TC, NEW_KEY);
        assert_eq!(attrs.joining_node_new_tc_link_key, Some(NEW_KEY));
        assert_eq!(
            actions,
            vec![Action::Stack(StackRequest::VerifyKey {
                trust_center: TC,
                key: NEW_KEY
            })]
        );

        let actions = exchange.on_verify_confirm(&mut attrs, StackStatus::Success);
        assert!(actions.contains(&Action::Stack(StackRequest::InstallTcLinkKey {
            trust_center: TC,
            key: NEW_KEY
        })));
        assert!(permit_join(&actions));
        assert_eq!(store.find_device_key(TC), Some(NEW_KEY));
        assert_eq!(attrs.joining_node_new_tc_link_key, None);
        assert!(!exchange.is_active());
    }

    #[traced_test]
    #[test]
    fn test_legacy_trust_center_keeps_provisional_key() {
        let (mut exchange, store, mut attrs) = make_exchange();
        exchange.start(&mut attrs, TC, LOCAL);
        exchange.on_timer(&mut attrs);

        let actions =
            exchange.on_node_descriptor_response(StackStatus::Success, NetworkAddress(0), 20 << 9);
        assert!(permit_join(&actions));
        assert_eq!(store.find_device_key(TC), None);
    }

    #[traced_test]
    #[test]
    fn test_silent_trust_center_exhausts_attempts_then_leaves() {
        let (mut exchange, store, mut attrs) = make_exchange();
        exchange.start(&mut attrs, TC, LOCAL);

        let mut requests = 0;
        let mut actions = exchange.on_timer(&mut attrs);
        while !actions
            .iter()
            .any(|a| matches!(a, Action::Stack(StackRequest::Leave { .. })))
        {
            requests += 1;
            assert!(attrs.tc_link_key_exchange_attempts <= attrs.tc_link_key_exchange_attempts_max);
            actions = exchange.on_timer(&mut attrs);
        }
        assert_eq!(requests, 3);
        assert_eq!(attrs.tc_link_key_exchange_attempts, 3);

        let actions = exchange.on_leave_confirm(&mut attrs, StackStatus::Success);
        assert_eq!(steer_finished(&actions), Some(TerminalStatus::TclkExFailure));
        assert!(!attrs.node_is_on_a_network);
        assert_eq!(store.find_device_key(TC), None);
        assert_eq!(attrs.joining_node_new_tc_link_key, None);
    }

    #[traced_test]
    #[test]
    fn test_leave_confirm_timeout_still_fails() {
        let (mut exchange, _store, mut attrs) = make_exchange();
        attrs.tc_link_key_exchange_attempts_max = 1;
        exchange.start(&mut attrs, TC, LOCAL);
        exchange.on_timer(&mut attrs);
        exchange.on_timer(&mut attrs);

        let actions = exchange.on_timer(&mut attrs);
        assert_eq!(steer_finished(&actions), Some(TerminalStatus::TclkExFailure));
    }

    #[traced_test]
    #[test]
    fn test_zero_attempt_budget_still_makes_one_attempt() {
        let (mut exchange, _store, mut attrs) = make_exchange();
        attrs.tc_link_key_exchange_attempts_max = 0;
        exchange.start(&mut attrs, TC, LOCAL);
        assert_eq!(attrs.tc_link_key_exchange_attempts_max, 1);

        let actions = exchange.on_timer(&mut attrs);
        assert!(matches!(
            actions[0],
            Action::Stack(StackRequest::NodeDescriptorRequest { .. })
        ));
        assert_eq!(attrs.tc_link_key_exchange_attempts, 1);

        // The single attempt times out: no retry, straight to leaving.
        let actions = exchange.on_timer(&mut attrs);
        assert!(actions.contains(&Action::Stack(StackRequest::Leave { rejoin: false })));
        assert!(attrs.tc_link_key_exchange_attempts <= attrs.tc_link_key_exchange_attempts_max);
    }

    #[traced_test]
    #[test]
    fn test_cbke_skips_node_descriptor() {
        let (mut exchange, _store, mut attrs) = make_exchange();
        attrs.tc_link_key_exchange_method = KeyExchangeMethod::Cbke;
        exchange.start(&mut attrs, TC, LOCAL);

        let actions = exchange.on_timer(&mut attrs);
        assert_eq!(
            actions[0],
            Action::Stack(StackRequest::KeyEstablishment {
                trust_center: NetworkAddress::COORDINATOR
            })
        );
        let actions = exchange.on_key_received(&mut attrs, TC, NEW_KEY);
        assert_eq!(actions.len(), 1);
    }

    #[traced_test]
    #[test]
    fn test_key_from_other_device_is_ignored() {
        let (mut exchange, _store, mut attrs) = make_exchange();
        exchange.start(&mut attrs, TC, LOCAL);
        exchange.on_timer(&mut attrs);
        exchange.on_node_descriptor_response(StackStatus::Success, NetworkAddress(0), 21 << 9);

        let actions = exchange.on_key_received(&mut attrs, ExtendedAddress(0x99), NEW_KEY);
        assert!(actions.is_empty());
        assert_eq!(attrs.joining_node_new_tc_link_key, None);
    }
}
