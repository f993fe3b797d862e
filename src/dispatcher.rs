//! Relay dispatcher: maps each observed event to one outbound transaction
//!
//! Each event runs through a one-shot pipeline: fresh nonce read, calldata
//! encoding, EIP-1559 construction under the fixed gas/fee policy, warden
//! signature, submission. Failures are isolated per event; there are no
//! retries and no pending state carried across passes.

use crate::chain::{ChainRole, TargetChain};
use crate::config::GasPolicy;
use crate::contracts::{ContractBinding, Warden};
use crate::error::{RelayerError, RelayerResult};
use crate::events::DomainEvent;
use crate::metrics;

use ethers::abi::Token;
use ethers::signers::Signer;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, Eip1559TransactionRequest, H256, U256};
use tracing::{info, warn};

/// The authorizing function called on the target chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayFunction {
    Wrap,
    Withdraw,
}

impl RelayFunction {
    /// Deposits scanned on the source chain wrap on the destination;
    /// unwraps scanned on the destination withdraw on the source.
    pub fn for_scanned_role(scanned: ChainRole) -> Self {
        match scanned {
            ChainRole::Source => RelayFunction::Wrap,
            ChainRole::Destination => RelayFunction::Withdraw,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RelayFunction::Wrap => "wrap",
            RelayFunction::Withdraw => "withdraw",
        }
    }
}

/// One outbound authorizing call, built from a single observed event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundAction {
    pub target: ChainRole,
    pub function: RelayFunction,
    pub token: Address,
    pub recipient: Address,
    pub amount: U256,
}

impl OutboundAction {
    /// Arguments are copied verbatim from the event; the target is the
    /// opposite of the scanned side.
    pub fn from_event(scanned: ChainRole, event: &DomainEvent) -> Self {
        Self {
            target: scanned.other(),
            function: RelayFunction::for_scanned_role(scanned),
            token: event.token,
            recipient: event.recipient,
            amount: event.amount,
        }
    }
}

/// Aggregate result of one dispatch batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub submitted: usize,
    pub failed: usize,
}

/// Submits one outbound action per event on the target chain.
pub struct RelayDispatcher<'a, C: TargetChain> {
    target: &'a C,
    binding: &'a ContractBinding,
    warden: &'a Warden,
    gas: GasPolicy,
}

impl<'a, C: TargetChain> RelayDispatcher<'a, C> {
    pub fn new(
        target: &'a C,
        binding: &'a ContractBinding,
        warden: &'a Warden,
        gas: GasPolicy,
    ) -> Self {
        Self {
            target,
            binding,
            warden,
            gas,
        }
    }

    /// Relay a batch of events, one action each.
    ///
    /// Submissions for the warden stay strictly ordered: the next nonce read
    /// happens only after the previous submission has settled. One event's
    /// failure never aborts the remainder of the batch.
    pub async fn dispatch(&self, scanned: ChainRole, events: &[DomainEvent]) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();

        for event in events {
            let action = OutboundAction::from_event(scanned, event);
            match self.relay_one(&action).await {
                Ok(tx_hash) => {
                    outcome.submitted += 1;
                    metrics::record_relay_submitted(action.function.name());
                    info!(
                        "{} sent on {} for origin tx {:?} -> {:?}",
                        action.function.name(),
                        action.target,
                        event.origin_tx,
                        tx_hash
                    );
                }
                Err(e) => {
                    outcome.failed += 1;
                    metrics::record_relay_failed(action.function.name());
                    warn!(
                        "Failed to relay origin tx {:?} (block {}): {}",
                        event.origin_tx, event.block_number, e
                    );
                }
            }
        }

        outcome
    }

    async fn relay_one(&self, action: &OutboundAction) -> RelayerResult<H256> {
        let nonce = self.target.transaction_count(self.warden.address).await?;
        let raw = self.build_signed_transaction(action, nonce).await?;
        self.target.submit_signed_transaction(raw).await
    }

    async fn build_signed_transaction(
        &self,
        action: &OutboundAction,
        nonce: U256,
    ) -> RelayerResult<Bytes> {
        let calldata = encode_call(self.binding, action)?;
        let chain_id = self.target.chain_id();

        let request = Eip1559TransactionRequest::new()
            .to(self.binding.address)
            .data(calldata)
            .nonce(nonce)
            .gas(self.gas.gas_limit)
            .max_fee_per_gas(self.gas.max_fee_wei())
            .max_priority_fee_per_gas(self.gas.priority_fee_wei())
            .chain_id(chain_id);
        let tx = TypedTransaction::Eip1559(request);

        let wallet = self.warden.wallet.clone().with_chain_id(chain_id);
        let signature = wallet
            .sign_transaction(&tx)
            .await
            .map_err(|e| RelayerError::Action {
                role: action.target,
                message: format!("signing failed: {}", e),
            })?;

        Ok(tx.rlp_signed(&signature))
    }
}

/// ABI-encode the wrap/withdraw call with the event arguments verbatim.
pub fn encode_call(binding: &ContractBinding, action: &OutboundAction) -> RelayerResult<Bytes> {
    let function = binding
        .abi
        .function(action.function.name())
        .map_err(|e| RelayerError::Action {
            role: action.target,
            message: format!(
                "{} function missing from target ABI: {}",
                action.function.name(),
                e
            ),
        })?;

    let calldata = function
        .encode_input(&[
            Token::Address(action.token),
            Token::Address(action.recipient),
            Token::Uint(action.amount),
        ])
        .map_err(|e| RelayerError::Action {
            role: action.target,
            message: format!("calldata encoding failed: {}", e),
        })?;

    Ok(Bytes::from(calldata))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::MockTargetChain;
    use ethers::abi::Abi;
    use ethers::types::NameOrAddress;
    use ethers::utils::rlp::Rlp;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    const TEST_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const WRAP_ABI: &str = r#"[{"type":"function","name":"wrap","stateMutability":"nonpayable","outputs":[],"inputs":[
        {"name":"token","type":"address"},
        {"name":"recipient","type":"address"},
        {"name":"amount","type":"uint256"}]}]"#;

    fn destination_binding() -> ContractBinding {
        ContractBinding {
            role: ChainRole::Destination,
            address: "0x5FbDB2315678afecb367f032d93F642f64180aa3"
                .parse()
                .unwrap(),
            abi: serde_json::from_str::<Abi>(WRAP_ABI).unwrap(),
            credential: None,
        }
    }

    fn warden() -> Warden {
        let wallet: ethers::signers::LocalWallet = TEST_KEY.parse().unwrap();
        Warden {
            address: wallet.address(),
            wallet,
        }
    }

    fn deposit_event(amount: U256) -> DomainEvent {
        DomainEvent {
            token: "0x00000000000000000000000000000000000000aa".parse().unwrap(),
            recipient: "0x00000000000000000000000000000000000000bb".parse().unwrap(),
            amount,
            origin_tx: H256::repeat_byte(0x11),
            block_number: 42,
        }
    }

    #[test]
    fn maps_scanned_role_to_counterpart_action() {
        let event = deposit_event(U256::from(1000u64));

        let wrap = OutboundAction::from_event(ChainRole::Source, &event);
        assert_eq!(wrap.target, ChainRole::Destination);
        assert_eq!(wrap.function, RelayFunction::Wrap);

        let withdraw = OutboundAction::from_event(ChainRole::Destination, &event);
        assert_eq!(withdraw.target, ChainRole::Source);
        assert_eq!(withdraw.function, RelayFunction::Withdraw);

        assert_eq!(wrap.token, event.token);
        assert_eq!(wrap.recipient, event.recipient);
        assert_eq!(wrap.amount, event.amount);
    }

    #[test]
    fn calldata_carries_arguments_verbatim() {
        let binding = destination_binding();
        let amount = U256::from_dec_str("123456789012345678901234567890").unwrap();
        let action = OutboundAction::from_event(ChainRole::Source, &deposit_event(amount));

        let calldata = encode_call(&binding, &action).unwrap();
        let function = binding.abi.function("wrap").unwrap();
        assert_eq!(calldata[..4], function.short_signature()[..]);

        let decoded = function.decode_input(&calldata[4..]).unwrap();
        assert_eq!(decoded[0], Token::Address(action.token));
        assert_eq!(decoded[1], Token::Address(action.recipient));
        assert_eq!(decoded[2], Token::Uint(amount));
    }

    #[test]
    fn missing_function_is_action_error() {
        let binding = destination_binding();
        let mut action = OutboundAction::from_event(ChainRole::Source, &deposit_event(U256::one()));
        action.function = RelayFunction::Withdraw;

        let err = encode_call(&binding, &action).unwrap_err();
        assert!(matches!(err, RelayerError::Action { .. }));
    }

    #[tokio::test]
    async fn one_failure_never_aborts_the_batch() {
        let mut target = MockTargetChain::new();
        target.expect_chain_id().return_const(97u64);
        // A fresh nonce read per action, never cached
        target
            .expect_transaction_count()
            .times(3)
            .returning(|_| Ok(U256::from(7u64)));

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        target
            .expect_submit_signed_transaction()
            .times(3)
            .returning(move |_| {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                if n == 1 {
                    Err(RelayerError::Action {
                        role: ChainRole::Destination,
                        message: "execution reverted".into(),
                    })
                } else {
                    Ok(H256::repeat_byte(n as u8 + 1))
                }
            });

        let binding = destination_binding();
        let warden = warden();
        let dispatcher = RelayDispatcher::new(&target, &binding, &warden, GasPolicy::default());

        let events = vec![
            deposit_event(U256::from(1u64)),
            deposit_event(U256::from(2u64)),
            deposit_event(U256::from(3u64)),
        ];
        let outcome = dispatcher.dispatch(ChainRole::Source, &events).await;

        assert_eq!(outcome.submitted, 2);
        assert_eq!(outcome.failed, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn empty_batch_submits_nothing() {
        let mut target = MockTargetChain::new();
        target.expect_transaction_count().times(0);
        target.expect_submit_signed_transaction().times(0);

        let binding = destination_binding();
        let warden = warden();
        let dispatcher = RelayDispatcher::new(&target, &binding, &warden, GasPolicy::default());

        let outcome = dispatcher.dispatch(ChainRole::Source, &[]).await;
        assert_eq!(outcome, DispatchOutcome::default());
    }

    #[tokio::test]
    async fn transaction_is_stamped_with_fresh_nonce_and_policy() {
        let mut target = MockTargetChain::new();
        target.expect_chain_id().return_const(97u64);
        target
            .expect_transaction_count()
            .times(1)
            .returning(|_| Ok(U256::from(42u64)));

        let captured: Arc<Mutex<Option<Bytes>>> = Arc::new(Mutex::new(None));
        let sink = captured.clone();
        target
            .expect_submit_signed_transaction()
            .times(1)
            .returning(move |raw| {
                *sink.lock().unwrap() = Some(raw);
                Ok(H256::repeat_byte(0x22))
            });

        let binding = destination_binding();
        let warden = warden();
        let dispatcher = RelayDispatcher::new(&target, &binding, &warden, GasPolicy::default());

        let events = vec![deposit_event(U256::from(1000u64))];
        let outcome = dispatcher.dispatch(ChainRole::Source, &events).await;
        assert_eq!(outcome.submitted, 1);

        let raw = captured.lock().unwrap().clone().unwrap();
        let (decoded, _signature) =
            TypedTransaction::decode_signed(&Rlp::new(raw.as_ref())).unwrap();

        assert_eq!(decoded.nonce(), Some(&U256::from(42u64)));
        assert_eq!(decoded.gas(), Some(&U256::from(250_000u64)));
        assert_eq!(
            decoded.to(),
            Some(&NameOrAddress::Address(binding.address))
        );
        let action = OutboundAction::from_event(ChainRole::Source, &events[0]);
        let expected = encode_call(&binding, &action).unwrap();
        assert_eq!(decoded.data(), Some(&expected));
        assert_eq!(decoded.chain_id(), Some(97u64.into()));

        if let TypedTransaction::Eip1559(request) = &decoded {
            assert_eq!(request.max_fee_per_gas, Some(U256::from(2_000_000_000u64)));
            assert_eq!(
                request.max_priority_fee_per_gas,
                Some(U256::from(1_000_000_000u64))
            );
        } else {
            panic!("expected an EIP-1559 transaction");
        }
    }
}
