//! The multisig engine
//!
//! Single entry point for owners: an authorized multicall batch whose
//! calls address the engine itself. Each call is routed through a fixed
//! selector table to the transaction registry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::{MessageHash, SelectorCodec, Sha256SelectorCodec};
use crate::multicall::{decode, Call, CallDescriptor};
use crate::multisig::auth::{
    self, batch_digest, envelope_hash, index_message_hash, submit_message_hash, tagged_call_hash,
};
use crate::multisig::nonce::NonceGuard;
use crate::multisig::owners::{MultisigConfig, OwnerRegistry};
use crate::multisig::transaction::{LedgerEvent, Transaction, TransactionRegistry, TxIndex};
use crate::multisig::MultisigError;
use crate::target::CallDispatcher;
use crate::Felt;

pub const SUBMIT_TRANSACTION: &str = "submit_transaction";
pub const CONFIRM_TRANSACTION: &str = "confirm_transaction";
pub const REVOKE_CONFIRMATION: &str = "revoke_confirmation";
pub const EXECUTE_TRANSACTION: &str = "execute_transaction";

/// Selectors of the engine's own entry points
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntryPoints {
    pub submit: Felt,
    pub confirm: Felt,
    pub revoke: Felt,
    pub execute: Felt,
}

impl EntryPoints {
    pub fn resolve(codec: &dyn SelectorCodec) -> Self {
        Self {
            submit: codec.selector(SUBMIT_TRANSACTION),
            confirm: codec.selector(CONFIRM_TRANSACTION),
            revoke: codec.selector(REVOKE_CONFIRMATION),
            execute: codec.selector(EXECUTE_TRANSACTION),
        }
    }

    /// Parse a self-addressed call into its operation
    pub fn parse(&self, call: &Call) -> Result<EngineCall, MultisigError> {
        if call.selector == self.submit {
            parse_submit(&call.calldata)
        } else if call.selector == self.confirm {
            parse_index(&call.calldata, CONFIRM_TRANSACTION).map(EngineCall::Confirm)
        } else if call.selector == self.revoke {
            parse_index(&call.calldata, REVOKE_CONFIRMATION).map(EngineCall::Revoke)
        } else if call.selector == self.execute {
            parse_index(&call.calldata, EXECUTE_TRANSACTION).map(EngineCall::Execute)
        } else {
            Err(MultisigError::UnknownSelector(call.selector))
        }
    }
}

/// `[to, selector, calldata_len, calldata...]`
fn parse_submit(words: &[Felt]) -> Result<EngineCall, MultisigError> {
    let [to, selector, declared, rest @ ..] = words else {
        return Err(MultisigError::MalformedCall(format!(
            "{} needs at least 3 words, got {}",
            SUBMIT_TRANSACTION,
            words.len()
        )));
    };

    if *declared != rest.len() as Felt {
        return Err(MultisigError::MalformedCall(format!(
            "{} declares {} calldata words but carries {}",
            SUBMIT_TRANSACTION,
            declared,
            rest.len()
        )));
    }

    Ok(EngineCall::Submit(Call::new(*to, *selector, rest.to_vec())))
}

/// `[tx_index]`
fn parse_index(words: &[Felt], entry_point: &str) -> Result<TxIndex, MultisigError> {
    let [word] = words else {
        return Err(MultisigError::MalformedCall(format!(
            "{} takes exactly one word, got {}",
            entry_point,
            words.len()
        )));
    };

    TxIndex::try_from(*word).map_err(|_| {
        MultisigError::MalformedCall(format!("{} index {} out of range", entry_point, word))
    })
}

/// One operation on the registry, decoded from a self-addressed call
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineCall {
    /// Propose a call to a third-party target
    Submit(Call),
    Confirm(TxIndex),
    Revoke(TxIndex),
    Execute(TxIndex),
}

impl EngineCall {
    /// Hash an owner signs for this operation
    pub fn message_hash(&self) -> MessageHash {
        match self {
            EngineCall::Submit(call) => submit_message_hash(call.to, call.selector, &call.calldata),
            EngineCall::Confirm(tx_index)
            | EngineCall::Revoke(tx_index)
            | EngineCall::Execute(tx_index) => index_message_hash(*tx_index),
        }
    }

    /// Entry-point selector this operation is routed through
    pub fn selector(&self, entry_points: &EntryPoints) -> Felt {
        match self {
            EngineCall::Submit(_) => entry_points.submit,
            EngineCall::Confirm(_) => entry_points.confirm,
            EngineCall::Revoke(_) => entry_points.revoke,
            EngineCall::Execute(_) => entry_points.execute,
        }
    }

    /// Self-addressed call carrying this operation
    pub fn to_call(&self, engine_address: Felt, entry_points: &EntryPoints) -> Call {
        match self {
            EngineCall::Submit(inner) => {
                let mut words = Vec::with_capacity(inner.calldata.len() + 3);
                words.extend([inner.to, inner.selector, inner.calldata.len() as Felt]);
                words.extend_from_slice(&inner.calldata);
                Call::new(engine_address, entry_points.submit, words)
            }
            EngineCall::Confirm(tx_index) => {
                Call::new(engine_address, entry_points.confirm, vec![Felt::from(*tx_index)])
            }
            EngineCall::Revoke(tx_index) => {
                Call::new(engine_address, entry_points.revoke, vec![Felt::from(*tx_index)])
            }
            EngineCall::Execute(tx_index) => {
                Call::new(engine_address, entry_points.execute, vec![Felt::from(*tx_index)])
            }
        }
    }
}

/// Digest an owner signs for a batch; `None` for an empty batch
///
/// Each call hash is tagged with its selector, the tagged hashes are
/// combined in order, and the result is sealed to `engine_address` and
/// `nonce`. A signature is therefore valid for one operation sequence on
/// one engine at one nonce.
pub fn batch_message_hash(
    engine_address: Felt,
    entry_points: &EntryPoints,
    calls: &[EngineCall],
    nonce: u64,
) -> Option<MessageHash> {
    let hashes: Vec<MessageHash> = calls
        .iter()
        .map(|call| tagged_call_hash(call.selector(entry_points), &call.message_hash()))
        .collect();
    let batch = batch_digest(&hashes)?;
    Some(envelope_hash(engine_address, nonce, &batch))
}

/// Everything an owner sends in one envelope
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BatchRequest {
    pub descriptors: Vec<CallDescriptor>,
    pub calldata: Vec<Felt>,
    pub nonce: u64,
    /// Signer public key (hex)
    pub signer: String,
    /// Compact ECDSA signature over the batch digest (hex)
    pub signature: String,
}

/// Result of one applied operation
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum CallOutcome {
    Submitted { tx_index: TxIndex },
    Confirmed { tx_index: TxIndex, confirmations: usize },
    Revoked { tx_index: TxIndex, confirmations: usize },
    Executed { tx_index: TxIndex, output: Vec<Felt> },
}

impl CallOutcome {
    /// Whether this call reached a downstream target
    pub fn dispatched(&self) -> bool {
        matches!(self, CallOutcome::Executed { .. })
    }
}

/// Result of a committed batch
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchReceipt {
    /// Nonce the batch consumed
    pub nonce: u64,
    pub outcomes: Vec<CallOutcome>,
}

/// Owner set, nonce and transactions of one multisig account
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MultisigEngine {
    address: Felt,
    label: Option<String>,
    entry_points: EntryPoints,
    owners: OwnerRegistry,
    nonce: NonceGuard,
    registry: TransactionRegistry,
    created_at: DateTime<Utc>,
}

impl MultisigEngine {
    /// Create an engine with the default selector codec
    pub fn new(config: &MultisigConfig) -> Result<Self, MultisigError> {
        Self::with_codec(config, &Sha256SelectorCodec)
    }

    pub fn with_codec(config: &MultisigConfig, codec: &dyn SelectorCodec) -> Result<Self, MultisigError> {
        let owners = OwnerRegistry::from_config(config)?;
        let address = config
            .engine_address
            .unwrap_or_else(|| owners.derive_address());

        log::info!(
            "Multisig engine 0x{:x} created ({}-of-{})",
            address,
            owners.threshold(),
            owners.len()
        );

        Ok(Self {
            address,
            label: config.label.clone(),
            entry_points: EntryPoints::resolve(codec),
            owners,
            nonce: NonceGuard::new(),
            registry: TransactionRegistry::new(),
            created_at: Utc::now(),
        })
    }

    /// Decode a batch into engine operations without touching state
    pub fn decode_batch(
        &self,
        descriptors: &[CallDescriptor],
        calldata: &[Felt],
    ) -> Result<Vec<EngineCall>, MultisigError> {
        let calls = decode(descriptors, calldata)?;
        if calls.is_empty() {
            return Err(MultisigError::MalformedCall("empty batch".to_string()));
        }

        calls
            .iter()
            .map(|call| {
                if call.to != self.address {
                    return Err(MultisigError::ForeignTarget(call.to));
                }
                self.entry_points.parse(call)
            })
            .collect()
    }

    /// Authorize and apply one batch
    ///
    /// Either every call applies or the ledger and nonce are left as they
    /// were. The one exception is a failing target during `execute`: the
    /// transaction stays executed, earlier calls stay applied, later calls
    /// are skipped and the nonce stays consumed.
    pub fn execute_batch(
        &mut self,
        request: &BatchRequest,
        targets: &mut dyn CallDispatcher,
    ) -> Result<BatchReceipt, MultisigError> {
        let calls = self.decode_batch(&request.descriptors, &request.calldata)?;
        log::debug!("Decoded batch of {} call(s) from {}", calls.len(), request.signer);

        let digest = batch_message_hash(self.address, &self.entry_points, &calls, request.nonce)
            .ok_or_else(|| MultisigError::MalformedCall("empty batch".to_string()))?;
        let owner = auth::authorize(&self.owners, &digest, &request.signature, &request.signer)?;

        let reservation = self.nonce.check_and_consume(request.nonce)?;
        self.registry.begin();

        let mut outcomes = Vec::with_capacity(calls.len());
        match self.apply_all(calls, &owner, targets, &mut outcomes) {
            Ok(()) => {
                self.registry.commit();
                Ok(BatchReceipt {
                    nonce: reservation.commit(),
                    outcomes,
                })
            }
            // A target that already ran cannot be unwound
            Err(err) if err.commits_effects() || outcomes.iter().any(CallOutcome::dispatched) => {
                self.registry.commit();
                let nonce = reservation.commit();
                log::warn!(
                    "Batch with nonce {} stopped after {} call(s): {}",
                    nonce,
                    outcomes.len(),
                    err
                );
                Err(err)
            }
            Err(err) => {
                self.registry.rollback();
                self.nonce.rollback(reservation);
                log::warn!("Batch rolled back: {}", err);
                Err(err)
            }
        }
    }

    fn apply_all(
        &mut self,
        calls: Vec<EngineCall>,
        owner: &str,
        targets: &mut dyn CallDispatcher,
        outcomes: &mut Vec<CallOutcome>,
    ) -> Result<(), MultisigError> {
        for call in calls {
            outcomes.push(self.apply(call, owner, targets)?);
        }
        Ok(())
    }

    fn apply(
        &mut self,
        call: EngineCall,
        owner: &str,
        targets: &mut dyn CallDispatcher,
    ) -> Result<CallOutcome, MultisigError> {
        match call {
            EngineCall::Submit(inner) => {
                let tx_index = self
                    .registry
                    .submit(owner, inner.to, inner.selector, inner.calldata);
                Ok(CallOutcome::Submitted { tx_index })
            }
            EngineCall::Confirm(tx_index) => {
                let confirmations = self.registry.confirm(tx_index, owner)?;
                Ok(CallOutcome::Confirmed {
                    tx_index,
                    confirmations,
                })
            }
            EngineCall::Revoke(tx_index) => {
                let confirmations = self.registry.revoke(tx_index, owner)?;
                Ok(CallOutcome::Revoked {
                    tx_index,
                    confirmations,
                })
            }
            EngineCall::Execute(tx_index) => {
                let output =
                    self.registry
                        .execute(tx_index, owner, self.owners.threshold(), targets)?;
                Ok(CallOutcome::Executed { tx_index, output })
            }
        }
    }

    pub fn address(&self) -> Felt {
        self.address
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn entry_points(&self) -> &EntryPoints {
        &self.entry_points
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn owners(&self) -> &[String] {
        self.owners.owners()
    }

    pub fn is_owner(&self, pubkey: &str) -> bool {
        self.owners.is_owner(pubkey)
    }

    pub fn threshold(&self) -> u8 {
        self.owners.threshold()
    }

    /// Nonce the next batch must present
    pub fn nonce(&self) -> u64 {
        self.nonce.current()
    }

    pub fn transactions_len(&self) -> usize {
        self.registry.len()
    }

    pub fn transaction(&self, tx_index: TxIndex) -> Result<&Transaction, MultisigError> {
        self.registry.get(tx_index)
    }

    pub fn transactions(&self) -> &[Transaction] {
        self.registry.list()
    }

    pub fn is_confirmed(&self, tx_index: TxIndex, owner: &str) -> Result<bool, MultisigError> {
        self.registry.is_confirmed(tx_index, owner)
    }

    pub fn events(&self) -> &[LedgerEvent] {
        self.registry.events()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::selector_from_name;
    use crate::multicall::encode;
    use crate::target::balance::COMPLEX_INPUTS;
    use crate::target::{TargetError, TargetRegistry};
    use crate::wallet::Wallet;

    const TARGET: Felt = 0x7a;

    #[derive(Default)]
    struct RecordingTarget {
        calls: Vec<(Felt, Felt, Vec<Felt>)>,
        reject: bool,
    }

    impl CallDispatcher for RecordingTarget {
        fn dispatch(&mut self, to: Felt, selector: Felt, calldata: &[Felt]) -> Result<Vec<Felt>, TargetError> {
            self.calls.push((to, selector, calldata.to_vec()));
            if self.reject {
                Err(TargetError::Rejected("downstream failure".to_string()))
            } else {
                Ok(Vec::new())
            }
        }
    }

    fn setup(owner_count: usize, threshold: u8) -> (MultisigEngine, Vec<Wallet>) {
        let wallets: Vec<Wallet> = (0..owner_count).map(|_| Wallet::new()).collect();
        let owners = wallets.iter().map(|w| w.public_key()).collect();
        let config = MultisigConfig::new(threshold, owners, None).unwrap();
        (MultisigEngine::new(&config).unwrap(), wallets)
    }

    fn run(
        engine: &mut MultisigEngine,
        wallet: &Wallet,
        ops: &[EngineCall],
        target: &mut RecordingTarget,
    ) -> Result<BatchReceipt, MultisigError> {
        let request = wallet
            .sign_batch(engine.address(), engine.entry_points(), ops, engine.nonce())
            .unwrap();
        engine.execute_batch(&request, target)
    }

    fn set_balance(value: Felt) -> EngineCall {
        EngineCall::Submit(Call::new(TARGET, selector_from_name("set_balance"), vec![value]))
    }

    #[test]
    fn test_scenario_single_owner() {
        let (mut engine, wallets) = setup(1, 1);
        let mut target = RecordingTarget::default();
        let k1 = &wallets[0];

        let receipt = run(&mut engine, k1, &[set_balance(8)], &mut target).unwrap();
        assert_eq!(receipt.outcomes, vec![CallOutcome::Submitted { tx_index: 0 }]);

        run(&mut engine, k1, &[EngineCall::Confirm(0)], &mut target).unwrap();
        assert_eq!(engine.transaction(0).unwrap().num_confirmations(), 1);

        run(&mut engine, k1, &[EngineCall::Execute(0)], &mut target).unwrap();
        assert!(engine.transaction(0).unwrap().executed);
        assert_eq!(
            target.calls,
            vec![(TARGET, selector_from_name("set_balance"), vec![8])]
        );

        let again = run(&mut engine, k1, &[EngineCall::Execute(0)], &mut target);
        assert!(matches!(again, Err(MultisigError::AlreadyExecuted(0))));
        assert_eq!(target.calls.len(), 1);
    }

    #[test]
    fn test_scenario_surplus_confirmation_revoked() {
        let (mut engine, wallets) = setup(3, 2);
        let mut target = RecordingTarget::default();

        run(&mut engine, &wallets[0], &[set_balance(6)], &mut target).unwrap();
        for wallet in &wallets {
            run(&mut engine, wallet, &[EngineCall::Confirm(0)], &mut target).unwrap();
        }
        assert_eq!(engine.transaction(0).unwrap().num_confirmations(), 3);

        run(&mut engine, &wallets[1], &[EngineCall::Revoke(0)], &mut target).unwrap();
        assert_eq!(engine.transaction(0).unwrap().num_confirmations(), 2);
        assert!(!engine.is_confirmed(0, &wallets[1].public_key()).unwrap());

        let receipt = run(&mut engine, &wallets[2], &[EngineCall::Execute(0)], &mut target).unwrap();
        assert_eq!(
            receipt.outcomes,
            vec![CallOutcome::Executed {
                tx_index: 0,
                output: vec![]
            }]
        );
        assert_eq!(target.calls.len(), 1);
    }

    #[test]
    fn test_insufficient_confirmations() {
        let (mut engine, wallets) = setup(3, 2);
        let mut target = RecordingTarget::default();

        run(&mut engine, &wallets[0], &[set_balance(1)], &mut target).unwrap();
        run(&mut engine, &wallets[0], &[EngineCall::Confirm(0)], &mut target).unwrap();

        let result = run(&mut engine, &wallets[0], &[EngineCall::Execute(0)], &mut target);
        assert!(matches!(
            result,
            Err(MultisigError::InsufficientConfirmations { have: 1, need: 2, .. })
        ));
        assert!(target.calls.is_empty());
    }

    #[test]
    fn test_non_owner_batch_has_no_effect() {
        let (mut engine, wallets) = setup(2, 1);
        let mut target = RecordingTarget::default();
        run(&mut engine, &wallets[0], &[set_balance(1)], &mut target).unwrap();
        run(&mut engine, &wallets[0], &[EngineCall::Confirm(0)], &mut target).unwrap();

        let outsider = Wallet::new();
        let result = run(
            &mut engine,
            &outsider,
            &[set_balance(2), EngineCall::Confirm(0)],
            &mut target,
        );

        assert!(matches!(result, Err(MultisigError::Auth(_))));
        assert_eq!(engine.nonce(), 2);
        assert_eq!(engine.transactions_len(), 1);
        assert_eq!(engine.transaction(0).unwrap().num_confirmations(), 1);
    }

    #[test]
    fn test_signature_bound_to_content() {
        let (mut engine, wallets) = setup(1, 1);
        let mut target = RecordingTarget::default();

        let mut request = wallets[0]
            .sign_batch(engine.address(), engine.entry_points(), &[set_balance(8)], 0)
            .unwrap();
        // Swap the payload under the same signature
        let last = request.calldata.len() - 1;
        request.calldata[last] = 9;

        let result = engine.execute_batch(&request, &mut target);
        assert!(matches!(result, Err(MultisigError::Auth(_))));
        assert_eq!(engine.nonce(), 0);
        assert_eq!(engine.transactions_len(), 0);
    }

    #[test]
    fn test_old_request_replayed_at_current_nonce_rejected() {
        let (mut engine, wallets) = setup(2, 2);
        let mut target = RecordingTarget::default();
        let k1 = &wallets[0];
        run(&mut engine, k1, &[set_balance(8)], &mut target).unwrap();

        let confirm = k1
            .sign_batch(engine.address(), engine.entry_points(), &[EngineCall::Confirm(0)], 1)
            .unwrap();
        engine.execute_batch(&confirm, &mut target).unwrap();
        run(&mut engine, k1, &[EngineCall::Revoke(0)], &mut target).unwrap();
        assert_eq!(engine.nonce(), 3);

        let mut replay = confirm.clone();
        replay.nonce = engine.nonce();
        let result = engine.execute_batch(&replay, &mut target);

        assert!(matches!(result, Err(MultisigError::Auth(_))));
        assert!(!engine.is_confirmed(0, &k1.public_key()).unwrap());
        assert_eq!(engine.nonce(), 3);
    }

    #[test]
    fn test_confirm_signature_not_valid_for_revoke() {
        let (mut engine, wallets) = setup(2, 2);
        let mut target = RecordingTarget::default();
        let k1 = &wallets[0];
        run(&mut engine, k1, &[set_balance(8)], &mut target).unwrap();
        run(&mut engine, k1, &[EngineCall::Confirm(0)], &mut target).unwrap();

        // Same index word, same nonce, revoke selector under a confirm signature
        let mut request = k1
            .sign_batch(engine.address(), engine.entry_points(), &[EngineCall::Confirm(0)], engine.nonce())
            .unwrap();
        request.descriptors[0].selector = engine.entry_points().revoke;
        let result = engine.execute_batch(&request, &mut target);

        assert!(matches!(result, Err(MultisigError::Auth(_))));
        assert!(engine.is_confirmed(0, &k1.public_key()).unwrap());
        assert_eq!(engine.nonce(), 2);
    }

    #[test]
    fn test_request_bound_to_engine_address() {
        let (engine, wallets) = setup(1, 1);
        let mut config = MultisigConfig::new(1, vec![wallets[0].public_key()], None).unwrap();
        config.engine_address = Some(0xbeef);
        let mut other = MultisigEngine::new(&config).unwrap();
        let mut target = RecordingTarget::default();

        // Re-address the calls to the second engine, keep the signature
        let mut request = wallets[0]
            .sign_batch(engine.address(), engine.entry_points(), &[set_balance(1)], 0)
            .unwrap();
        for descriptor in &mut request.descriptors {
            descriptor.to = other.address();
        }

        let result = other.execute_batch(&request, &mut target);
        assert!(matches!(result, Err(MultisigError::Auth(_))));
        assert_eq!(other.transactions_len(), 0);
    }

    #[test]
    fn test_complex_calldata_reaches_target() {
        let (mut engine, wallets) = setup(2, 2);
        let mut targets = TargetRegistry::new();
        let target = targets.deploy("owner", 0);
        // [1, 2, 3] then [{4, 5}, {6, 7}]
        let calldata = vec![3, 1, 2, 3, 2, 4, 5, 6, 7];

        let submit = EngineCall::Submit(Call::new(
            target,
            selector_from_name(COMPLEX_INPUTS),
            calldata.clone(),
        ));
        for (wallet, ops) in [
            (&wallets[0], vec![submit, EngineCall::Confirm(0)]),
            (&wallets[1], vec![EngineCall::Confirm(0), EngineCall::Execute(0)]),
        ] {
            let request = wallet
                .sign_batch(engine.address(), engine.entry_points(), &ops, engine.nonce())
                .unwrap();
            engine.execute_batch(&request, &mut targets).unwrap();
        }

        let tx = engine.transaction(0).unwrap();
        assert!(tx.executed);
        assert_eq!(tx.calldata, calldata);
        assert_eq!(targets.get(target).unwrap().array_sum, 28);
    }

    #[test]
    fn test_failed_batch_restores_existing_transaction() {
        let (mut engine, wallets) = setup(2, 2);
        let mut target = RecordingTarget::default();
        let k1 = &wallets[0];
        run(&mut engine, k1, &[set_balance(8), EngineCall::Confirm(0)], &mut target).unwrap();
        let events_before = engine.events().len();

        let result = run(&mut engine, k1, &[EngineCall::Revoke(0), EngineCall::Revoke(9)], &mut target);

        assert!(matches!(result, Err(MultisigError::NotFound(9))));
        assert!(engine.is_confirmed(0, &k1.public_key()).unwrap());
        assert_eq!(engine.events().len(), events_before);
        assert_eq!(engine.nonce(), 1);
    }

    #[test]
    fn test_stale_and_future_nonce_rejected() {
        let (mut engine, wallets) = setup(1, 1);
        let mut target = RecordingTarget::default();
        run(&mut engine, &wallets[0], &[set_balance(1)], &mut target).unwrap();

        for nonce in [0, 2] {
            let request = wallets[0]
                .sign_batch(engine.address(), engine.entry_points(), &[set_balance(1)], nonce)
                .unwrap();
            let result = engine.execute_batch(&request, &mut target);
            assert!(matches!(result, Err(MultisigError::Nonce { expected: 1, .. })));
        }
        assert_eq!(engine.transactions_len(), 1);
    }

    #[test]
    fn test_failed_call_rolls_back_batch_and_nonce() {
        let (mut engine, wallets) = setup(2, 1);
        let mut target = RecordingTarget::default();
        let events_before = engine.events().len();

        // Submit succeeds, then confirming index 5 fails: nothing may stick
        let result = run(
            &mut engine,
            &wallets[0],
            &[set_balance(3), EngineCall::Confirm(5)],
            &mut target,
        );
        assert!(matches!(result, Err(MultisigError::NotFound(5))));
        assert_eq!(engine.transactions_len(), 0);
        assert_eq!(engine.nonce(), 0);
        assert_eq!(engine.events().len(), events_before);

        // Retrying with the same logical nonce works
        let receipt = run(&mut engine, &wallets[0], &[set_balance(3)], &mut target).unwrap();
        assert_eq!(receipt.nonce, 0);
        assert_eq!(engine.nonce(), 1);
    }

    #[test]
    fn test_execution_failure_keeps_executed_and_nonce() {
        let (mut engine, wallets) = setup(1, 1);
        let mut target = RecordingTarget {
            reject: true,
            ..Default::default()
        };
        run(&mut engine, &wallets[0], &[set_balance(4)], &mut target).unwrap();

        let result = run(
            &mut engine,
            &wallets[0],
            &[EngineCall::Confirm(0), EngineCall::Execute(0), set_balance(5)],
            &mut target,
        );

        assert!(matches!(result, Err(MultisigError::Execution { tx_index: 0, .. })));
        let tx = engine.transaction(0).unwrap();
        assert!(tx.executed);
        assert_eq!(tx.num_confirmations(), 1);
        // Call after the failing execute never ran
        assert_eq!(engine.transactions_len(), 1);
        assert_eq!(engine.nonce(), 2);
        assert_eq!(target.calls.len(), 1);
    }

    #[test]
    fn test_failure_after_successful_execute_keeps_batch() {
        let (mut engine, wallets) = setup(1, 1);
        let mut target = RecordingTarget::default();
        run(&mut engine, &wallets[0], &[set_balance(4)], &mut target).unwrap();

        let result = run(
            &mut engine,
            &wallets[0],
            &[EngineCall::Confirm(0), EngineCall::Execute(0), EngineCall::Confirm(7)],
            &mut target,
        );

        assert!(matches!(result, Err(MultisigError::NotFound(7))));
        assert!(engine.transaction(0).unwrap().executed);
        assert_eq!(engine.nonce(), 2);
        assert_eq!(target.calls.len(), 1);
    }

    #[test]
    fn test_multi_call_batch() {
        let (mut engine, wallets) = setup(1, 1);
        let mut target = RecordingTarget::default();

        let receipt = run(
            &mut engine,
            &wallets[0],
            &[set_balance(8), EngineCall::Confirm(0), EngineCall::Execute(0)],
            &mut target,
        )
        .unwrap();

        assert_eq!(receipt.outcomes.len(), 3);
        assert_eq!(receipt.nonce, 0);
        assert_eq!(engine.nonce(), 1);
        assert_eq!(target.calls.len(), 1);
    }

    #[test]
    fn test_foreign_target_rejected() {
        let (mut engine, wallets) = setup(1, 1);
        let mut target = RecordingTarget::default();

        let call = Call::new(TARGET, selector_from_name("set_balance"), vec![1]);
        let (descriptors, calldata) = encode(&[call]);
        let request = BatchRequest {
            descriptors,
            calldata,
            nonce: 0,
            signer: wallets[0].public_key(),
            signature: String::new(),
        };

        let result = engine.execute_batch(&request, &mut target);
        assert!(matches!(result, Err(MultisigError::ForeignTarget(TARGET))));
        assert!(target.calls.is_empty());
        assert_eq!(engine.nonce(), 0);
    }

    #[test]
    fn test_unknown_selector_and_malformed_calls() {
        let (engine, _) = setup(1, 1);
        let me = engine.address();
        let eps = *engine.entry_points();

        let decode_one = |call: Call| {
            let (descriptors, calldata) = encode(&[call]);
            engine.decode_batch(&descriptors, &calldata)
        };

        assert!(matches!(
            decode_one(Call::new(me, 0xdead, vec![])),
            Err(MultisigError::UnknownSelector(0xdead))
        ));
        assert!(matches!(
            decode_one(Call::new(me, eps.confirm, vec![])),
            Err(MultisigError::MalformedCall(_))
        ));
        assert!(matches!(
            decode_one(Call::new(me, eps.execute, vec![Felt::from(u64::MAX) + 1])),
            Err(MultisigError::MalformedCall(_))
        ));
        assert!(matches!(
            decode_one(Call::new(me, eps.submit, vec![TARGET, 1, 2, 8])),
            Err(MultisigError::MalformedCall(_))
        ));
        assert!(matches!(
            engine.decode_batch(&[], &[]),
            Err(MultisigError::MalformedCall(_))
        ));
    }

    #[test]
    fn test_bad_offsets_are_range_errors() {
        let (mut engine, wallets) = setup(1, 1);
        let mut target = RecordingTarget::default();

        let mut request = wallets[0]
            .sign_batch(engine.address(), engine.entry_points(), &[EngineCall::Confirm(0)], 0)
            .unwrap();
        request.descriptors[0].data_len = 2;

        let result = engine.execute_batch(&request, &mut target);
        assert!(matches!(result, Err(MultisigError::Range(_))));
        assert_eq!(engine.nonce(), 0);
    }

    #[test]
    fn test_engine_call_round_trips_through_abi() {
        let (engine, _) = setup(1, 1);
        let ops = [
            set_balance(8),
            EngineCall::Submit(Call::new(TARGET, 3, vec![])),
            EngineCall::Confirm(1),
            EngineCall::Revoke(2),
            EngineCall::Execute(3),
        ];

        let calls: Vec<Call> = ops
            .iter()
            .map(|op| op.to_call(engine.address(), engine.entry_points()))
            .collect();
        let (descriptors, calldata) = encode(&calls);

        assert_eq!(engine.decode_batch(&descriptors, &calldata).unwrap(), ops.to_vec());
    }

    #[test]
    fn test_queries() {
        let (mut engine, wallets) = setup(3, 2);
        let mut target = RecordingTarget::default();
        run(&mut engine, &wallets[0], &[set_balance(8)], &mut target).unwrap();

        assert_eq!(engine.threshold(), 2);
        assert_eq!(engine.owners().len(), 3);
        assert!(engine.is_owner(&wallets[2].public_key()));
        assert_eq!(engine.transactions_len(), 1);
        assert_eq!(engine.transactions()[0].calldata, vec![8]);
        assert!(!engine.is_confirmed(0, &wallets[0].public_key()).unwrap());
        assert!(matches!(engine.transaction(1), Err(MultisigError::NotFound(1))));
        assert_eq!(engine.nonce(), 1);
    }

    #[test]
    fn test_configured_address_wins() {
        let wallet = Wallet::new();
        let mut config = MultisigConfig::new(1, vec![wallet.public_key()], None).unwrap();
        config.engine_address = Some(0x1234);

        let engine = MultisigEngine::new(&config).unwrap();
        assert_eq!(engine.address(), 0x1234);
    }
}
