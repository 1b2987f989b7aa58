//! Session key validation through the Smart Sessions module.

use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use nexus_account_types::SmartSessionMode;

use super::Validator;
use crate::{
    errors::Result,
    nexus::{constants::dummy_ecdsa_signature, interfaces::EnableSession},
    sessions::framing::{check_enable_data, encode_session_signature, PayloadEncoding},
    signer::SharedSigner,
};

#[derive(Clone)]
pub struct SmartSessionValidator {
    smart_sessions: Address,
    session_key: SharedSigner,
    permission_id: B256,
    mode: SmartSessionMode,
    enable: Option<EnableSession>,
    encoding: PayloadEncoding,
}

impl SmartSessionValidator {
    /// Session already enabled on-chain.
    pub fn for_use(smart_sessions: Address, session_key: SharedSigner, permission_id: B256) -> Self {
        Self {
            smart_sessions,
            session_key,
            permission_id,
            mode: SmartSessionMode::Use,
            enable: None,
            encoding: PayloadEncoding::Raw,
        }
    }

    pub fn new(
        smart_sessions: Address,
        session_key: SharedSigner,
        permission_id: B256,
        mode: SmartSessionMode,
        enable: Option<EnableSession>,
        encoding: PayloadEncoding,
    ) -> Self {
        Self { smart_sessions, session_key, permission_id, mode, enable, encoding }
    }

    pub fn permission_id(&self) -> B256 {
        self.permission_id
    }

    pub fn mode(&self) -> SmartSessionMode {
        self.mode
    }

    /// Switch to USE framing once the session is enabled on-chain.
    pub fn mark_enabled(&mut self) {
        self.mode = SmartSessionMode::Use;
        self.enable = None;
    }

    fn frame(&self, sig: &[u8]) -> Result<Bytes> {
        Ok(encode_session_signature(self.mode, self.permission_id, sig, self.enable.as_ref(), self.encoding)?)
    }
}

#[async_trait]
impl Validator for SmartSessionValidator {
    fn address(&self) -> Address {
        self.smart_sessions
    }

    /// Sessions are enabled per permission, not at install time.
    fn init_data(&self) -> Bytes {
        Bytes::new()
    }

    fn dummy_signature(&self) -> Result<Bytes> {
        self.frame(&dummy_ecdsa_signature())
    }

    async fn sign_user_op_hash(&self, hash: B256) -> Result<Bytes> {
        check_enable_data(self.mode, self.enable.as_ref())?;
        let sig = self.session_key.sign_message(hash.as_slice()).await?;
        self.frame(&sig)
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Bytes> {
        check_enable_data(self.mode, self.enable.as_ref())?;
        let sig = self.session_key.sign_message(message).await?;
        self.frame(&sig)
    }

    async fn sign_hash(&self, hash: B256) -> Result<Bytes> {
        check_enable_data(self.mode, self.enable.as_ref())?;
        let sig = self.session_key.sign_hash(hash).await?;
        self.frame(&sig)
    }
}
