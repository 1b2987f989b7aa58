#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use alloy_primitives::{address, aliases::U192, keccak256, Address, Bytes, B256, U256};
    use alloy_sol_types::{SolCall, SolValue};
    use async_trait::async_trait;
    use nexus_account_types::{ModuleType, SmartSessionMode, ValidationMode};

    use crate::{
        config::AccountConfig,
        errors::{AccountError, ConfigError},
        mock::MockChain,
        modules::{
            install::{installed_modules, previous_installed},
            K1Validator, ModuleManager, OwnableValidator, SmartSessionValidator, Validator,
        },
        nexus::{
            constants::{MODULE_PAGE_SIZE, SENTINEL_ADDRESS},
            interfaces::{INexus, ISmartSession},
        },
        nonce::{NonceKey, NonceOptions},
        sessions::{
            build_session, decode_session_signature, is_permission_enabled, permission::multichain_digest,
            permission_id, prepare_enable_session, select_mode, session_nonce, PayloadEncoding, SessionChainContext,
            SessionContracts, SessionRequest,
        },
        signature::unwrap_erc6492,
        signer::{AccountSigner, LocalSigner, SharedSigner},
        typed_data::{erc7739, TypedData},
        utils::crypto::{personal_message_hash, recover_address},
        NexusAccount,
    };

    const KEY_0: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const KEY_1: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";
    const K1_VALIDATOR: Address = address!("00000004171351c442B202678c48D8AB5B321E8f");

    fn signer(key: &str) -> SharedSigner {
        LocalSigner::from_hex(key).unwrap().shared()
    }

    fn config() -> AccountConfig {
        AccountConfig::from_json_str(
            r#"{
                "chain_id": 84532,
                "factory": "0x00000bb19a3579F4D779215dEf97AFbd0e30DB55",
                "implementation": "0x000000004F43C49e93C970E84001853a70923B03",
                "k1_validator": "0x00000004171351c442B202678c48D8AB5B321E8f",
                "attesters": ["0x000000333034E9f539ce08819E12c1b8Cb29084d"],
                "attester_threshold": 1
            }"#,
        )
        .unwrap()
    }

    fn session_contracts() -> SessionContracts {
        SessionContracts {
            smart_sessions: Address::repeat_byte(0x50),
            ownable_validator: Address::repeat_byte(0x51),
            sudo_policy: Address::repeat_byte(0x52),
            time_frame_policy: Address::repeat_byte(0x53),
            universal_action_policy: Address::repeat_byte(0x54),
        }
    }

    fn k1_manager() -> ModuleManager {
        ModuleManager::new(K1Validator::new(K1_VALIDATOR, signer(KEY_0)))
    }

    struct CountingSigner {
        inner: LocalSigner,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AccountSigner for CountingSigner {
        fn address(&self) -> Address {
            self.inner.address()
        }

        async fn sign_hash(&self, hash: B256) -> crate::errors::Result<[u8; 65]> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.sign_hash(hash).await
        }
    }

    #[tokio::test]
    async fn test_k1_user_op_signature_is_personal_sign_over_hash() {
        let owner = signer(KEY_0);
        let module = K1Validator::new(K1_VALIDATOR, owner.clone());
        let hash = keccak256(b"user-op");
        let sig = module.sign_user_op_hash(hash).await.unwrap();
        assert_eq!(sig.len(), 65);
        assert_eq!(recover_address(personal_message_hash(hash.as_slice()), &sig), Ok(owner.address()));
        assert_eq!(module.init_data().to_vec(), owner.address().to_vec());
    }

    #[test]
    fn test_ownable_rejects_bad_owner_sets() {
        let a = signer(KEY_0);
        let b = signer(KEY_1);
        let v = Address::repeat_byte(0x0f);

        let dup = OwnableValidator::new(v, 1, vec![a.address(), a.address()], vec![a.clone()]);
        assert!(matches!(dup, Err(ConfigError::DuplicateOwner(_))));

        let zero = OwnableValidator::new(v, 0, vec![a.address()], vec![a.clone()]);
        assert_eq!(zero.err(), Some(ConfigError::InvalidThreshold { threshold: 0, owners: 1 }));

        let high = OwnableValidator::new(v, 3, vec![a.address(), b.address()], vec![a.clone(), b.clone()]);
        assert_eq!(high.err(), Some(ConfigError::InvalidThreshold { threshold: 3, owners: 2 }));

        let stranger = OwnableValidator::new(v, 1, vec![a.address()], vec![b.clone()]);
        assert_eq!(stranger.err(), Some(ConfigError::MissingOwner(b.address())));

        let short = OwnableValidator::new(v, 2, vec![a.address(), b.address()], vec![a]);
        assert_eq!(short.err(), Some(ConfigError::InvalidThreshold { threshold: 2, owners: 1 }));
    }

    #[tokio::test]
    async fn test_ownable_signatures_sorted_by_signer() {
        let a = signer(KEY_0);
        let b = signer(KEY_1);
        let module = OwnableValidator::new(
            Address::repeat_byte(0x0f),
            2,
            vec![a.address(), b.address()],
            vec![a.clone(), b.clone()],
        )
        .unwrap();

        let (owners, threshold) = (module.owners().to_vec(), module.threshold());
        let (t, decoded): (U256, Vec<Address>) =
            <(U256, Vec<Address>)>::abi_decode_params(&module.init_data(), true).unwrap();
        assert_eq!(t, U256::from(threshold));
        assert_eq!(decoded, owners);
        assert!(decoded.windows(2).all(|w| w[0] < w[1]));

        let hash = keccak256(b"multi");
        let sig = module.sign_user_op_hash(hash).await.unwrap();
        assert_eq!(sig.len(), 130);
        let digest = personal_message_hash(hash.as_slice());
        let first = recover_address(digest, &sig[..65]).unwrap();
        let second = recover_address(digest, &sig[65..]).unwrap();
        assert!(first < second);
        assert_eq!(module.dummy_signature().unwrap().len(), 130);
    }

    #[tokio::test]
    async fn test_ownable_signs_with_threshold_signers_only() {
        let a = signer(KEY_0);
        let b = signer(KEY_1);
        let module = OwnableValidator::new(
            Address::repeat_byte(0x0f),
            1,
            vec![a.address(), b.address()],
            vec![a.clone(), b.clone()],
        )
        .unwrap();

        let hash = keccak256(b"single");
        let sig = module.sign_user_op_hash(hash).await.unwrap();
        assert_eq!(sig.len(), module.dummy_signature().unwrap().len());
        assert_eq!(module.sign_hash(hash).await.unwrap().len(), 65);
        let lowest = a.address().min(b.address());
        assert_eq!(recover_address(personal_message_hash(hash.as_slice()), &sig), Ok(lowest));
    }

    #[tokio::test]
    async fn test_session_enable_without_data_fails_before_signing() {
        let counting = Arc::new(CountingSigner { inner: LocalSigner::from_hex(KEY_1).unwrap(), calls: AtomicUsize::new(0) });
        let module = SmartSessionValidator::new(
            session_contracts().smart_sessions,
            counting.clone(),
            B256::repeat_byte(0x01),
            SmartSessionMode::Enable,
            None,
            PayloadEncoding::Raw,
        );
        let err = module.sign_user_op_hash(keccak256(b"op")).await.unwrap_err();
        assert!(matches!(err, AccountError::Config(ConfigError::MissingEnableData)));
        assert!(module.dummy_signature().is_err());
        assert_eq!(counting.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_session_use_signature_frames_session_key_sig() {
        let key = signer(KEY_1);
        let request = SessionRequest { session_public_key: key.address(), actions: vec![], salt: B256::ZERO };
        let session = build_session(&request, &session_contracts()).unwrap();
        let id = permission_id(&session);
        let module = SmartSessionValidator::for_use(session_contracts().smart_sessions, key.clone(), id);

        let hash = keccak256(b"session-op");
        let framed = module.sign_user_op_hash(hash).await.unwrap();
        let parsed = decode_session_signature(&framed, PayloadEncoding::Raw).unwrap();
        assert_eq!(parsed.mode, SmartSessionMode::Use);
        assert_eq!(parsed.permission_id, id);
        assert!(parsed.enable.is_none());
        assert_eq!(recover_address(personal_message_hash(hash.as_slice()), &parsed.signature), Ok(key.address()));
    }

    #[tokio::test]
    async fn test_enable_session_signed_by_owner_with_validator_prefix() {
        let owner = K1Validator::new(K1_VALIDATOR, signer(KEY_0));
        let request =
            SessionRequest { session_public_key: signer(KEY_1).address(), actions: vec![], salt: B256::ZERO };
        let session = build_session(&request, &session_contracts()).unwrap();
        let chains = [
            SessionChainContext { chain_id: 84532, account: Address::repeat_byte(0x77), nonce: U256::ZERO },
            SessionChainContext { chain_id: 11155111, account: Address::repeat_byte(0x77), nonce: U256::from(2u8) },
        ];

        let enable = prepare_enable_session(
            &owner,
            session.clone(),
            session_contracts().smart_sessions,
            SmartSessionMode::Enable,
            &chains,
            1,
        )
        .await
        .unwrap();

        assert_eq!(enable.chainDigestIndex, 1);
        assert_eq!(enable.hashesAndChainIds.len(), 2);
        assert_eq!(enable.sessionToEnable, session);
        let sig = &enable.permissionEnableSig;
        assert_eq!(&sig[..20], K1_VALIDATOR.as_slice());
        let digest = multichain_digest(&enable.hashesAndChainIds);
        assert_eq!(recover_address(personal_message_hash(digest.as_slice()), &sig[20..]), Ok(owner.owner()));

        let bad_index = prepare_enable_session(
            &owner,
            session,
            session_contracts().smart_sessions,
            SmartSessionMode::Enable,
            &chains,
            2,
        )
        .await;
        assert!(matches!(bad_index, Err(AccountError::Config(ConfigError::InvalidConfig(_)))));
    }

    #[tokio::test]
    async fn test_nonce_failure_defaults_to_zero() {
        let chain = MockChain::new();
        let modules = k1_manager();
        let mut account = NexusAccount::new(config(), signer(KEY_0).address(), U256::ZERO).unwrap();
        let sender = account.address();

        let key = NonceKey::new(ValidationMode::Default, K1_VALIDATOR).encode();
        chain.set_nonce(sender, key, U256::from(9u8));
        assert_eq!(account.get_nonce(&chain, &modules, &NonceOptions::default()).await, U256::from(9u8));

        chain.fail_nonce_reads();
        assert_eq!(account.get_nonce(&chain, &modules, &NonceOptions::default()).await, U256::ZERO);
    }

    #[tokio::test]
    async fn test_nonce_key_override_reaches_entry_point() {
        let chain = MockChain::new();
        let modules = k1_manager();
        let mut account = NexusAccount::new(config(), signer(KEY_0).address(), U256::ZERO).unwrap();
        let sender = account.address();
        let custom = U192::from(0xbeefu64);
        chain.set_nonce(sender, custom, U256::from(3u8));
        let opts = NonceOptions { key: Some(custom), mode: None };
        assert_eq!(account.get_nonce(&chain, &modules, &opts).await, U256::from(3u8));
    }

    #[tokio::test]
    async fn test_only_positive_deployment_is_cached() {
        let chain = MockChain::new();
        let mut account = NexusAccount::new(config(), signer(KEY_0).address(), U256::ZERO).unwrap();
        let addr = account.address();

        assert!(!account.is_deployed(&chain).await.unwrap());
        assert!(!account.is_deployed(&chain).await.unwrap());
        assert_eq!(chain.code_queries(), 2);

        chain.set_code(addr, Bytes::from(vec![0x60, 0x00]));
        assert!(account.is_deployed(&chain).await.unwrap());
        assert!(account.is_deployed(&chain).await.unwrap());
        assert_eq!(chain.code_queries(), 3);
    }

    #[tokio::test]
    async fn test_sign_message_wraps_until_deployed() {
        let chain = MockChain::new();
        let modules = k1_manager();
        let owner = signer(KEY_0);
        let mut account = NexusAccount::new(config(), owner.address(), U256::ZERO).unwrap();

        let undeployed = account.sign_message(&chain, &modules, b"hello").await.unwrap();
        let (factory, factory_data, inner) = unwrap_erc6492(&undeployed).unwrap();
        assert_eq!(factory, config().factory);
        assert_eq!(factory_data, account.identity().factory_data());
        assert_eq!(&inner[..20], K1_VALIDATOR.as_slice());
        assert_eq!(recover_address(personal_message_hash(b"hello"), &inner[20..]), Ok(owner.address()));

        chain.set_code(account.address(), Bytes::from(vec![0x60]));
        let deployed = account.sign_message(&chain, &modules, b"hello").await.unwrap();
        assert_eq!(deployed, inner);
        assert!(unwrap_erc6492(&deployed).is_err());
    }

    #[tokio::test]
    async fn test_typed_data_signature_recovers_through_nested_hash() {
        let chain = MockChain::new();
        let modules = k1_manager();
        let owner = signer(KEY_0);
        let mut account = NexusAccount::new(config(), owner.address(), U256::ZERO).unwrap();
        chain.set_code(account.address(), Bytes::from(vec![0x60]));

        let typed = TypedData::from_json(crate::typed_data::eip712::tests::MAIL_JSON).unwrap();
        let sig = account.sign_typed_data(&chain, &modules, &typed).await.unwrap();
        assert_eq!(&sig[..20], K1_VALIDATOR.as_slice());

        let (inner, app, contents, ty) = erc7739::decode_nested_signature(&sig[20..]).unwrap();
        assert_eq!(app, typed.domain_separator().unwrap());
        assert_eq!(contents, typed.hash_struct().unwrap());
        assert_eq!(ty, typed.encode_type().unwrap());

        let nested = erc7739::NestedContents::from_typed_data(&typed).unwrap();
        let address = account.address();
        let domain = account.config().account_domain(address);
        let digest = erc7739::typed_data_sign_hash(&nested, &domain);
        assert_eq!(recover_address(digest, &inner), Ok(owner.address()));
    }

    #[tokio::test]
    async fn test_installed_validators_and_previous_pointer() {
        let chain = MockChain::new();
        let account = Address::repeat_byte(0xac);
        let first = Address::repeat_byte(0x01);
        let second = Address::repeat_byte(0x02);
        let page = (vec![first, second], SENTINEL_ADDRESS).abi_encode_params();
        chain.set_call_response(account, INexus::getValidatorsPaginatedCall::SELECTOR, page.into());

        let list = installed_modules(&chain, account, ModuleType::Validator).await.unwrap();
        assert_eq!(list, vec![first, second]);
        assert_eq!(previous_installed(&chain, account, ModuleType::Validator, first).await.unwrap(), SENTINEL_ADDRESS);
        assert_eq!(previous_installed(&chain, account, ModuleType::Validator, second).await.unwrap(), first);
        assert!(matches!(
            previous_installed(&chain, account, ModuleType::Validator, Address::repeat_byte(0x03)).await,
            Err(AccountError::ModuleNotInstalled(_))
        ));
        assert!(installed_modules(&chain, account, ModuleType::Hook).await.is_err());
    }

    fn validator_page_request(cursor: Address) -> Bytes {
        INexus::getValidatorsPaginatedCall { cursor, size: U256::from(MODULE_PAGE_SIZE) }.abi_encode().into()
    }

    #[tokio::test]
    async fn test_installed_validators_follow_cursor_across_pages() {
        let chain = MockChain::new();
        let account = Address::repeat_byte(0xac);
        let (a, b, c) = (Address::repeat_byte(0x01), Address::repeat_byte(0x02), Address::repeat_byte(0x03));
        chain.set_call_data_response(
            account,
            validator_page_request(SENTINEL_ADDRESS),
            (vec![a, b], b).abi_encode_params().into(),
        );
        chain.set_call_data_response(account, validator_page_request(b), (vec![c], SENTINEL_ADDRESS).abi_encode_params().into());

        assert_eq!(installed_modules(&chain, account, ModuleType::Validator).await.unwrap(), vec![a, b, c]);
        assert_eq!(previous_installed(&chain, account, ModuleType::Validator, c).await.unwrap(), b);
    }

    #[tokio::test]
    async fn test_installed_validators_reject_cycling_cursor() {
        let chain = MockChain::new();
        let account = Address::repeat_byte(0xac);
        let a = Address::repeat_byte(0x01);
        let looping = (vec![a], a).abi_encode_params();
        chain.set_call_response(account, INexus::getValidatorsPaginatedCall::SELECTOR, looping.into());
        assert!(matches!(
            installed_modules(&chain, account, ModuleType::Validator).await,
            Err(AccountError::InvalidModuleList(_))
        ));

        let stalled = Address::repeat_byte(0x02);
        chain.set_call_data_response(
            account,
            validator_page_request(SENTINEL_ADDRESS),
            (vec![a], stalled).abi_encode_params().into(),
        );
        chain.set_call_data_response(
            account,
            validator_page_request(stalled),
            (Vec::<Address>::new(), stalled).abi_encode_params().into(),
        );
        assert!(installed_modules(&chain, account, ModuleType::Validator).await.is_ok());

        chain.set_call_data_response(
            account,
            validator_page_request(stalled),
            (vec![Address::repeat_byte(0x03)], stalled).abi_encode_params().into(),
        );
        assert!(matches!(
            installed_modules(&chain, account, ModuleType::Validator).await,
            Err(AccountError::InvalidModuleList(_))
        ));
    }

    #[tokio::test]
    async fn test_select_mode_follows_onchain_permission() {
        let chain = MockChain::new();
        let smart_sessions = session_contracts().smart_sessions;
        let account = Address::repeat_byte(0xac);
        let id = B256::repeat_byte(0x0e);

        chain.set_call_response(smart_sessions, ISmartSession::isPermissionEnabledCall::SELECTOR, false.abi_encode().into());
        assert!(!is_permission_enabled(&chain, smart_sessions, id, account).await.unwrap());
        assert_eq!(select_mode(&chain, smart_sessions, id, account).await.unwrap(), SmartSessionMode::Enable);

        chain.set_call_response(smart_sessions, ISmartSession::isPermissionEnabledCall::SELECTOR, true.abi_encode().into());
        assert_eq!(select_mode(&chain, smart_sessions, id, account).await.unwrap(), SmartSessionMode::Use);

        chain.set_call_response(smart_sessions, ISmartSession::getNonceCall::SELECTOR, U256::from(4u8).abi_encode().into());
        assert_eq!(session_nonce(&chain, smart_sessions, id, account).await.unwrap(), U256::from(4u8));
    }

    #[test]
    fn test_active_module_switch_changes_nonce_key() {
        let mut modules = k1_manager();
        let session = SmartSessionValidator::for_use(session_contracts().smart_sessions, signer(KEY_1), B256::ZERO);
        let before = NonceOptions::default().resolve_key(modules.active().address());
        let previous = modules.set_active(session);
        assert_eq!(previous.address(), K1_VALIDATOR);
        let after = NonceOptions::default().resolve_key(modules.active().address());
        assert_ne!(before, after);
        assert_eq!(NonceKey::decode(after).unwrap().module, session_contracts().smart_sessions);
    }
}
