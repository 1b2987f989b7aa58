//! Solidity ABI shapes for the account, factory, EntryPoint and Smart Sessions contracts.
//!
//! Struct layouts must match the deployed contracts byte for byte: the engine ABI-encodes
//! them into call data, signatures and policy init data.

use alloy_sol_types::sol;

sol! {
    /// ERC-7579 batch entry.
    #[derive(Debug, Default, PartialEq, Eq)]
    struct Execution {
        address target;
        uint256 value;
        bytes callData;
    }

    #[derive(Debug, PartialEq, Eq)]
    interface INexus {
        function execute(bytes32 mode, bytes executionCalldata) external payable;
        function installModule(uint256 moduleTypeId, address module, bytes initData) external payable;
        function uninstallModule(uint256 moduleTypeId, address module, bytes deInitData) external payable;
        function isModuleInstalled(uint256 moduleTypeId, address module, bytes additionalContext)
            external
            view
            returns (bool);
        function getValidatorsPaginated(address cursor, uint256 size)
            external
            view
            returns (address[] array, address next);
        function getExecutorsPaginated(address cursor, uint256 size)
            external
            view
            returns (address[] array, address next);
        function isValidSignature(bytes32 hash, bytes signature) external view returns (bytes4);
    }

    #[derive(Debug, PartialEq, Eq)]
    interface IK1ValidatorFactory {
        function createAccount(address eoaOwner, uint256 index, address[] attesters, uint8 threshold)
            external
            payable
            returns (address);
        function computeAccountAddress(address eoaOwner, uint256 index, address[] attesters, uint8 threshold)
            external
            view
            returns (address);
    }

    #[derive(Debug, PartialEq, Eq)]
    interface IEntryPoint {
        function getNonce(address sender, uint192 key) external view returns (uint256 nonce);
        function getSenderAddress(bytes initCode) external;

        error SenderAddressResult(address sender);
        error FailedOp(uint256 opIndex, string reason);
    }

    #[derive(Debug, PartialEq, Eq)]
    interface ISmartSession {
        function getNonce(bytes32 permissionId, address account) external view returns (uint256);
        function isPermissionEnabled(bytes32 permissionId, address account) external view returns (bool);
    }

    /// Smart Sessions policy reference.
    #[derive(Debug, Default, PartialEq, Eq)]
    struct PolicyData {
        address policy;
        bytes initData;
    }

    #[derive(Debug, Default, PartialEq, Eq)]
    struct ActionData {
        bytes4 actionTargetSelector;
        address actionTarget;
        PolicyData[] actionPolicies;
    }

    #[derive(Debug, Default, PartialEq, Eq)]
    struct ERC7739Data {
        string[] allowedERC7739Content;
        PolicyData[] erc1271Policies;
    }

    /// Delegated permission set.
    #[derive(Debug, Default, PartialEq, Eq)]
    struct Session {
        address sessionValidator;
        bytes sessionValidatorInitData;
        bytes32 salt;
        PolicyData[] userOpPolicies;
        ERC7739Data erc7739Policies;
        ActionData[] actions;
    }

    #[derive(Debug, Default, PartialEq, Eq)]
    struct ChainDigest {
        uint64 chainId;
        bytes32 sessionDigest;
    }

    #[derive(Debug, Default, PartialEq, Eq)]
    struct EnableSession {
        uint8 chainDigestIndex;
        ChainDigest[] hashesAndChainIds;
        Session sessionToEnable;
        bytes permissionEnableSig;
    }

    /// Universal action policy configuration (`condition` is the `ParamCondition` enum).
    #[derive(Debug, Default, PartialEq, Eq)]
    struct LimitUsage {
        uint256 limit;
        uint256 used;
    }

    #[derive(Debug, Default, PartialEq, Eq)]
    struct ParamRule {
        uint8 condition;
        uint64 offset;
        bool isLimited;
        bytes32 refValue;
        LimitUsage usage;
    }

    #[derive(Debug, Default, PartialEq, Eq)]
    struct ParamRules {
        uint256 length;
        ParamRule[16] rules;
    }

    #[derive(Debug, Default, PartialEq, Eq)]
    struct ActionConfig {
        uint256 valueLimitPerUse;
        ParamRules paramRules;
    }
}
