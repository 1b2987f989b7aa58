//! Constants mirrored from the EntryPoint, Nexus and Smart Sessions contracts.

use alloy_primitives::{address, b256, hex, Address, B256};

/// Canonical ERC-4337 v0.7 EntryPoint.
pub const ENTRY_POINT_V07: Address = address!("0000000071727De22E5E9d8BAf0edAc6f37da032");

/// Head of the on-chain module linked lists (validators / executors).
pub const SENTINEL_ADDRESS: Address = address!("0000000000000000000000000000000000000001");

/// ERC-6492 detection suffix.
pub const ERC6492_MAGIC: B256 =
    b256!("6492649264926492649264926492649264926492649264926492649264926492");

/// ERC-1271 `isValidSignature` success value.
pub const ERC1271_MAGIC_VALUE: [u8; 4] = [0x16, 0x26, 0xba, 0x7e];

/// Universal action policy holds a fixed `ParamRule[16]`.
pub const MAX_PARAM_RULES: usize = 16;

/// Page size for `get{Validators,Executors}Paginated` scans.
pub const MODULE_PAGE_SIZE: u64 = 100;

/// Upper bound on pages read from one installed-module list.
pub const MAX_MODULE_PAGES: usize = 64;

/// ERC-1967 minimal proxy creation prefix (before the implementation address).
pub const ERC1967_CREATION_PREFIX: [u8; 9] = hex!("603d3d8160223d3973");

/// Creation code between the implementation address and the runtime code.
pub const ERC1967_CREATION_SUFFIX: [u8; 5] = hex!("60095155f3");

/// ERC-1967 minimal proxy runtime code (61 bytes).
pub const ERC1967_RUNTIME: [u8; 61] = hex!(
    "363d3d373d3d363d7f360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc545af43d6000803e6038573d6000fd5b3d6000f3"
);

/// Account EIP-712 domain defaults.
pub const ACCOUNT_DOMAIN_NAME: &str = "Nexus";
pub const ACCOUNT_DOMAIN_VERSION: &str = "1.0.1";

/// 65-byte ECDSA placeholder with a valid `v`, used for gas estimation.
///
/// `r = 0xff..f0 || 0x00..`, `s = 0x7aaa..`, `v = 0x1c`.
pub fn dummy_ecdsa_signature() -> [u8; 65] {
    let mut sig = [0u8; 65];
    sig[..15].fill(0xff);
    sig[15] = 0xf0;
    sig[32] = 0x7a;
    sig[33..64].fill(0xaa);
    sig[64] = 0x1c;
    sig
}
