pub const LOCAL_API_URL: &str = "http://localhost:5050";
pub const SCHEMA_PATH: &str = "/getEIP712Types";

/// Appended to the action name when the server does not name the primary
/// type itself (`create` -> `createAccount`).
pub const DEFAULT_PRIMARY_TYPE_SUFFIX: &str = "Account";

pub const SEPOLIA_CHAIN_ID: u64 = 11155111;

// EIP-1193 provider error codes
pub(crate) const USER_REJECTED_REQUEST: i64 = 4001;
pub(crate) const UNAUTHORIZED: i64 = 4100;

pub(crate) const SIGNATURE_LEN: usize = 65;
