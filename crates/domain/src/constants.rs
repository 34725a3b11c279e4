//! Protocol constants
//!
//! Centralized location for wire-level names and defaults shared by the
//! cache, broker, challenge and telemetry components.

// Token cache key layout
pub const CACHE_KEY_DELIMITER: char = '$';
pub const CACHE_KEY_MRRT_FLAG_YES: &str = "y";
pub const CACHE_KEY_MRRT_FLAG_NO: &str = "n";
pub const FAMILY_CLIENT_ID_PREFIX: &str = "foci-";

// Token lifetime defaults
pub const DEFAULT_EXPIRY_BUFFER_SECS: u64 = 300;
pub const DEFAULT_BROKER_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_BROKER_EXPIRY_SECS: u64 = 3600;
/// Upper bound accepted for `expiry_buffer_secs` (one day)
pub const MAX_EXPIRY_BUFFER_SECS: u64 = 86_400;
/// Upper bound accepted for `broker.default_expiry_secs` (one year)
pub const MAX_BROKER_EXPIRY_SECS: u64 = 31_536_000;
/// Upper bound accepted for `broker.timeout_secs`
pub const MAX_BROKER_TIMEOUT_SECS: u64 = 3600;
pub const DEFAULT_TOKEN_TYPE: &str = "Bearer";

// Broker account service
pub const BROKER_ACCOUNT_TYPE: &str = "com.microsoft.workaccount";
pub const BROKER_PROTOCOL_VERSION: &str = "v2";
pub const AUTHENTICATOR_APP_PACKAGE: &str = "com.azure.authenticator";
pub const AUTHENTICATOR_APP_SIGNATURE: &str = "ho040S3ffZkmxqtQrSwpTVOn9r0=";
pub const COMPANY_PORTAL_APP_PACKAGE: &str = "com.microsoft.windowsintune.companyportal";
pub const COMPANY_PORTAL_APP_SIGNATURE: &str = "1L4Z9FBCgmz9ldBdwU/e2G+B9I4=";
pub const PERMISSION_GET_ACCOUNTS: &str = "android.permission.GET_ACCOUNTS";
pub const PERMISSION_MANAGE_ACCOUNTS: &str = "android.permission.MANAGE_ACCOUNTS";
pub const PERMISSION_USE_CREDENTIALS: &str = "android.permission.USE_CREDENTIALS";
pub const BROKER_REQUIRED_PERMISSIONS: [&str; 3] =
    [PERMISSION_GET_ACCOUNTS, PERMISSION_MANAGE_ACCOUNTS, PERMISSION_USE_CREDENTIALS];

// Broker request bundle keys
pub const BROKER_KEY_AUTHORITY: &str = "account.authority";
pub const BROKER_KEY_RESOURCE: &str = "account.resource";
pub const BROKER_KEY_CLIENT_ID: &str = "account.clientid.key";
pub const BROKER_KEY_REDIRECT: &str = "account.redirect";
pub const BROKER_KEY_PROTOCOL_VERSION: &str = "broker.protocol.version.name";
pub const BROKER_KEY_EXTRA_QUERY_PARAM: &str = "account.extra.query.param";
pub const BROKER_KEY_CORRELATION_ID: &str = "account.correlationid";
pub const BROKER_KEY_LOGIN_HINT: &str = "account.login.hint";
pub const BROKER_KEY_PROMPT: &str = "account.prompt";
pub const BROKER_KEY_ACCOUNT_NAME: &str = "account.name";
pub const BROKER_KEY_CLAIMS: &str = "account.claims";
pub const BROKER_KEY_CAPABILITIES: &str = "account.capabilities";

// Broker result bundle keys
pub const BROKER_RESULT_AUTHTOKEN: &str = "authtoken";
pub const BROKER_RESULT_ERROR_CODE: &str = "errorCode";
pub const BROKER_RESULT_ERROR_MESSAGE: &str = "errorMessage";
pub const BROKER_RESULT_EXPIRES: &str = "account.expiredate";
pub const BROKER_RESULT_ID_TOKEN: &str = "account.idtoken";
pub const BROKER_RESULT_USERINFO_USERID: &str = "account.userinfo.userid";
pub const BROKER_RESULT_USERINFO_DISPLAYABLE: &str = "account.userinfo.userid.displayable";
pub const BROKER_RESULT_USERINFO_GIVEN_NAME: &str = "account.userinfo.given.name";
pub const BROKER_RESULT_USERINFO_FAMILY_NAME: &str = "account.userinfo.family.name";
pub const BROKER_RESULT_USERINFO_IDENTITY_PROVIDER: &str = "account.userinfo.identity.provider";
pub const BROKER_RESULT_USERINFO_TENANT_ID: &str = "account.userinfo.tenantid";
pub const BROKER_RESULT_INITIAL_REQUEST: &str = "account.initial.request";
pub const BROKER_RESULT_INTENT: &str = "intent";

// Account service provider error codes
pub const BROKER_ERROR_CODE_UNSUPPORTED_OPERATION: i32 = 6;
pub const BROKER_ERROR_CODE_BAD_ARGUMENTS: i32 = 7;
pub const BROKER_ERROR_CODE_BAD_AUTHENTICATION: i32 = 9;

// Device-certificate challenge
pub const PKEYAUTH_CHALLENGE_TYPE: &str = "PKeyAuth";
pub const PKEYAUTH_REDIRECT_PREFIX: &str = "urn:http-auth:PKeyAuth";
pub const PKEYAUTH_HEADER: &str = "x-ms-PKeyAuth";
pub const PKEYAUTH_HEADER_VERSION: &str = "1.0";
pub const WWW_AUTHENTICATE_HEADER: &str = "WWW-Authenticate";

// Server diagnostics
pub const CLIENT_TELEMETRY_HEADER: &str = "x-ms-clitelem";
pub const CLIENT_TELEMETRY_VERSION: &str = "1";
