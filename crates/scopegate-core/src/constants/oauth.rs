// ABOUTME: OAuth 2.0 grant constants: grant type identifiers, token type, and lifetimes
// ABOUTME: Defaults mirror the values used by the configuration layer when env vars are unset
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Grant type identifier for the resource owner password credentials grant
pub const GRANT_TYPE_PASSWORD: &str = "password";

/// Grant type identifier for the refresh token grant
pub const GRANT_TYPE_REFRESH_TOKEN: &str = "refresh_token";

/// Token type returned in every token response
pub const TOKEN_TYPE_BEARER: &str = "Bearer";

/// Default access token lifetime for the password grant (seconds)
pub const DEFAULT_PASSWORD_ACCESS_TOKEN_TTL_SECS: u64 = 7600;

/// Default access token lifetime for tokens issued by the refresh grant (seconds)
pub const DEFAULT_REFRESH_ACCESS_TOKEN_TTL_SECS: u64 = 7600;

/// Default refresh token lifetime (seconds)
pub const DEFAULT_REFRESH_TOKEN_TTL_SECS: u64 = 14600;

/// Default delimiter between scope ids in a request
pub const DEFAULT_SCOPE_DELIMITER: &str = ",";

/// Random bytes per token id (256 bits, 43 chars in URL-safe base64)
pub const TOKEN_ID_BYTES: usize = 32;

/// Random bytes per password reset token
pub const PASSWORD_RESET_TOKEN_BYTES: usize = 72;

/// Session owner type for user-owned sessions
pub const OWNER_TYPE_USER: &str = "user";

/// Session owner type for client-owned sessions
pub const OWNER_TYPE_CLIENT: &str = "client";

/// RFC 6749 section covering token endpoint errors
pub const RFC6749_TOKEN_ERROR_URI: &str = "https://datatracker.ietf.org/doc/html/rfc6749#section-5.2";

/// RFC 6750 section covering bearer token errors
pub const RFC6750_BEARER_ERROR_URI: &str =
    "https://datatracker.ietf.org/doc/html/rfc6750#section-3.1";
