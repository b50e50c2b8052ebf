//! Bitwarden identity request payloads.

use serde::Serialize;

/// Form body for `POST {identity}/connect/token`
///
/// Machine accounts use the client credentials grant scoped to `api.secrets`.
#[derive(Serialize)]
pub(super) struct TokenRequest<'a> {
    pub scope: &'static str,
    pub grant_type: &'static str,
    pub client_id: String,
    pub client_secret: &'a str,
}

impl<'a> TokenRequest<'a> {
    pub fn client_credentials(client_id: String, client_secret: &'a str) -> Self {
        Self {
            scope: "api.secrets",
            grant_type: "client_credentials",
            client_id,
            client_secret,
        }
    }
}
