//! NTLM message construction for the LDAP SASL bind path.
//!
//! `ldap3`'s `sasl_bind` expects raw mechanism bytes for each round of the
//! challenge-response exchange; it has no NTLM support of its own. This
//! module builds the NEGOTIATE/AUTHENTICATE messages using `sspi` (the same
//! NTLM/Kerberos implementation used by the IronRDP client stack) and hands
//! the raw bytes to the caller, which drives the LDAP round trips.

use sspi::builders::EmptyInitializeSecurityContext;
use sspi::{
    AuthIdentity, ClientRequestFlags, CredentialUse, DataRepresentation, Ntlm,
    SecurityBuffer, SecurityBufferType, SecurityStatus, Sspi, SspiImpl, Username,
};

use crate::error::{ScanError, Result};

/// Formats `username` as `DOMAIN\user` regardless of the input form
/// (`DOMAIN\user` or `user@domain.tld`), per SPEC_FULL.md §6.
pub fn format_domain_user(username: &str, fallback_domain: &str) -> String {
    if let Some((domain, user)) = username.split_once('\\') {
        return format!("{domain}\\{user}");
    }
    if let Some((user, domain)) = username.split_once('@') {
        let short_domain = domain.split('.').next().unwrap_or(domain).to_uppercase();
        return format!("{short_domain}\\{user}");
    }
    let short_domain = fallback_domain
        .split('.')
        .next()
        .unwrap_or(fallback_domain)
        .to_uppercase();
    format!("{short_domain}\\{username}")
}

/// Drives one NTLM handshake to produce the NEGOTIATE message (leg 1) and,
/// given the server's CHALLENGE bytes, the AUTHENTICATE message (leg 3).
pub struct NtlmHandshake {
    context: Ntlm,
    credentials_handle: <Ntlm as SspiImpl>::CredentialsHandle,
}

impl NtlmHandshake {
    pub fn new(domain_user: &str, password: &str) -> Result<Self> {
        let (domain, username) = domain_user
            .split_once('\\')
            .ok_or_else(|| ScanError::Config(format!("expected DOMAIN\\user, got {domain_user}")))?;

        let identity = AuthIdentity {
            username: Username::parse(username, Some(domain))
                .map_err(|e| ScanError::Config(e.to_string()))?,
            password: password.to_owned().into(),
        };

        let mut context = Ntlm::new();
        let credentials_handle = context
            .acquire_credentials_handle()
            .with_credential_use(CredentialUse::Outbound)
            .with_auth_data(&identity)
            .execute(&mut context)
            .map_err(|e| ScanError::DirectoryBind(e.to_string()))?
            .credentials_handle;

        Ok(Self {
            context,
            credentials_handle,
        })
    }

    /// Produces the initial NEGOTIATE token, bound to the credentials
    /// acquired in `new()` so the message actually carries the caller's
    /// domain/username/password rather than an anonymous context.
    pub fn negotiate(&mut self) -> Result<Vec<u8>> {
        let mut output = vec![SecurityBuffer::new(Vec::new(), SecurityBufferType::Token)];
        let mut credentials_handle = Some(self.credentials_handle.clone());
        let builder = EmptyInitializeSecurityContext::<<Ntlm as SspiImpl>::CredentialsHandle>::new()
            .with_credentials_handle(&mut credentials_handle)
            .with_context_requirements(ClientRequestFlags::empty())
            .with_target_data_representation(DataRepresentation::Native)
            .with_target_name("")
            .with_output(&mut output);

        let result = self
            .context
            .initialize_security_context_impl(builder)
            .map_err(|e| ScanError::DirectoryBind(e.to_string()))?;

        if result.status != SecurityStatus::ContinueNeeded {
            return Err(ScanError::DirectoryBind(
                "unexpected status producing NTLM negotiate message".into(),
            ));
        }
        Ok(output.remove(0).buffer)
    }

    /// Consumes the server's CHALLENGE bytes and produces the AUTHENTICATE
    /// token that completes the handshake, bound to the same credentials.
    pub fn authenticate(&mut self, challenge: &[u8]) -> Result<Vec<u8>> {
        let mut input = vec![SecurityBuffer::new(challenge.to_vec(), SecurityBufferType::Token)];
        let mut output = vec![SecurityBuffer::new(Vec::new(), SecurityBufferType::Token)];
        let mut credentials_handle = Some(self.credentials_handle.clone());

        let builder = EmptyInitializeSecurityContext::<<Ntlm as SspiImpl>::CredentialsHandle>::new()
            .with_credentials_handle(&mut credentials_handle)
            .with_context_requirements(ClientRequestFlags::empty())
            .with_target_data_representation(DataRepresentation::Native)
            .with_target_name("")
            .with_input(&mut input)
            .with_output(&mut output);

        let result = self
            .context
            .initialize_security_context_impl(builder)
            .map_err(|e| ScanError::DirectoryBind(e.to_string()))?;

        if result.status != SecurityStatus::Ok {
            return Err(ScanError::DirectoryBind(
                "NTLM handshake did not complete".into(),
            ));
        }
        Ok(output.remove(0).buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_backslash_form_unchanged() {
        assert_eq!(format_domain_user("CORP\\alice", "corp.example.com"), "CORP\\alice");
    }

    #[test]
    fn formats_upn_form_into_domain_user() {
        assert_eq!(
            format_domain_user("alice@corp.example.com", "corp.example.com"),
            "CORP\\alice"
        );
    }

    #[test]
    fn formats_bare_username_using_fallback_domain() {
        assert_eq!(format_domain_user("alice", "corp.example.com"), "CORP\\alice");
    }
}
