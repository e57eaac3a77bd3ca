//! TLS certificate pair discovery.
//!
//! The dev server looks for `~/.ssh/<cert>.pem` and `~/.ssh/<cert>-key.pem`
//! (the layout produced by mkcert). A missing pair is not an error: the
//! server falls back to plaintext.

use std::path::{Path, PathBuf};

/// An on-disk certificate/key pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPair {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Look up the certificate pair for `cert_name` under `~/.ssh`.
pub fn certificate_pair(cert_name: &str) -> Option<TlsPair> {
    let ssh_dir = shellexpand::tilde("~/.ssh");
    pair_in(Path::new(ssh_dir.as_ref()), cert_name)
}

/// Look up a certificate pair in a specific directory.
/// Returns `None` unless both halves exist.
pub fn pair_in(dir: &Path, cert_name: &str) -> Option<TlsPair> {
    let cert = dir.join(format!("{cert_name}.pem"));
    let key = dir.join(format!("{cert_name}-key.pem"));

    (cert.exists() && key.exists()).then_some(TlsPair { cert, key })
}
