use std::sync::Arc;
use std::time::Duration;

use hyper::client::HttpConnector;
use hyper::{Body, Client};
use hyper_rustls::HttpsConnector;
use rustls::{ClientConfig, OwnedTrustAnchor, RootCertStore};
use webpki_roots::TLS_SERVER_ROOTS;

pub(crate) type HyperClient = Client<HttpsConnector<HttpConnector>, Body>;

const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// Builds a pooled client that speaks HTTPS (webpki roots) and plain HTTP,
/// the latter for self-hosted OpenAI-compatible gateways.
pub(crate) fn build_https_client(connect_timeout: Duration) -> HyperClient {
    let mut roots = RootCertStore::empty();
    roots.add_trust_anchors(TLS_SERVER_ROOTS.iter().map(|anchor| {
        OwnedTrustAnchor::from_subject_spki_name_constraints(
            anchor.subject,
            anchor.spki,
            anchor.name_constraints,
        )
    }));

    let tls = ClientConfig::builder()
        .with_safe_defaults()
        .with_root_certificates(roots)
        .with_no_client_auth();

    let mut http = HttpConnector::new();
    http.enforce_http(false);
    http.set_connect_timeout(Some(connect_timeout));

    let connector = HttpsConnector::from((http, Arc::new(tls)));

    Client::builder()
        .pool_idle_timeout(POOL_IDLE_TIMEOUT)
        .build::<_, Body>(connector)
}
