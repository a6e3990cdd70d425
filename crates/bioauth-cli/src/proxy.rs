//! Client-side proxy for the `org.bioauth.Registry1` interface served by bioauthd.

use zbus::proxy;

#[proxy(
    interface = "org.bioauth.Registry1",
    default_service = "org.bioauth.Registry1",
    default_path = "/org/bioauth/Registry1"
)]
pub trait Registry {
    fn enroll(&self, name: &str, email: &str, descriptor: &[f64]) -> zbus::Result<String>;

    #[zbus(name = "Match")]
    fn match_descriptor(&self, descriptor: &[f64]) -> zbus::Result<String>;

    fn verify(&self, email: &str, descriptor: &[f64]) -> zbus::Result<String>;

    fn list_identities(&self) -> zbus::Result<String>;

    fn clear_all(&self) -> zbus::Result<u32>;

    fn status(&self) -> zbus::Result<String>;
}
