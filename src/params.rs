//! Define [`Params`] to pass to a backend when opening a session

/// Connection parameters for an administrative session
///
/// Every field is optional; unset fields are left to the backend defaults.
///
/// ```
/// use kadmin_session::Params;
///
/// let params = Params::new()
///     .realm("EXAMPLE.ORG")
///     .admin_server("kdc.example.org")
///     .kadmind_port(749);
/// assert_eq!(params.get_realm(), Some("EXAMPLE.ORG"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Params {
    realm: Option<String>,
    admin_server: Option<String>,
    kadmind_port: Option<u16>,
    kpasswd_port: Option<u16>,
}

impl Params {
    /// Create new [`Params`] with every field unset
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default realm database
    pub fn realm(mut self, realm: &str) -> Self {
        self.realm = Some(realm.to_owned());
        self
    }

    /// Set the admin server hostname
    pub fn admin_server(mut self, admin_server: &str) -> Self {
        self.admin_server = Some(admin_server.to_owned());
        self
    }

    /// Set the kadmind port to connect to
    pub fn kadmind_port(mut self, port: u16) -> Self {
        self.kadmind_port = Some(port);
        self
    }

    /// Set the kpasswd port to connect to
    pub fn kpasswd_port(mut self, port: u16) -> Self {
        self.kpasswd_port = Some(port);
        self
    }

    /// Configured realm
    pub fn get_realm(&self) -> Option<&str> {
        self.realm.as_deref()
    }

    /// Configured admin server
    pub fn get_admin_server(&self) -> Option<&str> {
        self.admin_server.as_deref()
    }

    /// Configured kadmind port
    pub fn get_kadmind_port(&self) -> Option<u16> {
        self.kadmind_port
    }

    /// Configured kpasswd port
    pub fn get_kpasswd_port(&self) -> Option<u16> {
        self.kpasswd_port
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_unset() {
        let params = Params::new();
        assert_eq!(params.get_realm(), None);
        assert_eq!(params.get_admin_server(), None);
        assert_eq!(params.get_kadmind_port(), None);
        assert_eq!(params.get_kpasswd_port(), None);
    }

    #[test]
    fn builder_sets_fields() {
        let params = Params::new()
            .realm("EXAMPLE.ORG")
            .admin_server("kdc.example.org")
            .kadmind_port(749)
            .kpasswd_port(464);
        assert_eq!(params.get_realm(), Some("EXAMPLE.ORG"));
        assert_eq!(params.get_admin_server(), Some("kdc.example.org"));
        assert_eq!(params.get_kadmind_port(), Some(749));
        assert_eq!(params.get_kpasswd_port(), Some(464));
    }
}
