//! URL definitions for the share-work service.
//!
//! The service exposes plain HTTP pages, one AJAX endpoint, and two websocket
//! endpoints. [`Endpoints`] pairs the http/https and ws/wss schemes off a
//! single secure flag so page and socket URLs never disagree.

pub const HTTP: &str = "http://";
pub const HTTPS: &str = "https://";
pub const WS: &str = "ws://";
pub const WSS: &str = "wss://";

/// Local development host for the share-work service.
pub const LOCAL_HOST: &str = "localhost:8080";

pub const LOGIN_PATH: &str = "/login";
pub const REGISTER_PATH: &str = "/register";
pub const UPDATE_PATH: &str = "/update";
pub const DELETE_PATH: &str = "/delete";
pub const LOGOUT_PATH: &str = "/logout";
pub const HOME_PATH: &str = "/home";
pub const AJAX_PATH: &str = "/ajax";
pub const FILES_PATH: &str = "/admin/files/files";
pub const EDITOR_PATH: &str = "/admin/files/editor";
pub const ECHO_PATH: &str = "/user/chat/echo";
pub const DEMO_PATH: &str = "/public/demo";

/// Websocket endpoint for the echo chat service.
pub const ECHO_CONNECT_PATH: &str = "/echo_connect";
/// Websocket endpoint for the files transfer service.
pub const FILES_CONNECT_PATH: &str = "/files_connect";

/// URL builder for a share-work deployment.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Endpoints {
    host: String,
    secure: bool,
}

impl Endpoints {
    /// Creates endpoints for the given `host:port`.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into().trim_end_matches('/').to_string(),
            secure: false,
        }
    }

    /// Enables or disables https/wss scheme pairing.
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Returns the configured host.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Builds an http(s) URL for a service path.
    pub fn http_url(&self, path: &str) -> String {
        let scheme = if self.secure { HTTPS } else { HTTP };
        format!("{scheme}{}{path}", self.host)
    }

    /// Builds a ws(s) URL for a service path.
    pub fn ws_url(&self, path: &str) -> String {
        let scheme = if self.secure { WSS } else { WS };
        format!("{scheme}{}{path}", self.host)
    }

    pub fn login(&self) -> String {
        self.http_url(LOGIN_PATH)
    }

    pub fn logout(&self) -> String {
        self.http_url(LOGOUT_PATH)
    }

    pub fn home(&self) -> String {
        self.http_url(HOME_PATH)
    }

    pub fn files_page(&self) -> String {
        self.http_url(FILES_PATH)
    }

    pub fn editor_page(&self) -> String {
        self.http_url(EDITOR_PATH)
    }

    pub fn echo_page(&self) -> String {
        self.http_url(ECHO_PATH)
    }

    /// AJAX endpoint URL.
    pub fn ajax(&self) -> String {
        self.http_url(AJAX_PATH)
    }

    /// Echo websocket URL.
    pub fn echo_connect(&self) -> String {
        self.ws_url(ECHO_CONNECT_PATH)
    }

    /// Files websocket URL.
    pub fn files_connect(&self) -> String {
        self.ws_url(FILES_CONNECT_PATH)
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new(LOCAL_HOST)
    }
}

#[cfg(test)]
mod tests {
    use super::Endpoints;

    #[test]
    fn default_endpoints_target_local_host() {
        let endpoints = Endpoints::default();
        assert_eq!(endpoints.ajax(), "http://localhost:8080/ajax");
        assert_eq!(endpoints.echo_connect(), "ws://localhost:8080/echo_connect");
    }

    #[test]
    fn secure_flag_pairs_https_with_wss() {
        let endpoints = Endpoints::new("share.example.com").with_secure(true);
        assert_eq!(endpoints.home(), "https://share.example.com/home");
        assert_eq!(
            endpoints.files_connect(),
            "wss://share.example.com/files_connect"
        );
    }

    #[test]
    fn trailing_slash_in_host_is_stripped() {
        let endpoints = Endpoints::new("localhost:9000/");
        assert_eq!(endpoints.login(), "http://localhost:9000/login");
    }
}
