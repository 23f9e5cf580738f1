//! Candidate stream generation: endpoints × paths × credentials

use crate::network::Endpoint;
use std::fmt;

/// Credentials embedded in a candidate URL
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CredentialVariant {
    /// No `user:pass@` prefix
    Anonymous,
    Login {
        username: String,
        password: Option<String>,
    },
}

impl CredentialVariant {
    /// Parse one raw credential string.
    ///
    /// `user:pass` splits on the first colon, a bare `user` has no password,
    /// and `none` (any case) or an empty string means anonymous.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() || raw.eq_ignore_ascii_case("none") {
            return CredentialVariant::Anonymous;
        }

        match raw.split_once(':') {
            Some((username, password)) => CredentialVariant::Login {
                username: username.to_string(),
                password: Some(password.to_string()),
            },
            None => CredentialVariant::Login {
                username: raw.to_string(),
                password: None,
            },
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, CredentialVariant::Anonymous)
    }

    /// The `user[:pass]` part of a URL authority, if any
    pub fn userinfo(&self) -> Option<String> {
        match self {
            CredentialVariant::Anonymous => None,
            CredentialVariant::Login {
                username,
                password: Some(password),
            } => Some(format!("{}:{}", username, password)),
            CredentialVariant::Login { username, password: None } => Some(username.clone()),
        }
    }
}

impl fmt::Display for CredentialVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialVariant::Anonymous => write!(f, "none"),
            CredentialVariant::Login { username, .. } => write!(f, "{}", username),
        }
    }
}

/// Expand raw credential strings into variants.
///
/// User-supplied logins keep their order; anonymous access is appended exactly
/// once, whether or not the raw list mentions `none`.
pub fn credential_variants(raw: &[String]) -> Vec<CredentialVariant> {
    let mut variants: Vec<CredentialVariant> = raw
        .iter()
        .map(|entry| CredentialVariant::parse(entry))
        .filter(|variant| !variant.is_anonymous())
        .collect();
    variants.push(CredentialVariant::Anonymous);
    variants
}

/// Make sure a stream path starts with `/`
pub fn normalize_path(path: &str) -> String {
    let path = path.trim();
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

/// A stream URL that has not been verified yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamCandidate {
    pub endpoint: Endpoint,
    pub path: String,
    pub credentials: CredentialVariant,
    url: String,
}

impl StreamCandidate {
    pub fn new(scheme: &str, endpoint: Endpoint, path: &str, credentials: CredentialVariant) -> Self {
        let path = normalize_path(path);
        let url = match credentials.userinfo() {
            Some(userinfo) => format!("{}://{}@{}{}", scheme, userinfo, endpoint, path),
            None => format!("{}://{}{}", scheme, endpoint, path),
        };

        Self {
            endpoint,
            path,
            credentials,
            url,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// File name prefix for this candidate's probe artifacts.
    ///
    /// Built from host, port and path only; credentials never reach the
    /// filesystem. The artifact writer appends a random nonce, so two
    /// candidates sharing a prefix still get distinct files.
    pub fn artifact_prefix(&self) -> String {
        let sanitize = |raw: &str| -> String {
            raw.chars()
                .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
                .take(64)
                .collect()
        };
        format!(
            "rtsp_{}_{}_{}_",
            sanitize(&self.endpoint.ip.to_string()),
            self.endpoint.port,
            sanitize(&self.path)
        )
    }
}

/// Expands open endpoints into every candidate worth probing
#[derive(Debug, Clone)]
pub struct CandidateGenerator {
    scheme: String,
    paths: Vec<String>,
    credentials: Vec<CredentialVariant>,
}

impl CandidateGenerator {
    pub fn new(scheme: &str, paths: &[String], credentials: &[String]) -> Self {
        Self {
            scheme: scheme.to_string(),
            paths: paths.iter().map(|p| normalize_path(p)).collect(),
            credentials: credential_variants(credentials),
        }
    }

    pub fn credentials(&self) -> &[CredentialVariant] {
        &self.credentials
    }

    /// Candidates produced for each endpoint
    pub fn per_endpoint(&self) -> usize {
        self.paths.len() * self.credentials.len()
    }

    /// Cross product, endpoint-major then path then credentials
    pub fn generate(&self, endpoints: &[Endpoint]) -> Vec<StreamCandidate> {
        let mut candidates = Vec::with_capacity(endpoints.len() * self.per_endpoint());
        for endpoint in endpoints {
            for path in &self.paths {
                for credentials in &self.credentials {
                    candidates.push(StreamCandidate::new(&self.scheme, *endpoint, path, credentials.clone()));
                }
            }
        }
        candidates
    }
}
