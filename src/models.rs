pub mod domain {
    use std::fmt;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Endpoint {
        pub id: i64,
        pub addressing: Addressing,
        /// `None` until the control plane has attached a security identity.
        pub identity: Option<SecurityIdentity>,
    }

    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct Addressing {
        pub ipv4: Option<String>,
        pub ipv6: Option<String>,
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SecurityIdentity {
        pub id: i64,
        pub labels: Vec<String>,
    }

    impl Endpoint {
        pub fn is_resolved(&self) -> bool {
            self.identity.is_some()
        }
    }

    /// Renders as a space separated list: `[k8s:app=web reserved:host]`.
    pub struct Labels<'a>(pub &'a [String]);

    impl fmt::Display for Labels<'_> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "[{}]", self.0.join(" "))
        }
    }
}

pub mod dto {
    use serde::Deserialize;

    use super::domain;

    /// Endpoint as returned by the agent's `/v1/endpoint/{id}` API.
    #[derive(Debug, Deserialize, Clone)]
    pub struct EndpointDTO {
        pub id: i64,
        #[serde(default)]
        pub addressing: Option<AddressingDTO>,
        #[serde(default)]
        pub identity: Option<IdentityDTO>,
    }

    #[derive(Debug, Deserialize, Clone, Default)]
    pub struct AddressingDTO {
        #[serde(default)]
        pub ipv4: Option<String>,
        #[serde(default)]
        pub ipv6: Option<String>,
    }

    #[derive(Debug, Deserialize, Clone)]
    pub struct IdentityDTO {
        pub id: i64,
        #[serde(default)]
        pub labels: Vec<String>,
    }

    fn non_empty(s: Option<String>) -> Option<String> {
        s.filter(|s| !s.is_empty())
    }

    impl From<EndpointDTO> for domain::Endpoint {
        fn from(dto: EndpointDTO) -> Self {
            let addressing = dto.addressing.unwrap_or_default();
            domain::Endpoint {
                id: dto.id,
                addressing: domain::Addressing {
                    ipv4: non_empty(addressing.ipv4),
                    ipv6: non_empty(addressing.ipv6),
                },
                identity: dto.identity.map(|identity| domain::SecurityIdentity {
                    id: identity.id,
                    labels: identity.labels,
                }),
            }
        }
    }
}
