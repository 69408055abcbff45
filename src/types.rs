//! Data structures exchanged with the registration service.
//!
//! Registrations are read from the service as JSON and classified by
//! their lifecycle state.  Approval and site state requests are built
//! from them as immutable values and serialised back onto the wire.
//! Nothing here is persisted locally; the service owns all state.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Lifecycle state of a node registration.
///
/// Strings the tool does not know decode as [`RegistrationState::NotSet`]
/// so a newer service cannot break a whole fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RegistrationState {
    #[default]
    NotSet,
    New,
    Approved,
    Admitted,
    Retired,
    Failed,
    Done,
    Pending,
    Online,
    Upgrading,
    Maintenance,
}

impl RegistrationState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotSet => "NOTSET",
            Self::New => "NEW",
            Self::Approved => "APPROVED",
            Self::Admitted => "ADMITTED",
            Self::Retired => "RETIRED",
            Self::Failed => "FAILED",
            Self::Done => "DONE",
            Self::Pending => "PENDING",
            Self::Online => "ONLINE",
            Self::Upgrading => "UPGRADING",
            Self::Maintenance => "MAINTENANCE",
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "NEW" => Self::New,
            "APPROVED" => Self::Approved,
            "ADMITTED" => Self::Admitted,
            "RETIRED" => Self::Retired,
            "FAILED" => Self::Failed,
            "DONE" => Self::Done,
            "PENDING" => Self::Pending,
            "ONLINE" => Self::Online,
            "UPGRADING" => Self::Upgrading,
            "MAINTENANCE" => Self::Maintenance,
            _ => Self::NotSet,
        }
    }

    /// States that already count toward the cluster size without an approval.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Approved | Self::Admitted | Self::Online)
    }
}

impl fmt::Display for RegistrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RegistrationState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RegistrationState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(Self::parse).unwrap_or_default())
    }
}

/// Treats an explicit `null` like an absent key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Opaque credential/config payload issued to a node on approval.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Passport(Map<String, Value>);

impl Passport {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns a copy of the payload with the cluster fields injected.
    /// Existing keys are kept; `tenant` and `cluster_size` are overwritten.
    fn for_cluster(&self, tenant: &str, cluster_size: u32) -> Self {
        let mut fields = self.0.clone();
        fields.insert("tenant".into(), Value::String(tenant.to_string()));
        fields.insert("cluster_size".into(), Value::from(cluster_size));
        Self(fields)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Infra {
    #[serde(default)]
    pub hostname: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrationSpec {
    #[serde(default, deserialize_with = "null_as_default")]
    pub passport: Passport,
    #[serde(default, deserialize_with = "null_as_default")]
    pub infra: Infra,
}

/// A request from a compute node to join a site.
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub namespace: String,
    #[serde(default)]
    pub tenant: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub current_state: RegistrationState,
    #[serde(default, deserialize_with = "null_as_default")]
    pub get_spec: RegistrationSpec,
}

impl Registration {
    pub fn hostname(&self) -> &str {
        self.get_spec.infra.hostname.as_deref().unwrap_or("<unknown>")
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListRegistrationsResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<Registration>,
}

/// Transport mode a node uses to reach the control plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TunnelType {
    #[serde(rename = "SITE_TO_SITE_TUNNEL_IPSEC_OR_SSL")]
    IpsecOrSsl,
    #[serde(rename = "SITE_TO_SITE_TUNNEL_SSL")]
    Ssl,
    #[serde(rename = "SITE_TO_SITE_TUNNEL_IPSEC")]
    Ipsec,
}

impl TunnelType {
    /// Both allowed gives the combined mode, SSL alone gives SSL, anything
    /// else falls back to IPsec.
    pub fn select(ssl: bool, ipsec: bool) -> Self {
        match (ssl, ipsec) {
            (true, true) => Self::IpsecOrSsl,
            (true, false) => Self::Ssl,
            (false, _) => Self::Ipsec,
        }
    }
}

/// Body of the approve call.  Built once per registration and never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct ApprovalRequest {
    namespace: String,
    name: String,
    state: RegistrationState,
    passport: Passport,
    connected_region: String,
    tunnel_type: TunnelType,
}

impl ApprovalRequest {
    pub fn builder(registration: &Registration) -> ApprovalRequestBuilder<'_> {
        ApprovalRequestBuilder {
            registration,
            tenant: None,
            cluster_size: 1,
            tunnel_type: TunnelType::Ipsec,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> RegistrationState {
        self.state
    }

    pub fn passport(&self) -> &Passport {
        &self.passport
    }

    pub fn tunnel_type(&self) -> TunnelType {
        self.tunnel_type
    }
}

pub struct ApprovalRequestBuilder<'a> {
    registration: &'a Registration,
    tenant: Option<&'a str>,
    cluster_size: u32,
    tunnel_type: TunnelType,
}

impl<'a> ApprovalRequestBuilder<'a> {
    /// Tenant used when the registration does not name its own.
    pub fn fallback_tenant(mut self, tenant: &'a str) -> Self {
        self.tenant = Some(tenant);
        self
    }

    pub fn cluster_size(mut self, size: u32) -> Self {
        self.cluster_size = size;
        self
    }

    pub fn tunnel_type(mut self, tunnel_type: TunnelType) -> Self {
        self.tunnel_type = tunnel_type;
        self
    }

    pub fn build(self) -> ApprovalRequest {
        let registration = self.registration;
        let tenant = registration
            .tenant
            .as_deref()
            .filter(|t| !t.is_empty())
            .or(self.tenant)
            .unwrap_or_default();

        ApprovalRequest {
            namespace: registration.namespace.clone(),
            name: registration.name.clone(),
            state: RegistrationState::Admitted,
            passport: registration
                .get_spec
                .passport
                .for_cluster(tenant, self.cluster_size),
            connected_region: String::new(),
            tunnel_type: self.tunnel_type,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SiteState {
    Decommissioning,
}

/// Body of the site state transition call.
#[derive(Debug, Clone, Serialize)]
pub struct SiteStateRequest {
    namespace: String,
    name: String,
    state: SiteState,
}

impl SiteStateRequest {
    pub fn decommission(site: &str) -> Self {
        Self {
            namespace: "system".into(),
            name: site.to_string(),
            state: SiteState::Decommissioning,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pending(tenant: Option<&str>) -> Registration {
        serde_json::from_value(json!({
            "name": "reg-1",
            "namespace": "system",
            "tenant": tenant,
            "current_state": "PENDING",
            "get_spec": {
                "passport": { "cluster_name": "edge-1", "cluster_type": "ce" },
                "infra": { "hostname": "node-a" }
            }
        }))
        .unwrap()
    }

    #[test]
    fn decodes_registration_with_unknown_state() {
        let reg: Registration = serde_json::from_value(json!({
            "name": "reg-2",
            "current_state": "SOMETHING_NEW"
        }))
        .unwrap();

        assert_eq!(reg.current_state, RegistrationState::NotSet);
        assert_eq!(reg.namespace, "");
        assert_eq!(reg.hostname(), "<unknown>");
        assert_eq!(reg.get_spec.passport, Passport::default());
    }

    #[test]
    fn null_fields_decode_as_defaults() {
        let list: ListRegistrationsResponse = serde_json::from_value(json!({
            "items": [
                { "name": "a", "namespace": null, "current_state": null, "get_spec": null },
                { "name": "b", "current_state": "ONLINE",
                  "get_spec": { "passport": null, "infra": null } }
            ]
        }))
        .unwrap();

        assert_eq!(list.items.len(), 2);
        assert_eq!(list.items[0].namespace, "");
        assert_eq!(list.items[0].current_state, RegistrationState::NotSet);
        assert_eq!(list.items[0].get_spec.passport, Passport::default());
        assert_eq!(list.items[1].current_state, RegistrationState::Online);
        assert_eq!(list.items[1].get_spec.passport, Passport::default());
        assert_eq!(list.items[1].hostname(), "<unknown>");

        let empty: ListRegistrationsResponse =
            serde_json::from_value(json!({ "items": null })).unwrap();
        assert!(empty.items.is_empty());
    }

    #[test]
    fn active_states() {
        assert!(RegistrationState::Approved.is_active());
        assert!(RegistrationState::Admitted.is_active());
        assert!(RegistrationState::Online.is_active());
        assert!(!RegistrationState::Pending.is_active());
        assert!(!RegistrationState::Failed.is_active());
        assert!(!RegistrationState::NotSet.is_active());
    }

    #[test]
    fn tunnel_type_selection() {
        assert_eq!(TunnelType::select(true, true), TunnelType::IpsecOrSsl);
        assert_eq!(TunnelType::select(true, false), TunnelType::Ssl);
        assert_eq!(TunnelType::select(false, true), TunnelType::Ipsec);
        assert_eq!(TunnelType::select(false, false), TunnelType::Ipsec);
    }

    #[test]
    fn approval_passport_keeps_payload_and_adds_cluster_fields() {
        let reg = pending(Some("acme-corp"));
        let request = ApprovalRequest::builder(&reg)
            .fallback_tenant("ignored")
            .cluster_size(3)
            .tunnel_type(TunnelType::Ssl)
            .build();

        let passport = request.passport();
        assert_eq!(passport.get("cluster_name"), Some(&json!("edge-1")));
        assert_eq!(passport.get("cluster_type"), Some(&json!("ce")));
        assert_eq!(passport.get("tenant"), Some(&json!("acme-corp")));
        assert_eq!(passport.get("cluster_size"), Some(&json!(3)));
        assert_eq!(request.state(), RegistrationState::Admitted);
        // source registration is untouched
        assert!(reg.get_spec.passport.get("tenant").is_none());
    }

    #[test]
    fn approval_uses_fallback_tenant_when_registration_has_none() {
        let reg = pending(None);
        let request = ApprovalRequest::builder(&reg)
            .fallback_tenant("operator-tenant")
            .build();

        assert_eq!(
            request.passport().get("tenant"),
            Some(&json!("operator-tenant"))
        );
        assert_eq!(request.passport().get("cluster_size"), Some(&json!(1)));
    }

    #[test]
    fn approval_request_wire_format() {
        let reg = pending(Some("acme-corp"));
        let request = ApprovalRequest::builder(&reg)
            .cluster_size(2)
            .tunnel_type(TunnelType::IpsecOrSsl)
            .build();

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["name"], "reg-1");
        assert_eq!(body["namespace"], "system");
        assert_eq!(body["state"], "ADMITTED");
        assert_eq!(body["connected_region"], "");
        assert_eq!(body["tunnel_type"], "SITE_TO_SITE_TUNNEL_IPSEC_OR_SSL");
        assert_eq!(body["passport"]["cluster_size"], 2);
    }

    #[test]
    fn site_state_request_wire_format() {
        let body = serde_json::to_value(SiteStateRequest::decommission("edge-1")).unwrap();
        assert_eq!(
            body,
            json!({ "namespace": "system", "name": "edge-1", "state": "DECOMMISSIONING" })
        );
    }
}
