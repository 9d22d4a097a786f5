//! Directory lookups used by the diagnostics: users, organization, licences

use crate::error::Result;
use crate::graph::{encode_path, CollectionResponse, GraphClient};
use serde::Deserialize;

const USER_SELECT: &str = "id,displayName,userPrincipalName,mail,accountEnabled,userType,creationType,externalUserState,proxyAddresses,assignedLicenses";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub user_principal_name: Option<String>,
    #[serde(default)]
    pub mail: Option<String>,
    #[serde(default)]
    pub account_enabled: Option<bool>,
    #[serde(default)]
    pub user_type: Option<String>,
    #[serde(default)]
    pub creation_type: Option<String>,
    #[serde(default)]
    pub external_user_state: Option<String>,
    #[serde(default)]
    pub proxy_addresses: Vec<String>,
    #[serde(default)]
    pub assigned_licenses: Vec<serde_json::Value>,
}

impl User {
    /// Address usable as a sender: mail, else UPN
    pub fn address(&self) -> Option<&str> {
        self.mail
            .as_deref()
            .or(self.user_principal_name.as_deref())
            .filter(|a| !a.is_empty())
    }

    pub fn is_enabled(&self) -> bool {
        self.account_enabled.unwrap_or(false)
    }

    pub fn is_guest(&self) -> bool {
        self.user_type.as_deref() == Some("Guest")
            || self
                .user_principal_name
                .as_deref()
                .is_some_and(|upn| upn.contains("#EXT#"))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub verified_domains: Vec<VerifiedDomain>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifiedDomain {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribedSku {
    #[serde(default)]
    pub sku_part_number: Option<String>,
    #[serde(default)]
    pub consumed_units: i64,
    #[serde(default)]
    pub prepaid_units: PrepaidUnits,
    #[serde(default)]
    pub service_plans: Vec<ServicePlan>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct PrepaidUnits {
    #[serde(default)]
    pub enabled: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePlan {
    #[serde(default)]
    pub service_plan_name: Option<String>,
}

/// One licence line as reported by `diagnose licenses`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseSummary {
    pub name: String,
    pub consumed: i64,
    pub available: i64,
    pub has_exchange: bool,
    pub is_free: bool,
}

impl From<&SubscribedSku> for LicenseSummary {
    fn from(sku: &SubscribedSku) -> Self {
        let name = sku
            .sku_part_number
            .clone()
            .unwrap_or_else(|| "Unknown".to_string());
        let enabled = sku.prepaid_units.enabled;
        let has_exchange = sku.service_plans.iter().any(|plan| {
            plan.service_plan_name
                .as_deref()
                .is_some_and(|n| n.contains("EXCHANGE"))
        });

        Self {
            is_free: name.to_uppercase().contains("FREE") || enabled == 0,
            available: enabled - sku.consumed_units,
            consumed: sku.consumed_units,
            has_exchange,
            name,
        }
    }
}

pub async fn get_user(client: &GraphClient, user: &str) -> Result<User> {
    client
        .get(&format!("users/{}?$select={}", encode_path(user), USER_SELECT))
        .await
}

pub async fn list_users(client: &GraphClient) -> Result<Vec<User>> {
    client
        .get_all_pages(&format!("users?$select={}", USER_SELECT))
        .await
}

pub async fn get_organization(client: &GraphClient) -> Result<Option<Organization>> {
    let response: CollectionResponse<Organization> = client.get("organization").await?;
    Ok(response.value.into_iter().next())
}

pub async fn list_subscribed_skus(client: &GraphClient) -> Result<Vec<SubscribedSku>> {
    let response: CollectionResponse<SubscribedSku> = client.get("subscribedSkus").await?;
    Ok(response.value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_license_summary() {
        let sku: SubscribedSku = serde_json::from_value(json!({
            "skuPartNumber": "O365_BUSINESS_ESSENTIALS",
            "consumedUnits": 3,
            "prepaidUnits": {"enabled": 5, "suspended": 0},
            "servicePlans": [
                {"servicePlanName": "TEAMS1"},
                {"servicePlanName": "EXCHANGE_S_STANDARD"}
            ]
        }))
        .unwrap();

        let summary = LicenseSummary::from(&sku);
        assert_eq!(summary.name, "O365_BUSINESS_ESSENTIALS");
        assert_eq!(summary.available, 2);
        assert!(summary.has_exchange);
        assert!(!summary.is_free);
    }

    #[test]
    fn test_license_summary_free_sku() {
        let sku: SubscribedSku = serde_json::from_value(json!({
            "skuPartNumber": "FLOW_FREE",
            "consumedUnits": 1,
            "prepaidUnits": {"enabled": 10000},
            "servicePlans": [{"servicePlanName": "FLOW_P2_VIRAL"}]
        }))
        .unwrap();

        let summary = LicenseSummary::from(&sku);
        assert!(summary.is_free);
        assert!(!summary.has_exchange);
    }

    #[test]
    fn test_user_address_and_guest() {
        let user: User = serde_json::from_value(json!({
            "displayName": "Newsletter",
            "userPrincipalName": "someone_outlook.com#EXT#@contoso.onmicrosoft.com",
            "mail": null,
            "accountEnabled": true,
            "userType": "Member"
        }))
        .unwrap();

        assert_eq!(
            user.address(),
            Some("someone_outlook.com#EXT#@contoso.onmicrosoft.com")
        );
        assert!(user.is_enabled());
        assert!(user.is_guest());
    }
}
