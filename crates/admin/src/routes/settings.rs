//! Site settings: homepage blocks, contact details and other JSON documents.
//!
//! `woocommerce` holds credentials, so it is redacted here and only written
//! through the `WooCommerce` config route.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde_json::{Value as JsonValue, json};
use tracing::instrument;

use super::audit;
use crate::db::SettingsRepository;
use crate::db::settings::{SiteSetting, WOOCOMMERCE};
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdminAuth, RequireWriteAccess};
use crate::services::WooSettings;
use crate::services::woocommerce::WooSettingsView;
use crate::state::AppState;

const MAX_KEY_LENGTH: usize = 100;

/// Keys are lowercase snake case.
fn check_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && key.len() <= MAX_KEY_LENGTH
        && key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(AppError::BadRequest(
            "setting keys use lowercase letters, digits and underscores".to_owned(),
        ))
    }
}

fn check_writable(key: &str) -> Result<()> {
    check_key(key)?;
    if key == WOOCOMMERCE {
        return Err(AppError::BadRequest(
            "use /api/woocommerce/config for this setting".to_owned(),
        ));
    }
    Ok(())
}

/// Hide the `WooCommerce` secret.
fn redact(mut setting: SiteSetting) -> SiteSetting {
    if setting.key == WOOCOMMERCE {
        setting.value = serde_json::from_value::<WooSettings>(setting.value)
            .ok()
            .and_then(|s| serde_json::to_value(WooSettingsView::from(&s)).ok())
            .unwrap_or(JsonValue::Null);
    }
    setting
}

/// `GET /api/settings`
pub async fn list(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
) -> Result<Json<Vec<SiteSetting>>> {
    let settings = SettingsRepository::new(state.pool()).list().await?;
    Ok(Json(settings.into_iter().map(redact).collect()))
}

/// `GET /api/settings/{key}`
pub async fn show(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Path(key): Path<String>,
) -> Result<Json<SiteSetting>> {
    check_key(&key)?;
    SettingsRepository::new(state.pool())
        .get(&key)
        .await?
        .map(|s| Json(redact(s)))
        .ok_or_else(|| AppError::NotFound(format!("setting {key}")))
}

/// `PUT /api/settings/{key}`
///
/// The body is the new value. Concurrent writers: last write wins.
#[instrument(skip(state, admin, value), fields(admin_id = %admin.id))]
pub async fn put(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
    Path(key): Path<String>,
    Json(value): Json<JsonValue>,
) -> Result<Json<SiteSetting>> {
    check_writable(&key)?;
    let setting = SettingsRepository::new(state.pool())
        .upsert(&key, &value)
        .await?;
    audit(&state, &admin, "update", "site_setting", Some(key), json!({})).await;
    Ok(Json(setting))
}

/// `DELETE /api/settings/{key}`
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
    Path(key): Path<String>,
) -> Result<StatusCode> {
    check_writable(&key)?;
    SettingsRepository::new(state.pool()).delete(&key).await?;
    audit(&state, &admin, "delete", "site_setting", Some(key), json!({})).await;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn test_keys() {
        assert!(check_key("homepage").is_ok());
        assert!(check_key("store_contact_2").is_ok());
        assert!(check_key("Homepage").is_err());
        assert!(check_key("../etc").is_err());
        assert!(check_key("").is_err());
        assert!(check_writable(WOOCOMMERCE).is_err());
    }

    #[test]
    fn test_woocommerce_secret_is_redacted() {
        let setting = SiteSetting {
            key: WOOCOMMERCE.to_owned(),
            value: json!({
                "url": "https://shop.test",
                "consumer_key": "ck_1",
                "consumer_secret": "cs_hidden"
            }),
            updated_at: Utc::now(),
        };
        let redacted = redact(setting);
        assert_eq!(redacted.value["has_secret"], true);
        assert!(!redacted.value.to_string().contains("cs_hidden"));

        let other = SiteSetting {
            key: "homepage".to_owned(),
            value: json!({ "hero": "x" }),
            updated_at: Utc::now(),
        };
        assert_eq!(redact(other).value["hero"], "x");
    }
}
