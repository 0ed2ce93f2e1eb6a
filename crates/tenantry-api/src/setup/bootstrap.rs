//! Super admin bootstrap

use anyhow::{Context, Result};
use tenantry_access::Gateway;
use tenantry_core::Config;

/// Create the super admin from `SUPERADMIN_EMAIL` / `SUPERADMIN_PASSWORD` when both are set.
/// Safe to run on every start.
pub async fn bootstrap_super_admin(config: &Config, gateway: &Gateway) -> Result<()> {
    let Some((email, password)) = config.superadmin_credentials() else {
        tracing::info!("No super admin credentials configured, skipping bootstrap");
        return Ok(());
    };

    let user = gateway
        .bootstrap_super_admin(email, password)
        .await
        .context("Failed to bootstrap the super admin")?;
    tracing::info!(user_id = %user.id, "Super admin ready");
    Ok(())
}
