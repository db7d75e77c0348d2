use lanseat_types::events::Invoker;

use crate::error::ApiError;
use crate::state::AppState;

pub const ADMIN_ROLE_SETTING: &str = "adminRole";

/// The configured owner is always admin; anyone else needs the role stored
/// in the `adminRole` setting.
pub async fn is_admin(state: &AppState, invoker: &Invoker) -> Result<bool, ApiError> {
    if state
        .config
        .owner_id
        .as_deref()
        .is_some_and(|owner| !owner.is_empty() && owner == invoker.user_id)
    {
        return Ok(true);
    }

    let role = state.db(|db| db.get_setting(ADMIN_ROLE_SETTING)).await?;
    Ok(match role {
        Some(role) if !role.is_empty() => invoker.role_ids.iter().any(|r| *r == role),
        _ => false,
    })
}

pub async fn require_admin(state: &AppState, invoker: &Invoker) -> Result<(), ApiError> {
    if is_admin(state, invoker).await? {
        Ok(())
    } else {
        Err(ApiError::PermissionDenied)
    }
}
