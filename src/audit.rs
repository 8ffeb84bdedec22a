use serde_json::Value;
use uuid::Uuid;

use crate::{error::AppResult, middleware::auth::AuthUser, state::AppState};

pub async fn log_audit(
    state: &AppState,
    actor_id: Option<Uuid>,
    action: &str,
    resource: Option<&str>,
    metadata: Option<Value>,
) -> AppResult<()> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO audit_logs (id, actor_id, action, resource, metadata)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(id)
    .bind(actor_id)
    .bind(action)
    .bind(resource)
    .bind(metadata)
    .execute(&state.pool)
    .await?;

    Ok(())
}

/// Best-effort variant used by services: a failed write is logged, never surfaced.
/// The actor's token role is stored alongside the metadata.
pub async fn record(
    state: &AppState,
    actor: &AuthUser,
    action: &str,
    resource: &str,
    metadata: Value,
) {
    let metadata = with_role(metadata, &actor.role);
    if let Err(err) =
        log_audit(state, Some(actor.person_id), action, Some(resource), Some(metadata)).await
    {
        tracing::warn!(error = %err, action, "audit log failed");
    }
}

fn with_role(metadata: Value, role: &str) -> Value {
    match metadata {
        Value::Object(mut map) => {
            map.insert("actor_role".into(), Value::String(role.to_string()));
            Value::Object(map)
        }
        other => serde_json::json!({ "actor_role": role, "detail": other }),
    }
}
