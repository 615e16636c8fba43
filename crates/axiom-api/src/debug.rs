//! The `/debug/idle_state` endpoint — a window into the scheduler.
//!
//! Multi-node deployments on one host are told apart by port, so the
//! response leads with the node's identity before the task ages.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::{
  error::ApiError,
  state::{task, AppState},
};

#[derive(Debug, Serialize)]
pub struct IdleStateResponse {
  pub node_port:                      u16,
  pub node_role:                      &'static str,
  pub advertised_url:                 String,
  pub db_path:                        String,
  pub main_cycle_interval_sec:        u64,
  pub idle_suite_interval_sec:        u64,
  pub last_main_cycle_age_sec:        Option<u64>,
  pub last_idle_learning_age_sec:     Option<u64>,
  pub last_code_introspection_age_sec: Option<u64>,
  pub last_data_quality_age_sec:      Option<u64>,
  pub last_fragment_audit_age_sec:    Option<u64>,
  pub last_health_snapshot_age_sec:   Option<u64>,
  pub last_self_checks_age_sec:       Option<u64>,
}

/// `GET /debug/idle_state` — `503` until the scheduler has started.
pub async fn idle_state(
  State(state): State<AppState>,
) -> Result<Json<IdleStateResponse>, ApiError> {
  if !state.idle.is_started() {
    return Err(ApiError::Unavailable(
      "node scheduler not yet initialized".to_owned(),
    ));
  }

  let node = &state.node;
  let idle = &state.idle;
  Ok(Json(IdleStateResponse {
    node_port:                      node.port,
    node_role:                      node.role.as_str(),
    advertised_url:                 node.advertised_url.clone(),
    db_path:                        node.db_path.clone(),
    main_cycle_interval_sec:        node.main_cycle_interval.as_secs(),
    idle_suite_interval_sec:        node.idle_suite_interval.as_secs(),
    last_main_cycle_age_sec:        idle.age_secs(task::MAIN_CYCLE),
    last_idle_learning_age_sec:     idle.age_secs(task::IDLE_LEARNING),
    last_code_introspection_age_sec: idle.age_secs(task::CODE_INTROSPECTION),
    last_data_quality_age_sec:      idle.age_secs(task::DATA_QUALITY),
    last_fragment_audit_age_sec:    idle.age_secs(task::FRAGMENT_AUDIT),
    last_health_snapshot_age_sec:   idle.age_secs(task::HEALTH_SNAPSHOT),
    last_self_checks_age_sec:       idle.age_secs(task::SELF_CHECKS),
  }))
}
