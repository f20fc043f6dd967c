use axum::extract::State;
use axum::Json;

use crate::state::SharedState;

pub async fn get_runtime(State(st): State<SharedState>) -> Json<serde_json::Value> {
    let snapshot = st.manager.snapshot();
    let device = st.manager.device();

    Json(serde_json::json!({
        "phase": snapshot.phase,
        "resident": snapshot.resident,
        "last_failure": snapshot.last_failure,
        "warmup": st.warmup,
        "device": {
            "used_mb": device.used_mb(),
            "baseline_mb": device.baseline_mb(),
            "capacity_mb": device.capacity_mb(),
        },
        "catalog": st.manager.catalog().keys().collect::<Vec<_>>(),
        "models_root": st.manager.catalog().models_root(),
        "started_at": st.started_at,
    }))
}
