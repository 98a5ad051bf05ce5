use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};
use std::sync::{Arc, Mutex, OnceLock};
use sysinfo::System;
use tracing::info;

use super::ApiError;
use crate::auth::{auth, Identity};
use crate::models::DiagnosticsResponse;
use crate::state::AppState;
use crate::ws::Purpose;

static SYSTEM_MONITOR: OnceLock<Mutex<System>> = OnceLock::new();

/// Connection, room and process statistics
pub async fn diagnostics(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<(StatusCode, Json<DiagnosticsResponse>), ApiError> {
    auth::ensure_admin(&identity)?;

    // Aggregate counts from the hub
    let (n_conn, n_editor_rooms, n_chat_groups, n_cursor_overlays) = {
        let hub = state.hub.lock().await;
        (
            hub.registry.len() as u32,
            hub.rooms.room_count(Purpose::Editor) as u32,
            hub.rooms.room_count(Purpose::Chat) as u32,
            hub.editor.cursor_count() as u32,
        )
    };
    let n_join_debounce = state.join_debounce_len() as u32;

    // System stats
    let (cpu_usage, memory_alloc, memory_free, memory_total) = {
        let sys_lock = SYSTEM_MONITOR.get_or_init(|| Mutex::new(System::new_all()));
        match sys_lock.lock() {
            Ok(mut sys) => {
                sys.refresh_cpu();
                sys.refresh_memory();
                (
                    sys.global_cpu_info().cpu_usage(),
                    sys.used_memory(),
                    sys.free_memory(),
                    sys.total_memory(),
                )
            }
            Err(_) => (0.0, 0, 0, 0),
        }
    };

    info!(
        "Diagnostics: CPU: {:.2}%, Mem: {}/{} MB (Free: {} MB), Conn: {}, Editor rooms: {}, Groups: {}",
        cpu_usage,
        memory_alloc / 1024 / 1024,
        memory_total / 1024 / 1024,
        memory_free / 1024 / 1024,
        n_conn,
        n_editor_rooms,
        n_chat_groups
    );

    Ok((
        StatusCode::OK,
        Json(DiagnosticsResponse {
            n_conn,
            n_editor_rooms,
            n_chat_groups,
            n_cursor_overlays,
            n_join_debounce,
            cpu_usage,
            memory_alloc,
            memory_total,
            memory_free,
        }),
    ))
}
