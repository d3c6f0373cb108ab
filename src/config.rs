use crate::db::{load_json, save_json, BlobStore};
use crate::errors::{AppError, AppResult};
use crate::models::AppSettings;

pub const SETTINGS_KEY: &str = "settings";

const MAX_DAY_BOUNDARY_MINUTES: i32 = 14 * 60;

pub fn load_settings(store: &dyn BlobStore) -> AppResult<AppSettings> {
    load_json::<AppSettings>(store, SETTINGS_KEY)
}

/// Merges `update` into the stored settings object and persists the result.
pub fn update_settings(store: &dyn BlobStore, update: serde_json::Value) -> AppResult<AppSettings> {
    let current = load_settings(store)?;
    let mut merged = serde_json::to_value(current)?;
    merge_json(&mut merged, update);
    let settings: AppSettings = serde_json::from_value(merged)?;
    validate_settings(&settings)?;

    save_json(store, SETTINGS_KEY, &settings)?;
    Ok(settings)
}

fn validate_settings(settings: &AppSettings) -> AppResult<()> {
    if settings.day_boundary_offset_minutes.abs() > MAX_DAY_BOUNDARY_MINUTES {
        return Err(AppError::Validation(format!(
            "dayBoundaryOffsetMinutes must be within ±{}",
            MAX_DAY_BOUNDARY_MINUTES
        )));
    }
    Ok(())
}

fn merge_json(target: &mut serde_json::Value, update: serde_json::Value) {
    match (target, update) {
        (serde_json::Value::Object(target_map), serde_json::Value::Object(update_map)) => {
            for (key, value) in update_map {
                merge_json(target_map.entry(key).or_insert(serde_json::Value::Null), value);
            }
        }
        (target, update) => {
            *target = update;
        }
    }
}
