//! Default computed fields: `id`, `dateCreated`, `dateUpdated`.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::item::Item;
use crate::schema::{Schema, DATE_CREATED_FIELD, DATE_UPDATED_FIELD, ID_FIELD};

use super::registry::{Action, ComputedFieldRegistry};

/// Produces fresh ids for new records.
pub type IdGenerator = Arc<dyn Fn() -> String + Send + Sync>;

/// UUID v4 ids.
pub fn uuid_generator() -> IdGenerator {
    Arc::new(|| uuid::Uuid::new_v4().to_string())
}

static LAST_STAMP_MICROS: AtomicI64 = AtomicI64::new(0);

/// Current time, strictly later than any earlier call in this process.
pub fn monotonic_now() -> DateTime<Utc> {
    let now = Utc::now().timestamp_micros();
    let mut last = LAST_STAMP_MICROS.load(Ordering::Relaxed);
    loop {
        let next = now.max(last + 1);
        match LAST_STAMP_MICROS.compare_exchange_weak(
            last,
            next,
            Ordering::SeqCst,
            Ordering::Relaxed,
        ) {
            Ok(_) => {
                return DateTime::from_timestamp_micros(next).unwrap_or_else(Utc::now);
            }
            Err(actual) => last = actual,
        }
    }
}

/// Timestamp text written into date fields. Fixed width, so text order
/// equals time order.
pub fn timestamp() -> String {
    monotonic_now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn single(field: &str, value: Value) -> Item {
    let mut out = Item::new();
    out.insert(field.to_string(), value);
    out
}

/// Assigns an id on create when the candidate has none.
pub fn id_default(
    generator: IdGenerator,
) -> impl Fn(&Item, Option<&Item>, Action) -> Item + Send + Sync + 'static {
    move |item: &Item, _: Option<&Item>, action: Action| {
        let present = matches!(item.get(ID_FIELD), Some(v) if !v.is_null());
        if action == Action::Create && !present {
            single(ID_FIELD, Value::String(generator()))
        } else {
            Item::new()
        }
    }
}

/// Stamps creation time on create; keeps the stored value on push.
pub fn date_created_default(item: &Item, stored: Option<&Item>, action: Action) -> Item {
    match action {
        Action::Create => single(DATE_CREATED_FIELD, Value::String(timestamp())),
        Action::Push => match stored.and_then(|s| s.get(DATE_CREATED_FIELD)) {
            Some(value) => single(DATE_CREATED_FIELD, value.clone()),
            None if !item.contains_key(DATE_CREATED_FIELD) => {
                single(DATE_CREATED_FIELD, Value::String(timestamp()))
            }
            None => Item::new(),
        },
    }
}

/// Stamps update time on every write.
pub fn date_updated_default(_: &Item, _: Option<&Item>, _: Action) -> Item {
    single(DATE_UPDATED_FIELD, Value::String(timestamp()))
}

/// Appends the default functions whose tag is not taken and whose field the
/// schema declares.
pub fn install_defaults(registry: &mut ComputedFieldRegistry, schema: &Schema, ids: IdGenerator) {
    if schema.has_field(ID_FIELD) && !registry.contains(ID_FIELD) {
        registry.register(id_default(ids), Some(ID_FIELD));
    }
    if schema.has_field(DATE_CREATED_FIELD) && !registry.contains(DATE_CREATED_FIELD) {
        registry.register(date_created_default, Some(DATE_CREATED_FIELD));
    }
    if schema.has_field(DATE_UPDATED_FIELD) && !registry.contains(DATE_UPDATED_FIELD) {
        registry.register(date_updated_default, Some(DATE_UPDATED_FIELD));
    }
}
