//! Extension metadata/value storage contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist extension metadata (plugin row, tabs, providers) with overwrite
//!   semantics.
//! - Persist provider values keyed by `(extension, provider, subject)`.
//!
//! # Invariants
//! - Metadata writes are idempotent: writing unchanged metadata twice leaves
//!   the stored representation unchanged.
//! - Providers/tabs missing from the latest metadata are removed with their
//!   values.
//! - Each value write touches exactly one `(provider, subject)` row.
//! - A plugin row's `last_updated` moves only when its icon changes.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::provider::{
    Color, Conditional, ElementOrder, ExtensionMetadata, Family, FormatType, Icon,
    ProviderDescriptor, SubjectShape, TabDescriptor, ValueKind,
};
use crate::model::subject::SubjectKey;
use crate::model::value::ProviderValue;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

const NOW_MS_SQL: &str = "(strftime('%s', 'now') * 1000)";

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from extension storage operations.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Value written for a provider whose metadata was never stored.
    UnknownProvider {
        extension: String,
        provider: String,
        subject: SubjectShape,
    },
    /// Value kind differs from the stored provider kind.
    KindMismatch {
        provider: String,
        expected: ValueKind,
        actual: ValueKind,
    },
    /// Persisted data cannot be converted to the model.
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "extension store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::UnknownProvider {
                extension,
                provider,
                subject,
            } => write!(
                f,
                "no {} provider `{provider}` stored for extension `{extension}`",
                subject.as_str()
            ),
            Self::KindMismatch {
                provider,
                expected,
                actual,
            } => write!(
                f,
                "provider `{provider}` stores {} values, got {}",
                expected.as_str(),
                actual.as_str()
            ),
            Self::InvalidData(message) => write!(f, "invalid extension data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Storage collaborator consumed by gatherers.
///
/// Both writes are individually failable and must not affect other keys.
pub trait ExtensionStore: Send + Sync {
    /// Overwrites the static metadata of one extension.
    fn write_extension_metadata(&self, metadata: &ExtensionMetadata) -> StoreResult<()>;

    /// Upserts one converted provider value for one subject.
    fn write_value(
        &self,
        extension: &str,
        provider: &str,
        subject: &SubjectKey,
        value: &ProviderValue,
    ) -> StoreResult<()>;
}

/// SQLite-backed extension store bound to one server identity.
pub struct SqliteExtensionStore {
    conn: Mutex<Connection>,
    server_uuid: Uuid,
}

impl SqliteExtensionStore {
    /// Creates a store from a migrated connection.
    pub fn try_new(conn: Connection, server_uuid: Uuid) -> StoreResult<Self> {
        let actual_version = current_user_version(&conn)?;
        let expected_version = latest_version();
        if actual_version != expected_version {
            return Err(StoreError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        Ok(Self {
            conn: Mutex::new(conn),
            server_uuid,
        })
    }

    pub fn server_uuid(&self) -> Uuid {
        self.server_uuid
    }

    /// Names of extensions with stored metadata for this server, sorted.
    pub fn plugin_names(&self) -> StoreResult<Vec<String>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT name FROM extension_plugins WHERE server_uuid = ?1 ORDER BY name ASC;",
        )?;
        let names = stmt
            .query_map([self.server_uuid.to_string()], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// Stored providers of one extension in insertion order.
    pub fn list_providers(&self, extension: &str) -> StoreResult<Vec<ProviderDescriptor>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT
                p.subject,
                p.name,
                p.value_kind,
                p.text,
                p.description,
                p.priority,
                p.icon_name,
                p.icon_family,
                p.icon_color,
                p.show_in_players_table,
                p.hidden,
                p.provided_condition,
                p.required_condition,
                p.required_negated,
                p.tab_name,
                p.format_type
             FROM extension_providers p
             JOIN extension_plugins pl ON pl.id = p.plugin_id
             WHERE pl.name = ?1 AND pl.server_uuid = ?2
             ORDER BY p.id ASC;",
        )?;
        let mut rows = stmt.query(params![extension, self.server_uuid.to_string()])?;
        let mut providers = Vec::new();
        while let Some(row) = rows.next()? {
            providers.push(parse_provider_row(row)?);
        }
        Ok(providers)
    }

    /// Stored tabs of one extension ordered by tab priority.
    pub fn list_tabs(&self, extension: &str) -> StoreResult<Vec<TabDescriptor>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT
                t.name, t.icon_name, t.icon_family, t.icon_color, t.element_order, t.tab_priority
             FROM extension_tabs t
             JOIN extension_plugins pl ON pl.id = t.plugin_id
             WHERE pl.name = ?1 AND pl.server_uuid = ?2
             ORDER BY t.tab_priority ASC, t.name ASC;",
        )?;
        let mut rows = stmt.query(params![extension, self.server_uuid.to_string()])?;
        let mut tabs = Vec::new();
        while let Some(row) = rows.next()? {
            let element_order = row
                .get::<_, String>("element_order")?
                .split(',')
                .filter(|part| !part.is_empty())
                .map(|part| {
                    ElementOrder::parse(part).ok_or_else(|| {
                        StoreError::InvalidData(format!("invalid element order `{part}`"))
                    })
                })
                .collect::<StoreResult<Vec<_>>>()?;
            tabs.push(TabDescriptor {
                name: row.get("name")?,
                icon: parse_icon(row)?,
                element_order,
                tab_priority: row.get("tab_priority")?,
            });
        }
        Ok(tabs)
    }

    /// Reads one stored value. `Ok(None)` when never written.
    pub fn read_value(
        &self,
        extension: &str,
        provider: &str,
        subject: &SubjectKey,
    ) -> StoreResult<Option<ProviderValue>> {
        let conn = self.lock();
        let Some((provider_id, kind)) = find_provider(
            &conn,
            self.server_uuid,
            extension,
            subject.shape(),
            provider,
        )?
        else {
            return Ok(None);
        };
        let (table, key_column, key) = value_target(subject, self.server_uuid);
        let row = conn
            .query_row(
                &format!(
                    "SELECT boolean_value, long_value, double_value, percentage_value, string_value
                     FROM {table}
                     WHERE provider_id = ?1 AND {key_column} = ?2;"
                ),
                params![provider_id, key],
                |row| {
                    Ok((
                        row.get::<_, Option<bool>>(0)?,
                        row.get::<_, Option<i64>>(1)?,
                        row.get::<_, Option<f64>>(2)?,
                        row.get::<_, Option<f64>>(3)?,
                        row.get::<_, Option<String>>(4)?,
                    ))
                },
            )
            .optional()?;
        let Some((boolean, long, double, percentage, string)) = row else {
            return Ok(None);
        };

        let value = match kind {
            ValueKind::Boolean => boolean.map(ProviderValue::Boolean),
            ValueKind::Number => long.map(ProviderValue::Number),
            ValueKind::Double => double.map(ProviderValue::Double),
            ValueKind::Percentage => percentage.map(ProviderValue::Percentage),
            ValueKind::String => string.map(ProviderValue::Text),
        };
        value.map(Some).ok_or_else(|| {
            StoreError::InvalidData(format!(
                "provider `{provider}` row has no {} value",
                kind.as_str()
            ))
        })
    }

    /// Number of stored values across all subjects for one extension.
    pub fn value_count(&self, extension: &str) -> StoreResult<u64> {
        let conn = self.lock();
        let mut total = 0u64;
        for table in [
            "extension_player_values",
            "extension_group_values",
            "extension_server_values",
        ] {
            let count: i64 = conn.query_row(
                &format!(
                    "SELECT COUNT(*)
                     FROM {table} v
                     JOIN extension_providers p ON p.id = v.provider_id
                     JOIN extension_plugins pl ON pl.id = p.plugin_id
                     WHERE pl.name = ?1 AND pl.server_uuid = ?2;"
                ),
                params![extension, self.server_uuid.to_string()],
                |row| row.get(0),
            )?;
            total += u64::try_from(count).unwrap_or(0);
        }
        Ok(total)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ExtensionStore for SqliteExtensionStore {
    fn write_extension_metadata(&self, metadata: &ExtensionMetadata) -> StoreResult<()> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let plugin_id = upsert_plugin(&tx, self.server_uuid, metadata)?;
        write_tabs(&tx, plugin_id, &metadata.tabs)?;
        write_providers(&tx, plugin_id, &metadata.providers)?;
        tx.commit()?;
        Ok(())
    }

    fn write_value(
        &self,
        extension: &str,
        provider: &str,
        subject: &SubjectKey,
        value: &ProviderValue,
    ) -> StoreResult<()> {
        let conn = self.lock();
        let shape = subject.shape();
        let Some((provider_id, kind)) =
            find_provider(&conn, self.server_uuid, extension, shape, provider)?
        else {
            return Err(StoreError::UnknownProvider {
                extension: extension.to_string(),
                provider: provider.to_string(),
                subject: shape,
            });
        };
        if kind != value.kind() {
            return Err(StoreError::KindMismatch {
                provider: provider.to_string(),
                expected: kind,
                actual: value.kind(),
            });
        }

        let (table, key_column, key) = value_target(subject, self.server_uuid);
        let columns = ValueColumns::from(value);
        conn.execute(
            &format!(
                "INSERT INTO {table} (
                    provider_id,
                    {key_column},
                    boolean_value,
                    long_value,
                    double_value,
                    percentage_value,
                    string_value,
                    updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, {NOW_MS_SQL})
                ON CONFLICT (provider_id, {key_column}) DO UPDATE SET
                    boolean_value = excluded.boolean_value,
                    long_value = excluded.long_value,
                    double_value = excluded.double_value,
                    percentage_value = excluded.percentage_value,
                    string_value = excluded.string_value,
                    updated_at = excluded.updated_at;"
            ),
            params![
                provider_id,
                key,
                columns.boolean,
                columns.long,
                columns.double,
                columns.percentage,
                columns.string,
            ],
        )?;
        Ok(())
    }
}

struct ValueColumns<'v> {
    boolean: Option<bool>,
    long: Option<i64>,
    double: Option<f64>,
    percentage: Option<f64>,
    string: Option<&'v str>,
}

impl<'v> From<&'v ProviderValue> for ValueColumns<'v> {
    fn from(value: &'v ProviderValue) -> Self {
        let mut columns = Self {
            boolean: None,
            long: None,
            double: None,
            percentage: None,
            string: None,
        };
        match value {
            ProviderValue::Boolean(v) => columns.boolean = Some(*v),
            ProviderValue::Number(v) => columns.long = Some(*v),
            ProviderValue::Double(v) => columns.double = Some(*v),
            ProviderValue::Percentage(v) => columns.percentage = Some(*v),
            ProviderValue::Text(v) => columns.string = Some(v.as_str()),
        }
        columns
    }
}

fn value_target(subject: &SubjectKey, server_uuid: Uuid) -> (&'static str, &'static str, String) {
    match subject {
        SubjectKey::Player(uuid) => ("extension_player_values", "player_uuid", uuid.to_string()),
        SubjectKey::Group(name) => ("extension_group_values", "group_name", name.clone()),
        SubjectKey::Server => (
            "extension_server_values",
            "server_uuid",
            server_uuid.to_string(),
        ),
    }
}

fn find_provider(
    conn: &Connection,
    server_uuid: Uuid,
    extension: &str,
    subject: SubjectShape,
    provider: &str,
) -> StoreResult<Option<(i64, ValueKind)>> {
    let found = conn
        .query_row(
            "SELECT p.id, p.value_kind
             FROM extension_providers p
             JOIN extension_plugins pl ON pl.id = p.plugin_id
             WHERE pl.name = ?1 AND pl.server_uuid = ?2 AND p.subject = ?3 AND p.name = ?4;",
            params![
                extension,
                server_uuid.to_string(),
                subject.as_str(),
                provider
            ],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
        )
        .optional()?;
    let Some((id, kind_text)) = found else {
        return Ok(None);
    };
    let kind = ValueKind::parse(&kind_text)
        .ok_or_else(|| StoreError::InvalidData(format!("invalid value kind `{kind_text}`")))?;
    Ok(Some((id, kind)))
}

fn upsert_plugin(
    tx: &Transaction<'_>,
    server_uuid: Uuid,
    metadata: &ExtensionMetadata,
) -> StoreResult<i64> {
    let plugin = &metadata.plugin;
    tx.execute(
        &format!(
            "INSERT INTO extension_plugins (
                name, server_uuid, icon_name, icon_family, icon_color, last_updated
            ) VALUES (?1, ?2, ?3, ?4, ?5, {NOW_MS_SQL})
            ON CONFLICT (name, server_uuid) DO UPDATE SET
                icon_name = excluded.icon_name,
                icon_family = excluded.icon_family,
                icon_color = excluded.icon_color,
                last_updated = excluded.last_updated
            WHERE icon_name IS NOT excluded.icon_name
                OR icon_family IS NOT excluded.icon_family
                OR icon_color IS NOT excluded.icon_color;"
        ),
        params![
            plugin.name,
            server_uuid.to_string(),
            plugin.icon.name,
            plugin.icon.family.as_str(),
            plugin.icon.color.as_str(),
        ],
    )?;
    let id = tx.query_row(
        "SELECT id FROM extension_plugins WHERE name = ?1 AND server_uuid = ?2;",
        params![plugin.name, server_uuid.to_string()],
        |row| row.get(0),
    )?;
    Ok(id)
}

fn write_tabs(tx: &Transaction<'_>, plugin_id: i64, tabs: &[TabDescriptor]) -> StoreResult<()> {
    for tab in tabs {
        let element_order = tab
            .element_order
            .iter()
            .map(|element| element.as_str())
            .collect::<Vec<_>>()
            .join(",");
        tx.execute(
            "INSERT INTO extension_tabs (
                plugin_id, name, icon_name, icon_family, icon_color, element_order, tab_priority
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT (plugin_id, name) DO UPDATE SET
                icon_name = excluded.icon_name,
                icon_family = excluded.icon_family,
                icon_color = excluded.icon_color,
                element_order = excluded.element_order,
                tab_priority = excluded.tab_priority;",
            params![
                plugin_id,
                tab.name,
                tab.icon.name,
                tab.icon.family.as_str(),
                tab.icon.color.as_str(),
                element_order,
                tab.tab_priority,
            ],
        )?;
    }

    let current: BTreeSet<&str> = tabs.iter().map(|tab| tab.name.as_str()).collect();
    let stored = {
        let mut stmt = tx.prepare("SELECT id, name FROM extension_tabs WHERE plugin_id = ?1;")?;
        let rows = stmt
            .query_map([plugin_id], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        rows
    };
    for (id, name) in stored {
        if !current.contains(name.as_str()) {
            tx.execute("DELETE FROM extension_tabs WHERE id = ?1;", [id])?;
        }
    }
    Ok(())
}

fn write_providers(
    tx: &Transaction<'_>,
    plugin_id: i64,
    providers: &[ProviderDescriptor],
) -> StoreResult<()> {
    for provider in providers {
        let (required_condition, required_negated) = match &provider.required_condition {
            Some(gate) => (Some(gate.name.as_str()), gate.negated),
            None => (None, false),
        };
        tx.execute(
            "INSERT INTO extension_providers (
                plugin_id, subject, name, value_kind, text, description, priority,
                icon_name, icon_family, icon_color, show_in_players_table, hidden,
                provided_condition, required_condition, required_negated, tab_name, format_type
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
            ON CONFLICT (plugin_id, subject, name) DO UPDATE SET
                value_kind = excluded.value_kind,
                text = excluded.text,
                description = excluded.description,
                priority = excluded.priority,
                icon_name = excluded.icon_name,
                icon_family = excluded.icon_family,
                icon_color = excluded.icon_color,
                show_in_players_table = excluded.show_in_players_table,
                hidden = excluded.hidden,
                provided_condition = excluded.provided_condition,
                required_condition = excluded.required_condition,
                required_negated = excluded.required_negated,
                tab_name = excluded.tab_name,
                format_type = excluded.format_type;",
            params![
                plugin_id,
                provider.subject.as_str(),
                provider.name,
                provider.kind.as_str(),
                provider.text,
                provider.description,
                provider.priority,
                provider.icon.name,
                provider.icon.family.as_str(),
                provider.icon.color.as_str(),
                provider.show_in_players_table,
                provider.hidden,
                provider.provided_condition,
                required_condition,
                required_negated,
                provider.tab,
                provider.format.as_str(),
            ],
        )?;
    }

    let current: BTreeSet<(&str, &str)> = providers
        .iter()
        .map(|provider| (provider.subject.as_str(), provider.name.as_str()))
        .collect();
    let stored = {
        let mut stmt =
            tx.prepare("SELECT id, subject, name FROM extension_providers WHERE plugin_id = ?1;")?;
        let rows = stmt
            .query_map([plugin_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        rows
    };
    for (id, subject, name) in stored {
        if !current.contains(&(subject.as_str(), name.as_str())) {
            tx.execute("DELETE FROM extension_providers WHERE id = ?1;", [id])?;
        }
    }
    Ok(())
}

fn parse_provider_row(row: &Row<'_>) -> StoreResult<ProviderDescriptor> {
    let subject_text: String = row.get("subject")?;
    let subject = SubjectShape::parse(&subject_text).ok_or_else(|| {
        StoreError::InvalidData(format!("invalid subject `{subject_text}` in extension_providers"))
    })?;
    let kind_text: String = row.get("value_kind")?;
    let kind = ValueKind::parse(&kind_text).ok_or_else(|| {
        StoreError::InvalidData(format!("invalid value kind `{kind_text}` in extension_providers"))
    })?;
    let format_text: String = row.get("format_type")?;
    let format = FormatType::parse(&format_text).ok_or_else(|| {
        StoreError::InvalidData(format!("invalid format `{format_text}` in extension_providers"))
    })?;
    let required_condition = row
        .get::<_, Option<String>>("required_condition")?
        .map(|name| -> rusqlite::Result<Conditional> {
            Ok(Conditional {
                name,
                negated: row.get("required_negated")?,
            })
        })
        .transpose()?;

    Ok(ProviderDescriptor {
        name: row.get("name")?,
        kind,
        subject,
        text: row.get("text")?,
        description: row.get("description")?,
        priority: row.get("priority")?,
        icon: parse_icon(row)?,
        show_in_players_table: row.get("show_in_players_table")?,
        hidden: row.get("hidden")?,
        provided_condition: row.get("provided_condition")?,
        required_condition,
        tab: row.get("tab_name")?,
        format,
    })
}

fn parse_icon(row: &Row<'_>) -> StoreResult<Icon> {
    let family_text: String = row.get("icon_family")?;
    let family = Family::parse(&family_text)
        .ok_or_else(|| StoreError::InvalidData(format!("invalid icon family `{family_text}`")))?;
    let color_text: String = row.get("icon_color")?;
    let color = Color::parse(&color_text)
        .ok_or_else(|| StoreError::InvalidData(format!("invalid icon color `{color_text}`")))?;
    Ok(Icon {
        name: row.get("icon_name")?,
        family,
        color,
    })
}

#[cfg(test)]
mod tests {
    use super::{ExtensionStore, SqliteExtensionStore, StoreError};
    use crate::db::open_db_in_memory;
    use crate::model::provider::{
        ExtensionMetadata, FormatType, Icon, PluginInfo, ProviderDescriptor, SubjectShape,
        ValueKind,
    };
    use crate::model::subject::SubjectKey;
    use crate::model::value::ProviderValue;
    use rusqlite::Connection;
    use uuid::Uuid;

    fn descriptor(name: &str, kind: ValueKind, subject: SubjectShape) -> ProviderDescriptor {
        ProviderDescriptor {
            name: name.to_string(),
            kind,
            subject,
            text: name.to_string(),
            description: None,
            priority: 0,
            icon: Icon::default(),
            show_in_players_table: false,
            hidden: false,
            provided_condition: None,
            required_condition: None,
            tab: None,
            format: FormatType::None,
        }
    }

    fn store() -> SqliteExtensionStore {
        let conn = open_db_in_memory().expect("in-memory db");
        SqliteExtensionStore::try_new(conn, Uuid::new_v4()).expect("store")
    }

    #[test]
    fn rejects_unmigrated_connection() {
        let conn = Connection::open_in_memory().expect("raw connection");
        let err = SqliteExtensionStore::try_new(conn, Uuid::new_v4())
            .err()
            .expect("unmigrated connection must fail");
        assert!(matches!(
            err,
            StoreError::UninitializedConnection {
                actual_version: 0,
                ..
            }
        ));
    }

    #[test]
    fn value_for_unknown_provider_fails() {
        let store = store();
        let err = store
            .write_value("Nope", "count", &SubjectKey::Server, &ProviderValue::Number(1))
            .expect_err("unknown provider");
        assert!(matches!(err, StoreError::UnknownProvider { .. }));
    }

    #[test]
    fn value_kind_must_match_provider_kind() {
        let store = store();
        store
            .write_extension_metadata(&ExtensionMetadata {
                plugin: PluginInfo::new("Kinds"),
                providers: vec![descriptor("count", ValueKind::Number, SubjectShape::Server)],
                tabs: vec![],
            })
            .expect("metadata");

        let err = store
            .write_value(
                "Kinds",
                "count",
                &SubjectKey::Server,
                &ProviderValue::Text("x".to_string()),
            )
            .expect_err("kind mismatch");
        assert!(matches!(err, StoreError::KindMismatch { .. }));
    }

    #[test]
    fn upserts_values_per_subject() {
        let store = store();
        store
            .write_extension_metadata(&ExtensionMetadata {
                plugin: PluginInfo::new("Upsert"),
                providers: vec![
                    descriptor("ratio", ValueKind::Percentage, SubjectShape::Group),
                    descriptor("ratio", ValueKind::Percentage, SubjectShape::Server),
                ],
                tabs: vec![],
            })
            .expect("metadata");

        let admins = SubjectKey::Group("admins".to_string());
        store
            .write_value("Upsert", "ratio", &admins, &ProviderValue::Percentage(0.25))
            .expect("first write");
        store
            .write_value("Upsert", "ratio", &admins, &ProviderValue::Percentage(1.5))
            .expect("second write");
        store
            .write_value("Upsert", "ratio", &SubjectKey::Server, &ProviderValue::Percentage(0.75))
            .expect("server write");

        assert_eq!(
            store.read_value("Upsert", "ratio", &admins).expect("read"),
            Some(ProviderValue::Percentage(1.5))
        );
        assert_eq!(
            store
                .read_value("Upsert", "ratio", &SubjectKey::Server)
                .expect("read"),
            Some(ProviderValue::Percentage(0.75))
        );
        assert_eq!(store.value_count("Upsert").expect("count"), 2);
    }
}
