//! SQLite persistence: the workspace snapshot loader and the commit capability.

mod schema;

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Transaction};
use uuid::Uuid;

use crate::driver::CommitBackend;
use crate::error::CommitError;
use crate::models::*;

pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::init(conn)
    }

    pub fn open_default() -> Result<Self> {
        Self::open(default_path()?)
    }

    pub fn open_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    // ============================================================
    // Roots
    // ============================================================

    /// Create a root as the last in the workspace.
    pub fn create_root(&self, name: &str, kind: CollectionKind) -> Result<Root> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut root = Root::new(name, kind);
        root.order = conn.query_row("SELECT COALESCE(MAX(ord), 0) + 1 FROM roots", [], |row| {
            row.get(0)
        })?;
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO roots (id, name, kind, ord, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            (
                root.id.to_string(),
                &root.name,
                kind.as_str(),
                root.order,
                &now,
                &now,
            ),
        )?;

        Ok(root)
    }

    /// Every root without its members, in display order.
    pub fn list_roots(&self) -> Result<Vec<Root>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        query_roots(&conn)
    }

    // ============================================================
    // Snapshot
    // ============================================================

    /// Load every root with its full member tree, siblings sorted by order.
    pub fn load_workspace(&self) -> Result<Workspace> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut roots = query_roots(&conn)?;

        let mut stmt = conn.prepare(
            "SELECT id, root_id, parent_id, name, kind, ord, path
             FROM members ORDER BY ord, rowid",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(MemberRow {
                    id: row.get(0)?,
                    root_id: row.get(1)?,
                    parent_id: row.get(2)?,
                    name: row.get(3)?,
                    kind: row.get(4)?,
                    ord: row.get(5)?,
                    path: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        // Group by (root, parent) so each container's list stays in order
        let mut by_container: HashMap<ContainerRef, Vec<Member>> = HashMap::new();
        for row in rows {
            let container = ContainerRef {
                root: parse_uuid(&row.root_id)?,
                node: row.parent_id.as_deref().map(parse_uuid).transpose()?,
            };
            let member = Member {
                id: parse_uuid(&row.id)?,
                kind: MemberKind::from_str(&row.kind)
                    .ok_or_else(|| anyhow::anyhow!("Unknown member kind {:?}", row.kind))?,
                path: serde_json::from_str(&row.path)
                    .with_context(|| format!("Invalid path for member {}", row.id))?,
                name: row.name,
                order: row.ord,
                children: Vec::new(),
            };
            by_container.entry(container).or_default().push(member);
        }

        fn build(
            container: ContainerRef,
            by_container: &mut HashMap<ContainerRef, Vec<Member>>,
        ) -> Vec<Member> {
            by_container
                .remove(&container)
                .unwrap_or_default()
                .into_iter()
                .map(|mut member| {
                    let inner = ContainerRef::node(container.root, member.id);
                    member.children = build(inner, by_container);
                    member
                })
                .collect()
        }

        for root in &mut roots {
            root.members = build(root.container_ref(), &mut by_container);
        }

        if !by_container.is_empty() {
            tracing::warn!(
                containers = by_container.len(),
                "members found under unknown containers"
            );
        }

        Ok(Workspace { roots })
    }

    // ============================================================
    // Batches
    // ============================================================

    /// Apply one batch in a single transaction: creates, then updates, then deletes.
    pub fn apply_batch(&self, batch: &Batch) -> Result<()> {
        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();

        for create in &batch.creates {
            insert_member(&tx, create, &now)?;
        }
        for update in &batch.updates {
            update_member(&tx, update, &now)?;
        }
        for id in &batch.deletes {
            tx.execute("DELETE FROM members WHERE id = ?", [id.to_string()])?;
        }

        tx.commit()?;
        tracing::debug!(
            container = %batch.container,
            commands = batch.len(),
            "batch applied"
        );
        Ok(())
    }

    /// Apply new root positions in a single transaction.
    pub fn apply_root_batch(&self, batch: &RootBatch) -> Result<()> {
        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();

        for update in &batch.updates {
            let changed = tx.execute(
                "UPDATE roots SET ord = ?, updated_at = ? WHERE id = ?",
                (update.order, &now, update.id.to_string()),
            )?;
            if changed == 0 {
                anyhow::bail!("Root {} not found", update.id);
            }
        }

        tx.commit()?;
        tracing::debug!(roots = batch.len(), "root order applied");
        Ok(())
    }

    pub fn member_exists(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let found = conn
            .query_row(
                "SELECT 1 FROM members WHERE id = ?",
                [id.to_string()],
                |row| row.get::<_, i32>(0),
            )
            .optional()?;
        Ok(found.is_some())
    }
}

impl CommitBackend for Database {
    fn commit_batch(&self, batch: &Batch) -> impl Future<Output = Result<(), CommitError>> + Send {
        let db = self.clone();
        let batch = batch.clone();
        async move {
            tokio::task::spawn_blocking(move || db.apply_batch(&batch))
                .await
                .map_err(|err| CommitError::Storage(err.to_string()))?
                .map_err(|err| CommitError::Storage(format!("{err:#}")))
        }
    }

    fn commit_root_batch(
        &self,
        batch: &RootBatch,
    ) -> impl Future<Output = Result<(), CommitError>> + Send {
        let db = self.clone();
        let batch = batch.clone();
        async move {
            tokio::task::spawn_blocking(move || db.apply_root_batch(&batch))
                .await
                .map_err(|err| CommitError::Storage(err.to_string()))?
                .map_err(|err| CommitError::Storage(format!("{err:#}")))
        }
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

struct MemberRow {
    id: String,
    root_id: String,
    parent_id: Option<String>,
    name: String,
    kind: String,
    ord: u32,
    path: String,
}

fn default_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", "arrange")
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
    Ok(dirs.data_dir().join("arrange.db"))
}

fn query_roots(conn: &Connection) -> Result<Vec<Root>> {
    let mut stmt =
        conn.prepare("SELECT id, name, kind, ord FROM roots ORDER BY ord, created_at, rowid")?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, u32>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(id, name, kind, order)| -> Result<Root> {
            Ok(Root {
                id: parse_uuid(&id)?,
                kind: CollectionKind::from_str(&kind)
                    .ok_or_else(|| anyhow::anyhow!("Unknown collection kind {kind:?}"))?,
                name,
                order,
                members: Vec::new(),
            })
        })
        .collect()
}

fn insert_member(tx: &Transaction<'_>, create: &NewMember, now: &str) -> Result<()> {
    tx.execute(
        "INSERT INTO members (id, root_id, parent_id, name, kind, ord, path, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        (
            create.id.to_string(),
            create.parent.root.to_string(),
            create.parent.node.map(|id| id.to_string()),
            &create.name,
            create.kind.as_str(),
            create.order,
            serde_json::to_string(&create.path)?,
            now,
            now,
        ),
    )
    .with_context(|| format!("Failed to create member {}", create.id))?;
    Ok(())
}

fn update_member(tx: &Transaction<'_>, update: &UpdateCommand, now: &str) -> Result<()> {
    let path = update.path.as_ref().map(serde_json::to_string).transpose()?;
    let changed = tx.execute(
        "UPDATE members SET
            ord = COALESCE(?, ord),
            name = COALESCE(?, name),
            path = COALESCE(?, path),
            updated_at = ?
         WHERE id = ?",
        (update.order, &update.name, path, now, update.id.to_string()),
    )?;
    if changed == 0 {
        anyhow::bail!("Member {} not found", update.id);
    }

    if let Some(parent) = update.parent {
        tx.execute(
            "UPDATE members SET root_id = ?, parent_id = ? WHERE id = ?",
            (
                parent.root.to_string(),
                parent.node.map(|id| id.to_string()),
                update.id.to_string(),
            ),
        )?;
    }
    Ok(())
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).with_context(|| format!("Invalid id {s:?}"))
}
