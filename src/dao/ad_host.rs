use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;
use crate::events::{ChangeKind, ChangeNotifier, Table};
use crate::models::AdHost;

/// Access to the persisted ad host block list.
pub struct AdHostDao<'a> {
    conn: &'a Connection,
    notifier: &'a ChangeNotifier,
}

impl<'a> AdHostDao<'a> {
    pub(crate) fn new(conn: &'a Connection, notifier: &'a ChangeNotifier) -> Self {
        Self { conn, notifier }
    }

    /// Insert one host. Fails with a constraint error if it is already present.
    pub fn insert(&self, host: &AdHost) -> Result<()> {
        self.conn.execute(
            "INSERT INTO AdHost (host) VALUES (?1)",
            params![host.host],
        )?;
        self.notifier.notify(Table::AdHost, ChangeKind::Inserted, 1);
        Ok(())
    }

    /// Bulk insert in one transaction; hosts already present are kept.
    ///
    /// Returns the number of hosts written.
    pub fn insert_all(&self, hosts: &[AdHost]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached("INSERT OR REPLACE INTO AdHost (host) VALUES (?1)")?;
            for host in hosts {
                stmt.execute(params![host.host])?;
            }
        }
        tx.commit()?;

        self.notifier
            .notify(Table::AdHost, ChangeKind::Inserted, hosts.len());
        Ok(hosts.len())
    }

    pub fn delete(&self, host: &AdHost) -> Result<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM AdHost WHERE host = ?1", params![host.host])?;
        self.notifier.notify(Table::AdHost, ChangeKind::Deleted, removed);
        Ok(removed)
    }

    pub fn delete_hosts(&self, hosts: &[AdHost]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let mut removed = 0;
        {
            let mut stmt = tx.prepare_cached("DELETE FROM AdHost WHERE host = ?1")?;
            for host in hosts {
                removed += stmt.execute(params![host.host])?;
            }
        }
        tx.commit()?;

        self.notifier.notify(Table::AdHost, ChangeKind::Deleted, removed);
        Ok(removed)
    }

    pub fn delete_all(&self) -> Result<usize> {
        let removed = self.conn.execute("DELETE FROM AdHost", [])?;
        self.notifier.notify(Table::AdHost, ChangeKind::Cleared, removed);
        Ok(removed)
    }

    pub fn contains(&self, host: &str) -> Result<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM AdHost WHERE host = ?1",
                params![host],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM AdHost", [], |row| row.get(0))?;
        Ok(count.max(0) as usize)
    }

    pub fn all(&self) -> Result<Vec<AdHost>> {
        let mut stmt = self.conn.prepare("SELECT host FROM AdHost ORDER BY host ASC")?;

        let rows = stmt.query_map([], |row| Ok(AdHost { host: row.get(0)? }))?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }
}
