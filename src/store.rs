// SQLite-backed catalog store.
//
// One table mirrors CatalogEntry; the surrogate id is the rowid. The only
// write path besides seeding is replace_all, which runs DELETE + INSERT
// inside a single transaction so readers observe either the old catalog or
// the new one, never a half-written mix.

use rusqlite::{params, Connection};
use std::path::Path;

use crate::catalog::CatalogEntry;

pub struct CatalogStore {
    conn: Connection,
}

impl CatalogStore {
    /// Open (or create) the database file and ensure the schema exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.setup()?;
        Ok(store)
    }

    /// In-memory store for tests and ephemeral runs.
    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.setup()?;
        Ok(store)
    }

    fn setup(&self) -> Result<(), rusqlite::Error> {
        // WAL for crash recovery; no-op on in-memory connections
        let _ = self
            .conn
            .pragma_update(None, "journal_mode", "WAL");

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS catalog_entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                short_description TEXT NOT NULL,
                detailed_description TEXT NOT NULL,
                benefits TEXT NOT NULL,
                how_to_get_started TEXT NOT NULL,
                image_url TEXT NOT NULL,
                learn_more_url TEXT NOT NULL,
                timeline_position INTEGER NOT NULL,
                is_priority INTEGER NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_timeline_position
             ON catalog_entries(timeline_position)",
            [],
        )?;

        Ok(())
    }

    /// Replace the entire catalog with `entries` in one transaction.
    /// Returns the number of rows inserted.
    pub fn replace_all(&mut self, entries: &[CatalogEntry]) -> Result<usize, rusqlite::Error> {
        let tx = self.conn.transaction()?;

        tx.execute("DELETE FROM catalog_entries", [])?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO catalog_entries (
                    name, short_description, detailed_description, benefits,
                    how_to_get_started, image_url, learn_more_url,
                    timeline_position, is_priority
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;

            for entry in entries {
                stmt.execute(params![
                    entry.name,
                    entry.short_description,
                    entry.detailed_description,
                    entry.benefits,
                    entry.how_to_get_started,
                    entry.image_url,
                    entry.learn_more_url,
                    entry.timeline_position,
                    entry.is_priority,
                ])?;
            }
        }

        tx.commit()?;
        Ok(entries.len())
    }

    /// All entries in display order (timeline position, then id).
    pub fn all_by_timeline(&self) -> Result<Vec<CatalogEntry>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, short_description, detailed_description, benefits,
                    how_to_get_started, image_url, learn_more_url,
                    timeline_position, is_priority
             FROM catalog_entries
             ORDER BY timeline_position, id",
        )?;

        let entries = stmt
            .query_map([], row_to_entry)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    pub fn get(&self, id: i64) -> Result<Option<CatalogEntry>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, short_description, detailed_description, benefits,
                    how_to_get_started, image_url, learn_more_url,
                    timeline_position, is_priority
             FROM catalog_entries
             WHERE id = ?1",
        )?;

        let mut rows = stmt.query_map(params![id], row_to_entry)?;
        rows.next().transpose()
    }

    pub fn count(&self) -> Result<i64, rusqlite::Error> {
        self.conn
            .query_row("SELECT COUNT(*) FROM catalog_entries", [], |row| row.get(0))
    }

    /// Insert the bootstrap catalog, but only when the table is empty.
    /// Returns the number of seeded rows (0 when data already exists).
    pub fn seed_if_empty(&mut self) -> Result<usize, rusqlite::Error> {
        if self.count()? > 0 {
            return Ok(0);
        }
        self.replace_all(&seed_entries())
    }
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> Result<CatalogEntry, rusqlite::Error> {
    Ok(CatalogEntry {
        id: row.get(0)?,
        name: row.get(1)?,
        short_description: row.get(2)?,
        detailed_description: row.get(3)?,
        benefits: row.get(4)?,
        how_to_get_started: row.get(5)?,
        image_url: row.get(6)?,
        learn_more_url: row.get(7)?,
        timeline_position: row.get(8)?,
        is_priority: row.get(9)?,
    })
}

/// Bootstrap products shown before the first CSV import.
fn seed_entries() -> Vec<CatalogEntry> {
    vec![
        CatalogEntry {
            id: 0,
            name: "Student Credit Cards".to_string(),
            short_description: "Build credit responsibly while in college".to_string(),
            detailed_description:
                "Learn how to use credit cards without falling into debt: pay the statement \
                 balance in full, keep utilization low, and never treat credit as income."
                    .to_string(),
            benefits: "Establish credit history, earn cashback rewards, build habits that \
                       pay off after graduation"
                .to_string(),
            how_to_get_started: "1. Check your credit score\n2. Compare student card offers\n\
                                 3. Apply for one card and set up autopay"
                .to_string(),
            image_url: "/images/credit-card.png".to_string(),
            learn_more_url: "#".to_string(),
            timeline_position: 1,
            is_priority: true,
        },
        CatalogEntry {
            id: 0,
            name: "High-Yield Savings Accounts".to_string(),
            short_description: "Grow an emergency fund with zero risk".to_string(),
            detailed_description:
                "A separate account for three to six months of expenses keeps surprises from \
                 becoming credit card debt."
                    .to_string(),
            benefits: "FDIC insured, interest well above checking, instant access".to_string(),
            how_to_get_started: "1. Compare APYs at online banks\n2. Open an account\n\
                                 3. Automate a weekly transfer"
                .to_string(),
            image_url: "/images/savings.png".to_string(),
            learn_more_url: "#".to_string(),
            timeline_position: 2,
            is_priority: true,
        },
        CatalogEntry {
            id: 0,
            name: "Roth IRA".to_string(),
            short_description: "Start retirement savings on a student budget".to_string(),
            detailed_description:
                "Contributions are taxed now while your rate is low; growth and qualified \
                 withdrawals are tax-free later."
                    .to_string(),
            benefits: "Decades of compounding, tax-free growth, flexible contribution \
                       withdrawals"
                .to_string(),
            how_to_get_started: "1. Open an account with a low-fee broker\n2. Pick a target-date \
                                 fund\n3. Contribute what you can, even $25 a month"
                .to_string(),
            image_url: "/images/retirement.png".to_string(),
            learn_more_url: "#".to_string(),
            timeline_position: 3,
            is_priority: false,
        },
        CatalogEntry {
            id: 0,
            name: "Renters Insurance".to_string(),
            short_description: "Protect your stuff for a few dollars a month".to_string(),
            detailed_description:
                "Covers theft, fire, and liability in an apartment or dorm; landlord policies \
                 do not cover your belongings."
                    .to_string(),
            benefits: "Cheap peace of mind, liability coverage, replacement of stolen items"
                .to_string(),
            how_to_get_started: "1. Inventory what you own\n2. Get quotes online\n3. Bundle with \
                                 auto insurance if you have it"
                .to_string(),
            image_url: "/images/insurance.png".to_string(),
            learn_more_url: "#".to_string(),
            timeline_position: 4,
            is_priority: false,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, position: i64) -> CatalogEntry {
        CatalogEntry {
            id: 0,
            name: name.to_string(),
            short_description: "short".to_string(),
            detailed_description: "detailed".to_string(),
            benefits: "benefits".to_string(),
            how_to_get_started: "start".to_string(),
            image_url: "/images/default.png".to_string(),
            learn_more_url: "#".to_string(),
            timeline_position: position,
            is_priority: false,
        }
    }

    #[test]
    fn test_replace_all_replaces_prior_contents() {
        let mut store = CatalogStore::open_in_memory().unwrap();
        store.replace_all(&[entry("old", 1)]).unwrap();

        let inserted = store
            .replace_all(&[entry("new-a", 2), entry("new-b", 1)])
            .unwrap();
        assert_eq!(inserted, 2);

        let all = store.all_by_timeline().unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|e| e.name != "old"));
    }

    #[test]
    fn test_all_by_timeline_is_ordered() {
        let mut store = CatalogStore::open_in_memory().unwrap();
        store
            .replace_all(&[entry("third", 30), entry("first", 1), entry("second", 2)])
            .unwrap();

        let names: Vec<String> = store
            .all_by_timeline()
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_duplicate_positions_are_allowed() {
        let mut store = CatalogStore::open_in_memory().unwrap();
        store
            .replace_all(&[entry("a", 1), entry("b", 1), entry("c", 1)])
            .unwrap();
        assert_eq!(store.count().unwrap(), 3);
    }

    #[test]
    fn test_get_by_id() {
        let mut store = CatalogStore::open_in_memory().unwrap();
        store.replace_all(&[entry("only", 1)]).unwrap();

        let all = store.all_by_timeline().unwrap();
        let found = store.get(all[0].id).unwrap().unwrap();
        assert_eq!(found.name, "only");

        assert!(store.get(9999).unwrap().is_none());
    }

    #[test]
    fn test_seed_if_empty_is_idempotent() {
        let mut store = CatalogStore::open_in_memory().unwrap();

        let seeded = store.seed_if_empty().unwrap();
        assert!(seeded > 0);

        let count = store.count().unwrap();
        assert_eq!(store.seed_if_empty().unwrap(), 0);
        assert_eq!(store.count().unwrap(), count);
    }

    #[test]
    fn test_seed_skipped_when_data_exists() {
        let mut store = CatalogStore::open_in_memory().unwrap();
        store.replace_all(&[entry("existing", 1)]).unwrap();

        assert_eq!(store.seed_if_empty().unwrap(), 0);
        assert_eq!(store.count().unwrap(), 1);
    }
}
