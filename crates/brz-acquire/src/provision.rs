//! Target table provisioning
//!
//! Bronze tables are flat: every source column lands as unconstrained text,
//! plus a trailing `create_date` provenance column the store orders by
//! (expressed here as a btree index). Two mutually exclusive policies,
//! selected by the caller per target:
//!
//! - **Recreate**: drop if present, then create. Used when the column set
//!   comes from a fresh probe of the source.
//! - **TruncateOrCreate**: keep the schema, discard the rows. Used for
//!   tables refreshed in place.

use std::sync::Arc;
use tracing::info;

use crate::destination::StoreClient;
use crate::error::AcquireResult;

/// Name of the provenance column appended to every bronze table.
pub const PROVENANCE_COLUMN: &str = "create_date";

/// Table provisioning policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionPolicy {
    Recreate,
    TruncateOrCreate,
}

/// Provisions bronze tables. One provisioner per job; provision runs at most
/// once per task, strictly before that task's first insert.
pub struct TableProvisioner {
    store: Arc<dyn StoreClient>,
    schema: String,
}

impl TableProvisioner {
    pub fn new(store: Arc<dyn StoreClient>, schema: impl Into<String>) -> Self {
        Self {
            store,
            schema: schema.into(),
        }
    }

    /// Quoted, schema-qualified table name.
    pub fn qualified(&self, table: &str) -> String {
        format!("{}.{}", quote_ident(&self.schema), quote_ident(table))
    }

    /// Create the bronze schema when it is missing. Idempotent.
    pub async fn ensure_schema(&self) -> AcquireResult<()> {
        self.store
            .execute(&format!("CREATE SCHEMA IF NOT EXISTS {}", quote_ident(&self.schema)))
            .await
    }

    /// Ensure the target table exists with exactly `columns` (plus the
    /// provenance column), per the given policy.
    pub async fn provision(
        &self,
        table: &str,
        columns: &[String],
        policy: ProvisionPolicy,
    ) -> AcquireResult<()> {
        let qualified = self.qualified(table);

        match policy {
            ProvisionPolicy::Recreate => {
                self.store
                    .execute(&format!("DROP TABLE IF EXISTS {}", qualified))
                    .await?;
                self.create_table(table, &qualified, columns).await?;
                info!(table = %qualified, columns = columns.len(), "Table recreated");
            },
            ProvisionPolicy::TruncateOrCreate => {
                if self.store.exists(&qualified).await? {
                    self.store
                        .execute(&format!("TRUNCATE TABLE {}", qualified))
                        .await?;
                    info!(table = %qualified, "Table truncated");
                } else {
                    self.create_table(table, &qualified, columns).await?;
                    info!(table = %qualified, columns = columns.len(), "Table created");
                }
            },
        }

        Ok(())
    }

    async fn create_table(
        &self,
        table: &str,
        qualified: &str,
        columns: &[String],
    ) -> AcquireResult<()> {
        self.store
            .execute(&build_create_table(qualified, columns))
            .await?;
        self.store
            .execute(&build_provenance_index(&self.schema, table, qualified))
            .await
    }
}

/// CREATE TABLE with every source column as text plus the trailing
/// provenance column. Column names are taken verbatim from the first chunk.
pub fn build_create_table(qualified: &str, columns: &[String]) -> String {
    let mut column_defs: Vec<String> = columns
        .iter()
        .map(|c| format!("{} text", quote_ident(c)))
        .collect();
    column_defs.push(format!("{} text", quote_ident(PROVENANCE_COLUMN)));

    format!("CREATE TABLE {} ({})", qualified, column_defs.join(", "))
}

/// Index expressing the create_date storage ordering convention.
pub fn build_provenance_index(schema: &str, table: &str, qualified: &str) -> String {
    let index_name = quote_ident(format!("{}_{}_{}_idx", schema, table, PROVENANCE_COLUMN));
    format!(
        "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
        index_name,
        qualified,
        quote_ident(PROVENANCE_COLUMN)
    )
}

/// Quote one identifier, doubling embedded double quotes.
pub fn quote_ident(name: impl AsRef<str>) -> String {
    format!("\"{}\"", name.as_ref().replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("orders"), "\"orders\"");
        assert_eq!(quote_ident("od\"d"), "\"od\"\"d\"");
    }

    #[test]
    fn test_build_create_table_all_text_with_provenance() {
        let columns = vec!["id".to_string(), "name".to_string()];
        let sql = build_create_table("\"bronze\".\"orders\"", &columns);
        assert_eq!(
            sql,
            "CREATE TABLE \"bronze\".\"orders\" (\"id\" text, \"name\" text, \"create_date\" text)"
        );
    }

    #[test]
    fn test_build_create_table_keeps_column_names_verbatim() {
        let columns = vec!["Order Id".to_string()];
        let sql = build_create_table("\"bronze\".\"o\"", &columns);
        assert!(sql.contains("\"Order Id\" text"));
    }

    #[test]
    fn test_build_provenance_index() {
        let sql = build_provenance_index("bronze", "orders", "\"bronze\".\"orders\"");
        assert_eq!(
            sql,
            "CREATE INDEX IF NOT EXISTS \"bronze_orders_create_date_idx\" ON \"bronze\".\"orders\" (\"create_date\")"
        );
    }
}
