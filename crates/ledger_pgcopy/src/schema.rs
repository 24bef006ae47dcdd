//! Column schema for every output table.
//!
//! Column order is load-bearing: it fixes the field order of every row in a
//! table and must match the value order produced by the table's extractor.
//! Adding a table means adding a `Table` here and an extractor; the encoding
//! machinery does not change.

use ledger_model::EntryKind;
use std::fmt;

/// PostgreSQL `pg_type.typcategory` of a column.
///
/// See <https://www.postgresql.org/docs/current/catalog-pg-type.html>.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCategory {
    /// `A`: array types
    Array,
    /// `B`: boolean
    Boolean,
    /// `D`: date/time
    DateTime,
    /// `E`: enum
    Enum,
    /// `N`: numeric
    Numeric,
    /// `S`: string
    String,
    /// `U`: user-defined / other (`uuid`, `json`, `jsonb`)
    UserDefined,
}

impl TypeCategory {
    pub fn as_char(self) -> char {
        match self {
            TypeCategory::Array => 'A',
            TypeCategory::Boolean => 'B',
            TypeCategory::DateTime => 'D',
            TypeCategory::Enum => 'E',
            TypeCategory::Numeric => 'N',
            TypeCategory::String => 'S',
            TypeCategory::UserDefined => 'U',
        }
    }
}

/// Type OIDs from `pg_type.dat` used as array element types.
pub mod oid {
    pub const BOOL: u32 = 16;
    pub const TEXT: u32 = 25;
    pub const VARCHAR: u32 = 1043;
    pub const DATE: u32 = 1082;
    pub const NUMERIC: u32 = 1700;
    pub const UUID: u32 = 2950;
}

/// One column of an output table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    /// Attribute name, e.g. `account`
    pub attname: &'static str,
    pub type_category: TypeCategory,
    /// Type name such as `uuid`, `varchar` or `booking` (a custom enum)
    pub type_name: &'static str,
    /// `atttypmod`; for strings a positive value allows `type_mod - 4`
    /// characters. -1 means unlimited.
    pub type_mod: i32,
    pub not_null: bool,
    /// Element type OID for arrays, 0 otherwise
    pub typelem: u32,
}

impl Column {
    const fn scalar(
        attname: &'static str,
        type_category: TypeCategory,
        type_name: &'static str,
        not_null: bool,
    ) -> Self {
        Self {
            attname,
            type_category,
            type_name,
            type_mod: -1,
            not_null,
            typelem: 0,
        }
    }

    pub const fn uuid(attname: &'static str) -> Self {
        Self::scalar(attname, TypeCategory::UserDefined, "uuid", true)
    }

    pub const fn varchar(attname: &'static str, not_null: bool) -> Self {
        Self::scalar(attname, TypeCategory::String, "varchar", not_null)
    }

    pub const fn numeric(attname: &'static str) -> Self {
        Self::scalar(attname, TypeCategory::Numeric, "numeric", false)
    }

    pub const fn date(attname: &'static str, not_null: bool) -> Self {
        Self::scalar(attname, TypeCategory::DateTime, "date", not_null)
    }

    pub const fn boolean(attname: &'static str) -> Self {
        Self::scalar(attname, TypeCategory::Boolean, "bool", false)
    }

    pub const fn jsonb(attname: &'static str) -> Self {
        Self::scalar(attname, TypeCategory::UserDefined, "jsonb", true)
    }

    pub const fn enumeration(
        attname: &'static str,
        type_name: &'static str,
        not_null: bool,
    ) -> Self {
        Self::scalar(attname, TypeCategory::Enum, type_name, not_null)
    }

    pub const fn varchar_array(attname: &'static str, not_null: bool) -> Self {
        Self {
            attname,
            type_category: TypeCategory::Array,
            type_name: "varchar",
            type_mod: -1,
            not_null,
            typelem: oid::VARCHAR,
        }
    }
}

/// An ordered list of columns written to one binary COPY stream.
#[derive(Debug, PartialEq, Eq)]
pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column],
}

impl Table {
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|c| c.attname)
    }
}

const ID: Column = Column::uuid("id");

pub static ENTRY_BASE_TABLE: Table = Table {
    name: "entry_base",
    columns: &[
        ID,
        Column::enumeration("entry_type", "entrytype", true),
        Column::date("date", true),
        Column::jsonb("meta"),
    ],
};

pub static POSTING_TABLE: Table = Table {
    name: "posting",
    columns: &[
        ID,
        Column::uuid("transaction_id"),
        Column::varchar("account", true),
        Column::numeric("units_number"),
        Column::varchar("units_currency", true),
        Column::numeric("price_number"),
        Column::varchar("price_currency", false),
        Column::numeric("cost_number"),
        Column::varchar("cost_currency", false),
        Column::date("cost_date", false),
        Column::varchar("cost_label", false),
        Column::numeric("cost_number_per"),
        Column::numeric("cost_number_total"),
        Column::boolean("cost_merge"),
        Column::varchar("flag", false),
        Column::jsonb("meta"),
    ],
};

pub static OPEN_TABLE: Table = Table {
    name: "open",
    columns: &[
        ID,
        Column::varchar("account", true),
        Column::varchar_array("currencies", false),
        Column::enumeration("booking", "booking", false),
    ],
};

pub static CLOSE_TABLE: Table = Table {
    name: "close",
    columns: &[ID, Column::varchar("account", true)],
};

pub static COMMODITY_TABLE: Table = Table {
    name: "commodity",
    columns: &[ID, Column::varchar("currency", true)],
};

pub static PAD_TABLE: Table = Table {
    name: "pad",
    columns: &[
        ID,
        Column::varchar("account", true),
        Column::varchar("source_account", true),
    ],
};

pub static BALANCE_TABLE: Table = Table {
    name: "balance",
    columns: &[
        ID,
        Column::varchar("account", true),
        Column::numeric("amount_number"),
        Column::varchar("amount_currency", true),
        Column::numeric("tolerance"),
        Column::numeric("diff_number"),
        Column::varchar("diff_currency", false),
    ],
};

pub static TRANSACTION_TABLE: Table = Table {
    name: "transaction",
    columns: &[
        ID,
        Column::varchar("flag", true),
        Column::varchar("payee", false),
        Column::varchar("narration", true),
        Column::varchar_array("tags", true),
        Column::varchar_array("links", true),
    ],
};

pub static NOTE_TABLE: Table = Table {
    name: "note",
    columns: &[
        ID,
        Column::varchar("account", true),
        Column::varchar("comment", true),
    ],
};

pub static EVENT_TABLE: Table = Table {
    name: "event",
    columns: &[
        ID,
        Column::varchar("type", true),
        Column::varchar("description", true),
    ],
};

pub static PRICE_TABLE: Table = Table {
    name: "price",
    columns: &[
        ID,
        Column::varchar("currency", true),
        Column::numeric("amount_number"),
        Column::varchar("amount_currency", true),
    ],
};

pub static DOCUMENT_TABLE: Table = Table {
    name: "document",
    columns: &[
        ID,
        Column::varchar("account", true),
        Column::varchar("filename", true),
        Column::varchar_array("tags", true),
        Column::varchar_array("links", true),
    ],
};

pub static CUSTOM_TABLE: Table = Table {
    name: "custom",
    columns: &[
        ID,
        Column::varchar("type", true),
        Column::varchar_array("values", true),
    ],
};

/// Type table for an entry kind.
pub fn entry_table(kind: EntryKind) -> &'static Table {
    match kind {
        EntryKind::Open => &OPEN_TABLE,
        EntryKind::Close => &CLOSE_TABLE,
        EntryKind::Commodity => &COMMODITY_TABLE,
        EntryKind::Pad => &PAD_TABLE,
        EntryKind::Balance => &BALANCE_TABLE,
        EntryKind::Transaction => &TRANSACTION_TABLE,
        EntryKind::Note => &NOTE_TABLE,
        EntryKind::Event => &EVENT_TABLE,
        EntryKind::Price => &PRICE_TABLE,
        EntryKind::Document => &DOCUMENT_TABLE,
        EntryKind::Custom => &CUSTOM_TABLE,
    }
}

/// Every binary output stream of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TableKind {
    EntryBase,
    Posting,
    Entry(EntryKind),
}

impl TableKind {
    pub const COUNT: usize = 2 + EntryKind::ALL.len();

    /// All tables in a fixed order: base, posting, then one per entry kind.
    pub fn all() -> impl Iterator<Item = TableKind> {
        [TableKind::EntryBase, TableKind::Posting]
            .into_iter()
            .chain(EntryKind::ALL.into_iter().map(TableKind::Entry))
    }

    pub fn table(self) -> &'static Table {
        match self {
            TableKind::EntryBase => &ENTRY_BASE_TABLE,
            TableKind::Posting => &POSTING_TABLE,
            TableKind::Entry(kind) => entry_table(kind),
        }
    }

    pub fn name(self) -> &'static str {
        self.table().name
    }

    /// Dense position in [`TableKind::all`].
    pub fn index(self) -> usize {
        match self {
            TableKind::EntryBase => 0,
            TableKind::Posting => 1,
            TableKind::Entry(kind) => 2 + kind as usize,
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_every_table_starts_with_not_null_id() {
        for kind in TableKind::all() {
            let first = kind.table().columns[0];
            assert_eq!(first.type_name, "uuid", "table {}", kind);
            assert!(first.not_null);
        }
    }

    #[test]
    fn test_table_names_and_indexes_are_unique() {
        let names: HashSet<&str> = TableKind::all().map(TableKind::name).collect();
        assert_eq!(names.len(), TableKind::COUNT);
        let indexes: Vec<usize> = TableKind::all().map(TableKind::index).collect();
        assert_eq!(indexes, (0..TableKind::COUNT).collect::<Vec<_>>());
    }

    #[test]
    fn test_column_names_unique_within_table() {
        for kind in TableKind::all() {
            let table = kind.table();
            let names: HashSet<&str> = table.column_names().collect();
            assert_eq!(names.len(), table.len(), "duplicate column in {}", table.name);
        }
    }

    #[test]
    fn test_array_columns_declare_element_type() {
        for kind in TableKind::all() {
            for column in kind.table().columns {
                let is_array = column.type_category == TypeCategory::Array;
                assert_eq!(is_array, column.typelem != 0, "{}.{}", kind, column.attname);
            }
        }
    }
}
