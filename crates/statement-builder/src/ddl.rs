//! Remote schema catalog and per-dialect DDL generation.
//!
//! The catalog mirrors the local entity tables. Every table gets a wide
//! auto-increment `id` key; integers are `BIGINT` on both dialects so
//! 64-bit payload values bind without narrowing.

use sync_core::Dialect;

/// Column types used by the mirrored tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
}

/// One non-key column of a mirrored table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub column_type: ColumnType,
    pub default: Option<&'static str>,
}

/// One mirrored table; the `id` key column is implicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDef {
    pub name: &'static str,
    pub columns: &'static [ColumnDef],
}

const fn int(name: &'static str) -> ColumnDef {
    ColumnDef {
        name,
        column_type: ColumnType::Integer,
        default: None,
    }
}

const fn real(name: &'static str) -> ColumnDef {
    ColumnDef {
        name,
        column_type: ColumnType::Real,
        default: None,
    }
}

const fn real_zero(name: &'static str) -> ColumnDef {
    ColumnDef {
        name,
        column_type: ColumnType::Real,
        default: Some("0"),
    }
}

const fn text(name: &'static str) -> ColumnDef {
    ColumnDef {
        name,
        column_type: ColumnType::Text,
        default: None,
    }
}

const ACTIVE: ColumnDef = ColumnDef {
    name: "active",
    column_type: ColumnType::Integer,
    default: Some("1"),
};

/// Tables created on a new remote target, in creation order.
pub const REMOTE_TABLES: &[TableDef] = &[
    TableDef {
        name: "users",
        columns: &[
            text("name"),
            text("username"),
            text("password"),
            text("role"),
            ACTIVE,
            text("created_at"),
            text("updated_at"),
        ],
    },
    TableDef {
        name: "categories",
        columns: &[text("name"), text("description"), ACTIVE, text("created_at")],
    },
    TableDef {
        name: "suppliers",
        columns: &[
            text("name"),
            text("cnpj"),
            text("phone"),
            text("email"),
            text("address"),
            text("contact_name"),
            text("notes"),
            ACTIVE,
            text("created_at"),
        ],
    },
    TableDef {
        name: "products",
        columns: &[
            text("code"),
            text("barcode"),
            text("name"),
            text("description"),
            int("category_id"),
            int("supplier_id"),
            real_zero("price"),
            real_zero("cost_price"),
            real_zero("stock"),
            real_zero("min_stock"),
            text("unit"),
            ACTIVE,
            text("created_at"),
            text("updated_at"),
        ],
    },
    TableDef {
        name: "customers",
        columns: &[
            text("name"),
            text("cpf_cnpj"),
            text("rg"),
            text("phone"),
            text("phone2"),
            text("email"),
            text("address"),
            text("number"),
            text("complement"),
            text("neighborhood"),
            text("city"),
            text("state"),
            text("zip_code"),
            text("birth_date"),
            text("notes"),
            real_zero("credit_limit"),
            ACTIVE,
            text("created_at"),
            text("updated_at"),
        ],
    },
    TableDef {
        name: "sales",
        columns: &[
            text("code"),
            int("customer_id"),
            int("user_id"),
            real("subtotal"),
            real("discount"),
            real("total"),
            text("payment_method"),
            real("payment_amount"),
            real("change_amount"),
            text("status"),
            text("notes"),
            text("created_at"),
        ],
    },
    TableDef {
        name: "sale_items",
        columns: &[
            int("sale_id"),
            int("product_id"),
            text("product_name"),
            text("product_code"),
            real("quantity"),
            real("unit_price"),
            real("discount"),
            real("total"),
        ],
    },
    TableDef {
        name: "service_orders",
        columns: &[
            text("code"),
            int("customer_id"),
            int("user_id"),
            text("equipment"),
            text("brand"),
            text("model"),
            text("serial_number"),
            text("accessories"),
            text("problem_description"),
            text("diagnosis"),
            text("solution"),
            text("status"),
            text("priority"),
            real("estimated_value"),
            real("final_value"),
            text("estimated_date"),
            int("warranty_days"),
            text("notes"),
            text("created_at"),
            text("updated_at"),
        ],
    },
    TableDef {
        name: "service_order_items",
        columns: &[
            int("service_order_id"),
            int("product_id"),
            text("description"),
            real("quantity"),
            real("unit_price"),
            real("total"),
            text("type"),
        ],
    },
];

/// Trait for generating DDL strings.
pub trait ToDdl {
    /// Type name for a column type.
    fn to_ddl(&self, column_type: ColumnType) -> &'static str;

    /// Definition of the auto-increment `id` key column.
    fn primary_key(&self) -> &'static str;

    /// Generate an idempotent CREATE TABLE statement.
    fn to_create_table(&self, table: &TableDef) -> String {
        let mut defs = vec![format!("id {}", self.primary_key())];
        defs.extend(table.columns.iter().map(|column| {
            let mut def = format!("{} {}", column.name, self.to_ddl(column.column_type));
            if let Some(default) = column.default {
                def.push_str(" DEFAULT ");
                def.push_str(default);
            }
            def
        }));
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            table.name,
            defs.join(", ")
        )
    }
}

/// MySQL DDL generator.
pub struct MySqlDdl;

impl ToDdl for MySqlDdl {
    fn to_ddl(&self, column_type: ColumnType) -> &'static str {
        match column_type {
            ColumnType::Integer => "BIGINT",
            ColumnType::Real => "DOUBLE",
            ColumnType::Text => "TEXT",
        }
    }

    fn primary_key(&self) -> &'static str {
        "BIGINT AUTO_INCREMENT PRIMARY KEY"
    }
}

/// PostgreSQL DDL generator.
pub struct PostgreSqlDdl;

impl ToDdl for PostgreSqlDdl {
    fn to_ddl(&self, column_type: ColumnType) -> &'static str {
        match column_type {
            ColumnType::Integer => "BIGINT",
            ColumnType::Real => "DOUBLE PRECISION",
            ColumnType::Text => "TEXT",
        }
    }

    fn primary_key(&self) -> &'static str {
        "BIGSERIAL PRIMARY KEY"
    }
}

/// CREATE TABLE statements for every mirrored table.
pub fn create_statements(dialect: Dialect) -> Vec<String> {
    let ddl: &dyn ToDdl = match dialect {
        Dialect::MySql => &MySqlDdl,
        Dialect::PostgreSql => &PostgreSqlDdl,
    };
    REMOTE_TABLES
        .iter()
        .map(|table| ddl.to_create_table(table))
        .collect()
}
